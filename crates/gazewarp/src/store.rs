//! Persisted per-stimulus correspondence record.
//!
//! On disk the record is a JSON object keyed by stimulus:
//!
//! ```json
//! {
//!   "stim_a": [[[0.0, 0.0], [10.0, 0.0], [0.0, 10.0]], [[0.0, 0.0], [12.0, 1.0], [0.0, 10.0]]],
//!   "stim_b": [null, null]
//! }
//! ```
//!
//! The first list holds source points, the second the index-aligned
//! destinations. `[null, null]` means no correction (identity).
//!
//! Loading is lenient: a missing or unreadable file, or an entry that breaks
//! the both-or-neither / equal-length invariant, degrades to "uncorrected"
//! instead of failing.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::correspondence::Correspondences;

const RECORD_EXTENSION: &str = "transforms.json";
const UNCORRECTED_FALLBACK: &str = "treating as uncorrected";

type RawPoints = Option<Vec<[f64; 2]>>;
type RawEntry = (RawPoints, RawPoints);

/// Correction state of one stimulus.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum StoredPairs {
    /// No correction configured; the transform is the identity.
    #[default]
    Uncorrected,
    /// Operator-defined control points.
    Defined(Correspondences),
}

static UNCORRECTED: StoredPairs = StoredPairs::Uncorrected;

impl StoredPairs {
    pub fn is_defined(&self) -> bool {
        matches!(self, Self::Defined(_))
    }

    pub fn correspondences(&self) -> Option<&Correspondences> {
        match self {
            Self::Uncorrected => None,
            Self::Defined(c) => Some(c),
        }
    }

    fn to_raw(&self) -> RawEntry {
        match self {
            Self::Uncorrected => (None, None),
            Self::Defined(c) => (Some(c.sources()), Some(c.destinations())),
        }
    }

    fn from_raw(key: &str, raw: RawEntry) -> Self {
        match raw {
            (None, None) => Self::Uncorrected,
            (Some(src), Some(dst)) => {
                let all_finite = src
                    .iter()
                    .chain(dst.iter())
                    .all(|p| p[0].is_finite() && p[1].is_finite());
                match Correspondences::from_parts(&src, &dst) {
                    Some(c) if all_finite => Self::Defined(c),
                    _ => {
                        tracing::warn!(
                            "record entry '{}' is malformed ({} sources, {} destinations); {}",
                            key,
                            src.len(),
                            dst.len(),
                            UNCORRECTED_FALLBACK
                        );
                        Self::Uncorrected
                    }
                }
            }
            _ => {
                tracing::warn!(
                    "record entry '{}' has only one side defined; {}",
                    key,
                    UNCORRECTED_FALLBACK
                );
                Self::Uncorrected
            }
        }
    }
}

// ── Error type ───────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum StoreError {
    Io { path: PathBuf, source: io::Error },
    Json(serde_json::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {}", path.display(), source),
            Self::Json(e) => write!(f, "record serialization failed: {}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json(e) => Some(e),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

/// Record path derived from the gaze table path (`gaze.csv` → `gaze.transforms.json`).
pub fn record_path_for(gaze_path: &Path) -> PathBuf {
    gaze_path.with_extension(RECORD_EXTENSION)
}

// ── Store ────────────────────────────────────────────────────────────────

/// Keyed correspondence record bound to its file path.
#[derive(Debug, Clone)]
pub struct CorrespondenceStore {
    path: PathBuf,
    entries: BTreeMap<String, StoredPairs>,
}

impl CorrespondenceStore {
    /// Empty store that will persist to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Load the record at `path`, falling back to an empty record, then make
    /// sure every stimulus in `stimuli` has an entry.
    pub fn load_or_default<'a>(
        path: impl Into<PathBuf>,
        stimuli: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let mut store = Self::new(path);
        match std::fs::read_to_string(&store.path) {
            Ok(data) => match parse_record(&data) {
                Ok(entries) => {
                    tracing::info!(
                        "Loaded {} record entries from {}",
                        entries.len(),
                        store.path.display()
                    );
                    store.entries = entries;
                }
                Err(e) => tracing::warn!(
                    "Ignoring unreadable record {}: {}",
                    store.path.display(),
                    e
                ),
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!("No record at {}; starting uncorrected", store.path.display());
            }
            Err(e) => tracing::warn!("Cannot read record {}: {}", store.path.display(), e),
        }

        for key in stimuli {
            store.entries.entry(key.to_string()).or_default();
        }
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored pairs for `key`; unknown stimuli read as uncorrected.
    pub fn get(&self, key: &str) -> &StoredPairs {
        self.entries.get(key).unwrap_or(&UNCORRECTED)
    }

    /// Record `pairs` as the correction of `key`, replacing any previous entry.
    /// Not persisted until [`save`](Self::save).
    pub fn set(&mut self, key: &str, pairs: Correspondences) {
        self.entries
            .insert(key.to_string(), StoredPairs::Defined(pairs));
    }

    pub fn set_uncorrected(&mut self, key: &str) {
        self.entries.insert(key.to_string(), StoredPairs::Uncorrected);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StoredPairs)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of stimuli with a defined correction.
    pub fn corrected_count(&self) -> usize {
        self.entries.values().filter(|v| v.is_defined()).count()
    }

    pub fn to_json_string(&self) -> Result<String, StoreError> {
        let raw: BTreeMap<&str, RawEntry> = self
            .entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.to_raw()))
            .collect();
        Ok(serde_json::to_string_pretty(&raw)?)
    }

    /// Write the record to its path via a sibling temp file and rename.
    pub fn save(&self) -> Result<(), StoreError> {
        let json = self.to_json_string()?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!("Record written to {}", self.path.display());
        Ok(())
    }
}

fn parse_record(data: &str) -> Result<BTreeMap<String, StoredPairs>, serde_json::Error> {
    let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(data)?;
    Ok(raw
        .into_iter()
        .map(|(key, value)| {
            let pairs = match serde_json::from_value::<RawEntry>(value) {
                Ok(entry) => StoredPairs::from_raw(&key, entry),
                Err(e) => {
                    tracing::warn!(
                        "record entry '{}' unreadable ({}); {}",
                        key,
                        e,
                        UNCORRECTED_FALLBACK
                    );
                    StoredPairs::Uncorrected
                }
            };
            (key, pairs)
        })
        .collect())
}
