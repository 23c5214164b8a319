//! Offline correction of a whole gaze table from a stored record.

use std::path::{Path, PathBuf};

use crate::gaze::GazeTable;
use crate::mapper::CoordinateMapper;
use crate::store::CorrespondenceStore;
use crate::tps::FitError;

const CORRECTED_EXTENSION: &str = "corrected.csv";

/// Default output path (`gaze.csv` → `gaze.corrected.csv`).
pub fn corrected_path_for(gaze_path: &Path) -> PathBuf {
    gaze_path.with_extension(CORRECTED_EXTENSION)
}

#[derive(Debug)]
pub enum BatchError {
    /// The stored pairs of `stimulus` cannot be fitted.
    Fit { stimulus: String, source: FitError },
}

impl std::fmt::Display for BatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fit { stimulus, source } => {
                write!(f, "cannot fit correction for stimulus '{}': {}", stimulus, source)
            }
        }
    }
}

impl std::error::Error for BatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Fit { source, .. } => Some(source),
        }
    }
}

/// Per-stimulus outcome of a batch pass.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StimulusReport {
    pub stimulus: String,
    pub rows: usize,
    /// Rows with a located output sample.
    pub mapped: usize,
    /// Rows left absent.
    pub missing: usize,
    /// Whether a correction was applied; uncorrected rows are untouched.
    pub corrected: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct BatchReport {
    /// In first-seen stimulus order.
    pub stimuli: Vec<StimulusReport>,
}

impl BatchReport {
    pub fn corrected_stimuli(&self) -> usize {
        self.stimuli.iter().filter(|s| s.corrected).count()
    }

    pub fn corrected_rows(&self) -> usize {
        self.stimuli
            .iter()
            .filter(|s| s.corrected)
            .map(|s| s.rows)
            .sum()
    }
}

/// Applies the corrections of a [`CorrespondenceStore`] to gaze tables.
pub struct BatchCorrector<'a> {
    store: &'a CorrespondenceStore,
}

impl<'a> BatchCorrector<'a> {
    pub fn new(store: &'a CorrespondenceStore) -> Self {
        Self { store }
    }

    /// Fit one mapper per stimulus, failing on the first degenerate record.
    pub fn fit_mappers(
        &self,
        stimuli: &[String],
    ) -> Result<Vec<(String, CoordinateMapper)>, BatchError> {
        stimuli
            .iter()
            .map(|stimulus| {
                CoordinateMapper::from_stored(self.store.get(stimulus))
                    .map(|mapper| (stimulus.clone(), mapper))
                    .map_err(|source| BatchError::Fit {
                        stimulus: stimulus.clone(),
                        source,
                    })
            })
            .collect()
    }

    /// Rewrite the coordinates of every corrected stimulus in place.
    ///
    /// Nothing is modified unless every stimulus can be fitted.
    pub fn correct(&self, table: &mut GazeTable) -> Result<BatchReport, BatchError> {
        let groups = table.rows_by_stimulus();
        let stimuli: Vec<String> = groups.iter().map(|(s, _)| s.clone()).collect();
        let mappers = self.fit_mappers(&stimuli)?;

        let mut report = BatchReport::default();
        for ((stimulus, mapper), (_, rows)) in mappers.into_iter().zip(groups) {
            let input: Vec<Option<[f64; 2]>> = rows.iter().map(|&i| table.point(i)).collect();
            let corrected = !mapper.is_identity();
            let output = if corrected {
                let output = mapper.apply(&input);
                for (&row, &point) in rows.iter().zip(&output) {
                    table.set_point(row, point);
                }
                output
            } else {
                input
            };

            let mapped = output.iter().filter(|p| p.is_some()).count();
            let entry = StimulusReport {
                stimulus,
                rows: rows.len(),
                mapped,
                missing: rows.len() - mapped,
                corrected,
            };
            tracing::info!(
                stimulus = %entry.stimulus,
                rows = entry.rows,
                missing = entry.missing,
                corrected = entry.corrected,
                "stimulus processed"
            );
            report.stimuli.push(entry);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correspondence::Correspondences;
    use crate::gaze::GazeColumns;
    use approx::assert_relative_eq;

    const TABLE: &str = "\
t,stimulus,pixel_x,pixel_y,note
0,drift,50,50,a
1,plain,12.5,7,b
2,drift,NaN,NaN,c
3,plain,,,d
4,drift,100,100,e
5,other,1,2,f
";

    fn table() -> GazeTable {
        GazeTable::from_reader(TABLE.as_bytes(), &GazeColumns::default()).unwrap()
    }

    fn corner_drag() -> Correspondences {
        Correspondences::from_parts(
            &[[0.0, 0.0], [100.0, 0.0], [0.0, 100.0], [100.0, 100.0]],
            &[[0.0, 0.0], [100.0, 0.0], [0.0, 100.0], [110.0, 100.0]],
        )
        .unwrap()
    }

    fn store() -> CorrespondenceStore {
        let mut store = CorrespondenceStore::new("unused.transforms.json");
        store.set("drift", corner_drag());
        store.set_uncorrected("plain");
        store
    }

    #[test]
    fn corrected_stimulus_is_mapped_in_place() {
        let mut t = table();
        let store = store();
        let report = BatchCorrector::new(&store).correct(&mut t).unwrap();

        let p = t.point(0).unwrap();
        assert_relative_eq!(p[0], 52.5, epsilon = 1e-6);
        assert_relative_eq!(p[1], 50.0, epsilon = 1e-6);
        let corner = t.point(4).unwrap();
        assert_relative_eq!(corner[0], 110.0, epsilon = 1e-6);
        assert!(t.point(2).is_none());
        assert_eq!(t.row(2).unwrap()[2..4], ["NaN", "NaN"]);

        assert_eq!(report.stimuli[0].stimulus, "drift");
        assert_eq!(report.stimuli[0].rows, 3);
        assert_eq!(report.stimuli[0].mapped, 2);
        assert_eq!(report.stimuli[0].missing, 1);
        assert_eq!(report.corrected_stimuli(), 1);
        assert_eq!(report.corrected_rows(), 3);
    }

    #[test]
    fn row_order_and_other_columns_are_preserved() {
        let mut t = table();
        BatchCorrector::new(&store()).correct(&mut t).unwrap();
        assert_eq!(t.len(), 6);
        let first: Vec<&str> = (0..t.len()).map(|i| t.row(i).unwrap()[0].as_str()).collect();
        assert_eq!(first, ["0", "1", "2", "3", "4", "5"]);
        let notes: Vec<&str> = (0..t.len()).map(|i| t.row(i).unwrap()[4].as_str()).collect();
        assert_eq!(notes, ["a", "b", "c", "d", "e", "f"]);
    }

    #[test]
    fn uncorrected_and_unknown_stimuli_are_byte_identical() {
        let mut t = table();
        let report = BatchCorrector::new(&store()).correct(&mut t).unwrap();
        let original = table();
        for i in [1, 3, 5] {
            assert_eq!(t.row(i), original.row(i));
        }
        let other = report.stimuli.iter().find(|s| s.stimulus == "other").unwrap();
        assert!(!other.corrected);
        let plain = report.stimuli.iter().find(|s| s.stimulus == "plain").unwrap();
        assert_eq!((plain.mapped, plain.missing), (1, 1));
    }

    #[test]
    fn degenerate_stimulus_aborts_before_any_change() {
        let mut store = store();
        let collinear = Correspondences::from_parts(
            &[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]],
            &[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]],
        )
        .unwrap();
        store.set("other", collinear);

        let mut t = table();
        let err = BatchCorrector::new(&store).correct(&mut t).unwrap_err();
        assert!(matches!(err, BatchError::Fit { ref stimulus, .. } if stimulus == "other"));

        let mut out = Vec::new();
        t.to_writer(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), TABLE);
    }

    #[test]
    fn corrected_path_replaces_extension() {
        assert_eq!(
            corrected_path_for(Path::new("data/p1/gaze.csv")),
            PathBuf::from("data/p1/gaze.corrected.csv")
        );
    }
}
