//! Gaze sample table: CSV rows with a stimulus key and nullable pixel coordinates.
//!
//! All fields are kept as their original text. Only coordinates written back
//! through [`GazeTable::set_point`] are re-formatted, so untouched rows
//! serialize byte-for-byte as they were read.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

/// Names of the columns the correction reads and rewrites.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GazeColumns {
    pub stimulus: String,
    pub x: String,
    pub y: String,
}

impl Default for GazeColumns {
    fn default() -> Self {
        Self {
            stimulus: "stimulus".to_string(),
            x: "pixel_x".to_string(),
            y: "pixel_y".to_string(),
        }
    }
}

// ── Error type ───────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum TableError {
    Io { path: PathBuf, source: io::Error },
    Csv(csv::Error),
    MissingColumn(String),
    InvalidNumber { row: usize, column: String, value: String },
}

impl std::fmt::Display for TableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {}", path.display(), source),
            Self::Csv(e) => write!(f, "csv error: {}", e),
            Self::MissingColumn(name) => write!(f, "gaze table has no '{}' column", name),
            Self::InvalidNumber { row, column, value } => write!(
                f,
                "row {}: column '{}' holds non-numeric value '{}'",
                row, column, value
            ),
        }
    }
}

impl std::error::Error for TableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Csv(e) => Some(e),
            _ => None,
        }
    }
}

impl From<csv::Error> for TableError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e)
    }
}

/// Whether a coordinate field denotes an absent sample.
fn is_missing_token(field: &str) -> bool {
    let f = field.trim();
    f.is_empty()
        || ["na", "n/a", "nan", "null", "none"]
            .iter()
            .any(|t| f.eq_ignore_ascii_case(t))
}

fn parse_coordinate(field: &str) -> Option<Result<f64, ()>> {
    if is_missing_token(field) {
        return None;
    }
    match field.trim().parse::<f64>() {
        Ok(v) if v.is_nan() => None,
        Ok(v) => Some(Ok(v)),
        Err(_) => Some(Err(())),
    }
}

// ── Table ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct GazeTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    stimulus_col: usize,
    x_col: usize,
    y_col: usize,
    /// Parsed coordinates; `None` for absent samples.
    points: Vec<Option<[f64; 2]>>,
}

impl GazeTable {
    pub fn from_path(path: &Path, columns: &GazeColumns) -> Result<Self, TableError> {
        let file = std::fs::File::open(path).map_err(|source| TableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file, columns)
    }

    pub fn from_reader<R: io::Read>(reader: R, columns: &GazeColumns) -> Result<Self, TableError> {
        let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| TableError::MissingColumn(name.to_string()))
        };
        let stimulus_col = column(&columns.stimulus)?;
        let x_col = column(&columns.x)?;
        let y_col = column(&columns.y)?;

        let mut rows = Vec::new();
        let mut points = Vec::new();
        for (row, record) in rdr.records().enumerate() {
            let record = record?;
            let fields: Vec<String> = record.iter().map(str::to_string).collect();
            let coord = |col: usize, name: &str| match parse_coordinate(&fields[col]) {
                None => Ok(None),
                Some(Ok(v)) => Ok(Some(v)),
                Some(Err(())) => Err(TableError::InvalidNumber {
                    row,
                    column: name.to_string(),
                    value: fields[col].clone(),
                }),
            };
            let x = coord(x_col, &columns.x)?;
            let y = coord(y_col, &columns.y)?;
            points.push(x.zip(y).map(|(x, y)| [x, y]));
            rows.push(fields);
        }

        Ok(Self {
            headers,
            rows,
            stimulus_col,
            x_col,
            y_col,
            points,
        })
    }

    pub fn write_path(&self, path: &Path) -> Result<(), TableError> {
        let file = std::fs::File::create(path).map_err(|source| TableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.to_writer(file)
    }

    pub fn to_writer<W: io::Write>(&self, writer: W) -> Result<(), TableError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush().map_err(|e| TableError::Csv(e.into()))?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<&[String]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn stimulus(&self, index: usize) -> &str {
        &self.rows[index][self.stimulus_col]
    }

    /// Located sample at `index`; `None` if either coordinate is absent.
    pub fn point(&self, index: usize) -> Option<[f64; 2]> {
        self.points[index]
    }

    /// Distinct stimulus keys in first-seen order.
    pub fn stimuli(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .map(|r| &r[self.stimulus_col])
            .filter(|s| seen.insert(s.as_str()))
            .cloned()
            .collect()
    }

    /// Row indices grouped by stimulus in one pass. Groups are in first-seen
    /// order, indices within a group in table order.
    pub fn rows_by_stimulus(&self) -> Vec<(String, Vec<usize>)> {
        let mut slot: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
        for (i, row) in self.rows.iter().enumerate() {
            let key = row[self.stimulus_col].as_str();
            let g = *slot.entry(key).or_insert_with(|| {
                groups.push((key.to_string(), Vec::new()));
                groups.len() - 1
            });
            groups[g].1.push(i);
        }
        groups
    }

    /// Row indices belonging to `stimulus`, in table order.
    pub fn rows_for(&self, stimulus: &str) -> Vec<usize> {
        (0..self.rows.len())
            .filter(|&i| self.rows[i][self.stimulus_col] == stimulus)
            .collect()
    }

    /// Samples of one stimulus in table order.
    pub fn trace(&self, stimulus: &str) -> Vec<Option<[f64; 2]>> {
        self.rows_for(stimulus)
            .into_iter()
            .map(|i| self.points[i])
            .collect()
    }

    /// Overwrite the coordinates of row `index`.
    ///
    /// Absent values write both fields as the row's original missing token
    /// (empty when neither input field was missing).
    pub fn set_point(&mut self, index: usize, point: Option<[f64; 2]>) {
        let (x_col, y_col) = (self.x_col, self.y_col);
        let row = &mut self.rows[index];
        match point {
            Some([x, y]) => {
                row[x_col] = x.to_string();
                row[y_col] = y.to_string();
            }
            None => {
                let token = [&row[x_col], &row[y_col]]
                    .into_iter()
                    .find(|f| parse_coordinate(f).is_none())
                    .cloned()
                    .unwrap_or_default();
                row[x_col] = token.clone();
                row[y_col] = token;
            }
        }
        self.points[index] = point;
    }
}

/// Down-sample a trace by averaging consecutive windows of `window` samples.
///
/// Absent samples are skipped inside a window; a window with no located
/// sample yields `None`. Used only for display.
pub fn simplify_trace(trace: &[Option<[f64; 2]>], window: usize) -> Vec<Option<[f64; 2]>> {
    let window = window.max(1);
    trace
        .chunks(window)
        .map(|chunk| {
            let located: Vec<[f64; 2]> = chunk.iter().flatten().copied().collect();
            if located.is_empty() {
                return None;
            }
            let n = located.len() as f64;
            let sx: f64 = located.iter().map(|p| p[0]).sum();
            let sy: f64 = located.iter().map(|p| p[1]).sum();
            Some([sx / n, sy / n])
        })
        .collect()
}
