//! Typed in-memory table loaded from CSV or a spreadsheet.
//!
//! CSV cells arrive as text, so each column gets a type inferred from all of
//! its cells: integer, float (integers with gaps become floats), boolean, or
//! text. Spreadsheet cells keep the type the workbook stores.

use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use kbimport_shared::{ImportError, Result};

/// Text rendered for a missing cell. Record bodies later map it to `-`.
pub const MISSING: &str = "nan";

/// Spellings read as a missing value in CSV input.
const MISSING_SPELLINGS: &[&str] = &["", "nan", "NaN", "NA", "N/A", "null", "NULL", "None"];

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// A single typed cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl Cell {
    /// Render the cell the way record bodies show it.
    pub fn render(&self) -> String {
        match self {
            Self::Empty => MISSING.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => format!("{f:?}"),
            Self::Bool(b) => if *b { "True" } else { "False" }.to_string(),
            Self::Text(s) => s.clone(),
        }
    }

    /// JSON scalar for record metadata. Missing cells become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Empty => serde_json::Value::Null,
            Self::Int(i) => serde_json::json!(i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Text(s) => serde_json::Value::String(s.clone()),
        }
    }

    /// Exact, type-sensitive equality against a configured filter value.
    ///
    /// Numbers compare numerically (`2` equals `2.0`), text only equals JSON
    /// strings, and a missing cell equals nothing.
    pub fn equals(&self, value: &serde_json::Value) -> bool {
        match (self, value) {
            (Self::Empty, _) => false,
            (Self::Int(i), serde_json::Value::Number(n)) => match n.as_i64() {
                Some(v) => *i == v,
                None => n.as_f64() == Some(*i as f64),
            },
            (Self::Float(f), serde_json::Value::Number(n)) => n.as_f64() == Some(*f),
            (Self::Bool(b), serde_json::Value::Bool(v)) => b == v,
            (Self::Text(s), serde_json::Value::String(v)) => s == v,
            _ => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => Self::Empty,
            Data::Int(i) => Self::Int(*i),
            Data::Float(f) if f.is_nan() => Self::Empty,
            Data::Float(f) => Self::Float(*f),
            Data::Bool(b) => Self::Bool(*b),
            Data::String(s) if s.is_empty() => Self::Empty,
            Data::String(s) => Self::Text(s.clone()),
            other => Self::Text(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Supported tabular file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Spreadsheet,
}

impl TableFormat {
    /// Pick the format from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" | "xls" => Ok(Self::Spreadsheet),
            _ => Err(ImportError::config(format!(
                "unsupported file type for {}: use CSV or Excel files",
                path.display()
            ))),
        }
    }
}

/// A header row plus typed data rows.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Load a table, dispatching on `format`.
    pub fn load(path: &Path, format: TableFormat) -> Result<Self> {
        match format {
            TableFormat::Csv => read_csv(path),
            TableFormat::Spreadsheet => read_spreadsheet(path),
        }
    }

    /// Index of the named column.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell at `row`/`column`; short rows read as missing.
    pub fn cell<'a>(&'a self, row: &'a [Cell], column: usize) -> &'a Cell {
        static EMPTY: Cell = Cell::Empty;
        row.get(column).unwrap_or(&EMPTY)
    }
}

/// Read a CSV file with a header row and infer column types.
fn read_csv(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path).map_err(|e| ImportError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ImportError::parse(format!("{}: {e}", path.display())))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut raw_rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ImportError::parse(format!("{}: {e}", path.display())))?;
        raw_rows.push(record.iter().map(String::from).collect());
    }

    let column_types: Vec<ColumnType> = (0..headers.len())
        .map(|i| ColumnType::infer(raw_rows.iter().map(|r| r.get(i).map(String::as_str))))
        .collect();

    let rows = raw_rows
        .iter()
        .map(|raw| {
            column_types
                .iter()
                .enumerate()
                .map(|(i, ty)| ty.parse(raw.get(i).map(String::as_str)))
                .collect()
        })
        .collect();

    tracing::debug!(path = %path.display(), columns = headers.len(), "read CSV table");
    Ok(Table { headers, rows })
}

/// Read the first worksheet of an Excel workbook.
fn read_spreadsheet(path: &Path) -> Result<Table> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| ImportError::parse(format!("{}: {e}", path.display())))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ImportError::parse(format!("{}: workbook has no sheets", path.display())))?
        .map_err(|e| ImportError::parse(format!("{}: {e}", path.display())))?;

    let mut rows_iter = range.rows();
    let headers: Vec<String> = rows_iter
        .next()
        .map(|header| header.iter().map(|c| c.to_string().trim().to_string()).collect())
        .unwrap_or_default();

    let mut rows: Vec<Vec<Cell>> = rows_iter
        .map(|row| row.iter().map(Cell::from).collect())
        .collect();
    for column in 0..headers.len() {
        narrow_whole_numbers(&mut rows, column);
    }

    tracing::debug!(path = %path.display(), columns = headers.len(), "read spreadsheet table");
    Ok(Table { headers, rows })
}

/// Workbooks store every number as a float. Whole numbers become integers
/// unless the column is numeric with gaps, which stays a float column like
/// its CSV counterpart.
fn narrow_whole_numbers(rows: &mut [Vec<Cell>], column: usize) {
    static EMPTY: Cell = Cell::Empty;
    let cells = || rows.iter().map(|row| row.get(column).unwrap_or(&EMPTY));

    let numeric = cells().all(|c| matches!(c, Cell::Int(_) | Cell::Float(_) | Cell::Empty));
    let has_gap = cells().any(Cell::is_empty);
    let all_whole = cells().all(|c| match c {
        Cell::Float(f) => whole_number(*f).is_some(),
        _ => true,
    });

    if numeric && (has_gap || !all_whole) {
        return;
    }

    for row in rows.iter_mut() {
        if let Some(cell) = row.get_mut(column) {
            if let Cell::Float(f) = *cell {
                if let Some(i) = whole_number(f) {
                    *cell = Cell::Int(i);
                }
            }
        }
    }
}

fn whole_number(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

// ---------------------------------------------------------------------------
// Column type inference
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnType {
    Int,
    Float,
    Bool,
    Text,
}

impl ColumnType {
    fn infer<'a>(cells: impl Iterator<Item = Option<&'a str>>) -> Self {
        let mut all_int = true;
        let mut all_float = true;
        let mut all_bool = true;
        let mut has_missing = false;
        let mut has_value = false;

        for cell in cells {
            let Some(raw) = cell.filter(|raw| !is_missing(raw)) else {
                has_missing = true;
                continue;
            };
            has_value = true;
            let raw = raw.trim();
            all_int &= raw.parse::<i64>().is_ok();
            all_float &= raw.parse::<f64>().is_ok();
            all_bool &= parse_bool(raw).is_some();
        }

        match (has_value, all_int, all_float, all_bool) {
            (false, ..) => Self::Text,
            (true, true, _, _) if !has_missing => Self::Int,
            (true, _, true, _) => Self::Float,
            (true, _, _, true) => Self::Bool,
            _ => Self::Text,
        }
    }

    fn parse(self, cell: Option<&str>) -> Cell {
        let Some(raw) = cell.filter(|raw| !is_missing(raw)) else {
            return Cell::Empty;
        };
        let trimmed = raw.trim();
        match self {
            Self::Int => trimmed.parse().map(Cell::Int).unwrap_or(Cell::Empty),
            Self::Float => trimmed.parse().map(Cell::Float).unwrap_or(Cell::Empty),
            Self::Bool => parse_bool(trimmed).map(Cell::Bool).unwrap_or(Cell::Empty),
            Self::Text => Cell::Text(raw.to_string()),
        }
    }
}

fn is_missing(raw: &str) -> bool {
    MISSING_SPELLINGS.contains(&raw.trim())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "True" | "true" | "TRUE" => Some(true),
        "False" | "false" | "FALSE" => Some(false),
        _ => None,
    }
}
