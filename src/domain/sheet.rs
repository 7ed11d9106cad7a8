//! Raw sheets as exported by the plate reader.
//!
//! A sheet is a header row plus rows of loosely typed cells. Nothing here is
//! numeric yet: the instrument mixes numbers, `OVRFLW` markers, time stamps and
//! free text in the same grid, and the processing stages decide what each
//! column means.

use std::fmt;

use chrono::NaiveTime;
use serde::Deserialize;

/// Text the instrument writes when a reading saturates the detector.
pub const OVERFLOW_SENTINEL: &str = "OVRFLW";

/// One spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Empty,
    Number(f64),
    Text(String),
    Time(NaiveTime),
}

impl RawCell {
    /// Interpret a textual cell (CSV field, string cell in a workbook).
    ///
    /// Blank → `Empty`, `H:MM[:SS]` → `Time`, anything else is kept verbatim as
    /// `Text` (so `30.0` exports as `30.0`); `as_number` parses it on demand.
    pub fn from_text(raw: &str) -> Self {
        let s = raw.trim();
        if s.is_empty() {
            return RawCell::Empty;
        }
        if let Some(t) = parse_time_of_day(s) {
            return RawCell::Time(t);
        }
        RawCell::Text(s.to_string())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RawCell::Empty)
    }

    pub fn is_overflow(&self) -> bool {
        matches!(self, RawCell::Text(s) if s.trim() == OVERFLOW_SENTINEL)
    }

    /// Numeric view of a value cell. Numeric text is accepted.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawCell::Number(v) => Some(*v),
            RawCell::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            RawCell::Empty | RawCell::Time(_) => None,
        }
    }
}

impl fmt::Display for RawCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawCell::Empty => Ok(()),
            RawCell::Number(v) => write!(f, "{v}"),
            RawCell::Text(s) => write!(f, "{s}"),
            RawCell::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
        }
    }
}

/// Parse `H:MM:SS` or `H:MM`.
pub fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    const FMTS: [&str; 2] = ["%H:%M:%S", "%H:%M"];
    FMTS.iter()
        .find_map(|fmt| NaiveTime::parse_from_str(s.trim(), fmt).ok())
}

/// Which leading columns of a sheet are metadata, and which of them holds the time.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SheetLayout {
    /// Number of leading non-numeric columns (time label, temperature, ...).
    #[serde(default = "default_metadata_columns")]
    pub metadata_columns: usize,
    /// Header of the time-of-day column. Must be one of the metadata columns.
    #[serde(default = "default_time_column")]
    pub time_column: String,
}

fn default_metadata_columns() -> usize {
    2
}

fn default_time_column() -> String {
    "Time".to_string()
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            metadata_columns: default_metadata_columns(),
            time_column: default_time_column(),
        }
    }
}

/// A named sheet: header row + data rows, all rows as wide as the header.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<RawCell>>,
}

impl RawSheet {
    /// Build a sheet, padding short rows with empty cells and truncating long ones.
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<RawCell>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, RawCell::Empty);
                row
            })
            .collect();
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_text_classifies_cells() {
        assert_eq!(RawCell::from_text("  "), RawCell::Empty);
        assert_eq!(RawCell::from_text("0.512"), RawCell::Text("0.512".to_string()));
        assert_eq!(RawCell::from_text("0.512").as_number(), Some(0.512));
        assert_eq!(
            RawCell::from_text("0:30:00"),
            RawCell::Time(NaiveTime::from_hms_opt(0, 30, 0).unwrap())
        );
        assert_eq!(RawCell::from_text("OVRFLW"), RawCell::Text("OVRFLW".to_string()));
        assert!(RawCell::from_text("OVRFLW").is_overflow());
    }

    #[test]
    fn numeric_text_displays_as_written() {
        assert_eq!(RawCell::from_text(" 30.0 ").to_string(), "30.0");
        assert_eq!(RawCell::Number(30.0).to_string(), "30");
    }

    #[test]
    fn non_finite_text_is_not_a_number() {
        assert_eq!(RawCell::from_text("NaN"), RawCell::Text("NaN".to_string()));
        assert_eq!(RawCell::Text("inf".into()).as_number(), None);
    }

    #[test]
    fn short_rows_are_padded() {
        let sheet = RawSheet::new(
            "OD600",
            vec!["Time".into(), "T".into(), "A1".into()],
            vec![vec![RawCell::from_text("0:00:00")]],
        );
        assert_eq!(sheet.rows[0].len(), 3);
        assert!(sheet.rows[0][2].is_empty());
    }
}
