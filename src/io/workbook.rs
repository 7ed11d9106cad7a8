//! Sheet sources: where raw plate-reader sheets come from.
//!
//! The pipeline only needs "give me the sheet called X". Two sources ship:
//!
//! - `WorkbookSource`: an `.xlsx`/`.xlsm`/`.xls`/`.ods` workbook read with calamine
//! - `CsvDirSource`: a directory holding one `<sheet>.csv` per sheet
//!
//! `InMemorySource` serves pre-built sheets (tests, embedding).

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use calamine::{Data, Reader, Sheets, open_workbook_auto};
use chrono::NaiveTime;

use crate::domain::{RawCell, RawSheet};
use crate::error::AppError;

/// Anything that can hand out named raw sheets.
pub trait SheetSource {
    fn read_sheet(&mut self, name: &str) -> Result<RawSheet, AppError>;
}

/// Open `path` as a CSV directory if it is a directory, else as a workbook.
pub fn open_source(path: &Path) -> Result<Box<dyn SheetSource>, AppError> {
    if path.is_dir() {
        Ok(Box::new(CsvDirSource::new(path)))
    } else {
        Ok(Box::new(WorkbookSource::open(path)?))
    }
}

pub struct WorkbookSource {
    path: PathBuf,
    workbook: Sheets<BufReader<File>>,
}

impl WorkbookSource {
    pub fn open(path: &Path) -> Result<Self, AppError> {
        let workbook = open_workbook_auto(path)
            .map_err(|e| AppError::Sheet(format!("Failed to open workbook '{}': {e}", path.display())))?;
        Ok(Self {
            path: path.to_path_buf(),
            workbook,
        })
    }
}

impl SheetSource for WorkbookSource {
    fn read_sheet(&mut self, name: &str) -> Result<RawSheet, AppError> {
        let names = self.workbook.sheet_names();
        if !names.iter().any(|n| n == name) {
            return Err(AppError::Sheet(format!(
                "Workbook '{}' has no sheet '{name}' (available: {}).",
                self.path.display(),
                names.join(", ")
            )));
        }
        let range = self.workbook.worksheet_range(name).map_err(|e| {
            AppError::Sheet(format!(
                "Failed to read sheet '{name}' of '{}': {e}",
                self.path.display()
            ))
        })?;

        let mut rows = range.rows();
        let headers: Vec<String> = match rows.next() {
            Some(header) => header.iter().map(|c| header_name(&cell_from_data(c).to_string())).collect(),
            None => {
                return Err(AppError::Sheet(format!("Sheet '{name}' is empty.")));
            }
        };
        let body = rows.map(|row| row.iter().map(cell_from_data).collect()).collect();
        Ok(RawSheet::new(name, headers, body))
    }
}

/// Map a calamine cell onto our loosely typed cell.
pub fn cell_from_data(data: &Data) -> RawCell {
    match data {
        Data::Empty => RawCell::Empty,
        Data::Int(v) => RawCell::Number(*v as f64),
        Data::Float(v) => RawCell::Number(*v),
        Data::Bool(b) => RawCell::Text(b.to_string()),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => RawCell::from_text(s),
        Data::DateTime(dt) => time_from_day_fraction(dt.as_f64())
            .map(RawCell::Time)
            .unwrap_or(RawCell::Number(dt.as_f64())),
        Data::Error(e) => RawCell::Text(format!("{e:?}")),
    }
}

/// Time of day for a spreadsheet serial value (fractional day), to the second.
pub fn time_from_day_fraction(serial: f64) -> Option<NaiveTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let secs = (serial.fract() * 86_400.0).round() as u32 % 86_400;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, 0)
}

/// A directory of `<sheet>.csv` files.
pub struct CsvDirSource {
    dir: PathBuf,
}

impl CsvDirSource {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }
}

impl SheetSource for CsvDirSource {
    fn read_sheet(&mut self, name: &str) -> Result<RawSheet, AppError> {
        let path = self.dir.join(format!("{name}.csv"));
        let file = File::open(&path).map_err(|e| AppError::io("Failed to open sheet CSV", &path, e))?;
        read_csv_sheet(name, file)
            .map_err(|e| AppError::Sheet(format!("Failed to read sheet CSV '{}': {e}", path.display())))
    }
}

/// Parse a CSV stream into a raw sheet; the first record is the header.
pub fn read_csv_sheet<R: std::io::Read>(name: &str, reader: R) -> Result<RawSheet, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(header_name).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(RawCell::from_text).collect());
    }
    Ok(RawSheet::new(name, headers, rows))
}

fn header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. If we don't strip it, the time column is not found.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

/// Sheets held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    sheets: Vec<RawSheet>,
}

impl InMemorySource {
    pub fn new(sheets: Vec<RawSheet>) -> Self {
        Self { sheets }
    }
}

impl SheetSource for InMemorySource {
    fn read_sheet(&mut self, name: &str) -> Result<RawSheet, AppError> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .cloned()
            .ok_or_else(|| AppError::Sheet(format!("No sheet named '{name}'.")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_sheet_parses_cells_and_strips_bom() {
        let text = "\u{feff}Time,T° 600,A1,A2\n0:00:00,30.0,0.1,OVRFLW\n0:10:00,30.1,0.2\n";
        let sheet = read_csv_sheet("OD600", text.as_bytes()).unwrap();
        assert_eq!(sheet.headers, ["Time", "T° 600", "A1", "A2"]);
        assert_eq!(sheet.n_rows(), 2);
        assert!(sheet.rows[0][3].is_overflow());
        assert_eq!(sheet.rows[1][3], RawCell::Empty);
        assert_eq!(
            sheet.rows[1][0],
            RawCell::Time(NaiveTime::from_hms_opt(0, 10, 0).unwrap())
        );
    }

    #[test]
    fn day_fraction_converts_to_time_of_day() {
        // 0:30:00 is 1/48 of a day.
        assert_eq!(
            time_from_day_fraction(1.0 / 48.0),
            NaiveTime::from_hms_opt(0, 30, 0)
        );
        assert_eq!(time_from_day_fraction(-1.0), None);
    }

    #[test]
    fn calamine_cells_map_to_raw_cells() {
        assert_eq!(cell_from_data(&Data::Empty), RawCell::Empty);
        assert_eq!(cell_from_data(&Data::Int(3)), RawCell::Number(3.0));
        assert_eq!(cell_from_data(&Data::String("OVRFLW".into())), RawCell::Text("OVRFLW".into()));
        assert_eq!(
            cell_from_data(&Data::String("1:15:00".into())),
            RawCell::Time(NaiveTime::from_hms_opt(1, 15, 0).unwrap())
        );
    }

    #[test]
    fn csv_dir_source_reads_named_sheet() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("GFP.csv"), "Time,T,A1\n0:00:00,30,5\n").unwrap();
        let mut source = CsvDirSource::new(dir.path());
        let sheet = source.read_sheet("GFP").unwrap();
        assert_eq!(sheet.rows[0][2].as_number(), Some(5.0));

        let err = source.read_sheet("OD600").unwrap_err();
        assert!(err.to_string().contains("OD600.csv"), "{err}");
    }

    #[test]
    fn missing_workbook_is_a_sheet_error() {
        let result = WorkbookSource::open(Path::new("/nonexistent/plate.xlsx"));
        assert!(matches!(result, Err(AppError::Sheet(_))));
    }
}
