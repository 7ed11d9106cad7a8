//! Export tables to CSV and the calibration to JSON.
//!
//! Table CSVs are meant to be easy to consume in spreadsheets or downstream scripts:
//! `hours elapsed`, then metadata columns, then value columns; missing cells are empty.

use std::fs::File;
use std::path::Path;

use crate::domain::{CalibrationCurve, MeasurementTable};
use crate::error::AppError;

/// Header of the index column in exported CSVs.
pub const INDEX_HEADER: &str = "hours elapsed";

/// Write a measurement table to a CSV file.
pub fn write_table_csv(path: &Path, table: &MeasurementTable) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| AppError::io("Failed to create export CSV", path, e))?;
    let mut writer = csv::Writer::from_writer(file);
    let csv_err = |e: csv::Error| AppError::Data(format!("Failed to write export CSV '{}': {e}", path.display()));

    let mut header = Vec::with_capacity(1 + table.metadata().len() + table.n_columns());
    header.push(INDEX_HEADER.to_string());
    header.extend(table.metadata().iter().map(|c| c.name.clone()));
    header.extend(table.column_names().map(str::to_string));
    writer.write_record(&header).map_err(csv_err)?;

    for (row, hours) in table.index().iter().enumerate() {
        let mut record = Vec::with_capacity(header.len());
        record.push(hours.to_string());
        record.extend(table.metadata().iter().map(|c| c.values[row].clone()));
        record.extend(
            table
                .columns()
                .iter()
                .map(|c| c.values[row].map(|v| v.to_string()).unwrap_or_default()),
        );
        writer.write_record(&record).map_err(csv_err)?;
    }

    writer
        .flush()
        .map_err(|e| AppError::io("Failed to flush export CSV", path, e))?;
    Ok(())
}

/// Write the fitted calibration (scalars and regression points) as pretty JSON.
pub fn write_calibration_json(path: &Path, curve: &CalibrationCurve) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| AppError::io("Failed to create calibration JSON", path, e))?;
    serde_json::to_writer_pretty(file, curve)
        .map_err(|e| AppError::Data(format!("Failed to write calibration JSON '{}': {e}", path.display())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Series, TextColumn};

    #[test]
    fn table_csv_has_index_metadata_and_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("MEFL.csv");
        let table = MeasurementTable::new(
            vec![0.0, 0.5],
            vec![TextColumn {
                name: "T° 485".into(),
                values: vec!["30".into(), "30.2".into()],
            }],
            vec![
                Series::new("wt", vec![Some(1.5), None]),
                Series::new("ko", vec![Some(2.0), Some(1e14)]),
            ],
        )
        .unwrap();
        write_table_csv(&path, &table).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "hours elapsed,T° 485,wt,ko");
        assert_eq!(lines[1], "0,30,1.5,2");
        assert_eq!(lines[2], "0.5,30.2,,100000000000000");
    }

    #[test]
    fn calibration_json_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.json");
        let curve = CalibrationCurve {
            slope: 1.2e11,
            intercept: -3.0e9,
            r_squared: 0.9991,
            signals: vec![10.0, 20.0],
            molecules: vec![1.2e12, 2.4e12],
        };
        write_calibration_json(&path, &curve).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let back: CalibrationCurve = serde_json::from_str(&text).unwrap();
        assert_eq!(back, curve);
        assert!(text.contains("\"r_squared\": 0.9991"), "{text}");
    }
}
