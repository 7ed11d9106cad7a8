//! Elapsed-hours indexing.
//!
//! Plate readers stamp each reading cycle with a time of day counted from the
//! start of the run (`0:00:00`, `0:10:00`, ...). We turn that into fractional
//! hours and use it as the row index.
//!
//! The primary sheet (optical density) defines the index. Sibling sheets from the
//! same run reuse it verbatim through `attach_time_index`, so rounding differences
//! in their own time column can never misalign rows.

use chrono::Timelike;

use crate::domain::{MeasurementTable, RawCell, RawSheet, Series, SheetLayout, TextColumn, parse_time_of_day};
use crate::error::AppError;

/// Elapsed hours per kept row, plus which raw rows they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeIndex {
    hours: Vec<f64>,
    source_rows: Vec<usize>,
    source_len: usize,
}

impl TimeIndex {
    pub fn hours(&self) -> &[f64] {
        &self.hours
    }

    /// Raw rows (0-based, excluding the header) that survived cleaning.
    pub fn source_rows(&self) -> &[usize] {
        &self.source_rows
    }

    /// Row count of the sheet the index was built from.
    pub fn source_len(&self) -> usize {
        self.source_len
    }

    pub fn dropped_rows(&self) -> usize {
        self.source_len - self.source_rows.len()
    }

    /// First position where time goes backwards, as `(row, previous, current)`.
    pub fn first_decrease(&self) -> Option<(usize, f64, f64)> {
        self.hours
            .windows(2)
            .position(|w| w[1] < w[0])
            .map(|i| (self.source_rows[i + 1], self.hours[i], self.hours[i + 1]))
    }
}

/// Output of indexing the primary sheet.
#[derive(Debug, Clone)]
pub struct TimeIndexed {
    pub table: MeasurementTable,
    pub index: TimeIndex,
}

/// Drop incomplete rows, convert the time column to elapsed hours and index by it.
pub fn index_by_time(sheet: &RawSheet, layout: &SheetLayout) -> Result<TimeIndexed, AppError> {
    let time_col = time_column_index(sheet, layout)?;

    let mut hours = Vec::new();
    let mut source_rows = Vec::new();
    for (idx, row) in sheet.rows.iter().enumerate() {
        if row.iter().any(RawCell::is_empty) {
            continue;
        }
        let h = hours_elapsed(&row[time_col]).ok_or_else(|| {
            AppError::Data(format!(
                "Sheet '{}', row {}: cannot read time of day from '{}' in column '{}'.",
                sheet.name,
                idx + 2,
                row[time_col],
                layout.time_column
            ))
        })?;
        hours.push(h);
        source_rows.push(idx);
    }

    if source_rows.is_empty() {
        return Err(AppError::Data(format!(
            "Sheet '{}' has no complete reading rows.",
            sheet.name
        )));
    }

    let index = TimeIndex {
        hours,
        source_rows,
        source_len: sheet.n_rows(),
    };
    let table = build_table(sheet, layout, time_col, &index)?;
    Ok(TimeIndexed { table, index })
}

/// Build a sibling table on an index computed from another sheet of the same run.
pub fn attach_time_index(
    sheet: &RawSheet,
    layout: &SheetLayout,
    index: &TimeIndex,
) -> Result<MeasurementTable, AppError> {
    if sheet.n_rows() != index.source_len {
        return Err(AppError::Alignment(format!(
            "Sheet '{}' has {} rows but the time index was built from {} rows.",
            sheet.name,
            sheet.n_rows(),
            index.source_len
        )));
    }
    let time_col = time_column_index(sheet, layout)?;
    build_table(sheet, layout, time_col, index)
}

/// Hours since `0:00:00` for a time-of-day cell.
///
/// Numbers (and numeric text) are spreadsheet day fractions; only the
/// fractional day is used.
pub fn hours_elapsed(cell: &RawCell) -> Option<f64> {
    let seconds = match cell {
        RawCell::Time(t) => t.num_seconds_from_midnight() as f64,
        RawCell::Text(s) => match parse_time_of_day(s) {
            Some(t) => t.num_seconds_from_midnight() as f64,
            None => day_fraction_seconds(cell.as_number()?)?,
        },
        RawCell::Number(v) => day_fraction_seconds(*v)?,
        RawCell::Empty => return None,
    };
    Some(seconds / 3600.0)
}

fn day_fraction_seconds(v: f64) -> Option<f64> {
    (v >= 0.0).then(|| (v.fract() * 86_400.0).round())
}

fn time_column_index(sheet: &RawSheet, layout: &SheetLayout) -> Result<usize, AppError> {
    if layout.metadata_columns > sheet.headers.len() {
        return Err(AppError::config(format!(
            "Sheet '{}' has {} columns, fewer than the {} metadata columns configured.",
            sheet.name,
            sheet.headers.len(),
            layout.metadata_columns
        )));
    }
    let idx = sheet.column_index(&layout.time_column).ok_or_else(|| {
        AppError::config(format!(
            "Sheet '{}' has no time column '{}'.",
            sheet.name, layout.time_column
        ))
    })?;
    if idx >= layout.metadata_columns {
        return Err(AppError::config(format!(
            "Time column '{}' in sheet '{}' is not among the first {} metadata columns.",
            layout.time_column, sheet.name, layout.metadata_columns
        )));
    }
    Ok(idx)
}

fn build_table(
    sheet: &RawSheet,
    layout: &SheetLayout,
    time_col: usize,
    index: &TimeIndex,
) -> Result<MeasurementTable, AppError> {
    let metadata = (0..layout.metadata_columns)
        .filter(|&c| c != time_col)
        .map(|c| TextColumn {
            name: sheet.headers[c].clone(),
            values: index
                .source_rows
                .iter()
                .map(|&r| sheet.rows[r][c].to_string())
                .collect(),
        })
        .collect();

    let mut columns = Vec::with_capacity(sheet.headers.len() - layout.metadata_columns);
    for c in layout.metadata_columns..sheet.headers.len() {
        let mut values = Vec::with_capacity(index.source_rows.len());
        for &r in &index.source_rows {
            let cell = &sheet.rows[r][c];
            let value = match cell {
                RawCell::Empty => None,
                other => Some(other.as_number().ok_or_else(|| {
                    AppError::Data(format!(
                        "Sheet '{}', column '{}', row {}: non-numeric value '{}'.",
                        sheet.name,
                        sheet.headers[c],
                        r + 2,
                        other
                    ))
                })?),
            };
            values.push(value);
        }
        columns.push(Series::new(sheet.headers[c].clone(), values));
    }

    MeasurementTable::new(index.hours.clone(), metadata, columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> RawCell {
        RawCell::from_text(s)
    }

    fn od_sheet() -> RawSheet {
        RawSheet::new(
            "OD600",
            vec!["Time".into(), "T° 600".into(), "A1".into(), "A2".into()],
            vec![
                vec![t("0:00:00"), t("30.0"), t("0.10"), t("0.11")],
                vec![t("0:30:00"), t("30.1"), t("0.20"), t("0.21")],
                vec![t("1:00:00"), t("30.0"), t("0.40"), t("0.41")],
                vec![RawCell::Empty, RawCell::Empty, RawCell::Empty, RawCell::Empty],
            ],
        )
    }

    #[test]
    fn hours_are_elapsed_time_of_day() {
        assert_eq!(hours_elapsed(&t("0:00:00")), Some(0.0));
        assert_eq!(hours_elapsed(&t("1:30:00")), Some(1.5));
        assert_eq!(hours_elapsed(&t("0:00:36")), Some(0.01));
        // 0.25 of a day is 06:00.
        assert_eq!(hours_elapsed(&RawCell::Number(0.25)), Some(6.0));
        assert_eq!(hours_elapsed(&t("0.25")), Some(6.0));
        assert_eq!(hours_elapsed(&RawCell::Number(-0.25)), None);
        assert_eq!(hours_elapsed(&RawCell::Text("later".into())), None);
    }

    #[test]
    fn index_drops_incomplete_rows_and_time_column() {
        let out = index_by_time(&od_sheet(), &SheetLayout::default()).unwrap();
        assert_eq!(out.table.index(), &[0.0, 0.5, 1.0]);
        assert_eq!(out.index.dropped_rows(), 1);
        assert_eq!(out.table.column_names().collect::<Vec<_>>(), ["A1", "A2"]);
        assert_eq!(out.table.metadata().len(), 1);
        assert_eq!(out.table.metadata()[0].name, "T° 600");
        assert_eq!(out.table.metadata()[0].values, ["30.0", "30.1", "30.0"]);
        assert_eq!(out.table.column("A2").unwrap().values[2], Some(0.41));
        assert_eq!(out.index.first_decrease(), None);
    }

    #[test]
    fn sibling_reuses_index_verbatim() {
        let od = index_by_time(&od_sheet(), &SheetLayout::default()).unwrap();
        // Sibling time stamps are off by a second; the OD index wins.
        let gfp = RawSheet::new(
            "GFP",
            vec!["Time".into(), "T° 485".into(), "A1".into(), "A2".into()],
            vec![
                vec![t("0:00:01"), t("30.0"), t("10"), RawCell::Empty],
                vec![t("0:30:01"), t("30.1"), t("20"), t("21")],
                vec![t("1:00:01"), t("30.0"), t("40"), t("41")],
                vec![RawCell::Empty, RawCell::Empty, RawCell::Empty, RawCell::Empty],
            ],
        );
        let table = attach_time_index(&gfp, &SheetLayout::default(), &od.index).unwrap();
        assert!(table.has_same_index(&od.table));
        assert_eq!(table.column("A2").unwrap().values, vec![None, Some(21.0), Some(41.0)]);
    }

    #[test]
    fn sibling_with_different_row_count_is_an_alignment_error() {
        let od = index_by_time(&od_sheet(), &SheetLayout::default()).unwrap();
        let mut gfp = od_sheet();
        gfp.rows.pop();
        let err = attach_time_index(&gfp, &SheetLayout::default(), &od.index).unwrap_err();
        assert!(matches!(err, AppError::Alignment(_)), "{err}");
    }

    #[test]
    fn non_numeric_value_is_reported_with_position() {
        let mut sheet = od_sheet();
        sheet.rows[1][3] = RawCell::Text("OVRFLW".into());
        let err = index_by_time(&sheet, &SheetLayout::default()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("A2") && msg.contains("row 3"), "{msg}");
    }

    #[test]
    fn missing_time_column_is_a_config_error() {
        let layout = SheetLayout {
            metadata_columns: 2,
            time_column: "Zeit".into(),
        };
        let err = index_by_time(&od_sheet(), &layout).unwrap_err();
        assert!(matches!(err, AppError::Config(_)), "{err}");
    }

    #[test]
    fn sheet_without_complete_rows_is_rejected() {
        let mut sheet = od_sheet();
        for row in &mut sheet.rows {
            row[2] = RawCell::Empty;
        }
        assert!(matches!(
            index_by_time(&sheet, &SheetLayout::default()),
            Err(AppError::Data(_))
        ));
    }

    #[test]
    fn first_decrease_points_at_the_raw_row() {
        let mut sheet = od_sheet();
        sheet.rows[2][0] = t("0:15:00");
        let out = index_by_time(&sheet, &SheetLayout::default()).unwrap();
        assert_eq!(out.index.first_decrease(), Some((2, 0.5, 0.25)));
    }
}
