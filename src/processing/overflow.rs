//! Replace instrument overflow markers in a raw sheet.
//!
//! A saturated reading is exported as the text `OVRFLW`. Replacing it with a
//! fixed value (typically the detector maximum) does not recover real data, but
//! keeps downstream arithmetic simple; leaving it missing is the default.

use crate::domain::{RawCell, RawSheet, SheetLayout};

/// Replace every overflow cell outside the metadata columns.
///
/// With `replacement = None` the cell becomes empty (missing). Idempotent.
pub fn clean_overflow(sheet: &RawSheet, layout: &SheetLayout, replacement: Option<f64>) -> RawSheet {
    let mut out = sheet.clone();
    for row in &mut out.rows {
        for cell in row.iter_mut().skip(layout.metadata_columns) {
            if cell.is_overflow() {
                *cell = match replacement {
                    Some(v) => RawCell::Number(v),
                    None => RawCell::Empty,
                };
            }
        }
    }
    out
}

/// Number of overflow cells outside the metadata columns.
pub fn count_overflow(sheet: &RawSheet, layout: &SheetLayout) -> usize {
    sheet
        .rows
        .iter()
        .flat_map(|row| row.iter().skip(layout.metadata_columns))
        .filter(|cell| cell.is_overflow())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sheet(rows: Vec<Vec<RawCell>>) -> RawSheet {
        RawSheet::new(
            "GFP",
            vec!["Time".into(), "T° 485,528".into(), "A1".into(), "A2".into()],
            rows,
        )
    }

    fn overflow() -> RawCell {
        RawCell::Text("OVRFLW".into())
    }

    #[test]
    fn overflow_becomes_missing_by_default() {
        let raw = sheet(vec![vec![
            RawCell::from_text("0:00:00"),
            RawCell::Number(30.0),
            overflow(),
            RawCell::Number(12.0),
        ]]);
        let clean = clean_overflow(&raw, &SheetLayout::default(), None);
        assert_eq!(clean.rows[0][2], RawCell::Empty);
        assert_eq!(clean.rows[0][3], RawCell::Number(12.0));
        // Input is left as it was.
        assert!(raw.rows[0][2].is_overflow());
    }

    #[test]
    fn overflow_uses_replacement_when_given() {
        let raw = sheet(vec![vec![RawCell::Empty, RawCell::Empty, overflow(), overflow()]]);
        let clean = clean_overflow(&raw, &SheetLayout::default(), Some(260_000.0));
        assert_eq!(clean.rows[0][2], RawCell::Number(260_000.0));
        assert_eq!(clean.rows[0][3], RawCell::Number(260_000.0));
    }

    #[test]
    fn metadata_columns_are_never_touched() {
        let raw = sheet(vec![vec![overflow(), overflow(), RawCell::Number(1.0), RawCell::Empty]]);
        let layout = SheetLayout::default();
        let clean = clean_overflow(&raw, &layout, None);
        assert_eq!(clean, raw);
        assert_eq!(count_overflow(&raw, &layout), 0);
    }

    #[test]
    fn sheet_without_overflow_is_unchanged() {
        let raw = sheet(vec![vec![
            RawCell::from_text("0:10:00"),
            RawCell::Number(30.0),
            RawCell::Number(1.0),
            RawCell::Number(2.0),
        ]]);
        assert_eq!(clean_overflow(&raw, &SheetLayout::default(), Some(5.0)), raw);
    }

    fn cell_strategy() -> impl Strategy<Value = RawCell> {
        prop_oneof![
            Just(RawCell::Empty),
            Just(RawCell::Text("OVRFLW".into())),
            Just(RawCell::Text(" OVRFLW ".into())),
            "[a-z]{1,6}".prop_map(RawCell::Text),
            (-1.0e6f64..1.0e6).prop_map(RawCell::Number),
        ]
    }

    proptest! {
        #[test]
        fn cleaning_is_idempotent(
            rows in prop::collection::vec(prop::collection::vec(cell_strategy(), 4), 0..12),
            replacement in prop::option::of(0.0f64..1.0e6),
        ) {
            let layout = SheetLayout::default();
            let once = clean_overflow(&sheet(rows), &layout, replacement);
            let twice = clean_overflow(&once, &layout, replacement);
            prop_assert_eq!(count_overflow(&once, &layout), 0);
            prop_assert_eq!(twice, once);
        }
    }
}
