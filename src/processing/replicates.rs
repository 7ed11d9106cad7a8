//! Sample naming and technical-replicate averaging.
//!
//! Wells are renamed to condition names first (several wells may share one
//! name), then every condition is averaged over the columns whose name starts
//! with it. Prefix matching means a condition that is a prefix of another
//! (`WT` vs `WT2`) also picks up the longer one's columns; see
//! `ConditionSet::prefix_overlaps`.

use crate::domain::{ConditionSet, MeasurementTable, RenameMap, Series};
use crate::math::mean_present;

/// Rename value columns found in `map`; all others keep their names.
pub fn rename_columns(table: &MeasurementTable, map: &RenameMap) -> MeasurementTable {
    let columns = table
        .columns()
        .iter()
        .map(|c| {
            let name = map.get(&c.name).unwrap_or(&c.name);
            Series::new(name, c.values.clone())
        })
        .collect();
    table.derive(columns, true)
}

/// Row-wise mean per condition over the columns whose name starts with it.
///
/// Conditions matching no column are omitted. Output order follows `conditions`.
pub fn average_replicates(table: &MeasurementTable, conditions: &ConditionSet) -> MeasurementTable {
    let mut columns = Vec::with_capacity(conditions.len());
    for condition in conditions.iter() {
        let members = replicate_columns(table, condition);
        if members.is_empty() {
            continue;
        }
        let values = (0..table.n_rows())
            .map(|row| mean_present(members.iter().map(|c| c.values[row])))
            .collect();
        columns.push(Series::new(condition, values));
    }
    table.derive(columns, false)
}

/// Value columns belonging to `condition` by prefix match.
pub fn replicate_columns<'a>(table: &'a MeasurementTable, condition: &str) -> Vec<&'a Series> {
    table
        .columns()
        .iter()
        .filter(|c| c.name.starts_with(condition))
        .collect()
}
