//! Divide fluorescence-like tables by optical density.

use crate::domain::{Cell, MeasurementTable, Series};
use crate::error::AppError;

/// Cell-wise `numerator / denominator` over the value columns.
///
/// Both tables must share the index and list the same value columns in the same
/// order. A missing operand or a zero divisor yields a missing cell. The result
/// carries no metadata columns.
pub fn normalize_by(numerator: &MeasurementTable, denominator: &MeasurementTable) -> Result<MeasurementTable, AppError> {
    if !numerator.has_same_index(denominator) {
        return Err(AppError::Alignment(format!(
            "Cannot normalize: tables have different time indices ({} vs {} rows).",
            numerator.n_rows(),
            denominator.n_rows()
        )));
    }
    if numerator.n_columns() != denominator.n_columns() {
        return Err(AppError::config(format!(
            "Cannot normalize: {} value columns vs {} in the optical density table.",
            numerator.n_columns(),
            denominator.n_columns()
        )));
    }

    let mut columns = Vec::with_capacity(numerator.n_columns());
    for (pos, (num, den)) in numerator.columns().iter().zip(denominator.columns()).enumerate() {
        if num.name != den.name {
            return Err(AppError::config(format!(
                "Cannot normalize: column {} is '{}' but '{}' in the optical density table.",
                pos + 1,
                num.name,
                den.name
            )));
        }
        let values = num
            .values
            .iter()
            .zip(&den.values)
            .map(|(&a, &b)| quotient(a, b))
            .collect();
        columns.push(Series::new(num.name.clone(), values));
    }

    Ok(numerator.derive(columns, false))
}

fn quotient(a: Cell, b: Cell) -> Cell {
    match (a, b) {
        (Some(a), Some(b)) if b != 0.0 => Some(a / b).filter(|v| v.is_finite()),
        _ => None,
    }
}
