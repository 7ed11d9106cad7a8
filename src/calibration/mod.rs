//! Fluorescein calibration: RFU → molecules of equivalent fluorescein (MEFL).
//!
//! A dilution series of fluorescein with known concentrations is read on the
//! same plate as the samples. Averaging each calibration well over the run gives
//! one RFU value per concentration; converting concentrations to molecule counts
//! and fitting a line RFU → count gives the conversion applied to every well.
//!
//! Molecule count for a well:
//!
//! ```text
//! count = conc_uM × 1e-6 (mol/L) × volume_uL × 1e-6 (L) × N_A
//! ```

use crate::domain::{CalibrationCurve, MeasurementTable, Series};
use crate::error::AppError;
use crate::math::{fit_line, mean_present};

/// Avogadro's number as used for the calibration protocol.
pub const AVOGADRO: f64 = 6.022e23;

/// Row letters of a 96-well plate; columns starting with one of these are wells.
pub const WELL_ROWS: [char; 8] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H'];

/// Inputs describing the dilution series.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationInputs<'a> {
    pub wells: &'a [String],
    pub concentrations_um: &'a [f64],
    pub volume_ul: f64,
    pub background_well: Option<&'a str>,
}

/// Number of fluorescein molecules in a well.
pub fn molecules_in_well(conc_um: f64, volume_ul: f64) -> f64 {
    conc_um * 1e-6 * volume_ul * 1e-6 * AVOGADRO
}

/// True for plate well identifiers (`A1` … `H12`).
pub fn is_well_column(name: &str) -> bool {
    name.chars().next().is_some_and(|c| WELL_ROWS.contains(&c))
}

/// Fit the RFU → MEFL line from the calibration wells of `table`.
pub fn fit_calibration(table: &MeasurementTable, inputs: &CalibrationInputs<'_>) -> Result<CalibrationCurve, AppError> {
    if inputs.wells.len() != inputs.concentrations_um.len() {
        return Err(AppError::config(format!(
            "calibration: {} fluorescein_calibration_wells but {} fluorescein_micromolar_concentration values.",
            inputs.wells.len(),
            inputs.concentrations_um.len()
        )));
    }
    if !(inputs.volume_ul.is_finite() && inputs.volume_ul > 0.0) {
        return Err(AppError::config(format!(
            "calibration: microliters_in_wells must be a positive number, got {}.",
            inputs.volume_ul
        )));
    }

    let molecules: Vec<f64> = inputs
        .concentrations_um
        .iter()
        .map(|&c| molecules_in_well(c, inputs.volume_ul))
        .collect();

    let mut signals = inputs
        .wells
        .iter()
        .map(|well| column_mean(table, well))
        .collect::<Result<Vec<f64>, AppError>>()?;

    if let Some(background) = inputs.background_well {
        let offset = column_mean(table, background)?;
        for s in &mut signals {
            *s -= offset;
        }
    }

    let fit = fit_line(&signals, &molecules).map_err(|e| AppError::DegenerateRegression(e.to_string()))?;

    Ok(CalibrationCurve {
        slope: fit.slope,
        intercept: fit.intercept,
        r_squared: fit.r_squared,
        signals,
        molecules,
    })
}

/// Convert every well column of `table` to MEFL; other columns pass through.
pub fn apply_calibration(table: &MeasurementTable, curve: &CalibrationCurve) -> MeasurementTable {
    let columns = table
        .columns()
        .iter()
        .map(|c| {
            if is_well_column(&c.name) {
                Series::new(
                    c.name.clone(),
                    c.values.iter().map(|v| v.map(|x| curve.convert(x))).collect(),
                )
            } else {
                c.clone()
            }
        })
        .collect();
    table.derive(columns, true)
}

fn column_mean(table: &MeasurementTable, name: &str) -> Result<f64, AppError> {
    let column = table.column(name).ok_or_else(|| {
        AppError::config(format!(
            "calibration: well '{name}' is not a column of the fluorescence sheet."
        ))
    })?;
    mean_present(column.values.iter().copied()).ok_or_else(|| {
        AppError::DegenerateRegression(format!("calibration well '{name}' has no readings"))
    })
}
