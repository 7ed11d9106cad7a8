//! Least squares for the calibration line.
//!
//! The only model fitted in this crate is a straight line `y = intercept + slope * x`.
//! We still go through the general solver so the design matrix `[1, x]` is solved
//! with SVD, which stays well behaved when RFU values span several orders of
//! magnitude and molecule counts sit around 1e14.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Result of a one-predictor ordinary least squares fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

/// Why a line could not be fitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineFitError {
    LengthMismatch { x: usize, y: usize },
    NonFinite,
    TooFewDistinctX(usize),
    ConstantY,
    Singular,
}

impl std::fmt::Display for LineFitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineFitError::LengthMismatch { x, y } => {
                write!(f, "{x} predictor values but {y} responses")
            }
            LineFitError::NonFinite => write!(f, "inputs contain non-finite values"),
            LineFitError::TooFewDistinctX(n) => {
                write!(f, "need at least 2 distinct signal values, got {n}")
            }
            LineFitError::ConstantY => write!(f, "all response values are identical"),
            LineFitError::Singular => write!(f, "least squares system is singular"),
        }
    }
}

/// Fit `y = intercept + slope * x` by ordinary least squares.
///
/// Degenerate inputs (fewer than two distinct `x`, constant `y`) are rejected
/// instead of producing a zero slope or an undefined R².
pub fn fit_line(xs: &[f64], ys: &[f64]) -> Result<LinearFit, LineFitError> {
    if xs.len() != ys.len() {
        return Err(LineFitError::LengthMismatch {
            x: xs.len(),
            y: ys.len(),
        });
    }
    if !xs.iter().chain(ys).all(|v| v.is_finite()) {
        return Err(LineFitError::NonFinite);
    }
    let distinct_x = count_distinct(xs);
    if distinct_x < 2 {
        return Err(LineFitError::TooFewDistinctX(distinct_x));
    }
    if count_distinct(ys) < 2 {
        return Err(LineFitError::ConstantY);
    }

    let n = xs.len();
    let mut design = DMatrix::<f64>::zeros(n, 2);
    for (i, &x) in xs.iter().enumerate() {
        design[(i, 0)] = 1.0;
        design[(i, 1)] = x;
    }
    let y = DVector::from_column_slice(ys);

    // Centre and scale x before solving; raw RFU and count magnitudes differ by
    // ~10 orders of magnitude and the singular-value cut-off is relative to them.
    let x_mean = xs.iter().sum::<f64>() / n as f64;
    let x_scale = xs.iter().map(|x| (x - x_mean).abs()).fold(0.0, f64::max);
    let y_mean = ys.iter().sum::<f64>() / n as f64;
    let y_scale = ys.iter().map(|y| (y - y_mean).abs()).fold(0.0, f64::max);
    for i in 0..n {
        design[(i, 1)] = (design[(i, 1)] - x_mean) / x_scale;
    }
    let y_scaled = y.map(|v| (v - y_mean) / y_scale);

    let beta = solve_least_squares(&design, &y_scaled).ok_or(LineFitError::Singular)?;
    let slope = beta[1] * y_scale / x_scale;
    let intercept = y_mean + beta[0] * y_scale - slope * x_mean;

    let ss_tot: f64 = ys.iter().map(|v| (v - y_mean).powi(2)).sum();
    let ss_res: f64 = xs
        .iter()
        .zip(ys)
        .map(|(&x, &v)| (v - (intercept + slope * x)).powi(2))
        .sum();
    let r_squared = 1.0 - ss_res / ss_tot;

    Ok(LinearFit {
        slope,
        intercept,
        r_squared,
    })
}

fn count_distinct(values: &[f64]) -> usize {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted.dedup();
    sorted.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, rel: f64) -> bool {
        (a - b).abs() <= rel * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn exact_line_is_recovered() {
        let xs = [0.0, 1.5, 3.0, 10.0, 42.0];
        let ys: Vec<f64> = xs.iter().map(|x| -7.25 + 2.5 * x).collect();
        let fit = fit_line(&xs, &ys).unwrap();
        assert!(close(fit.slope, 2.5, 1e-9), "{fit:?}");
        assert!(close(fit.intercept, -7.25, 1e-9), "{fit:?}");
        assert!((fit.r_squared - 1.0).abs() < 1e-12, "{fit:?}");
    }

    #[test]
    fn exact_line_is_recovered_at_calibration_magnitudes() {
        let xs = [120.0, 2_400.0, 11_800.0, 51_000.0];
        let ys: Vec<f64> = xs.iter().map(|x| 3.1e9 * x + 2.0e12).collect();
        let fit = fit_line(&xs, &ys).unwrap();
        assert!(close(fit.slope, 3.1e9, 1e-9), "{fit:?}");
        assert!(close(fit.intercept, 2.0e12, 1e-6), "{fit:?}");
        assert!((fit.r_squared - 1.0).abs() < 1e-9, "{fit:?}");
    }

    #[test]
    fn noisy_points_have_r_squared_below_one() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [1.1, 1.9, 3.2, 3.9];
        let fit = fit_line(&xs, &ys).unwrap();
        assert!(fit.r_squared < 1.0 && fit.r_squared > 0.9);
    }

    #[test]
    fn degenerate_inputs_are_rejected() {
        assert_eq!(
            fit_line(&[5.0, 5.0, 5.0], &[1.0, 2.0, 3.0]),
            Err(LineFitError::TooFewDistinctX(1))
        );
        assert_eq!(fit_line(&[1.0], &[1.0]), Err(LineFitError::TooFewDistinctX(1)));
        assert_eq!(fit_line(&[1.0, 2.0], &[4.0, 4.0]), Err(LineFitError::ConstantY));
        assert_eq!(
            fit_line(&[1.0, 2.0], &[4.0]),
            Err(LineFitError::LengthMismatch { x: 2, y: 1 })
        );
    }
}
