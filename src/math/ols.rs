//! Least squares solvers.
//!
//! Engines repeatedly solve small linear problems of the form:
//!
//! ```text
//! minimize Σ w_i (y_i - x_i^T β)^2
//! ```
//!
//! Implementation choices:
//! - Weighted problems scale rows by `sqrt(w_i)` and solve an ordinary least
//!   squares problem.
//! - SVD handles tall design matrices and near-collinear columns (e.g. several
//!   indicator columns of a sparse factor). Nalgebra's `QR::solve` is intended
//!   for square systems and will panic for non-square matrices.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Solve a weighted least squares problem.
pub fn solve_weighted_least_squares(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    w: &DVector<f64>,
) -> Option<DVector<f64>> {
    if w.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return None;
    }
    let mut xw = x.clone();
    let mut yw = y.clone();
    for i in 0..x.nrows() {
        let sw = w[i].sqrt();
        xw.row_mut(i).scale_mut(sw);
        yw[i] *= sw;
    }
    solve_least_squares(&xw, &yw)
}

/// Inverse of the weighted Gram matrix `X^T W X`, used for coefficient
/// covariance. `None` when the matrix is singular (rank-deficient design).
pub fn gram_inverse(x: &DMatrix<f64>, w: Option<&DVector<f64>>) -> Option<DMatrix<f64>> {
    let gram = match w {
        Some(w) => {
            let mut xw = x.clone();
            for i in 0..x.nrows() {
                xw.row_mut(i).scale_mut(w[i]);
            }
            x.transpose() * xw
        }
        None => x.transpose() * x,
    };
    let inv = gram.try_inverse()?;
    inv.iter().all(|v| v.is_finite()).then_some(inv)
}
