use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::error::{MatrixError, Result, SolveError};
use crate::matrix::Matrix;

/// Least-squares coefficients `β` minimizing `‖Xβ - y‖₂`.
///
/// `x` is the [n, p] design matrix with `n >= p` and full column rank; `y`
/// has length `n`. The solve is delegated to nalgebra's Householder QR:
/// `R β = Qᵀ y`.
///
/// # Errors
/// - `DimensionMismatch` if `y.len() != x.rows()`
/// - `InvalidArgument` if `x` or `y` holds a NaN or infinity
/// - `Solve(Underdetermined)` if `x.rows() < x.cols()`
/// - `Solve(RankDeficient)` if a diagonal entry of `R` is numerically zero
pub fn least_squares(x: &Matrix, y: &[f64]) -> Result<Vec<f64>> {
    let (n, p) = (x.rows(), x.cols());
    if y.len() != n {
        return Err(MatrixError::DimensionMismatch {
            op: "least squares",
            a_rows: n,
            a_cols: p,
            b_rows: y.len(),
            b_cols: 1,
        });
    }
    if let Some(bad) = x.as_slice().iter().chain(y).find(|v| !v.is_finite()) {
        return Err(MatrixError::InvalidArgument(format!(
            "least squares input contains non-finite value {}",
            bad
        )));
    }
    if n < p {
        return Err(SolveError::Underdetermined { rows: n, cols: p }.into());
    }
    if p == 0 {
        return Ok(Vec::new());
    }
    debug!(x = %x.shape(), "least squares via QR");

    let qr = DMatrix::from_row_slice(n, p, x.as_slice()).qr();
    let r = qr.r();
    let rank = numerical_rank(&r, n.max(p));
    if rank < p {
        return Err(SolveError::RankDeficient { rank, cols: p }.into());
    }

    let qty = qr.q().tr_mul(&DVector::from_column_slice(y));
    let beta = r
        .solve_upper_triangular(&qty)
        .ok_or(SolveError::RankDeficient { rank, cols: p })?;
    Ok(beta.iter().copied().collect())
}

/// Count diagonal entries of the triangular factor above
/// `dim * eps * max|r_ii|`.
fn numerical_rank(r: &DMatrix<f64>, dim: usize) -> usize {
    let diag = r.diagonal();
    let max = diag.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
    if max == 0.0 {
        return 0;
    }
    let tol = dim as f64 * f64::EPSILON * max;
    diag.iter().filter(|v| v.abs() > tol).count()
}
