use std::fmt::Debug;

use crate::error::Result;
use crate::matrix::Matrix;

/// Trait for pluggable matrix-product strategies (serial, threaded,
/// range-split).
///
/// Every implementation computes the same `C = A · B` in the standard
/// orientation, with `a` of shape [n, k] and `b` of shape [k, m], and
/// returns a freshly allocated [n, m] result owned by the caller. Results
/// are bitwise identical across implementations: each cell is accumulated
/// from `t = 0` to `k - 1` in ascending order.
pub trait ProductKernel: Send + Sync + Debug {
    /// Returns the name of this kernel (e.g., "serial", "threaded").
    fn name(&self) -> &str;

    /// Matrix product `a · b`.
    ///
    /// Fails with `DimensionMismatch` when `a.cols() != b.rows()`.
    fn product(&self, a: &Matrix, b: &Matrix) -> Result<Matrix>;
}
