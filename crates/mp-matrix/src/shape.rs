use crate::error::{MatrixError, Result};
use std::fmt;

/// The `(rows, cols)` dimensions of a dense matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    rows: usize,
    cols: usize,
}

impl Shape {
    /// Create a new shape.
    pub fn new(rows: usize, cols: usize) -> Self {
        Shape { rows, cols }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total number of elements, or `None` if `rows * cols` overflows.
    pub fn checked_numel(&self) -> Option<usize> {
        self.rows.checked_mul(self.cols)
    }

    /// True when `self · other` is defined, i.e. `self.cols == other.rows`.
    pub fn is_product_compatible(&self, other: &Shape) -> bool {
        self.cols == other.rows
    }

    /// Shape of `self · other`.
    ///
    /// Fails with `DimensionMismatch` when the inner dimensions differ.
    pub fn product_shape(&self, other: &Shape) -> Result<Shape> {
        if !self.is_product_compatible(other) {
            return Err(MatrixError::DimensionMismatch {
                op: "product",
                a_rows: self.rows,
                a_cols: self.cols,
                b_rows: other.rows,
                b_cols: other.cols,
            });
        }
        Ok(Shape::new(self.rows, other.cols))
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}x{}]", self.rows, self.cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_shape() {
        let s = Shape::new(2, 3);
        assert_eq!(s.rows(), 2);
        assert_eq!(s.cols(), 3);
        assert_eq!(s.checked_numel(), Some(6));
    }

    #[test]
    fn test_checked_numel_overflow() {
        let s = Shape::new(usize::MAX, 2);
        assert_eq!(s.checked_numel(), None);
    }

    #[test]
    fn test_product_shape() {
        let a = Shape::new(4, 3);
        let b = Shape::new(3, 5);
        assert!(a.is_product_compatible(&b));
        assert_eq!(a.product_shape(&b).unwrap(), Shape::new(4, 5));
    }

    #[test]
    fn test_product_shape_mismatch() {
        let a = Shape::new(4, 3);
        let b = Shape::new(2, 5);
        assert!(matches!(
            a.product_shape(&b),
            Err(MatrixError::DimensionMismatch { a_cols: 3, b_rows: 2, .. })
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(Shape::new(2, 7).to_string(), "[2x7]");
    }
}
