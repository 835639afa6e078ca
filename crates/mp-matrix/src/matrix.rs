use std::iter::StepBy;
use std::slice::Iter;

use crate::error::{MatrixError, Result};
use crate::kernel::ProductKernel;
use crate::shape::Shape;

/// A dense matrix of `f64` values.
///
/// Holds contiguous, row-major data. The dimensions are fixed at
/// construction; products are dispatched to a `ProductKernel`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    data: Vec<f64>,
    shape: Shape,
}

impl Matrix {
    /// Create a matrix from row-major data.
    ///
    /// Fails with `DataLength` if `data.len() != rows * cols`.
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        let shape = Shape::new(rows, cols);
        let expected = numel_or_fail(shape)?;
        if data.len() != expected {
            return Err(MatrixError::DataLength {
                expected,
                got: data.len(),
            });
        }
        Ok(Matrix { data, shape })
    }

    /// Create a zero-filled matrix.
    ///
    /// The buffer is reserved fallibly, so an impossible size surfaces as
    /// `AllocationFailure` rather than aborting the process.
    pub fn zeros(rows: usize, cols: usize) -> Result<Self> {
        let shape = Shape::new(rows, cols);
        let n = numel_or_fail(shape)?;
        let mut data = Vec::new();
        data.try_reserve_exact(n)
            .map_err(|_| MatrixError::AllocationFailure { elements: n })?;
        data.resize(n, 0.0);
        Ok(Matrix { data, shape })
    }

    /// The `n x n` identity matrix.
    pub fn identity(n: usize) -> Result<Self> {
        let mut m = Matrix::zeros(n, n)?;
        for i in 0..n {
            m.data[i * n + i] = 1.0;
        }
        Ok(m)
    }

    /// Build a matrix by evaluating `f(i, j)` for every cell.
    pub fn from_fn<F>(rows: usize, cols: usize, mut f: F) -> Result<Self>
    where
        F: FnMut(usize, usize) -> f64,
    {
        let mut m = Matrix::zeros(rows, cols)?;
        for i in 0..rows {
            for j in 0..cols {
                m.data[i * cols + j] = f(i, j);
            }
        }
        Ok(m)
    }

    /// Build a matrix from a list of equally long rows.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let cols = rows.first().map_or(0, |r| r.as_ref().len());
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(MatrixError::DataLength {
                    expected: cols,
                    got: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Matrix::new(rows.len(), cols, data)
    }

    /// Create a matrix from column-major data, the layout most statistical
    /// hosts use for their numeric matrices.
    pub fn from_column_major(rows: usize, cols: usize, data: &[f64]) -> Result<Self> {
        let expected = numel_or_fail(Shape::new(rows, cols))?;
        if data.len() != expected {
            return Err(MatrixError::DataLength {
                expected,
                got: data.len(),
            });
        }
        Matrix::from_fn(rows, cols, |i, j| data[j * rows + i])
    }

    pub fn rows(&self) -> usize {
        self.shape.rows()
    }

    pub fn cols(&self) -> usize {
        self.shape.cols()
    }

    /// Returns the matrix dimensions.
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Read the element at `(i, j)`.
    pub fn get(&self, i: usize, j: usize) -> Result<f64> {
        self.check_index(i, j)?;
        Ok(self.data[i * self.cols() + j])
    }

    /// Borrow row `i` as a contiguous slice.
    pub fn row(&self, i: usize) -> Result<&[f64]> {
        if i >= self.rows() {
            return Err(self.out_of_bounds(i, 0));
        }
        let cols = self.cols();
        Ok(&self.data[i * cols..(i + 1) * cols])
    }

    /// Borrow column `j` as a strided view.
    pub fn column(&self, j: usize) -> Result<Column<'_>> {
        if j >= self.cols() {
            return Err(self.out_of_bounds(0, j));
        }
        Ok(Column {
            data: &self.data,
            offset: j,
            stride: self.cols(),
            len: self.rows(),
        })
    }

    /// Row-major backing data.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Consume the matrix, returning its row-major data.
    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Copy the data out in column-major order.
    pub fn to_column_major(&self) -> Vec<f64> {
        let (rows, cols) = (self.rows(), self.cols());
        let mut out = Vec::with_capacity(self.data.len());
        for j in 0..cols {
            for i in 0..rows {
                out.push(self.data[i * cols + j]);
            }
        }
        out
    }

    /// Returns a new matrix with rows and columns swapped.
    pub fn transpose(&self) -> Result<Matrix> {
        let cols = self.cols();
        Matrix::from_fn(self.cols(), self.rows(), |i, j| self.data[j * cols + i])
    }

    /// Matrix product `self · other` using the given kernel.
    pub fn matmul(&self, other: &Matrix, kernel: &dyn ProductKernel) -> Result<Matrix> {
        kernel.product(self, other)
    }

    fn check_index(&self, i: usize, j: usize) -> Result<()> {
        if i >= self.rows() || j >= self.cols() {
            return Err(self.out_of_bounds(i, j));
        }
        Ok(())
    }

    fn out_of_bounds(&self, row: usize, col: usize) -> MatrixError {
        MatrixError::IndexOutOfBounds {
            row,
            col,
            rows: self.rows(),
            cols: self.cols(),
        }
    }
}

fn numel_or_fail(shape: Shape) -> Result<usize> {
    shape
        .checked_numel()
        .ok_or(MatrixError::AllocationFailure {
            elements: usize::MAX,
        })
}

/// A strided, read-only view of one matrix column.
#[derive(Debug, Clone, Copy)]
pub struct Column<'a> {
    data: &'a [f64],
    offset: usize,
    stride: usize,
    len: usize,
}

impl<'a> Column<'a> {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Element `t` of the column, if in range.
    pub fn get(&self, t: usize) -> Option<f64> {
        if t < self.len {
            Some(self.data[self.offset + t * self.stride])
        } else {
            None
        }
    }

    pub fn iter(&self) -> StepBy<Iter<'a, f64>> {
        let data: &'a [f64] = self.data;
        let tail: &'a [f64] = if self.len == 0 { &[] } else { &data[self.offset..] };
        tail.iter().step_by(self.stride.max(1))
    }
}

impl<'a> IntoIterator for Column<'a> {
    type Item = &'a f64;
    type IntoIter = StepBy<Iter<'a, f64>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
