use tracing::debug;

use crate::error::Result;
use crate::kernel::ProductKernel;
use crate::matrix::Matrix;

/// Single-threaded reference kernel.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialKernel;

impl ProductKernel for SerialKernel {
    fn name(&self) -> &str {
        "serial"
    }

    fn product(&self, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        product(a, b)
    }
}

/// Serial matrix product `C = A · B`.
///
/// `a` is [n, k], `b` is [k, m]; the result is [n, m] with
/// `C[i][j] = sum over t of A[i][t] * B[t][j]`, accumulated from `t = 0`
/// upwards.
pub fn product(a: &Matrix, b: &Matrix) -> Result<Matrix> {
    let shape = a.shape().product_shape(&b.shape())?;
    debug!(a = %a.shape(), b = %b.shape(), "serial product");

    let (n, k, m) = (a.rows(), a.cols(), b.cols());
    let (a_data, b_data) = (a.as_slice(), b.as_slice());
    let mut c = Matrix::zeros(shape.rows(), shape.cols())?;
    let c_data = c.as_mut_slice();

    for i in 0..n {
        for j in 0..m {
            let mut sum = 0.0f64;
            for t in 0..k {
                sum += a_data[i * k + t] * b_data[t * m + j];
            }
            c_data[i * m + j] = sum;
        }
    }
    Ok(c)
}
