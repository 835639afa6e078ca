use rayon::prelude::*;
use tracing::debug;

use crate::config::ThreadCount;
use crate::error::Result;
use crate::kernel::ProductKernel;
use crate::matrix::Matrix;

/// Parallel-for kernel over output rows, run on a pool of a caller-chosen
/// size.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadedKernel {
    pub threads: ThreadCount,
}

impl ThreadedKernel {
    pub fn new(threads: ThreadCount) -> Self {
        Self { threads }
    }
}

impl ProductKernel for ThreadedKernel {
    fn name(&self) -> &str {
        "threaded"
    }

    fn product(&self, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        product_threaded(a, b, self.threads.get())
    }
}

/// Matrix product `C = A · B` with the outer row loop spread over `threads`
/// workers.
///
/// Each worker owns a disjoint set of output rows, so no cell is written
/// twice and no synchronization is needed beyond the final join. The result
/// is bitwise identical to [`product`](super::product).
///
/// Fails with `InvalidArgument` when `threads == 0`.
pub fn product_threaded(a: &Matrix, b: &Matrix, threads: usize) -> Result<Matrix> {
    let threads = ThreadCount::new(threads)?;
    let shape = a.shape().product_shape(&b.shape())?;
    let mut c = Matrix::zeros(shape.rows(), shape.cols())?;
    if c.as_slice().is_empty() {
        return Ok(c);
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads.get())
        .thread_name(|i| format!("mp-threaded-{}", i))
        .build()?;
    debug!(a = %a.shape(), b = %b.shape(), threads = threads.get(), "threaded product");

    let (k, m) = (a.cols(), b.cols());
    let (a_data, b_data) = (a.as_slice(), b.as_slice());
    let c_data = c.as_mut_slice();
    pool.install(|| {
        c_data
            .par_chunks_mut(m)
            .enumerate()
            .for_each(|(i, out_row)| {
                let a_row = &a_data[i * k..(i + 1) * k];
                for (j, out) in out_row.iter_mut().enumerate() {
                    let mut sum = 0.0f64;
                    for (t, &a_it) in a_row.iter().enumerate() {
                        sum += a_it * b_data[t * m + j];
                    }
                    *out = sum;
                }
            });
    });
    Ok(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::product;
    use crate::error::MatrixError;

    #[test]
    fn test_threaded_basic() {
        let a = Matrix::from_rows(&[[1.0, 2.0], [3.0, 4.0]]).unwrap();
        let b = Matrix::from_rows(&[[5.0, 6.0], [7.0, 8.0]]).unwrap();
        for t in [1, 2, 4] {
            let c = product_threaded(&a, &b, t).unwrap();
            assert_eq!(c.as_slice(), &[19.0, 22.0, 43.0, 50.0]);
        }
    }

    #[test]
    fn test_threaded_matches_serial() {
        let a = Matrix::from_fn(17, 9, |i, j| ((i * 31 + j * 7) % 13) as f64 * 0.25 - 1.0).unwrap();
        let b = Matrix::from_fn(9, 11, |i, j| ((i * 5 + j * 3) % 7) as f64 * 0.5 - 1.5).unwrap();
        let expected = product(&a, &b).unwrap();
        for t in [1, 2, 3, 8, 32] {
            assert_eq!(product_threaded(&a, &b, t).unwrap(), expected);
        }
    }

    #[test]
    fn test_threaded_zero_threads() {
        let a = Matrix::identity(2).unwrap();
        assert!(matches!(
            product_threaded(&a, &a, 0),
            Err(MatrixError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_threaded_dimension_mismatch() {
        let a = Matrix::zeros(2, 3).unwrap();
        assert!(matches!(
            product_threaded(&a, &a, 2),
            Err(MatrixError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_threaded_empty_output() {
        let a = Matrix::zeros(0, 3).unwrap();
        let b = Matrix::zeros(3, 4).unwrap();
        let c = product_threaded(&a, &b, 2).unwrap();
        assert_eq!(c.rows(), 0);
        assert_eq!(c.cols(), 4);
    }

    #[test]
    fn test_kernel_trait() {
        let kernel = ThreadedKernel::new(ThreadCount::new(2).unwrap());
        assert_eq!(kernel.name(), "threaded");
        let a = Matrix::identity(3).unwrap();
        assert_eq!(kernel.product(&a, &a).unwrap(), a);
    }
}
