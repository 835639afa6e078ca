use rayon::prelude::*;
use tracing::{debug, trace};

use crate::config::RangeSplitConfig;
use crate::error::{MatrixError, Result};
use crate::kernel::ProductKernel;
use crate::matrix::Matrix;

/// A half-open row interval `[begin, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkRange {
    pub begin: usize,
    pub end: usize,
}

impl WorkRange {
    pub fn new(begin: usize, end: usize) -> Self {
        debug_assert!(begin <= end, "range [{}, {}) is reversed", begin, end);
        WorkRange { begin, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.begin)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Split `[0, n)` into `parts` contiguous ranges with
/// `begin_i = i * n / parts` and `end_i = (i + 1) * n / parts`.
///
/// Range lengths differ by at most one. When `parts > n` some ranges are
/// empty. `parts == 0` is treated as 1.
pub fn partition(n: usize, parts: usize) -> Vec<WorkRange> {
    let parts = parts.max(1);
    let bound = |i: usize| ((i as u128 * n as u128) / parts as u128) as usize;
    (0..parts)
        .map(|i| WorkRange::new(bound(i), bound(i + 1)))
        .collect()
}

/// Check that `ranges` tile `[0, n)` in order, with no gap and no overlap.
pub fn validate_partition(ranges: &[WorkRange], n: usize) -> Result<()> {
    let mut cursor = 0usize;
    for r in ranges {
        if r.begin != cursor || r.end < r.begin {
            return Err(MatrixError::InvalidArgument(format!(
                "range [{}, {}) does not continue from row {}",
                r.begin, r.end, cursor
            )));
        }
        cursor = r.end;
    }
    if cursor != n {
        return Err(MatrixError::InvalidArgument(format!(
            "ranges cover [0, {}) but {} rows were requested",
            cursor, n
        )));
    }
    Ok(())
}

/// A unit of row-parallel work.
///
/// The scheduler calls [`apply`](RangeWorker::apply) once per chunk, possibly
/// from several threads at once. Implementations read only shared,
/// immutable state and write only the output rows they are handed.
pub trait RangeWorker: Sync {
    /// Number of output values per row.
    fn row_width(&self) -> usize;

    /// Compute the output rows in `range` into `out`, which holds exactly
    /// `range.len() * row_width()` values laid out row-major.
    fn apply(&self, range: WorkRange, out: &mut [f64]);
}

/// Run `worker` over `[0, n_rows)`, writing into the row-major buffer `out`.
///
/// The row range is cut with [`partition`] and `out` is split along the
/// same boundaries, so every chunk receives its own `&mut` rows. Blocks
/// until every chunk has finished.
pub fn parallel_for<W>(
    worker: &W,
    n_rows: usize,
    config: &RangeSplitConfig,
    out: &mut [f64],
) -> Result<()>
where
    W: RangeWorker + ?Sized,
{
    let width = worker.row_width();
    let expected = n_rows
        .checked_mul(width)
        .ok_or(MatrixError::AllocationFailure { elements: usize::MAX })?;
    if out.len() != expected {
        return Err(MatrixError::DataLength {
            expected,
            got: out.len(),
        });
    }
    if expected == 0 {
        return Ok(());
    }

    let pool = match config.num_threads {
        Some(threads) => Some(
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads.get())
                .thread_name(|i| format!("mp-range-{}", i))
                .build()?,
        ),
        None => None,
    };
    let pool_threads = pool
        .as_ref()
        .map_or_else(rayon::current_num_threads, |p| p.current_num_threads());

    let chunks = config.resolve_chunks(n_rows, pool_threads);
    let ranges = partition(n_rows, chunks);
    validate_partition(&ranges, n_rows)?;
    debug!(n_rows, chunks, pool_threads, "range split dispatch");

    let mut rest = out;
    let mut tasks = Vec::with_capacity(ranges.len());
    for range in ranges.into_iter().filter(|r| !r.is_empty()) {
        let (head, tail) = std::mem::take(&mut rest).split_at_mut(range.len() * width);
        tasks.push((range, head));
        rest = tail;
    }

    let run = move || {
        tasks.into_par_iter().for_each(|(range, chunk)| {
            trace!(begin = range.begin, end = range.end, "chunk");
            worker.apply(range, chunk);
        })
    };
    match pool {
        Some(pool) => pool.install(run),
        None => run(),
    }
    Ok(())
}

/// Inner product, accumulated left to right from `0.0`.
fn inner_product(x: &[f64], y: &[f64]) -> f64 {
    let mut sum = 0.0f64;
    for (&xi, &yi) in x.iter().zip(y) {
        sum += xi * yi;
    }
    sum
}

/// Row-range worker for `C = A · Bᵀ`, where `bt` holds `B` transposed.
///
/// `C[i][j]` is the inner product of row `i` of `a` and row `j` of `bt`.
#[derive(Debug, Clone, Copy)]
pub struct ProductWorker<'a> {
    a: &'a Matrix,
    bt: &'a Matrix,
}

impl<'a> ProductWorker<'a> {
    /// Fails with `DimensionMismatch` unless `a.cols() == bt.cols()`.
    pub fn new(a: &'a Matrix, bt: &'a Matrix) -> Result<Self> {
        if a.cols() != bt.cols() {
            return Err(MatrixError::DimensionMismatch {
                op: "range product (B transposed)",
                a_rows: a.rows(),
                a_cols: a.cols(),
                b_rows: bt.rows(),
                b_cols: bt.cols(),
            });
        }
        Ok(Self { a, bt })
    }
}

impl RangeWorker for ProductWorker<'_> {
    fn row_width(&self) -> usize {
        self.bt.rows()
    }

    fn apply(&self, range: WorkRange, out: &mut [f64]) {
        let (k, m) = (self.a.cols(), self.bt.rows());
        let (a_data, bt_data) = (self.a.as_slice(), self.bt.as_slice());
        for (local, i) in (range.begin..range.end).enumerate() {
            let a_row = &a_data[i * k..(i + 1) * k];
            for j in 0..m {
                out[local * m + j] = inner_product(a_row, &bt_data[j * k..(j + 1) * k]);
            }
        }
    }
}

/// Task-parallel product `C = A · Bᵀ` with the default scheduler settings.
///
/// `bt` is `B` already transposed: shape [m, k] for a [n, k] `a`. The
/// result is [n, m] and bitwise identical to `product(a, &bt.transpose())`.
pub fn product_range_parallel(a: &Matrix, bt: &Matrix) -> Result<Matrix> {
    product_range_parallel_with(a, bt, &RangeSplitConfig::default())
}

/// [`product_range_parallel`] with explicit scheduler settings.
pub fn product_range_parallel_with(
    a: &Matrix,
    bt: &Matrix,
    config: &RangeSplitConfig,
) -> Result<Matrix> {
    let worker = ProductWorker::new(a, bt)?;
    let mut c = Matrix::zeros(a.rows(), bt.rows())?;
    parallel_for(&worker, a.rows(), config, c.as_mut_slice())?;
    Ok(c)
}

/// Range-split kernel in the standard `A · B` orientation. Transposes `b`
/// before dispatching to the row-range worker.
#[derive(Debug, Clone, Default)]
pub struct RangeSplitKernel {
    pub config: RangeSplitConfig,
}

impl RangeSplitKernel {
    pub fn new(config: RangeSplitConfig) -> Self {
        Self { config }
    }
}

impl ProductKernel for RangeSplitKernel {
    fn name(&self) -> &str {
        "range-split"
    }

    fn product(&self, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        a.shape().product_shape(&b.shape())?;
        let bt = b.transpose()?;
        product_range_parallel_with(a, &bt, &self.config)
    }
}
