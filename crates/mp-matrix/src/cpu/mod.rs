//! Pure-Rust CPU product kernels.
//!
//! All three kernels use straightforward loops optimized for correctness
//! and reproducibility rather than peak performance: every output cell is
//! an explicit accumulation in ascending inner-index order, so the serial,
//! threaded and range-split results agree bit for bit.

pub mod range;
pub mod serial;
pub mod threaded;

pub use range::{
    parallel_for, partition, product_range_parallel, product_range_parallel_with,
    validate_partition, ProductWorker, RangeSplitKernel, RangeWorker, WorkRange,
};
pub use serial::{product, SerialKernel};
pub use threaded::{product_threaded, ThreadedKernel};
