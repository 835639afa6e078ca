//! `mp-matrix` - Dense matrix products with interchangeable concurrency
//! strategies, plus a delegated least-squares solve.
//!
//! This crate provides:
//! - A row-major `Matrix` of `f64` values with fixed dimensions
//! - A `ProductKernel` trait for pluggable product strategies
//! - Serial, thread-count-controlled and range-split CPU kernels
//! - A row-range scheduler (`parallel_for`) with disjoint output chunks
//! - QR-based least squares backed by `nalgebra`

pub mod config;
pub mod cpu;
pub mod error;
pub mod kernel;
pub mod lstsq;
pub mod matrix;
pub mod shape;

// Re-export primary types at the crate root for convenience.
pub use config::{RangeSplitConfig, ThreadCount};
pub use cpu::{
    product, product_range_parallel, product_range_parallel_with, product_threaded,
    RangeSplitKernel, SerialKernel, ThreadedKernel, WorkRange,
};
pub use error::{MatrixError, Result, SolveError};
pub use kernel::ProductKernel;
pub use lstsq::least_squares;
pub use matrix::{Column, Matrix};
pub use shape::Shape;
