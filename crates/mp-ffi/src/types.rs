/// Status codes returned by all FFI functions.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MpStatus {
    Ok = 0,
    ErrorInvalidArgument = 1,
    ErrorDimensionMismatch = 2,
    ErrorIndex = 3,
    ErrorAllocation = 4,
    ErrorSolve = 5,
    ErrorInternal = 6,
}

/// Memory order of a flat matrix buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MpLayout {
    RowMajor = 0,
    ColumnMajor = 1,
}

/// Borrowed, read-only view of a host matrix.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MpMatrixView {
    pub data: *const f64,
    pub rows: usize,
    pub cols: usize,
    pub layout: MpLayout,
}

/// Caller-allocated output buffer of `len` doubles.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MpBuffer {
    pub data: *mut f64,
    pub len: usize,
}

/// Scheduler parameters for `mp_product_range_parallel`.
///
/// A value of 0 in any field selects the default.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct MpRangeParams {
    pub num_threads: u32,
    pub chunks: u32,
    pub grain_size: u32,
}
