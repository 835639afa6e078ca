mod error;
mod logging;
mod types;

pub use error::*;
pub use types::*;

use std::ffi::CString;
use std::num::NonZeroUsize;
use std::os::raw::c_char;

use mp_matrix::{
    Matrix, MatrixError, ProductKernel, RangeSplitConfig, RangeSplitKernel, ThreadCount,
};

/// Execute a closure that returns an `MpStatus`, catching any panics
/// and converting them into `MpStatus::ErrorInternal`.
fn catch_panic<F: FnOnce() -> MpStatus + std::panic::UnwindSafe>(f: F) -> MpStatus {
    match std::panic::catch_unwind(f) {
        Ok(status) => status,
        Err(_) => {
            set_last_error("internal panic".to_string());
            MpStatus::ErrorInternal
        }
    }
}

/// Run a fallible body behind the panic guard, recording any error.
fn run<F: FnOnce() -> mp_matrix::Result<()> + std::panic::UnwindSafe>(f: F) -> MpStatus {
    catch_panic(|| match f() {
        Ok(()) => MpStatus::Ok,
        Err(e) => report(e),
    })
}

/// Copy a host matrix into an owned `Matrix`.
///
/// # Safety
/// `view.data` must point to `rows * cols` readable doubles, or may be null
/// when that product is zero.
unsafe fn read_matrix(view: &MpMatrixView) -> mp_matrix::Result<Matrix> {
    let len = read_len(view.rows, view.cols)?;
    let data = unsafe { borrow_slice(view.data, len, "matrix data")? };
    match view.layout {
        MpLayout::RowMajor => Matrix::new(view.rows, view.cols, data.to_vec()),
        MpLayout::ColumnMajor => Matrix::from_column_major(view.rows, view.cols, data),
    }
}

fn read_len(rows: usize, cols: usize) -> mp_matrix::Result<usize> {
    rows.checked_mul(cols).ok_or_else(|| {
        MatrixError::InvalidArgument(format!("{} x {} elements overflows", rows, cols))
    })
}

unsafe fn borrow_slice<'a>(
    ptr: *const f64,
    len: usize,
    what: &str,
) -> mp_matrix::Result<&'a [f64]> {
    if len == 0 {
        return Ok(&[]);
    }
    if ptr.is_null() {
        return Err(MatrixError::InvalidArgument(format!("{} is null", what)));
    }
    Ok(unsafe { std::slice::from_raw_parts(ptr, len) })
}

/// Write `values` into the caller's buffer.
///
/// # Safety
/// `out.data` must point to `out.len` writable doubles.
unsafe fn write_out(values: &[f64], out: MpBuffer) -> mp_matrix::Result<()> {
    if out.len < values.len() {
        return Err(MatrixError::InvalidArgument(format!(
            "output buffer holds {} values, {} required",
            out.len,
            values.len()
        )));
    }
    if values.is_empty() {
        return Ok(());
    }
    if out.data.is_null() {
        return Err(MatrixError::InvalidArgument("output buffer is null".to_string()));
    }
    let dst = unsafe { std::slice::from_raw_parts_mut(out.data, values.len()) };
    dst.copy_from_slice(values);
    Ok(())
}

/// Write a result matrix in the requested layout.
unsafe fn write_matrix(m: &Matrix, layout: MpLayout, out: MpBuffer) -> mp_matrix::Result<()> {
    match layout {
        MpLayout::RowMajor => unsafe { write_out(m.as_slice(), out) },
        MpLayout::ColumnMajor => unsafe { write_out(&m.to_column_major(), out) },
    }
}

/// Install the log subscriber (filter from `MP_LOG`, default `warn`).
///
/// Safe to call more than once; later calls leave the first subscriber in
/// place.
#[no_mangle]
pub extern "C" fn mp_init_logging() -> MpStatus {
    catch_panic(|| {
        logging::init_logging();
        MpStatus::Ok
    })
}

/// Serial product `C = A · B`.
///
/// `out` receives `a.rows * b.cols` values in `out_layout` order.
///
/// # Safety
/// Both views and `out` must describe valid buffers of the stated sizes.
#[no_mangle]
pub unsafe extern "C" fn mp_product(
    a: MpMatrixView,
    b: MpMatrixView,
    out_layout: MpLayout,
    out: MpBuffer,
) -> MpStatus {
    run(|| {
        let (a, b) = unsafe { (read_matrix(&a)?, read_matrix(&b)?) };
        let c = mp_matrix::product(&a, &b)?;
        unsafe { write_matrix(&c, out_layout, out) }
    })
}

/// Threaded product `C = A · B` on `threads` workers.
///
/// `threads <= 0` returns `ErrorInvalidArgument`.
///
/// # Safety
/// Both views and `out` must describe valid buffers of the stated sizes.
#[no_mangle]
pub unsafe extern "C" fn mp_product_threaded(
    a: MpMatrixView,
    b: MpMatrixView,
    threads: i32,
    out_layout: MpLayout,
    out: MpBuffer,
) -> MpStatus {
    run(|| {
        let threads = ThreadCount::try_from(i64::from(threads))?;
        let (a, b) = unsafe { (read_matrix(&a)?, read_matrix(&b)?) };
        let c = mp_matrix::product_threaded(&a, &b, threads.get())?;
        unsafe { write_matrix(&c, out_layout, out) }
    })
}

/// Range-split product `C = A · B`.
///
/// `b` is given in the standard [k, m] orientation and transposed before
/// the row workers run. Scheduler settings start from `MP_NUM_THREADS` /
/// `MP_GRAIN_SIZE` and are overridden by the non-zero fields of `params`.
///
/// # Safety
/// Both views and `out` must describe valid buffers of the stated sizes.
#[no_mangle]
pub unsafe extern "C" fn mp_product_range_parallel(
    a: MpMatrixView,
    b: MpMatrixView,
    params: MpRangeParams,
    out_layout: MpLayout,
    out: MpBuffer,
) -> MpStatus {
    run(|| {
        let config = range_config(params)?;
        let (a, b) = unsafe { (read_matrix(&a)?, read_matrix(&b)?) };
        let c = RangeSplitKernel::new(config).product(&a, &b)?;
        unsafe { write_matrix(&c, out_layout, out) }
    })
}

/// Build the scheduler settings for one call.
///
/// Each environment variable is consulted only when the matching field of
/// `params` is 0, so an explicit value is never blocked by a bad variable.
fn range_config(params: MpRangeParams) -> mp_matrix::Result<RangeSplitConfig> {
    let num_threads = match params.num_threads {
        0 => RangeSplitConfig::env_num_threads()?,
        n => Some(ThreadCount::new(n as usize)?),
    };
    let grain_size = match params.grain_size {
        0 => RangeSplitConfig::env_grain_size()?.unwrap_or(1),
        n => n as usize,
    };
    Ok(RangeSplitConfig {
        num_threads,
        chunks: NonZeroUsize::new(params.chunks as usize),
        grain_size,
    })
}

/// Least-squares coefficients for `x β ≈ y`.
///
/// `beta_out` receives `x.cols` values.
///
/// # Safety
/// `x`, `y` (of `y_len` doubles) and `beta_out` must be valid buffers.
#[no_mangle]
pub unsafe extern "C" fn mp_least_squares(
    x: MpMatrixView,
    y: *const f64,
    y_len: usize,
    beta_out: MpBuffer,
) -> MpStatus {
    run(|| {
        let x = unsafe { read_matrix(&x)? };
        let y = unsafe { borrow_slice(y, y_len, "response vector")? };
        let beta = mp_matrix::least_squares(&x, y)?;
        unsafe { write_out(&beta, beta_out) }
    })
}

/// Retrieve the last error message.
///
/// Returns a pointer to a C string describing the most recent error, or
/// null if no error has occurred. The caller must free the returned string
/// with `mp_free_string`.
#[no_mangle]
pub extern "C" fn mp_last_error() -> *const c_char {
    match error::take_last_error() {
        Some(e) => e.into_raw(),
        None => std::ptr::null(),
    }
}

/// Free a string previously returned by `mp_last_error`.
///
/// # Safety
/// `s` must come from `mp_last_error` and not have been freed already.
#[no_mangle]
pub unsafe extern "C" fn mp_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    fn view(data: &[f64], rows: usize, cols: usize, layout: MpLayout) -> MpMatrixView {
        MpMatrixView {
            data: data.as_ptr(),
            rows,
            cols,
            layout,
        }
    }

    fn buffer(out: &mut [f64]) -> MpBuffer {
        MpBuffer {
            data: out.as_mut_ptr(),
            len: out.len(),
        }
    }

    fn last_error() -> String {
        let ptr = mp_last_error();
        assert!(!ptr.is_null());
        let msg = unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned();
        unsafe { mp_free_string(ptr as *mut c_char) };
        msg
    }

    const A: [f64; 4] = [1.0, 2.0, 3.0, 4.0];
    const B: [f64; 4] = [5.0, 6.0, 7.0, 8.0];

    #[test]
    fn test_product_row_major() {
        let mut out = [0.0; 4];
        let status = unsafe {
            mp_product(
                view(&A, 2, 2, MpLayout::RowMajor),
                view(&B, 2, 2, MpLayout::RowMajor),
                MpLayout::RowMajor,
                buffer(&mut out),
            )
        };
        assert_eq!(status, MpStatus::Ok);
        assert_eq!(out, [19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_product_column_major() {
        // Same matrices as above, stored column by column.
        let a = [1.0, 3.0, 2.0, 4.0];
        let b = [5.0, 7.0, 6.0, 8.0];
        let mut out = [0.0; 4];
        let status = unsafe {
            mp_product_threaded(
                view(&a, 2, 2, MpLayout::ColumnMajor),
                view(&b, 2, 2, MpLayout::ColumnMajor),
                2,
                MpLayout::ColumnMajor,
                buffer(&mut out),
            )
        };
        assert_eq!(status, MpStatus::Ok);
        assert_eq!(out, [19.0, 43.0, 22.0, 50.0]);
    }

    #[test]
    fn test_range_parallel_standard_orientation() {
        let mut out = [0.0; 4];
        let params = MpRangeParams {
            num_threads: 2,
            chunks: 2,
            grain_size: 0,
        };
        let status = unsafe {
            mp_product_range_parallel(
                view(&A, 2, 2, MpLayout::RowMajor),
                view(&B, 2, 2, MpLayout::RowMajor),
                params,
                MpLayout::RowMajor,
                buffer(&mut out),
            )
        };
        assert_eq!(status, MpStatus::Ok);
        assert_eq!(out, [19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_explicit_params_ignore_bad_environment() {
        std::env::set_var("MP_NUM_THREADS", "auto");
        let params = MpRangeParams {
            num_threads: 2,
            chunks: 2,
            grain_size: 1,
        };
        let config = range_config(params);
        let mut out = [0.0; 4];
        let status = unsafe {
            mp_product_range_parallel(
                view(&A, 2, 2, MpLayout::RowMajor),
                view(&B, 2, 2, MpLayout::RowMajor),
                params,
                MpLayout::RowMajor,
                buffer(&mut out),
            )
        };
        let fallback = range_config(MpRangeParams {
            num_threads: 0,
            ..params
        });
        std::env::remove_var("MP_NUM_THREADS");

        assert_eq!(status, MpStatus::Ok);
        assert_eq!(out, [19.0, 22.0, 43.0, 50.0]);
        assert_eq!(config.unwrap().num_threads, Some(ThreadCount::new(2).unwrap()));
        assert!(matches!(fallback, Err(MatrixError::InvalidArgument(_))));
    }

    #[test]
    fn test_invalid_thread_count() {
        let mut out = [0.0; 4];
        for threads in [0, -1] {
            let status = unsafe {
                mp_product_threaded(
                    view(&A, 2, 2, MpLayout::RowMajor),
                    view(&B, 2, 2, MpLayout::RowMajor),
                    threads,
                    MpLayout::RowMajor,
                    buffer(&mut out),
                )
            };
            assert_eq!(status, MpStatus::ErrorInvalidArgument);
            assert!(last_error().contains("thread count"));
        }
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut out = [0.0; 6];
        let status = unsafe {
            mp_product(
                view(&[0.0; 6], 2, 3, MpLayout::RowMajor),
                view(&[0.0; 6], 2, 3, MpLayout::RowMajor),
                MpLayout::RowMajor,
                buffer(&mut out),
            )
        };
        assert_eq!(status, MpStatus::ErrorDimensionMismatch);
        assert!(last_error().contains("dimension mismatch"));
    }

    #[test]
    fn test_output_too_small() {
        let mut out = [0.0; 3];
        let status = unsafe {
            mp_product(
                view(&A, 2, 2, MpLayout::RowMajor),
                view(&B, 2, 2, MpLayout::RowMajor),
                MpLayout::RowMajor,
                buffer(&mut out),
            )
        };
        assert_eq!(status, MpStatus::ErrorInvalidArgument);
        let _ = last_error();
    }

    #[test]
    fn test_null_input() {
        let mut out = [0.0; 4];
        let null = MpMatrixView {
            data: std::ptr::null(),
            rows: 2,
            cols: 2,
            layout: MpLayout::RowMajor,
        };
        let status = unsafe {
            mp_product(null, view(&B, 2, 2, MpLayout::RowMajor), MpLayout::RowMajor, buffer(&mut out))
        };
        assert_eq!(status, MpStatus::ErrorInvalidArgument);
        assert!(last_error().contains("null"));
    }

    #[test]
    fn test_least_squares() {
        // Column-major design matrix [1 0; 1 1; 1 2].
        let x = [1.0, 1.0, 1.0, 0.0, 1.0, 2.0];
        let y = [1.0, 2.0, 4.0];
        let mut beta = [0.0; 2];
        let status = unsafe {
            mp_least_squares(
                view(&x, 3, 2, MpLayout::ColumnMajor),
                y.as_ptr(),
                y.len(),
                buffer(&mut beta),
            )
        };
        assert_eq!(status, MpStatus::Ok);
        assert!((beta[0] - 5.0 / 6.0).abs() < 1e-10);
        assert!((beta[1] - 1.5).abs() < 1e-10);
    }

    #[test]
    fn test_least_squares_rank_deficient() {
        let x = [1.0, 2.0, 3.0, 0.0, 0.0, 0.0];
        let y = [1.0, 2.0, 3.0];
        let mut beta = [0.0; 2];
        let status = unsafe {
            mp_least_squares(
                view(&x, 3, 2, MpLayout::ColumnMajor),
                y.as_ptr(),
                y.len(),
                buffer(&mut beta),
            )
        };
        assert_eq!(status, MpStatus::ErrorSolve);
        assert!(last_error().contains("rank-deficient"));
    }

    #[test]
    fn test_last_error_empty() {
        let _ = error::take_last_error();
        assert!(mp_last_error().is_null());
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        assert_eq!(mp_init_logging(), MpStatus::Ok);
        assert_eq!(mp_init_logging(), MpStatus::Ok);
    }
}
