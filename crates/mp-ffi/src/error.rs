use std::cell::RefCell;
use std::ffi::CString;

use mp_matrix::MatrixError;

use crate::types::MpStatus;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Store an error message for later retrieval via `mp_last_error`.
pub fn set_last_error(msg: String) {
    tracing::warn!(error = %msg, "call failed");
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Take the last error message, leaving `None` in its place.
pub fn take_last_error() -> Option<CString> {
    LAST_ERROR.with(|e| e.borrow_mut().take())
}

/// Map a library error to its status code.
pub fn status_of(err: &MatrixError) -> MpStatus {
    match err {
        MatrixError::DimensionMismatch { .. } => MpStatus::ErrorDimensionMismatch,
        MatrixError::InvalidArgument(_) | MatrixError::DataLength { .. } => {
            MpStatus::ErrorInvalidArgument
        }
        MatrixError::IndexOutOfBounds { .. } => MpStatus::ErrorIndex,
        MatrixError::AllocationFailure { .. } => MpStatus::ErrorAllocation,
        MatrixError::Solve(_) => MpStatus::ErrorSolve,
        MatrixError::ThreadPool(_) => MpStatus::ErrorInternal,
    }
}

/// Record `err` as the last error and return its status.
pub fn report(err: MatrixError) -> MpStatus {
    let status = status_of(&err);
    set_last_error(err.to_string());
    status
}
