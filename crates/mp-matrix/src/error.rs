use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatrixError {
    #[error("{op} dimension mismatch: [{a_rows}x{a_cols}] with [{b_rows}x{b_cols}]")]
    DimensionMismatch {
        op: &'static str,
        a_rows: usize,
        a_cols: usize,
        b_rows: usize,
        b_cols: usize,
    },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("index ({row}, {col}) out of bounds for [{rows}x{cols}] matrix")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },
    #[error("data length mismatch: expected {expected}, got {got}")]
    DataLength { expected: usize, got: usize },
    #[error("failed to allocate {elements} elements")]
    AllocationFailure { elements: usize },
    #[error("thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("least squares: {0}")]
    Solve(#[from] SolveError),
}

/// Failures reported by the delegated least-squares solve.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolveError {
    #[error("underdetermined system: {rows} observations for {cols} coefficients")]
    Underdetermined { rows: usize, cols: usize },
    #[error("rank-deficient design matrix: rank {rank} < {cols} columns")]
    RankDeficient { rank: usize, cols: usize },
}

pub type Result<T> = std::result::Result<T, MatrixError>;
