use std::num::NonZeroUsize;

use crate::error::{MatrixError, Result};

/// Environment variable naming the worker count for the range scheduler.
pub const NUM_THREADS_ENV: &str = "MP_NUM_THREADS";
/// Environment variable naming the minimum rows per scheduled chunk.
pub const GRAIN_SIZE_ENV: &str = "MP_GRAIN_SIZE";

/// A validated, non-zero number of worker threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadCount(NonZeroUsize);

impl ThreadCount {
    /// Fails with `InvalidArgument` when `n == 0`.
    pub fn new(n: usize) -> Result<Self> {
        NonZeroUsize::new(n).map(ThreadCount).ok_or_else(|| {
            MatrixError::InvalidArgument("thread count must be positive, got 0".to_string())
        })
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for ThreadCount {
    fn default() -> Self {
        ThreadCount(NonZeroUsize::MIN)
    }
}

impl TryFrom<i64> for ThreadCount {
    type Error = MatrixError;

    fn try_from(n: i64) -> Result<Self> {
        if n <= 0 {
            return Err(MatrixError::InvalidArgument(format!(
                "thread count must be positive, got {}",
                n
            )));
        }
        let n = usize::try_from(n).map_err(|_| {
            MatrixError::InvalidArgument(format!("thread count {} does not fit in usize", n))
        })?;
        ThreadCount::new(n)
    }
}

/// Scheduling knobs for the range-split kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSplitConfig {
    /// Size of a dedicated pool. `None` runs on the global rayon pool.
    pub num_threads: Option<ThreadCount>,
    /// Exact number of chunks to cut the row range into. `None` uses one
    /// chunk per pool thread.
    pub chunks: Option<NonZeroUsize>,
    /// Minimum rows per chunk.
    pub grain_size: usize,
}

impl Default for RangeSplitConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            chunks: None,
            grain_size: 1,
        }
    }
}

impl RangeSplitConfig {
    /// Config that cuts the row range into exactly `chunks` pieces (subject to
    /// the row count).
    pub fn with_chunks(chunks: NonZeroUsize) -> Self {
        Self {
            chunks: Some(chunks),
            ..Self::default()
        }
    }

    /// Read overrides from `MP_NUM_THREADS` and `MP_GRAIN_SIZE`.
    ///
    /// Unset variables keep their defaults; unparsable or zero values fail
    /// with `InvalidArgument`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            num_threads: threads_from(&lookup)?,
            grain_size: grain_size_from(&lookup)?.unwrap_or(defaults.grain_size),
            ..defaults
        })
    }

    /// Worker count from `MP_NUM_THREADS`, if set.
    ///
    /// Only this variable is read, so a bad `MP_GRAIN_SIZE` does not affect it.
    pub fn env_num_threads() -> Result<Option<ThreadCount>> {
        threads_from(&|key: &str| std::env::var(key).ok())
    }

    /// Minimum rows per chunk from `MP_GRAIN_SIZE`, if set.
    pub fn env_grain_size() -> Result<Option<usize>> {
        grain_size_from(&|key: &str| std::env::var(key).ok())
    }

    /// Number of chunks to split `n_rows` into, given `pool_threads` workers.
    ///
    /// Always at least 1 and never more than `n_rows` (for `n_rows > 0`).
    pub fn resolve_chunks(&self, n_rows: usize, pool_threads: usize) -> usize {
        let requested = self.chunks.map_or(pool_threads, NonZeroUsize::get).max(1);
        let by_grain = (n_rows / self.grain_size.max(1)).max(1);
        requested.min(by_grain).min(n_rows.max(1))
    }
}

fn threads_from<F>(lookup: &F) -> Result<Option<ThreadCount>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(NUM_THREADS_ENV) {
        Some(raw) => Ok(Some(ThreadCount::new(parse_env(NUM_THREADS_ENV, &raw)?)?)),
        None => Ok(None),
    }
}

fn grain_size_from<F>(lookup: &F) -> Result<Option<usize>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(GRAIN_SIZE_ENV) else {
        return Ok(None);
    };
    let grain = parse_env(GRAIN_SIZE_ENV, &raw)?;
    if grain == 0 {
        return Err(MatrixError::InvalidArgument(format!(
            "{} must be positive",
            GRAIN_SIZE_ENV
        )));
    }
    Ok(Some(grain))
}

fn parse_env(key: &str, raw: &str) -> Result<usize> {
    raw.trim().parse::<usize>().map_err(|e| {
        MatrixError::InvalidArgument(format!("{}={:?} is not a count: {}", key, raw, e))
    })
}
