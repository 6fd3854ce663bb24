//! Error types for pool operations.

use thiserror::Error;

use crate::core::commit::CommitResult;
use crate::util::serde::{ExecutorId, TaskId};

/// Errors produced by pool operations and the commit engine.
#[derive(Debug, Error)]
pub enum PoolError {
    /// A resource declaration was empty or contained invalid values.
    #[error("invalid resources: {0}")]
    InvalidResources(String),
    /// A commit failed syntactic validation, or an operation was malformed.
    ///
    /// The payload is a stable human-readable reason; callers match on
    /// substrings of it.
    #[error("{0}")]
    Validation(String),
    /// Constraint arbitration aborted the commit.
    ///
    /// Carries the partially filled result so the caller can inspect the
    /// per-constraint rejection breakdown. `post_snapshot` is `None` when
    /// the abort happened in the pre-constraint phase.
    #[error("commit rejected by constraints")]
    Rejected(Box<CommitResult>),
    /// The referenced executor is not present in the pool.
    #[error("unknown executor: {0}")]
    UnknownExecutor(ExecutorId),
    /// The referenced task is not present in the pool.
    #[error("unknown task: {0}")]
    UnknownTask(TaskId),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
