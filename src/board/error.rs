use thiserror::Error;

/// Errors raised by the board core.
///
/// Overlap and vehicle conflicts are not errors: they are flags on
/// `CollisionResult` / `Job` because most drag positions are invalid ones.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("invalid time format: {0:?} (expected HH:MM)")]
    InvalidTimeFormat(String),

    #[error("unknown job: {0}")]
    UnknownJob(String),

    #[error("unknown driver: {0}")]
    UnknownDriver(String),

    #[error("unknown split: {0}")]
    UnknownSplit(String),

    #[error("invalid operating window: {0}")]
    InvalidWindow(String),
}

pub type BoardResult<T> = Result<T, BoardError>;
