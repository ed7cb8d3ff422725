use thiserror::Error;

/// Failure of a single Store Adapter operation.
///
/// The adapter does not retry internally; a [`StoreError`] propagates to
/// the caller unchanged so the Worker Loop / Reaper Loop can log and
/// continue at the next tick.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A Job record existed but could not be decoded.
///
/// Callers treat this the same as an absent record: `get_job` returns
/// `None`, `scan_and_requeue_stuck` skips the id. No repair is attempted.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("malformed job record: {0}")]
    Malformed(String),
}

/// Error surface of the Queue Protocol.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// A state transition was requested from a source state that does not
    /// permit it. Treated as a programming error: logged and ignored,
    /// since the waiting/processing lists remain the source of truth for
    /// job ownership.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
}
