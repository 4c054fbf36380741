use std::io;

/// Errors in tokenbucket
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// `start` was called on a bucket whose refill worker is already active.
    #[error("Bucket already running")]
    AlreadyRunning,
    /// `stop` was called on a bucket with no refill worker.
    #[error("Bucket already stopped")]
    AlreadyStopped,
    #[error("Configure: {0}")]
    Config(String),
    #[error("Runtime: {0}")]
    Runtime(String),
    #[error("Filesys I/O: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Whether this is one of the two lifecycle state-mismatch signals.
    /// Those leave the bucket untouched and are safe to ignore.
    pub fn is_state_mismatch(&self) -> bool {
        matches!(self, Error::AlreadyRunning | Error::AlreadyStopped)
    }
}
