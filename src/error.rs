//! Crate-level error types
//!
//! Protocol-level failures have their own error enums next to the code that
//! produces them ([`crate::protocol::framing::FrameError`],
//! [`crate::protocol::codec::CodecError`]); this module covers server
//! startup and teardown.

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for server lifecycle operations
#[derive(Debug)]
pub enum Error {
    /// An I/O error, typically from binding the listener
    Io(std::io::Error),
    /// The broadcast worker terminated before reporting readiness
    WorkerUnavailable,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::WorkerUnavailable => write!(f, "Broadcast worker unavailable"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::WorkerUnavailable => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}
