//! Common error types for the skein broker

/// A specialized `Result` type for skein operations
pub type Result<T> = std::result::Result<T, Error>;

/// The error type shared by the metadata and server crates
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The metadata log could not be parsed
    #[error("Corrupt metadata log at offset {offset}: {reason}")]
    CorruptLog {
        /// Byte offset of the batch that failed to parse
        offset: usize,
        /// What went wrong
        reason: String,
    },

    /// An internal error occurred
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Builds a [`Error::CorruptLog`] for the batch starting at `offset`
    pub fn corrupt_log(offset: usize, reason: impl std::fmt::Display) -> Self {
        Error::CorruptLog {
            offset,
            reason: reason.to_string(),
        }
    }

    /// True when the error came from a malformed metadata log
    pub fn is_corrupt_log(&self) -> bool {
        matches!(self, Error::CorruptLog { .. })
    }
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) => e,
            e => std::io::Error::new(std::io::ErrorKind::Other, e),
        }
    }
}
