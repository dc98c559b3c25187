//! Common types and utilities for the skein broker

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod error;
pub mod logging;

/// Re-export commonly used items
pub use error::{Error, Result};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: Error = io_error.into();
        assert!(matches!(error, Error::Io(_)));

        let corrupt = Error::corrupt_log(61, "record count 3 exceeds batch");
        assert!(corrupt.is_corrupt_log());
        assert!(corrupt.to_string().contains("offset 61"));
    }

    #[test]
    fn test_into_io_error_keeps_kind() {
        let err: std::io::Error = Error::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "eof",
        ))
        .into();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);

        let err: std::io::Error = Error::Internal("read task panicked".into()).into();
        assert_eq!(err.kind(), std::io::ErrorKind::Other);
    }
}
