//! Error types for the skein server

use std::io;
use thiserror::Error;
use anyhow::Error as AnyhowError;

/// Main error type for the skein server
#[derive(Error, Debug)]
pub enum ServerError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Codec error
    #[error(transparent)]
    Anyhow(#[from] AnyhowError),

    /// The metadata log could not be read or parsed
    #[error("Metadata error: {0}")]
    Metadata(#[from] skein_common::Error),

    /// The peer broke framing mid-frame
    #[error("Framing error: {0}")]
    Framing(String),

    /// Frame too large
    #[error("Frame too large: {0} bytes")]
    FrameTooLarge(usize),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The peer sent nothing within the idle timeout
    #[error("Connection idle timeout")]
    Timeout,

    /// Decoding error
    #[error("Decoding error: {0}")]
    DecodingError(String),
}

impl From<ServerError> for io::Error {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::Io(e) => e,
            _ => io::Error::new(io::ErrorKind::Other, err),
        }
    }
}
