//! The skein server library

#![deny(unreachable_pub)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod frame;
pub mod handlers;
pub mod server;

pub use config::{ApiSupport, ServerConfig};
pub use dispatch::Dispatcher;
pub use error::ServerError;
pub use server::Server;

pub type Result<T> = std::result::Result<T, error::ServerError>;
