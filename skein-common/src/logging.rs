//! Process-wide `tracing` subscriber setup

use tracing::Level;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Installs the global subscriber: one fmt layer on stderr filtered at `level`.
///
/// Panics if a global subscriber is already set, so call it once from `main`.
pub fn init_logging(level: Level) {
    let formatting_layer = fmt::layer()
        .with_ansi(true)
        .with_level(true)
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr);

    let filter_layer = tracing_subscriber::filter::LevelFilter::from_level(level);

    tracing_subscriber::registry()
        .with(formatting_layer)
        .with(filter_layer)
        .init();
}

/// Like [`init_logging`] but returns quietly when a subscriber already exists.
///
/// Tests call this from many places.
pub fn try_init_logging(level: Level) {
    let formatting_layer = fmt::layer()
        .with_test_writer()
        .with_level(true)
        .with_target(true);

    let filter_layer = tracing_subscriber::filter::LevelFilter::from_level(level);

    let _ = tracing_subscriber::registry()
        .with(formatting_layer)
        .with(filter_layer)
        .try_init();
}
