//! Logging prelude module for convenient access to tracing macros.
//!
//! This module provides convenient re-exports of common tracing macros
//! to reduce verbosity and maintain consistency across the codebase.
//!
//! # Usage
//!
//! ```ignore
//! use crate::logging::*;
//!
//! info!("This is an info message");
//! warn!("This is a warning");
//! error!("An error occurred");
//! ```

pub use tracing::{debug, error, info, trace, warn};

/// Initialize the tracing subscriber with environment filter support.
///
/// By default, logs at the configured level and above are displayed. Control
/// the log level with the `RUST_LOG` environment variable:
///
/// ```bash
/// RUST_LOG=debug bepsync ...
/// RUST_LOG=bepsync::scan=trace bepsync ...
/// ```
///
/// Setting `SYNCSPIRIT_CONSOLE_SINK=1` adds the stderr sink at debug level
/// regardless of the configured default.
pub fn init_tracing(default_level: &str) {
	let level = if console_sink_requested() { "debug" } else { default_level };
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
		)
		.with_writer(std::io::stderr)
		.init();
}

/// Check whether the operator asked for a console sink via the environment.
pub fn console_sink_requested() -> bool {
	std::env::var("SYNCSPIRIT_CONSOLE_SINK").map(|v| v == "1").unwrap_or(false)
}

// vim: ts=4
