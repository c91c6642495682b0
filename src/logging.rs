//! Logging and tracing setup.
//!
//! All logs are written to **stderr**; stdout belongs to whatever runtime
//! hosts the provider.
//!
//! # Quick Start
//!
//! ```ignore
//! use csp_provider::{init_logging, CspProvider};
//!
//! #[tokio::main]
//! async fn main() {
//!     init_logging();
//!     tracing::info!("Starting CSP provider");
//!     let provider = CspProvider::new();
//!     // hand `provider` to the runtime
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Controls log levels (e.g., `info`, `debug`, `csp_provider=debug`)
//!
//! ```bash
//! # Log every CSP request and response status
//! RUST_LOG=csp_provider=debug ./my-runtime
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the default logging subscriber.
///
/// Writes to stderr, honours `RUST_LOG`, and defaults to `info`.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default("info");
}

/// Initialize logging with a custom default level.
///
/// Like [`init_logging`], but `default_level` is used when `RUST_LOG`
/// is not set.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
///
/// # Example
///
/// ```ignore
/// use csp_provider::init_logging_with_default;
///
/// init_logging_with_default("csp_provider=debug");
/// ```
pub fn init_logging_with_default(default_level: &str) {
    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(stderr_layer())
        .init();
}

/// Try to initialize logging, returning false if already initialized.
///
/// Safe to call from tests that share a process.
pub fn try_init_logging() -> bool {
    tracing_subscriber::registry()
        .with(env_filter("info"))
        .with(stderr_layer())
        .try_init()
        .is_ok()
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn stderr_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'span> tracing_subscriber::registry::LookupSpan<'span>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
}
