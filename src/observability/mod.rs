//! # Observability
//!
//! Structured logging for the registrar.
//!
//! - `logging`: `tracing` subscriber setup (JSON or text, written to stderr)

pub mod logging;

pub use logging::init_logging;
