//! # Logging
//!
//! Installs the global `tracing` subscriber.
//!
//! The filter comes from `RUST_LOG` when set, otherwise from the configured
//! `LOG_LEVEL`. Output goes to stderr; stdout carries only the response
//! document.

use crate::config::RegistrarConfig;
use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Output format of log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    /// Parse `LOG_FORMAT`; anything other than `text` means JSON
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("text") {
            LogFormat::Text
        } else {
            LogFormat::Json
        }
    }
}

/// Build the level filter for `log_level`, honouring `RUST_LOG` first
#[must_use]
pub fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(log_level)))
}

fn default_directive(log_level: &str) -> String {
    let level = match log_level.trim().to_ascii_lowercase().as_str() {
        level @ ("error" | "warn" | "info" | "debug" | "trace") => level.to_string(),
        _ => "info".to_string(),
    };
    format!("service_registrar={level},warn")
}

/// Install the global subscriber
///
/// # Errors
/// Returns an error if a global subscriber is already installed
pub fn init_logging(config: &RegistrarConfig) -> Result<()> {
    let filter = env_filter(&config.log_level);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = match LogFormat::parse(&config.log_format) {
        LogFormat::Json => builder
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .try_init(),
        LogFormat::Text => builder.with_ansi(config.log_enable_color).try_init(),
    };
    result.map_err(|e| anyhow!("Failed to initialize logging: {e}"))
}
