//! # Registrar Configuration
//!
//! Registrar-level settings loaded from environment variables.

use crate::constants::{
    DEFAULT_HEALTH_CHECK_MAX_ATTEMPTS, DEFAULT_PLATFORM_TIMEOUT_SECS,
    DEFAULT_REGISTRATION_MAX_ATTEMPTS, DELETION_TIMEOUT_SECS, HEALTH_CHECK_TIMEOUT_SECS,
    QUERY_TIMEOUT_SECS, REGISTRATION_TIMEOUT_SECS, VISIBILITY_PATCH_TIMEOUT_SECS,
};
use crate::controller::backoff::ExponentialBackoff;
use std::time::Duration;

/// Registrar-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from the handler function's configuration.
#[derive(Debug, Clone)]
pub struct RegistrarConfig {
    /// Maximum number of `GET /health` probes before the run fails
    pub health_check_max_attempts: u32,
    /// Maximum number of registration attempts before the run fails
    pub registration_max_attempts: u32,
    /// Wall-clock limit the invoking platform imposes on a single run (seconds)
    pub platform_timeout_secs: u64,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
    /// Enable color in text format logs
    pub log_enable_color: bool,
    /// Secrets Manager endpoint override
    /// Routes token lookups to a mock server during contract tests
    pub secrets_manager_endpoint: Option<String>,
}

impl Default for RegistrarConfig {
    fn default() -> Self {
        Self {
            health_check_max_attempts: DEFAULT_HEALTH_CHECK_MAX_ATTEMPTS,
            registration_max_attempts: DEFAULT_REGISTRATION_MAX_ATTEMPTS,
            platform_timeout_secs: DEFAULT_PLATFORM_TIMEOUT_SECS,
            log_level: "INFO".to_string(),
            log_format: "json".to_string(),
            log_enable_color: false,
            secrets_manager_endpoint: None,
        }
    }
}

impl RegistrarConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            health_check_max_attempts: env_var_or_default(
                "HEALTH_CHECK_MAX_ATTEMPTS",
                DEFAULT_HEALTH_CHECK_MAX_ATTEMPTS,
            )
            .max(1),
            registration_max_attempts: env_var_or_default(
                "REGISTRATION_MAX_ATTEMPTS",
                DEFAULT_REGISTRATION_MAX_ATTEMPTS,
            )
            .max(1),
            platform_timeout_secs: env_var_or_default(
                "PLATFORM_TIMEOUT_SECS",
                DEFAULT_PLATFORM_TIMEOUT_SECS,
            ),
            log_level: env_var_or_default_str("LOG_LEVEL", "INFO"),
            log_format: env_var_or_default_str("LOG_FORMAT", "json"),
            log_enable_color: env_var_or_default_bool("LOG_ENABLE_COLOR", false),
            secrets_manager_endpoint: std::env::var("SECRETS_MANAGER_ENDPOINT")
                .ok()
                .filter(|v| !v.trim().is_empty()),
        }
    }

    /// Get the platform timeout duration
    #[must_use]
    pub fn platform_timeout(&self) -> Duration {
        Duration::from_secs(self.platform_timeout_secs)
    }

    /// Upper bound on the wall-clock time of a single registration run
    ///
    /// Sums every call timeout and the largest possible backoff sleep for the
    /// configured attempt budgets, plus one visibility patch per service.
    /// `max_pruned` is `None` when pruning is disabled; otherwise the drained
    /// query and one deletion per pruned deployment are added.
    #[must_use]
    pub fn worst_case_duration(&self, services: usize, max_pruned: Option<u32>) -> Duration {
        let health = retry_loop_budget(
            self.health_check_max_attempts,
            Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS),
        );
        // One extra call for the legacy path fallback
        let registration = retry_loop_budget(
            self.registration_max_attempts,
            Duration::from_secs(REGISTRATION_TIMEOUT_SECS),
        ) + Duration::from_secs(REGISTRATION_TIMEOUT_SECS);
        let visibility = Duration::from_secs(VISIBILITY_PATCH_TIMEOUT_SECS)
            * u32::try_from(services).unwrap_or(u32::MAX);
        let pruning = max_pruned.map_or(Duration::ZERO, |max| {
            Duration::from_secs(QUERY_TIMEOUT_SECS)
                + Duration::from_secs(DELETION_TIMEOUT_SECS) * max
        });

        health + registration + visibility + pruning
    }

    /// Whether a run could outlive the platform's wall-clock limit
    #[must_use]
    pub fn exceeds_platform_timeout(&self, services: usize, max_pruned: Option<u32>) -> bool {
        self.worst_case_duration(services, max_pruned) > self.platform_timeout()
    }
}

/// Time spent by a retry loop that exhausts its budget: every call times out
/// and every sleep draws the maximum jitter
fn retry_loop_budget(max_attempts: u32, call_timeout: Duration) -> Duration {
    let calls = call_timeout * max_attempts;
    let sleeps: Duration = (1..max_attempts)
        .map(|attempt| ExponentialBackoff::default().max_delay(attempt))
        .sum();
    calls + sleeps
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as boolean or return default
fn env_var_or_default_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| {
            let v_lower = v.to_lowercase();
            v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
        })
        .unwrap_or(default)
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
