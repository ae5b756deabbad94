//! # Constants
//!
//! Shared constants used throughout the registrar.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Timeout for a single `GET /health` probe (seconds)
pub const HEALTH_CHECK_TIMEOUT_SECS: u64 = 5;

/// Timeout for a single registration call (seconds)
pub const REGISTRATION_TIMEOUT_SECS: u64 = 10;

/// Timeout for a single service visibility patch (seconds)
pub const VISIBILITY_PATCH_TIMEOUT_SECS: u64 = 10;

/// Timeout for a single deployment deletion (seconds)
pub const DELETION_TIMEOUT_SECS: u64 = 10;

/// Timeout for a query against the runtime's SQL endpoint (seconds)
pub const QUERY_TIMEOUT_SECS: u64 = 30;

/// Default number of health probes before giving up
pub const DEFAULT_HEALTH_CHECK_MAX_ATTEMPTS: u32 = 5;

/// Default number of registration attempts before giving up
/// The one-time legacy path fallback is not counted against this budget
pub const DEFAULT_REGISTRATION_MAX_ATTEMPTS: u32 = 3;

/// Default wall-clock limit imposed by the invoking platform (seconds)
/// Matches a five-minute handler timeout; the default attempt budgets with
/// pruning at its default cap finish within it
pub const DEFAULT_PLATFORM_TIMEOUT_SECS: u64 = 300;

/// Default number of most recent drained deployments kept by the pruner
pub const DEFAULT_REVISION_HISTORY_LIMIT: u32 = 0;

/// Default cap on deployments deleted by a single pruning run
pub const DEFAULT_MAX_PRUNED_PER_RUN: u32 = 10;

/// Exponential backoff base (milliseconds), multiplied by `2^attempt`
pub const BACKOFF_BASE_MS: u64 = 1000;

/// Upper bound (exclusive) of the uniform jitter added to every backoff (milliseconds)
pub const BACKOFF_JITTER_MS: u64 = 2000;

/// Largest exponent used by the backoff calculation; larger attempts saturate
pub const BACKOFF_MAX_EXPONENT: u32 = 16;

/// Maximum number of response body bytes carried into error messages
pub const MAX_ERROR_BODY_LEN: usize = 512;

/// Admin API paths
pub const HEALTH_PATH: &str = "/health";
pub const DEPLOYMENTS_PATH: &str = "/deployments";
pub const LEGACY_ENDPOINTS_PATH: &str = "/endpoints";
pub const SERVICES_PATH: &str = "/services";
pub const QUERY_PATH: &str = "/query";
