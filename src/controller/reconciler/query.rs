//! # Introspection Queries
//!
//! SQL sent to the runtime's `/query` endpoint.
//!
//! Tables used:
//! - `sys_deployment` (`id`, `endpoint`, `created_at`)
//! - `sys_service` (`name`, `deployment_id`)
//! - `sys_invocation_status` (`pinned_deployment_id`, `status`)

use serde::Deserialize;

/// Terminal invocation status; anything else still pins its deployment
pub const TERMINAL_INVOCATION_STATUS: &str = "completed";

/// Row shape returned by both deployment queries
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeploymentRow {
    pub id: String,
}

/// Quote a string literal for embedding in a query
#[must_use]
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Drained deployments, newest first, after skipping `history` and capped at `limit`
///
/// A deployment is drained when no service points at it and no invocation in
/// a non-terminal state is pinned to it. `exclude_id` is never returned.
#[must_use]
pub fn drained_deployments(exclude_id: &str, history: u32, limit: u32) -> String {
    format!(
        "SELECT d.id AS id, d.created_at AS created_at FROM sys_deployment d \
         WHERE d.id NOT IN (SELECT s.deployment_id FROM sys_service s \
         WHERE s.deployment_id IS NOT NULL) \
         AND d.id NOT IN (SELECT i.pinned_deployment_id FROM sys_invocation_status i \
         WHERE i.pinned_deployment_id IS NOT NULL AND i.status != {terminal}) \
         AND d.id != {exclude} \
         ORDER BY d.created_at DESC \
         LIMIT {limit} OFFSET {history}",
        terminal = quote_literal(TERMINAL_INVOCATION_STATUS),
        exclude = quote_literal(exclude_id),
    )
}

/// Every deployment registered for `handler_arn`, regardless of state
#[must_use]
pub fn deployments_for_handler(handler_arn: &str) -> String {
    format!(
        "SELECT id FROM sys_deployment WHERE endpoint = {}",
        quote_literal(handler_arn)
    )
}
