//! Service Registrar Library
//!
//! Registers Lambda service handlers with a durable-execution runtime in
//! response to infrastructure-change events, keeps service visibility in
//! line with the desired state and prunes drained deployments.
//! Tests are included in the module files.

pub mod config;
pub mod constants;
pub mod controller;
pub mod event;
pub mod observability;
pub mod secrets;
pub mod transport;
