//! # Controller
//!
//! Core modules of the service registrar.
//!
//! - `backoff`: Randomized exponential backoff and the sleep abstraction
//! - `retry`: Bounded retry state machine shared by the health prober and registrar
//! - `reconciler`: Registration, visibility, pruning and teardown phases

pub mod backoff;
pub mod reconciler;
pub mod retry;
