//! # Configuration
//!
//! Registrar-level settings loaded from environment variables.
//!
//! - `registrar`: retry budgets, platform limits and logging options

pub mod registrar;

pub use registrar::RegistrarConfig;
