//! Errors surfaced by repository operations.
//!
//! Store failures never appear here: they are logged and answered with the
//! operation's empty default. Only mapping mistakes and cancellation reach
//! the caller.

use thiserror::Error;

use navrepo_core::ConfigurationError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("operation cancelled")]
    Cancelled,
}
