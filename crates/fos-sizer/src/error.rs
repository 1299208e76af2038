//! Sizer errors.

use thiserror::Error;

/// Contract violations reported by the fallible scope operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SizerError {
    #[error("Scope stack overflow: depth {depth} exceeds limit {limit} while pushing '{name}'")]
    ScopeOverflow {
        name: String,
        depth: usize,
        limit: usize,
    },

    #[error("Scope stack underflow: pop called with only the root scope active")]
    ScopeUnderflow,
}
