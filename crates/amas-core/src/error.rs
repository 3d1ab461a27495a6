//! Engine error type.
//!
//! Most misuse of the engine is deliberately forgiving (an invalid neighbor
//! id is ignored, starting a locked scheduler is a no-op), so the fallible
//! surface is small: lookups by id and configuration validation.

use thiserror::Error;

use crate::AgentId;

/// The top-level error type for the `amas-*` crates.
#[derive(Debug, Error)]
pub enum AmasError {
    #[error("agent {0} is not a member of this system")]
    UnknownAgent(AgentId),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Shorthand result type for all `amas-*` crates.
pub type AmasResult<T> = Result<T, AmasError>;
