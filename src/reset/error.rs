//! Error types for the reset engine
//!
//! This module defines the errors that can occur while deciding on and
//! applying a reset.

use crate::world::PlayerHandle;
use thiserror::Error;

/// Errors that can occur during reset operations
#[derive(Debug, Error)]
pub enum ResetError {
    /// A precondition on an argument was violated
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The world does not know this player
    #[error("Player not found: {0}")]
    PlayerNotFound(PlayerHandle),

    /// The character rebuild failed
    #[error("Failed to apply decision: {0}")]
    ApplyFailed(String),

    /// Generic error
    #[error("Reset error: {0}")]
    Other(String),
}

/// Convert a string into a `ResetError`
impl From<String> for ResetError {
    fn from(message: String) -> Self {
        Self::Other(message)
    }
}

/// Result type for reset operations
pub type ResetResult<T> = Result<T, ResetError>;
