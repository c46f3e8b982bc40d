// SPDX-License-Identifier: MIT OR Apache-2.0
//! Session errors.

use keyline_timeline::TimelineError;
use thiserror::Error;

/// Errors raised by the editor session
#[derive(Debug, Error)]
pub enum SessionError {
    /// Command rejected by the timeline engine
    #[error("Timeline error: {0}")]
    Timeline(#[from] TimelineError),

    /// RON parse error
    #[error("RON parse error: {0}")]
    RonParse(#[from] ron::error::SpannedError),

    /// RON serialization error
    #[error("RON serialization error: {0}")]
    RonSerialize(#[from] ron::Error),

    /// Binary serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// File system error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;
