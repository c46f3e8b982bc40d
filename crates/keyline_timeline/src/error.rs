// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for timeline operations.

use thiserror::Error;

/// Timeline engine errors
///
/// Missing tracks or times are never reported here: they contribute nothing
/// to the operation and are skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimelineError {
    /// Malformed input payload
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An operation would place a keyframe before frame zero
    #[error("Frame {frame} is negative")]
    NegativeFrame {
        /// The offending frame
        frame: i64,
    },

    /// Paste was requested with nothing on the clipboard
    #[error("Clipboard holds no property keyframes")]
    EmptyClipboard,

    /// Move was requested with a zero time difference
    #[error("Move requires a non-zero time difference")]
    ZeroTimeDiff,

    /// Store invariant broken (a programming error)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

/// Result type for timeline operations
pub type Result<T> = std::result::Result<T, TimelineError>;
