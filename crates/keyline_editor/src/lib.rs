// SPDX-License-Identifier: MIT OR Apache-2.0
//! Host side of the Keyline timeline engine.
//!
//! - Serial command dispatch ([`TimelineSession`])
//! - Command journal for sync peers and replay
//! - RON session configuration

pub mod config;
pub mod error;
pub mod journal;
pub mod session;

pub use config::{SessionConfig, CONFIG_FILE_NAME, DEFAULT_JOURNAL_LIMIT};
pub use error::{Result, SessionError};
pub use journal::{replay, CommandJournal, JournalEntry};
pub use session::TimelineSession;
