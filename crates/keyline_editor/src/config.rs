// SPDX-License-Identifier: MIT OR Apache-2.0
//! Session configuration.
//!
//! Stored as RON next to the scripts or projects that use it.

use crate::error::Result;
use keyline_timeline::TrackNumber;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "keyline.ron";

/// Default number of commands kept in the journal
pub const DEFAULT_JOURNAL_LIMIT: usize = 1024;

/// Editor session settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// First bone number handed out when tracks are built
    pub starting_track_number: TrackNumber,
    /// Check store invariants after every command
    pub validate_invariants: bool,
    /// Commands kept in the journal before the oldest are dropped
    pub journal_limit: usize,
    /// Fail on rejected commands instead of skipping them
    pub reject_invalid: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            starting_track_number: 0,
            validate_invariants: cfg!(debug_assertions),
            journal_limit: DEFAULT_JOURNAL_LIMIT,
            reject_invalid: true,
        }
    }
}

impl SessionConfig {
    /// Load settings from a RON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = ron::from_str(&content)?;
        tracing::debug!("Loaded session config from {:?}", path);
        Ok(config)
    }

    /// Save settings to a RON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let pretty = ron::ser::PrettyConfig::default().struct_names(true);
        let content = ron::ser::to_string_pretty(self, pretty)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
