// SPDX-License-Identifier: MIT OR Apache-2.0
//! Serial command dispatch for one timeline.
//!
//! All edits, local or from a remote peer, go through one FIFO queue, so two
//! commands never interleave. A command is committed only if the engine
//! accepts it (and, when configured, the result passes invariant checks);
//! otherwise the timeline is left exactly as it was.

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::journal::CommandJournal;
use keyline_timeline::{Command, KeyframeUpdate, Snapshot, Timeline};
use std::collections::VecDeque;

/// Timeline editing session
#[derive(Debug)]
pub struct TimelineSession {
    timeline: Timeline,
    queue: VecDeque<Command>,
    journal: CommandJournal,
    config: SessionConfig,
    highlight_reset_pending: bool,
    last_touched: Vec<KeyframeUpdate>,
}

impl TimelineSession {
    /// Create a session with an empty timeline
    pub fn new(config: SessionConfig) -> Self {
        Self {
            timeline: Timeline::new().with_starting_track_number(config.starting_track_number),
            queue: VecDeque::new(),
            journal: CommandJournal::with_limit(config.journal_limit),
            config,
            highlight_reset_pending: false,
            last_touched: Vec::new(),
        }
    }

    /// The current timeline
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// The journal of accepted commands
    pub fn journal(&self) -> &CommandJournal {
        &self.journal
    }

    /// The session settings
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Property keyframes touched by the last accepted command
    pub fn last_touched(&self) -> &[KeyframeUpdate] {
        &self.last_touched
    }

    /// Number of queued commands
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Queue a command
    pub fn submit(&mut self, command: Command) {
        self.queue.push_back(command);
    }

    /// Apply queued commands in order
    ///
    /// Returns the number of commands accepted. With `reject_invalid` set, the
    /// first rejected command is dropped, the rest stay queued and its error
    /// is returned; otherwise rejected commands are logged and skipped.
    pub fn flush(&mut self) -> Result<usize> {
        let mut accepted = 0;
        while let Some(command) = self.queue.pop_front() {
            match self.apply(command) {
                Ok(()) => accepted += 1,
                Err(e) if self.config.reject_invalid => return Err(e),
                Err(e) => tracing::warn!("Skipping rejected command: {}", e),
            }
        }
        Ok(accepted)
    }

    /// Queue a command and flush the queue
    pub fn dispatch(&mut self, command: Command) -> Result<usize> {
        self.submit(command);
        self.flush()
    }

    fn apply(&mut self, command: Command) -> Result<()> {
        let name = command.name();
        let transition = match self.timeline.apply(&command) {
            Ok(transition) => transition,
            Err(e) => {
                tracing::warn!(command = name, "Command rejected: {}", e);
                return Err(SessionError::Timeline(e));
            }
        };

        if self.config.validate_invariants {
            if let Err(e) = transition.timeline.validate() {
                tracing::error!(command = name, "Command broke timeline invariants: {}", e);
                return Err(SessionError::Timeline(e));
            }
        }

        self.timeline = transition.timeline;
        self.highlight_reset_pending |= transition.reset_highlight;
        self.last_touched = transition.touched;
        let sequence = self.journal.record(command);
        tracing::debug!(
            command = name,
            sequence,
            touched = self.last_touched.len(),
            selected = self.timeline.selection().len(),
            "Command applied"
        );
        Ok(())
    }

    /// Take the pending highlight-reset signal for the view
    pub fn take_highlight_reset(&mut self) -> bool {
        std::mem::take(&mut self.highlight_reset_pending)
    }

    /// Copy out the current snapshot
    pub fn snapshot(&self) -> Snapshot {
        self.timeline.snapshot()
    }

    /// Binary encoding of the current snapshot, for cross-peer comparison
    pub fn fingerprint(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&self.snapshot())?)
    }
}

impl Default for TimelineSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}
