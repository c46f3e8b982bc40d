// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command journal for replication and replay.
//!
//! The journal records every command the session accepted, in order. Sync
//! peers read new entries with [`CommandJournal::since`] and replay them
//! through their own session; since timeline commands are deterministic, both
//! ends reach the same snapshot.

use crate::error::Result;
use keyline_timeline::{Command, Timeline};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One accepted command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Monotonic sequence number, starting at 1
    pub sequence: u64,
    /// The command as applied
    pub command: Command,
}

/// Bounded log of accepted commands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandJournal {
    entries: VecDeque<JournalEntry>,
    next_sequence: u64,
    limit: usize,
}

impl CommandJournal {
    /// Create a journal keeping at most `limit` entries
    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            next_sequence: 1,
            limit,
        }
    }

    /// Append a command, returning its sequence number
    pub fn record(&mut self, command: Command) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.entries.push_back(JournalEntry { sequence, command });

        while self.entries.len() > self.limit {
            if let Some(dropped) = self.entries.pop_front() {
                tracing::trace!(sequence = dropped.sequence, "Journal entry dropped");
            }
        }
        sequence
    }

    /// All retained entries, oldest first
    pub fn entries(&self) -> impl Iterator<Item = &JournalEntry> {
        self.entries.iter()
    }

    /// Entries recorded after `sequence`
    pub fn since(&self, sequence: u64) -> impl Iterator<Item = &JournalEntry> {
        self.entries.iter().filter(move |e| e.sequence > sequence)
    }

    /// Sequence number of the newest entry, 0 if none was ever recorded
    pub fn last_sequence(&self) -> u64 {
        self.next_sequence.saturating_sub(1)
    }

    /// Get retained entry count
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are retained
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all entries; sequence numbers keep counting
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Serialize to RON
    pub fn to_ron(&self) -> Result<String> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Deserialize from RON
    ///
    /// The sequence counter is moved past the newest entry if the file holds
    /// a stale one.
    pub fn from_ron(source: &str) -> Result<Self> {
        let mut journal: Self = ron::from_str(source)?;
        let newest = journal.entries.back().map_or(0, |e| e.sequence);
        let floor = newest.saturating_add(1);
        if journal.next_sequence < floor {
            tracing::warn!(
                next_sequence = journal.next_sequence,
                newest,
                "Journal sequence counter behind its entries"
            );
            journal.next_sequence = floor;
        }
        Ok(journal)
    }
}

impl Default for CommandJournal {
    fn default() -> Self {
        Self::with_limit(crate::config::DEFAULT_JOURNAL_LIMIT)
    }
}

/// Re-apply journal entries on top of a base timeline
///
/// Stops at the first rejected command.
pub fn replay<'a>(
    base: &Timeline,
    entries: impl IntoIterator<Item = &'a JournalEntry>,
) -> Result<Timeline> {
    let mut timeline = base.clone();
    for entry in entries {
        timeline = timeline.apply(&entry.command)?.timeline;
    }
    Ok(timeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyline_timeline::{FlatTrack, KeyframeValue, SelectCommand, TrackType};

    fn commands() -> Vec<Command> {
        vec![
            Command::Initialize {
                flat_tracks: vec![
                    FlatTrack::new("Hips", "position", [(0, KeyframeValue::Vector3([0.0, 1.0, 0.0])), (12, KeyframeValue::Vector3([0.0, 1.2, 0.0]))]),
                    FlatTrack::new("Hips", "quaternion", [(12, KeyframeValue::Quaternion([0.0, 0.0, 0.0, 1.0]))]),
                ],
            },
            Command::Select(SelectCommand::LeftClick {
                track_type: TrackType::Bone,
                track_number: 0,
                time: 12,
            }),
            Command::Move { time_diff: 6 },
        ]
    }

    #[test]
    fn test_record_sequences() {
        let mut journal = CommandJournal::with_limit(10);
        assert_eq!(journal.last_sequence(), 0);
        assert_eq!(journal.record(Command::Clear), 1);
        assert_eq!(journal.record(Command::Copy), 2);
        assert_eq!(journal.len(), 2);

        let newer: Vec<_> = journal.since(1).map(|e| e.sequence).collect();
        assert_eq!(newer, vec![2]);
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut journal = CommandJournal::with_limit(2);
        for _ in 0..5 {
            journal.record(Command::Delete);
        }
        let kept: Vec<_> = journal.entries().map(|e| e.sequence).collect();
        assert_eq!(kept, vec![4, 5]);
        assert_eq!(journal.last_sequence(), 5);

        journal.clear();
        assert!(journal.is_empty());
        assert_eq!(journal.record(Command::Delete), 6);
    }

    #[test]
    fn test_replay_matches_direct_application() {
        let mut journal = CommandJournal::default();
        let mut direct = Timeline::new();
        for command in commands() {
            direct = direct.apply(&command).unwrap().timeline;
            journal.record(command);
        }

        let replayed = replay(&Timeline::new(), journal.entries()).unwrap();
        assert_eq!(replayed, direct);
        assert_eq!(
            bincode::serialize(&replayed.snapshot()).unwrap(),
            bincode::serialize(&direct.snapshot()).unwrap()
        );
    }

    #[test]
    fn test_ron_round_trip() {
        let mut journal = CommandJournal::with_limit(8);
        for command in commands() {
            journal.record(command);
        }
        let ron = journal.to_ron().unwrap();
        let loaded = CommandJournal::from_ron(&ron).unwrap();
        assert_eq!(loaded, journal);
    }

    #[test]
    fn test_stale_sequence_counter_is_repaired() {
        let empty = CommandJournal::from_ron("(entries: [], next_sequence: 0, limit: 4)").unwrap();
        assert_eq!(empty.last_sequence(), 0);

        let mut journal = CommandJournal::from_ron(
            "(entries: [(sequence: 7, command: Clear)], next_sequence: 0, limit: 4)",
        )
        .unwrap();
        assert_eq!(journal.last_sequence(), 7);
        assert_eq!(journal.record(Command::Copy), 8);
    }

    #[test]
    fn test_replay_stops_on_rejected_command() {
        let mut journal = CommandJournal::default();
        journal.record(Command::Paste { target_time: 4 });
        assert!(replay(&Timeline::new(), journal.entries()).is_err());
    }
}
