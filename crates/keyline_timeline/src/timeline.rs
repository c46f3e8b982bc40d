// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline state and its command surface.
//!
//! A [`Timeline`] bundles the keyframe store, the current selection and the
//! clipboard. [`Timeline::apply`] is a pure step from one timeline to the next:
//! identical command sequences from identical timelines give identical results.

use crate::clipboard::{copy, paste, Clipboard};
use crate::edit::{add, delete, Edit};
use crate::error::Result;
use crate::hierarchy::FlatTrack;
use crate::keyframe::{Frame, KeyframeUpdate};
use crate::movement::move_selection;
use crate::selection::{select, ClusteredKeyframe, SelectCommand, Selection};
use crate::store::KeyframeStore;
use crate::track::{Track, TrackNumber};
use serde::{Deserialize, Serialize};

/// Timeline command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Rebuild every track from flat animation tracks
    Initialize {
        /// One track per animated target attribute
        flat_tracks: Vec<FlatTrack>,
    },
    /// Drop all tracks
    Clear,
    /// Change the selection
    Select(SelectCommand),
    /// Write property keyframes
    Add {
        /// Keyframes to write
        updates: Vec<KeyframeUpdate>,
    },
    /// Delete the selected property keyframes
    Delete,
    /// Copy the selection to the clipboard
    Copy,
    /// Paste the clipboard at a frame
    Paste {
        /// Frame for the earliest copied keyframe
        target_time: Frame,
    },
    /// Shift the selection in time
    Move {
        /// Frames to shift by
        time_diff: i64,
    },
}

impl Command {
    /// Get the command name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initialize { .. } => "Initialize",
            Self::Clear => "Clear",
            Self::Select(command) => command.name(),
            Self::Add { .. } => "Add",
            Self::Delete => "Delete",
            Self::Copy => "Copy",
            Self::Paste { .. } => "Paste",
            Self::Move { .. } => "Move",
        }
    }
}

/// Read-only view of the tracks and selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Layer track
    pub layer_track: Track,
    /// Bone tracks
    pub bone_tracks: Vec<Track>,
    /// Property tracks
    pub property_tracks: Vec<Track>,
    /// Selected layer keyframes
    pub selected_layer: Option<ClusteredKeyframe>,
    /// Selected bone keyframes
    pub selected_bone: Vec<ClusteredKeyframe>,
    /// Selected property keyframes
    pub selected_property: Vec<ClusteredKeyframe>,
}

/// Store, selection and clipboard of one editing session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    store: KeyframeStore,
    selection: Selection,
    clipboard: Clipboard,
    starting_track_number: TrackNumber,
}

/// A timeline after one command, plus what the command did
#[derive(Debug, Clone)]
pub struct Transition {
    /// The new timeline
    pub timeline: Timeline,
    /// Property keyframes written or removed
    pub touched: Vec<KeyframeUpdate>,
    /// Whether the view should drop transient selection highlights
    pub reset_highlight: bool,
}

impl Timeline {
    /// Create an empty timeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the first bone number handed out by `Initialize`
    pub fn with_starting_track_number(mut self, starting_track_number: TrackNumber) -> Self {
        self.starting_track_number = starting_track_number;
        self
    }

    /// The keyframe store
    pub fn store(&self) -> &KeyframeStore {
        &self.store
    }

    /// The current selection
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// The clipboard
    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    /// Apply one command, returning the next timeline
    ///
    /// On error the receiver is untouched and no partial result exists.
    pub fn apply(&self, command: &Command) -> Result<Transition> {
        let edit = match command {
            Command::Initialize { flat_tracks } => {
                let store = KeyframeStore::initialize(flat_tracks, self.starting_track_number)?;
                Edit::new(store, Selection::new()).with_highlight_reset()
            }
            Command::Clear => {
                tracing::info!("Timeline cleared");
                Edit::new(KeyframeStore::clear(), Selection::new()).with_highlight_reset()
            }
            Command::Select(select_command) => select(&self.store, &self.selection, select_command),
            Command::Add { updates } => add(&self.store, updates),
            Command::Delete => delete(&self.store, &self.selection),
            Command::Copy => {
                let mut next = self.clone();
                next.clipboard = copy(&self.selection);
                return Ok(Transition {
                    timeline: next,
                    touched: Vec::new(),
                    reset_highlight: false,
                });
            }
            Command::Paste { target_time } => paste(&self.store, &self.clipboard, *target_time)?,
            Command::Move { time_diff } => move_selection(&self.store, &self.selection, *time_diff)?,
        };

        Ok(Transition {
            timeline: Timeline {
                store: edit.store,
                selection: edit.selection,
                clipboard: self.clipboard.clone(),
                starting_track_number: self.starting_track_number,
            },
            touched: edit.touched,
            reset_highlight: edit.reset_highlight,
        })
    }

    /// Copy out the read-only snapshot
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            layer_track: self.store.layer_track().clone(),
            bone_tracks: self.store.bone_tracks().to_vec(),
            property_tracks: self.store.property_tracks().to_vec(),
            selected_layer: self.selection.selected_layer.clone(),
            selected_bone: self.selection.selected_bone.clone(),
            selected_property: self.selection.selected_property.clone(),
        }
    }

    /// Check store invariants and selection/flag agreement
    pub fn validate(&self) -> Result<()> {
        self.store.validate()?;
        self.selection.validate_against(&self.store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TimelineError;
    use crate::keyframe::KeyframeValue;
    use crate::selection::KeyframeRef;
    use crate::track::TrackType;

    fn vec3(x: f32) -> KeyframeValue {
        KeyframeValue::Vector3([x, x, x])
    }

    fn flat_tracks() -> Vec<FlatTrack> {
        vec![
            FlatTrack::new("Hips", "position", [(0, vec3(0.0)), (10, vec3(1.0)), (20, vec3(2.0))]),
            FlatTrack::new("Hips", "quaternion", [(10, KeyframeValue::Quaternion([0.0, 0.0, 0.0, 1.0]))]),
            FlatTrack::new("Head", "scale", [(5, vec3(1.0)), (15, vec3(1.5))]),
        ]
    }

    fn script() -> Vec<Command> {
        vec![
            Command::Initialize { flat_tracks: flat_tracks() },
            Command::Select(SelectCommand::Horizontal {
                track_type: TrackType::Bone,
                track_number: 0,
            }),
            Command::Copy,
            Command::Paste { target_time: 40 },
            Command::Move { time_diff: 3 },
            Command::Select(SelectCommand::DragBox {
                points: vec![KeyframeRef::new(3, 5), KeyframeRef::new(4, 15)],
            }),
            Command::Delete,
            Command::Add {
                updates: vec![KeyframeUpdate::new("Head.scale", 5, vec3(9.0))],
            },
            Command::Select(SelectCommand::Vertical { time: 10 }),
        ]
    }

    fn run(commands: &[Command]) -> Timeline {
        let mut timeline = Timeline::new();
        for command in commands {
            timeline = timeline.apply(command).unwrap().timeline;
            timeline.validate().unwrap();
        }
        timeline
    }

    #[test]
    fn test_script_keeps_invariants() {
        let timeline = run(&script());
        let store = timeline.store();

        let position = store.track_by_id("Hips.position").unwrap();
        assert_eq!(position.present_times(), vec![0, 10, 20, 43, 53, 63]);
        assert_eq!(position.keyframe_at(63).unwrap().value, Some(vec3(2.0)));

        let head = store.track_by_id("Head.scale").unwrap();
        assert_eq!(head.present_times(), vec![5]);
        assert_eq!(head.keyframe_at(5).unwrap().value, Some(vec3(9.0)));
        assert!(!store.track_by_id("Head").unwrap().is_present_at(15));

        assert_eq!(timeline.selection().len(), 4);
    }

    #[test]
    fn test_replay_is_byte_identical() {
        let first = bincode::serialize(&run(&script()).snapshot()).unwrap();
        let second = bincode::serialize(&run(&script()).snapshot()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_copy_leaves_store_untouched() {
        let timeline = run(&script()[..2]);
        let transition = timeline.apply(&Command::Copy).unwrap();
        assert_eq!(transition.timeline.store(), timeline.store());
        assert_eq!(transition.timeline.selection(), timeline.selection());
        assert!(!transition.reset_highlight);
        assert_eq!(transition.timeline.clipboard().anchor(), Some(0));
    }

    #[test]
    fn test_clipboard_survives_clear_and_initialize() {
        let timeline = run(&script()[..3]);
        let cleared = timeline.apply(&Command::Clear).unwrap().timeline;
        assert!(cleared.store().is_empty());
        assert_eq!(cleared.clipboard(), timeline.clipboard());

        let reloaded = cleared
            .apply(&Command::Initialize { flat_tracks: flat_tracks() })
            .unwrap()
            .timeline;
        let pasted = reloaded.apply(&Command::Paste { target_time: 100 }).unwrap();
        assert_eq!(pasted.touched.len(), 4);
        pasted.timeline.validate().unwrap();
    }

    #[test]
    fn test_rejected_command_leaves_timeline() {
        let timeline = run(&script()[..2]);
        let before = timeline.clone();
        assert_eq!(
            timeline.apply(&Command::Move { time_diff: 0 }).unwrap_err(),
            TimelineError::ZeroTimeDiff
        );
        assert!(timeline.apply(&Command::Paste { target_time: 1 }).is_err());
        assert_eq!(timeline, before);
    }

    #[test]
    fn test_starting_track_number() {
        let timeline = Timeline::new()
            .with_starting_track_number(10)
            .apply(&Command::Initialize { flat_tracks: flat_tracks() })
            .unwrap()
            .timeline;
        assert_eq!(timeline.store().track_by_id("Hips").unwrap().track_number, 10);
        assert_eq!(timeline.store().track_by_id("Head.scale").unwrap().track_number, 14);
    }

    #[test]
    fn test_snapshot_mirrors_state() {
        let timeline = run(&script());
        let snapshot = timeline.snapshot();
        assert_eq!(&snapshot.layer_track, timeline.store().layer_track());
        assert_eq!(snapshot.selected_property, timeline.selection().selected_property);

        let ron = ron::to_string(&snapshot).unwrap();
        let loaded: Snapshot = ron::from_str(&ron).unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn test_command_serialization() {
        for command in script() {
            let ron = ron::to_string(&command).unwrap();
            let loaded: Command = ron::from_str(&ron).unwrap();
            assert_eq!(loaded, command);
        }
    }
}
