// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframe selection.
//!
//! Selection lives in two places that must agree: the `is_selected` flag on
//! each keyframe and the per-track [`ClusteredKeyframe`] lists of a
//! [`Selection`]. Every command here computes a target set of
//! [`KeyframeRef`]s and then [`materialize`]s it, which rewrites the flags and
//! rebuilds the lists from them in one pass.
//!
//! Selecting an ancestor keyframe always selects its live descendants at the
//! same frame: a bone keyframe pulls in its properties, the layer keyframe
//! pulls in every bone and property.

use crate::edit::Edit;
use crate::error::{Result, TimelineError};
use crate::hierarchy::TrackSlot;
use crate::keyframe::{Frame, KeyframeValue};
use crate::store::KeyframeStore;
use crate::track::{Track, TrackNumber, TrackType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Reference to one keyframe by track number and frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyframeRef {
    /// Track number
    pub track_number: TrackNumber,
    /// Frame
    pub time: Frame,
}

impl KeyframeRef {
    /// Create a new keyframe reference
    pub fn new(track_number: TrackNumber, time: Frame) -> Self {
        Self { track_number, time }
    }
}

/// A selected keyframe inside a cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedKeyframe {
    /// Frame
    pub time: Frame,
    /// Value (property tracks only)
    pub value: Option<KeyframeValue>,
}

/// Selected keyframes of one track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteredKeyframe {
    /// Track id
    pub track_id: String,
    /// Track number
    pub track_number: TrackNumber,
    /// Hierarchy level
    pub track_type: TrackType,
    /// Owning bone number for properties
    pub parent_track_number: TrackNumber,
    /// Selected keyframes, ascending by frame
    pub keyframes: Vec<SelectedKeyframe>,
}

impl ClusteredKeyframe {
    fn from_track(track: &Track) -> Option<Self> {
        let keyframes: Vec<_> = track
            .keyframes()
            .iter()
            .filter(|k| k.is_selected)
            .map(|k| SelectedKeyframe {
                time: k.time,
                value: k.value,
            })
            .collect();
        if keyframes.is_empty() {
            return None;
        }
        Some(Self {
            track_id: track.track_id.clone(),
            track_number: track.track_number,
            track_type: track.track_type,
            parent_track_number: track.parent_track_number,
            keyframes,
        })
    }

    /// Frames of this cluster
    pub fn times(&self) -> impl Iterator<Item = Frame> + '_ {
        self.keyframes.iter().map(|k| k.time)
    }
}

/// Normalized selection, one cluster per track with a selected keyframe
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Selected layer keyframes
    pub selected_layer: Option<ClusteredKeyframe>,
    /// Selected bone keyframes, in bone track order
    pub selected_bone: Vec<ClusteredKeyframe>,
    /// Selected property keyframes, in property track order
    pub selected_property: Vec<ClusteredKeyframe>,
}

impl Selection {
    /// Create an empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the selection from the keyframe flags of a store
    pub fn from_store(store: &KeyframeStore) -> Self {
        Self {
            selected_layer: ClusteredKeyframe::from_track(store.layer_track()),
            selected_bone: store
                .bone_tracks()
                .iter()
                .filter_map(ClusteredKeyframe::from_track)
                .collect(),
            selected_property: store
                .property_tracks()
                .iter()
                .filter_map(ClusteredKeyframe::from_track)
                .collect(),
        }
    }

    /// Iterate all clusters, layer first
    pub fn clusters(&self) -> impl Iterator<Item = &ClusteredKeyframe> {
        self.selected_layer
            .iter()
            .chain(&self.selected_bone)
            .chain(&self.selected_property)
    }

    /// Whether nothing is selected
    pub fn is_empty(&self) -> bool {
        self.clusters().all(|c| c.keyframes.is_empty())
    }

    /// Number of selected keyframes across all levels
    pub fn len(&self) -> usize {
        self.clusters().map(|c| c.keyframes.len()).sum()
    }

    /// All selected keyframes as references
    pub fn keys(&self) -> BTreeSet<KeyframeRef> {
        self.clusters()
            .flat_map(|c| c.times().map(move |time| KeyframeRef::new(c.track_number, time)))
            .collect()
    }

    /// Whether a keyframe is selected
    pub fn contains(&self, key: KeyframeRef) -> bool {
        self.clusters()
            .filter(|c| c.track_number == key.track_number)
            .any(|c| c.times().any(|t| t == key.time))
    }

    /// Check that this selection and the store's flags agree
    ///
    /// Flags are the reference: each track with a flagged keyframe must have
    /// exactly one cluster listing exactly those frames and values.
    pub fn validate_against(&self, store: &KeyframeStore) -> Result<()> {
        let expected = Self::from_store(store);
        if *self != expected {
            return Err(TimelineError::InvariantViolation(format!(
                "selection lists hold {} keyframes but {} are flagged",
                self.len(),
                expected.len()
            )));
        }
        Ok(())
    }
}

/// Selection command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SelectCommand {
    /// Select exactly one keyframe and its linked descendants
    LeftClick {
        /// Clicked track level
        track_type: TrackType,
        /// Clicked track number
        track_number: TrackNumber,
        /// Clicked frame
        time: Frame,
    },
    /// Toggle one keyframe and its linked descendants
    MultipleClick {
        /// Clicked track level
        track_type: TrackType,
        /// Clicked track number
        track_number: TrackNumber,
        /// Clicked frame
        time: Frame,
    },
    /// Select every live keyframe of one track
    Horizontal {
        /// Track level
        track_type: TrackType,
        /// Track number
        track_number: TrackNumber,
    },
    /// Select every live keyframe at one frame
    Vertical {
        /// Frame
        time: Frame,
    },
    /// Clear the selection
    UnselectAll,
    /// Select pre-filtered box hits
    DragBox {
        /// Hits inside the box
        points: Vec<KeyframeRef>,
    },
}

impl SelectCommand {
    /// Get the command name
    pub fn name(&self) -> &'static str {
        match self {
            Self::LeftClick { .. } => "LeftClick",
            Self::MultipleClick { .. } => "MultipleClick",
            Self::Horizontal { .. } => "Horizontal",
            Self::Vertical { .. } => "Vertical",
            Self::UnselectAll => "UnselectAll",
            Self::DragBox { .. } => "DragBox",
        }
    }
}

/// Run a selection command
pub fn select(store: &KeyframeStore, selection: &Selection, command: &SelectCommand) -> Edit {
    let target = match command {
        SelectCommand::LeftClick {
            track_type,
            track_number,
            time,
        } => {
            let mut keys = BTreeSet::new();
            if let Some(slot) = typed_slot(store, *track_type, *track_number) {
                collect_linked(store, slot, *time, &mut keys);
            }
            keys
        }
        SelectCommand::MultipleClick {
            track_type,
            track_number,
            time,
        } => {
            let mut current = selection.keys();
            let mut linked = BTreeSet::new();
            if let Some(slot) = typed_slot(store, *track_type, *track_number) {
                collect_linked(store, slot, *time, &mut linked);
            }
            if selection.contains(KeyframeRef::new(*track_number, *time)) {
                current.retain(|key| !linked.contains(key));
            } else {
                current.extend(linked);
            }
            current
        }
        SelectCommand::Horizontal {
            track_type,
            track_number,
        } => {
            let mut keys = BTreeSet::new();
            if let Some(slot) = typed_slot(store, *track_type, *track_number) {
                let times = store.track(slot).map(Track::present_times).unwrap_or_default();
                for time in times {
                    collect_linked(store, slot, time, &mut keys);
                }
            }
            keys
        }
        SelectCommand::Vertical { time } => store
            .tracks()
            .filter(|t| t.is_present_at(*time))
            .map(|t| KeyframeRef::new(t.track_number, *time))
            .collect(),
        SelectCommand::UnselectAll => BTreeSet::new(),
        SelectCommand::DragBox { points } => {
            let mut keys = BTreeSet::new();
            for point in points {
                match store.index().slot_by_number(point.track_number) {
                    Some(slot) => collect_linked(store, slot, point.time, &mut keys),
                    None => tracing::debug!(track_number = point.track_number, "Drag box hit on unknown track"),
                }
            }
            keys
        }
    };

    let (store, selection) = materialize(store, &target);
    tracing::debug!(command = command.name(), selected = selection.len(), "Selection updated");
    Edit::new(store, selection).with_highlight_reset()
}

/// Resolve a track number, requiring it to be of the given level
fn typed_slot(store: &KeyframeStore, track_type: TrackType, track_number: TrackNumber) -> Option<TrackSlot> {
    let slot = store.index().slot_by_number(track_number)?;
    if slot.track_type() != track_type {
        tracing::debug!(track_number, expected = track_type.name(), "Track level mismatch");
        return None;
    }
    Some(slot)
}

/// Collect a keyframe and its live descendants at the same frame
///
/// Contributes nothing if the keyframe itself is absent or deleted.
pub(crate) fn collect_linked(
    store: &KeyframeStore,
    slot: TrackSlot,
    time: Frame,
    out: &mut BTreeSet<KeyframeRef>,
) {
    let Some(track) = store.track(slot) else {
        return;
    };
    if !track.is_present_at(time) {
        return;
    }
    out.insert(KeyframeRef::new(track.track_number, time));

    match slot {
        TrackSlot::Layer => {
            for track in store.bone_tracks().iter().chain(store.property_tracks()) {
                if track.is_present_at(time) {
                    out.insert(KeyframeRef::new(track.track_number, time));
                }
            }
        }
        TrackSlot::Bone(_) => {
            for child in store.children_of(track.track_number) {
                if child.is_present_at(time) {
                    out.insert(KeyframeRef::new(child.track_number, time));
                }
            }
        }
        TrackSlot::Property(_) => {}
    }
}

/// Produce a store whose selection flags are exactly `keys`, and the matching
/// selection lists
///
/// References to missing tracks or deleted keyframes are dropped.
pub fn materialize(store: &KeyframeStore, keys: &BTreeSet<KeyframeRef>) -> (KeyframeStore, Selection) {
    let mut next = store.clone();
    next.clear_selection_flags();
    for key in keys {
        let Some(slot) = next.index().slot_by_number(key.track_number) else {
            continue;
        };
        if let Some(track) = next.track_mut(slot) {
            track.set_selected(key.time, true);
        }
    }
    let selection = Selection::from_store(&next);
    (next, selection)
}
