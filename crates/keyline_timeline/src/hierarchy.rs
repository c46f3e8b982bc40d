// SPDX-License-Identifier: MIT OR Apache-2.0
//! Track hierarchy derivation.
//!
//! Groups flat per-target animation tracks into bone and property tracks,
//! numbers them in dopesheet row order, and provides the parent/child lookups
//! the rest of the engine relies on.

use crate::error::{Result, TimelineError};
use crate::keyframe::{Frame, Keyframe, KeyframeValue};
use crate::track::{Track, TrackNumber, TrackType, NO_PARENT};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// One raw animation track: a single attribute of a single target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatTrack {
    /// Animated target (e.g. a skeletal joint name)
    pub target: String,
    /// Animated attribute (e.g. `position`, `quaternion`, `scale`)
    pub attribute: String,
    /// Keyframe frames
    pub times: Vec<Frame>,
    /// Keyframe values, parallel to `times`
    pub values: Vec<KeyframeValue>,
}

impl FlatTrack {
    /// Create a flat track from `(frame, value)` pairs
    pub fn new(
        target: impl Into<String>,
        attribute: impl Into<String>,
        keys: impl IntoIterator<Item = (Frame, KeyframeValue)>,
    ) -> Self {
        let (times, values) = keys.into_iter().unzip();
        Self {
            target: target.into(),
            attribute: attribute.into(),
            times,
            values,
        }
    }

    /// Track id of the property track built from this flat track
    pub fn property_track_id(&self) -> String {
        format!("{}.{}", self.target, self.attribute)
    }
}

/// Bone and property tracks built from flat tracks
#[derive(Debug, Clone, Default)]
pub struct BuiltTracks {
    /// One track per distinct target, in first-seen order
    pub bone_tracks: Vec<Track>,
    /// One track per flat track, grouped under their bones
    pub property_tracks: Vec<Track>,
}

fn next_track_number(current: TrackNumber) -> Result<TrackNumber> {
    current
        .checked_add(1)
        .ok_or_else(|| TimelineError::InvalidInput(format!("track numbers overflow after {current}")))
}

/// Build bone and property tracks from flat tracks.
///
/// Numbers come from one counter starting at `starting_track_number`: each
/// bone takes the next number and its properties follow it. Bone keyframes
/// are the union of their properties' frames.
pub fn build_tracks(flat_tracks: &[FlatTrack], starting_track_number: TrackNumber) -> Result<BuiltTracks> {
    if starting_track_number < 0 {
        return Err(TimelineError::InvalidInput(format!(
            "starting track number {starting_track_number} is negative"
        )));
    }

    let mut by_target: IndexMap<&str, Vec<&FlatTrack>> = IndexMap::new();
    let mut seen_ids = IndexSet::new();
    for flat in flat_tracks {
        validate_flat_track(flat)?;
        if !seen_ids.insert(flat.property_track_id()) {
            return Err(TimelineError::InvalidInput(format!(
                "duplicate track {}",
                flat.property_track_id()
            )));
        }
        by_target.entry(flat.target.as_str()).or_default().push(flat);
    }

    let mut built = BuiltTracks::default();
    let mut next_number = starting_track_number;
    for (target, flats) in by_target {
        let bone_number = next_number;
        next_number = next_track_number(next_number)?;

        let mut bone = Track::new(target, TrackType::Bone, bone_number, NO_PARENT);
        for flat in flats {
            let mut property = Track::new(
                flat.property_track_id(),
                TrackType::Property,
                next_number,
                bone_number,
            );
            next_number = next_track_number(next_number)?;

            property.extend_keyframes(
                flat.times
                    .iter()
                    .zip(&flat.values)
                    .map(|(&time, &value)| Keyframe::new(time, Some(value))),
            );
            bone.extend_keyframes(flat.times.iter().map(|&time| Keyframe::marker(time)));
            built.property_tracks.push(property);
        }
        built.bone_tracks.push(bone);
    }

    Ok(built)
}

fn validate_flat_track(flat: &FlatTrack) -> Result<()> {
    if flat.times.len() != flat.values.len() {
        return Err(TimelineError::InvalidInput(format!(
            "track {} has {} frames but {} values",
            flat.property_track_id(),
            flat.times.len(),
            flat.values.len()
        )));
    }
    let mut frames = IndexSet::with_capacity(flat.times.len());
    for &time in &flat.times {
        if !frames.insert(time) {
            return Err(TimelineError::InvalidInput(format!(
                "track {} repeats frame {time}",
                flat.property_track_id()
            )));
        }
    }
    Ok(())
}

/// Find every property track owned by a bone number
///
/// An unknown bone number yields an empty list.
pub fn find_children(bone_number: TrackNumber, property_tracks: &[Track]) -> Vec<&Track> {
    property_tracks
        .iter()
        .filter(|t| t.parent_track_number == bone_number)
        .collect()
}

/// Find the bone number that owns a property track
pub fn find_owner(property_track: &Track) -> TrackNumber {
    property_track.parent_track_number
}

/// Position of a track inside a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackSlot {
    /// The layer track
    Layer,
    /// Index into the bone track list
    Bone(usize),
    /// Index into the property track list
    Property(usize),
}

impl TrackSlot {
    /// Hierarchy level of this slot
    pub fn track_type(&self) -> TrackType {
        match self {
            Self::Layer => TrackType::Layer,
            Self::Bone(_) => TrackType::Bone,
            Self::Property(_) => TrackType::Property,
        }
    }
}

/// Lookup index over a store's track lists
///
/// Rebuilt whenever the track lists are replaced; never serialized.
#[derive(Debug, Clone, Default)]
pub struct TrackIndex {
    by_id: IndexMap<String, TrackSlot>,
    by_number: IndexMap<TrackNumber, TrackSlot>,
    children: IndexMap<TrackNumber, Vec<usize>>,
}

impl TrackIndex {
    /// Build an index over the given tracks
    pub fn build(layer: &Track, bone_tracks: &[Track], property_tracks: &[Track]) -> Self {
        let mut index = Self::default();
        index.by_id.insert(layer.track_id.clone(), TrackSlot::Layer);
        index.by_number.insert(layer.track_number, TrackSlot::Layer);

        for (i, bone) in bone_tracks.iter().enumerate() {
            index.by_id.insert(bone.track_id.clone(), TrackSlot::Bone(i));
            index.by_number.insert(bone.track_number, TrackSlot::Bone(i));
            index.children.entry(bone.track_number).or_default();
        }
        for (i, property) in property_tracks.iter().enumerate() {
            index.by_id.insert(property.track_id.clone(), TrackSlot::Property(i));
            index.by_number.insert(property.track_number, TrackSlot::Property(i));
            index
                .children
                .entry(property.parent_track_number)
                .or_default()
                .push(i);
        }
        index
    }

    /// Look up a track by id
    pub fn slot_by_id(&self, track_id: &str) -> Option<TrackSlot> {
        self.by_id.get(track_id).copied()
    }

    /// Look up a track by number
    pub fn slot_by_number(&self, track_number: TrackNumber) -> Option<TrackSlot> {
        self.by_number.get(&track_number).copied()
    }

    /// Property track indices owned by a bone number
    pub fn children_of(&self, bone_number: TrackNumber) -> &[usize] {
        self.children.get(&bone_number).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Bone index for a bone number
    pub fn bone_index(&self, bone_number: TrackNumber) -> Option<usize> {
        match self.slot_by_number(bone_number)? {
            TrackSlot::Bone(i) => Some(i),
            _ => None,
        }
    }
}
