// SPDX-License-Identifier: MIT OR Apache-2.0
//! Three-level keyframe store.
//!
//! The store holds one layer track, one bone track per animated target and one
//! property track per animated attribute. Only property keyframes carry
//! values; bone and layer keyframe presence is derived from them (see
//! [`crate::cascade`]).

use crate::error::{Result, TimelineError};
use crate::hierarchy::{build_tracks, FlatTrack, TrackIndex, TrackSlot};
use crate::keyframe::{Frame, Keyframe};
use crate::track::{Track, TrackNumber, LAYER_TRACK_NUMBER, NO_PARENT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Snapshot of all timeline tracks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "StoreParts")]
pub struct KeyframeStore {
    layer_track: Track,
    bone_tracks: Vec<Track>,
    property_tracks: Vec<Track>,
    #[serde(skip)]
    index: TrackIndex,
}

#[derive(Deserialize)]
struct StoreParts {
    layer_track: Track,
    bone_tracks: Vec<Track>,
    property_tracks: Vec<Track>,
}

impl From<StoreParts> for KeyframeStore {
    fn from(parts: StoreParts) -> Self {
        Self::from_tracks(parts.layer_track, parts.bone_tracks, parts.property_tracks)
    }
}

impl PartialEq for KeyframeStore {
    fn eq(&self, other: &Self) -> bool {
        self.layer_track == other.layer_track
            && self.bone_tracks == other.bone_tracks
            && self.property_tracks == other.property_tracks
    }
}

impl KeyframeStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::from_tracks(Track::layer(), Vec::new(), Vec::new())
    }

    fn from_tracks(layer_track: Track, bone_tracks: Vec<Track>, property_tracks: Vec<Track>) -> Self {
        let index = TrackIndex::build(&layer_track, &bone_tracks, &property_tracks);
        Self {
            layer_track,
            bone_tracks,
            property_tracks,
            index,
        }
    }

    /// Build a store from flat animation tracks
    ///
    /// The layer track gets a keyframe at every frame any bone has one.
    /// Zero input tracks produce an empty store.
    pub fn initialize(flat_tracks: &[FlatTrack], starting_track_number: TrackNumber) -> Result<Self> {
        let built = build_tracks(flat_tracks, starting_track_number)?;

        let frames: BTreeSet<Frame> = built
            .bone_tracks
            .iter()
            .flat_map(Track::present_times)
            .collect();
        let mut layer = Track::layer();
        layer.extend_keyframes(frames.into_iter().map(Keyframe::marker));

        tracing::info!(
            bones = built.bone_tracks.len(),
            properties = built.property_tracks.len(),
            "Timeline initialized"
        );
        Ok(Self::from_tracks(layer, built.bone_tracks, built.property_tracks))
    }

    /// Reset to the empty store
    pub fn clear() -> Self {
        Self::new()
    }

    /// The layer track
    pub fn layer_track(&self) -> &Track {
        &self.layer_track
    }

    /// All bone tracks
    pub fn bone_tracks(&self) -> &[Track] {
        &self.bone_tracks
    }

    /// All property tracks
    pub fn property_tracks(&self) -> &[Track] {
        &self.property_tracks
    }

    /// Track lookup index
    pub fn index(&self) -> &TrackIndex {
        &self.index
    }

    /// Whether the store holds no bone or property tracks
    pub fn is_empty(&self) -> bool {
        self.bone_tracks.is_empty() && self.property_tracks.is_empty()
    }

    /// Get a track by slot
    pub fn track(&self, slot: TrackSlot) -> Option<&Track> {
        match slot {
            TrackSlot::Layer => Some(&self.layer_track),
            TrackSlot::Bone(i) => self.bone_tracks.get(i),
            TrackSlot::Property(i) => self.property_tracks.get(i),
        }
    }

    /// Get a mutable track by slot
    pub(crate) fn track_mut(&mut self, slot: TrackSlot) -> Option<&mut Track> {
        match slot {
            TrackSlot::Layer => Some(&mut self.layer_track),
            TrackSlot::Bone(i) => self.bone_tracks.get_mut(i),
            TrackSlot::Property(i) => self.property_tracks.get_mut(i),
        }
    }

    /// Get a track by number
    pub fn track_by_number(&self, track_number: TrackNumber) -> Option<&Track> {
        self.track(self.index.slot_by_number(track_number)?)
    }

    /// Get a track by id
    pub fn track_by_id(&self, track_id: &str) -> Option<&Track> {
        self.track(self.index.slot_by_id(track_id)?)
    }

    /// Property tracks owned by a bone number
    pub fn children_of(&self, bone_number: TrackNumber) -> impl Iterator<Item = &Track> {
        self.index
            .children_of(bone_number)
            .iter()
            .filter_map(|&i| self.property_tracks.get(i))
    }

    /// Iterate every track, layer first, then bones, then properties
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        std::iter::once(&self.layer_track)
            .chain(&self.bone_tracks)
            .chain(&self.property_tracks)
    }

    pub(crate) fn tracks_mut(&mut self) -> impl Iterator<Item = &mut Track> {
        std::iter::once(&mut self.layer_track)
            .chain(&mut self.bone_tracks)
            .chain(&mut self.property_tracks)
    }

    /// Clear every selection flag
    pub(crate) fn clear_selection_flags(&mut self) {
        for track in self.tracks_mut() {
            track.clear_selection();
        }
    }

    /// Check every store invariant
    ///
    /// Returns the first breach found. A breach is a bug in the engine, not a
    /// user error.
    pub fn validate(&self) -> Result<()> {
        for track in self.tracks() {
            if !track.is_sorted() {
                return Err(TimelineError::InvariantViolation(format!(
                    "track {} is not strictly ascending",
                    track.track_id
                )));
            }
        }

        if self.layer_track.track_number != LAYER_TRACK_NUMBER {
            return Err(TimelineError::InvariantViolation("layer track number is not -1".into()));
        }
        for bone in &self.bone_tracks {
            if bone.parent_track_number != NO_PARENT {
                return Err(TimelineError::InvariantViolation(format!(
                    "bone {} has a track parent",
                    bone.track_id
                )));
            }
        }
        for property in &self.property_tracks {
            if self.index.bone_index(property.parent_track_number).is_none() {
                return Err(TimelineError::InvariantViolation(format!(
                    "property {} has no owning bone",
                    property.track_id
                )));
            }
        }

        let mut all_frames = BTreeSet::new();
        for track in self.tracks() {
            all_frames.extend(track.keyframes().iter().map(|k| k.time));
        }

        for &time in &all_frames {
            for bone in &self.bone_tracks {
                let derived = crate::cascade::derive_bone_presence(
                    bone.track_number,
                    &self.property_tracks,
                    time,
                );
                if bone.is_present_at(time) != derived {
                    return Err(TimelineError::InvariantViolation(format!(
                        "bone {} presence at frame {time} disagrees with its properties",
                        bone.track_id
                    )));
                }
            }
            let derived = crate::cascade::derive_layer_presence(&self.bone_tracks, time);
            if self.layer_track.is_present_at(time) != derived {
                return Err(TimelineError::InvariantViolation(format!(
                    "layer presence at frame {time} disagrees with its bones"
                )));
            }
        }

        for track in self.tracks() {
            let stale = track.keyframes().iter().find(|k| k.is_selected && k.is_deleted);
            if let Some(keyframe) = stale {
                return Err(TimelineError::InvariantViolation(format!(
                    "deleted keyframe at frame {} on {} is selected",
                    keyframe.time, track.track_id
                )));
            }
        }

        Ok(())
    }
}

impl Default for KeyframeStore {
    fn default() -> Self {
        Self::new()
    }
}
