// SPDX-License-Identifier: MIT OR Apache-2.0
//! Track definitions for the timeline.

use crate::keyframe::{Frame, Keyframe, KeyframeValue};
use serde::{Deserialize, Serialize};

/// Integer track number; unique across layer, bone and property tracks
pub type TrackNumber = i32;

/// Track number of the singleton layer track
pub const LAYER_TRACK_NUMBER: TrackNumber = -1;

/// Parent number of tracks without a track parent
pub const NO_PARENT: TrackNumber = -1;

/// Track id of the singleton layer track
pub const LAYER_TRACK_ID: &str = "layer";

/// Level of a track in the layer/bone/property hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TrackType {
    /// Aggregate of every bone
    Layer,
    /// Aggregate of one target's properties
    Bone,
    /// One animated attribute of one target
    Property,
}

impl TrackType {
    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Layer => "Layer",
            Self::Bone => "Bone",
            Self::Property => "Property",
        }
    }
}

/// A track in the timeline
///
/// Keyframes are kept strictly ascending by time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Stable public identity
    pub track_id: String,
    /// Hierarchy level
    pub track_type: TrackType,
    /// Track number
    pub track_number: TrackNumber,
    /// Owning bone number for property tracks, [`NO_PARENT`] otherwise
    pub parent_track_number: TrackNumber,
    keyframes: Vec<Keyframe>,
}

impl Track {
    /// Create an empty track
    pub fn new(
        track_id: impl Into<String>,
        track_type: TrackType,
        track_number: TrackNumber,
        parent_track_number: TrackNumber,
    ) -> Self {
        Self {
            track_id: track_id.into(),
            track_type,
            track_number,
            parent_track_number,
            keyframes: Vec::new(),
        }
    }

    /// Create the empty layer track
    pub fn layer() -> Self {
        Self::new(LAYER_TRACK_ID, TrackType::Layer, LAYER_TRACK_NUMBER, NO_PARENT)
    }

    /// Get all keyframes, tombstones included
    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    /// Iterate keyframes that are not tombstoned
    pub fn present_keyframes(&self) -> impl Iterator<Item = &Keyframe> {
        self.keyframes.iter().filter(|k| k.is_present())
    }

    /// Frames of all keyframes that are not tombstoned
    pub fn present_times(&self) -> Vec<Frame> {
        self.present_keyframes().map(|k| k.time).collect()
    }

    /// Get keyframe count, tombstones included
    pub fn keyframe_count(&self) -> usize {
        self.keyframes.len()
    }

    fn search(&self, time: Frame) -> std::result::Result<usize, usize> {
        self.keyframes.binary_search_by_key(&time, |k| k.time)
    }

    /// Get keyframe at time (tombstones included)
    pub fn keyframe_at(&self, time: Frame) -> Option<&Keyframe> {
        self.search(time).ok().map(|idx| &self.keyframes[idx])
    }

    fn keyframe_at_mut(&mut self, time: Frame) -> Option<&mut Keyframe> {
        match self.search(time) {
            Ok(idx) => Some(&mut self.keyframes[idx]),
            Err(_) => None,
        }
    }

    /// Whether a live keyframe exists at time
    pub fn is_present_at(&self, time: Frame) -> bool {
        self.keyframe_at(time).is_some_and(Keyframe::is_present)
    }

    /// Insert, revive or overwrite the keyframe at time
    ///
    /// A `None` value leaves an existing value untouched. Returns `true` if a
    /// live keyframe was created (inserted or revived).
    pub fn set_keyframe_at(&mut self, time: Frame, value: Option<KeyframeValue>) -> bool {
        match self.search(time) {
            Ok(idx) => {
                let keyframe = &mut self.keyframes[idx];
                let revived = keyframe.is_deleted;
                keyframe.is_deleted = false;
                if value.is_some() {
                    keyframe.value = value;
                }
                revived
            }
            Err(idx) => {
                self.keyframes.insert(idx, Keyframe::new(time, value));
                true
            }
        }
    }

    /// Tombstone the keyframe at time
    ///
    /// Returns the removed keyframe's value slot if a live keyframe was
    /// tombstoned, `None` if there was nothing to delete.
    pub fn tombstone(&mut self, time: Frame) -> Option<Option<KeyframeValue>> {
        let keyframe = self.keyframe_at_mut(time)?;
        if keyframe.is_deleted {
            return None;
        }
        keyframe.is_deleted = true;
        keyframe.is_selected = false;
        Some(keyframe.value)
    }

    /// Set the selection flag of the live keyframe at time
    pub fn set_selected(&mut self, time: Frame, selected: bool) -> bool {
        match self.keyframe_at_mut(time) {
            Some(keyframe) if keyframe.is_present() => {
                keyframe.is_selected = selected;
                true
            }
            _ => false,
        }
    }

    /// Clear every selection flag
    pub fn clear_selection(&mut self) {
        for keyframe in &mut self.keyframes {
            keyframe.is_selected = false;
        }
    }

    /// Frames of selected keyframes
    pub fn selected_times(&self) -> Vec<Frame> {
        self.keyframes
            .iter()
            .filter(|k| k.is_selected)
            .map(|k| k.time)
            .collect()
    }

    /// Check that frames are strictly increasing
    pub fn is_sorted(&self) -> bool {
        self.keyframes.windows(2).all(|w| w[0].time < w[1].time)
    }

    /// Append keyframes, then sort and keep the first of each frame
    pub(crate) fn extend_keyframes(&mut self, keyframes: impl IntoIterator<Item = Keyframe>) {
        self.keyframes.extend(keyframes);
        self.keyframes.sort_by_key(|k| k.time);
        self.keyframes.dedup_by_key(|k| k.time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn property_track() -> Track {
        Track::new("Hips.position", TrackType::Property, 1, 0)
    }

    #[test]
    fn test_insert_keeps_order() {
        let mut track = property_track();
        track.set_keyframe_at(10, Some(KeyframeValue::Scalar(1.0)));
        track.set_keyframe_at(2, Some(KeyframeValue::Scalar(2.0)));
        track.set_keyframe_at(5, Some(KeyframeValue::Scalar(3.0)));
        assert_eq!(track.present_times(), vec![2, 5, 10]);
        assert!(track.is_sorted());
    }

    #[test]
    fn test_overwrite_existing() {
        let mut track = property_track();
        assert!(track.set_keyframe_at(4, Some(KeyframeValue::Scalar(1.0))));
        assert!(!track.set_keyframe_at(4, Some(KeyframeValue::Scalar(9.0))));
        assert_eq!(track.keyframe_count(), 1);
        assert_eq!(track.keyframe_at(4).unwrap().value, Some(KeyframeValue::Scalar(9.0)));
    }

    #[test]
    fn test_tombstone_and_revive() {
        let mut track = property_track();
        track.set_keyframe_at(4, Some(KeyframeValue::Scalar(1.0)));
        track.set_selected(4, true);

        assert_eq!(track.tombstone(4), Some(Some(KeyframeValue::Scalar(1.0))));
        assert!(!track.is_present_at(4));
        assert!(!track.keyframe_at(4).unwrap().is_selected);
        assert_eq!(track.keyframe_count(), 1);

        // Deleting twice is a no-op
        assert_eq!(track.tombstone(4), None);
        assert_eq!(track.tombstone(99), None);

        // Marker writes keep the previous value
        assert!(track.set_keyframe_at(4, None));
        assert_eq!(track.keyframe_at(4).unwrap().value, Some(KeyframeValue::Scalar(1.0)));
    }

    #[test]
    fn test_selection_ignores_tombstones() {
        let mut track = property_track();
        track.set_keyframe_at(1, None);
        track.set_keyframe_at(2, None);
        track.tombstone(2);

        assert!(track.set_selected(1, true));
        assert!(!track.set_selected(2, true));
        assert!(!track.set_selected(3, true));
        assert_eq!(track.selected_times(), vec![1]);

        track.clear_selection();
        assert!(track.selected_times().is_empty());
    }

    #[test]
    fn test_extend_sorts_and_dedups() {
        let mut track = Track::layer();
        track.extend_keyframes([Keyframe::marker(9), Keyframe::marker(3), Keyframe::marker(9)]);
        assert_eq!(track.present_times(), vec![3, 9]);
    }
}
