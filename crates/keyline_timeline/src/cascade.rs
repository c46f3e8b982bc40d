// SPDX-License-Identifier: MIT OR Apache-2.0
//! Derivation of bone and layer keyframe presence from property keyframes.
//!
//! A bone keyframe exists at a frame iff one of its properties has a live
//! keyframe there; the layer keyframe exists iff any bone does. Edits apply all
//! property changes first and then call [`reconcile`] once with every frame
//! they touched.

use crate::hierarchy::TrackSlot;
use crate::keyframe::Frame;
use crate::store::KeyframeStore;
use crate::track::{Track, TrackNumber};
use indexmap::IndexMap;
use std::collections::BTreeSet;

/// Whether any property owned by `bone_number` has a live keyframe at `time`
pub fn derive_bone_presence(bone_number: TrackNumber, property_tracks: &[Track], time: Frame) -> bool {
    property_tracks
        .iter()
        .filter(|t| t.parent_track_number == bone_number)
        .any(|t| t.is_present_at(time))
}

/// Whether any bone has a live keyframe at `time`
pub fn derive_layer_presence(bone_tracks: &[Track], time: Frame) -> bool {
    bone_tracks.iter().any(|t| t.is_present_at(time))
}

/// Frames touched by an edit, grouped by owning bone number
#[derive(Debug, Clone, Default)]
pub struct TouchedFrames {
    by_bone: IndexMap<TrackNumber, BTreeSet<Frame>>,
}

impl TouchedFrames {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a touched frame under its owning bone
    pub fn insert(&mut self, bone_number: TrackNumber, time: Frame) {
        self.by_bone.entry(bone_number).or_default().insert(time);
    }

    /// Whether nothing was touched
    pub fn is_empty(&self) -> bool {
        self.by_bone.values().all(BTreeSet::is_empty)
    }

    /// Every touched frame across all bones
    pub fn frames(&self) -> BTreeSet<Frame> {
        self.by_bone.values().flatten().copied().collect()
    }
}

/// Bring bone and layer keyframes in line with property keyframes
///
/// Bones are reconciled first, then the layer from the updated bones. Bone
/// and layer keyframes are inserted or revived where support appeared and
/// tombstoned where the last support vanished.
pub fn reconcile(store: &mut KeyframeStore, touched: &TouchedFrames) {
    for (&bone_number, frames) in &touched.by_bone {
        let Some(bone_index) = store.index().bone_index(bone_number) else {
            tracing::debug!(bone_number, "Skipping cascade for unknown bone");
            continue;
        };
        for &time in frames {
            let present = store.children_of(bone_number).any(|t| t.is_present_at(time));
            if let Some(bone) = store.track_mut(TrackSlot::Bone(bone_index)) {
                apply_presence(bone, time, present);
            }
        }
    }

    for time in touched.frames() {
        let present = derive_layer_presence(store.bone_tracks(), time);
        if let Some(layer) = store.track_mut(TrackSlot::Layer) {
            apply_presence(layer, time, present);
        }
    }
}

fn apply_presence(track: &mut Track, time: Frame, present: bool) {
    if present {
        if !track.is_present_at(time) {
            track.set_keyframe_at(time, None);
        }
    } else {
        track.tombstone(time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::{two_bone_store, vec3};

    fn property_slot(store: &KeyframeStore, id: &str) -> TrackSlot {
        store.index().slot_by_id(id).unwrap()
    }

    #[test]
    fn test_derive_presence() {
        let store = two_bone_store();
        assert!(derive_bone_presence(0, store.property_tracks(), 20));
        assert!(!derive_bone_presence(0, store.property_tracks(), 5));
        assert!(!derive_bone_presence(42, store.property_tracks(), 10));
        assert!(derive_layer_presence(store.bone_tracks(), 5));
        assert!(!derive_layer_presence(store.bone_tracks(), 6));
    }

    #[test]
    fn test_sibling_keeps_bone_alive() {
        let mut store = two_bone_store();
        let slot = property_slot(&store, "Hips.position");
        store.track_mut(slot).unwrap().tombstone(10);

        let mut touched = TouchedFrames::new();
        touched.insert(0, 10);
        reconcile(&mut store, &touched);

        // Hips.rotation still covers frame 10
        assert!(store.track_by_id("Hips").unwrap().is_present_at(10));
        assert!(store.layer_track().is_present_at(10));
        store.validate().unwrap();
    }

    #[test]
    fn test_last_support_removes_bone_and_layer() {
        let mut store = two_bone_store();
        let slot = property_slot(&store, "Spine.position");
        store.track_mut(slot).unwrap().tombstone(5);

        let mut touched = TouchedFrames::new();
        touched.insert(3, 5);
        reconcile(&mut store, &touched);

        assert!(!store.track_by_id("Spine").unwrap().is_present_at(5));
        assert!(!store.layer_track().is_present_at(5));
        // Tombstones stay in place
        assert_eq!(store.layer_track().keyframe_at(5).map(|k| k.is_deleted), Some(true));
        store.validate().unwrap();
    }

    #[test]
    fn test_new_support_inserts_bone_and_layer() {
        let mut store = two_bone_store();
        let slot = property_slot(&store, "Spine.position");
        store.track_mut(slot).unwrap().set_keyframe_at(33, Some(vec3(3.0)));

        let mut touched = TouchedFrames::new();
        touched.insert(3, 33);
        reconcile(&mut store, &touched);

        assert!(store.track_by_id("Spine").unwrap().is_present_at(33));
        assert!(!store.track_by_id("Hips").unwrap().is_present_at(33));
        assert!(store.layer_track().is_present_at(33));
        store.validate().unwrap();
    }

    #[test]
    fn test_unknown_bone_is_skipped() {
        let mut store = two_bone_store();
        let before = store.clone();
        let mut touched = TouchedFrames::new();
        touched.insert(77, 10);
        reconcile(&mut store, &touched);
        assert_eq!(store, before);
        assert!(!touched.is_empty());
    }
}
