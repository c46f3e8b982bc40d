// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframe add and delete.

use crate::cascade::{reconcile, TouchedFrames};
use crate::hierarchy::TrackSlot;
use crate::keyframe::KeyframeUpdate;
use crate::selection::Selection;
use crate::store::KeyframeStore;

/// Result of a timeline operation
///
/// Operations never mutate their inputs; they hand back a new store and
/// selection.
#[derive(Debug, Clone)]
pub struct Edit {
    /// New store
    pub store: KeyframeStore,
    /// New selection, in agreement with the store's flags
    pub selection: Selection,
    /// Property keyframes written (add, paste, move) or removed (delete)
    pub touched: Vec<KeyframeUpdate>,
    /// Whether the view should drop transient selection highlights
    pub reset_highlight: bool,
}

impl Edit {
    /// Create an edit with nothing touched
    pub fn new(store: KeyframeStore, selection: Selection) -> Self {
        Self {
            store,
            selection,
            touched: Vec::new(),
            reset_highlight: false,
        }
    }

    /// Mark the edit as resetting selection highlights
    pub fn with_highlight_reset(mut self) -> Self {
        self.reset_highlight = true;
        self
    }

    /// Set the touched property keyframes
    pub fn with_touched(mut self, touched: Vec<KeyframeUpdate>) -> Self {
        self.touched = touched;
        self
    }
}

/// Resolve a track id to a property slot
pub(crate) fn property_slot(store: &KeyframeStore, track_id: &str) -> Option<TrackSlot> {
    match store.index().slot_by_id(track_id) {
        Some(slot @ TrackSlot::Property(_)) => Some(slot),
        Some(_) => {
            tracing::debug!(track_id, "Not a property track");
            None
        }
        None => {
            tracing::debug!(track_id, "Unknown track");
            None
        }
    }
}

/// Write property keyframes
///
/// Existing keyframes (live or deleted) at the same frame are overwritten and
/// revived; otherwise a keyframe is inserted in order. Bone and layer
/// keyframes appear wherever a written frame needs them. Updates for unknown
/// or non-property tracks are skipped. The selection is cleared.
pub fn add(store: &KeyframeStore, updates: &[KeyframeUpdate]) -> Edit {
    let mut next = store.clone();
    next.clear_selection_flags();

    let mut frames = TouchedFrames::new();
    let mut touched = Vec::with_capacity(updates.len());
    for update in updates {
        let Some(slot) = property_slot(&next, &update.track_id) else {
            continue;
        };
        let Some(track) = next.track_mut(slot) else {
            continue;
        };
        track.set_keyframe_at(update.time, Some(update.value));
        frames.insert(track.parent_track_number, update.time);
        touched.push(update.clone());
    }

    reconcile(&mut next, &frames);
    tracing::debug!(written = touched.len(), "Keyframes added");
    Edit::new(next, Selection::new())
        .with_highlight_reset()
        .with_touched(touched)
}

/// Tombstone the selected property keyframes
///
/// Bone keyframes whose last supporting property keyframe disappeared are
/// tombstoned too, then the layer likewise. Already deleted or unknown
/// keyframes are skipped. The selection is cleared; `touched` lists every
/// removed keyframe with its last value.
pub fn delete(store: &KeyframeStore, selection: &Selection) -> Edit {
    let mut next = store.clone();

    let mut frames = TouchedFrames::new();
    let mut touched = Vec::new();
    for cluster in &selection.selected_property {
        let Some(slot) = property_slot(&next, &cluster.track_id) else {
            continue;
        };
        let Some(track) = next.track_mut(slot) else {
            continue;
        };
        for time in cluster.times() {
            let Some(value) = track.tombstone(time) else {
                continue;
            };
            frames.insert(track.parent_track_number, time);
            if let Some(value) = value {
                touched.push(KeyframeUpdate::new(track.track_id.clone(), time, value));
            }
        }
    }

    reconcile(&mut next, &frames);
    next.clear_selection_flags();
    tracing::debug!(removed = touched.len(), "Keyframes deleted");
    Edit::new(next, Selection::new())
        .with_highlight_reset()
        .with_touched(touched)
}
