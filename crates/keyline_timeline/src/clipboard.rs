// SPDX-License-Identifier: MIT OR Apache-2.0
//! Copy and paste of selected keyframes.

use crate::cascade::{reconcile, TouchedFrames};
use crate::edit::{property_slot, Edit};
use crate::error::{Result, TimelineError};
use crate::keyframe::{shift_frame, Frame, KeyframeUpdate};
use crate::selection::{materialize, ClusteredKeyframe, KeyframeRef, Selection};
use crate::store::KeyframeStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Copied selection, kept until the next copy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Clipboard {
    /// Copied layer keyframes
    pub layer: Option<ClusteredKeyframe>,
    /// Copied bone keyframes
    pub bones: Vec<ClusteredKeyframe>,
    /// Copied property keyframes
    pub properties: Vec<ClusteredKeyframe>,
}

impl Clipboard {
    /// Create an empty clipboard
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether there is nothing to paste
    pub fn is_empty(&self) -> bool {
        self.anchor().is_none()
    }

    /// Earliest copied property frame
    pub fn anchor(&self) -> Option<Frame> {
        self.properties.iter().flat_map(|c| c.times()).min()
    }
}

/// Copy the current selection
pub fn copy(selection: &Selection) -> Clipboard {
    Clipboard {
        layer: selection.selected_layer.clone(),
        bones: selection.selected_bone.clone(),
        properties: selection.selected_property.clone(),
    }
}

/// Paste the clipboard so its earliest property keyframe lands on `target_time`
///
/// Relative spacing is preserved. Property keyframes are written with the
/// add rule (overwrite or insert); bone and layer presence is re-derived. The
/// pasted keyframes become the selection, along with copied bone and layer
/// keyframes at their shifted frames.
pub fn paste(store: &KeyframeStore, clipboard: &Clipboard, target_time: Frame) -> Result<Edit> {
    let anchor = clipboard.anchor().ok_or(TimelineError::EmptyClipboard)?;
    let time_diff = i64::from(target_time) - i64::from(anchor);

    let mut next = store.clone();
    let mut frames = TouchedFrames::new();
    let mut keys = BTreeSet::new();
    let mut touched = Vec::new();

    for cluster in &clipboard.properties {
        let Some(slot) = property_slot(&next, &cluster.track_id) else {
            continue;
        };
        let Some(track) = next.track_mut(slot) else {
            continue;
        };
        for keyframe in &cluster.keyframes {
            let Some(value) = keyframe.value else {
                tracing::debug!(track_id = %cluster.track_id, time = keyframe.time, "Copied keyframe has no value");
                continue;
            };
            let to = shift_frame(keyframe.time, time_diff)?;
            track.set_keyframe_at(to, Some(value));
            frames.insert(track.parent_track_number, to);
            keys.insert(KeyframeRef::new(track.track_number, to));
            touched.push(KeyframeUpdate::new(track.track_id.clone(), to, value));
        }
    }

    reconcile(&mut next, &frames);

    for cluster in clipboard.layer.iter().chain(&clipboard.bones) {
        let Some(track) = next.track_by_id(&cluster.track_id) else {
            continue;
        };
        for time in cluster.times() {
            let Ok(to) = shift_frame(time, time_diff) else {
                continue;
            };
            if track.is_present_at(to) {
                keys.insert(KeyframeRef::new(track.track_number, to));
            }
        }
    }

    let (next, selection) = materialize(&next, &keys);
    tracing::debug!(target_time, time_diff, pasted = touched.len(), "Clipboard pasted");
    Ok(Edit::new(next, selection)
        .with_highlight_reset()
        .with_touched(touched))
}
