// SPDX-License-Identifier: MIT OR Apache-2.0
//! Drag-move of selected keyframes along the time axis.

use crate::cascade::{reconcile, TouchedFrames};
use crate::edit::{property_slot, Edit};
use crate::error::{Result, TimelineError};
use crate::hierarchy::TrackSlot;
use crate::keyframe::{shift_frame, Frame, KeyframeUpdate, KeyframeValue};
use crate::selection::{materialize, KeyframeRef, Selection};
use crate::store::KeyframeStore;
use crate::track::TrackNumber;
use std::collections::BTreeSet;

struct PlannedMove {
    slot: TrackSlot,
    parent: TrackNumber,
    from: Frame,
    to: Frame,
    value: Option<KeyframeValue>,
}

/// Shift the selected keyframes by `time_diff` frames
///
/// Every source frame is vacated before any destination is written, so a
/// selection may move onto frames it currently occupies. A destination that
/// already holds a keyframe is overwritten. Bone and layer presence is
/// re-derived at both source and destination frames, and the moved keyframes
/// stay selected at their new frames.
///
/// Rejected without changes if `time_diff` is zero or any keyframe would land
/// outside the frame range.
pub fn move_selection(store: &KeyframeStore, selection: &Selection, time_diff: i64) -> Result<Edit> {
    if time_diff == 0 {
        return Err(TimelineError::ZeroTimeDiff);
    }

    let mut plan = Vec::new();
    for cluster in &selection.selected_property {
        let Some(slot) = property_slot(store, &cluster.track_id) else {
            continue;
        };
        let Some(track) = store.track(slot) else {
            continue;
        };
        for time in cluster.times() {
            let Some(keyframe) = track.keyframe_at(time).filter(|k| k.is_present()) else {
                tracing::debug!(track_id = %track.track_id, time, "Selected keyframe no longer exists");
                continue;
            };
            plan.push(PlannedMove {
                slot,
                parent: track.parent_track_number,
                from: time,
                to: shift_frame(time, time_diff)?,
                value: keyframe.value,
            });
        }
    }

    let mut next = store.clone();
    let mut frames = TouchedFrames::new();
    for planned in &plan {
        if let Some(track) = next.track_mut(planned.slot) {
            track.tombstone(planned.from);
            frames.insert(planned.parent, planned.from);
        }
    }

    let mut keys = BTreeSet::new();
    let mut touched = Vec::with_capacity(plan.len());
    for planned in &plan {
        let Some(track) = next.track_mut(planned.slot) else {
            continue;
        };
        track.set_keyframe_at(planned.to, planned.value);
        frames.insert(planned.parent, planned.to);
        keys.insert(KeyframeRef::new(track.track_number, planned.to));
        if let Some(value) = planned.value {
            touched.push(KeyframeUpdate::new(track.track_id.clone(), planned.to, value));
        }
    }

    reconcile(&mut next, &frames);

    for cluster in selection.selected_layer.iter().chain(&selection.selected_bone) {
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
    tracing::debug!(time_diff, moved = touched.len(), "Selection moved");
    Ok(Edit::new(next, selection)
        .with_highlight_reset()
        .with_touched(touched))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::{select, SelectCommand};
    use crate::store::tests::{two_bone_store, vec3};
    use crate::track::TrackType;

    fn check(edit: &Edit) {
        edit.store.validate().unwrap();
        edit.selection.validate_against(&edit.store).unwrap();
    }

    fn select_with(store: &KeyframeStore, command: SelectCommand) -> Edit {
        select(store, &Selection::new(), &command)
    }

    #[test]
    fn test_move_single_property() {
        let store = two_bone_store();
        let selected = select_with(&store, SelectCommand::LeftClick {
            track_type: TrackType::Property,
            track_number: 4,
            time: 5,
        });
        let moved = move_selection(&selected.store, &selected.selection, 2).unwrap();
        check(&moved);

        let spine = moved.store.track_by_id("Spine.position").unwrap();
        assert_eq!(spine.present_times(), vec![7, 10]);
        assert_eq!(spine.keyframe_at(7).unwrap().value, Some(vec3(5.0)));
        // Source bone and layer keyframes disappear, destination ones appear
        assert!(!moved.store.track_by_id("Spine").unwrap().is_present_at(5));
        assert!(moved.store.track_by_id("Spine").unwrap().is_present_at(7));
        assert!(!moved.store.layer_track().is_present_at(5));
        assert!(moved.store.layer_track().is_present_at(7));
        assert_eq!(moved.touched, vec![KeyframeUpdate::new("Spine.position", 7, vec3(5.0))]);
    }

    #[test]
    fn test_move_selection_follows() {
        let store = two_bone_store();
        let selected = select_with(&store, SelectCommand::LeftClick {
            track_type: TrackType::Bone,
            track_number: 0,
            time: 20,
        });
        let moved = move_selection(&selected.store, &selected.selection, 5).unwrap();
        check(&moved);

        let keys: Vec<_> = moved.selection.keys().into_iter().map(|k| (k.track_number, k.time)).collect();
        assert_eq!(keys, vec![(0, 25), (2, 25)]);
    }

    #[test]
    fn test_move_overlapping_row() {
        let store = two_bone_store();
        let selected = select_with(&store, SelectCommand::Horizontal {
            track_type: TrackType::Property,
            track_number: 1,
        });
        // 0 -> 10 and 10 -> 20: the first destination is the second source
        let moved = move_selection(&selected.store, &selected.selection, 10).unwrap();
        check(&moved);

        let position = moved.store.track_by_id("Hips.position").unwrap();
        assert_eq!(position.present_times(), vec![10, 20]);
        assert_eq!(position.keyframe_at(10).unwrap().value, Some(vec3(0.0)));
        assert_eq!(position.keyframe_at(20).unwrap().value, Some(vec3(1.0)));
        assert!(!moved.store.track_by_id("Hips").unwrap().is_present_at(0));
    }

    #[test]
    fn test_move_merges_into_existing() {
        let store = two_bone_store();
        let selected = select_with(&store, SelectCommand::LeftClick {
            track_type: TrackType::Property,
            track_number: 4,
            time: 5,
        });
        let moved = move_selection(&selected.store, &selected.selection, 5).unwrap();
        check(&moved);

        let spine = moved.store.track_by_id("Spine.position").unwrap();
        assert_eq!(spine.present_times(), vec![10]);
        assert_eq!(spine.keyframe_at(10).unwrap().value, Some(vec3(5.0)));
    }

    #[test]
    fn test_move_round_trip() {
        let store = two_bone_store();
        let selected = select_with(&store, SelectCommand::Vertical { time: 20 });
        let forward = move_selection(&selected.store, &selected.selection, 7).unwrap();
        let back = move_selection(&forward.store, &forward.selection, -7).unwrap();
        check(&back);

        for (original, restored) in store.property_tracks().iter().zip(back.store.property_tracks()) {
            assert_eq!(original.present_times(), restored.present_times());
            for keyframe in original.present_keyframes() {
                assert_eq!(restored.keyframe_at(keyframe.time).unwrap().value, keyframe.value);
            }
        }
        assert_eq!(back.selection.len(), selected.selection.len());
    }

    #[test]
    fn test_invalid_moves_are_rejected() {
        let store = two_bone_store();
        let selected = select_with(&store, SelectCommand::Vertical { time: 5 });

        assert_eq!(
            move_selection(&selected.store, &selected.selection, 0).unwrap_err(),
            TimelineError::ZeroTimeDiff
        );
        assert_eq!(
            move_selection(&selected.store, &selected.selection, -6).unwrap_err(),
            TimelineError::NegativeFrame { frame: -1 }
        );
        selected.store.validate().unwrap();
    }

    #[test]
    fn test_extreme_time_diff_is_rejected() {
        let store = two_bone_store();
        let selected = select_with(&store, SelectCommand::Vertical { time: 10 });

        assert!(matches!(
            move_selection(&selected.store, &selected.selection, i64::MAX),
            Err(TimelineError::InvalidInput(_))
        ));
        assert!(matches!(
            move_selection(&selected.store, &selected.selection, i64::MIN),
            Err(TimelineError::NegativeFrame { .. })
        ));
        selected.store.validate().unwrap();
        assert_eq!(selected.selection.len(), 6);
    }

    #[test]
    fn test_move_empty_selection() {
        let store = two_bone_store();
        let moved = move_selection(&store, &Selection::new(), 3).unwrap();
        assert_eq!(moved.store, store);
        assert!(moved.selection.is_empty());
    }
}
