// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline editing engine for keyframe animation.
//!
//! This crate provides the three-level keyframe store behind a dopesheet:
//! - One layer track, aggregating every bone
//! - One bone track per animated target
//! - One property track per animated target attribute
//!
//! ## Architecture
//!
//! Only property keyframes carry values. Bone and layer keyframes are
//! derived from them by the cascade and kept consistent by every edit:
//! - Track hierarchy and numbering
//! - Cascading presence derivation
//! - Selection (click, toggle, row, column, drag box)
//! - Add, delete, copy/paste and move
//!
//! Every operation takes a snapshot and returns a new one; nothing is shared
//! or mutated in place.

pub mod cascade;
pub mod clipboard;
pub mod edit;
pub mod error;
pub mod hierarchy;
pub mod keyframe;
pub mod movement;
pub mod selection;
pub mod store;
pub mod timeline;
pub mod track;

pub use cascade::{derive_bone_presence, derive_layer_presence, reconcile, TouchedFrames};
pub use clipboard::{copy, paste, Clipboard};
pub use edit::{add, delete, Edit};
pub use error::{Result, TimelineError};
pub use hierarchy::{build_tracks, find_children, find_owner, BuiltTracks, FlatTrack, TrackIndex, TrackSlot};
pub use keyframe::{shift_frame, Frame, Keyframe, KeyframeUpdate, KeyframeValue};
pub use movement::move_selection;
pub use selection::{
    materialize, select, ClusteredKeyframe, KeyframeRef, SelectCommand, SelectedKeyframe, Selection,
};
pub use store::KeyframeStore;
pub use timeline::{Command, Snapshot, Timeline, Transition};
pub use track::{Track, TrackNumber, TrackType, LAYER_TRACK_ID, LAYER_TRACK_NUMBER, NO_PARENT};
