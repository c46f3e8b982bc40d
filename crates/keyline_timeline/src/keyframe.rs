// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframe definitions for the timeline.

use serde::{Deserialize, Serialize};

/// Time of a keyframe, in frames
pub type Frame = u32;

/// Value stored in a property keyframe
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum KeyframeValue {
    /// 3D vector (position, scale)
    Vector3([f32; 3]),
    /// Rotation quaternion (x, y, z, w)
    Quaternion([f32; 4]),
    /// Single float
    Scalar(f32),
}

/// A keyframe in a track
///
/// Deleted keyframes stay in their track as tombstones so a later add at the
/// same frame revives them in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Frame of this keyframe
    pub time: Frame,
    /// Tombstone flag
    pub is_deleted: bool,
    /// Selection flag, mirrored by the selection's clustered lists
    pub is_selected: bool,
    /// Animated value (property tracks only)
    pub value: Option<KeyframeValue>,
}

impl Keyframe {
    /// Create a live, unselected keyframe
    pub fn new(time: Frame, value: Option<KeyframeValue>) -> Self {
        Self {
            time,
            is_deleted: false,
            is_selected: false,
            value,
        }
    }

    /// Create a value-less keyframe for bone and layer tracks
    pub fn marker(time: Frame) -> Self {
        Self::new(time, None)
    }

    /// Whether this keyframe exists (is not tombstoned)
    pub fn is_present(&self) -> bool {
        !self.is_deleted
    }
}

/// A property keyframe write: the payload of add, and the record of what an
/// edit touched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyframeUpdate {
    /// Property track id
    pub track_id: String,
    /// Frame to write
    pub time: Frame,
    /// Value to write
    pub value: KeyframeValue,
}

impl KeyframeUpdate {
    /// Create a new keyframe update
    pub fn new(track_id: impl Into<String>, time: Frame, value: KeyframeValue) -> Self {
        Self {
            track_id: track_id.into(),
            time,
            value,
        }
    }
}

/// Apply a signed frame offset, rejecting results before frame zero
pub fn shift_frame(time: Frame, delta: i64) -> crate::Result<Frame> {
    let shifted = i64::from(time).checked_add(delta).ok_or_else(|| {
        crate::TimelineError::InvalidInput(format!("frame {time} shifted by {delta} overflows"))
    })?;
    if shifted < 0 {
        return Err(crate::TimelineError::NegativeFrame { frame: shifted });
    }
    Frame::try_from(shifted).map_err(|_| {
        crate::TimelineError::InvalidInput(format!("frame {shifted} is out of range"))
    })
}
