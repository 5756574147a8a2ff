//! # hand_pose
//!
//! Hand landmark model and a rule-table gesture classifier for the
//! 21-keypoint output of a hand-landmark detector.
//!
//! ## Gestures
//!
//! Rules are tried top to bottom; the first match wins.
//!
//! | Gesture | Rule |
//! |---|---|
//! | `Fist` | index, middle, ring, pinky tips > 0.03 below their PIP (thumb ignored) |
//! | `OpenPalm` | thumb tip > 0.05 above its IP, other tips > 0.03 above their PIP |
//! | `ThumbOnly` | thumb extended (0.05), other four not extended (0.02) |
//! | `PinkyOnly` | thumb not extended (0.05), index/middle/ring not extended (0.02), pinky extended (0.05) |
//!
//! ```rust
//! use hand_pose::{classify, poses, GestureLabel};
//!
//! assert_eq!(classify(Some(&poses::open_palm())), GestureLabel::OpenPalm);
//! assert_eq!(classify(None), GestureLabel::None);
//! ```

use thiserror::Error;

pub mod landmark;
pub mod classify;
pub mod poses;
pub mod record;

pub use landmark::{Finger, HandJoint, Landmark, LandmarkSet, HAND_CONNECTIONS, LANDMARK_COUNT};
pub use classify::{classify, is_finger_extended, matching_rules, GestureLabel, GESTURE_RULES};
pub use record::{RecordedFrame, RecordedHand};

#[derive(Debug, Error)]
pub enum PoseError {
    #[error("expected 21 landmarks, got {0}")]
    WrongLandmarkCount(usize),

    #[error("landmark {index} has a non-finite coordinate")]
    NonFinite { index: usize },

    #[error("malformed landmark frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read landmark recording: {0}")]
    Io(#[from] std::io::Error),
}
