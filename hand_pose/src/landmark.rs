//! The 21-point hand landmark model.
//!
//! Coordinates are normalized to the frame: `x` and `y` lie in `[0, 1]`
//! with `y` growing **downward**, so a smaller `y` is higher on screen.
//! `z` is the detector's relative depth and is optional in recorded input.

use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::PoseError;

/// Number of keypoints the hand detector produces per hand.
pub const LANDMARK_COUNT: usize = 21;

// ════════════════════════════════════════════════════════════════════════════
// Landmark
// ════════════════════════════════════════════════════════════════════════════

/// A single detected hand-joint keypoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32) -> Self {
        Landmark { x, y, z: 0.0 }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HandJoint: the detector's joint numbering
// ════════════════════════════════════════════════════════════════════════════

/// Joint indices in the order the landmark detector emits them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum HandJoint {
    Wrist      = 0,
    ThumbCmc   = 1,
    ThumbMcp   = 2,
    ThumbIp    = 3,
    ThumbTip   = 4,
    IndexMcp   = 5,
    IndexPip   = 6,
    IndexDip   = 7,
    IndexTip   = 8,
    MiddleMcp  = 9,
    MiddlePip  = 10,
    MiddleDip  = 11,
    MiddleTip  = 12,
    RingMcp    = 13,
    RingPip    = 14,
    RingDip    = 15,
    RingTip    = 16,
    PinkyMcp   = 17,
    PinkyPip   = 18,
    PinkyDip   = 19,
    PinkyTip   = 20,
}

impl HandJoint {
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Skeleton edges, used by the overlay to draw the hand.
pub const HAND_CONNECTIONS: [(HandJoint, HandJoint); 21] = {
    use HandJoint::*;
    [
        (Wrist, ThumbCmc),  (ThumbCmc, ThumbMcp),   (ThumbMcp, ThumbIp),   (ThumbIp, ThumbTip),
        (Wrist, IndexMcp),  (IndexMcp, IndexPip),   (IndexPip, IndexDip),  (IndexDip, IndexTip),
        (IndexMcp, MiddleMcp), (MiddleMcp, MiddlePip), (MiddlePip, MiddleDip), (MiddleDip, MiddleTip),
        (MiddleMcp, RingMcp),  (RingMcp, RingPip),   (RingPip, RingDip),    (RingDip, RingTip),
        (RingMcp, PinkyMcp),   (PinkyMcp, PinkyPip), (PinkyPip, PinkyDip),  (PinkyDip, PinkyTip),
        (Wrist, PinkyMcp),
    ]
};

// ════════════════════════════════════════════════════════════════════════════
// Finger
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb, Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky,
    ];

    pub const fn tip(self) -> HandJoint {
        match self {
            Finger::Thumb  => HandJoint::ThumbTip,
            Finger::Index  => HandJoint::IndexTip,
            Finger::Middle => HandJoint::MiddleTip,
            Finger::Ring   => HandJoint::RingTip,
            Finger::Pinky  => HandJoint::PinkyTip,
        }
    }

    /// The joint the tip is compared against. The thumb has no PIP, so its
    /// interphalangeal joint stands in.
    pub const fn second_joint(self) -> HandJoint {
        match self {
            Finger::Thumb  => HandJoint::ThumbIp,
            Finger::Index  => HandJoint::IndexPip,
            Finger::Middle => HandJoint::MiddlePip,
            Finger::Ring   => HandJoint::RingPip,
            Finger::Pinky  => HandJoint::PinkyPip,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LandmarkSet
// ════════════════════════════════════════════════════════════════════════════

/// One hand's landmarks for a single frame. Always exactly 21 points.
#[derive(Clone, Debug, PartialEq)]
pub struct LandmarkSet {
    points: [Landmark; LANDMARK_COUNT],
}

impl LandmarkSet {
    pub fn new(points: [Landmark; LANDMARK_COUNT]) -> Self {
        LandmarkSet { points }
    }

    /// Build a set from detector output, rejecting the wrong point count
    /// and NaN/infinite coordinates.
    pub fn from_points(points: Vec<Landmark>) -> Result<Self, PoseError> {
        if let Some(index) = points.iter().position(|p| !p.is_finite()) {
            return Err(PoseError::NonFinite { index });
        }
        let len = points.len();
        let points: [Landmark; LANDMARK_COUNT] = points
            .try_into()
            .map_err(|_| PoseError::WrongLandmarkCount(len))?;
        Ok(LandmarkSet { points })
    }

    pub fn points(&self) -> &[Landmark; LANDMARK_COUNT] {
        &self.points
    }

    /// `(tip, second_joint)` for a finger.
    pub fn finger(&self, finger: Finger) -> (Landmark, Landmark) {
        (self[finger.tip()], self[finger.second_joint()])
    }
}

impl Index<HandJoint> for LandmarkSet {
    type Output = Landmark;

    fn index(&self, joint: HandJoint) -> &Landmark {
        &self.points[joint.index()]
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_points_rejects_short_input() {
        let err = LandmarkSet::from_points(vec![Landmark::new(0.5, 0.5); 20]).unwrap_err();
        assert!(matches!(err, PoseError::WrongLandmarkCount(20)));
    }

    #[test]
    fn from_points_rejects_nan() {
        let mut pts = vec![Landmark::new(0.5, 0.5); LANDMARK_COUNT];
        pts[7].y = f32::NAN;
        let err = LandmarkSet::from_points(pts).unwrap_err();
        assert!(matches!(err, PoseError::NonFinite { index: 7 }));
    }

    #[test]
    fn finger_pairs_use_pip_except_thumb() {
        let pts: Vec<Landmark> = (0..LANDMARK_COUNT)
            .map(|i| Landmark::new(0.0, i as f32 / 100.0))
            .collect();
        let set = LandmarkSet::from_points(pts).unwrap();

        let (tip, ip) = set.finger(Finger::Thumb);
        assert_eq!((tip.y, ip.y), (0.04, 0.03));

        let (tip, pip) = set.finger(Finger::Pinky);
        assert_eq!((tip.y, pip.y), (0.20, 0.18));
    }

    #[test]
    fn connections_stay_in_range() {
        for (a, b) in HAND_CONNECTIONS {
            assert!(a.index() < LANDMARK_COUNT && b.index() < LANDMARK_COUNT);
        }
    }
}
