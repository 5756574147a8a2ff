//! Synthetic hand poses.
//!
//! Builds plausible upright right-hand landmark sets from per-finger
//! states. Used by the keyboard simulator and by tests; real frames come
//! from the landmark detector.

use crate::landmark::{Finger, HandJoint, Landmark, LandmarkSet, LANDMARK_COUNT};

/// Vertical position of a fingertip relative to its second joint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FingerPose {
    /// Pointing straight up.
    Extended,
    /// Bent forward; tip roughly level with the second joint.
    Curled,
    /// Tucked into the palm; tip well below the second joint.
    Clenched,
    /// Explicit `tip.y - joint.y` offset (negative is up).
    Offset(f32),
}

impl FingerPose {
    fn offset(self) -> f32 {
        match self {
            FingerPose::Extended  => -0.12,
            FingerPose::Curled    =>  0.01,
            FingerPose::Clenched  =>  0.06,
            FingerPose::Offset(d) => d,
        }
    }
}

// Per finger: (x column, mcp y, second-joint y). Thumb uses its IP.
const LAYOUT: [(f32, f32, f32); 5] = [
    (0.36, 0.72, 0.65),
    (0.44, 0.62, 0.52),
    (0.50, 0.60, 0.49),
    (0.56, 0.62, 0.52),
    (0.62, 0.66, 0.58),
];

const WRIST:     Landmark = Landmark::new(0.50, 0.85);
const THUMB_CMC: Landmark = Landmark::new(0.42, 0.80);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandPose {
    fingers: [FingerPose; 5],
}

impl HandPose {
    pub fn new(fingers: [FingerPose; 5]) -> Self {
        HandPose { fingers }
    }

    pub fn fist() -> Self {
        use FingerPose::*;
        HandPose::new([Curled, Clenched, Clenched, Clenched, Clenched])
    }

    pub fn open_palm() -> Self {
        HandPose::new([FingerPose::Extended; 5])
    }

    pub fn thumb_only() -> Self {
        use FingerPose::*;
        HandPose::new([Extended, Curled, Curled, Curled, Curled])
    }

    pub fn pinky_only() -> Self {
        use FingerPose::*;
        HandPose::new([Curled, Curled, Curled, Curled, Extended])
    }

    pub fn set(&mut self, finger: Finger, pose: FingerPose) {
        self.fingers[finger as usize] = pose;
    }

    pub fn landmarks(&self) -> LandmarkSet {
        let mut pts = [Landmark::default(); LANDMARK_COUNT];
        pts[HandJoint::Wrist.index()] = WRIST;
        pts[HandJoint::ThumbCmc.index()] = THUMB_CMC;

        for (finger, (&pose, &(x, mcp_y, joint_y))) in
            Finger::ALL.iter().zip(self.fingers.iter().zip(LAYOUT.iter()))
        {
            let tip_y = joint_y + pose.offset();
            let tip = finger.tip().index();
            // Joint layout is contiguous: [mcp, second, dip, tip] for the
            // four fingers and [mcp, ip, tip] for the thumb.
            match finger {
                Finger::Thumb => {
                    pts[tip - 2] = Landmark::new(x + 0.02, mcp_y);
                    pts[tip - 1] = Landmark::new(x, joint_y);
                }
                _ => {
                    pts[tip - 3] = Landmark::new(x, mcp_y);
                    pts[tip - 2] = Landmark::new(x, joint_y);
                    pts[tip - 1] = Landmark::new(x, (joint_y + tip_y) / 2.0);
                }
            }
            pts[tip] = Landmark::new(x, tip_y);
        }
        LandmarkSet::new(pts)
    }
}

pub fn fist()       -> LandmarkSet { HandPose::fist().landmarks() }
pub fn open_palm()  -> LandmarkSet { HandPose::open_palm().landmarks() }
pub fn thumb_only() -> LandmarkSet { HandPose::thumb_only().landmarks() }
pub fn pinky_only() -> LandmarkSet { HandPose::pinky_only().landmarks() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poses_stay_inside_frame() {
        for set in [fist(), open_palm(), thumb_only(), pinky_only()] {
            for p in set.points() {
                assert!((0.0..=1.0).contains(&p.x) && (0.0..=1.0).contains(&p.y));
            }
        }
    }

    #[test]
    fn offset_lands_on_tip() {
        let mut pose = HandPose::open_palm();
        pose.set(Finger::Middle, FingerPose::Offset(0.05));
        let set = pose.landmarks();
        let (tip, pip) = set.finger(Finger::Middle);
        assert!((tip.y - pip.y - 0.05).abs() < 1e-6);
    }
}
