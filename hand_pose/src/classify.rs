//! Rule-table gesture classifier.
//!
//! Each gesture is a predicate over finger-extension tests. Rules are
//! evaluated in the fixed order of [`GESTURE_RULES`]; the first match wins.
//! The order is a tie-break contract: a thumbs-up with the other four
//! fingers clenched satisfies both the fist and the thumb-only predicates,
//! and must classify as a fist.

use std::fmt;

use crate::landmark::{Finger, Landmark, LandmarkSet};

// ════════════════════════════════════════════════════════════════════════════
// Thresholds (normalized frame units)
// ════════════════════════════════════════════════════════════════════════════

/// Default margin a tip must rise above its second joint to count as extended.
pub const DEFAULT_THRESHOLD: f32 = 0.03;
/// Margin used for every thumb test.
pub const THUMB_THRESHOLD:   f32 = 0.05;
/// Tighter margin for the "not extended" checks on inactive fingers.
pub const FOLDED_THRESHOLD:  f32 = 0.02;
/// How far below its second joint each tip must sit for a fist.
pub const FIST_MARGIN:       f32 = 0.03;

const NON_THUMB: [Finger; 4] = [Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky];

// ════════════════════════════════════════════════════════════════════════════
// GestureLabel
// ════════════════════════════════════════════════════════════════════════════

/// Discrete hand pose recognised in a single frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GestureLabel {
    /// Index through pinky clenched; thumb ignored.
    Fist,
    /// All five fingers extended.
    OpenPalm,
    /// Thumb up, other four folded.
    ThumbOnly,
    /// Pinky up, other four folded.
    PinkyOnly,
    /// No hand, or no rule matched.
    None,
}

impl GestureLabel {
    pub fn name(self) -> &'static str {
        match self {
            GestureLabel::Fist      => "Fist",
            GestureLabel::OpenPalm  => "Open palm",
            GestureLabel::ThumbOnly => "Thumb only",
            GestureLabel::PinkyOnly => "Pinky only",
            GestureLabel::None      => "None",
        }
    }
}

impl fmt::Display for GestureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Finger predicates
// ════════════════════════════════════════════════════════════════════════════

/// True iff `tip` sits more than `threshold` above `second_joint`.
pub fn is_finger_extended(tip: Landmark, second_joint: Landmark, threshold: f32) -> bool {
    tip.y < second_joint.y - threshold
}

fn extended(hand: &LandmarkSet, finger: Finger, threshold: f32) -> bool {
    let (tip, joint) = hand.finger(finger);
    is_finger_extended(tip, joint, threshold)
}

fn clenched(hand: &LandmarkSet, finger: Finger) -> bool {
    let (tip, joint) = hand.finger(finger);
    tip.y > joint.y + FIST_MARGIN
}

fn folded(hand: &LandmarkSet, finger: Finger) -> bool {
    !extended(hand, finger, FOLDED_THRESHOLD)
}

// ── gesture predicates ──────────────────────────────────────────────────────

fn is_fist(hand: &LandmarkSet) -> bool {
    NON_THUMB.iter().all(|&f| clenched(hand, f))
}

fn is_open_palm(hand: &LandmarkSet) -> bool {
    extended(hand, Finger::Thumb, THUMB_THRESHOLD)
        && NON_THUMB.iter().all(|&f| extended(hand, f, DEFAULT_THRESHOLD))
}

fn is_thumb_only(hand: &LandmarkSet) -> bool {
    extended(hand, Finger::Thumb, THUMB_THRESHOLD)
        && NON_THUMB.iter().all(|&f| folded(hand, f))
}

fn is_pinky_only(hand: &LandmarkSet) -> bool {
    !extended(hand, Finger::Thumb, THUMB_THRESHOLD)
        && [Finger::Index, Finger::Middle, Finger::Ring].iter().all(|&f| folded(hand, f))
        && extended(hand, Finger::Pinky, THUMB_THRESHOLD)
}

// ════════════════════════════════════════════════════════════════════════════
// Rule table + classify
// ════════════════════════════════════════════════════════════════════════════

pub type GesturePredicate = fn(&LandmarkSet) -> bool;

/// Priority-ordered rules. Do not reorder.
pub const GESTURE_RULES: [(GestureLabel, GesturePredicate); 4] = [
    (GestureLabel::Fist,      is_fist),
    (GestureLabel::OpenPalm,  is_open_palm),
    (GestureLabel::ThumbOnly, is_thumb_only),
    (GestureLabel::PinkyOnly, is_pinky_only),
];

/// Classify one hand. `None` input (no hand in frame) yields
/// [`GestureLabel::None`].
pub fn classify(hand: Option<&LandmarkSet>) -> GestureLabel {
    let Some(hand) = hand else {
        return GestureLabel::None;
    };
    GESTURE_RULES
        .iter()
        .find(|(_, matches)| matches(hand))
        .map(|&(label, _)| label)
        .unwrap_or(GestureLabel::None)
}

/// Every rule that matches, in priority order. Diagnostic only.
pub fn matching_rules(hand: &LandmarkSet) -> Vec<GestureLabel> {
    GESTURE_RULES
        .iter()
        .filter(|(_, matches)| matches(hand))
        .map(|&(label, _)| label)
        .collect()
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
