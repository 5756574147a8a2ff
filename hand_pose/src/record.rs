//! Recorded detector output.
//!
//! One JSON object per line, one line per camera frame:
//!
//! ```text
//! {"timestamp": 12.04, "hands": [{"score": 0.93, "landmarks": [{"x": 0.51, "y": 0.83}, ...]}]}
//! ```
//!
//! `timestamp`, `score` and each landmark's `z` are optional.

use std::io::BufRead;

use serde::{Deserialize, Serialize};

use crate::landmark::{Landmark, LandmarkSet};
use crate::PoseError;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    #[serde(default)]
    pub timestamp: Option<f64>,
    #[serde(default)]
    pub hands: Vec<RecordedHand>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordedHand {
    /// Detection confidence, when the recorder captured it.
    #[serde(default)]
    pub score: Option<f32>,
    pub landmarks: Vec<Landmark>,
}

impl RecordedHand {
    pub fn to_landmark_set(&self) -> Result<LandmarkSet, PoseError> {
        LandmarkSet::from_points(self.landmarks.clone())
    }

    /// A hand without a recorded score is assumed to have passed detection.
    pub fn passes(&self, min_confidence: f32) -> bool {
        self.score.map_or(true, |s| s >= min_confidence)
    }
}

impl From<&LandmarkSet> for RecordedHand {
    fn from(set: &LandmarkSet) -> Self {
        RecordedHand { score: None, landmarks: set.points().to_vec() }
    }
}

pub fn parse_frame(line: &str) -> Result<RecordedFrame, PoseError> {
    Ok(serde_json::from_str(line)?)
}

/// Iterate the frames of a JSON-lines recording. Blank lines are skipped.
pub fn read_frames<R: BufRead>(reader: R) -> impl Iterator<Item = Result<RecordedFrame, PoseError>> {
    reader.lines().filter_map(|line| match line {
        Ok(l) if l.trim().is_empty() => None,
        Ok(l)  => Some(parse_frame(&l)),
        Err(e) => Some(Err(PoseError::Io(e))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poses;
    use crate::{classify, GestureLabel};
    use std::io::Cursor;

    #[test]
    fn parse_without_optional_fields() {
        let pts: Vec<String> = (0..21).map(|_| r#"{"x":0.5,"y":0.5}"#.to_string()).collect();
        let line = format!(r#"{{"hands":[{{"landmarks":[{}]}}]}}"#, pts.join(","));
        let frame = parse_frame(&line).unwrap();
        assert_eq!(frame.timestamp, None);
        assert_eq!(frame.hands.len(), 1);
        assert!(frame.hands[0].passes(0.7));
        assert!(frame.hands[0].to_landmark_set().is_ok());
    }

    #[test]
    fn empty_frame_has_no_hands() {
        let frame = parse_frame(r#"{"timestamp": 1.5}"#).unwrap();
        assert!(frame.hands.is_empty());
    }

    #[test]
    fn low_score_fails_threshold() {
        let hand = RecordedHand { score: Some(0.4), landmarks: vec![] };
        assert!(!hand.passes(0.7));
    }

    #[test]
    fn malformed_line_is_json_error() {
        assert!(matches!(parse_frame("{not json"), Err(PoseError::Json(_))));
    }

    #[test]
    fn read_frames_round_trips_a_pose() {
        let frame = RecordedFrame {
            timestamp: Some(0.033),
            hands: vec![RecordedHand::from(&poses::thumb_only())],
        };
        let text = format!("{}\n\n{}\n", serde_json::to_string(&frame).unwrap(), "{}");
        let frames: Vec<_> = read_frames(Cursor::new(text)).collect::<Result<_, _>>().unwrap();
        assert_eq!(frames.len(), 2);

        let set = frames[0].hands[0].to_landmark_set().unwrap();
        assert_eq!(classify(Some(&set)), GestureLabel::ThumbOnly);
        assert!(frames[1].hands.is_empty());
    }
}
