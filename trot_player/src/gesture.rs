//! Hand tracking sources: keyboard simulation and recorded replay.
//!
//! The public interface is [`HandTracker`]: one call per loop iteration,
//! returning the hands seen in the next frame. The driver does not care
//! whether frames come from a camera + landmark detector, a recording, or
//! the keyboard simulator.

use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use hand_pose::record::parse_frame;
use hand_pose::{poses, LandmarkSet};
use tracing::{debug, info};

use crate::config::DetectorConfig;
use crate::error::{StartupError, TrackerError};

// ════════════════════════════════════════════════════════════════════════════
// TrackedFrame + HandTracker
// ════════════════════════════════════════════════════════════════════════════

/// Hands detected in one frame, most confident first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackedFrame {
    pub hands: Vec<LandmarkSet>,
    /// Capture time in seconds, when the source recorded one. Live sources
    /// leave it empty and the driver uses its own clock.
    pub timestamp: Option<f64>,
}

impl TrackedFrame {
    /// The hand that drives playback. Only one hand is ever used.
    pub fn primary(&self) -> Option<&LandmarkSet> {
        self.hands.first()
    }
}

/// Anything that can deliver landmark frames.
///
/// An error means no further frames are obtainable; the caller ends the
/// loop rather than retrying. Implementations release their capture
/// resources on drop.
pub trait HandTracker {
    fn next_frame(&mut self) -> Result<TrackedFrame, TrackerError>;
}

// ════════════════════════════════════════════════════════════════════════════
// SimulatedTracker: keyboard-selected poses
// ════════════════════════════════════════════════════════════════════════════

/// Pose selected from the overlay's keyboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimPose {
    NoHand,
    Fist,
    OpenPalm,
    ThumbOnly,
    PinkyOnly,
}

impl SimPose {
    pub fn landmarks(self) -> Option<LandmarkSet> {
        match self {
            SimPose::NoHand    => None,
            SimPose::Fist      => Some(poses::fist()),
            SimPose::OpenPalm  => Some(poses::open_palm()),
            SimPose::ThumbOnly => Some(poses::thumb_only()),
            SimPose::PinkyOnly => Some(poses::pinky_only()),
        }
    }
}

/// Holds the last pose selected on the overlay and reports it every frame,
/// like a hand held still in front of the camera.
pub struct SimulatedTracker {
    rx:      Receiver<SimPose>,
    current: SimPose,
}

impl SimulatedTracker {
    /// Returns the tracker and the sender the overlay feeds poses into.
    pub fn new() -> (Self, Sender<SimPose>) {
        let (tx, rx) = mpsc::channel();
        (SimulatedTracker { rx, current: SimPose::NoHand }, tx)
    }

    #[cfg(test)]
    pub fn current(&self) -> SimPose {
        self.current
    }
}

impl HandTracker for SimulatedTracker {
    fn next_frame(&mut self) -> Result<TrackedFrame, TrackerError> {
        loop {
            match self.rx.try_recv() {
                Ok(pose) => {
                    if pose != self.current {
                        debug!(?pose, "simulated pose");
                    }
                    self.current = pose;
                }
                // The overlay owns the sender; once it is gone the last pose stays.
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        Ok(TrackedFrame {
            hands:     self.current.landmarks().into_iter().collect(),
            timestamp: None,
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ReplayTracker: recorded detector output
// ════════════════════════════════════════════════════════════════════════════

/// Replays a JSON-lines landmark recording, one line per frame.
/// Detection thresholds are applied to recorded scores, and surviving hands
/// are ordered by score. Unscored hands keep their recorded order after the
/// scored ones.
pub struct ReplayTracker<R: BufRead> {
    lines:    Lines<R>,
    detector: DetectorConfig,
    frame_no: usize,
}

impl ReplayTracker<BufReader<File>> {
    pub fn open(path: &Path, detector: DetectorConfig) -> Result<Self, StartupError> {
        let file = File::open(path)
            .map_err(|e| StartupError::Tracker(format!("cannot open {}: {}", path.display(), e)))?;
        info!("replaying landmarks from {} ({})", path.display(), detector.summary());
        Ok(Self::from_reader(BufReader::new(file), detector))
    }
}

impl<R: BufRead> ReplayTracker<R> {
    pub fn from_reader(reader: R, detector: DetectorConfig) -> Self {
        ReplayTracker { lines: reader.lines(), detector, frame_no: 0 }
    }
}

impl<R: BufRead> HandTracker for ReplayTracker<R> {
    fn next_frame(&mut self) -> Result<TrackedFrame, TrackerError> {
        let line = loop {
            match self.lines.next() {
                None => {
                    debug!("replay exhausted after {} frames", self.frame_no);
                    return Err(TrackerError::EndOfStream);
                }
                Some(line) => {
                    let line = line?;
                    if !line.trim().is_empty() {
                        break line;
                    }
                }
            }
        };
        self.frame_no += 1;

        let recorded = parse_frame(&line)?;
        let mut detected: Vec<_> = recorded
            .hands
            .iter()
            .filter(|h| h.passes(self.detector.min_detection_confidence))
            .collect();
        detected.sort_by(|a, b| match (a.score, b.score) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None)    => Ordering::Less,
            (None, Some(_))    => Ordering::Greater,
            (None, None)       => Ordering::Equal,
        });
        let hands = detected
            .into_iter()
            .take(self.detector.max_num_hands)
            .map(|h| h.to_landmark_set())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TrackedFrame {
            hands,
            timestamp: recorded.timestamp.filter(|t| t.is_finite()),
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
