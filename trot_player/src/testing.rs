//! Scripted doubles for the device, tracker and overlay seams.
//! Each one shares its state with a handle so tests can inspect it after
//! the double has been moved into (and dropped by) the code under test.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;

use hand_pose::{GestureLabel, LandmarkSet};

use crate::error::{PlayerError, TrackerError};
use crate::gesture::{HandTracker, TrackedFrame};
use crate::player::PlaybackDevice;
use crate::visualizer::{Overlay, OverlayFrame, OverlayInput};

// ── Playback device ──────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DeviceCall {
    IsPlaying,
    Play,
    Pause,
    SetRate(f32),
}

#[derive(Default)]
struct DeviceState {
    playing:  bool,
    failing:  bool,
    released: bool,
    releases: usize,
    calls:    Vec<DeviceCall>,
}

pub struct MockDevice {
    state: Rc<RefCell<DeviceState>>,
}

#[derive(Clone)]
pub struct DeviceHandle {
    state: Rc<RefCell<DeviceState>>,
}

impl MockDevice {
    pub fn new(playing: bool) -> (MockDevice, DeviceHandle) {
        let state = Rc::new(RefCell::new(DeviceState { playing, ..DeviceState::default() }));
        (MockDevice { state: state.clone() }, DeviceHandle { state })
    }

    fn call(&self, call: DeviceCall) -> Result<(), PlayerError> {
        let mut st = self.state.borrow_mut();
        st.calls.push(call);
        if st.released {
            return Err(PlayerError::Unavailable);
        }
        if st.failing {
            return Err(PlayerError::Stream("mock failure".into()));
        }
        Ok(())
    }
}

impl PlaybackDevice for MockDevice {
    fn play(&mut self) -> Result<(), PlayerError> {
        self.call(DeviceCall::Play)?;
        self.state.borrow_mut().playing = true;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), PlayerError> {
        self.call(DeviceCall::Pause)?;
        self.state.borrow_mut().playing = false;
        Ok(())
    }

    fn is_playing(&self) -> Result<bool, PlayerError> {
        self.call(DeviceCall::IsPlaying)?;
        Ok(self.state.borrow().playing)
    }

    fn set_rate(&mut self, rate: f32) -> Result<(), PlayerError> {
        self.call(DeviceCall::SetRate(rate))
    }

    fn release(&mut self) {
        let mut st = self.state.borrow_mut();
        st.releases += 1;
        st.released = true;
        st.playing = false;
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        if !self.state.borrow().released {
            self.release();
        }
    }
}

impl DeviceHandle {
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.state.borrow().calls.clone()
    }

    /// Only the commands that change device state.
    pub fn commands(&self) -> Vec<DeviceCall> {
        self.calls().into_iter().filter(|c| *c != DeviceCall::IsPlaying).collect()
    }

    pub fn clear(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn playing(&self) -> bool {
        self.state.borrow().playing
    }

    /// Change the play state behind the controller's back.
    pub fn set_playing(&self, playing: bool) {
        self.state.borrow_mut().playing = playing;
    }

    pub fn fail(&self, failing: bool) {
        self.state.borrow_mut().failing = failing;
    }

    pub fn releases(&self) -> usize {
        self.state.borrow().releases
    }
}

// ── Hand tracker ─────────────────────────────────────────────────────────

/// Yields the scripted frames in order, then fails the next read.
pub struct MockTracker {
    frames:   VecDeque<(Option<f64>, Option<LandmarkSet>)>,
    releases: Rc<RefCell<usize>>,
}

impl MockTracker {
    pub fn new(frames: Vec<Option<LandmarkSet>>) -> (MockTracker, Rc<RefCell<usize>>) {
        Self::scripted(frames.into_iter().map(|hand| (None, hand)).collect())
    }

    /// Frames carrying a capture timestamp, like a recording.
    pub fn timed(frames: Vec<(f64, Option<LandmarkSet>)>) -> (MockTracker, Rc<RefCell<usize>>) {
        Self::scripted(frames.into_iter().map(|(t, hand)| (Some(t), hand)).collect())
    }

    fn scripted(
        frames: VecDeque<(Option<f64>, Option<LandmarkSet>)>,
    ) -> (MockTracker, Rc<RefCell<usize>>) {
        let releases = Rc::new(RefCell::new(0));
        (MockTracker { frames, releases: releases.clone() }, releases)
    }
}

impl HandTracker for MockTracker {
    fn next_frame(&mut self) -> Result<TrackedFrame, TrackerError> {
        match self.frames.pop_front() {
            Some((timestamp, hand)) => Ok(TrackedFrame { hands: hand.into_iter().collect(), timestamp }),
            None => Err(TrackerError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "camera unplugged"))),
        }
    }
}

impl Drop for MockTracker {
    fn drop(&mut self) {
        *self.releases.borrow_mut() += 1;
    }
}

// ── Overlay ──────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct OverlayLog {
    pub labels:   Vec<GestureLabel>,
    pub polls:    usize,
    pub releases: usize,
}

/// Records every rendered label; requests exit on poll number `exit_on`.
pub struct MockOverlay {
    exit_on: Option<usize>,
    log:     Rc<RefCell<OverlayLog>>,
}

impl MockOverlay {
    pub fn new(exit_on: Option<usize>) -> (MockOverlay, Rc<RefCell<OverlayLog>>) {
        let log = Rc::new(RefCell::new(OverlayLog::default()));
        (MockOverlay { exit_on, log: log.clone() }, log)
    }
}

impl Overlay for MockOverlay {
    fn render(&mut self, frame: &OverlayFrame<'_>) {
        self.log.borrow_mut().labels.push(frame.label);
    }

    fn poll(&mut self) -> OverlayInput {
        let mut log = self.log.borrow_mut();
        log.polls += 1;
        if Some(log.polls) == self.exit_on {
            OverlayInput::Exit
        } else {
            OverlayInput::Continue
        }
    }
}

impl Drop for MockOverlay {
    fn drop(&mut self) {
        self.log.borrow_mut().releases += 1;
    }
}
