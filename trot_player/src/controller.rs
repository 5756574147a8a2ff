//! Playback controller.
//!
//! Owns the playback device and the playback state, and turns classified
//! gestures into device commands:
//!
//! | Gesture | Effect |
//! |---|---|
//! | Fist | pause if the device is playing, otherwise resume |
//! | Open palm | rate 1.5×, start playback if stopped |
//! | Thumb only | rate 2.0×, start playback if stopped |
//! | Pinky only | rate 1.0×, start playback if stopped |
//!
//! A gesture is only accepted when more than the cooldown has passed since
//! the previous accepted one. A rate gesture that matches the current rate
//! is ignored and does not restart the cooldown.

use std::fmt;
use std::time::{Duration, Instant};

use hand_pose::GestureLabel;
use tracing::{debug, info, trace, warn};

use crate::error::PlayerError;
use crate::player::PlaybackDevice;

// ════════════════════════════════════════════════════════════════════════════
// PlaybackRate
// ════════════════════════════════════════════════════════════════════════════

/// The only rates the gestures can select.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PlaybackRate {
    #[default]
    Normal,
    Fast,
    Double,
}

impl PlaybackRate {
    pub const ALL: [PlaybackRate; 3] = [PlaybackRate::Normal, PlaybackRate::Fast, PlaybackRate::Double];

    pub const fn value(self) -> f32 {
        match self {
            PlaybackRate::Normal => 1.0,
            PlaybackRate::Fast   => 1.5,
            PlaybackRate::Double => 2.0,
        }
    }

    pub fn from_f32(v: f32) -> Option<Self> {
        Self::ALL.into_iter().find(|r| (r.value() - v).abs() < 1e-6)
    }

    /// Target rate for a rate-setting gesture; `None` for Fist and None.
    pub fn for_gesture(label: GestureLabel) -> Option<Self> {
        match label {
            GestureLabel::OpenPalm  => Some(PlaybackRate::Fast),
            GestureLabel::ThumbOnly => Some(PlaybackRate::Double),
            GestureLabel::PinkyOnly => Some(PlaybackRate::Normal),
            GestureLabel::Fist | GestureLabel::None => None,
        }
    }
}

impl fmt::Display for PlaybackRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}x", self.value())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Command
// ════════════════════════════════════════════════════════════════════════════

/// What the controller asked the device to do for one accepted gesture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Play,
    Pause,
    /// Apply the rate, starting playback first if it was stopped.
    SetRateAndEnsurePlaying(PlaybackRate),
}

/// Snapshot for the overlay.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaybackStatus {
    pub rate: PlaybackRate,
    /// The device's own answer; `None` when it cannot be queried.
    pub device_playing: Option<bool>,
    pub since_last_gesture: Duration,
}

// ════════════════════════════════════════════════════════════════════════════
// PlaybackController
// ════════════════════════════════════════════════════════════════════════════

pub struct PlaybackController<D: PlaybackDevice> {
    device:        D,
    cooldown:      Duration,
    rate:          PlaybackRate,
    is_playing:    bool,
    last_accepted: Instant,
    /// Set while device calls are failing.
    degraded:      bool,
    warnings:      WarnLimiter,
}

impl<D: PlaybackDevice> PlaybackController<D> {
    /// `started_at` seeds the cooldown clock, so no gesture is accepted
    /// during the first `cooldown` after startup.
    pub fn new(device: D, cooldown: Duration, initial_rate: PlaybackRate, started_at: Instant) -> Self {
        PlaybackController {
            device,
            cooldown,
            rate: initial_rate,
            is_playing: false,
            last_accepted: started_at,
            degraded: false,
            warnings: WarnLimiter::new(DEGRADED_WARN_INTERVAL),
        }
    }

    pub fn rate(&self)          -> PlaybackRate { self.rate }
    pub fn is_playing(&self)    -> bool         { self.is_playing }
    pub fn last_accepted(&self) -> Instant      { self.last_accepted }

    /// Give the device back for release.
    pub fn into_device(self) -> D {
        self.device
    }

    pub fn cooldown_elapsed(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_accepted) > self.cooldown
    }

    /// The startup Play, issued outside the gesture flow. Does not touch
    /// the cooldown clock.
    pub fn start(&mut self) -> Option<Command> {
        let cmd = self.resume()?;
        info!(rate = %self.rate, "playback started");
        Some(cmd)
    }

    /// Handle one classified frame. Returns the command issued, if any.
    pub fn on_gesture(&mut self, label: GestureLabel, now: Instant) -> Option<Command> {
        if label == GestureLabel::None {
            return None;
        }
        if !self.cooldown_elapsed(now) {
            trace!(%label, "gesture ignored during cooldown");
            return None;
        }

        let cmd = match PlaybackRate::for_gesture(label) {
            None => self.toggle_or_resume()?,
            Some(target) if target == self.rate => {
                trace!(%label, rate = %self.rate, "already at requested rate");
                return None;
            }
            Some(target) => self.set_rate(target)?,
        };

        self.last_accepted = now;
        match cmd {
            Command::Pause => info!(%label, "gesture: pause"),
            Command::Play  => info!(%label, rate = %self.rate, "gesture: resume"),
            Command::SetRateAndEnsurePlaying(rate) => info!(%label, %rate, "gesture: rate change"),
        }
        Some(cmd)
    }

    /// Pause if the device reports playing, otherwise resume. Driven by the
    /// device's own state so an external pause or track end is tolerated.
    pub fn toggle_or_resume(&mut self) -> Option<Command> {
        let playing = self.device_call("is_playing", |d| d.is_playing())?;
        if playing {
            self.device_call("pause", |d| d.pause())?;
            self.is_playing = false;
            Some(Command::Pause)
        } else {
            self.resume()
        }
    }

    /// Switch to `rate`, starting playback first if needed. The rate is
    /// applied even when already playing.
    pub fn set_rate(&mut self, rate: PlaybackRate) -> Option<Command> {
        let playing = self.device_call("is_playing", |d| d.is_playing())?;
        if !playing {
            self.device_call("play", |d| d.play())?;
            self.is_playing = true;
        }
        self.device_call("set_rate", |d| d.set_rate(rate.value()))?;
        self.rate = rate;
        self.is_playing = true;
        Some(Command::SetRateAndEnsurePlaying(rate))
    }

    pub fn status(&self, now: Instant) -> PlaybackStatus {
        PlaybackStatus {
            rate: self.rate,
            device_playing: self.device.is_playing().ok(),
            since_last_gesture: now.saturating_duration_since(self.last_accepted),
        }
    }

    fn resume(&mut self) -> Option<Command> {
        self.device_call("play", |d| d.play())?;
        self.is_playing = true;
        let rate = self.rate.value();
        self.device_call("set_rate", |d| d.set_rate(rate))?;
        Some(Command::Play)
    }

    /// Run one device operation. On failure, warn (at most once per
    /// [`DEGRADED_WARN_INTERVAL`]), resync `is_playing` from the device when
    /// it still answers, and yield `None`.
    fn device_call<T>(
        &mut self,
        op: &'static str,
        f: impl FnOnce(&mut D) -> Result<T, PlayerError>,
    ) -> Option<T> {
        match f(&mut self.device) {
            Ok(v) => {
                if self.degraded {
                    self.degraded = false;
                    self.warnings.reset();
                    info!("playback device recovered");
                }
                Some(v)
            }
            Err(e) => {
                self.degraded = true;
                match self.warnings.check(Instant::now()) {
                    Some(suppressed) => warn!(op, error = %e, suppressed, "playback command skipped"),
                    None => debug!(op, error = %e, "playback command skipped"),
                }
                if let Ok(p) = self.device.is_playing() {
                    self.is_playing = p;
                }
                None
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// WarnLimiter
// ════════════════════════════════════════════════════════════════════════════

/// Minimum spacing between two degraded-device warnings. A held gesture
/// retries every frame while the device is down.
pub const DEGRADED_WARN_INTERVAL: Duration = Duration::from_secs(2);

/// Lets one warning through per interval and counts the ones held back.
#[derive(Debug)]
struct WarnLimiter {
    interval:   Duration,
    last:       Option<Instant>,
    suppressed: usize,
}

impl WarnLimiter {
    fn new(interval: Duration) -> Self {
        WarnLimiter { interval, last: None, suppressed: 0 }
    }

    /// `Some(n)` when a warning is due, `n` being how many were held back
    /// since the previous one.
    fn check(&mut self, now: Instant) -> Option<usize> {
        let due = self
            .last
            .map_or(true, |last| now.saturating_duration_since(last) >= self.interval);
        if due {
            self.last = Some(now);
            Some(std::mem::take(&mut self.suppressed))
        } else {
            self.suppressed += 1;
            None
        }
    }

    fn reset(&mut self) {
        self.last = None;
        self.suppressed = 0;
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
