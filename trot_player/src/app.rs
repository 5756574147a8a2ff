//! Top-level driver.
//!
//! `run` acquires the three resources in order (hand tracker, playback
//! device, overlay) and hands them to `run_loop`, which owns them until
//! shutdown. Each resource is an owned value released on drop, so a failure
//! opening a later one releases the earlier ones on the way out.

use std::path::Path;
use std::time::{Duration, Instant};

use hand_pose::classify;
use tracing::{info, warn};

use crate::config::{AppConfig, DisplayConfig, SourceKind};
use crate::controller::PlaybackController;
use crate::error::{StartupError, TrackerError};
use crate::gesture::{HandTracker, ReplayTracker, SimulatedTracker};
use crate::player::{AudioPlayer, PlaybackDevice};
use crate::visualizer::{Overlay, OverlayFrame, OverlayInput, Visualizer};

// ════════════════════════════════════════════════════════════════════════════
// Loop outcome
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// Exit key or window closed.
    Requested,
    /// The tracker ran out of recorded frames.
    EndOfStream,
    /// A frame could not be read.
    ReadFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSummary {
    pub exit:     LoopExit,
    pub frames:   usize,
    pub accepted: usize,
}

// ════════════════════════════════════════════════════════════════════════════
// run(): acquisition
// ════════════════════════════════════════════════════════════════════════════

/// Run the full application. Returns once every resource has been released;
/// an `Err` means startup failed before the loop began.
pub fn run(cfg: &AppConfig) -> Result<LoopSummary, StartupError> {
    match cfg.source {
        SourceKind::Simulated => {
            let (tracker, sim_tx) = SimulatedTracker::new();
            info!("hand tracker: keyboard simulation (keys 1-4, 0 for no hand)");
            launch(
                tracker,
                AudioPlayer::load,
                move |display| Visualizer::new(display, Some(sim_tx)),
                cfg,
                Instant::now,
            )
        }
        SourceKind::Replay => {
            let path = cfg
                .replay_path
                .as_deref()
                .ok_or_else(|| StartupError::Config("replay source needs replay_path".into()))?;
            let tracker = ReplayTracker::open(path, cfg.detector.clone())?;
            launch(
                tracker,
                AudioPlayer::load,
                |display| Visualizer::new(display, None),
                cfg,
                Instant::now,
            )
        }
    }
}

/// Open the playback device, then the overlay, around an already-open
/// tracker, and run the loop. An error from either opener drops whatever
/// was acquired before it.
fn launch<T, D, O, FD, FO, C>(
    tracker:      T,
    open_device:  FD,
    open_overlay: FO,
    cfg:          &AppConfig,
    mut clock:    C,
) -> Result<LoopSummary, StartupError>
where
    T:  HandTracker,
    D:  PlaybackDevice,
    O:  Overlay,
    FD: FnOnce(&Path) -> Result<D, StartupError>,
    FO: FnOnce(&DisplayConfig) -> Result<O, StartupError>,
    C:  FnMut() -> Instant,
{
    let player = open_device(&cfg.audio_path)?;
    info!("loaded {}", cfg.audio_path.display());

    let overlay = open_overlay(&cfg.display)?;

    let mut controller =
        PlaybackController::new(player, cfg.cooldown(), cfg.initial_rate(), clock());
    if cfg.autoplay && controller.start().is_none() {
        warn!("autoplay failed; waiting for a gesture");
    }

    Ok(run_loop(tracker, overlay, controller, clock))
}

// ════════════════════════════════════════════════════════════════════════════
// FrameClock: recorded timestamps over the live clock
// ════════════════════════════════════════════════════════════════════════════

/// Time of each frame. Frames with a capture timestamp are placed on the
/// recording's own timeline, anchored at the live time of the first one;
/// frames without one get the live time.
struct FrameClock<C> {
    live:   C,
    anchor: Option<(Instant, f64)>,
}

impl<C: FnMut() -> Instant> FrameClock<C> {
    fn new(live: C) -> Self {
        FrameClock { live, anchor: None }
    }

    fn at(&mut self, recorded: Option<f64>) -> Instant {
        let now = (self.live)();
        let Some(ts) = recorded else { return now };
        let (origin, first) = *self.anchor.get_or_insert((now, ts));
        origin + Duration::from_secs_f64((ts - first).max(0.0))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// run_loop(): the per-frame pull loop
// ════════════════════════════════════════════════════════════════════════════

/// Read, classify, dispatch, render, poll; until exit or a failed read.
/// Consumes all three resources and releases each exactly once before
/// returning. `clock` supplies the live time; frames carrying a capture
/// timestamp are timed by the recording instead.
pub fn run_loop<T, O, D, C>(
    mut tracker:    T,
    mut overlay:    O,
    mut controller: PlaybackController<D>,
    clock:          C,
) -> LoopSummary
where
    T: HandTracker,
    O: Overlay,
    D: PlaybackDevice,
    C: FnMut() -> Instant,
{
    let mut clock = FrameClock::new(clock);
    let mut frames = 0;
    let mut accepted = 0;

    let exit = loop {
        // 1. Next frame
        let frame = match tracker.next_frame() {
            Ok(frame) => frame,
            Err(TrackerError::EndOfStream) => {
                info!("landmark stream ended after {} frames", frames);
                break LoopExit::EndOfStream;
            }
            Err(e) => {
                warn!("{}; shutting down", e);
                break LoopExit::ReadFailed;
            }
        };
        frames += 1;

        // 2. Classify the first hand, dispatch
        let hand = frame.primary();
        let label = classify(hand);
        let now = clock.at(frame.timestamp);
        if controller.on_gesture(label, now).is_some() {
            accepted += 1;
        }

        // 3. Render, then the tick/exit check
        overlay.render(&OverlayFrame { status: controller.status(now), hand, label });
        if overlay.poll() == OverlayInput::Exit {
            info!("exit requested");
            break LoopExit::Requested;
        }
    };

    // ── Release, reverse acquisition order ────────────────────────────────
    drop(overlay);
    let mut device = controller.into_device();
    device.release();
    drop(device);
    drop(tracker);

    info!(frames, accepted, ?exit, "shut down");
    LoopSummary { exit, frames, accepted }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
