//! Software-rendered overlay using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ SPEED: 1.5X                              │
//! │ AUDIO PLAYING: TRUE                      │
//! │ LAST GESTURE: 2.4S AGO                   │
//! │                                          │
//! │              [hand skeleton]             │
//! │                                          │
//! │ GESTURE: OPEN PALM                       │
//! │ 1=fist 2=palm 3=thumb 4=pinky  Q=quit    │
//! └──────────────────────────────────────────┘
//! ```
//!
//! The overlay is observational only. It also owns the keyboard, so in
//! simulated mode it forwards pose selections to the tracker.

use std::sync::mpsc::Sender;
use std::time::Duration;

use hand_pose::{GestureLabel, LandmarkSet, HAND_CONNECTIONS};
use minifb::{Key, KeyRepeat, Window, WindowOptions};
use tracing::{debug, info, warn};

use crate::config::DisplayConfig;
use crate::controller::PlaybackStatus;
use crate::error::StartupError;
use crate::gesture::SimPose;

// ════════════════════════════════════════════════════════════════════════════
// Overlay trait
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayInput {
    Continue,
    Exit,
}

/// Everything drawn for one frame.
#[derive(Clone, Copy, Debug)]
pub struct OverlayFrame<'a> {
    pub status: PlaybackStatus,
    pub hand:   Option<&'a LandmarkSet>,
    pub label:  GestureLabel,
}

/// A display surface polled once per loop iteration. Implementations close
/// their window on drop.
pub trait Overlay {
    fn render(&mut self, frame: &OverlayFrame<'_>);
    /// The loop's tick point: handle pending key events, report exit.
    fn poll(&mut self) -> OverlayInput;
}

// ════════════════════════════════════════════════════════════════════════════
// Colors + status text
// ════════════════════════════════════════════════════════════════════════════

const BG_COLOR:      u32 = 0xFF1A1A2E;
const TEXT_COLOR:    u32 = 0xFFEEEEEE;
const LEGEND_COLOR:  u32 = 0xFF888888;
const PLAYING_COLOR: u32 = 0xFF00C853;
const PAUSED_COLOR:  u32 = 0xFFFF5252;
const UNKNOWN_COLOR: u32 = 0xFFFFD740;
const BONE_COLOR:    u32 = 0xFFAADDFF;
const JOINT_COLOR:   u32 = 0xFFFFD700;

const FONT_SCALE: usize = 2;
const LINE_H:     usize = 8 * FONT_SCALE;
const MARGIN:     usize = 10;

const LEGEND: &str = "1=fist 2=palm 3=thumb 4=pinky 0=no hand  Q=quit";

pub fn rate_line(status: &PlaybackStatus) -> String {
    format!("Speed: {}", status.rate)
}

/// Text and color for the device's actual play state.
pub fn playing_line(status: &PlaybackStatus) -> (String, u32) {
    match status.device_playing {
        Some(true)  => ("Audio Playing: True".to_string(), PLAYING_COLOR),
        Some(false) => ("Audio Playing: False".to_string(), PAUSED_COLOR),
        None        => ("Audio Playing: unavailable".to_string(), UNKNOWN_COLOR),
    }
}

pub fn gesture_age_line(since: Duration) -> String {
    format!("Last Gesture: {:.1}s ago", since.as_secs_f64())
}

pub fn gesture_line(label: GestureLabel) -> String {
    format!("Gesture: {}", label.name())
}

/// Simulated pose bound to a number key.
pub fn pose_for_key(key: Key) -> Option<SimPose> {
    match key {
        Key::Key0 | Key::NumPad0 => Some(SimPose::NoHand),
        Key::Key1 | Key::NumPad1 => Some(SimPose::Fist),
        Key::Key2 | Key::NumPad2 => Some(SimPose::OpenPalm),
        Key::Key3 | Key::NumPad3 => Some(SimPose::ThumbOnly),
        Key::Key4 | Key::NumPad4 => Some(SimPose::PinkyOnly),
        _ => None,
    }
}

const POSE_KEYS: [Key; 10] = [
    Key::Key0, Key::Key1, Key::Key2, Key::Key3, Key::Key4,
    Key::NumPad0, Key::NumPad1, Key::NumPad2, Key::NumPad3, Key::NumPad4,
];

// ════════════════════════════════════════════════════════════════════════════
// Canvas: the pixel buffer and primitives
// ════════════════════════════════════════════════════════════════════════════

pub struct Canvas {
    buf:    Vec<u32>,
    width:  usize,
    height: usize,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Canvas { buf: vec![BG_COLOR; width * height], width, height }
    }

    pub fn pixels(&self) -> &[u32] {
        &self.buf
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        (x < self.width && y < self.height).then(|| self.buf[y * self.width + x])
    }

    /// Draw a complete frame.
    pub fn draw_frame(&mut self, frame: &OverlayFrame<'_>) {
        self.buf.fill(BG_COLOR);

        // ── Hand ──────────────────────────────────────────────────────────
        if let Some(hand) = frame.hand {
            self.draw_hand(hand);
        }

        // ── Status block ──────────────────────────────────────────────────
        let (playing, playing_color) = playing_line(&frame.status);
        self.draw_label(&rate_line(&frame.status), MARGIN, MARGIN, TEXT_COLOR);
        self.draw_label(&playing, MARGIN, MARGIN + LINE_H, playing_color);
        self.draw_label(
            &gesture_age_line(frame.status.since_last_gesture),
            MARGIN, MARGIN + 2 * LINE_H, TEXT_COLOR,
        );

        // ── Classification + legend ───────────────────────────────────────
        let bottom = self.height.saturating_sub(MARGIN + LINE_H);
        self.draw_label(&gesture_line(frame.label), MARGIN, bottom.saturating_sub(LINE_H), TEXT_COLOR);
        self.draw_label(LEGEND, MARGIN, bottom, LEGEND_COLOR);
    }

    // ── Hand skeleton ─────────────────────────────────────────────────────

    fn draw_hand(&mut self, hand: &LandmarkSet) {
        let (w, h) = ((self.width - 1) as f32, (self.height - 1) as f32);
        let to_px = |x: f32, y: f32| {
            ((x.clamp(0.0, 1.0) * w) as isize, (y.clamp(0.0, 1.0) * h) as isize)
        };
        for &(a, b) in HAND_CONNECTIONS.iter() {
            let (pa, pb) = (hand[a], hand[b]);
            let (x0, y0) = to_px(pa.x, pa.y);
            let (x1, y1) = to_px(pb.x, pb.y);
            self.draw_line(x0, y0, x1, y1, BONE_COLOR);
        }
        for p in hand.points() {
            let (x, y) = to_px(p.x, p.y);
            self.fill_rect(x.max(2) as usize - 2, y.max(2) as usize - 2, 5, 5, JOINT_COLOR);
        }
    }

    // ── Primitive drawing helpers ─────────────────────────────────────────

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y + h).min(self.height) {
            for col in x..(x + w).min(self.width) {
                self.buf[row * self.width + col] = color;
            }
        }
    }

    fn set_pixel(&mut self, x: isize, y: isize, color: u32) {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            self.buf[y as usize * self.width + x as usize] = color;
        }
    }

    /// Bresenham, two pixels thick.
    fn draw_line(&mut self, x0: isize, y0: isize, x1: isize, y1: isize, color: u32) {
        let (dx, dy) = ((x1 - x0).abs(), -(y1 - y0).abs());
        let (sx, sy) = (if x0 < x1 { 1 } else { -1 }, if y0 < y1 { 1 } else { -1 });
        let (mut x, mut y, mut err) = (x0, y0, dx + dy);
        loop {
            self.set_pixel(x, y, color);
            self.set_pixel(x + 1, y, color);
            if x == x1 && y == y1 { break; }
            let e2 = 2 * err;
            if e2 >= dy { err += dy; x += sx; }
            if e2 <= dx { err += dx; y += sy; }
        }
    }

    /// 3×5 bitmap font, scaled by `FONT_SCALE`.
    fn draw_label(&mut self, text: &str, x: usize, y: usize, color: u32) {
        let advance = 4 * FONT_SCALE;
        let mut cx = x;
        for ch in text.chars() {
            if cx + advance > self.width { break; }
            for (row, &bits) in char_glyph(ch).iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        self.fill_rect(
                            cx + col * FONT_SCALE, y + row * FONT_SCALE,
                            FONT_SCALE, FONT_SCALE, color,
                        );
                    }
                }
            }
            cx += advance;
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer: minifb window
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window: Window,
    canvas: Canvas,
    sim_tx: Option<Sender<SimPose>>,
    failed: bool,
}

impl Visualizer {
    /// Open the window. `sim_tx` receives pose selections from the number
    /// keys; pass `None` when frames come from elsewhere.
    pub fn new(display: &DisplayConfig, sim_tx: Option<Sender<SimPose>>) -> Result<Self, StartupError> {
        let mut window = Window::new(
            &display.title,
            display.width, display.height,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        ).map_err(|e| StartupError::Display(e.to_string()))?;

        let fps = u64::from(display.fps.max(1));
        window.limit_update_rate(Some(Duration::from_micros(1_000_000 / fps)));

        let (width, height) = (display.width, display.height);
        info!("display opened: {}x{} @ {} fps", width, height, fps);
        Ok(Visualizer {
            window,
            canvas: Canvas::new(display.width, display.height),
            sim_tx,
            failed: false,
        })
    }
}

impl Overlay for Visualizer {
    fn render(&mut self, frame: &OverlayFrame<'_>) {
        self.canvas.draw_frame(frame);
        if let Err(e) = self.window.update_with_buffer(
            self.canvas.pixels(), self.canvas.width, self.canvas.height,
        ) {
            warn!("display update failed: {}", e);
            self.failed = true;
        }
    }

    fn poll(&mut self) -> OverlayInput {
        if self.failed || !self.window.is_open() {
            return OverlayInput::Exit;
        }
        if self.window.is_key_pressed(Key::Q, KeyRepeat::No) {
            debug!("exit key pressed");
            return OverlayInput::Exit;
        }
        if let Some(tx) = &self.sim_tx {
            for key in POSE_KEYS {
                if !self.window.is_key_pressed(key, KeyRepeat::No) {
                    continue;
                }
                if let Some(pose) = pose_for_key(key) {
                    // The tracker is dropped before us only on the shutdown path.
                    let _ = tx.send(pose);
                }
            }
        }
        OverlayInput::Continue
    }
}

impl Drop for Visualizer {
    fn drop(&mut self) {
        info!("display closed");
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' | 'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' | 'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' | 'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'z' | 'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000],
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::PlaybackRate;
    use hand_pose::{poses, HandJoint};

    fn status(playing: Option<bool>) -> PlaybackStatus {
        PlaybackStatus {
            rate: PlaybackRate::Fast,
            device_playing: playing,
            since_last_gesture: Duration::from_millis(2400),
        }
    }

    #[test]
    fn status_text() {
        let st = status(Some(true));
        assert_eq!(rate_line(&st), "Speed: 1.5x");
        assert_eq!(gesture_age_line(st.since_last_gesture), "Last Gesture: 2.4s ago");
        assert_eq!(gesture_line(GestureLabel::OpenPalm), "Gesture: Open palm");
    }

    #[test]
    fn playing_state_is_colored() {
        assert_eq!(playing_line(&status(Some(true))).1, PLAYING_COLOR);
        assert_eq!(playing_line(&status(Some(false))).1, PAUSED_COLOR);
        let (text, color) = playing_line(&status(None));
        assert!(text.ends_with("unavailable"));
        assert_eq!(color, UNKNOWN_COLOR);
    }

    #[test]
    fn number_keys_select_poses() {
        assert_eq!(pose_for_key(Key::Key1), Some(SimPose::Fist));
        assert_eq!(pose_for_key(Key::NumPad4), Some(SimPose::PinkyOnly));
        assert_eq!(pose_for_key(Key::Key0), Some(SimPose::NoHand));
        assert_eq!(pose_for_key(Key::Q), None);
        assert!(POSE_KEYS.iter().all(|&k| pose_for_key(k).is_some()));
    }

    #[test]
    fn every_label_character_has_a_glyph() {
        let fallback = char_glyph('~');
        let text = format!("{}{}", LEGEND, "Speed Audio Playing True False Last Gesture ago");
        for ch in text.chars().filter(|c| *c != ' ') {
            assert_ne!(char_glyph(ch), fallback, "missing glyph for {:?}", ch);
        }
    }

    #[test]
    fn frame_draws_hand_joints() {
        let hand = poses::open_palm();
        let mut canvas = Canvas::new(320, 240);
        canvas.draw_frame(&OverlayFrame {
            status: status(Some(true)),
            hand:   Some(&hand),
            label:  GestureLabel::OpenPalm,
        });
        let wrist = hand[HandJoint::Wrist];
        let x = (wrist.x * 319.0) as usize;
        let y = (wrist.y * 239.0) as usize;
        assert_eq!(canvas.pixel(x, y), Some(JOINT_COLOR));
    }

    #[test]
    fn frame_without_hand_leaves_centre_clear() {
        let mut canvas = Canvas::new(320, 240);
        canvas.draw_frame(&OverlayFrame {
            status: status(Some(false)),
            hand:   None,
            label:  GestureLabel::None,
        });
        assert_eq!(canvas.pixel(160, 120), Some(BG_COLOR));
        assert_eq!(canvas.pixel(320, 0), None);
    }
}
