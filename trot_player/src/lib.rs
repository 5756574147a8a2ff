//! # trot_player
//!
//! Hand-gesture playback controller. Each frame, the first detected hand is
//! classified into a pose and the pose drives an audio track's playback.
//!
//! ## Gesture → Action mapping
//!
//! | Gesture | Action |
//! |---|---|
//! | Fist | Pause if the track is playing, otherwise resume |
//! | Open palm (all five fingers up) | Rate 1.5×, start playing if stopped |
//! | Thumb only | Rate 2.0×, start playing if stopped |
//! | Pinky only | Rate 1.0×, start playing if stopped |
//!
//! Gestures closer together than the cooldown (0.7 s by default) are
//! ignored, and asking for the rate already in effect does nothing.
//!
//! ## Overlay
//!
//! The window shows the current rate, whether the track is actually
//! playing, seconds since the last accepted gesture, the detected hand and
//! its classification.
//!
//! ## Landmark sources
//!
//! * `simulated` (default): keyboard-selected poses.
//! * `replay`: recorded detector output, one JSON frame per line.
//!
//! ### Keyboard
//!
//! | Key | Effect |
//! |---|---|
//! | `1` | Show a fist |
//! | `2` | Show an open palm |
//! | `3` | Show a thumb |
//! | `4` | Show a pinky |
//! | `0` | Remove the hand |
//! | `Q` | Quit |

pub mod app;
pub mod config;
pub mod controller;
pub mod error;
pub mod gesture;
pub mod logging;
pub mod player;
pub mod visualizer;

#[cfg(test)]
mod testing;
