//! Error types.
//!
//! * [`StartupError`]: fatal; the process exits before the main loop.
//! * [`TrackerError`]: a frame could not be read; ends the loop normally.
//! * [`PlayerError`]: the playback device failed at runtime; the controller
//!   degrades to no-ops and the loop keeps running.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("hand tracker initialization failed: {0}")]
    Tracker(String),

    #[error("audio file not found: {}", .0.display())]
    AudioMissing(PathBuf),

    #[error("cannot decode audio file {}: {reason}", .path.display())]
    AudioDecode { path: PathBuf, reason: String },

    #[error("playback device initialization failed: {0}")]
    PlaybackInit(String),

    #[error("display initialization failed: {0}")]
    Display(String),
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("no more frames")]
    EndOfStream,

    #[error("frame read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed frame: {0}")]
    Parse(#[from] hand_pose::PoseError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlayerError {
    #[error("playback device is unavailable")]
    Unavailable,

    #[error("playback stream error: {0}")]
    Stream(String),
}
