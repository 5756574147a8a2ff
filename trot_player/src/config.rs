//! Application configuration.
//!
//! Defaults reproduce the stock setup; a TOML file can override any field,
//! and command-line arguments override the file.
//!
//! ```toml
//! audio_path    = "audio/grace-in-hanbok.wav"
//! cooldown_secs = 0.7
//! source        = "replay"
//! replay_path   = "recordings/session.jsonl"
//!
//! [detector]
//! min_detection_confidence = 0.8
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::controller::PlaybackRate;
use crate::error::StartupError;

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Audio track to control. Must exist at startup.
    pub audio_path: PathBuf,
    /// Minimum seconds between two accepted gestures.
    pub cooldown_secs: f64,
    /// Rate the controller starts at; one of 1.0, 1.5, 2.0.
    pub initial_rate: f32,
    /// Issue a Play command before the first frame.
    pub autoplay: bool,
    pub source: SourceKind,
    /// Recording to replay when `source = "replay"`.
    pub replay_path: Option<PathBuf>,
    pub detector: DetectorConfig,
    pub display: DisplayConfig,
    /// Default tracing filter; `RUST_LOG` takes precedence.
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            audio_path:    PathBuf::from("audio").join("grace-in-hanbok.wav"),
            cooldown_secs: 0.7,
            initial_rate:  1.0,
            autoplay:      true,
            source:        SourceKind::Simulated,
            replay_path:   None,
            detector:      DetectorConfig::default(),
            display:       DisplayConfig::default(),
            log_level:     "info".to_string(),
        }
    }
}

/// Where landmark frames come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Keyboard-selected canned poses.
    #[default]
    Simulated,
    /// Recorded detector output (JSON lines).
    Replay,
}

/// Settings handed to the landmark detector.
///
/// Replay applies `max_num_hands` and `min_detection_confidence` to the
/// recorded hands. `min_tracking_confidence` and `model_complexity` only
/// matter to a live detector; replay reports them so a recording can be
/// matched to the settings it was captured with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub max_num_hands: usize,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
    /// 0 = lightest model.
    pub model_complexity: u8,
}

impl DetectorConfig {
    /// One-line description for the startup log.
    pub fn summary(&self) -> String {
        format!(
            "max hands {}, min detection {:.2}, min tracking {:.2}, model complexity {}",
            self.max_num_hands,
            self.min_detection_confidence,
            self.min_tracking_confidence,
            self.model_complexity,
        )
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            max_num_hands: 1,
            min_detection_confidence: 0.7,
            min_tracking_confidence: 0.7,
            model_complexity: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub title:  String,
    pub width:  usize,
    pub height: usize,
    pub fps:    u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            title:  "Easy Gesture Music Controller".to_string(),
            width:  640,
            height: 480,
            fps:    60,
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, StartupError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, StartupError> {
        let text = fs::read_to_string(path).map_err(|source| StartupError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Apply command-line overrides.
    ///
    /// `[AUDIO_PATH] [--config FILE] [--replay FILE] [--no-autoplay]`;
    /// `--config` is consumed by [`config_path_from_args`] and skipped here.
    pub fn apply_args<I, S>(&mut self, args: I) -> Result<(), StartupError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_ref() {
                "--config" => {
                    args.next();
                }
                "--replay" => {
                    let path = args.next().ok_or_else(|| {
                        StartupError::Config("--replay needs a file path".into())
                    })?;
                    self.source = SourceKind::Replay;
                    self.replay_path = Some(PathBuf::from(path.as_ref()));
                }
                "--no-autoplay" => self.autoplay = false,
                flag if flag.starts_with("--") => {
                    return Err(StartupError::Config(format!("unknown option {}", flag)));
                }
                path => self.audio_path = PathBuf::from(path),
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), StartupError> {
        let bad = |msg: String| Err(StartupError::Config(msg));

        if !self.cooldown_secs.is_finite() || self.cooldown_secs < 0.0 {
            return bad(format!("cooldown_secs must be >= 0, got {}", self.cooldown_secs));
        }
        if PlaybackRate::from_f32(self.initial_rate).is_none() {
            return bad(format!("initial_rate must be 1.0, 1.5 or 2.0, got {}", self.initial_rate));
        }
        let d = &self.detector;
        if d.max_num_hands == 0 {
            return bad("detector.max_num_hands must be at least 1".into());
        }
        for (name, v) in [
            ("min_detection_confidence", d.min_detection_confidence),
            ("min_tracking_confidence",  d.min_tracking_confidence),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return bad(format!("detector.{} must be within 0..=1, got {}", name, v));
            }
        }
        if self.source == SourceKind::Replay && self.replay_path.is_none() {
            return bad("source = \"replay\" needs replay_path".into());
        }
        if self.display.width == 0 || self.display.height == 0 {
            return bad("display size must be non-zero".into());
        }
        Ok(())
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs_f64(self.cooldown_secs)
    }

    pub fn initial_rate(&self) -> PlaybackRate {
        PlaybackRate::from_f32(self.initial_rate).unwrap_or_default()
    }
}

/// The value following `--config`, if any.
pub fn config_path_from_args<S: AsRef<str>>(args: &[S]) -> Option<PathBuf> {
    args.iter()
        .position(|a| a.as_ref() == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|p| PathBuf::from(p.as_ref()))
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_stock_setup() {
        let cfg = AppConfig::default();
        assert!((cfg.cooldown().as_secs_f64() - 0.7).abs() < 1e-6);
        assert_eq!(cfg.initial_rate(), PlaybackRate::Normal);
        assert_eq!(cfg.detector.max_num_hands, 1);
        assert_eq!(cfg.detector.min_detection_confidence, 0.7);
        assert_eq!(cfg.detector.model_complexity, 0);
        assert!(cfg.autoplay);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = AppConfig::from_toml_str(
            "cooldown_secs = 1.25\n[detector]\nmin_detection_confidence = 0.8\n",
        )
        .unwrap();
        assert_eq!(cfg.cooldown_secs, 1.25);
        assert_eq!(cfg.detector.min_detection_confidence, 0.8);
        assert_eq!(cfg.detector.min_tracking_confidence, 0.7);
        assert_eq!(cfg.display, DisplayConfig::default());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "source = \"replay\"\nreplay_path = \"frames.jsonl\"").unwrap();
        let cfg = AppConfig::load(file.path()).unwrap();
        assert_eq!(cfg.source, SourceKind::Replay);
        assert_eq!(cfg.replay_path, Some(PathBuf::from("frames.jsonl")));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn missing_file_is_config_io() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, StartupError::ConfigIo { .. }));
    }

    #[test]
    fn bad_toml_is_parse_error() {
        assert!(matches!(
            AppConfig::from_toml_str("cooldown_secs = \"soon\""),
            Err(StartupError::ConfigParse(_))
        ));
    }

    #[test]
    fn args_override_audio_and_source() {
        let mut cfg = AppConfig::default();
        cfg.apply_args(["--config", "x.toml", "song.mp3", "--replay", "r.jsonl", "--no-autoplay"])
            .unwrap();
        assert_eq!(cfg.audio_path, PathBuf::from("song.mp3"));
        assert_eq!(cfg.source, SourceKind::Replay);
        assert_eq!(cfg.replay_path, Some(PathBuf::from("r.jsonl")));
        assert!(!cfg.autoplay);
    }

    #[test]
    fn unknown_flag_rejected() {
        let mut cfg = AppConfig::default();
        assert!(cfg.apply_args(["--loud"]).is_err());
        assert!(cfg.apply_args(["--replay"]).is_err());
    }

    #[test]
    fn config_path_found() {
        assert_eq!(config_path_from_args(&["a", "--config", "c.toml"][..]), Some(PathBuf::from("c.toml")));
        assert_eq!(config_path_from_args(&["--config"][..]), None);
    }

    #[test]
    fn detector_summary_lists_every_setting() {
        let d = DetectorConfig { min_tracking_confidence: 0.55, model_complexity: 1, ..DetectorConfig::default() };
        assert_eq!(
            d.summary(),
            "max hands 1, min detection 0.70, min tracking 0.55, model complexity 1"
        );
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut cfg = AppConfig { cooldown_secs: -1.0, ..AppConfig::default() };
        assert!(cfg.validate().is_err());

        cfg = AppConfig { initial_rate: 1.25, ..AppConfig::default() };
        assert!(cfg.validate().is_err());

        cfg = AppConfig { source: SourceKind::Replay, ..AppConfig::default() };
        assert!(cfg.validate().is_err());

        cfg = AppConfig::default();
        cfg.detector.min_tracking_confidence = 1.5;
        assert!(cfg.validate().is_err());
    }
}
