//! Audio playback device.
//!
//! The whole track is decoded up front with symphonia and played from
//! memory through a cpal output stream. The stream runs for the lifetime of
//! the player and outputs silence while paused, so play, pause and rate
//! changes are just transport updates picked up on the next callback.
//!
//! Rate changes resample by linear interpolation (pitch follows speed).

use std::path::Path;
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use parking_lot::{Mutex, MutexGuard};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, error, info};

use crate::error::{PlayerError, StartupError};

// ════════════════════════════════════════════════════════════════════════════
// PlaybackDevice: what the controller drives
// ════════════════════════════════════════════════════════════════════════════

/// A media player the controller can command. Rate changes must apply
/// immediately whether playing or paused, and persist across pause/resume.
///
/// `release` stops output for good; every later call reports
/// [`PlayerError::Unavailable`]. Implementations also release on drop.
pub trait PlaybackDevice {
    fn play(&mut self) -> Result<(), PlayerError>;
    fn pause(&mut self) -> Result<(), PlayerError>;
    fn is_playing(&self) -> Result<bool, PlayerError>;
    fn set_rate(&mut self, rate: f32) -> Result<(), PlayerError>;
    fn release(&mut self);
}

// ════════════════════════════════════════════════════════════════════════════
// Track: decoded PCM
// ════════════════════════════════════════════════════════════════════════════

/// Interleaved f32 samples.
#[derive(Debug, Clone)]
pub struct Track {
    samples:     Vec<f32>,
    channels:    usize,
    sample_rate: u32,
}

impl Track {
    pub fn new(samples: Vec<f32>, channels: usize, sample_rate: u32) -> Self {
        let channels = channels.max(1);
        Track { samples, channels, sample_rate }
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate.max(1) as f64
    }

    /// Linearly interpolated sample at fractional frame `pos`.
    fn sample_at(&self, pos: f64, channel: usize) -> f32 {
        let ch = channel.min(self.channels - 1);
        let i = pos.floor() as usize;
        let frac = (pos - i as f64) as f32;
        let a = self.samples.get(i * self.channels + ch).copied().unwrap_or(0.0);
        let b = self.samples.get((i + 1) * self.channels + ch).copied().unwrap_or(a);
        a + (b - a) * frac
    }
}

/// Decode an audio file into memory.
pub fn decode_track(path: &Path) -> Result<Track, StartupError> {
    let fail = |reason: String| StartupError::AudioDecode { path: path.to_path_buf(), reason };

    let file = std::fs::File::open(path).map_err(|e| fail(e.to_string()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| fail(format!("unsupported format: {}", e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| fail("no audio track".to_string()))?;
    let track_id = track.id;
    let params = track.codec_params.clone();
    let sample_rate = params
        .sample_rate
        .ok_or_else(|| fail("unknown sample rate".to_string()))?;
    let channels = params.channels.map(|c| c.count()).unwrap_or(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&params, &DecoderOptions::default())
        .map_err(|e| fail(format!("unsupported codec: {}", e)))?;

    let mut samples = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(fail(e.to_string())),
        };
        if packet.track_id() != track_id {
            continue;
        }
        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            // Corrupt packets are skipped, not fatal.
            Err(SymphoniaError::IoError(_)) | Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => return Err(fail(e.to_string())),
        };

        let spec = *decoded.spec();
        let capacity = decoded.capacity();
        let buf = sample_buf.get_or_insert_with(|| SampleBuffer::<f32>::new(capacity as u64, spec));
        if buf.capacity() < capacity {
            *buf = SampleBuffer::<f32>::new(capacity as u64, spec);
        }
        buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buf.samples());
    }

    if samples.is_empty() {
        return Err(fail("file contains no audio".to_string()));
    }

    let track = Track::new(samples, channels, sample_rate);
    info!(
        "decoded {:.1}s of audio ({} Hz, {} ch) from {}",
        track.duration_secs(), sample_rate, channels, path.display()
    );
    Ok(track)
}

// ════════════════════════════════════════════════════════════════════════════
// Transport: shared between the controller thread and the audio callback
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
struct Transport {
    playing:  bool,
    rate:     f32,
    /// Read position in source frames.
    cursor:   f64,
    /// Playback ran off the end of the track.
    finished: bool,
    /// Set by the stream error callback; the device is unusable after this.
    failed:   Option<String>,
}

impl Default for Transport {
    fn default() -> Self {
        Transport { playing: false, rate: 1.0, cursor: 0.0, finished: false, failed: None }
    }
}

/// Fill one output buffer. `ratio` is source rate / output rate.
fn fill_buffer<T>(data: &mut [T], out_channels: usize, track: &Track, t: &mut Transport, ratio: f64)
where
    T: Sample + FromSample<f32>,
{
    let last = track.frames().saturating_sub(1) as f64;
    for frame in data.chunks_mut(out_channels.max(1)) {
        if t.playing && t.cursor >= last {
            t.playing = false;
            t.finished = true;
        }
        if !t.playing {
            frame.fill(T::EQUILIBRIUM);
            continue;
        }
        for (ch, out) in frame.iter_mut().enumerate() {
            *out = T::from_sample(track.sample_at(t.cursor, ch));
        }
        t.cursor += t.rate as f64 * ratio;
    }
}

// ════════════════════════════════════════════════════════════════════════════
// AudioPlayer: cpal output
// ════════════════════════════════════════════════════════════════════════════

pub struct AudioPlayer {
    stream:    Option<cpal::Stream>,
    transport: Arc<Mutex<Transport>>,
}

impl AudioPlayer {
    /// Load `path` and open the default output device. The player starts
    /// paused.
    pub fn load(path: &Path) -> Result<Self, StartupError> {
        if !path.is_file() {
            return Err(StartupError::AudioMissing(path.to_path_buf()));
        }
        let track = decode_track(path)?;

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| StartupError::PlaybackInit("no audio output device".into()))?;
        let supported = device
            .default_output_config()
            .map_err(|e| StartupError::PlaybackInit(e.to_string()))?;
        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();

        let transport = Arc::new(Mutex::new(Transport::default()));
        let stream = match sample_format {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, track, transport.clone()),
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, track, transport.clone()),
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, track, transport.clone()),
            other => {
                return Err(StartupError::PlaybackInit(format!("unsupported sample format {:?}", other)))
            }
        }?;
        stream
            .play()
            .map_err(|e| StartupError::PlaybackInit(e.to_string()))?;

        info!(
            "audio output opened: {} Hz, {} ch, {:?}",
            config.sample_rate, config.channels, sample_format
        );
        Ok(AudioPlayer { stream: Some(stream), transport })
    }

    fn transport(&self) -> Result<MutexGuard<'_, Transport>, PlayerError> {
        if self.stream.is_none() {
            return Err(PlayerError::Unavailable);
        }
        let t = self.transport.lock();
        if let Some(e) = t.failed.clone() {
            return Err(PlayerError::Stream(e));
        }
        Ok(t)
    }
}

impl Drop for AudioPlayer {
    fn drop(&mut self) {
        self.release();
    }
}

impl PlaybackDevice for AudioPlayer {
    fn play(&mut self) -> Result<(), PlayerError> {
        let mut t = self.transport()?;
        if t.finished {
            t.cursor = 0.0;
            t.finished = false;
        }
        t.playing = true;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), PlayerError> {
        self.transport()?.playing = false;
        Ok(())
    }

    fn is_playing(&self) -> Result<bool, PlayerError> {
        Ok(self.transport()?.playing)
    }

    fn set_rate(&mut self, rate: f32) -> Result<(), PlayerError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(PlayerError::Stream(format!("invalid rate {}", rate)));
        }
        self.transport()?.rate = rate;
        Ok(())
    }

    /// Stop output and close the stream. Safe to call more than once.
    fn release(&mut self) {
        if let Some(stream) = self.stream.take() {
            self.transport.lock().playing = false;
            if let Err(e) = stream.pause() {
                debug!("pausing stream on release: {}", e);
            }
            drop(stream);
            info!("audio output released");
        }
    }
}

fn build_stream<T>(
    device:    &cpal::Device,
    config:    &cpal::StreamConfig,
    track:     Track,
    transport: Arc<Mutex<Transport>>,
) -> Result<cpal::Stream, StartupError>
where
    T: SizedSample + FromSample<f32>,
{
    let out_channels = config.channels as usize;
    let ratio = track.sample_rate as f64 / config.sample_rate.max(1) as f64;
    let err_transport = transport.clone();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let mut t = transport.lock();
                fill_buffer(data, out_channels, &track, &mut t, ratio);
            },
            move |err| {
                error!("audio stream error: {}", err);
                let mut t = err_transport.lock();
                t.playing = false;
                t.failed = Some(err.to_string());
            },
            None,
        )
        .map_err(|e| StartupError::PlaybackInit(e.to_string()))
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(frames: usize) -> Track {
        Track::new((0..frames).map(|i| i as f32 / frames as f32).collect(), 1, 48_000)
    }

    fn playing() -> Transport {
        Transport { playing: true, ..Transport::default() }
    }

    #[test]
    fn paused_outputs_silence_and_holds_position() {
        let track = ramp(100);
        let mut t = Transport { cursor: 10.0, ..Transport::default() };
        let mut out = [1.0f32; 8];
        fill_buffer(&mut out, 2, &track, &mut t, 1.0);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(t.cursor, 10.0);
    }

    #[test]
    fn rate_scales_cursor_advance() {
        let track = ramp(1000);
        let mut t = playing();
        t.rate = 1.5;
        let mut out = [0.0f32; 20];
        fill_buffer(&mut out, 1, &track, &mut t, 1.0);
        assert!((t.cursor - 30.0).abs() < 1e-9);
    }

    #[test]
    fn mono_fans_out_to_every_channel() {
        let track = ramp(100);
        let mut t = playing();
        t.cursor = 50.0;
        let mut out = [0.0f32; 2];
        fill_buffer(&mut out, 2, &track, &mut t, 1.0);
        assert_eq!(out[0], out[1]);
        assert!((out[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn interpolates_between_frames() {
        let track = Track::new(vec![0.0, 1.0], 1, 48_000);
        assert!((track.sample_at(0.25, 0) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn end_of_track_stops_playback() {
        let track = ramp(4);
        let mut t = playing();
        let mut out = [0.0f32; 16];
        fill_buffer(&mut out, 1, &track, &mut t, 1.0);
        assert!(!t.playing);
        assert!(t.finished);
        assert!(out[8..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn integer_formats_get_equilibrium_when_paused() {
        let track = ramp(10);
        let mut t = Transport::default();
        let mut out = [0u16; 4];
        fill_buffer(&mut out, 2, &track, &mut t, 1.0);
        assert!(out.iter().all(|&s| s == u16::EQUILIBRIUM));
    }

    #[test]
    fn missing_file_is_reported_before_device_open() {
        let dir = tempfile::tempdir().unwrap();
        let err = AudioPlayer::load(&dir.path().join("absent.wav")).err().unwrap();
        assert!(matches!(err, StartupError::AudioMissing(_)));
    }

    #[test]
    fn garbage_file_fails_to_decode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.wav");
        std::fs::write(&path, b"definitely not a wav file").unwrap();
        assert!(matches!(decode_track(&path), Err(StartupError::AudioDecode { .. })));
    }
}
