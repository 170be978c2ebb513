//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{info, warn};

use crate::config::AmbientConfig;
use crate::engine::buffer::linear_to_db;
use crate::engine::{ContextSource, ExportFormat, OfflineContext, WavSink};
use crate::error::{AmbientError, Result};
use crate::playback::PlaybackController;

/// Parameters of an offline render
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub out: PathBuf,
    pub seconds: f64,
    pub sample_rate: u32,
    pub fade_out_at: Option<f64>,
    pub volume: Option<f32>,
    pub seed: Option<u64>,
}

/// Summary of a finished render
#[derive(Debug, Clone, PartialEq)]
pub struct RenderReport {
    pub samples: usize,
    pub rms_db: f32,
    pub peak_db: f32,
}

/// Lowest sample rate a render accepts
pub const MIN_SAMPLE_RATE: u32 = 8_000;
/// Highest sample rate a render accepts
pub const MAX_SAMPLE_RATE: u32 = 384_000;
/// Longest session a render accepts, in seconds
pub const MAX_RENDER_SECS: f64 = 3_600.0;

/// Running level of the rendered output
#[derive(Debug, Default)]
struct LevelMeter {
    samples: usize,
    sum_squares: f64,
    peak: f32,
}

impl LevelMeter {
    fn add(&mut self, block: &[f32]) {
        self.samples += block.len();
        self.sum_squares += block.iter().map(|&s| (s as f64) * (s as f64)).sum::<f64>();
        self.peak = block.iter().map(|s| s.abs()).fold(self.peak, f32::max);
    }

    fn report(&self) -> RenderReport {
        let rms = if self.samples == 0 {
            0.0
        } else {
            (self.sum_squares / self.samples as f64).sqrt() as f32
        };
        RenderReport {
            samples: self.samples,
            rms_db: linear_to_db(rms),
            peak_db: linear_to_db(self.peak),
        }
    }
}

fn invalid(field: &str, reason: String) -> AmbientError {
    AmbientError::InvalidConfig {
        field: field.to_string(),
        reason,
    }
}

/// Render `secs` of the context into `sink`, one second at a time
fn render_span(
    ctx: &OfflineContext,
    secs: f64,
    sample_rate: u32,
    sink: &mut WavSink,
    meter: &mut LevelMeter,
) -> Result<()> {
    let total = (secs.max(0.0) * sample_rate as f64).round() as usize;
    let mut done = 0;
    while done < total {
        let frames = (sample_rate as usize).min(total - done);
        let block = ctx.advance(frames as f64 / sample_rate as f64);
        sink.write(&block)?;
        meter.add(&block);
        done += frames;
    }
    Ok(())
}

/// Render a session offline: focus mode on at t=0, off at `fade_out_at`
///
/// The session streams to `options.out` in one-second blocks.
pub fn render_session(options: &RenderOptions, config: AmbientConfig) -> Result<RenderReport> {
    if !(options.seconds.is_finite() && options.seconds > 0.0 && options.seconds <= MAX_RENDER_SECS) {
        return Err(invalid(
            "seconds",
            format!("{} (must be within 0..={})", options.seconds, MAX_RENDER_SECS),
        ));
    }
    if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&options.sample_rate) {
        return Err(invalid(
            "sample_rate",
            format!(
                "{} Hz (must be within {}..={} Hz)",
                options.sample_rate, MIN_SAMPLE_RATE, MAX_SAMPLE_RATE
            ),
        ));
    }

    let ctx = Arc::new(OfflineContext::new(options.sample_rate));
    let source = ContextSource::borrowed(ctx.clone());
    let controller = match options.seed {
        Some(seed) => PlaybackController::with_seed(source, config, seed),
        None => PlaybackController::new(source, config),
    };
    controller.try_start()?;
    if let Some(volume) = options.volume {
        controller.set_volume(volume);
    }

    let fade_at = options
        .fade_out_at
        .map(|t| t.clamp(0.0, options.seconds))
        .unwrap_or(options.seconds);

    let mut sink = WavSink::create(&options.out, options.sample_rate, ExportFormat::default())?;
    let mut meter = LevelMeter::default();

    render_span(&ctx, fade_at, options.sample_rate, &mut sink, &mut meter)?;
    controller.stop();
    render_span(&ctx, options.seconds - fade_at, options.sample_rate, &mut sink, &mut meter)?;
    controller.teardown();

    sink.finalize()?;
    Ok(meter.report())
}

/// Render a session and write it to disk.
pub fn render(options: &RenderOptions, config_path: Option<&Path>) -> Result<()> {
    let config = AmbientConfig::load_or_default(config_path)?;
    info!(
        "Rendering {:.1}s at {} Hz to {}",
        options.seconds,
        options.sample_rate,
        options.out.display()
    );

    let report = render_session(options, config)?;

    println!("Rendered: {}", options.out.display());
    println!("Samples: {}", report.samples);
    println!("RMS: {:.1} dB", report.rms_db);
    println!("Peak: {:.1} dB", report.peak_db);

    Ok(())
}

/// Play on the default output device, then fade out.
pub fn play(seconds: f64, volume: Option<f32>, config_path: Option<&Path>) -> Result<()> {
    let config = AmbientConfig::load_or_default(config_path)?;
    let release = Duration::try_from_secs_f64(config.release_delay_secs as f64).unwrap_or_default();
    let hold = Duration::try_from_secs_f64(seconds.max(0.0)).unwrap_or_default();

    let controller = PlaybackController::new(ContextSource::platform_default(), config);
    if let Err(e) = controller.try_start() {
        warn!("Playback did not start: {}", e);
        return Err(e);
    }
    if let Some(volume) = volume {
        let applied = controller.set_volume(volume);
        info!("Volume set to {:.2}", applied);
    }

    println!("Playing ambience for {:.1}s", seconds);
    thread::sleep(hold);

    controller.stop();
    thread::sleep(release);
    controller.teardown();

    println!("Stopped");
    Ok(())
}

/// Print the effective configuration as JSON.
pub fn show_config(config_path: Option<&Path>) -> Result<()> {
    let config = AmbientConfig::load_or_default(config_path)?;
    println!("{}", config.to_json()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(out: PathBuf) -> RenderOptions {
        RenderOptions {
            out,
            seconds: 1.0,
            sample_rate: 8000,
            fade_out_at: None,
            volume: None,
            seed: Some(7),
        }
    }

    #[test]
    fn test_render_writes_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.wav");

        let report = render_session(&options(path.clone()), AmbientConfig::default()).unwrap();

        assert_eq!(report.samples, 8000);
        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 8000);
        assert_eq!(reader.len(), 8000);
    }

    #[test]
    fn test_render_is_deterministic_with_seed() {
        let dir = tempfile::tempdir().unwrap();
        let a = render_session(&options(dir.path().join("a.wav")), AmbientConfig::default()).unwrap();
        let b = render_session(&options(dir.path().join("b.wav")), AmbientConfig::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_muted_render_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(dir.path().join("muted.wav"));
        opts.volume = Some(0.0);

        let report = render_session(&opts, AmbientConfig::default()).unwrap();
        assert!(report.peak_db < -90.0);
    }

    #[test]
    fn test_rejects_non_positive_length() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(dir.path().join("x.wav"));
        opts.seconds = 0.0;
        assert!(render_session(&opts, AmbientConfig::default()).is_err());
    }

    #[cfg(not(feature = "device"))]
    #[test]
    fn test_play_without_device_reports_unavailable() {
        let err = play(0.0, None, None).unwrap_err();
        assert_eq!(err.error_code(), "CONTEXT_UNAVAILABLE");
    }

    #[test]
    fn test_rejects_excessive_length() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(dir.path().join("long.wav"));
        opts.seconds = 1e12;
        let err = render_session(&opts, AmbientConfig::default()).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
        assert!(!opts.out.exists());
    }

    #[test]
    fn test_rejects_tiny_sample_rate() {
        let dir = tempfile::tempdir().unwrap();
        for sample_rate in [0, 2, 3, 7_999] {
            let mut opts = options(dir.path().join("tiny.wav"));
            opts.sample_rate = sample_rate;
            let err = render_session(&opts, AmbientConfig::default()).unwrap_err();
            assert_eq!(err.error_code(), "INVALID_CONFIG");
        }
    }

    #[test]
    fn test_multi_second_render_streams_every_frame() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(dir.path().join("long.wav"));
        opts.seconds = 2.5;
        opts.fade_out_at = Some(1.25);

        let report = render_session(&opts, AmbientConfig::default()).unwrap();
        assert_eq!(report.samples, 20_000);
        assert_eq!(hound::WavReader::open(&opts.out).unwrap().len(), 20_000);
    }
}
