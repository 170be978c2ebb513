//! Ambience configuration
//!
//! Every tuning constant of the noise bed lives here. The defaults produce a
//! soft brown-noise texture at a very low level; a JSON file can override any
//! subset of fields.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AmbientError, Result};

/// Upper bound for filter corner frequencies
const MAX_FILTER_HZ: f32 = 20_000.0;

/// Colouring applied to the raw white noise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseColor {
    /// Uniform white noise, no shaping
    White,
    /// Paul Kellet's economy pink filter (-3 dB/octave)
    Pink,
    /// Leaky integrator, strong low-frequency emphasis
    #[default]
    Brown,
}

/// Configuration for noise generation, filtering and fades
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientConfig {
    /// Noise colouring algorithm
    pub noise_color: NoiseColor,
    /// Length of the looped noise cycle in seconds
    pub buffer_secs: f32,
    /// Brown noise: weight of each white sample fed into the integrator
    pub integrator_step: f32,
    /// Brown noise: leak factor applied to the integrator every sample
    pub integrator_leak: f32,
    /// Output scaling applied to every generated sample
    pub output_scale: f32,
    /// Low-pass cutoff in Hz
    pub lowpass_hz: f32,
    /// Low-pass resonance
    pub lowpass_q: f32,
    /// High-shelf corner in Hz
    pub high_shelf_hz: f32,
    /// High-shelf gain in dB
    pub high_shelf_gain_db: f32,
    /// Gain reached at the end of the fade-in
    pub target_gain: f32,
    /// Fade-in duration in seconds
    pub fade_in_secs: f32,
    /// Fade-out duration in seconds
    pub fade_out_secs: f32,
    /// Delay between stop and node release, must cover the fade-out
    pub release_delay_secs: f32,
}

impl Default for AmbientConfig {
    fn default() -> Self {
        Self {
            noise_color: NoiseColor::Brown,
            buffer_secs: 2.0,
            integrator_step: 0.02,
            integrator_leak: 0.98,
            output_scale: 3.5,
            lowpass_hz: 800.0,
            lowpass_q: 1.0,
            high_shelf_hz: 600.0,
            high_shelf_gain_db: -12.0,
            target_gain: 0.08,
            fade_in_secs: 1.5,
            fade_out_secs: 0.5,
            release_delay_secs: 0.6,
        }
    }
}

impl AmbientConfig {
    /// Load a configuration from a JSON file
    ///
    /// Missing fields fall back to their defaults. The result is validated.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate all fields
    pub fn validate(&self) -> Result<()> {
        positive("buffer_secs", self.buffer_secs)?;
        positive("fade_in_secs", self.fade_in_secs)?;
        positive("fade_out_secs", self.fade_out_secs)?;
        positive("release_delay_secs", self.release_delay_secs)?;
        positive("lowpass_q", self.lowpass_q)?;

        frequency("lowpass_hz", self.lowpass_hz)?;
        frequency("high_shelf_hz", self.high_shelf_hz)?;

        if !(0.0..=1.0).contains(&self.target_gain) {
            return Err(invalid("target_gain", "must be within 0.0..=1.0"));
        }

        if !(0.0..1.0).contains(&self.integrator_leak) {
            return Err(invalid("integrator_leak", "must be within 0.0..1.0"));
        }

        if self.release_delay_secs < self.fade_out_secs {
            return Err(invalid(
                "release_delay_secs",
                "must not be shorter than fade_out_secs",
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> AmbientError {
    AmbientError::InvalidConfig {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn positive(field: &str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be a positive number"))
    }
}

fn frequency(field: &str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 && value <= MAX_FILTER_HZ {
        Ok(())
    } else {
        Err(invalid(field, "must be within 0..=20000 Hz"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = AmbientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.noise_color, NoiseColor::Brown);
        assert_eq!(config.target_gain, 0.08);
        assert_eq!(config.release_delay_secs, 0.6);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AmbientConfig =
            serde_json::from_str(r#"{ "target_gain": 0.2, "noise_color": "pink" }"#).unwrap();
        assert_eq!(config.target_gain, 0.2);
        assert_eq!(config.noise_color, NoiseColor::Pink);
        assert_eq!(config.lowpass_hz, 800.0);
    }

    #[test]
    fn test_release_must_cover_fade() {
        let config = AmbientConfig {
            fade_out_secs: 1.0,
            release_delay_secs: 0.5,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_rejects_bad_frequency() {
        let config = AmbientConfig {
            lowpass_hz: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "fade_in_secs": 3.0 }}"#).unwrap();

        let config = AmbientConfig::load(file.path()).unwrap();
        assert_eq!(config.fade_in_secs, 3.0);
        assert_eq!(config.fade_out_secs, 0.5);
    }

    #[test]
    fn test_load_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "target_gain": 4.0 }}"#).unwrap();
        assert!(AmbientConfig::load(file.path()).is_err());
    }
}
