//! Noise buffer and level helpers
//!
//! A `NoiseBuffer` is one cycle of generated noise, played in a loop by a
//! graph's source. It is immutable once built and shared through `Arc`.

use std::sync::Arc;

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert linear amplitude to decibels
///
/// # Returns
/// Value in decibels. Returns -f32::INFINITY for zero input.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// RMS level of a sample slice in dB
///
/// Returns -f32::INFINITY for empty or silent input.
pub fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return f32::NEG_INFINITY;
    }

    let sum_squares: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    let rms = (sum_squares / samples.len() as f64).sqrt() as f32;
    linear_to_db(rms)
}

/// Peak level of a sample slice in dB
pub fn calculate_peak(samples: &[f32]) -> f32 {
    let peak = samples.iter().map(|&s| s.abs()).fold(0.0_f32, f32::max);
    linear_to_db(peak)
}

// ============================================================================
// Noise Buffer
// ============================================================================

/// Mono sample cycle at a fixed sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseBuffer {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl NoiseBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Length of one cycle in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Sample at `index`, wrapping around the cycle
    #[inline]
    pub fn looped(&self, index: usize) -> f32 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.samples[index % self.samples.len()]
        }
    }

    /// Mean sample value (DC offset)
    pub fn mean(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.samples.iter().map(|&s| s as f64).sum();
        (sum / self.samples.len() as f64) as f32
    }
}
