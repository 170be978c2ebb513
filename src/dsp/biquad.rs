//! Biquad filter
//!
//! Second-order IIR section with Audio EQ Cookbook coefficients. Two of these
//! in cascade (low-pass, then high-shelf) strip the harsh top end off raw noise.

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_1_SQRT_2, PI};

/// Filter response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    /// Remove above frequency
    LowPass,
    /// Boost/cut above frequency
    HighShelf,
}

/// Biquad filter coefficients
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (a0 + a1*z^-1 + a2*z^-2)
/// Normalized: all coefficients divided by a0
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl BiquadCoeffs {
    /// Calculate biquad coefficients using Audio EQ Cookbook formulas
    /// Reference: https://www.w3.org/2011/audio/audio-eq-cookbook.html
    fn calculate(
        filter_type: FilterType,
        sample_rate: f64,
        frequency: f64,
        gain_db: f64,
        q: f64,
    ) -> Self {
        // Keep the corner strictly below Nyquist; at absurdly low rates the
        // 1 Hz floor wins instead of panicking
        let freq = frequency.min(sample_rate / 2.0 - 1.0).max(1.0);

        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let a = 10.0_f64.powf(gain_db / 40.0);

        let (b0, b1, b2, a0, a1, a2) = match filter_type {
            FilterType::LowPass => {
                let alpha = sin_w0 / (2.0 * q);
                (
                    (1.0 - cos_w0) / 2.0,
                    1.0 - cos_w0,
                    (1.0 - cos_w0) / 2.0,
                    1.0 + alpha,
                    -2.0 * cos_w0,
                    1.0 - alpha,
                )
            }
            FilterType::HighShelf => {
                // Shelf slope S = 1
                let alpha = sin_w0 / 2.0 * 2.0_f64.sqrt();
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                    (a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
                    (a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
                )
            }
        };

        BiquadCoeffs {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// Magnitude response at `frequency`
    fn magnitude_at(&self, frequency: f64, sample_rate: f64) -> f64 {
        let w = 2.0 * PI * frequency / sample_rate;
        let (cos1, sin1) = (w.cos(), w.sin());
        let (cos2, sin2) = ((2.0 * w).cos(), (2.0 * w).sin());

        let num_re = self.b0 + self.b1 * cos1 + self.b2 * cos2;
        let num_im = -(self.b1 * sin1 + self.b2 * sin2);
        let den_re = 1.0 + self.a1 * cos1 + self.a2 * cos2;
        let den_im = -(self.a1 * sin1 + self.a2 * sin2);

        (num_re.hypot(num_im)) / (den_re.hypot(den_im))
    }
}

/// Parameters describing one biquad stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub filter_type: FilterType,
    /// Cutoff / corner frequency in Hz
    pub frequency: f32,
    /// Resonance; the shelf uses slope 1 instead
    pub q: f32,
    /// Shelf gain in dB; unused by the low-pass
    pub gain_db: f32,
}

impl FilterSpec {
    pub fn low_pass(frequency: f32, q: f32) -> Self {
        Self {
            filter_type: FilterType::LowPass,
            frequency,
            q,
            gain_db: 0.0,
        }
    }

    pub fn high_shelf(frequency: f32, gain_db: f32) -> Self {
        Self {
            filter_type: FilterType::HighShelf,
            frequency,
            q: FRAC_1_SQRT_2 as f32,
            gain_db,
        }
    }
}

/// Mono biquad filter with its delay line
#[derive(Debug, Clone)]
pub struct Biquad {
    spec: FilterSpec,
    coeffs: BiquadCoeffs,
    sample_rate: f64,
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl Biquad {
    /// Create a filter for the given sample rate
    pub fn new(spec: FilterSpec, sample_rate: u32) -> Self {
        let sample_rate = sample_rate as f64;
        let coeffs = BiquadCoeffs::calculate(
            spec.filter_type,
            sample_rate,
            spec.frequency as f64,
            spec.gain_db as f64,
            (spec.q as f64).max(0.01),
        );
        Self {
            spec,
            coeffs,
            sample_rate,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// The parameters this filter was built from
    pub fn spec(&self) -> FilterSpec {
        self.spec
    }

    /// Process a single sample (Direct Form I)
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let input = input as f64;
        let c = &self.coeffs;
        let output = c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output as f32
    }

    /// Linear magnitude response at `frequency` Hz
    pub fn magnitude_at(&self, frequency: f32) -> f32 {
        self.coeffs.magnitude_at(frequency as f64, self.sample_rate) as f32
    }
}
