//! Noise generator
//!
//! Synthesizes one loopable cycle of coloured noise and wires it into a fresh
//! audio graph: source → low-pass → high-shelf → gain. The gain starts silent
//! and ramps to the target level so playback never begins with a pop.

use rand::Rng;

use crate::config::{AmbientConfig, NoiseColor};
use crate::dsp::{Biquad, FilterSpec};
use crate::engine::{AudioGraph, GainNode, GraphId, LoopSource, NoiseBuffer};

/// Builds noise buffers and audio graphs from a configuration
#[derive(Debug, Clone, Default)]
pub struct NoiseGenerator {
    config: AmbientConfig,
}

impl NoiseGenerator {
    pub fn new(config: AmbientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AmbientConfig {
        &self.config
    }

    /// Number of samples in one cycle at `sample_rate`
    pub fn buffer_size(&self, sample_rate: u32) -> usize {
        (sample_rate as f64 * self.config.buffer_secs as f64).round() as usize
    }

    /// Generate one cycle of noise
    pub fn generate_buffer<R: Rng>(&self, sample_rate: u32, rng: &mut R) -> NoiseBuffer {
        let size = self.buffer_size(sample_rate);
        let mut samples = Vec::with_capacity(size);
        let scale = self.config.output_scale;

        match self.config.noise_color {
            NoiseColor::White => {
                samples.extend((0..size).map(|_| white(rng) * scale));
            }
            NoiseColor::Brown => {
                let step = self.config.integrator_step;
                let leak = self.config.integrator_leak;
                let mut state = 0.0_f32;
                for _ in 0..size {
                    state = (state + white(rng) * step) * leak;
                    samples.push(state * scale);
                }
            }
            NoiseColor::Pink => {
                let mut b = [0.0_f32; 7];
                for _ in 0..size {
                    let w = white(rng);
                    b[0] = 0.99886 * b[0] + w * 0.0555179;
                    b[1] = 0.99332 * b[1] + w * 0.0750759;
                    b[2] = 0.96900 * b[2] + w * 0.1538520;
                    b[3] = 0.86650 * b[3] + w * 0.3104856;
                    b[4] = 0.55000 * b[4] + w * 0.5329522;
                    b[5] = -0.7616 * b[5] - w * 0.0168980;
                    let pink = b.iter().sum::<f32>() + w * 0.5362;
                    b[6] = w * 0.115926;
                    // Kellet's filter peaks around 9x white level
                    samples.push(pink * 0.11 * scale);
                }
            }
        }

        NoiseBuffer::new(samples, sample_rate)
    }

    /// Build a new graph whose fade-in starts at `now`
    ///
    /// The source is left unstarted; the caller starts it once the graph is
    /// connected.
    pub fn generate<R: Rng>(
        &self,
        id: GraphId,
        sample_rate: u32,
        now: f64,
        rng: &mut R,
    ) -> AudioGraph {
        let buffer = self.generate_buffer(sample_rate, rng);
        let source = LoopSource::new(buffer);

        let lowpass = Biquad::new(
            FilterSpec::low_pass(self.config.lowpass_hz, self.config.lowpass_q),
            sample_rate,
        );
        let high_shelf = Biquad::new(
            FilterSpec::high_shelf(self.config.high_shelf_hz, self.config.high_shelf_gain_db),
            sample_rate,
        );

        let mut gain = GainNode::new(0.0);
        gain.gain.set_value_at_time(0.0, now);
        gain.gain
            .linear_ramp_to_value_at_time(self.config.target_gain, now + self.config.fade_in_secs as f64);

        AudioGraph::new(id, sample_rate, source, lowpass, high_shelf, gain)
    }
}

#[inline]
fn white<R: Rng>(rng: &mut R) -> f32 {
    rng.gen_range(-1.0_f32..=1.0)
}
