//! WAV export for offline renders
//!
//! Writes mono sessions rendered by an `OfflineContext` to disk.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::error::{AmbientError, Result};

/// Export format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportFormat {
    /// Bit depth: 16, 24, or 32 (default: 24)
    pub bit_depth: u16,
}

impl Default for ExportFormat {
    fn default() -> Self {
        ExportFormat { bit_depth: 24 }
    }
}

impl ExportFormat {
    pub fn new(bit_depth: u16) -> Self {
        ExportFormat { bit_depth }
    }

    /// 16-bit integer samples
    pub fn cd_quality() -> Self {
        ExportFormat { bit_depth: 16 }
    }

    /// 32-bit float samples
    pub fn float() -> Self {
        ExportFormat { bit_depth: 32 }
    }
}

/// Mono WAV file written block by block
///
/// Lets a long render stream to disk instead of holding the session in memory.
pub struct WavSink {
    writer: WavWriter<BufWriter<File>>,
    bit_depth: u16,
    frames: usize,
}

impl WavSink {
    /// Create `path` for mono samples at `sample_rate`
    ///
    /// # Errors
    /// * `InvalidConfig` - If the bit depth is not 16, 24 or 32
    /// * `Wav` - If the file cannot be created
    pub fn create(path: &Path, sample_rate: u32, format: ExportFormat) -> Result<Self> {
        if !matches!(format.bit_depth, 16 | 24 | 32) {
            return Err(AmbientError::InvalidConfig {
                field: "bit_depth".to_string(),
                reason: format!("{}-bit audio (only 16, 24, 32 supported)", format.bit_depth),
            });
        }

        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: format.bit_depth,
            sample_format: if format.bit_depth == 32 {
                SampleFormat::Float
            } else {
                SampleFormat::Int
            },
        };

        Ok(Self {
            writer: WavWriter::create(path, spec)?,
            bit_depth: format.bit_depth,
            frames: 0,
        })
    }

    /// Append a block of samples
    pub fn write(&mut self, samples: &[f32]) -> Result<()> {
        match self.bit_depth {
            16 => {
                for &sample in samples {
                    let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                    self.writer.write_sample(scaled)?;
                }
            }
            24 => {
                for &sample in samples {
                    // 24-bit stored as i32 in hound
                    let scaled = (sample * 8388607.0).clamp(-8388608.0, 8388607.0) as i32;
                    self.writer.write_sample(scaled)?;
                }
            }
            _ => {
                for &sample in samples {
                    self.writer.write_sample(sample)?;
                }
            }
        }
        self.frames += samples.len();
        Ok(())
    }

    /// Frames written so far
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Flush and fix up the header
    pub fn finalize(self) -> Result<()> {
        self.writer.finalize()?;
        Ok(())
    }
}

/// Write mono `samples` to a WAV file
///
/// # Errors
/// * `InvalidConfig` - If the bit depth is not 16, 24 or 32
/// * `Wav` - If the file cannot be written
pub fn export_wav(samples: &[f32], sample_rate: u32, path: &Path, format: ExportFormat) -> Result<()> {
    let mut sink = WavSink::create(path, sample_rate, format)?;
    sink.write(samples)?;
    sink.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::WavReader;

    #[test]
    fn test_export_float_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ambience.wav");
        let samples = vec![0.0, 0.25, -0.5, 0.75];

        export_wav(&samples, 48000, &path, ExportFormat::float()).unwrap();

        let reader = WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 48000);
        assert_eq!(reader.spec().channels, 1);
        let read: Vec<f32> = reader.into_samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(read, samples);
    }

    #[test]
    fn test_export_16_bit_clamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loud.wav");

        export_wav(&[2.0, -2.0], 8000, &path, ExportFormat::cd_quality()).unwrap();

        let reader = WavReader::open(&path).unwrap();
        let read: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(read, vec![32767, -32768]);
    }

    #[test]
    fn test_sink_appends_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blocks.wav");

        let mut sink = WavSink::create(&path, 8000, ExportFormat::float()).unwrap();
        sink.write(&[0.1, 0.2]).unwrap();
        sink.write(&[0.3]).unwrap();
        assert_eq!(sink.frames(), 3);
        sink.finalize().unwrap();

        let reader = WavReader::open(&path).unwrap();
        let read: Vec<f32> = reader.into_samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(read, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_rejects_odd_bit_depth() {
        let dir = tempfile::tempdir().unwrap();
        let err = export_wav(&[0.0], 8000, &dir.path().join("x.wav"), ExportFormat::new(12))
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }
}
