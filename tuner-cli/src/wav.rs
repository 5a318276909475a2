//! WAV file input for offline analysis.

use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

use crate::framing::downmix;

/// Mono samples decoded from a WAV file.
#[derive(Debug)]
pub struct WavClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl WavClip {
    pub fn open(path: &Path) -> Result<Self> {
        let reader = hound::WavReader::open(path)
            .with_context(|| format!("Failed to open WAV file {}", path.display()))?;
        Self::from_wav_reader(reader)
    }

    /// Create from any reader (for testing/flexibility).
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let reader = hound::WavReader::new(reader).context("Failed to parse WAV file")?;
        Self::from_wav_reader(reader)
    }

    fn from_wav_reader<R: Read>(mut reader: hound::WavReader<R>) -> Result<Self> {
        let spec = reader.spec();

        // Integer formats scale to [-1, 1) by their bit depth.
        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<std::result::Result<_, _>>()
                .context("Failed to read WAV samples")?,
            hound::SampleFormat::Int => {
                let scale = (1_i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<std::result::Result<_, _>>()
                    .context("Failed to read WAV samples")?
            }
        };

        Ok(Self {
            samples: downmix(&interleaved, spec.channels as usize),
            sample_rate: spec.sample_rate,
        })
    }

    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode(
        spec: hound::WavSpec,
        write: impl FnOnce(&mut hound::WavWriter<&mut Cursor<Vec<u8>>>),
    ) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            write(&mut writer);
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn reads_16bit_stereo_as_mono() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 48000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let bytes = encode(spec, |w| {
            for _ in 0..4 {
                w.write_sample(16384_i16).unwrap();
                w.write_sample(0_i16).unwrap();
            }
        });
        let clip = WavClip::from_reader(Cursor::new(bytes)).unwrap();
        assert_eq!(clip.sample_rate, 48000);
        assert_eq!(clip.samples.len(), 4);
        assert!(clip.samples.iter().all(|&s| (s - 0.25).abs() < 1e-6));
    }

    #[test]
    fn reads_float_mono() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let bytes = encode(spec, |w| {
            for v in [0.5_f32, -0.5, 0.25] {
                w.write_sample(v).unwrap();
            }
        });
        let clip = WavClip::from_reader(Cursor::new(bytes)).unwrap();
        assert_eq!(clip.samples, vec![0.5, -0.5, 0.25]);
        assert!((clip.duration_secs() - 3.0 / 44100.0).abs() < 1e-9);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(WavClip::from_reader(Cursor::new(b"not a wav".to_vec())).is_err());
    }
}
