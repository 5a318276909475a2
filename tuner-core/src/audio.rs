//! # Audio Frame Module
//!
//! A validated, borrowed view of one window of mono samples. Capture devices
//! live outside this crate; the caller hands a slice in and keeps ownership.

use crate::error::{Result, TunerError};

/// Reference number of samples per analysis frame.
///
/// 2048 samples is ~46ms at 44.1kHz, enough for two periods of E2.
pub const BUFFER_SIZE: usize = 2048;

/// Shortest frame that still forms a lag window.
pub const MIN_FRAME_LEN: usize = 4;

/// One window of mono samples plus the rate they were captured at.
#[derive(Debug, Clone, Copy)]
pub struct AudioFrame<'a> {
    samples: &'a [f32],
    sample_rate: u32,
}

impl<'a> AudioFrame<'a> {
    /// Checks the frame preconditions and wraps the slice.
    ///
    /// # Errors
    /// * `EmptyFrame` - no samples at all
    /// * `FrameTooShort` - fewer than [`MIN_FRAME_LEN`] samples
    /// * `InvalidSampleRate` - a sample rate of zero
    pub fn new(samples: &'a [f32], sample_rate: u32) -> Result<Self> {
        if samples.is_empty() {
            return Err(TunerError::EmptyFrame);
        }
        if samples.len() < MIN_FRAME_LEN {
            return Err(TunerError::FrameTooShort {
                len: samples.len(),
                min: MIN_FRAME_LEN,
            });
        }
        if sample_rate == 0 {
            return Err(TunerError::InvalidSampleRate);
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    pub fn samples(&self) -> &'a [f32] {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false for a constructed frame; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_frame() {
        assert!(matches!(AudioFrame::new(&[], 44100), Err(TunerError::EmptyFrame)));
    }

    #[test]
    fn rejects_short_frame() {
        let samples = [0.1, 0.2, 0.3];
        assert!(matches!(
            AudioFrame::new(&samples, 44100),
            Err(TunerError::FrameTooShort { len: 3, min: 4 })
        ));
    }

    #[test]
    fn rejects_zero_sample_rate() {
        let samples = [0.0; 8];
        assert!(matches!(
            AudioFrame::new(&samples, 0),
            Err(TunerError::InvalidSampleRate)
        ));
    }

    #[test]
    fn accepts_minimal_frame() {
        let samples = [0.0; MIN_FRAME_LEN];
        let frame = AudioFrame::new(&samples, 48000).unwrap();
        assert_eq!(frame.len(), 4);
        assert_eq!(frame.sample_rate(), 48000);
    }
}
