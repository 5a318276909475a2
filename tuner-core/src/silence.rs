//! # Silence Gate
//!
//! RMS noise gate run ahead of pitch detection. Frames below the loudness
//! floor are reported as silence and never analyzed.

/// Default RMS floor below which a frame counts as silent.
pub const DEFAULT_SILENCE_THRESHOLD: f32 = 0.005;

/// Root-mean-square amplitude of a frame. Zero for an empty slice.
pub fn rms(signal: &[f32]) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }
    (signal.iter().map(|&s| s * s).sum::<f32>() / signal.len() as f32).sqrt()
}

/// Decides whether a frame carries enough energy to analyze.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SilenceGate {
    threshold: f32,
}

impl SilenceGate {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// True when `rms < threshold`. A frame exactly at the floor is not silent.
    pub fn is_silent(&self, signal: &[f32]) -> bool {
        self.is_below_floor(rms(signal))
    }

    /// Same test as `is_silent`, for callers that already hold the RMS.
    pub fn is_below_floor(&self, rms: f32) -> bool {
        rms < self.threshold
    }
}

impl Default for SilenceGate {
    fn default() -> Self {
        Self::new(DEFAULT_SILENCE_THRESHOLD)
    }
}
