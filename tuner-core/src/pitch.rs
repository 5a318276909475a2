//! # Pitch Detection Module
//!
//! YIN fundamental-frequency estimation tuned for guitar strings.
//!
//! ## Steps
//! - Squared difference function over half the frame
//! - Cumulative mean normalization (CMND)
//! - First dip below an absolute threshold, falling back to the deepest dip
//! - Parabolic interpolation for sub-sample lag accuracy
//! - Band filter that rejects implausible fundamentals

use tracing::debug;

use crate::audio::AudioFrame;

/// Absolute CMND threshold for accepting the first dip.
pub const DEFAULT_YIN_THRESHOLD: f32 = 0.2;
/// Lowest fundamental accepted, in Hz.
pub const DEFAULT_MIN_FREQUENCY: f32 = 70.0;
/// Highest fundamental accepted, in Hz.
pub const DEFAULT_MAX_FREQUENCY: f32 = 600.0;

/// Denominators smaller than this skip parabolic interpolation.
const MIN_PARABOLA_CURVATURE: f32 = 1e-9;

/// Outcome of a single pitch estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PitchEstimate {
    /// Fundamental frequency in Hz, inside the detection band.
    Pitch(f32),
    /// No periodicity found, or the result fell outside the band.
    NoPitch,
}

impl PitchEstimate {
    pub fn frequency(self) -> Option<f32> {
        match self {
            PitchEstimate::Pitch(freq) => Some(freq),
            PitchEstimate::NoPitch => None,
        }
    }
}

/// YIN estimator holding its CMND scratch buffer between calls.
///
/// The buffer is reused, so `estimate` takes `&mut self`; sharing one
/// estimator across threads needs external serialization.
#[derive(Debug, Clone)]
pub struct YinEstimator {
    threshold: f32,
    min_frequency: f32,
    max_frequency: f32,
    yin_buffer: Vec<f32>,
}

impl Default for YinEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_YIN_THRESHOLD, DEFAULT_MIN_FREQUENCY, DEFAULT_MAX_FREQUENCY)
    }
}

impl YinEstimator {
    pub fn new(threshold: f32, min_frequency: f32, max_frequency: f32) -> Self {
        Self {
            threshold,
            min_frequency,
            max_frequency,
            yin_buffer: Vec::new(),
        }
    }

    /// Estimates the fundamental of a non-silent frame.
    ///
    /// # Returns
    /// * `PitchEstimate::Pitch(freq)` - frequency inside `[min_frequency, max_frequency]`
    /// * `PitchEstimate::NoPitch` - no dip in the CMND curve, or an out-of-band result
    pub fn estimate(&mut self, frame: &AudioFrame<'_>) -> PitchEstimate {
        let signal = frame.samples();
        let half = signal.len() / 2;

        self.difference(signal, half);
        self.normalize();

        let Some(period) = self.pick_period() else {
            debug!(target: "pitch", "no local minimum in CMND curve");
            return PitchEstimate::NoPitch;
        };

        let refined = self.refine_period(period);
        let frequency = frame.sample_rate() as f32 / refined;

        if frequency.is_finite()
            && refined > 0.0
            && frequency >= self.min_frequency
            && frequency <= self.max_frequency
        {
            debug!(target: "pitch", period, refined, frequency, "pitch detected");
            PitchEstimate::Pitch(frequency)
        } else {
            debug!(target: "pitch", period, refined, frequency, "pitch outside detection band");
            PitchEstimate::NoPitch
        }
    }

    /// Read-only view of the CMND curve from the last `estimate` call.
    pub fn cmnd(&self) -> &[f32] {
        &self.yin_buffer
    }

    /// `d[tau] = sum (x[i] - x[i + tau])^2` for `tau` in `1..half`; `d[0] = 1`.
    fn difference(&mut self, signal: &[f32], half: usize) {
        self.yin_buffer.clear();
        self.yin_buffer.resize(half, 0.0);
        if half == 0 {
            return;
        }
        self.yin_buffer[0] = 1.0;

        for tau in 1..half {
            let mut diff = 0.0;
            for i in 0..half {
                let delta = signal[i] - signal[i + tau];
                diff += delta * delta;
            }
            self.yin_buffer[tau] = diff;
        }
    }

    /// Cumulative mean normalization, in place.
    fn normalize(&mut self) {
        let mut running_sum = 0.0;
        for tau in 1..self.yin_buffer.len() {
            running_sum += self.yin_buffer[tau];
            if running_sum != 0.0 {
                self.yin_buffer[tau] *= tau as f32 / running_sum;
            } else {
                self.yin_buffer[tau] = 1.0;
            }
        }
    }

    /// First local minimum under the threshold, else the deepest local minimum.
    fn pick_period(&self) -> Option<usize> {
        let buf = &self.yin_buffer;
        if buf.len() < 3 {
            return None;
        }
        let is_local_min = |tau: usize| buf[tau] < buf[tau - 1] && buf[tau] < buf[tau + 1];
        let candidates = 2..buf.len() - 1;

        // Early exit on the first qualifying dip avoids octave errors.
        if let Some(tau) = candidates
            .clone()
            .find(|&tau| buf[tau] < self.threshold && is_local_min(tau))
        {
            return Some(tau);
        }

        candidates
            .filter(|&tau| is_local_min(tau))
            .min_by(|&a, &b| buf[a].total_cmp(&buf[b]))
    }

    /// Fractional lag from a parabola through the dip and its two neighbors.
    fn refine_period(&self, period: usize) -> f32 {
        let y0 = self.yin_buffer[period - 1];
        let y1 = self.yin_buffer[period];
        let y2 = self.yin_buffer[period + 1];

        let denominator = 2.0 * (2.0 * y1 - y2 - y0);
        if denominator.abs() < MIN_PARABOLA_CURVATURE {
            return period as f32;
        }
        let shift = (y2 - y0) / denominator;
        if shift.is_finite() {
            period as f32 + shift
        } else {
            period as f32
        }
    }
}
