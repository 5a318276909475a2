//! # Tuner Pipeline
//!
//! Runs one frame through the full chain:
//! silence gate → YIN estimate → nearest tone → feedback.
//!
//! The tuner keeps no state between frames apart from the estimator's scratch
//! buffer. Which string is pinned belongs to the caller and is passed per call.

use tracing::debug;

use crate::audio::AudioFrame;
use crate::config::{TunerConfig, TunerProfile};
use crate::error::{Result, TunerError};
use crate::feedback::{CENTERED, TuningFeedback};
use crate::pitch::{PitchEstimate, YinEstimator};
use crate::silence::{SilenceGate, rms};
use crate::tuning::{TargetTone, TuningTable, classify};
use crate::{TuningResult, TuningStatus};

#[derive(Debug, Clone)]
pub struct Tuner {
    config: TunerConfig,
    table: TuningTable,
    gate: SilenceGate,
    estimator: YinEstimator,
    feedback: TuningFeedback,
}

impl Default for Tuner {
    fn default() -> Self {
        Self::build(TunerConfig::default(), TuningTable::standard_guitar())
    }
}

impl Tuner {
    /// Creates a tuner after validating the configuration.
    pub fn new(config: TunerConfig, table: TuningTable) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, table))
    }

    pub fn from_profile(profile: TunerProfile) -> Result<Self> {
        Self::new(profile.config, profile.table)
    }

    fn build(config: TunerConfig, table: TuningTable) -> Self {
        Self {
            gate: SilenceGate::new(config.silence_threshold),
            estimator: YinEstimator::new(
                config.yin_threshold,
                config.min_frequency,
                config.max_frequency,
            ),
            feedback: config.feedback(),
            config,
            table,
        }
    }

    pub fn config(&self) -> &TunerConfig {
        &self.config
    }

    pub fn table(&self) -> &TuningTable {
        &self.table
    }

    /// Analyzes one frame.
    ///
    /// # Arguments
    /// * `samples` - Mono samples in `[-1, 1]` (typically 2048)
    /// * `sample_rate` - Sample rate in Hz (typically 44100 or 48000)
    /// * `selected` - Caller-pinned table index; only moves the display meter
    ///
    /// # Errors
    /// Precondition violations only: empty or too-short frame, zero sample
    /// rate, or a selection outside the table. Silence and unclear pitch come
    /// back as `Ok` with status `Silent` / `NoPitch`.
    pub fn analyze(
        &mut self,
        samples: &[f32],
        sample_rate: u32,
        selected: Option<usize>,
    ) -> Result<TuningResult> {
        let frame = AudioFrame::new(samples, sample_rate)?;
        let pinned = pin(&self.table, selected)?;

        let rms = rms(frame.samples());
        if self.gate.is_below_floor(rms) {
            debug!(target: "tuner", rms, "frame below silence floor");
            return Ok(self.idle_result(TuningStatus::Silent, pinned, rms));
        }

        let frequency = match self.estimator.estimate(&frame) {
            PitchEstimate::Pitch(freq) => freq,
            PitchEstimate::NoPitch => {
                return Ok(self.idle_result(TuningStatus::NoPitch, pinned, rms));
            }
        };

        let found = self.table.find_nearest(frequency);
        let status = classify(found.cents, self.config.in_tune_cents);
        let direction = self.feedback.direction(frequency, found.tone);
        let display_target = pinned.map_or(found.tone, |(_, tone)| tone);
        let display_fraction = self
            .feedback
            .display_fraction(Some(frequency), display_target);

        debug!(
            target: "tuner",
            frequency,
            note = %found.tone.label,
            cents = found.cents,
            ?status,
            "frame analyzed"
        );

        Ok(TuningResult {
            status,
            matched_tone: found.tone.clone(),
            matched_index: found.index,
            estimated_frequency: Some(frequency),
            cents_deviation: Some(found.cents),
            direction: Some(direction),
            display_fraction,
            rms,
        })
    }

    /// Result for frames without a pitch: selected tone (or the first), meter centered.
    fn idle_result(
        &self,
        status: TuningStatus,
        pinned: Option<(usize, &TargetTone)>,
        rms: f32,
    ) -> TuningResult {
        let (matched_index, tone) = match pinned {
            Some(pin) => pin,
            None => (0, &self.table.tones()[0]),
        };
        TuningResult {
            status,
            matched_tone: tone.clone(),
            matched_index,
            estimated_frequency: None,
            cents_deviation: None,
            direction: None,
            display_fraction: CENTERED,
            rms,
        }
    }
}

/// Resolves a caller-pinned index against the table.
fn pin(table: &TuningTable, selected: Option<usize>) -> Result<Option<(usize, &TargetTone)>> {
    selected
        .map(|index| {
            table
                .get(index)
                .map(|tone| (index, tone))
                .ok_or(TunerError::SelectionOutOfRange {
                    index,
                    len: table.len(),
                })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(freq: f64, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (0.4 * (2.0 * PI * freq * i as f64 / 44100.0).sin()) as f32)
            .collect()
    }

    #[test]
    fn silent_frame() {
        let mut tuner = Tuner::default();
        let result = tuner.analyze(&[0.0; 2048], 44100, None).unwrap();
        assert_eq!(result.status, TuningStatus::Silent);
        assert_eq!(result.display_fraction, 0.5);
        assert_eq!(result.matched_tone.label, "E2");
        assert!(result.cents_deviation.is_none());
    }

    #[test]
    fn silent_frame_reports_pinned_tone() {
        let mut tuner = Tuner::default();
        let result = tuner.analyze(&[0.0; 2048], 44100, Some(3)).unwrap();
        assert_eq!(result.matched_tone.label, "G3");
        assert_eq!(result.matched_index, 3);
    }

    #[test]
    fn selection_out_of_range() {
        let mut tuner = Tuner::default();
        let err = tuner.analyze(&[0.0; 2048], 44100, Some(6)).unwrap_err();
        assert!(matches!(err, TunerError::SelectionOutOfRange { index: 6, len: 6 }));
    }

    #[test]
    fn precondition_errors_propagate() {
        let mut tuner = Tuner::default();
        assert!(matches!(tuner.analyze(&[], 44100, None), Err(TunerError::EmptyFrame)));
        assert!(matches!(
            tuner.analyze(&[0.1, 0.2], 44100, None),
            Err(TunerError::FrameTooShort { .. })
        ));
        assert!(matches!(
            tuner.analyze(&[0.1; 64], 0, None),
            Err(TunerError::InvalidSampleRate)
        ));
    }

    #[test]
    fn pinned_string_moves_only_the_meter() {
        // A2 played while D3 is pinned: match stays A2, meter pins flat.
        let mut tuner = Tuner::default();
        let samples = sine(110.0, 2048);
        let result = tuner.analyze(&samples, 44100, Some(2)).unwrap();
        assert_eq!(result.matched_tone.label, "A2");
        assert_eq!(result.status, TuningStatus::InTune);
        assert_eq!(result.display_fraction, 0.0);
    }

    #[test]
    fn invalid_config_rejected() {
        let config = TunerConfig {
            max_frequency: 10.0,
            ..TunerConfig::default()
        };
        assert!(Tuner::new(config, TuningTable::standard_guitar()).is_err());
    }
}
