//! # Tuning Feedback
//!
//! Turns a detected frequency into something a player can act on: which way
//! to turn the peg, and where a meter needle should sit.

use serde::{Deserialize, Serialize};

use crate::tuning::{TargetTone, calculate_cents_deviation};

/// Distance from target below which the direction reads "in tune", in Hz.
pub const DEFAULT_IN_TUNE_HZ: f32 = 2.0;

/// Half-width of the display meter, in cents.
pub const DEFAULT_DISPLAY_RANGE_CENTS: f32 = 50.0;

/// Needle position when there is nothing to show.
pub const CENTERED: f32 = 0.5;

/// Which way to adjust the string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    InTune,
    /// Sharp: reduce pitch.
    Lower,
    /// Flat: increase pitch.
    Raise,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::InTune => "in tune",
            Direction::Lower => "lower",
            Direction::Raise => "raise",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feedback thresholds. The Hz window and the cents meter are independent
/// of the cents-based in-tune classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TuningFeedback {
    pub in_tune_hz: f32,
    pub display_range_cents: f32,
}

impl Default for TuningFeedback {
    fn default() -> Self {
        Self {
            in_tune_hz: DEFAULT_IN_TUNE_HZ,
            display_range_cents: DEFAULT_DISPLAY_RANGE_CENTS,
        }
    }
}

impl TuningFeedback {
    /// Direction and meter position for `frequency` against `tone`.
    pub fn feedback(&self, frequency: f32, tone: &TargetTone) -> (Direction, f32) {
        (
            self.direction(frequency, tone),
            self.display_fraction(Some(frequency), tone),
        )
    }

    pub fn direction(&self, frequency: f32, tone: &TargetTone) -> Direction {
        let difference = frequency - tone.frequency;
        if difference.abs() < self.in_tune_hz {
            Direction::InTune
        } else if difference > 0.0 {
            Direction::Lower
        } else {
            Direction::Raise
        }
    }

    /// Maps the deviation from `tone` onto `[0, 1]`, 0.5 being dead on.
    ///
    /// Deviations are clamped to the meter range first, so anything past
    /// the edge pins the needle. Without a frequency the needle is centered.
    pub fn display_fraction(&self, frequency: Option<f32>, tone: &TargetTone) -> f32 {
        let Some(freq) = frequency else {
            return CENTERED;
        };
        let cents = calculate_cents_deviation(freq, tone.frequency);
        if cents.is_nan() {
            return CENTERED;
        }
        let range = self.display_range_cents;
        let clamped = cents.clamp(-range, range);
        ((clamped + range) / (2.0 * range)).clamp(0.0, 1.0)
    }
}
