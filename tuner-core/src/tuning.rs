//! # Musical Tuning Module
//!
//! Target tones, the tuning table they live in, and nearest-tone matching.
//!
//! ## Features
//! - Standard six-string guitar table (E2 A2 D3 G3 B3 E4)
//! - Validated custom tables with unique labels
//! - Nearest-tone lookup by absolute Hz distance
//! - Cent deviation and in-tune classification

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::TuningStatus;
use crate::error::{Result, TunerError};

/// Deviation below which a note counts as in tune, in cents.
pub const DEFAULT_IN_TUNE_CENTS: f32 = 10.0;

/// A single target pitch, e.g. one guitar string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetTone {
    /// Display label (e.g., "E2", "A2")
    pub label: String,
    /// Target frequency in Hz
    pub frequency: f32,
}

impl TargetTone {
    pub fn new(label: impl Into<String>, frequency: f32) -> Self {
        Self {
            label: label.into(),
            frequency,
        }
    }
}

/// Standard guitar tuning, low E to high E.
static STANDARD_GUITAR_TUNING: Lazy<TuningTable> = Lazy::new(|| TuningTable {
    tones: [
        ("E2", 82.41),
        ("A2", 110.00),
        ("D3", 146.83),
        ("G3", 196.00),
        ("B3", 246.94),
        ("E4", 329.63),
    ]
    .into_iter()
    .map(|(label, frequency)| TargetTone::new(label, frequency))
    .collect(),
});

/// Ordered set of target tones. Order is for display only; matching ignores it
/// except to break exact ties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TargetTone>", into = "Vec<TargetTone>")]
pub struct TuningTable {
    tones: Vec<TargetTone>,
}

/// Result of matching a frequency against a table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteMatch<'a> {
    /// Position of the matched tone in the table
    pub index: usize,
    pub tone: &'a TargetTone,
    /// Deviation from the matched tone (positive = sharp)
    pub cents: f32,
}

impl TuningTable {
    /// Builds a table, rejecting empty tables, duplicate labels and
    /// non-positive or non-finite frequencies.
    pub fn new(tones: Vec<TargetTone>) -> Result<Self> {
        if tones.is_empty() {
            return Err(TunerError::EmptyTable);
        }
        let mut seen = HashSet::with_capacity(tones.len());
        for tone in &tones {
            if !(tone.frequency.is_finite() && tone.frequency > 0.0) {
                return Err(TunerError::InvalidFrequency {
                    label: tone.label.clone(),
                    frequency: tone.frequency,
                });
            }
            if !seen.insert(tone.label.as_str()) {
                return Err(TunerError::DuplicateLabel {
                    label: tone.label.clone(),
                });
            }
        }
        Ok(Self { tones })
    }

    /// The six-string standard guitar table.
    pub fn standard_guitar() -> Self {
        STANDARD_GUITAR_TUNING.clone()
    }

    pub fn tones(&self) -> &[TargetTone] {
        &self.tones
    }

    pub fn len(&self) -> usize {
        self.tones.len()
    }

    /// Always false; a table holds at least one tone.
    pub fn is_empty(&self) -> bool {
        self.tones.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TargetTone> {
        self.tones.get(index)
    }

    /// Looks a tone up by label, returning its index.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.tones.iter().position(|tone| tone.label == label)
    }

    /// Finds the tone closest to `freq` in absolute Hz.
    ///
    /// Ties go to the earlier entry. No hysteresis: every call starts fresh.
    pub fn find_nearest(&self, freq: f32) -> NoteMatch<'_> {
        let (index, tone) = self
            .tones
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                let diff_a = (a.frequency - freq).abs();
                let diff_b = (b.frequency - freq).abs();
                diff_a.total_cmp(&diff_b)
            })
            .expect("tuning table is never empty");

        NoteMatch {
            index,
            tone,
            cents: calculate_cents_deviation(freq, tone.frequency),
        }
    }
}

impl Default for TuningTable {
    fn default() -> Self {
        Self::standard_guitar()
    }
}

impl TryFrom<Vec<TargetTone>> for TuningTable {
    type Error = TunerError;

    fn try_from(tones: Vec<TargetTone>) -> Result<Self> {
        Self::new(tones)
    }
}

impl From<TuningTable> for Vec<TargetTone> {
    fn from(table: TuningTable) -> Self {
        table.tones
    }
}

/// Calculates the deviation from a target frequency in cents.
///
/// - 100 cents = 1 semitone
/// - 1200 cents = 1 octave
/// - Positive values indicate sharpness, negative values indicate flatness
pub fn calculate_cents_deviation(freq: f32, target_freq: f32) -> f32 {
    1200.0 * (freq / target_freq).log2()
}

/// InTune when `|cents| < in_tune_cents`, Detecting otherwise.
pub fn classify(cents: f32, in_tune_cents: f32) -> TuningStatus {
    if cents.abs() < in_tune_cents {
        TuningStatus::InTune
    } else {
        TuningStatus::Detecting
    }
}
