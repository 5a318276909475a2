// tuner-core/src/lib.rs

//! The core logic for the guitar tuner.
//! This crate is responsible for silence gating, pitch detection,
//! string matching and tuning feedback. It is completely headless
//! and never touches audio devices, timers or rendering.

pub mod audio;
pub mod config;
pub mod error;
pub mod feedback;
pub mod pitch;
pub mod silence;
pub mod tuner;
pub mod tuning;

use serde::{Deserialize, Serialize};

pub use audio::{AudioFrame, BUFFER_SIZE};
pub use config::{TunerConfig, TunerProfile};
pub use error::{Result, TunerError};
pub use feedback::{Direction, TuningFeedback};
pub use pitch::{PitchEstimate, YinEstimator};
pub use silence::SilenceGate;
pub use tuner::Tuner;
pub use tuning::{NoteMatch, TargetTone, TuningTable};

/// Outcome class of one analysis cycle. Each is terminal for its frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TuningStatus {
    /// Frame energy below the silence floor.
    Silent,
    /// Loud enough, but no usable fundamental.
    NoPitch,
    /// Pitch found, outside the in-tune window.
    Detecting,
    /// Pitch found, within the in-tune window.
    InTune,
}

/// Represents the result of a single audio analysis frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningResult {
    pub status: TuningStatus,
    /// Closest tone to the detected pitch; the selected (or first) tone otherwise.
    pub matched_tone: TargetTone,
    /// Table index of `matched_tone`.
    pub matched_index: usize,
    /// The detected frequency in Hz.
    pub estimated_frequency: Option<f32>,
    /// The deviation from the matched tone in cents.
    pub cents_deviation: Option<f32>,
    /// Which way to turn the peg, relative to `matched_tone`.
    pub direction: Option<Direction>,
    /// Meter position in `[0, 1]`; 0.5 is centered.
    pub display_fraction: f32,
    /// RMS energy of the frame.
    pub rms: f32,
}
