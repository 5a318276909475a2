//! Error types for the tuner core.
//!
//! Only caller misuse and bad configuration are errors. Silence and unclear
//! pitch are ordinary results and never show up here.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TunerError {
    // Frame preconditions
    #[error("Audio frame is empty")]
    EmptyFrame,

    #[error("Audio frame too short: {len} samples, need at least {min}")]
    FrameTooShort { len: usize, min: usize },

    #[error("Sample rate must be positive")]
    InvalidSampleRate,

    #[error("Selected string {index} is out of range for a table of {len} tones")]
    SelectionOutOfRange { index: usize, len: usize },

    // Tuning table errors
    #[error("Tuning table must contain at least one tone")]
    EmptyTable,

    #[error("Duplicate tone label in tuning table: {label}")]
    DuplicateLabel { label: String },

    #[error("Invalid target frequency for {label}: {frequency} Hz")]
    InvalidFrequency { label: String, frequency: f32 },

    // Configuration errors
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidConfig { key: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Profile format error: {0}")]
    Json(#[from] serde_json::Error),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, TunerError>;
