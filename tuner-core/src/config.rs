//! # Configuration & Profiles
//!
//! Calibration constants for every stage of the pipeline, and the JSON
//! profile format that bundles them with a tuning table.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

use crate::error::{Result, TunerError};
use crate::feedback::{DEFAULT_DISPLAY_RANGE_CENTS, DEFAULT_IN_TUNE_HZ, TuningFeedback};
use crate::pitch::{DEFAULT_MAX_FREQUENCY, DEFAULT_MIN_FREQUENCY, DEFAULT_YIN_THRESHOLD};
use crate::silence::DEFAULT_SILENCE_THRESHOLD;
use crate::tuning::{DEFAULT_IN_TUNE_CENTS, TuningTable};

/// Calibration constants. Missing fields fall back to the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// RMS floor below which a frame is silent
    pub silence_threshold: f32,
    /// CMND threshold for the first-dip search
    pub yin_threshold: f32,
    /// Detection band, in Hz
    pub min_frequency: f32,
    pub max_frequency: f32,
    /// |cents| below this classifies as in tune
    pub in_tune_cents: f32,
    /// |Hz| below this reads as "in tune" in the direction hint
    pub in_tune_hz: f32,
    /// Half-width of the display meter, in cents
    pub display_range_cents: f32,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            silence_threshold: DEFAULT_SILENCE_THRESHOLD,
            yin_threshold: DEFAULT_YIN_THRESHOLD,
            min_frequency: DEFAULT_MIN_FREQUENCY,
            max_frequency: DEFAULT_MAX_FREQUENCY,
            in_tune_cents: DEFAULT_IN_TUNE_CENTS,
            in_tune_hz: DEFAULT_IN_TUNE_HZ,
            display_range_cents: DEFAULT_DISPLAY_RANGE_CENTS,
        }
    }
}

impl TunerConfig {
    /// Rejects values that would make the pipeline meaningless.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("yin_threshold", self.yin_threshold),
            ("min_frequency", self.min_frequency),
            ("max_frequency", self.max_frequency),
            ("in_tune_cents", self.in_tune_cents),
            ("in_tune_hz", self.in_tune_hz),
            ("display_range_cents", self.display_range_cents),
        ];
        for (key, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(key, format!("must be positive, got {value}")));
            }
        }
        if !(self.silence_threshold.is_finite() && self.silence_threshold >= 0.0) {
            return Err(invalid(
                "silence_threshold",
                format!("must be non-negative, got {}", self.silence_threshold),
            ));
        }
        if self.min_frequency >= self.max_frequency {
            return Err(invalid(
                "min_frequency",
                format!(
                    "must be below max_frequency ({} >= {})",
                    self.min_frequency, self.max_frequency
                ),
            ));
        }
        Ok(())
    }

    pub fn feedback(&self) -> TuningFeedback {
        TuningFeedback {
            in_tune_hz: self.in_tune_hz,
            display_range_cents: self.display_range_cents,
        }
    }
}

fn invalid(key: &str, message: String) -> TunerError {
    TunerError::InvalidConfig {
        key: key.to_string(),
        message,
    }
}

/// Everything needed to set up a tuner, as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerProfile {
    pub config: TunerConfig,
    pub table: TuningTable,
}

impl TunerProfile {
    /// Loads and validates a profile from a JSON file.
    ///
    /// # Returns
    /// * `Ok(TunerProfile)` - Successfully loaded profile
    /// * `Err(TunerError)` - File I/O, JSON or validation error
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path)?;
        let mut data = String::new();
        file.read_to_string(&mut data)?;
        let profile = Self::from_json(&data)?;
        info!(
            target: "config",
            path = %path.display(),
            tones = profile.table.len(),
            "tuning profile loaded"
        );
        Ok(profile)
    }

    /// Parses and validates a profile from a JSON string.
    pub fn from_json(data: &str) -> Result<Self> {
        let profile: TunerProfile = serde_json::from_str(data)?;
        profile.config.validate()?;
        Ok(profile)
    }

    /// Writes the profile as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json_string = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path.as_ref())?;
        file.write_all(json_string.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::TargetTone;
    use tempfile::tempdir;

    #[test]
    fn defaults_validate() {
        assert!(TunerConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let profile = TunerProfile::from_json(r#"{"config":{"in_tune_cents":5.0}}"#).unwrap();
        assert_eq!(profile.config.in_tune_cents, 5.0);
        assert_eq!(profile.config.silence_threshold, 0.005);
        assert_eq!(profile.table, TuningTable::standard_guitar());
    }

    #[test]
    fn empty_document_is_standard_profile() {
        let profile = TunerProfile::from_json("{}").unwrap();
        assert_eq!(profile, TunerProfile::default());
    }

    #[test]
    fn inverted_band_rejected() {
        let json = r#"{"config":{"min_frequency":500.0,"max_frequency":100.0}}"#;
        match TunerProfile::from_json(json) {
            Err(TunerError::InvalidConfig { key, .. }) => assert_eq!(key, "min_frequency"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn negative_threshold_rejected() {
        let config = TunerConfig {
            silence_threshold: -1.0,
            ..TunerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("drop_d.json");
        let profile = TunerProfile {
            config: TunerConfig {
                in_tune_cents: 3.0,
                ..TunerConfig::default()
            },
            table: TuningTable::new(vec![
                TargetTone::new("D2", 73.42),
                TargetTone::new("A2", 110.0),
            ])
            .unwrap(),
        };
        profile.save(&path).unwrap();
        let loaded = TunerProfile::load(&path).unwrap();
        assert_eq!(loaded, profile);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let result = TunerProfile::load(dir.path().join("nope.json"));
        assert!(matches!(result, Err(TunerError::Io(_))));
    }

    #[test]
    fn malformed_json_is_json_error() {
        assert!(matches!(
            TunerProfile::from_json("{ not json"),
            Err(TunerError::Json(_))
        ));
    }
}
