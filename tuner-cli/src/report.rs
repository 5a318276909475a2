//! Terminal rendering of tuning results.

use anyhow::Result;
use serde::Serialize;
use std::io::Write;
use tuner_core::{TuningResult, TuningStatus, TuningTable};

/// Character width of the text meter, including the center mark.
const METER_WIDTH: usize = 21;

/// How results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    /// One JSON object per line.
    Json,
}

#[derive(Serialize)]
struct JsonLine<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    time: Option<f32>,
    #[serde(flatten)]
    result: &'a TuningResult,
}

pub struct Reporter<W: Write> {
    out: W,
    format: Format,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, format: Format) -> Self {
        Self { out, format }
    }

    /// Prints one result, optionally stamped with its offset in seconds.
    pub fn report(&mut self, time: Option<f32>, result: &TuningResult) -> Result<()> {
        match self.format {
            Format::Json => {
                serde_json::to_writer(&mut self.out, &JsonLine { time, result })?;
                writeln!(self.out)?;
            }
            Format::Text => {
                if let Some(t) = time {
                    write!(self.out, "{t:7.2}s  ")?;
                }
                writeln!(self.out, "{}", describe(result))?;
            }
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Human-readable single-line summary of a result.
pub fn describe(result: &TuningResult) -> String {
    match result.status {
        TuningStatus::Silent => format!("too quiet... (rms {:.4})", result.rms),
        TuningStatus::NoPitch => format!("no clear pitch (rms {:.4})", result.rms),
        TuningStatus::Detecting | TuningStatus::InTune => {
            let freq = result.estimated_frequency.unwrap_or_default();
            let cents = result.cents_deviation.unwrap_or_default();
            let direction = result.direction.map(|d| d.as_str()).unwrap_or("");
            let mark = if result.status == TuningStatus::InTune { " ✓" } else { "" };
            format!(
                "{:<3} {:>7.2} Hz {:>+7.1} cents  {}  {}{}",
                result.matched_tone.label,
                freq,
                cents,
                meter(result.display_fraction),
                direction,
                mark
            )
        }
    }
}

/// Draws `[----|----]` with a needle at `fraction` of the width.
pub fn meter(fraction: f32) -> String {
    let last = METER_WIDTH - 1;
    let needle = (fraction.clamp(0.0, 1.0) * last as f32).round() as usize;
    let body: String = (0..METER_WIDTH)
        .map(|i| match i {
            _ if i == needle => '●',
            _ if i == last / 2 => '|',
            _ => '-',
        })
        .collect();
    format!("[{body}]")
}

/// Lists the table, one tone per line.
pub fn print_table(out: &mut impl Write, table: &TuningTable) -> Result<()> {
    for (index, tone) in table.tones().iter().enumerate() {
        writeln!(out, "{:>2}  {:<4} {:>8.2} Hz", index, tone.label, tone.frequency)?;
    }
    Ok(())
}
