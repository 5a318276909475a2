//! # guitar-tuner
//!
//! Command-line front end for `tuner-core`. It owns everything the core leaves
//! to its caller: the microphone stream, the per-frame loop, the pinned string
//! and printing.
//!
//! ## Architecture
//! - **Capture**: CPAL callback slices audio into frames
//! - **Communication**: bounded crossbeam channels for frames, stream errors and Ctrl-C
//! - **Analysis**: main thread pulls one frame at a time through `Tuner::analyze`

mod audio;
mod framing;
mod report;
mod wav;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use cpal::traits::StreamTrait;
use crossbeam_channel::Receiver;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tuner_core::audio::MIN_FRAME_LEN;
use tuner_core::{BUFFER_SIZE, Tuner, TunerProfile, TuningStatus, TuningTable};

use report::{Format, Reporter};

/// Frames buffered between capture and analysis before new ones are dropped.
const FRAME_QUEUE: usize = 8;

#[derive(Parser)]
#[command(name = "guitar-tuner", author, version, about, long_about = None)]
struct Cli {
    /// JSON profile with calibration settings and a tuning table
    #[arg(long, global = true, value_name = "FILE")]
    profile: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tune from the default microphone
    Listen {
        #[command(flatten)]
        output: OutputArgs,

        /// Stop after this many seconds (runs until interrupted otherwise)
        #[arg(long)]
        seconds: Option<f64>,
    },
    /// Analyze a WAV file frame by frame
    Analyze {
        /// WAV file to analyze
        #[arg(required = true)]
        file: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Print the active tuning table
    Table,
}

#[derive(Args)]
struct OutputArgs {
    /// Samples per analysis frame
    #[arg(long, default_value_t = BUFFER_SIZE)]
    frame_size: usize,

    /// Pin the meter to this string label (e.g. "A2")
    #[arg(short, long)]
    string: Option<String>,

    /// Emit one JSON object per frame
    #[arg(long)]
    json: bool,
}

impl OutputArgs {
    fn format(&self) -> Format {
        if self.json { Format::Json } else { Format::Text }
    }

    fn frame_size(&self) -> Result<usize> {
        if self.frame_size < MIN_FRAME_LEN {
            bail!("frame size must be at least {MIN_FRAME_LEN} samples");
        }
        Ok(self.frame_size)
    }

    /// Resolves `--string` to a table index.
    fn selected(&self, table: &TuningTable) -> Result<Option<usize>> {
        match &self.string {
            None => Ok(None),
            Some(label) => match table.index_of(label) {
                Some(index) => Ok(Some(index)),
                None => {
                    let known: Vec<&str> =
                        table.tones().iter().map(|t| t.label.as_str()).collect();
                    bail!("unknown string {label:?}; expected one of {}", known.join(", "))
                }
            },
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let profile = load_profile(cli.profile.as_deref())?;

    match cli.command {
        Commands::Listen { output, seconds } => run_listen(profile, &output, seconds),
        Commands::Analyze { file, output } => run_analyze(profile, &file, &output),
        Commands::Table => report::print_table(&mut io::stdout().lock(), &profile.table),
    }
}

fn load_profile(path: Option<&Path>) -> Result<TunerProfile> {
    match path {
        Some(path) => TunerProfile::load(path)
            .with_context(|| format!("loading profile {}", path.display())),
        None => Ok(TunerProfile::default()),
    }
}

/// Live tuning: capture frames from the microphone until Ctrl-C, a stream
/// error, the optional deadline, or the capture channel closing. The stream is
/// paused and dropped on every one of those paths.
fn run_listen(profile: TunerProfile, output: &OutputArgs, seconds: Option<f64>) -> Result<()> {
    let mut tuner = Tuner::from_profile(profile)?;
    let selected = output.selected(tuner.table())?;
    let frame_size = output.frame_size()?;
    let deadline = match seconds {
        Some(s) if !(s.is_finite() && s > 0.0) => bail!("--seconds must be positive"),
        Some(s) => crossbeam_channel::after(Duration::from_secs_f64(s)),
        None => crossbeam_channel::never(),
    };
    let mut reporter = Reporter::new(io::stdout().lock(), output.format());

    let (interrupt_tx, interrupt_rx) = crossbeam_channel::bounded(1);
    ctrlc::set_handler(move || {
        let _ = interrupt_tx.try_send(());
    })
    .context("installing Ctrl-C handler")?;

    let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Vec<f32>>(FRAME_QUEUE);
    let (error_tx, error_rx) = crossbeam_channel::bounded(1);
    let dropped = Arc::new(AtomicUsize::new(0));
    let links = audio::CaptureLinks {
        frames: frame_tx,
        errors: error_tx,
        dropped: Arc::clone(&dropped),
    };
    let (stream, sample_rate) = audio::start_audio_capture(links, frame_size)?;
    info!(target: "main", "listening; play a string (Ctrl-C to stop)");

    let channels = LiveChannels {
        frames: frame_rx,
        errors: error_rx,
        interrupt: interrupt_rx,
        deadline,
    };
    let outcome = pump(&channels, &dropped, |frame| {
        let result = tuner.analyze(frame, sample_rate, selected)?;
        reporter.report(None, &result)
    });

    if let Err(e) = stream.pause() {
        warn!(target: "main", "error pausing stream: {e}");
    }
    drop(stream);
    outcome
}

/// Receiving ends the live loop listens on.
struct LiveChannels {
    frames: Receiver<Vec<f32>>,
    errors: Receiver<cpal::StreamError>,
    interrupt: Receiver<()>,
    deadline: Receiver<Instant>,
}

/// Feeds frames to `on_frame` until one of the stop conditions fires.
///
/// Interrupt, deadline and a closed frame channel end with `Ok`; a stream
/// error or a failing `on_frame` ends with `Err`.
fn pump(
    channels: &LiveChannels,
    dropped: &AtomicUsize,
    mut on_frame: impl FnMut(&[f32]) -> Result<()>,
) -> Result<()> {
    loop {
        crossbeam_channel::select! {
            recv(channels.frames) -> msg => match msg {
                Ok(frame) => {
                    let lost = dropped.swap(0, Ordering::Relaxed);
                    if lost > 0 {
                        warn!(target: "main", lost, "analysis fell behind, frames dropped");
                    }
                    if let Err(e) = on_frame(&frame) {
                        error!(target: "main", "analysis failed: {e:#}");
                        return Err(e);
                    }
                }
                Err(_) => {
                    warn!(target: "main", "audio channel closed");
                    return Ok(());
                }
            },
            recv(channels.errors) -> msg => match msg {
                Ok(err) => {
                    error!(target: "main", "an error occurred on the audio stream: {err}");
                    return Err(anyhow::Error::new(err).context("audio stream failed"));
                }
                Err(_) => {
                    warn!(target: "main", "audio stream gone");
                    return Ok(());
                }
            },
            recv(channels.interrupt) -> _ => {
                info!(target: "main", "interrupted, stopping");
                return Ok(());
            },
            recv(channels.deadline) -> _ => {
                info!(target: "main", "time limit reached");
                return Ok(());
            },
        }
    }
}

/// Offline tuning: slice a WAV file into consecutive frames and analyze each.
fn run_analyze(profile: TunerProfile, file: &Path, output: &OutputArgs) -> Result<()> {
    let mut tuner = Tuner::from_profile(profile)?;
    let selected = output.selected(tuner.table())?;
    let frame_size = output.frame_size()?;
    let clip = wav::WavClip::open(file)?;
    info!(
        target: "main",
        file = %file.display(),
        sample_rate = clip.sample_rate,
        seconds = clip.duration_secs(),
        "analyzing"
    );

    let mut reporter = Reporter::new(io::stdout().lock(), output.format());
    let mut matched: BTreeMap<usize, usize> = BTreeMap::new();
    let mut frames = 0usize;

    for (n, frame) in clip.samples.chunks_exact(frame_size).enumerate() {
        let time = (n * frame_size) as f32 / clip.sample_rate as f32;
        let result = tuner.analyze(frame, clip.sample_rate, selected)?;
        if matches!(result.status, TuningStatus::Detecting | TuningStatus::InTune) {
            *matched.entry(result.matched_index).or_default() += 1;
        }
        reporter.report(Some(time), &result)?;
        frames += 1;
    }

    if frames == 0 {
        warn!(target: "main", "file shorter than one frame ({frame_size} samples)");
    }
    if let Some((&index, &count)) = matched.iter().max_by_key(|&(_, count)| *count) {
        let tone = &tuner.table().tones()[index];
        info!(target: "main", frames, string = %tone.label, count, "most frequent string");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output_args(args: &[&str]) -> OutputArgs {
        let mut argv = vec!["guitar-tuner", "analyze", "clip.wav"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Analyze { output, .. } => output,
            _ => unreachable!(),
        }
    }

    #[test]
    fn defaults() {
        let output = output_args(&[]);
        assert_eq!(output.frame_size().unwrap(), BUFFER_SIZE);
        assert_eq!(output.format(), Format::Text);
        assert_eq!(output.selected(&TuningTable::standard_guitar()).unwrap(), None);
    }

    #[test]
    fn string_label_resolves_to_index() {
        let output = output_args(&["--string", "B3", "--json"]);
        assert_eq!(output.selected(&TuningTable::standard_guitar()).unwrap(), Some(4));
        assert_eq!(output.format(), Format::Json);
    }

    #[test]
    fn unknown_string_lists_labels() {
        let output = output_args(&["-s", "C4"]);
        let err = output.selected(&TuningTable::standard_guitar()).unwrap_err();
        assert!(err.to_string().contains("E2, A2, D3, G3, B3, E4"));
    }

    #[test]
    fn tiny_frames_rejected() {
        assert!(output_args(&["--frame-size", "2"]).frame_size().is_err());
    }

    #[test]
    fn profile_flag_is_global() {
        let cli = Cli::try_parse_from(["guitar-tuner", "table", "--profile", "p.json"]).unwrap();
        assert_eq!(cli.profile, Some(PathBuf::from("p.json")));
    }

    struct Senders {
        frames: crossbeam_channel::Sender<Vec<f32>>,
        errors: crossbeam_channel::Sender<cpal::StreamError>,
        interrupt: crossbeam_channel::Sender<()>,
    }

    fn live_channels() -> (Senders, LiveChannels) {
        let (frames_tx, frames) = crossbeam_channel::bounded(FRAME_QUEUE);
        let (errors_tx, errors) = crossbeam_channel::bounded(1);
        let (interrupt_tx, interrupt) = crossbeam_channel::bounded(1);
        let senders = Senders {
            frames: frames_tx,
            errors: errors_tx,
            interrupt: interrupt_tx,
        };
        let channels = LiveChannels {
            frames,
            errors,
            interrupt,
            deadline: crossbeam_channel::never(),
        };
        (senders, channels)
    }

    #[test]
    fn stream_error_stops_the_loop() {
        let (senders, channels) = live_channels();
        senders.errors.send(cpal::StreamError::DeviceNotAvailable).unwrap();
        let outcome = pump(&channels, &AtomicUsize::new(0), |_| Ok(()));
        let err = outcome.unwrap_err();
        assert!(err.to_string().contains("audio stream failed"));
        // Frame sender still alive: the error alone ended the loop.
        drop(senders);
    }

    #[test]
    fn interrupt_stops_the_loop_after_frames() {
        let (senders, channels) = live_channels();
        let dropped = AtomicUsize::new(3);
        senders.frames.send(vec![0.0; 8]).unwrap();
        let interrupt = senders.interrupt.clone();
        let mut seen = 0;
        let outcome = pump(&channels, &dropped, |frame| {
            assert_eq!(frame.len(), 8);
            seen += 1;
            interrupt.send(()).unwrap();
            Ok(())
        });
        assert!(outcome.is_ok());
        assert_eq!(seen, 1);
        assert_eq!(dropped.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn closed_frame_channel_stops_the_loop() {
        let (senders, channels) = live_channels();
        drop(senders.frames);
        assert!(pump(&channels, &AtomicUsize::new(0), |_| Ok(())).is_ok());
    }

    #[test]
    fn deadline_stops_the_loop() {
        let (_senders, mut channels) = live_channels();
        channels.deadline = crossbeam_channel::after(Duration::from_millis(10));
        assert!(pump(&channels, &AtomicUsize::new(0), |_| Ok(())).is_ok());
    }

    #[test]
    fn frame_failure_stops_the_loop() {
        let (senders, channels) = live_channels();
        senders.frames.send(vec![0.0; 8]).unwrap();
        let outcome = pump(&channels, &AtomicUsize::new(0), |_| bail!("output closed"));
        assert_eq!(outcome.unwrap_err().to_string(), "output closed");
    }

    #[test]
    fn missing_profile_is_an_error() {
        assert!(load_profile(Some(Path::new("/nonexistent/profile.json"))).is_err());
        assert_eq!(load_profile(None).unwrap(), TunerProfile::default());
    }
}
