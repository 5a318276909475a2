//! # Audio Capture Module
//!
//! Real-time microphone capture using CPAL (Cross-Platform Audio Library).
//! The stream callback slices incoming audio into fixed mono frames and sends
//! them to the analysis loop over a channel. Stream errors travel over a second
//! channel; nothing is logged from the real-time callback.

use anyhow::{Context, Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SupportedStreamConfigRange;
use crossbeam_channel::Sender;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

use crate::framing::Framer;

/// Preferred capture rate.
const TARGET_SAMPLE_RATE: u32 = 44100;

/// Where the capture callback delivers its output.
#[derive(Debug, Clone)]
pub struct CaptureLinks {
    /// One `Vec<f32>` per complete frame
    pub frames: Sender<Vec<f32>>,
    /// Stream failures (device unplugged, backend errors)
    pub errors: Sender<cpal::StreamError>,
    /// Frames discarded because `frames` was full
    pub dropped: Arc<AtomicUsize>,
}

/// Starts audio capture from the default input device.
///
/// # Arguments
/// * `links` - Channels and counter the callback reports through
/// * `frame_size` - Samples per frame (typically 2048)
///
/// # Returns
/// * `Ok((stream, sample_rate))` - Live stream handle and the rate it runs at
/// * `Err(e)` - No device, no f32 format, or the stream failed to start
///
/// Dropping the returned stream stops capture.
pub fn start_audio_capture(
    links: CaptureLinks,
    frame_size: usize,
) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    info!(target: "audio", device = %device.name()?, "using audio input device");

    let configs = device
        .supported_input_configs()
        .context("querying input configurations")?
        .collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, TARGET_SAMPLE_RATE)
        .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

    let config = if supported_config.min_sample_rate().0 <= TARGET_SAMPLE_RATE
        && supported_config.max_sample_rate().0 >= TARGET_SAMPLE_RATE
    {
        supported_config.with_sample_rate(cpal::SampleRate(TARGET_SAMPLE_RATE))
    } else {
        supported_config.with_max_sample_rate()
    };

    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;
    let config: cpal::StreamConfig = config.into();

    info!(target: "audio", sample_rate, channels, "selected input format");

    let CaptureLinks {
        frames,
        errors,
        dropped,
    } = links;

    // The analysis loop only needs the first error to stop.
    let err_fn = move |err: cpal::StreamError| {
        let _ = errors.try_send(err);
    };

    let mut framer = Framer::new(frame_size, channels);

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            framer.push(data, |frame| {
                // Drop the frame if the analysis loop is behind.
                if frames.try_send(frame).is_err() {
                    dropped.fetch_add(1, Ordering::Relaxed);
                }
            });
        },
        err_fn,
        None,
    )?;

    stream.play()?;

    Ok((stream, sample_rate))
}

/// Picks the f32 input configuration closest to the target rate,
/// preferring mono when several are equally close.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let min_diff = (c.min_sample_rate().0 as i64 - target_rate as i64).abs();
            let max_diff = (c.max_sample_rate().0 as i64 - target_rate as i64).abs();
            let in_range =
                c.min_sample_rate().0 <= target_rate && c.max_sample_rate().0 >= target_rate;
            let rate_cost = if in_range { 0 } else { min_diff.min(max_diff) };
            (rate_cost, c.channels())
        })
}
