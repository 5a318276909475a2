//! Turns an interleaved sample stream into fixed-size mono frames.

/// Averages interleaved channels down to mono. Trailing partial frames are dropped.
pub fn downmix(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks_exact(channels)
        .map(|chunk| chunk.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Accumulates mono samples and hands out complete frames.
#[derive(Debug)]
pub struct Framer {
    frame_size: usize,
    channels: usize,
    pending: Vec<f32>,
}

impl Framer {
    pub fn new(frame_size: usize, channels: usize) -> Self {
        Self {
            frame_size,
            channels: channels.max(1),
            pending: Vec::with_capacity(frame_size * 2),
        }
    }

    /// Appends an interleaved block and calls `emit` once per full frame.
    pub fn push(&mut self, data: &[f32], mut emit: impl FnMut(Vec<f32>)) {
        if self.channels == 1 {
            self.pending.extend_from_slice(data);
        } else {
            self.pending.extend(downmix(data, self.channels));
        }

        // While we have enough data for a full frame, process it.
        while self.pending.len() >= self.frame_size {
            let frame: Vec<f32> = self.pending.drain(..self.frame_size).collect();
            emit(frame);
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
