use serde::{Deserialize, Serialize};

/// Number of stereo frames handed to a plugin per delivery cycle.
pub const ANALYSIS_WINDOW: usize = 512;

/// Capacity of a [`SampleBuffer`] in interleaved samples.
pub const BUFFER_LEN: usize = 2 * ANALYSIS_WINDOW;

/// Upper bound on the delay queue depth.
pub const MAX_BUFFERS: usize = 16;

/// Format reported by the media engine before audio starts flowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

impl AudioFormat {
    pub fn new(channels: u16, sample_rate: u32, bits_per_sample: u16) -> Self {
        Self {
            channels,
            sample_rate,
            bits_per_sample,
        }
    }
}

/// Fixed-capacity block of signed 16-bit samples, stereo interleaved.
#[derive(Clone, PartialEq, Eq)]
pub struct SampleBuffer {
    samples: Box<[i16]>,
}

impl SampleBuffer {
    /// Creates a zeroed buffer of [`BUFFER_LEN`] samples.
    pub fn new() -> Self {
        Self::with_capacity(BUFFER_LEN)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: vec![0; capacity].into_boxed_slice(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Replaces the buffer contents with `source` converted to 16-bit.
    ///
    /// `length` is the number of valid bytes the producer claims; a negative
    /// value drops the delivery and leaves the buffer untouched. Depths other
    /// than 8, 16 and 24 are read as little-endian `f32` in `[-1.0, 1.0]` and
    /// scaled by 32767 with truncation. Positions past the converted samples
    /// are always zeroed.
    pub fn convert(&mut self, source: &[u8], length: isize, bits_per_sample: u16) {
        if length < 0 {
            return;
        }
        let source = &source[..source.len().min(length as usize)];

        let written = match bits_per_sample {
            16 => self.fill(source.chunks_exact(2).map(|b| i16::from_le_bytes([b[0], b[1]]))),
            8 => self.fill(source.iter().map(|&b| i16::from(b as i8) << 8)),
            24 => self.fill(
                source
                    .chunks_exact(3)
                    .map(|b| i16::from_le_bytes([b[1], b[2]])),
            ),
            _ => self.fill(source.chunks_exact(4).map(|b| {
                let value = f32::from_le_bytes([b[0], b[1], b[2], b[3]]);
                (value * 32767.0) as i16
            })),
        };

        self.samples[written..].fill(0);
    }

    fn fill(&mut self, converted: impl Iterator<Item = i16>) -> usize {
        let mut written = 0;
        for (slot, sample) in self.samples.iter_mut().zip(converted) {
            *slot = sample;
            written += 1;
        }
        written
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SampleBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleBuffer")
            .field("capacity", &self.samples.len())
            .finish()
    }
}
