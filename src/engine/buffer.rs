//! Audio Buffer Management
//!
//! Provides the in-memory waveform type that the loop builder works on.
//! Samples are stored non-interleaved as 32-bit floats at the sample rate
//! the file was decoded with; looping never resamples.
//!
//! Durations are whole milliseconds. Frame counts derived from a duration
//! round up, so for any rate of at least 1kHz a buffer of
//! `frames_for_ms(ms)` frames reports exactly `ms`.

use crate::error::{LoopError, Result};

// ============================================================================
// Constants
// ============================================================================

/// Milliseconds per second
const MS_PER_SEC: u64 = 1000;

// ============================================================================
// Channel Layout
// ============================================================================

/// Audio channel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelLayout {
    /// Single channel (mono)
    Mono,
    /// Two channels (stereo: left, right)
    Stereo,
}

impl ChannelLayout {
    /// Returns the number of channels for this layout
    pub fn num_channels(&self) -> usize {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }

    /// Create a ChannelLayout from a channel count
    pub fn from_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(ChannelLayout::Mono),
            2 => Some(ChannelLayout::Stereo),
            _ => None,
        }
    }
}

// ============================================================================
// Audio Buffer
// ============================================================================

/// Decoded audio held in memory
///
/// Stores audio as non-interleaved 32-bit floating point samples.
/// Each channel is a separate Vec<f32> and all channels have the same length.
///
/// # Example
/// ```
/// use seamloop::engine::buffer::{AudioBuffer, ChannelLayout};
///
/// // Two seconds of stereo silence at 44.1kHz
/// let buffer = AudioBuffer::new(88200, ChannelLayout::Stereo, 44100);
/// assert_eq!(buffer.channels(), 2);
/// assert_eq!(buffer.duration_ms(), 2000);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Sample data: outer Vec is channels, inner Vec is samples
    pub samples: Vec<Vec<f32>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Create a new buffer of silence
    ///
    /// # Arguments
    /// * `num_samples` - Number of samples per channel
    /// * `layout` - Channel configuration (Mono or Stereo)
    /// * `sample_rate` - Sample rate in Hz
    pub fn new(num_samples: usize, layout: ChannelLayout, sample_rate: u32) -> Self {
        let samples = vec![vec![0.0_f32; num_samples]; layout.num_channels()];
        Self {
            samples,
            sample_rate,
        }
    }

    /// Create an audio buffer from interleaved sample data
    ///
    /// # Arguments
    /// * `interleaved` - Interleaved sample data (L, R, L, R, ... for stereo)
    /// * `layout` - Channel configuration
    /// * `sample_rate` - Sample rate in Hz
    ///
    /// # Returns
    /// Result containing the AudioBuffer, or error if data length doesn't match layout
    pub fn from_interleaved(
        interleaved: &[f32],
        layout: ChannelLayout,
        sample_rate: u32,
    ) -> Result<Self> {
        let num_channels = layout.num_channels();

        if interleaved.len() % num_channels != 0 {
            return Err(LoopError::InvalidAudio {
                reason: format!(
                    "Interleaved data length {} is not divisible by channel count {}",
                    interleaved.len(),
                    num_channels
                ),
                source: None,
            });
        }

        let num_samples = interleaved.len() / num_channels;
        let mut samples = vec![Vec::with_capacity(num_samples); num_channels];

        for frame in interleaved.chunks_exact(num_channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                samples[ch].push(sample);
            }
        }

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Get the number of channels
    #[inline]
    pub fn channels(&self) -> usize {
        self.samples.len()
    }

    /// Get the number of samples per channel
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.first().map(|ch| ch.len()).unwrap_or(0)
    }

    /// Check if the buffer is empty (no samples)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Duration in whole milliseconds, rounded down
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.len() as u64 * MS_PER_SEC / self.sample_rate as u64
    }

    /// Smallest number of frames lasting at least `ms` milliseconds
    #[inline]
    pub fn frames_for_ms(&self, ms: u64) -> usize {
        (ms * self.sample_rate as u64).div_ceil(MS_PER_SEC) as usize
    }

    /// Get immutable access to a channel's samples
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.samples[index]
    }

    /// Get mutable access to a channel's samples
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.samples[index]
    }

    /// Concatenate `other` after `self`, overlapping the seam by `crossfade_ms`
    ///
    /// The last `crossfade_ms` of `self` fade out linearly while the first
    /// `crossfade_ms` of `other` fade in over the same window. The result
    /// lasts exactly `self.duration_ms() + other.duration_ms() - crossfade_ms`:
    /// the sub-millisecond remainders of both inputs would otherwise add up
    /// at every join, so at most two milliseconds of the tail of `other` are
    /// dropped to land on that length.
    ///
    /// # Errors
    /// * `IncompatibleBuffers` - sample rate or channel count differ
    /// * `InvalidLoopSpec` - the crossfade is longer than either buffer
    pub fn crossfade_concat(&self, other: &AudioBuffer, crossfade_ms: u64) -> Result<AudioBuffer> {
        if self.sample_rate != other.sample_rate {
            return Err(LoopError::IncompatibleBuffers {
                reason: format!(
                    "sample rates differ ({} Hz vs {} Hz)",
                    self.sample_rate, other.sample_rate
                ),
            });
        }
        if self.channels() != other.channels() {
            return Err(LoopError::IncompatibleBuffers {
                reason: format!(
                    "channel counts differ ({} vs {})",
                    self.channels(),
                    other.channels()
                ),
            });
        }

        let (self_ms, other_ms) = (self.duration_ms(), other.duration_ms());
        let overlap = (crossfade_ms * self.sample_rate as u64 / MS_PER_SEC) as usize;
        if crossfade_ms > self_ms
            || crossfade_ms > other_ms
            || overlap > self.len()
            || overlap > other.len()
        {
            return Err(LoopError::InvalidLoopSpec {
                reason: format!(
                    "crossfade of {}ms is longer than the audio being joined ({}ms / {}ms)",
                    crossfade_ms, self_ms, other_ms
                ),
            });
        }

        let head_len = self.len() - overlap;
        let joined_len = self.len() + other.len() - overlap;
        // Never longer than joined_len: both inputs hold at least their
        // duration in frames and the overlap rounds down
        let total = self.frames_for_ms(self_ms + other_ms - crossfade_ms);

        let samples = self
            .samples
            .iter()
            .zip(other.samples.iter())
            .map(|(a, b)| {
                let mut out = Vec::with_capacity(joined_len);
                out.extend_from_slice(&a[..head_len]);
                for i in 0..overlap {
                    // fade_in runs 0 -> 1 across the window
                    let fade_in = i as f32 / overlap as f32;
                    out.push(a[head_len + i] * (1.0 - fade_in) + b[i] * fade_in);
                }
                out.extend_from_slice(&b[overlap..]);
                out.truncate(total);
                out
            })
            .collect();

        Ok(AudioBuffer {
            samples,
            sample_rate: self.sample_rate,
        })
    }

    /// Shorten the buffer to `ms` milliseconds
    ///
    /// Keeps [`frames_for_ms`](Self::frames_for_ms) frames, so the result
    /// never reports less than `ms`. Buffers already shorter are left alone.
    pub fn truncate_ms(&mut self, ms: u64) {
        let frames = self.frames_for_ms(ms);
        for channel in &mut self.samples {
            channel.truncate(frames);
        }
    }

    /// Peak absolute sample value across all channels
    pub fn peak(&self) -> f32 {
        self.samples
            .iter()
            .flat_map(|channel| channel.iter())
            .map(|&s| s.abs())
            .fold(0.0_f32, f32::max)
    }
}

// ============================================================================
// Tests
// ============================================================================
