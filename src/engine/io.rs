//! Audio file I/O for seamloop
//!
//! Handles decoding audio files into an [`AudioBuffer`] and writing buffers
//! back out as WAV. WAV goes through hound; everything else (MP3, AAC,
//! FLAC, MKV, ...) is decoded with symphonia, picked by file extension.
//! Audio is kept at its native sample rate: looping only ever joins a
//! track with itself, so there is nothing to convert between.

use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::{debug, warn};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Track};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::engine::buffer::{AudioBuffer, ChannelLayout};
use crate::error::{LoopError, Result};

/// Largest WAV data chunk hound can describe: the RIFF size fields are
/// 32-bit and the header chunks take up to 60 bytes of that range
pub const WAV_MAX_DATA_BYTES: u64 = u32::MAX as u64 - 60;

/// Export format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportFormat {
    /// Bit depth: 16, 24 (integer) or 32 (float). Default: 16
    pub bit_depth: u16,
}

impl Default for ExportFormat {
    fn default() -> Self {
        Self::cd_quality()
    }
}

impl ExportFormat {
    /// Create a new export format with the given bit depth
    pub fn new(bit_depth: u16) -> Result<Self> {
        match bit_depth {
            16 | 24 | 32 => Ok(ExportFormat { bit_depth }),
            _ => Err(LoopError::UnsupportedFormat {
                format: format!("{}-bit audio (only 16, 24, 32 supported)", bit_depth),
            }),
        }
    }

    /// 16-bit integer samples
    pub fn cd_quality() -> Self {
        ExportFormat { bit_depth: 16 }
    }

    /// 24-bit integer samples
    pub fn high_quality() -> Self {
        ExportFormat { bit_depth: 24 }
    }

    /// 32-bit float samples
    pub fn float() -> Self {
        ExportFormat { bit_depth: 32 }
    }
}

impl ExportFormat {
    /// Size of the WAV data chunk for `frames` frames of `channels` channels
    pub fn wav_data_bytes(&self, frames: u64, channels: usize) -> u64 {
        frames
            .saturating_mul(channels as u64)
            .saturating_mul(self.bit_depth as u64 / 8)
    }

    /// Check that `frames` frames fit in a single WAV file
    ///
    /// # Errors
    /// `OutputTooLarge` when the data chunk would pass [`WAV_MAX_DATA_BYTES`]
    pub fn check_wav_capacity(&self, frames: u64, channels: usize) -> Result<()> {
        let bytes = self.wav_data_bytes(frames, channels);
        if bytes > WAV_MAX_DATA_BYTES {
            return Err(LoopError::OutputTooLarge {
                bytes,
                limit: WAV_MAX_DATA_BYTES,
                format: "WAV",
            });
        }
        Ok(())
    }
}

/// Stream information of an audio file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioInfo {
    pub sample_rate: u32,
    pub channels: u16,
    /// Samples per channel
    pub frames: u64,
}

impl AudioInfo {
    /// Duration in whole milliseconds, rounded down
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.frames * 1000 / self.sample_rate as u64
    }
}

/// Check that `path` names an existing, non-empty file
pub fn ensure_readable(path: &Path) -> Result<()> {
    let metadata = fs::metadata(path).map_err(|e| LoopError::FileNotFound {
        path: path.display().to_string(),
        source: Some(e),
    })?;

    if metadata.len() == 0 {
        return Err(LoopError::EmptyFile {
            path: path.display().to_string(),
        });
    }

    Ok(())
}

/// Whether `path` names a WAV file, judged by its extension
pub fn is_wav_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
}

/// Read the stream information of an audio file
///
/// Only the header is read for WAV files and for containers that record
/// their length; anything else is decoded to count its frames.
pub fn read_audio_info(path: &Path) -> Result<AudioInfo> {
    ensure_readable(path)?;

    if is_wav_path(path) {
        let reader = WavReader::open(path).map_err(wav_open_error)?;
        let spec = reader.spec();
        return Ok(AudioInfo {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            frames: reader.duration() as u64,
        });
    }

    let (reader, track) = open_reader(path)?;
    let params = &reader.tracks()[track].codec_params;
    match (params.sample_rate, params.channels, params.n_frames) {
        (Some(sample_rate), Some(channels), Some(frames)) => Ok(AudioInfo {
            sample_rate,
            channels: channels.count() as u16,
            frames,
        }),
        _ => {
            debug!("{} does not record its length, decoding it", path.display());
            let buffer = decode_with_symphonia(path)?;
            Ok(AudioInfo {
                sample_rate: buffer.sample_rate,
                channels: buffer.channels() as u16,
                frames: buffer.len() as u64,
            })
        }
    }
}

/// Import an audio file into an AudioBuffer
///
/// Samples are converted to 32-bit float at the file's own sample rate.
/// `.wav` files are read with hound, any other extension with symphonia.
///
/// # Errors
/// * `FileNotFound` - If the file does not exist
/// * `EmptyFile` - If the file is zero bytes
/// * `InvalidAudio` - If the file cannot be parsed or decoded
/// * `UnsupportedFormat` - If the codec is unknown or the audio has more
///   than 2 channels
/// * `EmptyAudio` - If the file decodes to zero samples
pub fn import_audio(path: &Path) -> Result<AudioBuffer> {
    ensure_readable(path)?;

    let buffer = if is_wav_path(path) {
        import_wav(path)?
    } else {
        decode_with_symphonia(path)?
    };

    if buffer.is_empty() {
        return Err(LoopError::EmptyAudio);
    }

    debug!(
        "Decoded {}: {} Hz, {} channel(s), {} frames",
        path.display(),
        buffer.sample_rate,
        buffer.channels(),
        buffer.len()
    );

    Ok(buffer)
}

fn import_wav(path: &Path) -> Result<AudioBuffer> {
    let reader = WavReader::open(path).map_err(wav_open_error)?;

    let spec = reader.spec();
    let layout = channel_layout(spec.channels as usize)?;

    let interleaved = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?;
    AudioBuffer::from_interleaved(&interleaved, layout, spec.sample_rate)
}

/// Decode the first audio track of any container symphonia can read
fn decode_with_symphonia(path: &Path) -> Result<AudioBuffer> {
    let (mut reader, track) = open_reader(path)?;
    let track_id = reader.tracks()[track].id;
    let params = reader.tracks()[track].codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&params, &DecoderOptions::default())
        .map_err(|e| symphonia_error(path, e))?;

    // Containers may leave these out; the first decoded packet fills them in
    let mut sample_rate = params.sample_rate;
    let mut channels = params.channels.map(|c| c.count());
    let mut interleaved: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(symphonia_error(path, e)),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(msg)) => {
                warn!("Skipping corrupt packet in {}: {}", path.display(), msg);
                continue;
            }
            Err(e) => return Err(symphonia_error(path, e)),
        };
        if decoded.frames() == 0 {
            continue;
        }

        let spec = *decoded.spec();
        sample_rate = Some(spec.rate);
        channels = Some(spec.channels.count());

        let capacity = decoded.capacity() as u64;
        let buf = sample_buf.get_or_insert_with(|| SampleBuffer::new(capacity, spec));
        buf.copy_interleaved_ref(decoded);
        interleaved.extend_from_slice(buf.samples());
    }

    let (Some(sample_rate), Some(channels)) = (sample_rate, channels) else {
        return Err(LoopError::InvalidAudio {
            reason: format!("{} has no sample rate or channel information", path.display()),
            source: None,
        });
    };

    AudioBuffer::from_interleaved(&interleaved, channel_layout(channels)?, sample_rate)
}

/// Open `path` with symphonia and find its first audio track
fn open_reader(path: &Path) -> Result<(Box<dyn FormatReader>, usize)> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(ext);
    }

    let opened = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| symphonia_error(path, e))?;

    let reader = opened.format;
    let track = reader
        .tracks()
        .iter()
        .position(is_audio_track)
        .ok_or_else(|| LoopError::InvalidAudio {
            reason: format!("{} has no audio track", path.display()),
            source: None,
        })?;

    Ok((reader, track))
}

fn is_audio_track(track: &Track) -> bool {
    track.codec_params.codec != CODEC_TYPE_NULL
}

/// Export an AudioBuffer to a WAV file
///
/// The file is written at the buffer's sample rate with the bit depth
/// from `format`.
///
/// # Errors
/// `OutputTooLarge` before anything is written if the audio does not fit
/// in a WAV file.
pub fn export_audio(buffer: &AudioBuffer, path: &Path, format: ExportFormat) -> Result<()> {
    format.check_wav_capacity(buffer.len() as u64, buffer.channels())?;

    let spec = WavSpec {
        channels: buffer.channels() as u16,
        sample_rate: buffer.sample_rate,
        bits_per_sample: format.bit_depth,
        sample_format: if format.bit_depth == 32 {
            SampleFormat::Float
        } else {
            SampleFormat::Int
        },
    };

    let mut writer = WavWriter::create(path, spec).map_err(wav_write_error)?;

    // Frame by frame, so a multi-hour loop never needs a second interleaved copy
    for frame in 0..buffer.len() {
        for channel in &buffer.samples {
            let sample = channel[frame];
            match format.bit_depth {
                16 => {
                    let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                    writer.write_sample(scaled).map_err(wav_write_error)?;
                }
                24 => {
                    // 24-bit stored as i32 in hound
                    let scaled = (sample * 8388607.0).clamp(-8388608.0, 8388607.0) as i32;
                    writer.write_sample(scaled).map_err(wav_write_error)?;
                }
                32 => writer.write_sample(sample).map_err(wav_write_error)?,
                other => {
                    return Err(LoopError::UnsupportedFormat {
                        format: format!("{}-bit audio (only 16, 24, 32 supported)", other),
                    })
                }
            }
        }
    }

    writer.finalize().map_err(wav_write_error)?;

    debug!(
        "Wrote {} ({} frames, {}-bit)",
        path.display(),
        buffer.len(),
        format.bit_depth
    );

    Ok(())
}

/// Generate a mono sine tone
///
/// Useful for building fixtures for the looping pipeline.
pub fn generate_test_tone(frequency: f32, duration_secs: f32, sample_rate: u32) -> AudioBuffer {
    let num_samples = (duration_secs * sample_rate as f32) as usize;
    let mut buffer = AudioBuffer::new(num_samples, ChannelLayout::Mono, sample_rate);

    let angular_freq = 2.0 * std::f32::consts::PI * frequency / sample_rate as f32;
    for (i, sample) in buffer.samples[0].iter_mut().enumerate() {
        *sample = 0.5 * (angular_freq * i as f32).sin();
    }

    buffer
}

/// Generate a stereo tone with a different frequency per channel
pub fn generate_stereo_test_tone(
    freq_left: f32,
    freq_right: f32,
    duration_secs: f32,
    sample_rate: u32,
) -> AudioBuffer {
    let num_samples = (duration_secs * sample_rate as f32) as usize;
    let mut buffer = AudioBuffer::new(num_samples, ChannelLayout::Stereo, sample_rate);

    for (channel, freq) in buffer.samples.iter_mut().zip([freq_left, freq_right]) {
        let angular_freq = 2.0 * std::f32::consts::PI * freq / sample_rate as f32;
        for (i, sample) in channel.iter_mut().enumerate() {
            *sample = 0.5 * (angular_freq * i as f32).sin();
        }
    }

    buffer
}

// ============================================================================
// Internal helper functions
// ============================================================================

fn channel_layout(channels: usize) -> Result<ChannelLayout> {
    ChannelLayout::from_count(channels).ok_or_else(|| LoopError::UnsupportedFormat {
        format: format!("{}-channel audio (only mono/stereo supported)", channels),
    })
}

fn wav_open_error(e: hound::Error) -> LoopError {
    LoopError::InvalidAudio {
        reason: format!("Failed to open WAV file: {}", e),
        source: Some(Box::new(e)),
    }
}

fn symphonia_error(path: &Path, e: SymphoniaError) -> LoopError {
    match e {
        SymphoniaError::Unsupported(what) => LoopError::UnsupportedFormat {
            format: format!("{} ({})", what, path.display()),
        },
        SymphoniaError::IoError(io) if io.kind() != ErrorKind::UnexpectedEof => LoopError::Io(io),
        other => LoopError::InvalidAudio {
            reason: format!("Failed to decode {}: {}", path.display(), other),
            source: Some(Box::new(other)),
        },
    }
}

fn wav_write_error(e: hound::Error) -> LoopError {
    match e {
        hound::Error::IoError(io) => LoopError::Io(io),
        other => LoopError::InvalidAudio {
            reason: format!("Failed to write WAV file: {}", other),
            source: Some(Box::new(other)),
        },
    }
}

/// Read samples from WAV reader and convert to f32
fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    let scale = match (sample_format, bits_per_sample) {
        (SampleFormat::Float, 32) => {
            return reader
                .samples::<f32>()
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| read_error(32, e));
        }
        (SampleFormat::Int, 8) => 128.0,
        (SampleFormat::Int, 16) => 32768.0,
        (SampleFormat::Int, 24) => 8388608.0,
        (SampleFormat::Int, 32) => 2147483648.0,
        (format, bits) => {
            return Err(LoopError::UnsupportedFormat {
                format: format!("{}-bit {:?} audio", bits, format),
            })
        }
    };

    // hound widens every integer depth to i32
    reader
        .samples::<i32>()
        .map(|s| s.map(|v| (v as f64 / scale) as f32))
        .collect::<std::result::Result<Vec<f32>, _>>()
        .map_err(|e| read_error(bits_per_sample, e))
}

fn read_error(bits: u16, e: hound::Error) -> LoopError {
    LoopError::InvalidAudio {
        reason: format!("Failed to read {}-bit samples: {}", bits, e),
        source: Some(Box::new(e)),
    }
}

// ============================================================================
// Tests
// ============================================================================
