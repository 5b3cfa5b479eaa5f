//! Audio Engine Module
//!
//! In-memory waveform handling and audio file I/O:
//! - Audio buffer with millisecond durations and crossfaded joins
//! - WAV import/export, compressed formats decoded through symphonia

pub mod buffer;
pub mod io;

pub use buffer::{AudioBuffer, ChannelLayout};
pub use io::{
    ensure_readable, export_audio, generate_stereo_test_tone, generate_test_tone, import_audio,
    is_wav_path, read_audio_info, AudioInfo, ExportFormat, WAV_MAX_DATA_BYTES,
};
