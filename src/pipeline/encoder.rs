//! Video Encoder
//!
//! The loop pipeline hands its finished audio to a [`VideoEncoder`], which
//! muxes it against a still image. The same encoder writes the looped audio
//! itself whenever it goes to a compressed format. [`FfmpegEncoder`] does
//! both with single blocking `ffmpeg` runs; tests substitute their own
//! implementations.

use std::ffi::OsString;
use std::io::{BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::engine::AudioBuffer;
use crate::error::{LoopError, Result};

/// Lines of encoder stderr kept in `EncoderFailed`
const STDERR_TAIL_LINES: usize = 20;

/// Frames interleaved per write to the encoder's stdin
const PCM_CHUNK_FRAMES: usize = 4096;

/// Capability to mux an audio file and a still image into a video
pub trait VideoEncoder {
    /// Write a video at `output` that shows `image` for the length of `audio`
    ///
    /// Returns the path of the written video.
    fn mux(&self, audio: &Path, image: &Path, output: &Path) -> Result<PathBuf>;

    /// Encode `audio` into a compressed file at `output`, the codec picked
    /// from its extension
    ///
    /// Returns the path of the written file.
    fn encode_audio(&self, audio: &AudioBuffer, output: &Path) -> Result<PathBuf>;
}

/// Output settings for [`FfmpegEncoder`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderSettings {
    /// ffmpeg executable, looked up on PATH when not absolute
    pub program: PathBuf,
    /// Output frame width; the image is scaled and letterboxed to fit
    pub width: u32,
    /// Output frame height
    pub height: u32,
    /// Frames per second. A still image needs very few
    pub framerate: u32,
    pub audio_bitrate: String,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            width: 1920,
            height: 1080,
            framerate: 2,
            audio_bitrate: "192k".to_string(),
        }
    }
}

/// Muxes through an external `ffmpeg` process
#[derive(Debug, Clone, Default)]
pub struct FfmpegEncoder {
    settings: EncoderSettings,
}

impl FfmpegEncoder {
    pub fn new(settings: EncoderSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EncoderSettings {
        &self.settings
    }

    /// Argument list passed to ffmpeg for one mux
    pub fn build_args(&self, audio: &Path, image: &Path, output: &Path) -> Vec<OsString> {
        let s = &self.settings;
        let framerate = s.framerate.to_string();
        let scale = format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2",
            w = s.width,
            h = s.height
        );

        let mut args: Vec<OsString> = Vec::with_capacity(28);
        args.push("-y".into());
        args.extend(["-loop", "1", "-framerate"].map(OsString::from));
        args.push(framerate.clone().into());
        args.push("-i".into());
        args.push(image.into());
        args.push("-i".into());
        args.push(audio.into());
        args.extend(
            ["-c:v", "libx264", "-tune", "stillimage", "-c:a", "aac", "-b:a"].map(OsString::from),
        );
        args.push(s.audio_bitrate.clone().into());
        args.push("-vf".into());
        args.push(scale.into());
        args.extend(["-pix_fmt", "yuv420p", "-shortest", "-r"].map(OsString::from));
        args.push(framerate.into());
        args.push(output.into());
        args
    }

    /// Argument list for encoding raw 32-bit float PCM read from stdin
    pub fn audio_args(&self, sample_rate: u32, channels: usize, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-y", "-f", "f32le", "-ar"].map(OsString::from).to_vec();
        args.push(sample_rate.to_string().into());
        args.push("-ac".into());
        args.push(channels.to_string().into());
        args.extend(["-i", "pipe:0", "-b:a"].map(OsString::from));
        args.push(self.settings.audio_bitrate.clone().into());
        args.push(output.into());
        args
    }

    fn spawn_error(&self, e: std::io::Error) -> LoopError {
        if e.kind() == ErrorKind::NotFound {
            LoopError::EncoderNotFound {
                program: self.settings.program.display().to_string(),
                source: e,
            }
        } else {
            LoopError::Io(e)
        }
    }
}

impl VideoEncoder for FfmpegEncoder {
    fn mux(&self, audio: &Path, image: &Path, output: &Path) -> Result<PathBuf> {
        let program = &self.settings.program;
        let args = self.build_args(audio, image, output);
        debug!("Running {} {:?}", program.display(), args);

        let result = Command::new(program)
            .args(&args)
            .output()
            .map_err(|e| self.spawn_error(e))?;

        if !result.status.success() {
            return Err(LoopError::EncoderFailed {
                status: result.status.to_string(),
                stderr: stderr_tail(&String::from_utf8_lossy(&result.stderr)),
            });
        }

        info!("Video written to {}", output.display());
        Ok(output.to_path_buf())
    }

    fn encode_audio(&self, audio: &AudioBuffer, output: &Path) -> Result<PathBuf> {
        let program = &self.settings.program;
        let args = self.audio_args(audio.sample_rate, audio.channels(), output);
        debug!("Running {} {:?}", program.display(), args);

        let mut child = Command::new(program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        // Drained on its own thread so a chatty encoder can't stall on a
        // full stderr pipe while we are still writing samples
        let stderr = child.stderr.take();
        let drain = thread::spawn(move || {
            let mut text = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut text);
            }
            text
        });

        let written = match child.stdin.take() {
            Some(stdin) => write_pcm(stdin, audio),
            None => Ok(()),
        };
        let status = child.wait()?;
        let stderr = drain.join().unwrap_or_default();

        // A failed encoder closes its stdin early; its exit status says why
        if !status.success() {
            return Err(LoopError::EncoderFailed {
                status: status.to_string(),
                stderr: stderr_tail(&stderr),
            });
        }
        written?;

        info!("Audio written to {}", output.display());
        Ok(output.to_path_buf())
    }
}

/// Stream `audio` as interleaved little-endian f32 frames
fn write_pcm<W: Write>(sink: W, audio: &AudioBuffer) -> std::io::Result<()> {
    let mut sink = BufWriter::new(sink);
    let mut chunk = Vec::with_capacity(PCM_CHUNK_FRAMES * audio.channels() * 4);

    for start in (0..audio.len()).step_by(PCM_CHUNK_FRAMES) {
        let end = (start + PCM_CHUNK_FRAMES).min(audio.len());
        chunk.clear();
        for frame in start..end {
            for channel in &audio.samples {
                chunk.extend_from_slice(&channel[frame].to_le_bytes());
            }
        }
        sink.write_all(&chunk)?;
    }

    sink.flush()
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().collect();
    lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n")
}
