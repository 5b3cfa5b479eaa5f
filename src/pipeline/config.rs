//! Pipeline Configuration
//!
//! Everything a pipeline run needs, passed in as one value. Can be loaded
//! from a JSON file; fields left out of the file take their defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::ExportFormat;
use crate::error::{LoopError, Result};
use crate::looping::LoopSpec;
use crate::pipeline::encoder::EncoderSettings;

/// Prefix for the looped audio file when no output path is given
pub const LOOPED_PREFIX: &str = "looped_";

/// Configuration for one pipeline run
///
/// # Example
/// ```
/// use seamloop::pipeline::PipelineConfig;
///
/// let config: PipelineConfig =
///     serde_json::from_str(r#"{"input": "music/song.wav", "crossfade_secs": 2}"#).unwrap();
/// assert_eq!(config.target_duration_secs, 3600);
/// assert_eq!(config.audio_output_path().to_str(), Some("music/looped_song.wav"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Source audio file: WAV, or anything symphonia decodes (MP3, MKV, ...)
    pub input: PathBuf,
    /// Where the looped audio is written. Defaults to `looped_<input name>`
    /// next to the input. A `.wav` path is written directly, anything else
    /// is compressed by the encoder
    pub audio_output: Option<PathBuf>,
    /// Still image for the video. No video is made when unset
    pub thumbnail: Option<PathBuf>,
    pub video_output: PathBuf,
    pub target_duration_secs: u64,
    pub crossfade_secs: u64,
    /// Cut the loop to exactly the target instead of allowing overshoot
    pub trim: bool,
    /// Bit depth when the loop is written as WAV (16, 24 or 32)
    pub bit_depth: u16,
    pub encoder: EncoderSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("song.mp3"),
            audio_output: None,
            thumbnail: Some(PathBuf::from("thumbnail.jpg")),
            video_output: PathBuf::from("output_video.mp4"),
            target_duration_secs: 60 * 60,
            crossfade_secs: 5,
            trim: false,
            bit_depth: 16,
            encoder: EncoderSettings::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| LoopError::FileNotFound {
            path: path.display().to_string(),
            source: Some(e),
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the configuration as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Resolved path of the looped audio file
    pub fn audio_output_path(&self) -> PathBuf {
        if let Some(path) = &self.audio_output {
            return path.clone();
        }

        let name = self
            .input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output.wav".to_string());
        self.input.with_file_name(format!("{}{}", LOOPED_PREFIX, name))
    }

    pub fn loop_spec(&self) -> Result<LoopSpec> {
        Ok(LoopSpec::from_secs(self.target_duration_secs, self.crossfade_secs)?.with_trim(self.trim))
    }

    pub fn export_format(&self) -> Result<ExportFormat> {
        ExportFormat::new(self.bit_depth)
    }

    /// Check the values that can be checked without touching the filesystem
    pub fn validate(&self) -> Result<()> {
        if self.input.as_os_str().is_empty() {
            return Err(LoopError::Config {
                reason: "input path is empty".to_string(),
            });
        }
        if self.target_duration_secs == 0 {
            return Err(LoopError::Config {
                reason: "target duration must be at least one second".to_string(),
            });
        }
        if self.thumbnail.is_some() && self.video_output.as_os_str().is_empty() {
            return Err(LoopError::Config {
                reason: "video output path is empty".to_string(),
            });
        }
        if self.audio_output_path() == self.input {
            return Err(LoopError::Config {
                reason: "audio output would overwrite the input".to_string(),
            });
        }
        self.export_format().map_err(|e| LoopError::Config {
            reason: e.to_string(),
        })?;
        Ok(())
    }
}
