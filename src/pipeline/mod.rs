//! Loop-and-mux pipeline
//!
//! Wires the stages together: decode the input, build the loop, export it,
//! then hand it to a [`VideoEncoder`]. A `.wav` audio output is written
//! directly; any other extension is encoded by the [`VideoEncoder`]. Any
//! stage failing aborts the run; nothing is retried and partial outputs are
//! left where they are.

pub mod config;
pub mod encoder;
pub mod report;

use std::fs;
use std::ops::ControlFlow;
use std::path::Path;

use chrono::Utc;
use log::{info, warn};
use uuid::Uuid;

use crate::engine::{ensure_readable, export_audio, import_audio, is_wav_path};
use crate::error::Result;
use crate::looping::{plan_doublings, LoopBuilder, LoopPlan};

pub use config::PipelineConfig;
pub use encoder::{EncoderSettings, FfmpegEncoder, VideoEncoder};
pub use report::{sha256_file, RenderReport};

/// One configured run of the pipeline
pub struct Pipeline<E: VideoEncoder> {
    config: PipelineConfig,
    encoder: E,
}

impl Pipeline<FfmpegEncoder> {
    /// Pipeline that muxes with ffmpeg using the configured encoder settings
    pub fn with_ffmpeg(config: PipelineConfig) -> Self {
        let encoder = FfmpegEncoder::new(config.encoder.clone());
        Self::new(config, encoder)
    }
}

impl<E: VideoEncoder> Pipeline<E> {
    pub fn new(config: PipelineConfig, encoder: E) -> Self {
        Self { config, encoder }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// Run every stage, including the video mux when a thumbnail is set
    pub fn run(&self) -> Result<RenderReport> {
        let mut report = self.run_audio_only()?;

        if let Some(thumbnail) = &self.config.thumbnail {
            ensure_readable(thumbnail)?;
            create_parent_dir(&self.config.video_output)?;

            info!(
                "Muxing {} with {} into {}",
                report.audio_output.display(),
                thumbnail.display(),
                self.config.video_output.display()
            );
            let video =
                self.encoder
                    .mux(&report.audio_output, thumbnail, &self.config.video_output)?;
            report.video_output = Some(video);
        }

        Ok(report)
    }

    /// Decode, loop and export the audio without making a video
    pub fn run_audio_only(&self) -> Result<RenderReport> {
        self.config.validate()?;
        let spec = self.config.loop_spec()?;
        let format = self.config.export_format()?;
        let input = &self.config.input;

        info!("Loading audio file: {}", input.display());
        let source = import_audio(input)?;
        let source_ms = source.duration_ms();
        let sample_rate = source.sample_rate;
        let channels = source.channels();
        info!(
            "Original duration: {:.2}s, target {:.2}s, crossfade {:.2}s",
            source_ms as f64 / 1000.0,
            spec.target_duration_ms() as f64 / 1000.0,
            spec.crossfade_ms() as f64 / 1000.0
        );

        let audio_output = self.config.audio_output_path();
        let write_wav = is_wav_path(&audio_output);

        // Fail before hours of doubling if the result can't be written
        let predicted = plan_doublings(source_ms, &spec)?;
        if write_wav {
            let final_ms = if spec.trim() {
                spec.target_duration_ms().min(predicted.final_duration_ms())
            } else {
                predicted.final_duration_ms()
            };
            let frames = (final_ms as u128 * sample_rate as u128).div_ceil(1000);
            format.check_wav_capacity(u64::try_from(frames).unwrap_or(u64::MAX), channels)?;
        }

        let mut steps = Vec::with_capacity(predicted.doublings());
        let mut looped = LoopBuilder::new(spec).build_with(source, |step| {
            steps.push(*step);
            ControlFlow::Continue(())
        })?;
        let plan = LoopPlan {
            source_ms,
            target_ms: spec.target_duration_ms(),
            crossfade_ms: spec.crossfade_ms(),
            steps,
        };

        if spec.trim() {
            looped.truncate_ms(spec.target_duration_ms());
            info!("Trimmed loop to {}ms", looped.duration_ms());
        }

        create_parent_dir(&audio_output)?;
        info!("Exporting to: {}", audio_output.display());
        if write_wav {
            export_audio(&looped, &audio_output, format)?;
        } else {
            self.encoder.encode_audio(&looped, &audio_output)?;
        }

        Ok(RenderReport {
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            input: input.clone(),
            sample_rate,
            channels,
            spec,
            plan,
            final_duration_ms: looped.duration_ms(),
            audio_sha256: sha256_file(&audio_output)?,
            audio_output,
            video_output: None,
        })
    }
}

fn create_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            warn!("Creating missing output directory {}", parent.display());
            fs::create_dir_all(parent)?;
            Ok(())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_create_parent_dir() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a/b/out.wav");

        create_parent_dir(&nested).unwrap();
        assert!(dir.path().join("a/b").is_dir());

        // Bare file names have no directory to create
        create_parent_dir(Path::new("out.wav")).unwrap();
    }
}
