//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::{Path, PathBuf};

use log::info;

use crate::cli::RenderOverrides;
use crate::engine::read_audio_info;
use crate::error::Result;
use crate::looping::{plan_doublings, LoopSpec};
use crate::pipeline::{Pipeline, PipelineConfig, RenderReport};

/// Loop an audio file without producing a video.
pub fn loop_audio(
    input: &Path,
    output: Option<&Path>,
    duration_secs: u64,
    crossfade_secs: u64,
    trim: bool,
    bit_depth: u16,
    ffmpeg: Option<&Path>,
) -> Result<()> {
    info!("Looping {} to {}s", input.display(), duration_secs);

    let mut config = PipelineConfig {
        input: input.to_path_buf(),
        audio_output: output.map(Path::to_path_buf),
        thumbnail: None,
        target_duration_secs: duration_secs,
        crossfade_secs,
        trim,
        bit_depth,
        ..PipelineConfig::default()
    };
    if let Some(ffmpeg) = ffmpeg {
        config.encoder.program = ffmpeg.to_path_buf();
    }

    let report = Pipeline::with_ffmpeg(config).run_audio_only()?;
    print_summary(&report);

    Ok(())
}

/// Build the effective configuration for `render`.
pub fn render_config(config_path: Option<&Path>, overrides: RenderOverrides) -> Result<PipelineConfig> {
    let mut config = match config_path {
        Some(path) => {
            info!("Loading configuration: {}", path.display());
            PipelineConfig::load(path)?
        }
        None => PipelineConfig::default(),
    };

    if let Some(input) = overrides.input {
        config.input = input;
    }
    if let Some(thumbnail) = overrides.thumbnail {
        config.thumbnail = Some(thumbnail);
    }
    if let Some(audio_output) = overrides.audio_output {
        config.audio_output = Some(audio_output);
    }
    if let Some(video_output) = overrides.video_output {
        config.video_output = video_output;
    }
    if let Some(duration) = overrides.duration {
        config.target_duration_secs = duration;
    }
    if let Some(crossfade) = overrides.crossfade {
        config.crossfade_secs = crossfade;
    }
    if overrides.trim {
        config.trim = true;
    }
    if let Some(ffmpeg) = overrides.ffmpeg {
        config.encoder.program = ffmpeg;
    }

    Ok(config)
}

/// Loop the audio and mux it with the thumbnail into a video.
pub fn render(
    config_path: Option<&Path>,
    overrides: RenderOverrides,
    report_path: Option<PathBuf>,
) -> Result<()> {
    let config = render_config(config_path, overrides)?;
    let report = Pipeline::with_ffmpeg(config).run()?;

    print_summary(&report);
    if let Some(video) = &report.video_output {
        println!("Video: {}", video.display());
    }

    if let Some(path) = report_path {
        report.save(&path)?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}

/// Print the doubling steps an input would go through.
pub fn show_plan(input: &Path, duration_secs: u64, crossfade_secs: u64) -> Result<()> {
    let info = read_audio_info(input)?;
    let spec = LoopSpec::from_secs(duration_secs, crossfade_secs)?;
    let plan = plan_doublings(info.duration_ms(), &spec)?;

    println!(
        "{}: {} Hz, {} channel(s), {}",
        input.display(),
        info.sample_rate,
        info.channels,
        format_ms(plan.source_ms)
    );
    println!("{:-<60}", "");

    if plan.steps.is_empty() {
        println!("Source already reaches the target; no doubling needed.");
    }
    for step in &plan.steps {
        println!(
            "  step {:>2}: {:>12} -> {:>12}",
            step.index + 1,
            format_ms(step.input_ms),
            format_ms(step.output_ms)
        );
    }

    println!("{:-<60}", "");
    println!(
        "Final: {} (target {}, overshoot {})",
        format_ms(plan.final_duration_ms()),
        format_ms(plan.target_ms),
        format_ms(plan.overshoot_ms())
    );

    let peak_bytes = plan
        .peak_samples(info.sample_rate, info.channels as usize)
        .saturating_mul(std::mem::size_of::<f32>() as u64);
    println!(
        "Peak memory while building: ~{:.1} MiB",
        peak_bytes as f64 / (1024.0 * 1024.0)
    );

    Ok(())
}

fn print_summary(report: &RenderReport) {
    println!(
        "Looped {} -> {} in {} doubling step(s)",
        format_ms(report.plan.source_ms),
        format_ms(report.final_duration_ms),
        report.plan.doublings()
    );
    println!("Audio: {}", report.audio_output.display());
    println!("SHA-256: {}", report.audio_sha256);
}

/// Format milliseconds as `H:MM:SS.mmm`
pub fn format_ms(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms / 60_000) % 60;
    let seconds = (ms / 1000) % 60;
    format!("{}:{:02}:{:02}.{:03}", hours, minutes, seconds, ms % 1000)
}
