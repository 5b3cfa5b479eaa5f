//! Pipeline Tests
//!
//! End-to-end runs of the loop pipeline against real WAV files, with the
//! video encoder replaced by an in-process fake.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use tempfile::{tempdir, TempDir};

use seamloop::engine::{
    export_audio, generate_test_tone, import_audio, AudioBuffer, ChannelLayout, ExportFormat,
};
use seamloop::pipeline::{sha256_file, Pipeline, PipelineConfig, VideoEncoder};
use seamloop::{LoopError, Result};

/// Records every request and writes placeholder files
#[derive(Default)]
struct FakeEncoder {
    calls: RefCell<Vec<(PathBuf, PathBuf, PathBuf)>>,
    encoded: RefCell<Vec<(PathBuf, u64)>>,
    fail: bool,
}

impl VideoEncoder for FakeEncoder {
    fn mux(&self, audio: &Path, image: &Path, output: &Path) -> Result<PathBuf> {
        self.calls.borrow_mut().push((
            audio.to_path_buf(),
            image.to_path_buf(),
            output.to_path_buf(),
        ));
        if self.fail {
            return Err(LoopError::EncoderFailed {
                status: "exit status: 1".to_string(),
                stderr: "Invalid data found when processing input".to_string(),
            });
        }
        fs::write(output, b"video")?;
        Ok(output.to_path_buf())
    }

    fn encode_audio(&self, audio: &AudioBuffer, output: &Path) -> Result<PathBuf> {
        self.encoded
            .borrow_mut()
            .push((output.to_path_buf(), audio.duration_ms()));
        fs::write(output, b"compressed audio")?;
        Ok(output.to_path_buf())
    }
}

/// Write a 3 second mono tone at 8kHz and a thumbnail into a temp dir
fn fixture() -> (TempDir, PipelineConfig) {
    let dir = tempdir().unwrap();
    let input = dir.path().join("song.wav");
    let thumbnail = dir.path().join("thumbnail.jpg");

    let tone = generate_test_tone(220.0, 3.0, 8000);
    export_audio(&tone, &input, ExportFormat::default()).unwrap();
    fs::write(&thumbnail, b"not really a jpeg").unwrap();

    let config = PipelineConfig {
        input,
        thumbnail: Some(thumbnail),
        video_output: dir.path().join("output_video.mp4"),
        target_duration_secs: 10,
        crossfade_secs: 1,
        ..PipelineConfig::default()
    };
    (dir, config)
}

// === Audio stage ===

#[test]
fn test_audio_only_run_overshoots_target() {
    let (dir, config) = fixture();
    let report = Pipeline::new(config, FakeEncoder::default())
        .run_audio_only()
        .unwrap();

    // 3s -> 5s -> 9s -> 17s
    assert_eq!(report.plan.doublings(), 3);
    assert_eq!(report.final_duration_ms, 17_000);
    assert_eq!(report.audio_output, dir.path().join("looped_song.wav"));
    assert_eq!(report.video_output, None);

    let looped = import_audio(&report.audio_output).unwrap();
    assert_eq!(looped.duration_ms(), 17_000);
    assert_eq!(looped.sample_rate, 8000);
    assert_eq!(sha256_file(&report.audio_output).unwrap(), report.audio_sha256);
}

#[test]
fn test_trim_cuts_to_exact_target() {
    let (_dir, config) = fixture();
    let config = PipelineConfig {
        trim: true,
        ..config
    };
    let report = Pipeline::new(config, FakeEncoder::default())
        .run_audio_only()
        .unwrap();

    assert_eq!(report.plan.final_duration_ms(), 17_000);
    assert_eq!(report.final_duration_ms, 10_000);
    assert_eq!(import_audio(&report.audio_output).unwrap().len(), 80_000);
}

#[test]
fn test_loop_does_not_raise_peak_level() {
    let (_dir, config) = fixture();
    let source = import_audio(&config.input).unwrap();
    let report = Pipeline::new(config, FakeEncoder::default())
        .run_audio_only()
        .unwrap();

    let looped = import_audio(&report.audio_output).unwrap();
    assert!(looped.peak() <= source.peak() + 1e-4);
}

#[test]
fn test_missing_output_directory_is_created() {
    let (dir, config) = fixture();
    let audio_output = dir.path().join("renders/2026/long.wav");
    let config = PipelineConfig {
        audio_output: Some(audio_output.clone()),
        ..config
    };

    Pipeline::new(config, FakeEncoder::default())
        .run_audio_only()
        .unwrap();
    assert!(audio_output.is_file());
}

#[test]
fn test_source_longer_than_target_is_exported_as_is() {
    let (_dir, config) = fixture();
    let config = PipelineConfig {
        target_duration_secs: 2,
        ..config
    };
    let report = Pipeline::new(config, FakeEncoder::default())
        .run_audio_only()
        .unwrap();

    assert_eq!(report.plan.doublings(), 0);
    assert_eq!(report.final_duration_ms, 3_000);
}

#[test]
fn test_report_records_steps_that_ran() {
    let (dir, config) = fixture();
    // 2000ms plus 7 frames at 44.1kHz
    let input = dir.path().join("uneven.wav");
    let mut source = AudioBuffer::new(44_100 * 2 + 7, ChannelLayout::Mono, 44_100);
    for (i, s) in source.channel_mut(0).iter_mut().enumerate() {
        *s = ((i % 441) as f32 / 441.0) - 0.5;
    }
    export_audio(&source, &input, ExportFormat::default()).unwrap();

    let config = PipelineConfig {
        input,
        target_duration_secs: 5,
        crossfade_secs: 1,
        ..config
    };
    let report = Pipeline::new(config, FakeEncoder::default())
        .run_audio_only()
        .unwrap();

    let durations: Vec<(u64, u64)> = report
        .plan
        .steps
        .iter()
        .map(|step| (step.input_ms, step.output_ms))
        .collect();
    assert_eq!(durations, vec![(2_000, 3_000), (3_000, 5_000)]);
    assert_eq!(report.final_duration_ms, 5_000);
    assert_eq!(import_audio(&report.audio_output).unwrap().duration_ms(), 5_000);
}

#[test]
fn test_compressed_output_goes_through_encoder() {
    let (dir, config) = fixture();
    let audio_output = dir.path().join("looped_song.mp3");
    let config = PipelineConfig {
        audio_output: Some(audio_output.clone()),
        ..config
    };
    let pipeline = Pipeline::new(config, FakeEncoder::default());
    let report = pipeline.run().unwrap();

    assert_eq!(
        pipeline.encoder().encoded.borrow().clone(),
        vec![(audio_output.clone(), 17_000)]
    );
    assert_eq!(report.audio_output, audio_output);
    assert_eq!(sha256_file(&audio_output).unwrap(), report.audio_sha256);
    assert_eq!(pipeline_calls(&pipeline)[0].0, audio_output);
}

#[test]
fn test_wav_output_is_written_directly() {
    let (_dir, config) = fixture();
    let pipeline = Pipeline::new(config, FakeEncoder::default());
    pipeline.run_audio_only().unwrap();

    assert!(pipeline.encoder().encoded.borrow().is_empty());
}

// === Failure handling ===

#[test]
fn test_wav_too_large_fails_before_building() {
    let (dir, config) = fixture();
    // 100 hours of 8kHz mono 16-bit is ~5.8GB
    let config = PipelineConfig {
        target_duration_secs: 100 * 3600,
        ..config
    };

    let err = Pipeline::new(config, FakeEncoder::default())
        .run_audio_only()
        .unwrap_err();
    assert_eq!(err.error_code(), "OUTPUT_TOO_LARGE");
    assert!(!dir.path().join("looped_song.wav").exists());
}

#[test]
fn test_unreachable_target_is_invalid_spec() {
    let (_dir, config) = fixture();
    let config = PipelineConfig {
        target_duration_secs: u64::MAX / 1000,
        ..config
    };

    let err = Pipeline::new(config, FakeEncoder::default())
        .run_audio_only()
        .unwrap_err();
    assert!(matches!(err, LoopError::InvalidLoopSpec { .. }));
}

#[test]
fn test_crossfade_as_long_as_source_fails_before_export() {
    let (dir, config) = fixture();
    let config = PipelineConfig {
        crossfade_secs: 3,
        ..config
    };
    let encoder = FakeEncoder::default();
    let err = Pipeline::new(config, encoder).run().unwrap_err();

    assert!(matches!(err, LoopError::InvalidLoopSpec { .. }));
    assert!(!dir.path().join("looped_song.wav").exists());
}

#[test]
fn test_missing_input_is_file_not_found() {
    let (dir, config) = fixture();
    let config = PipelineConfig {
        input: dir.path().join("missing.wav"),
        ..config
    };

    let err = Pipeline::new(config, FakeEncoder::default())
        .run()
        .unwrap_err();
    assert_eq!(err.error_code(), "FILE_NOT_FOUND");
}

// === Video stage ===

#[test]
fn test_full_run_muxes_once() {
    let (dir, config) = fixture();
    let pipeline = Pipeline::new(config, FakeEncoder::default());
    let report = pipeline.run().unwrap();

    let video = dir.path().join("output_video.mp4");
    assert_eq!(report.video_output, Some(video.clone()));
    assert!(video.is_file());

    let calls = pipeline_calls(&pipeline);
    assert_eq!(
        calls,
        vec![(
            dir.path().join("looped_song.wav"),
            dir.path().join("thumbnail.jpg"),
            video,
        )]
    );
}

#[test]
fn test_missing_thumbnail_aborts_before_mux() {
    let (dir, config) = fixture();
    let config = PipelineConfig {
        thumbnail: Some(dir.path().join("missing.jpg")),
        ..config
    };
    let pipeline = Pipeline::new(config, FakeEncoder::default());

    let err = pipeline.run().unwrap_err();
    assert!(matches!(err, LoopError::FileNotFound { .. }));
    assert!(pipeline_calls(&pipeline).is_empty());
    // No cleanup: the audio stage already finished
    assert!(dir.path().join("looped_song.wav").is_file());
}

#[test]
fn test_encoder_failure_propagates() {
    let (_dir, config) = fixture();
    let encoder = FakeEncoder {
        fail: true,
        ..FakeEncoder::default()
    };

    let err = Pipeline::new(config, encoder).run().unwrap_err();
    assert!(matches!(err, LoopError::EncoderFailed { .. }));
}

#[test]
fn test_report_is_saved() {
    let (dir, config) = fixture();
    let report = Pipeline::new(config, FakeEncoder::default()).run().unwrap();

    let path = dir.path().join("report.json");
    report.save(&path).unwrap();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["final_duration_ms"].as_u64(), Some(17_000));
    assert_eq!(json["plan"]["steps"].as_array().map(Vec::len), Some(3));
}

fn pipeline_calls(pipeline: &Pipeline<FakeEncoder>) -> Vec<(PathBuf, PathBuf, PathBuf)> {
    pipeline.encoder().calls.borrow().clone()
}
