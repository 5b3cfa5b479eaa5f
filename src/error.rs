//! Error handling for seamloop
//!
//! Every error carries a stable code and, where it makes sense, a list of
//! recovery suggestions the CLI prints alongside the message.

use thiserror::Error;

/// Result type alias for seamloop operations
pub type Result<T> = std::result::Result<T, LoopError>;

/// Main error type for seamloop operations
#[derive(Error, Debug)]
pub enum LoopError {
    // Loop construction
    #[error("Invalid loop spec: {reason}")]
    InvalidLoopSpec { reason: String },

    #[error("Loop construction cancelled after {completed_steps} doubling step(s)")]
    Cancelled { completed_steps: usize },

    // File Errors
    #[error("File not found: {path}")]
    FileNotFound {
        path: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("File is empty: {path}")]
    EmptyFile { path: String },

    #[error("Invalid audio file: {reason}")]
    InvalidAudio {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Audio contains no samples")]
    EmptyAudio,

    #[error("Incompatible buffers: {reason}")]
    IncompatibleBuffers { reason: String },

    #[error("Output of {bytes} bytes exceeds the {limit} byte limit of {format}")]
    OutputTooLarge {
        bytes: u64,
        limit: u64,
        format: &'static str,
    },

    // Encoder Errors
    #[error("Encoder not found: {program}")]
    EncoderNotFound {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Encoder exited with {status}: {stderr}")]
    EncoderFailed { status: String, stderr: String },

    // Configuration Errors
    #[error("Configuration error: {reason}")]
    Config { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LoopError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            LoopError::InvalidLoopSpec { .. } => "INVALID_LOOP_SPEC",
            LoopError::Cancelled { .. } => "CANCELLED",
            LoopError::FileNotFound { .. } => "FILE_NOT_FOUND",
            LoopError::EmptyFile { .. } => "EMPTY_FILE",
            LoopError::InvalidAudio { .. } => "INVALID_AUDIO",
            LoopError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            LoopError::EmptyAudio => "EMPTY_AUDIO",
            LoopError::IncompatibleBuffers { .. } => "INCOMPATIBLE_BUFFERS",
            LoopError::OutputTooLarge { .. } => "OUTPUT_TOO_LARGE",
            LoopError::EncoderNotFound { .. } => "ENCODER_NOT_FOUND",
            LoopError::EncoderFailed { .. } => "ENCODER_FAILED",
            LoopError::Config { .. } => "CONFIG_ERROR",
            LoopError::Io(_) => "IO_ERROR",
            LoopError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if the user can fix this error by changing inputs and rerunning
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LoopError::InvalidLoopSpec { .. }
                | LoopError::FileNotFound { .. }
                | LoopError::EmptyFile { .. }
                | LoopError::EmptyAudio
                | LoopError::InvalidAudio { .. }
                | LoopError::UnsupportedFormat { .. }
                | LoopError::OutputTooLarge { .. }
                | LoopError::EncoderNotFound { .. }
                | LoopError::EncoderFailed { .. }
                | LoopError::Config { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            LoopError::InvalidLoopSpec { .. } => vec![
                "Use a crossfade shorter than the input track",
                "Use a target duration greater than zero",
            ],
            LoopError::FileNotFound { .. } => vec![
                "Check the file path is correct",
                "Verify the file hasn't been moved or deleted",
            ],
            LoopError::EmptyFile { .. } | LoopError::EmptyAudio => vec![
                "The input file has no audio data - re-export it from the source",
            ],
            LoopError::InvalidAudio { .. } => vec![
                "Check if the file plays in another application",
                "Check the file extension matches its contents",
                "Convert the file to WAV first, e.g. `ffmpeg -i song.webm song.wav`",
            ],
            LoopError::UnsupportedFormat { .. } => vec![
                "Convert to a mono or stereo WAV, MP3, AAC, FLAC or MKV file",
                "Supported WAV bit depths: 8, 16, 24, 32 (int) and 32 (float)",
            ],
            LoopError::OutputTooLarge { .. } => vec![
                "Write the loop as compressed audio, e.g. `-o looped_song.mp3`",
                "Use a shorter target duration or a lower bit depth",
            ],
            LoopError::EncoderNotFound { .. } => vec![
                "Install ffmpeg and make sure it is on PATH",
                "Point --ffmpeg at the ffmpeg binary",
            ],
            LoopError::EncoderFailed { .. } => vec![
                "Check the thumbnail is a readable image",
                "Check ffmpeg supports the output file extension",
                "Run ffmpeg by hand to see the full error output",
            ],
            LoopError::Config { .. } => vec!["Check the configuration file and command-line flags"],
            _ => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = LoopError::FileNotFound {
            path: "song.wav".to_string(),
            source: None,
        };
        assert_eq!(err.error_code(), "FILE_NOT_FOUND");

        let err = LoopError::InvalidLoopSpec {
            reason: "crossfade too long".to_string(),
        };
        assert_eq!(err.error_code(), "INVALID_LOOP_SPEC");
    }

    #[test]
    fn test_recovery_suggestions() {
        let err = LoopError::InvalidLoopSpec {
            reason: "crossfade too long".to_string(),
        };
        assert!(!err.recovery_suggestions().is_empty());
        assert!(err.is_recoverable());

        let err = LoopError::Cancelled { completed_steps: 2 };
        assert!(err.recovery_suggestions().is_empty());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_encoder_failed_display() {
        let err = LoopError::EncoderFailed {
            status: "exit status: 1".to_string(),
            stderr: "No such file".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Encoder exited with exit status: 1: No such file"
        );
    }

    #[test]
    fn test_output_too_large() {
        let err = LoopError::OutputTooLarge {
            bytes: 6_912_000_044,
            limit: 4_294_967_231,
            format: "WAV",
        };
        assert_eq!(err.error_code(), "OUTPUT_TOO_LARGE");
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("WAV"));
    }
}
