//! CLI Module
//!
//! Command-line interface for seamloop.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Seamloop - loop a track to length with crossfaded seams and turn it into a video
#[derive(Parser, Debug)]
#[command(name = "seamloop")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Loop an audio file to a target duration (no video)
    #[command(name = "loop")]
    Loop {
        /// Input audio file (WAV, MP3, MKV, ...)
        input: PathBuf,

        /// Output file (default: looped_<input> next to the input). Anything
        /// but .wav is compressed with ffmpeg
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Target duration in seconds
        #[arg(short, long, default_value_t = 3600)]
        duration: u64,

        /// Crossfade between loops in seconds
        #[arg(short, long, default_value_t = 5)]
        crossfade: u64,

        /// Cut the result to exactly the target duration
        #[arg(long)]
        trim: bool,

        /// Bit depth when writing WAV (16, 24 or 32)
        #[arg(long, default_value_t = 16)]
        bit_depth: u16,

        /// Path to the ffmpeg binary used for compressed output
        #[arg(long)]
        ffmpeg: Option<PathBuf>,
    },

    /// Loop an audio file and mux it with a still image into a video
    #[command(name = "render")]
    Render {
        /// JSON configuration file; flags override its values
        #[arg(long)]
        config: Option<PathBuf>,

        /// Input audio file (WAV, MP3, MKV, ...)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Still image shown for the whole video
        #[arg(short, long)]
        thumbnail: Option<PathBuf>,

        /// Where to write the looped audio
        #[arg(long)]
        audio_output: Option<PathBuf>,

        /// Where to write the video
        #[arg(long)]
        video_output: Option<PathBuf>,

        /// Target duration in seconds
        #[arg(short, long)]
        duration: Option<u64>,

        /// Crossfade between loops in seconds
        #[arg(short, long)]
        crossfade: Option<u64>,

        /// Cut the result to exactly the target duration
        #[arg(long)]
        trim: bool,

        /// Path to the ffmpeg binary
        #[arg(long)]
        ffmpeg: Option<PathBuf>,

        /// Write a JSON run report here
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Show the doubling steps for an input without processing audio
    #[command(name = "plan")]
    Plan {
        /// Input audio file
        input: PathBuf,

        /// Target duration in seconds
        #[arg(short, long, default_value_t = 3600)]
        duration: u64,

        /// Crossfade between loops in seconds
        #[arg(short, long, default_value_t = 5)]
        crossfade: u64,
    },
}

/// Flag values for `render`, applied on top of a loaded or default config
#[derive(Debug, Default)]
pub struct RenderOverrides {
    pub input: Option<PathBuf>,
    pub thumbnail: Option<PathBuf>,
    pub audio_output: Option<PathBuf>,
    pub video_output: Option<PathBuf>,
    pub duration: Option<u64>,
    pub crossfade: Option<u64>,
    pub trim: bool,
    pub ffmpeg: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_loop_defaults() {
        let cli = Cli::parse_from(["seamloop", "loop", "song.mp3"]);
        match cli.command {
            Some(Commands::Loop {
                input,
                output,
                duration,
                crossfade,
                trim,
                bit_depth,
                ffmpeg,
            }) => {
                assert_eq!(input, PathBuf::from("song.mp3"));
                assert_eq!(output, None);
                assert_eq!(duration, 3600);
                assert_eq!(crossfade, 5);
                assert!(!trim);
                assert_eq!(bit_depth, 16);
                assert_eq!(ffmpeg, None);
            }
            other => panic!("Expected loop command, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_render_flags() {
        let cli = Cli::parse_from([
            "seamloop",
            "-v",
            "render",
            "--input",
            "rain.wav",
            "-t",
            "cover.png",
            "-d",
            "600",
            "--trim",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Some(Commands::Render {
                input,
                thumbnail,
                duration,
                crossfade,
                trim,
                ..
            }) => {
                assert_eq!(input, Some(PathBuf::from("rain.wav")));
                assert_eq!(thumbnail, Some(PathBuf::from("cover.png")));
                assert_eq!(duration, Some(600));
                assert_eq!(crossfade, None);
                assert!(trim);
            }
            other => panic!("Expected render command, got {:?}", other),
        }
    }
}
