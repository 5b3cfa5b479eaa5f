//! Seamloop CLI
//!
//! Command-line interface for building crossfaded loops and loop videos.

use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;
use log::info;

use seamloop::cli::{commands, Cli, Commands, RenderOverrides};
use seamloop::Result;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    info!("Seamloop v{}", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Some(cmd) => handle_command(cmd),
        None => {
            println!("Seamloop v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error [{}]: {}", e.error_code(), e);
            if e.is_recoverable() {
                for suggestion in e.recovery_suggestions() {
                    eprintln!("  - {}", suggestion);
                }
            }
            ExitCode::FAILURE
        }
    }
}

fn handle_command(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Loop {
            input,
            output,
            duration,
            crossfade,
            trim,
            bit_depth,
            ffmpeg,
        } => commands::loop_audio(
            &input,
            output.as_deref(),
            duration,
            crossfade,
            trim,
            bit_depth,
            ffmpeg.as_deref(),
        ),
        Commands::Render {
            config,
            input,
            thumbnail,
            audio_output,
            video_output,
            duration,
            crossfade,
            trim,
            ffmpeg,
            report,
        } => {
            let overrides = RenderOverrides {
                input,
                thumbnail,
                audio_output,
                video_output,
                duration,
                crossfade,
                trim,
                ffmpeg,
            };
            commands::render(config.as_deref(), overrides, report)
        }
        Commands::Plan {
            input,
            duration,
            crossfade,
        } => commands::show_plan(&input, duration, crossfade),
    }
}
