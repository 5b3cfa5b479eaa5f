//! Seamloop - Crossfaded Audio Loops
//!
//! Turns one audio track into a long, seamless loop and muxes it against a
//! still image into a video.
//!
//! # Architecture
//!
//! The run is a straight pipeline:
//! - `engine`: decode the WAV input into an in-memory buffer
//! - `looping`: grow the buffer to the target duration by crossfaded self-joins
//! - `engine`: export the loop back to WAV
//! - `pipeline`: hand the audio and a thumbnail to an external video encoder

pub mod cli;
pub mod engine;
pub mod error;
pub mod looping;
pub mod pipeline;

pub use error::{LoopError, Result};
