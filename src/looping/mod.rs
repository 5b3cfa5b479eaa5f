//! Loop construction
//!
//! [`LoopBuilder`] turns one waveform into a crossfaded loop of at least a
//! target duration using repeated self-joins. [`LoopSpec`] holds the
//! parameters; [`plan_doublings`] predicts the steps without any audio.

pub mod builder;
pub mod spec;

pub use builder::{build_loop, plan_doublings, DoublingStep, LoopBuilder, LoopPlan, Loopable};
pub use spec::LoopSpec;
