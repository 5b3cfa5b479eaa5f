//! Loop Builder
//!
//! Grows a waveform to a target duration by repeatedly joining it with a
//! copy of itself, crossfading the seam. Each step roughly doubles the
//! length, so reaching the target takes O(log(target / source)) joins
//! instead of one join per repetition of the source.
//!
//! Every step allocates a fresh buffer and drops the previous one, so peak
//! memory is the last input plus the final output (see [`LoopPlan::peak_samples`]).

use std::ops::ControlFlow;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::engine::AudioBuffer;
use crate::error::{LoopError, Result};
use crate::looping::spec::LoopSpec;

/// A waveform the loop builder can grow
///
/// Implemented by [`AudioBuffer`]. The builder relies on
/// `a.crossfade_concat(&a, x).duration_ms() == 2 * a.duration_ms() - x`
/// for any `x < a.duration_ms()`.
pub trait Loopable: Sized {
    /// Duration in whole milliseconds
    fn duration_ms(&self) -> u64;

    /// Join `other` after `self`, overlapping the last `crossfade_ms` of
    /// `self` with the first `crossfade_ms` of `other`
    fn crossfade_concat(&self, other: &Self, crossfade_ms: u64) -> Result<Self>;
}

impl Loopable for AudioBuffer {
    fn duration_ms(&self) -> u64 {
        AudioBuffer::duration_ms(self)
    }

    fn crossfade_concat(&self, other: &Self, crossfade_ms: u64) -> Result<Self> {
        AudioBuffer::crossfade_concat(self, other, crossfade_ms)
    }
}

/// One self-join of the loop under construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoublingStep {
    /// Zero-based position of this step
    pub index: usize,
    /// Duration before the join
    pub input_ms: u64,
    /// Duration after the join
    pub output_ms: u64,
}

/// The sequence of doubling steps needed to reach a target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopPlan {
    pub source_ms: u64,
    pub target_ms: u64,
    pub crossfade_ms: u64,
    pub steps: Vec<DoublingStep>,
}

impl LoopPlan {
    /// Duration of the loop once every step has run
    pub fn final_duration_ms(&self) -> u64 {
        self.steps
            .last()
            .map(|step| step.output_ms)
            .unwrap_or(self.source_ms)
    }

    pub fn doublings(&self) -> usize {
        self.steps.len()
    }

    /// How far the untrimmed loop runs past the target
    pub fn overshoot_ms(&self) -> u64 {
        self.final_duration_ms().saturating_sub(self.target_ms)
    }

    /// Largest number of samples alive at once while building
    ///
    /// During the last step both its input and its output are held in
    /// memory; with no steps only the source is.
    ///
    /// Saturates at `u64::MAX` for plans too large to ever fit in memory.
    pub fn peak_samples(&self, sample_rate: u32, channels: usize) -> u64 {
        let peak_ms = self
            .steps
            .last()
            .map(|step| step.input_ms.saturating_add(step.output_ms))
            .unwrap_or(self.source_ms);
        let samples = (peak_ms as u128 * sample_rate as u128).div_ceil(1000) * channels as u128;
        u64::try_from(samples).unwrap_or(u64::MAX)
    }
}

/// Work out the doubling steps for a source of `source_ms` without
/// touching any audio
///
/// # Example
/// ```
/// use seamloop::looping::{plan_doublings, LoopSpec};
///
/// let spec = LoopSpec::new(650_000, 5_000).unwrap();
/// let plan = plan_doublings(180_000, &spec).unwrap();
/// assert_eq!(plan.doublings(), 2);
/// assert_eq!(plan.final_duration_ms(), 705_000);
/// ```
///
/// # Errors
/// `InvalidLoopSpec` if the spec does not fit the source, or if the target
/// is so large that a step would overflow a `u64` of milliseconds.
pub fn plan_doublings(source_ms: u64, spec: &LoopSpec) -> Result<LoopPlan> {
    spec.validate_for(source_ms)?;

    let mut steps = Vec::new();
    let mut current = source_ms;
    while current < spec.target_duration_ms() {
        let next = current
            .checked_mul(2)
            .and_then(|doubled| doubled.checked_sub(spec.crossfade_ms()))
            .ok_or_else(|| LoopError::InvalidLoopSpec {
                reason: format!(
                    "target of {}ms cannot be reached without overflowing",
                    spec.target_duration_ms()
                ),
            })?;
        steps.push(DoublingStep {
            index: steps.len(),
            input_ms: current,
            output_ms: next,
        });
        current = next;
    }

    Ok(LoopPlan {
        source_ms,
        target_ms: spec.target_duration_ms(),
        crossfade_ms: spec.crossfade_ms(),
        steps,
    })
}

/// Builds crossfaded loops of at least a target duration
#[derive(Debug, Clone, Copy)]
pub struct LoopBuilder {
    spec: LoopSpec,
}

impl LoopBuilder {
    pub fn new(spec: LoopSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &LoopSpec {
        &self.spec
    }

    /// Grow `source` until it is at least the target duration
    ///
    /// A source that is already long enough is returned unchanged. The
    /// result is never trimmed; see [`LoopSpec::trim`].
    ///
    /// # Errors
    /// `InvalidLoopSpec` before any work is done if the crossfade is not
    /// shorter than the source.
    pub fn build<W: Loopable>(&self, source: W) -> Result<W> {
        self.build_with(source, |_| ControlFlow::Continue(()))
    }

    /// Like [`build`](Self::build), calling `observer` after every step
    ///
    /// Returning `ControlFlow::Break` from the observer stops the build
    /// with `LoopError::Cancelled`. The observer sees the durations the
    /// waveform actually had, which is what a run report should record.
    pub fn build_with<W, F>(&self, source: W, mut observer: F) -> Result<W>
    where
        W: Loopable,
        F: FnMut(&DoublingStep) -> ControlFlow<()>,
    {
        let source_ms = source.duration_ms();
        self.spec.validate_for(source_ms)?;

        let target_ms = self.spec.target_duration_ms();
        let crossfade_ms = self.spec.crossfade_ms();

        let mut current = source;
        let mut index = 0;
        while current.duration_ms() < target_ms {
            let input_ms = current.duration_ms();
            current = current.crossfade_concat(&current, crossfade_ms)?;

            let step = DoublingStep {
                index,
                input_ms,
                output_ms: current.duration_ms(),
            };
            debug!(
                "Doubling step {}: {}ms -> {}ms",
                step.index + 1,
                step.input_ms,
                step.output_ms
            );
            index += 1;

            if observer(&step).is_break() {
                return Err(LoopError::Cancelled {
                    completed_steps: index,
                });
            }
        }

        info!(
            "Loop built: {}ms -> {}ms in {} doubling step(s) (target {}ms)",
            source_ms,
            current.duration_ms(),
            index,
            target_ms
        );

        Ok(current)
    }
}

/// Build a loop of at least `target_duration_ms` from `source`
pub fn build_loop<W: Loopable>(source: W, target_duration_ms: u64, crossfade_ms: u64) -> Result<W> {
    LoopBuilder::new(LoopSpec::new(target_duration_ms, crossfade_ms)?).build(source)
}

// ============================================================================
// Tests
// ============================================================================
