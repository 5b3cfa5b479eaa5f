//! Loop Specification
//!
//! The immutable parameters of a loop build: how long the result must be
//! and how much of each seam is crossfaded.

use serde::{Deserialize, Serialize};

use crate::error::{LoopError, Result};

const MS_PER_SEC: u64 = 1000;

/// Target duration and crossfade length for a loop build
///
/// # Example
/// ```
/// use seamloop::looping::LoopSpec;
///
/// let spec = LoopSpec::from_secs(3600, 5).unwrap();
/// assert_eq!(spec.target_duration_ms(), 3_600_000);
/// assert!(spec.validate_for(180_000).is_ok());
/// assert!(spec.validate_for(5_000).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopSpec {
    target_duration_ms: u64,
    crossfade_ms: u64,
    /// Cut the finished loop down to exactly the target duration
    #[serde(default)]
    trim: bool,
}

impl LoopSpec {
    /// Create a spec from millisecond values
    ///
    /// # Errors
    /// `InvalidLoopSpec` if `target_duration_ms` is zero
    pub fn new(target_duration_ms: u64, crossfade_ms: u64) -> Result<Self> {
        let spec = Self {
            target_duration_ms,
            crossfade_ms,
            trim: false,
        };
        spec.check_target()?;
        Ok(spec)
    }

    /// Create a spec from whole seconds
    pub fn from_secs(target_secs: u64, crossfade_secs: u64) -> Result<Self> {
        Self::new(
            target_secs.saturating_mul(MS_PER_SEC),
            crossfade_secs.saturating_mul(MS_PER_SEC),
        )
    }

    /// Enable or disable trimming the result to the exact target
    pub fn with_trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    pub fn target_duration_ms(&self) -> u64 {
        self.target_duration_ms
    }

    pub fn crossfade_ms(&self) -> u64 {
        self.crossfade_ms
    }

    pub fn trim(&self) -> bool {
        self.trim
    }

    /// Check these parameters against a source of the given duration
    ///
    /// # Errors
    /// `InvalidLoopSpec` if the target is zero or the crossfade would
    /// consume the whole source on every doubling step.
    pub fn validate_for(&self, source_duration_ms: u64) -> Result<()> {
        self.check_target()?;

        if self.crossfade_ms >= source_duration_ms {
            return Err(LoopError::InvalidLoopSpec {
                reason: format!(
                    "crossfade ({}ms) must be shorter than the source ({}ms)",
                    self.crossfade_ms, source_duration_ms
                ),
            });
        }

        Ok(())
    }

    fn check_target(&self) -> Result<()> {
        if self.target_duration_ms == 0 {
            return Err(LoopError::InvalidLoopSpec {
                reason: "target duration must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_zero_target() {
        assert!(matches!(
            LoopSpec::new(0, 0),
            Err(LoopError::InvalidLoopSpec { .. })
        ));
    }

    #[test]
    fn test_from_secs() {
        let spec = LoopSpec::from_secs(60, 2).unwrap();
        assert_eq!(spec.target_duration_ms(), 60_000);
        assert_eq!(spec.crossfade_ms(), 2_000);
        assert!(!spec.trim());
        assert!(spec.with_trim(true).trim());
    }

    #[test]
    fn test_validate_for_crossfade_bounds() {
        let spec = LoopSpec::new(10_000, 1_000).unwrap();
        assert!(spec.validate_for(1_001).is_ok());
        assert!(spec.validate_for(1_000).is_err());
        assert!(spec.validate_for(0).is_err());
    }

    #[test]
    fn test_deserialized_zero_target_is_still_rejected() {
        let spec: LoopSpec =
            serde_json::from_str(r#"{"target_duration_ms": 0, "crossfade_ms": 0}"#).unwrap();
        assert!(matches!(
            spec.validate_for(1_000),
            Err(LoopError::InvalidLoopSpec { .. })
        ));
    }
}
