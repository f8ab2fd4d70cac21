//! Running min/max accounting over generated values and the transform that
//! normalization derives from it.

use serde::{Deserialize, Serialize};

use crate::error::{NoiseGraphError, Result};

/// Observed `(min, max)` of generated values.
///
/// The identity is `(+inf, -inf)` so merging with any real pair widens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputMinMax {
    pub min: f32,
    pub max: f32,
}

impl OutputMinMax {
    pub const EMPTY: OutputMinMax = OutputMinMax {
        min: f32::INFINITY,
        max: f32::NEG_INFINITY,
    };

    pub fn new(min: f32, max: f32) -> Self {
        OutputMinMax { min, max }
    }

    /// Bounds of a slice of values; the identity for an empty slice.
    pub fn from_values(values: &[f32]) -> Self {
        values.iter().fold(Self::EMPTY, |mut acc, &v| {
            acc.include(v);
            acc
        })
    }

    #[inline]
    pub fn include(&mut self, value: f32) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    #[inline]
    pub fn merge(&mut self, other: OutputMinMax) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    #[inline]
    pub fn merged(mut self, other: OutputMinMax) -> Self {
        self.merge(other);
        self
    }

    /// True until at least one value has been included.
    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    pub fn range(&self) -> f32 {
        self.max - self.min
    }

    /// Map `value` onto `[0, 1]` with a divide per call. Reference path for
    /// [`NormalizeTransform::apply`], which bakes the reciprocal once.
    pub fn normalize_unoptimised(&self, value: f32) -> f32 {
        let range = self.range();
        if range > 0.0 {
            (value - self.min) / range
        } else {
            0.0
        }
    }
}

impl Default for OutputMinMax {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// `(min, scale)` pair produced by the optimise stage; normalization of a
/// value is a single multiply-add.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizeTransform {
    pub min: f32,
    /// Reciprocal of the observed range, or `0.0` for a zero-width range.
    pub scale: f32,
}

impl NormalizeTransform {
    pub fn from_bounds(bounds: OutputMinMax) -> Result<Self> {
        if bounds.is_empty() {
            return Err(NoiseGraphError::EmptyBounds);
        }
        let range = bounds.range();
        let scale = if range > 0.0 { 1.0 / range } else { 0.0 };
        Ok(NormalizeTransform {
            min: bounds.min,
            scale,
        })
    }

    #[inline]
    pub fn apply(&self, value: f32) -> f32 {
        (value - self.min) * self.scale
    }

    pub fn apply_slice(&self, values: &mut [f32]) {
        for v in values.iter_mut() {
            *v = self.apply(*v);
        }
    }
}

/// Phase of a [`BoundsTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum BoundsState {
    Accumulating(OutputMinMax),
    Optimised(NormalizeTransform),
}

/// Accumulator of bounds across generation calls, convertible into a
/// [`NormalizeTransform`].
///
/// Widening is only legal while accumulating; `optimise` runs once per cycle
/// and `reset` starts the next one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundsTracker {
    state: BoundsState,
}

impl BoundsTracker {
    pub fn new() -> Self {
        BoundsTracker {
            state: BoundsState::Accumulating(OutputMinMax::EMPTY),
        }
    }

    pub fn state(&self) -> BoundsState {
        self.state
    }

    /// Accumulated bounds, or `None` once optimised.
    pub fn bounds(&self) -> Option<OutputMinMax> {
        match self.state {
            BoundsState::Accumulating(b) => Some(b),
            BoundsState::Optimised(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.state, BoundsState::Accumulating(b) if b.is_empty())
    }

    pub fn is_optimised(&self) -> bool {
        matches!(self.state, BoundsState::Optimised(_))
    }

    pub fn widen(&mut self, other: OutputMinMax) -> Result<()> {
        match &mut self.state {
            BoundsState::Accumulating(b) => {
                b.merge(other);
                Ok(())
            }
            BoundsState::Optimised(_) => Err(NoiseGraphError::BoundsAlreadyOptimised),
        }
    }

    /// Stage one of normalization. Fails on an empty tracker and on a second
    /// call without an intervening [`reset`](Self::reset); the tracker is left
    /// untouched on failure.
    pub fn optimise(&mut self) -> Result<NormalizeTransform> {
        match self.state {
            BoundsState::Accumulating(b) => {
                let transform = NormalizeTransform::from_bounds(b)?;
                self.state = BoundsState::Optimised(transform);
                Ok(transform)
            }
            BoundsState::Optimised(_) => Err(NoiseGraphError::BoundsAlreadyOptimised),
        }
    }

    pub fn transform(&self) -> Result<NormalizeTransform> {
        match self.state {
            BoundsState::Optimised(t) => Ok(t),
            BoundsState::Accumulating(_) => Err(NoiseGraphError::BoundsNotOptimised),
        }
    }

    pub fn reset(&mut self) {
        self.state = BoundsState::Accumulating(OutputMinMax::EMPTY);
    }
}

impl Default for BoundsTracker {
    fn default() -> Self {
        Self::new()
    }
}
