//! Field generation requests issued against a node handle.
//!
//! The engine only owns buffer shape, bounds accounting and error
//! surfacing; the values themselves come from the backend. Frequency and seed
//! are forwarded untouched.

use log::trace;
use serde::{Deserialize, Serialize};

use crate::bounds::{BoundsTracker, OutputMinMax};
use crate::error::{NoiseGraphError, Result};
use crate::handle::NodeHandle;

/// Shape of a dense generation request. Grids are row-major with the first
/// axis varying fastest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    #[serde(rename = "grid_2d")]
    Grid2D {
        start: [i32; 2],
        size: [usize; 2],
        frequency: f32,
    },
    #[serde(rename = "grid_3d")]
    Grid3D {
        start: [i32; 3],
        size: [usize; 3],
        frequency: f32,
    },
    #[serde(rename = "grid_4d")]
    Grid4D {
        start: [i32; 4],
        size: [usize; 4],
        frequency: f32,
    },
    /// 2D grid that wraps seamlessly at its own edges.
    #[serde(rename = "tileable_2d")]
    Tileable2D { size: [usize; 2], frequency: f32 },
}

impl Geometry {
    pub fn size(&self) -> &[usize] {
        match self {
            Geometry::Grid2D { size, .. } => size,
            Geometry::Grid3D { size, .. } => size,
            Geometry::Grid4D { size, .. } => size,
            Geometry::Tileable2D { size, .. } => size,
        }
    }

    /// Number of output elements, failing when the product overflows.
    pub fn element_count(&self) -> Result<usize> {
        extent_len(self.size())
    }

    fn label(&self) -> &'static str {
        match self {
            Geometry::Grid2D { .. } => "uniform grid 2D",
            Geometry::Grid3D { .. } => "uniform grid 3D",
            Geometry::Grid4D { .. } => "uniform grid 4D",
            Geometry::Tileable2D { .. } => "tileable 2D",
        }
    }
}

pub(crate) fn extent_len(size: &[usize]) -> Result<usize> {
    size.iter()
        .try_fold(1usize, |acc, &s| acc.checked_mul(s))
        .ok_or(NoiseGraphError::ExtentOverflow)
}

fn check_buffer(expected: usize, out: &[f32]) -> Result<()> {
    if out.len() != expected {
        return Err(NoiseGraphError::BufferLength {
            expected,
            actual: out.len(),
        });
    }
    Ok(())
}

fn check_dimension(dims: usize) -> Result<()> {
    if (2..=4).contains(&dims) {
        Ok(())
    } else {
        Err(NoiseGraphError::UnsupportedDimension(dims))
    }
}

impl NodeHandle {
    /// Fill `out` according to `geometry` and return the bounds of the values
    /// written.
    ///
    /// A zero-sized axis requires an empty `out`, skips the backend and
    /// returns [`OutputMinMax::EMPTY`].
    pub fn generate(&self, geometry: &Geometry, seed: i32, out: &mut [f32]) -> Result<OutputMinMax> {
        let (raw, _, ctx) = self.live()?;
        let expected = geometry.element_count()?;
        check_buffer(expected, out)?;
        if expected == 0 {
            return Ok(OutputMinMax::EMPTY);
        }

        trace!("generating {} ({} elements, seed {seed})", geometry.label(), expected);
        let backend = ctx.backend();
        let mut bounds = OutputMinMax::EMPTY;
        let outcome = match *geometry {
            Geometry::Grid2D {
                start,
                size,
                frequency,
            } => backend.gen_uniform_grid(raw, out, &start, &size, frequency, seed, &mut bounds),
            Geometry::Grid3D {
                start,
                size,
                frequency,
            } => backend.gen_uniform_grid(raw, out, &start, &size, frequency, seed, &mut bounds),
            Geometry::Grid4D {
                start,
                size,
                frequency,
            } => backend.gen_uniform_grid(raw, out, &start, &size, frequency, seed, &mut bounds),
            Geometry::Tileable2D { size, frequency } => {
                backend.gen_tileable_2d(raw, out, size, frequency, seed, &mut bounds)
            }
        };
        outcome.map_err(|fault| fault.into_error(geometry.label()))?;
        Ok(bounds)
    }

    /// Like [`generate`](Self::generate) but widens `tracker` in place, so
    /// repeated calls accumulate bounds across regions.
    pub fn generate_tracked(
        &self,
        geometry: &Geometry,
        seed: i32,
        out: &mut [f32],
        tracker: &mut BoundsTracker,
    ) -> Result<OutputMinMax> {
        if tracker.is_optimised() {
            return Err(NoiseGraphError::BoundsAlreadyOptimised);
        }
        let bounds = self.generate(geometry, seed, out)?;
        tracker.widen(bounds)?;
        Ok(bounds)
    }

    /// Sample at scattered positions: coordinate `d` of sample `i` is
    /// `axes[d][i] + offset[d]`. No frequency is applied.
    pub fn gen_positions(
        &self,
        axes: &[&[f32]],
        offset: &[f32],
        seed: i32,
        out: &mut [f32],
    ) -> Result<OutputMinMax> {
        let (raw, _, ctx) = self.live()?;
        check_dimension(axes.len())?;
        if offset.len() != axes.len() {
            return Err(NoiseGraphError::OffsetLength {
                axes: axes.len(),
                actual: offset.len(),
            });
        }
        for (axis, coords) in axes.iter().enumerate() {
            if coords.len() != out.len() {
                return Err(NoiseGraphError::PositionArrayLength {
                    axis,
                    expected: out.len(),
                    actual: coords.len(),
                });
            }
        }
        if out.is_empty() {
            return Ok(OutputMinMax::EMPTY);
        }

        trace!("generating {}D position array ({} samples, seed {seed})", axes.len(), out.len());
        let mut bounds = OutputMinMax::EMPTY;
        ctx.backend()
            .gen_position_array(raw, out, axes, offset, seed, &mut bounds)
            .map_err(|fault| fault.into_error(format!("position array {}D", axes.len())))?;
        Ok(bounds)
    }

    pub fn gen_positions_tracked(
        &self,
        axes: &[&[f32]],
        offset: &[f32],
        seed: i32,
        out: &mut [f32],
        tracker: &mut BoundsTracker,
    ) -> Result<OutputMinMax> {
        if tracker.is_optimised() {
            return Err(NoiseGraphError::BoundsAlreadyOptimised);
        }
        let bounds = self.gen_positions(axes, offset, seed, out)?;
        tracker.widen(bounds)?;
        Ok(bounds)
    }

    /// Evaluate one sample. Has no bounds side effect.
    pub fn gen_single(&self, position: &[f32], seed: i32) -> Result<f32> {
        let (raw, _, ctx) = self.live()?;
        check_dimension(position.len())?;
        ctx.backend()
            .gen_single(raw, position, seed)
            .map_err(|fault| fault.into_error(format!("single sample {}D", position.len())))
    }

    pub fn gen_uniform_grid_2d(
        &self,
        out: &mut [f32],
        start: [i32; 2],
        size: [usize; 2],
        frequency: f32,
        seed: i32,
    ) -> Result<OutputMinMax> {
        self.generate(&Geometry::Grid2D { start, size, frequency }, seed, out)
    }

    pub fn gen_uniform_grid_3d(
        &self,
        out: &mut [f32],
        start: [i32; 3],
        size: [usize; 3],
        frequency: f32,
        seed: i32,
    ) -> Result<OutputMinMax> {
        self.generate(&Geometry::Grid3D { start, size, frequency }, seed, out)
    }

    pub fn gen_uniform_grid_4d(
        &self,
        out: &mut [f32],
        start: [i32; 4],
        size: [usize; 4],
        frequency: f32,
        seed: i32,
    ) -> Result<OutputMinMax> {
        self.generate(&Geometry::Grid4D { start, size, frequency }, seed, out)
    }

    pub fn gen_tileable_2d(
        &self,
        out: &mut [f32],
        size: [usize; 2],
        frequency: f32,
        seed: i32,
    ) -> Result<OutputMinMax> {
        self.generate(&Geometry::Tileable2D { size, frequency }, seed, out)
    }

    pub fn gen_position_array_2d(
        &self,
        out: &mut [f32],
        axes: [&[f32]; 2],
        offset: [f32; 2],
        seed: i32,
    ) -> Result<OutputMinMax> {
        self.gen_positions(&axes, &offset, seed, out)
    }

    pub fn gen_position_array_3d(
        &self,
        out: &mut [f32],
        axes: [&[f32]; 3],
        offset: [f32; 3],
        seed: i32,
    ) -> Result<OutputMinMax> {
        self.gen_positions(&axes, &offset, seed, out)
    }

    pub fn gen_position_array_4d(
        &self,
        out: &mut [f32],
        axes: [&[f32]; 4],
        offset: [f32; 4],
        seed: i32,
    ) -> Result<OutputMinMax> {
        self.gen_positions(&axes, &offset, seed, out)
    }

    pub fn gen_single_2d(&self, x: f32, y: f32, seed: i32) -> Result<f32> {
        self.gen_single(&[x, y], seed)
    }

    pub fn gen_single_3d(&self, x: f32, y: f32, z: f32, seed: i32) -> Result<f32> {
        self.gen_single(&[x, y, z], seed)
    }

    pub fn gen_single_4d(&self, x: f32, y: f32, z: f32, w: f32, seed: i32) -> Result<f32> {
        self.gen_single(&[x, y, z, w], seed)
    }
}
