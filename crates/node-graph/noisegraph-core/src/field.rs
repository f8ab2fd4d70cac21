//! Owned dense fields that carry their own bounds tracker.

use rayon::prelude::*;

use crate::bounds::{BoundsTracker, OutputMinMax};
use crate::error::{NoiseGraphError, Result};
use crate::generate::{extent_len, Geometry};
use crate::handle::NodeHandle;

/// Row-major buffer of `D`-dimensional samples. Axis 0 varies fastest.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldBuffer<const D: usize> {
    resolution: [usize; D],
    data: Vec<f32>,
    bounds: BoundsTracker,
}

pub type Field2D = FieldBuffer<2>;
pub type Field3D = FieldBuffer<3>;
pub type Field4D = FieldBuffer<4>;

impl<const D: usize> FieldBuffer<D> {
    /// Zero-filled field. Fails when the element count overflows.
    pub fn new(resolution: [usize; D]) -> Result<Self> {
        let len = extent_len(&resolution)?;
        Ok(FieldBuffer {
            resolution,
            data: vec![0.0; len],
            bounds: BoundsTracker::new(),
        })
    }

    pub fn from_data(resolution: [usize; D], data: Vec<f32>) -> Result<Self> {
        let expected = extent_len(&resolution)?;
        if data.len() != expected {
            return Err(NoiseGraphError::BufferLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(FieldBuffer {
            resolution,
            data,
            bounds: BoundsTracker::new(),
        })
    }

    pub fn resolution(&self) -> [usize; D] {
        self.resolution
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    pub fn bounds(&self) -> &BoundsTracker {
        &self.bounds
    }

    pub fn bounds_mut(&mut self) -> &mut BoundsTracker {
        &mut self.bounds
    }

    /// Split borrow used by the generation and normalize paths.
    pub fn parts_mut(&mut self) -> (&mut [f32], &mut BoundsTracker) {
        (&mut self.data, &mut self.bounds)
    }

    pub fn index_of(&self, coord: [usize; D]) -> Option<usize> {
        let mut index = 0usize;
        let mut stride = 1usize;
        for (c, extent) in coord.iter().zip(self.resolution.iter()) {
            if c >= extent {
                return None;
            }
            index += c * stride;
            stride *= extent;
        }
        Some(index)
    }

    pub fn coord_of(&self, index: usize) -> Option<[usize; D]> {
        if index >= self.data.len() {
            return None;
        }
        let mut coord = [0usize; D];
        let mut rest = index;
        for (slot, extent) in coord.iter_mut().zip(self.resolution.iter()) {
            *slot = rest % extent;
            rest /= extent;
        }
        Some(coord)
    }

    pub fn get(&self, coord: [usize; D]) -> Option<f32> {
        self.index_of(coord).map(|i| self.data[i])
    }

    /// Returns `false` when `coord` lies outside the field.
    pub fn set(&mut self, coord: [usize; D], value: f32) -> bool {
        match self.index_of(coord) {
            Some(i) => {
                self.data[i] = value;
                true
            }
            None => false,
        }
    }

    /// Run the optimise stage on this field's tracker without rewriting the
    /// data, so values can be read normalized on demand.
    pub fn optimise_bounds(&mut self) -> Result<()> {
        self.bounds.optimise().map(|_| ())
    }

    /// Sample at `coord` mapped through the optimised transform. `None` when
    /// `coord` is outside the field.
    pub fn read_normalized(&self, coord: [usize; D]) -> Result<Option<f32>> {
        let transform = self.bounds.transform()?;
        Ok(self.get(coord).map(|v| transform.apply(v)))
    }
}

impl FieldBuffer<2> {
    pub fn width(&self) -> usize {
        self.resolution[0]
    }

    pub fn height(&self) -> usize {
        self.resolution[1]
    }

    /// Nearest sample for texture coordinates in `[0, 1]`; out-of-range
    /// coordinates clamp to the edge.
    pub fn sample_nearest(&self, u: f32, v: f32) -> Option<f32> {
        if self.is_empty() {
            return None;
        }
        let x = texel(u, self.width()).round() as usize;
        let y = texel(v, self.height()).round() as usize;
        self.get([x, y])
    }

    /// Bilinear sample for texture coordinates in `[0, 1]`, clamped to edges.
    pub fn sample_bilinear(&self, u: f32, v: f32) -> Option<f32> {
        if self.is_empty() {
            return None;
        }
        let fx = texel(u, self.width());
        let fy = texel(v, self.height());
        let (x0, y0) = (fx.floor() as usize, fy.floor() as usize);
        let (x1, y1) = (fx.ceil() as usize, fy.ceil() as usize);
        let (tx, ty) = (fx - x0 as f32, fy - y0 as f32);

        let a = self.get([x0, y0])?;
        let b = self.get([x1, y0])?;
        let c = self.get([x0, y1])?;
        let d = self.get([x1, y1])?;
        let top = a + (b - a) * tx;
        let bottom = c + (d - c) * tx;
        Some(top + (bottom - top) * ty)
    }
}

impl FieldBuffer<3> {
    pub fn width(&self) -> usize {
        self.resolution[0]
    }

    pub fn height(&self) -> usize {
        self.resolution[1]
    }

    pub fn depth(&self) -> usize {
        self.resolution[2]
    }
}

fn texel(t: f32, extent: usize) -> f32 {
    let last = extent.saturating_sub(1) as f32;
    if t.is_nan() {
        return 0.0;
    }
    (t * last).clamp(0.0, last)
}

impl NodeHandle {
    /// Reset the field's tracker, then fill it as a uniform grid whose first
    /// sample sits at `start`.
    pub fn fill_uniform_grid_2d(
        &self,
        field: &mut Field2D,
        start: [i32; 2],
        frequency: f32,
        seed: i32,
    ) -> Result<OutputMinMax> {
        let size = field.resolution();
        self.fill(field, &Geometry::Grid2D { start, size, frequency }, seed)
    }

    pub fn fill_uniform_grid_3d(
        &self,
        field: &mut Field3D,
        start: [i32; 3],
        frequency: f32,
        seed: i32,
    ) -> Result<OutputMinMax> {
        let size = field.resolution();
        self.fill(field, &Geometry::Grid3D { start, size, frequency }, seed)
    }

    pub fn fill_uniform_grid_4d(
        &self,
        field: &mut Field4D,
        start: [i32; 4],
        frequency: f32,
        seed: i32,
    ) -> Result<OutputMinMax> {
        let size = field.resolution();
        self.fill(field, &Geometry::Grid4D { start, size, frequency }, seed)
    }

    pub fn fill_tileable_2d(&self, field: &mut Field2D, frequency: f32, seed: i32) -> Result<OutputMinMax> {
        let size = field.resolution();
        self.fill(field, &Geometry::Tileable2D { size, frequency }, seed)
    }

    /// Reset the field's tracker, then sample it at scattered positions. Each
    /// axis must hold one coordinate per field element.
    pub fn fill_position_array<const D: usize>(
        &self,
        field: &mut FieldBuffer<D>,
        axes: &[&[f32]],
        offset: &[f32],
        seed: i32,
    ) -> Result<OutputMinMax> {
        field.bounds.reset();
        let (out, tracker) = field.parts_mut();
        self.gen_positions_tracked(axes, offset, seed, out, tracker)
    }

    fn fill<const D: usize>(
        &self,
        field: &mut FieldBuffer<D>,
        geometry: &Geometry,
        seed: i32,
    ) -> Result<OutputMinMax> {
        field.bounds.reset();
        let (out, tracker) = field.parts_mut();
        self.generate_tracked(geometry, seed, out, tracker)
    }

    /// Chunked variant of [`fill_uniform_grid_2d`](Self::fill_uniform_grid_2d):
    /// bands of rows are generated in parallel, each with private bounds,
    /// and merged into the field's tracker once every band has finished.
    ///
    /// Produces the same values and bounds as the single-call fill.
    pub fn fill_uniform_grid_2d_chunked(
        &self,
        field: &mut Field2D,
        start: [i32; 2],
        frequency: f32,
        seed: i32,
    ) -> Result<OutputMinMax> {
        let [width, height] = field.resolution();
        let rows = self.band_rows()?.min(height);
        field.bounds.reset();
        if width == 0 || height == 0 {
            return Ok(OutputMinMax::EMPTY);
        }
        let band_len = width.checked_mul(rows).ok_or(NoiseGraphError::ExtentOverflow)?;

        let bands: Vec<Result<OutputMinMax>> = field
            .data
            .par_chunks_mut(band_len)
            .enumerate()
            .map(|(band, out)| {
                let y = band * rows;
                let geometry = Geometry::Grid2D {
                    start: [start[0], offset_axis(start[1], y)?],
                    size: [width, out.len() / width],
                    frequency,
                };
                self.generate(&geometry, seed, out)
            })
            .collect();
        self.merge_bands(bands, &mut field.bounds)
    }

    /// Chunked 3D fill, banded along the slowest axis.
    pub fn fill_uniform_grid_3d_chunked(
        &self,
        field: &mut Field3D,
        start: [i32; 3],
        frequency: f32,
        seed: i32,
    ) -> Result<OutputMinMax> {
        let [width, height, depth] = field.resolution();
        let slices = self.band_rows()?.min(depth);
        field.bounds.reset();
        let plane = width * height;
        if plane == 0 || depth == 0 {
            return Ok(OutputMinMax::EMPTY);
        }
        let band_len = plane.checked_mul(slices).ok_or(NoiseGraphError::ExtentOverflow)?;

        let bands: Vec<Result<OutputMinMax>> = field
            .data
            .par_chunks_mut(band_len)
            .enumerate()
            .map(|(band, out)| {
                let z = band * slices;
                let geometry = Geometry::Grid3D {
                    start: [start[0], start[1], offset_axis(start[2], z)?],
                    size: [width, height, out.len() / plane],
                    frequency,
                };
                self.generate(&geometry, seed, out)
            })
            .collect();
        self.merge_bands(bands, &mut field.bounds)
    }

    fn band_rows(&self) -> Result<usize> {
        let (_, _, ctx) = self.live()?;
        Ok(ctx.config().generation.rows_per_chunk)
    }

    fn merge_bands(
        &self,
        bands: Vec<Result<OutputMinMax>>,
        tracker: &mut BoundsTracker,
    ) -> Result<OutputMinMax> {
        let mut total = OutputMinMax::EMPTY;
        for band in bands {
            total.merge(band?);
        }
        tracker.widen(total)?;
        Ok(total)
    }
}

fn offset_axis(start: i32, steps: usize) -> Result<i32> {
    i32::try_from(steps)
        .ok()
        .and_then(|s| start.checked_add(s))
        .ok_or(NoiseGraphError::ExtentOverflow)
}
