//! Three-stage normalization of generated buffers into `[0, 1]`.
//!
//! 1. optimise: freeze the tracker's bounds into a [`NormalizeTransform`]
//! 2. map: rewrite every element as `(v - min) * scale`, sharded on rayon
//! 3. reset: return the tracker to the empty state for the next cycle
//!
//! Each stage only starts once the previous one has finished for the whole
//! buffer. Callers that shard differently can drive the stages themselves
//! through [`BoundsTracker::optimise`], [`NormalizeTransform::apply_slice`] and
//! [`BoundsTracker::reset`].

use log::trace;
use rayon::prelude::*;

use crate::bounds::{BoundsTracker, NormalizeTransform};
use crate::config::NormalizeConfig;
use crate::error::Result;
use crate::field::FieldBuffer;

/// Normalize `values` with the bounds accumulated in `tracker`.
///
/// On error (empty or already optimised tracker) neither the buffer nor the
/// tracker is modified.
pub fn normalize(
    values: &mut [f32],
    tracker: &mut BoundsTracker,
    config: &NormalizeConfig,
) -> Result<NormalizeTransform> {
    let transform = tracker.optimise()?;
    apply_transform(values, transform, config);
    tracker.reset();
    Ok(transform)
}

/// Stage two on its own.
pub fn apply_transform(values: &mut [f32], transform: NormalizeTransform, config: &NormalizeConfig) {
    if config.parallel && values.len() >= config.min_parallel_len {
        trace!(
            "normalizing {} values on the rayon pool in chunks of {}",
            values.len(),
            config.chunk_len
        );
        values
            .par_chunks_mut(config.chunk_len.max(1))
            .for_each(|chunk| transform.apply_slice(chunk));
    } else {
        transform.apply_slice(values);
    }
}

pub fn normalize_field<const D: usize>(
    field: &mut FieldBuffer<D>,
    config: &NormalizeConfig,
) -> Result<NormalizeTransform> {
    let (values, tracker) = field.parts_mut();
    normalize(values, tracker, config)
}
