//! Runtime configuration for normalization and chunked generation.

use serde::{Deserialize, Serialize};

use crate::error::{NoiseGraphError, Result};

/// Top-level configuration carried by a [`NoiseContext`](crate::NoiseContext).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub normalize: NormalizeConfig,
    pub generation: GenerationConfig,
}

/// Controls how the normalize stage is sharded.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Run the per-element map on the rayon pool.
    pub parallel: bool,
    /// Buffers shorter than this are normalized on the calling thread.
    pub min_parallel_len: usize,
    /// Elements per parallel work item.
    pub chunk_len: usize,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            min_parallel_len: 16 * 1024,
            chunk_len: 4096,
        }
    }
}

/// Controls band splitting for chunked grid generation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Rows (2D) or slices (3D) generated per parallel band.
    pub rows_per_chunk: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self { rows_per_chunk: 32 }
    }
}

impl Config {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Config =
            serde_json::from_str(raw).map_err(|e| NoiseGraphError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.normalize.chunk_len == 0 {
            return Err(NoiseGraphError::Config(
                "normalize.chunk_len must be at least 1".to_string(),
            ));
        }
        if self.generation.rows_per_chunk == 0 {
            return Err(NoiseGraphError::Config(
                "generation.rows_per_chunk must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
