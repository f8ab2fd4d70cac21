//! Boundary to the compute backend that owns node instances and performs the
//! field mathematics.
//!
//! The core never inspects encoded blobs or evaluates noise itself; it only
//! validates requests and forwards them through [`ComputeBackend`].

use serde::{Deserialize, Serialize};

use crate::bounds::OutputMinMax;
use crate::error::BackendFault;
use crate::types::{KindId, NodeRef, SimdLevel, VariableType};

/// Reflection data for one plain variable of a node kind, as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawVariable {
    pub name: String,
    pub ty: VariableType,
    /// Vector component index (0..=3) when the variable is one axis of a vector member.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_names: Vec<String>,
}

/// Reflection data for a node-lookup or hybrid member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMember {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<u8>,
}

/// Everything the backend exposes about one node kind.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawKindInfo {
    pub name: String,
    pub variables: Vec<RawVariable>,
    pub node_lookups: Vec<RawMember>,
    pub hybrids: Vec<RawMember>,
}

/// External collaborator performing field generation.
///
/// Implementations must be shareable across threads: generation calls on
/// distinct nodes, or on one node whose configuration is frozen, may run
/// concurrently. Node-lookup targets must stay alive inside the backend for as
/// long as some node refers to them, independently of `release`.
pub trait ComputeBackend: Send + Sync {
    /// Number of node kinds. Kind ids are `0..kind_count()`.
    fn kind_count(&self) -> usize;

    /// Reflection data for one kind, `None` when `kind` is out of range.
    fn describe_kind(&self, kind: usize) -> Option<RawKindInfo>;

    fn new_node(&self, kind: KindId) -> Option<NodeRef>;

    /// Parse an encoded node tree. `None` means the blob is unparsable.
    fn decode(&self, encoded: &str) -> Option<NodeRef>;

    fn encode(&self, node: NodeRef) -> Option<String>;

    fn kind_of(&self, node: NodeRef) -> Option<KindId>;

    /// Free the instance behind `node`. Called exactly once per reference.
    fn release(&self, node: NodeRef);

    fn simd_level(&self, node: NodeRef) -> SimdLevel;

    fn set_variable_float(&self, node: NodeRef, index: usize, value: f32)
        -> Result<(), BackendFault>;

    fn set_variable_int_enum(&self, node: NodeRef, index: usize, value: i32)
        -> Result<(), BackendFault>;

    fn set_node_lookup(&self, node: NodeRef, index: usize, target: NodeRef)
        -> Result<(), BackendFault>;

    fn set_hybrid_float(&self, node: NodeRef, index: usize, value: f32)
        -> Result<(), BackendFault>;

    fn set_hybrid_node_lookup(&self, node: NodeRef, index: usize, target: NodeRef)
        -> Result<(), BackendFault>;

    /// Fill `out` (row-major, first axis fastest) with a uniform grid sample and
    /// write the min/max of the written values into `bounds`.
    ///
    /// `start.len() == size.len()` is the dimension count (2..=4) and
    /// `out.len()` equals the product of `size`.
    #[allow(clippy::too_many_arguments)]
    fn gen_uniform_grid(
        &self,
        node: NodeRef,
        out: &mut [f32],
        start: &[i32],
        size: &[usize],
        frequency: f32,
        seed: i32,
        bounds: &mut OutputMinMax,
    ) -> Result<SimdLevel, BackendFault>;

    #[allow(clippy::too_many_arguments)]
    fn gen_tileable_2d(
        &self,
        node: NodeRef,
        out: &mut [f32],
        size: [usize; 2],
        frequency: f32,
        seed: i32,
        bounds: &mut OutputMinMax,
    ) -> Result<SimdLevel, BackendFault>;

    /// Sample at scattered positions. `axes[d][i] + offset[d]` is coordinate
    /// `d` of sample `i`; every axis has `out.len()` entries.
    fn gen_position_array(
        &self,
        node: NodeRef,
        out: &mut [f32],
        axes: &[&[f32]],
        offset: &[f32],
        seed: i32,
        bounds: &mut OutputMinMax,
    ) -> Result<SimdLevel, BackendFault>;

    fn gen_single(&self, node: NodeRef, position: &[f32], seed: i32) -> Result<f32, BackendFault>;
}
