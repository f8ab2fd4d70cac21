//! Pure-Rust [`ComputeBackend`] with a small set of noise, domain and
//! arithmetic node kinds.
//!
//! Nodes live in a table keyed by the raw reference handed to the core. Node
//! lookups hold shared references to their targets, so releasing a handle
//! only drops the table entry; anything still bound elsewhere stays alive.
//!
//! ```ignore
//! let ctx = NoiseContext::new(SoftBackend::new())?;
//! let mut fbm = ctx.create("Fractal FBm")?;
//! let perlin = ctx.create("Perlin")?;
//! fbm.set("Source", &perlin)?;
//! ```

mod encoding;
mod eval;
mod kinds;
mod node;
mod noise;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use hashbrown::HashMap;
use log::{debug, trace};
use noisegraph_core::{
    BackendFault, ComputeBackend, KindId, NodeRef, OutputMinMax, RawKindInfo, SimdLevel,
    SIMD_SCALAR,
};

use crate::eval::{compile, Point, Sampler};
use crate::kinds::Kind;
use crate::node::{reaches, read, write, Hybrid, NodeCell, SoftNode};

/// Software compute backend. Cheap to construct; every instance has its own
/// node table.
#[derive(Debug)]
pub struct SoftBackend {
    nodes: Mutex<HashMap<u64, NodeCell>>,
    next_id: AtomicU64,
}

impl SoftBackend {
    pub fn new() -> Self {
        SoftBackend {
            nodes: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of nodes currently owned by handles.
    pub fn live_nodes(&self) -> usize {
        self.table().len()
    }

    /// Names of every node kind, in id order.
    pub fn kind_names() -> impl Iterator<Item = &'static str> {
        Kind::ALL.iter().map(|k| k.spec().name)
    }

    fn table(&self) -> std::sync::MutexGuard<'_, HashMap<u64, NodeCell>> {
        self.nodes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, cell: NodeCell) -> Option<NodeRef> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let node = NodeRef::new(id)?;
        self.table().insert(id, cell);
        Some(node)
    }

    fn cell(&self, node: NodeRef) -> Result<NodeCell, BackendFault> {
        self.table()
            .get(&node.get())
            .cloned()
            .ok_or_else(|| BackendFault::new(format!("unknown node {}", node.get())))
    }

    fn compiled(&self, node: NodeRef) -> Result<Sampler, BackendFault> {
        compile(&self.cell(node)?)
    }

    fn bind_child(
        &self,
        node: NodeRef,
        target: NodeRef,
        apply: impl FnOnce(&mut SoftNode, NodeCell) -> Result<(), BackendFault>,
    ) -> Result<(), BackendFault> {
        let parent = self.cell(node)?;
        let child = self.cell(target)?;
        if reaches(&child, &parent) {
            return Err(BackendFault::new("binding would create a cycle"));
        }
        let mut guard = write(&parent);
        apply(&mut *guard, child)
    }
}

impl Default for SoftBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn check_extent(out: &[f32], size: &[usize]) -> Result<(), BackendFault> {
    if !(2..=4).contains(&size.len()) {
        return Err(BackendFault::new(format!("unsupported dimension count {}", size.len())));
    }
    let expected = size
        .iter()
        .try_fold(1usize, |acc, s| acc.checked_mul(*s))
        .ok_or_else(|| BackendFault::new("extent overflows"))?;
    if expected != out.len() {
        return Err(BackendFault::new(format!(
            "output holds {} values, extent needs {expected}",
            out.len()
        )));
    }
    Ok(())
}

impl ComputeBackend for SoftBackend {
    fn kind_count(&self) -> usize {
        Kind::ALL.len()
    }

    fn describe_kind(&self, kind: usize) -> Option<RawKindInfo> {
        Kind::ALL.get(kind).map(|k| k.describe())
    }

    fn new_node(&self, kind: KindId) -> Option<NodeRef> {
        let kind = Kind::from_id(kind.0)?;
        self.insert(SoftNode::new(kind).into_cell())
    }

    fn decode(&self, encoded: &str) -> Option<NodeRef> {
        match encoding::decode(encoded) {
            Ok(cell) => self.insert(cell),
            Err(err) => {
                debug!("rejecting encoded node tree: {err}");
                None
            }
        }
    }

    fn encode(&self, node: NodeRef) -> Option<String> {
        encoding::encode(&self.cell(node).ok()?)
    }

    fn kind_of(&self, node: NodeRef) -> Option<KindId> {
        let cell = self.cell(node).ok()?;
        let kind = read(&cell).kind;
        Some(KindId(u32::from(kind.id())))
    }

    fn release(&self, node: NodeRef) {
        if self.table().remove(&node.get()).is_none() {
            debug!("release of unknown node {}", node.get());
        }
    }

    fn simd_level(&self, _node: NodeRef) -> SimdLevel {
        SIMD_SCALAR
    }

    fn set_variable_float(&self, node: NodeRef, index: usize, value: f32) -> Result<(), BackendFault> {
        write(&self.cell(node)?).set_float(index, value)
    }

    fn set_variable_int_enum(&self, node: NodeRef, index: usize, value: i32) -> Result<(), BackendFault> {
        write(&self.cell(node)?).set_int(index, value)
    }

    fn set_node_lookup(&self, node: NodeRef, index: usize, target: NodeRef) -> Result<(), BackendFault> {
        self.bind_child(node, target, |n, child| n.set_lookup(index, child))
    }

    fn set_hybrid_float(&self, node: NodeRef, index: usize, value: f32) -> Result<(), BackendFault> {
        write(&self.cell(node)?).set_hybrid(index, Hybrid::Constant(value))
    }

    fn set_hybrid_node_lookup(
        &self,
        node: NodeRef,
        index: usize,
        target: NodeRef,
    ) -> Result<(), BackendFault> {
        self.bind_child(node, target, |n, child| n.set_hybrid(index, Hybrid::Node(child)))
    }

    fn gen_uniform_grid(
        &self,
        node: NodeRef,
        out: &mut [f32],
        start: &[i32],
        size: &[usize],
        frequency: f32,
        seed: i32,
        bounds: &mut OutputMinMax,
    ) -> Result<SimdLevel, BackendFault> {
        check_extent(out, size)?;
        if start.len() != size.len() {
            return Err(BackendFault::new("start and size differ in dimension"));
        }
        let mut sampler = self.compiled(node)?;
        trace!("soft uniform grid {size:?} from {start:?}");

        let dims = size.len();
        let mut coord = [0usize; 4];
        let mut point = Point {
            coords: [0.0; 4],
            dims,
        };
        for slot in out.iter_mut() {
            for d in 0..dims {
                point.coords[d] = (i64::from(start[d]) + coord[d] as i64) as f32 * frequency;
            }
            let v = sampler.sample(&point, seed);
            *slot = v;
            bounds.include(v);

            for d in 0..dims {
                coord[d] += 1;
                if coord[d] < size[d] {
                    break;
                }
                coord[d] = 0;
            }
        }
        Ok(SIMD_SCALAR)
    }

    fn gen_tileable_2d(
        &self,
        node: NodeRef,
        out: &mut [f32],
        size: [usize; 2],
        frequency: f32,
        seed: i32,
        bounds: &mut OutputMinMax,
    ) -> Result<SimdLevel, BackendFault> {
        check_extent(out, &size)?;
        let mut sampler = self.compiled(node)?;
        let [w, h] = size;
        let tau = std::f32::consts::TAU;
        // each axis wraps onto a circle whose circumference is the axis length
        let rx = w as f32 * frequency / tau;
        let ry = h as f32 * frequency / tau;

        for (i, slot) in out.iter_mut().enumerate() {
            let ax = tau * (i % w) as f32 / w as f32;
            let ay = tau * (i / w) as f32 / h as f32;
            let point = Point {
                coords: [ax.cos() * rx, ax.sin() * rx, ay.cos() * ry, ay.sin() * ry],
                dims: 4,
            };
            let v = sampler.sample(&point, seed);
            *slot = v;
            bounds.include(v);
        }
        Ok(SIMD_SCALAR)
    }

    fn gen_position_array(
        &self,
        node: NodeRef,
        out: &mut [f32],
        axes: &[&[f32]],
        offset: &[f32],
        seed: i32,
        bounds: &mut OutputMinMax,
    ) -> Result<SimdLevel, BackendFault> {
        let dims = axes.len();
        if !(2..=4).contains(&dims) || offset.len() != dims {
            return Err(BackendFault::new(format!("unsupported dimension count {dims}")));
        }
        if axes.iter().any(|a| a.len() != out.len()) {
            return Err(BackendFault::new("position arrays differ in length from output"));
        }
        let mut sampler = self.compiled(node)?;

        let mut point = Point {
            coords: [0.0; 4],
            dims,
        };
        for (i, slot) in out.iter_mut().enumerate() {
            for d in 0..dims {
                point.coords[d] = axes[d][i] + offset[d];
            }
            let v = sampler.sample(&point, seed);
            *slot = v;
            bounds.include(v);
        }
        Ok(SIMD_SCALAR)
    }

    fn gen_single(&self, node: NodeRef, position: &[f32], seed: i32) -> Result<f32, BackendFault> {
        if !(2..=4).contains(&position.len()) {
            return Err(BackendFault::new(format!(
                "unsupported dimension count {}",
                position.len()
            )));
        }
        Ok(self.compiled(node)?.sample(&Point::new(position), seed))
    }
}
