//! Scripted backend used by the integration tests.
//!
//! Generated values are a deterministic function of absolute grid position so
//! banded and single-call generation can be compared exactly.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use noisegraph_core::{
    BackendFault, ComputeBackend, Config, KindId, NoiseContext, NodeRef, OutputMinMax, RawKindInfo,
    RawMember, RawVariable, SimdLevel, VariableType,
};

pub const CONSTANT: u32 = 0;
pub const FRACTAL: u32 = 1;
pub const DOMAIN_OFFSET: u32 = 2;
pub const UNREGISTERED: u32 = 99;

#[derive(Debug, Default, Clone)]
pub struct MockNode {
    pub kind: u32,
    pub floats: HashMap<usize, f32>,
    pub ints: HashMap<usize, i32>,
    pub lookups: HashMap<usize, u64>,
    pub hybrid_floats: HashMap<usize, f32>,
    pub hybrid_nodes: HashMap<usize, u64>,
}

#[derive(Debug, Default)]
pub struct MockState {
    next_id: u64,
    pub live: HashMap<u64, MockNode>,
    pub released: Vec<u64>,
    pub describe_calls: usize,
    pub gen_calls: usize,
}

#[derive(Debug, Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
}

impl MockBackend {
    pub fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        let mut guard = self.state.lock().unwrap();
        f(&mut guard)
    }

    pub fn node(&self, raw: NodeRef) -> MockNode {
        self.with_state(|s| s.live.get(&raw.get()).cloned().expect("live node"))
    }

    pub fn released(&self) -> Vec<u64> {
        self.with_state(|s| s.released.clone())
    }

    pub fn live_count(&self) -> usize {
        self.with_state(|s| s.live.len())
    }

    pub fn gen_calls(&self) -> usize {
        self.with_state(|s| s.gen_calls)
    }

    fn alloc(&self, kind: u32) -> NodeRef {
        self.with_state(|s| {
            s.next_id += 1;
            let id = s.next_id;
            s.live.insert(
                id,
                MockNode {
                    kind,
                    ..MockNode::default()
                },
            );
            NodeRef::new(id).expect("ids start at 1")
        })
    }

    fn update(
        &self,
        node: NodeRef,
        f: impl FnOnce(&mut MockNode) -> Result<(), BackendFault>,
    ) -> Result<(), BackendFault> {
        self.with_state(|s| match s.live.get_mut(&node.get()) {
            Some(n) => f(n),
            None => Err(BackendFault::new("node was released")),
        })
    }

    fn check_generate(&self, node: NodeRef) -> Result<(), BackendFault> {
        self.with_state(|s| {
            s.gen_calls += 1;
            let n = s
                .live
                .get(&node.get())
                .ok_or_else(|| BackendFault::new("node was released"))?;
            if n.kind == FRACTAL && !n.lookups.contains_key(&0) {
                return Err(BackendFault::new("source is not set"));
            }
            Ok(())
        })
    }
}

pub fn mock_context() -> (NoiseContext, Arc<MockBackend>) {
    mock_context_with(Config::default())
}

pub fn mock_context_with(config: Config) -> (NoiseContext, Arc<MockBackend>) {
    let backend = Arc::new(MockBackend::default());
    let ctx = NoiseContext::from_shared(backend.clone(), config).expect("mock registry loads");
    (ctx, backend)
}

/// Value written at absolute grid coordinate `p`.
pub fn grid_value(p: &[i64], frequency: f32, seed: i32) -> f32 {
    let mut v = seed as f32;
    let mut weight = 1.0f32;
    for c in p {
        v += *c as f32 * weight * frequency;
        weight *= 100.0;
    }
    v
}

fn raw_var(name: &str, ty: VariableType, enums: &[&str]) -> RawVariable {
    RawVariable {
        name: name.to_string(),
        ty,
        dimension: None,
        enum_names: enums.iter().map(|s| s.to_string()).collect(),
    }
}

fn raw_member(name: &str, dimension: Option<u8>) -> RawMember {
    RawMember {
        name: name.to_string(),
        dimension,
    }
}

impl ComputeBackend for MockBackend {
    fn kind_count(&self) -> usize {
        3
    }

    fn describe_kind(&self, kind: usize) -> Option<RawKindInfo> {
        self.with_state(|s| s.describe_calls += 1);
        match kind as u32 {
            CONSTANT => Some(RawKindInfo {
                name: "Constant".into(),
                variables: vec![raw_var("Value", VariableType::Float, &[])],
                ..RawKindInfo::default()
            }),
            FRACTAL => Some(RawKindInfo {
                name: "Fractal FBm".into(),
                variables: vec![
                    raw_var("Octaves", VariableType::Int, &[]),
                    raw_var("Weighting Mode", VariableType::Enum, &["Linear", "Smooth Step"]),
                ],
                node_lookups: vec![raw_member("Source", None)],
                hybrids: vec![raw_member("Gain", None)],
            }),
            DOMAIN_OFFSET => Some(RawKindInfo {
                name: "Domain Offset".into(),
                variables: vec![],
                node_lookups: vec![raw_member("Source", None)],
                hybrids: vec![raw_member("Offset", Some(0)), raw_member("Offset", Some(1))],
            }),
            _ => None,
        }
    }

    fn new_node(&self, kind: KindId) -> Option<NodeRef> {
        (kind.0 < 3).then(|| self.alloc(kind.0))
    }

    fn decode(&self, encoded: &str) -> Option<NodeRef> {
        match encoded {
            "constant" => Some(self.alloc(CONSTANT)),
            "ghost" => Some(self.alloc(UNREGISTERED)),
            _ => None,
        }
    }

    fn encode(&self, node: NodeRef) -> Option<String> {
        self.with_state(|s| s.live.get(&node.get()).map(|n| format!("mock:{}", n.kind)))
    }

    fn kind_of(&self, node: NodeRef) -> Option<KindId> {
        self.with_state(|s| s.live.get(&node.get()).map(|n| KindId(n.kind)))
    }

    fn release(&self, node: NodeRef) {
        self.with_state(|s| {
            s.live.remove(&node.get());
            s.released.push(node.get());
        });
    }

    fn simd_level(&self, _node: NodeRef) -> SimdLevel {
        7
    }

    fn set_variable_float(&self, node: NodeRef, index: usize, value: f32) -> Result<(), BackendFault> {
        self.update(node, |n| {
            if !value.is_finite() {
                return Err(BackendFault::new("value must be finite"));
            }
            n.floats.insert(index, value);
            Ok(())
        })
    }

    fn set_variable_int_enum(&self, node: NodeRef, index: usize, value: i32) -> Result<(), BackendFault> {
        self.update(node, |n| {
            if n.kind == FRACTAL && index == 0 && value < 1 {
                return Err(BackendFault::new("octaves must be at least 1"));
            }
            n.ints.insert(index, value);
            Ok(())
        })
    }

    fn set_node_lookup(&self, node: NodeRef, index: usize, target: NodeRef) -> Result<(), BackendFault> {
        self.update(node, |n| {
            n.lookups.insert(index, target.get());
            Ok(())
        })
    }

    fn set_hybrid_float(&self, node: NodeRef, index: usize, value: f32) -> Result<(), BackendFault> {
        self.update(node, |n| {
            n.hybrid_nodes.remove(&index);
            n.hybrid_floats.insert(index, value);
            Ok(())
        })
    }

    fn set_hybrid_node_lookup(&self, node: NodeRef, index: usize, target: NodeRef) -> Result<(), BackendFault> {
        self.update(node, |n| {
            n.hybrid_floats.remove(&index);
            n.hybrid_nodes.insert(index, target.get());
            Ok(())
        })
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
        self.check_generate(node)?;
        let mut coord = vec![0usize; size.len()];
        for slot in out.iter_mut() {
            let p: Vec<i64> = coord
                .iter()
                .zip(start)
                .map(|(c, s)| *c as i64 + *s as i64)
                .collect();
            *slot = grid_value(&p, frequency, seed);
            bounds.include(*slot);
            for (c, extent) in coord.iter_mut().zip(size) {
                *c += 1;
                if *c < *extent {
                    break;
                }
                *c = 0;
            }
        }
        Ok(7)
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
        self.gen_uniform_grid(node, out, &[0, 0], &size, frequency, seed, bounds)
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
        self.check_generate(node)?;
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = seed as f32 + axes.iter().zip(offset).map(|(a, o)| a[i] + o).sum::<f32>();
            bounds.include(*slot);
        }
        Ok(7)
    }

    fn gen_single(&self, node: NodeRef, position: &[f32], seed: i32) -> Result<f32, BackendFault> {
        self.check_generate(node)?;
        Ok(seed as f32 + position.iter().sum::<f32>())
    }
}
