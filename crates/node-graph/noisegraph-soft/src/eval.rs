//! Tree evaluation.
//!
//! A node tree is first compiled into an immutable [`Expr`] snapshot (taking
//! each node's read lock once), then sampled without any locking. Unset node
//! lookups and out-of-range enum ordinals are reported at compile time.
//!
//! A node bound in several places compiles to one shared expression, and its
//! value is computed once per distinct sample point.

use std::sync::Arc;

use hashbrown::HashMap;
use noisegraph_core::BackendFault;

use crate::kinds::{Kind, CELLULAR_DISTANCE_SLOTS};
use crate::node::{read, Hybrid, NodeCell, Scalar, SoftNode};
use crate::noise::{self, Cellular, CellularReturn, DistanceFn};

/// Deepest tree the compiler accepts.
const MAX_DEPTH: usize = 256;

/// Sample position; only the first `dims` coordinates are meaningful.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Point {
    pub coords: [f32; 4],
    pub dims: usize,
}

impl Point {
    pub(crate) fn new(position: &[f32]) -> Self {
        let mut coords = [0.0; 4];
        let dims = position.len().min(4);
        coords[..dims].copy_from_slice(&position[..dims]);
        Point { coords, dims }
    }
}

type Child = Arc<Expr>;

/// (shared expression, coordinate bits, dimension count, seed)
type SampleKey = (usize, [u32; 4], usize, i32);

/// Values of shared sub-expressions computed for the current sample.
type Cache = HashMap<SampleKey, f32>;

#[derive(Debug, Clone)]
pub(crate) enum Input {
    Constant(f32),
    Node(Child),
}

impl Input {
    #[inline]
    fn at(&self, p: &Point, seed: i32, cache: &mut Cache) -> f32 {
        match self {
            Input::Constant(v) => *v,
            Input::Node(e) => eval_child(e, p, seed, cache),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Min,
    Max,
}

#[derive(Debug)]
pub(crate) enum Expr {
    Constant(f32),
    White,
    Checkerboard { size: f32 },
    Value,
    Perlin,
    Modulate { source: Child, modulator: Child },
    Fbm { source: Child, octaves: i32, lacunarity: f32, gain: Input },
    Cellular { cfg: Cellular, jitter: Input },
    SineWaves { scale: Input },
    PositionOutput { multiplier: [f32; 4], offset: [f32; 4] },
    DomainScale { source: Child, scale: f32 },
    DomainOffset { source: Child, offset: [Input; 4] },
    AddDimension { source: Child, position: Input },
    Binary { op: BinaryOp, lhs: Input, rhs: Input },
    MaxSmooth { lhs: Child, rhs: Input, smoothness: Input },
    Abs(Child),
    Terrace { source: Child, smooth: bool, steps: f32 },
    Remap { source: Child, from: [f32; 2], to: [f32; 2] },
}

/// Compiled tree plus the scratch space its shared nodes need.
#[derive(Debug)]
pub(crate) struct Sampler {
    root: Child,
    cache: Cache,
}

impl Sampler {
    pub(crate) fn sample(&mut self, p: &Point, seed: i32) -> f32 {
        self.cache.clear();
        self.root.eval(p, seed, &mut self.cache)
    }
}

pub(crate) fn compile(cell: &NodeCell) -> Result<Sampler, BackendFault> {
    let root = Compiler::default().node(cell, 0)?;
    Ok(Sampler {
        root,
        cache: Cache::new(),
    })
}

#[inline]
fn eval_child(child: &Child, p: &Point, seed: i32, cache: &mut Cache) -> f32 {
    if Arc::strong_count(child) == 1 {
        return child.eval(p, seed, cache);
    }
    let key = (
        Arc::as_ptr(child) as usize,
        p.coords.map(f32::to_bits),
        p.dims,
        seed,
    );
    if let Some(v) = cache.get(&key) {
        return *v;
    }
    let v = child.eval(p, seed, cache);
    cache.insert(key, v);
    v
}

#[derive(Default)]
struct Compiler {
    memo: HashMap<usize, Child>,
}

impl Compiler {
    fn node(&mut self, cell: &NodeCell, depth: usize) -> Result<Child, BackendFault> {
        if depth > MAX_DEPTH {
            return Err(BackendFault::new(format!("node tree deeper than {MAX_DEPTH}")));
        }
        let key = Arc::as_ptr(cell) as usize;
        if let Some(done) = self.memo.get(&key) {
            return Ok(done.clone());
        }
        let node = read(cell);
        let expr = Arc::new(self.expr(&node, depth)?);
        self.memo.insert(key, expr.clone());
        Ok(expr)
    }

    fn expr(&mut self, node: &SoftNode, depth: usize) -> Result<Expr, BackendFault> {
        let f = |i: usize| node.variables[i].as_f32();

        Ok(match node.kind {
            Kind::Constant => Expr::Constant(f(0)),
            Kind::White => Expr::White,
            Kind::Checkerboard => Expr::Checkerboard { size: f(0) },
            Kind::Value => Expr::Value,
            Kind::Perlin => Expr::Perlin,
            Kind::Modulate => Expr::Modulate {
                source: self.lookup(node, 0, depth)?,
                modulator: self.lookup(node, 1, depth)?,
            },
            Kind::FractalFbm => Expr::Fbm {
                source: self.lookup(node, 0, depth)?,
                octaves: node.variables[0].as_i32(),
                lacunarity: f(1),
                gain: self.hybrid(node, 0, depth)?,
            },
            Kind::CellularDistance => {
                let ordinal = |i: usize| node.variables[i].as_i32();
                let slot = |i: usize| -> Result<usize, BackendFault> {
                    let v = ordinal(i);
                    usize::try_from(v)
                        .ok()
                        .filter(|s| *s < CELLULAR_DISTANCE_SLOTS as usize)
                        .ok_or_else(|| BackendFault::new(format!("distance index {v} out of range")))
                };
                Expr::Cellular {
                    cfg: Cellular {
                        distance: DistanceFn::from_ordinal(ordinal(0))
                            .ok_or_else(|| BackendFault::new("unknown distance function"))?,
                        index0: slot(1)?,
                        index1: slot(2)?,
                        output: CellularReturn::from_ordinal(ordinal(3))
                            .ok_or_else(|| BackendFault::new("unknown cellular return type"))?,
                    },
                    jitter: self.hybrid(node, 0, depth)?,
                }
            }
            Kind::SineWaves => Expr::SineWaves {
                scale: self.hybrid(node, 0, depth)?,
            },
            Kind::PositionOutput => Expr::PositionOutput {
                multiplier: [f(0), f(1), f(2), f(3)],
                offset: [f(4), f(5), f(6), f(7)],
            },
            Kind::DomainScale => Expr::DomainScale {
                source: self.lookup(node, 0, depth)?,
                scale: f(0),
            },
            Kind::DomainOffset => Expr::DomainOffset {
                source: self.lookup(node, 0, depth)?,
                offset: [
                    self.hybrid(node, 0, depth)?,
                    self.hybrid(node, 1, depth)?,
                    self.hybrid(node, 2, depth)?,
                    self.hybrid(node, 3, depth)?,
                ],
            },
            Kind::AddDimension => Expr::AddDimension {
                source: self.lookup(node, 0, depth)?,
                position: self.hybrid(node, 0, depth)?,
            },
            Kind::Add | Kind::Multiply | Kind::Min | Kind::Max => Expr::Binary {
                op: match node.kind {
                    Kind::Add => BinaryOp::Add,
                    Kind::Multiply => BinaryOp::Multiply,
                    Kind::Min => BinaryOp::Min,
                    _ => BinaryOp::Max,
                },
                lhs: Input::Node(self.lookup(node, 0, depth)?),
                rhs: self.hybrid(node, 0, depth)?,
            },
            Kind::Subtract => Expr::Binary {
                op: BinaryOp::Subtract,
                lhs: self.hybrid(node, 0, depth)?,
                rhs: self.hybrid(node, 1, depth)?,
            },
            Kind::MaxSmooth => Expr::MaxSmooth {
                lhs: self.lookup(node, 0, depth)?,
                rhs: self.hybrid(node, 0, depth)?,
                smoothness: self.hybrid(node, 1, depth)?,
            },
            Kind::Abs => Expr::Abs(self.lookup(node, 0, depth)?),
            Kind::Terrace => Expr::Terrace {
                source: self.lookup(node, 0, depth)?,
                smooth: node.variables[0] == Scalar::Int(1),
                steps: f(1),
            },
            Kind::Remap => Expr::Remap {
                source: self.lookup(node, 0, depth)?,
                from: [f(0), f(1)],
                to: [f(2), f(3)],
            },
        })
    }

    fn lookup(&mut self, node: &SoftNode, index: usize, depth: usize) -> Result<Child, BackendFault> {
        match node.lookups.get(index) {
            Some(Some(child)) => self.node(child, depth + 1),
            _ => {
                let spec = node.kind.spec();
                let name = spec.lookups.get(index).map_or("?", |m| m.name);
                Err(BackendFault::new(format!(
                    "node lookup '{name}' of '{}' is not set",
                    spec.name
                )))
            }
        }
    }

    fn hybrid(&mut self, node: &SoftNode, index: usize, depth: usize) -> Result<Input, BackendFault> {
        match node.hybrids.get(index) {
            Some(Hybrid::Constant(v)) => Ok(Input::Constant(*v)),
            Some(Hybrid::Node(child)) => Ok(Input::Node(self.node(child, depth + 1)?)),
            None => Err(BackendFault::new(format!("hybrid index {index} out of range"))),
        }
    }
}

impl Expr {
    fn eval(&self, p: &Point, seed: i32, cache: &mut Cache) -> f32 {
        let dims = p.dims;
        match self {
            Expr::Constant(v) => *v,
            Expr::White => noise::white(seed, &p.coords, dims),
            Expr::Checkerboard { size } => noise::checkerboard(*size, &p.coords, dims),
            Expr::Value => noise::value(seed, &p.coords, dims),
            Expr::Perlin => noise::perlin(seed, &p.coords, dims),
            Expr::Modulate { source, modulator } => {
                eval_child(source, p, seed, cache) * eval_child(modulator, p, seed, cache)
            }
            Expr::Fbm {
                source,
                octaves,
                lacunarity,
                gain,
            } => {
                let gain = gain.at(p, seed, cache);
                let mut sum = 0.0;
                let mut amp = 1.0;
                let mut bound = 0.0;
                let mut q = *p;
                for octave in 0..*octaves {
                    sum += eval_child(source, &q, seed.wrapping_add(octave), cache) * amp;
                    bound += amp;
                    amp *= gain;
                    for c in &mut q.coords[..dims] {
                        *c *= lacunarity;
                    }
                }
                if bound == 0.0 {
                    0.0
                } else {
                    sum / bound
                }
            }
            Expr::Cellular { cfg, jitter } => {
                let jitter = jitter.at(p, seed, cache);
                noise::cellular(seed, cfg, jitter, &p.coords, dims)
            }
            Expr::SineWaves { scale } => {
                let scale = scale.at(p, seed, cache);
                noise::sine_waves(scale, &p.coords, dims)
            }
            Expr::PositionOutput { multiplier, offset } => (0..dims)
                .map(|d| (p.coords[d] + offset[d]) * multiplier[d])
                .sum(),
            Expr::DomainScale { source, scale } => {
                let mut q = *p;
                for c in &mut q.coords[..dims] {
                    *c *= scale;
                }
                eval_child(source, &q, seed, cache)
            }
            Expr::DomainOffset { source, offset } => {
                let mut q = *p;
                for d in 0..dims {
                    q.coords[d] += offset[d].at(p, seed, cache);
                }
                eval_child(source, &q, seed, cache)
            }
            Expr::AddDimension { source, position } => {
                let mut q = *p;
                if dims < 4 {
                    q.coords[dims] = position.at(p, seed, cache);
                    q.dims += 1;
                }
                eval_child(source, &q, seed, cache)
            }
            Expr::Binary { op, lhs, rhs } => {
                let a = lhs.at(p, seed, cache);
                let b = rhs.at(p, seed, cache);
                match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Subtract => a - b,
                    BinaryOp::Multiply => a * b,
                    BinaryOp::Min => a.min(b),
                    BinaryOp::Max => a.max(b),
                }
            }
            Expr::MaxSmooth {
                lhs,
                rhs,
                smoothness,
            } => {
                let a = eval_child(lhs, p, seed, cache);
                let b = rhs.at(p, seed, cache);
                let k = smoothness.at(p, seed, cache).abs();
                if k == 0.0 {
                    return a.max(b);
                }
                // polynomial smooth max
                let h = (0.5 + 0.5 * (a - b) / k).clamp(0.0, 1.0);
                b + (a - b) * h + k * h * (1.0 - h)
            }
            Expr::Abs(source) => eval_child(source, p, seed, cache).abs(),
            Expr::Terrace {
                source,
                smooth,
                steps,
            } => {
                let v = eval_child(source, p, seed, cache) * steps;
                let base = v.floor();
                let mut t = v - base;
                if *smooth {
                    t = t * t * (3.0 - 2.0 * t);
                    (base + t) / steps
                } else {
                    base / steps
                }
            }
            Expr::Remap { source, from, to } => {
                let span = from[1] - from[0];
                let v = eval_child(source, p, seed, cache);
                if span == 0.0 {
                    to[0]
                } else {
                    to[0] + (v - from[0]) / span * (to[1] - to[0])
                }
            }
        }
    }
}
