//! Mutable node instances and their member storage.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use hashbrown::HashSet;
use noisegraph_core::BackendFault;

use crate::kinds::{Kind, VarSpec, VarTy};

pub(crate) type NodeCell = Arc<RwLock<SoftNode>>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Scalar {
    Float(f32),
    Int(i32),
}

impl Scalar {
    pub(crate) fn as_f32(self) -> f32 {
        match self {
            Scalar::Float(v) => v,
            Scalar::Int(v) => v as f32,
        }
    }

    pub(crate) fn as_i32(self) -> i32 {
        match self {
            Scalar::Float(v) => v as i32,
            Scalar::Int(v) => v,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Hybrid {
    Constant(f32),
    Node(NodeCell),
}

/// One node of a tree. Children are shared, so a child stays alive as long
/// as any parent refers to it.
#[derive(Debug)]
pub(crate) struct SoftNode {
    pub kind: Kind,
    pub variables: Vec<Scalar>,
    pub lookups: Vec<Option<NodeCell>>,
    pub hybrids: Vec<Hybrid>,
}

impl SoftNode {
    pub(crate) fn new(kind: Kind) -> Self {
        let spec = kind.spec();
        SoftNode {
            kind,
            variables: spec
                .variables
                .iter()
                .map(|v| match v.ty {
                    VarTy::Float { default, .. } => Scalar::Float(default),
                    VarTy::Int { default, .. } | VarTy::Enum { default, .. } => Scalar::Int(default),
                })
                .collect(),
            lookups: vec![None; spec.lookups.len()],
            hybrids: spec.hybrids.iter().map(|h| Hybrid::Constant(h.default)).collect(),
        }
    }

    pub(crate) fn into_cell(self) -> NodeCell {
        Arc::new(RwLock::new(self))
    }

    pub(crate) fn set_float(&mut self, index: usize, value: f32) -> Result<(), BackendFault> {
        let var = self.variable_spec(index)?;
        match var.ty {
            VarTy::Float { min, max, .. } => {
                check_finite(var.name, value)?;
                if value < min || value > max {
                    return Err(BackendFault::new(format!(
                        "'{}' must lie in [{min}, {max}], got {value}",
                        var.name
                    )));
                }
                self.variables[index] = Scalar::Float(value);
                Ok(())
            }
            _ => Err(BackendFault::new(format!("'{}' is not a float variable", var.name))),
        }
    }

    pub(crate) fn set_int(&mut self, index: usize, value: i32) -> Result<(), BackendFault> {
        let var = self.variable_spec(index)?;
        let (min, max) = match var.ty {
            VarTy::Int { min, max, .. } => (min, max),
            VarTy::Enum { names, .. } => (0, names.len() as i32 - 1),
            VarTy::Float { .. } => {
                return Err(BackendFault::new(format!("'{}' is not an int variable", var.name)))
            }
        };
        if value < min || value > max {
            return Err(BackendFault::new(format!(
                "'{}' must lie in {min}..={max}, got {value}",
                var.name
            )));
        }
        self.variables[index] = Scalar::Int(value);
        Ok(())
    }

    pub(crate) fn set_lookup(&mut self, index: usize, target: NodeCell) -> Result<(), BackendFault> {
        let slot = self
            .lookups
            .get_mut(index)
            .ok_or_else(|| BackendFault::new(format!("node lookup index {index} out of range")))?;
        *slot = Some(target);
        Ok(())
    }

    pub(crate) fn set_hybrid(&mut self, index: usize, value: Hybrid) -> Result<(), BackendFault> {
        if let Hybrid::Constant(v) = value {
            check_finite(self.kind.spec().hybrids.get(index).map_or("hybrid", |h| h.name), v)?;
        }
        let slot = self
            .hybrids
            .get_mut(index)
            .ok_or_else(|| BackendFault::new(format!("hybrid index {index} out of range")))?;
        *slot = value;
        Ok(())
    }

    fn variable_spec(&self, index: usize) -> Result<&'static VarSpec, BackendFault> {
        self.kind
            .spec()
            .variables
            .get(index)
            .ok_or_else(|| BackendFault::new(format!("variable index {index} out of range")))
    }

    /// Direct children, in lookup then hybrid order.
    pub(crate) fn children(&self) -> impl Iterator<Item = &NodeCell> {
        self.lookups.iter().flatten().chain(self.hybrids.iter().filter_map(|h| match h {
            Hybrid::Node(n) => Some(n),
            Hybrid::Constant(_) => None,
        }))
    }
}

fn check_finite(name: &str, value: f32) -> Result<(), BackendFault> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(BackendFault::new(format!("'{name}' must be finite, got {value}")))
    }
}

pub(crate) fn read(cell: &NodeCell) -> RwLockReadGuard<'_, SoftNode> {
    cell.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write(cell: &NodeCell) -> RwLockWriteGuard<'_, SoftNode> {
    cell.write().unwrap_or_else(PoisonError::into_inner)
}

/// True when `target` is `from` or reachable from it through bound children.
pub(crate) fn reaches(from: &NodeCell, target: &NodeCell) -> bool {
    let mut seen = HashSet::new();
    let mut stack = vec![from.clone()];
    while let Some(cell) = stack.pop() {
        if Arc::ptr_eq(&cell, target) {
            return true;
        }
        if seen.insert(Arc::as_ptr(&cell)) {
            stack.extend(read(&cell).children().cloned());
        }
    }
    false
}
