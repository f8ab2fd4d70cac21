//! Typed, validated parameter binding on node handles.
//!
//! Every request is checked against the handle's [`NodeKindDescriptor`]
//! before the backend is touched, so the backend only ever sees a setter
//! matching the member's group and index.

use log::trace;

use crate::error::{NoiseGraphError, Result};
use crate::handle::NodeHandle;
use crate::schema::{MemberDescriptor, NodeKindDescriptor};
use crate::types::{MemberKind, NodeRef};

/// Value accepted by [`NodeHandle::set`].
#[derive(Debug, Clone, Copy)]
pub enum MemberValue<'a> {
    Float(f32),
    Int(i32),
    /// Enum value by name; matched case- and space-insensitively.
    Enum(&'a str),
    Node(&'a NodeHandle),
}

impl MemberValue<'_> {
    fn shape(&self) -> &'static str {
        match self {
            MemberValue::Float(_) => "a float",
            MemberValue::Int(_) => "an int",
            MemberValue::Enum(_) => "an enum name",
            MemberValue::Node(_) => "a node",
        }
    }
}

impl From<f32> for MemberValue<'_> {
    fn from(v: f32) -> Self {
        MemberValue::Float(v)
    }
}

impl From<i32> for MemberValue<'_> {
    fn from(v: i32) -> Self {
        MemberValue::Int(v)
    }
}

impl<'a> From<&'a str> for MemberValue<'a> {
    fn from(v: &'a str) -> Self {
        MemberValue::Enum(v)
    }
}

impl<'a> From<&'a NodeHandle> for MemberValue<'a> {
    fn from(v: &'a NodeHandle) -> Self {
        MemberValue::Node(v)
    }
}

/// Input of a hybrid member: a constant, or a node driving it per sample.
#[derive(Debug, Clone, Copy)]
pub enum HybridInput<'a> {
    Constant(f32),
    Node(&'a NodeHandle),
}

impl<'a> From<HybridInput<'a>> for MemberValue<'a> {
    fn from(input: HybridInput<'a>) -> Self {
        match input {
            HybridInput::Constant(v) => MemberValue::Float(v),
            HybridInput::Node(n) => MemberValue::Node(n),
        }
    }
}

/// Backend setter selected by validation.
enum Apply {
    VariableFloat(f32),
    VariableInt(i32),
    NodeLookup(NodeRef),
    HybridFloat(f32),
    HybridNode(NodeRef),
}

impl NodeHandle {
    /// Bind `value` to the member called `member`.
    ///
    /// ```ignore
    /// fractal.set("Gain", 0.3f32)?;
    /// fractal.set("Octaves", 4)?;
    /// cellular.set("Return Type", "Index0Add1")?;
    /// fractal.set("Source", &simplex)?;
    /// ```
    pub fn set<'a>(&mut self, member: &str, value: impl Into<MemberValue<'a>>) -> Result<()> {
        let value = value.into();
        let (raw, kind, ctx) = self.live()?;
        let descriptor = ctx.registry().describe(kind)?;
        let target = resolve_member(descriptor, member)?;
        let apply = validate(self, target, value)?;

        trace!("set {}.{} ({})", descriptor.name, target.name, value.shape());
        let backend = ctx.backend();
        let index = target.index;
        let outcome = match apply {
            Apply::VariableFloat(v) => backend.set_variable_float(raw, index, v),
            Apply::VariableInt(v) => backend.set_variable_int_enum(raw, index, v),
            Apply::NodeLookup(n) => backend.set_node_lookup(raw, index, n),
            Apply::HybridFloat(v) => backend.set_hybrid_float(raw, index, v),
            Apply::HybridNode(n) => backend.set_hybrid_node_lookup(raw, index, n),
        };
        outcome.map_err(|fault| fault.into_error(format!("set '{}.{}'", descriptor.name, target.name)))
    }

    /// Bind a hybrid member to either a constant or a driving node.
    pub fn set_hybrid(&mut self, member: &str, input: HybridInput<'_>) -> Result<()> {
        let descriptor = self.descriptor()?;
        let target = resolve_member(descriptor, member)?;
        if target.kind != MemberKind::Hybrid {
            return Err(NoiseGraphError::TypeMismatch {
                member: target.name.clone(),
                expected: target.kind,
                found: "a hybrid input",
            });
        }
        self.set(member, input)
    }
}

fn resolve_member<'d>(descriptor: &'d NodeKindDescriptor, member: &str) -> Result<&'d MemberDescriptor> {
    descriptor
        .member(member)
        .ok_or_else(|| NoiseGraphError::UnknownMember {
            kind: descriptor.name.clone(),
            member: member.to_string(),
        })
}

fn validate(owner: &NodeHandle, target: &MemberDescriptor, value: MemberValue<'_>) -> Result<Apply> {
    let mismatch = || NoiseGraphError::TypeMismatch {
        member: target.name.clone(),
        expected: target.kind,
        found: value.shape(),
    };

    match (value, target.kind) {
        (MemberValue::Float(v), MemberKind::Float) => Ok(Apply::VariableFloat(v)),
        (MemberValue::Float(v), MemberKind::Hybrid) => Ok(Apply::HybridFloat(v)),
        (MemberValue::Int(v), MemberKind::Int) => Ok(Apply::VariableInt(v)),
        (MemberValue::Enum(name), MemberKind::Enum) => target
            .enum_ordinal(name)
            .map(Apply::VariableInt)
            .ok_or_else(|| NoiseGraphError::UnknownEnumValue {
                member: target.name.clone(),
                value: name.to_string(),
            }),
        (MemberValue::Node(node), MemberKind::NodeLookup) => {
            node_target(owner, node).map(Apply::NodeLookup)
        }
        (MemberValue::Node(node), MemberKind::Hybrid) => {
            node_target(owner, node).map(Apply::HybridNode)
        }
        _ => Err(mismatch()),
    }
}

fn node_target(owner: &NodeHandle, node: &NodeHandle) -> Result<NodeRef> {
    let (raw, _, ctx) = node.live()?;
    match owner.context() {
        Some(own) if own.same_as(ctx) => Ok(raw),
        _ => Err(NoiseGraphError::ForeignHandle),
    }
}
