use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU64;

/// Identifier of a node kind as numbered by the compute backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KindId(pub u32);

impl KindId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for KindId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque reference to a backend-resident node instance. Never null; the
/// absence of a reference is expressed with `Option<NodeRef>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef(NonZeroU64);

impl NodeRef {
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(NodeRef)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }
}

/// Capability level reported by the backend for a generation call.
pub type SimdLevel = u32;

/// Level reported by backends that do no vector dispatch.
pub const SIMD_SCALAR: SimdLevel = 0;

/// Type tag of a settable member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    Float,
    Int,
    Enum,
    #[serde(rename = "node")]
    NodeLookup,
    Hybrid,
}

impl MemberKind {
    /// Which backend member group (and therefore index space) a member lives in.
    pub fn group(self) -> MemberGroup {
        match self {
            MemberKind::Float | MemberKind::Int | MemberKind::Enum => MemberGroup::Variable,
            MemberKind::NodeLookup => MemberGroup::NodeLookup,
            MemberKind::Hybrid => MemberGroup::Hybrid,
        }
    }
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MemberKind::Float => "float",
            MemberKind::Int => "int",
            MemberKind::Enum => "enum",
            MemberKind::NodeLookup => "node lookup",
            MemberKind::Hybrid => "hybrid",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberGroup {
    Variable,
    NodeLookup,
    Hybrid,
}

/// Value type of a plain backend variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    Float,
    Int,
    Enum,
}

impl From<VariableType> for MemberKind {
    fn from(ty: VariableType) -> Self {
        match ty {
            VariableType::Float => MemberKind::Float,
            VariableType::Int => MemberKind::Int,
            VariableType::Enum => MemberKind::Enum,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_node_ref_is_rejected() {
        assert!(NodeRef::new(0).is_none());
        assert_eq!(NodeRef::new(7).map(NodeRef::get), Some(7));
    }

    #[test]
    fn member_kinds_map_to_groups() {
        assert_eq!(MemberKind::Enum.group(), MemberGroup::Variable);
        assert_eq!(MemberKind::NodeLookup.group(), MemberGroup::NodeLookup);
        assert_eq!(MemberKind::Hybrid.group(), MemberGroup::Hybrid);
    }
}
