//! Descriptors for node kinds and their settable members.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::{KindId, MemberKind};

const DIMENSION_SUFFIX: [char; 4] = ['x', 'y', 'z', 'w'];

/// Canonical lookup key: whitespace removed, lower-cased. Makes kind, member
/// and enum names insensitive to case and spacing.
pub fn format_lookup(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Append the vector component suffix for `dimension`, if any.
///
/// Returns `None` for a dimension index outside `0..=3`.
pub fn format_dimension_member(name: &str, dimension: Option<u8>) -> Option<String> {
    match dimension {
        None => Some(name.to_string()),
        Some(d) => {
            let suffix = DIMENSION_SUFFIX.get(d as usize)?;
            let mut out = String::with_capacity(name.len() + 1);
            out.push_str(name);
            out.push(*suffix);
            Some(out)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberDescriptor {
    /// Canonical name including any dimension suffix.
    pub name: String,
    pub kind: MemberKind,
    /// Position within the member's group, as passed to the backend setters.
    pub index: usize,
    /// Canonical enum name → ordinal, present (and non-empty) for enum members only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<IndexMap<String, i32>>,
}

impl MemberDescriptor {
    pub fn enum_ordinal(&self, value: &str) -> Option<i32> {
        self.enum_values
            .as_ref()
            .and_then(|values| values.get(&format_lookup(value)).copied())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeKindDescriptor {
    pub id: KindId,
    /// Canonical (lookup) name.
    pub name: String,
    /// Name as reported by the backend.
    pub display_name: String,
    /// Members in backend order: variables, then node lookups, then hybrids.
    pub members: IndexMap<String, MemberDescriptor>,
}

impl NodeKindDescriptor {
    /// Find a member by any spelling of its name.
    pub fn member(&self, name: &str) -> Option<&MemberDescriptor> {
        self.members.get(&format_lookup(name))
    }

    pub fn members_of(&self, kind: MemberKind) -> impl Iterator<Item = &MemberDescriptor> {
        self.members.values().filter(move |m| m.kind == kind)
    }
}
