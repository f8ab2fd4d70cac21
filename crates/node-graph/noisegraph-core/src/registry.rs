//! Immutable node type registry discovered from the compute backend.

use hashbrown::HashMap;
use indexmap::IndexMap;
use log::debug;
use serde::Serialize;

use crate::backend::{ComputeBackend, RawKindInfo, RawMember};
use crate::error::{NoiseGraphError, Result};
use crate::schema::{format_dimension_member, format_lookup, MemberDescriptor, NodeKindDescriptor};
use crate::types::{KindId, MemberKind, VariableType};

/// Name → descriptor tables for every node kind the backend exposes.
///
/// Built once per backend and never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct TypeRegistry {
    kinds: Vec<NodeKindDescriptor>,
    #[serde(skip)]
    by_name: HashMap<String, KindId>,
}

impl TypeRegistry {
    /// Query the backend's reflection data and build the lookup tables.
    pub fn load(backend: &dyn ComputeBackend) -> Result<Self> {
        let count = backend.kind_count();
        let mut infos = Vec::with_capacity(count);
        for kind in 0..count {
            let info = backend.describe_kind(kind).ok_or_else(|| {
                NoiseGraphError::RegistryLoad(format!(
                    "backend reported {count} kinds but has no description for kind {kind}"
                ))
            })?;
            infos.push(info);
        }
        let registry = Self::from_raw(infos)?;
        debug!("loaded node registry with {} kinds", registry.len());
        Ok(registry)
    }

    /// Build from already-collected reflection data; `infos[i]` describes kind `i`.
    pub fn from_raw(infos: Vec<RawKindInfo>) -> Result<Self> {
        let mut kinds = Vec::with_capacity(infos.len());
        let mut by_name = HashMap::with_capacity(infos.len());

        for (i, info) in infos.into_iter().enumerate() {
            let id = KindId(u32::try_from(i).map_err(|_| {
                NoiseGraphError::RegistryLoad("too many node kinds".to_string())
            })?);
            let descriptor = build_descriptor(id, info)?;
            if by_name.insert(descriptor.name.clone(), id).is_some() {
                return Err(NoiseGraphError::RegistryLoad(format!(
                    "duplicate node kind name '{}'",
                    descriptor.name
                )));
            }
            kinds.push(descriptor);
        }

        Ok(TypeRegistry { kinds, by_name })
    }

    pub fn lookup(&self, kind_name: &str) -> Result<KindId> {
        self.by_name
            .get(&format_lookup(kind_name))
            .copied()
            .ok_or_else(|| NoiseGraphError::UnknownKind {
                name: kind_name.to_string(),
            })
    }

    pub fn describe(&self, id: KindId) -> Result<&NodeKindDescriptor> {
        self.kinds
            .get(id.index())
            .ok_or(NoiseGraphError::UnknownKindId { id })
    }

    pub fn contains(&self, id: KindId) -> bool {
        id.index() < self.kinds.len()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeKindDescriptor> {
        self.kinds.iter()
    }
}

fn build_descriptor(id: KindId, info: RawKindInfo) -> Result<NodeKindDescriptor> {
    let name = format_lookup(&info.name);
    if name.is_empty() {
        return Err(NoiseGraphError::RegistryLoad(format!("kind {id} has an empty name")));
    }

    let mut members: IndexMap<String, MemberDescriptor> = IndexMap::with_capacity(
        info.variables.len() + info.node_lookups.len() + info.hybrids.len(),
    );

    for (index, var) in info.variables.iter().enumerate() {
        let member_name = member_name(&name, &var.name, var.dimension)?;
        let enum_values = match var.ty {
            VariableType::Enum => {
                if var.enum_names.is_empty() {
                    return Err(NoiseGraphError::RegistryLoad(format!(
                        "enum member '{member_name}' of '{name}' has no values"
                    )));
                }
                let mut values = IndexMap::with_capacity(var.enum_names.len());
                for (ordinal, enum_name) in var.enum_names.iter().enumerate() {
                    let ordinal = i32::try_from(ordinal).map_err(|_| {
                        NoiseGraphError::RegistryLoad(format!("enum '{member_name}' too large"))
                    })?;
                    values.insert(format_lookup(enum_name), ordinal);
                }
                Some(values)
            }
            VariableType::Float | VariableType::Int => None,
        };
        insert_member(
            &name,
            &mut members,
            MemberDescriptor {
                name: member_name,
                kind: var.ty.into(),
                index,
                enum_values,
            },
        )?;
    }

    for (group, kind) in [
        (&info.node_lookups, MemberKind::NodeLookup),
        (&info.hybrids, MemberKind::Hybrid),
    ] {
        for (index, RawMember { name: raw, dimension }) in group.iter().enumerate() {
            let member_name = member_name(&name, raw, *dimension)?;
            insert_member(
                &name,
                &mut members,
                MemberDescriptor {
                    name: member_name,
                    kind,
                    index,
                    enum_values: None,
                },
            )?;
        }
    }

    Ok(NodeKindDescriptor {
        id,
        name,
        display_name: info.name,
        members,
    })
}

fn member_name(kind: &str, raw: &str, dimension: Option<u8>) -> Result<String> {
    format_dimension_member(&format_lookup(raw), dimension).ok_or_else(|| {
        NoiseGraphError::RegistryLoad(format!(
            "member '{raw}' of '{kind}' has dimension index {dimension:?} outside x/y/z/w"
        ))
    })
}

fn insert_member(
    kind: &str,
    members: &mut IndexMap<String, MemberDescriptor>,
    member: MemberDescriptor,
) -> Result<()> {
    if members.contains_key(&member.name) {
        return Err(NoiseGraphError::RegistryLoad(format!(
            "duplicate member '{}' on '{kind}'",
            member.name
        )));
    }
    members.insert(member.name.clone(), member);
    Ok(())
}
