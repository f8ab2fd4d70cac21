//! Base64 tree encoding.
//!
//! ```text
//! node    := kind:u16le variable* lookup* hybrid*
//! variable:= 4 bytes LE (f32 for float members, i32 for int and enum members)
//! lookup  := node
//! hybrid  := 0x00 f32le | 0x01 node
//! ```
//!
//! Member counts come from the kind table, so the stream carries no lengths.
//! Decoding consumes the whole input; trailing bytes are an error.

use std::fmt;

use base64::{engine::general_purpose, Engine as _};

use crate::kinds::{Kind, VarTy};
use crate::node::{read, Hybrid, NodeCell, Scalar, SoftNode};

const HYBRID_CONSTANT: u8 = 0;
const HYBRID_NODE: u8 = 1;
const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DecodeError {
    Base64(String),
    UnexpectedEnd,
    UnknownKind(u16),
    BadHybridTag(u8),
    InvalidValue(String),
    TrailingBytes(usize),
    TooDeep,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Base64(e) => write!(f, "invalid base64: {e}"),
            DecodeError::UnexpectedEnd => f.write_str("unexpected end of input"),
            DecodeError::UnknownKind(id) => write!(f, "unknown node kind id {id}"),
            DecodeError::BadHybridTag(tag) => write!(f, "invalid hybrid tag {tag}"),
            DecodeError::InvalidValue(reason) => f.write_str(reason),
            DecodeError::TrailingBytes(n) => write!(f, "{n} trailing bytes after the root node"),
            DecodeError::TooDeep => write!(f, "node tree deeper than {MAX_DEPTH}"),
        }
    }
}

pub(crate) fn decode(encoded: &str) -> Result<NodeCell, DecodeError> {
    let bytes = general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| DecodeError::Base64(e.to_string()))?;
    let mut reader = Reader { bytes: &bytes, pos: 0 };
    let root = reader.node(0)?;
    let rest = bytes.len() - reader.pos;
    if rest != 0 {
        return Err(DecodeError::TrailingBytes(rest));
    }
    Ok(root)
}

/// `None` when some node lookup in the tree is unset.
pub(crate) fn encode(cell: &NodeCell) -> Option<String> {
    let mut out = Vec::new();
    write_node(cell, &mut out)?;
    Some(general_purpose::STANDARD.encode(out))
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let end = self.pos.checked_add(N).ok_or(DecodeError::UnexpectedEnd)?;
        let slice = self.bytes.get(self.pos..end).ok_or(DecodeError::UnexpectedEnd)?;
        let mut buf = [0u8; N];
        buf.copy_from_slice(slice);
        self.pos = end;
        Ok(buf)
    }

    fn node(&mut self, depth: usize) -> Result<NodeCell, DecodeError> {
        if depth > MAX_DEPTH {
            return Err(DecodeError::TooDeep);
        }
        let id = u16::from_le_bytes(self.take()?);
        let kind = Kind::from_id(u32::from(id)).ok_or(DecodeError::UnknownKind(id))?;
        let spec = kind.spec();
        let mut node = SoftNode::new(kind);

        for (index, var) in spec.variables.iter().enumerate() {
            let raw: [u8; 4] = self.take()?;
            let applied = match var.ty {
                VarTy::Float { .. } => node.set_float(index, f32::from_le_bytes(raw)),
                VarTy::Int { .. } | VarTy::Enum { .. } => node.set_int(index, i32::from_le_bytes(raw)),
            };
            applied.map_err(|fault| DecodeError::InvalidValue(fault.0))?;
        }
        for index in 0..spec.lookups.len() {
            let child = self.node(depth + 1)?;
            node.lookups[index] = Some(child);
        }
        for index in 0..spec.hybrids.len() {
            let [tag]: [u8; 1] = self.take()?;
            let value = match tag {
                HYBRID_CONSTANT => Hybrid::Constant(f32::from_le_bytes(self.take()?)),
                HYBRID_NODE => Hybrid::Node(self.node(depth + 1)?),
                other => return Err(DecodeError::BadHybridTag(other)),
            };
            node.set_hybrid(index, value)
                .map_err(|fault| DecodeError::InvalidValue(fault.0))?;
        }
        Ok(node.into_cell())
    }
}

fn write_node(cell: &NodeCell, out: &mut Vec<u8>) -> Option<()> {
    let node = read(cell);
    out.extend_from_slice(&node.kind.id().to_le_bytes());
    for var in &node.variables {
        match var {
            Scalar::Float(v) => out.extend_from_slice(&v.to_le_bytes()),
            Scalar::Int(v) => out.extend_from_slice(&v.to_le_bytes()),
        }
    }
    for lookup in &node.lookups {
        write_node(lookup.as_ref()?, out)?;
    }
    for hybrid in &node.hybrids {
        match hybrid {
            Hybrid::Constant(v) => {
                out.push(HYBRID_CONSTANT);
                out.extend_from_slice(&v.to_le_bytes());
            }
            Hybrid::Node(child) => {
                out.push(HYBRID_NODE);
                write_node(child, out)?;
            }
        }
    }
    Some(())
}
