//! Owned references to backend node instances.

use std::fmt;
use std::hash::{Hash, Hasher};

use log::debug;

use crate::context::NoiseContext;
use crate::error::{NoiseGraphError, Result};
use crate::schema::NodeKindDescriptor;
use crate::types::{KindId, NodeRef, SimdLevel};

/// Exclusively-owned reference to one backend node.
///
/// A valid handle frees its backend instance exactly once when dropped. The
/// invalid handle (see [`NodeHandle::invalid`]) owns nothing and every
/// operation on it fails with [`NoiseGraphError::InvalidHandle`].
///
/// Equality and hashing only look at the backend reference and kind id.
pub struct NodeHandle {
    raw: Option<NodeRef>,
    kind: Option<KindId>,
    ctx: Option<NoiseContext>,
}

impl NodeHandle {
    pub(crate) fn from_parts(raw: NodeRef, kind: KindId, ctx: NoiseContext) -> Self {
        NodeHandle {
            raw: Some(raw),
            kind: Some(kind),
            ctx: Some(ctx),
        }
    }

    pub fn invalid() -> Self {
        NodeHandle {
            raw: None,
            kind: None,
            ctx: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.raw.is_some()
    }

    pub fn kind(&self) -> Option<KindId> {
        self.kind
    }

    pub fn node_ref(&self) -> Option<NodeRef> {
        self.raw
    }

    pub fn context(&self) -> Option<&NoiseContext> {
        self.ctx.as_ref()
    }

    pub(crate) fn live(&self) -> Result<(NodeRef, KindId, &NoiseContext)> {
        match (self.raw, self.kind, self.ctx.as_ref()) {
            (Some(raw), Some(kind), Some(ctx)) => Ok((raw, kind, ctx)),
            _ => Err(NoiseGraphError::InvalidHandle),
        }
    }

    pub fn descriptor(&self) -> Result<&NodeKindDescriptor> {
        let (_, kind, ctx) = self.live()?;
        ctx.registry().describe(kind)
    }

    pub fn kind_name(&self) -> Result<&str> {
        self.descriptor().map(|d| d.name.as_str())
    }

    /// Backend encoding of the tree rooted at this node, when the backend can
    /// produce one.
    pub fn encode(&self) -> Result<Option<String>> {
        let (raw, _, ctx) = self.live()?;
        Ok(ctx.backend().encode(raw))
    }

    pub fn simd_level(&self) -> Result<SimdLevel> {
        let (raw, _, ctx) = self.live()?;
        Ok(ctx.backend().simd_level(raw))
    }

    /// Release the backend instance now instead of at end of scope.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for NodeHandle {
    fn drop(&mut self) {
        if let (Some(raw), Some(ctx)) = (self.raw.take(), self.ctx.as_ref()) {
            debug!("releasing node {}", raw.get());
            ctx.backend().release(raw);
        }
    }
}

impl Default for NodeHandle {
    fn default() -> Self {
        Self::invalid()
    }
}

impl PartialEq for NodeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw && self.kind == other.kind
    }
}

impl Eq for NodeHandle {}

impl Hash for NodeHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
        self.kind.hash(state);
    }
}

impl fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.raw, self.kind) {
            (Some(raw), Some(kind)) => f
                .debug_struct("NodeHandle")
                .field("node", &raw.get())
                .field("kind", &kind)
                .finish(),
            _ => f.write_str("NodeHandle(invalid)"),
        }
    }
}
