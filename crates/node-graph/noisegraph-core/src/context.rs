//! Shared entry point binding a compute backend to its discovered registry.

use std::fmt;
use std::sync::Arc;

use log::{debug, warn};

use crate::backend::ComputeBackend;
use crate::config::Config;
use crate::error::{NoiseGraphError, Result};
use crate::handle::NodeHandle;
use crate::registry::TypeRegistry;

struct ContextInner {
    backend: Arc<dyn ComputeBackend>,
    registry: TypeRegistry,
    config: Config,
}

/// Cheap-to-clone handle on a backend plus the registry loaded from it.
///
/// The registry is queried exactly once, when the context is created, and
/// is read-only afterwards.
#[derive(Clone)]
pub struct NoiseContext {
    inner: Arc<ContextInner>,
}

impl NoiseContext {
    pub fn new<B: ComputeBackend + 'static>(backend: B) -> Result<Self> {
        Self::with_config(backend, Config::default())
    }

    pub fn with_config<B: ComputeBackend + 'static>(backend: B, config: Config) -> Result<Self> {
        Self::from_shared(Arc::new(backend), config)
    }

    pub fn from_shared(backend: Arc<dyn ComputeBackend>, config: Config) -> Result<Self> {
        config.validate()?;
        let registry = TypeRegistry::load(backend.as_ref())?;
        Ok(NoiseContext {
            inner: Arc::new(ContextInner {
                backend,
                registry,
                config,
            }),
        })
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.inner.registry
    }

    pub fn backend(&self) -> &dyn ComputeBackend {
        self.inner.backend.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Allocate a fresh backend node of the named kind.
    pub fn create(&self, kind_name: &str) -> Result<NodeHandle> {
        let kind = self.registry().lookup(kind_name)?;
        let raw = self
            .backend()
            .new_node(kind)
            .ok_or_else(|| NoiseGraphError::BackendRejected {
                operation: format!("allocate '{kind_name}'"),
                reason: "backend returned no node".to_string(),
            })?;
        debug!("created node {} of kind {}", raw.get(), kind);
        Ok(NodeHandle::from_parts(raw, kind, self.clone()))
    }

    /// Instantiate an encoded node tree.
    ///
    /// Returns the invalid handle when the backend cannot parse `encoded` or
    /// reports a kind this registry does not know; callers check
    /// [`NodeHandle::is_valid`].
    pub fn decode(&self, encoded: &str) -> NodeHandle {
        let Some(raw) = self.backend().decode(encoded) else {
            debug!("encoded node tree rejected by backend");
            return NodeHandle::invalid();
        };
        match self.backend().kind_of(raw) {
            Some(kind) if self.registry().contains(kind) => {
                debug!("decoded node {} of kind {}", raw.get(), kind);
                NodeHandle::from_parts(raw, kind, self.clone())
            }
            other => {
                warn!("decoded node reports unregistered kind {other:?}; releasing it");
                self.backend().release(raw);
                NodeHandle::invalid()
            }
        }
    }

    pub(crate) fn same_as(&self, other: &NoiseContext) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for NoiseContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoiseContext")
            .field("kinds", &self.inner.registry.len())
            .field("config", &self.inner.config)
            .finish()
    }
}
