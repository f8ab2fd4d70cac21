//! Client side of a node-based noise engine: discovers node kinds from a
//! compute backend, binds typed parameters by name, and drives field
//! generation plus bounds-tracked normalization.

pub mod backend;
pub mod binder;
pub mod bounds;
pub mod config;
pub mod context;
pub mod error;
pub mod field;
pub mod generate;
pub mod handle;
pub mod normalize;
pub mod registry;
pub mod schema;
pub mod types;

pub use backend::{ComputeBackend, RawKindInfo, RawMember, RawVariable};
pub use binder::{HybridInput, MemberValue};
pub use bounds::{BoundsState, BoundsTracker, NormalizeTransform, OutputMinMax};
pub use config::{Config, GenerationConfig, NormalizeConfig};
pub use context::NoiseContext;
pub use error::{BackendFault, NoiseGraphError, Result};
pub use field::{Field2D, Field3D, Field4D, FieldBuffer};
pub use generate::Geometry;
pub use handle::NodeHandle;
pub use normalize::{apply_transform, normalize, normalize_field};
pub use registry::TypeRegistry;
pub use schema::{format_dimension_member, format_lookup, MemberDescriptor, NodeKindDescriptor};
pub use types::*;
