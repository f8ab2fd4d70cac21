use thiserror::Error;

use crate::types::{KindId, MemberKind};

/// Errors produced by the registry, binder, generation engine and
/// normalization pipeline.
///
/// Decoding an unparsable blob is not represented here: `decode` hands back
/// the invalid handle instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NoiseGraphError {
    #[error("unknown node kind '{name}'")]
    UnknownKind { name: String },
    #[error("unknown node kind id {id}")]
    UnknownKindId { id: KindId },
    #[error("node kind '{kind}' has no member '{member}'")]
    UnknownMember { kind: String, member: String },
    #[error("member '{member}' has no enum value '{value}'")]
    UnknownEnumValue { member: String, value: String },
    #[error("member '{member}' is a {expected} member and cannot be set to {found}")]
    TypeMismatch {
        member: String,
        expected: MemberKind,
        found: &'static str,
    },
    #[error("backend rejected {operation}: {reason}")]
    BackendRejected { operation: String, reason: String },
    #[error("operation attempted on the invalid node handle")]
    InvalidHandle,
    #[error("node handle belongs to a different backend context")]
    ForeignHandle,
    #[error("output buffer holds {actual} elements, extent requires {expected}")]
    BufferLength { expected: usize, actual: usize },
    #[error("position array for axis {axis} holds {actual} elements, expected {expected}")]
    PositionArrayLength {
        axis: usize,
        expected: usize,
        actual: usize,
    },
    #[error("position offset has {actual} components for {axes} coordinate axes")]
    OffsetLength { axes: usize, actual: usize },
    #[error("requested extent overflows the addressable element count")]
    ExtentOverflow,
    #[error("{0}-dimensional sampling is not supported, expected 2, 3 or 4 axes")]
    UnsupportedDimension(usize),
    #[error("failed to load node registry: {0}")]
    RegistryLoad(String),
    #[error("bounds tracker has not been widened by any generation call")]
    EmptyBounds,
    #[error("bounds tracker is already optimised; reset it before reuse")]
    BoundsAlreadyOptimised,
    #[error("bounds tracker has not been optimised")]
    BoundsNotOptimised,
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, NoiseGraphError>;

/// Failure reported by a compute backend while applying or evaluating a
/// request that already passed client-side validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct BackendFault(pub String);

impl BackendFault {
    pub fn new(reason: impl Into<String>) -> Self {
        BackendFault(reason.into())
    }

    pub(crate) fn into_error(self, operation: impl Into<String>) -> NoiseGraphError {
        NoiseGraphError::BackendRejected {
            operation: operation.into(),
            reason: self.0,
        }
    }
}
