//! # ECS Error Types
//!
//! Contract violations surfaced as values instead of aborts.

use thiserror::Error;

use super::entity::EntityId;

/// Misuse of the registry API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// The entity pool has no free handles left.
    #[error("entity pool exhausted: all {0} slots in use")]
    PoolExhausted(usize),

    /// The pool size cannot hold a single entity or overflows the index.
    #[error("invalid entity pool capacity: {0}")]
    InvalidCapacity(usize),

    /// The handle was never issued, or was destroyed since.
    #[error("entity {0} is not alive")]
    StaleEntity(EntityId),

    /// A component type was used before `register_component`.
    #[error("component type {0} is not registered")]
    UnregisteredComponent(&'static str),

    /// The entity already holds an instance of this component type.
    #[error("entity {entity} already has component {component}")]
    DuplicateComponent {
        /// The entity.
        entity: EntityId,
        /// The component type name.
        component: &'static str,
    },

    /// The entity does not hold this component type.
    #[error("entity {entity} has no component {component}")]
    MissingComponent {
        /// The entity.
        entity: EntityId,
        /// The component type name.
        component: &'static str,
    },
}

/// Result type for registry operations.
pub type EcsResult<T> = Result<T, EcsError>;
