//! # STRATA Core Engine
//!
//! Sparse-set Entity Component System (ECS) designed for:
//! - O(1) component add, remove and lookup
//! - Multi-component views seeded from the smallest store
//! - Generational handles that cannot alias a reissued entity
//!
//! ## Architecture Rules
//!
//! 1. **Single owner** - one simulation thread owns the [`Registry`]
//! 2. **Data-oriented design** - components are stored in packed arrays
//! 3. **Contract-checked** - misuse returns [`EcsError`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use strata_core::{Registry, Position};
//!
//! let mut registry = Registry::new(100_000)?;
//! registry.register_component::<Position>();
//! let player = registry.create_entity()?;
//! registry.add_component(player, Position::new(0.0, 0.0))?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod ecs;

pub use ecs::{
    Component, ComponentSet, ComponentStore, EcsError, EcsResult, EntityAllocator, EntityId,
    ErasedStore, Inactive, Position, Registry, DEFAULT_MAX_ENTITIES,
};
