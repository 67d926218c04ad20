//! # Entity Component System
//!
//! A sparse-set ECS designed for one simulation thread.
//!
//! ## Design Philosophy
//!
//! - Entity IDs are indices with generation counters
//! - Each component type lives in its own densely packed store
//! - Dynamic dispatch only at the type-erased store seam
//! - Misuse is reported as [`EcsError`], never by corrupting state

mod component;
mod entity;
mod error;
mod registry;
mod storage;
mod view;

pub use component::{Component, Inactive, Position};
pub use entity::{EntityAllocator, EntityId, DEFAULT_MAX_ENTITIES};
pub use error::{EcsError, EcsResult};
pub use registry::Registry;
pub use storage::{ComponentStore, ErasedStore};
pub use view::ComponentSet;
