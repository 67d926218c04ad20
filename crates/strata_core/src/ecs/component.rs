//! # Component System
//!
//! Components are pure data containers with no behavior. Each type gets its
//! own sparse-set store inside the registry.

use bytemuck::{Pod, Zeroable};

/// Marker trait for ECS components.
///
/// Any owned value type qualifies. Implement it explicitly so that only
/// types meant to live in the registry can be stored there.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone, Copy, Default)]
/// struct Health(u32);
///
/// impl Component for Health {}
/// ```
pub trait Component: Send + 'static {}

/// Position component for entities.
///
/// World position in pixel units. The world manager derives the streaming
/// centre of a player from it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Position {
    /// X coordinate in world space.
    pub x: f32,
    /// Y coordinate in world space.
    pub y: f32,
}

impl Component for Position {}

impl Position {
    /// Creates a new position.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Returns the squared distance to another position.
    #[inline]
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Tag for entities that belong to an evicted chunk.
///
/// Gameplay systems skip tagged entities; they are not destroyed and get
/// their tag cleared when the chunk is streamed back in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Inactive;

impl Component for Inactive {}
