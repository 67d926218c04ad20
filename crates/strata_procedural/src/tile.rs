//! # Tiles
//!
//! The smallest addressable world cell. Tiles are plain data owned by their
//! chunk; entity references inside them are weak (checked against the
//! registry before use).

use strata_core::EntityId;

use crate::chunk::TILE_SIZE;

/// Terrain type of a tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TileType {
    /// Not generated / unknown.
    #[default]
    Invalid = 0,
    /// Bare dirt.
    Dirt = 1,
    /// Grassland.
    Grass = 2,
    /// Water, never buildable.
    Water = 3,
    /// Rock.
    Stone = 4,
}

impl TileType {
    /// Whether buildings may stand on this terrain.
    #[inline]
    #[must_use]
    pub const fn is_buildable(self) -> bool {
        !matches!(self, Self::Invalid | Self::Water)
    }

    /// Converts from the wire byte; unknown values map to `Invalid`.
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Dirt,
            2 => Self::Grass,
            3 => Self::Water,
            4 => Self::Stone,
            _ => Self::Invalid,
        }
    }
}

/// A single world cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tile {
    /// Terrain type.
    pub kind: TileType,
    /// Building standing on this tile, or `EntityId::INVALID`.
    pub occupying_entity: EntityId,
    /// Resource node generated on this tile, or `EntityId::INVALID`.
    pub ore_entity: EntityId,
}

impl Tile {
    /// Creates an unoccupied tile of the given terrain.
    #[inline]
    #[must_use]
    pub const fn new(kind: TileType) -> Self {
        Self {
            kind,
            occupying_entity: EntityId::INVALID,
            ore_entity: EntityId::INVALID,
        }
    }

    /// Whether a building occupies this tile.
    #[inline]
    #[must_use]
    pub const fn is_occupied(&self) -> bool {
        !self.occupying_entity.is_invalid()
    }

    /// Whether a resource node sits on this tile.
    #[inline]
    #[must_use]
    pub const fn has_ore(&self) -> bool {
        !self.ore_entity.is_invalid()
    }
}

/// World tile coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileIndex {
    /// X coordinate in tiles.
    pub x: i32,
    /// Y coordinate in tiles.
    pub y: i32,
}

impl TileIndex {
    /// Creates a tile index.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The tile containing a world pixel position (floors toward -inf).
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_world_pos(world_x: f32, world_y: f32) -> Self {
        Self {
            x: (world_x / TILE_SIZE).floor() as i32,
            y: (world_y / TILE_SIZE).floor() as i32,
        }
    }

    /// World pixel position of the tile's centre.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn world_center(self) -> (f32, f32) {
        (
            (self.x as f32 + 0.5) * TILE_SIZE,
            (self.y as f32 + 0.5) * TILE_SIZE,
        )
    }

    /// Offsets the index by whole tiles.
    ///
    /// Returns `None` if either axis leaves the `i32` tile range.
    #[inline]
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Option<Self> {
        match (self.x.checked_add(dx), self.y.checked_add(dy)) {
            (Some(x), Some(y)) => Some(Self { x, y }),
            _ => None,
        }
    }
}
