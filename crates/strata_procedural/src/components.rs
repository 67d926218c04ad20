//! # World Components
//!
//! Components the world manager writes into the registry: resource nodes
//! and chunk visuals at generation time, building footprints at placement.

use strata_core::Component;

use crate::chunk::ChunkCoord;
use crate::tile::TileIndex;

/// Ore carried by a resource node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OreType {
    /// Iron ore.
    Iron = 0,
    /// Copper ore.
    Copper = 1,
    /// Coal.
    Coal = 2,
    /// Gold ore.
    Gold = 3,
}

impl OreType {
    /// Number of ore types.
    pub const COUNT: u32 = 4;

    /// Converts from an index in `[0, COUNT)`; out-of-range wraps.
    #[must_use]
    pub const fn from_index(index: u32) -> Self {
        match index % Self::COUNT {
            0 => Self::Iron,
            1 => Self::Copper,
            2 => Self::Coal,
            _ => Self::Gold,
        }
    }
}

/// Footprint of a placed building.
///
/// `occupied_tiles` is exactly the set of tiles the world manager marked,
/// used later to release them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildingComponent {
    /// Footprint width in tiles.
    pub width: u32,
    /// Footprint height in tiles.
    pub height: u32,
    /// Tiles this building occupies.
    pub occupied_tiles: Vec<TileIndex>,
}

impl Component for BuildingComponent {}

/// A minable deposit generated with the terrain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceNodeComponent {
    /// Units left before the node is depleted.
    pub remaining_amount: u32,
    /// What the node yields.
    pub ore_type: OreType,
}

impl Component for ResourceNodeComponent {}

/// Marks the entity that renders a whole chunk as one batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkVisual {
    /// The chunk this visual belongs to.
    pub coord: ChunkCoord,
}

impl Component for ChunkVisual {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ore_type_from_index() {
        assert_eq!(OreType::from_index(0), OreType::Iron);
        assert_eq!(OreType::from_index(3), OreType::Gold);
        assert_eq!(OreType::from_index(5), OreType::Copper);
    }
}
