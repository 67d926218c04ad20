//! # Chunk System
//!
//! World data is organized into fixed-size chunks for:
//! - Bounded per-tick streaming work
//! - Batched rendering (one visual entity per chunk)
//! - Keeping generated state in memory across eviction
//!
//! ## Coordinates
//!
//! Chunk `c` covers world tiles `[c * SIZE, c * SIZE + SIZE)` on each axis.
//! Tile-to-chunk conversion uses Euclidean division so negative tiles land
//! in negative chunks (`-1 -> -1`, not `0`).
//!
//! Only chunks between [`ChunkCoord::MIN`] and [`ChunkCoord::MAX`] exist:
//! those are exactly the chunks whose tiles fit in an `i32` [`TileIndex`].

use strata_core::EntityId;

use crate::tile::{Tile, TileIndex};

/// Chunk width in tiles.
pub const CHUNK_WIDTH: usize = 32;

/// Chunk height in tiles.
pub const CHUNK_HEIGHT: usize = 32;

/// Total tiles per chunk.
pub const TILES_PER_CHUNK: usize = CHUNK_WIDTH * CHUNK_HEIGHT;

/// Tile edge length in world pixels.
pub const TILE_SIZE: f32 = 32.0;

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
const WIDTH_I32: i32 = CHUNK_WIDTH as i32;
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
const HEIGHT_I32: i32 = CHUNK_HEIGHT as i32;

/// Chunk coordinate (identifies a chunk in the world grid).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    /// X coordinate (in chunks, not tiles).
    pub x: i32,
    /// Y coordinate (in chunks, not tiles).
    pub y: i32,
}

impl ChunkCoord {
    /// Lowest chunk on both axes.
    pub const MIN: Self = Self {
        x: i32::MIN.div_euclid(WIDTH_I32),
        y: i32::MIN.div_euclid(HEIGHT_I32),
    };

    /// Highest chunk on both axes.
    pub const MAX: Self = Self {
        x: i32::MAX.div_euclid(WIDTH_I32),
        y: i32::MAX.div_euclid(HEIGHT_I32),
    };

    /// Creates a new chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The chunk containing a world tile.
    #[inline]
    #[must_use]
    pub const fn from_tile_index(tile: TileIndex) -> Self {
        Self {
            x: tile.x.div_euclid(WIDTH_I32),
            y: tile.y.div_euclid(HEIGHT_I32),
        }
    }

    /// The chunk containing a world pixel position.
    #[inline]
    #[must_use]
    pub fn from_world_pos(world_x: f32, world_y: f32) -> Self {
        Self::from_tile_index(TileIndex::from_world_pos(world_x, world_y))
    }

    /// Whether every tile of this chunk is addressable.
    #[inline]
    #[must_use]
    pub const fn is_in_world(self) -> bool {
        self.x >= Self::MIN.x
            && self.x <= Self::MAX.x
            && self.y >= Self::MIN.y
            && self.y <= Self::MAX.y
    }

    /// The chunk `(dx, dy)` chunks away, or `None` outside the world.
    #[inline]
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Option<Self> {
        match (self.x.checked_add(dx), self.y.checked_add(dy)) {
            (Some(x), Some(y)) if Self::new(x, y).is_in_world() => Some(Self { x, y }),
            _ => None,
        }
    }

    /// World tile of the chunk's origin corner.
    ///
    /// Saturates for chunks outside the world; check [`Self::is_in_world`]
    /// before generating.
    #[inline]
    #[must_use]
    pub const fn origin(self) -> TileIndex {
        TileIndex::new(self.x.saturating_mul(WIDTH_I32), self.y.saturating_mul(HEIGHT_I32))
    }

    /// Box (Chebyshev) distance in chunks.
    #[inline]
    #[must_use]
    pub const fn chebyshev_distance(self, other: Self) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        if dx > dy { dx } else { dy }
    }

    /// Local coordinates of a world tile inside this chunk.
    ///
    /// Returns `None` if the tile belongs to another chunk.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn local_tile_coords(self, tile: TileIndex) -> Option<(usize, usize)> {
        let owner = Self::from_tile_index(tile);
        if owner.x != self.x || owner.y != self.y {
            return None;
        }
        Some((
            tile.x.rem_euclid(WIDTH_I32) as usize,
            tile.y.rem_euclid(HEIGHT_I32) as usize,
        ))
    }

    /// World tile of a local coordinate pair.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub const fn tile_index_of_local(self, local_x: usize, local_y: usize) -> TileIndex {
        let origin = self.origin();
        TileIndex::new(
            origin.x.saturating_add(local_x as i32),
            origin.y.saturating_add(local_y as i32),
        )
    }
}

impl std::fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{},{}]", self.x, self.y)
    }
}

/// A chunk of world data.
///
/// Contains a `CHUNK_WIDTH x CHUNK_HEIGHT` grid of tiles plus metadata.
#[derive(Clone)]
pub struct Chunk {
    /// Chunk position in the world.
    coord: ChunkCoord,
    /// Tile data (indexed as [y][x]).
    tiles: Box<[[Tile; CHUNK_WIDTH]; CHUNK_HEIGHT]>,
    /// Entity used to render the chunk as one batch.
    visual_entity: EntityId,
    /// Whether tile data changed since the renderer last looked.
    dirty: bool,
}

impl Chunk {
    /// Creates a chunk of `Invalid` tiles at the given coordinates.
    #[must_use]
    pub fn new(coord: ChunkCoord) -> Self {
        Self {
            coord,
            tiles: Box::new([[Tile::default(); CHUNK_WIDTH]; CHUNK_HEIGHT]),
            visual_entity: EntityId::INVALID,
            dirty: true,
        }
    }

    /// Chunk position in the world.
    #[inline]
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Gets a tile at local coordinates.
    #[inline]
    #[must_use]
    pub fn tile(&self, local_x: usize, local_y: usize) -> Option<&Tile> {
        self.tiles.get(local_y).and_then(|row| row.get(local_x))
    }

    /// Gets a tile at local coordinates for mutation and marks the chunk dirty.
    #[inline]
    pub fn tile_mut(&mut self, local_x: usize, local_y: usize) -> Option<&mut Tile> {
        let tile = self.tiles.get_mut(local_y).and_then(|row| row.get_mut(local_x))?;
        self.dirty = true;
        Some(tile)
    }

    /// Gets the tile at a world tile index, if it belongs to this chunk.
    #[inline]
    #[must_use]
    pub fn tile_at(&self, tile: TileIndex) -> Option<&Tile> {
        let (x, y) = self.coord.local_tile_coords(tile)?;
        self.tile(x, y)
    }

    /// Iterates over `(local_x, local_y, tile)` in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = (usize, usize, &Tile)> {
        self.tiles
            .iter()
            .enumerate()
            .flat_map(|(y, row)| row.iter().enumerate().map(move |(x, tile)| (x, y, tile)))
    }

    /// Entity used to render the chunk.
    #[inline]
    #[must_use]
    pub const fn visual_entity(&self) -> EntityId {
        self.visual_entity
    }

    /// Sets the chunk's visual entity.
    #[inline]
    pub fn set_visual_entity(&mut self, entity: EntityId) {
        self.visual_entity = entity;
    }

    /// Every entity referenced by this chunk (visual, ore, buildings),
    /// sorted and deduplicated.
    #[must_use]
    pub fn referenced_entities(&self) -> Vec<EntityId> {
        let mut entities: Vec<EntityId> = self
            .tiles()
            .flat_map(|(_, _, tile)| [tile.ore_entity, tile.occupying_entity])
            .chain(std::iter::once(self.visual_entity))
            .filter(|id| !id.is_invalid())
            .collect();
        entities.sort_unstable();
        entities.dedup();
        entities
    }

    /// Whether tile data changed since the last [`Self::take_dirty`].
    #[inline]
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Marks the chunk as changed.
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Reads and clears the dirty flag.
    #[inline]
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::TileType;

    #[test]
    fn test_chunk_coord_from_tile() {
        assert_eq!(ChunkCoord::from_tile_index(TileIndex::new(0, 0)), ChunkCoord::new(0, 0));
        assert_eq!(ChunkCoord::from_tile_index(TileIndex::new(31, 31)), ChunkCoord::new(0, 0));
        assert_eq!(ChunkCoord::from_tile_index(TileIndex::new(32, 32)), ChunkCoord::new(1, 1));
        assert_eq!(ChunkCoord::from_tile_index(TileIndex::new(-1, -1)), ChunkCoord::new(-1, -1));
        assert_eq!(ChunkCoord::from_tile_index(TileIndex::new(-32, -32)), ChunkCoord::new(-1, -1));
        assert_eq!(ChunkCoord::from_tile_index(TileIndex::new(-33, -33)), ChunkCoord::new(-2, -2));
    }

    #[test]
    fn test_chunk_coord_from_world_pos() {
        let chunk_px = TILE_SIZE * CHUNK_WIDTH as f32;
        assert_eq!(ChunkCoord::from_world_pos(0.0, 0.0), ChunkCoord::new(0, 0));
        assert_eq!(ChunkCoord::from_world_pos(chunk_px - 0.5, 0.0), ChunkCoord::new(0, 0));
        assert_eq!(ChunkCoord::from_world_pos(chunk_px, -0.5), ChunkCoord::new(1, -1));
        assert_eq!(ChunkCoord::from_world_pos(-chunk_px, -chunk_px - 0.1), ChunkCoord::new(-1, -2));
    }

    #[test]
    fn test_local_coords_roundtrip_across_zero() {
        for y in -70..70 {
            for x in -70..70 {
                let tile = TileIndex::new(x, y);
                let coord = ChunkCoord::from_tile_index(tile);
                let (lx, ly) = coord.local_tile_coords(tile).expect("tile belongs to its chunk");
                assert!(lx < CHUNK_WIDTH && ly < CHUNK_HEIGHT);
                assert_eq!(coord.tile_index_of_local(lx, ly), tile);
            }
        }
    }

    #[test]
    fn test_local_coords_reject_foreign_tile() {
        let coord = ChunkCoord::new(0, 0);
        assert!(coord.local_tile_coords(TileIndex::new(-1, 0)).is_none());
        assert!(coord.local_tile_coords(TileIndex::new(32, 5)).is_none());
    }

    #[test]
    fn test_chebyshev_distance() {
        let a = ChunkCoord::new(0, 0);
        assert_eq!(a.chebyshev_distance(ChunkCoord::new(1, 1)), 1);
        assert_eq!(a.chebyshev_distance(ChunkCoord::new(-3, 2)), 3);
        assert_eq!(a.chebyshev_distance(ChunkCoord::new(10, 10)), 10);
        assert_eq!(a.chebyshev_distance(a), 0);
    }

    #[test]
    fn test_world_edge_chunks_are_addressable() {
        assert_eq!(ChunkCoord::MAX, ChunkCoord::new(67_108_863, 67_108_863));
        assert_eq!(ChunkCoord::MIN, ChunkCoord::new(-67_108_864, -67_108_864));

        let last = ChunkCoord::MAX.tile_index_of_local(CHUNK_WIDTH - 1, CHUNK_HEIGHT - 1);
        assert_eq!(last, TileIndex::new(i32::MAX, i32::MAX));
        assert_eq!(ChunkCoord::MIN.origin(), TileIndex::new(i32::MIN, i32::MIN));
        let corner = ChunkCoord::from_tile_index(TileIndex::new(i32::MAX, i32::MIN));
        assert_eq!(corner, ChunkCoord::new(ChunkCoord::MAX.x, ChunkCoord::MIN.y));

        assert!(ChunkCoord::MAX.is_in_world());
        assert!(!ChunkCoord::new(ChunkCoord::MAX.x + 1, 0).is_in_world());
        assert!(!ChunkCoord::new(0, ChunkCoord::MIN.y - 1).is_in_world());
    }

    #[test]
    fn test_offset_stays_inside_world() {
        assert_eq!(ChunkCoord::new(3, -2).offset(-1, 1), Some(ChunkCoord::new(2, -1)));
        assert_eq!(ChunkCoord::MAX.offset(1, 0), None);
        assert_eq!(ChunkCoord::MIN.offset(0, -1), None);
        assert_eq!(ChunkCoord::new(i32::MAX, 0).offset(1, 0), None);
    }

    #[test]
    fn test_tile_mut_marks_dirty() {
        let mut chunk = Chunk::new(ChunkCoord::new(2, -1));
        assert!(chunk.take_dirty());
        assert!(!chunk.is_dirty());

        chunk.tile_mut(3, 4).unwrap().kind = TileType::Stone;

        assert!(chunk.is_dirty());
        assert_eq!(chunk.tile(3, 4).unwrap().kind, TileType::Stone);
        assert!(chunk.tile(CHUNK_WIDTH, 0).is_none());
        assert_eq!(
            chunk.tile_at(TileIndex::new(64 + 3, -32 + 4)).unwrap().kind,
            TileType::Stone
        );
    }

    #[test]
    fn test_referenced_entities_dedup() {
        let mut chunk = Chunk::new(ChunkCoord::new(0, 0));
        let building = EntityId::new(7, 0);
        let ore = EntityId::new(3, 0);
        chunk.set_visual_entity(EntityId::new(1, 0));
        chunk.tile_mut(0, 0).unwrap().occupying_entity = building;
        chunk.tile_mut(1, 0).unwrap().occupying_entity = building;
        chunk.tile_mut(5, 5).unwrap().ore_entity = ore;

        assert_eq!(
            chunk.referenced_entities(),
            vec![EntityId::new(1, 0), ore, building]
        );
    }
}
