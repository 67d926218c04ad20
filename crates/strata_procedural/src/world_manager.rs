//! # World Manager
//!
//! Streams chunks around players and tracks building occupancy.
//!
//! ## Chunk lifecycle
//!
//! ```text
//! NotGenerated --(enters radius)--> Active --(leaves radius)--> Cached
//!                                     ^                           |
//!                                     +-------(re-enters)---------+
//! ```
//!
//! A chunk is generated exactly once. Eviction moves it to the cache and
//! tags the entities it references with [`Inactive`]; reactivation clears
//! the tags. Nothing is regenerated or destroyed, so depleted resources and
//! placed buildings survive.
//!
//! Per-tick work is bounded by `(2 * view_distance + 1)^2` per streaming
//! centre, independent of how much of the world has been generated.
//!
//! ## Lookups
//!
//! Tile queries only resolve inside active chunks. `None`/`false` for an
//! unloaded region is the normal answer, not an error.

use std::collections::{BTreeSet, HashMap};

use strata_core::{EcsError, EntityId, Inactive, Position, Registry};

use crate::chunk::{Chunk, ChunkCoord, CHUNK_HEIGHT, CHUNK_WIDTH};
use crate::components::{BuildingComponent, ChunkVisual, OreType, ResourceNodeComponent};
use crate::config::WorldManagerConfig;
use crate::error::{WorldError, WorldResult};
use crate::noise::{FractalNoise, NoiseField};
use crate::terrain::TerrainClassifier;
use crate::tile::{Tile, TileIndex};

/// Lifecycle state of a chunk coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChunkState {
    /// Never entered a streaming radius.
    NotGenerated,
    /// Loaded; tile queries resolve and entities are live.
    Active,
    /// Evicted; data retained, entities tagged inactive.
    Cached,
}

/// World statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorldStats {
    /// Chunks currently active.
    pub active_chunks: usize,
    /// Chunks currently cached.
    pub cached_chunks: usize,
    /// Chunks generated since creation.
    pub generated_total: u64,
    /// Active -> Cached transitions since creation.
    pub evicted_total: u64,
    /// Cached -> Active transitions since creation.
    pub reactivated_total: u64,
}

/// Chunks that changed state during one streaming pass.
///
/// Each list is sorted by coordinate.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamingReport {
    /// Generated for the first time.
    pub generated: Vec<ChunkCoord>,
    /// Restored from the cache.
    pub reactivated: Vec<ChunkCoord>,
    /// Moved to the cache.
    pub evicted: Vec<ChunkCoord>,
}

impl StreamingReport {
    /// Whether the pass changed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.generated.is_empty() && self.reactivated.is_empty() && self.evicted.is_empty()
    }

    /// Chunks that became active, generated first.
    pub fn loaded(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.generated.iter().chain(&self.reactivated).copied()
    }
}

/// Owns all generated chunks and streams them around players.
pub struct WorldManager<N: NoiseField = FractalNoise> {
    config: WorldManagerConfig,
    classifier: TerrainClassifier<N>,
    active: HashMap<ChunkCoord, Chunk>,
    cached: HashMap<ChunkCoord, Chunk>,
    stats: WorldStats,
}

impl WorldManager<FractalNoise> {
    /// Creates a simplex-backed world and registers its components.
    ///
    /// # Errors
    ///
    /// [`WorldError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: WorldManagerConfig, registry: &mut Registry) -> WorldResult<Self> {
        config.validate()?;
        let classifier = TerrainClassifier::from_config(&config);
        Self::with_classifier(config, classifier, registry)
    }
}

impl<N: NoiseField> WorldManager<N> {
    /// Creates a world driven by an explicit classifier.
    ///
    /// # Errors
    ///
    /// [`WorldError::InvalidConfig`] if `config` fails validation.
    pub fn with_classifier(
        config: WorldManagerConfig,
        classifier: TerrainClassifier<N>,
        registry: &mut Registry,
    ) -> WorldResult<Self> {
        config.validate()?;
        Self::register_components(registry);

        tracing::info!(
            seed = config.seed,
            view_distance = config.view_distance,
            "world manager created"
        );

        Ok(Self {
            config,
            classifier,
            active: HashMap::new(),
            cached: HashMap::new(),
            stats: WorldStats::default(),
        })
    }

    /// Registers every component type the world writes. Idempotent.
    pub fn register_components(registry: &mut Registry) {
        registry.register_component::<Position>();
        registry.register_component::<Inactive>();
        registry.register_component::<BuildingComponent>();
        registry.register_component::<ResourceNodeComponent>();
        registry.register_component::<ChunkVisual>();
    }

    /// Active configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &WorldManagerConfig {
        &self.config
    }

    /// Streaming radius in chunks.
    #[inline]
    #[must_use]
    pub fn view_distance(&self) -> u32 {
        self.config.view_distance
    }

    /// Smallest amount a generated resource node starts with.
    #[inline]
    #[must_use]
    pub fn min_ore_amount(&self) -> u32 {
        self.config.min_ore_amount
    }

    /// Largest amount a generated resource node starts with.
    #[inline]
    #[must_use]
    pub fn max_ore_amount(&self) -> u32 {
        self.config.max_ore_amount
    }

    /// Current statistics.
    #[must_use]
    pub fn stats(&self) -> WorldStats {
        WorldStats {
            active_chunks: self.active.len(),
            cached_chunks: self.cached.len(),
            ..self.stats
        }
    }

    // =========================================================================
    // Streaming
    // =========================================================================

    /// Streams chunks around `player`'s [`Position`].
    ///
    /// # Errors
    ///
    /// [`WorldError::MissingPosition`] if `player` has no position, or a
    /// registry error raised while generating.
    pub fn update(&mut self, registry: &mut Registry, player: EntityId) -> WorldResult<StreamingReport> {
        let position = registry
            .get_component::<Position>(player)
            .map_err(|_| WorldError::MissingPosition(player))?;
        let centre = ChunkCoord::from_world_pos(position.x, position.y);
        self.stream_around(registry, &[centre])
    }

    /// Whether the whole streaming box around `centre` lies inside the world.
    #[must_use]
    pub fn is_streamable(&self, centre: ChunkCoord) -> bool {
        let radius = i32::try_from(self.config.view_distance).unwrap_or(i32::MAX);
        centre.offset(-radius, -radius).is_some() && centre.offset(radius, radius).is_some()
    }

    /// Keeps the union of the streaming boxes around `centres` active.
    ///
    /// Chunks outside every box are evicted first, then missing chunks are
    /// reactivated from the cache or generated. With no centres everything
    /// is evicted. Parts of a box beyond [`ChunkCoord::MIN`] or
    /// [`ChunkCoord::MAX`] are never generated.
    ///
    /// # Errors
    ///
    /// Registry errors raised while generating or tagging (for example pool
    /// exhaustion). Chunks already processed keep their new state; the chunk
    /// that failed keeps its old one.
    pub fn stream_around(
        &mut self,
        registry: &mut Registry,
        centres: &[ChunkCoord],
    ) -> WorldResult<StreamingReport> {
        let radius = self.config.view_distance;
        let radius_i32 = i32::try_from(radius).unwrap_or(i32::MAX);
        let mut report = StreamingReport::default();

        let mut outside: Vec<ChunkCoord> = self
            .active
            .keys()
            .copied()
            .filter(|coord| centres.iter().all(|c| c.chebyshev_distance(*coord) > radius))
            .collect();
        outside.sort_unstable();
        for coord in outside {
            self.evict_chunk(registry, coord)?;
            report.evicted.push(coord);
        }

        let mut wanted = BTreeSet::new();
        for centre in centres {
            for dy in -radius_i32..=radius_i32 {
                for dx in -radius_i32..=radius_i32 {
                    let Some(coord) = centre.offset(dx, dy) else {
                        continue;
                    };
                    if !self.active.contains_key(&coord) {
                        wanted.insert(coord);
                    }
                }
            }
        }

        for coord in wanted {
            if self.cached.contains_key(&coord) {
                self.reactivate_chunk(registry, coord)?;
                report.reactivated.push(coord);
            } else {
                let chunk = self.generate_chunk(registry, coord)?;
                self.active.insert(coord, chunk);
                self.stats.generated_total += 1;
                report.generated.push(coord);
            }
        }

        Ok(report)
    }

    /// Lifecycle state of `coord`.
    #[must_use]
    pub fn chunk_state(&self, coord: ChunkCoord) -> ChunkState {
        if self.active.contains_key(&coord) {
            ChunkState::Active
        } else if self.cached.contains_key(&coord) {
            ChunkState::Cached
        } else {
            ChunkState::NotGenerated
        }
    }

    /// Whether `coord` is active.
    #[inline]
    #[must_use]
    pub fn is_chunk_active(&self, coord: ChunkCoord) -> bool {
        self.active.contains_key(&coord)
    }

    /// Read-only view of the active chunks, in no particular order.
    pub fn active_chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.active.values()
    }

    /// Sorted coordinates of the active chunks.
    #[must_use]
    pub fn active_chunk_coords(&self) -> Vec<ChunkCoord> {
        let mut coords: Vec<ChunkCoord> = self.active.keys().copied().collect();
        coords.sort_unstable();
        coords
    }

    /// An active chunk.
    #[must_use]
    pub fn active_chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.active.get(&coord)
    }

    /// Clears the dirty flag of every active chunk, returning the sorted
    /// coordinates that were dirty.
    pub fn take_dirty_chunks(&mut self) -> Vec<ChunkCoord> {
        let mut dirty: Vec<ChunkCoord> = self
            .active
            .iter_mut()
            .filter_map(|(coord, chunk)| chunk.take_dirty().then_some(*coord))
            .collect();
        dirty.sort_unstable();
        dirty
    }

    /// Moves an active chunk to the cache, tagging its entities [`Inactive`].
    ///
    /// The chunk only leaves `active` once every tag is in place; on error
    /// the tags added so far are removed again.
    fn evict_chunk(&mut self, registry: &mut Registry, coord: ChunkCoord) -> WorldResult<()> {
        let Some(chunk) = self.active.get(&coord) else {
            return Ok(());
        };

        let mut tagged = Vec::new();
        for entity in chunk.referenced_entities() {
            if !registry.is_alive(entity) || registry.has_component::<Inactive>(entity) {
                continue;
            }
            // A building straddling chunks stays live while any part is active.
            if let Ok(building) = registry.get_component::<BuildingComponent>(entity) {
                let still_active = building.occupied_tiles.iter().any(|tile| {
                    let owner = ChunkCoord::from_tile_index(*tile);
                    owner != coord && self.active.contains_key(&owner)
                });
                if still_active {
                    continue;
                }
            }
            if let Err(err) = registry.add_component(entity, Inactive).map(|_| ()) {
                for entity in tagged {
                    let _ = registry.remove_component::<Inactive>(entity);
                }
                return Err(err.into());
            }
            tagged.push(entity);
        }

        if let Some(chunk) = self.active.remove(&coord) {
            self.cached.insert(coord, chunk);
        }
        tracing::debug!(chunk = %coord, "chunk evicted");
        self.stats.evicted_total += 1;
        Ok(())
    }

    /// Moves a cached chunk back to `active`, clearing its [`Inactive`] tags.
    ///
    /// Same contract as [`Self::evict_chunk`]: on error the chunk stays
    /// cached with its tags restored.
    fn reactivate_chunk(&mut self, registry: &mut Registry, coord: ChunkCoord) -> WorldResult<()> {
        let Some(chunk) = self.cached.get(&coord) else {
            return Ok(());
        };

        let mut cleared = Vec::new();
        for entity in chunk.referenced_entities() {
            if !registry.has_component::<Inactive>(entity) {
                continue;
            }
            if let Err(err) = registry.remove_component::<Inactive>(entity) {
                for entity in cleared {
                    let _ = registry.add_component(entity, Inactive);
                }
                return Err(err.into());
            }
            cleared.push(entity);
        }

        if let Some(chunk) = self.cached.remove(&coord) {
            self.active.insert(coord, chunk);
        }
        tracing::debug!(chunk = %coord, "chunk reactivated");
        self.stats.reactivated_total += 1;
        Ok(())
    }

    fn generate_chunk(&self, registry: &mut Registry, coord: ChunkCoord) -> WorldResult<Chunk> {
        let mut created = Vec::new();
        match self.populate_chunk(registry, coord, &mut created) {
            Ok(chunk) => {
                tracing::debug!(chunk = %coord, resources = created.len() - 1, "chunk generated");
                Ok(chunk)
            }
            Err(err) => {
                // Roll back so a failed generation leaves no orphan entities.
                for entity in created {
                    let _ = registry.destroy_entity(entity);
                }
                Err(err)
            }
        }
    }

    fn populate_chunk(
        &self,
        registry: &mut Registry,
        coord: ChunkCoord,
        created: &mut Vec<EntityId>,
    ) -> WorldResult<Chunk> {
        let mut chunk = Chunk::new(coord);

        let visual = registry.create_entity()?;
        created.push(visual);
        let origin = coord.origin().world_center();
        registry.add_component(visual, ChunkVisual { coord })?;
        registry.add_component(visual, Position::new(origin.0, origin.1))?;
        chunk.set_visual_entity(visual);

        for local_y in 0..CHUNK_HEIGHT {
            for local_x in 0..CHUNK_WIDTH {
                let index = coord.tile_index_of_local(local_x, local_y);
                let sample = self.classifier.classify(index);
                let mut tile = Tile::new(sample.kind);

                if let Some(deposit) = sample.ore {
                    let node = registry.create_entity()?;
                    created.push(node);
                    let (x, y) = index.world_center();
                    registry.add_component(
                        node,
                        ResourceNodeComponent {
                            remaining_amount: deposit.amount,
                            ore_type: deposit.ore_type,
                        },
                    )?;
                    registry.add_component(node, Position::new(x, y))?;
                    tile.ore_entity = node;
                }

                if let Some(slot) = chunk.tile_mut(local_x, local_y) {
                    *slot = tile;
                }
            }
        }

        Ok(chunk)
    }

    // =========================================================================
    // Tile queries
    // =========================================================================

    /// The tile at a world tile index, if its chunk is active.
    #[must_use]
    pub fn tile_at_tile_index(&self, tile: TileIndex) -> Option<&Tile> {
        self.active
            .get(&ChunkCoord::from_tile_index(tile))?
            .tile_at(tile)
    }

    /// The tile under a world pixel position, if its chunk is active.
    #[must_use]
    pub fn tile_at_world_position(&self, world_x: f32, world_y: f32) -> Option<&Tile> {
        self.tile_at_tile_index(self.tile_index_from_world_position(world_x, world_y))
    }

    /// The tile index containing a world pixel position.
    #[inline]
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn tile_index_from_world_position(&self, world_x: f32, world_y: f32) -> TileIndex {
        TileIndex::from_world_pos(world_x, world_y)
    }

    fn active_tile_mut(&mut self, tile: TileIndex) -> Option<&mut Tile> {
        let chunk = self.active.get_mut(&ChunkCoord::from_tile_index(tile))?;
        let (x, y) = chunk.coord().local_tile_coords(tile)?;
        chunk.tile_mut(x, y)
    }

    // =========================================================================
    // Buildings
    // =========================================================================

    /// Whether a `width x height` footprint anchored at `tile` is free.
    ///
    /// Every tile must be loaded, unoccupied and buildable. Empty footprints
    /// are never placeable.
    #[must_use]
    pub fn can_place_building(&self, tile: TileIndex, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        footprint(tile, width, height).all(|index| {
            index
                .and_then(|index| self.tile_at_tile_index(index))
                .is_some_and(|t| !t.is_occupied() && t.kind.is_buildable())
        })
    }

    /// Marks the footprint as occupied by `entity` and records the marked
    /// tiles in its [`BuildingComponent`].
    ///
    /// Does not re-validate: call [`Self::can_place_building`] first. Tiles
    /// in unloaded chunks are skipped and left out of the record. Placing an
    /// entity that already has a record releases its old footprint first.
    ///
    /// # Errors
    ///
    /// [`EcsError::StaleEntity`] if `entity` is not alive.
    pub fn place_building(
        &mut self,
        registry: &mut Registry,
        entity: EntityId,
        tile: TileIndex,
        width: u32,
        height: u32,
    ) -> WorldResult<()> {
        if !registry.is_alive(entity) {
            return Err(EcsError::StaleEntity(entity).into());
        }

        if let Ok(previous) = registry.get_component::<BuildingComponent>(entity) {
            let previous = previous.occupied_tiles.clone();
            self.remove_building(entity, &previous);
        }

        let mut occupied_tiles = Vec::new();
        for index in footprint(tile, width, height).flatten() {
            if let Some(t) = self.active_tile_mut(index) {
                t.occupying_entity = entity;
                occupied_tiles.push(index);
            }
        }

        let record = BuildingComponent {
            width,
            height,
            occupied_tiles,
        };
        if let Ok(existing) = registry.get_component_mut::<BuildingComponent>(entity) {
            *existing = record;
        } else {
            registry.add_component(entity, record)?;
        }

        tracing::debug!(entity = %entity, x = tile.x, y = tile.y, width, height, "building placed");
        Ok(())
    }

    /// Clears `entity` from each listed tile that still names it, in active
    /// and cached chunks. Returns how many tiles were cleared.
    pub fn remove_building(&mut self, entity: EntityId, occupied_tiles: &[TileIndex]) -> usize {
        let mut cleared = 0;
        for &index in occupied_tiles {
            let coord = ChunkCoord::from_tile_index(index);
            let Some(chunk) = self
                .active
                .get_mut(&coord)
                .or_else(|| self.cached.get_mut(&coord))
            else {
                continue;
            };
            let Some((x, y)) = coord.local_tile_coords(index) else {
                continue;
            };
            if chunk.tile(x, y).is_some_and(|t| t.occupying_entity == entity) {
                if let Some(t) = chunk.tile_mut(x, y) {
                    t.occupying_entity = EntityId::INVALID;
                    cleared += 1;
                }
            }
        }
        tracing::debug!(entity = %entity, cleared, "building removed");
        cleared
    }

    /// [`Self::remove_building`] using the entity's recorded footprint.
    /// The component itself is left in place.
    ///
    /// # Errors
    ///
    /// [`EcsError::MissingComponent`] if `entity` has no building record.
    pub fn remove_building_of(&mut self, registry: &Registry, entity: EntityId) -> WorldResult<usize> {
        let building = registry.get_component::<BuildingComponent>(entity)?;
        Ok(self.remove_building(entity, &building.occupied_tiles))
    }

    // =========================================================================
    // Resources
    // =========================================================================

    /// Takes up to `amount` from the resource node on `tile`.
    ///
    /// A depleted node is destroyed and the tile's ore reference cleared.
    /// Returns the ore type and the amount actually taken, or `None` when
    /// the tile is unloaded or has nothing to mine.
    ///
    /// # Errors
    ///
    /// Registry errors while destroying a depleted node.
    pub fn harvest_ore(
        &mut self,
        registry: &mut Registry,
        tile: TileIndex,
        amount: u32,
    ) -> WorldResult<Option<(OreType, u32)>> {
        let node = match self.tile_at_tile_index(tile) {
            Some(t) if t.has_ore() => t.ore_entity,
            _ => return Ok(None),
        };
        if amount == 0 {
            return Ok(None);
        }

        let Ok(resource) = registry.get_component_mut::<ResourceNodeComponent>(node) else {
            // Node destroyed elsewhere; drop the dangling reference.
            if let Some(t) = self.active_tile_mut(tile) {
                t.ore_entity = EntityId::INVALID;
            }
            return Ok(None);
        };

        let taken = amount.min(resource.remaining_amount);
        resource.remaining_amount -= taken;
        let ore_type = resource.ore_type;
        let depleted = resource.remaining_amount == 0;

        if depleted {
            registry.destroy_entity(node)?;
            if let Some(t) = self.active_tile_mut(tile) {
                t.ore_entity = EntityId::INVALID;
            }
            tracing::debug!(node = %node, x = tile.x, y = tile.y, "resource node depleted");
        }

        Ok(Some((ore_type, taken)))
    }
}

/// Tiles of a `width x height` footprint anchored at its minimum corner.
/// Tiles past the edge of the `i32` tile range come out as `None`.
fn footprint(
    anchor: TileIndex,
    width: u32,
    height: u32,
) -> impl Iterator<Item = Option<TileIndex>> {
    let width = i32::try_from(width).unwrap_or(i32::MAX);
    let height = i32::try_from(height).unwrap_or(i32::MAX);
    (0..height).flat_map(move |dy| (0..width).map(move |dx| anchor.offset(dx, dy)))
}
