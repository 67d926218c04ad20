//! # Server Session
//!
//! Owns the registry, the world and the command queue for one game, and
//! advances them one tick at a time on the simulation thread.
//!
//! ## Tick Order
//!
//! ```text
//! 1. Drain queued commands (bounded per tick)
//! 2. Apply each command in arrival order; refusals become CommandRejected
//! 3. TileUpdate for every loaded tile a command changed
//! 4. Stream chunks around every connected player
//! 5. ChunkSnapshot for every chunk generated or reactivated
//! 6. EntityDestroyed for every entity destroyed since the last tick
//! ```
//!
//! Command refusals never fail the tick. Only streaming failures (for
//! example an exhausted entity pool while generating) surface as
//! [`SessionError`]. Entities a failed generation created and rolled back
//! were never announced, so they are not reported destroyed either.

use std::collections::{BTreeSet, HashMap};

use crossbeam_channel::Receiver;
use strata_core::{EntityId, Position, Registry, DEFAULT_MAX_ENTITIES};
use strata_procedural::{
    BuildingComponent, ChunkCoord, FractalNoise, NoiseField, OreType, StreamingReport, TileIndex,
    WorldError, WorldManager, WorldManagerConfig,
};
use tracing::{debug, info, warn};

use crate::command::{ClientId, SimCommand};
use crate::error::SessionResult;
use crate::protocol::{ChunkSnapshot, Packet, RejectReason, TileState};
use crate::queue::{CommandQueue, CommandSender, DEFAULT_QUEUE_CAPACITY};

/// Default cap on commands applied per tick.
pub const DEFAULT_MAX_COMMANDS_PER_TICK: usize = 256;

/// Configuration for a session.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionConfig {
    /// Entity pool size.
    pub max_entities: usize,
    /// Bound of the command queue.
    pub queue_capacity: usize,
    /// Commands applied per tick; the rest wait for the next tick.
    pub max_commands_per_tick: usize,
    /// Where joining players appear, in world pixels.
    pub spawn: (f32, f32),
    /// World generation and streaming.
    pub world: WorldManagerConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_entities: DEFAULT_MAX_ENTITIES,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_commands_per_tick: DEFAULT_MAX_COMMANDS_PER_TICK,
            spawn: (0.0, 0.0),
            world: WorldManagerConfig::default(),
        }
    }
}

/// Ore taken by a client during a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Harvested {
    /// Who harvested.
    pub client: ClientId,
    /// Where.
    pub tile: TileIndex,
    /// What.
    pub ore_type: OreType,
    /// How much was actually taken.
    pub amount: u32,
}

/// Outcome of one tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// Commands applied.
    pub applied: usize,
    /// Commands refused.
    pub rejected: usize,
    /// Chunk transitions caused by player positions.
    pub streaming: StreamingReport,
    /// Successful harvests.
    pub harvested: Vec<Harvested>,
    /// Packets for clients, in emission order.
    pub outbound: Vec<Packet>,
}

/// Session statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Total ticks processed.
    pub ticks_processed: u64,
    /// Commands applied since creation.
    pub commands_applied: u64,
    /// Commands refused since creation.
    pub commands_rejected: u64,
    /// Buildings placed since creation.
    pub buildings_placed: u64,
    /// Buildings removed since creation.
    pub buildings_removed: u64,
    /// Packets produced since creation.
    pub packets_out: u64,
}

/// One running game on the simulation thread.
pub struct Session<N: NoiseField = FractalNoise> {
    config: SessionConfig,
    registry: Registry,
    world: WorldManager<N>,
    queue: CommandQueue,
    /// Client -> player entity.
    clients: HashMap<ClientId, EntityId>,
    /// Building entity -> owner.
    owners: HashMap<EntityId, ClientId>,
    destroyed: Receiver<EntityId>,
    /// Destroyed entities not yet reported, carried over a failed tick.
    pending_destroyed: Vec<EntityId>,
    tick: u64,
    stats: SessionStats,
}

impl Session<FractalNoise> {
    /// Creates a session with a fresh registry and a simplex world.
    ///
    /// # Errors
    ///
    /// Invalid entity pool size or world configuration.
    pub fn new(config: SessionConfig) -> SessionResult<Self> {
        let mut registry = Registry::new(config.max_entities)?;
        let world = WorldManager::new(config.world.clone(), &mut registry)?;
        Ok(Self::with_world(config, registry, world))
    }
}

impl<N: NoiseField> Session<N> {
    /// Creates a session around an existing registry and world.
    ///
    /// `world` must have been built against `registry`.
    #[must_use]
    pub fn with_world(config: SessionConfig, mut registry: Registry, world: WorldManager<N>) -> Self {
        let destroyed = registry.subscribe_destroyed();
        let queue = CommandQueue::new(config.queue_capacity);
        info!(
            max_entities = config.max_entities,
            queue_capacity = queue.capacity(),
            view_distance = world.view_distance(),
            "session created"
        );
        Self {
            config,
            registry,
            world,
            queue,
            clients: HashMap::new(),
            owners: HashMap::new(),
            destroyed,
            pending_destroyed: Vec::new(),
            tick: 0,
            stats: SessionStats::default(),
        }
    }

    /// A handle for the network thread.
    #[must_use]
    pub fn command_sender(&self) -> CommandSender {
        self.queue.sender()
    }

    /// Commands waiting for the next tick.
    #[must_use]
    pub fn pending_commands(&self) -> usize {
        self.queue.len()
    }

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Read-only registry access.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Read-only world access.
    #[must_use]
    pub const fn world(&self) -> &WorldManager<N> {
        &self.world
    }

    /// Ticks processed so far.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Session statistics.
    #[must_use]
    pub const fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Connected clients.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Player entity of `client`.
    #[must_use]
    pub fn player_entity(&self, client: ClientId) -> Option<EntityId> {
        self.clients.get(&client).copied()
    }

    /// Owner of a building entity.
    #[must_use]
    pub fn building_owner(&self, building: EntityId) -> Option<ClientId> {
        self.owners.get(&building).copied()
    }

    /// Buildings placed by `client` that still stand, sorted.
    #[must_use]
    pub fn buildings_of(&self, client: ClientId) -> Vec<EntityId> {
        let mut buildings: Vec<EntityId> = self
            .owners
            .iter()
            .filter(|(_, owner)| **owner == client)
            .map(|(building, _)| *building)
            .collect();
        buildings.sort_unstable();
        buildings
    }

    // =========================================================================
    // Tick
    // =========================================================================

    /// Advances the session by one tick.
    ///
    /// # Errors
    ///
    /// [`SessionError`](crate::SessionError) if streaming fails; commands
    /// applied earlier in the tick stay applied and their destroyed
    /// entities are reported by the next successful tick.
    pub fn tick(&mut self) -> SessionResult<TickReport> {
        self.tick += 1;
        let mut report = TickReport {
            tick: self.tick,
            ..TickReport::default()
        };
        let mut touched = BTreeSet::new();

        for command in self.queue.drain(self.config.max_commands_per_tick) {
            let client = command.client();
            match self.apply(command, &mut touched, &mut report.harvested) {
                Ok(()) => report.applied += 1,
                Err(reason) => {
                    warn!(client = %client, reason = ?reason, "command rejected");
                    report.rejected += 1;
                    report.outbound.push(Packet::CommandRejected { client, reason });
                }
            }
        }

        for tile in touched {
            if let Some(state) = self.world.tile_at_tile_index(tile) {
                report.outbound.push(Packet::TileUpdate {
                    tile,
                    state: TileState::from_tile(state),
                });
            }
        }

        self.pending_destroyed.extend(self.destroyed.try_iter());
        let centres = self.player_chunks()?;
        report.streaming = match self.world.stream_around(&mut self.registry, &centres) {
            Ok(streaming) => streaming,
            Err(err) => {
                let discarded = self.destroyed.try_iter().count();
                warn!(error = %err, discarded, "streaming failed");
                return Err(err.into());
            }
        };
        for coord in report.streaming.loaded() {
            if let Some(chunk) = self.world.active_chunk(coord) {
                report
                    .outbound
                    .push(Packet::ChunkSnapshot(ChunkSnapshot::from_chunk(chunk)));
            }
        }

        self.pending_destroyed.extend(self.destroyed.try_iter());
        report
            .outbound
            .extend(self.pending_destroyed.drain(..).map(Packet::EntityDestroyed));

        self.stats.ticks_processed += 1;
        self.stats.commands_applied += report.applied as u64;
        self.stats.commands_rejected += report.rejected as u64;
        self.stats.packets_out += report.outbound.len() as u64;

        if !report.streaming.is_empty() {
            debug!(
                tick = self.tick,
                generated = report.streaming.generated.len(),
                reactivated = report.streaming.reactivated.len(),
                evicted = report.streaming.evicted.len(),
                "streaming pass"
            );
        }
        Ok(report)
    }

    /// Sorted, deduplicated chunks holding a player.
    fn player_chunks(&self) -> SessionResult<Vec<ChunkCoord>> {
        let mut centres = Vec::with_capacity(self.clients.len());
        for &player in self.clients.values() {
            let position = self
                .registry
                .get_component::<Position>(player)
                .map_err(|_| WorldError::MissingPosition(player))?;
            centres.push(ChunkCoord::from_world_pos(position.x, position.y));
        }
        centres.sort_unstable();
        centres.dedup();
        Ok(centres)
    }

    // =========================================================================
    // Commands
    // =========================================================================

    fn apply(
        &mut self,
        command: SimCommand,
        touched: &mut BTreeSet<TileIndex>,
        harvested: &mut Vec<Harvested>,
    ) -> Result<(), RejectReason> {
        match command {
            SimCommand::Join { client } => self.join(client),
            SimCommand::Leave { client } => self.leave(client),
            SimCommand::Move { client, x, y } => self.move_player(client, x, y),
            SimCommand::PlaceBuilding {
                client,
                tile,
                width,
                height,
            } => self.place_building(client, tile, width, height, touched),
            SimCommand::RemoveBuilding { client, building } => {
                self.remove_building(client, building, touched)
            }
            SimCommand::Harvest {
                client,
                tile,
                amount,
            } => {
                self.player(client)?;
                let (ore_type, taken) = self
                    .world
                    .harvest_ore(&mut self.registry, tile, amount)
                    .map_err(|err| server_error(&err))?
                    .ok_or(RejectReason::NothingToHarvest)?;
                touched.insert(tile);
                harvested.push(Harvested {
                    client,
                    tile,
                    ore_type,
                    amount: taken,
                });
                Ok(())
            }
        }
    }

    fn player(&self, client: ClientId) -> Result<EntityId, RejectReason> {
        self.player_entity(client).ok_or(RejectReason::UnknownClient)
    }

    fn join(&mut self, client: ClientId) -> Result<(), RejectReason> {
        if self.clients.contains_key(&client) {
            return Err(RejectReason::AlreadyJoined);
        }
        let (x, y) = self.config.spawn;
        let player = self.registry.create_entity().map_err(|err| server_error(&err))?;
        if let Err(err) = self.registry.add_component(player, Position::new(x, y)) {
            let _ = self.registry.destroy_entity(player);
            return Err(server_error(&err));
        }
        self.clients.insert(client, player);
        info!(client = %client, player = %player, "client joined");
        Ok(())
    }

    /// Buildings outlive their owner's connection.
    fn leave(&mut self, client: ClientId) -> Result<(), RejectReason> {
        let player = self.clients.remove(&client).ok_or(RejectReason::UnknownClient)?;
        self.registry
            .destroy_entity(player)
            .map_err(|err| server_error(&err))?;
        info!(client = %client, player = %player, "client left");
        Ok(())
    }

    fn move_player(&mut self, client: ClientId, x: f32, y: f32) -> Result<(), RejectReason> {
        let player = self.player(client)?;
        if !x.is_finite() || !y.is_finite() {
            return Err(RejectReason::InvalidPosition);
        }
        if !self.world.is_streamable(ChunkCoord::from_world_pos(x, y)) {
            return Err(RejectReason::InvalidPosition);
        }
        let position = self
            .registry
            .get_component_mut::<Position>(player)
            .map_err(|err| server_error(&err))?;
        position.x = x;
        position.y = y;
        Ok(())
    }

    fn place_building(
        &mut self,
        client: ClientId,
        tile: TileIndex,
        width: u32,
        height: u32,
        touched: &mut BTreeSet<TileIndex>,
    ) -> Result<(), RejectReason> {
        self.player(client)?;
        if !self.world.can_place_building(tile, width, height) {
            return Err(RejectReason::PlacementBlocked);
        }

        let building = self.registry.create_entity().map_err(|err| server_error(&err))?;
        let (x, y) = tile.world_center();
        let placed = match self.registry.add_component(building, Position::new(x, y)) {
            Ok(_) => self
                .world
                .place_building(&mut self.registry, building, tile, width, height),
            Err(err) => Err(WorldError::from(err)),
        };
        if let Err(err) = placed {
            let _ = self.registry.destroy_entity(building);
            return Err(server_error(&err));
        }

        if let Ok(record) = self.registry.get_component::<BuildingComponent>(building) {
            touched.extend(record.occupied_tiles.iter().copied());
        }
        self.owners.insert(building, client);
        self.stats.buildings_placed += 1;
        info!(client = %client, building = %building, x = tile.x, y = tile.y, width, height, "building placed");
        Ok(())
    }

    fn remove_building(
        &mut self,
        client: ClientId,
        building: EntityId,
        touched: &mut BTreeSet<TileIndex>,
    ) -> Result<(), RejectReason> {
        self.player(client)?;
        if self.owners.get(&building) != Some(&client) {
            return Err(RejectReason::NotYourBuilding);
        }

        let tiles = self
            .registry
            .get_component::<BuildingComponent>(building)
            .map(|record| record.occupied_tiles.clone())
            .map_err(|err| server_error(&err))?;
        self.world.remove_building(building, &tiles);
        self.registry
            .destroy_entity(building)
            .map_err(|err| server_error(&err))?;

        self.owners.remove(&building);
        touched.extend(tiles);
        self.stats.buildings_removed += 1;
        info!(client = %client, building = %building, "building removed");
        Ok(())
    }
}

fn server_error(err: &dyn std::error::Error) -> RejectReason {
    warn!(error = %err, "command failed inside the simulation");
    RejectReason::ServerError
}
