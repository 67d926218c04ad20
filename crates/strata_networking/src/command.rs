//! # Simulation Commands
//!
//! Everything a network thread may ask of the simulation, as plain data.
//! Commands are queued and applied on the simulation thread in order.

use strata_core::EntityId;
use strata_procedural::TileIndex;

/// Connection-level identifier assigned by the transport.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u32);

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "client#{}", self.0)
    }
}

/// A request from a client, applied during the next session tick.
#[derive(Clone, Debug, PartialEq)]
pub enum SimCommand {
    /// Spawn a player entity for `client`.
    Join {
        /// Who joins.
        client: ClientId,
    },
    /// Destroy `client`'s player entity.
    Leave {
        /// Who leaves.
        client: ClientId,
    },
    /// Teleport `client`'s player to a world pixel position.
    Move {
        /// Who moves.
        client: ClientId,
        /// World X in pixels.
        x: f32,
        /// World Y in pixels.
        y: f32,
    },
    /// Place a `width x height` building anchored at `tile`.
    PlaceBuilding {
        /// Who builds.
        client: ClientId,
        /// Minimum corner of the footprint.
        tile: TileIndex,
        /// Footprint width in tiles.
        width: u32,
        /// Footprint height in tiles.
        height: u32,
    },
    /// Remove a building this client placed.
    RemoveBuilding {
        /// Who removes.
        client: ClientId,
        /// The building entity.
        building: EntityId,
    },
    /// Mine up to `amount` from the resource node on `tile`.
    Harvest {
        /// Who mines.
        client: ClientId,
        /// Tile holding the node.
        tile: TileIndex,
        /// Units requested.
        amount: u32,
    },
}

impl SimCommand {
    /// The client that issued the command.
    #[must_use]
    pub const fn client(&self) -> ClientId {
        match self {
            Self::Join { client }
            | Self::Leave { client }
            | Self::Move { client, .. }
            | Self::PlaceBuilding { client, .. }
            | Self::RemoveBuilding { client, .. }
            | Self::Harvest { client, .. } => *client,
        }
    }
}
