//! # STRATA Procedural World
//!
//! Deterministic chunked 2D tile world, streamed around players.
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: Same seed always produces the same terrain
//! 2. **Chunked**: The world is generated in 32x32-tile chunks
//! 3. **Streamable**: Per-tick work depends on view distance, not world size
//! 4. **Persistent in memory**: Evicted chunks are cached, never regenerated
//!
//! ## Core Components
//!
//! - `SimplexNoise` / `FractalNoise`: seeded 2D noise behind the `NoiseField` trait
//! - `TerrainClassifier`: terrain type and ore deposits from noise
//! - `Chunk` / `Tile`: fixed-size tile grids
//! - `WorldManager`: streaming, tile lookups, building occupancy, harvesting
//! - `WorldManagerConfig`: TOML-loadable generation settings
//!
//! ## Example
//!
//! ```rust,ignore
//! use strata_core::{Position, Registry};
//! use strata_procedural::{TileIndex, WorldManager, WorldManagerConfig};
//!
//! let mut registry = Registry::new(100_000)?;
//! let mut world = WorldManager::new(WorldManagerConfig::default(), &mut registry)?;
//!
//! let player = registry.create_entity()?;
//! registry.add_component(player, Position::new(100.0, 200.0))?;
//! world.update(&mut registry, player)?;
//!
//! assert!(world.tile_at_world_position(100.0, 200.0).is_some());
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod chunk;
pub mod components;
pub mod config;
pub mod error;
pub mod noise;
pub mod terrain;
pub mod tile;
pub mod world_manager;

pub use chunk::{Chunk, ChunkCoord, CHUNK_HEIGHT, CHUNK_WIDTH, TILES_PER_CHUNK, TILE_SIZE};
pub use components::{BuildingComponent, ChunkVisual, OreType, ResourceNodeComponent};
pub use config::{WorldManagerConfig, DEFAULT_VIEW_DISTANCE, MAX_VIEW_DISTANCE};
pub use error::{WorldError, WorldResult};
pub use noise::{FractalNoise, NoiseField, SimplexNoise, WorldSeed};
pub use terrain::{OreDeposit, TerrainClassifier, TerrainSample};
pub use tile::{Tile, TileIndex, TileType};
pub use world_manager::{ChunkState, StreamingReport, WorldManager, WorldStats};
