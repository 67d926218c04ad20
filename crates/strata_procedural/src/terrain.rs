//! # Terrain Classification
//!
//! Turns noise samples into tile types and ore deposits.
//!
//! Three independent channels, all derived from the world seed:
//! - terrain: water / dirt / grass by threshold
//! - ore: a node spawns where the value exceeds `ore_threshold`
//! - ore kind: picks the [`OreType`] of a spawned node

use crate::components::OreType;
use crate::config::WorldManagerConfig;
use crate::noise::{discrete, FractalNoise, NoiseField, WorldSeed};
use crate::tile::{TileIndex, TileType};

/// Seed purpose for the terrain channel.
const TERRAIN_CHANNEL: u64 = 1;
/// Seed purpose for the ore channel.
const ORE_CHANNEL: u64 = 2;
/// Seed purpose for the ore-kind channel.
const ORE_KIND_CHANNEL: u64 = 3;

/// A generated resource deposit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OreDeposit {
    /// What the node yields.
    pub ore_type: OreType,
    /// Starting amount.
    pub amount: u32,
}

/// Classification of one tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TerrainSample {
    /// Terrain type.
    pub kind: TileType,
    /// Deposit on this tile, never on water.
    pub ore: Option<OreDeposit>,
}

/// Maps world tiles to terrain using three noise channels.
///
/// Generic over the field so tests can drive generation with closures.
pub struct TerrainClassifier<N: NoiseField = FractalNoise> {
    terrain: N,
    ore: N,
    ore_kind: N,
    water_threshold: f64,
    dirt_threshold: f64,
    ore_threshold: f64,
    min_ore_amount: u32,
    max_ore_amount: u32,
}

impl TerrainClassifier<FractalNoise> {
    /// Builds the simplex-backed classifier described by `config`.
    #[must_use]
    pub fn from_config(config: &WorldManagerConfig) -> Self {
        let seed = WorldSeed::new(config.seed);
        Self::with_fields(
            FractalNoise::new(
                seed.derive(TERRAIN_CHANNEL),
                config.terrain_frequency,
                config.terrain_octaves,
            ),
            FractalNoise::new(seed.derive(ORE_CHANNEL), config.ore_frequency, 2),
            FractalNoise::new(seed.derive(ORE_KIND_CHANNEL), config.ore_frequency * 0.5, 1),
            config,
        )
    }
}

impl<N: NoiseField> TerrainClassifier<N> {
    /// Builds a classifier from explicit fields and the thresholds in `config`.
    #[must_use]
    pub fn with_fields(terrain: N, ore: N, ore_kind: N, config: &WorldManagerConfig) -> Self {
        Self {
            terrain,
            ore,
            ore_kind,
            water_threshold: config.water_threshold,
            dirt_threshold: config.dirt_threshold,
            ore_threshold: config.ore_threshold,
            min_ore_amount: config.min_ore_amount,
            max_ore_amount: config.max_ore_amount,
        }
    }

    /// Terrain type for a raw terrain sample.
    #[inline]
    #[must_use]
    pub fn tile_type(&self, value: f64) -> TileType {
        if value < self.water_threshold {
            TileType::Water
        } else if value < self.dirt_threshold {
            TileType::Dirt
        } else {
            TileType::Grass
        }
    }

    /// Node amount for a raw ore sample, `None` at or below the threshold.
    ///
    /// Linear over `(ore_threshold, 1]` onto `[min, max]`, clamped.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn ore_amount(&self, value: f64) -> Option<u32> {
        if value <= self.ore_threshold {
            return None;
        }
        let span = (1.0 - self.ore_threshold).max(f64::EPSILON);
        let t = ((value - self.ore_threshold) / span).clamp(0.0, 1.0);
        let min = f64::from(self.min_ore_amount);
        let max = f64::from(self.max_ore_amount);
        let amount = (min + t * (max - min)).round();
        Some((amount as u32).clamp(self.min_ore_amount, self.max_ore_amount))
    }

    /// Classifies one world tile.
    #[must_use]
    pub fn classify(&self, tile: TileIndex) -> TerrainSample {
        let x = f64::from(tile.x);
        let y = f64::from(tile.y);

        let kind = self.tile_type(self.terrain.sample(x, y));
        if kind == TileType::Water {
            return TerrainSample { kind, ore: None };
        }

        let ore = self.ore_amount(self.ore.sample(x, y)).map(|amount| OreDeposit {
            ore_type: OreType::from_index(discrete(self.ore_kind.sample(x, y), OreType::COUNT)),
            amount,
        });
        TerrainSample { kind, ore }
    }

    /// Ore amount range `(min, max)`.
    #[inline]
    #[must_use]
    pub const fn ore_amount_range(&self) -> (u32, u32) {
        (self.min_ore_amount, self.max_ore_amount)
    }
}
