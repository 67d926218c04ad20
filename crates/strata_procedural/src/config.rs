//! # World Configuration
//!
//! Generation thresholds and streaming radius. Loaded once at startup from
//! TOML, or built from the code presets.
//!
//! ```toml
//! seed = 12345
//! view_distance = 3
//! water_threshold = -0.3
//! ore_threshold = 0.6
//! ```
//!
//! Missing keys fall back to [`WorldManagerConfig::default`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{WorldError, WorldResult};

/// Default streaming radius in chunks.
pub const DEFAULT_VIEW_DISTANCE: u32 = 2;

/// Largest accepted streaming radius.
pub const MAX_VIEW_DISTANCE: u32 = 64;

/// Configuration for the world manager.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorldManagerConfig {
    /// World seed; same seed, same terrain.
    pub seed: u64,
    /// Chebyshev radius (chunks) kept active around each centre.
    pub view_distance: u32,
    /// Terrain noise below this is water.
    pub water_threshold: f64,
    /// Terrain noise below this (and not water) is dirt; above is grass.
    pub dirt_threshold: f64,
    /// Ore noise above this spawns a resource node.
    pub ore_threshold: f64,
    /// Smallest generated node amount.
    pub min_ore_amount: u32,
    /// Largest generated node amount.
    pub max_ore_amount: u32,
    /// Base frequency of the terrain field (per tile).
    pub terrain_frequency: f64,
    /// Octaves of the terrain field.
    pub terrain_octaves: u32,
    /// Base frequency of the ore fields (per tile).
    pub ore_frequency: f64,
}

impl Default for WorldManagerConfig {
    fn default() -> Self {
        Self {
            seed: 0xDEAD_BEEF_CAFE_BABE,
            view_distance: DEFAULT_VIEW_DISTANCE,
            water_threshold: -0.25,
            dirt_threshold: 0.1,
            ore_threshold: 0.55,
            min_ore_amount: 50,
            max_ore_amount: 500,
            terrain_frequency: 0.04,
            terrain_octaves: 4,
            ore_frequency: 0.12,
        }
    }
}

impl WorldManagerConfig {
    /// Server preset: wider streaming radius, same generation.
    #[must_use]
    pub fn production() -> Self {
        Self {
            view_distance: 3,
            ..Self::default()
        }
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`WorldError::ConfigParse`] for malformed TOML or unknown keys,
    /// [`WorldError::InvalidConfig`] if validation fails.
    pub fn from_toml_str(source: &str) -> WorldResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        tracing::info!(seed = config.seed, view_distance = config.view_distance, "world config parsed");
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`WorldError::ConfigIo`] if the file cannot be read, otherwise as
    /// [`Self::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> WorldResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| WorldError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Checks that thresholds and ranges are ordered and finite.
    ///
    /// # Errors
    ///
    /// [`WorldError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> WorldResult<()> {
        if self.view_distance > MAX_VIEW_DISTANCE {
            return Err(invalid(format!(
                "view_distance {} exceeds {MAX_VIEW_DISTANCE}",
                self.view_distance
            )));
        }
        for (name, value) in [
            ("water_threshold", self.water_threshold),
            ("dirt_threshold", self.dirt_threshold),
            ("ore_threshold", self.ore_threshold),
        ] {
            if !(-1.0..=1.0).contains(&value) {
                return Err(invalid(format!("{name} {value} outside [-1, 1]")));
            }
        }
        if self.water_threshold > self.dirt_threshold {
            return Err(invalid(format!(
                "water_threshold {} above dirt_threshold {}",
                self.water_threshold, self.dirt_threshold
            )));
        }
        if self.ore_threshold >= 1.0 {
            return Err(invalid("ore_threshold must be below 1".to_string()));
        }
        if self.min_ore_amount == 0 || self.min_ore_amount > self.max_ore_amount {
            return Err(invalid(format!(
                "ore amount range [{}, {}] is empty or starts at zero",
                self.min_ore_amount, self.max_ore_amount
            )));
        }
        for (name, value) in [
            ("terrain_frequency", self.terrain_frequency),
            ("ore_frequency", self.ore_frequency),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(format!("{name} must be positive, got {value}")));
            }
        }
        if !(1..=16).contains(&self.terrain_octaves) {
            return Err(invalid(format!(
                "terrain_octaves {} outside [1, 16]",
                self.terrain_octaves
            )));
        }
        Ok(())
    }
}

fn invalid(reason: String) -> WorldError {
    WorldError::InvalidConfig(reason)
}
