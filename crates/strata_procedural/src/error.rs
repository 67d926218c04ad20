//! # World Error Types
//!
//! Contract violations and configuration failures. Routine absence
//! (unloaded tiles, blocked placement) is reported with `Option`/`bool`.

use std::path::PathBuf;

use strata_core::{EcsError, EntityId};
use thiserror::Error;

/// Errors that can occur in the world manager.
#[derive(Error, Debug)]
pub enum WorldError {
    /// A registry contract was violated.
    #[error(transparent)]
    Ecs(#[from] EcsError),

    /// Configuration values are inconsistent.
    #[error("invalid world configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read.
    #[error("failed to read world configuration {path}: {source}")]
    ConfigIo {
        /// File that failed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for this schema.
    #[error("failed to parse world configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Streaming was asked to follow an entity without a position.
    #[error("entity {0} has no Position component")]
    MissingPosition(EntityId),
}

/// Result type for world operations.
pub type WorldResult<T> = Result<T, WorldError>;
