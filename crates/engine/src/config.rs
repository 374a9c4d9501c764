use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::ecs::MAX_ENTITIES;
use crate::spatial::{DEFAULT_MIN_SUBDIVISION_SIZE, DEFAULT_THRESHOLD};

pub const DEFAULT_SPRINT_MULTIPLIER: f32 = 2.0;
pub const DEFAULT_COLLISION_ATTEMPTS: u32 = 6;

/// Tunables for one simulated world. Missing JSON fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorldConfig {
    pub entity_capacity: usize,
    pub quadtree_threshold: usize,
    pub min_subdivision_size: f32,
    pub sprint_multiplier: f32,
    pub max_collision_attempts: u32,
    /// `None` resolves tile overlaps until none remain.
    pub max_tile_collision_attempts: Option<u32>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            entity_capacity: MAX_ENTITIES,
            quadtree_threshold: DEFAULT_THRESHOLD,
            min_subdivision_size: DEFAULT_MIN_SUBDIVISION_SIZE,
            sprint_multiplier: DEFAULT_SPRINT_MULTIPLIER,
            max_collision_attempts: DEFAULT_COLLISION_ATTEMPTS,
            max_tile_collision_attempts: Some(DEFAULT_COLLISION_ATTEMPTS),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("entity_capacity must be within 1..={max}, got {actual}")]
    EntityCapacity { max: usize, actual: usize },
    #[error("quadtree_threshold must be at least 1")]
    ZeroThreshold,
    #[error("{field} must be positive and finite, got {value}")]
    NonPositive { field: &'static str, value: f32 },
    #[error("max_collision_attempts must be at least 1")]
    ZeroCollisionAttempts,
    #[error("failed to read world config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid world config at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl WorldConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.entity_capacity == 0 || self.entity_capacity > MAX_ENTITIES {
            return Err(ConfigError::EntityCapacity {
                max: MAX_ENTITIES,
                actual: self.entity_capacity,
            });
        }
        if self.quadtree_threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        for (field, value) in [
            ("min_subdivision_size", self.min_subdivision_size),
            ("sprint_multiplier", self.sprint_multiplier),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        if self.max_collision_attempts == 0 || self.max_tile_collision_attempts == Some(0) {
            return Err(ConfigError::ZeroCollisionAttempts);
        }
        Ok(())
    }

    /// Parses and validates; parse failures carry the offending JSON path.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let deserializer = &mut serde_json::Deserializer::from_str(json);
        let config: Self = serde_path_to_error::deserialize(deserializer).map_err(|err| {
            ConfigError::Parse {
                path: err.path().to_string(),
                source: err.into_inner(),
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = WorldConfig::default();
        config.validate().expect("defaults validate");
        assert_eq!(config.entity_capacity, 255);
        assert_eq!(config.quadtree_threshold, 6);
        assert_eq!(config.max_tile_collision_attempts, Some(6));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = WorldConfig::from_json_str(r#"{ "sprint_multiplier": 1.5 }"#)
            .expect("partial config parses");
        assert_eq!(config.sprint_multiplier, 1.5);
        assert_eq!(config.min_subdivision_size, 16.0);

        let uncapped = WorldConfig::from_json_str(r#"{ "max_tile_collision_attempts": null }"#)
            .expect("null cap parses");
        assert_eq!(uncapped.max_tile_collision_attempts, None);
    }

    #[test]
    fn parse_errors_report_path() {
        let err = WorldConfig::from_json_str(r#"{ "quadtree_threshold": "six" }"#)
            .expect_err("wrong type");
        match err {
            ConfigError::Parse { path, .. } => assert_eq!(path, "quadtree_threshold"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("world.json");
        fs::write(&path, r#"{ "entity_capacity": 32 }"#).expect("write config");
        let config = WorldConfig::from_path(&path).expect("config loads");
        assert_eq!(config.entity_capacity, 32);

        let missing = WorldConfig::from_path(&dir.path().join("absent.json"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let too_many = WorldConfig {
            entity_capacity: 300,
            ..WorldConfig::default()
        };
        assert!(matches!(
            too_many.validate(),
            Err(ConfigError::EntityCapacity { actual: 300, .. })
        ));

        let zero_threshold = WorldConfig {
            quadtree_threshold: 0,
            ..WorldConfig::default()
        };
        assert!(matches!(zero_threshold.validate(), Err(ConfigError::ZeroThreshold)));

        let bad_sprint = WorldConfig {
            sprint_multiplier: -1.0,
            ..WorldConfig::default()
        };
        assert!(matches!(
            bad_sprint.validate(),
            Err(ConfigError::NonPositive {
                field: "sprint_multiplier",
                ..
            })
        ));
    }
}
