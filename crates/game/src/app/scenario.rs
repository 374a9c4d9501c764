use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tileworld_engine::{InputAction, MapCommand, PlayerInput};

pub(crate) const BUILTIN_SCENARIO_JSON: &str = include_str!("../../assets/demo_scenario.json");

/// Scripts and a scripted input timeline for the demo maps.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    pub(crate) name: String,
    #[serde(default = "default_dialogue_seconds")]
    pub(crate) dialogue_seconds: f32,
    /// Looping program for the hall guide.
    #[serde(default)]
    pub(crate) patrol: Vec<MapCommand>,
    #[serde(default)]
    pub(crate) scripts: HashMap<String, Vec<MapCommand>>,
    #[serde(default)]
    pub(crate) input: Vec<InputSegment>,
}

/// Actions held until `until_seconds` of simulated time.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct InputSegment {
    pub(crate) until_seconds: f32,
    #[serde(default)]
    pub(crate) actions: Vec<InputAction>,
}

fn default_dialogue_seconds() -> f32 {
    super::host::DEFAULT_DIALOGUE_SECONDS
}

#[derive(Debug, Error)]
pub(crate) enum ScenarioError {
    #[error("failed to read scenario {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid scenario JSON at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("input segment {index} ends at {until}s, before the previous segment")]
    UnorderedInput { index: usize, until: f32 },
}

impl Scenario {
    pub(crate) fn builtin() -> Result<Self, ScenarioError> {
        Self::from_json_str(BUILTIN_SCENARIO_JSON)
    }

    pub(crate) fn from_path(path: &Path) -> Result<Self, ScenarioError> {
        let json = fs::read_to_string(path).map_err(|source| ScenarioError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub(crate) fn from_json_str(json: &str) -> Result<Self, ScenarioError> {
        let deserializer = &mut serde_json::Deserializer::from_str(json);
        let scenario: Self = serde_path_to_error::deserialize(deserializer).map_err(|err| {
            ScenarioError::Parse {
                path: err.path().to_string(),
                source: err.into_inner(),
            }
        })?;
        scenario.validate()?;
        Ok(scenario)
    }

    fn validate(&self) -> Result<(), ScenarioError> {
        let mut previous = 0.0f32;
        for (index, segment) in self.input.iter().enumerate() {
            if segment.until_seconds < previous {
                return Err(ScenarioError::UnorderedInput {
                    index,
                    until: segment.until_seconds,
                });
            }
            previous = segment.until_seconds;
        }
        Ok(())
    }

    /// Input held at `elapsed_seconds`; nothing once the timeline runs out.
    pub(crate) fn input_at(&self, elapsed_seconds: f32) -> PlayerInput {
        self.input
            .iter()
            .find(|segment| elapsed_seconds < segment.until_seconds)
            .map(|segment| PlayerInput::from_actions(&segment.actions))
            .unwrap_or_default()
    }
}
