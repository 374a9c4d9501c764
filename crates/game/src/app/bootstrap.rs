use std::env;
use std::num::ParseFloatError;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tileworld_engine::{ConfigError, WorldConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::loop_runner::LoopConfig;
use super::scenario::{Scenario, ScenarioError};

const CONFIG_ENV_VAR: &str = "TILEWORLD_CONFIG";
const SCENARIO_ENV_VAR: &str = "TILEWORLD_SCENARIO";
const RUN_SECONDS_ENV_VAR: &str = "TILEWORLD_RUN_SECONDS";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) world_config: WorldConfig,
    pub(crate) scenario: Scenario,
}

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    #[error("TILEWORLD_RUN_SECONDS={value} is not a number: {source}")]
    RunSeconds {
        value: String,
        #[source]
        source: ParseFloatError,
    },
    #[error("TILEWORLD_RUN_SECONDS={0} must be a positive number of seconds")]
    NonPositiveRunSeconds(String),
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Tileworld Startup ===");

    let world_config = match env_path(CONFIG_ENV_VAR) {
        Some(path) => {
            info!(path = %path.display(), "world_config_loading");
            WorldConfig::from_path(&path)?
        }
        None => WorldConfig::default(),
    };
    let scenario = match env_path(SCENARIO_ENV_VAR) {
        Some(path) => {
            info!(path = %path.display(), "scenario_loading");
            Scenario::from_path(&path)?
        }
        None => Scenario::builtin()?,
    };

    let mut config = LoopConfig::default();
    if let Ok(raw) = env::var(RUN_SECONDS_ENV_VAR) {
        config.run_duration = parse_run_seconds(&raw)?;
    }
    info!(
        scenario = %scenario.name,
        entity_capacity = world_config.entity_capacity,
        "app_configured"
    );

    Ok(AppWiring {
        config,
        world_config,
        scenario,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn env_path(var: &str) -> Option<PathBuf> {
    env::var_os(var)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn parse_run_seconds(raw: &str) -> Result<Duration, BootstrapError> {
    let value = raw.trim();
    let seconds: f64 = value.parse().map_err(|source| BootstrapError::RunSeconds {
        value: value.to_owned(),
        source,
    })?;
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(BootstrapError::NonPositiveRunSeconds(value.to_owned()));
    }
    Ok(Duration::from_secs_f64(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_seconds_parses_fractions() {
        assert_eq!(
            parse_run_seconds(" 2.5 ").expect("valid seconds"),
            Duration::from_millis(2500)
        );
    }

    #[test]
    fn run_seconds_rejects_garbage_and_non_positive() {
        assert!(matches!(
            parse_run_seconds("soon"),
            Err(BootstrapError::RunSeconds { .. })
        ));
        assert!(matches!(
            parse_run_seconds("0"),
            Err(BootstrapError::NonPositiveRunSeconds(_))
        ));
        assert!(matches!(
            parse_run_seconds("inf"),
            Err(BootstrapError::NonPositiveRunSeconds(_))
        ));
    }
}
