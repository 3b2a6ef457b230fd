use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use echo_engine::{ConfigError, SessionConfig, SimConfig, World};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::autopilot::Autopilot;
use super::maps::{load_board, MapError};
use super::presentation::PresentationMirror;

const CONFIG_ENV_VAR: &str = "ECHO_CONFIG";
const MAP_ENV_VAR: &str = "ECHO_MAP";
const SEED_ENV_VAR: &str = "ECHO_SEED";
const MAX_TICKS_ENV_VAR: &str = "ECHO_MAX_TICKS";
const REALTIME_ENV_VAR: &str = "ECHO_REALTIME";
/// Five minutes at the default tick rate.
const DEFAULT_MAX_TICKS: u64 = 60 * 60 * 5;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Map(#[from] MapError),
}

pub(crate) struct AppWiring {
    pub(crate) session: SessionConfig,
    pub(crate) world: World,
    pub(crate) pilot: Autopilot,
    pub(crate) mirror: PresentationMirror,
}

pub(crate) fn build_app() -> Result<AppWiring, AppError> {
    info!("=== Echo Startup ===");

    let config_path = read_env_path(CONFIG_ENV_VAR);
    let mut config = match &config_path {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    if let Some(seed) = read_env_parsed::<u64>(SEED_ENV_VAR) {
        config.seed = seed;
    }

    let map_path = read_env_path(MAP_ENV_VAR);
    let board = load_board(map_path.as_deref())?;

    let session = SessionConfig {
        target_tps: config.ticks_per_second,
        max_ticks: Some(read_env_parsed(MAX_TICKS_ENV_VAR).unwrap_or(DEFAULT_MAX_TICKS)),
        realtime: read_env_parsed(REALTIME_ENV_VAR).unwrap_or(true),
        ..SessionConfig::default()
    };

    info!(
        config = %describe_source(config_path.as_deref(), "defaults"),
        map = %describe_source(map_path.as_deref(), "demo"),
        seed = config.seed,
        width = board.width(),
        height = board.height(),
        "startup"
    );

    let world = World::new(config, board)?;
    Ok(AppWiring {
        session,
        world,
        pilot: Autopilot::default(),
        mirror: PresentationMirror::default(),
    })
}

pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn read_env_path(var: &'static str) -> Option<PathBuf> {
    env::var_os(var)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn read_env_parsed<T: FromStr>(var: &'static str) -> Option<T> {
    parse_env_value(var, env::var(var))
}

/// Invalid or unreadable values are logged and ignored so the caller falls
/// back to its configured default.
fn parse_env_value<T: FromStr>(
    var: &'static str,
    value: Result<String, env::VarError>,
) -> Option<T> {
    match value {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                warn!(
                    env_var = var,
                    value = raw.as_str(),
                    "invalid env var value; falling back to config"
                );
                None
            }
        },
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!(
                env_var = var,
                error = %err,
                "unable to read env var; falling back to config"
            );
            None
        }
    }
}

fn describe_source(path: Option<&Path>, fallback: &str) -> String {
    path.map(|path| path.display().to_string())
        .unwrap_or_else(|| fallback.to_string())
}
