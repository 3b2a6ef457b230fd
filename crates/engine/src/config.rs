//! Tunables for a simulation session. Every section has serde defaults so a
//! config file only needs the values it changes.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config json: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
    },
    #[error("parse config json at {path}: {source}")]
    ParseAt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config value {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub seed: u64,
    pub lives: u32,
    pub ticks_per_second: u32,
    pub avatar: AvatarConfig,
    pub pursuer: PursuerConfig,
    pub population: PopulationConfig,
    pub decisions: DecisionConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED_EC40,
            lives: 3,
            ticks_per_second: 60,
            avatar: AvatarConfig::default(),
            pursuer: PursuerConfig::default(),
            population: PopulationConfig::default(),
            decisions: DecisionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvatarConfig {
    pub hit_points: i32,
    pub walk_speed: f32,
    pub sprint_speed: f32,
    pub radius: f32,
    pub turn_degrees_per_tick: f32,
    pub attack_range: f32,
    pub push_range: f32,
    pub damage: i32,
    pub attack_window_ticks: u32,
    pub push_window_ticks: u32,
    pub stamina_max: f32,
    pub stamina_regen: f32,
    pub stamina_interval_ticks: u32,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            hit_points: 100,
            walk_speed: 1.0 / 16.0,
            sprint_speed: 1.0 / 11.0,
            radius: 0.25,
            turn_degrees_per_tick: 3.0,
            attack_range: 0.65,
            push_range: 0.6,
            damage: 10,
            attack_window_ticks: 40,
            push_window_ticks: 50,
            stamina_max: 5.0,
            stamina_regen: 0.2,
            stamina_interval_ticks: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PursuerConfig {
    pub hit_points: i32,
    pub elite_hit_points: i32,
    pub speed: f32,
    pub elite_speed: f32,
    pub radius: f32,
    pub scent_radius: u32,
    pub attack_range: f32,
    pub damage: i32,
    pub attack_cooldown_ticks: u32,
    pub push_ticks: u32,
    pub push_speed_bonus: f32,
    pub random_walk_chance: f64,
}

impl Default for PursuerConfig {
    fn default() -> Self {
        Self {
            hit_points: 30,
            elite_hit_points: 50,
            speed: 0.035,
            elite_speed: 0.05,
            radius: 0.2,
            scent_radius: 15,
            attack_range: 0.65,
            damage: 10,
            attack_cooldown_ticks: 40,
            push_ticks: 7,
            push_speed_bonus: 0.1,
            random_walk_chance: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    pub min_pursuers: u32,
    pub max_pursuers: u32,
    pub spawn_chance: f64,
    pub max_spawn_passes: u32,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            min_pursuers: 10,
            max_pursuers: 20,
            spawn_chance: 0.05,
            max_spawn_passes: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    pub ordinary_interval_ms: u64,
    pub elite_interval_ms: u64,
    pub channel_capacity: usize,
    /// Derive decision cycles from the tick counter instead of a thread.
    pub deterministic: bool,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            ordinary_interval_ms: 2000,
            elite_interval_ms: 500,
            channel_capacity: 16,
            deterministic: false,
        }
    }
}

impl DecisionConfig {
    pub fn ordinary_interval(&self) -> Duration {
        Duration::from_millis(self.ordinary_interval_ms)
    }

    pub fn elite_interval(&self) -> Duration {
        Duration::from_millis(self.elite_interval_ms)
    }
}

impl SimConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let config: SimConfig = match serde_path_to_error::deserialize(&mut deserializer) {
            Ok(config) => config,
            Err(error) => {
                let path = error.path().to_string();
                let source = error.into_inner();
                return if path.is_empty() || path == "." {
                    Err(ConfigError::Parse { source })
                } else {
                    Err(ConfigError::ParseAt { path, source })
                };
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ticks_per_second == 0 {
            return Err(invalid("ticks_per_second", "must be at least 1"));
        }
        positive("avatar.walk_speed", self.avatar.walk_speed)?;
        positive("avatar.sprint_speed", self.avatar.sprint_speed)?;
        positive("avatar.radius", self.avatar.radius)?;
        positive("avatar.attack_range", self.avatar.attack_range)?;
        positive("avatar.push_range", self.avatar.push_range)?;
        positive("avatar.stamina_max", self.avatar.stamina_max)?;
        non_negative("avatar.turn_degrees_per_tick", self.avatar.turn_degrees_per_tick)?;
        non_negative("avatar.stamina_regen", self.avatar.stamina_regen)?;
        if self.avatar.hit_points <= 0 {
            return Err(invalid("avatar.hit_points", "must be positive"));
        }
        if self.avatar.stamina_interval_ticks == 0 {
            return Err(invalid("avatar.stamina_interval_ticks", "must be at least 1"));
        }

        positive("pursuer.speed", self.pursuer.speed)?;
        positive("pursuer.elite_speed", self.pursuer.elite_speed)?;
        positive("pursuer.radius", self.pursuer.radius)?;
        positive("pursuer.attack_range", self.pursuer.attack_range)?;
        non_negative("pursuer.push_speed_bonus", self.pursuer.push_speed_bonus)?;
        if self.pursuer.hit_points <= 0 || self.pursuer.elite_hit_points <= 0 {
            return Err(invalid("pursuer.hit_points", "must be positive"));
        }
        probability("pursuer.random_walk_chance", self.pursuer.random_walk_chance)?;

        probability("population.spawn_chance", self.population.spawn_chance)?;
        if self.population.min_pursuers > self.population.max_pursuers {
            return Err(invalid(
                "population.min_pursuers",
                format!(
                    "{} exceeds max_pursuers {}",
                    self.population.min_pursuers, self.population.max_pursuers
                ),
            ));
        }

        if self.decisions.ordinary_interval_ms == 0 || self.decisions.elite_interval_ms == 0 {
            return Err(invalid("decisions", "intervals must be non-zero"));
        }
        if self.decisions.channel_capacity == 0 {
            return Err(invalid("decisions.channel_capacity", "must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("expected a finite positive number, got {value}")))
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("expected a finite non-negative number, got {value}")))
    }
}

fn probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, format!("expected a value in [0, 1], got {value}")))
    }
}
