//! Server configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub eject: EjectConfig,
    #[serde(default)]
    pub spatial: SpatialConfig,
    #[serde(default)]
    pub bot: BotConfig,
}

impl Config {
    /// Load configuration from `config.toml` or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("config.toml"))
    }

    /// Load configuration from `path`, writing the defaults there if it is missing.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            info!("No {} found, creating default config", path.display());
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            Ok(default_config)
        }
    }

    /// Tick interval derived from the configured tick rate.
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.server.tick_rate.max(1) as f64)
    }
}

/// Server networking and scheduling settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Simulation ticks per second.
    #[serde(default = "default_tick_rate")]
    pub tick_rate: u32,
    /// Maximum simultaneous connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Number of bots to spawn.
    #[serde(default = "default_bots")]
    pub bots: usize,
    /// Upper bound on a single physics step in seconds (0 = unclamped).
    #[serde(default)]
    pub max_step_secs: f64,
    /// World RNG seed (0 = seed from OS entropy).
    #[serde(default)]
    pub seed: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            tick_rate: default_tick_rate(),
            max_connections: default_max_connections(),
            bots: default_bots(),
            max_step_secs: 0.0,
            seed: 0,
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_tick_rate() -> u32 {
    20
}
fn default_max_connections() -> usize {
    100
}
fn default_bots() -> usize {
    8
}

/// World dimensions and ambient entity counts.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorldConfig {
    /// Side length of the square world, centered at the origin.
    #[serde(default = "default_world_size")]
    pub size: f32,
    #[serde(default = "default_food_count")]
    pub food_count: usize,
    #[serde(default = "default_food_radius")]
    pub food_radius: f32,
    #[serde(default = "default_virus_count")]
    pub virus_count: usize,
    #[serde(default = "default_virus_radius")]
    pub virus_radius: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            size: default_world_size(),
            food_count: default_food_count(),
            food_radius: default_food_radius(),
            virus_count: default_virus_count(),
            virus_radius: default_virus_radius(),
        }
    }
}

fn default_world_size() -> f32 {
    6000.0
}
fn default_food_count() -> usize {
    800
}
fn default_food_radius() -> f32 {
    10.0
}
fn default_virus_count() -> usize {
    20
}
fn default_virus_radius() -> f32 {
    60.0
}

/// Player cell configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerConfig {
    #[serde(default = "default_start_radius")]
    pub start_radius: f32,
    /// Acceleration of a radius-40 cell; larger cells are slower.
    #[serde(default = "default_base_speed")]
    pub base_speed: f32,
    /// Seconds after a split before siblings may merge.
    #[serde(default = "default_merge_time")]
    pub merge_time: f32,
    #[serde(default = "default_split_speed")]
    pub split_speed: f32,
    #[serde(default = "default_min_split_radius")]
    pub min_split_radius: f32,
    #[serde(default = "default_min_eject_radius")]
    pub min_eject_radius: f32,
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            start_radius: default_start_radius(),
            base_speed: default_base_speed(),
            merge_time: default_merge_time(),
            split_speed: default_split_speed(),
            min_split_radius: default_min_split_radius(),
            min_eject_radius: default_min_eject_radius(),
            max_name_length: default_max_name_length(),
        }
    }
}

fn default_start_radius() -> f32 {
    20.0
}
fn default_base_speed() -> f32 {
    900.0
}
fn default_merge_time() -> f32 {
    10.0
}
fn default_split_speed() -> f32 {
    600.0
}
fn default_min_split_radius() -> f32 {
    10.0
}
fn default_min_eject_radius() -> f32 {
    35.0
}
fn default_max_name_length() -> usize {
    16
}

/// Ejected mass configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EjectConfig {
    #[serde(default = "default_eject_speed")]
    pub speed: f32,
    /// Per-tick velocity multiplier for ejected pellets.
    #[serde(default = "default_eject_drag")]
    pub drag: f32,
}

impl Default for EjectConfig {
    fn default() -> Self {
        Self {
            speed: default_eject_speed(),
            drag: default_eject_drag(),
        }
    }
}

fn default_eject_speed() -> f32 {
    900.0
}
fn default_eject_drag() -> f32 {
    0.85
}

/// QuadTree tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpatialConfig {
    #[serde(default = "default_cell_capacity")]
    pub cell_capacity: usize,
    #[serde(default = "default_food_capacity")]
    pub food_capacity: usize,
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            cell_capacity: default_cell_capacity(),
            food_capacity: default_food_capacity(),
            max_depth: default_max_depth(),
        }
    }
}

fn default_cell_capacity() -> usize {
    8
}
fn default_food_capacity() -> usize {
    10
}
fn default_max_depth() -> u32 {
    8
}

/// Bot behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BotConfig {
    /// Chance per tick that a chasing bot splits.
    #[serde(default = "default_split_chance")]
    pub split_chance: f32,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            split_chance: default_split_chance(),
        }
    }
}

fn default_split_chance() -> f32 {
    0.01
}
