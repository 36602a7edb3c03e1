//! Server configuration.
//!
//! Read from a TOML file. Every section and every field has a default, so
//! an empty or missing file yields a working server.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use skirmish_sim::SimConfig;
use skirmish_tick::TickConfig;
use tracing::info;

use crate::SkirmishError;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: NetworkConfig,
    #[serde(default)]
    pub tick: TickSettings,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub sim: SimConfig,
}

impl ServerConfig {
    /// Loads configuration from `path`, or returns defaults if the file
    /// does not exist.
    pub fn load(path: &Path) -> Result<Self, SkirmishError> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config = toml::from_str(&contents)?;
            info!(path = %path.display(), "loaded configuration");
            Ok(config)
        } else {
            info!(path = %path.display(), "no config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// `bind:port` as handed to the transport.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }

    /// Scheduler settings, validated.
    pub fn tick_config(&self) -> TickConfig {
        TickConfig {
            tick_rate_hz: self.tick.rate_hz,
            spin_threshold: Duration::from_micros(self.tick.spin_threshold_us),
            ..TickConfig::default()
        }
        .validated()
    }
}

/// Networking, identity of the world, and save file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Port to listen on. `0` lets the OS choose.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Fixed world seed. Derived at startup when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_save_path")]
    pub save_path: PathBuf,
    /// How long a new connection may take to send its `JOIN` line. Kept
    /// short: a client that never sends one waits this long for `HELLO`.
    #[serde(default = "default_join_timeout_ms")]
    pub join_timeout_ms: u64,
    /// A single write that blocks longer than this drops the connection.
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
    /// Seconds of simulated time between saves.
    #[serde(default = "default_persist_interval")]
    pub persist_interval_secs: u32,
}

impl NetworkConfig {
    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms.max(1))
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            seed: None,
            save_path: default_save_path(),
            join_timeout_ms: default_join_timeout_ms(),
            write_timeout_ms: default_write_timeout_ms(),
            persist_interval_secs: default_persist_interval(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    7777
}
fn default_save_path() -> PathBuf {
    PathBuf::from("skirmish.save")
}
fn default_join_timeout_ms() -> u64 {
    150
}
fn default_write_timeout_ms() -> u64 {
    5000
}
fn default_persist_interval() -> u32 {
    10
}

/// Simulation clock.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TickSettings {
    pub rate_hz: u32,
    /// How long before each deadline the loop stops sleeping and starts
    /// spinning. `0` sleeps all the way.
    pub spin_threshold_us: u64,
}

impl Default for TickSettings {
    fn default() -> Self {
        Self {
            rate_hz: 60,
            spin_threshold_us: 1000,
        }
    }
}

/// Generated map size in tiles.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MapConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 48,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.server.join_timeout(), Duration::from_millis(150));
        assert_eq!(config.server.write_timeout(), Duration::from_secs(5));
        assert_eq!(config.tick.rate_hz, 60);
        assert_eq!((config.map.width, config.map.height), (64, 48));
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            [server]
            port = 9000
            seed = 42

            [sim.enemy]
            count = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.seed, Some(42));
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.sim.enemy.count, 3);
        assert_eq!(config.sim.enemy.max_hp, 60.0);
        assert_eq!(config.sim.player, Default::default());
    }

    #[test]
    fn test_listen_addr() {
        let mut config = ServerConfig::default();
        config.server.bind = "127.0.0.1".into();
        config.server.port = 0;
        assert_eq!(config.listen_addr(), "127.0.0.1:0");
    }

    #[test]
    fn test_tick_config_is_validated() {
        let mut config = ServerConfig::default();
        config.tick.rate_hz = 10_000;
        config.tick.spin_threshold_us = 0;

        let tick = config.tick_config();
        assert_eq!(tick.tick_rate_hz, TickConfig::MAX_TICK_RATE_HZ);
        assert_eq!(tick.spin_threshold, Duration::ZERO);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("skirmish-config-does-not-exist.toml");
        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_load_invalid_file_is_error() {
        let path = std::env::temp_dir().join(format!(
            "skirmish-config-invalid-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[server\nport = ").unwrap();

        let result = ServerConfig::load(&path);
        let _ = std::fs::remove_file(&path);

        assert!(matches!(result, Err(SkirmishError::Config(_))));
    }
}
