//! Server configuration.

use crate::level::LevelLibrary;
use shared::DEFAULT_PORT;
use std::path::PathBuf;
use std::time::Duration;

/// Settings for one server run.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory holding `level1.lvl` through `level10.lvl`.
    pub levels_dir: PathBuf,
    /// Simulation steps per second.
    pub tick_rate: u32,
    /// Unit of the pauses inserted after broadcasts.
    pub pacing: Duration,
    /// How long the loop waits between checks before anyone has joined.
    pub idle_timeout: Duration,
    pub max_clients: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            levels_dir: PathBuf::from("levels"),
            tick_rate: 60,
            pacing: Duration::from_millis(10),
            idle_timeout: Duration::from_millis(500),
            max_clients: 64,
        }
    }
}

impl ServerConfig {
    /// The `host:port` string the listener binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Time between simulation steps. A zero tick rate counts as one.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate.max(1)))
    }

    pub fn level_library(&self) -> LevelLibrary {
        LevelLibrary::directory(&self.levels_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:30001");
        assert_eq!(config.pacing, Duration::from_millis(10));
        assert!(matches!(config.level_library(), LevelLibrary::Directory(dir) if dir == PathBuf::from("levels")));
    }

    #[test]
    fn test_tick_duration() {
        let config = ServerConfig {
            tick_rate: 50,
            ..Default::default()
        };
        assert_eq!(config.tick_duration(), Duration::from_millis(20));

        let config = ServerConfig {
            tick_rate: 0,
            ..Default::default()
        };
        assert_eq!(config.tick_duration(), Duration::from_secs(1));
    }
}
