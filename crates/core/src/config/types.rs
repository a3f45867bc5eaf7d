use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::queue::QueueConfig;
use crate::sweeper::SweeperConfig;
use crate::turnover::TurnoverConfig;

/// Root configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub turnover: TurnoverConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub sweeper: SweeperConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("bedflow.db")
}

/// Config as exposed by `GET /api/v1/config`.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    /// Only the file name; the full path stays server-side.
    pub database_file: Option<String>,
    pub turnover: TurnoverConfig,
    pub queue: QueueConfig,
    pub sweeper: SweeperConfig,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database_file: config
                .database
                .path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            turnover: config.turnover.clone(),
            queue: config.queue.clone(),
            sweeper: config.sweeper.clone(),
        }
    }
}
