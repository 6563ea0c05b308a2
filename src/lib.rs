use std::time::Duration;

use serde::Deserialize;

pub mod app;
pub mod errors;
pub mod logger;
pub mod metrics;
pub mod store;
pub mod utils;
pub mod views;
pub mod wait;

pub use app::{classify_status, AppSnapshot, StatusLabel, StatusReport, Workload};
pub use errors::{Error, WaitError};
pub use logger::{EventLogger, LogEventLogger};
pub use store::{AppStore, SnapshotCell, SnapshotSource};
pub use wait::{PollMode, WaitCoordinator, WaitTarget};

fn default_server_host() -> String {
    "0.0.0.0".to_owned()
}

fn default_server_port() -> u16 {
    8888
}

fn default_wait_poll_mode() -> String {
    "converge".to_owned()
}

fn default_max_wait_timeout_secs() -> u64 {
    600
}

/// Raw settings as read from the environment by `envy`
#[derive(Deserialize, Debug, Clone)]
pub struct RuntimeEnvironmentConfig {
    #[serde(default = "default_server_host")]
    pub server_host: String,
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    #[serde(default = "default_wait_poll_mode")]
    pub wait_poll_mode: String,
    #[serde(default = "default_max_wait_timeout_secs")]
    pub max_wait_timeout_secs: u64,
}

impl Default for RuntimeEnvironmentConfig {
    fn default() -> Self {
        RuntimeEnvironmentConfig {
            server_host: default_server_host(),
            server_port: default_server_port(),
            wait_poll_mode: default_wait_poll_mode(),
            max_wait_timeout_secs: default_max_wait_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub wait_poll_mode: PollMode,
    pub max_wait_timeout: Duration,
}

impl Config {
    pub fn from_env_config(env_config: RuntimeEnvironmentConfig) -> Result<Self, Error> {
        let wait_poll_mode = env_config
            .wait_poll_mode
            .parse::<PollMode>()
            .map_err(|err| Error::InvalidConfig("WAIT_POLL_MODE", err))?;
        if env_config.max_wait_timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "MAX_WAIT_TIMEOUT_SECS",
                "must be greater than 0".to_owned(),
            ));
        }
        Ok(Config {
            server_host: env_config.server_host,
            server_port: env_config.server_port,
            wait_poll_mode,
            max_wait_timeout: Duration::from_secs(env_config.max_wait_timeout_secs),
        })
    }

    pub fn from_env() -> Result<Self, Error> {
        Self::from_env_config(envy::from_env::<RuntimeEnvironmentConfig>()?)
    }
}
