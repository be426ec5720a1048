//! Session configuration with documented tunables
//!
//! Every delay and retry count the launch sequence uses lives here so that
//! operators can tune pacing for slow servers without touching code.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SortieError};

/// Configuration for one session launch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    // === SERVER ===
    /// Host the primary client and every bot connect to
    pub server_host: String,

    /// Port the primary client and every bot connect to
    pub server_port: u16,

    /// Display name of the local (human) player
    pub player_name: String,

    /// Camouflage applied to the local player's units
    pub camouflage: String,

    /// Player colour shown in the lounge
    pub colour: String,

    /// Directory generated-board templates are resolved against
    pub map_template_dir: PathBuf,

    // === PHASE POLLING ===
    /// How many times to ask the server for its phase before giving up
    ///
    /// At the default interval (50ms), 1000 polls bound the wait at ~50s.
    pub phase_poll_retries: u32,

    /// Delay between phase polls
    pub phase_poll_interval_ms: u64,

    // === PACING ===
    /// Pause after each configuration push so the server can digest it
    ///
    /// The engine processes option, map and condition packets serially;
    /// pushing the next one too early gets it silently dropped.
    pub step_pacing_ms: u64,

    /// Wake interval of the idle loop that waits for a stop request
    pub idle_interval_ms: u64,

    // === BOTS ===
    /// Connection attempts per bot before it is marked failed
    pub bot_connect_retries: u32,

    /// Delay between bot connection attempts
    pub bot_connect_delay_ms: u64,

    /// Polls for the bot's player slot to appear before it is marked failed
    ///
    /// 250 polls at 50ms bound a bot's readiness wait at ~12.5s.
    pub bot_ready_retries: u32,

    /// Delay between bot readiness polls
    pub bot_ready_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_host: "localhost".to_string(),
            server_port: 2346,
            player_name: "Commander".to_string(),
            camouflage: "Standard".to_string(),
            colour: "Blue".to_string(),
            map_template_dir: PathBuf::from("data/mapgen"),

            phase_poll_retries: 1000,
            phase_poll_interval_ms: 50,

            step_pacing_ms: 1000,
            idle_interval_ms: 50,

            bot_connect_retries: 3,
            bot_connect_delay_ms: 500,
            bot_ready_retries: 250,
            bot_ready_delay_ms: 50,
        }
    }
}

impl SessionConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML; absent keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SessionConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.server_host.trim().is_empty() {
            return Err(SortieError::Config("server_host must not be empty".into()));
        }

        if self.phase_poll_retries == 0 {
            return Err(SortieError::Config(
                "phase_poll_retries must be at least 1".into(),
            ));
        }

        if self.bot_connect_retries == 0 || self.bot_ready_retries == 0 {
            return Err(SortieError::Config(format!(
                "bot retries must be at least 1 (connect: {}, ready: {})",
                self.bot_connect_retries, self.bot_ready_retries
            )));
        }

        Ok(())
    }

    pub fn step_pacing(&self) -> Duration {
        Duration::from_millis(self.step_pacing_ms)
    }

    pub fn phase_poll_interval(&self) -> Duration {
        Duration::from_millis(self.phase_poll_interval_ms)
    }

    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_interval_ms)
    }

    pub fn bot_connect_delay(&self) -> Duration {
        Duration::from_millis(self.bot_connect_delay_ms)
    }

    pub fn bot_ready_delay(&self) -> Duration {
        Duration::from_millis(self.bot_ready_delay_ms)
    }
}
