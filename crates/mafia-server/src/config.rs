use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use mafia_core::room::Phase;

/// Default config file, looked up in the working directory.
pub const CONFIG_FILE: &str = "mafia.toml";

/// Top-level server configuration, loaded from `mafia.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub web_root: String,
    pub limits: LimitsConfig,
    pub game: GameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            web_root: "public".to_string(),
            limits: LimitsConfig::default(),
            game: GameConfig::default(),
        }
    }
}

/// Infrastructure limits (connection caps, buffer sizes, rate limits).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_ws_connections: usize,
    pub ws_rate_limit_per_sec: f64,
    pub player_message_buffer: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_ws_connections: 500,
            ws_rate_limit_per_sec: 20.0,
            player_message_buffer: 256,
        }
    }
}

/// Game rules that are fixed for the lifetime of the process.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub night_duration_ms: u64,
    pub day_duration_ms: u64,
    /// Room code draws before giving up on creating a room.
    pub code_attempts: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            night_duration_ms: 30_000,
            day_duration_ms: 60_000,
            code_attempts: 50,
        }
    }
}

impl GameConfig {
    /// How long `phase` lasts before its timer fires. `None` for untimed phases.
    pub fn duration_of(&self, phase: Phase) -> Option<Duration> {
        match phase {
            Phase::Night => Some(Duration::from_millis(self.night_duration_ms)),
            Phase::Day => Some(Duration::from_millis(self.day_duration_ms)),
            Phase::Waiting | Phase::Ended => None,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("listen_addr {0:?} is not a valid socket address")]
    InvalidListenAddr(String),
    #[error("{0} must be > 0")]
    Zero(&'static str),
}

impl ServerConfig {
    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::InvalidListenAddr(self.listen_addr.clone()));
        }

        if self.limits.max_ws_connections == 0 {
            return Err(ConfigError::Zero("limits.max_ws_connections"));
        }
        if self.limits.ws_rate_limit_per_sec <= 0.0 {
            return Err(ConfigError::Zero("limits.ws_rate_limit_per_sec"));
        }
        if self.limits.player_message_buffer == 0 {
            return Err(ConfigError::Zero("limits.player_message_buffer"));
        }

        if self.game.night_duration_ms == 0 {
            return Err(ConfigError::Zero("game.night_duration_ms"));
        }
        if self.game.day_duration_ms == 0 {
            return Err(ConfigError::Zero("game.day_duration_ms"));
        }
        if self.game.code_attempts == 0 {
            return Err(ConfigError::Zero("game.code_attempts"));
        }
        Ok(())
    }

    /// Load config from `mafia.toml` if it exists, then apply env var overrides.
    pub fn load() -> Self {
        let mut config = Self::from_file(Path::new(CONFIG_FILE));
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    fn from_file(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!(path = %path.display(), "Loaded configuration");
                    cfg
                },
                Err(e) => {
                    tracing::warn!(path = %path.display(), "Failed to parse config: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!(path = %path.display(), "No config file found, using defaults");
                ServerConfig::default()
            },
        }
    }

    /// Override fields from `MAFIA_*` variables as returned by `var`.
    /// Unparsable numbers are ignored.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = var("MAFIA_LISTEN_ADDR")
            && !addr.is_empty()
        {
            self.listen_addr = addr;
        }
        if let Some(root) = var("MAFIA_WEB_ROOT")
            && !root.is_empty()
        {
            self.web_root = root;
        }

        if let Some(val) = var("MAFIA_MAX_WS_CONNECTIONS")
            && let Ok(n) = val.parse::<usize>()
        {
            self.limits.max_ws_connections = n;
        }
        if let Some(val) = var("MAFIA_WS_RATE_LIMIT")
            && let Ok(n) = val.parse::<f64>()
        {
            self.limits.ws_rate_limit_per_sec = n;
        }

        if let Some(val) = var("MAFIA_NIGHT_MS")
            && let Ok(n) = val.parse::<u64>()
        {
            self.game.night_duration_ms = n;
        }
        if let Some(val) = var("MAFIA_DAY_MS")
            && let Ok(n) = val.parse::<u64>()
        {
            self.game.day_duration_ms = n;
        }
    }
}
