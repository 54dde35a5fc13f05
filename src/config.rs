//! Startup configuration.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! overrides from the command line or environment. They are read once and
//! never change while the server runs.

use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_new::new;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::Path;
use tracing::{debug, info, instrument};

const DEFAULT_ROWS: NonZeroUsize = NonZeroUsize::new(6).unwrap();
const DEFAULT_COLUMNS: NonZeroUsize = NonZeroUsize::new(9).unwrap();
const DEFAULT_WIN_LENGTH: NonZeroUsize = NonZeroUsize::new(5).unwrap();
const DEFAULT_QUEUE_CAPACITY: NonZeroUsize = NonZeroUsize::new(64).unwrap();

/// Grid dimensions and the run length needed to win.
///
/// The three values are independent. A `win_length` larger than both
/// dimensions is accepted; it just makes winning impossible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters, Serialize, Deserialize, new)]
pub struct GameConfig {
    /// Number of rows in the grid.
    #[serde(default = "default_rows")]
    rows: NonZeroUsize,

    /// Number of columns in the grid.
    #[serde(default = "default_columns")]
    columns: NonZeroUsize,

    /// Discs in a row needed to win.
    #[serde(default = "default_win_length")]
    win_length: NonZeroUsize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            columns: DEFAULT_COLUMNS,
            win_length: DEFAULT_WIN_LENGTH,
        }
    }
}

fn default_rows() -> NonZeroUsize {
    DEFAULT_ROWS
}

fn default_columns() -> NonZeroUsize {
    DEFAULT_COLUMNS
}

fn default_win_length() -> NonZeroUsize {
    DEFAULT_WIN_LENGTH
}

/// Where the WebSocket server listens.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    host: String,

    /// Port to bind to. Zero picks a free port.
    #[serde(default = "default_port")]
    port: u16,

    /// Outbound messages buffered per connection before new ones are dropped.
    #[serde(default = "default_queue_capacity")]
    queue_capacity: NonZeroUsize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_queue_capacity() -> NonZeroUsize {
    DEFAULT_QUEUE_CAPACITY
}

/// Complete server settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct Settings {
    /// Game rules.
    #[serde(default)]
    game: GameConfig,

    /// Network settings.
    #[serde(default)]
    server: ServerConfig,
}

/// Values that take precedence over the file, typically from flags or env.
#[derive(Debug, Clone, Default, PartialEq, Eq, new)]
pub struct SettingsOverrides {
    rows: Option<NonZeroUsize>,
    columns: Option<NonZeroUsize>,
    win_length: Option<NonZeroUsize>,
    host: Option<String>,
    port: Option<u16>,
}

impl Settings {
    /// Loads settings from a TOML file. Missing keys fall back to defaults.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading settings from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        let settings = Self::from_toml(&content)?;
        info!(game = ?settings.game, "Settings loaded");
        Ok(settings)
    }

    /// Parses settings from TOML text.
    #[instrument(skip(content))]
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))
    }

    /// Loads from `path` if given, otherwise starts from defaults.
    #[instrument]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                debug!("No config file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Applies overrides on top of the current values.
    #[instrument(skip(self))]
    pub fn with_overrides(mut self, overrides: SettingsOverrides) -> Self {
        let SettingsOverrides {
            rows,
            columns,
            win_length,
            host,
            port,
        } = overrides;

        if let Some(rows) = rows {
            self.game.rows = rows;
        }
        if let Some(columns) = columns {
            self.game.columns = columns;
        }
        if let Some(win_length) = win_length {
            self.game.win_length = win_length;
        }
        if let Some(host) = host {
            self.server.host = host;
        }
        if let Some(port) = port {
            self.server.port = port;
        }
        self
    }

    /// Renders the settings as TOML.
    #[instrument(skip(self))]
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::new(format!("Failed to render config: {}", e)))
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
