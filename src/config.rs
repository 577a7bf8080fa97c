//! Configuration for the export profile engine.
//!
//! Layered configuration:
//! - Default values
//! - TOML configuration file (`.exportwatch/settings.toml`)
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `EXPORTWATCH_` and use double
//! underscores to separate nested levels:
//! - `EXPORTWATCH_ENGINE__QUIET_PERIOD_MS=1000` sets `engine.quiet_period_ms`
//! - `EXPORTWATCH_LOGGING__DEFAULT=debug` sets `logging.default`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Directory holding the settings file, searched for in ancestors.
pub const CONFIG_DIR: &str = ".exportwatch";

/// Settings file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "settings.toml";

const ENV_PREFIX: &str = "EXPORTWATCH_";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Project root stripped from absolute change paths.
    ///
    /// Absolute paths outside this root are never relevant to a profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_root: Option<PathBuf>,

    /// Debounce and scheduling settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Log levels
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EngineConfig {
    /// Quiet period with no relevant changes before pending profiles flush.
    #[serde(default = "default_quiet_period_ms")]
    pub quiet_period_ms: u64,

    /// How often the armed scheduler checks its deadline.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Capacity of the host command channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Capacity of the profile notification broadcast.
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default level for all modules
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides (`target = level`)
    #[serde(default)]
    pub modules: IndexMap<String, String>,
}

fn default_version() -> u32 {
    1
}
fn default_quiet_period_ms() -> u64 {
    750
}
fn default_tick_interval_ms() -> u64 {
    50
}
fn default_channel_capacity() -> usize {
    256
}
fn default_broadcast_capacity() -> usize {
    100
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            project_root: None,
            engine: EngineConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            quiet_period_ms: default_quiet_period_ms(),
            tick_interval_ms: default_tick_interval_ms(),
            channel_capacity: default_channel_capacity(),
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: IndexMap::new(),
        }
    }
}

impl EngineConfig {
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }

    /// Tick period, never zero.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

impl Settings {
    /// Load configuration from all sources.
    ///
    /// Looks for `.exportwatch/settings.toml` in the current directory and
    /// its ancestors, then layers `EXPORTWATCH_*` variables on top.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));

        Self::figment(&config_path)
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                if settings.project_root.is_none() {
                    settings.project_root = Self::workspace_root();
                }
                settings
            })
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(path.as_ref()).extract().map_err(Box::new)
    }

    fn figment(config_path: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            // Double underscore separates nested levels
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
    }

    /// Find `.exportwatch/settings.toml` from the current directory up.
    fn find_workspace_config() -> Option<PathBuf> {
        Self::workspace_root().map(|root| root.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// The nearest ancestor directory containing `.exportwatch`.
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .find(|ancestor| ancestor.join(CONFIG_DIR).is_dir())
            .map(Path::to_path_buf)
    }

    /// Save current configuration to file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file under `base`.
    pub fn init_config_file(
        base: impl AsRef<Path>,
        force: bool,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let base = absolute_root(base.as_ref())?;
        let config_path = base.join(CONFIG_DIR).join(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        let settings = Settings {
            project_root: Some(base),
            ..Settings::default()
        };
        settings.save(&config_path)?;

        Ok(config_path)
    }
}

/// Make `path` absolute against the current directory and drop `.` and
/// `..` components lexically. The path does not need to exist.
pub fn absolute_root(path: &Path) -> std::io::Result<PathBuf> {
    let mut root = PathBuf::new();
    for component in std::path::absolute(path)?.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                root.pop();
            }
            other => root.push(other),
        }
    }
    Ok(root)
}
