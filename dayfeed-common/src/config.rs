//! Configuration loading and root folder resolution
//!
//! Configuration lives in a TOML file. Resolution order for the file:
//! 1. Command-line argument (highest priority)
//! 2. `DAYFEED_CONFIG` environment variable
//! 3. Platform config directory (`~/.config/dayfeed/config.toml`, then `/etc/dayfeed/config.toml`)
//! 4. Compiled defaults (no file)
//!
//! A missing file is not fatal unless it was named explicitly on the
//! command line. Secrets can be supplied through the environment so they
//! stay out of the file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::rotation::RotationPeriod;
use crate::time::{parse_timezone, TimeOfDay};
use crate::{Error, Result};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "DAYFEED_CONFIG";
/// Environment variable naming the data root folder
pub const ROOT_FOLDER_ENV_VAR: &str = "DAYFEED_ROOT_FOLDER";
/// Environment override for the weather provider API key
pub const WEATHER_API_KEY_ENV_VAR: &str = "DAYFEED_WEATHER_API_KEY";
/// Environment override for the API shared secret
pub const SHARED_SECRET_ENV_VAR: &str = "DAYFEED_SHARED_SECRET";
/// Environment override for the listen address
pub const BIND_ENV_VAR: &str = "DAYFEED_BIND";

/// Complete server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Listen address
    pub bind: String,
    /// Folder holding the SQLite database
    pub root_folder: Option<PathBuf>,
    /// Default IANA timezone for clients without their own
    pub timezone: String,
    /// Budget for each independent part of a feed request
    pub category_timeout_ms: u64,
    /// API shared secret; 0 disables authentication
    pub shared_secret: i64,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
    pub weather: WeatherConfig,
    pub fallback_store: FallbackStoreConfig,
    pub probe: ProbeConfig,
    pub rotation: RotationConfig,
    pub defaults: DefaultTexts,
    pub clients: Vec<ClientConfig>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5740".to_string(),
            root_folder: None,
            timezone: "Europe/Helsinki".to_string(),
            category_timeout_ms: 3000,
            shared_secret: 0,
            auth: AuthConfig::default(),
            logging: LoggingConfig::default(),
            weather: WeatherConfig::default(),
            fallback_store: FallbackStoreConfig::default(),
            probe: ProbeConfig::default(),
            rotation: RotationConfig::default(),
            defaults: DefaultTexts::default(),
            clients: Vec::new(),
        }
    }
}

/// Accepted request timestamp skew
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub max_past_ms: i64,
    pub max_future_ms: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            max_past_ms: 300_000,
            max_future_ms: 5_000,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Weather provider configuration
///
/// No `base_url` means no provider: the feed uses neutral weather.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Provider language for descriptions, e.g. "fi"
    pub language: Option<String>,
    /// Background refresh cadence
    pub refresh_interval_secs: u64,
    /// Cached observations older than this are ignored
    pub max_age_secs: u64,
    pub timeout_ms: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            language: None,
            refresh_interval_secs: 4 * 60 * 60,
            max_age_secs: 6 * 60 * 60,
            timeout_ms: 5000,
        }
    }
}

/// Legacy spreadsheet export used when the primary store has nothing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackStoreConfig {
    pub url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for FallbackStoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_ms: 5000,
        }
    }
}

/// Media validity probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// URL prefixes whose media is checked with a HEAD request.
    /// Anything outside these prefixes is trusted without checking.
    pub namespaces: Vec<String>,
    pub timeout_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            namespaces: Vec::new(),
            timeout_ms: 3000,
        }
    }
}

/// Rotation period per content category
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    pub photo: RotationPeriod,
    pub greeting: RotationPeriod,
    pub activity: RotationPeriod,
}

/// Neutral texts used when a category has no content
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultTexts {
    pub greeting: String,
    pub activity_outdoor: String,
    pub activity_indoor: String,
    pub photo_caption: String,
}

impl Default for DefaultTexts {
    fn default() -> Self {
        Self {
            greeting: "Hyvää päivää!".to_string(),
            activity_outdoor: "Lyhyt kävely ulkona".to_string(),
            activity_indoor: "Kuuntele lempimusiikkiasi".to_string(),
            photo_caption: String::new(),
        }
    }
}

/// One care-recipient client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Weather provider location query, e.g. "Helsinki,FI"
    #[serde(default)]
    pub location: Option<String>,
    /// Overrides the global timezone
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub tasks: Vec<TaskConfig>,
}

/// One recurring daily reminder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// e.g. "RUOKA", "LAAKE"
    pub task_type: String,
    pub time_slot: TimeOfDay,
    pub description: String,
    #[serde(default = "default_requires_ack")]
    pub requires_ack: bool,
}

fn default_requires_ack() -> bool {
    true
}

impl FeedConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Resolve, load, apply environment overrides and validate
    ///
    /// `cli_path` is the `--config` argument, if any.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let mut config = match cli_path {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                Self::from_file(path)?
            }
            None => match resolve_config_path() {
                Some(path) => {
                    info!("Loading configuration from {}", path.display());
                    Self::from_file(&path)?
                }
                None => {
                    warn!("No configuration file found, using compiled defaults");
                    Self::default()
                }
            },
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides for secrets and bind address
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(key) = std::env::var(WEATHER_API_KEY_ENV_VAR) {
            if !key.trim().is_empty() {
                self.weather.api_key = Some(key);
            }
        }

        if let Ok(secret) = std::env::var(SHARED_SECRET_ENV_VAR) {
            self.shared_secret = secret.trim().parse().map_err(|_| {
                Error::Config(format!("{} must be an integer", SHARED_SECRET_ENV_VAR))
            })?;
        }

        if let Ok(bind) = std::env::var(BIND_ENV_VAR) {
            if !bind.trim().is_empty() {
                self.bind = bind;
            }
        }

        Ok(())
    }

    /// Check cross-field consistency
    pub fn validate(&self) -> Result<()> {
        parse_timezone(&self.timezone)?;

        let mut seen = HashSet::new();
        for client in &self.clients {
            if client.id.trim().is_empty() {
                return Err(Error::Config("Client id cannot be empty".to_string()));
            }
            if !seen.insert(client.id.as_str()) {
                return Err(Error::Config(format!("Duplicate client id: {}", client.id)));
            }
            if let Some(tz) = &client.timezone {
                parse_timezone(tz)?;
            }
            for task in &client.tasks {
                if task.task_type.trim().is_empty() || task.description.trim().is_empty() {
                    return Err(Error::Config(format!(
                        "Client {} has a task with empty type or description",
                        client.id
                    )));
                }
            }
        }

        if self.category_timeout_ms == 0 {
            return Err(Error::Config("category_timeout_ms must be positive".to_string()));
        }

        Ok(())
    }

    /// Look up a configured client
    pub fn client(&self, client_id: &str) -> Option<&ClientConfig> {
        self.clients.iter().find(|c| c.id == client_id)
    }

    /// Timezone to use for `client_id`
    ///
    /// Falls back to the global timezone for unknown clients.
    pub fn timezone_for(&self, client_id: &str) -> Result<Tz> {
        let name = self
            .client(client_id)
            .and_then(|c| c.timezone.as_deref())
            .unwrap_or(&self.timezone);
        parse_timezone(name)
    }
}

/// Locate the configuration file when none was given on the command line
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
        warn!("{} points to missing file {}", CONFIG_ENV_VAR, path.display());
    }

    let user_config = dirs::config_dir().map(|d| d.join("dayfeed").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(unix) {
        let system_config = PathBuf::from("/etc/dayfeed/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. `DAYFEED_ROOT_FOLDER` environment variable
/// 3. `root_folder` from the TOML config
/// 4. OS-dependent compiled default
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &FeedConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/dayfeed (or /var/lib/dayfeed for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("dayfeed"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/dayfeed"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("dayfeed"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/dayfeed"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("dayfeed"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\dayfeed"))
    } else {
        PathBuf::from("./dayfeed_data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = FeedConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.weather.refresh_interval_secs, 14_400);
        assert_eq!(config.rotation.photo, RotationPeriod::Daily);
    }

    #[test]
    fn test_duplicate_client_rejected() {
        let config = FeedConfig::from_toml_str(
            r#"
            [[clients]]
            id = "mom"
            [[clients]]
            id = "mom"
            "#,
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_client_timezone_override() {
        let config = FeedConfig::from_toml_str(
            r#"
            timezone = "Europe/Helsinki"
            [[clients]]
            id = "dad"
            timezone = "Europe/Stockholm"
            "#,
        )
        .unwrap();

        assert_eq!(config.timezone_for("dad").unwrap(), chrono_tz::Europe::Stockholm);
        assert_eq!(config.timezone_for("unknown").unwrap(), chrono_tz::Europe::Helsinki);
    }

    #[test]
    fn test_empty_task_description_rejected() {
        let config = FeedConfig::from_toml_str(
            r#"
            [[clients]]
            id = "mom"
            [[clients.tasks]]
            task_type = "LAAKE"
            time_slot = "Aamu"
            description = "  "
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }
}
