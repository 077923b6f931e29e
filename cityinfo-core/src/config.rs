use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::error::FetchError;

/// Environment variable holding the OpenWeather API key.
pub const API_KEY_ENV: &str = "API_KEY";
/// Environment variable holding the GeoNames account name.
pub const GEONAMES_USERNAME_ENV: &str = "GEONAMES_USERNAME";

/// Provider credentials as stored on disk; either may still be missing.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CredentialsConfig {
    pub openweather_api_key: Option<String>,
    pub geonames_username: Option<String>,
}

/// Credentials known to be present, handed to adapters at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub openweather_api_key: String,
    pub geonames_username: String,
}

/// Provider base URLs. Overridable so tests can point at a local server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Endpoints {
    pub openweather: String,
    pub geonames: String,
    pub wikipedia: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            openweather: "https://api.openweathermap.org".to_string(),
            geonames: "http://api.geonames.org".to_string(),
            wikipedia: "https://en.wikipedia.org".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    /// Sent on every request; the summary provider rejects anonymous clients.
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "CityInfoApp/1.0 (https://github.com/cityinfo/cityinfo; cityinfo@users.noreply.github.com)"
                .to_string(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// [credentials]
/// openweather_api_key = "..."
/// geonames_username = "..."
///
/// [http]
/// timeout_secs = 10
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub endpoints: Endpoints,
    #[serde(default)]
    pub http: HttpConfig,
}

impl Config {
    /// Load config from disk (or defaults on first run), then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = Self::load_file()?;
        cfg.apply_env(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    /// Load only what is on disk, without environment overrides.
    pub fn load_file() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "cityinfo", "cityinfo")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Override credentials with non-empty values from `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(API_KEY_ENV) {
            self.credentials.openweather_api_key = Some(key);
        }
        if let Some(user) = non_empty(GEONAMES_USERNAME_ENV) {
            self.credentials.geonames_username = Some(user);
        }
    }

    pub fn set_credentials(&mut self, openweather_api_key: String, geonames_username: String) {
        self.credentials.openweather_api_key = Some(openweather_api_key);
        self.credentials.geonames_username = Some(geonames_username);
    }

    /// Both credentials, or a configuration error naming the first one missing.
    pub fn credentials(&self) -> Result<Credentials, FetchError> {
        let openweather_api_key = present(self.credentials.openweather_api_key.as_deref())
            .ok_or_else(|| missing(API_KEY_ENV, "OpenWeather API key"))?;
        let geonames_username = present(self.credentials.geonames_username.as_deref())
            .ok_or_else(|| missing(GEONAMES_USERNAME_ENV, "GeoNames username"))?;

        Ok(Credentials {
            openweather_api_key: openweather_api_key.to_string(),
            geonames_username: geonames_username.to_string(),
        })
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn missing(env: &str, what: &str) -> FetchError {
    FetchError::Configuration(format!(
        "No {what} configured.\n\
         Hint: set {env} or run `cityinfo configure`."
    ))
}
