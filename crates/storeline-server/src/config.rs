//! Application configuration.
//!
//! Loaded from `storeline.toml` (or `.json`), then overridden by
//! `STORELINE_*` environment variables. Every section has defaults, so an
//! empty file, or no file at all, is a valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use storeline_commerce::checkout::ShopSettings;

/// File names searched for, in order, from the working directory upwards.
pub const CONFIG_FILE_NAMES: [&str; 3] = ["storeline.toml", ".storeline.toml", "storeline.json"];

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorelineConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub shop: ShopSettings,
    pub logging: LoggingConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind: String,
    /// Largest accepted request body.
    pub body_limit_bytes: usize,
    /// Origins allowed for cross-origin requests. Empty disables CORS.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            body_limit_bytes: 1024 * 1024,
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite URL, e.g. `sqlite://storeline.db` or `sqlite::memory:`.
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://storeline.db".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Idle lifetime of a sign-in session.
    pub session_ttl_secs: u64,
    pub min_password_length: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: 7 * 24 * 60 * 60,
            min_password_length: 8,
        }
    }
}

impl AuthConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, for development.
    #[default]
    Pretty,
    /// One JSON object per line, for log aggregation.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => bail!("unknown log format '{}', expected 'pretty' or 'json'", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl StorelineConfig {
    /// Load config from a file. `.json` files are JSON, anything else TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        if is_json(path) {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
        }
    }

    /// Save config to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = if is_json(path) {
            serde_json::to_string_pretty(self)?
        } else {
            toml::to_string_pretty(self)?
        };

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Find a config file in `start` or one of its parents.
    pub fn discover(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            for name in CONFIG_FILE_NAMES {
                let candidate = current.join(name);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load the explicit file, else a discovered one, else defaults.
    ///
    /// Returns the file the config came from, if any.
    pub fn resolve(explicit: Option<&Path>, cwd: &Path) -> Result<(Self, Option<PathBuf>)> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::discover(cwd),
        };
        let config = match &path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        Ok((config, path))
    }

    /// Apply `STORELINE_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any variable source.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup("STORELINE_BIND") {
            self.server.bind = bind;
        }
        if let Some(url) = lookup("STORELINE_DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(level) = lookup("STORELINE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("STORELINE_LOG_FORMAT") {
            self.logging.format = format
                .parse()
                .context("Invalid STORELINE_LOG_FORMAT")?;
        }
        Ok(())
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.server.bind.parse::<std::net::SocketAddr>().is_err() {
            bail!("server.bind is not a socket address: {}", self.server.bind);
        }
        if self.database.url.trim().is_empty() {
            bail!("database.url must not be empty");
        }
        if self.auth.session_ttl_secs == 0 {
            bail!("auth.session_ttl_secs must be positive");
        }
        if self.auth.min_password_length == 0 {
            bail!("auth.min_password_length must be positive");
        }
        if self.shop.flat_shipping_cents < 0 {
            bail!("shop.flat_shipping_cents must not be negative");
        }
        if self.shop.tax_rate_bps > 10_000 {
            bail!("shop.tax_rate_bps must be at most 10000");
        }
        Ok(())
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

/// Commented default `storeline.toml`.
pub fn default_config_template() -> String {
    r#"# Storeline configuration
#
# Environment overrides: STORELINE_BIND, STORELINE_DATABASE_URL,
# STORELINE_LOG_LEVEL, STORELINE_LOG_FORMAT.

[server]
bind = "127.0.0.1:3000"
body_limit_bytes = 1048576
# Origins allowed to call the API from a browser.
cors_origins = []

[database]
url = "sqlite://storeline.db"
max_connections = 5

[auth]
# Sessions expire after this many idle seconds.
session_ttl_secs = 604800
min_password_length = 8

[shop]
currency = "USD"
flat_shipping_cents = 500
# Remove to always charge shipping.
free_shipping_threshold_cents = 5000
# Basis points: 825 = 8.25%.
tax_rate_bps = 0
low_stock_threshold = 5

[logging]
# RUST_LOG takes precedence when set.
level = "info"
# "pretty" or "json"
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_template_matches_defaults() {
        let parsed: StorelineConfig = toml::from_str(&default_config_template()).unwrap();
        assert_eq!(parsed, StorelineConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let parsed: StorelineConfig = toml::from_str(
            r#"
            [shop]
            tax_rate_bps = 825

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(parsed.shop.tax_rate_bps, 825);
        assert_eq!(parsed.shop.flat_shipping_cents, 500);
        assert_eq!(parsed.logging.format, LogFormat::Json);
        assert_eq!(parsed.server, ServerConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("STORELINE_BIND", "0.0.0.0:8080"),
            ("STORELINE_DATABASE_URL", "sqlite::memory:"),
            ("STORELINE_LOG_FORMAT", "JSON"),
        ]);
        let mut config = StorelineConfig::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_bad_log_format_override() {
        let mut config = StorelineConfig::default();
        let result = config.apply_overrides(|key| {
            (key == "STORELINE_LOG_FORMAT").then(|| "xml".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_validate() {
        assert!(StorelineConfig::default().validate().is_ok());

        let mut config = StorelineConfig::default();
        config.server.bind = "localhost".to_string();
        assert!(config.validate().is_err());

        let mut config = StorelineConfig::default();
        config.shop.tax_rate_bps = 20_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_load_and_discover() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let mut config = StorelineConfig::default();
        config.database.url = "sqlite://shop.db".to_string();
        let path = dir.path().join("storeline.toml");
        config.save(&path).unwrap();

        assert_eq!(StorelineConfig::discover(&nested), Some(path.clone()));
        let (loaded, from) = StorelineConfig::resolve(None, &nested).unwrap();
        assert_eq!(from, Some(path));
        assert_eq!(loaded, config);

        let json = dir.path().join("other.json");
        config.save(&json).unwrap();
        assert_eq!(StorelineConfig::load(&json).unwrap(), config);
    }

    #[test]
    fn test_resolve_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let (config, from) = StorelineConfig::resolve(None, dir.path()).unwrap();
        // A parent of the temp dir could hold a config; only check the default case.
        if from.is_none() {
            assert_eq!(config, StorelineConfig::default());
        }
    }
}
