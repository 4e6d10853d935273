//! CLI execution context.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use storeline_server::{AppState, StorelineConfig};

use crate::output::Output;

/// Execution context for CLI commands.
pub struct Context {
    /// Resolved configuration, environment overrides applied.
    pub config: StorelineConfig,
    /// File the configuration was read from, if any.
    pub config_path: Option<PathBuf>,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
}

impl Context {
    /// Load context, finding the config file in the directory tree when
    /// none is given.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        Self::load_from(config_path.map(Path::new), &cwd, output)
    }

    fn load_from(explicit: Option<&Path>, cwd: &Path, output: Output) -> Result<Self> {
        let explicit = explicit.map(|path| resolve_path(cwd, path));
        let (mut config, config_path) = StorelineConfig::resolve(explicit.as_deref(), cwd)?;
        config.apply_env()?;

        match &config_path {
            Some(path) => output.debug(&format!("Using config {}", path.display())),
            None => output.debug("No config file found, using defaults"),
        }

        Ok(Self {
            config,
            config_path,
            output,
            cwd: cwd.to_path_buf(),
        })
    }

    /// Connect to the configured database and migrate it.
    pub async fn connect(&self) -> Result<AppState> {
        self.output
            .debug(&format!("Connecting to {}", self.config.database.url));
        AppState::connect(self.config.clone())
            .await
            .with_context(|| format!("Failed to open database {}", self.config.database.url))
    }
}

fn resolve_path(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_finds_config_in_parent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("storeline.toml"),
            "[server]\nbind = \"0.0.0.0:8080\"\n",
        )
        .unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let ctx = Context::load_from(None, &nested, Output::new(false, true)).unwrap();
        assert_eq!(
            ctx.config_path.as_deref(),
            Some(dir.path().join("storeline.toml").as_path())
        );
        if std::env::var("STORELINE_BIND").is_err() {
            assert_eq!(ctx.config.server.bind, "0.0.0.0:8080");
        }
    }

    #[test]
    fn test_explicit_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("shop.json"),
            r#"{"database": {"url": "sqlite://shop.db"}}"#,
        )
        .unwrap();

        let ctx =
            Context::load_from(Some(Path::new("shop.json")), dir.path(), Output::new(false, true))
                .unwrap();
        if std::env::var("STORELINE_DATABASE_URL").is_err() {
            assert_eq!(ctx.config.database.url, "sqlite://shop.db");
        }
        assert_eq!(
            ctx.config_path.as_deref(),
            Some(dir.path().join("shop.json").as_path())
        );
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result =
            Context::load_from(Some(Path::new("nope.toml")), dir.path(), Output::new(false, true));
        assert!(result.is_err());
    }
}
