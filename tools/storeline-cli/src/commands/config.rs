//! Configuration management commands.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};
use storeline_server::config::{default_config_template, CONFIG_FILE_NAMES};

use super::{ConfigArgs, ConfigCommand};
use crate::context::Context;

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx),
        ConfigCommand::Init { force } => init_config(force, ctx).map(|_| ()),
        ConfigCommand::Validate => validate_config(ctx),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    match &ctx.config_path {
        Some(path) => ctx.output.kv("source", &path.display().to_string()),
        None => ctx.output.kv("source", "defaults"),
    }
    println!();
    print!("{}", toml::to_string_pretty(&ctx.config)?);
    Ok(())
}

fn init_config(force: bool, ctx: &Context) -> Result<PathBuf> {
    let config_path = ctx.cwd.join(CONFIG_FILE_NAMES[0]);

    if config_path.exists() && !force {
        bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    fs::write(&config_path, default_config_template())
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    ctx.output
        .success(&format!("Created: {}", config_path.display()));
    Ok(config_path)
}

fn validate_config(ctx: &Context) -> Result<()> {
    ctx.output.header("Validating configuration");
    ctx.config.validate()?;

    let missing_dir = database_path(&ctx.config.database.url)
        .and_then(Path::parent)
        .is_some_and(|dir| !is_dir_or_cwd(dir));
    if missing_dir {
        ctx.output
            .warn("The database directory does not exist yet; it must be created before serving.");
    }
    if ctx.config.server.cors_origins.is_empty() {
        ctx.output
            .debug("No CORS origins configured; browsers on other origins cannot call the API.");
    }

    ctx.output.success("Configuration is valid");
    Ok(())
}

/// Filesystem path of a SQLite URL, if it names a file.
fn database_path(url: &str) -> Option<&Path> {
    let rest = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next()?;
    if path.is_empty() || path == ":memory:" {
        return None;
    }
    Some(Path::new(path))
}

fn is_dir_or_cwd(dir: &Path) -> bool {
    dir.as_os_str().is_empty() || dir.is_dir()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Output;
    use storeline_server::StorelineConfig;

    fn context(cwd: &Path) -> Context {
        Context {
            config: StorelineConfig::default(),
            config_path: None,
            output: Output::new(false, true),
            cwd: cwd.to_path_buf(),
        }
    }

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());

        let path = init_config(false, &ctx).unwrap();
        assert_eq!(path, dir.path().join("storeline.toml"));
        let loaded = StorelineConfig::load(&path).unwrap();
        assert_eq!(loaded.server.bind, StorelineConfig::default().server.bind);

        assert!(init_config(false, &ctx).is_err());
        assert!(init_config(true, &ctx).is_ok());
    }

    #[test]
    fn test_database_path() {
        assert_eq!(
            database_path("sqlite://data/shop.db?mode=rwc"),
            Some(Path::new("data/shop.db"))
        );
        assert_eq!(database_path("sqlite::memory:"), None);
        assert_eq!(database_path("postgres://localhost/shop"), None);
    }
}
