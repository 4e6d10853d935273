//! Run the HTTP server.

use anyhow::Result;
use storeline_server::{serve, telemetry, AppState};

use super::ServeArgs;
use crate::context::Context;

/// Run the serve command.
pub async fn run(args: ServeArgs, ctx: &Context) -> Result<()> {
    let mut config = ctx.config.clone();
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(url) = args.database_url {
        config.database.url = url;
    }
    config.validate()?;

    telemetry::init(&config.logging)?;

    ctx.output.header("Starting Storeline");
    ctx.output.kv("Bind", &config.server.bind);
    ctx.output.kv("Database", &config.database.url);
    if let Some(path) = &ctx.config_path {
        ctx.output.kv("Config", &path.display().to_string());
    }

    let state = AppState::connect(config).await?;
    serve(state).await
}
