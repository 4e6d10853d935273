//! Apply the database schema.

use anyhow::Result;

use crate::context::Context;

/// Run the migrate command.
pub async fn run(ctx: &Context) -> Result<()> {
    let spinner = ctx
        .output
        .spinner(&format!("Migrating {}", ctx.config.database.url));
    let result = ctx.connect().await;
    spinner.finish_and_clear();

    let state = result?;
    let products = state.store.dashboard.stats().await?.product_count;

    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({
            "database": ctx.config.database.url,
            "migrated": true,
            "products": products,
        }));
        return Ok(());
    }

    ctx.output.success(&format!(
        "Schema is up to date ({} products)",
        products
    ));
    Ok(())
}
