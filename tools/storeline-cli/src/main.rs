//! Storeline CLI - run and administer a Storeline shop.
//!
//! Commands:
//! - `storeline serve` - Run the HTTP server
//! - `storeline migrate` - Apply the database schema
//! - `storeline seed` - Load a demo catalog
//! - `storeline user` - Manage accounts
//! - `storeline coupon` - Manage coupons
//! - `storeline orders` - Inspect orders
//! - `storeline config` - Manage configuration

mod commands;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{ConfigArgs, CouponArgs, OrdersArgs, ServeArgs, UserArgs};

/// Storeline - e-commerce storefront and admin API
#[derive(Parser)]
#[command(name = "storeline")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve(ServeArgs),

    /// Create or upgrade the database schema
    Migrate,

    /// Load a demo catalog, skipping anything already present
    Seed,

    /// Manage user accounts
    User(UserArgs),

    /// Manage discount coupons
    Coupon(CouponArgs),

    /// Inspect orders
    Orders(OrdersArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let output = output::Output::new(cli.verbose, cli.json);

    let config_path = cli.config.as_deref();
    let ctx = match context::Context::load(config_path, output.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            output.error(&format!("{:#}", e));
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Serve(args) => commands::serve::run(args, &ctx).await,
        Commands::Migrate => commands::migrate::run(&ctx).await,
        Commands::Seed => commands::seed::run(&ctx).await,
        Commands::User(args) => commands::user::run(args, &ctx).await,
        Commands::Coupon(args) => commands::coupon::run(args, &ctx).await,
        Commands::Orders(args) => commands::orders::run(args, &ctx).await,
        Commands::Config(args) => commands::config::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
