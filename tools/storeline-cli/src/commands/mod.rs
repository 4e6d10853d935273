//! CLI command implementations.

pub mod config;
pub mod coupon;
pub mod migrate;
pub mod orders;
pub mod seed;
pub mod serve;
pub mod user;

use clap::{Args, Subcommand};

/// Arguments for the serve command.
#[derive(Args)]
pub struct ServeArgs {
    /// Address to bind, overriding the config file.
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Database URL, overriding the config file.
    #[arg(long)]
    pub database_url: Option<String>,
}

/// Arguments for the user command.
#[derive(Args)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Subcommand)]
pub enum UserCommand {
    /// Create an account.
    Create {
        /// Email address.
        email: String,

        /// Display name.
        #[arg(short, long)]
        name: Option<String>,

        /// Role: customer, staff or admin.
        #[arg(short, long, default_value = "customer", conflicts_with = "admin")]
        role: String,

        /// Shorthand for `--role admin`.
        #[arg(long)]
        admin: bool,

        /// Password; prompted for when absent.
        #[arg(long)]
        password: Option<String>,
    },
    /// List accounts.
    List,
}

/// Arguments for the coupon command.
#[derive(Args)]
pub struct CouponArgs {
    #[command(subcommand)]
    pub command: CouponCommand,
}

#[derive(Subcommand)]
pub enum CouponCommand {
    /// Create a coupon. Give exactly one of --percent, --amount or --free-shipping.
    Create {
        /// Coupon code.
        code: String,

        /// Percentage off the subtotal.
        #[arg(long, group = "kind")]
        percent: Option<u32>,

        /// Fixed amount off, in cents.
        #[arg(long, group = "kind")]
        amount: Option<i64>,

        /// Waive the shipping charge.
        #[arg(long, group = "kind")]
        free_shipping: bool,

        /// Minimum subtotal, in cents.
        #[arg(long)]
        min_subtotal: Option<i64>,

        /// Cap on the discount, in cents.
        #[arg(long)]
        max_discount: Option<i64>,

        /// Total redemptions allowed.
        #[arg(long)]
        usage_limit: Option<i64>,

        /// Redemptions allowed per customer.
        #[arg(long)]
        per_customer: Option<i64>,

        /// Description shown in the admin.
        #[arg(short, long)]
        description: Option<String>,
    },
    /// List coupons with their status.
    List,
    /// Disable a coupon.
    Disable {
        /// Coupon code.
        code: String,
    },
}

/// Arguments for the orders command.
#[derive(Args)]
pub struct OrdersArgs {
    #[command(subcommand)]
    pub command: Option<OrdersCommand>,

    /// Only orders in this status.
    #[arg(short, long)]
    pub status: Option<String>,

    /// Only orders whose email contains this text.
    #[arg(short, long)]
    pub email: Option<String>,

    /// Show at most this many orders.
    #[arg(short, long, default_value = "20")]
    pub limit: i64,
}

#[derive(Subcommand)]
pub enum OrdersCommand {
    /// List orders (default).
    List,
    /// Show one order.
    Show {
        /// Order ID.
        id: String,
    },
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration.
    Show,
    /// Write a commented `storeline.toml`.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Validate the configuration.
    Validate,
}
