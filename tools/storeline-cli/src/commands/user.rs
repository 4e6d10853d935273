//! Account management commands.

use anyhow::{bail, Result};
use dialoguer::Password;
use storeline_auth::{NewUser, Role, User};

use super::{UserArgs, UserCommand};
use crate::context::Context;
use crate::output::format_timestamp;

/// Run the user command.
pub async fn run(args: UserArgs, ctx: &Context) -> Result<()> {
    match args.command {
        UserCommand::Create {
            email,
            name,
            role,
            admin,
            password,
        } => {
            let role = if admin { Role::Admin } else { role.parse()? };
            create_user(email, name, role, password, ctx).await
        }
        UserCommand::List => list_users(ctx).await,
    }
}

async fn create_user(
    email: String,
    name: Option<String>,
    role: Role,
    password: Option<String>,
    ctx: &Context,
) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None if ctx.output.is_json() => bail!("--password is required with --json"),
        None => Password::new()
            .with_prompt(format!("Password for {}", email))
            .with_confirmation("Repeat password", "Passwords do not match")
            .interact()?,
    };

    let state = ctx.connect().await?;
    let user = state
        .users
        .create(NewUser {
            email,
            password,
            name,
            role,
        })
        .await?;

    if ctx.output.is_json() {
        ctx.output.json(&user);
        return Ok(());
    }

    ctx.output
        .success(&format!("Created {} account {}", user.role, user.email));
    ctx.output.kv("ID", user.id.as_str());
    Ok(())
}

async fn list_users(ctx: &Context) -> Result<()> {
    let state = ctx.connect().await?;
    let users = state.users.list().await?;

    if ctx.output.is_json() {
        ctx.output.json(&users);
        return Ok(());
    }

    ctx.output.header(&format!("Users ({})", users.len()));
    if users.is_empty() {
        ctx.output
            .info("No accounts yet. Create one with `storeline user create <email> --admin`.");
        return Ok(());
    }

    let widths = [32, 9, 20, 16, 16];
    ctx.output
        .table_row(&["EMAIL", "ROLE", "NAME", "CREATED", "LAST LOGIN"], &widths);
    for user in &users {
        let row = user_row(user);
        let cols: Vec<&str> = row.iter().map(String::as_str).collect();
        ctx.output.table_row(&cols, &widths);
    }
    Ok(())
}

fn user_row(user: &User) -> [String; 5] {
    [
        user.email.clone(),
        user.role.to_string(),
        user.name.clone().unwrap_or_else(|| "-".to_string()),
        format_timestamp(user.created_at),
        user.last_login_at
            .map(format_timestamp)
            .unwrap_or_else(|| "never".to_string()),
    ]
}
