//! Coupon management commands.

use anyhow::{bail, Result};
use storeline_commerce::current_timestamp;
use storeline_commerce::promotion::{Coupon, CouponInput, CouponKind};

use super::{CouponArgs, CouponCommand};
use crate::context::Context;
use crate::output::{format_timestamp, status_badge};

/// Run the coupon command.
pub async fn run(args: CouponArgs, ctx: &Context) -> Result<()> {
    match args.command {
        CouponCommand::Create {
            code,
            percent,
            amount,
            free_shipping,
            min_subtotal,
            max_discount,
            usage_limit,
            per_customer,
            description,
        } => {
            let input = CouponInput {
                code,
                description,
                kind: coupon_kind(percent, amount, free_shipping)?.to_string(),
                percent_off: percent,
                amount_off_cents: amount,
                min_subtotal_cents: min_subtotal,
                max_discount_cents: max_discount,
                usage_limit,
                per_customer_limit: per_customer,
                ..Default::default()
            };
            create_coupon(input, ctx).await
        }
        CouponCommand::List => list_coupons(ctx).await,
        CouponCommand::Disable { code } => disable_coupon(&code, ctx).await,
    }
}

/// Form kind for the flags given.
fn coupon_kind(
    percent: Option<u32>,
    amount: Option<i64>,
    free_shipping: bool,
) -> Result<&'static str> {
    match (percent, amount, free_shipping) {
        (Some(_), None, false) => Ok("percentage"),
        (None, Some(_), false) => Ok("fixed"),
        (None, None, true) => Ok("free_shipping"),
        _ => bail!("Give exactly one of --percent, --amount or --free-shipping"),
    }
}

async fn create_coupon(input: CouponInput, ctx: &Context) -> Result<()> {
    let state = ctx.connect().await?;
    let coupon = state.store.coupons.create(input).await?;

    if ctx.output.is_json() {
        ctx.output.json(&coupon);
        return Ok(());
    }
    ctx.output
        .success(&format!("Created coupon {} ({})", coupon.code, describe(&coupon)));
    Ok(())
}

async fn list_coupons(ctx: &Context) -> Result<()> {
    let state = ctx.connect().await?;
    let coupons = state
        .store
        .coupons
        .list_with_status(current_timestamp())
        .await?;

    if ctx.output.is_json() {
        ctx.output.json(&coupons);
        return Ok(());
    }

    ctx.output.header(&format!("Coupons ({})", coupons.len()));
    let widths = [14, 18, 10, 9, 16];
    ctx.output
        .table_row(&["CODE", "DISCOUNT", "STATUS", "USED", "ENDS"], &widths);
    for listing in &coupons {
        let coupon = &listing.coupon;
        let used = match coupon.usage_limit {
            Some(limit) => format!("{}/{}", coupon.usage_count, limit),
            None => coupon.usage_count.to_string(),
        };
        let status = serde_json::to_value(listing.status)?
            .as_str()
            .map(status_badge)
            .unwrap_or_default();
        let ends = coupon
            .ends_at
            .map(format_timestamp)
            .unwrap_or_else(|| "-".to_string());
        let discount = describe(coupon);
        ctx.output.table_row(
            &[
                coupon.code.as_str(),
                discount.as_str(),
                status.as_str(),
                used.as_str(),
                ends.as_str(),
            ],
            &widths,
        );
    }
    Ok(())
}

async fn disable_coupon(code: &str, ctx: &Context) -> Result<()> {
    let state = ctx.connect().await?;
    let coupon = state.store.coupons.get_by_code(code).await?;
    let coupon = state.store.coupons.set_active(&coupon.id, false).await?;

    if ctx.output.is_json() {
        ctx.output.json(&coupon);
        return Ok(());
    }
    ctx.output.success(&format!("Disabled coupon {}", coupon.code));
    Ok(())
}

fn describe(coupon: &Coupon) -> String {
    match &coupon.kind {
        CouponKind::Percentage { percent } => format!("{}% off", percent),
        CouponKind::Fixed { amount } => format!("{} off", amount.display()),
        CouponKind::FreeShipping => "free shipping".to_string(),
    }
}
