//! Order inspection commands.

use anyhow::{anyhow, Result};
use storeline_commerce::checkout::{Order, OrderStatus, OrderView};
use storeline_commerce::ids::OrderId;
use storeline_commerce::search::OrderQuery;

use super::{OrdersArgs, OrdersCommand};
use crate::context::Context;
use crate::output::{format_timestamp, status_badge};

/// Run the orders command.
pub async fn run(args: OrdersArgs, ctx: &Context) -> Result<()> {
    match args.command {
        Some(OrdersCommand::Show { ref id }) => show_order(OrderId::from(id.as_str()), ctx).await,
        Some(OrdersCommand::List) | None => list_orders(&args, ctx).await,
    }
}

/// Build the listing query from the command-line filters.
fn order_query(args: &OrdersArgs) -> Result<OrderQuery> {
    let status = args
        .status
        .as_deref()
        .map(|s| {
            OrderStatus::parse(s).ok_or_else(|| {
                anyhow!(
                    "Unknown order status '{}' (expected pending, paid, shipped, delivered or cancelled)",
                    s
                )
            })
        })
        .transpose()?;
    Ok(OrderQuery {
        status,
        email: args.email.clone(),
        page: Some(1),
        per_page: Some(args.limit),
    })
}

async fn list_orders(args: &OrdersArgs, ctx: &Context) -> Result<()> {
    let query = order_query(args)?;
    let state = ctx.connect().await?;
    let page = state.store.orders.list(&query).await?;

    if ctx.output.is_json() {
        ctx.output.json(&page.map(OrderView::from));
        return Ok(());
    }

    ctx.output.header(&format!(
        "Orders ({} of {})",
        page.items.len(),
        page.total
    ));
    if page.items.is_empty() {
        ctx.output.info("No orders match.");
        return Ok(());
    }

    let widths = [20, 10, 30, 12, 16];
    ctx.output
        .table_row(&["NUMBER", "STATUS", "EMAIL", "TOTAL", "PLACED"], &widths);
    for order in &page.items {
        let status = status_badge(order.status().as_str());
        let total = order.grand_total.display();
        let placed = format_timestamp(order.placed_at);
        ctx.output.table_row(
            &[
                order.order_number.as_str(),
                status.as_str(),
                order.email.as_str(),
                total.as_str(),
                placed.as_str(),
            ],
            &widths,
        );
    }
    Ok(())
}

async fn show_order(id: OrderId, ctx: &Context) -> Result<()> {
    let state = ctx.connect().await?;
    let order = state.store.orders.get(&id).await?;

    if ctx.output.is_json() {
        ctx.output.json(&OrderView::from(order));
        return Ok(());
    }

    print_order(&order, ctx);
    Ok(())
}

fn print_order(order: &Order, ctx: &Context) {
    ctx.output.header(&format!("Order {}", order.order_number));
    ctx.output.kv("Status", &status_badge(order.status().as_str()));
    ctx.output.kv("Email", &order.email);
    ctx.output.kv("Placed", &format_timestamp(order.placed_at));
    ctx.output.kv("Ship to", &order.shipping_address.one_line());

    ctx.output.header("Items");
    for item in &order.items {
        let quantity = item.quantity.to_string();
        let title = format!("{} ({})", item.product_name, item.variant_title);
        let line_total = item.line_total.display();
        ctx.output.table_row(
            &[
                quantity.as_str(),
                title.as_str(),
                item.sku.as_str(),
                line_total.as_str(),
            ],
            &[4, 36, 14, 12],
        );
    }

    ctx.output.header("Totals");
    ctx.output.kv("Subtotal", &order.subtotal.display());
    if order.discount_total.amount_cents > 0 {
        let coupon = order.coupon_code.as_deref().unwrap_or("-");
        ctx.output.kv(
            "Discount",
            &format!("-{} ({})", order.discount_total.display(), coupon),
        );
    }
    ctx.output.kv("Shipping", &order.shipping_total.display());
    ctx.output.kv("Tax", &order.tax_total.display());
    ctx.output.kv("Total", &order.grand_total.display());
    if let Some(note) = &order.note {
        ctx.output.kv("Note", note);
    }
}
