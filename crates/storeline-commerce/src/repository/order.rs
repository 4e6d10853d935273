//! Order persistence, checkout and fulfilment transitions.

use std::collections::HashMap;

use serde::Deserialize;
use storeline_db::{params, Db, Statement, Value};
use tracing::{debug, info};

use crate::cart::CartOwner;
use crate::checkout::{Address, CheckoutInput, Order, OrderItem, OrderStatus, ShopSettings};
use crate::error::CommerceError;
use crate::ids::{OrderId, OrderItemId, ProductId, UserId, VariantId};
use crate::money::{Currency, Money};
use crate::search::{order_status_condition, OrderQuery, Page};
use crate::current_timestamp;

use super::{bind_values, or_not_found, placeholders, CartRepository};

const SELECT_ORDER: &str = "SELECT id, order_number, user_id, email, currency, subtotal_cents, \
     discount_cents, shipping_cents, tax_cents, total_cents, coupon_code, note, ship_name, \
     ship_line1, ship_line2, ship_city, ship_region, ship_postal_code, ship_country, ship_phone, \
     placed_at, paid_at, shipped_at, delivered_at, cancelled_at FROM orders";

#[derive(Debug, Deserialize)]
struct OrderRow {
    id: OrderId,
    order_number: String,
    user_id: Option<UserId>,
    email: String,
    currency: String,
    subtotal_cents: i64,
    discount_cents: i64,
    shipping_cents: i64,
    tax_cents: i64,
    total_cents: i64,
    coupon_code: Option<String>,
    note: Option<String>,
    ship_name: String,
    ship_line1: String,
    ship_line2: Option<String>,
    ship_city: String,
    ship_region: Option<String>,
    ship_postal_code: String,
    ship_country: String,
    ship_phone: Option<String>,
    placed_at: i64,
    paid_at: Option<i64>,
    shipped_at: Option<i64>,
    delivered_at: Option<i64>,
    cancelled_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OrderItemRow {
    id: OrderItemId,
    order_id: OrderId,
    variant_id: Option<VariantId>,
    product_id: Option<ProductId>,
    sku: String,
    product_name: String,
    variant_title: String,
    unit_price_cents: i64,
    quantity: i64,
    line_total_cents: i64,
}

impl OrderRow {
    fn into_order(self, fallback: Currency, items: Vec<OrderItem>) -> Order {
        let currency = Currency::from_code(&self.currency).unwrap_or(fallback);
        let money = |cents| Money::new(cents, currency);
        Order {
            id: self.id,
            order_number: self.order_number,
            user_id: self.user_id,
            email: self.email,
            currency,
            items,
            shipping_address: Address {
                name: self.ship_name,
                line1: self.ship_line1,
                line2: self.ship_line2,
                city: self.ship_city,
                region: self.ship_region,
                postal_code: self.ship_postal_code,
                country: self.ship_country,
                phone: self.ship_phone,
            },
            subtotal: money(self.subtotal_cents),
            discount_total: money(self.discount_cents),
            shipping_total: money(self.shipping_cents),
            tax_total: money(self.tax_cents),
            grand_total: money(self.total_cents),
            coupon_code: self.coupon_code,
            note: self.note,
            placed_at: self.placed_at,
            paid_at: self.paid_at,
            shipped_at: self.shipped_at,
            delivered_at: self.delivered_at,
            cancelled_at: self.cancelled_at,
        }
    }
}

/// Who is checking out, when signed in.
#[derive(Debug, Clone, Copy)]
pub struct Customer<'a> {
    pub id: &'a UserId,
    pub email: &'a str,
}

/// Order persistence.
#[derive(Clone, Debug)]
pub struct OrderRepository {
    db: Db,
    settings: ShopSettings,
    carts: CartRepository,
}

impl OrderRepository {
    pub fn new(db: Db, settings: ShopSettings, carts: CartRepository) -> Self {
        Self { db, settings, carts }
    }

    /// Turn the owner's cart into an order.
    ///
    /// Inventory, the coupon and the cart are settled in one transaction:
    /// if any variant sold out or the coupon ran out in the meantime, nothing
    /// is written.
    pub async fn place_order(
        &self,
        owner: &CartOwner,
        customer: Option<Customer<'_>>,
        mut input: CheckoutInput,
    ) -> Result<Order, CommerceError> {
        let form_email = input.validate()?;
        let email = form_email
            .or_else(|| customer.map(|c| c.email.to_string()))
            .ok_or_else(|| CommerceError::ValidationError("email is required".into()))?;
        let user_id = customer.map(|c| c.id);

        let cart = self.carts.load(owner).await?;
        if cart.is_empty() {
            return Err(CommerceError::EmptyCart);
        }
        self.check_stock(&cart.items).await?;

        let summary = self.carts.summarize(&cart, user_id).await?;
        if let Some(rejection) = summary.coupon_rejection {
            return Err(CommerceError::CouponRejected(rejection));
        }

        let now = current_timestamp();
        let order = Order::from_cart(&cart, &summary, input, email, user_id.cloned(), now)?;

        let mut statements = vec![insert_order(&order)];
        for item in &order.items {
            statements.push(insert_item(&order.id, item));
            if let Some(variant_id) = &item.variant_id {
                statements.push(
                    Statement::new(
                        "UPDATE product_variants SET inventory = inventory - ? \
                         WHERE id = ? AND inventory >= ?",
                        vec![
                            item.quantity.into(),
                            variant_id.as_str().into(),
                            item.quantity.into(),
                        ],
                    )
                    .guarded(format!("{} sold out during checkout", item.sku)),
                );
            }
        }
        if let Some(code) = &order.coupon_code {
            statements.push(
                Statement::new(
                    "UPDATE coupons SET usage_count = usage_count + 1, updated_at = ? \
                     WHERE code = ? AND active = 1 \
                     AND (usage_limit IS NULL OR usage_count < usage_limit)",
                    vec![now.into(), code.clone().into()],
                )
                .guarded(format!("coupon {} can no longer be redeemed", code)),
            );
        }
        statements.push(Statement::new(
            "DELETE FROM carts WHERE owner_key = ?",
            vec![owner.key().into()],
        ));

        self.db.transaction(statements).await?;
        info!(
            order = %order.order_number,
            items = order.item_count(),
            total = %order.grand_total.display(),
            coupon = order.coupon_code.as_deref().unwrap_or(""),
            "order placed"
        );
        Ok(order)
    }

    pub async fn get(&self, id: &OrderId) -> Result<Order, CommerceError> {
        let sql = format!("{} WHERE id = ?", SELECT_ORDER);
        let row: OrderRow = self
            .db
            .query_one(&sql, params![id.as_str()])
            .await
            .map_err(|e| or_not_found(e, || CommerceError::OrderNotFound(id.to_string())))?;
        let mut orders = self.attach_items(vec![row]).await?;
        orders
            .pop()
            .ok_or_else(|| CommerceError::OrderNotFound(id.to_string()))
    }

    /// An order as seen by its customer. Other customers' orders are not found.
    pub async fn get_for_user(
        &self,
        user_id: &UserId,
        id: &OrderId,
    ) -> Result<Order, CommerceError> {
        let order = self.get(id).await?;
        if order.user_id.as_ref() != Some(user_id) {
            return Err(CommerceError::OrderNotFound(id.to_string()));
        }
        Ok(order)
    }

    /// Admin order listing, newest first.
    pub async fn list(&self, query: &OrderQuery) -> Result<Page<Order>, CommerceError> {
        let (where_clause, values) = query.build_where_clause();
        let params = bind_values(values);
        let total = self
            .db
            .query_scalar_i64(
                &format!("SELECT COUNT(*) FROM orders WHERE {}", where_clause),
                &params,
            )
            .await?;
        let sql = format!(
            "{} WHERE {} ORDER BY placed_at DESC, id LIMIT {} OFFSET {}",
            SELECT_ORDER,
            where_clause,
            query.per_page(),
            query.offset()
        );
        let rows: Vec<OrderRow> = self.db.query_as(&sql, &params).await?;
        let orders = self.attach_items(rows).await?;
        Ok(Page::new(orders, total, query.page(), query.per_page()))
    }

    /// A customer's orders, newest first.
    pub async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, CommerceError> {
        let sql = format!("{} WHERE user_id = ? ORDER BY placed_at DESC, id", SELECT_ORDER);
        let rows: Vec<OrderRow> = self.db.query_as(&sql, params![user_id.as_str()]).await?;
        self.attach_items(rows).await
    }

    /// The most recently placed orders.
    pub async fn recent(&self, limit: i64) -> Result<Vec<Order>, CommerceError> {
        let sql = format!("{} ORDER BY placed_at DESC, id LIMIT ?", SELECT_ORDER);
        let rows: Vec<OrderRow> = self.db.query_as(&sql, params![limit]).await?;
        self.attach_items(rows).await
    }

    pub async fn mark_paid(&self, id: &OrderId) -> Result<Order, CommerceError> {
        self.advance(id, OrderStatus::Paid).await
    }

    pub async fn mark_shipped(&self, id: &OrderId) -> Result<Order, CommerceError> {
        self.advance(id, OrderStatus::Shipped).await
    }

    pub async fn mark_delivered(&self, id: &OrderId) -> Result<Order, CommerceError> {
        self.advance(id, OrderStatus::Delivered).await
    }

    /// Cancel an order, putting its stock back and releasing its coupon use.
    pub async fn cancel(&self, id: &OrderId) -> Result<Order, CommerceError> {
        let mut order = self.get(id).await?;
        let from = order.status();
        let now = current_timestamp();
        order.cancel(now)?;

        let mut statements = vec![Statement::new(
            format!(
                "UPDATE orders SET cancelled_at = ? WHERE id = ? AND ({})",
                order_status_condition(from)
            ),
            vec![now.into(), id.as_str().into()],
        )
        .guarded(format!("order {} changed while cancelling", order.order_number))];
        for item in &order.items {
            if let Some(variant_id) = &item.variant_id {
                statements.push(Statement::new(
                    "UPDATE product_variants SET inventory = inventory + ? WHERE id = ?",
                    vec![item.quantity.into(), variant_id.as_str().into()],
                ));
            }
        }
        if let Some(code) = &order.coupon_code {
            statements.push(Statement::new(
                "UPDATE coupons SET usage_count = MAX(usage_count - 1, 0) WHERE code = ?",
                vec![code.clone().into()],
            ));
        }

        self.db.transaction(statements).await?;
        info!(order = %order.order_number, from = from.as_str(), "order cancelled");
        Ok(order)
    }

    /// Cancel one of the customer's own orders. Only pending orders qualify.
    pub async fn cancel_for_user(
        &self,
        user_id: &UserId,
        id: &OrderId,
    ) -> Result<Order, CommerceError> {
        let order = self.get_for_user(user_id, id).await?;
        let status = order.status();
        if status != OrderStatus::Pending {
            return Err(CommerceError::InvalidOrderTransition {
                from: status.as_str().to_string(),
                to: OrderStatus::Cancelled.as_str().to_string(),
            });
        }
        self.cancel(id).await
    }

    /// Move an order one step forward through payment and fulfilment.
    async fn advance(&self, id: &OrderId, to: OrderStatus) -> Result<Order, CommerceError> {
        let mut order = self.get(id).await?;
        let from = order.status();
        let now = current_timestamp();
        let column = match to {
            OrderStatus::Paid => {
                order.mark_paid(now)?;
                "paid_at"
            }
            OrderStatus::Shipped => {
                order.mark_shipped(now)?;
                "shipped_at"
            }
            OrderStatus::Delivered => {
                order.mark_delivered(now)?;
                "delivered_at"
            }
            OrderStatus::Pending | OrderStatus::Cancelled => {
                return Err(CommerceError::InvalidOrderTransition {
                    from: from.as_str().to_string(),
                    to: to.as_str().to_string(),
                })
            }
        };

        self.db
            .transaction(vec![Statement::new(
                format!(
                    "UPDATE orders SET {} = ? WHERE id = ? AND ({})",
                    column,
                    order_status_condition(from)
                ),
                vec![now.into(), id.as_str().into()],
            )
            .guarded(format!("order {} changed concurrently", order.order_number))])
            .await?;

        info!(
            order = %order.order_number,
            from = from.as_str(),
            to = to.as_str(),
            "order status changed"
        );
        Ok(order)
    }

    /// Fail if any line has gone away or wants more than is in stock.
    async fn check_stock(&self, items: &[crate::cart::CartItem]) -> Result<(), CommerceError> {
        #[derive(Deserialize)]
        struct StockRow {
            id: VariantId,
            inventory: i64,
        }

        let params: Vec<Value> = items.iter().map(|i| i.variant_id.as_str().into()).collect();
        let rows: Vec<StockRow> = self
            .db
            .query_as(
                &format!(
                    "SELECT id, inventory FROM product_variants WHERE id IN ({})",
                    placeholders(items.len())
                ),
                &params,
            )
            .await?;
        let stock: HashMap<VariantId, i64> =
            rows.into_iter().map(|r| (r.id, r.inventory)).collect();

        for item in items {
            match stock.get(&item.variant_id) {
                None => return Err(CommerceError::ProductUnavailable(item.product_name.clone())),
                Some(&available) if available < item.quantity => {
                    return Err(CommerceError::InsufficientInventory {
                        sku: item.sku.clone(),
                        requested: item.quantity,
                        available,
                    })
                }
                Some(_) => {}
            }
        }
        debug!(lines = items.len(), "stock checked");
        Ok(())
    }

    async fn attach_items(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, CommerceError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let params: Vec<Value> = rows.iter().map(|r| r.id.as_str().into()).collect();
        let item_rows: Vec<OrderItemRow> = self
            .db
            .query_as(
                &format!(
                    "SELECT id, order_id, variant_id, product_id, sku, product_name, variant_title, \
                     unit_price_cents, quantity, line_total_cents FROM order_items \
                     WHERE order_id IN ({}) ORDER BY rowid",
                    placeholders(rows.len())
                ),
                &params,
            )
            .await?;

        let fallback = self.settings.currency;
        let mut by_order: HashMap<OrderId, Vec<OrderItemRow>> = HashMap::new();
        for item in item_rows {
            by_order.entry(item.order_id.clone()).or_default().push(item);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let currency = Currency::from_code(&row.currency).unwrap_or(fallback);
                let items = by_order
                    .remove(&row.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|item| OrderItem {
                        id: item.id,
                        variant_id: item.variant_id,
                        product_id: item.product_id,
                        sku: item.sku,
                        product_name: item.product_name,
                        variant_title: item.variant_title,
                        unit_price: Money::new(item.unit_price_cents, currency),
                        quantity: item.quantity,
                        line_total: Money::new(item.line_total_cents, currency),
                    })
                    .collect();
                row.into_order(fallback, items)
            })
            .collect())
    }
}

fn insert_order(order: &Order) -> Statement {
    let address = &order.shipping_address;
    Statement::new(
        "INSERT INTO orders (id, order_number, user_id, email, currency, subtotal_cents, \
         discount_cents, shipping_cents, tax_cents, total_cents, coupon_code, note, ship_name, \
         ship_line1, ship_line2, ship_city, ship_region, ship_postal_code, ship_country, \
         ship_phone, placed_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        vec![
            order.id.as_str().into(),
            order.order_number.clone().into(),
            order.user_id.as_ref().map(|u| u.as_str()).into(),
            order.email.clone().into(),
            order.currency.code().into(),
            order.subtotal.amount_cents.into(),
            order.discount_total.amount_cents.into(),
            order.shipping_total.amount_cents.into(),
            order.tax_total.amount_cents.into(),
            order.grand_total.amount_cents.into(),
            order.coupon_code.clone().into(),
            order.note.clone().into(),
            address.name.clone().into(),
            address.line1.clone().into(),
            address.line2.clone().into(),
            address.city.clone().into(),
            address.region.clone().into(),
            address.postal_code.clone().into(),
            address.country.clone().into(),
            address.phone.clone().into(),
            order.placed_at.into(),
        ],
    )
}

fn insert_item(order_id: &OrderId, item: &OrderItem) -> Statement {
    Statement::new(
        "INSERT INTO order_items (id, order_id, variant_id, product_id, sku, product_name, \
         variant_title, unit_price_cents, quantity, line_total_cents) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        vec![
            item.id.as_str().into(),
            order_id.as_str().into(),
            item.variant_id.as_ref().map(|v| v.as_str()).into(),
            item.product_id.as_ref().map(|p| p.as_str()).into(),
            item.sku.clone().into(),
            item.product_name.clone().into(),
            item.variant_title.clone().into(),
            item.unit_price.amount_cents.into(),
            item.quantity.into(),
            item.line_total.amount_cents.into(),
        ],
    )
}
