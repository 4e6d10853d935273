//! Order types.

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::cart::{Cart, CartSummary};
use crate::checkout::Address;
use crate::error::CommerceError;
use crate::ids::{OrderId, OrderItemId, ProductId, UserId, VariantId};
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};

/// Order status, derived from the order's lifecycle timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order placed, awaiting payment.
    #[default]
    Pending,
    /// Payment received.
    Paid,
    /// Handed to the carrier.
    Shipped,
    /// Delivered to the customer.
    Delivered,
    /// Order cancelled.
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Paid,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Paid => "Paid",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s.to_lowercase())
    }

    /// Check if order is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Check if order can be cancelled.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Paid)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A placed order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// Unique order identifier.
    pub id: OrderId,
    /// Human-readable order number.
    pub order_number: String,
    /// Customer user ID (None for guest checkout).
    pub user_id: Option<UserId>,
    /// Customer email.
    pub email: String,
    pub currency: Currency,
    /// Items in the order.
    pub items: Vec<OrderItem>,
    pub shipping_address: Address,
    /// Subtotal before discounts.
    pub subtotal: Money,
    /// Total discount amount.
    pub discount_total: Money,
    /// Shipping cost.
    pub shipping_total: Money,
    /// Tax amount.
    pub tax_total: Money,
    /// Grand total charged.
    pub grand_total: Money,
    /// Coupon redeemed with this order.
    pub coupon_code: Option<String>,
    /// Customer note.
    pub note: Option<String>,
    pub placed_at: i64,
    pub paid_at: Option<i64>,
    pub shipped_at: Option<i64>,
    pub delivered_at: Option<i64>,
    pub cancelled_at: Option<i64>,
}

impl Order {
    /// Build a pending order from a priced cart.
    pub fn from_cart(
        cart: &Cart,
        summary: &CartSummary,
        checkout: CheckoutInput,
        email: String,
        user_id: Option<UserId>,
        now: i64,
    ) -> Result<Self, CommerceError> {
        if cart.is_empty() {
            return Err(CommerceError::EmptyCart);
        }

        let items = cart
            .items
            .iter()
            .map(|item| {
                Ok(OrderItem {
                    id: OrderItemId::generate(),
                    variant_id: Some(item.variant_id.clone()),
                    product_id: Some(item.product_id.clone()),
                    sku: item.sku.clone(),
                    product_name: item.product_name.clone(),
                    variant_title: item.variant_title.clone(),
                    unit_price: item.unit_price,
                    quantity: item.quantity,
                    line_total: item.line_total()?,
                })
            })
            .collect::<Result<Vec<_>, CommerceError>>()?;

        Ok(Self {
            id: OrderId::generate(),
            order_number: generate_order_number(
                DateTime::from_timestamp(now, 0).unwrap_or_default(),
            ),
            user_id,
            email,
            currency: cart.currency,
            items,
            shipping_address: checkout.shipping_address,
            subtotal: summary.subtotal,
            discount_total: summary.discount,
            shipping_total: summary.shipping,
            tax_total: summary.tax,
            grand_total: summary.total,
            coupon_code: summary.coupon.as_ref().map(|c| c.code.clone()),
            note: checkout.note,
            placed_at: now,
            paid_at: None,
            shipped_at: None,
            delivered_at: None,
            cancelled_at: None,
        })
    }

    /// Current status. The most advanced timestamp wins, with cancellation
    /// taking precedence over everything.
    pub fn status(&self) -> OrderStatus {
        if self.cancelled_at.is_some() {
            OrderStatus::Cancelled
        } else if self.delivered_at.is_some() {
            OrderStatus::Delivered
        } else if self.shipped_at.is_some() {
            OrderStatus::Shipped
        } else if self.paid_at.is_some() {
            OrderStatus::Paid
        } else {
            OrderStatus::Pending
        }
    }

    /// Get total item count.
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Record payment. Only pending orders can be paid.
    pub fn mark_paid(&mut self, now: i64) -> Result<(), CommerceError> {
        self.require(&[OrderStatus::Pending], OrderStatus::Paid)?;
        self.paid_at = Some(now);
        Ok(())
    }

    /// Record shipment. Only paid orders can be shipped.
    pub fn mark_shipped(&mut self, now: i64) -> Result<(), CommerceError> {
        self.require(&[OrderStatus::Paid], OrderStatus::Shipped)?;
        self.shipped_at = Some(now);
        Ok(())
    }

    /// Record delivery. Only shipped orders can be delivered.
    pub fn mark_delivered(&mut self, now: i64) -> Result<(), CommerceError> {
        self.require(&[OrderStatus::Shipped], OrderStatus::Delivered)?;
        self.delivered_at = Some(now);
        Ok(())
    }

    /// Cancel the order. Pending and paid orders can be cancelled.
    pub fn cancel(&mut self, now: i64) -> Result<(), CommerceError> {
        self.require(&[OrderStatus::Pending, OrderStatus::Paid], OrderStatus::Cancelled)?;
        self.cancelled_at = Some(now);
        Ok(())
    }

    fn require(&self, allowed: &[OrderStatus], to: OrderStatus) -> Result<(), CommerceError> {
        let from = self.status();
        if allowed.contains(&from) {
            Ok(())
        } else {
            Err(CommerceError::InvalidOrderTransition {
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            })
        }
    }
}

/// An order as returned to clients, with its derived status.
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub status: OrderStatus,
    pub item_count: i64,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        Self {
            status: order.status(),
            item_count: order.item_count(),
            order,
        }
    }
}

/// A line in an order, snapshotted at checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub id: OrderItemId,
    /// Purchased variant; cleared if the variant is later deleted.
    pub variant_id: Option<VariantId>,
    pub product_id: Option<ProductId>,
    /// SKU at time of order.
    pub sku: String,
    /// Product name at time of order.
    pub product_name: String,
    /// Variant title (e.g., "Large / Blue").
    pub variant_title: String,
    /// Unit price at time of order.
    pub unit_price: Money,
    pub quantity: i64,
    pub line_total: Money,
}

/// Checkout form payload.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CheckoutInput {
    /// Contact email; required for guests, defaults to the account email.
    pub email: Option<String>,
    pub shipping_address: Address,
    pub note: Option<String>,
}

impl CheckoutInput {
    /// Validate the form, returning the normalized email if one was given.
    pub fn validate(&mut self) -> Result<Option<String>, CommerceError> {
        self.shipping_address = std::mem::take(&mut self.shipping_address).validated()?;
        self.note = self
            .note
            .take()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        self.email
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .map(normalize_email)
            .transpose()
    }
}

/// Lower-case and sanity-check an email address.
pub fn normalize_email(email: &str) -> Result<String, CommerceError> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(CommerceError::ValidationError(format!(
            "invalid email address: {}",
            email
        )))
    }
}

/// Generate an order number of the form `ORD-YYYYMMDD-XXXXXX`.
pub fn generate_order_number(placed: DateTime<Utc>) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();
    format!("ORD-{}-{}", placed.format("%Y%m%d"), suffix)
}
