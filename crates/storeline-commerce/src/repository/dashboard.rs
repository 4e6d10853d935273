//! Admin dashboard overview.

use serde::{Deserialize, Serialize};
use storeline_db::{params, Db};

use crate::checkout::{OrderStatus, OrderView, ShopSettings};
use crate::error::CommerceError;
use crate::ids::{ProductId, VariantId};
use crate::money::Money;
use crate::search::order_status_condition;

use super::OrderRepository;

const RECENT_ORDERS: i64 = 5;

/// Number of orders in each status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrderCounts {
    pub pending: i64,
    pub paid: i64,
    pub shipped: i64,
    pub delivered: i64,
    pub cancelled: i64,
}

impl OrderCounts {
    pub fn total(&self) -> i64 {
        self.pending + self.paid + self.shipped + self.delivered + self.cancelled
    }

    fn set(&mut self, status: OrderStatus, count: i64) {
        match status {
            OrderStatus::Pending => self.pending = count,
            OrderStatus::Paid => self.paid = count,
            OrderStatus::Shipped => self.shipped = count,
            OrderStatus::Delivered => self.delivered = count,
            OrderStatus::Cancelled => self.cancelled = count,
        }
    }
}

/// A variant running out of stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowStockVariant {
    pub variant_id: VariantId,
    pub product_id: ProductId,
    pub product_name: String,
    pub sku: String,
    pub inventory: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    /// Paid, non-cancelled order totals.
    pub revenue: Money,
    pub orders: OrderCounts,
    pub product_count: i64,
    pub active_product_count: i64,
    pub customer_count: i64,
    pub low_stock: Vec<LowStockVariant>,
    pub recent_orders: Vec<OrderView>,
}

#[derive(Clone, Debug)]
pub struct DashboardRepository {
    db: Db,
    settings: ShopSettings,
    orders: OrderRepository,
}

impl DashboardRepository {
    pub fn new(db: Db, settings: ShopSettings, orders: OrderRepository) -> Self {
        Self {
            db,
            settings,
            orders,
        }
    }

    pub async fn stats(&self) -> Result<DashboardStats, CommerceError> {
        let revenue = self
            .db
            .query_scalar_i64(
                "SELECT COALESCE(SUM(total_cents), 0) FROM orders \
                 WHERE paid_at IS NOT NULL AND cancelled_at IS NULL",
                params![],
            )
            .await?;

        let mut orders = OrderCounts::default();
        for status in OrderStatus::ALL {
            let count = self
                .db
                .query_scalar_i64(
                    &format!(
                        "SELECT COUNT(*) FROM orders WHERE {}",
                        order_status_condition(status)
                    ),
                    params![],
                )
                .await?;
            orders.set(status, count);
        }

        let product_count = self
            .db
            .query_scalar_i64("SELECT COUNT(*) FROM products", params![])
            .await?;
        let active_product_count = self
            .db
            .query_scalar_i64(
                "SELECT COUNT(*) FROM products WHERE status = 'active'",
                params![],
            )
            .await?;
        let customer_count = self
            .db
            .query_scalar_i64(
                "SELECT COUNT(*) FROM users WHERE role = 'customer'",
                params![],
            )
            .await?;

        let low_stock: Vec<LowStockVariant> = self
            .db
            .query_as(
                "SELECT v.id AS variant_id, v.product_id, p.name AS product_name, v.sku, \
                 v.inventory FROM product_variants v JOIN products p ON p.id = v.product_id \
                 WHERE p.status != 'archived' AND v.inventory <= ? \
                 ORDER BY v.inventory, p.name, v.sku",
                params![self.settings.low_stock_threshold],
            )
            .await?;

        let recent_orders = self
            .orders
            .recent(RECENT_ORDERS)
            .await?
            .into_iter()
            .map(OrderView::from)
            .collect();

        Ok(DashboardStats {
            revenue: Money::new(revenue, self.settings.currency),
            orders,
            product_count,
            active_product_count,
            customer_count,
            low_stock,
            recent_orders,
        })
    }
}
