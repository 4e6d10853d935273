//! Persistence for the commerce domain.
//!
//! One repository per entity, each a cheap handle over a shared [`Db`].
//! [`Store`] bundles them for the server and CLI.

mod cart;
mod category;
mod coupon;
mod dashboard;
mod order;
mod product;
mod tag;

pub use cart::{CartRepository, CartView};
pub use category::{CategoryInput, CategoryRepository, CategoryUpdate};
pub use coupon::{CouponListing, CouponRepository};
pub use dashboard::{DashboardRepository, DashboardStats, LowStockVariant, OrderCounts};
pub use order::{Customer, OrderRepository};
pub use product::ProductRepository;
pub use tag::TagRepository;

use storeline_db::{Db, Value};

use crate::checkout::ShopSettings;
use crate::error::CommerceError;
use crate::search::FilterValue;

/// All repositories over one database.
#[derive(Clone, Debug)]
pub struct Store {
    pub db: Db,
    pub settings: ShopSettings,
    pub categories: CategoryRepository,
    pub tags: TagRepository,
    pub products: ProductRepository,
    pub coupons: CouponRepository,
    pub carts: CartRepository,
    pub orders: OrderRepository,
    pub dashboard: DashboardRepository,
}

impl Store {
    pub fn new(db: Db, settings: ShopSettings) -> Self {
        let categories = CategoryRepository::new(db.clone());
        let tags = TagRepository::new(db.clone());
        let products = ProductRepository::new(db.clone(), settings.currency);
        let coupons = CouponRepository::new(db.clone(), settings.currency);
        let carts = CartRepository::new(
            db.clone(),
            settings.clone(),
            products.clone(),
            coupons.clone(),
        );
        let orders = OrderRepository::new(db.clone(), settings.clone(), carts.clone());
        let dashboard = DashboardRepository::new(db.clone(), settings.clone(), orders.clone());

        Self {
            db,
            settings,
            categories,
            tags,
            products,
            coupons,
            carts,
            orders,
            dashboard,
        }
    }
}

/// `?, ?, ?` for `n` parameters.
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

pub(crate) fn bind_values(values: Vec<FilterValue>) -> Vec<Value> {
    values
        .into_iter()
        .map(|v| match v {
            FilterValue::Int(i) => Value::Integer(i),
            FilterValue::Text(s) => Value::Text(s),
        })
        .collect()
}

/// Turn a "no rows" database error into a domain not-found error.
pub(crate) fn or_not_found(
    err: storeline_db::DbError,
    not_found: impl FnOnce() -> CommerceError,
) -> CommerceError {
    match err {
        storeline_db::DbError::NotFound => not_found(),
        other => other.into(),
    }
}
