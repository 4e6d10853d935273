//! Shop-wide pricing settings.

use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};

/// Currency, shipping and tax rules applied at checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopSettings {
    /// Currency for all prices.
    pub currency: Currency,
    /// Flat shipping charge per order.
    pub flat_shipping_cents: i64,
    /// Orders whose discounted subtotal reaches this ship free.
    pub free_shipping_threshold_cents: Option<i64>,
    /// Tax rate in basis points (825 = 8.25%).
    pub tax_rate_bps: u32,
    /// Variants at or below this inventory count as low stock.
    pub low_stock_threshold: i64,
}

impl Default for ShopSettings {
    fn default() -> Self {
        Self {
            currency: Currency::USD,
            flat_shipping_cents: 500,
            free_shipping_threshold_cents: Some(5000),
            tax_rate_bps: 0,
            low_stock_threshold: 5,
        }
    }
}

impl ShopSettings {
    /// Shipping charge for an order with the given discounted subtotal.
    pub fn shipping_for(&self, discounted_subtotal: &Money) -> Money {
        let free = self
            .free_shipping_threshold_cents
            .is_some_and(|threshold| discounted_subtotal.amount_cents >= threshold);
        if free {
            Money::zero(self.currency)
        } else {
            Money::new(self.flat_shipping_cents, self.currency)
        }
    }

    /// Tax on a discounted subtotal, rounded half up.
    pub fn tax_for(&self, discounted_subtotal: &Money) -> Money {
        discounted_subtotal.basis_points(self.tax_rate_bps)
    }
}
