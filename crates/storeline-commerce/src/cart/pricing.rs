//! Cart pricing calculations.

use crate::cart::Cart;
use crate::checkout::ShopSettings;
use crate::error::CommerceError;
use crate::money::Money;
use crate::promotion::{Coupon, CouponDiscount, CouponRejection};
use serde::{Deserialize, Serialize};

/// The coupon applied to a cart and what it took off.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppliedCoupon {
    pub code: String,
    pub discount: CouponDiscount,
}

/// Complete pricing breakdown for a cart.
///
/// `total = subtotal - discount + shipping + tax`, where `discount` includes
/// any shipping discount.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartSummary {
    /// Sum of quantities.
    pub item_count: i64,
    /// Number of distinct lines.
    pub unique_items: usize,
    /// Subtotal before discounts.
    pub subtotal: Money,
    /// Total discount (items and shipping).
    pub discount: Money,
    /// Shipping charge before discounts.
    pub shipping: Money,
    /// Tax on the discounted item subtotal.
    pub tax: Money,
    /// Amount due.
    pub total: Money,
    /// Coupon that was applied.
    pub coupon: Option<AppliedCoupon>,
    /// Set when the cart's coupon could not be applied.
    pub coupon_rejection: Option<CouponRejection>,
}

impl CartSummary {
    /// Check if any discounts are applied.
    pub fn has_discounts(&self) -> bool {
        self.discount.amount_cents > 0
    }
}

/// Price a cart.
///
/// `coupon` is the coupon referenced by the cart, if any; it is validated
/// against `now` and `customer_uses` and left out of the totals (with the
/// reason recorded) when it does not qualify.
pub fn price_cart(
    cart: &Cart,
    coupon: Option<&Coupon>,
    settings: &ShopSettings,
    now: i64,
    customer_uses: i64,
) -> Result<CartSummary, CommerceError> {
    let currency = cart.currency;
    let subtotal = cart.subtotal()?;

    let mut applied = None;
    let mut coupon_rejection = None;
    let mut coupon_discount = CouponDiscount::none(currency);

    // Item discount decides whether shipping is free, so price items first.
    if let Some(coupon) = coupon.filter(|_| !cart.is_empty()) {
        match coupon.validate(now, &subtotal, customer_uses) {
            Ok(()) => {
                let items_only = coupon.discount(&subtotal, &Money::zero(currency));
                coupon_discount.items = items_only.items;
            }
            Err(rejection) => coupon_rejection = Some(rejection),
        }
    }

    let discounted = subtotal.saturating_subtract(&coupon_discount.items)?;
    let shipping = if cart.is_empty() {
        Money::zero(currency)
    } else {
        settings.shipping_for(&discounted)
    };

    if let Some(coupon) = coupon.filter(|_| !cart.is_empty() && coupon_rejection.is_none()) {
        coupon_discount = coupon.discount(&subtotal, &shipping);
        applied = Some(AppliedCoupon {
            code: coupon.code.clone(),
            discount: coupon_discount,
        });
    }

    let tax = settings.tax_for(&discounted);
    let discount = coupon_discount.total()?;
    let total = subtotal
        .try_subtract(&discount)?
        .try_add(&shipping)?
        .try_add(&tax)?;

    Ok(CartSummary {
        item_count: cart.item_count(),
        unique_items: cart.unique_item_count(),
        subtotal,
        discount,
        shipping,
        tax,
        total,
        coupon: applied,
        coupon_rejection,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::{CartItem, CartOwner};
    use crate::ids::{CartItemId, ProductId, VariantId};
    use crate::money::Currency;
    use crate::promotion::CouponKind;

    fn usd(cents: i64) -> Money {
        Money::new(cents, Currency::USD)
    }

    fn cart_with(unit_cents: i64, quantity: i64) -> Cart {
        let mut cart = Cart::new(CartOwner::Guest("g".into()), Currency::USD);
        cart.items.push(CartItem {
            id: CartItemId::generate(),
            variant_id: VariantId::new("var_1"),
            product_id: ProductId::new("prod_1"),
            product_name: "Mug".into(),
            product_slug: "mug".into(),
            variant_title: "Default".into(),
            sku: "MUG".into(),
            unit_price: usd(unit_cents),
            quantity,
        });
        cart
    }

    fn settings() -> ShopSettings {
        ShopSettings {
            flat_shipping_cents: 500,
            free_shipping_threshold_cents: Some(5000),
            tax_rate_bps: 1000,
            ..ShopSettings::default()
        }
    }

    #[test]
    fn test_empty_cart_is_free() {
        let cart = Cart::new(CartOwner::Guest("g".into()), Currency::USD);
        let summary = price_cart(&cart, None, &settings(), 0, 0).unwrap();
        assert_eq!(summary.total, usd(0));
        assert_eq!(summary.shipping, usd(0));
    }

    #[test]
    fn test_totals_without_coupon() {
        let summary = price_cart(&cart_with(1250, 2), None, &settings(), 0, 0).unwrap();
        assert_eq!(summary.item_count, 2);
        assert_eq!(summary.subtotal, usd(2500));
        assert_eq!(summary.shipping, usd(500));
        assert_eq!(summary.tax, usd(250));
        assert_eq!(summary.total, usd(3250));
        assert!(!summary.has_discounts());
    }

    #[test]
    fn test_free_shipping_threshold_uses_discounted_subtotal() {
        let coupon = Coupon::new("TENOFF", CouponKind::Fixed { amount: usd(1000) });
        let summary = price_cart(&cart_with(5500, 1), Some(&coupon), &settings(), 0, 0).unwrap();
        // 55.00 - 10.00 = 45.00, below the 50.00 threshold
        assert_eq!(summary.discount, usd(1000));
        assert_eq!(summary.shipping, usd(500));
        assert_eq!(summary.tax, usd(450));
        assert_eq!(summary.total, usd(5500 - 1000 + 500 + 450));

        let no_coupon = price_cart(&cart_with(5500, 1), None, &settings(), 0, 0).unwrap();
        assert_eq!(no_coupon.shipping, usd(0));
    }

    #[test]
    fn test_free_shipping_coupon() {
        let coupon = Coupon::new("SHIP", CouponKind::FreeShipping);
        let summary = price_cart(&cart_with(1000, 1), Some(&coupon), &settings(), 0, 0).unwrap();
        assert_eq!(summary.shipping, usd(500));
        assert_eq!(summary.discount, usd(500));
        assert_eq!(summary.total, usd(1000 + 100));
        assert_eq!(summary.coupon.unwrap().discount.shipping, usd(500));
    }

    #[test]
    fn test_rejected_coupon_is_reported() {
        let mut coupon = Coupon::new("BIG", CouponKind::Percentage { percent: 20 });
        coupon.min_subtotal = Some(usd(10_000));
        let summary = price_cart(&cart_with(1000, 1), Some(&coupon), &settings(), 0, 0).unwrap();
        assert!(summary.coupon.is_none());
        assert_eq!(
            summary.coupon_rejection,
            Some(CouponRejection::MinimumNotMet { minimum: usd(10_000) })
        );
        assert_eq!(summary.discount, usd(0));
    }
}
