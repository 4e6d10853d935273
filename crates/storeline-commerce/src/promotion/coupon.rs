//! Coupon types and redemption rules.

use crate::error::CommerceError;
use crate::ids::CouponId;
use crate::money::{Currency, Money};
use crate::current_timestamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What a coupon takes off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CouponKind {
    /// Whole percent off the item subtotal (1..=100).
    Percentage { percent: u32 },
    /// Fixed amount off the item subtotal.
    Fixed { amount: Money },
    /// Removes the shipping charge.
    FreeShipping,
}

impl CouponKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CouponKind::Percentage { .. } => "percentage",
            CouponKind::Fixed { .. } => "fixed",
            CouponKind::FreeShipping => "free_shipping",
        }
    }
}

/// Why a coupon cannot be redeemed right now.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum CouponRejection {
    #[error("coupon is not active")]
    Inactive,
    #[error("coupon is not valid yet")]
    NotStarted,
    #[error("coupon has expired")]
    Expired,
    #[error("coupon usage limit reached")]
    UsageLimitReached,
    #[error("coupon already used the maximum number of times by this customer")]
    CustomerLimitReached,
    #[error("order subtotal must be at least {minimum}")]
    MinimumNotMet { minimum: Money },
}

impl CouponRejection {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            CouponRejection::Inactive => "inactive",
            CouponRejection::NotStarted => "not_started",
            CouponRejection::Expired => "expired",
            CouponRejection::UsageLimitReached => "usage_limit_reached",
            CouponRejection::CustomerLimitReached => "customer_limit_reached",
            CouponRejection::MinimumNotMet { .. } => "minimum_not_met",
        }
    }
}

/// Lifecycle state shown in the admin coupon list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouponStatus {
    Disabled,
    Scheduled,
    Active,
    Expired,
    Exhausted,
}

/// Amount a coupon takes off, split by what it applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponDiscount {
    /// Taken off the item subtotal.
    pub items: Money,
    /// Taken off shipping.
    pub shipping: Money,
}

impl CouponDiscount {
    pub fn none(currency: Currency) -> Self {
        Self {
            items: Money::zero(currency),
            shipping: Money::zero(currency),
        }
    }

    pub fn total(&self) -> Result<Money, CommerceError> {
        self.items.try_add(&self.shipping)
    }
}

/// A discount code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coupon {
    /// Unique coupon identifier.
    pub id: CouponId,
    /// Redemption code, stored trimmed and upper-case.
    pub code: String,
    pub description: Option<String>,
    pub kind: CouponKind,
    /// Minimum item subtotal required.
    pub min_subtotal: Option<Money>,
    /// Upper bound on a percentage discount.
    pub max_discount: Option<Money>,
    /// Start of the validity window (Unix timestamp).
    pub starts_at: Option<i64>,
    /// End of the validity window (Unix timestamp).
    pub ends_at: Option<i64>,
    /// Maximum number of redemptions (None = unlimited).
    pub usage_limit: Option<i64>,
    /// Redemptions so far.
    pub usage_count: i64,
    /// Maximum redemptions per customer.
    pub per_customer_limit: Option<i64>,
    /// Whether the coupon can be redeemed at all.
    pub active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Coupon {
    /// Create an active coupon with no restrictions.
    pub fn new(code: &str, kind: CouponKind) -> Self {
        let now = current_timestamp();
        Self {
            id: CouponId::generate(),
            code: normalize_code(code),
            description: None,
            kind,
            min_subtotal: None,
            max_discount: None,
            starts_at: None,
            ends_at: None,
            usage_limit: None,
            usage_count: 0,
            per_customer_limit: None,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check whether the coupon may be redeemed.
    ///
    /// Rules are checked in a fixed order and the first failure is reported.
    pub fn validate(
        &self,
        now: i64,
        subtotal: &Money,
        customer_uses: i64,
    ) -> Result<(), CouponRejection> {
        if !self.active {
            return Err(CouponRejection::Inactive);
        }
        if self.starts_at.is_some_and(|starts| now < starts) {
            return Err(CouponRejection::NotStarted);
        }
        if self.ends_at.is_some_and(|ends| now > ends) {
            return Err(CouponRejection::Expired);
        }
        if self.is_exhausted() {
            return Err(CouponRejection::UsageLimitReached);
        }
        if self
            .per_customer_limit
            .is_some_and(|limit| customer_uses >= limit)
        {
            return Err(CouponRejection::CustomerLimitReached);
        }
        if let Some(minimum) = self.min_subtotal {
            if subtotal.amount_cents < minimum.amount_cents {
                return Err(CouponRejection::MinimumNotMet { minimum });
            }
        }
        Ok(())
    }

    /// Compute the discount for an item subtotal and shipping charge.
    ///
    /// The item discount never exceeds the subtotal.
    pub fn discount(&self, subtotal: &Money, shipping: &Money) -> CouponDiscount {
        let mut discount = CouponDiscount::none(subtotal.currency);
        match self.kind {
            CouponKind::Percentage { percent } => {
                let mut amount = subtotal.percentage(percent.min(100));
                if let Some(cap) = self.max_discount {
                    amount = amount.min(cap);
                }
                discount.items = amount.min(*subtotal);
            }
            CouponKind::Fixed { amount } => {
                discount.items =
                    Money::new(amount.amount_cents.max(0), subtotal.currency).min(*subtotal);
            }
            CouponKind::FreeShipping => {
                discount.shipping = *shipping;
            }
        }
        discount
    }

    /// Check if the global usage limit has been reached.
    pub fn is_exhausted(&self) -> bool {
        self.usage_limit
            .is_some_and(|limit| self.usage_count >= limit)
    }

    /// Status for admin listings.
    pub fn status(&self, now: i64) -> CouponStatus {
        if !self.active {
            CouponStatus::Disabled
        } else if self.starts_at.is_some_and(|starts| now < starts) {
            CouponStatus::Scheduled
        } else if self.ends_at.is_some_and(|ends| now > ends) {
            CouponStatus::Expired
        } else if self.is_exhausted() {
            CouponStatus::Exhausted
        } else {
            CouponStatus::Active
        }
    }
}

/// Normalize a user-entered code: trimmed and upper-case.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Coupon form payload from the admin dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CouponInput {
    pub code: String,
    pub description: Option<String>,
    /// "percentage", "fixed" or "free_shipping".
    pub kind: String,
    pub percent_off: Option<u32>,
    pub amount_off_cents: Option<i64>,
    pub min_subtotal_cents: Option<i64>,
    pub max_discount_cents: Option<i64>,
    pub starts_at: Option<i64>,
    pub ends_at: Option<i64>,
    pub usage_limit: Option<i64>,
    pub per_customer_limit: Option<i64>,
    pub active: Option<bool>,
}

impl CouponInput {
    /// Validate the form and resolve the coupon kind.
    pub fn validate(&self, currency: Currency) -> Result<CouponKind, CommerceError> {
        let code = normalize_code(&self.code);
        if code.is_empty() {
            return Err(CommerceError::ValidationError("code is required".into()));
        }
        if !code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(CommerceError::ValidationError(
                "code may only contain letters, digits, '-' and '_'".into(),
            ));
        }

        let kind = match self.kind.as_str() {
            "percentage" => match self.percent_off {
                Some(percent) if (1..=100).contains(&percent) => CouponKind::Percentage { percent },
                _ => {
                    return Err(CommerceError::ValidationError(
                        "percent_off must be between 1 and 100".into(),
                    ))
                }
            },
            "fixed" => match self.amount_off_cents {
                Some(cents) if cents > 0 => CouponKind::Fixed {
                    amount: Money::new(cents, currency),
                },
                _ => {
                    return Err(CommerceError::ValidationError(
                        "amount_off_cents must be positive".into(),
                    ))
                }
            },
            "free_shipping" => CouponKind::FreeShipping,
            other => {
                return Err(CommerceError::ValidationError(format!(
                    "unknown coupon kind {}",
                    other
                )))
            }
        };

        let negative = [self.min_subtotal_cents, self.max_discount_cents]
            .into_iter()
            .flatten()
            .any(|c| c < 0);
        if negative {
            return Err(CommerceError::ValidationError(
                "amounts cannot be negative".into(),
            ));
        }
        let limits = [self.usage_limit, self.per_customer_limit];
        if limits.into_iter().flatten().any(|l| l < 1) {
            return Err(CommerceError::ValidationError(
                "usage limits must be at least 1".into(),
            ));
        }
        if let (Some(starts), Some(ends)) = (self.starts_at, self.ends_at) {
            if ends <= starts {
                return Err(CommerceError::ValidationError(
                    "ends_at must be after starts_at".into(),
                ));
            }
        }
        Ok(kind)
    }

    /// Validate and build a new coupon.
    pub fn into_coupon(self, currency: Currency) -> Result<Coupon, CommerceError> {
        let kind = self.validate(currency)?;
        let mut coupon = Coupon::new(&self.code, kind);
        self.apply_to(&mut coupon, kind, currency);
        Ok(coupon)
    }

    /// Validate and overwrite an existing coupon, keeping its ID and usage.
    pub fn update(self, coupon: &mut Coupon, currency: Currency) -> Result<(), CommerceError> {
        let kind = self.validate(currency)?;
        coupon.code = normalize_code(&self.code);
        self.apply_to(coupon, kind, currency);
        coupon.updated_at = current_timestamp();
        Ok(())
    }

    fn apply_to(&self, coupon: &mut Coupon, kind: CouponKind, currency: Currency) {
        coupon.kind = kind;
        coupon.description = self
            .description
            .as_ref()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        coupon.min_subtotal = self.min_subtotal_cents.map(|c| Money::new(c, currency));
        coupon.max_discount = self.max_discount_cents.map(|c| Money::new(c, currency));
        coupon.starts_at = self.starts_at;
        coupon.ends_at = self.ends_at;
        coupon.usage_limit = self.usage_limit;
        coupon.per_customer_limit = self.per_customer_limit;
        coupon.active = self.active.unwrap_or(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd(cents: i64) -> Money {
        Money::new(cents, Currency::USD)
    }

    #[test]
    fn test_code_normalized() {
        let coupon = Coupon::new("  save10 ", CouponKind::Percentage { percent: 10 });
        assert_eq!(coupon.code, "SAVE10");
    }

    #[test]
    fn test_validation_order() {
        let mut coupon = Coupon::new("X", CouponKind::FreeShipping);
        coupon.active = false;
        coupon.starts_at = Some(100);
        coupon.ends_at = Some(200);
        assert_eq!(coupon.validate(50, &usd(1000), 0), Err(CouponRejection::Inactive));

        coupon.active = true;
        assert_eq!(coupon.validate(50, &usd(1000), 0), Err(CouponRejection::NotStarted));
        assert_eq!(coupon.validate(201, &usd(1000), 0), Err(CouponRejection::Expired));
        assert_eq!(coupon.validate(200, &usd(1000), 0), Ok(()));

        coupon.usage_limit = Some(5);
        coupon.usage_count = 5;
        assert_eq!(
            coupon.validate(150, &usd(1000), 0),
            Err(CouponRejection::UsageLimitReached)
        );

        coupon.usage_count = 4;
        coupon.per_customer_limit = Some(1);
        assert_eq!(
            coupon.validate(150, &usd(1000), 1),
            Err(CouponRejection::CustomerLimitReached)
        );

        coupon.min_subtotal = Some(usd(5000));
        assert_eq!(
            coupon.validate(150, &usd(4999), 0),
            Err(CouponRejection::MinimumNotMet { minimum: usd(5000) })
        );
        assert_eq!(coupon.validate(150, &usd(5000), 0), Ok(()));
    }

    #[test]
    fn test_percentage_discount() {
        let mut coupon = Coupon::new("P15", CouponKind::Percentage { percent: 15 });
        let d = coupon.discount(&usd(3333), &usd(500));
        // 15% of 33.33 = 4.9995
        assert_eq!(d.items, usd(500));
        assert_eq!(d.shipping, usd(0));

        coupon.max_discount = Some(usd(300));
        assert_eq!(coupon.discount(&usd(3333), &usd(500)).items, usd(300));
    }

    #[test]
    fn test_fixed_discount_capped_at_subtotal() {
        let coupon = Coupon::new("F20", CouponKind::Fixed { amount: usd(2000) });
        assert_eq!(coupon.discount(&usd(5000), &usd(0)).items, usd(2000));
        assert_eq!(coupon.discount(&usd(1500), &usd(0)).items, usd(1500));
    }

    #[test]
    fn test_free_shipping_discount() {
        let coupon = Coupon::new("SHIP", CouponKind::FreeShipping);
        let d = coupon.discount(&usd(1500), &usd(599));
        assert_eq!(d.items, usd(0));
        assert_eq!(d.shipping, usd(599));
        assert_eq!(d.total().unwrap(), usd(599));
    }

    #[test]
    fn test_status() {
        let mut coupon = Coupon::new("S", CouponKind::FreeShipping);
        assert_eq!(coupon.status(10), CouponStatus::Active);
        coupon.starts_at = Some(20);
        assert_eq!(coupon.status(10), CouponStatus::Scheduled);
        coupon.ends_at = Some(30);
        assert_eq!(coupon.status(31), CouponStatus::Expired);
        coupon.usage_limit = Some(1);
        coupon.usage_count = 1;
        assert_eq!(coupon.status(25), CouponStatus::Exhausted);
        coupon.active = false;
        assert_eq!(coupon.status(25), CouponStatus::Disabled);
    }

    #[test]
    fn test_input_validation() {
        let mut input = CouponInput {
            code: "welcome".into(),
            kind: "percentage".into(),
            percent_off: Some(10),
            ..Default::default()
        };
        let coupon = input.clone().into_coupon(Currency::USD).unwrap();
        assert_eq!(coupon.code, "WELCOME");
        assert!(coupon.active);

        input.percent_off = Some(101);
        assert!(input.validate(Currency::USD).is_err());

        input.kind = "fixed".into();
        input.amount_off_cents = Some(0);
        assert!(input.validate(Currency::USD).is_err());

        input.kind = "free_shipping".into();
        input.starts_at = Some(10);
        input.ends_at = Some(10);
        assert!(input.validate(Currency::USD).is_err());

        input.ends_at = None;
        input.code = "bad code".into();
        assert!(input.validate(Currency::USD).is_err());
    }
}
