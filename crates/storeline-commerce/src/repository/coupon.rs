//! Coupon persistence and redemption checks.

use serde::{Deserialize, Serialize};
use storeline_db::{params, Db, DbError};
use tracing::{debug, info};

use crate::error::CommerceError;
use crate::ids::{CouponId, UserId};
use crate::money::{Currency, Money};
use crate::promotion::{normalize_code, Coupon, CouponInput, CouponKind, CouponStatus};
use crate::current_timestamp;

use super::or_not_found;

const SELECT_COUPON: &str = "SELECT id, code, description, kind, percent_off, amount_off_cents, \
     min_subtotal_cents, max_discount_cents, starts_at, ends_at, usage_limit, usage_count, \
     per_customer_limit, active, created_at, updated_at FROM coupons";

#[derive(Debug, Deserialize)]
struct CouponRow {
    id: CouponId,
    code: String,
    description: Option<String>,
    kind: String,
    percent_off: Option<u32>,
    amount_off_cents: Option<i64>,
    min_subtotal_cents: Option<i64>,
    max_discount_cents: Option<i64>,
    starts_at: Option<i64>,
    ends_at: Option<i64>,
    usage_limit: Option<i64>,
    usage_count: i64,
    per_customer_limit: Option<i64>,
    #[serde(deserialize_with = "storeline_db::sql_bool::deserialize")]
    active: bool,
    created_at: i64,
    updated_at: i64,
}

impl CouponRow {
    fn into_coupon(self, currency: Currency) -> Result<Coupon, CommerceError> {
        let kind = match self.kind.as_str() {
            "percentage" => CouponKind::Percentage {
                percent: self.percent_off.unwrap_or(0),
            },
            "fixed" => CouponKind::Fixed {
                amount: Money::new(self.amount_off_cents.unwrap_or(0), currency),
            },
            "free_shipping" => CouponKind::FreeShipping,
            other => {
                return Err(CommerceError::DatabaseError(format!(
                    "coupon {} has unknown kind {}",
                    self.code, other
                )))
            }
        };
        Ok(Coupon {
            id: self.id,
            code: self.code,
            description: self.description,
            kind,
            min_subtotal: self.min_subtotal_cents.map(|c| Money::new(c, currency)),
            max_discount: self.max_discount_cents.map(|c| Money::new(c, currency)),
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            usage_limit: self.usage_limit,
            usage_count: self.usage_count,
            per_customer_limit: self.per_customer_limit,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// A coupon with its current status, for the admin list.
#[derive(Debug, Clone, Serialize)]
pub struct CouponListing {
    #[serde(flatten)]
    pub coupon: Coupon,
    pub status: CouponStatus,
}

/// Coupon persistence.
#[derive(Clone, Debug)]
pub struct CouponRepository {
    db: Db,
    currency: Currency,
}

impl CouponRepository {
    pub fn new(db: Db, currency: Currency) -> Self {
        Self { db, currency }
    }

    pub async fn list(&self) -> Result<Vec<Coupon>, CommerceError> {
        let sql = format!("{} ORDER BY created_at DESC, code", SELECT_COUPON);
        let rows: Vec<CouponRow> = self.db.query_as(&sql, params![]).await?;
        rows.into_iter()
            .map(|row| row.into_coupon(self.currency))
            .collect()
    }

    /// All coupons with the status they have at `now`.
    pub async fn list_with_status(&self, now: i64) -> Result<Vec<CouponListing>, CommerceError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .map(|coupon| CouponListing {
                status: coupon.status(now),
                coupon,
            })
            .collect())
    }

    pub async fn get(&self, id: &CouponId) -> Result<Coupon, CommerceError> {
        let sql = format!("{} WHERE id = ?", SELECT_COUPON);
        let row: CouponRow = self
            .db
            .query_one(&sql, params![id.as_str()])
            .await
            .map_err(|e| or_not_found(e, || CommerceError::CouponNotFound(id.to_string())))?;
        row.into_coupon(self.currency)
    }

    /// Look up a coupon by code, ignoring case and surrounding whitespace.
    pub async fn get_by_code(&self, code: &str) -> Result<Coupon, CommerceError> {
        let code = normalize_code(code);
        let sql = format!("{} WHERE code = ?", SELECT_COUPON);
        let row: CouponRow = self
            .db
            .query_one(&sql, params![&code])
            .await
            .map_err(|e| or_not_found(e, || CommerceError::CouponNotFound(code.clone())))?;
        row.into_coupon(self.currency)
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, CommerceError> {
        match self.get_by_code(code).await {
            Ok(coupon) => Ok(Some(coupon)),
            Err(CommerceError::CouponNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn create(&self, input: CouponInput) -> Result<Coupon, CommerceError> {
        let coupon = input.into_coupon(self.currency)?;
        let (percent_off, amount_off) = kind_columns(&coupon.kind);

        self.db
            .execute(
                "INSERT INTO coupons (id, code, description, kind, percent_off, amount_off_cents, \
                 min_subtotal_cents, max_discount_cents, starts_at, ends_at, usage_limit, \
                 usage_count, per_customer_limit, active, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    coupon.id.as_str(),
                    &coupon.code,
                    coupon.description.as_deref(),
                    coupon.kind.as_str(),
                    percent_off,
                    amount_off,
                    coupon.min_subtotal.map(|m| m.amount_cents),
                    coupon.max_discount.map(|m| m.amount_cents),
                    coupon.starts_at,
                    coupon.ends_at,
                    coupon.usage_limit,
                    coupon.usage_count,
                    coupon.per_customer_limit,
                    coupon.active,
                    coupon.created_at,
                    coupon.updated_at
                ],
            )
            .await
            .map_err(|e| code_taken(e, &coupon.code))?;

        info!(id = %coupon.id, code = %coupon.code, kind = coupon.kind.as_str(), "coupon created");
        Ok(coupon)
    }

    /// Overwrite a coupon's rules. Its usage count is kept, and its code is
    /// fixed once a live order used it.
    pub async fn update(
        &self,
        id: &CouponId,
        input: CouponInput,
    ) -> Result<Coupon, CommerceError> {
        let mut coupon = self.get(id).await?;
        let previous_code = coupon.code.clone();
        input.update(&mut coupon, self.currency)?;
        if coupon.code != previous_code {
            // Orders reference coupons by code for usage release and per-customer limits.
            let redemptions = self
                .db
                .query_scalar_i64(
                    "SELECT COUNT(*) FROM orders WHERE coupon_code = ? AND cancelled_at IS NULL",
                    params![previous_code.as_str()],
                )
                .await?;
            if redemptions > 0 {
                return Err(CommerceError::Conflict(format!(
                    "coupon {} has been redeemed and its code cannot change",
                    previous_code
                )));
            }
        }
        let (percent_off, amount_off) = kind_columns(&coupon.kind);

        let updated = self
            .db
            .execute(
                "UPDATE coupons SET code = ?, description = ?, kind = ?, percent_off = ?, \
                 amount_off_cents = ?, min_subtotal_cents = ?, max_discount_cents = ?, \
                 starts_at = ?, ends_at = ?, usage_limit = ?, per_customer_limit = ?, active = ?, \
                 updated_at = ? WHERE id = ?",
                params![
                    &coupon.code,
                    coupon.description.as_deref(),
                    coupon.kind.as_str(),
                    percent_off,
                    amount_off,
                    coupon.min_subtotal.map(|m| m.amount_cents),
                    coupon.max_discount.map(|m| m.amount_cents),
                    coupon.starts_at,
                    coupon.ends_at,
                    coupon.usage_limit,
                    coupon.per_customer_limit,
                    coupon.active,
                    coupon.updated_at,
                    id.as_str()
                ],
            )
            .await
            .map_err(|e| code_taken(e, &coupon.code))?;
        if updated == 0 {
            return Err(CommerceError::CouponNotFound(id.to_string()));
        }

        info!(id = %id, code = %coupon.code, "coupon updated");
        Ok(coupon)
    }

    /// Enable or disable a coupon without touching its rules.
    pub async fn set_active(
        &self,
        id: &CouponId,
        active: bool,
    ) -> Result<Coupon, CommerceError> {
        let updated = self
            .db
            .execute(
                "UPDATE coupons SET active = ?, updated_at = ? WHERE id = ?",
                params![active, current_timestamp(), id.as_str()],
            )
            .await?;
        if updated == 0 {
            return Err(CommerceError::CouponNotFound(id.to_string()));
        }
        info!(id = %id, active, "coupon toggled");
        self.get(id).await
    }

    /// Delete a coupon. Orders keep the code they were placed with.
    pub async fn delete(&self, id: &CouponId) -> Result<(), CommerceError> {
        let deleted = self
            .db
            .execute("DELETE FROM coupons WHERE id = ?", params![id.as_str()])
            .await?;
        if deleted == 0 {
            return Err(CommerceError::CouponNotFound(id.to_string()));
        }
        info!(id = %id, "coupon deleted");
        Ok(())
    }

    /// Number of live (not cancelled) orders a customer placed with `code`.
    pub async fn customer_uses(
        &self,
        code: &str,
        user_id: Option<&UserId>,
    ) -> Result<i64, CommerceError> {
        let Some(user_id) = user_id else {
            return Ok(0);
        };
        Ok(self
            .db
            .query_scalar_i64(
                "SELECT COUNT(*) FROM orders WHERE coupon_code = ? AND user_id = ? \
                 AND cancelled_at IS NULL",
                params![normalize_code(code), user_id.as_str()],
            )
            .await?)
    }

    /// Look up `code` and check it can be redeemed against `subtotal`.
    pub async fn redeemable(
        &self,
        code: &str,
        subtotal: &Money,
        user_id: Option<&UserId>,
        now: i64,
    ) -> Result<Coupon, CommerceError> {
        let coupon = self.get_by_code(code).await?;
        let uses = self.customer_uses(&coupon.code, user_id).await?;
        coupon
            .validate(now, subtotal, uses)
            .map_err(CommerceError::CouponRejected)?;
        debug!(code = %coupon.code, uses, "coupon redeemable");
        Ok(coupon)
    }
}

fn kind_columns(kind: &CouponKind) -> (Option<u32>, Option<i64>) {
    match kind {
        CouponKind::Percentage { percent } => (Some(*percent), None),
        CouponKind::Fixed { amount } => (None, Some(amount.amount_cents)),
        CouponKind::FreeShipping => (None, None),
    }
}

fn code_taken(err: DbError, code: &str) -> CommerceError {
    if err.is_conflict() {
        CommerceError::Conflict(format!("coupon code {} is already in use", code))
    } else {
        err.into()
    }
}
