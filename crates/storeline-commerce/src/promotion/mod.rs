//! Coupons and discount rules.

mod coupon;

pub use coupon::{
    normalize_code, Coupon, CouponDiscount, CouponInput, CouponKind, CouponRejection,
    CouponStatus,
};
