//! Cart persistence.
//!
//! Carts are stored by owner key. Loading a cart re-reads every line against
//! the live catalog: prices are current and lines whose product is no longer
//! on sale are dropped.

use serde::{Deserialize, Serialize};
use storeline_db::{params, Db, Statement};
use tracing::{debug, info, warn};

use crate::cart::{price_cart, Cart, CartItem, CartOwner, CartSummary};
use crate::catalog::{ProductStatus, ProductVariant};
use crate::checkout::ShopSettings;
use crate::error::CommerceError;
use crate::ids::{CartId, CartItemId, ProductId, UserId, VariantId};
use crate::money::Money;
use crate::promotion::CouponRejection;
use crate::current_timestamp;

use super::{placeholders, CouponRepository, ProductRepository};

/// A cart with its pricing, as shown to the customer.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub cart: Cart,
    pub summary: CartSummary,
}

#[derive(Debug, Deserialize)]
struct CartRow {
    id: CartId,
    coupon_code: Option<String>,
    created_at: i64,
    updated_at: i64,
}

#[derive(Debug, Deserialize)]
struct CartLineRow {
    id: CartItemId,
    variant_id: VariantId,
    product_id: ProductId,
    product_name: String,
    product_slug: String,
    status: String,
    sku: String,
    size: Option<String>,
    color: Option<String>,
    material: Option<String>,
    price_cents: i64,
    inventory: i64,
    quantity: i64,
}

/// Cart persistence.
#[derive(Clone, Debug)]
pub struct CartRepository {
    db: Db,
    settings: ShopSettings,
    products: ProductRepository,
    coupons: CouponRepository,
}

impl CartRepository {
    pub fn new(
        db: Db,
        settings: ShopSettings,
        products: ProductRepository,
        coupons: CouponRepository,
    ) -> Self {
        Self {
            db,
            settings,
            products,
            coupons,
        }
    }

    /// Load the owner's cart, or an empty unsaved cart if there is none.
    pub async fn load(&self, owner: &CartOwner) -> Result<Cart, CommerceError> {
        let row: Option<CartRow> = self
            .db
            .query_optional(
                "SELECT id, coupon_code, created_at, updated_at FROM carts WHERE owner_key = ?",
                params![owner.key()],
            )
            .await?;
        let Some(row) = row else {
            return Ok(Cart::new(owner.clone(), self.settings.currency));
        };

        let lines: Vec<CartLineRow> = self
            .db
            .query_as(
                "SELECT ci.id, ci.variant_id, v.product_id, p.name AS product_name, \
                 p.slug AS product_slug, p.status, v.sku, v.size, v.color, v.material, \
                 v.price_cents, v.inventory, ci.quantity \
                 FROM cart_items ci \
                 JOIN product_variants v ON v.id = ci.variant_id \
                 JOIN products p ON p.id = v.product_id \
                 WHERE ci.cart_id = ? ORDER BY ci.created_at, ci.id",
                params![row.id.as_str()],
            )
            .await?;

        let currency = self.settings.currency;
        let mut items = Vec::with_capacity(lines.len());
        let mut stale = Vec::new();
        for line in lines {
            if ProductStatus::parse(&line.status) != Some(ProductStatus::Active) {
                stale.push(line.id);
                continue;
            }
            let mut variant = ProductVariant::new(
                line.product_id.clone(),
                line.sku.clone(),
                Money::new(line.price_cents, currency),
            );
            variant.id = line.variant_id.clone();
            variant.size = line.size;
            variant.color = line.color;
            variant.material = line.material;
            variant.inventory = line.inventory;

            items.push(CartItem {
                id: line.id,
                variant_id: line.variant_id,
                product_id: line.product_id,
                product_name: line.product_name,
                product_slug: line.product_slug,
                variant_title: variant.title(),
                sku: line.sku,
                unit_price: variant.price,
                quantity: line.quantity,
            });
        }

        if !stale.is_empty() {
            let params: Vec<storeline_db::Value> =
                stale.iter().map(|id| id.as_str().into()).collect();
            self.db
                .execute(
                    &format!("DELETE FROM cart_items WHERE id IN ({})", placeholders(stale.len())),
                    &params,
                )
                .await?;
            warn!(cart = %row.id, dropped = stale.len(), "unavailable cart lines removed");
        }

        Ok(Cart {
            id: row.id,
            owner: owner.clone(),
            items,
            coupon_code: row.coupon_code,
            currency,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    /// Price the owner's cart.
    pub async fn view(
        &self,
        owner: &CartOwner,
        user_id: Option<&UserId>,
    ) -> Result<CartView, CommerceError> {
        let cart = self.load(owner).await?;
        let summary = self.summarize(&cart, user_id).await?;
        Ok(CartView { cart, summary })
    }

    /// Price an already loaded cart against its stored coupon.
    pub async fn summarize(
        &self,
        cart: &Cart,
        user_id: Option<&UserId>,
    ) -> Result<CartSummary, CommerceError> {
        let now = current_timestamp();
        let Some(code) = cart.coupon_code.as_deref() else {
            return price_cart(cart, None, &self.settings, now, 0);
        };

        match self.coupons.find_by_code(code).await? {
            Some(coupon) => {
                let uses = self.coupons.customer_uses(&coupon.code, user_id).await?;
                price_cart(cart, Some(&coupon), &self.settings, now, uses)
            }
            None => {
                // The coupon was deleted after it was applied.
                let mut summary = price_cart(cart, None, &self.settings, now, 0)?;
                if !cart.is_empty() {
                    summary.coupon_rejection = Some(CouponRejection::Inactive);
                }
                Ok(summary)
            }
        }
    }

    /// Add a variant to the owner's cart.
    pub async fn add_item(
        &self,
        owner: &CartOwner,
        variant_id: &VariantId,
        quantity: i64,
    ) -> Result<Cart, CommerceError> {
        let (product, variant) = self.products.get_variant(variant_id).await?;
        let mut cart = self.load(owner).await?;
        let item_id = cart.add_item(&product, &variant, quantity)?;

        let cart_id = self.ensure_cart(owner).await?;
        cart.id = cart_id;
        let item = cart
            .get_item(&item_id)
            .ok_or_else(|| CommerceError::ItemNotInCart(item_id.to_string()))?;
        self.db
            .transaction(vec![
                upsert_item(&cart.id, item),
                touch_cart(&cart.id, cart.updated_at),
            ])
            .await?;

        debug!(cart = %cart.id, sku = %variant.sku, quantity = item.quantity, "cart item added");
        Ok(cart)
    }

    /// Change a line's quantity. Zero or less removes the line.
    pub async fn update_item(
        &self,
        owner: &CartOwner,
        item_id: &CartItemId,
        quantity: i64,
    ) -> Result<Cart, CommerceError> {
        let mut cart = self.load(owner).await?;
        let variant_id = cart
            .get_item(item_id)
            .map(|i| i.variant_id.clone())
            .ok_or_else(|| CommerceError::ItemNotInCart(item_id.to_string()))?;

        if quantity <= 0 {
            cart.remove_item(item_id);
            self.delete_item(&cart, item_id).await?;
            return Ok(cart);
        }

        let (_, variant) = self.products.get_variant(&variant_id).await?;
        cart.set_quantity(item_id, quantity, &variant)?;
        self.db
            .transaction(vec![
                Statement::new(
                    "UPDATE cart_items SET quantity = ? WHERE id = ? AND cart_id = ?",
                    vec![quantity.into(), item_id.as_str().into(), cart.id.as_str().into()],
                )
                .guarded(format!("cart item {} was removed", item_id)),
                touch_cart(&cart.id, cart.updated_at),
            ])
            .await?;
        Ok(cart)
    }

    pub async fn remove_item(
        &self,
        owner: &CartOwner,
        item_id: &CartItemId,
    ) -> Result<Cart, CommerceError> {
        let mut cart = self.load(owner).await?;
        if !cart.remove_item(item_id) {
            return Err(CommerceError::ItemNotInCart(item_id.to_string()));
        }
        self.delete_item(&cart, item_id).await?;
        Ok(cart)
    }

    /// Empty the cart and drop its coupon.
    pub async fn clear(&self, owner: &CartOwner) -> Result<(), CommerceError> {
        self.db
            .execute("DELETE FROM carts WHERE owner_key = ?", params![owner.key()])
            .await?;
        debug!(owner = %owner.key(), "cart cleared");
        Ok(())
    }

    /// Attach a coupon after checking it against the current cart.
    ///
    /// Replaces any coupon already on the cart.
    pub async fn apply_coupon(
        &self,
        owner: &CartOwner,
        code: &str,
        user_id: Option<&UserId>,
    ) -> Result<CartView, CommerceError> {
        let cart = self.load(owner).await?;
        if cart.is_empty() {
            return Err(CommerceError::EmptyCart);
        }
        let coupon = self
            .coupons
            .redeemable(code, &cart.subtotal()?, user_id, current_timestamp())
            .await?;

        let cart_id = self.ensure_cart(owner).await?;
        self.db
            .execute(
                "UPDATE carts SET coupon_code = ?, updated_at = ? WHERE id = ?",
                params![&coupon.code, current_timestamp(), cart_id.as_str()],
            )
            .await?;
        info!(cart = %cart_id, code = %coupon.code, "coupon applied");
        self.view(owner, user_id).await
    }

    pub async fn remove_coupon(
        &self,
        owner: &CartOwner,
        user_id: Option<&UserId>,
    ) -> Result<CartView, CommerceError> {
        self.db
            .execute(
                "UPDATE carts SET coupon_code = NULL, updated_at = ? WHERE owner_key = ?",
                params![current_timestamp(), owner.key()],
            )
            .await?;
        self.view(owner, user_id).await
    }

    /// Fold a guest cart into a customer's cart at sign-in.
    ///
    /// The guest cart is deleted. Returns the merged cart.
    pub async fn merge_guest(
        &self,
        guest_token: &str,
        user_id: &UserId,
    ) -> Result<Cart, CommerceError> {
        let guest_owner = CartOwner::Guest(guest_token.to_string());
        let user_owner = CartOwner::User(user_id.clone());

        let guest = self.load(&guest_owner).await?;
        let mut cart = self.load(&user_owner).await?;
        if guest.is_empty() && guest.coupon_code.is_none() {
            return Ok(cart);
        }

        let merged_lines = guest.items.len();
        cart.id = self.ensure_cart(&user_owner).await?;
        cart.merge(guest);

        let mut statements = vec![Statement::new(
            "DELETE FROM carts WHERE owner_key = ?",
            vec![guest_owner.key().into()],
        )];
        statements.extend(cart.items.iter().map(|item| upsert_item(&cart.id, item)));
        statements.push(Statement::new(
            "UPDATE carts SET coupon_code = ?, updated_at = ? WHERE id = ?",
            vec![
                cart.coupon_code.clone().into(),
                cart.updated_at.into(),
                cart.id.as_str().into(),
            ],
        ));
        self.db.transaction(statements).await?;

        info!(user = %user_id, lines = merged_lines, "guest cart merged");
        Ok(cart)
    }

    /// Create the owner's cart row if missing and return its ID.
    async fn ensure_cart(&self, owner: &CartOwner) -> Result<CartId, CommerceError> {
        #[derive(Deserialize)]
        struct IdRow {
            id: CartId,
        }

        let now = current_timestamp();
        self.db
            .execute(
                "INSERT INTO carts (id, owner_key, coupon_code, created_at, updated_at) \
                 VALUES (?, ?, NULL, ?, ?) ON CONFLICT(owner_key) DO NOTHING",
                params![CartId::generate().as_str(), owner.key(), now, now],
            )
            .await?;
        let row: IdRow = self
            .db
            .query_one("SELECT id FROM carts WHERE owner_key = ?", params![owner.key()])
            .await?;
        Ok(row.id)
    }

    async fn delete_item(&self, cart: &Cart, item_id: &CartItemId) -> Result<(), CommerceError> {
        self.db
            .transaction(vec![
                Statement::new(
                    "DELETE FROM cart_items WHERE id = ? AND cart_id = ?",
                    vec![item_id.as_str().into(), cart.id.as_str().into()],
                ),
                touch_cart(&cart.id, cart.updated_at),
            ])
            .await?;
        Ok(())
    }
}

/// Write a line with its absolute quantity, keyed by variant.
fn upsert_item(cart_id: &CartId, item: &CartItem) -> Statement {
    Statement::new(
        "INSERT INTO cart_items (id, cart_id, variant_id, quantity, created_at) \
         VALUES (?, ?, ?, ?, ?) \
         ON CONFLICT(cart_id, variant_id) DO UPDATE SET quantity = excluded.quantity",
        vec![
            item.id.as_str().into(),
            cart_id.as_str().into(),
            item.variant_id.as_str().into(),
            item.quantity.into(),
            current_timestamp().into(),
        ],
    )
}

fn touch_cart(cart_id: &CartId, now: i64) -> Statement {
    Statement::new(
        "UPDATE carts SET updated_at = ? WHERE id = ?",
        vec![now.into(), cart_id.as_str().into()],
    )
}

