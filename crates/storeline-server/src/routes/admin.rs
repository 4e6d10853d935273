//! Admin dashboard API.
//!
//! Every route needs a [`Staff`] session; user management needs [`Admin`].

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use storeline_auth::{Role, User};
use storeline_commerce::catalog::{Category, CategoryTree, Product, ProductInput, Tag};
use storeline_commerce::checkout::OrderView;
use storeline_commerce::ids::{CategoryId, CouponId, OrderId, ProductId, TagId, UserId};
use storeline_commerce::money::Money;
use storeline_commerce::promotion::{Coupon, CouponDiscount, CouponInput};
use storeline_commerce::repository::{
    CategoryInput, CategoryUpdate, CouponListing, DashboardStats,
};
use storeline_commerce::search::{OrderQuery, Page, ProductQuery};
use storeline_commerce::current_timestamp;
use tracing::info;

use crate::error::ApiResult;
use crate::extract::{Admin, ApiJson, ApiPath, ApiQuery, Staff};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        // Categories
        .route("/categories", get(category_tree).post(create_category))
        .route(
            "/categories/{id}",
            patch(update_category).delete(delete_category),
        )
        .route("/categories/{id}/move", post(move_category))
        // Products
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        // Tags
        .route("/tags", get(list_tags).post(create_tag))
        .route("/tags/{id}", patch(rename_tag).delete(delete_tag))
        // Orders
        .route("/orders", get(list_orders))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/pay", post(pay_order))
        .route("/orders/{id}/ship", post(ship_order))
        .route("/orders/{id}/deliver", post(deliver_order))
        .route("/orders/{id}/cancel", post(cancel_order))
        // Coupons
        .route("/coupons", get(list_coupons).post(create_coupon))
        .route("/coupons/validate", post(validate_coupon))
        .route(
            "/coupons/{id}",
            get(get_coupon).put(update_coupon).delete(delete_coupon),
        )
        .route("/coupons/{id}/active", patch(set_coupon_active))
        // Users
        .route("/users", get(list_users))
        .route("/users/{id}", axum::routing::delete(delete_user))
        .route("/users/{id}/role", patch(set_user_role))
}

// ── Dashboard ──

async fn dashboard(State(state): State<AppState>, _: Staff) -> ApiResult<Json<DashboardStats>> {
    Ok(Json(state.store.dashboard.stats().await?))
}

// ── Categories ──

async fn category_tree(State(state): State<AppState>, _: Staff) -> ApiResult<Json<CategoryTree>> {
    Ok(Json(state.store.categories.tree().await?))
}

async fn create_category(
    State(state): State<AppState>,
    _: Staff,
    ApiJson(input): ApiJson<CategoryInput>,
) -> ApiResult<impl IntoResponse> {
    let category = state.store.categories.create(input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn update_category(
    State(state): State<AppState>,
    _: Staff,
    ApiPath(id): ApiPath<CategoryId>,
    ApiJson(update): ApiJson<CategoryUpdate>,
) -> ApiResult<Json<Category>> {
    Ok(Json(state.store.categories.update(&id, update).await?))
}

#[derive(Debug, Deserialize)]
struct MoveCategory {
    /// New parent; absent or null moves the category to the root.
    #[serde(default)]
    parent_id: Option<CategoryId>,
}

async fn move_category(
    State(state): State<AppState>,
    _: Staff,
    ApiPath(id): ApiPath<CategoryId>,
    ApiJson(body): ApiJson<MoveCategory>,
) -> ApiResult<Json<Category>> {
    let category = state
        .store
        .categories
        .move_to(&id, body.parent_id.as_ref())
        .await?;
    Ok(Json(category))
}

async fn delete_category(
    State(state): State<AppState>,
    _: Staff,
    ApiPath(id): ApiPath<CategoryId>,
) -> ApiResult<StatusCode> {
    state.store.categories.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Products ──

/// GET /admin/api/products
///
/// Unlike the storefront listing, drafts and archived products are included
/// unless `status` filters them out.
async fn list_products(
    State(state): State<AppState>,
    _: Staff,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> ApiResult<Json<Page<Product>>> {
    Ok(Json(state.store.products.list(&query).await?))
}

async fn get_product(
    State(state): State<AppState>,
    _: Staff,
    ApiPath(id): ApiPath<ProductId>,
) -> ApiResult<Json<Product>> {
    Ok(Json(state.store.products.get(&id).await?))
}

async fn create_product(
    State(state): State<AppState>,
    _: Staff,
    ApiJson(input): ApiJson<ProductInput>,
) -> ApiResult<impl IntoResponse> {
    let product = state.store.products.create(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /admin/api/products/{id}
///
/// Replaces the product, its variants and its tags. Variants sent with an
/// `id` are updated, others created; existing variants left out are deleted.
async fn update_product(
    State(state): State<AppState>,
    _: Staff,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(input): ApiJson<ProductInput>,
) -> ApiResult<Json<Product>> {
    Ok(Json(state.store.products.update(&id, input).await?))
}

async fn delete_product(
    State(state): State<AppState>,
    _: Staff,
    ApiPath(id): ApiPath<ProductId>,
) -> ApiResult<StatusCode> {
    state.store.products.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Tags ──

#[derive(Debug, Deserialize)]
struct TagName {
    name: String,
}

async fn list_tags(State(state): State<AppState>, _: Staff) -> ApiResult<Json<Vec<Tag>>> {
    Ok(Json(state.store.tags.list().await?))
}

async fn create_tag(
    State(state): State<AppState>,
    _: Staff,
    ApiJson(body): ApiJson<TagName>,
) -> ApiResult<impl IntoResponse> {
    let tag = state.store.tags.create(&body.name).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

async fn rename_tag(
    State(state): State<AppState>,
    _: Staff,
    ApiPath(id): ApiPath<TagId>,
    ApiJson(body): ApiJson<TagName>,
) -> ApiResult<Json<Tag>> {
    Ok(Json(state.store.tags.rename(&id, &body.name).await?))
}

async fn delete_tag(
    State(state): State<AppState>,
    _: Staff,
    ApiPath(id): ApiPath<TagId>,
) -> ApiResult<StatusCode> {
    state.store.tags.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Orders ──

async fn list_orders(
    State(state): State<AppState>,
    _: Staff,
    ApiQuery(query): ApiQuery<OrderQuery>,
) -> ApiResult<Json<Page<OrderView>>> {
    let page = state.store.orders.list(&query).await?;
    Ok(Json(page.map(OrderView::from)))
}

async fn get_order(
    State(state): State<AppState>,
    _: Staff,
    ApiPath(id): ApiPath<OrderId>,
) -> ApiResult<Json<OrderView>> {
    Ok(Json(state.store.orders.get(&id).await?.into()))
}

async fn pay_order(
    State(state): State<AppState>,
    _: Staff,
    ApiPath(id): ApiPath<OrderId>,
) -> ApiResult<Json<OrderView>> {
    Ok(Json(state.store.orders.mark_paid(&id).await?.into()))
}

async fn ship_order(
    State(state): State<AppState>,
    _: Staff,
    ApiPath(id): ApiPath<OrderId>,
) -> ApiResult<Json<OrderView>> {
    Ok(Json(state.store.orders.mark_shipped(&id).await?.into()))
}

async fn deliver_order(
    State(state): State<AppState>,
    _: Staff,
    ApiPath(id): ApiPath<OrderId>,
) -> ApiResult<Json<OrderView>> {
    Ok(Json(state.store.orders.mark_delivered(&id).await?.into()))
}

/// POST /admin/api/orders/{id}/cancel
///
/// Restocks the items and gives the coupon use back.
async fn cancel_order(
    State(state): State<AppState>,
    _: Staff,
    ApiPath(id): ApiPath<OrderId>,
) -> ApiResult<Json<OrderView>> {
    Ok(Json(state.store.orders.cancel(&id).await?.into()))
}

// ── Coupons ──

async fn list_coupons(
    State(state): State<AppState>,
    _: Staff,
) -> ApiResult<Json<Vec<CouponListing>>> {
    let coupons = state
        .store
        .coupons
        .list_with_status(current_timestamp())
        .await?;
    Ok(Json(coupons))
}

async fn get_coupon(
    State(state): State<AppState>,
    _: Staff,
    ApiPath(id): ApiPath<CouponId>,
) -> ApiResult<Json<Coupon>> {
    Ok(Json(state.store.coupons.get(&id).await?))
}

async fn create_coupon(
    State(state): State<AppState>,
    _: Staff,
    ApiJson(input): ApiJson<CouponInput>,
) -> ApiResult<impl IntoResponse> {
    let coupon = state.store.coupons.create(input).await?;
    Ok((StatusCode::CREATED, Json(coupon)))
}

async fn update_coupon(
    State(state): State<AppState>,
    _: Staff,
    ApiPath(id): ApiPath<CouponId>,
    ApiJson(input): ApiJson<CouponInput>,
) -> ApiResult<Json<Coupon>> {
    Ok(Json(state.store.coupons.update(&id, input).await?))
}

#[derive(Debug, Deserialize)]
struct ActiveFlag {
    active: bool,
}

async fn set_coupon_active(
    State(state): State<AppState>,
    _: Staff,
    ApiPath(id): ApiPath<CouponId>,
    ApiJson(body): ApiJson<ActiveFlag>,
) -> ApiResult<Json<Coupon>> {
    Ok(Json(state.store.coupons.set_active(&id, body.active).await?))
}

async fn delete_coupon(
    State(state): State<AppState>,
    _: Staff,
    ApiPath(id): ApiPath<CouponId>,
) -> ApiResult<StatusCode> {
    state.store.coupons.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct ValidateCoupon {
    code: String,
    subtotal_cents: i64,
    /// Customer to check per-customer limits for.
    #[serde(default)]
    user_id: Option<UserId>,
}

#[derive(Debug, Serialize)]
struct CouponPreview {
    coupon: Coupon,
    discount: CouponDiscount,
}

/// POST /admin/api/coupons/validate
///
/// Check a code against a hypothetical subtotal, as checkout would.
async fn validate_coupon(
    State(state): State<AppState>,
    _: Staff,
    ApiJson(body): ApiJson<ValidateCoupon>,
) -> ApiResult<Json<CouponPreview>> {
    let subtotal = Money::new(body.subtotal_cents, state.store.settings.currency);
    let coupon = state
        .store
        .coupons
        .redeemable(
            &body.code,
            &subtotal,
            body.user_id.as_ref(),
            current_timestamp(),
        )
        .await?;
    let shipping = state.store.settings.shipping_for(&subtotal);
    let discount = coupon.discount(&subtotal, &shipping);
    Ok(Json(CouponPreview { coupon, discount }))
}

// ── Users ──

async fn list_users(State(state): State<AppState>, _: Admin) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.users.list().await?))
}

#[derive(Debug, Deserialize)]
struct RoleChange {
    role: Role,
}

/// PATCH /admin/api/users/{id}/role
///
/// The user's sessions end so the new role applies at next sign-in.
async fn set_user_role(
    State(state): State<AppState>,
    Admin(admin): Admin,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(body): ApiJson<RoleChange>,
) -> ApiResult<Json<User>> {
    let user = state
        .users
        .set_role(&admin.user.id, &id, body.role)
        .await?;
    state.sessions.end_all(&id)?;
    Ok(Json(user))
}

async fn delete_user(
    State(state): State<AppState>,
    Admin(admin): Admin,
    ApiPath(id): ApiPath<UserId>,
) -> ApiResult<StatusCode> {
    state.users.delete(&admin.user.id, &id).await?;
    let ended = state.sessions.end_all(&id)?;
    info!(user_id = %id, sessions = ended, "deleted user signed out");
    Ok(StatusCode::NO_CONTENT)
}
