//! Storefront: catalog browsing, the cart and checkout.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use storeline_commerce::catalog::{Category, CategoryTree, Product, ProductStatus, Tag};
use storeline_commerce::checkout::{CheckoutInput, OrderView};
use storeline_commerce::ids::{CartItemId, VariantId};
use storeline_commerce::search::{Page, ProductQuery};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery, Shopper};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/{slug}", get(get_product))
        .route("/categories", get(category_tree))
        .route("/categories/{*path}", get(category_products))
        .route("/tags", get(list_tags))
        .route("/cart", get(view_cart).delete(clear_cart))
        .route("/cart/items", post(add_item))
        .route("/cart/items/{id}", patch(update_item).delete(remove_item))
        .route("/cart/coupon", post(apply_coupon).delete(remove_coupon))
        .route("/checkout", post(checkout))
}

// ── Catalog ──

/// GET /api/products
///
/// Only active products are listed, whatever `status` the client asks for.
async fn list_products(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> ApiResult<Json<Page<Product>>> {
    let page = state.store.products.list(&query.storefront()).await?;
    Ok(Json(page))
}

/// GET /api/products/{slug}
async fn get_product(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> ApiResult<Json<Product>> {
    let product = state.store.products.get_by_slug(&slug).await?;
    if product.status != ProductStatus::Active {
        return Err(ApiError::NotFound(format!("Product not found: {}", slug)));
    }
    Ok(Json(product))
}

/// GET /api/categories
async fn category_tree(State(state): State<AppState>) -> ApiResult<Json<CategoryTree>> {
    Ok(Json(state.store.categories.tree().await?))
}

#[derive(Debug, Serialize)]
struct CategoryPage {
    category: Category,
    breadcrumb: String,
    products: Page<Product>,
}

/// GET /api/categories/{*path}
///
/// A category by slug path, with the active products in it and its
/// descendants.
async fn category_products(
    State(state): State<AppState>,
    ApiPath(path): ApiPath<String>,
    ApiQuery(mut query): ApiQuery<ProductQuery>,
) -> ApiResult<Json<CategoryPage>> {
    let category = state.store.categories.get_by_path(&path).await?;
    let breadcrumb = state.store.categories.breadcrumb(&category.id).await?;

    query.category_id = None;
    query.category_path = Some(category.path.clone());
    let products = state.store.products.list(&query.storefront()).await?;

    Ok(Json(CategoryPage {
        category,
        breadcrumb,
        products,
    }))
}

/// GET /api/tags
async fn list_tags(State(state): State<AppState>) -> ApiResult<Json<Vec<Tag>>> {
    Ok(Json(state.store.tags.list().await?))
}

// ── Cart ──

async fn view_cart(State(state): State<AppState>, shopper: Shopper) -> ApiResult<Response> {
    let view = state
        .store
        .carts
        .view(&shopper.owner, shopper.user_id())
        .await?;
    Ok(shopper.respond(view))
}

async fn clear_cart(State(state): State<AppState>, shopper: Shopper) -> ApiResult<StatusCode> {
    state.store.carts.clear(&shopper.owner).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct AddItem {
    variant_id: VariantId,
    #[serde(default = "one")]
    quantity: i64,
}

fn one() -> i64 {
    1
}

/// POST /api/cart/items
///
/// Adding a variant already in the cart increases its quantity.
async fn add_item(
    State(state): State<AppState>,
    shopper: Shopper,
    ApiJson(body): ApiJson<AddItem>,
) -> ApiResult<Response> {
    state
        .store
        .carts
        .add_item(&shopper.owner, &body.variant_id, body.quantity)
        .await?;
    let view = state
        .store
        .carts
        .view(&shopper.owner, shopper.user_id())
        .await?;
    Ok(shopper.respond(view))
}

#[derive(Debug, Deserialize)]
struct SetQuantity {
    quantity: i64,
}

/// PATCH /api/cart/items/{id}
///
/// A quantity of zero removes the line.
async fn update_item(
    State(state): State<AppState>,
    shopper: Shopper,
    ApiPath(id): ApiPath<CartItemId>,
    ApiJson(body): ApiJson<SetQuantity>,
) -> ApiResult<Response> {
    state
        .store
        .carts
        .update_item(&shopper.owner, &id, body.quantity)
        .await?;
    let view = state
        .store
        .carts
        .view(&shopper.owner, shopper.user_id())
        .await?;
    Ok(shopper.respond(view))
}

async fn remove_item(
    State(state): State<AppState>,
    shopper: Shopper,
    ApiPath(id): ApiPath<CartItemId>,
) -> ApiResult<Response> {
    state.store.carts.remove_item(&shopper.owner, &id).await?;
    let view = state
        .store
        .carts
        .view(&shopper.owner, shopper.user_id())
        .await?;
    Ok(shopper.respond(view))
}

#[derive(Debug, Deserialize)]
struct CouponCode {
    code: String,
}

async fn apply_coupon(
    State(state): State<AppState>,
    shopper: Shopper,
    ApiJson(body): ApiJson<CouponCode>,
) -> ApiResult<Response> {
    let view = state
        .store
        .carts
        .apply_coupon(&shopper.owner, &body.code, shopper.user_id())
        .await?;
    Ok(shopper.respond(view))
}

async fn remove_coupon(State(state): State<AppState>, shopper: Shopper) -> ApiResult<Response> {
    let view = state
        .store
        .carts
        .remove_coupon(&shopper.owner, shopper.user_id())
        .await?;
    Ok(shopper.respond(view))
}

// ── Checkout ──

/// POST /api/checkout
///
/// Turns the shopper's cart into a pending order. Guests must give an email.
async fn checkout(
    State(state): State<AppState>,
    shopper: Shopper,
    ApiJson(input): ApiJson<CheckoutInput>,
) -> ApiResult<impl IntoResponse> {
    let order = state
        .store
        .orders
        .place_order(&shopper.owner, shopper.customer(), input)
        .await?;
    info!(order = %order.order_number, guest = shopper.auth.is_none(), "checkout completed");
    Ok((StatusCode::CREATED, Json(OrderView::from(order))))
}
