//! Sign-up, sign-in and the customer account dashboard.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use storeline_auth::{SessionId, User};
use storeline_commerce::checkout::OrderView;
use storeline_commerce::ids::OrderId;

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, Authenticated, GuestCart};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/account", get(account).patch(update_account))
        .route("/account/password", post(change_password))
        .route("/account/orders", get(my_orders))
        .route("/account/orders/{id}", get(my_order))
        .route("/account/orders/{id}/cancel", post(cancel_my_order))
}

/// A fresh session token and the signed-in user.
#[derive(Debug, Serialize)]
struct SignedIn {
    token: SessionId,
    user: User,
}

#[derive(Debug, Deserialize)]
struct Register {
    email: String,
    password: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Login {
    email: String,
    password: String,
}

/// Start a session, folding in the guest cart the visitor shopped with.
async fn sign_in(state: &AppState, user: User, guest: GuestCart) -> ApiResult<SignedIn> {
    let token = state.sessions.start(&user)?;
    if let Some(guest_token) = guest.0 {
        state.store.carts.merge_guest(&guest_token, &user.id).await?;
    }
    Ok(SignedIn { token, user })
}

/// POST /api/auth/register
async fn register(
    State(state): State<AppState>,
    guest: GuestCart,
    ApiJson(body): ApiJson<Register>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .users
        .register(&body.email, &body.password, body.name)
        .await?;
    let signed_in = sign_in(&state, user, guest).await?;
    Ok((StatusCode::CREATED, Json(signed_in)))
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    guest: GuestCart,
    ApiJson(body): ApiJson<Login>,
) -> ApiResult<Json<SignedIn>> {
    let user = state.users.authenticate(&body.email, &body.password).await?;
    Ok(Json(sign_in(&state, user, guest).await?))
}

/// POST /api/auth/logout
async fn logout(State(state): State<AppState>, auth: Authenticated) -> ApiResult<StatusCode> {
    state.sessions.end(&auth.token)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/account
async fn account(State(state): State<AppState>, auth: Authenticated) -> ApiResult<Json<User>> {
    Ok(Json(state.users.get(&auth.user.id).await?))
}

#[derive(Debug, Deserialize)]
struct ProfileUpdate {
    #[serde(default)]
    name: Option<String>,
}

/// PATCH /api/account
async fn update_account(
    State(state): State<AppState>,
    auth: Authenticated,
    ApiJson(body): ApiJson<ProfileUpdate>,
) -> ApiResult<Json<User>> {
    let user = state.users.update_profile(&auth.user.id, body.name).await?;
    state.sessions.refresh(&auth.token, &user)?;
    Ok(Json(user))
}

#[derive(Debug, Deserialize)]
struct PasswordChange {
    current_password: String,
    new_password: String,
}

/// POST /api/account/password
///
/// Signs out every session of the account and returns a new one.
async fn change_password(
    State(state): State<AppState>,
    auth: Authenticated,
    ApiJson(body): ApiJson<PasswordChange>,
) -> ApiResult<Json<SignedIn>> {
    state
        .users
        .change_password(&auth.user.id, &body.current_password, &body.new_password)
        .await?;
    state.sessions.end_all(&auth.user.id)?;
    let user = state.users.get(&auth.user.id).await?;
    let token = state.sessions.start(&user)?;
    Ok(Json(SignedIn { token, user }))
}

/// GET /api/account/orders
async fn my_orders(
    State(state): State<AppState>,
    auth: Authenticated,
) -> ApiResult<Json<Vec<OrderView>>> {
    let orders = state.store.orders.list_for_user(&auth.user.id).await?;
    Ok(Json(orders.into_iter().map(OrderView::from).collect()))
}

/// GET /api/account/orders/{id}
async fn my_order(
    State(state): State<AppState>,
    auth: Authenticated,
    ApiPath(id): ApiPath<OrderId>,
) -> ApiResult<Json<OrderView>> {
    let order = state.store.orders.get_for_user(&auth.user.id, &id).await?;
    Ok(Json(order.into()))
}

/// POST /api/account/orders/{id}/cancel
async fn cancel_my_order(
    State(state): State<AppState>,
    auth: Authenticated,
    ApiPath(id): ApiPath<OrderId>,
) -> ApiResult<Json<OrderView>> {
    let order = state
        .store
        .orders
        .cancel_for_user(&auth.user.id, &id)
        .await?;
    Ok(Json(order.into()))
}
