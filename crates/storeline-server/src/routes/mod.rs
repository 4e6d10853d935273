//! HTTP routes.
//!
//! - `/api`: storefront and customer account
//! - `/admin/api`: admin dashboard
//! - `/healthz`: liveness and database check

mod account;
mod admin;
mod storefront;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method, Uri};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use storeline_db::params;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::extract::CART_SESSION_HEADER;
use crate::state::AppState;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let config = &state.config.server;
    let mut app = Router::new()
        .route("/healthz", get(healthz))
        .nest("/api", storefront::router().merge(account::router()))
        .nest("/admin/api", admin::router())
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(config.body_limit_bytes))
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = cors_layer(&config.cors_origins) {
        app = app.layer(cors);
    }
    app.with_state(state)
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    if origins.is_empty() {
        return None;
    }
    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
            ])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE, CART_SESSION_HEADER])
            .expose_headers([CART_SESSION_HEADER]),
    )
}

async fn healthz(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    state
        .store
        .db
        .query_scalar_i64("SELECT 1", params![])
        .await
        .map_err(|e| ApiError::Internal(format!("database unavailable: {}", e)))?;
    Ok(Json(json!({ "status": "ok" })))
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("no route for {}", uri.path()))
}
