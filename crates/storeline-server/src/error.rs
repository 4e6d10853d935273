//! API errors and their HTTP mapping.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use storeline_auth::AuthError;
use storeline_commerce::CommerceError;
use thiserror::Error;
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

/// An error returned to API clients as `{"error": {"code", "message"}}`.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed request or invalid field values.
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Unique value taken, or state changed under the request.
    #[error("{0}")]
    Conflict(String),

    /// Well-formed request refused by a business rule.
    #[error("{message}")]
    Unprocessable { code: &'static str, message: String },

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::Unprocessable { code, .. } => code,
            ApiError::Internal(_) => "internal",
        }
    }

    fn unprocessable(code: &'static str, message: impl ToString) -> Self {
        ApiError::Unprocessable {
            code,
            message: message.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": message,
            }
        }));
        (status, body).into_response()
    }
}

impl From<CommerceError> for ApiError {
    fn from(e: CommerceError) -> Self {
        match e {
            e if e.is_not_found() => ApiError::NotFound(e.to_string()),
            CommerceError::ValidationError(msg) => ApiError::BadRequest(msg),
            CommerceError::InvalidQuantity(_) | CommerceError::QuantityExceedsLimit(..) => {
                ApiError::BadRequest(e.to_string())
            }
            CommerceError::Conflict(_) => ApiError::Conflict(e.to_string()),
            CommerceError::CategoryHasChildren(_) => {
                ApiError::unprocessable("category_has_children", e)
            }
            CommerceError::InvalidCategoryMove(_) => {
                ApiError::unprocessable("invalid_category_move", e)
            }
            CommerceError::ProductUnavailable(_) => {
                ApiError::unprocessable("product_unavailable", e)
            }
            CommerceError::InsufficientInventory { .. } => {
                ApiError::unprocessable("insufficient_inventory", e)
            }
            CommerceError::EmptyCart => ApiError::unprocessable("empty_cart", e),
            CommerceError::CouponRejected(rejection) => ApiError::Unprocessable {
                code: rejection.code(),
                message: rejection.to_string(),
            },
            CommerceError::InvalidOrderTransition { .. } => {
                ApiError::unprocessable("invalid_order_transition", e)
            }
            CommerceError::CurrencyMismatch { .. } | CommerceError::Overflow => {
                ApiError::unprocessable("pricing_error", e)
            }
            CommerceError::DatabaseError(_) | CommerceError::SerializationError(_) => {
                ApiError::Internal(e.to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => ApiError::Unauthorized(e.to_string()),
            AuthError::Unauthenticated => ApiError::Unauthorized(e.to_string()),
            AuthError::InsufficientPermissions | AuthError::SelfModification(_) => {
                ApiError::Forbidden(e.to_string())
            }
            AuthError::UserNotFound(_) => ApiError::NotFound(e.to_string()),
            AuthError::UserAlreadyExists(_) => ApiError::Conflict(e.to_string()),
            AuthError::WeakPassword(_) | AuthError::Validation(_) => {
                ApiError::BadRequest(e.to_string())
            }
            AuthError::Cache(_) | AuthError::Database(_) | AuthError::Internal(_) => {
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
