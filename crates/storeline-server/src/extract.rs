//! Request extractors: JSON bodies with JSON errors, signed-in users and
//! the shopper a cart belongs to.

use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Serialize;
use storeline_auth::{bearer_token, Role, SessionId, SessionUser};
use storeline_commerce::cart::CartOwner;
use storeline_commerce::ids::UserId;
use storeline_commerce::repository::Customer;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying an anonymous shopper's cart token.
pub const CART_SESSION_HEADER: HeaderName = HeaderName::from_static("x-cart-session");

/// `Json` whose rejections use the API error format.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// `Query` whose rejections use the API error format.
#[derive(Debug, Clone, Default)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// `Path` whose rejections use the API error format.
#[derive(Debug, Clone)]
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// A request with a valid bearer session.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub user: SessionUser,
    pub token: SessionId,
}

impl Authenticated {
    pub fn customer(&self) -> Customer<'_> {
        Customer {
            id: &self.user.id,
            email: &self.user.email,
        }
    }
}

/// Resolve the bearer session, if an `Authorization` header was sent.
///
/// A header with an unknown or expired token is an error, not anonymity.
fn session_from_parts(
    parts: &Parts,
    state: &AppState,
) -> Result<Option<Authenticated>, ApiError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let token = header
        .to_str()
        .ok()
        .and_then(bearer_token)
        .ok_or_else(|| ApiError::Unauthorized("expected a bearer token".to_string()))?;
    let user = state.sessions.current(&token)?;
    Ok(Some(Authenticated { user, token }))
}

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        session_from_parts(parts, state)?
            .ok_or_else(|| ApiError::Unauthorized("authentication required".to_string()))
    }
}

/// A signed-in user with at least [`Role::Staff`].
#[derive(Debug, Clone)]
pub struct Staff(pub Authenticated);

impl FromRequestParts<AppState> for Staff {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = Authenticated::from_request_parts(parts, state).await?;
        auth.user.require(Role::Staff)?;
        Ok(Self(auth))
    }
}

/// A signed-in user with [`Role::Admin`].
#[derive(Debug, Clone)]
pub struct Admin(pub Authenticated);

impl FromRequestParts<AppState> for Admin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = Authenticated::from_request_parts(parts, state).await?;
        auth.user.require(Role::Admin)?;
        Ok(Self(auth))
    }
}

/// Whoever is shopping: a signed-in customer or a guest cart token.
///
/// Guests without a token get a fresh one, returned in the
/// `X-Cart-Session` response header by [`Shopper::respond`].
#[derive(Debug, Clone)]
pub struct Shopper {
    pub auth: Option<Authenticated>,
    pub owner: CartOwner,
    issued_token: Option<String>,
}

impl Shopper {
    pub fn user_id(&self) -> Option<&UserId> {
        self.auth.as_ref().map(|a| &a.user.id)
    }

    pub fn customer(&self) -> Option<Customer<'_>> {
        self.auth.as_ref().map(Authenticated::customer)
    }

    /// JSON response, carrying the guest token when one was issued.
    pub fn respond<T: Serialize>(&self, body: T) -> Response {
        let mut response = Json(body).into_response();
        if let Some(value) = self
            .issued_token
            .as_deref()
            .and_then(|t| HeaderValue::from_str(t).ok())
        {
            response.headers_mut().insert(CART_SESSION_HEADER, value);
        }
        response
    }
}

impl FromRequestParts<AppState> for Shopper {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(auth) = session_from_parts(parts, state)? {
            let owner = CartOwner::User(auth.user.id.clone());
            return Ok(Self {
                auth: Some(auth),
                owner,
                issued_token: None,
            });
        }
        let (token, issued_token) = match guest_token(parts)? {
            Some(token) => (token, None),
            None => {
                let token = new_guest_token();
                (token.clone(), Some(token))
            }
        };
        Ok(Self {
            auth: None,
            owner: CartOwner::Guest(token),
            issued_token,
        })
    }
}

/// The guest cart token sent with a request, validated.
pub fn guest_token(parts: &Parts) -> Result<Option<String>, ApiError> {
    let Some(value) = parts.headers.get(&CART_SESSION_HEADER) else {
        return Ok(None);
    };
    let token = value
        .to_str()
        .map_err(|_| ApiError::BadRequest("invalid cart session token".to_string()))?
        .trim();
    let valid = (8..=128).contains(&token.len())
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(ApiError::BadRequest(
            "invalid cart session token".to_string(),
        ));
    }
    Ok(Some(token.to_string()))
}

fn new_guest_token() -> String {
    SessionId::generate().as_str().replacen("sess_", "cart_", 1)
}

/// Optional guest token extracted on its own, for sign-in cart merging.
#[derive(Debug, Clone, Default)]
pub struct GuestCart(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for GuestCart {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(guest_token(parts)?))
    }
}
