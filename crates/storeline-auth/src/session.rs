//! Bearer-token sessions.

use std::time::Duration;

use storeline_cache::{Cache, Session, SessionId};
use storeline_commerce::ids::UserId;
use tracing::info;

use crate::user::{SessionUser, User};
use crate::AuthError;

/// Signed-in sessions, keyed by an opaque random token.
#[derive(Debug, Clone)]
pub struct AuthSessions {
    sessions: Session<SessionUser>,
}

impl AuthSessions {
    pub fn new(cache: Cache, ttl: Duration) -> Self {
        Self {
            sessions: Session::new(cache, ttl),
        }
    }

    /// Start a session for `user` and return its token.
    pub fn start(&self, user: &User) -> Result<SessionId, AuthError> {
        let token = self.sessions.create(SessionUser::from(user))?;
        info!(user_id = %user.id, "signed in");
        Ok(token)
    }

    /// Resolve a token, extending the session.
    pub fn current(&self, token: &SessionId) -> Result<SessionUser, AuthError> {
        self.sessions.get(token)?.ok_or(AuthError::Unauthenticated)
    }

    /// Copy changed account details into a live session.
    pub fn refresh(&self, token: &SessionId, user: &User) -> Result<(), AuthError> {
        let fresh = SessionUser::from(user);
        self.sessions
            .update(token, |s| *s = fresh)?
            .map(|_| ())
            .ok_or(AuthError::Unauthenticated)
    }

    /// End one session. Returns whether it was live.
    pub fn end(&self, token: &SessionId) -> Result<bool, AuthError> {
        Ok(self.sessions.delete(token)?)
    }

    /// End every session of a user, e.g. after a role change or deletion.
    pub fn end_all(&self, user_id: &UserId) -> Result<usize, AuthError> {
        let ended = self.sessions.delete_where(|s| &s.id == user_id)?;
        if ended > 0 {
            info!(user_id = %user_id, ended, "sessions ended");
        }
        Ok(ended)
    }
}

/// Token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<SessionId> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| SessionId::new(token))
}
