//! Persistent user accounts.

use serde::Deserialize;
use storeline_commerce::cart::CartOwner;
use storeline_commerce::checkout::normalize_email;
use storeline_commerce::current_timestamp;
use storeline_commerce::ids::UserId;
use storeline_db::{params, Db, DbError, Statement, Value};
use tracing::{info, warn};

use crate::password::{PasswordHasher, PasswordPolicy};
use crate::user::{Role, User};
use crate::AuthError;

const USER_COLUMNS: &str = "id, email, name, role, created_at, updated_at, last_login_at";

/// Account to create.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Role,
}

#[derive(Deserialize)]
struct CredentialRow {
    id: UserId,
    password_hash: String,
}

/// User storage with password handling.
#[derive(Clone, Debug)]
pub struct UserRepository {
    db: Db,
    hasher: PasswordHasher,
    policy: PasswordPolicy,
}

impl UserRepository {
    pub fn new(db: Db, hasher: PasswordHasher, policy: PasswordPolicy) -> Self {
        Self { db, hasher, policy }
    }

    pub fn policy(&self) -> PasswordPolicy {
        self.policy
    }

    /// Register a storefront customer.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<String>,
    ) -> Result<User, AuthError> {
        self.create(NewUser {
            email: email.to_string(),
            password: password.to_string(),
            name,
            role: Role::Customer,
        })
        .await
    }

    /// Create an account with any role.
    pub async fn create(&self, new: NewUser) -> Result<User, AuthError> {
        let email = normalize_email(&new.email)?;
        self.policy.validate(&new.password)?;
        let name = clean_name(new.name);
        let hash = self.hasher.hash_blocking(&new.password).await?;

        let id = UserId::generate();
        let now = current_timestamp();
        self.db
            .execute(
                "INSERT INTO users (id, email, name, password_hash, role, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                params![
                    id.as_str(),
                    &email,
                    name.clone(),
                    hash,
                    new.role.as_str(),
                    now,
                    now
                ],
            )
            .await
            .map_err(|e| match e {
                DbError::Conflict(_) => AuthError::UserAlreadyExists(email.clone()),
                other => other.into(),
            })?;

        info!(user_id = %id, role = %new.role, "user created");
        Ok(User {
            id,
            email,
            name,
            role: new.role,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        })
    }

    /// Check an email and password.
    ///
    /// Unknown emails and wrong passwords fail the same way.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let Ok(email) = normalize_email(email) else {
            return Err(AuthError::InvalidCredentials);
        };
        let row: Option<CredentialRow> = self
            .db
            .query_optional(
                "SELECT id, password_hash FROM users WHERE email = ?",
                params![&email],
            )
            .await?;
        let Some(row) = row else {
            return Err(AuthError::InvalidCredentials);
        };
        if !self.hasher.verify_blocking(password, &row.password_hash).await? {
            warn!(user_id = %row.id, "failed login");
            return Err(AuthError::InvalidCredentials);
        }

        let now = current_timestamp();
        self.db
            .execute(
                "UPDATE users SET last_login_at = ? WHERE id = ?",
                params![now, row.id.as_str()],
            )
            .await?;
        self.get(&row.id).await
    }

    pub async fn get(&self, id: &UserId) -> Result<User, AuthError> {
        self.db
            .query_optional(
                &format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
                params![id.as_str()],
            )
            .await?
            .ok_or_else(|| AuthError::UserNotFound(id.to_string()))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let email = normalize_email(email)?;
        Ok(self
            .db
            .query_optional(
                &format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS),
                params![&email],
            )
            .await?)
    }

    /// All users, newest first.
    pub async fn list(&self) -> Result<Vec<User>, AuthError> {
        Ok(self
            .db
            .query_as(
                &format!(
                    "SELECT {} FROM users ORDER BY created_at DESC, email",
                    USER_COLUMNS
                ),
                params![],
            )
            .await?)
    }

    pub async fn count_with_role(&self, role: Role) -> Result<i64, AuthError> {
        Ok(self
            .db
            .query_scalar_i64(
                "SELECT COUNT(*) FROM users WHERE role = ?",
                params![role.as_str()],
            )
            .await?)
    }

    /// Change the display name. A blank name clears it.
    pub async fn update_profile(
        &self,
        id: &UserId,
        name: Option<String>,
    ) -> Result<User, AuthError> {
        let name = clean_name(name);
        let changed = self
            .db
            .execute(
                "UPDATE users SET name = ?, updated_at = ? WHERE id = ?",
                params![name, current_timestamp(), id.as_str()],
            )
            .await?;
        if changed == 0 {
            return Err(AuthError::UserNotFound(id.to_string()));
        }
        self.get(id).await
    }

    /// Replace the password after checking the current one.
    pub async fn change_password(
        &self,
        id: &UserId,
        current: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let row: CredentialRow = self
            .db
            .query_optional(
                "SELECT id, password_hash FROM users WHERE id = ?",
                params![id.as_str()],
            )
            .await?
            .ok_or_else(|| AuthError::UserNotFound(id.to_string()))?;
        if !self.hasher.verify_blocking(current, &row.password_hash).await? {
            return Err(AuthError::InvalidCredentials);
        }
        self.policy.validate(new_password)?;

        let hash = self.hasher.hash_blocking(new_password).await?;
        self.db
            .execute(
                "UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?",
                params![hash, current_timestamp(), id.as_str()],
            )
            .await?;
        info!(user_id = %id, "password changed");
        Ok(())
    }

    /// Change another user's role.
    pub async fn set_role(
        &self,
        actor: &UserId,
        id: &UserId,
        role: Role,
    ) -> Result<User, AuthError> {
        if actor == id {
            return Err(AuthError::SelfModification(
                "you cannot change your own role".to_string(),
            ));
        }
        let changed = self
            .db
            .execute(
                "UPDATE users SET role = ?, updated_at = ? WHERE id = ?",
                params![role.as_str(), current_timestamp(), id.as_str()],
            )
            .await?;
        if changed == 0 {
            return Err(AuthError::UserNotFound(id.to_string()));
        }
        info!(user_id = %id, role = %role, by = %actor, "user role changed");
        self.get(id).await
    }

    /// Delete another user along with their cart. Their orders stay, detached.
    pub async fn delete(&self, actor: &UserId, id: &UserId) -> Result<(), AuthError> {
        if actor == id {
            return Err(AuthError::SelfModification(
                "you cannot delete your own account".to_string(),
            ));
        }
        let owner_key = CartOwner::User(id.clone()).key();
        self.db
            .transaction(vec![
                Statement::new(
                    "DELETE FROM carts WHERE owner_key = ?",
                    vec![Value::from(owner_key)],
                ),
                Statement::new(
                    "DELETE FROM users WHERE id = ?",
                    vec![Value::from(id.as_str())],
                )
                .guarded(format!("user {} not found", id)),
            ])
            .await
            .map_err(|e| match e {
                DbError::PreconditionFailed(_) => AuthError::UserNotFound(id.to_string()),
                other => other.into(),
            })?;
        info!(user_id = %id, by = %actor, "user deleted");
        Ok(())
    }
}

fn clean_name(name: Option<String>) -> Option<String> {
    name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}
