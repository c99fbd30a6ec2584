use std::sync::Arc;

use chrono::Utc;
use sha2::{Digest, Sha256};
use sqlx::PgPool;

use crate::auth::{jwt, password};
use crate::config::Config;
use crate::db;
use crate::email::Mailer;
use crate::error::AuthError;
use crate::models::User;

/// Orchestrates signup, login, password change and the reset-token
/// lifecycle. One instance is shared across concurrent callers; all mutable
/// state lives in the database.
pub struct AuthService {
    pool: PgPool,
    config: Config,
    mailer: Option<Arc<dyn Mailer>>,
}

fn generate_reset_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// Tokens are stored hashed so a leaked ledger row cannot be redeemed.
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}

impl AuthService {
    pub fn new(pool: PgPool, config: Config, mailer: Option<Arc<dyn Mailer>>) -> Self {
        Self {
            pool,
            config,
            mailer,
        }
    }

    pub async fn signup(
        &self,
        username: &str,
        password_plain: &str,
        email: &str,
    ) -> Result<User, AuthError> {
        if username.trim().is_empty() {
            return Err(AuthError::Validation("Username is required".to_string()));
        }
        if password_plain.len() < 8 {
            return Err(AuthError::Validation(
                "Password must be at least 8 characters".to_string(),
            ));
        }
        if !plausible_email(email) {
            return Err(AuthError::Validation(
                "A valid email address is required".to_string(),
            ));
        }

        let pw_hash = password::hash(password_plain).map_err(AuthError::Internal)?;

        match db::users::create(&self.pool, username, email, &pw_hash).await {
            Ok(user) => Ok(user),
            Err(e) if e
                .as_database_error()
                .is_some_and(|d| d.is_unique_violation()) =>
            {
                Err(AuthError::DuplicateUser)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Authenticate and mint a bearer token. Unknown username and wrong
    /// password produce the identical error so accounts cannot be
    /// enumerated through the login endpoint.
    pub async fn login(&self, username: &str, password_plain: &str) -> Result<String, AuthError> {
        let user = db::users::find_by_username(&self.pool, username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !password::verify(password_plain, &user.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        jwt::encode_token(
            &user.username,
            self.config.access_token_ttl,
            &self.config.jwt_secret,
        )
    }

    /// Verify a bearer token presented by request-filtering middleware and
    /// return the subject it was issued for.
    pub fn verify_access_token(&self, token: &str) -> Result<String, AuthError> {
        jwt::decode_token(token, &self.config.jwt_secret).map(|claims| claims.sub)
    }

    /// Issue a reset token for `username` and dispatch it by email.
    ///
    /// An unknown username is swallowed (logged at debug) so the endpoint
    /// does not reveal which accounts exist. Issuing replaces any prior
    /// outstanding token for the user in the same transaction as the
    /// insert, and the row is committed before the email is attempted: a
    /// persisted-but-unsent token is recoverable, a sent-but-unpersisted
    /// one is a promise the user cannot redeem.
    pub async fn request_password_reset(&self, username: &str) -> Result<(), AuthError> {
        let Some(user) = db::users::find_by_username(&self.pool, username).await? else {
            tracing::debug!("Password reset requested for unknown username");
            return Ok(());
        };

        let token = generate_reset_token();
        let token_hash = hash_token(&token);
        let expires_at = Utc::now() + self.config.reset_token_ttl;

        let mut tx = self.pool.begin().await?;
        db::password_reset_tokens::delete_for_user(&mut *tx, user.id).await?;
        db::password_reset_tokens::create(&mut *tx, user.id, &token_hash, expires_at).await?;
        tx.commit().await?;

        match &self.mailer {
            Some(mailer) => {
                let body = format!(
                    "A password reset was requested for your account.\n\n\
                     Reset token: {token}\n\n\
                     The token expires in {} minutes. If you did not request \
                     this, you can ignore this message.",
                    self.config.reset_token_ttl.num_minutes()
                );
                if let Err(e) = mailer.send(&user.email, "Password Reset", &body).await {
                    tracing::error!("Failed to send password reset email: {e}");
                }
            }
            None => {
                tracing::warn!("System SMTP not configured. Password reset token: {token}");
            }
        }

        Ok(())
    }

    /// Redeem a reset token and set a new password.
    ///
    /// Returns `Ok(false)` for an unknown and an expired token alike; the
    /// caller gets one "invalid or expired" answer either way. The ledger
    /// row is claimed with an atomic delete, so of two concurrent
    /// redemptions of the same token exactly one can succeed.
    pub async fn redeem_password_reset(
        &self,
        token_value: &str,
        new_password: &str,
    ) -> Result<bool, AuthError> {
        if new_password.len() < 8 {
            return Err(AuthError::Validation(
                "Password must be at least 8 characters".to_string(),
            ));
        }

        let token_hash = hash_token(token_value);

        let Some(reset_token) =
            db::password_reset_tokens::take_by_hash(&self.pool, &token_hash).await?
        else {
            return Ok(false);
        };

        // The claim already removed the row, so an expired token is
        // opportunistically cleaned up here rather than left for the sweeper.
        if reset_token.expires_at <= Utc::now() {
            return Ok(false);
        }

        let Some(user) = db::users::find_by_id(&self.pool, reset_token.user_id).await? else {
            return Ok(false);
        };

        let pw_hash = password::hash(new_password).map_err(AuthError::Internal)?;
        db::users::update_password(&self.pool, user.id, &pw_hash).await?;

        Ok(true)
    }

    pub async fn change_password(
        &self,
        username: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if new_password.len() < 8 {
            return Err(AuthError::Validation(
                "Password must be at least 8 characters".to_string(),
            ));
        }

        let user = db::users::find_by_username(&self.pool, username)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !password::verify(old_password, &user.password_hash) {
            return Err(AuthError::InvalidOldPassword);
        }

        let pw_hash = password::hash(new_password).map_err(AuthError::Internal)?;
        db::users::update_password(&self.pool, user.id, &pw_hash).await?;

        Ok(())
    }
}
