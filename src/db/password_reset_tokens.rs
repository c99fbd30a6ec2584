use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::PasswordResetToken;

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    token_hash: &str,
    expires_at: DateTime<Utc>,
) -> Result<PasswordResetToken, sqlx::Error> {
    sqlx::query_as::<_, PasswordResetToken>(
        "INSERT INTO password_reset_tokens (user_id, token_hash, expires_at)
         VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(user_id)
    .bind(token_hash)
    .bind(expires_at)
    .fetch_one(executor)
    .await
}

/// Delete any outstanding tokens for a user. Run inside the same transaction
/// as the insert of a replacement token so at most one live token exists.
pub async fn delete_for_user<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM password_reset_tokens WHERE user_id = $1")
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Atomically claim a token row by its hash. The single DELETE .. RETURNING
/// guarantees that of two concurrent redemptions exactly one gets the row;
/// the other sees None. Expiry is judged by the caller on the returned row.
pub async fn take_by_hash(
    pool: &PgPool,
    token_hash: &str,
) -> Result<Option<PasswordResetToken>, sqlx::Error> {
    sqlx::query_as::<_, PasswordResetToken>(
        "DELETE FROM password_reset_tokens WHERE token_hash = $1 RETURNING *",
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await
}

/// Delete every token whose expiry is strictly before `now`. Returns the
/// number of rows removed. Idempotent; racing with `take_by_hash` on the
/// same row leaves one of the two deleting zero rows, which is fine.
pub async fn sweep(pool: &PgPool, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM password_reset_tokens WHERE expires_at < $1")
        .bind(now)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
