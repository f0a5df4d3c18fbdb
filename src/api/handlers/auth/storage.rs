//! Database helpers for users and password-reset tokens.
//!
//! Reset-token redemption is delete-or-fail inside one transaction: the
//! `DELETE ... RETURNING` either claims the token row or finds nothing, so a
//! concurrent second redeemer observes "not found" and no user mutation
//! happens for it.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::state::AuthConfig;

/// Outcome when attempting to create a new user.
#[derive(Debug)]
pub(super) enum SignupOutcome {
    Created(Uuid),
    Conflict,
}

/// Minimal fields needed to authenticate a login attempt.
pub(super) struct UserRecord {
    pub(super) user_id: Uuid,
    pub(super) username: String,
    pub(super) password_hash: String,
}

pub(super) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

pub(super) async fn lookup_user_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<UserRecord>> {
    let query = "SELECT id, username, password_hash FROM users WHERE username = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(username)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by username")?;

    Ok(row.map(|row| UserRecord {
        user_id: row.get("id"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
    }))
}

pub(super) async fn lookup_user_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<UserRecord>> {
    let query = "SELECT id, username, password_hash FROM users WHERE email = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by email")?;

    Ok(row.map(|row| UserRecord {
        user_id: row.get("id"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
    }))
}

pub(super) async fn insert_user(
    pool: &PgPool,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<SignupOutcome> {
    let query = r"
        INSERT INTO users
            (username, email, password_hash)
        VALUES ($1, $2, $3)
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(SignupOutcome::Created(row.get("id"))),
        Err(err) => {
            if is_unique_violation(&err) {
                return Ok(SignupOutcome::Conflict);
            }
            Err(err).context("failed to insert user")
        }
    }
}

/// Persist a freshly generated reset token for the user.
pub(super) async fn insert_reset_token(pool: &PgPool, user_id: Uuid, token: &str) -> Result<()> {
    let query = r"
        INSERT INTO password_reset_tokens
            (user_id, token)
        VALUES ($1, $2)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(token)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to insert password reset token")?;

    Ok(())
}

/// Redeem a reset token: claim the row and set the new password hash in one
/// transaction. Returns the affected user id, or `None` when the token is
/// unknown or expired — the first successful redeemer wins.
pub(super) async fn redeem_reset_token(
    pool: &PgPool,
    token: &str,
    new_password_hash: &str,
    config: &AuthConfig,
) -> Result<Option<Uuid>> {
    let mut tx = pool.begin().await.context("begin redeem transaction")?;

    let delete_query = r"
        DELETE FROM password_reset_tokens
        WHERE token = $1
          AND created_at > NOW() - ($2 * INTERVAL '1 hour')
        RETURNING user_id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = delete_query
    );
    let row = sqlx::query(delete_query)
        .bind(token)
        .bind(config.reset_token_ttl_hours())
        .fetch_optional(&mut *tx)
        .instrument(span)
        .await
        .context("failed to claim password reset token")?;

    let Some(row) = row else {
        let _ = tx.rollback().await;
        return Ok(None);
    };
    let user_id: Uuid = row.get("user_id");

    let update_query = "UPDATE users SET password_hash = $1 WHERE id = $2";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = update_query
    );
    sqlx::query(update_query)
        .bind(new_password_hash)
        .bind(user_id)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to update password hash")?;

    tx.commit().await.context("commit redeem transaction")?;

    Ok(Some(user_id))
}

/// Batch-delete reset tokens older than the configured TTL. Idempotent;
/// returns the number of rows removed.
pub(super) async fn cleanup_expired_reset_tokens(
    pool: &PgPool,
    config: &AuthConfig,
) -> Result<u64> {
    let query = r"
        DELETE FROM password_reset_tokens
        WHERE created_at <= NOW() - ($1 * INTERVAL '1 hour')
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(config.reset_token_ttl_hours())
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to cleanup expired reset tokens")?;

    Ok(result.rows_affected())
}
