//! Database helpers for accounts, verification codes, and sessions.

use anyhow::{anyhow, Context, Result};
use serde_json::json;
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::state::AuthConfig;
use super::utils::{
    generate_otp_code, generate_session_token, hash_session_token, unique_violation_constraint,
};
use crate::api::email::TEMPLATE_VERIFY_OTP;

/// Outcome when attempting to create a new account.
///
/// Uniqueness comes from the store's unique indexes, not a preceding read, so
/// two concurrent signups for the same name cannot both succeed. The violated
/// constraint tells us which field conflicted.
#[derive(Debug)]
pub(super) enum SignupOutcome {
    Created(Uuid),
    DuplicateUsername,
    DuplicateEmail,
}

/// Outcome of submitting a verification code.
#[derive(Debug)]
pub(super) enum VerifyOutcome {
    Verified,
    NoCode,
    Expired,
    Mismatch,
}

/// Account fields the auth handlers work with.
pub(super) struct UserRecord {
    pub(super) id: Uuid,
    pub(super) username: String,
    pub(super) email: String,
    pub(super) password_hash: String,
    pub(super) verified: bool,
}

impl UserRecord {
    pub(super) fn public(&self) -> super::types::PublicUser {
        super::types::PublicUser {
            id: self.id.to_string(),
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}

/// Minimal data returned for a valid session cookie.
pub(crate) struct SessionRecord {
    pub(crate) user_id: Uuid,
    pub(crate) username: String,
    pub(crate) email: String,
}

const USER_COLUMNS: &str = "id, username, email, password_hash, verified";

fn user_from_row(row: &sqlx::postgres::PgRow) -> UserRecord {
    UserRecord {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        verified: row.get("verified"),
    }
}

/// Look up an account by username or email (login accepts either).
pub(super) async fn lookup_user_by_identifier(
    pool: &PgPool,
    identifier: &str,
    email_normalized: &str,
) -> Result<Option<UserRecord>> {
    let query =
        &format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1 OR email = $2 LIMIT 1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(query)
        .bind(identifier)
        .bind(email_normalized)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by identifier")?;

    Ok(row.as_ref().map(user_from_row))
}

pub(super) async fn lookup_user_by_email(
    pool: &PgPool,
    email_normalized: &str,
) -> Result<Option<UserRecord>> {
    let query = &format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1 LIMIT 1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(query)
        .bind(email_normalized)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by email")?;

    Ok(row.as_ref().map(user_from_row))
}

/// Create an account and its first verification code in one transaction.
pub(super) async fn insert_user_and_otp(
    pool: &PgPool,
    username: &str,
    email_normalized: &str,
    password_hash: &str,
    config: &AuthConfig,
) -> Result<SignupOutcome> {
    // Transaction ensures the account, its code, and the email outbox row
    // stay consistent even if something fails.
    let mut tx = pool.begin().await.context("begin signup transaction")?;

    let query = r"
        INSERT INTO users (username, email, password_hash)
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
        .bind(email_normalized)
        .bind(password_hash)
        .fetch_one(&mut *tx)
        .instrument(span)
        .await;

    let user_id: Uuid = match row {
        Ok(row) => row.get("id"),
        Err(err) => {
            if let Some(constraint) = unique_violation_constraint(&err) {
                let _ = tx.rollback().await;
                return Ok(match constraint.as_str() {
                    "users_email_key" => SignupOutcome::DuplicateEmail,
                    _ => SignupOutcome::DuplicateUsername,
                });
            }
            return Err(err).context("failed to insert user");
        }
    };

    issue_otp(&mut tx, user_id, username, email_normalized, config).await?;

    tx.commit().await.context("commit signup transaction")?;

    Ok(SignupOutcome::Created(user_id))
}

/// Issue a fresh verification code inside an open transaction.
///
/// The user id is the ledger's primary key, so this upsert replaces any
/// previous code and timestamps; the old code becomes unusable. An
/// `email_outbox` row is enqueued in the same transaction.
pub(super) async fn issue_otp(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
    username: &str,
    email: &str,
    config: &AuthConfig,
) -> Result<i32> {
    let code = generate_otp_code();

    let query = r"
        INSERT INTO otp_codes (user_id, secret_code, created_at, expires_at)
        VALUES ($1, $2, NOW(), NOW() + ($3 * INTERVAL '1 second'))
        ON CONFLICT (user_id) DO UPDATE
        SET secret_code = EXCLUDED.secret_code,
            created_at = EXCLUDED.created_at,
            expires_at = EXCLUDED.expires_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(code)
        .bind(config.otp_ttl_seconds())
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to upsert verification code")?;

    let payload_json = json!({
        "username": username,
        "code": code,
    });
    let payload_text =
        serde_json::to_string(&payload_json).context("failed to serialize email payload")?;

    let query = r"
        INSERT INTO email_outbox (to_email, template, payload_json)
        VALUES ($1, $2, $3::jsonb)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(email)
        .bind(TEMPLATE_VERIFY_OTP)
        .bind(payload_text)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to insert email outbox row")?;

    Ok(code)
}

/// Issue a fresh code in its own transaction (unverified login, resend).
pub(super) async fn reissue_otp(pool: &PgPool, user: &UserRecord, config: &AuthConfig) -> Result<()> {
    let mut tx = pool.begin().await.context("begin otp transaction")?;
    issue_otp(&mut tx, user.id, &user.username, &user.email, config).await?;
    tx.commit().await.context("commit otp transaction")?;
    Ok(())
}

/// Check a submitted code and, on match, flip the account to verified and
/// delete the ledger row in one transaction.
///
/// A mismatch leaves the stored code untouched so the user can retry; an
/// expired code is reported without deleting the account.
pub(super) async fn consume_otp(
    pool: &PgPool,
    user_id: Uuid,
    submitted_code: i32,
) -> Result<VerifyOutcome> {
    let mut tx = pool.begin().await.context("begin verify transaction")?;

    // Lock the row so a concurrent resend cannot swap the code mid-check.
    let query = r"
        SELECT secret_code, (expires_at <= NOW()) AS expired
        FROM otp_codes
        WHERE user_id = $1
        FOR UPDATE
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .instrument(span)
        .await
        .context("failed to fetch verification code")?;

    let Some(row) = row else {
        tx.commit().await.context("commit verify noop")?;
        return Ok(VerifyOutcome::NoCode);
    };

    let expired: bool = row.get("expired");
    if expired {
        tx.commit().await.context("commit verify expired")?;
        return Ok(VerifyOutcome::Expired);
    }

    let secret_code: i32 = row.get("secret_code");
    if secret_code != submitted_code {
        tx.commit().await.context("commit verify mismatch")?;
        return Ok(VerifyOutcome::Mismatch);
    }

    let query = r"
        UPDATE users
        SET verified = true,
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to update verified flag")?;

    let query = "DELETE FROM otp_codes WHERE user_id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to delete consumed code")?;

    tx.commit().await.context("commit verify transaction")?;

    Ok(VerifyOutcome::Verified)
}

/// Store a new password digest and revoke every session for the user.
pub(super) async fn rotate_password(
    pool: &PgPool,
    user_id: Uuid,
    password_hash: &str,
) -> Result<()> {
    let mut tx = pool.begin().await.context("begin password transaction")?;

    let query = r"
        UPDATE users
        SET password_hash = $2,
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(password_hash)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to update password hash")?;

    // Old sessions die with the old password.
    let query = "DELETE FROM user_sessions WHERE user_id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to revoke sessions")?;

    tx.commit().await.context("commit password transaction")?;

    Ok(())
}

pub(super) async fn insert_session(
    pool: &PgPool,
    user_id: Uuid,
    ttl_seconds: i64,
) -> Result<String> {
    // Generate a random token, store only its hash, and return the raw value
    // so the caller can set the session cookie.
    let query = r"
        INSERT INTO user_sessions (user_id, session_hash, expires_at)
        VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );

    for _ in 0..3 {
        let token = generate_session_token()?;
        let token_hash = hash_session_token(&token);
        let result = sqlx::query(query)
            .bind(user_id)
            .bind(token_hash)
            .bind(ttl_seconds)
            .execute(pool)
            .instrument(span.clone())
            .await;

        match result {
            Ok(_) => return Ok(token),
            Err(err) if unique_violation_constraint(&err).is_some() => {}
            Err(err) => return Err(err).context("failed to insert session"),
        }
    }

    Err(anyhow!("failed to generate unique session token"))
}

pub(super) async fn lookup_session(
    pool: &PgPool,
    token_hash: &[u8],
) -> Result<Option<SessionRecord>> {
    // Only accept verified users and unexpired sessions.
    let query = r"
        SELECT users.id, users.username, users.email
        FROM user_sessions
        JOIN users ON users.id = user_sessions.user_id
        WHERE user_sessions.session_hash = $1
          AND user_sessions.expires_at > NOW()
          AND users.verified
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token_hash)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup session")?;

    if row.is_none() {
        return Ok(None);
    }

    // Record activity for audit/visibility without extending the session TTL.
    let query = r"
        UPDATE user_sessions
        SET last_seen_at = NOW()
        WHERE session_hash = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(token_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update session last_seen_at")?;

    Ok(row.map(|row| SessionRecord {
        user_id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
    }))
}

pub(super) async fn delete_session(pool: &PgPool, token_hash: &[u8]) -> Result<()> {
    // Logout is idempotent; it's fine if no rows are deleted.
    let query = "DELETE FROM user_sessions WHERE session_hash = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(token_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete session")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{SignupOutcome, UserRecord, VerifyOutcome};
    use uuid::Uuid;

    #[test]
    fn signup_outcome_debug_names() {
        assert_eq!(
            format!("{:?}", SignupOutcome::Created(Uuid::nil())),
            format!("Created({:?})", Uuid::nil())
        );
        assert_eq!(
            format!("{:?}", SignupOutcome::DuplicateUsername),
            "DuplicateUsername"
        );
        assert_eq!(
            format!("{:?}", SignupOutcome::DuplicateEmail),
            "DuplicateEmail"
        );
    }

    #[test]
    fn verify_outcome_debug_names() {
        assert_eq!(format!("{:?}", VerifyOutcome::Verified), "Verified");
        assert_eq!(format!("{:?}", VerifyOutcome::NoCode), "NoCode");
        assert_eq!(format!("{:?}", VerifyOutcome::Expired), "Expired");
        assert_eq!(format!("{:?}", VerifyOutcome::Mismatch), "Mismatch");
    }

    #[test]
    fn user_record_holds_values() {
        let record = UserRecord {
            id: Uuid::nil(),
            username: "alice".to_string(),
            email: "a@x.com".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            verified: false,
        };
        assert_eq!(record.id, Uuid::nil());
        assert_eq!(record.username, "alice");
        assert!(!record.verified);
    }
}
