/// Refresh Session Store
///
/// Persistent registry of outstanding refresh sessions, keyed by session id
/// (the token's `jti`). A row exists iff the session is valid for refresh,
/// modulo the window between natural expiry and lazy cleanup. Deleting the
/// row is the sole revocation mechanism; there is no revoked flag.
///
/// Expiry is checked lazily at refresh time. An expired-but-present row is
/// deleted by the refresh attempt that discovers it, so no background
/// sweeper is needed.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;

/// One persisted login session.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Insert a new session row.
///
/// Session ids are cryptographically random so a collision should never
/// happen in practice, but the primary-key constraint still turns one into
/// a `Conflict` instead of silently overwriting another user's session.
pub async fn register_session(
    pool: &PgPool,
    session_id: &Uuid,
    user_id: &Uuid,
    expires_at: DateTime<Utc>,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO refresh_sessions (id, user_id, expires_at)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(session_id)
    .bind(user_id)
    .bind(expires_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Look a session up by id. `None` means revoked or never registered.
pub async fn lookup_session(
    pool: &PgPool,
    session_id: &Uuid,
) -> Result<Option<SessionRecord>, AppError> {
    let row = sqlx::query_as::<_, (Uuid, Uuid, DateTime<Utc>)>(
        "SELECT id, user_id, expires_at FROM refresh_sessions WHERE id = $1",
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(id, user_id, expires_at)| SessionRecord {
        id,
        user_id,
        expires_at,
    }))
}

/// Delete one session. A no-op if the row is already gone, so a logout
/// racing a second logout (or a lazy-expiry delete) degrades gracefully.
pub async fn revoke_session(pool: &PgPool, session_id: &Uuid) -> Result<(), AppError> {
    sqlx::query("DELETE FROM refresh_sessions WHERE id = $1")
        .bind(session_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Delete every session belonging to a user (logout-all).
pub async fn revoke_all_sessions(pool: &PgPool, user_id: &Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM refresh_sessions WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;

    tracing::info!(
        user_id = %user_id,
        revoked = result.rows_affected(),
        "All sessions revoked for user"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_future_expiry_is_not_expired() {
        let record = SessionRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            expires_at: Utc::now() + Duration::days(30),
        };

        assert!(!record.is_expired(Utc::now()));
    }

    #[test]
    fn test_past_expiry_is_expired() {
        let record = SessionRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            expires_at: Utc::now() - Duration::seconds(1),
        };

        assert!(record.is_expired(Utc::now()));
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        let record = SessionRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            expires_at: now,
        };

        // Strictly-less-than comparison: expiring exactly now is still valid
        assert!(!record.is_expired(now));
    }
}
