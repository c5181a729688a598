/// Invite Code Generation and Redemption
///
/// Short random codes under a shared unique namespace. Generation is a
/// bounded collision-retry loop: the bound caps worst-case latency and
/// rules out an infinite loop under pathological collision runs.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;

const CODE_LENGTH: usize = 8;
const MAX_GENERATION_ATTEMPTS: u32 = 5;
const INVITE_TTL_HOURS: i64 = 24;

// base64url alphabet (RFC 4648 §5)
const CODE_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// A pending invite to a server.
#[derive(Debug, Clone)]
pub struct Invite {
    pub code: String,
    pub server_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl Invite {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

fn random_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// The bounded retry loop, with the draw and the uniqueness check split
/// out so the exhaustion path is testable without a database.
async fn generate_unique_code<D, E, Fut>(mut draw: D, mut exists: E) -> Result<String, AppError>
where
    D: FnMut() -> String,
    E: FnMut(String) -> Fut,
    Fut: std::future::Future<Output = Result<bool, AppError>>,
{
    for attempt in 1..=MAX_GENERATION_ATTEMPTS {
        let code = draw();

        if !exists(code.clone()).await? {
            return Ok(code);
        }

        tracing::warn!(attempt, "Invite code collision, retrying");
    }

    Err(AppError::Internal(
        "Failed to generate unique invite code".to_string(),
    ))
}

/// Draw a code that is unique among persisted invites.
///
/// # Errors
/// `Internal` after 5 colliding attempts; the invite-creation request fails
/// and is not retried further up the stack.
pub async fn generate_invite_code(pool: &PgPool) -> Result<String, AppError> {
    generate_unique_code(random_code, |code| async move {
        let existing =
            sqlx::query_scalar::<_, String>("SELECT code FROM invites WHERE code = $1")
                .bind(&code)
                .fetch_optional(pool)
                .await?;
        Ok(existing.is_some())
    })
    .await
}

/// Create and persist an invite for a server, valid for 24 hours.
pub async fn create_invite(pool: &PgPool, server_id: &Uuid) -> Result<Invite, AppError> {
    let code = generate_invite_code(pool).await?;
    let expires_at = Utc::now() + Duration::hours(INVITE_TTL_HOURS);

    sqlx::query(
        r#"
        INSERT INTO invites (code, server_id, expires_at)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(&code)
    .bind(server_id)
    .bind(expires_at)
    .execute(pool)
    .await?;

    Ok(Invite {
        code,
        server_id: *server_id,
        expires_at,
    })
}

/// Atomically consume an invite by code.
///
/// The delete doubles as the claim: of any number of concurrent
/// redemptions of the same code, exactly one sees the row and the rest
/// get `None`. Expired invites are claimed the same way; the caller
/// rejects them after the fact, which also serves as lazy cleanup.
pub async fn claim_invite(pool: &PgPool, code: &str) -> Result<Option<Invite>, AppError> {
    let row = sqlx::query_as::<_, (String, Uuid, DateTime<Utc>)>(
        "DELETE FROM invites WHERE code = $1 RETURNING code, server_id, expires_at",
    )
    .bind(code)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(code, server_id, expires_at)| Invite {
        code,
        server_id,
        expires_at,
    }))
}
