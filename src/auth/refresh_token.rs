/// Refresh Token Codec
///
/// Long-lived HS256 tokens carrying a session id (`jti`) and subject.
/// Parsing validates signature and expiry only; whether the session is
/// still alive is decided by the session store, not here.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::RefreshClaims;
use crate::configuration::JwtSettings;
use crate::error::AppError;

/// Result of issuing a refresh token.
///
/// `session_id` and `expires_at` are what the caller registers with the
/// session store; the token itself goes to the client.
pub struct IssuedRefreshToken {
    pub token: String,
    pub session_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Identity recovered from a structurally valid refresh token.
pub struct RefreshTokenIdentity {
    pub session_id: Uuid,
    pub user_id: Uuid,
}

/// Issue a refresh token with a fresh random session id.
///
/// The session id is a v4 UUID (128-bit-class randomness); no uniqueness
/// check against the store happens here. The store's insert constraint is
/// the backstop.
pub fn issue_refresh_token(
    user_id: &Uuid,
    config: &JwtSettings,
) -> Result<IssuedRefreshToken, AppError> {
    let session_id = Uuid::new_v4();
    let expires_at = Utc::now() + Duration::seconds(config.refresh_token_expiry);
    let claims = RefreshClaims::new(user_id, &session_id, config.refresh_token_expiry);

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Refresh token generation failed: {}", e)))?;

    Ok(IssuedRefreshToken {
        token,
        session_id,
        expires_at,
    })
}

/// Verify a refresh token's signature and expiry and recover its identity.
///
/// This is a necessary check, not a sufficient one: the caller still has to
/// look the session up in the store. Malformed tokens never reach the
/// session-deletion logic because they fail here first.
pub fn parse_refresh_token(
    token: &str,
    config: &JwtSettings,
) -> Result<RefreshTokenIdentity, AppError> {
    let data = decode::<RefreshClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::warn!("Refresh token validation failed: {}", e);
        AppError::Unauthorized("Invalid refresh token".to_string())
    })?;

    Ok(RefreshTokenIdentity {
        session_id: data.claims.session_id()?,
        user_id: data.claims.user_id()?,
    })
}
