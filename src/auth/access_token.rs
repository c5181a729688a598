/// Access Token Issuance and Parsing
///
/// Short-lived, stateless HS256 tokens. Validity is decided entirely by
/// signature and expiry; there is no revocation list, so the one-hour
/// window is the only access-duration control.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::AccessClaims;
use crate::configuration::JwtSettings;
use crate::error::AppError;

/// Issue a new access token for a user.
///
/// # Errors
/// Returns `Internal` if signing fails.
pub fn issue_access_token(user_id: &Uuid, config: &JwtSettings) -> Result<String, AppError> {
    let claims = AccessClaims::new(user_id, config.access_token_expiry);

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Access token generation failed: {}", e)))
}

/// Verify an access token and return the embedded user id.
///
/// Bad signature, malformed structure, and expiry all collapse into the
/// same `Unauthorized` error; callers cannot (and must not) distinguish
/// them for the end user.
pub fn parse_access_token(token: &str, config: &JwtSettings) -> Result<Uuid, AppError> {
    let data = decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::warn!("Access token validation failed: {}", e);
        AppError::Unauthorized("Invalid or expired token".to_string())
    })?;

    data.claims.user_id()
}
