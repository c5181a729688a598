/// JWT claim structures
///
/// Payloads for the two token kinds. Access claims bind a user identity
/// for one hour; refresh claims additionally carry the session id (`jti`)
/// that the session store tracks.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Claims for short-lived access tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessClaims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl AccessClaims {
    pub fn new(user_id: &Uuid, expiry_seconds: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            iat: now,
            exp: now + expiry_seconds,
        }
    }

    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))
    }
}

/// Claims for long-lived refresh tokens.
///
/// The `jti` is the session identifier; the matching `refresh_sessions` row
/// is the authority on whether the session is still alive.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
    pub sub: String,
    pub jti: String,
    pub exp: i64,
}

impl RefreshClaims {
    pub fn new(user_id: &Uuid, session_id: &Uuid, expiry_seconds: i64) -> Self {
        Self {
            sub: user_id.to_string(),
            jti: session_id.to_string(),
            exp: chrono::Utc::now().timestamp() + expiry_seconds,
        }
    }

    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::Unauthorized("Invalid refresh token".to_string()))
    }

    pub fn session_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.jti)
            .map_err(|_| AppError::Unauthorized("Invalid refresh token".to_string()))
    }
}
