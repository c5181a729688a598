/// Authentication Routes — session lifecycle
///
/// From the server's perspective a session moves `NONE → ACTIVE →
/// {REVOKED, EXPIRED}`. ACTIVE is a live `refresh_sessions` row with a
/// future expiry; every transition below touches at most that one row, so
/// no failure path leaves partial state behind.

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{
    hash_password, issue_access_token, issue_refresh_token, lookup_session, parse_refresh_token,
    register_session, revoke_all_sessions, revoke_session, verify_password,
};
use crate::configuration::{ApplicationSettings, JwtSettings};
use crate::error::AppError;
use crate::middleware::AuthenticatedUser;
use crate::validators::{is_valid_email, is_valid_password, is_valid_username};

pub const REFRESH_COOKIE: &str = "refresh_token";
/// The refresh cookie is scoped to the auth route prefix so it is never
/// sent along with ordinary API calls.
pub const AUTH_COOKIE_PATH: &str = "/auth";

#[derive(Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub refresh_token: String,
    pub user: UserSummary,
}

fn refresh_cookie(token: &str, max_age_seconds: i64, secure: bool) -> Cookie<'static> {
    Cookie::build(REFRESH_COOKIE, token.to_string())
        .path(AUTH_COOKIE_PATH)
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .max_age(CookieDuration::seconds(max_age_seconds))
        .finish()
}

fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(REFRESH_COOKIE, "")
        .path(AUTH_COOKIE_PATH)
        .http_only(true)
        .same_site(SameSite::Strict)
        .finish();
    cookie.make_removal();
    cookie
}

/// POST /auth/signup
///
/// # Errors
/// - 400: missing fields, invalid email, password shorter than 6 chars
/// - 409: email already registered
pub async fn signup(
    form: web::Json<SignupRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let username = is_valid_username(&form.username)?;
    let email = is_valid_email(&form.email)?;
    is_valid_password(&form.password)?;

    let existing = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(pool.get_ref())
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("User already exists".to_string()));
    }

    let password_hash = hash_password(&form.password)?;
    let user_id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO users (id, email, username, password_hash, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(user_id)
    .bind(&email)
    .bind(&username)
    .bind(&password_hash)
    .bind(Utc::now())
    .execute(pool.get_ref())
    .await?;

    tracing::info!(user_id = %user_id, "User signed up");

    Ok(HttpResponse::Created().json(json!({
        "id": user_id.to_string(),
        "username": username,
        "email": email,
    })))
}

/// POST /auth/login — `NONE → ACTIVE`
///
/// Verifies credentials, issues the access and refresh tokens, and
/// registers the refresh session. The refresh token is returned in the
/// body for API clients and set as an httpOnly strict-same-site cookie for
/// browsers.
///
/// # Security Notes
/// Unknown email and wrong password produce the same generic message to
/// avoid account enumeration.
pub async fn login(
    form: web::Json<LoginRequest>,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
    app_config: web::Data<ApplicationSettings>,
) -> Result<HttpResponse, AppError> {
    let invalid_credentials = || AppError::Unauthorized("Invalid credentials".to_string());

    let email = form.email.trim();
    if email.is_empty() || form.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    let user = sqlx::query_as::<_, (Uuid, String, String)>(
        "SELECT id, username, password_hash FROM users WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(invalid_credentials)?;

    let (user_id, username, password_hash) = user;

    if !verify_password(&form.password, &password_hash) {
        return Err(invalid_credentials());
    }

    let access_token = issue_access_token(&user_id, jwt_config.get_ref())?;
    let refresh = issue_refresh_token(&user_id, jwt_config.get_ref())?;

    // Tokens exist only in memory until this insert succeeds; if it fails
    // nothing was persisted and nothing was returned to the client.
    register_session(pool.get_ref(), &refresh.session_id, &user_id, refresh.expires_at).await?;

    tracing::info!(user_id = %user_id, session_id = %refresh.session_id, "User logged in");

    Ok(HttpResponse::Ok()
        .cookie(refresh_cookie(
            &refresh.token,
            jwt_config.refresh_token_expiry,
            app_config.secure_cookies,
        ))
        .json(LoginResponse {
            token: access_token,
            refresh_token: refresh.token,
            user: UserSummary {
                id: user_id.to_string(),
                username,
            },
        }))
}

/// GET /auth/refresh — `ACTIVE → ACTIVE` or `ACTIVE → EXPIRED`
///
/// Parses the refresh cookie, checks the session is still registered and
/// unexpired, and mints a new access token. The refresh token itself is
/// not rotated; the session row is left untouched. A session found past
/// its expiry is deleted here (lazy cleanup), which makes a repeated
/// attempt with the same stale token fail identically.
pub async fn refresh(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let cookie = req
        .cookie(REFRESH_COOKIE)
        .ok_or_else(|| AppError::BadRequest("Refresh token is required".to_string()))?;

    let identity = parse_refresh_token(cookie.value(), jwt_config.get_ref())?;

    let record = lookup_session(pool.get_ref(), &identity.session_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid refresh token".to_string()))?;

    if record.is_expired(Utc::now()) {
        revoke_session(pool.get_ref(), &record.id).await?;
        tracing::info!(session_id = %record.id, "Expired session removed on refresh attempt");
        return Err(AppError::Unauthorized(
            "Refresh token has expired".to_string(),
        ));
    }

    // The store, not the token, is the authority on the subject.
    let access_token = issue_access_token(&record.user_id, jwt_config.get_ref())?;

    Ok(HttpResponse::Ok().json(json!({ "token": access_token })))
}

/// POST /auth/logout — `ACTIVE → REVOKED` for one session
///
/// Revocation is unconditional and idempotent: revoking an already-absent
/// session still succeeds and still clears the cookie. A missing or
/// unparsable refresh token is a 400, since logout requires presenting a
/// session identity.
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let cookie = req
        .cookie(REFRESH_COOKIE)
        .ok_or_else(|| AppError::BadRequest("Refresh token is required".to_string()))?;

    let identity = parse_refresh_token(cookie.value(), jwt_config.get_ref())
        .map_err(|_| AppError::BadRequest("A valid refresh token is required".to_string()))?;

    revoke_session(pool.get_ref(), &identity.session_id).await?;

    tracing::info!(session_id = %identity.session_id, "Session revoked on logout");

    Ok(HttpResponse::Ok()
        .cookie(removal_cookie())
        .json(json!({ "message": "Logged out successfully" })))
}

/// POST /auth/logout-all — `ACTIVE(*) → REVOKED(*)`
///
/// The only transition driven by access-token identity rather than
/// refresh-token identity; the middleware has already authenticated the
/// caller.
pub async fn logout_all(
    user: web::ReqData<AuthenticatedUser>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    revoke_all_sessions(pool.get_ref(), &user.id).await?;

    Ok(HttpResponse::Ok()
        .cookie(removal_cookie())
        .json(json!({ "message": "Logged out from all sessions" })))
}
