/// User Routes
///
/// Directory listing and the caller's own profile. Password hashes never
/// leave the database layer.

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::hash_password;
use crate::error::AppError;
use crate::middleware::AuthenticatedUser;
use crate::validators::{is_valid_email, is_valid_password, is_valid_username};

#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: String,
}

/// GET /api/users
pub async fn list_users(pool: web::Data<PgPool>) -> Result<HttpResponse, AppError> {
    let users = sqlx::query_as::<_, (Uuid, String, String, DateTime<Utc>)>(
        "SELECT id, username, email, created_at FROM users ORDER BY created_at",
    )
    .fetch_all(pool.get_ref())
    .await?;

    let body: Vec<UserResponse> = users
        .into_iter()
        .map(|(id, username, email, created_at)| UserResponse {
            id: id.to_string(),
            username,
            email,
            created_at: created_at.to_rfc3339(),
        })
        .collect();

    Ok(HttpResponse::Ok().json(body))
}

/// GET /api/users/me
///
/// # Errors
/// - 404: the token's subject no longer exists (deleted account)
pub async fn get_current_user(
    user: web::ReqData<AuthenticatedUser>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let row = sqlx::query_as::<_, (Uuid, String, String, DateTime<Utc>)>(
        "SELECT id, username, email, created_at FROM users WHERE id = $1",
    )
    .bind(user.id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(HttpResponse::Ok().json(UserResponse {
        id: row.0.to_string(),
        username: row.1,
        email: row.2,
        created_at: row.3.to_rfc3339(),
    }))
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// PATCH /api/users/me
///
/// Partial update of the caller's profile. Omitted fields are left
/// untouched; a new password is hashed before it reaches the database.
///
/// # Errors
/// - 400: invalid username, email, or password
/// - 404: the token's subject no longer exists
/// - 409: email already taken by another account
pub async fn update_current_user(
    form: web::Json<UpdateUserRequest>,
    user: web::ReqData<AuthenticatedUser>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let username = match &form.username {
        Some(candidate) => Some(is_valid_username(candidate)?),
        None => None,
    };
    let email = match &form.email {
        Some(candidate) => Some(is_valid_email(candidate)?),
        None => None,
    };
    let password_hash = match &form.password {
        Some(candidate) => {
            is_valid_password(candidate)?;
            Some(hash_password(candidate)?)
        }
        None => None,
    };

    if let Some(email) = &email {
        let taken = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM users WHERE email = $1 AND id <> $2",
        )
        .bind(email)
        .bind(user.id)
        .fetch_optional(pool.get_ref())
        .await?;
        if taken.is_some() {
            return Err(AppError::Conflict("Email already in use".to_string()));
        }
    }

    let row = sqlx::query_as::<_, (Uuid, String, String, DateTime<Utc>)>(
        r#"
        UPDATE users
        SET username = COALESCE($1, username),
            email = COALESCE($2, email),
            password_hash = COALESCE($3, password_hash)
        WHERE id = $4
        RETURNING id, username, email, created_at
        "#,
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(user.id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = %user.id, "User profile updated");

    Ok(HttpResponse::Ok().json(UserResponse {
        id: row.0.to_string(),
        username: row.1,
        email: row.2,
        created_at: row.3.to_rfc3339(),
    }))
}

/// DELETE /api/users/me
///
/// Deletes the caller's account. Sessions, memberships, owned servers and
/// their invites go with it through the foreign-key cascades, so every
/// outstanding refresh token dies here too.
///
/// # Errors
/// - 404: the token's subject no longer exists
pub async fn delete_current_user(
    user: web::ReqData<AuthenticatedUser>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user.id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id = %user.id, "User account deleted");

    Ok(HttpResponse::NoContent().finish())
}
