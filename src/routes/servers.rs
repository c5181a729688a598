/// Server (guild) Routes
///
/// CRUD for servers and membership plus the invite endpoints. Everything
/// here sits behind the access-token middleware.

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::invites::{claim_invite, create_invite as persist_invite};
use crate::middleware::AuthenticatedUser;

#[derive(Deserialize)]
pub struct CreateServerRequest {
    pub name: String,
}

#[derive(Serialize)]
pub struct ServerResponse {
    pub id: String,
    pub name: String,
    pub owner_id: String,
}

#[derive(Serialize)]
pub struct MemberResponse {
    pub id: String,
    pub username: String,
    pub role: String,
}

async fn membership_role(
    pool: &PgPool,
    server_id: &Uuid,
    user_id: &Uuid,
) -> Result<Option<String>, AppError> {
    let role = sqlx::query_scalar::<_, String>(
        "SELECT role FROM server_members WHERE server_id = $1 AND user_id = $2",
    )
    .bind(server_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(role)
}

async fn server_exists(pool: &PgPool, server_id: &Uuid) -> Result<bool, AppError> {
    let id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM servers WHERE id = $1")
        .bind(server_id)
        .fetch_optional(pool)
        .await?;

    Ok(id.is_some())
}

/// POST /api/servers
///
/// Creates a server and enrolls the creator as its ADMIN member.
///
/// # Errors
/// - 400: missing name
/// - 409: caller already owns a server with this name
pub async fn create_server(
    form: web::Json<CreateServerRequest>,
    user: web::ReqData<AuthenticatedUser>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let name = form.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Server name is required".to_string()));
    }

    let existing = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM servers WHERE name = $1 AND owner_id = $2",
    )
    .bind(name)
    .bind(user.id)
    .fetch_optional(pool.get_ref())
    .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "You already own a server with this name".to_string(),
        ));
    }

    let server_id = Uuid::new_v4();
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO servers (id, name, owner_id, created_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(server_id)
    .bind(name)
    .bind(user.id)
    .bind(Utc::now())
    .execute(&mut tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO server_members (server_id, user_id, role)
        VALUES ($1, $2, 'ADMIN')
        "#,
    )
    .bind(server_id)
    .bind(user.id)
    .execute(&mut tx)
    .await?;

    tx.commit().await?;

    tracing::info!(server_id = %server_id, owner_id = %user.id, "Server created");

    Ok(HttpResponse::Created().json(ServerResponse {
        id: server_id.to_string(),
        name: name.to_string(),
        owner_id: user.id.to_string(),
    }))
}

/// GET /api/servers — servers the caller belongs to.
pub async fn list_servers(
    user: web::ReqData<AuthenticatedUser>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let servers = sqlx::query_as::<_, (Uuid, String, Uuid)>(
        r#"
        SELECT s.id, s.name, s.owner_id
        FROM servers s
        JOIN server_members m ON m.server_id = s.id
        WHERE m.user_id = $1
        ORDER BY s.created_at
        "#,
    )
    .bind(user.id)
    .fetch_all(pool.get_ref())
    .await?;

    if servers.is_empty() {
        return Err(AppError::NotFound(
            "No servers found for this user".to_string(),
        ));
    }

    let body: Vec<ServerResponse> = servers
        .into_iter()
        .map(|(id, name, owner_id)| ServerResponse {
            id: id.to_string(),
            name,
            owner_id: owner_id.to_string(),
        })
        .collect();

    Ok(HttpResponse::Ok().json(body))
}

/// GET /api/servers/{id}
///
/// # Errors
/// - 404: unknown server
/// - 403: caller is not a member
pub async fn get_server(
    path: web::Path<Uuid>,
    user: web::ReqData<AuthenticatedUser>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let server_id = path.into_inner();

    let server = sqlx::query_as::<_, (Uuid, String, Uuid)>(
        "SELECT id, name, owner_id FROM servers WHERE id = $1",
    )
    .bind(server_id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::NotFound("Server not found".to_string()))?;

    if membership_role(pool.get_ref(), &server_id, &user.id)
        .await?
        .is_none()
    {
        return Err(AppError::Forbidden(
            "Unauthorized to access this server".to_string(),
        ));
    }

    Ok(HttpResponse::Ok().json(ServerResponse {
        id: server.0.to_string(),
        name: server.1,
        owner_id: server.2.to_string(),
    }))
}

/// GET /api/servers/{id}/members
pub async fn get_server_members(
    path: web::Path<Uuid>,
    user: web::ReqData<AuthenticatedUser>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let server_id = path.into_inner();

    if !server_exists(pool.get_ref(), &server_id).await? {
        return Err(AppError::NotFound("Server not found".to_string()));
    }

    if membership_role(pool.get_ref(), &server_id, &user.id)
        .await?
        .is_none()
    {
        return Err(AppError::Forbidden(
            "Unauthorized to access this server's members".to_string(),
        ));
    }

    let members = sqlx::query_as::<_, (Uuid, String, String)>(
        r#"
        SELECT u.id, u.username, m.role
        FROM server_members m
        JOIN users u ON u.id = m.user_id
        WHERE m.server_id = $1
        ORDER BY u.username
        "#,
    )
    .bind(server_id)
    .fetch_all(pool.get_ref())
    .await?;

    let body: Vec<MemberResponse> = members
        .into_iter()
        .map(|(id, username, role)| MemberResponse {
            id: id.to_string(),
            username,
            role,
        })
        .collect();

    Ok(HttpResponse::Ok().json(body))
}

/// POST /api/servers/{id}/invites
///
/// Member-only invite creation. The code is valid for 24 hours and a
/// single redemption.
pub async fn create_invite(
    path: web::Path<Uuid>,
    user: web::ReqData<AuthenticatedUser>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let server_id = path.into_inner();

    if !server_exists(pool.get_ref(), &server_id).await? {
        return Err(AppError::NotFound("Server not found".to_string()));
    }

    if membership_role(pool.get_ref(), &server_id, &user.id)
        .await?
        .is_none()
    {
        return Err(AppError::Forbidden(
            "Only members can create invites".to_string(),
        ));
    }

    let invite = persist_invite(pool.get_ref(), &server_id).await?;

    tracing::info!(server_id = %server_id, code = %invite.code, "Invite created");

    Ok(HttpResponse::Created().json(json!({
        "code": invite.code,
        "server_id": invite.server_id.to_string(),
        "expires_at": invite.expires_at.to_rfc3339(),
    })))
}

/// POST /api/invites/{code}/accept
///
/// Single-use redemption. The claim consumes the row up front, so of any
/// number of concurrent redemptions exactly one proceeds and the rest see
/// 404. An expired code is consumed by the same claim, which doubles as
/// its lazy cleanup.
///
/// # Errors
/// - 404: unknown (or already redeemed) code
/// - 400: expired code
/// - 409: caller is already a member
pub async fn accept_invite(
    path: web::Path<String>,
    user: web::ReqData<AuthenticatedUser>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let code = path.into_inner();

    let invite = claim_invite(pool.get_ref(), &code)
        .await?
        .ok_or_else(|| AppError::NotFound("Invite not found".to_string()))?;

    if invite.is_expired(Utc::now()) {
        return Err(AppError::BadRequest("Invite has expired".to_string()));
    }

    if membership_role(pool.get_ref(), &invite.server_id, &user.id)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "Already a member of this server".to_string(),
        ));
    }

    // The primary key on (server_id, user_id) backstops the check above
    // if the same user redeems two codes at once.
    sqlx::query(
        r#"
        INSERT INTO server_members (server_id, user_id, role)
        VALUES ($1, $2, 'MEMBER')
        "#,
    )
    .bind(invite.server_id)
    .bind(user.id)
    .execute(pool.get_ref())
    .await?;

    tracing::info!(server_id = %invite.server_id, user_id = %user.id, "Invite redeemed");

    Ok(HttpResponse::Ok().json(json!({ "server_id": invite.server_id.to_string() })))
}
