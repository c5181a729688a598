use concord::configuration::{get_configuration, DatabaseSettings, JwtSettings};
use concord::startup::run;
use serde_json::{json, Value};
use sqlx::{Connection, Executor, PgConnection, PgPool};
use std::collections::HashSet;
use std::net::TcpListener;
use uuid::Uuid;

pub struct TestApp {
    pub address: String,
    pub db_pool: PgPool,
    pub jwt: JwtSettings,
}

async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let mut configuration = get_configuration().expect("Failed to read configuration.");
    configuration.database.database_name = Uuid::new_v4().to_string();
    let connection_pool = configure_database(&configuration.database).await;

    let jwt = configuration.jwt.clone();
    let server =
        run(listener, connection_pool.clone(), configuration).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        db_pool: connection_pool,
        jwt,
    }
}

pub async fn configure_database(config: &DatabaseSettings) -> PgPool {
    let mut connection = PgConnection::connect(&config.connection_string_without_db())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, config.database_name))
        .await
        .expect("Failed to create database.");

    let connection_pool = PgPool::connect(&config.connection_string())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database.");
    connection_pool
}

/// Signs a user up, logs them in, and returns their access token.
async fn access_token_for(app: &TestApp, username: &str, email: &str) -> String {
    let client = reqwest::Client::new();

    let signup = client
        .post(&format!("{}/auth/signup", &app.address))
        .json(&json!({ "username": username, "email": email, "password": "secret1" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(201, signup.status().as_u16());

    let login: Value = client
        .post(&format!("{}/auth/login", &app.address))
        .json(&json!({ "email": email, "password": "secret1" }))
        .send()
        .await
        .expect("Failed to execute request.")
        .json()
        .await
        .expect("Failed to parse login response");

    login["token"].as_str().expect("No access token").to_string()
}

async fn create_server(app: &TestApp, token: &str, name: &str) -> Value {
    let response = reqwest::Client::new()
        .post(&format!("{}/api/servers", &app.address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "name": name }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(201, response.status().as_u16());
    response.json().await.expect("Failed to parse response")
}

async fn create_invite(app: &TestApp, token: &str, server_id: &str) -> Value {
    let response = reqwest::Client::new()
        .post(&format!("{}/api/servers/{}/invites", &app.address, server_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(201, response.status().as_u16());
    response.json().await.expect("Failed to parse response")
}

// --- Server CRUD Tests ---

#[tokio::test]
async fn create_server_enrolls_the_creator_as_admin() {
    let app = spawn_app().await;
    let token = access_token_for(&app, "alice", "alice@example.com").await;

    let server = create_server(&app, &token, "general").await;
    assert_eq!(server["name"], "general");

    let response = reqwest::Client::new()
        .get(&format!(
            "{}/api/servers/{}/members",
            &app.address,
            server["id"].as_str().unwrap()
        ))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());

    let members: Value = response.json().await.unwrap();
    assert_eq!(members.as_array().unwrap().len(), 1);
    assert_eq!(members[0]["username"], "alice");
    assert_eq!(members[0]["role"], "ADMIN");
}

#[tokio::test]
async fn create_server_with_duplicate_name_returns_409() {
    let app = spawn_app().await;
    let token = access_token_for(&app, "alice", "alice@example.com").await;

    create_server(&app, &token, "general").await;

    let response = reqwest::Client::new()
        .post(&format!("{}/api/servers", &app.address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "name": "general" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(409, response.status().as_u16());
}

#[tokio::test]
async fn get_server_returns_403_for_non_members_and_404_for_unknown() {
    let app = spawn_app().await;
    let owner = access_token_for(&app, "alice", "alice@example.com").await;
    let outsider = access_token_for(&app, "bob", "bob@example.com").await;

    let server = create_server(&app, &owner, "general").await;
    let server_id = server["id"].as_str().unwrap();

    let client = reqwest::Client::new();
    let forbidden = client
        .get(&format!("{}/api/servers/{}", &app.address, server_id))
        .header("Authorization", format!("Bearer {}", outsider))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(403, forbidden.status().as_u16());

    let missing = client
        .get(&format!("{}/api/servers/{}", &app.address, Uuid::new_v4()))
        .header("Authorization", format!("Bearer {}", owner))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(404, missing.status().as_u16());
}

#[tokio::test]
async fn api_routes_require_an_access_token() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let protected_paths = vec!["/api/users", "/api/users/me", "/api/servers"];

    for path in protected_paths {
        let response = client
            .get(&format!("{}{}", &app.address, path))
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(
            401,
            response.status().as_u16(),
            "Endpoint {} should require authentication",
            path
        );
    }
}

// --- Invite Tests ---

#[tokio::test]
async fn invite_flow_is_single_use() {
    let app = spawn_app().await;
    let owner = access_token_for(&app, "alice", "alice@example.com").await;
    let joiner = access_token_for(&app, "bob", "bob@example.com").await;
    let latecomer = access_token_for(&app, "carol", "carol@example.com").await;

    let server = create_server(&app, &owner, "general").await;
    let server_id = server["id"].as_str().unwrap();
    let invite = create_invite(&app, &owner, server_id).await;
    let code = invite["code"].as_str().unwrap();

    let client = reqwest::Client::new();
    let accept = client
        .post(&format!("{}/api/invites/{}/accept", &app.address, code))
        .header("Authorization", format!("Bearer {}", joiner))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, accept.status().as_u16());

    // Membership registered
    let members: Value = client
        .get(&format!("{}/api/servers/{}/members", &app.address, server_id))
        .header("Authorization", format!("Bearer {}", owner))
        .send()
        .await
        .expect("Failed to execute request.")
        .json()
        .await
        .unwrap();
    assert_eq!(members.as_array().unwrap().len(), 2);

    // The code was consumed on redemption
    let reuse = client
        .post(&format!("{}/api/invites/{}/accept", &app.address, code))
        .header("Authorization", format!("Bearer {}", latecomer))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(404, reuse.status().as_u16());
}

#[tokio::test]
async fn concurrent_redemptions_of_one_code_admit_exactly_one_user() {
    let app = spawn_app().await;
    let owner = access_token_for(&app, "alice", "alice@example.com").await;
    let bob = access_token_for(&app, "bob", "bob@example.com").await;
    let carol = access_token_for(&app, "carol", "carol@example.com").await;

    let server = create_server(&app, &owner, "general").await;
    let server_id = server["id"].as_str().unwrap();
    let invite = create_invite(&app, &owner, server_id).await;
    let code = invite["code"].as_str().unwrap();

    let client = reqwest::Client::new();
    let url = format!("{}/api/invites/{}/accept", &app.address, code);
    let (first, second) = tokio::join!(
        client
            .post(&url)
            .header("Authorization", format!("Bearer {}", bob))
            .send(),
        client
            .post(&url)
            .header("Authorization", format!("Bearer {}", carol))
            .send(),
    );

    let mut statuses = vec![
        first.expect("Failed to execute request.").status().as_u16(),
        second.expect("Failed to execute request.").status().as_u16(),
    ];
    statuses.sort_unstable();
    // One winner, one loser; never two memberships from one code
    assert_eq!(statuses, vec![200, 404]);

    let members: Value = client
        .get(&format!("{}/api/servers/{}/members", &app.address, server_id))
        .header("Authorization", format!("Bearer {}", owner))
        .send()
        .await
        .expect("Failed to execute request.")
        .json()
        .await
        .unwrap();
    assert_eq!(members.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn expired_invite_is_rejected_and_removed() {
    let app = spawn_app().await;
    let owner = access_token_for(&app, "alice", "alice@example.com").await;
    let joiner = access_token_for(&app, "bob", "bob@example.com").await;

    let server = create_server(&app, &owner, "general").await;
    let server_id = server["id"].as_str().unwrap();
    let invite = create_invite(&app, &owner, server_id).await;
    let code = invite["code"].as_str().unwrap();

    // Push the invite past its expiry
    sqlx::query("UPDATE invites SET expires_at = now() - interval '1 hour' WHERE code = $1")
        .bind(code)
        .execute(&app.db_pool)
        .await
        .expect("Failed to expire invite");

    let client = reqwest::Client::new();
    let expired = client
        .post(&format!("{}/api/invites/{}/accept", &app.address, code))
        .header("Authorization", format!("Bearer {}", joiner))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(400, expired.status().as_u16());

    // Lazy cleanup removed the code, so the next attempt is a plain 404
    let retry = client
        .post(&format!("{}/api/invites/{}/accept", &app.address, code))
        .header("Authorization", format!("Bearer {}", joiner))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(404, retry.status().as_u16());
}

#[tokio::test]
async fn accepting_an_invite_twice_from_the_same_user_conflicts() {
    let app = spawn_app().await;
    let owner = access_token_for(&app, "alice", "alice@example.com").await;
    let joiner = access_token_for(&app, "bob", "bob@example.com").await;

    let server = create_server(&app, &owner, "general").await;
    let server_id = server["id"].as_str().unwrap();

    let first_invite = create_invite(&app, &owner, server_id).await;
    let second_invite = create_invite(&app, &owner, server_id).await;

    let client = reqwest::Client::new();
    let first = client
        .post(&format!(
            "{}/api/invites/{}/accept",
            &app.address,
            first_invite["code"].as_str().unwrap()
        ))
        .header("Authorization", format!("Bearer {}", joiner))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, first.status().as_u16());

    let second = client
        .post(&format!(
            "{}/api/invites/{}/accept",
            &app.address,
            second_invite["code"].as_str().unwrap()
        ))
        .header("Authorization", format!("Bearer {}", joiner))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(409, second.status().as_u16());
}

#[tokio::test]
async fn invite_creation_is_forbidden_for_non_members() {
    let app = spawn_app().await;
    let owner = access_token_for(&app, "alice", "alice@example.com").await;
    let outsider = access_token_for(&app, "bob", "bob@example.com").await;

    let server = create_server(&app, &owner, "general").await;
    let server_id = server["id"].as_str().unwrap();

    let response = reqwest::Client::new()
        .post(&format!("{}/api/servers/{}/invites", &app.address, server_id))
        .header("Authorization", format!("Bearer {}", outsider))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(403, response.status().as_u16());
}

#[tokio::test]
async fn generated_invite_codes_are_unique() {
    let app = spawn_app().await;
    let owner = access_token_for(&app, "alice", "alice@example.com").await;

    let server = create_server(&app, &owner, "general").await;
    let server_id = server["id"].as_str().unwrap();

    let mut codes = HashSet::new();
    for _ in 0..20 {
        let invite = create_invite(&app, &owner, server_id).await;
        let code = invite["code"].as_str().unwrap().to_string();
        assert_eq!(code.len(), 8);
        codes.insert(code);
    }

    assert_eq!(codes.len(), 20);
}
