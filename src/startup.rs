use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use sqlx::PgPool;
use std::net::TcpListener;

use crate::configuration::Settings;
use crate::error::AppError;
use crate::middleware::{AuthMiddleware, RequestLogger};
use crate::routes::{
    accept_invite, create_invite, create_server, delete_current_user, get_current_user,
    get_server, get_server_members, health_check, list_servers, list_users, login, logout,
    logout_all, refresh, signup, update_current_user,
};

/// Malformed or incomplete JSON bodies come back in the same
/// `{code, message}` shape as every other error.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}

pub fn run(
    listener: TcpListener,
    connection: PgPool,
    settings: Settings,
) -> Result<Server, std::io::Error> {
    let connection = web::Data::new(connection);
    let jwt_config = settings.jwt.clone();
    let jwt_config_data = web::Data::new(settings.jwt);
    let app_config_data = web::Data::new(settings.application);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(RequestLogger)
            // Shared state
            .app_data(connection.clone())
            .app_data(jwt_config_data.clone())
            .app_data(app_config_data.clone())
            .app_data(json_config())
            .route("/health_check", web::get().to(health_check))
            // Session lifecycle; the refresh cookie is scoped to /auth
            .service(
                web::scope("/auth")
                    .route("/signup", web::post().to(signup))
                    .route("/login", web::post().to(login))
                    .route("/refresh", web::get().to(refresh))
                    .route("/logout", web::post().to(logout))
                    .service(
                        web::resource("/logout-all")
                            .wrap(AuthMiddleware::new(jwt_config.clone()))
                            .route(web::post().to(logout_all)),
                    ),
            )
            // Protected CRUD surface
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware::new(jwt_config.clone()))
                    .route("/users", web::get().to(list_users))
                    .route("/users/me", web::get().to(get_current_user))
                    .route("/users/me", web::patch().to(update_current_user))
                    .route("/users/me", web::delete().to(delete_current_user))
                    .route("/servers", web::post().to(create_server))
                    .route("/servers", web::get().to(list_servers))
                    .route("/servers/{id}", web::get().to(get_server))
                    .route("/servers/{id}/members", web::get().to(get_server_members))
                    .route("/servers/{id}/invites", web::post().to(create_invite))
                    .route("/invites/{code}/accept", web::post().to(accept_invite)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
