use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::AuthService;
use crate::logger::LoggerMiddleware;
use crate::middleware::JwtMiddleware;
use crate::routes::{
    get_current_user, get_user, get_users, health_check, login, logout, refresh, signup,
    users_exist, RequestTimeout,
};
use crate::storage::Directory;

/// Everything the HTTP layer needs, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub directory: Arc<dyn Directory>,
    /// Signing secret for bearer-token checks on `/api` and `/users`
    pub jwt_secret: Vec<u8>,
    pub request_timeout: RequestTimeout,
}

pub fn run(listener: TcpListener, state: AppState) -> Result<Server, std::io::Error> {
    let auth = web::Data::new(state.auth);
    let directory = web::Data::new(state.directory);
    let timeout = web::Data::new(state.request_timeout);
    let jwt_secret = state.jwt_secret;

    let server = HttpServer::new(move || {
        App::new()
            .wrap(LoggerMiddleware)
            .app_data(auth.clone())
            .app_data(directory.clone())
            .app_data(timeout.clone())
            // Public routes
            .route("/health_check", web::get().to(health_check))
            .route("/auth/signup", web::post().to(signup))
            .route("/auth/login", web::post().to(login))
            .route("/auth/refresh", web::post().to(refresh))
            .route("/auth/logout", web::post().to(logout))
            // Protected routes (require a valid access token)
            .service(
                web::scope("/users")
                    .wrap(JwtMiddleware::new(jwt_secret.clone()))
                    .route("", web::get().to(get_users))
                    // before `/{id}`, which would otherwise claim "exist"
                    .route("/exist", web::get().to(users_exist))
                    .route("/{id}", web::get().to(get_user)),
            )
            .service(
                web::scope("/api")
                    .wrap(JwtMiddleware::new(jwt_secret.clone()))
                    .route("/me", web::get().to(get_current_user)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
