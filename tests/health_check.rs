//! Liveness check against a real server on a random port

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use sso::auth::{AuthConfig, AuthService, MIN_HASH_COST};
use sso::routes::RequestTimeout;
use sso::startup::{run, AppState};
use sso::storage::InMemoryStorage;

fn spawn_app() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let storage = Arc::new(InMemoryStorage::new());
    let config = AuthConfig {
        secret: b"health-check-secret".to_vec(),
        access_ttl: chrono::Duration::seconds(60),
        refresh_ttl: chrono::Duration::seconds(120),
        password_hash_cost: MIN_HASH_COST,
    };
    let state = AppState {
        auth: AuthService::new(storage.clone(), storage.clone(), config),
        directory: storage,
        jwt_secret: b"health-check-secret".to_vec(),
        request_timeout: RequestTimeout(Duration::from_secs(5)),
    };

    let server = run(listener, state).expect("Failed to create server");
    let _ = tokio::spawn(server);

    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
async fn health_check_works() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/health_check", addr))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert_eq!(Some(0), response.content_length());
}

#[tokio::test]
async fn unknown_route_is_404() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/does-not-exist", addr))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
async fn in_memory_backend_serves_auth_routes() {
    let addr = spawn_app();
    let client = reqwest::Client::new();

    let response = client
        .post(&format!("{}/auth/signup", addr))
        .json(&serde_json::json!({
            "login": "alice",
            "email": "a@x.com",
            "password": "longpassword1"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(201, response.status().as_u16());
}
