use std::net::TcpListener;
use std::sync::Arc;

use sso::auth::{AuthConfig, AuthService};
use sso::configuration::get_configuration;
use sso::routes::RequestTimeout;
use sso::startup::{run, AppState};
use sso::storage::SqliteStorage;
use sso::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Configuration comes first: it decides the log format
    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;

    init_telemetry(configuration.environment);
    tracing::info!(
        environment = ?configuration.environment,
        application = ?configuration.application,
        database = ?configuration.database,
        jwt = ?configuration.jwt,
        "Configuration loaded"
    );

    let storage = SqliteStorage::connect(&configuration.database)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to open storage");
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "Storage error")
        })?;
    let storage = Arc::new(storage);
    tracing::info!(path = %configuration.database.path, "Storage opened");

    let auth = AuthService::new(
        storage.clone(),
        storage.clone(),
        AuthConfig::from_settings(&configuration.jwt, &configuration.security),
    );

    let address = configuration.application.address();
    let listener = TcpListener::bind(&address)?;
    tracing::info!(%address, "Server listening");

    let state = AppState {
        auth,
        directory: storage,
        jwt_secret: configuration.jwt.secret.as_bytes().to_vec(),
        request_timeout: RequestTimeout(configuration.application.timeout()),
    };

    run(listener, state)?.await?;

    tracing::info!("Server stopped");
    Ok(())
}
