use std::time::Duration;

use sqlx::sqlite::SqliteConnectOptions;

use crate::auth::{MAX_HASH_COST, MIN_HASH_COST};
use crate::error::ConfigError;

const DEFAULT_CONFIG_PATH: &str = "configuration";

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub environment: Environment,
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    pub security: SecuritySettings,
}

/// Deployment flavour; selects the default log level and log format
#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Local,
    Dev,
    Prod,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    /// Deadline applied to every auth operation, in seconds
    pub timeout_secs: u64,
}

impl ApplicationSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    /// SQLite database file
    pub path: String,
    pub max_connections: u32,
}

impl DatabaseSettings {
    pub fn connect_options(&self) -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(true)
    }
}

/// JWT authentication settings
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_expiry: i64,  // seconds (e.g., 1800 for 30 minutes)
    pub refresh_token_expiry: i64, // seconds (e.g., 604800 for 7 days)
}

impl std::fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret", &"[redacted]")
            .field("access_token_expiry", &self.access_token_expiry)
            .field("refresh_token_expiry", &self.refresh_token_expiry)
            .finish()
    }
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct SecuritySettings {
    /// bcrypt cost factor
    pub password_hash_cost: u32,
}

impl Settings {
    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("jwt.secret".to_string()));
        }
        if self.jwt.access_token_expiry <= 0 {
            return Err(ConfigError::InvalidValue(
                "jwt.access_token_expiry must be positive".to_string(),
            ));
        }
        if self.jwt.refresh_token_expiry <= 0 {
            return Err(ConfigError::InvalidValue(
                "jwt.refresh_token_expiry must be positive".to_string(),
            ));
        }
        if self.application.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "application.timeout_secs must be positive".to_string(),
            ));
        }
        if !(MIN_HASH_COST..=MAX_HASH_COST).contains(&self.security.password_hash_cost) {
            return Err(ConfigError::InvalidValue(format!(
                "security.password_hash_cost must be within {}..={}",
                MIN_HASH_COST, MAX_HASH_COST
            )));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "database.max_connections must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load settings: defaults, then the config file, then `APP__*` env vars.
///
/// The file is `$CONFIG_PATH` when set, otherwise `configuration.*` in the
/// working directory; it is optional.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let settings = config::Config::builder()
        .set_default("environment", "prod")?
        .set_default("application.host", "127.0.0.1")?
        .set_default("application.port", 20202_i64)?
        .set_default("application.timeout_secs", 5_i64)?
        .set_default("database.path", "sso.db")?
        .set_default("database.max_connections", 5_i64)?
        .set_default("jwt.access_token_expiry", 1800_i64)?
        .set_default("jwt.refresh_token_expiry", 604800_i64)?
        .set_default("security.password_hash_cost", i64::from(bcrypt::DEFAULT_COST))?
        .add_source(config::File::with_name(&path).required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let settings = settings.try_deserialize::<Settings>()?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings {
            environment: Environment::Local,
            application: ApplicationSettings {
                host: "127.0.0.1".to_string(),
                port: 0,
                timeout_secs: 5,
            },
            database: DatabaseSettings {
                path: "test.db".to_string(),
                max_connections: 1,
            },
            jwt: JwtSettings {
                secret: "test-secret".to_string(),
                access_token_expiry: 60,
                refresh_token_expiry: 120,
            },
            security: SecuritySettings {
                password_hash_cost: MIN_HASH_COST,
            },
        }
    }

    #[test]
    fn test_valid_settings() {
        assert!(settings().validate().is_ok());
    }

    #[test]
    fn test_empty_secret_is_rejected() {
        let mut settings = settings();
        settings.jwt.secret = "  ".to_string();

        assert!(matches!(
            settings.validate(),
            Err(ConfigError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_non_positive_ttl_is_rejected() {
        let mut settings = settings();
        settings.jwt.refresh_token_expiry = 0;

        assert!(matches!(settings.validate(), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_cost_out_of_range() {
        for cost in [MIN_HASH_COST - 1, MAX_HASH_COST + 1, 40] {
            let mut settings = settings();
            settings.security.password_hash_cost = cost;

            assert!(
                matches!(settings.validate(), Err(ConfigError::InvalidValue(_))),
                "cost {} should be rejected",
                cost
            );
        }
    }

    #[test]
    fn test_cost_bounds_are_accepted() {
        for cost in [MIN_HASH_COST, bcrypt::DEFAULT_COST, MAX_HASH_COST] {
            let mut settings = settings();
            settings.security.password_hash_cost = cost;

            assert!(settings.validate().is_ok());
        }
    }

    #[test]
    fn test_secret_is_not_debug_printed() {
        let printed = format!("{:?}", settings().jwt);

        assert!(!printed.contains("test-secret"));
    }

    #[test]
    fn test_address() {
        assert_eq!(settings().application.address(), "127.0.0.1:0");
    }
}
