//! Configuration management for the Bookshelf server

use std::env;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::repository::StoreKind;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Backend selection and its parameters
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub kind: StoreKind,
    /// Catalog file for the `json` store
    pub json_path: String,
    /// Connection string for the `sqlite` store
    pub database_url: String,
    pub max_connections: u32,
    /// Start the memory store, or a brand-new JSON file, with the default catalog
    pub seed: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: String,
    pub audience: String,
    pub token_ttl_seconds: i64,
    /// Clients allowed to request tokens
    #[serde(default)]
    pub clients: Vec<ClientCredentials>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub id: String,
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Layer on the environment-specific file
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add environment variables (BOOKSHELF_STORAGE__KIND=json, ...)
            .add_source(
                Environment::with_prefix("BOOKSHELF")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option(
                "storage.kind",
                env::var("BOOK_STORE").ok().map(|kind| kind.to_lowercase()),
            )?
            .set_override_option("storage.json_path", env::var("BOOK_JSON_PATH").ok())?
            .set_override_option("storage.database_url", env::var("DATABASE_URL").ok())?
            .set_override_option("auth.jwt_secret", env::var("JWT_SECRET").ok())?
            .build()?;

        let mut app: AppConfig = config.try_deserialize()?;

        // A single client can be registered straight from the environment
        if let (Ok(id), Ok(secret)) = (env::var("CLIENT_ID"), env::var("CLIENT_SECRET")) {
            app.auth.clients.push(ClientCredentials { id, secret });
        }

        Ok(app)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Memory,
            json_path: "data/books.json".to_string(),
            database_url: "sqlite://data/books.db".to_string(),
            max_connections: 5,
            seed: false,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-this-secret-in-production".to_string(),
            issuer: "bookshelf".to_string(),
            audience: "bookshelf-clients".to_string(),
            token_ttl_seconds: 3600,
            clients: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
