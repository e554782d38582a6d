//! Bootstrap configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use autosrt_schema_core::{SchemaSpec, SoftDeleteFilter};

use crate::error::{BootstrapError, Result};

/// Bootstrap configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// MongoDB connection string (default: `mongodb://localhost:27017`).
    pub mongo_uri: String,

    /// Database override; the schema's own database is used when unset.
    pub database: Option<String>,

    /// JSON schema table replacing the built-in autosrt schema.
    pub schema_file: Option<PathBuf>,

    /// Soft-delete convention for the built-in schema (default: `null`).
    pub soft_delete_filter: SoftDeleteFilter,

    /// Upper bound for each declaration in seconds (default: 30).
    pub declaration_timeout_seconds: u64,

    /// Server selection and connect timeout in milliseconds (default: 3000).
    pub connect_timeout_ms: u64,
}

/// Mongo secrets file structure.
#[derive(Debug, Deserialize)]
struct MongoSecrets {
    uri: String,
    #[serde(default)]
    database: Option<String>,
}

impl BootstrapConfig {
    /// Load configuration from environment variables and secrets files.
    ///
    /// # Errors
    ///
    /// Returns `BootstrapError::InvalidConfig` if `SOFT_DELETE_FILTER` is set
    /// to an unknown value.
    pub fn from_env() -> Result<Self> {
        let (mongo_uri, secrets_database) = load_mongo_secrets();

        Ok(Self {
            mongo_uri,
            database: std::env::var("MONGO_DB_NAME").ok().or(secrets_database),
            schema_file: std::env::var_os("SCHEMA_FILE").map(PathBuf::from),
            soft_delete_filter: parse_soft_delete_filter(
                std::env::var("SOFT_DELETE_FILTER").ok().as_deref(),
            )?,
            declaration_timeout_seconds: std::env::var("DECLARATION_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            connect_timeout_ms: std::env::var("CONNECT_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3000),
        })
    }

    /// Per-declaration timeout.
    #[must_use]
    pub fn declaration_timeout(&self) -> Duration {
        Duration::from_secs(self.declaration_timeout_seconds)
    }

    /// Connect timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// The schema to apply: the configured file, or the built-in autosrt table,
    /// retargeted to the database override if one is set.
    ///
    /// # Errors
    ///
    /// Returns `BootstrapError::InvalidSchema` if the file cannot be loaded or
    /// the resulting schema is invalid.
    pub fn load_schema(&self) -> Result<SchemaSpec> {
        let mut schema = match &self.schema_file {
            Some(path) => {
                tracing::info!(path = %path.display(), "Loading schema from file");
                SchemaSpec::from_file(path)?
            }
            None => SchemaSpec::autosrt(self.soft_delete_filter)?,
        };

        if let Some(database) = &self.database {
            schema = schema.with_database(database.clone());
        }
        schema.validate()?;
        Ok(schema)
    }
}

/// Parse `SOFT_DELETE_FILTER`; `null` when unset, an error when unrecognised.
fn parse_soft_delete_filter(value: Option<&str>) -> Result<SoftDeleteFilter> {
    match value {
        None => Ok(SoftDeleteFilter::default()),
        Some(value) => value
            .parse()
            .map_err(|e| BootstrapError::InvalidConfig(format!("SOFT_DELETE_FILTER: {e}"))),
    }
}

/// Load the Mongo connection string from a secrets file or the environment.
fn load_mongo_secrets() -> (String, Option<String>) {
    let secret_paths = [".secrets/mongo.json", "../.secrets/mongo.json"];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<MongoSecrets>(path) {
            tracing::info!(path = %path, "Loaded Mongo secrets from file");
            return (secrets.uri, secrets.database);
        }
    }

    tracing::debug!("Mongo secrets file not found, using environment variables");
    (
        std::env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://localhost:27017".into()),
        None,
    )
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(
    path: impl AsRef<Path>,
) -> std::result::Result<T, std::io::Error> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            mongo_uri: "mongodb://localhost:27017".into(),
            database: None,
            schema_file: None,
            soft_delete_filter: SoftDeleteFilter::Null,
            declaration_timeout_seconds: 30,
            connect_timeout_ms: 3000,
        }
    }
}
