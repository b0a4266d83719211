//! SurrealDB connection handling
//!
//! Resolves where the registrar database lives and opens a connection:
//! - remote endpoint with credentials (`REGISTRAR_DB_ENDPOINT` + auth vars)
//! - any SurrealDB URL (`REGISTRAR_DB_URL`, e.g. `mem://`, `surrealkv://path`)
//! - otherwise a local `surrealkv://.registrar/db` directory

use crate::error::StateError;
use crate::Result;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::{Database, Root};
use surrealdb::Surreal;
use tracing::{info, instrument};

const DEFAULT_NAMESPACE: &str = "registrar";
const DEFAULT_DATABASE: &str = "main";
const DEFAULT_LOCAL_PATH: &str = ".registrar/db";

/// Credentials for an authenticated remote SurrealDB
#[derive(Debug, Clone)]
pub struct RemoteAuth {
    pub username: String,
    pub password: String,
    /// Root user (true) or database user (false)
    pub is_root: bool,
}

/// Where and how to connect
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Any URL accepted by `surrealdb::engine::any::connect`
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub auth: Option<RemoteAuth>,
}

impl StoreConfig {
    /// Throwaway in-memory database.
    pub fn in_memory() -> Self {
        Self::url("mem://")
    }

    /// Unauthenticated connection to `url`.
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            auth: None,
        }
    }

    /// Set custom namespace
    pub fn with_namespace(mut self, ns: impl Into<String>) -> Self {
        self.namespace = ns.into();
        self
    }

    /// Set custom database
    pub fn with_database(mut self, db: impl Into<String>) -> Self {
        self.database = db.into();
        self
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - REGISTRAR_DB_ENDPOINT + REGISTRAR_DB_USERNAME + REGISTRAR_DB_PASSWORD
    ///   (authenticated remote; REGISTRAR_DB_ROOT=true for root users)
    /// - REGISTRAR_DB_URL (unauthenticated)
    /// - REGISTRAR_DB_NAMESPACE (optional, default: "registrar")
    /// - REGISTRAR_DB_DATABASE (optional, default: "main")
    ///
    /// Falls back to a local surrealkv directory when neither is set.
    pub fn from_env() -> Self {
        let namespace =
            std::env::var("REGISTRAR_DB_NAMESPACE").unwrap_or_else(|_| DEFAULT_NAMESPACE.into());
        let database =
            std::env::var("REGISTRAR_DB_DATABASE").unwrap_or_else(|_| DEFAULT_DATABASE.into());

        let remote = (
            std::env::var("REGISTRAR_DB_ENDPOINT"),
            std::env::var("REGISTRAR_DB_USERNAME"),
            std::env::var("REGISTRAR_DB_PASSWORD"),
        );
        let base = if let (Ok(endpoint), Ok(username), Ok(password)) = remote {
            let is_root = std::env::var("REGISTRAR_DB_ROOT")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false);
            StoreConfig {
                auth: Some(RemoteAuth {
                    username,
                    password,
                    is_root,
                }),
                ..Self::url(endpoint)
            }
        } else if let Ok(url) = std::env::var("REGISTRAR_DB_URL") {
            Self::url(url)
        } else {
            Self::url(format!("surrealkv://{DEFAULT_LOCAL_PATH}"))
        };

        base.with_namespace(namespace).with_database(database)
    }

    fn local_dir(&self) -> Option<&str> {
        self.url.strip_prefix("surrealkv://")
    }
}

/// Open a connection and select namespace/database.
#[instrument(skip(config), fields(url = %config.url, namespace = %config.namespace, database = %config.database))]
pub async fn connect(config: &StoreConfig) -> Result<Surreal<Any>> {
    if let Some(dir) = config.local_dir() {
        std::fs::create_dir_all(dir).map_err(|e| {
            StateError::Connection(format!("Failed to create database directory {dir}: {e}"))
        })?;
    }

    let db = surrealdb::engine::any::connect(config.url.as_str())
        .await
        .map_err(|e| StateError::Connection(format!("Failed to connect to {}: {e}", config.url)))?;

    if let Some(auth) = &config.auth {
        if auth.is_root {
            db.signin(Root {
                username: &auth.username,
                password: &auth.password,
            })
            .await
            .map_err(|e| StateError::Connection(format!("Root auth failed: {e}")))?;
        } else {
            db.signin(Database {
                namespace: &config.namespace,
                database: &config.database,
                username: &auth.username,
                password: &auth.password,
            })
            .await
            .map_err(|e| StateError::Connection(format!("DB auth failed: {e}")))?;
        }
    }

    db.use_ns(config.namespace.as_str())
        .use_db(config.database.as_str())
        .await
        .map_err(|e| StateError::Connection(e.to_string()))?;

    info!("SurrealDB connected");
    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_uses_default_scope() {
        let config = StoreConfig::in_memory();
        assert_eq!(config.url, "mem://");
        assert_eq!(config.namespace, "registrar");
        assert_eq!(config.database, "main");
        assert!(config.auth.is_none());
    }

    #[test]
    fn local_dir_only_for_surrealkv() {
        assert_eq!(
            StoreConfig::url("surrealkv://data/db").local_dir(),
            Some("data/db")
        );
        assert_eq!(StoreConfig::url("ws://localhost:8000").local_dir(), None);
    }
}
