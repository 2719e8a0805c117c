//! Store connection management with lazy initialization.

use std::sync::LazyLock;
use surrealdb::Surreal;
use surrealdb::engine::any::{Any, connect};
use surrealdb::opt::auth::Root;
use thiserror::Error;
use tokio::sync::OnceCell;

/// Global store instance using lazy initialization.
static DB: LazyLock<OnceCell<Surreal<Any>>> = LazyLock::new(OnceCell::new);

/// Store connection wrapper.
pub type Database = Surreal<Any>;

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Connection mode: "mem://" or "rocksdb://path"
    pub endpoint: String,
    /// Namespace to use
    pub namespace: String,
    /// Database name to use
    pub database: String,
    /// Optional root credentials for authentication
    pub credentials: Option<(String, String)>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: "mem://".to_string(),
            namespace: "indexer".to_string(),
            database: "main".to_string(),
            credentials: None,
        }
    }
}

impl StoreConfig {
    /// Create a config for in-memory use (tests, local dev).
    pub fn memory() -> Self {
        Self::default()
    }

    /// Create a config for RocksDB persistence.
    #[cfg(feature = "rocksdb")]
    pub fn rocksdb(path: impl Into<String>) -> Self {
        Self {
            endpoint: format!("rocksdb://{}", path.into()),
            ..Default::default()
        }
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the database name.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set root credentials for authentication.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }
}

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store not initialized - call store::init first")]
    NotInitialized,
    #[error("connection error: {0}")]
    Connection(#[from] surrealdb::Error),
    #[error("query error: {0}")]
    Query(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Initialize the store connection.
///
/// This should be called once at application startup before any store
/// operations.
pub async fn init_store(config: StoreConfig) -> Result<&'static Database, StoreError> {
    DB.get_or_try_init(|| async {
        tracing::info!("Connecting to store: {}", config.endpoint);

        let db = connect(&config.endpoint).await?;

        // Authenticate if credentials provided
        if let Some((username, password)) = &config.credentials {
            db.signin(Root { username, password }).await?;
        }

        // Select namespace and database
        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        tracing::info!(
            "Connected to store: {}/{}",
            config.namespace,
            config.database
        );

        Ok(db)
    })
    .await
}

/// Get the store connection.
///
/// Returns an error if the store hasn't been initialized yet.
pub fn get_db() -> Result<&'static Database, StoreError> {
    DB.get().ok_or(StoreError::NotInitialized)
}
