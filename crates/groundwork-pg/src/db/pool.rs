use std::collections::{HashMap, HashSet};
use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

use groundwork_core::config::GroundworkConfig;
use groundwork_core::error::{GroundworkError, Result};

/// The set of connection pools assembled from configuration.
///
/// Each `[[connections]]` entry yields one pool, looked up by name. A single
/// unnamed entry becomes the default pool.
#[derive(Debug)]
pub struct Database {
    default: Option<PgPool>,
    named: HashMap<String, PgPool>,
}

impl Database {
    /// Build every configured pool.
    pub async fn connect(config: &GroundworkConfig) -> Result<Self> {
        validate_names(config)?;

        let mut default = None;
        let mut named = HashMap::new();

        for conn in &config.connections {
            let size = conn.pool_size.unwrap_or(config.defaults.pool_size);
            let timeout = conn
                .pool_timeout_secs
                .unwrap_or(config.defaults.pool_timeout_secs);

            let pool = Self::create_pool(&conn.url(), size, timeout)
                .await
                .map_err(|e| {
                    GroundworkError::Database(format!(
                        "Failed to connect to '{}': {}",
                        conn.display_name(),
                        e
                    ))
                })?;

            match &conn.name {
                Some(name) => {
                    named.insert(name.clone(), pool);
                }
                None => {
                    default = Some(pool);
                }
            }
        }

        Ok(Self { default, named })
    }

    /// Create a connection pool with the given parameters.
    async fn create_pool(url: &str, size: u32, timeout_secs: u64) -> sqlx::Result<PgPool> {
        PgPoolOptions::new()
            .max_connections(size)
            .acquire_timeout(Duration::from_secs(timeout_secs))
            .connect(url)
            .await
    }

    /// Get a pool by connection name.
    pub fn pool(&self, name: &str) -> Result<&PgPool> {
        self.named
            .get(name)
            .ok_or_else(|| GroundworkError::NotFound(format!("connection '{}'", name)))
    }

    /// Get the default (unnamed) pool.
    pub fn default_pool(&self) -> Result<&PgPool> {
        self.default
            .as_ref()
            .ok_or_else(|| GroundworkError::NotFound("default connection".to_string()))
    }

    /// Check connectivity on every pool.
    pub async fn health_check(&self) -> Result<()> {
        for pool in self.pools() {
            sqlx::query("SELECT 1")
                .execute(pool)
                .await
                .map_err(|e| GroundworkError::Database(format!("Health check failed: {}", e)))?;
        }
        Ok(())
    }

    /// Close all pools gracefully.
    pub async fn close(&self) {
        for pool in self.pools() {
            pool.close().await;
        }
    }

    fn pools(&self) -> impl Iterator<Item = &PgPool> {
        self.default.iter().chain(self.named.values())
    }
}

/// Reject duplicate connection names before any pool is opened.
fn validate_names(config: &GroundworkConfig) -> Result<()> {
    let mut seen = HashSet::new();
    let mut unnamed = 0;

    for conn in &config.connections {
        match &conn.name {
            Some(name) => {
                if !seen.insert(name.as_str()) {
                    return Err(GroundworkError::Config(format!(
                        "Duplicate connection name '{}'",
                        name
                    )));
                }
            }
            None => {
                unnamed += 1;
                if unnamed > 1 {
                    return Err(GroundworkError::Config(
                        "More than one unnamed connection".to_string(),
                    ));
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use groundwork_core::config::ConnectionConfig;

    // Connectivity is covered by the integration tests; these exercise the
    // configuration validation, which runs before any pool is opened.

    fn connection(name: Option<&str>) -> ConnectionConfig {
        ConnectionConfig {
            name: name.map(String::from),
            host: "localhost".to_string(),
            port: None,
            user: "app".to_string(),
            password: None,
            dbname: "appdb".to_string(),
            pool_size: None,
            pool_timeout_secs: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_names_rejected() {
        let config = GroundworkConfig {
            connections: vec![connection(Some("main")), connection(Some("main"))],
            ..Default::default()
        };

        let err = Database::connect(&config).await.unwrap_err();
        assert!(matches!(err, GroundworkError::Config(_)));
    }

    #[tokio::test]
    async fn test_second_unnamed_connection_rejected() {
        let config = GroundworkConfig {
            connections: vec![connection(None), connection(None)],
            ..Default::default()
        };

        let err = Database::connect(&config).await.unwrap_err();
        assert!(matches!(err, GroundworkError::Config(_)));
    }

    #[tokio::test]
    async fn test_empty_config_has_no_pools() {
        let db = Database::connect(&GroundworkConfig::default()).await.unwrap();
        assert!(db.default_pool().is_err());
        assert!(db.pool("main").is_err());
        db.health_check().await.unwrap();
    }
}
