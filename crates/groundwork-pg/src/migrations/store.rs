use std::future::Future;
use std::pin::Pin;

use sqlx::PgPool;

use groundwork_core::error::{GroundworkError, Result};

/// Durable, append-only record of applied migration state.
///
/// One row per (subject, version reached); a subject's current version is
/// the maximum version recorded for it. Rows are never updated or deleted,
/// so the full history of every run is retained.
pub trait ProgressStore: Send + Sync {
    /// Create the tracking table if it does not exist. Idempotent and safe
    /// to call across process restarts.
    fn ensure_schema(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// The highest version recorded for `subject`, or `None` if the subject
    /// has no records.
    fn current_version<'a>(
        &'a self,
        subject: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + 'a>>;

    /// Record that `subject` reached `version`. Insert-only; each call is
    /// durable on return.
    fn append<'a>(
        &'a self,
        subject: &'a str,
        version: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Progress store backed by the `groundwork_migrations` table.
pub struct PgProgressStore {
    pool: PgPool,
}

impl PgProgressStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ProgressStore for PgProgressStore {
    fn ensure_schema(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            sqlx::query(
                r#"
                CREATE TABLE IF NOT EXISTS groundwork_migrations (
                    subject TEXT NOT NULL,
                    version TEXT NOT NULL
                )
                "#,
            )
            .execute(&self.pool)
            .await
            .map_err(|e| {
                GroundworkError::Store(format!("Failed to create tracking table: {}", e))
            })?;
            Ok(())
        })
    }

    fn current_version<'a>(
        &'a self,
        subject: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + 'a>> {
        Box::pin(async move {
            let version: Option<String> = sqlx::query_scalar(
                "SELECT MAX(version) FROM groundwork_migrations WHERE subject = $1",
            )
            .bind(subject)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                GroundworkError::Store(format!(
                    "Failed to query current version for '{}': {}",
                    subject, e
                ))
            })?;

            Ok(version)
        })
    }

    fn append<'a>(
        &'a self,
        subject: &'a str,
        version: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            sqlx::query("INSERT INTO groundwork_migrations (subject, version) VALUES ($1, $2)")
                .bind(subject)
                .bind(version)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    GroundworkError::Store(format!(
                        "Failed to record progress for '{}': {}",
                        subject, e
                    ))
                })?;
            Ok(())
        })
    }
}
