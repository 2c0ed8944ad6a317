//! Startup integration: pool wiring plus the migration run.

use std::sync::Arc;

use tracing::info;

use groundwork_core::config::GroundworkConfig;
use groundwork_core::error::Result;
use groundwork_core::migration::Migration;

use crate::db::Database;
use crate::migrations::{MigrationEngine, PgProgressStore};

/// The assembled application surface: every configured pool plus the
/// migration entry point.
///
/// Hosts connect once at startup, hand their registered migration units to
/// [`run_migrations`](Self::run_migrations), and begin serving only after it
/// returns.
pub struct Groundwork {
    config: GroundworkConfig,
    db: Database,
}

impl Groundwork {
    /// Connect every configured pool.
    pub async fn connect(config: GroundworkConfig) -> Result<Self> {
        let db = Database::connect(&config).await?;
        Ok(Self { config, db })
    }

    /// The connection pools.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Run every registered migration unit once.
    ///
    /// The progress store lives on the connection named by
    /// `[migrations] connection`, or on the default connection when unset.
    /// Units apply against whatever connections they were constructed with;
    /// the engine imposes no transactional coupling between a unit's work
    /// and the progress record.
    pub async fn run_migrations(&self, units: Vec<Arc<dyn Migration>>) -> Result<()> {
        let store_pool = match &self.config.migrations.connection {
            Some(name) => self.db.pool(name)?,
            None => self.db.default_pool()?,
        };

        info!("Running migrations for {} registered unit(s)", units.len());
        MigrationEngine::new(PgProgressStore::new(store_pool.clone()), units)
            .run()
            .await
    }

    /// Close every pool.
    pub async fn shutdown(&self) {
        self.db.close().await;
    }
}
