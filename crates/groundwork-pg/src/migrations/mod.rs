mod engine;
mod sql;
mod store;

pub use engine::MigrationEngine;
pub use sql::SqlMigration;
pub use store::{PgProgressStore, ProgressStore};
