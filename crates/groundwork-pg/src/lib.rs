pub mod db;
pub mod migrations;
pub mod runtime;

pub use db::Database;
pub use migrations::{MigrationEngine, PgProgressStore, ProgressStore, SqlMigration};
pub use runtime::Groundwork;
