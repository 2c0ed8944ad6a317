pub mod config;
pub mod error;
pub mod migration;

#[cfg(feature = "testing")]
pub mod testing;

pub use config::GroundworkConfig;
pub use error::{GroundworkError, Result, SubjectFailure};
pub use migration::{split_identity, Migration, MigrationIdentity, NamedMigration};
