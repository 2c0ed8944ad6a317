use thiserror::Error;

/// Core error type for groundwork operations.
#[derive(Error, Debug)]
pub enum GroundworkError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    /// The progress store could not be reached or its schema could not be
    /// ensured. Fatal to a migration run: no subject can proceed without
    /// durable tracking.
    #[error("Progress store error: {0}")]
    Store(String),

    /// An identity could not be resolved into a subject and version.
    #[error("Malformed migration identity: {0}")]
    MalformedIdentity(String),

    /// One or more subjects failed during a migration run. Subjects are
    /// attempted independently; this carries every failure, not just the
    /// first.
    #[error("Migration run failed for {} subject(s): {}", .0.len(), summarize(.0))]
    MigrationsFailed(Vec<SubjectFailure>),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),
}

/// Failure of a single subject's batch within a migration run.
///
/// `version` is the version of the unit whose `apply()` failed; units
/// earlier in the batch have already taken effect and are not rolled back.
#[derive(Error, Debug)]
#[error("subject '{subject}' failed at version '{version}': {source}")]
pub struct SubjectFailure {
    pub subject: String,
    pub version: String,
    #[source]
    pub source: Box<GroundworkError>,
}

fn summarize(failures: &[SubjectFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias using GroundworkError.
pub type Result<T> = std::result::Result<T, GroundworkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_display_lists_every_subject() {
        let err = GroundworkError::MigrationsFailed(vec![
            SubjectFailure {
                subject: "accounts".to_string(),
                version: "2".to_string(),
                source: Box::new(GroundworkError::Database("boom".to_string())),
            },
            SubjectFailure {
                subject: "billing".to_string(),
                version: "20240201".to_string(),
                source: Box::new(GroundworkError::Database("bang".to_string())),
            },
        ]);

        let message = err.to_string();
        assert!(message.contains("2 subject(s)"));
        assert!(message.contains("accounts"));
        assert!(message.contains("billing"));
        assert!(message.contains("20240201"));
    }
}
