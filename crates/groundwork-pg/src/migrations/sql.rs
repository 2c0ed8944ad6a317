use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use sqlx::PgPool;
use tracing::debug;

use groundwork_core::error::{GroundworkError, Result};
use groundwork_core::migration::{split_identity, Migration};

/// A migration unit backed by a SQL script.
///
/// The script may contain multiple statements; they are executed one by one
/// against the target pool, respecting dollar-quoted bodies such as PL/pgSQL
/// functions.
#[derive(Debug)]
pub struct SqlMigration {
    subject: String,
    version: String,
    sql: String,
    pool: PgPool,
}

impl SqlMigration {
    pub fn new(
        subject: impl Into<String>,
        version: impl Into<String>,
        sql: impl Into<String>,
        pool: PgPool,
    ) -> Self {
        Self {
            subject: subject.into(),
            version: version.into(),
            sql: sql.into(),
            pool,
        }
    }

    /// Build a unit from a declared identity such as `"billing_20240101"`.
    pub fn from_identity(identity: &str, sql: impl Into<String>, pool: PgPool) -> Result<Self> {
        let identity = split_identity(identity)?;
        Ok(Self::new(identity.subject, identity.version, sql, pool))
    }

    /// Load every `<subject>_<version>.sql` file in a directory.
    ///
    /// File stems are split into subject and version at the last `_`, so
    /// `accounts_0002.sql` belongs to subject `accounts` at version `0002`.
    /// A stem that cannot be split is a fatal error. Returns an empty list
    /// if the directory does not exist.
    pub fn load_dir(dir: &Path, pool: &PgPool) -> Result<Vec<SqlMigration>> {
        if !dir.exists() {
            debug!("Migrations directory does not exist: {:?}", dir);
            return Ok(Vec::new());
        }

        let mut migrations = Vec::new();

        for entry in std::fs::read_dir(dir).map_err(GroundworkError::Io)? {
            let path = entry.map_err(GroundworkError::Io)?.path();

            if !path.extension().map(|e| e == "sql").unwrap_or(false) {
                continue;
            }

            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| GroundworkError::Config("Invalid migration filename".into()))?;
            let identity = split_identity(stem)?;

            let sql = std::fs::read_to_string(&path).map_err(GroundworkError::Io)?;

            migrations.push(Self::new(identity.subject, identity.version, sql, pool.clone()));
        }

        // Deterministic load order; per-subject ordering is the engine's job
        migrations.sort_by(|a, b| {
            (a.subject.as_str(), a.version.as_str()).cmp(&(b.subject.as_str(), b.version.as_str()))
        });

        debug!("Loaded {} SQL migration(s)", migrations.len());
        Ok(migrations)
    }
}

impl Migration for SqlMigration {
    fn subject(&self) -> Result<String> {
        Ok(self.subject.clone())
    }

    fn version(&self) -> Result<String> {
        Ok(self.version.clone())
    }

    fn apply(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for statement in split_sql_statements(&self.sql) {
                let statement = statement.trim();

                // Skip comment-only blocks
                if statement.lines().all(|l| {
                    let l = l.trim();
                    l.is_empty() || l.starts_with("--")
                }) {
                    continue;
                }

                sqlx::query(statement).execute(&self.pool).await.map_err(|e| {
                    GroundworkError::Database(format!(
                        "Failed to apply {}@{}: {}",
                        self.subject, self.version, e
                    ))
                })?;
            }
            Ok(())
        })
    }
}

/// Split SQL into individual statements, respecting dollar-quoted strings.
/// This handles PL/pgSQL bodies that contain semicolons inside $$ delimiters.
fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut open_tag: Option<String> = None;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);

        if c == '$' {
            // Scan a possible delimiter tag: `$`, identifier chars, `$`
            let mut tag = String::from("$");
            while let Some(&next) = chars.peek() {
                if next == '$' || next.is_alphanumeric() || next == '_' {
                    tag.push(next);
                    current.push(next);
                    chars.next();
                    if next == '$' {
                        break;
                    }
                } else {
                    break;
                }
            }

            if tag.len() >= 2 && tag.ends_with('$') {
                match &open_tag {
                    Some(open) if *open == tag => open_tag = None,
                    None => open_tag = Some(tag),
                    Some(_) => {}
                }
            }
        } else if c == ';' && open_tag.is_none() {
            push_statement(&mut statements, &current);
            current.clear();
        }
    }

    // The last statement might not end with ;
    push_statement(&mut statements, &current);
    statements
}

fn push_statement(statements: &mut Vec<String>, raw: &str) {
    let statement = raw.trim().trim_end_matches(';').trim();
    if !statement.is_empty() {
        statements.push(statement.to_string());
    }
}
