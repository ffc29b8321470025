//! Opening the SQLite pool and stepping the schema forward.

use crate::error::DatabaseError;
use crate::{Error, Result};
use sqlx::SqliteConnection;
use sqlx::sqlite::SqlitePool;
use std::path::Path;

use super::Database;

/// Wrap an sqlx error as a migration failure with context
fn migration_failed(context: &'static str) -> impl FnOnce(sqlx::Error) -> Error {
    move |e| Error::Database(DatabaseError::MigrationFailed(format!("{context}: {e}")))
}

/// Wrap an sqlx error as a connection failure with context
fn connection_failed(context: &'static str) -> impl FnOnce(sqlx::Error) -> Error {
    move |e| Error::Database(DatabaseError::ConnectionFailed(format!("{context}: {e}")))
}

impl Database {
    /// Open (creating if necessary) the database at `path` and bring its
    /// schema up to date
    pub async fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::Database(DatabaseError::ConnectionFailed(format!(
                    "Failed to create database directory: {e}"
                )))
            })?;
        }

        use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
        use std::str::FromStr;

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(connection_failed("Failed to parse database path"))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(connection_failed("Failed to connect to database"))?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Apply any schema migrations newer than the stored version
    async fn run_migrations(&self) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(connection_failed("Failed to acquire connection"))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(migration_failed("Failed to create schema_version table"))?;

        let current: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
            .fetch_optional(&mut *conn)
            .await
            .map_err(migration_failed("Failed to query schema version"))?;
        let current = current.unwrap_or(0);

        if current < 1 {
            Self::apply(&mut conn, 1, Self::migrate_v1_sessions).await?;
        }
        if current < 2 {
            Self::apply(&mut conn, 2, Self::migrate_v2_settings).await?;
        }

        Ok(())
    }

    /// Run one migration step inside a transaction and record its version
    ///
    /// A partial failure rolls back, leaving the stored version untouched so
    /// the step re-runs on the next start.
    async fn apply<F>(conn: &mut SqliteConnection, version: i32, step: F) -> Result<()>
    where
        F: AsyncFnOnce(&mut SqliteConnection) -> Result<()>,
    {
        tracing::info!(version, "Applying database migration");

        sqlx::query("BEGIN")
            .execute(&mut *conn)
            .await
            .map_err(migration_failed("Failed to begin transaction"))?;

        let result = async {
            step(&mut *conn).await?;

            let now = chrono::Utc::now().timestamp();
            sqlx::query("INSERT INTO schema_version (version, applied_at) VALUES (?, ?)")
                .bind(version)
                .bind(now)
                .execute(&mut *conn)
                .await
                .map_err(migration_failed("Failed to record migration"))?;
            Ok::<(), Error>(())
        }
        .await;

        match result {
            Ok(()) => {
                sqlx::query("COMMIT")
                    .execute(&mut *conn)
                    .await
                    .map_err(migration_failed("Failed to commit migration"))?;
                tracing::info!(version, "Database migration complete");
                Ok(())
            }
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Err(e)
            }
        }
    }

    /// v1: sessions and session_items
    async fn migrate_v1_sessions(conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                reference TEXT NOT NULL,
                output_dir TEXT NOT NULL,
                zip_path TEXT,
                total INTEGER NOT NULL,
                completed INTEGER NOT NULL DEFAULT 0,
                skipped INTEGER NOT NULL DEFAULT 0,
                failed INTEGER NOT NULL DEFAULT 0,
                started_at INTEGER NOT NULL,
                finished_at INTEGER
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(migration_failed("Failed to create sessions table"))?;

        sqlx::query("CREATE INDEX idx_sessions_started ON sessions(started_at DESC)")
            .execute(&mut *conn)
            .await
            .map_err(migration_failed("Failed to create sessions index"))?;

        sqlx::query(
            r#"
            CREATE TABLE session_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id INTEGER NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
                position INTEGER NOT NULL,
                input TEXT NOT NULL,
                status INTEGER NOT NULL DEFAULT 0,
                title TEXT,
                identifier TEXT,
                reason TEXT,
                UNIQUE(session_id, position)
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(migration_failed("Failed to create session_items table"))?;

        sqlx::query("CREATE INDEX idx_items_session ON session_items(session_id)")
            .execute(&mut *conn)
            .await
            .map_err(migration_failed("Failed to create items index"))?;

        sqlx::query("CREATE INDEX idx_items_status ON session_items(session_id, status)")
            .execute(&mut *conn)
            .await
            .map_err(migration_failed("Failed to create items status index"))?;

        Ok(())
    }

    /// v2: key/value settings
    async fn migrate_v2_settings(conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(migration_failed("Failed to create settings table"))?;

        Ok(())
    }

    /// Close the pool, flushing outstanding writes
    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Borrow the underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
