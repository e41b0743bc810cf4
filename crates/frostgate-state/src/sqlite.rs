use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use frostgate_core::{ensure_transition, CollectionState, CoreError, CoreResult};
use sqlx::migrate::MigrateError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{query, Row, SqlitePool};

use crate::StateStore;

/// Embedded SQL migrations for the state database.
pub const MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Creates a SQLite connection pool configured for state-store workloads.
pub async fn create_sqlite_pool(
    database_url: &str,
    max_connections: u32,
) -> Result<SqlitePool, sqlx::Error> {
    let options = database_url
        .parse::<SqliteConnectOptions>()?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
}

/// Runs all outstanding migrations against the provided connection pool.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

/// SQLite-backed state store.
pub struct SqliteStateStore {
    pool: SqlitePool,
}

impl SqliteStateStore {
    /// Creates a new store backed by the provided pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Returns the underlying pool (useful for composing with other services).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn upsert(&self, name: &str, state: CollectionState) -> CoreResult<()> {
        query(
            r#"
            INSERT INTO collection_state (collection, state, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (collection)
            DO UPDATE SET state = excluded.state, updated_at = excluded.updated_at
            "#,
        )
        .bind(name)
        .bind(state.as_str())
        .bind(format_ts(Utc::now()))
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(storage_err)
    }
}

fn storage_err(err: sqlx::Error) -> CoreError {
    CoreError::StorageError(err.to_string())
}

// RFC 3339 with fixed millisecond precision: lexicographic order matches
// chronological order, so cutoffs can be bound as plain strings.
fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn get(&self, name: &str) -> CoreResult<Option<CollectionState>> {
        let row = query("SELECT state FROM collection_state WHERE collection = ?1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;

        match row {
            Some(row) => {
                let state: String = row.try_get("state").map_err(storage_err)?;
                Ok(Some(CollectionState::from_str(&state)?))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, name: &str, state: CollectionState) -> CoreResult<()> {
        let current = self.get(name).await?;
        ensure_transition(name, current, state)?;
        self.upsert(name, state).await
    }

    async fn force_set(&self, name: &str, state: CollectionState) -> CoreResult<()> {
        self.upsert(name, state).await
    }

    async fn exists(&self, name: &str) -> CoreResult<bool> {
        let row = query("SELECT COUNT(1) AS n FROM collection_state WHERE collection = ?1")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;
        let count: i64 = row.try_get("n").map_err(storage_err)?;
        Ok(count > 0)
    }

    async fn touch(&self, name: &str) -> CoreResult<()> {
        query("UPDATE collection_state SET last_accessed_at = ?1 WHERE collection = ?2")
            .bind(format_ts(Utc::now()))
            .bind(name)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(storage_err)
    }

    async fn list_idle_since(&self, idle_for: Duration) -> CoreResult<Vec<String>> {
        let cutoff = format_ts(Utc::now() - idle_for);
        let rows = query(
            r#"
            SELECT collection
            FROM collection_state
            WHERE state = 'hot'
              AND last_accessed_at IS NOT NULL
              AND last_accessed_at < ?1
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("collection").map_err(storage_err))
            .collect()
    }

    async fn was_recently_accessed(&self, name: &str, window: Duration) -> CoreResult<bool> {
        let cutoff = format_ts(Utc::now() - window);
        let row = query(
            r#"
            SELECT COUNT(1) AS n
            FROM collection_state
            WHERE collection = ?1
              AND last_accessed_at IS NOT NULL
              AND last_accessed_at > ?2
            "#,
        )
        .bind(name)
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_err)?;
        let count: i64 = row.try_get("n").map_err(storage_err)?;
        Ok(count > 0)
    }

    async fn count_by_state(&self) -> CoreResult<HashMap<CollectionState, i64>> {
        let rows = query(
            r#"
            SELECT state, COUNT(1) AS n
            FROM collection_state
            GROUP BY state
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        let mut out = HashMap::new();
        for row in rows {
            let state: String = row.try_get("state").map_err(storage_err)?;
            let count: i64 = row.try_get("n").map_err(storage_err)?;
            out.insert(CollectionState::from_str(&state)?, count);
        }
        Ok(out)
    }
}
