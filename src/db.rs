// src/db.rs
//! Postgres-backed session store, shared by every server instance.
//!
//! One row per session: the whole record as JSONB plus the version column
//! used for conditional writes. No change feed, so participants rely on
//! polling.
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{Pool, Postgres, Row};
use tracing::{debug, info};

use crate::error::{Result, SessionError};
use crate::models::SessionRecord;
use crate::store::SessionStore;

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<Pool<Postgres>> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}

pub struct PgSessionStore {
    pool: Pool<Postgres>,
}

impl PgSessionStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                version BIGINT NOT NULL,
                record JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        info!("sessions table ready");
        Ok(())
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        let row = sqlx::query("SELECT version, record FROM sessions WHERE id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let version: i64 = row.try_get("version")?;
        let Json(mut record): Json<SessionRecord> = row.try_get("record")?;
        record.version = version as u64;
        Ok(Some(record))
    }

    async fn put(&self, session_id: &str, record: Option<SessionRecord>) -> Result<u64> {
        let Some(mut record) = record else {
            sqlx::query("DELETE FROM sessions WHERE id = $1")
                .bind(session_id)
                .execute(&self.pool)
                .await?;
            debug!(session_id, "session deleted");
            return Ok(0);
        };

        let expected = record.version;
        record.version = expected + 1;
        let version = record.version as i64;

        let result = if expected == 0 {
            sqlx::query(
                r#"
                INSERT INTO sessions (id, version, record)
                VALUES ($1, $2, $3)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(session_id)
            .bind(version)
            .bind(Json(&record))
            .execute(&self.pool)
            .await?
        } else {
            sqlx::query(
                r#"
                UPDATE sessions
                SET version = $2, record = $3, updated_at = now()
                WHERE id = $1 AND version = $4
                "#,
            )
            .bind(session_id)
            .bind(version)
            .bind(Json(&record))
            .bind(expected as i64)
            .execute(&self.pool)
            .await?
        };

        if result.rows_affected() == 0 {
            return Err(SessionError::Conflict(session_id.to_string()));
        }
        debug!(session_id, version, "session stored");
        Ok(record.version)
    }
}
