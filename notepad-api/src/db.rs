//! Database Connection Pool Module
//!
//! This module provides PostgreSQL connection pooling using deadpool-postgres
//! and the PostgreSQL implementation of [`NoteStore`].
//!
//! The unique index on `notes.short_code` is the source of truth for code
//! uniqueness. Unique violations surface as [`StoreError::Conflict`].

use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use notepad_core::{Note, NoteId, ShortCode, Timestamp};
use notepad_storage::{NoteStore, NoteUpdate, PasswordChange, StoreError, StoreResult};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tokio_postgres::error::SqlState;
use tokio_postgres::{NoTls, Row};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

const SCHEMA_SQL: &str = include_str!("../sql/schema.sql");

const NOTE_COLUMNS: &str = "id, short_code, content, password_hash, created_at, updated_at";

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: SecretString,
    /// Maximum pool size
    pub max_size: usize,
    /// Connection timeout
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "notepad".to_string(),
            user: "postgres".to_string(),
            password: SecretString::new("".into()),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("NOTEPAD_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("NOTEPAD_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("NOTEPAD_DB_NAME").unwrap_or_else(|_| "notepad".to_string()),
            user: std::env::var("NOTEPAD_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: SecretString::new(
                std::env::var("NOTEPAD_DB_PASSWORD")
                    .unwrap_or_default()
                    .into(),
            ),
            max_size: std::env::var("NOTEPAD_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
            timeout: Duration::from_secs(
                std::env::var("NOTEPAD_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.expose_secret().to_string());
        cfg.connect_timeout = Some(self.timeout);

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_cfg = deadpool_postgres::PoolConfig::new(self.max_size);
        pool_cfg.timeouts.wait = Some(self.timeout);
        cfg.pool = Some(pool_cfg);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// DATABASE CLIENT WRAPPER
// ============================================================================

/// Database client that wraps a connection pool and implements the note
/// store against the `notes` table.
#[derive(Clone)]
pub struct DbClient {
    pool: Pool,
}

impl DbClient {
    /// Create a new database client with the given pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a new database client from configuration.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// The underlying pool, shared with the PostgreSQL rate limiter.
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Apply the reference schema. Every statement is idempotent.
    pub async fn ensure_schema(&self) -> ApiResult<()> {
        let conn = self.pool.get().await?;
        conn.batch_execute(SCHEMA_SQL).await?;
        tracing::info!("Database schema ensured");
        Ok(())
    }

    async fn get_conn(&self) -> StoreResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(|e| {
            tracing::error!("Connection pool error: {:?}", e);
            StoreError::backend(format!("pool: {}", e))
        })
    }
}

/// Map a driver error, turning unique violations into conflicts.
fn map_pg_error(err: tokio_postgres::Error, short_code: &str) -> StoreError {
    if err.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        return StoreError::Conflict {
            short_code: short_code.to_string(),
        };
    }
    tracing::error!("Database error: {:?}", err);
    StoreError::backend(err.to_string())
}

fn backend(err: tokio_postgres::Error) -> StoreError {
    tracing::error!("Database error: {:?}", err);
    StoreError::backend(err.to_string())
}

fn note_from_row(row: &Row) -> StoreResult<Note> {
    let id: Uuid = row.try_get("id").map_err(backend)?;
    let short_code: String = row.try_get("short_code").map_err(backend)?;
    let content: String = row.try_get("content").map_err(backend)?;
    let password_hash: Option<String> = row.try_get("password_hash").map_err(backend)?;
    let created_at: Timestamp = row.try_get("created_at").map_err(backend)?;
    let updated_at: Timestamp = row.try_get("updated_at").map_err(backend)?;

    Ok(Note {
        id,
        short_code: ShortCode::from_stored(short_code),
        content,
        password_hash,
        created_at,
        updated_at,
    })
}

#[async_trait]
impl NoteStore for DbClient {
    async fn note_insert(&self, note: &Note) -> StoreResult<()> {
        let conn = self.get_conn().await?;

        conn.execute(
            "INSERT INTO notes (id, short_code, content, password_hash, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
            &[
                &note.id,
                &note.short_code.as_str(),
                &note.content,
                &note.password_hash,
                &note.created_at,
                &note.updated_at,
            ],
        )
        .await
        .map_err(|e| map_pg_error(e, note.short_code.as_str()))?;

        Ok(())
    }

    async fn note_get_by_code(&self, code: &ShortCode) -> StoreResult<Option<Note>> {
        let conn = self.get_conn().await?;

        let row = conn
            .query_opt(
                &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE short_code = $1"),
                &[&code.as_str()],
            )
            .await
            .map_err(backend)?;

        row.as_ref().map(note_from_row).transpose()
    }

    async fn note_code_exists(&self, code: &ShortCode) -> StoreResult<bool> {
        let conn = self.get_conn().await?;

        let row = conn
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM notes WHERE short_code = $1)",
                &[&code.as_str()],
            )
            .await
            .map_err(backend)?;

        row.try_get(0).map_err(backend)
    }

    async fn note_update(&self, id: NoteId, update: NoteUpdate) -> StoreResult<Option<Note>> {
        let conn = self.get_conn().await?;

        let (touch_password, new_hash): (bool, Option<String>) = match update.password {
            PasswordChange::Keep => (false, None),
            PasswordChange::Set(hash) => (true, Some(hash)),
            PasswordChange::Clear => (true, None),
        };
        let new_code = update.short_code.as_ref().map(ShortCode::as_str);

        let row = conn
            .query_opt(
                &format!(
                    "UPDATE notes SET \
                         content = COALESCE($2::text, content), \
                         short_code = COALESCE($3::text, short_code), \
                         password_hash = CASE WHEN $4::boolean THEN $5::text ELSE password_hash END, \
                         updated_at = $6 \
                     WHERE id = $1 \
                     RETURNING {NOTE_COLUMNS}"
                ),
                &[
                    &id,
                    &update.content,
                    &new_code,
                    &touch_password,
                    &new_hash,
                    &update.updated_at,
                ],
            )
            .await
            .map_err(|e| map_pg_error(e, new_code.unwrap_or_default()))?;

        row.as_ref().map(note_from_row).transpose()
    }

    async fn health_check(&self) -> StoreResult<()> {
        let conn = self.get_conn().await?;
        conn.query_one("SELECT 1", &[]).await.map_err(backend)?;
        Ok(())
    }
}
