// ABOUTME: Database operations for exchange records and user verification
// ABOUTME: SQLite-backed stores used as best-effort sidecars by the relay
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chat Gateway Contributors

//! # Persistence Layer
//!
//! SQLite-backed stores for the gateway. Persistence is optional
//! infrastructure: when no database is configured the gateway runs without
//! one and every persistence call site becomes a no-op. All methods return
//! [`AppResult`]; best-effort semantics (log and continue) live at the call
//! sites, not here.
//!
//! There is no transactional guarantee between `insert_exchange` and
//! `update_exchange`. A crash between them leaves an orphaned record with no
//! conversation text, which is acceptable.

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};

use crate::errors::{AppError, AppResult};

// ============================================================================
// Record Types
// ============================================================================

/// One relayed exchange, created before the upstream call and completed after
///
/// Owned exclusively by a single in-flight request handler invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRecord {
    /// Assigned by the database on insert; `None` until then
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Trimmed user prompt
    pub prompt: String,
    /// Client device descriptor
    pub device: String,
    /// Client username
    pub username: String,
    /// Final assistant text, filled at finalization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation: Option<String>,
    /// Upstream-assigned conversation identifier
    #[serde(rename = "conversationId", skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    /// Upstream-reported completion cause
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

impl ExchangeRecord {
    /// Create a fresh record for an incoming request
    #[must_use]
    pub fn new(prompt: &str, device: &str, username: &str) -> Self {
        Self {
            id: None,
            prompt: prompt.to_owned(),
            device: device.to_owned(),
            username: username.to_owned(),
            conversation: None,
            conversation_id: None,
            finish_reason: None,
        }
    }
}

/// Database representation of a verified (or pending) user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Row id
    pub id: i64,
    /// Username
    pub username: String,
    /// Telephone number
    pub telephone: String,
    /// 1 = active, 0 = pending admin approval
    pub status: i64,
}

// ============================================================================
// Database
// ============================================================================

/// SQLite connection pool with the gateway schema applied
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to the database and ensure the schema exists
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or schema creation fails.
    pub async fn connect(url: &str) -> AppResult<Self> {
        // In-memory SQLite is per-connection; cap the pool so every query
        // sees the same database.
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| AppError::database(format!("Failed to connect to database: {e}")))?;

        let database = Self { pool };
        database.init_schema().await?;
        Ok(database)
    }

    async fn init_schema(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS chat_exchanges (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                prompt TEXT NOT NULL,
                device TEXT NOT NULL,
                username TEXT NOT NULL,
                conversation TEXT,
                conversation_id TEXT,
                finish_reason TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create chat_exchanges: {e}")))?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS userinfo (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL,
                telephone TEXT NOT NULL,
                status INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create userinfo: {e}")))?;

        Ok(())
    }

    /// Exchange record operations
    #[must_use]
    pub fn exchanges(&self) -> ExchangeStore {
        ExchangeStore::new(self.pool.clone())
    }

    /// User verification operations
    #[must_use]
    pub fn users(&self) -> UserStore {
        UserStore::new(self.pool.clone())
    }
}

// ============================================================================
// Exchange Store
// ============================================================================

/// Exchange record operations (persistence sidecar)
pub struct ExchangeStore {
    pool: SqlitePool,
}

impl ExchangeStore {
    /// Create a new exchange store
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new exchange record, returning the assigned id
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn insert_exchange(&self, record: &ExchangeRecord) -> AppResult<i64> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            r"
            INSERT INTO chat_exchanges (prompt, device, username, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            ",
        )
        .bind(&record.prompt)
        .bind(&record.device)
        .bind(&record.username)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to insert exchange: {e}")))?;

        Ok(result.last_insert_rowid())
    }

    /// Update an exchange record with its final conversation state
    ///
    /// # Errors
    ///
    /// Returns an error if the record has no id or the database operation
    /// fails.
    pub async fn update_exchange(&self, record: &ExchangeRecord) -> AppResult<()> {
        let id = record
            .id
            .ok_or_else(|| AppError::database("Exchange record has no id"))?;
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            r"
            UPDATE chat_exchanges
            SET conversation = $1, conversation_id = $2, finish_reason = $3, updated_at = $4
            WHERE id = $5
            ",
        )
        .bind(&record.conversation)
        .bind(&record.conversation_id)
        .bind(&record.finish_reason)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update exchange: {e}")))?;

        Ok(())
    }

    /// Fetch an exchange by id
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn get_exchange(&self, id: i64) -> AppResult<Option<ExchangeRecord>> {
        let row = sqlx::query(
            r"
            SELECT id, prompt, device, username, conversation, conversation_id, finish_reason
            FROM chat_exchanges WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to fetch exchange: {e}")))?;

        Ok(row.map(|row| ExchangeRecord {
            id: Some(row.get("id")),
            prompt: row.get("prompt"),
            device: row.get("device"),
            username: row.get("username"),
            conversation: row.get("conversation"),
            conversation_id: row.get("conversation_id"),
            finish_reason: row.get("finish_reason"),
        }))
    }

    /// Count stored exchanges
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn count_exchanges(&self) -> AppResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM chat_exchanges")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to count exchanges: {e}")))?;
        Ok(row.get("n"))
    }
}

// ============================================================================
// User Store
// ============================================================================

/// User verification operations
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    /// Create a new user store
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find an active user matching both username and telephone
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn find_active_user(
        &self,
        username: &str,
        telephone: &str,
    ) -> AppResult<Option<UserRecord>> {
        let row = sqlx::query(
            r"
            SELECT id, username, telephone, status
            FROM userinfo WHERE username = $1 AND telephone = $2 AND status = 1
            ",
        )
        .bind(username)
        .bind(telephone)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to look up user: {e}")))?;

        Ok(row.map(|row| UserRecord {
            id: row.get("id"),
            username: row.get("username"),
            telephone: row.get("telephone"),
            status: row.get("status"),
        }))
    }

    /// Insert a disabled user record awaiting admin approval
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn insert_pending_user(&self, username: &str, telephone: &str) -> AppResult<()> {
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            r"
            INSERT INTO userinfo (username, telephone, status, created_at)
            VALUES ($1, $2, 0, $3)
            ",
        )
        .bind(username)
        .bind(telephone)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to insert pending user: {e}")))?;

        Ok(())
    }

    /// Activate a user (admin operation; used by tests and tooling)
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn activate_user(&self, username: &str, telephone: &str) -> AppResult<()> {
        sqlx::query("UPDATE userinfo SET status = 1 WHERE username = $1 AND telephone = $2")
            .bind(username)
            .bind(telephone)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to activate user: {e}")))?;
        Ok(())
    }
}
