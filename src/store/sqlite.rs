use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::errors::TrustLensError;
use crate::models::{TrustVerdict, UrlId};
use super::VerdictStore;

/// SQLite-backed verdict store and block registry.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new(path: &str) -> Result<Self, TrustLensError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| TrustLensError::Database(format!("Failed to open database: {}", e)))?;

        // WAL keeps readers unblocked while a verdict write is in progress
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| TrustLensError::Database(format!("Failed to set pragmas: {}", e)))?;

        let store = Self { conn: Arc::new(Mutex::new(conn)) };
        store.initialize()?;
        debug!(path = %path, "Verdict store opened");
        Ok(store)
    }

    pub fn in_memory() -> Result<Self, TrustLensError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| TrustLensError::Database(format!("Failed to open in-memory db: {}", e)))?;
        let store = Self { conn: Arc::new(Mutex::new(conn)) };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> Result<(), TrustLensError> {
        let conn = self.lock()?;
        conn.execute_batch(super::schema::CREATE_TABLES)
            .map_err(|e| TrustLensError::Database(format!("Failed to create tables: {}", e)))?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, TrustLensError> {
        self.conn
            .lock()
            .map_err(|_| TrustLensError::Database("Connection lock poisoned".into()))
    }

    pub fn load(&self, id: &UrlId) -> Result<Option<TrustVerdict>, TrustLensError> {
        let conn = self.lock()?;
        let json: Option<String> = conn
            .query_row(
                "SELECT verdict_json FROM verdicts WHERE id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| TrustLensError::Database(format!("Query error: {}", e)))?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn save(&self, verdict: &TrustVerdict) -> Result<(), TrustLensError> {
        let json = serde_json::to_string(verdict)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO verdicts (id, url, overall, verdict_json, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                verdict.id.as_str(),
                verdict.url,
                verdict.overall.as_str(),
                json,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| TrustLensError::Database(format!("Insert failed: {}", e)))?;
        Ok(())
    }

    pub fn blocked(&self, id: &UrlId) -> Result<bool, TrustLensError> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM blocked WHERE id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .map_err(|e| TrustLensError::Database(format!("Query error: {}", e)))?;
        Ok(count > 0)
    }

    pub fn save_blocked(&self, verdict: &TrustVerdict, user_id: Option<&str>) -> Result<(), TrustLensError> {
        let json = serde_json::to_string(verdict)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO blocked (id, url, domain, user_id, verdict_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                verdict.id.as_str(),
                verdict.url,
                verdict.domain,
                user_id,
                json,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| TrustLensError::Database(format!("Insert failed: {}", e)))?;
        Ok(())
    }
}

impl Clone for SqliteStore {
    fn clone(&self) -> Self {
        Self { conn: self.conn.clone() }
    }
}

#[async_trait]
impl VerdictStore for SqliteStore {
    async fn get(&self, id: &UrlId) -> Result<Option<TrustVerdict>, TrustLensError> {
        self.load(id)
    }

    async fn put(&self, verdict: &TrustVerdict) -> Result<(), TrustLensError> {
        self.save(verdict)
    }

    async fn is_blocked(&self, id: &UrlId) -> Result<bool, TrustLensError> {
        self.blocked(id)
    }

    async fn record_blocked(&self, verdict: &TrustVerdict, user_id: Option<&str>) -> Result<(), TrustLensError> {
        self.save_blocked(verdict, user_id)
    }
}
