use std::path::Path;

use async_trait::async_trait;
use deadpool::managed::Object;
use libsql::params;

use super::KeyValueStore;
use super::migrations::run_migrations;
use super::pool::{LibsqlManager, LibsqlPool, build_pool};
use crate::error::StoreError;

/// Key-value store persisted in a libsql database
pub struct LibsqlStore {
    pool: LibsqlPool,
}

impl LibsqlStore {
    /// Open (or create) a local database file
    pub async fn open_local(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Unavailable(format!("{}: {}", parent.display(), e)))?;
        }

        let database = libsql::Builder::new_local(path).build().await?;
        Self::from_database(database).await
    }

    /// Connect to a remote libsql server
    pub async fn open_remote(url: &str, auth_token: &str) -> Result<Self, StoreError> {
        let database =
            libsql::Builder::new_remote(url.to_string(), auth_token.to_string()).build().await?;
        Self::from_database(database).await
    }

    async fn from_database(database: libsql::Database) -> Result<Self, StoreError> {
        let store = Self { pool: build_pool(database)? };
        let conn = store.get_conn().await?;
        run_migrations(&conn).await?;
        drop(conn);

        Ok(store)
    }

    async fn get_conn(&self) -> Result<Object<LibsqlManager>, StoreError> {
        self.pool.get().await.map_err(|e| StoreError::Pool(e.to_string()))
    }
}

#[async_trait]
impl KeyValueStore for LibsqlStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.get_conn().await?;
        let mut rows =
            conn.query("SELECT value FROM kv_entries WHERE key = ?1", params![key.to_string()]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get::<String>(0)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO kv_entries (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key.to_string(), value.to_string(), chrono::Utc::now().timestamp()],
        )
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let conn = self.get_conn().await?;
        let removed =
            conn.execute("DELETE FROM kv_entries WHERE key = ?1", params![key.to_string()]).await?;
        Ok(removed > 0)
    }

    async fn flush(&self) -> Result<(), StoreError> {
        let conn = self.get_conn().await?;
        conn.execute("DELETE FROM kv_entries", ()).await?;
        Ok(())
    }
}
