use deadpool::managed::{self, Pool, PoolConfig, RecycleResult};
use libsql::{Connection, Database, Error as LibsqlError};

use crate::error::StoreError;

/// Connections kept open per store; every registry mutation needs only one
const MAX_CONNECTIONS: usize = 8;

/// Opens libsql connections on demand and checks them on reuse
pub struct LibsqlManager {
    database: Database,
}

impl LibsqlManager {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

impl managed::Manager for LibsqlManager {
    type Type = Connection;
    type Error = LibsqlError;

    async fn create(&self) -> Result<Self::Type, Self::Error> {
        self.database.connect()
    }

    async fn recycle(
        &self,
        conn: &mut Self::Type,
        _: &managed::Metrics,
    ) -> RecycleResult<Self::Error> {
        let mut rows = conn.query("SELECT 1", ()).await?;
        rows.next().await?.ok_or(LibsqlError::QueryReturnedNoRows)?;
        Ok(())
    }
}

pub type LibsqlPool = Pool<LibsqlManager>;

pub fn build_pool(database: Database) -> Result<LibsqlPool, StoreError> {
    LibsqlPool::builder(LibsqlManager::new(database))
        .config(PoolConfig::new(MAX_CONNECTIONS))
        .build()
        .map_err(|e| StoreError::Pool(e.to_string()))
}
