//! Database connection and table management.

use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::NoTls;
use tracing::info;

use crate::error::{DbError, Result};
use crate::schema;

/// Main database handle: a connection pool over one source database.
#[derive(Clone)]
pub struct Database {
    pool: Pool,
}

impl Database {
    /// Build a pool from a postgres connection URL.
    pub fn connect(url: &str, max_connections: usize) -> Result<Self> {
        let pg_config: tokio_postgres::Config = url
            .parse()
            .map_err(|e: tokio_postgres::Error| DbError::Config(e.to_string()))?;
        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig { recycling_method: RecyclingMethod::Fast },
        );
        let pool = Pool::builder(manager)
            .max_size(max_connections)
            .build()
            .map_err(|e| DbError::Config(e.to_string()))?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Create schemas and tables if they do not exist.
    pub async fn initialize(&self) -> Result<()> {
        let client = self.pool.get().await?;
        client.batch_execute(schema::CREATE_SCHEMAS).await?;
        client.batch_execute(schema::CREATE_SD_TABLES).await?;
        client.batch_execute(schema::CREATE_SF_TABLES).await?;
        client.batch_execute(schema::CREATE_CTX_TABLES).await?;
        info!("database schemas initialized");
        Ok(())
    }

    /// Drop and rebuild the sd staging tables. Run before a full harvest so
    /// the session data reflects exactly one pass over the source files.
    pub async fn recreate_sd_tables(&self) -> Result<()> {
        let client = self.pool.get().await?;
        for table in schema::SD_TABLES {
            client
                .batch_execute(&format!("DROP TABLE IF EXISTS sd.{table};"))
                .await?;
        }
        client.batch_execute(schema::CREATE_SD_TABLES).await?;
        info!("sd staging tables recreated");
        Ok(())
    }
}
