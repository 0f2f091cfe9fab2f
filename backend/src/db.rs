//! Database gateway for the POS backend
//!
//! Owns the bounded PostgreSQL pool. Single statements run against
//! [`Database::pool`]; multi-statement work runs inside a [`UnitOfWork`],
//! which holds one connection for its whole lifetime and rolls back when
//! dropped without a commit (early return, panic or a cancelled request).

use std::str::FromStr;
use std::time::Instant;

use sqlx::migrate::{MigrateError, Migrator};
use sqlx::postgres::{PgConnectOptions, PgConnection, PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::DatabaseConfig;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// SQLSTATE for `unique_violation`
const UNIQUE_VIOLATION: &str = "23505";

/// Gateway failures
#[derive(Error, Debug)]
pub enum DbError {
    /// The store could not be reached or the pool had no connection to give
    #[error("database connection error: {0}")]
    Connection(#[source] sqlx::Error),

    /// The store rejected or could not map a statement
    #[error("database statement error: {0}")]
    Statement(#[source] sqlx::Error),

    #[error("database migration error: {0}")]
    Migration(#[from] MigrateError),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::Configuration(_)
            | sqlx::Error::WorkerCrashed => DbError::Connection(err),
            other => DbError::Statement(other),
        }
    }
}

impl DbError {
    pub fn is_connection(&self) -> bool {
        matches!(self, DbError::Connection(_))
    }

    fn database_error(&self) -> Option<&dyn sqlx::error::DatabaseError> {
        match self {
            DbError::Statement(sqlx::Error::Database(err)) => Some(err.as_ref()),
            _ => None,
        }
    }

    /// Name of the violated constraint, if the store reported one
    pub fn constraint(&self) -> Option<&str> {
        self.database_error().and_then(|err| err.constraint())
    }

    pub fn is_unique_violation(&self) -> bool {
        self.database_error()
            .and_then(|err| err.code())
            .is_some_and(|code| code == UNIQUE_VIOLATION)
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// PostgreSQL connection pool
#[derive(Clone, Debug)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Open the pool and verify the store is reachable
    pub async fn connect(config: &DatabaseConfig) -> DbResult<Self> {
        let pool = Self::pool_options(config)
            .connect_with(Self::connect_options(config)?)
            .await?;

        info!(
            max_connections = config.max_connections,
            idle_timeout_secs = config.idle_timeout_secs,
            "PostgreSQL connection pool established"
        );
        Ok(Self { pool })
    }

    /// Build the pool without opening a connection until first use
    pub fn connect_lazy(config: &DatabaseConfig) -> DbResult<Self> {
        let pool = Self::pool_options(config).connect_lazy_with(Self::connect_options(config)?);
        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout())
            .idle_timeout(config.idle_timeout())
    }

    fn connect_options(config: &DatabaseConfig) -> DbResult<PgConnectOptions> {
        let mut options =
            PgConnectOptions::from_str(&config.url).map_err(DbError::Connection)?;
        if let Some(timeout) = config.statement_timeout() {
            options = options.options([("statement_timeout", timeout.as_millis().to_string())]);
        }
        Ok(options)
    }

    /// Executor for single statements
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check out a connection and open a transaction on it
    pub async fn begin(&self) -> DbResult<UnitOfWork> {
        let tx = self.pool.begin().await?;
        debug!("transaction started");
        Ok(UnitOfWork {
            tx,
            started: Instant::now(),
        })
    }

    /// Check database health
    pub async fn health_check(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Apply embedded migrations
    pub async fn migrate(&self) -> DbResult<()> {
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }

    /// Wait for checked-out connections to return, then close the pool
    pub async fn close(&self) {
        info!(
            size = self.pool.size(),
            idle = self.pool.num_idle(),
            "Closing PostgreSQL connection pool"
        );
        self.pool.close().await;
    }
}

/// One connection running one transaction
pub struct UnitOfWork {
    tx: Transaction<'static, Postgres>,
    started: Instant,
}

impl UnitOfWork {
    /// Executor for statements inside the transaction
    pub fn conn(&mut self) -> &mut PgConnection {
        &mut *self.tx
    }

    pub async fn commit(self) -> DbResult<()> {
        self.tx.commit().await?;
        debug!(elapsed_ms = self.started.elapsed().as_millis() as u64, "transaction committed");
        Ok(())
    }

    pub async fn rollback(self) -> DbResult<()> {
        self.tx.rollback().await?;
        debug!(elapsed_ms = self.started.elapsed().as_millis() as u64, "transaction rolled back");
        Ok(())
    }
}
