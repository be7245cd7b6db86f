//! Database connection management

use crate::error::Result;
use libsql::{Builder, Connection, Database as LibSqlDatabase};
use std::path::Path;

use super::migrations;

/// Database wrapper for the on-device libSQL store
pub struct Database {
    _db: LibSqlDatabase,
    conn: Connection,
}

impl Database {
    /// Open a local database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let db = Builder::new_local(&path_str).build().await?;
        let conn = db.connect()?;

        let database = Self { _db: db, conn };
        database.configure().await?;
        database.migrate().await?;
        Ok(database)
    }

    /// Open an in-memory database (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        let conn = db.connect()?;

        let database = Self { _db: db, conn };
        database.configure().await?;
        database.migrate().await?;
        Ok(database)
    }

    /// Configure `SQLite` for optimal performance
    async fn configure(&self) -> Result<()> {
        // WAL only applies to file-backed databases
        self.conn
            .execute("PRAGMA journal_mode = WAL;", ())
            .await
            .ok();
        self.conn
            .execute("PRAGMA synchronous = NORMAL;", ())
            .await
            .ok();
        self.conn.execute("PRAGMA foreign_keys = ON;", ()).await?;
        Ok(())
    }

    /// Run database migrations
    async fn migrate(&self) -> Result<()> {
        migrations::run(&self.conn).await
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Begin an explicit transaction on the shared connection.
    ///
    /// Writes between `begin` and `commit` become visible atomically; call
    /// `rollback` on any failure in between.
    pub async fn begin(&self) -> Result<()> {
        self.conn.execute("BEGIN TRANSACTION", ()).await?;
        Ok(())
    }

    /// Commit the current explicit transaction
    pub async fn commit(&self) -> Result<()> {
        self.conn.execute("COMMIT", ()).await?;
        Ok(())
    }

    /// Roll back the current explicit transaction, ignoring errors (the
    /// transaction may already have been aborted by the failing statement)
    pub async fn rollback(&self) {
        self.conn.execute("ROLLBACK", ()).await.ok();
    }

    /// Wipe all offline data (sign-out path). Settings survive.
    pub async fn clear_all_data(&self) -> Result<()> {
        self.begin().await?;
        for table in [
            "transaction_employees",
            "transaction_details",
            "transactions",
            "shift_sessions",
            "sync_queue",
            "products",
            "categories",
            "customers",
            "users",
            "shifts",
        ] {
            if let Err(error) = self
                .conn
                .execute(&format!("DELETE FROM {table}"), ())
                .await
            {
                self.rollback().await;
                return Err(error.into());
            }
        }
        self.commit().await
    }
}
