//! Database migrations

use crate::error::Result;
use libsql::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 1;

/// Run all pending migrations
pub async fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn).await?;

    if version < 1 {
        migrate_v1(conn).await?;
    }

    Ok(())
}

/// Get the current schema version
async fn get_version(conn: &Connection) -> Result<i32> {
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            (),
        )
        .await?;

    let exists: bool = if let Some(row) = rows.next().await? {
        row.get::<i32>(0)? != 0
    } else {
        false
    };

    if !exists {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i32 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

/// Migration to version 1: Initial schema
async fn migrate_v1(conn: &Connection) -> Result<()> {
    // libsql doesn't have execute_batch, so we run each statement separately
    // inside one transaction for atomicity.

    conn.execute("BEGIN TRANSACTION", ()).await?;

    let statements = [
        // Schema version tracking
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        // Reference mirrors. Products carry real columns because checkout
        // reads and mutates stock; the other mirrors are opaque snapshots.
        "CREATE TABLE IF NOT EXISTS products (
            id TEXT PRIMARY KEY,
            sku TEXT,
            barcode TEXT,
            name TEXT NOT NULL,
            is_trackable INTEGER NOT NULL DEFAULT 1,
            is_active INTEGER NOT NULL DEFAULT 1,
            stock_quantity REAL NOT NULL DEFAULT 0,
            payload TEXT NOT NULL,
            synced_at TEXT
        )",
        "CREATE INDEX IF NOT EXISTS idx_products_sku ON products(sku)",
        "CREATE INDEX IF NOT EXISTS idx_products_barcode ON products(barcode)",
        "CREATE TABLE IF NOT EXISTS categories (
            id TEXT PRIMARY KEY,
            payload TEXT NOT NULL,
            synced_at TEXT
        )",
        "CREATE TABLE IF NOT EXISTS customers (
            id TEXT PRIMARY KEY,
            payload TEXT NOT NULL,
            synced_at TEXT
        )",
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            payload TEXT NOT NULL,
            synced_at TEXT
        )",
        "CREATE TABLE IF NOT EXISTS shifts (
            id TEXT PRIMARY KEY,
            payload TEXT NOT NULL,
            synced_at TEXT
        )",
        // Shift sessions
        "CREATE TABLE IF NOT EXISTS shift_sessions (
            id TEXT PRIMARY KEY,
            shift_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            store_id TEXT NOT NULL,
            session_date TEXT NOT NULL,
            opening_balance REAL NOT NULL,
            actual_opening_balance REAL,
            closing_balance REAL NOT NULL DEFAULT 0,
            actual_closing_balance REAL,
            discrepancy REAL NOT NULL DEFAULT 0,
            total_sales REAL NOT NULL DEFAULT 0,
            total_transactions INTEGER NOT NULL DEFAULT 0,
            total_cash REAL NOT NULL DEFAULT 0,
            total_cashless REAL NOT NULL DEFAULT 0,
            total_expenses REAL NOT NULL DEFAULT 0,
            opened_at TEXT,
            closed_at TEXT,
            notes TEXT,
            status TEXT NOT NULL DEFAULT 'open'
        )",
        "CREATE INDEX IF NOT EXISTS idx_shift_sessions_user_status
            ON shift_sessions(user_id, status)",
        // Locally originated transactions
        "CREATE TABLE IF NOT EXISTS transactions (
            id TEXT PRIMARY KEY,
            store_id TEXT NOT NULL,
            shift_session_id TEXT,
            customer_id TEXT,
            invoice_number TEXT NOT NULL,
            customer_name TEXT,
            customer_phone TEXT,
            transaction_date TEXT NOT NULL,
            subtotal REAL NOT NULL,
            discount_amount REAL NOT NULL DEFAULT 0,
            discount_percentage REAL NOT NULL DEFAULT 0,
            tax_amount REAL NOT NULL DEFAULT 0,
            total_amount REAL NOT NULL,
            payment_method TEXT NOT NULL,
            amount_paid REAL NOT NULL,
            change_amount REAL NOT NULL DEFAULT 0,
            notes TEXT,
            status TEXT NOT NULL,
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            synced INTEGER NOT NULL DEFAULT 0,
            synced_at TEXT,
            offline_id TEXT
        )",
        "CREATE INDEX IF NOT EXISTS idx_transactions_invoice ON transactions(invoice_number)",
        "CREATE INDEX IF NOT EXISTS idx_transactions_synced ON transactions(synced)",
        "CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(transaction_date)",
        "CREATE TABLE IF NOT EXISTS transaction_details (
            id TEXT PRIMARY KEY,
            transaction_id TEXT NOT NULL REFERENCES transactions(id) ON DELETE CASCADE,
            product_id TEXT,
            product_name TEXT NOT NULL,
            product_sku TEXT,
            quantity REAL NOT NULL CHECK (quantity > 0),
            unit_price REAL NOT NULL,
            discount_amount REAL NOT NULL DEFAULT 0,
            subtotal REAL NOT NULL,
            notes TEXT
        )",
        "CREATE INDEX IF NOT EXISTS idx_transaction_details_trx
            ON transaction_details(transaction_id)",
        "CREATE TABLE IF NOT EXISTS transaction_employees (
            id TEXT PRIMARY KEY,
            transaction_id TEXT NOT NULL REFERENCES transactions(id) ON DELETE CASCADE,
            user_id TEXT NOT NULL,
            percentage REAL NOT NULL,
            amount REAL NOT NULL,
            notes TEXT
        )",
        "CREATE INDEX IF NOT EXISTS idx_transaction_employees_trx
            ON transaction_employees(transaction_id)",
        // Outbound sync queue
        "CREATE TABLE IF NOT EXISTS sync_queue (
            id TEXT PRIMARY KEY,
            action TEXT NOT NULL,
            collection TEXT NOT NULL,
            record_id TEXT NOT NULL,
            payload TEXT NOT NULL,
            created_at TEXT NOT NULL,
            retry_count INTEGER NOT NULL DEFAULT 0,
            last_error TEXT,
            status TEXT NOT NULL DEFAULT 'pending'
        )",
        "CREATE INDEX IF NOT EXISTS idx_sync_queue_status ON sync_queue(status, created_at)",
        // Settings table (local only)
        "CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        // Record migration version
        "INSERT INTO schema_version (version) VALUES (1)",
    ];

    for stmt in statements {
        if let Err(e) = conn.execute(stmt, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
    }

    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use libsql::Builder;

    async fn setup() -> Connection {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        db.connect().unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations() {
        let conn = setup().await;
        run(&conn).await.unwrap();

        let version = get_version(&conn).await.unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations_idempotent() {
        let conn = setup().await;
        run(&conn).await.unwrap();
        run(&conn).await.unwrap(); // Should not fail

        let version = get_version(&conn).await.unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_all_offline_tables_exist() {
        let conn = setup().await;
        run(&conn).await.unwrap();

        for table in [
            "products",
            "categories",
            "customers",
            "users",
            "shifts",
            "shift_sessions",
            "transactions",
            "transaction_details",
            "transaction_employees",
            "sync_queue",
            "settings",
        ] {
            let mut rows = conn
                .query(
                    "SELECT EXISTS(
                        SELECT 1 FROM sqlite_master
                        WHERE type = 'table' AND name = ?
                    )",
                    [table],
                )
                .await
                .unwrap();

            let exists = rows
                .next()
                .await
                .unwrap()
                .is_some_and(|row| row.get::<i32>(0).unwrap() != 0);

            assert!(exists, "missing table {table}");
        }
    }
}
