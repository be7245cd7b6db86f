//! Sales repository: locally originated transactions and their children

use libsql::Connection;

use crate::error::Result;
use crate::models::{SaleTransaction, TransactionDetail, TransactionEmployee, TransactionId};
use crate::util::{compact_date_today, rfc3339_now};

/// Trait for sale transaction storage operations (async)
#[allow(async_fn_in_trait)]
pub trait SalesRepository {
    /// Insert a transaction record
    async fn insert_transaction(&self, transaction: &SaleTransaction) -> Result<()>;

    /// Insert one cart line
    async fn insert_detail(&self, detail: &TransactionDetail) -> Result<()>;

    /// Insert one employee commission split
    async fn insert_employee(&self, employee: &TransactionEmployee) -> Result<()>;

    /// Get a transaction by id
    async fn get(&self, id: &TransactionId) -> Result<Option<SaleTransaction>>;

    /// Count transactions whose invoice number starts with `prefix`
    async fn count_invoices_with_prefix(&self, prefix: &str) -> Result<u64>;

    /// Next offline invoice number: `INV-{YYYYMMDD}-{seq:04}-OFF`, sequence
    /// scoped to the local day's count
    async fn next_invoice_number(&self) -> Result<String>;

    /// Transactions not yet confirmed by the remote store
    async fn list_unsynced(&self) -> Result<Vec<SaleTransaction>>;

    /// Flip the synced flag after the remote store confirmed the record
    async fn mark_synced(&self, record_id: &str) -> Result<()>;

    /// Cart lines for a transaction
    async fn details_for(&self, id: &TransactionId) -> Result<Vec<TransactionDetail>>;

    /// Commission splits for a transaction
    async fn employees_for(&self, id: &TransactionId) -> Result<Vec<TransactionEmployee>>;
}

/// libSQL implementation of `SalesRepository`
pub struct LibSqlSalesRepository<'a> {
    conn: &'a Connection,
}

const TRANSACTION_COLUMNS: &str = "id, store_id, shift_session_id, customer_id, invoice_number, \
     customer_name, customer_phone, transaction_date, subtotal, discount_amount, \
     discount_percentage, tax_amount, total_amount, payment_method, amount_paid, change_amount, \
     notes, status, created_by, created_at, updated_at, synced, synced_at, offline_id";

impl<'a> LibSqlSalesRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_transaction(row: &libsql::Row) -> Result<SaleTransaction> {
        let id: String = row.get(0)?;
        let shift_session_id: Option<String> = row.get(2)?;
        let payment_method: String = row.get(13)?;
        let status: String = row.get(17)?;

        Ok(SaleTransaction {
            id: id.parse().map_err(|_| {
                crate::error::Error::InvalidInput(format!("invalid transaction id: {id}"))
            })?,
            store_id: row.get(1)?,
            shift_session_id: match shift_session_id {
                Some(raw) => Some(raw.parse().map_err(|_| {
                    crate::error::Error::InvalidInput(format!("invalid session id: {raw}"))
                })?),
                None => None,
            },
            customer_id: row.get(3)?,
            invoice_number: row.get(4)?,
            customer_name: row.get(5)?,
            customer_phone: row.get(6)?,
            transaction_date: row.get(7)?,
            subtotal: row.get(8)?,
            discount_amount: row.get(9)?,
            discount_percentage: row.get(10)?,
            tax_amount: row.get(11)?,
            total_amount: row.get(12)?,
            payment_method: payment_method.parse()?,
            amount_paid: row.get(14)?,
            change_amount: row.get(15)?,
            notes: row.get(16)?,
            status: status.parse()?,
            created_by: row.get(18)?,
            created_at: row.get(19)?,
            updated_at: row.get(20)?,
            synced: row.get::<i32>(21)? != 0,
            synced_at: row.get(22)?,
            offline_id: row.get(23)?,
        })
    }
}

impl SalesRepository for LibSqlSalesRepository<'_> {
    async fn insert_transaction(&self, transaction: &SaleTransaction) -> Result<()> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO transactions ({TRANSACTION_COLUMNS})
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
                ),
                libsql::params![
                    transaction.id.as_str(),
                    transaction.store_id.clone(),
                    transaction.shift_session_id.map(|id| id.as_str()),
                    transaction.customer_id.clone(),
                    transaction.invoice_number.clone(),
                    transaction.customer_name.clone(),
                    transaction.customer_phone.clone(),
                    transaction.transaction_date.clone(),
                    transaction.subtotal,
                    transaction.discount_amount,
                    transaction.discount_percentage,
                    transaction.tax_amount,
                    transaction.total_amount,
                    transaction.payment_method.as_str(),
                    transaction.amount_paid,
                    transaction.change_amount,
                    transaction.notes.clone(),
                    transaction.status.as_str(),
                    transaction.created_by.clone(),
                    transaction.created_at.clone(),
                    transaction.updated_at.clone(),
                    i32::from(transaction.synced),
                    transaction.synced_at.clone(),
                    transaction.offline_id.clone(),
                ],
            )
            .await?;
        Ok(())
    }

    async fn insert_detail(&self, detail: &TransactionDetail) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO transaction_details
                 (id, transaction_id, product_id, product_name, product_sku, quantity,
                  unit_price, discount_amount, subtotal, notes)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                libsql::params![
                    detail.id.clone(),
                    detail.transaction_id.as_str(),
                    detail.product_id.clone(),
                    detail.product_name.clone(),
                    detail.product_sku.clone(),
                    detail.quantity,
                    detail.unit_price,
                    detail.discount_amount,
                    detail.subtotal,
                    detail.notes.clone(),
                ],
            )
            .await?;
        Ok(())
    }

    async fn insert_employee(&self, employee: &TransactionEmployee) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO transaction_employees
                 (id, transaction_id, user_id, percentage, amount, notes)
                 VALUES (?, ?, ?, ?, ?, ?)",
                libsql::params![
                    employee.id.clone(),
                    employee.transaction_id.as_str(),
                    employee.user_id.clone(),
                    employee.percentage,
                    employee.amount,
                    employee.notes.clone(),
                ],
            )
            .await?;
        Ok(())
    }

    async fn get(&self, id: &TransactionId) -> Result<Option<SaleTransaction>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?"),
                [id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_transaction(&row)?)),
            None => Ok(None),
        }
    }

    async fn count_invoices_with_prefix(&self, prefix: &str) -> Result<u64> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM transactions WHERE invoice_number LIKE ?",
                [format!("{prefix}%")],
            )
            .await?;
        let count: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn next_invoice_number(&self) -> Result<String> {
        let prefix = format!("INV-{}", compact_date_today());
        let count = self.count_invoices_with_prefix(&prefix).await?;
        let sequence = count + 1;
        Ok(format!("{prefix}-{sequence:04}-OFF"))
    }

    async fn list_unsynced(&self) -> Result<Vec<SaleTransaction>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {TRANSACTION_COLUMNS} FROM transactions
                     WHERE synced = 0 ORDER BY created_at ASC"
                ),
                (),
            )
            .await?;
        let mut transactions = Vec::new();
        while let Some(row) = rows.next().await? {
            transactions.push(Self::parse_transaction(&row)?);
        }
        Ok(transactions)
    }

    async fn mark_synced(&self, record_id: &str) -> Result<()> {
        self.conn
            .execute(
                "UPDATE transactions SET synced = 1, synced_at = ? WHERE id = ?",
                libsql::params![rfc3339_now(), record_id],
            )
            .await?;
        Ok(())
    }

    async fn details_for(&self, id: &TransactionId) -> Result<Vec<TransactionDetail>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, transaction_id, product_id, product_name, product_sku, quantity,
                        unit_price, discount_amount, subtotal, notes
                 FROM transaction_details WHERE transaction_id = ? ORDER BY id",
                [id.as_str()],
            )
            .await?;
        let mut details = Vec::new();
        while let Some(row) = rows.next().await? {
            let transaction_id: String = row.get(1)?;
            details.push(TransactionDetail {
                id: row.get(0)?,
                transaction_id: transaction_id.parse().map_err(|_| {
                    crate::error::Error::InvalidInput(format!(
                        "invalid transaction id: {transaction_id}"
                    ))
                })?,
                product_id: row.get(2)?,
                product_name: row.get(3)?,
                product_sku: row.get(4)?,
                quantity: row.get(5)?,
                unit_price: row.get(6)?,
                discount_amount: row.get(7)?,
                subtotal: row.get(8)?,
                notes: row.get(9)?,
            });
        }
        Ok(details)
    }

    async fn employees_for(&self, id: &TransactionId) -> Result<Vec<TransactionEmployee>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, transaction_id, user_id, percentage, amount, notes
                 FROM transaction_employees WHERE transaction_id = ? ORDER BY id",
                [id.as_str()],
            )
            .await?;
        let mut employees = Vec::new();
        while let Some(row) = rows.next().await? {
            let transaction_id: String = row.get(1)?;
            employees.push(TransactionEmployee {
                id: row.get(0)?,
                transaction_id: transaction_id.parse().map_err(|_| {
                    crate::error::Error::InvalidInput(format!(
                        "invalid transaction id: {transaction_id}"
                    ))
                })?,
                user_id: row.get(2)?,
                percentage: row.get(3)?,
                amount: row.get(4)?,
                notes: row.get(5)?,
            });
        }
        Ok(employees)
    }
}
