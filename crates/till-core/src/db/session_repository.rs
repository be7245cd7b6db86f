//! Shift session repository implementation

use libsql::Connection;

use crate::error::Result;
use crate::models::{SessionId, ShiftSession};

/// Trait for shift session storage operations (async)
#[allow(async_fn_in_trait)]
pub trait SessionRepository {
    /// Insert a newly opened session
    async fn insert(&self, session: &ShiftSession) -> Result<()>;

    /// Get a session by id
    async fn get(&self, id: &SessionId) -> Result<Option<ShiftSession>>;

    /// The operator's currently open session, if any
    async fn find_open_for(&self, user_id: &str) -> Result<Option<ShiftSession>>;

    /// Rewrite a session row (aggregates, close bookkeeping)
    async fn update(&self, session: &ShiftSession) -> Result<()>;
}

/// libSQL implementation of `SessionRepository`
pub struct LibSqlSessionRepository<'a> {
    conn: &'a Connection,
}

const SESSION_COLUMNS: &str = "id, shift_id, user_id, store_id, session_date, opening_balance, \
     actual_opening_balance, closing_balance, actual_closing_balance, discrepancy, total_sales, \
     total_transactions, total_cash, total_cashless, total_expenses, opened_at, closed_at, notes, \
     status";

impl<'a> LibSqlSessionRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_session(row: &libsql::Row) -> Result<ShiftSession> {
        let id: String = row.get(0)?;
        let status: String = row.get(18)?;

        Ok(ShiftSession {
            id: id.parse().map_err(|_| {
                crate::error::Error::InvalidInput(format!("invalid session id: {id}"))
            })?,
            shift_id: row.get(1)?,
            user_id: row.get(2)?,
            store_id: row.get(3)?,
            session_date: row.get(4)?,
            opening_balance: row.get(5)?,
            actual_opening_balance: row.get(6)?,
            closing_balance: row.get(7)?,
            actual_closing_balance: row.get(8)?,
            discrepancy: row.get(9)?,
            total_sales: row.get(10)?,
            total_transactions: row.get(11)?,
            total_cash: row.get(12)?,
            total_cashless: row.get(13)?,
            total_expenses: row.get(14)?,
            opened_at: row.get(15)?,
            closed_at: row.get(16)?,
            notes: row.get(17)?,
            status: status.parse()?,
        })
    }
}

impl SessionRepository for LibSqlSessionRepository<'_> {
    async fn insert(&self, session: &ShiftSession) -> Result<()> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO shift_sessions ({SESSION_COLUMNS})
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
                ),
                libsql::params![
                    session.id.as_str(),
                    session.shift_id.clone(),
                    session.user_id.clone(),
                    session.store_id.clone(),
                    session.session_date.clone(),
                    session.opening_balance,
                    session.actual_opening_balance,
                    session.closing_balance,
                    session.actual_closing_balance,
                    session.discrepancy,
                    session.total_sales,
                    session.total_transactions,
                    session.total_cash,
                    session.total_cashless,
                    session.total_expenses,
                    session.opened_at.clone(),
                    session.closed_at.clone(),
                    session.notes.clone(),
                    session.status.as_str(),
                ],
            )
            .await?;
        Ok(())
    }

    async fn get(&self, id: &SessionId) -> Result<Option<ShiftSession>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {SESSION_COLUMNS} FROM shift_sessions WHERE id = ?"),
                [id.as_str()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_session(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_open_for(&self, user_id: &str) -> Result<Option<ShiftSession>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM shift_sessions
                     WHERE user_id = ? AND status = 'open'
                     ORDER BY opened_at DESC LIMIT 1"
                ),
                [user_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_session(&row)?)),
            None => Ok(None),
        }
    }

    async fn update(&self, session: &ShiftSession) -> Result<()> {
        self.conn
            .execute(
                "UPDATE shift_sessions SET
                    closing_balance = ?, actual_closing_balance = ?, discrepancy = ?,
                    total_sales = ?, total_transactions = ?, total_cash = ?,
                    total_cashless = ?, total_expenses = ?, closed_at = ?, notes = ?, status = ?
                 WHERE id = ?",
                libsql::params![
                    session.closing_balance,
                    session.actual_closing_balance,
                    session.discrepancy,
                    session.total_sales,
                    session.total_transactions,
                    session.total_cash,
                    session.total_cashless,
                    session.total_expenses,
                    session.closed_at.clone(),
                    session.notes.clone(),
                    session.status.as_str(),
                    session.id.as_str(),
                ],
            )
            .await?;
        Ok(())
    }
}
