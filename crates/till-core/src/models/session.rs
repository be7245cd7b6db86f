//! Shift session model and its running aggregates

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::util::rfc3339_now;

/// A unique identifier for a shift session, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Session lifecycle state; only one `open` session per operator at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Open,
    Closed,
}

impl SessionStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl FromStr for SessionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            other => Err(Error::InvalidInput(format!(
                "unknown session status: {other}"
            ))),
        }
    }
}

/// A cash-drawer session for one operator on one shift.
///
/// The aggregates are mutated incrementally by every completed sale and
/// recorded expense while the session is open, then once more on close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftSession {
    pub id: SessionId,
    pub shift_id: String,
    pub user_id: String,
    pub store_id: String,
    pub session_date: String,
    pub opening_balance: f64,
    pub actual_opening_balance: Option<f64>,
    pub closing_balance: f64,
    pub actual_closing_balance: Option<f64>,
    pub discrepancy: f64,
    pub total_sales: f64,
    pub total_transactions: i64,
    pub total_cash: f64,
    pub total_cashless: f64,
    pub total_expenses: f64,
    pub opened_at: Option<String>,
    pub closed_at: Option<String>,
    pub notes: Option<String>,
    pub status: SessionStatus,
}

impl ShiftSession {
    /// Open a new session with zeroed aggregates
    #[must_use]
    pub fn open(
        shift_id: impl Into<String>,
        user_id: impl Into<String>,
        store_id: impl Into<String>,
        opening_balance: f64,
    ) -> Self {
        let now = rfc3339_now();
        Self {
            id: SessionId::new(),
            shift_id: shift_id.into(),
            user_id: user_id.into(),
            store_id: store_id.into(),
            session_date: chrono::Utc::now().format("%Y-%m-%d").to_string(),
            opening_balance,
            actual_opening_balance: Some(opening_balance),
            closing_balance: 0.0,
            actual_closing_balance: None,
            discrepancy: 0.0,
            total_sales: 0.0,
            total_transactions: 0,
            total_cash: 0.0,
            total_cashless: 0.0,
            total_expenses: 0.0,
            opened_at: Some(now),
            closed_at: None,
            notes: None,
            status: SessionStatus::Open,
        }
    }

    /// Fold one completed sale into the running aggregates
    pub fn apply_sale(&mut self, total_amount: f64, is_cash: bool) {
        self.total_sales += total_amount;
        self.total_transactions += 1;
        if is_cash {
            self.total_cash += total_amount;
        } else {
            self.total_cashless += total_amount;
        }
    }

    /// Fold one recorded expense into the running aggregates
    pub fn apply_expense(&mut self, amount: f64) {
        self.total_expenses += amount;
    }

    /// Close the session, computing the expected drawer balance and the
    /// discrepancy against the counted amount.
    pub fn close(&mut self, actual_closing_balance: f64, notes: Option<String>) {
        let expected = self.opening_balance + self.total_sales - self.total_expenses;
        self.closing_balance = expected;
        self.actual_closing_balance = Some(actual_closing_balance);
        self.discrepancy = actual_closing_balance - expected;
        self.notes = notes;
        self.closed_at = Some(rfc3339_now());
        self.status = SessionStatus::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn open_session_starts_zeroed() {
        let session = ShiftSession::open("shift-1", "user-1", "store-1", 100_000.0);
        assert_eq!(session.status, SessionStatus::Open);
        assert_eq!(session.total_sales, 0.0);
        assert_eq!(session.total_transactions, 0);
        assert_eq!(session.actual_opening_balance, Some(100_000.0));
        assert!(session.closed_at.is_none());
    }

    #[test]
    fn aggregates_split_cash_and_cashless() {
        let mut session = ShiftSession::open("shift-1", "user-1", "store-1", 100_000.0);
        session.apply_sale(20_000.0, true);
        session.apply_sale(30_000.0, false);

        assert_eq!(session.total_sales, 50_000.0);
        assert_eq!(session.total_transactions, 2);
        assert_eq!(session.total_cash, 20_000.0);
        assert_eq!(session.total_cashless, 30_000.0);
    }

    #[test]
    fn close_computes_discrepancy_against_expected() {
        let mut session = ShiftSession::open("shift-1", "user-1", "store-1", 100_000.0);
        session.apply_sale(50_000.0, true);
        session.apply_expense(10_000.0);
        session.close(135_000.0, Some("short".to_string()));

        // expected = 100k + 50k - 10k = 140k
        assert_eq!(session.closing_balance, 140_000.0);
        assert_eq!(session.discrepancy, -5_000.0);
        assert_eq!(session.status, SessionStatus::Closed);
        assert!(session.closed_at.is_some());
    }
}
