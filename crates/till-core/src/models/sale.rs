//! Sale transaction models: the transaction record and its children

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::models::SessionId;

/// A unique identifier for a sale transaction, using UUID v7 (time-sortable)
///
/// Generated on-device and used as the primary key both locally and remotely,
/// so a retried remote create targets the same row instead of duplicating it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(Uuid);

impl TransactionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransactionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// How a sale was paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Qris,
    Transfer,
    #[serde(rename = "e-wallet")]
    EWallet,
    Split,
}

impl PaymentMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Card => "card",
            Self::Qris => "qris",
            Self::Transfer => "transfer",
            Self::EWallet => "e-wallet",
            Self::Split => "split",
        }
    }

    /// Cash sales feed the session's `total_cash` aggregate, everything else
    /// lands in `total_cashless`.
    #[must_use]
    pub const fn is_cash(self) -> bool {
        matches!(self, Self::Cash)
    }
}

impl FromStr for PaymentMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(Self::Cash),
            "card" => Ok(Self::Card),
            "qris" => Ok(Self::Qris),
            "transfer" => Ok(Self::Transfer),
            "e-wallet" => Ok(Self::EWallet),
            "split" => Ok(Self::Split),
            other => Err(Error::InvalidInput(format!(
                "unknown payment method: {other}"
            ))),
        }
    }
}

/// Transaction lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Cancelled,
    Refunded,
}

impl TransactionStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            other => Err(Error::InvalidInput(format!(
                "unknown transaction status: {other}"
            ))),
        }
    }
}

/// A completed point-of-sale transaction, originated locally.
///
/// `synced` flips once the sync engine has pushed the record remotely;
/// `offline_id` mirrors `id` for legacy lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleTransaction {
    pub id: TransactionId,
    pub store_id: String,
    pub shift_session_id: Option<SessionId>,
    pub customer_id: Option<String>,
    pub invoice_number: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub transaction_date: String,
    pub subtotal: f64,
    pub discount_amount: f64,
    pub discount_percentage: f64,
    pub tax_amount: f64,
    pub total_amount: f64,
    pub payment_method: PaymentMethod,
    pub amount_paid: f64,
    pub change_amount: f64,
    pub notes: Option<String>,
    pub status: TransactionStatus,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
    pub synced: bool,
    pub synced_at: Option<String>,
    pub offline_id: Option<String>,
}

/// One cart line on a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionDetail {
    pub id: String,
    pub transaction_id: TransactionId,
    pub product_id: Option<String>,
    pub product_name: String,
    pub product_sku: Option<String>,
    pub quantity: f64,
    pub unit_price: f64,
    pub discount_amount: f64,
    pub subtotal: f64,
    pub notes: Option<String>,
}

/// A commission split assigning part of a transaction to an employee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionEmployee {
    pub id: String,
    pub transaction_id: TransactionId,
    pub user_id: String,
    pub percentage: f64,
    pub amount: f64,
    pub notes: Option<String>,
}
