//! Checkout: the point-of-sale business logic.
//!
//! One `record_sale` call writes the transaction, its line items, its
//! employee splits, the session aggregates, and the stock decrements as a
//! single local transaction, then enqueues everything for the sync engine.
//! Nothing here blocks on the network; the sale is complete the moment the
//! local write and enqueues succeed.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::StoreContext;
use crate::db::{
    CatalogRepository, Database, LibSqlCatalogRepository, LibSqlSalesRepository,
    LibSqlSessionRepository, SalesRepository, SessionRepository,
};
use crate::error::{Error, Result};
use crate::models::{
    new_record_id, Collection, PaymentMethod, Product, SaleTransaction, SessionId, ShiftSession,
    SyncAction, TransactionDetail, TransactionEmployee, TransactionId, TransactionStatus,
};
use crate::sync::SyncQueue;
use crate::util::rfc3339_now;

/// One cart line as entered at the register
#[derive(Debug, Clone, PartialEq)]
pub struct SaleItem {
    pub product_id: Option<String>,
    pub name: String,
    pub sku: Option<String>,
    pub price: f64,
    pub quantity: f64,
}

/// A commission split request; percentages are of the sale total
#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeSplit {
    pub user_id: String,
    pub percentage: f64,
}

/// Everything the register hands over for one checkout
#[derive(Debug, Clone, PartialEq)]
pub struct SaleRequest {
    pub cashier_id: String,
    pub items: Vec<SaleItem>,
    pub payment_method: PaymentMethod,
    /// Defaults to the exact total when omitted
    pub amount_paid: Option<f64>,
    pub discount_amount: f64,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    /// Defaults to 100% for the operator when empty
    pub employee_splits: Vec<EmployeeSplit>,
    pub notes: Option<String>,
}

impl SaleRequest {
    /// A plain cash sale for the given operator and cart
    #[must_use]
    pub fn cash(cashier_id: impl Into<String>, items: Vec<SaleItem>, amount_paid: f64) -> Self {
        Self {
            cashier_id: cashier_id.into(),
            items,
            payment_method: PaymentMethod::Cash,
            amount_paid: Some(amount_paid),
            discount_amount: 0.0,
            customer_id: None,
            customer_name: None,
            customer_phone: None,
            employee_splits: Vec::new(),
            notes: None,
        }
    }
}

/// Composes point-of-sale operations against the local store and the sync
/// queue. Remote reconciliation is entirely the engine's business.
pub struct Checkout {
    db: Arc<Database>,
    queue: SyncQueue,
    context: StoreContext,
}

impl Checkout {
    #[must_use]
    pub fn new(db: Arc<Database>, queue: SyncQueue, context: StoreContext) -> Self {
        Self { db, queue, context }
    }

    /// Record one sale.
    ///
    /// Validation failures reject the call before any write. A failure
    /// during the local write aborts the whole sale; nothing is recorded
    /// and nothing is enqueued. Remote failures never roll the sale back.
    pub async fn record_sale(&self, request: SaleRequest) -> Result<SaleTransaction> {
        if request.items.is_empty() {
            return Err(Error::InvalidInput("cart is empty".to_string()));
        }
        if request.cashier_id.trim().is_empty() {
            return Err(Error::InvalidInput("no operator identity".to_string()));
        }
        let profile = self.context.profile().ok_or(Error::MissingStoreContext)?;

        let sessions = LibSqlSessionRepository::new(self.db.connection());
        let mut session = sessions
            .find_open_for(&request.cashier_id)
            .await?
            .ok_or_else(|| {
                Error::InvalidInput("no open shift session for operator".to_string())
            })?;

        // Deterministic totals math
        let subtotal: f64 = request
            .items
            .iter()
            .map(|item| item.price * item.quantity)
            .sum();
        let discount_amount = request.discount_amount.max(0.0);
        let taxable = (subtotal - discount_amount).max(0.0);
        let tax_amount = taxable * profile.tax_percentage / 100.0;
        let total_amount = taxable + tax_amount;
        let amount_paid = request.amount_paid.unwrap_or(total_amount);
        if amount_paid < total_amount {
            return Err(Error::InvalidInput("insufficient payment".to_string()));
        }
        let change_amount = (amount_paid - total_amount).max(0.0);

        let sales = LibSqlSalesRepository::new(self.db.connection());
        let invoice_number = sales.next_invoice_number().await?;
        let id = TransactionId::new();
        let now = rfc3339_now();

        let transaction = SaleTransaction {
            id,
            store_id: profile.id.clone(),
            shift_session_id: Some(session.id),
            customer_id: request.customer_id.clone(),
            invoice_number,
            customer_name: request.customer_name.clone(),
            customer_phone: request.customer_phone.clone(),
            transaction_date: now.clone(),
            subtotal,
            discount_amount,
            discount_percentage: if subtotal > 0.0 {
                discount_amount / subtotal * 100.0
            } else {
                0.0
            },
            tax_amount,
            total_amount,
            payment_method: request.payment_method,
            amount_paid,
            change_amount,
            notes: request.notes.clone(),
            status: TransactionStatus::Completed,
            created_by: request.cashier_id.clone(),
            created_at: now.clone(),
            updated_at: now,
            synced: false,
            synced_at: None,
            offline_id: Some(id.as_str()),
        };

        let details: Vec<TransactionDetail> = request
            .items
            .iter()
            .map(|item| TransactionDetail {
                id: new_record_id(),
                transaction_id: id,
                product_id: item.product_id.clone(),
                product_name: item.name.clone(),
                product_sku: item.sku.clone(),
                quantity: item.quantity,
                unit_price: item.price,
                discount_amount: 0.0,
                subtotal: item.price * item.quantity,
                notes: None,
            })
            .collect();

        let splits = if request.employee_splits.is_empty() {
            vec![EmployeeSplit {
                user_id: request.cashier_id.clone(),
                percentage: 100.0,
            }]
        } else {
            request.employee_splits.clone()
        };
        let employees: Vec<TransactionEmployee> = splits
            .iter()
            .map(|split| TransactionEmployee {
                id: new_record_id(),
                transaction_id: id,
                user_id: split.user_id.clone(),
                percentage: split.percentage,
                amount: split.percentage / 100.0 * total_amount,
                notes: None,
            })
            .collect();

        let stock_updates = self.compute_stock_updates(&request.items).await?;
        session.apply_sale(total_amount, request.payment_method.is_cash());

        // One local transaction: either the whole sale is visible or none
        // of it is.
        self.db.begin().await?;
        if let Err(error) = self
            .write_sale(&sales, &sessions, &transaction, &details, &employees, &session, &stock_updates)
            .await
        {
            self.db.rollback().await;
            return Err(error);
        }
        self.db.commit().await?;

        // Transaction first so the dependency gate finds the parent in the
        // same or an earlier pass.
        self.queue
            .enqueue(
                SyncAction::Create,
                Collection::Transactions,
                id.as_str(),
                serde_json::to_value(&transaction)?,
            )
            .await?;
        for detail in &details {
            self.queue
                .enqueue(
                    SyncAction::Create,
                    Collection::TransactionDetails,
                    detail.id.clone(),
                    serde_json::to_value(detail)?,
                )
                .await?;
        }
        for employee in &employees {
            self.queue
                .enqueue(
                    SyncAction::Create,
                    Collection::TransactionEmployees,
                    employee.id.clone(),
                    serde_json::to_value(employee)?,
                )
                .await?;
        }
        self.queue
            .enqueue(
                SyncAction::Update,
                Collection::ShiftSessions,
                session.id.as_str(),
                serde_json::to_value(&session)?,
            )
            .await?;
        for product in &stock_updates {
            self.queue
                .enqueue(
                    SyncAction::Update,
                    Collection::Products,
                    product.id.clone(),
                    serde_json::to_value(product)?,
                )
                .await?;
        }

        tracing::info!(
            invoice = %transaction.invoice_number,
            total = transaction.total_amount,
            "sale recorded locally"
        );
        Ok(transaction)
    }

    /// Clamped stock decrements for trackable cart products, folded per
    /// product so repeated cart lines decrement once with the summed
    /// quantity.
    async fn compute_stock_updates(&self, items: &[SaleItem]) -> Result<Vec<Product>> {
        let catalog = LibSqlCatalogRepository::new(self.db.connection());
        let mut quantities: HashMap<&str, f64> = HashMap::new();
        for item in items {
            if let Some(product_id) = item.product_id.as_deref() {
                *quantities.entry(product_id).or_default() += item.quantity;
            }
        }

        let mut updates = Vec::new();
        for (product_id, quantity) in quantities {
            if let Some(mut product) = catalog.get_product(product_id).await? {
                if product.is_trackable {
                    product.decrement_stock(quantity);
                    updates.push(product);
                }
            }
        }
        Ok(updates)
    }

    #[allow(clippy::too_many_arguments)]
    async fn write_sale(
        &self,
        sales: &LibSqlSalesRepository<'_>,
        sessions: &LibSqlSessionRepository<'_>,
        transaction: &SaleTransaction,
        details: &[TransactionDetail],
        employees: &[TransactionEmployee],
        session: &ShiftSession,
        stock_updates: &[Product],
    ) -> Result<()> {
        let catalog = LibSqlCatalogRepository::new(self.db.connection());
        sales.insert_transaction(transaction).await?;
        for detail in details {
            sales.insert_detail(detail).await?;
        }
        for employee in employees {
            sales.insert_employee(employee).await?;
        }
        sessions.update(session).await?;
        for product in stock_updates {
            catalog.upsert_product(product).await?;
        }
        Ok(())
    }

    /// Open a shift session for an operator.
    ///
    /// Rejected when the operator already has an open session.
    pub async fn open_shift(
        &self,
        shift_id: &str,
        user_id: &str,
        opening_balance: f64,
    ) -> Result<ShiftSession> {
        let sessions = LibSqlSessionRepository::new(self.db.connection());
        if sessions.find_open_for(user_id).await?.is_some() {
            return Err(Error::InvalidInput(
                "operator already has an open shift session".to_string(),
            ));
        }
        let store_id = self.context.store_id()?;

        let session = ShiftSession::open(shift_id, user_id, store_id, opening_balance);
        sessions.insert(&session).await?;
        self.queue
            .enqueue(
                SyncAction::Create,
                Collection::ShiftSessions,
                session.id.as_str(),
                serde_json::to_value(&session)?,
            )
            .await?;

        tracing::info!(session = %session.id, user = user_id, "shift opened");
        Ok(session)
    }

    /// Close a shift session against the counted drawer balance.
    pub async fn close_shift(
        &self,
        session_id: &SessionId,
        actual_closing_balance: f64,
        notes: Option<String>,
    ) -> Result<ShiftSession> {
        let sessions = LibSqlSessionRepository::new(self.db.connection());
        let mut session = sessions
            .get(session_id)
            .await?
            .ok_or_else(|| Error::NotFound(session_id.to_string()))?;
        if session.status != crate::models::SessionStatus::Open {
            return Err(Error::InvalidInput(
                "shift session is already closed".to_string(),
            ));
        }

        session.close(actual_closing_balance, notes);
        sessions.update(&session).await?;
        self.queue
            .enqueue(
                SyncAction::Update,
                Collection::ShiftSessions,
                session.id.as_str(),
                serde_json::to_value(&session)?,
            )
            .await?;

        tracing::info!(
            session = %session.id,
            discrepancy = session.discrepancy,
            "shift closed"
        );
        Ok(session)
    }

    /// Record an expense against an open session's running aggregates.
    pub async fn record_expense(
        &self,
        session_id: &SessionId,
        amount: f64,
    ) -> Result<ShiftSession> {
        if amount <= 0.0 {
            return Err(Error::InvalidInput(
                "expense amount must be positive".to_string(),
            ));
        }
        let sessions = LibSqlSessionRepository::new(self.db.connection());
        let mut session = sessions
            .get(session_id)
            .await?
            .ok_or_else(|| Error::NotFound(session_id.to_string()))?;
        if session.status != crate::models::SessionStatus::Open {
            return Err(Error::InvalidInput(
                "shift session is already closed".to_string(),
            ));
        }

        session.apply_expense(amount);
        sessions.update(&session).await?;
        self.queue
            .enqueue(
                SyncAction::Update,
                Collection::ShiftSessions,
                session.id.as_str(),
                serde_json::to_value(&session)?,
            )
            .await?;
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{LibSqlQueueRepository, QueueRepository};
    use crate::models::{QueueStatus, StoreProfile};
    use crate::sync::{SyncSignal, SyncStatePublisher};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct Fixture {
        db: Arc<Database>,
        checkout: Checkout,
    }

    async fn fixture(tax_percentage: f64) -> Fixture {
        let db = Arc::new(Database::open_in_memory().await.unwrap());
        let publisher = SyncStatePublisher::new(true);
        let signal = SyncSignal::new();
        let queue = SyncQueue::new(Arc::clone(&db), publisher, signal);
        let context = StoreContext::with_profile(StoreProfile::new(
            "store-1",
            "Warung Sinar",
            tax_percentage,
        ));
        let checkout = Checkout::new(Arc::clone(&db), queue, context);
        Fixture { db, checkout }
    }

    async fn seed_product(db: &Database, id: &str, stock: f64, trackable: bool) {
        let catalog = LibSqlCatalogRepository::new(db.connection());
        catalog
            .upsert_mirror(
                Collection::Products,
                &[json!({
                    "id": id,
                    "name": format!("Product {id}"),
                    "sku": format!("SKU-{id}"),
                    "selling_price": 10_000.0,
                    "stock_quantity": stock,
                    "is_trackable": trackable,
                    "is_active": true,
                })],
            )
            .await
            .unwrap();
    }

    fn cart() -> Vec<SaleItem> {
        vec![
            SaleItem {
                product_id: Some("p1".to_string()),
                name: "Kopi Susu".to_string(),
                sku: Some("SKU-p1".to_string()),
                price: 15_000.0,
                quantity: 2.0,
            },
            SaleItem {
                product_id: Some("p2".to_string()),
                name: "Teh Manis".to_string(),
                sku: Some("SKU-p2".to_string()),
                price: 20_000.0,
                quantity: 1.0,
            },
        ]
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn offline_sale_commits_locally_and_queues_the_trio() {
        let fixture = fixture(0.0).await;
        seed_product(&fixture.db, "p1", 10.0, true).await;
        seed_product(&fixture.db, "p2", 5.0, true).await;
        fixture
            .checkout
            .open_shift("shift-1", "user-1", 100_000.0)
            .await
            .unwrap();

        let transaction = fixture
            .checkout
            .record_sale(SaleRequest::cash("user-1", cart(), 50_000.0))
            .await
            .unwrap();

        assert_eq!(transaction.total_amount, 50_000.0);
        assert_eq!(transaction.change_amount, 0.0);
        assert!(!transaction.synced);

        let sales = LibSqlSalesRepository::new(fixture.db.connection());
        let stored = sales.get(&transaction.id).await.unwrap().unwrap();
        assert!(!stored.synced);
        assert_eq!(stored.offline_id, Some(transaction.id.as_str()));
        assert_eq!(sales.details_for(&transaction.id).await.unwrap().len(), 2);
        assert_eq!(sales.employees_for(&transaction.id).await.unwrap().len(), 1);

        // The drain-ordered queue leads with the trio: transaction create,
        // then its details, then its employee split
        let queue = LibSqlQueueRepository::new(fixture.db.connection());
        let pending = queue.load_pending().await.unwrap();
        assert_eq!(pending[0].priority(), 1);
        assert_eq!(pending[0].record_id, transaction.id.as_str());
        assert_eq!(pending[1].priority(), 2);
        assert_eq!(pending[2].priority(), 2);
        assert_eq!(pending[3].priority(), 3);
        assert!(pending
            .iter()
            .all(|entry| entry.status == QueueStatus::Pending));
        // Plus the session update and the two stock updates
        assert_eq!(pending.len(), 7);
        assert_eq!(
            pending[1].gating_parent().as_deref(),
            Some(transaction.id.as_str().as_str())
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn validations_reject_before_any_write() {
        let fixture = fixture(0.0).await;

        // Empty cart
        let error = fixture
            .checkout
            .record_sale(SaleRequest::cash("user-1", Vec::new(), 0.0))
            .await
            .unwrap_err();
        assert!(matches!(error, Error::InvalidInput(_)));

        // No open shift session
        let error = fixture
            .checkout
            .record_sale(SaleRequest::cash("user-1", cart(), 50_000.0))
            .await
            .unwrap_err();
        assert!(error.to_string().contains("no open shift session"));

        fixture
            .checkout
            .open_shift("shift-1", "user-1", 100_000.0)
            .await
            .unwrap();

        // Insufficient payment
        let error = fixture
            .checkout
            .record_sale(SaleRequest::cash("user-1", cart(), 40_000.0))
            .await
            .unwrap_err();
        assert!(error.to_string().contains("insufficient payment"));

        // Nothing was recorded by the rejected attempts
        let queue = LibSqlQueueRepository::new(fixture.db.connection());
        let pending = queue.load_pending().await.unwrap();
        assert_eq!(pending.len(), 1); // only the open_shift create
        assert_eq!(pending[0].collection, Collection::ShiftSessions);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_local_write_leaves_no_partial_state() {
        let fixture = fixture(0.0).await;
        seed_product(&fixture.db, "p1", 10.0, true).await;
        fixture
            .checkout
            .open_shift("shift-1", "user-1", 100_000.0)
            .await
            .unwrap();

        // quantity 0 passes request validation but violates the schema
        // mid-write, after the transaction row is already inserted
        let request = SaleRequest::cash(
            "user-1",
            vec![
                SaleItem {
                    product_id: Some("p1".to_string()),
                    name: "Kopi Susu".to_string(),
                    sku: None,
                    price: 15_000.0,
                    quantity: 1.0,
                },
                SaleItem {
                    product_id: Some("p1".to_string()),
                    name: "Kopi Susu".to_string(),
                    sku: None,
                    price: 15_000.0,
                    quantity: 0.0,
                },
            ],
            15_000.0,
        );
        fixture.checkout.record_sale(request).await.unwrap_err();

        // No transaction, no children, no stock change, no session change,
        // nothing enqueued beyond the shift open
        let mut rows = fixture
            .db
            .connection()
            .query("SELECT COUNT(*) FROM transactions", ())
            .await
            .unwrap();
        let count: i64 = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(count, 0);

        let catalog = LibSqlCatalogRepository::new(fixture.db.connection());
        let product = catalog.get_product("p1").await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, 10.0);

        let sessions = LibSqlSessionRepository::new(fixture.db.connection());
        let session = sessions.find_open_for("user-1").await.unwrap().unwrap();
        assert_eq!(session.total_sales, 0.0);
        assert_eq!(session.total_transactions, 0);

        let queue = LibSqlQueueRepository::new(fixture.db.connection());
        assert_eq!(queue.load_pending().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn tax_discount_and_change_math() {
        let fixture = fixture(10.0).await;
        fixture
            .checkout
            .open_shift("shift-1", "user-1", 0.0)
            .await
            .unwrap();

        let mut request = SaleRequest::cash("user-1", cart(), 60_000.0);
        request.discount_amount = 10_000.0;
        let transaction = fixture.checkout.record_sale(request).await.unwrap();

        // subtotal 50k, discount 10k, taxable 40k, tax 4k, total 44k
        assert_eq!(transaction.subtotal, 50_000.0);
        assert_eq!(transaction.discount_amount, 10_000.0);
        assert_eq!(transaction.discount_percentage, 20.0);
        assert_eq!(transaction.tax_amount, 4_000.0);
        assert_eq!(transaction.total_amount, 44_000.0);
        assert_eq!(transaction.change_amount, 16_000.0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn invoice_numbers_sequence_within_the_day() {
        let fixture = fixture(0.0).await;
        fixture
            .checkout
            .open_shift("shift-1", "user-1", 0.0)
            .await
            .unwrap();

        for expected in 1..=3 {
            let transaction = fixture
                .checkout
                .record_sale(SaleRequest::cash("user-1", cart(), 50_000.0))
                .await
                .unwrap();
            assert!(transaction.invoice_number.starts_with("INV-"));
            assert!(transaction
                .invoice_number
                .ends_with(&format!("-{expected:04}-OFF")));
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn session_aggregates_track_cash_and_cashless() {
        let fixture = fixture(0.0).await;
        fixture
            .checkout
            .open_shift("shift-1", "user-1", 100_000.0)
            .await
            .unwrap();

        let cash_items = vec![SaleItem {
            product_id: None,
            name: "Kopi Susu".to_string(),
            sku: None,
            price: 20_000.0,
            quantity: 1.0,
        }];
        fixture
            .checkout
            .record_sale(SaleRequest::cash("user-1", cash_items, 20_000.0))
            .await
            .unwrap();

        let card_items = vec![SaleItem {
            product_id: None,
            name: "Teh Manis".to_string(),
            sku: None,
            price: 30_000.0,
            quantity: 1.0,
        }];
        let mut card_request = SaleRequest::cash("user-1", card_items, 30_000.0);
        card_request.payment_method = PaymentMethod::Card;
        fixture.checkout.record_sale(card_request).await.unwrap();

        let sessions = LibSqlSessionRepository::new(fixture.db.connection());
        let session = sessions.find_open_for("user-1").await.unwrap().unwrap();
        assert_eq!(session.total_sales, 50_000.0);
        assert_eq!(session.total_transactions, 2);
        assert_eq!(session.total_cash, 20_000.0);
        assert_eq!(session.total_cashless, 30_000.0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stock_decrements_only_trackable_products() {
        let fixture = fixture(0.0).await;
        seed_product(&fixture.db, "p1", 10.0, true).await;
        seed_product(&fixture.db, "p2", 5.0, false).await;
        fixture
            .checkout
            .open_shift("shift-1", "user-1", 0.0)
            .await
            .unwrap();

        fixture
            .checkout
            .record_sale(SaleRequest::cash("user-1", cart(), 50_000.0))
            .await
            .unwrap();

        let catalog = LibSqlCatalogRepository::new(fixture.db.connection());
        assert_eq!(
            catalog.get_product("p1").await.unwrap().unwrap().stock_quantity,
            8.0
        );
        // Non-trackable product untouched and not enqueued
        assert_eq!(
            catalog.get_product("p2").await.unwrap().unwrap().stock_quantity,
            5.0
        );
        let queue = LibSqlQueueRepository::new(fixture.db.connection());
        let product_updates: Vec<String> = queue
            .load_pending()
            .await
            .unwrap()
            .into_iter()
            .filter(|entry| entry.collection == Collection::Products)
            .map(|entry| entry.record_id)
            .collect();
        assert_eq!(product_updates, vec!["p1".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn custom_employee_splits_carry_amounts() {
        let fixture = fixture(0.0).await;
        fixture
            .checkout
            .open_shift("shift-1", "user-1", 0.0)
            .await
            .unwrap();

        let mut request = SaleRequest::cash("user-1", cart(), 50_000.0);
        request.employee_splits = vec![
            EmployeeSplit {
                user_id: "user-1".to_string(),
                percentage: 60.0,
            },
            EmployeeSplit {
                user_id: "user-2".to_string(),
                percentage: 40.0,
            },
        ];
        let transaction = fixture.checkout.record_sale(request).await.unwrap();

        let sales = LibSqlSalesRepository::new(fixture.db.connection());
        let employees = sales.employees_for(&transaction.id).await.unwrap();
        assert_eq!(employees.len(), 2);
        let amounts: f64 = employees.iter().map(|employee| employee.amount).sum();
        assert_eq!(amounts, 50_000.0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn second_open_shift_is_rejected() {
        let fixture = fixture(0.0).await;
        fixture
            .checkout
            .open_shift("shift-1", "user-1", 100_000.0)
            .await
            .unwrap();

        let error = fixture
            .checkout
            .open_shift("shift-1", "user-1", 50_000.0)
            .await
            .unwrap_err();
        assert!(error.to_string().contains("already has an open shift"));

        // A different operator may still open one
        fixture
            .checkout
            .open_shift("shift-1", "user-2", 50_000.0)
            .await
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn close_shift_computes_discrepancy_and_queues_update() {
        let fixture = fixture(0.0).await;
        let session = fixture
            .checkout
            .open_shift("shift-1", "user-1", 100_000.0)
            .await
            .unwrap();

        fixture
            .checkout
            .record_sale(SaleRequest::cash("user-1", cart(), 50_000.0))
            .await
            .unwrap();
        fixture
            .checkout
            .record_expense(&session.id, 10_000.0)
            .await
            .unwrap();

        let closed = fixture
            .checkout
            .close_shift(&session.id, 138_000.0, None)
            .await
            .unwrap();
        // expected = 100k + 50k - 10k
        assert_eq!(closed.closing_balance, 140_000.0);
        assert_eq!(closed.discrepancy, -2_000.0);
        assert_eq!(closed.total_expenses, 10_000.0);

        // Closing an already closed session is rejected
        let error = fixture
            .checkout
            .close_shift(&session.id, 0.0, None)
            .await
            .unwrap_err();
        assert!(error.to_string().contains("already closed"));
    }
}
