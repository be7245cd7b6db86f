//! Catalog repository: locally mirrored reference data.
//!
//! The remote store owns these collections. Pulls replace rows wholesale by
//! id (last-pull-wins); local stock decrements are applied for immediate UI
//! correctness and may be overwritten by a later pull.

use libsql::Connection;

use crate::error::{Error, Result};
use crate::models::{Collection, Product};
use crate::util::rfc3339_now;

/// Trait for reference mirror storage operations (async)
#[allow(async_fn_in_trait)]
pub trait CatalogRepository {
    /// Replace-by-id upsert of one pulled batch for a reference collection
    async fn upsert_mirror(&self, collection: Collection, rows: &[serde_json::Value])
        -> Result<usize>;

    /// Upsert a single product row, rewriting its snapshot payload
    async fn upsert_product(&self, product: &Product) -> Result<()>;

    /// Get a product by id
    async fn get_product(&self, id: &str) -> Result<Option<Product>>;

    /// Get a product by barcode
    async fn find_by_barcode(&self, barcode: &str) -> Result<Option<Product>>;

    /// Search active products by name, SKU, or barcode
    async fn search_products(&self, query: &str, limit: usize) -> Result<Vec<Product>>;

    /// Number of mirrored rows for a reference collection
    async fn mirror_count(&self, collection: Collection) -> Result<u64>;
}

/// libSQL implementation of `CatalogRepository`
pub struct LibSqlCatalogRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlCatalogRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn mirror_table(collection: Collection) -> Result<&'static str> {
        if Collection::REFERENCE.contains(&collection) {
            Ok(collection.as_str())
        } else {
            Err(Error::InvalidInput(format!(
                "{collection} is not a mirrored reference collection"
            )))
        }
    }

    fn parse_product(row: &libsql::Row) -> Result<Product> {
        let payload: String = row.get(0)?;
        let mut product: Product = serde_json::from_str(&payload)?;
        // The column is authoritative after local stock mutations
        product.stock_quantity = row.get(1)?;
        Ok(product)
    }
}

impl CatalogRepository for LibSqlCatalogRepository<'_> {
    async fn upsert_mirror(
        &self,
        collection: Collection,
        rows: &[serde_json::Value],
    ) -> Result<usize> {
        if collection == Collection::Products {
            for row in rows {
                let product: Product = serde_json::from_value(row.clone())?;
                self.upsert_product(&product).await?;
            }
            return Ok(rows.len());
        }

        let table = Self::mirror_table(collection)?;
        let synced_at = rfc3339_now();
        for row in rows {
            let id = row
                .get("id")
                .and_then(serde_json::Value::as_str)
                .ok_or_else(|| {
                    Error::InvalidInput(format!("pulled {collection} row without an id"))
                })?;
            self.conn
                .execute(
                    &format!(
                        "INSERT OR REPLACE INTO {table} (id, payload, synced_at) VALUES (?, ?, ?)"
                    ),
                    libsql::params![id, row.to_string(), synced_at.clone()],
                )
                .await?;
        }
        Ok(rows.len())
    }

    async fn upsert_product(&self, product: &Product) -> Result<()> {
        let mut stamped = product.clone();
        if stamped.synced_at.is_none() {
            stamped.synced_at = Some(rfc3339_now());
        }
        self.conn
            .execute(
                "INSERT OR REPLACE INTO products
                 (id, sku, barcode, name, is_trackable, is_active, stock_quantity, payload, synced_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                libsql::params![
                    stamped.id.clone(),
                    stamped.sku.clone(),
                    stamped.barcode.clone(),
                    stamped.name.clone(),
                    i32::from(stamped.is_trackable),
                    i32::from(stamped.is_active),
                    stamped.stock_quantity,
                    serde_json::to_string(&stamped)?,
                    stamped.synced_at.clone(),
                ],
            )
            .await?;
        Ok(())
    }

    async fn get_product(&self, id: &str) -> Result<Option<Product>> {
        let mut rows = self
            .conn
            .query(
                "SELECT payload, stock_quantity FROM products WHERE id = ?",
                [id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_product(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_by_barcode(&self, barcode: &str) -> Result<Option<Product>> {
        let mut rows = self
            .conn
            .query(
                "SELECT payload, stock_quantity FROM products WHERE barcode = ? LIMIT 1",
                [barcode],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_product(&row)?)),
            None => Ok(None),
        }
    }

    async fn search_products(&self, query: &str, limit: usize) -> Result<Vec<Product>> {
        let pattern = format!("%{}%", query.trim());
        let mut rows = self
            .conn
            .query(
                "SELECT payload, stock_quantity FROM products
                 WHERE is_active = 1
                   AND (name LIKE ? OR sku LIKE ? OR barcode LIKE ?)
                 ORDER BY name LIMIT ?",
                libsql::params![
                    pattern.clone(),
                    pattern.clone(),
                    pattern,
                    i64::try_from(limit).unwrap_or(i64::MAX)
                ],
            )
            .await?;
        let mut products = Vec::new();
        while let Some(row) = rows.next().await? {
            products.push(Self::parse_product(&row)?);
        }
        Ok(products)
    }

    async fn mirror_count(&self, collection: Collection) -> Result<u64> {
        let table = Self::mirror_table(collection)?;
        let mut rows = self
            .conn
            .query(&format!("SELECT COUNT(*) FROM {table}"), ())
            .await?;
        let count: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };
        Ok(u64::try_from(count).unwrap_or(0))
    }
}
