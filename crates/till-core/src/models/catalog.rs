//! Reference-data mirror models.
//!
//! These collections are owned by the remote store; the local copy is a read
//! replica refreshed by the periodic pull. Rows keep their full remote shape
//! (unknown fields land in `extra`) so a locally enqueued update re-sends the
//! whole snapshot.

use serde::{Deserialize, Serialize};

/// A product mirrored from the remote catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub store_id: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    pub name: String,
    #[serde(default)]
    pub selling_price: f64,
    #[serde(default)]
    pub stock_quantity: f64,
    #[serde(default = "default_true")]
    pub is_trackable: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub synced_at: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

const fn default_true() -> bool {
    true
}

impl Product {
    /// Decrement on-hand stock by `quantity`, clamped at zero.
    pub fn decrement_stock(&mut self, quantity: f64) {
        self.stock_quantity = (self.stock_quantity - quantity).max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn product(stock: f64) -> Product {
        serde_json::from_value(json!({
            "id": "p1",
            "name": "Kopi Susu",
            "sku": "KS-01",
            "selling_price": 15000.0,
            "stock_quantity": stock,
        }))
        .unwrap()
    }

    #[test]
    fn stock_decrement_clamps_at_zero() {
        let mut product = product(3.0);
        product.decrement_stock(2.0);
        assert_eq!(product.stock_quantity, 1.0);
        product.decrement_stock(5.0);
        assert_eq!(product.stock_quantity, 0.0);
    }

    #[test]
    fn unknown_remote_fields_survive_round_trip() {
        let value = json!({
            "id": "p1",
            "name": "Kopi Susu",
            "purchase_price": 9000.0,
            "unit": "pcs",
        });
        let product: Product = serde_json::from_value(value).unwrap();
        let back = serde_json::to_value(&product).unwrap();
        assert_eq!(back["purchase_price"], json!(9000.0));
        assert_eq!(back["unit"], json!("pcs"));
    }

    #[test]
    fn flags_default_on() {
        let product = product(1.0);
        assert!(product.is_trackable);
        assert!(product.is_active);
    }
}
