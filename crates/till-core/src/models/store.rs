//! Store profile model

use serde::{Deserialize, Serialize};

/// The active store (tenant) the device is signed in to.
///
/// Every remote call is scoped by `id`; `tax_percentage` feeds checkout math.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tax_percentage: f64,
}

impl StoreProfile {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, tax_percentage: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tax_percentage,
        }
    }
}
