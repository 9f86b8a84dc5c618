//! Customer Model

use serde::{Deserialize, Serialize};

/// Id prefix the UI uses for customers typed in on the spot
pub const TEMP_CUSTOMER_PREFIX: &str = "temp_";

/// Id prefix of customer snapshots stored with an order
pub const ORDER_CUSTOMER_PREFIX: &str = "order_customer_";

/// Customer entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Customer {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default, alias = "licensePlate")]
    pub license_plate: String,
    #[serde(default)]
    pub address: Option<String>,
    /// Unix millis of the last saved order
    #[serde(default, alias = "lastPurchaseAt")]
    pub last_purchase_at: Option<i64>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl Customer {
    /// Snapshot id used for temporary customers of an order
    pub fn snapshot_id(order_id: &str) -> String {
        format!("{ORDER_CUSTOMER_PREFIX}{order_id}")
    }

    pub fn is_snapshot(&self) -> bool {
        self.id.starts_with(ORDER_CUSTOMER_PREFIX)
    }
}

/// Customer attached to a draft
///
/// `Existing` customers live in the customer table and are updated on save;
/// `Temporary` ones are only copied into the order as a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "customer", rename_all = "snake_case")]
pub enum DraftCustomer {
    Existing(Customer),
    Temporary(Customer),
}

impl DraftCustomer {
    /// Classify a customer coming from the UI by its id
    pub fn classify(customer: Customer) -> Self {
        if customer.id.is_empty() || customer.id.starts_with(TEMP_CUSTOMER_PREFIX) {
            Self::Temporary(customer)
        } else {
            Self::Existing(customer)
        }
    }

    pub fn customer(&self) -> &Customer {
        match self {
            Self::Existing(c) | Self::Temporary(c) => c,
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary(_))
    }
}
