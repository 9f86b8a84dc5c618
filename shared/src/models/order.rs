//! Order Model

use super::customer::Customer;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Order status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Order line (also the item shape inside drafts)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct OrderLine {
    /// Product reference (String ID), absent for free-typed items
    #[serde(default, alias = "productId")]
    pub product_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub unit: String,
    /// Unit price in currency unit
    #[serde(alias = "unitPrice")]
    pub unit_price: f64,
    pub quantity: f64,
    /// Price override in currency unit (discounted price)
    #[serde(default, alias = "overridePrice", alias = "discount_price")]
    pub override_price: Option<f64>,
    #[serde(default, alias = "remark")]
    pub note: Option<String>,
    /// Position marker; lines are ordered by this value
    #[serde(default, alias = "sortValue")]
    pub sort_value: i64,
}

impl OrderLine {
    /// Override price if set, else unit price
    pub fn effective_price(&self) -> f64 {
        self.override_price.unwrap_or(self.unit_price)
    }
}

/// Finalized order (immutable once numbered)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinalizedOrder {
    pub id: String,
    pub order_number: String,
    pub date: NaiveDate,
    /// Customer as it was at save time
    pub customer: Customer,
    pub lines: Vec<OrderLine>,
    /// Total amount in currency unit (2 dp)
    pub total_amount: f64,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub status: OrderStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Order list row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderSummary {
    pub id: String,
    pub order_number: String,
    pub date: NaiveDate,
    pub customer_name: String,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub created_at: i64,
}

impl From<&FinalizedOrder> for OrderSummary {
    fn from(order: &FinalizedOrder) -> Self {
        Self {
            id: order.id.clone(),
            order_number: order.order_number.clone(),
            date: order.date,
            customer_name: order.customer.name.clone(),
            total_amount: order.total_amount,
            status: order.status,
            created_at: order.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_price_prefers_override() {
        let mut line = OrderLine {
            name: "机油".to_string(),
            unit_price: 80.0,
            quantity: 1.0,
            ..Default::default()
        };
        assert_eq!(line.effective_price(), 80.0);
        line.override_price = Some(72.5);
        assert_eq!(line.effective_price(), 72.5);
    }

    #[test]
    fn test_line_accepts_legacy_keys() {
        let json = r#"{"name":"滤芯","unit":"个","unitPrice":30,"quantity":2,"discount_price":25,"remark":"原厂","sortValue":3}"#;
        let line: OrderLine = serde_json::from_str(json).unwrap();
        assert_eq!(line.override_price, Some(25.0));
        assert_eq!(line.note.as_deref(), Some("原厂"));
        assert_eq!(line.sort_value, 3);
    }

    #[test]
    fn test_status_serde() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
        assert_eq!(OrderStatus::Completed.as_str(), "completed");
    }
}
