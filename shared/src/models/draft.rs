//! Draft (in-progress order) and tab models

use super::customer::DraftCustomer;
use super::order::OrderLine;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// How a cached order number was produced
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NumberKind {
    /// Consumed a sequence value; kept for the lifetime of the draft
    Sequenced,
    /// Formatted from date/prefix only; recomputed when that context changes
    Derived,
    /// Typed in by the user; kept until replaced or cleared
    Typed,
}

/// Order number already assigned to a draft
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NumberAssignment {
    pub number: String,
    pub kind: NumberKind,
}

impl NumberAssignment {
    pub fn sequenced(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            kind: NumberKind::Sequenced,
        }
    }

    pub fn derived(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            kind: NumberKind::Derived,
        }
    }

    pub fn typed(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            kind: NumberKind::Typed,
        }
    }
}

/// Draft order state edited inside a tab
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DraftOrderState {
    #[serde(default)]
    pub items: Vec<OrderLine>,
    #[serde(default)]
    pub customer: Option<DraftCustomer>,
    pub order_date: NaiveDate,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub number: Option<NumberAssignment>,
}

impl DraftOrderState {
    /// Empty draft dated `order_date`
    pub fn new(order_date: NaiveDate) -> Self {
        Self {
            items: Vec::new(),
            customer: None,
            order_date,
            note: None,
            template_id: None,
            number: None,
        }
    }

    /// Empty draft dated today (local time)
    pub fn today() -> Self {
        Self::new(chrono::Local::now().date_naive())
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.customer.is_none() && self.note.is_none()
    }
}

/// Partial update of a draft; an absent field is left untouched
///
/// Nullable fields are `Option<Option<_>>`: in JSON a missing key leaves the
/// field alone and `null` clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DraftPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<OrderLine>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub customer: Option<Option<DraftCustomer>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_date: Option<NaiveDate>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub note: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub template_id: Option<Option<String>>,
    /// Hand-typed order number (manual numbering); `null` drops a typed or
    /// derived number, a sequenced one is kept
    #[serde(
        default,
        alias = "orderNumber",
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub order_number: Option<Option<String>>,
}

/// A key that is present maps to `Some`, including `null` (`Some(None)`)
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl DraftPatch {
    pub fn items(items: Vec<OrderLine>) -> Self {
        Self {
            items: Some(items),
            ..Default::default()
        }
    }

    pub fn customer(customer: DraftCustomer) -> Self {
        Self {
            customer: Some(Some(customer)),
            ..Default::default()
        }
    }

    pub fn order_date(date: NaiveDate) -> Self {
        Self {
            order_date: Some(date),
            ..Default::default()
        }
    }

    pub fn template_id(template_id: Option<String>) -> Self {
        Self {
            template_id: Some(template_id),
            ..Default::default()
        }
    }

    pub fn order_number(number: Option<String>) -> Self {
        Self {
            order_number: Some(number),
            ..Default::default()
        }
    }

    /// Whether applying this patch changes the number's formatting context
    pub fn touches_number_context(&self, current: &DraftOrderState) -> bool {
        let date_changed = self.order_date.is_some_and(|d| d != current.order_date);
        let template_changed = self
            .template_id
            .as_ref()
            .is_some_and(|t| *t != current.template_id);
        date_changed || template_changed
    }
}

/// One open draft tab
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderTab {
    /// Tab id (uuid v4)
    pub id: String,
    /// Persisted order this tab edits, once saved or when reopened
    #[serde(default)]
    pub order_id: Option<String>,
    pub title: String,
    pub draft: DraftOrderState,
    pub active: bool,
    pub dirty: bool,
    pub created_at: i64,
    pub updated_at: i64,
}
