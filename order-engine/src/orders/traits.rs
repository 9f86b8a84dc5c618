//! Collaborator traits
//!
//! The engine talks to persistence and to the user only through these
//! seams. [`OrderStorage`] implements every store trait; the destination
//! prompt is supplied by the command surface (CLI, UI bridge, tests).

use super::storage::{OrderStorage, StorageResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use shared::models::{AppSettings, Customer, FinalizedOrder, TemplateConfig};
use std::path::{Path, PathBuf};

/// Bucket used when numbers never reset
pub const GLOBAL_BUCKET: &str = "*";

/// Key of one sequence counter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketKey {
    pub pattern: String,
    /// `YYYY-MM-DD` for daily reset, [`GLOBAL_BUCKET`] otherwise
    pub bucket: String,
}

impl BucketKey {
    pub fn new(pattern: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            bucket: bucket.into(),
        }
    }

    /// Bucket for an order date, or the global bucket when `daily_reset` is off
    pub fn resolve(pattern: &str, order_date: NaiveDate, daily_reset: bool) -> Self {
        if daily_reset {
            Self::new(pattern, order_date.format("%Y-%m-%d").to_string())
        } else {
            Self::new(pattern, GLOBAL_BUCKET)
        }
    }
}

/// Atomic per-bucket counters
pub trait SequenceSource: Send + Sync {
    /// Increment and return; concurrent callers never see the same value
    fn next_value(&self, key: &BucketKey) -> StorageResult<u64>;
    fn current_value(&self, key: &BucketKey) -> StorageResult<u64>;
}

/// Finalized orders and customers
pub trait OrderRecordStore: Send + Sync {
    /// Persist an order and, when given, its customer record atomically;
    /// returns the order number
    fn save_order(
        &self,
        order: &FinalizedOrder,
        customer: Option<&Customer>,
    ) -> StorageResult<String>;
    fn get_customer(&self, customer_id: &str) -> StorageResult<Option<Customer>>;
    fn get_order(&self, order_id: &str) -> StorageResult<Option<FinalizedOrder>>;
    fn find_by_number(&self, number: &str) -> StorageResult<Option<FinalizedOrder>>;
    fn list_orders(&self) -> StorageResult<Vec<FinalizedOrder>>;
}

pub trait SettingsProvider: Send + Sync {
    fn settings(&self) -> StorageResult<AppSettings>;
}

pub trait TemplateStore: Send + Sync {
    fn get_template(&self, template_id: &str) -> StorageResult<Option<TemplateConfig>>;
    fn list_templates(&self) -> StorageResult<Vec<TemplateConfig>>;
    fn save_template(&self, template: &TemplateConfig) -> StorageResult<()>;
    fn delete_template(&self, template_id: &str) -> StorageResult<bool>;
    fn default_template(&self) -> StorageResult<Option<TemplateConfig>>;
    /// Bulk-set filename patterns; returns how many templates changed
    fn reset_filename_patterns(&self, pattern: &str) -> StorageResult<usize>;
}

/// Asks where an export should be written
#[async_trait]
pub trait DestinationPrompt: Send + Sync {
    /// `None` means the user cancelled
    async fn choose(&self, suggested_name: &str, default_dir: Option<&Path>) -> Option<PathBuf>;
}

impl SequenceSource for OrderStorage {
    fn next_value(&self, key: &BucketKey) -> StorageResult<u64> {
        self.next_sequence(key)
    }

    fn current_value(&self, key: &BucketKey) -> StorageResult<u64> {
        self.current_sequence(key)
    }
}

impl OrderRecordStore for OrderStorage {
    fn save_order(
        &self,
        order: &FinalizedOrder,
        customer: Option<&Customer>,
    ) -> StorageResult<String> {
        OrderStorage::save_order(self, order, customer)?;
        Ok(order.order_number.clone())
    }

    fn get_customer(&self, customer_id: &str) -> StorageResult<Option<Customer>> {
        OrderStorage::get_customer(self, customer_id)
    }

    fn get_order(&self, order_id: &str) -> StorageResult<Option<FinalizedOrder>> {
        OrderStorage::get_order(self, order_id)
    }

    fn find_by_number(&self, number: &str) -> StorageResult<Option<FinalizedOrder>> {
        self.find_order_by_number(number)
    }

    fn list_orders(&self) -> StorageResult<Vec<FinalizedOrder>> {
        OrderStorage::list_orders(self)
    }
}

impl SettingsProvider for OrderStorage {
    fn settings(&self) -> StorageResult<AppSettings> {
        OrderStorage::settings(self)
    }
}

impl TemplateStore for OrderStorage {
    fn get_template(&self, template_id: &str) -> StorageResult<Option<TemplateConfig>> {
        OrderStorage::get_template(self, template_id)
    }

    fn list_templates(&self) -> StorageResult<Vec<TemplateConfig>> {
        OrderStorage::list_templates(self)
    }

    fn save_template(&self, template: &TemplateConfig) -> StorageResult<()> {
        OrderStorage::save_template(self, template)
    }

    fn delete_template(&self, template_id: &str) -> StorageResult<bool> {
        OrderStorage::delete_template(self, template_id)
    }

    fn default_template(&self) -> StorageResult<Option<TemplateConfig>> {
        OrderStorage::default_template(self)
    }

    fn reset_filename_patterns(&self, pattern: &str) -> StorageResult<usize> {
        OrderStorage::reset_filename_patterns(self, pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_resolution() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 9).unwrap();
        assert_eq!(
            BucketKey::resolve("NO.{SEQ}", date, true),
            BucketKey::new("NO.{SEQ}", "2026-01-09")
        );
        assert_eq!(
            BucketKey::resolve("NO.{SEQ}", date, false).bucket,
            GLOBAL_BUCKET
        );
    }
}
