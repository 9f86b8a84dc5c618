//! redb-based storage layer for orders, numbering and templates
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `sequence_buckets` | `(pattern, date-bucket)` | `u64` | Last issued sequence per bucket |
//! | `orders` | `order_id` | `FinalizedOrder` | Finalized orders |
//! | `order_numbers` | `order_number` | `order_id` | Unique number index |
//! | `customers` | `customer_id` | `Customer` | Customer records |
//! | `templates` | `template_id` | `TemplateConfig` | Export templates |
//! | `settings` | `"app"` | `AppSettings` | Business settings |
//!
//! Values are JSON (`serde_json`). Every mutating call runs in its own write
//! transaction; redb serializes writers, so a bucket increment is atomic
//! across threads.

use super::traits::BucketKey;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use shared::models::{AppSettings, Customer, FinalizedOrder, TemplateConfig};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Sequence buckets: key = (pattern, "YYYY-MM-DD" or "*"), value = last issued value
const SEQUENCE_TABLE: TableDefinition<(&str, &str), u64> =
    TableDefinition::new("sequence_buckets");

/// Orders: key = order_id, value = JSON-serialized FinalizedOrder
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Unique order number index: key = order_number, value = order_id
const ORDER_NUMBERS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("order_numbers");

/// Customers: key = customer_id, value = JSON-serialized Customer
const CUSTOMERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("customers");

/// Templates: key = template_id, value = JSON-serialized TemplateConfig
const TEMPLATES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("templates");

/// Settings: single row under SETTINGS_KEY
const SETTINGS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("settings");

const SETTINGS_KEY: &str = "app";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Order number {number} already belongs to order {order_id}")]
    DuplicateOrderNumber { number: String, order_id: String },
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Order storage backed by redb
#[derive(Clone)]
pub struct OrderStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for OrderStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderStorage").finish_non_exhaustive()
    }
}

impl OrderStorage {
    /// Open or create the database at the given path
    ///
    /// redb commits with `Durability::Immediate` by default: once `commit()`
    /// returns the data is on disk, so an issued number survives a crash.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (tests, dry runs)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        // Create all tables if they don't exist
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(SEQUENCE_TABLE)?;
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(ORDER_NUMBERS_TABLE)?;
            let _ = write_txn.open_table(CUSTOMERS_TABLE)?;
            let _ = write_txn.open_table(TEMPLATES_TABLE)?;
            let _ = write_txn.open_table(SETTINGS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    // ========== Sequence Operations ==========

    /// Increment a bucket and return the new value (first value is 1)
    pub fn next_sequence(&self, key: &BucketKey) -> StorageResult<u64> {
        let txn = self.db.begin_write()?;
        let mut table = txn.open_table(SEQUENCE_TABLE)?;
        let bucket = (key.pattern.as_str(), key.bucket.as_str());
        let current = table.get(bucket)?.map(|g| g.value()).unwrap_or(0);
        let next = current + 1;
        table.insert(bucket, next)?;
        drop(table);
        txn.commit()?;
        Ok(next)
    }

    /// Last issued value of a bucket (0 when never used)
    pub fn current_sequence(&self, key: &BucketKey) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SEQUENCE_TABLE)?;
        Ok(table
            .get((key.pattern.as_str(), key.bucket.as_str()))?
            .map(|g| g.value())
            .unwrap_or(0))
    }

    // ========== Order Operations ==========

    /// Insert or replace an order, keeping the number index unique
    ///
    /// `customer`, when given, is upserted in the same write transaction.
    /// Fails with [`StorageError::DuplicateOrderNumber`] when the number is
    /// already indexed for a different order; nothing is written then.
    pub fn save_order(
        &self,
        order: &FinalizedOrder,
        customer: Option<&Customer>,
    ) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut numbers = txn.open_table(ORDER_NUMBERS_TABLE)?;
            let owner = numbers
                .get(order.order_number.as_str())?
                .map(|g| g.value().to_string());
            if let Some(owner) = owner
                && owner != order.id
            {
                return Err(StorageError::DuplicateOrderNumber {
                    number: order.order_number.clone(),
                    order_id: owner,
                });
            }

            let mut orders = txn.open_table(ORDERS_TABLE)?;
            let previous = match orders.get(order.id.as_str())? {
                Some(value) => Some(serde_json::from_slice::<FinalizedOrder>(value.value())?),
                None => None,
            };
            if let Some(previous) = previous
                && previous.order_number != order.order_number
            {
                numbers.remove(previous.order_number.as_str())?;
            }

            let value = serde_json::to_vec(order)?;
            orders.insert(order.id.as_str(), value.as_slice())?;
            numbers.insert(order.order_number.as_str(), order.id.as_str())?;

            if let Some(customer) = customer {
                let mut customers = txn.open_table(CUSTOMERS_TABLE)?;
                let value = serde_json::to_vec(customer)?;
                customers.insert(customer.id.as_str(), value.as_slice())?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    /// Get an order by id
    pub fn get_order(&self, order_id: &str) -> StorageResult<Option<FinalizedOrder>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get an order by its number
    pub fn find_order_by_number(&self, number: &str) -> StorageResult<Option<FinalizedOrder>> {
        let read_txn = self.db.begin_read()?;
        let numbers = read_txn.open_table(ORDER_NUMBERS_TABLE)?;
        let Some(order_id) = numbers.get(number)?.map(|g| g.value().to_string()) else {
            return Ok(None);
        };

        let orders = read_txn.open_table(ORDERS_TABLE)?;
        match orders.get(order_id.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Err(StorageError::OrderNotFound(order_id)),
        }
    }

    /// All orders, newest first
    pub fn list_orders(&self) -> StorageResult<Vec<FinalizedOrder>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        let mut orders = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let order: FinalizedOrder = serde_json::from_slice(value.value())?;
            orders.push(order);
        }

        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    // ========== Customer Operations ==========

    pub fn upsert_customer(&self, customer: &Customer) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(CUSTOMERS_TABLE)?;
            let value = serde_json::to_vec(customer)?;
            table.insert(customer.id.as_str(), value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_customer(&self, customer_id: &str) -> StorageResult<Option<Customer>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CUSTOMERS_TABLE)?;

        match table.get(customer_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn list_customers(&self) -> StorageResult<Vec<Customer>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CUSTOMERS_TABLE)?;

        let mut customers = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            customers.push(serde_json::from_slice(value.value())?);
        }
        Ok(customers)
    }

    /// Customer matching a non-empty phone or license plate, most recently updated first
    pub fn find_customer_by_identity(
        &self,
        phone: &str,
        license_plate: &str,
    ) -> StorageResult<Option<Customer>> {
        let phone = phone.trim();
        let plate = license_plate.trim();
        if phone.is_empty() && plate.is_empty() {
            return Ok(None);
        }

        let found = self
            .list_customers()?
            .into_iter()
            .filter(|c| {
                (!phone.is_empty() && c.phone.trim() == phone)
                    || (!plate.is_empty() && c.license_plate.trim().eq_ignore_ascii_case(plate))
            })
            .max_by_key(|c| c.updated_at);
        Ok(found)
    }

    // ========== Template Operations ==========

    /// Insert or replace a template
    ///
    /// Saving a template flagged `is_default` clears the flag on all others.
    pub fn save_template(&self, template: &TemplateConfig) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(TEMPLATES_TABLE)?;

            if template.is_default {
                let mut demoted = Vec::new();
                for result in table.iter()? {
                    let (key, value) = result?;
                    let mut other: TemplateConfig = serde_json::from_slice(value.value())?;
                    if other.is_default && key.value() != template.id {
                        other.is_default = false;
                        demoted.push(other);
                    }
                }
                for other in demoted {
                    let value = serde_json::to_vec(&other)?;
                    table.insert(other.id.as_str(), value.as_slice())?;
                }
            }

            let value = serde_json::to_vec(template)?;
            table.insert(template.id.as_str(), value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_template(&self, template_id: &str) -> StorageResult<Option<TemplateConfig>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TEMPLATES_TABLE)?;

        match table.get(template_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// All templates, oldest first
    pub fn list_templates(&self) -> StorageResult<Vec<TemplateConfig>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TEMPLATES_TABLE)?;

        let mut templates = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let template: TemplateConfig = serde_json::from_slice(value.value())?;
            templates.push(template);
        }

        templates.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(templates)
    }

    /// Remove a template; returns whether it existed
    pub fn delete_template(&self, template_id: &str) -> StorageResult<bool> {
        let txn = self.db.begin_write()?;
        let existed = {
            let mut table = txn.open_table(TEMPLATES_TABLE)?;
            table.remove(template_id)?.is_some()
        };
        txn.commit()?;
        Ok(existed)
    }

    /// Template flagged `is_default`, if any
    pub fn default_template(&self) -> StorageResult<Option<TemplateConfig>> {
        Ok(self.list_templates()?.into_iter().find(|t| t.is_default))
    }

    /// Set every template's filename pattern to `pattern`; returns how many changed
    pub fn reset_filename_patterns(&self, pattern: &str) -> StorageResult<usize> {
        let txn = self.db.begin_write()?;
        let changed = {
            let mut table = txn.open_table(TEMPLATES_TABLE)?;

            let mut stale = Vec::new();
            for result in table.iter()? {
                let (_key, value) = result?;
                let template: TemplateConfig = serde_json::from_slice(value.value())?;
                if template.filename_pattern != pattern {
                    stale.push(template);
                }
            }

            let now = shared::util::now_millis();
            for mut template in stale.iter().cloned() {
                template.filename_pattern = pattern.to_string();
                template.updated_at = now;
                let value = serde_json::to_vec(&template)?;
                table.insert(template.id.as_str(), value.as_slice())?;
            }
            stale.len()
        };
        txn.commit()?;
        Ok(changed)
    }

    // ========== Settings Operations ==========

    /// Stored settings, or defaults when none were saved yet
    pub fn settings(&self) -> StorageResult<AppSettings> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SETTINGS_TABLE)?;

        match table.get(SETTINGS_KEY)? {
            Some(value) => Ok(serde_json::from_slice(value.value())?),
            None => Ok(AppSettings::default()),
        }
    }

    pub fn save_settings(&self, settings: &AppSettings) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(SETTINGS_TABLE)?;
            let value = serde_json::to_vec(settings)?;
            table.insert(SETTINGS_KEY, value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }
}
