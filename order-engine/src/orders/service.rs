//! OrderService - save and export flow
//!
//! # Save Flow
//!
//! ```text
//! save_active(arena)
//!     ├─ 1. Validate draft (customer, items, quantities, prices)
//!     ├─ 2. Number: reuse cached, allocate (sequential) or derive (manual)
//!     ├─ 3. Keep the number on the tab (survives later failures)
//!     ├─ 4. Build FinalizedOrder (money via rust_decimal)
//!     ├─ 5. Refresh real customer / snapshot temporary one
//!     ├─ 6. Persist order + customer in one write (unique number index)
//!     ├─ 7. Export when requested
//!     └─ 8. mark_saved, or leave dirty when export failed
//! ```

use super::traits::{OrderRecordStore, SettingsProvider};
use crate::core::{EngineError, EngineResult, ValidationErrors, ValidationIssue};
use crate::drafts::DraftArena;
use crate::export::{ExportCoordinator, ExportOutcome};
use crate::numbering::{NumberAllocator, NumberingRules, format};
use crate::order_money::{calculate_order_total, to_f64, validate_lines};
use chrono::NaiveDate;
use shared::models::{
    Customer, DraftCustomer, DraftOrderState, FinalizedOrder, NumberAssignment, NumberingMode,
    OrderStatus,
};
use shared::util::{new_id, now_millis};
use std::sync::Arc;

/// What happened to the export part of a save
#[derive(Debug)]
pub enum ExportStatus {
    NotRequested,
    Written(ExportOutcome),
    Cancelled,
    /// The order is persisted; only the export failed
    Failed(EngineError),
}

impl ExportStatus {
    fn from_result(result: EngineResult<Option<ExportOutcome>>) -> Self {
        match result {
            Ok(Some(outcome)) => Self::Written(outcome),
            Ok(None) => Self::Cancelled,
            Err(e) => Self::Failed(e),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// A persisted order and the export outcome
#[derive(Debug)]
pub struct SavedOrder {
    pub order: FinalizedOrder,
    pub export: ExportStatus,
}

/// Turns drafts into finalized orders
#[derive(Clone)]
pub struct OrderService {
    records: Arc<dyn OrderRecordStore>,
    settings: Arc<dyn SettingsProvider>,
    allocator: NumberAllocator,
    exporter: ExportCoordinator,
}

impl std::fmt::Debug for OrderService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderService")
            .field("records", &"<OrderRecordStore>")
            .field("settings", &"<SettingsProvider>")
            .finish()
    }
}

impl OrderService {
    pub fn new(
        records: Arc<dyn OrderRecordStore>,
        settings: Arc<dyn SettingsProvider>,
        allocator: NumberAllocator,
        exporter: ExportCoordinator,
    ) -> Self {
        Self {
            records,
            settings,
            allocator,
            exporter,
        }
    }

    /// Save a draft as a new order
    pub async fn save_order(
        &self,
        draft: &DraftOrderState,
        export_requested: bool,
    ) -> EngineResult<SavedOrder> {
        validate_draft(draft)?;
        let assignment = self.assign_number(draft)?;
        self.persist(draft, &assignment, None, export_requested).await
    }

    /// Save the arena's active tab and update it
    ///
    /// The assigned number is kept on the tab as soon as it exists, so a
    /// failed save retried later reuses it. A failed export leaves the tab
    /// dirty.
    pub async fn save_active(
        &self,
        arena: &mut DraftArena,
        export_requested: bool,
    ) -> EngineResult<SavedOrder> {
        let tab = arena.get_active_tab().clone();
        validate_draft(&tab.draft)?;

        let assignment = self.assign_number(&tab.draft)?;
        arena.record_number(&tab.id, assignment.clone())?;

        let saved = self
            .persist(&tab.draft, &assignment, tab.order_id.as_deref(), export_requested)
            .await?;

        if saved.export.is_failed() {
            tracing::warn!(
                tab_id = %tab.id,
                order_number = %saved.order.order_number,
                "Order saved but export failed, tab stays dirty"
            );
        } else {
            arena.mark_saved(&tab.id, &saved.order)?;
        }
        Ok(saved)
    }

    pub async fn export_order(
        &self,
        order: &FinalizedOrder,
        template_id: Option<&str>,
    ) -> EngineResult<Option<ExportOutcome>> {
        self.exporter.export_order(order, template_id).await
    }

    pub async fn export_orders_batch(
        &self,
        orders: &[FinalizedOrder],
    ) -> EngineResult<Option<ExportOutcome>> {
        self.exporter.export_orders_batch(orders).await
    }

    /// Number the next sequential save on `date` would get
    pub fn preview_number(&self, date: NaiveDate) -> EngineResult<String> {
        let rules = NumberingRules::from_settings(&self.settings.settings()?);
        if rules.mode == NumberingMode::Manual {
            return Ok(format(
                &rules.pattern,
                None,
                date,
                &rules.custom_prefix,
                rules.default_width,
            ));
        }
        self.allocator
            .clone()
            .with_default_width(rules.default_width)
            .peek(&rules.pattern, date, rules.daily_reset, &rules.custom_prefix)
    }

    /// Cached number when the draft has one, else a fresh one
    fn assign_number(&self, draft: &DraftOrderState) -> EngineResult<NumberAssignment> {
        if let Some(existing) = draft.number.as_ref().filter(|n| !n.number.is_empty()) {
            return Ok(existing.clone());
        }
        let rules = NumberingRules::from_settings(&self.settings.settings()?);
        self.allocator.assign(&rules, draft.order_date)
    }

    async fn persist(
        &self,
        draft: &DraftOrderState,
        assignment: &NumberAssignment,
        order_id: Option<&str>,
        export_requested: bool,
    ) -> EngineResult<SavedOrder> {
        let previous = match order_id {
            Some(id) => self.records.get_order(id)?,
            None => None,
        };
        let order_id = order_id.map(str::to_string).unwrap_or_else(new_id);
        let now = now_millis();

        let customer = self.resolve_customer(draft, &order_id, now)?;
        let order = FinalizedOrder {
            id: order_id,
            order_number: assignment.number.clone(),
            date: draft.order_date,
            customer,
            lines: draft.items.clone(),
            total_amount: to_f64(calculate_order_total(&draft.items)),
            note: draft.note.clone().filter(|n| !n.trim().is_empty()),
            template_id: draft.template_id.clone(),
            status: previous.as_ref().map(|p| p.status).unwrap_or(OrderStatus::Completed),
            created_at: previous.as_ref().map(|p| p.created_at).unwrap_or(now),
            updated_at: now,
        };

        let customer_record = matches!(draft.customer, Some(DraftCustomer::Existing(_)))
            .then_some(&order.customer);
        self.records.save_order(&order, customer_record)?;
        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = order.total_amount,
            items = order.lines.len(),
            "Order saved"
        );

        let export = if export_requested {
            let status = ExportStatus::from_result(self.exporter.export_order(&order, None).await);
            if let ExportStatus::Failed(e) = &status {
                tracing::warn!(
                    order_number = %order.order_number,
                    error = %e,
                    "Export after save failed"
                );
            }
            status
        } else {
            ExportStatus::NotRequested
        };

        Ok(SavedOrder { order, export })
    }

    /// Customer copy stored with the order
    ///
    /// Real customers get a fresh `last_purchase_at` and are written back
    /// together with the order; temporary ones become a snapshot keyed by
    /// the order id.
    fn resolve_customer(
        &self,
        draft: &DraftOrderState,
        order_id: &str,
        now: i64,
    ) -> EngineResult<Customer> {
        let Some(draft_customer) = &draft.customer else {
            return Err(ValidationIssue::MissingCustomer.into());
        };

        match draft_customer {
            DraftCustomer::Temporary(c) => Ok(Customer {
                id: Customer::snapshot_id(order_id),
                created_at: if c.created_at > 0 { c.created_at } else { now },
                updated_at: now,
                ..c.clone()
            }),
            DraftCustomer::Existing(c) => {
                let stored = self.records.get_customer(&c.id)?;
                Ok(Customer {
                    last_purchase_at: Some(now),
                    created_at: stored
                        .as_ref()
                        .map(|s| s.created_at)
                        .filter(|t| *t > 0)
                        .unwrap_or(now),
                    updated_at: now,
                    ..c.clone()
                })
            }
        }
    }
}

/// Everything a draft needs before it can be numbered
pub fn validate_draft(draft: &DraftOrderState) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let named = draft
        .customer
        .as_ref()
        .is_some_and(|c| !c.customer().name.trim().is_empty());
    if !named {
        errors.push(ValidationIssue::MissingCustomer);
    }
    if draft.items.is_empty() {
        errors.push(ValidationIssue::EmptyItems);
    }
    errors.extend(validate_lines(&draft.items));

    errors.into_result()
}
