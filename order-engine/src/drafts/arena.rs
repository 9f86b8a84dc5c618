use crate::core::ArenaError;
use shared::models::{
    DraftCustomer, DraftOrderState, DraftPatch, FinalizedOrder, NumberAssignment, NumberKind,
    OrderTab,
};
use shared::util::{new_id, now_millis};

/// Maximum number of open tabs
pub const MAX_TABS: usize = 4;

/// Title of a tab that has not been saved yet
pub const NEW_TAB_TITLE: &str = "新订单";

/// What `create_tab` does when the arena is full and every candidate is dirty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Evict the oldest inactive tab even with unsaved changes
    #[default]
    ForceOldest,
    /// Refuse with [`ArenaError::AllTabsDirty`]
    RejectWhenAllDirty,
}

/// Result of `create_tab`
#[derive(Debug, Clone)]
pub struct CreatedTab {
    pub id: String,
    /// Tab removed to make room, handed back to the caller
    pub evicted: Option<OrderTab>,
}

/// Bounded set of draft tabs with exactly one active tab
///
/// Single owner, `&mut self` API. Holds between 1 and [`MAX_TABS`] tabs.
#[derive(Debug, Clone)]
pub struct DraftArena {
    tabs: Vec<OrderTab>,
    active_id: String,
    policy: EvictionPolicy,
}

impl Default for DraftArena {
    fn default() -> Self {
        Self::new()
    }
}

impl DraftArena {
    /// Arena holding one empty, active tab
    pub fn new() -> Self {
        Self::with_policy(EvictionPolicy::default())
    }

    pub fn with_policy(policy: EvictionPolicy) -> Self {
        let mut tab = empty_tab();
        tab.active = true;
        Self {
            active_id: tab.id.clone(),
            tabs: vec![tab],
            policy,
        }
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    pub fn tabs(&self) -> &[OrderTab] {
        &self.tabs
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn tab(&self, id: &str) -> Option<&OrderTab> {
        self.tabs.iter().find(|t| t.id == id)
    }

    pub fn active_id(&self) -> &str {
        &self.active_id
    }

    /// Whether a tab has unsaved changes; callers confirm before closing
    pub fn is_dirty(&self, id: &str) -> Result<bool, ArenaError> {
        self.tab(id)
            .map(|t| t.dirty)
            .ok_or_else(|| ArenaError::TabNotFound(id.to_string()))
    }

    /// Open a new tab (empty, or editing `existing`) and make it active
    ///
    /// A full arena evicts first: the oldest clean inactive tab, else per
    /// [`EvictionPolicy`]. The active tab is never evicted.
    pub fn create_tab(
        &mut self,
        existing: Option<&FinalizedOrder>,
    ) -> Result<CreatedTab, ArenaError> {
        let evicted = if self.tabs.len() >= MAX_TABS {
            Some(self.evict_one()?)
        } else {
            None
        };

        let tab = match existing {
            Some(order) => tab_for_order(order),
            None => empty_tab(),
        };
        let id = tab.id.clone();
        self.tabs.push(tab);
        self.activate(&id);

        tracing::debug!(tab_id = %id, tabs = self.tabs.len(), "Draft tab created");
        Ok(CreatedTab { id, evicted })
    }

    /// Close a tab; the sole remaining tab cannot be closed
    ///
    /// Closing the active tab activates the tab now at the same index, or
    /// the last tab when it was the last one.
    pub fn close_tab(&mut self, id: &str) -> Result<OrderTab, ArenaError> {
        let idx = self
            .position(id)
            .ok_or_else(|| ArenaError::TabNotFound(id.to_string()))?;
        if self.tabs.len() == 1 {
            return Err(ArenaError::LastTab);
        }

        let closed = self.tabs.remove(idx);
        if closed.id == self.active_id {
            let next = idx.min(self.tabs.len() - 1);
            let next_id = self.tabs[next].id.clone();
            self.activate(&next_id);
        }
        Ok(closed)
    }

    pub fn switch_tab(&mut self, id: &str) -> Result<(), ArenaError> {
        if self.position(id).is_none() {
            return Err(ArenaError::TabNotFound(id.to_string()));
        }
        self.activate(id);
        Ok(())
    }

    /// Active tab, repairing the arena first if needed
    pub fn get_active_tab(&mut self) -> &OrderTab {
        let idx = self.ensure_active();
        &self.tabs[idx]
    }

    /// Merge `patch` into the active draft and mark it dirty
    ///
    /// A date or template change drops a `Derived` number so it is rendered
    /// again on save. `Sequenced` numbers are kept. A typed `order_number`
    /// replaces the cached number; clearing it never drops a `Sequenced` one.
    pub fn update_active_draft(&mut self, patch: DraftPatch) -> &OrderTab {
        let idx = self.ensure_active();
        let tab = &mut self.tabs[idx];

        if patch.touches_number_context(&tab.draft)
            && tab
                .draft
                .number
                .as_ref()
                .is_some_and(|n| n.kind == NumberKind::Derived)
        {
            tab.draft.number = None;
        }

        let draft = &mut tab.draft;
        if let Some(items) = patch.items {
            draft.items = items;
        }
        if let Some(customer) = patch.customer {
            draft.customer = customer;
        }
        if let Some(order_date) = patch.order_date {
            draft.order_date = order_date;
        }
        if let Some(note) = patch.note {
            draft.note = note;
        }
        if let Some(template_id) = patch.template_id {
            draft.template_id = template_id;
        }
        match patch.order_number {
            Some(Some(number)) if !number.trim().is_empty() => {
                draft.number = Some(NumberAssignment::typed(number.trim()));
            }
            Some(_) => {
                if draft
                    .number
                    .as_ref()
                    .is_some_and(|n| n.kind != NumberKind::Sequenced)
                {
                    draft.number = None;
                }
            }
            None => {}
        }

        tab.dirty = true;
        tab.updated_at = now_millis();
        &self.tabs[idx]
    }

    /// Record a successful save: link the order, keep its number, clear dirty
    pub fn mark_saved(&mut self, id: &str, order: &FinalizedOrder) -> Result<(), ArenaError> {
        let tab = self.tab_mut(id)?;
        let kind = tab
            .draft
            .number
            .as_ref()
            .filter(|n| n.number == order.order_number)
            .map(|n| n.kind)
            .unwrap_or(NumberKind::Sequenced);

        tab.order_id = Some(order.id.clone());
        tab.title = order.order_number.clone();
        tab.draft.number = Some(NumberAssignment {
            number: order.order_number.clone(),
            kind,
        });
        tab.dirty = false;
        tab.updated_at = now_millis();
        Ok(())
    }

    /// Keep an issued number on the draft without clearing dirty
    pub fn record_number(
        &mut self,
        id: &str,
        assignment: NumberAssignment,
    ) -> Result<(), ArenaError> {
        let tab = self.tab_mut(id)?;
        tab.draft.number = Some(assignment);
        tab.updated_at = now_millis();
        Ok(())
    }

    fn tab_mut(&mut self, id: &str) -> Result<&mut OrderTab, ArenaError> {
        self.tabs
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| ArenaError::TabNotFound(id.to_string()))
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.tabs.iter().position(|t| t.id == id)
    }

    fn activate(&mut self, id: &str) {
        self.active_id = id.to_string();
        for tab in &mut self.tabs {
            tab.active = tab.id == id;
        }
    }

    /// Index of the active tab; synthesizes a tab or re-points a dangling id
    fn ensure_active(&mut self) -> usize {
        if self.tabs.is_empty() {
            tracing::warn!("Draft arena was empty, creating a new tab");
            self.tabs.push(empty_tab());
        }
        match self.position(&self.active_id) {
            Some(idx) if self.tabs[idx].active => idx,
            Some(idx) => {
                let id = self.tabs[idx].id.clone();
                self.activate(&id);
                idx
            }
            None => {
                tracing::warn!(
                    active_id = %self.active_id,
                    "Active tab missing, activating first tab"
                );
                let id = self.tabs[0].id.clone();
                self.activate(&id);
                0
            }
        }
    }

    /// Remove one inactive tab to make room
    fn evict_one(&mut self) -> Result<OrderTab, ArenaError> {
        let oldest = |clean_only: bool| {
            self.tabs
                .iter()
                .enumerate()
                .filter(|(_, t)| t.id != self.active_id && (!clean_only || !t.dirty))
                .min_by_key(|(idx, t)| (t.created_at, *idx))
                .map(|(idx, _)| idx)
        };

        let idx = match oldest(true) {
            Some(idx) => idx,
            None => match self.policy {
                EvictionPolicy::RejectWhenAllDirty => return Err(ArenaError::AllTabsDirty),
                EvictionPolicy::ForceOldest => {
                    let idx = oldest(false).ok_or(ArenaError::AllTabsDirty)?;
                    let tab = &self.tabs[idx];
                    tracing::warn!(
                        tab_id = %tab.id,
                        title = %tab.title,
                        "Evicting tab with unsaved changes"
                    );
                    idx
                }
            },
        };

        Ok(self.tabs.remove(idx))
    }
}

fn empty_tab() -> OrderTab {
    let now = now_millis();
    OrderTab {
        id: new_id(),
        order_id: None,
        title: NEW_TAB_TITLE.to_string(),
        draft: DraftOrderState::today(),
        active: false,
        dirty: false,
        created_at: now,
        updated_at: now,
    }
}

fn tab_for_order(order: &FinalizedOrder) -> OrderTab {
    let customer = if order.customer.is_snapshot() {
        DraftCustomer::Temporary(order.customer.clone())
    } else {
        DraftCustomer::Existing(order.customer.clone())
    };

    let now = now_millis();
    OrderTab {
        id: new_id(),
        order_id: Some(order.id.clone()),
        title: order.order_number.clone(),
        draft: DraftOrderState {
            items: order.lines.clone(),
            customer: Some(customer),
            order_date: order.date,
            note: order.note.clone(),
            template_id: order.template_id.clone(),
            number: Some(NumberAssignment::sequenced(order.order_number.clone())),
        },
        active: false,
        dirty: false,
        created_at: now,
        updated_at: now,
    }
}
