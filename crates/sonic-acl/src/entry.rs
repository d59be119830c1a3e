//! ACL entry.
//!
//! An entry is a priority plus at most one filter per match field and at
//! most one action per action type. It is programmed on the NPUs its port
//! filters point at, or on all of the table's NPUs when it has none.

use log::debug;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use sonic_ndi::{NdiAclEntry, NpuId};

use crate::action::AclAction;
use crate::counter::AclCounter;
use crate::error::AclResult;
use crate::filter::AclFilter;
use crate::table::AclTable;
use crate::types::{AclActionType, AclMatchType, AclPriority, ObjId, SwitchId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclEntry {
    switch_id: SwitchId,
    table_id: ObjId,
    entry_id: ObjId,
    priority: AclPriority,
    filters: BTreeMap<AclMatchType, AclFilter>,
    actions: BTreeMap<AclActionType, AclAction>,
}

/// What changed between two versions of an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AclEntryDiff {
    pub priority_changed: bool,
    pub filters_added: Vec<AclMatchType>,
    pub filters_removed: Vec<AclMatchType>,
    pub filters_modified: Vec<AclMatchType>,
    pub actions_added: Vec<AclActionType>,
    pub actions_removed: Vec<AclActionType>,
    pub actions_modified: Vec<AclActionType>,
}

impl AclEntryDiff {
    /// Returns true if nothing changed.
    pub fn is_empty(&self) -> bool {
        !self.priority_changed
            && self.filters_added.is_empty()
            && self.filters_removed.is_empty()
            && self.filters_modified.is_empty()
            && self.actions_added.is_empty()
            && self.actions_removed.is_empty()
            && self.actions_modified.is_empty()
    }
}

/// Splits two keyed collections into added, removed and modified keys.
fn diff_maps<K: Ord + Copy, V>(
    old: &BTreeMap<K, V>,
    new: &BTreeMap<K, V>,
    differs: impl Fn(&V, &V) -> bool,
) -> (Vec<K>, Vec<K>, Vec<K>) {
    let added = new.keys().filter(|k| !old.contains_key(*k)).copied().collect();
    let removed = old.keys().filter(|k| !new.contains_key(*k)).copied().collect();
    let modified = old
        .iter()
        .filter_map(|(k, v)| match new.get(k) {
            Some(other) if differs(v, other) => Some(*k),
            _ => None,
        })
        .collect();
    (added, removed, modified)
}

impl AclEntry {
    pub fn new(switch_id: SwitchId, table_id: ObjId, entry_id: ObjId) -> Self {
        Self {
            switch_id,
            table_id,
            entry_id,
            priority: 0,
            filters: BTreeMap::new(),
            actions: BTreeMap::new(),
        }
    }

    /// Builder-style priority.
    pub fn with_priority(mut self, priority: AclPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn switch_id(&self) -> SwitchId {
        self.switch_id
    }

    pub fn table_id(&self) -> ObjId {
        self.table_id
    }

    pub fn entry_id(&self) -> ObjId {
        self.entry_id
    }

    pub fn priority(&self) -> AclPriority {
        self.priority
    }

    pub fn set_priority(&mut self, priority: AclPriority) {
        self.priority = priority;
    }

    /// Adds or replaces the filter for its match field. Returns the
    /// replaced filter.
    pub fn add_filter(&mut self, filter: AclFilter) -> Option<AclFilter> {
        self.filters.insert(filter.filter_type(), filter)
    }

    pub fn remove_filter(&mut self, filter_type: AclMatchType) -> Option<AclFilter> {
        self.filters.remove(&filter_type)
    }

    pub fn filter(&self, filter_type: AclMatchType) -> Option<&AclFilter> {
        self.filters.get(&filter_type)
    }

    pub fn filter_mut(&mut self, filter_type: AclMatchType) -> Option<&mut AclFilter> {
        self.filters.get_mut(&filter_type)
    }

    /// Filters in match field order.
    pub fn filters(&self) -> impl Iterator<Item = &AclFilter> {
        self.filters.values()
    }

    /// Adds or replaces the action of its type. Returns the replaced action.
    pub fn add_action(&mut self, action: AclAction) -> Option<AclAction> {
        self.actions.insert(action.action_type(), action)
    }

    pub fn remove_action(&mut self, action_type: AclActionType) -> Option<AclAction> {
        self.actions.remove(&action_type)
    }

    pub fn action(&self, action_type: AclActionType) -> Option<&AclAction> {
        self.actions.get(&action_type)
    }

    pub fn action_mut(&mut self, action_type: AclActionType) -> Option<&mut AclAction> {
        self.actions.get_mut(&action_type)
    }

    /// Actions in action type order.
    pub fn actions(&self) -> impl Iterator<Item = &AclAction> {
        self.actions.values()
    }

    /// Counter referenced by the SET_COUNTER action, if any.
    pub fn counter_id(&self) -> Option<ObjId> {
        self.actions
            .get(&AclActionType::SetCounter)
            .and_then(AclAction::counter_id)
    }

    /// NPUs the entry must be programmed on.
    ///
    /// With port filters, the union of their NPUs; otherwise every NPU of
    /// the table.
    pub fn npu_list(&self, table: &AclTable) -> BTreeSet<NpuId> {
        let specific: Vec<&AclFilter> = self.filters().filter(|f| f.is_npu_specific()).collect();
        if specific.is_empty() {
            return table.npus().clone();
        }
        specific.iter().flat_map(|f| f.npu_list()).collect()
    }

    /// Builds the record for `npu_id`.
    ///
    /// `Ok(None)` if any filter has nothing on this NPU. Actions with
    /// nothing on this NPU are left out of the record.
    pub fn copy_for_device(
        &self,
        npu_id: NpuId,
        table: &AclTable,
        counter: Option<&AclCounter>,
    ) -> AclResult<Option<NdiAclEntry>> {
        let mut rec = NdiAclEntry::new(npu_id, self.priority);
        rec.table_ndi_id = table.ndi_ids().get(&npu_id).copied();

        for filter in self.filters.values() {
            match filter.copy_for_device(npu_id)? {
                Some(f) => rec.filters.push(f),
                None => {
                    debug!(
                        "entry {} in table {}: filter {} skips npu {}",
                        self.entry_id,
                        self.table_id,
                        filter.name(),
                        npu_id
                    );
                    return Ok(None);
                }
            }
        }

        for action in self.actions.values() {
            if let Some(a) = action.copy_for_device(npu_id, counter)? {
                rec.actions.push(a);
            }
        }

        Ok(Some(rec))
    }

    /// Compares two versions of the entry.
    pub fn diff(&self, other: &AclEntry) -> AclEntryDiff {
        let (filters_added, filters_removed, filters_modified) =
            diff_maps(&self.filters, &other.filters, AclFilter::differs);
        let (actions_added, actions_removed, actions_modified) =
            diff_maps(&self.actions, &other.actions, AclAction::differs);

        AclEntryDiff {
            priority_changed: self.priority != other.priority,
            filters_added,
            filters_removed,
            filters_modified,
            actions_added,
            actions_removed,
            actions_modified,
        }
    }

    pub fn differs(&self, other: &AclEntry) -> bool {
        !self.diff(other).is_empty()
    }

    pub fn dbg_dump(&self) {
        for line in self.to_string().lines() {
            debug!("{}", line);
        }
    }
}

impl fmt::Display for AclEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Entry {} (switch {}, table {}): priority {}",
            self.entry_id, self.switch_id, self.table_id, self.priority
        )?;
        for filter in self.filters.values() {
            writeln!(f, "  {}", filter)?;
        }
        for action in self.actions.values() {
            writeln!(f, "  {}", action)?;
        }
        Ok(())
    }
}
