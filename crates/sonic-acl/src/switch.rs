//! Per-switch ACL object store.
//!
//! The switch owns its tables. Each table has a container owning its
//! entries and counters, with entry and counter ids drawn from generators
//! private to that table. Removing an object and releasing its id are
//! separate calls so a failed transaction can undo either step on its own.

use log::{debug, info};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use sonic_ndi::{NdiAclEntry, NpuId};

use crate::config::AclSwitchConfig;
use crate::counter::AclCounter;
use crate::entry::AclEntry;
use crate::error::{AclError, AclResult};
use crate::id_gen::IdGenerator;
use crate::table::AclTable;
use crate::types::{ObjId, SwitchId};

/// Inserts or replaces `value` and returns the stored value.
fn upsert<K: Ord, V>(map: &mut BTreeMap<K, V>, key: K, value: V) -> &mut V {
    match map.entry(key) {
        Entry::Occupied(mut slot) => {
            slot.insert(value);
            slot.into_mut()
        }
        Entry::Vacant(slot) => slot.insert(value),
    }
}

/// Entries and counters of one table.
#[derive(Debug)]
struct TableContainer {
    entries: BTreeMap<ObjId, AclEntry>,
    counters: BTreeMap<ObjId, AclCounter>,
    entry_ids: IdGenerator,
    counter_ids: IdGenerator,
}

impl TableContainer {
    fn new(config: &AclSwitchConfig) -> Self {
        Self {
            entries: BTreeMap::new(),
            counters: BTreeMap::new(),
            entry_ids: IdGenerator::new(config.entry_id_max),
            counter_ids: IdGenerator::new(config.counter_id_max),
        }
    }
}

/// ACL object store of one switch.
#[derive(Debug)]
pub struct AclSwitch {
    switch_id: SwitchId,
    config: AclSwitchConfig,
    tables: BTreeMap<ObjId, AclTable>,
    containers: BTreeMap<ObjId, TableContainer>,
    table_ids: IdGenerator,
}

impl AclSwitch {
    /// Creates a store with the default id ranges.
    pub fn new(switch_id: SwitchId) -> Self {
        let config = AclSwitchConfig::default();
        Self {
            switch_id,
            table_ids: IdGenerator::new(config.table_id_max),
            config,
            tables: BTreeMap::new(),
            containers: BTreeMap::new(),
        }
    }

    /// Creates a store from a configuration, validating it first.
    pub fn with_config(switch_id: SwitchId, config: AclSwitchConfig) -> AclResult<Self> {
        config.validate()?;
        Ok(Self {
            switch_id,
            table_ids: IdGenerator::new(config.table_id_max),
            config,
            tables: BTreeMap::new(),
            containers: BTreeMap::new(),
        })
    }

    pub fn switch_id(&self) -> SwitchId {
        self.switch_id
    }

    pub fn config(&self) -> &AclSwitchConfig {
        &self.config
    }

    /// NPUs present on the switch.
    pub fn npus(&self) -> &[NpuId] {
        &self.config.npus
    }

    // Tables

    pub fn alloc_table_id(&mut self) -> AclResult<ObjId> {
        self.table_ids.alloc()
    }

    pub fn reserve_table_id(&mut self, table_id: ObjId) -> AclResult<()> {
        self.table_ids.reserve(table_id)
    }

    pub fn release_table_id(&mut self, table_id: ObjId) {
        self.table_ids.release(table_id);
    }

    pub fn find_table(&self, table_id: ObjId) -> Option<&AclTable> {
        self.tables.get(&table_id)
    }

    pub fn find_table_mut(&mut self, table_id: ObjId) -> Option<&mut AclTable> {
        self.tables.get_mut(&table_id)
    }

    pub fn get_table(&self, table_id: ObjId) -> AclResult<&AclTable> {
        self.find_table(table_id)
            .ok_or_else(|| AclError::not_found(format!("table {}", table_id)))
    }

    pub fn get_table_mut(&mut self, table_id: ObjId) -> AclResult<&mut AclTable> {
        self.tables
            .get_mut(&table_id)
            .ok_or_else(|| AclError::not_found(format!("table {}", table_id)))
    }

    /// Stores a table under its id, replacing any table with the same id.
    /// The table's entries and counters are kept across a replace.
    pub fn save_table(&mut self, table: AclTable) -> &mut AclTable {
        let table_id = table.table_id();
        info!("switch {}: saving table {}", self.switch_id, table_id);
        let config = &self.config;
        self.containers
            .entry(table_id)
            .or_insert_with(|| TableContainer::new(config));
        upsert(&mut self.tables, table_id, table)
    }

    /// Removes a table with its entries and counters. Does not release the
    /// table id.
    pub fn remove_table(&mut self, table_id: ObjId) -> Option<AclTable> {
        self.containers.remove(&table_id);
        let removed = self.tables.remove(&table_id);
        if removed.is_some() {
            info!("switch {}: removed table {}", self.switch_id, table_id);
        }
        removed
    }

    /// Tables in id order.
    pub fn table_list(&self) -> impl Iterator<Item = &AclTable> {
        self.tables.values()
    }

    fn container(&self, table_id: ObjId) -> AclResult<&TableContainer> {
        self.containers
            .get(&table_id)
            .ok_or_else(|| AclError::not_found(format!("table {}", table_id)))
    }

    fn container_mut(&mut self, table_id: ObjId) -> AclResult<&mut TableContainer> {
        self.containers
            .get_mut(&table_id)
            .ok_or_else(|| AclError::not_found(format!("table {}", table_id)))
    }

    // Entries

    pub fn alloc_entry_id_in_table(&mut self, table_id: ObjId) -> AclResult<ObjId> {
        self.container_mut(table_id)?.entry_ids.alloc()
    }

    pub fn reserve_entry_id_in_table(&mut self, table_id: ObjId, entry_id: ObjId) -> AclResult<()> {
        self.container_mut(table_id)?.entry_ids.reserve(entry_id)
    }

    /// Releasing in a table that no longer exists is a no-op.
    pub fn release_entry_id_in_table(&mut self, table_id: ObjId, entry_id: ObjId) {
        if let Some(c) = self.containers.get_mut(&table_id) {
            c.entry_ids.release(entry_id);
        }
    }

    pub fn find_entry(&self, table_id: ObjId, entry_id: ObjId) -> Option<&AclEntry> {
        self.containers.get(&table_id)?.entries.get(&entry_id)
    }

    pub fn find_entry_mut(&mut self, table_id: ObjId, entry_id: ObjId) -> Option<&mut AclEntry> {
        self.containers.get_mut(&table_id)?.entries.get_mut(&entry_id)
    }

    pub fn get_entry(&self, table_id: ObjId, entry_id: ObjId) -> AclResult<&AclEntry> {
        self.find_entry(table_id, entry_id).ok_or_else(|| {
            AclError::not_found(format!("entry {} in table {}", entry_id, table_id))
        })
    }

    pub fn get_entry_mut(&mut self, table_id: ObjId, entry_id: ObjId) -> AclResult<&mut AclEntry> {
        self.find_entry_mut(table_id, entry_id).ok_or_else(|| {
            AclError::not_found(format!("entry {} in table {}", entry_id, table_id))
        })
    }

    /// Stores an entry in its table, replacing any entry with the same id.
    ///
    /// The table must exist and allow every filter the entry uses.
    pub fn save_entry(&mut self, entry: AclEntry) -> AclResult<&mut AclEntry> {
        let table_id = entry.table_id();
        let entry_id = entry.entry_id();
        self.get_table(table_id)?.check_entry(&entry)?;

        info!(
            "switch {}: saving entry {} in table {}",
            self.switch_id, entry_id, table_id
        );
        let container = self.container_mut(table_id)?;
        Ok(upsert(&mut container.entries, entry_id, entry))
    }

    /// Removes an entry. Does not release the entry id.
    pub fn remove_entry(&mut self, table_id: ObjId, entry_id: ObjId) -> Option<AclEntry> {
        let removed = self.containers.get_mut(&table_id)?.entries.remove(&entry_id);
        if removed.is_some() {
            info!(
                "switch {}: removed entry {} from table {}",
                self.switch_id, entry_id, table_id
            );
        }
        removed
    }

    /// Entries of a table in id order.
    pub fn entry_list(&self, table_id: ObjId) -> AclResult<impl Iterator<Item = &AclEntry>> {
        Ok(self.container(table_id)?.entries.values())
    }

    /// NPUs an entry must be programmed on.
    pub fn entry_npus(&self, table_id: ObjId, entry_id: ObjId) -> AclResult<BTreeSet<NpuId>> {
        let table = self.get_table(table_id)?;
        Ok(self.get_entry(table_id, entry_id)?.npu_list(table))
    }

    /// Builds the entry record for `npu_id`, resolving its counter.
    pub fn materialize_entry(
        &self,
        table_id: ObjId,
        entry_id: ObjId,
        npu_id: NpuId,
    ) -> AclResult<Option<NdiAclEntry>> {
        let table = self.get_table(table_id)?;
        let entry = self.get_entry(table_id, entry_id)?;
        let counter = match entry.counter_id() {
            Some(counter_id) => Some(self.get_counter(table_id, counter_id)?),
            None => None,
        };

        let rec = entry.copy_for_device(npu_id, table, counter)?;
        if rec.is_none() {
            debug!(
                "switch {}: entry {} in table {} not programmed on npu {}",
                self.switch_id, entry_id, table_id, npu_id
            );
        }
        Ok(rec)
    }

    // Counters

    pub fn alloc_counter_id_in_table(&mut self, table_id: ObjId) -> AclResult<ObjId> {
        self.container_mut(table_id)?.counter_ids.alloc()
    }

    pub fn reserve_counter_id_in_table(&mut self, table_id: ObjId, counter_id: ObjId) -> AclResult<()> {
        self.container_mut(table_id)?.counter_ids.reserve(counter_id)
    }

    /// Releasing in a table that no longer exists is a no-op.
    pub fn release_counter_id_in_table(&mut self, table_id: ObjId, counter_id: ObjId) {
        if let Some(c) = self.containers.get_mut(&table_id) {
            c.counter_ids.release(counter_id);
        }
    }

    pub fn find_counter(&self, table_id: ObjId, counter_id: ObjId) -> Option<&AclCounter> {
        self.containers.get(&table_id)?.counters.get(&counter_id)
    }

    pub fn find_counter_mut(&mut self, table_id: ObjId, counter_id: ObjId) -> Option<&mut AclCounter> {
        self.containers.get_mut(&table_id)?.counters.get_mut(&counter_id)
    }

    pub fn get_counter(&self, table_id: ObjId, counter_id: ObjId) -> AclResult<&AclCounter> {
        self.find_counter(table_id, counter_id).ok_or_else(|| {
            AclError::not_found(format!("counter {} in table {}", counter_id, table_id))
        })
    }

    pub fn get_counter_mut(&mut self, table_id: ObjId, counter_id: ObjId) -> AclResult<&mut AclCounter> {
        self.find_counter_mut(table_id, counter_id).ok_or_else(|| {
            AclError::not_found(format!("counter {} in table {}", counter_id, table_id))
        })
    }

    /// Stores a counter in its table, replacing any counter with the same
    /// id.
    pub fn save_counter(&mut self, counter: AclCounter) -> AclResult<&mut AclCounter> {
        let table_id = counter.table_id();
        let counter_id = counter.counter_id();
        info!(
            "switch {}: saving counter {} in table {}",
            self.switch_id, counter_id, table_id
        );
        let container = self.container_mut(table_id)?;
        Ok(upsert(&mut container.counters, counter_id, counter))
    }

    /// Removes a counter. Does not release the counter id.
    pub fn remove_counter(&mut self, table_id: ObjId, counter_id: ObjId) -> Option<AclCounter> {
        let removed = self.containers.get_mut(&table_id)?.counters.remove(&counter_id);
        if removed.is_some() {
            info!(
                "switch {}: removed counter {} from table {}",
                self.switch_id, counter_id, table_id
            );
        }
        removed
    }

    /// Counters of a table in id order.
    pub fn counter_list(&self, table_id: ObjId) -> AclResult<impl Iterator<Item = &AclCounter>> {
        Ok(self.container(table_id)?.counters.values())
    }

    /// Returns true if any entry of the table references the counter.
    pub fn counter_in_use(&self, table_id: ObjId, counter_id: ObjId) -> AclResult<bool> {
        Ok(self
            .container(table_id)?
            .entries
            .values()
            .any(|e| e.counter_id() == Some(counter_id)))
    }

    /// Full dump of the store, tables in id order with their counters and
    /// entries.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "ACL switch {}: {} table(s), {} table id(s) in use",
            self.switch_id,
            self.tables.len(),
            self.table_ids.in_use()
        );
        for table in self.tables.values() {
            out.push_str(&table.to_string());
            let Some(container) = self.containers.get(&table.table_id()) else {
                continue;
            };
            for counter in container.counters.values() {
                out.push_str(&counter.to_string());
            }
            for entry in container.entries.values() {
                out.push_str(&entry.to_string());
            }
        }
        out
    }

    pub fn dbg_dump(&self) {
        for line in self.dump().lines() {
            debug!("{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::AclAction;
    use crate::error::AclErrorKind;
    use crate::filter::AclFilter;
    use crate::types::{AclActionType, AclCounterType, AclMatchType, AclStage};

    fn small_config() -> AclSwitchConfig {
        AclSwitchConfig {
            table_id_max: 4,
            entry_id_max: 3,
            counter_id_max: 2,
            npus: vec![0, 1],
        }
    }

    fn switch_with_table() -> (AclSwitch, ObjId) {
        let mut sw = AclSwitch::with_config(0, small_config()).unwrap();
        let table_id = sw.alloc_table_id().unwrap();
        sw.save_table(
            AclTable::new(0, table_id, AclStage::Ingress)
                .with_npus([0, 1])
                .with_filters([AclMatchType::Dscp]),
        );
        (sw, table_id)
    }

    #[test]
    fn test_with_config_validates() {
        let err = AclSwitch::with_config(
            0,
            AclSwitchConfig {
                npus: vec![],
                ..Default::default()
            },
        )
        .unwrap_err();
        assert_eq!(err.kind(), AclErrorKind::InvalidArgument);
        assert_eq!(AclSwitch::new(3).config().table_id_max, 500);
    }

    #[test]
    fn test_table_lifecycle() {
        let (mut sw, table_id) = switch_with_table();
        assert!(sw.find_table(table_id).is_some());
        assert_eq!(sw.table_list().count(), 1);

        assert!(sw.remove_table(table_id).is_some());
        assert!(sw.remove_table(table_id).is_none());
        assert!(sw.find_table(table_id).is_none());
        assert_eq!(
            sw.get_table(table_id).unwrap_err().kind(),
            AclErrorKind::NotFound
        );

        // the id stays in use until released
        assert_eq!(
            sw.reserve_table_id(table_id).unwrap_err().kind(),
            AclErrorKind::Conflict
        );
        sw.release_table_id(table_id);
        assert!(sw.reserve_table_id(table_id).is_ok());
    }

    #[test]
    fn test_entry_ids_scoped_per_table() {
        let (mut sw, t1) = switch_with_table();
        let t2 = sw.alloc_table_id().unwrap();
        sw.save_table(AclTable::new(0, t2, AclStage::Egress));

        for _ in 0..3 {
            sw.alloc_entry_id_in_table(t1).unwrap();
        }
        assert_eq!(
            sw.alloc_entry_id_in_table(t1).unwrap_err().kind(),
            AclErrorKind::ResourceExhausted
        );
        assert_eq!(sw.alloc_entry_id_in_table(t2).unwrap(), 0);

        assert_eq!(
            sw.alloc_entry_id_in_table(99).unwrap_err().kind(),
            AclErrorKind::NotFound
        );
    }

    #[test]
    fn test_save_entry_checks_table() {
        let (mut sw, table_id) = switch_with_table();
        let entry_id = sw.alloc_entry_id_in_table(table_id).unwrap();

        let mut entry = AclEntry::new(0, table_id, entry_id);
        entry.add_filter(AclFilter::from_type(AclMatchType::Ttl));
        assert_eq!(
            sw.save_entry(entry).unwrap_err().kind(),
            AclErrorKind::InvalidArgument
        );
        assert!(sw.find_entry(table_id, entry_id).is_none());

        let orphan = AclEntry::new(0, 42, 0);
        assert_eq!(sw.save_entry(orphan).unwrap_err().kind(), AclErrorKind::NotFound);

        sw.save_entry(AclEntry::new(0, table_id, entry_id).with_priority(9))
            .unwrap();
        assert_eq!(sw.get_entry(table_id, entry_id).unwrap().priority(), 9);
    }

    #[test]
    fn test_entry_list_in_id_order() {
        let (mut sw, table_id) = switch_with_table();
        for entry_id in [2, 0, 1] {
            sw.reserve_entry_id_in_table(table_id, entry_id).unwrap();
            sw.save_entry(AclEntry::new(0, table_id, entry_id)).unwrap();
        }
        let ids: Vec<ObjId> = sw
            .entry_list(table_id)
            .unwrap()
            .map(|e| e.entry_id())
            .collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert!(sw.entry_list(77).is_err());
    }

    #[test]
    fn test_counter_lifecycle() {
        let (mut sw, table_id) = switch_with_table();
        let counter_id = sw.alloc_counter_id_in_table(table_id).unwrap();
        sw.save_counter(AclCounter::new(0, table_id, counter_id).with_type(AclCounterType::Packet))
            .unwrap();
        assert!(!sw.counter_in_use(table_id, counter_id).unwrap());

        let mut entry = AclEntry::new(0, table_id, 0);
        let mut action = AclAction::from_type(AclActionType::SetCounter);
        action
            .set_value(
                &[crate::cell::AclDataCell::ObjId(counter_id)],
                &sonic_ndi::StaticInterfaceMap::new(),
            )
            .unwrap();
        entry.add_action(action);
        sw.save_entry(entry).unwrap();
        assert!(sw.counter_in_use(table_id, counter_id).unwrap());

        assert!(sw.remove_counter(table_id, counter_id).is_some());
        assert_eq!(
            sw.get_counter(table_id, counter_id).unwrap_err().kind(),
            AclErrorKind::NotFound
        );
        assert_eq!(
            sw.materialize_entry(table_id, 0, 0).unwrap_err().kind(),
            AclErrorKind::NotFound
        );
        sw.release_counter_id_in_table(table_id, counter_id);
        assert_eq!(sw.alloc_counter_id_in_table(table_id).unwrap(), 1);
    }

    #[test]
    fn test_remove_table_drops_container() {
        let (mut sw, table_id) = switch_with_table();
        sw.save_entry(AclEntry::new(0, table_id, 0)).unwrap();
        sw.remove_table(table_id);

        assert!(sw.find_entry(table_id, 0).is_none());
        sw.release_entry_id_in_table(table_id, 0);

        sw.save_table(AclTable::new(0, table_id, AclStage::Ingress));
        assert_eq!(sw.entry_list(table_id).unwrap().count(), 0);
    }

    #[test]
    fn test_save_table_keeps_entries() {
        let (mut sw, table_id) = switch_with_table();
        sw.save_entry(AclEntry::new(0, table_id, 0)).unwrap();

        let replaced = sw
            .get_table(table_id)
            .unwrap()
            .clone()
            .with_priority(7);
        assert_eq!(sw.save_table(replaced).priority(), 7);
        assert!(sw.find_entry(table_id, 0).is_some());
    }

    #[test]
    fn test_dump() {
        let (mut sw, table_id) = switch_with_table();
        sw.save_entry(AclEntry::new(0, table_id, 0).with_priority(5))
            .unwrap();
        let text = sw.dump();
        assert!(text.starts_with("ACL switch 0: 1 table(s), 1 table id(s) in use"));
        assert!(text.contains("Table 0 (switch 0): stage INGRESS"));
        assert!(text.contains("Entry 0 (switch 0, table 0): priority 5"));
    }
}
