//! ACL table.
//!
//! A table fixes the stage, the priority among tables and the set of match
//! fields its entries may use. It is programmed on every NPU in its NPU
//! set; the resulting hardware ids are recorded per NPU.

use log::debug;
use std::collections::BTreeSet;
use std::fmt;

use sonic_ndi::{NdiObjIdTable, NpuId, RawNdiObjectId};

use crate::entry::AclEntry;
use crate::error::{AclError, AclResult};
use crate::types::{AclMatchType, AclStage, ObjId, SwitchId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclTable {
    switch_id: SwitchId,
    table_id: ObjId,
    stage: AclStage,
    priority: u32,
    allowed_filters: BTreeSet<AclMatchType>,
    npus: BTreeSet<NpuId>,
    ndi_ids: NdiObjIdTable,
}

impl AclTable {
    pub fn new(switch_id: SwitchId, table_id: ObjId, stage: AclStage) -> Self {
        Self {
            switch_id,
            table_id,
            stage,
            priority: 0,
            allowed_filters: BTreeSet::new(),
            npus: BTreeSet::new(),
            ndi_ids: NdiObjIdTable::new(),
        }
    }

    /// Builder-style priority.
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Builder-style NPU set.
    pub fn with_npus(mut self, npus: impl IntoIterator<Item = NpuId>) -> Self {
        self.npus = npus.into_iter().collect();
        self
    }

    /// Builder-style allowed match fields.
    pub fn with_filters(mut self, filters: impl IntoIterator<Item = AclMatchType>) -> Self {
        self.allowed_filters.extend(filters);
        self
    }

    pub fn switch_id(&self) -> SwitchId {
        self.switch_id
    }

    pub fn table_id(&self) -> ObjId {
        self.table_id
    }

    pub fn stage(&self) -> AclStage {
        self.stage
    }

    /// Sets the stage from its code.
    pub fn set_stage(&mut self, code: u32) -> AclResult<()> {
        self.stage = AclStage::try_from(code)?;
        Ok(())
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn set_priority(&mut self, priority: u32) {
        self.priority = priority;
    }

    /// Allows a match field by type code.
    pub fn add_allowed_filter(&mut self, code: u32) -> AclResult<()> {
        self.allowed_filters.insert(AclMatchType::try_from(code)?);
        Ok(())
    }

    pub fn is_filter_allowed(&self, filter_type: AclMatchType) -> bool {
        self.allowed_filters.contains(&filter_type)
    }

    pub fn allowed_filters(&self) -> &BTreeSet<AclMatchType> {
        &self.allowed_filters
    }

    /// Rejects an entry that uses a match field the table does not allow.
    pub fn check_entry(&self, entry: &AclEntry) -> AclResult<()> {
        for filter in entry.filters() {
            if !self.is_filter_allowed(filter.filter_type()) {
                return Err(AclError::invalid(format!(
                    "filter {} not allowed in table {}",
                    filter.name(),
                    self.table_id
                )));
            }
        }
        Ok(())
    }

    pub fn npus(&self) -> &BTreeSet<NpuId> {
        &self.npus
    }

    pub fn add_npu(&mut self, npu_id: NpuId) {
        self.npus.insert(npu_id);
    }

    /// Records the hardware id created on `npu_id`.
    pub fn set_ndi_id(&mut self, npu_id: NpuId, ndi_id: RawNdiObjectId) {
        self.ndi_ids.insert(npu_id, ndi_id);
    }

    /// Hardware id on `npu_id`.
    pub fn ndi_id(&self, npu_id: NpuId) -> AclResult<RawNdiObjectId> {
        self.ndi_ids.get(&npu_id).copied().ok_or_else(|| {
            AclError::failed(format!(
                "table {} not created on npu {}",
                self.table_id, npu_id
            ))
        })
    }

    pub fn ndi_ids(&self) -> &NdiObjIdTable {
        &self.ndi_ids
    }

    /// Returns true if the table configuration differs. Hardware ids are
    /// programming state and are not compared.
    pub fn differs(&self, other: &AclTable) -> bool {
        self.stage != other.stage
            || self.priority != other.priority
            || self.allowed_filters != other.allowed_filters
            || self.npus != other.npus
    }

    pub fn dbg_dump(&self) {
        for line in self.to_string().lines() {
            debug!("{}", line);
        }
    }
}

impl fmt::Display for AclTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Table {} (switch {}): stage {}, priority {}",
            self.table_id, self.switch_id, self.stage, self.priority
        )?;
        let filters: Vec<&str> = self.allowed_filters.iter().map(|t| t.name()).collect();
        writeln!(f, "  filters: [{}]", filters.join(", "))?;
        let npus: Vec<String> = self.npus.iter().map(|n| n.to_string()).collect();
        writeln!(f, "  npus: [{}]", npus.join(", "))?;
        for (npu, ndi_id) in &self.ndi_ids {
            writeln!(f, "  npu {}: ndi id 0x{:x}", npu, ndi_id)?;
        }
        Ok(())
    }
}
