//! Variable snapshots: one entry per co-variable group per version.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::arena::CeId;
use super::names::{VariableName, VersionedName};

/// One entry in the AHG. Attributes are immutable once recorded except
/// `size`, which starts `None` and is filled lazily by the size profiler at
/// commit time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableSnapshot {
    pub names: BTreeSet<VariableName>,
    pub version: u64,
    pub size: Option<u64>,
    pub output_ce: CeId,
    pub deleted: bool,
}

impl VariableSnapshot {
    pub fn new(names: BTreeSet<VariableName>, version: u64, output_ce: CeId) -> Self {
        Self {
            names,
            version,
            size: None,
            output_ce,
            deleted: false,
        }
    }

    pub fn deleted(names: BTreeSet<VariableName>, version: u64, output_ce: CeId) -> Self {
        Self {
            names,
            version,
            size: None,
            output_ce,
            deleted: true,
        }
    }

    pub fn versioned_name(&self) -> VersionedName {
        VersionedName::new(self.names.clone(), self.version)
    }
}
