//! The two plans a commit emits: what to persist now, and how to restore
//! later. Both are pure data — executing a [`CheckpointPlan`] (writing
//! bytes to the store) and executing a [`RestorePlan`] (actually re-running
//! cells) are the embedder's job, not this crate's.

use std::collections::BTreeSet;

use crate::ahg::VariableName;

/// One co-variable group to persist: its names, the version stamp its
/// snapshot was created at, and the estimated byte cost from the size
/// profiler. The actual serialized payload is produced by the external
/// value store, not by this crate.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointGroup {
    pub names: BTreeSet<VariableName>,
    pub version: u64,
    pub size_bytes: u64,
}

/// A declaration of what to persist under a given commit. Non-incremental
/// mode flattens every migrated group into its own entry; incremental mode
/// preserves grouping and version so the store can skip what an ancestor
/// commit already has.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckpointPlan {
    pub groups: Vec<CheckpointGroup>,
}

impl CheckpointPlan {
    pub fn total_bytes(&self) -> u64 {
        self.groups.iter().map(|g| g.size_bytes).sum()
    }
}

/// One step of a restore. Construction walks cell executions in ascending
/// `cell_num`: a recomputed cell becomes [`RestoreAction::RerunCell`]; a
/// cell that produced migrated variables becomes
/// [`RestoreAction::LoadVariable`], falling back to its prerequisites if the
/// store turns out not to have them.
#[derive(Debug, Clone, PartialEq)]
pub enum RestoreAction {
    RerunCell { cell_num: usize, code: String },
    LoadVariable {
        cell_num: usize,
        names: BTreeSet<VariableName>,
        prerequisites: Vec<(usize, String)>,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestorePlan {
    pub actions: Vec<RestoreAction>,
}

impl RestorePlan {
    pub fn rerun_cells(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().filter_map(|a| match a {
            RestoreAction::RerunCell { code, .. } => Some(code.as_str()),
            _ => None,
        })
    }
}
