//! A [`ValueStore`] that never has anything stored. Useful for running the
//! Planner standalone and in tests, where persistence is irrelevant. No
//! production `ValueStore` ships with this crate — the real key-value store
//! is an external collaborator.

use std::collections::HashSet;

use super::ValueStore;
use crate::ahg::VersionedName;
use crate::error::PlannerResult;
use crate::plan::CheckpointPlan;

#[derive(Debug, Default, Clone, Copy)]
pub struct NullValueStore;

impl ValueStore for NullValueStore {
    fn get_stored_versioned_names(
        &self,
        _parent_commit_ids: &[String],
    ) -> PlannerResult<HashSet<VersionedName>> {
        Ok(HashSet::new())
    }

    fn persist(&self, _commit_id: &str, _plan: &CheckpointPlan) -> PlannerResult<()> {
        Ok(())
    }
}
