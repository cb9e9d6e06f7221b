//! External collaborators the Planner consumes but does not own: the kernel
//! namespace it reads variables from, and the value store it persists
//! serialized payloads to. Both are plain synchronous traits — see the
//! crate-level docs for why no method here is `async`.

mod in_memory;
mod null_store;

pub use in_memory::InMemoryNamespace;
pub use null_store::NullValueStore;

use std::collections::{BTreeSet, HashSet};

use crate::ahg::{VariableName, VersionedName};
use crate::error::PlannerResult;
use crate::value::Value;

/// A live kernel namespace: the set of bound names, their current values,
/// and which names have been read since the last reset. Implemented by the
/// embedding kernel in the full system; this crate ships only
/// [`InMemoryNamespace`] as test/harness scaffolding.
pub trait Namespace {
    fn keyset(&self) -> BTreeSet<VariableName>;
    fn contains(&self, name: &VariableName) -> bool;
    fn get(&self, name: &VariableName) -> Option<Value>;
    fn accessed_vars(&self) -> HashSet<VariableName>;
    fn reset_accessed_vars(&self);
}

/// The persistent key-value store holding serialized variable payloads,
/// addressed by database path and keyed by commit. The real store is an
/// external collaborator; this crate ships only [`NullValueStore`], which
/// always reports nothing stored, for running the Planner standalone.
pub trait ValueStore {
    fn get_stored_versioned_names(
        &self,
        parent_commit_ids: &[String],
    ) -> PlannerResult<HashSet<VersionedName>>;

    fn persist(&self, commit_id: &str, plan: &crate::plan::CheckpointPlan) -> PlannerResult<()>;
}
