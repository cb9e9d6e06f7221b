//! Application History Graph: a versioned bipartite graph of cell
//! executions and the variable snapshots they read and produced.
//!
//! History is append-only — [`Ahg::update_graph`] never rewrites an earlier
//! [`CellExecution`] or [`VariableSnapshot`], it only advances the `active`
//! map to point at freshly pushed ones. Both arenas are addressed by dense
//! integer handles ([`CeId`], [`VsId`]) rather than shared pointers, so the
//! whole graph serializes and deserializes without any reference-fixup pass.

mod arena;
mod ce;
mod interner;
mod names;
mod vs;

use std::collections::{BTreeSet, HashMap, HashSet};

use petgraph::unionfind::UnionFind;
use serde::{Deserialize, Serialize};
use tracing::instrument;

pub use arena::{CeId, VsId};
pub use ce::CellExecution;
pub use names::{VariableName, VersionedName};
pub use vs::VariableSnapshot;

use arena::Arena;
use crate::error::PlannerResult;
use crate::namespace::Namespace;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ahg {
    ces: Arena<CellExecution>,
    vss: Arena<VariableSnapshot>,
    active: HashMap<VariableName, VsId>,
}

impl Ahg {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bootstraps an AHG whose sole CE has `cell_num = 0`, an empty code
    /// body, and one active VS per existing variable, each its own group —
    /// the state a freshly attached kernel starts from before any cell has
    /// run under this Planner.
    pub fn from_existing(namespace: &dyn Namespace, version: u64) -> Self {
        let mut ahg = Self::new();
        let ce_id = CeId(ahg.ces.push(CellExecution::new(0, String::new(), 0.0)));
        let mut dst_vss = Vec::new();
        for name in namespace.keyset() {
            let mut names = BTreeSet::new();
            names.insert(name.clone());
            let vs_id = VsId(ahg.vss.push(VariableSnapshot::new(names, version, ce_id)));
            dst_vss.push(vs_id);
            ahg.active.insert(name, vs_id);
        }
        ahg.ces.get_mut(ce_id.0).unwrap().dst_vss = dst_vss;
        ahg
    }

    pub fn ce(&self, id: CeId) -> Option<&CellExecution> {
        self.ces.get(id.0)
    }

    pub fn vs(&self, id: VsId) -> Option<&VariableSnapshot> {
        self.vss.get(id.0)
    }

    pub fn vs_mut(&mut self, id: VsId) -> Option<&mut VariableSnapshot> {
        self.vss.get_mut(id.0)
    }

    /// Deduplicated set of currently active variable snapshots: the latest
    /// VS for at least one currently-bound name.
    pub fn get_active_variable_snapshots(&self) -> Vec<VsId> {
        let mut seen = HashSet::new();
        let mut out: Vec<VsId> = self
            .active
            .values()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();
        out.sort();
        out
    }

    pub fn get_cell_executions(&self) -> &[CellExecution] {
        self.ces.as_slice()
    }

    pub fn active_name_for(&self, name: &VariableName) -> Option<VsId> {
        self.active.get(name).copied()
    }

    /// Union of the name sets of every currently-active, non-deleted VS —
    /// every variable the AHG considers bound right now.
    pub fn active_names(&self) -> BTreeSet<VariableName> {
        let mut out = BTreeSet::new();
        for vs_id in self.get_active_variable_snapshots() {
            if let Some(vs) = self.vs(vs_id) {
                if !vs.deleted {
                    out.extend(vs.names.iter().cloned());
                }
            }
        }
        out
    }

    /// Records one cell's effect on the namespace.
    ///
    /// 1. Computes the active-names partition via union-find over
    ///    `linked_pairs` restricted to `current_names` — each connected
    ///    component becomes one co-variable group.
    /// 2. For each group that is new, touched by `modified`, or whose
    ///    membership differs from the previous active VS of any of its
    ///    names, pushes a fresh [`VariableSnapshot`] at `version`.
    /// 3. For each name in `accessed ∪ modified` that had a prior active VS,
    ///    records that VS as a source of the new cell execution.
    /// 4. For each deleted name, pushes a terminal, `deleted` VS and drops
    ///    the name from the active map.
    /// 5. Builds the new [`CellExecution`] in full, then appends it —
    ///    nothing observable changes until this last, infallible step.
    #[instrument(skip(self, code, linked_pairs), fields(code_len = code.len(), version))]
    pub fn update_graph(
        &mut self,
        code: String,
        version: u64,
        runtime_s: f64,
        accessed: &HashSet<VariableName>,
        current_names: &BTreeSet<VariableName>,
        linked_pairs: &[(VariableName, VariableName)],
        modified: &HashSet<VariableName>,
        deleted: &HashSet<VariableName>,
    ) -> CeId {
        let ce_id = CeId(self.ces.len());
        let groups = partition_by_overlap(current_names, linked_pairs);

        // Step 3, computed against the *prior* active map, before step 2
        // below starts overwriting it.
        let mut src_vss = Vec::new();
        {
            let mut seen = HashSet::new();
            for name in accessed.iter().chain(modified.iter()) {
                if let Some(&vs_id) = self.active.get(name) {
                    if seen.insert(vs_id) {
                        src_vss.push(vs_id);
                    }
                }
            }
        }

        let mut dst_vss = Vec::new();
        for group in &groups {
            let stale = group.iter().any(|name| match self.active.get(name) {
                None => true,
                Some(vs_id) => self
                    .vss
                    .get(vs_id.0)
                    .map(|vs| &vs.names != group)
                    .unwrap_or(true),
            });
            let touched = group.iter().any(|name| modified.contains(name));
            if !stale && !touched {
                continue;
            }
            let vs_id = VsId(
                self.vss
                    .push(VariableSnapshot::new(group.clone(), version, ce_id)),
            );
            dst_vss.push(vs_id);
            for name in group {
                self.active.insert(name.clone(), vs_id);
            }
        }

        for name in deleted {
            let mut names = BTreeSet::new();
            names.insert(name.clone());
            let vs_id = VsId(
                self.vss
                    .push(VariableSnapshot::deleted(names, version, ce_id)),
            );
            dst_vss.push(vs_id);
            self.active.remove(name);
        }

        let mut ce = CellExecution::new(ce_id.0, code, runtime_s);
        ce.src_vss = src_vss;
        ce.dst_vss = dst_vss;
        let pushed = self.ces.push(ce);
        debug_assert_eq!(pushed, ce_id.0, "AHG cell_num must equal its arena index");

        ce_id
    }

    /// Round-trips through a versioned JSON document. Callers must treat
    /// the string as opaque; only round-trip fidelity is guaranteed.
    pub fn serialize(&self) -> PlannerResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn deserialize(s: &str) -> PlannerResult<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Connected components of `current_names` under the symmetric closure of
/// `linked_pairs`, computed with a per-call union-find over a dense index
/// space (pairs naming anything outside `current_names` are ignored — a
/// deleted variable can still appear in a stale `linked_pairs` entry from
/// the caller).
fn partition_by_overlap(
    current_names: &BTreeSet<VariableName>,
    linked_pairs: &[(VariableName, VariableName)],
) -> Vec<BTreeSet<VariableName>> {
    let ordered: Vec<&VariableName> = current_names.iter().collect();
    let index: HashMap<&VariableName, usize> =
        ordered.iter().enumerate().map(|(i, n)| (*n, i)).collect();

    let mut uf = UnionFind::new(ordered.len());
    for (a, b) in linked_pairs {
        if let (Some(&ia), Some(&ib)) = (index.get(a), index.get(b)) {
            uf.union(ia, ib);
        }
    }

    let mut groups: HashMap<usize, BTreeSet<VariableName>> = HashMap::new();
    for (i, name) in ordered.iter().enumerate() {
        groups.entry(uf.find(i)).or_default().insert((*name).clone());
    }
    groups.into_values().collect()
}
