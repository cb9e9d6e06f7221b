//! The orchestrator: pre/post cell hooks, diff detection against the
//! previous fingerprint of each bound name, plan emission at commit time,
//! and state replacement on checkout.
//!
//! A [`Planner`] owns exactly three pieces of mutable state — the AHG, the
//! `IdGraphMap` side table, and the pre-cell keyset snapshot — and reads
//! the kernel [`Namespace`] only between cell executions, never during one
//! (see the crate-level concurrency notes).

use std::cell::Cell;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;
use std::time::Instant;

use tracing::{instrument, warn};

use crate::ahg::{Ahg, CeId, VariableName};
use crate::config::{OptimizerConfig, PlannerConfig};
use crate::error::{PlannerError, PlannerResult};
use crate::idgraph::{self, IdGraphNode};
use crate::namespace::{Namespace, ValueStore};
use crate::optimizer;
use crate::plan::{CheckpointGroup, CheckpointPlan, RestoreAction, RestorePlan};
use crate::size_profiler;

/// What changed in the namespace across one cell's execution, returned by
/// [`Planner::post_run_cell_update`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangedVariables {
    pub created: BTreeSet<VariableName>,
    pub modified_value: BTreeSet<VariableName>,
    pub modified_structure: BTreeSet<VariableName>,
    pub deleted: BTreeSet<VariableName>,
}

/// Monotonic nanosecond-ish version counter. Per the design notes, wall
/// clock time is not trusted: this measures elapsed time since the
/// `Planner` was constructed and bumps a tiebreaker whenever two calls
/// land in the same clock tick, so versions are always strictly
/// increasing within one `Planner` instance regardless of clock
/// resolution.
struct VersionClock {
    start: Instant,
    last: Cell<u64>,
}

impl VersionClock {
    fn new() -> Self {
        Self {
            start: Instant::now(),
            last: Cell::new(0),
        }
    }

    fn next(&self) -> u64 {
        let elapsed = self.start.elapsed().as_nanos() as u64;
        let v = if elapsed > self.last.get() {
            elapsed
        } else {
            self.last.get() + 1
        };
        self.last.set(v);
        v
    }
}

pub struct Planner {
    ahg: Ahg,
    id_graph_map: HashMap<VariableName, Rc<IdGraphNode>>,
    pre_run_cell_vars: BTreeSet<VariableName>,
    clock: VersionClock,
    planner_config: PlannerConfig,
    optimizer_config: OptimizerConfig,
}

impl Planner {
    /// Bootstraps an AHG from whatever is already bound in `namespace` (see
    /// [`Ahg::from_existing`]) — the state a freshly attached kernel starts
    /// from before any cell has run under this Planner.
    pub fn new(
        namespace: &dyn Namespace,
        planner_config: PlannerConfig,
        optimizer_config: OptimizerConfig,
    ) -> Self {
        let clock = VersionClock::new();
        let version = clock.next();
        Self {
            ahg: Ahg::from_existing(namespace, version),
            id_graph_map: HashMap::new(),
            pre_run_cell_vars: BTreeSet::new(),
            clock,
            planner_config,
            optimizer_config,
        }
    }

    pub fn ahg(&self) -> &Ahg {
        &self.ahg
    }

    /// Snapshots the pre-cell keyset and fingerprints any AHG-known name
    /// that's bound but missing from `IdGraphMap` — the "commit before the
    /// first post-cell update ran" gap.
    #[instrument(skip(self, namespace))]
    pub fn pre_run_cell_update(&mut self, namespace: &dyn Namespace) {
        self.pre_run_cell_vars = namespace.keyset();
        for name in self.ahg.active_names() {
            if self.id_graph_map.contains_key(&name) {
                continue;
            }
            if let Some(value) = namespace.get(&name) {
                self.id_graph_map.insert(name, idgraph::build(&value));
            }
        }
    }

    /// Diffs the namespace against the fingerprints retained from the last
    /// call, records the result in the AHG under a freshly assigned
    /// version, and returns what changed. See §4.6 of the design doc for
    /// the step-by-step semantics this implements.
    #[instrument(skip(self, namespace, code), fields(runtime_s))]
    pub fn post_run_cell_update(
        &mut self,
        namespace: &dyn Namespace,
        code: impl Into<String>,
        runtime_s: f64,
    ) -> ChangedVariables {
        let version = self.clock.next();
        let current_keys = namespace.keyset();

        let reported_accessed = namespace.accessed_vars();
        namespace.reset_accessed_vars();
        let mut accessed: HashSet<VariableName> = reported_accessed
            .into_iter()
            .filter(|n| self.pre_run_cell_vars.contains(n))
            .collect();

        let created: BTreeSet<VariableName> = current_keys
            .difference(&self.pre_run_cell_vars)
            .cloned()
            .collect();
        let deleted: BTreeSet<VariableName> = self
            .pre_run_cell_vars
            .difference(&current_keys)
            .cloned()
            .collect();

        let mut modified_value = BTreeSet::new();
        let mut modified_structure = BTreeSet::new();

        let tracked: Vec<VariableName> = self.id_graph_map.keys().cloned().collect();
        for name in tracked {
            if !current_keys.contains(&name) {
                continue;
            }
            let Some(value) = namespace.get(&name) else {
                continue;
            };
            let new_node = idgraph::build(&value);
            let old_node = self.id_graph_map.get(&name).expect("just checked").clone();

            if !idgraph::value_equal(&old_node, &new_node) {
                modified_value.insert(name.clone());
            }
            if !idgraph::structural_equal(&old_node, &new_node) {
                if idgraph::is_root_identity_and_type_equal(&old_node, &new_node) {
                    // Same object, new contents: an in-place mutation the
                    // instrumentation may not have reported as a read.
                    accessed.insert(name.clone());
                }
                self.id_graph_map.insert(name.clone(), new_node);
                modified_structure.insert(name.clone());
            }
        }

        for name in &created {
            if let Some(value) = namespace.get(name) {
                self.id_graph_map.insert(name.clone(), idgraph::build(&value));
            }
        }
        for name in &deleted {
            self.id_graph_map.remove(name);
        }

        let bound: Vec<VariableName> = current_keys.iter().cloned().collect();
        let mut linked_pairs = Vec::new();
        for i in 0..bound.len() {
            for j in (i + 1)..bound.len() {
                let (a, b) = (&bound[i], &bound[j]);
                if let (Some(na), Some(nb)) = (self.id_graph_map.get(a), self.id_graph_map.get(b))
                {
                    if idgraph::overlap(na, nb) {
                        linked_pairs.push((a.clone(), b.clone()));
                    }
                }
            }
        }

        let modified: HashSet<VariableName> = modified_value
            .iter()
            .chain(modified_structure.iter())
            .cloned()
            .collect();
        let deleted_set: HashSet<VariableName> = deleted.iter().cloned().collect();

        self.ahg.update_graph(
            code.into(),
            version,
            runtime_s,
            &accessed,
            &current_keys,
            &linked_pairs,
            &modified,
            &deleted_set,
        );

        self.pre_run_cell_vars = current_keys;

        ChangedVariables {
            created,
            modified_value,
            modified_structure,
            deleted,
        }
    }

    /// Profiles active snapshot sizes, consults the store (in incremental
    /// mode), runs the optimizer, and emits the checkpoint/restore plan
    /// pair for `commit_id`.
    #[instrument(skip(self, namespace, store, parent_commit_ids))]
    pub fn generate_checkpoint_restore_plans(
        &mut self,
        namespace: &dyn Namespace,
        store: &dyn ValueStore,
        commit_id: &str,
        parent_commit_ids: &[String],
    ) -> PlannerResult<(CheckpointPlan, RestorePlan)> {
        let active = self.ahg.get_active_variable_snapshots();

        // Step 1: cover "commit before first cell" — make sure every active
        // VS's names have a fingerprint on file.
        for &vs_id in &active {
            let vs = self
                .ahg
                .vs(vs_id)
                .ok_or(PlannerError::OptimizerInfeasible(vs_id))?;
            if vs.deleted {
                continue;
            }
            for name in &vs.names {
                if self.id_graph_map.contains_key(name) {
                    continue;
                }
                let value = namespace
                    .get(name)
                    .ok_or_else(|| PlannerError::UnknownVariable(name.clone()))?;
                self.id_graph_map.insert(name.clone(), idgraph::build(&value));
            }
        }

        // Step 2: profile sizes and flag unserializable groups.
        let mut sizes = HashMap::new();
        let mut unserializable = HashSet::new();
        for &vs_id in &active {
            let vs = self.ahg.vs(vs_id).expect("checked above");
            if vs.deleted {
                continue;
            }
            let mut values = Vec::new();
            let mut any_unserializable = false;
            for name in &vs.names {
                if let Some(value) = namespace.get(name) {
                    if !value.is_serializable() {
                        any_unserializable = true;
                    }
                    values.push(value);
                } else {
                    warn!(%name, "active variable snapshot name missing from namespace during profiling");
                }
            }
            sizes.insert(vs_id, size_profiler::estimate(&values));
            if any_unserializable {
                unserializable.insert(vs_id);
            }
        }

        // Step 3: incremental store — subtract versions an ancestor commit
        // already holds.
        let already_stored = if self.planner_config.incremental_store {
            let stored_names = store.get_stored_versioned_names(parent_commit_ids)?;
            active
                .iter()
                .copied()
                .filter(|&vs_id| {
                    self.ahg
                        .vs(vs_id)
                        .map(|vs| stored_names.contains(&vs.versioned_name()))
                        .unwrap_or(false)
                })
                .collect()
        } else {
            HashSet::new()
        };

        // Step 4: optimize.
        let partition = optimizer::optimize(
            &self.ahg,
            &active,
            &sizes,
            &unserializable,
            &already_stored,
            &self.optimizer_config,
        )?;

        // Step 5: checkpoint plan.
        let mut groups: Vec<CheckpointGroup> = if self.planner_config.incremental_store {
            partition
                .vss_to_migrate
                .iter()
                .filter_map(|&vs_id| {
                    let vs = self.ahg.vs(vs_id)?;
                    Some(CheckpointGroup {
                        names: vs.names.clone(),
                        version: vs.version,
                        size_bytes: sizes.get(&vs_id).copied().unwrap_or(0),
                    })
                })
                .collect()
        } else {
            partition
                .vss_to_migrate
                .iter()
                .filter_map(|&vs_id| self.ahg.vs(vs_id).map(|vs| (vs_id, vs)))
                .flat_map(|(vs_id, vs)| {
                    let size = sizes.get(&vs_id).copied().unwrap_or(0);
                    let version = vs.version;
                    vs.names.iter().cloned().map(move |name| CheckpointGroup {
                        names: BTreeSet::from([name]),
                        version,
                        size_bytes: size,
                    })
                })
                .collect()
        };
        groups.sort_by(|a, b| {
            a.names
                .iter()
                .next()
                .cloned()
                .map(|n| n.to_string())
                .cmp(&b.names.iter().next().cloned().map(|n| n.to_string()))
        });

        // Step 6: restore plan — walk CEs in ascending cell_num.
        let mut actions = Vec::new();
        let mut memo = HashMap::new();
        for ce in self.ahg.get_cell_executions() {
            let ce_id = CeId(ce.cell_num);
            if partition.ces_to_recompute.contains(&ce_id) {
                actions.push(RestoreAction::RerunCell {
                    cell_num: ce.cell_num,
                    code: ce.code.clone(),
                });
            }
            for &dst in &ce.dst_vss {
                let loadable =
                    partition.vss_to_migrate.contains(&dst) || already_stored.contains(&dst);
                if !loadable {
                    continue;
                }
                let Some(vs) = self.ahg.vs(dst) else {
                    continue;
                };
                if vs.deleted {
                    continue;
                }
                let prereq_nums = optimizer::prerequisites_of(
                    &self.ahg,
                    ce_id,
                    &partition.vss_to_migrate,
                    &already_stored,
                    &mut memo,
                );
                let prerequisites = prereq_nums
                    .iter()
                    .filter_map(|&cn| {
                        self.ahg
                            .get_cell_executions()
                            .get(cn)
                            .map(|c| (c.cell_num, c.code.clone()))
                    })
                    .collect();
                actions.push(RestoreAction::LoadVariable {
                    cell_num: ce.cell_num,
                    names: vs.names.clone(),
                    prerequisites,
                });
            }
        }

        Ok((CheckpointPlan { groups }, RestorePlan { actions }))
    }

    /// Replaces this Planner's entire history with a deserialized AHG —
    /// what happens on a branch checkout. Both caches are cleared wholesale
    /// rather than reconciled, since they're only ever valid against the
    /// AHG they were built alongside.
    pub fn replace_state(&mut self, serialized_ahg: &str) -> PlannerResult<()> {
        let ahg = Ahg::deserialize(serialized_ahg)?;
        self.ahg = ahg;
        self.id_graph_map.clear();
        self.pre_run_cell_vars.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::{InMemoryNamespace, NullValueStore};
    use crate::value::Value;

    #[test]
    fn s1_primitive_create_modify_delete() {
        let ns = InMemoryNamespace::new();
        let mut planner = Planner::new(&ns, PlannerConfig::default(), OptimizerConfig::default());

        planner.pre_run_cell_update(&ns);
        ns.bind("x", Value::Int(1));
        let changed = planner.post_run_cell_update(&ns, "x = 1", 0.01);
        assert_eq!(changed.created, BTreeSet::from([VariableName::new("x")]));
        assert!(changed.modified_value.is_empty());
        assert!(changed.deleted.is_empty());

        planner.pre_run_cell_update(&ns);
        ns.bind("x", Value::Int(2));
        let changed = planner.post_run_cell_update(&ns, "x = 2", 0.01);
        assert_eq!(
            changed.modified_value,
            BTreeSet::from([VariableName::new("x")])
        );
        assert_eq!(
            changed.modified_structure,
            BTreeSet::from([VariableName::new("x")])
        );

        planner.pre_run_cell_update(&ns);
        ns.delete(&VariableName::new("x"));
        let changed = planner.post_run_cell_update(&ns, "del x", 0.0);
        assert_eq!(changed.deleted, BTreeSet::from([VariableName::new("x")]));
    }

    #[test]
    fn s2_aliasing_then_split() {
        let ns = InMemoryNamespace::new();
        let mut planner = Planner::new(&ns, PlannerConfig::default(), OptimizerConfig::default());

        planner.pre_run_cell_update(&ns);
        let list = Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        ns.bind("a", list.clone());
        ns.bind("b", list);
        planner.post_run_cell_update(&ns, "a = [1,2,3]\nb = a", 0.01);
        assert_eq!(planner.ahg().get_active_variable_snapshots().len(), 1);

        planner.pre_run_cell_update(&ns);
        ns.bind("b", Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]));
        let changed = planner.post_run_cell_update(&ns, "b = [1,2,3]", 0.01);
        assert!(changed.modified_value.is_empty());
        assert_eq!(
            changed.modified_structure,
            BTreeSet::from([VariableName::new("b")])
        );
        assert_eq!(planner.ahg().get_active_variable_snapshots().len(), 2);
    }

    #[test]
    fn s3_in_place_mutation_counts_as_access() {
        let ns = InMemoryNamespace::new();
        let mut planner = Planner::new(&ns, PlannerConfig::default(), OptimizerConfig::default());

        planner.pre_run_cell_update(&ns);
        ns.bind("xs", Value::list(vec![Value::Int(1)]));
        planner.post_run_cell_update(&ns, "xs = [1]", 0.0);

        planner.pre_run_cell_update(&ns);
        if let Value::List(cell) = ns.get(&VariableName::new("xs")).unwrap() {
            cell.borrow_mut().push(Value::Int(2));
        }
        let changed = planner.post_run_cell_update(&ns, "xs.append(2)", 0.0);
        assert_eq!(
            changed.modified_structure,
            BTreeSet::from([VariableName::new("xs")])
        );
        assert_eq!(
            changed.modified_value,
            BTreeSet::from([VariableName::new("xs")])
        );
        let ces = planner.ahg().get_cell_executions();
        let last = ces.last().unwrap();
        assert!(!last.src_vss.is_empty(), "in-place mutation should register as an access");
    }

    #[test]
    fn s4_optimizer_prefers_migrate_in_full_plan() {
        let ns = InMemoryNamespace::new();
        let mut planner = Planner::new(&ns, PlannerConfig::default(), OptimizerConfig::default());

        planner.pre_run_cell_update(&ns);
        ns.bind("a", Value::Int(1));
        planner.post_run_cell_update(&ns, "a = 1", 10.0);

        planner.pre_run_cell_update(&ns);
        ns.bind("b", Value::Int(2));
        planner.post_run_cell_update(&ns, "b = 2", 10.0);

        let store = NullValueStore;
        let (checkpoint, restore) = planner
            .generate_checkpoint_restore_plans(&ns, &store, "c1", &[])
            .unwrap();

        assert!(restore
            .actions
            .iter()
            .all(|a| matches!(a, RestoreAction::LoadVariable { .. })));
        assert_eq!(checkpoint.groups.len(), 2);
    }

    #[test]
    fn s5_unserializable_forces_rerun() {
        let ns = InMemoryNamespace::new();
        let mut planner = Planner::new(&ns, PlannerConfig::default(), OptimizerConfig::default());

        planner.pre_run_cell_update(&ns);
        ns.bind("f", Value::opaque_callable("mod.f"));
        planner.post_run_cell_update(&ns, "f = lambda x: x", 0.01);

        let store = NullValueStore;
        let (_checkpoint, restore) = planner
            .generate_checkpoint_restore_plans(&ns, &store, "c1", &[])
            .unwrap();

        assert!(restore
            .actions
            .iter()
            .any(|a| matches!(a, RestoreAction::RerunCell { cell_num, .. } if *cell_num == 1)));
    }
}
