//! The minimum-cost migrate/recompute partition.
//!
//! Every active variable snapshot picks between two mutually exclusive
//! ways of becoming restorable: pay to migrate (serialize) it, or force its
//! producing cell execution into the recompute set. Cell executions are
//! shared nodes, so a CE that is forced in once pays its runtime cost once
//! no matter how many downstream snapshots need it — exactly the "project
//! selection problem" shape, which is solved here as a min s-t cut over a
//! flow network built on `petgraph`.
//!
//! Network construction, given the active set `A` (already filtered by the
//! caller to exclude anything the store already has):
//!
//! - `source -> Vs(v)`, capacity = migrate cost of `v`, for every `v` in
//!   `A`; capacity is forced to [`INFEASIBLE_CAPACITY`] when `v` is
//!   unserializable, so that edge can never appear in a minimum cut.
//! - `Vs(v) -> Ce(output_ce(v))`, capacity infinite, for every `v` in `A` —
//!   "if `v` isn't migrated, its producer must be recomputed".
//! - `Ce(c) -> sink`, capacity = `c.runtime_seconds`, for every CE reachable
//!   through the dependency edges below.
//! - `Ce(c) -> Ce(output_ce(src))`, capacity infinite, for every `src` in
//!   `c.src_vss` that is *not* in `A` and not already stored — a historical
//!   snapshot has no migrate option, so recomputing `c` unconditionally
//!   drags in whatever produced it.
//!
//! After max-flow, the set of nodes reachable from `source` in the residual
//! graph is the minimum (and, among ties, migration-preferring — see
//! below) source side of the cut: a `Vs` node left reachable means its
//! migrate edge was *not* cut, i.e. it needs recomputing; a `Ce` node
//! reachable means its sink edge *was* cut, i.e. it's selected for
//! recompute.
//!
//! BFS-augmenting (Edmonds–Karp) finds the augmenting path closest to the
//! source at each step, which is also what makes the resulting reachable
//! set the *smallest* valid source side among all minimum cuts — fewer
//! `Vs` nodes stranded on the recompute side, i.e. ties break toward
//! migration, matching the spec's stated policy.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use tracing::instrument;

use crate::ahg::{Ahg, CeId, VsId};
use crate::config::OptimizerConfig;
use crate::error::{PlannerError, PlannerResult};

/// Large enough that it is never the minimum choice, but finite so flow
/// arithmetic stays ordinary `f64` addition/subtraction.
const INFEASIBLE_CAPACITY: f64 = 1e18;
const EPS: f64 = 1e-9;

/// `(vss_to_migrate, ces_to_recompute, req_func_mapping)` from the design
/// doc's §4.5, plus the names the spec addresses them by.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    pub vss_to_migrate: HashSet<VsId>,
    pub ces_to_recompute: HashSet<CeId>,
    /// `req_func_mapping[ce.cell_num]`: every prerequisite cell number (in
    /// ascending order) that must run before `ce` can be replayed.
    pub req_func_mapping: HashMap<usize, Vec<usize>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Node {
    Source,
    Sink,
    Vs(VsId),
    Ce(CeId),
}

/// A residual flow network over [`Node`]s, backed by a `petgraph` directed
/// graph whose edge weights are the remaining capacity. Every forward edge
/// is paired with a zero-capacity reverse edge so Edmonds–Karp can push
/// flow back along an augmenting path.
struct FlowNetwork {
    graph: DiGraph<Node, f64>,
    index_of: HashMap<Node, NodeIndex>,
    sibling: HashMap<EdgeIndex, EdgeIndex>,
}

impl FlowNetwork {
    fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            index_of: HashMap::new(),
            sibling: HashMap::new(),
        }
    }

    fn node(&mut self, n: Node) -> NodeIndex {
        if let Some(&idx) = self.index_of.get(&n) {
            return idx;
        }
        let idx = self.graph.add_node(n);
        self.index_of.insert(n, idx);
        idx
    }

    fn add_edge(&mut self, from: Node, to: Node, capacity: f64) {
        let a = self.node(from);
        let b = self.node(to);
        let fwd = self.graph.add_edge(a, b, capacity);
        let bwd = self.graph.add_edge(b, a, 0.0);
        self.sibling.insert(fwd, bwd);
        self.sibling.insert(bwd, fwd);
    }

    /// Runs Edmonds–Karp to completion and returns the total flow value.
    fn max_flow(&mut self, source: Node, sink: Node) -> f64 {
        let source = self.node(source);
        let sink = self.node(sink);
        let mut total = 0.0;
        loop {
            let Some((path, bottleneck)) = self.shortest_augmenting_path(source, sink) else {
                break;
            };
            for edge in path {
                let sib = self.sibling[&edge];
                *self.graph.edge_weight_mut(edge).unwrap() -= bottleneck;
                *self.graph.edge_weight_mut(sib).unwrap() += bottleneck;
            }
            total += bottleneck;
        }
        total
    }

    /// BFS for the fewest-hops path with positive residual capacity.
    /// Returns the edges along that path and its bottleneck capacity.
    fn shortest_augmenting_path(
        &self,
        source: NodeIndex,
        sink: NodeIndex,
    ) -> Option<(Vec<EdgeIndex>, f64)> {
        let mut parent_edge: HashMap<NodeIndex, EdgeIndex> = HashMap::new();
        let mut visited = HashSet::new();
        visited.insert(source);
        let mut queue = VecDeque::new();
        queue.push_back(source);

        while let Some(u) = queue.pop_front() {
            if u == sink {
                break;
            }
            for edge in self.graph.edges(u) {
                let cap = *edge.weight();
                let v = edge.target();
                if cap > EPS && visited.insert(v) {
                    parent_edge.insert(v, edge.id());
                    queue.push_back(v);
                }
            }
        }

        if !visited.contains(&sink) {
            return None;
        }

        let mut path = Vec::new();
        let mut bottleneck = f64::INFINITY;
        let mut cur = sink;
        while cur != source {
            let edge = parent_edge[&cur];
            bottleneck = bottleneck.min(*self.graph.edge_weight(edge).unwrap());
            let (u, _) = self.graph.edge_endpoints(edge).unwrap();
            path.push(edge);
            cur = u;
        }
        Some((path, bottleneck))
    }

    /// Nodes reachable from `source` along positive-residual-capacity
    /// edges once the network is at max flow: the source side of the
    /// minimum cut.
    fn reachable_from(&self, source: Node) -> HashSet<Node> {
        let Some(&start) = self.index_of.get(&source) else {
            return HashSet::new();
        };
        let mut visited = HashSet::new();
        visited.insert(start);
        let mut queue = VecDeque::new();
        queue.push_back(start);
        while let Some(u) = queue.pop_front() {
            for edge in self.graph.edges(u) {
                if *edge.weight() > EPS && visited.insert(edge.target()) {
                    queue.push_back(edge.target());
                }
            }
        }
        visited
            .into_iter()
            .map(|idx| self.graph[idx])
            .collect()
    }
}

/// Computes the minimum-cost migrate/recompute partition for the active
/// snapshots in `active`.
///
/// `sizes` must have an entry for every `VsId` in `active`; `unserializable`
/// marks snapshots the store cannot persist (forced into the recompute
/// side); `already_stored` marks snapshots — active or historical — a
/// commit ancestor already has, which need neither migrating nor
/// recomputing.
#[instrument(skip(ahg, active, sizes, unserializable, already_stored, config))]
pub fn optimize(
    ahg: &Ahg,
    active: &[VsId],
    sizes: &HashMap<VsId, u64>,
    unserializable: &HashSet<VsId>,
    already_stored: &HashSet<VsId>,
    config: &OptimizerConfig,
) -> PlannerResult<Partition> {
    let active_set: HashSet<VsId> = active.iter().copied().collect();
    let mut net = FlowNetwork::new();

    for &vs_id in active {
        if already_stored.contains(&vs_id) {
            continue;
        }
        let vs = ahg
            .vs(vs_id)
            .ok_or(PlannerError::OptimizerInfeasible(vs_id))?;
        let size = sizes.get(&vs_id).copied().unwrap_or(0);
        let migrate_cost = if unserializable.contains(&vs_id) {
            INFEASIBLE_CAPACITY
        } else {
            size as f64 / config.migration_speed_bps
        };
        net.add_edge(Node::Source, Node::Vs(vs_id), migrate_cost);
        net.add_edge(Node::Vs(vs_id), Node::Ce(vs.output_ce), INFEASIBLE_CAPACITY);
    }

    // Historical (non-active) prerequisites have no migrate option: forcing
    // a CE into the recompute set unconditionally drags in whatever
    // produced its non-active, non-stored inputs.
    for ce in ahg.get_cell_executions() {
        let ce_id = CeId(ce.cell_num);
        net.add_edge(Node::Ce(ce_id), Node::Sink, ce.runtime_seconds);
        for &src in &ce.src_vss {
            if active_set.contains(&src) || already_stored.contains(&src) {
                continue;
            }
            if let Some(src_vs) = ahg.vs(src) {
                net.add_edge(Node::Ce(ce_id), Node::Ce(src_vs.output_ce), INFEASIBLE_CAPACITY);
            }
        }
    }

    let flow = net.max_flow(Node::Source, Node::Sink);
    if flow >= INFEASIBLE_CAPACITY / 2.0 {
        let offending = active
            .iter()
            .find(|v| unserializable.contains(v))
            .copied()
            .unwrap_or(active[0]);
        return Err(PlannerError::OptimizerInfeasible(offending));
    }

    let reachable = net.reachable_from(Node::Source);

    let mut vss_to_migrate = HashSet::new();
    for &vs_id in active {
        if already_stored.contains(&vs_id) {
            continue;
        }
        if !reachable.contains(&Node::Vs(vs_id)) {
            vss_to_migrate.insert(vs_id);
        }
    }

    let mut ces_to_recompute = HashSet::new();
    for ce in ahg.get_cell_executions() {
        let ce_id = CeId(ce.cell_num);
        if reachable.contains(&Node::Ce(ce_id)) {
            ces_to_recompute.insert(ce_id);
        }
    }

    let req_func_mapping = build_req_func_mapping(ahg, &ces_to_recompute, &vss_to_migrate, already_stored);

    Ok(Partition {
        vss_to_migrate,
        ces_to_recompute,
        req_func_mapping,
    })
}

/// For every CE selected for recompute, the transitive closure of prior
/// cell numbers it needs — walking back through each non-migrated,
/// non-stored source snapshot to the CE that produced it.
fn build_req_func_mapping(
    ahg: &Ahg,
    ces_to_recompute: &HashSet<CeId>,
    vss_to_migrate: &HashSet<VsId>,
    already_stored: &HashSet<VsId>,
) -> HashMap<usize, Vec<usize>> {
    let mut memo: HashMap<CeId, Vec<usize>> = HashMap::new();
    let mut mapping = HashMap::new();
    for &ce_id in ces_to_recompute {
        let prereqs = prerequisites_of(ahg, ce_id, vss_to_migrate, already_stored, &mut memo);
        mapping.insert(ce_id.0, prereqs);
    }
    mapping
}

/// Prerequisite cell numbers needed to rerun `ce_id`: every CE that
/// produced a source snapshot of `ce_id` (transitively) that isn't being
/// migrated or already held by the store. Shared by [`optimize`]'s
/// `req_func_mapping` and by the Planner when it builds `LoadVariable`'s
/// fallback path for a CE that wasn't itself selected for recompute.
pub(crate) fn prerequisites_of(
    ahg: &Ahg,
    ce_id: CeId,
    vss_to_migrate: &HashSet<VsId>,
    already_stored: &HashSet<VsId>,
    memo: &mut HashMap<CeId, Vec<usize>>,
) -> Vec<usize> {
    if let Some(cached) = memo.get(&ce_id) {
        return cached.clone();
    }
    // Placeholder so a cycle (which should never occur in a well-formed
    // AHG, since CEs only depend on strictly earlier ones) terminates
    // instead of recursing forever.
    memo.insert(ce_id, Vec::new());

    let mut result = BTreeSet::new();
    if let Some(ce) = ahg.ce(ce_id) {
        for &src in &ce.src_vss {
            if vss_to_migrate.contains(&src) || already_stored.contains(&src) {
                continue;
            }
            let Some(src_vs) = ahg.vs(src) else { continue };
            let producer = src_vs.output_ce;
            if producer == ce_id {
                continue;
            }
            result.insert(ahg.ce(producer).map(|c| c.cell_num).unwrap_or(producer.0));
            for p in prerequisites_of(ahg, producer, vss_to_migrate, already_stored, memo) {
                result.insert(p);
            }
        }
    }

    let v: Vec<usize> = result.into_iter().collect();
    memo.insert(ce_id, v.clone());
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ahg::VariableName;
    use std::collections::BTreeSet;

    fn single_cell_ahg(runtime: f64) -> (Ahg, VsId, CeId) {
        let mut ahg = Ahg::new();
        let mut names = BTreeSet::new();
        names.insert(VariableName::new("x"));
        let ce_id = ahg.update_graph(
            "x = 1".into(),
            1,
            runtime,
            &HashSet::new(),
            &names,
            &[],
            &HashSet::from_iter([VariableName::new("x")]),
            &HashSet::new(),
        );
        let vs_id = ahg.get_active_variable_snapshots()[0];
        (ahg, vs_id, ce_id)
    }

    #[test]
    fn cheap_migration_beats_expensive_recompute() {
        let (ahg, vs_id, _ce) = single_cell_ahg(10.0);
        let mut sizes = HashMap::new();
        sizes.insert(vs_id, 1024);
        let config = OptimizerConfig {
            migration_speed_bps: 1e9,
        };
        let partition = optimize(
            &ahg,
            &[vs_id],
            &sizes,
            &HashSet::new(),
            &HashSet::new(),
            &config,
        )
        .unwrap();
        assert!(partition.vss_to_migrate.contains(&vs_id));
        assert!(partition.ces_to_recompute.is_empty());
    }

    #[test]
    fn unserializable_forces_recompute() {
        let (ahg, vs_id, ce_id) = single_cell_ahg(0.01);
        let mut sizes = HashMap::new();
        sizes.insert(vs_id, 8);
        let unserializable = HashSet::from_iter([vs_id]);
        let config = OptimizerConfig::default();
        let partition = optimize(
            &ahg,
            &[vs_id],
            &sizes,
            &unserializable,
            &HashSet::new(),
            &config,
        )
        .unwrap();
        assert!(!partition.vss_to_migrate.contains(&vs_id));
        assert!(partition.ces_to_recompute.contains(&ce_id));
    }

    #[test]
    fn already_stored_is_excluded_from_migration() {
        let (ahg, vs_id, _ce) = single_cell_ahg(10.0);
        let mut sizes = HashMap::new();
        sizes.insert(vs_id, 1);
        let already_stored = HashSet::from_iter([vs_id]);
        let config = OptimizerConfig::default();
        let partition = optimize(
            &ahg,
            &[vs_id],
            &sizes,
            &HashSet::new(),
            &already_stored,
            &config,
        )
        .unwrap();
        assert!(!partition.vss_to_migrate.contains(&vs_id));
        assert!(partition.ces_to_recompute.is_empty());
    }

    #[test]
    fn recompute_chain_pulls_in_historical_prerequisite() {
        let mut ahg = Ahg::new();
        let mut names_x = BTreeSet::new();
        names_x.insert(VariableName::new("x"));
        let ce0 = ahg.update_graph(
            "x = 1".into(),
            1,
            5.0,
            &HashSet::new(),
            &names_x,
            &[],
            &HashSet::from_iter([VariableName::new("x")]),
            &HashSet::new(),
        );
        let x_vs0 = ahg.get_active_variable_snapshots()[0];

        let mut names_y = BTreeSet::new();
        names_y.insert(VariableName::new("x"));
        names_y.insert(VariableName::new("y"));
        // cell 2 reads x (unmodified, so x_vs0 stays active and becomes a
        // src_vs) and creates y.
        let accessed = HashSet::from_iter([VariableName::new("x")]);
        let ce1 = ahg.update_graph(
            "y = f(x)".into(),
            2,
            3.0,
            &accessed,
            &names_y,
            &[],
            &HashSet::from_iter([VariableName::new("y")]),
            &HashSet::new(),
        );
        let active = ahg.get_active_variable_snapshots();
        let y_vs = *active
            .iter()
            .find(|id| ahg.vs(**id).unwrap().names.contains(&VariableName::new("y")))
            .unwrap();

        // Mark both snapshots unserializable: x (still active, read but not
        // rebound by cell 2) and y both have to be restored by recompute.
        let unserializable = HashSet::from_iter([x_vs0, y_vs]);
        let mut sizes = HashMap::new();
        sizes.insert(x_vs0, 8);
        sizes.insert(y_vs, 8);
        let config = OptimizerConfig::default();

        let partition = optimize(
            &ahg,
            &active,
            &sizes,
            &unserializable,
            &HashSet::new(),
            &config,
        )
        .unwrap();

        assert!(partition.ces_to_recompute.contains(&ce1));
        assert!(partition.ces_to_recompute.contains(&ce0));
        let prereqs = &partition.req_func_mapping[&ce1.0];
        assert!(prereqs.contains(&ahg.ce(ce0).unwrap().cell_num));
    }
}
