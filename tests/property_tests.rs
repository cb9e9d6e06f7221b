use proptest::prelude::*;

use notebook_planner::idgraph::{self, structural_equal, value_equal};
use notebook_planner::{Ahg, InMemoryNamespace, OptimizerConfig, Planner, PlannerConfig, Value};

fn arb_primitive() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        any::<i64>().prop_map(|n| Value::str(n.to_string())),
    ]
}

fn arb_value() -> impl Strategy<Value = Value> {
    arb_primitive().prop_recursive(3, 16, 4, |inner| {
        prop::collection::vec(inner, 0..4).prop_map(Value::list)
    })
}

proptest! {
    // Every value's fingerprint is equal to itself under both relations —
    // fingerprinting the same live object twice must never disagree with
    // itself.
    #[test]
    fn prop_fingerprint_is_reflexive(value in arb_value()) {
        let a = idgraph::build(&value);
        let b = idgraph::build(&value);
        prop_assert!(value_equal(&a, &b));
        prop_assert!(structural_equal(&a, &b));
    }

    // structural_equal is the strictly narrower relation: identity and
    // contents must both match, which implies contents alone match. Exercise
    // this against two independently-constructed values of equal shape, so
    // containers land on the "same contents, different identity" branch
    // where the two relations can actually disagree.
    #[test]
    fn prop_structural_equal_implies_value_equal(items in prop::collection::vec(any::<i64>(), 0..6)) {
        let fresh_a = Value::list(items.iter().copied().map(Value::Int).collect());
        let fresh_b = Value::list(items.iter().copied().map(Value::Int).collect());
        let a = idgraph::build(&fresh_a);
        let b = idgraph::build(&fresh_b);
        if structural_equal(&a, &b) {
            prop_assert!(value_equal(&a, &b));
        }
        // Two freshly allocated lists never share identity, so structural
        // equality never holds here; value equality always does.
        prop_assert!(!structural_equal(&a, &b));
        prop_assert!(value_equal(&a, &b));
    }

    // Two independently-built primitives carry no identity, so rebinding a
    // fresh int or bool or string with the same contents must compare equal
    // under value_equal even though nothing aliases.
    #[test]
    fn prop_primitive_value_equal_ignores_identity(n in any::<i64>()) {
        let a = idgraph::build(&Value::Int(n));
        let b = idgraph::build(&Value::Int(n));
        prop_assert!(value_equal(&a, &b));
    }
}

proptest! {
    // Append-only history must round-trip through JSON without losing any
    // cell execution or active snapshot.
    #[test]
    fn prop_ahg_serialize_round_trips(names in prop::collection::vec("[a-z]{1,6}", 1..6)) {
        let ns = InMemoryNamespace::new();
        let mut planner = Planner::new(&ns, PlannerConfig::default(), OptimizerConfig::default());

        for (i, name) in names.iter().enumerate() {
            planner.pre_run_cell_update(&ns);
            ns.bind(name.as_str(), Value::Int(i as i64));
            planner.post_run_cell_update(&ns, format!("{name} = {i}"), 0.0);
        }

        let encoded = planner.ahg().serialize().unwrap();
        let decoded = Ahg::deserialize(&encoded).unwrap();

        prop_assert_eq!(
            decoded.get_cell_executions().len(),
            planner.ahg().get_cell_executions().len()
        );
        prop_assert_eq!(
            decoded.get_active_variable_snapshots().len(),
            planner.ahg().get_active_variable_snapshots().len()
        );
        prop_assert_eq!(decoded.active_names(), planner.ahg().active_names());
    }

    // A cell that changes nothing must not fabricate created/deleted
    // variables, and created/deleted are always disjoint.
    #[test]
    fn prop_no_op_cell_reports_no_changes(names in prop::collection::vec("[a-z]{1,6}", 0..5)) {
        let ns = InMemoryNamespace::new();
        let mut planner = Planner::new(&ns, PlannerConfig::default(), OptimizerConfig::default());

        planner.pre_run_cell_update(&ns);
        for (i, name) in names.iter().enumerate() {
            ns.bind(name.as_str(), Value::Int(i as i64));
        }
        planner.post_run_cell_update(&ns, "setup", 0.0);

        planner.pre_run_cell_update(&ns);
        let changed = planner.post_run_cell_update(&ns, "pass", 0.0);

        prop_assert!(changed.created.is_empty());
        prop_assert!(changed.deleted.is_empty());
        prop_assert!(changed.created.is_disjoint(&changed.deleted));
        prop_assert!(changed.modified_value.is_subset(&changed.modified_structure));
    }

    // Every VS created later in a session carries a strictly greater version
    // than every VS created before it, regardless of how many cells ran.
    #[test]
    fn prop_versions_are_strictly_monotone(cell_count in 1usize..8) {
        let ns = InMemoryNamespace::new();
        let mut planner = Planner::new(&ns, PlannerConfig::default(), OptimizerConfig::default());

        let mut versions = Vec::new();
        for i in 0..cell_count {
            planner.pre_run_cell_update(&ns);
            ns.bind(format!("v{i}"), Value::Int(i as i64));
            planner.post_run_cell_update(&ns, format!("v{i} = {i}"), 0.0);
            let vs_id = *planner.ahg().get_active_variable_snapshots().last().unwrap();
            versions.push(planner.ahg().vs(vs_id).unwrap().version);
        }

        for window in versions.windows(2) {
            prop_assert!(window[0] < window[1]);
        }
    }

    // Running a no-op cell on an unchanged namespace is idempotent: no
    // variable is reported changed, and the new CE's dst_vss re-point at the
    // same unchanged groups rather than minting spurious new ones.
    #[test]
    fn prop_no_op_cell_is_idempotent(names in prop::collection::vec("[a-z]{1,6}", 1..4)) {
        let ns = InMemoryNamespace::new();
        let mut planner = Planner::new(&ns, PlannerConfig::default(), OptimizerConfig::default());

        planner.pre_run_cell_update(&ns);
        for (i, name) in names.iter().enumerate() {
            ns.bind(name.as_str(), Value::Int(i as i64));
        }
        planner.post_run_cell_update(&ns, "setup", 0.0);
        let before = planner.ahg().get_active_variable_snapshots();

        planner.pre_run_cell_update(&ns);
        let changed = planner.post_run_cell_update(&ns, "", 0.0);
        let after = planner.ahg().get_active_variable_snapshots();

        prop_assert_eq!(changed.created.len(), 0);
        prop_assert_eq!(changed.modified_value.len(), 0);
        prop_assert_eq!(changed.modified_structure.len(), 0);
        prop_assert_eq!(changed.deleted.len(), 0);
        prop_assert_eq!(before, after);
    }
}
