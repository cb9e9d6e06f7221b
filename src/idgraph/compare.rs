//! The three relations over fingerprints: `structural_equal`, `value_equal`,
//! and `overlap`.

use std::collections::HashSet;
use std::rc::Rc;

use super::node::{IdGraphNode, NodeContent};
use crate::value::Identity;

/// Identical shape, type tags, identities, and leaf contents. Detects
/// reference swaps and in-place mutation: two fingerprints of the same
/// container after an in-place append are `structural_equal == false`
/// (content differs) but still share a root identity.
pub fn structural_equal(a: &Rc<IdGraphNode>, b: &Rc<IdGraphNode>) -> bool {
    let mut seen = HashSet::new();
    walk_equal(a, b, true, &mut seen)
}

/// Identical shape, type tags, and leaf contents, ignoring identity tokens.
/// Used for user-visible "did this change?" reporting: `b = [1, 2, 3]`
/// rebinding to a fresh list with the same elements is `value_equal` to the
/// old list even though `structural_equal` is false.
pub fn value_equal(a: &Rc<IdGraphNode>, b: &Rc<IdGraphNode>) -> bool {
    let mut seen = HashSet::new();
    walk_equal(a, b, false, &mut seen)
}

fn walk_equal(
    a: &Rc<IdGraphNode>,
    b: &Rc<IdGraphNode>,
    include_identity: bool,
    seen: &mut HashSet<(usize, usize)>,
) -> bool {
    let digest_a = if include_identity { a.digest_id } else { a.digest_val };
    let digest_b = if include_identity { b.digest_id } else { b.digest_val };
    if digest_a != digest_b {
        return false;
    }

    let key = (Rc::as_ptr(a) as usize, Rc::as_ptr(b) as usize);
    if !seen.insert(key) {
        // Already compared equal earlier on this walk (shared subtrees in a
        // DAG); avoid redundant recursion.
        return true;
    }

    if a.type_tag != b.type_tag {
        return false;
    }
    // visit_order, like identity, is only part of the identity-inclusive
    // definition — it's DFS encounter order, which value_equal must ignore
    // for the same reason it ignores raw identity tokens.
    if include_identity {
        if a.identity != b.identity {
            return false;
        }
        if a.visit_order != b.visit_order {
            return false;
        }
    }
    if !content_equal(&a.content, &b.content) {
        return false;
    }
    if a.children.len() != b.children.len() {
        return false;
    }
    a.children
        .iter()
        .zip(b.children.iter())
        .all(|(ca, cb)| walk_equal(ca, cb, include_identity, seen))
}

fn content_equal(a: &NodeContent, b: &NodeContent) -> bool {
    a == b
}

/// True iff `a` and `b` share at least one non-primitive identity token —
/// i.e. two variables whose fingerprints were built from aliased memory.
/// Not transitive: `a` may overlap `b` and `b` overlap `c` without `a`
/// overlapping `c` directly (the AHG still groups all three via transitive
/// closure over `overlap`, see the union-find step in `ahg::update_graph`).
pub fn overlap(a: &Rc<IdGraphNode>, b: &Rc<IdGraphNode>) -> bool {
    let ids_a = collect_identities(a);
    let ids_b = collect_identities(b);
    ids_a.intersection(&ids_b).next().is_some()
}

fn collect_identities(node: &Rc<IdGraphNode>) -> HashSet<Identity> {
    let mut out = HashSet::new();
    let mut stack = vec![Rc::clone(node)];
    let mut visited_ptrs = HashSet::new();
    while let Some(n) = stack.pop() {
        let ptr = Rc::as_ptr(&n) as usize;
        if !visited_ptrs.insert(ptr) {
            continue;
        }
        if matches!(n.content, NodeContent::BackEdge) {
            if let Some(id) = n.identity {
                out.insert(id);
            }
            continue;
        }
        if let Some(id) = n.identity {
            out.insert(id);
        }
        stack.extend(n.children.iter().cloned());
    }
    out
}

/// True iff the two fingerprints' root nodes carry the same identity token
/// and the same type tag, regardless of what lies beneath. Used to tell a
/// rebind (new object) apart from an in-place mutation (same object, new
/// contents): `post_run_cell_update` treats the latter as an implicit access.
pub fn is_root_identity_and_type_equal(a: &Rc<IdGraphNode>, b: &Rc<IdGraphNode>) -> bool {
    a.type_tag == b.type_tag && a.identity.is_some() && a.identity == b.identity
}
