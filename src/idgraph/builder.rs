//! Walks a [`Value`] into a fingerprint DAG, handling cycles via a per-call
//! visited map as described in the design notes.

use std::collections::HashMap;
use std::rc::Rc;

use crate::value::{Identity, Value};

use super::node::{IdGraphNode, NodeContent, PrimitiveLiteral};

/// Records, for each identity already seen in *this* `build` call, its
/// assigned `type_tag` and visit order. Threaded through recursion; never
/// shared across calls, so the builder is re-entrant.
struct VisitState {
    seen: HashMap<Identity, (&'static str, usize)>,
    next_order: usize,
}

impl VisitState {
    fn new() -> Self {
        Self {
            seen: HashMap::new(),
            next_order: 0,
        }
    }

    /// Reserves the next visit order for `identity`/`type_tag` and returns
    /// it, or returns the existing order if this identity was already seen
    /// (the caller should then build a back-edge instead of recursing).
    fn enter(&mut self, identity: Identity, type_tag: &'static str) -> Result<usize, usize> {
        if let Some((_, order)) = self.seen.get(&identity) {
            return Err(*order);
        }
        let order = self.next_order;
        self.next_order += 1;
        self.seen.insert(identity, (type_tag, order));
        Ok(order)
    }
}

/// Produces a fingerprint DAG for any live value drawn from the kernel
/// namespace. See the crate-level docs on [`Value`] for the nine dispatch
/// categories this implements.
pub fn build(value: &Value) -> Rc<IdGraphNode> {
    let mut state = VisitState::new();
    build_inner(value, &mut state)
}

fn build_inner(value: &Value, state: &mut VisitState) -> Rc<IdGraphNode> {
    let type_tag = value.type_tag();

    if let Some(identity) = value.identity() {
        match state.enter(identity, type_tag) {
            Err(order) => return IdGraphNode::back_edge(type_tag, identity, order),
            Ok(order) => return build_identified(value, identity, order, type_tag, state),
        }
    }

    // Category 1: primitive.
    let literal = match value {
        Value::Null => PrimitiveLiteral::Null,
        Value::Bool(b) => PrimitiveLiteral::Bool(*b),
        Value::Int(i) => PrimitiveLiteral::Int(*i),
        Value::Float(f) => PrimitiveLiteral::Float(f.to_bits()),
        Value::Str(s) => PrimitiveLiteral::Str(s.to_string()),
        Value::Sentinel(crate::value::Sentinel::NotImplemented) => {
            PrimitiveLiteral::NotImplemented
        }
        Value::Sentinel(crate::value::Sentinel::Ellipsis) => PrimitiveLiteral::Ellipsis,
        _ => unreachable!("non-primitive values always carry an identity token"),
    };
    IdGraphNode::leaf(type_tag, None, None, NodeContent::Primitive(literal))
}

fn build_identified(
    value: &Value,
    identity: Identity,
    order: usize,
    type_tag: &'static str,
    state: &mut VisitState,
) -> Rc<IdGraphNode> {
    match value {
        // Category 2: ordered collection.
        Value::Tuple(items) => {
            let children = items.iter().map(|v| build_inner(v, state)).collect();
            IdGraphNode::new(
                type_tag,
                Some(identity),
                Some(order),
                NodeContent::Sequence,
                children,
            )
        }
        Value::List(items) => {
            let children = items
                .borrow()
                .iter()
                .map(|v| build_inner(v, state))
                .collect();
            IdGraphNode::new(
                type_tag,
                Some(identity),
                Some(order),
                NodeContent::Sequence,
                children,
            )
        }

        // Category 3: unordered collection of hashable elements. Canonical
        // order is by value-digest so that two sets with the same elements
        // sort identically regardless of each element's identity.
        Value::Set(items) => {
            let mut children: Vec<_> = items
                .borrow()
                .iter()
                .map(|v| build_inner(v, state))
                .collect();
            children.sort_by(|a, b| a.digest_val.cmp(&b.digest_val));
            IdGraphNode::new(
                type_tag,
                Some(identity),
                Some(order),
                NodeContent::UnorderedSet,
                children,
            )
        }

        // Category 4: keyed mapping, pairs sorted by key digest.
        Value::Map(pairs) => build_mapping(
            &pairs.borrow(),
            type_tag,
            Some(identity),
            Some(order),
            state,
        ),

        // Category 5: byte buffer.
        Value::Bytes(bytes) => {
            let digest = super::digest_bytes(bytes);
            IdGraphNode::leaf(
                type_tag,
                Some(identity),
                Some(order),
                NodeContent::ByteDigest(digest),
            )
        }

        // Category 6: type / class object.
        Value::TypeObject(t) => IdGraphNode::leaf(
            type_tag,
            Some(identity),
            Some(order),
            NodeContent::TypeName(t.qualified_name.clone()),
        ),

        // Category 7: callable.
        Value::Callable(info) => IdGraphNode::leaf(
            type_tag,
            Some(identity),
            Some(order),
            NodeContent::CallableRef {
                qualified_name: info.qualified_name.clone(),
                code_digest: info.code_digest,
            },
        ),

        // Category 8: custom object exposing a reducer -> (constructor, args, state).
        Value::Custom(obj) => {
            let obj = obj.borrow();
            let mut children: Vec<_> =
                obj.args.iter().map(|v| build_inner(v, state)).collect();
            children.push(build_mapping(
                &owned_pairs(&obj.state),
                "state",
                None,
                None,
                state,
            ));
            IdGraphNode::new(
                type_tag,
                Some(identity),
                Some(order),
                NodeContent::CustomReduced {
                    constructor: obj.constructor.clone(),
                },
                children,
            )
        }

        // Category 9: opaque object.
        Value::Opaque(obj) => IdGraphNode::leaf(
            type_tag,
            Some(identity),
            Some(order),
            NodeContent::OpaqueRef {
                type_name: obj.type_name.clone(),
            },
        ),

        Value::Null
        | Value::Bool(_)
        | Value::Int(_)
        | Value::Float(_)
        | Value::Str(_)
        | Value::Sentinel(_) => unreachable!("primitives never carry an identity token"),
    }
}

fn owned_pairs(state: &[(String, Value)]) -> Vec<(Value, Value)> {
    state
        .iter()
        .map(|(k, v)| (Value::str(k.as_str()), v.clone()))
        .collect()
}

/// Builds a `Mapping` node (category 4) from arbitrary `(key, value)` pairs,
/// sorted by the key's value-digest. Shared by `Value::Map` and the `state`
/// half of a custom object's reducer output.
fn build_mapping(
    pairs: &[(Value, Value)],
    type_tag: &'static str,
    identity: Option<Identity>,
    order: Option<usize>,
    state: &mut VisitState,
) -> Rc<IdGraphNode> {
    let mut built: Vec<(Rc<IdGraphNode>, Rc<IdGraphNode>)> = pairs
        .iter()
        .map(|(k, v)| (build_inner(k, state), build_inner(v, state)))
        .collect();
    built.sort_by(|(k1, _), (k2, _)| k1.digest_val.cmp(&k2.digest_val));
    let children = built.into_iter().flat_map(|(k, v)| [k, v]).collect();
    IdGraphNode::new(type_tag, identity, order, NodeContent::Mapping, children)
}
