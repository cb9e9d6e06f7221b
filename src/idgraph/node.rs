//! The fingerprint DAG produced by the IdGraph builder.

use sha2::{Digest, Sha256};
use std::rc::Rc;

use crate::value::Identity;

pub type NodeDigest = [u8; 32];

#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveLiteral {
    Null,
    Bool(bool),
    Int(i64),
    Float(u64), // bit pattern, so NaN/±0 compare the way the live value does
    Str(String),
    NotImplemented,
    Ellipsis,
}

/// What a node's content actually is, independent of its identity/visit
/// bookkeeping. Exactly one dispatch category from the design doc maps to
/// each non-`BackEdge` variant; `BackEdge` is the cycle-breaking marker.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeContent {
    Primitive(PrimitiveLiteral),
    /// Ordered collection (list/tuple): children are edges in order.
    Sequence,
    /// Unordered collection of hashable elements: children sorted by
    /// value-digest at construction time.
    UnorderedSet,
    /// Keyed mapping: children are `(key, value)` pairs flattened in
    /// key-digest order.
    Mapping,
    ByteDigest(NodeDigest),
    TypeName(String),
    CallableRef {
        qualified_name: String,
        code_digest: Option<NodeDigest>,
    },
    /// Custom object reduced to `(constructor, args, state)`. `children` on
    /// the node holds the arg nodes followed by one `Mapping` node for state.
    CustomReduced { constructor: String },
    OpaqueRef { type_name: String },
    /// A previously-visited identity, re-encountered. Carries no children;
    /// equality is decided by the node's `identity`/`visit_order` fields,
    /// which are copied from the first visit.
    BackEdge,
}

/// One node of a fingerprint DAG.
///
/// `digest_id` and `digest_val` are computed once, bottom-up, at
/// construction time: the same traversal produces both, and which one a
/// comparison uses is what the design doc calls the "identity inclusion
/// flag" — it's a property of the *comparator*, not of construction, since
/// both digests are always available here at no extra traversal cost.
#[derive(Debug, Clone, PartialEq)]
pub struct IdGraphNode {
    pub type_tag: &'static str,
    pub identity: Option<Identity>,
    pub visit_order: Option<usize>,
    pub content: NodeContent,
    pub children: Vec<Rc<IdGraphNode>>,
    pub digest_id: NodeDigest,
    pub digest_val: NodeDigest,
}

fn hash_chunk(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

fn content_bytes(content: &NodeContent) -> Vec<u8> {
    match content {
        NodeContent::Primitive(PrimitiveLiteral::Null) => vec![0],
        NodeContent::Primitive(PrimitiveLiteral::Bool(b)) => vec![1, *b as u8],
        NodeContent::Primitive(PrimitiveLiteral::Int(i)) => {
            let mut v = vec![2];
            v.extend_from_slice(&i.to_le_bytes());
            v
        }
        NodeContent::Primitive(PrimitiveLiteral::Float(bits)) => {
            let mut v = vec![3];
            v.extend_from_slice(&bits.to_le_bytes());
            v
        }
        NodeContent::Primitive(PrimitiveLiteral::Str(s)) => {
            let mut v = vec![4];
            v.extend_from_slice(s.as_bytes());
            v
        }
        NodeContent::Primitive(PrimitiveLiteral::NotImplemented) => vec![5],
        NodeContent::Primitive(PrimitiveLiteral::Ellipsis) => vec![6],
        NodeContent::Sequence => vec![10],
        NodeContent::UnorderedSet => vec![11],
        NodeContent::Mapping => vec![12],
        NodeContent::ByteDigest(d) => {
            let mut v = vec![13];
            v.extend_from_slice(d);
            v
        }
        NodeContent::TypeName(n) => {
            let mut v = vec![14];
            v.extend_from_slice(n.as_bytes());
            v
        }
        NodeContent::CallableRef {
            qualified_name,
            code_digest,
        } => {
            let mut v = vec![15];
            v.extend_from_slice(qualified_name.as_bytes());
            if let Some(d) = code_digest {
                v.push(1);
                v.extend_from_slice(d);
            } else {
                v.push(0);
            }
            v
        }
        NodeContent::CustomReduced { constructor } => {
            let mut v = vec![16];
            v.extend_from_slice(constructor.as_bytes());
            v
        }
        NodeContent::OpaqueRef { type_name } => {
            let mut v = vec![17];
            v.extend_from_slice(type_name.as_bytes());
            v
        }
        NodeContent::BackEdge => vec![18],
    }
}

impl IdGraphNode {
    pub fn leaf(
        type_tag: &'static str,
        identity: Option<Identity>,
        visit_order: Option<usize>,
        content: NodeContent,
    ) -> Rc<IdGraphNode> {
        Self::new(type_tag, identity, visit_order, content, Vec::new())
    }

    pub fn new(
        type_tag: &'static str,
        identity: Option<Identity>,
        visit_order: Option<usize>,
        content: NodeContent,
        children: Vec<Rc<IdGraphNode>>,
    ) -> Rc<IdGraphNode> {
        let digest_id =
            Self::compute_digest(type_tag, identity, visit_order, &content, &children, true);
        let digest_val =
            Self::compute_digest(type_tag, identity, visit_order, &content, &children, false);
        Rc::new(IdGraphNode {
            type_tag,
            identity,
            visit_order,
            content,
            children,
            digest_id,
            digest_val,
        })
    }

    /// The back-edge marker for an already-visited identity: copies the
    /// first visit's `type_tag`/`identity`/`visit_order` so it compares equal
    /// under both [`crate::idgraph::compare::structural_equal`] and
    /// [`crate::idgraph::compare::value_equal`] with the node it refers back to.
    pub fn back_edge(
        type_tag: &'static str,
        identity: Identity,
        visit_order: usize,
    ) -> Rc<IdGraphNode> {
        Self::leaf(
            type_tag,
            Some(identity),
            Some(visit_order),
            NodeContent::BackEdge,
        )
    }

    fn compute_digest(
        type_tag: &'static str,
        identity: Option<Identity>,
        visit_order: Option<usize>,
        content: &NodeContent,
        children: &[Rc<IdGraphNode>],
        include_identity: bool,
    ) -> NodeDigest {
        let mut hasher = Sha256::new();
        hash_chunk(&mut hasher, type_tag.as_bytes());
        // `visit_order` is the position-normalized stand-in for identity: it
        // lets two independently-built graphs agree that "this is the
        // second distinct object visited" without comparing raw addresses.
        // It is assigned by DFS encounter order, *before* Set/Map children
        // are canonically sorted by child digest, so it must never reach
        // `digest_val` — doing so would leak raw insertion order into the
        // value-only digest and break value_equal for two differently
        // ordered but equal sets/maps of non-primitive elements. Only fold
        // it (with identity) into the identity-inclusive digest.
        if include_identity {
            match visit_order {
                Some(order) => {
                    hasher.update([1u8]);
                    hash_chunk(&mut hasher, &order.to_le_bytes());
                }
                None => hasher.update([0u8]),
            }
            match identity {
                Some(id) => {
                    hasher.update([1u8]);
                    hash_chunk(&mut hasher, &id.to_le_bytes());
                }
                None => hasher.update([0u8]),
            }
        }
        hash_chunk(&mut hasher, &content_bytes(content));
        hasher.update((children.len() as u64).to_le_bytes());
        for child in children {
            let child_digest = if include_identity {
                child.digest_id
            } else {
                child.digest_val
            };
            hasher.update(child_digest);
        }
        hasher.finalize().into()
    }
}
