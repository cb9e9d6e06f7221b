//! Deep heterogeneous object traversal with cycle handling: builds a
//! canonical fingerprint DAG ([`IdGraphNode`]) for any live [`crate::value::Value`],
//! and the three relations ([`compare::structural_equal`], [`compare::value_equal`],
//! [`compare::overlap`]) used to diff fingerprints across cell executions.

mod builder;
mod compare;
mod node;

pub use builder::build;
pub use compare::{is_root_identity_and_type_equal, overlap, structural_equal, value_equal};
pub use node::{IdGraphNode, NodeContent, NodeDigest, PrimitiveLiteral};

use sha2::{Digest, Sha256};

/// Canonical digest for a raw byte buffer (dispatch category 5).
pub fn digest_bytes(bytes: &[u8]) -> NodeDigest {
    Sha256::digest(bytes).into()
}
