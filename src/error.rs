//! Error types for the checkpoint/restore planner.
//!
//! Mirrors the disposition table in the design doc: nothing here is ever
//! swallowed silently, and every fallible boundary produces one of these
//! variants rather than a bare `anyhow::Error` so callers can match on kind.

use thiserror::Error;

use crate::ahg::VariableName;

/// Errors surfaced by the planner, the AHG, and the optimizer.
#[derive(Debug, Error)]
pub enum PlannerError {
    /// The planner was asked to fingerprint or profile a name that is not
    /// bound in the namespace.
    #[error("unknown variable '{0}'")]
    UnknownVariable(VariableName),

    /// The IdGraph builder refused a value outright. The `Opaque` dispatch
    /// arm is total, so in practice this should never fire; it exists so a
    /// future, non-total builder has somewhere to report failure instead of
    /// panicking.
    #[error("failed to fingerprint '{name}': {reason}")]
    FingerprintFailure {
        name: VariableName,
        reason: String,
    },

    /// No restorable partition exists: some active snapshot is unserializable
    /// and unreachable from any recorded cell execution.
    #[error("optimizer found no restorable partition for snapshot {0:?}")]
    OptimizerInfeasible(crate::ahg::VsId),

    /// The value store failed to answer `get_stored_versioned_names`.
    #[error("value store unavailable: {0}")]
    StoreUnavailable(String),

    /// `replace_state` was given a string that does not decode to a valid AHG.
    #[error("AHG deserialization failed: {0}")]
    AhgDeserialization(#[from] serde_json::Error),

    /// Escape hatch for external-collaborator failures (store I/O, etc.)
    /// that don't warrant their own variant.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type PlannerResult<T> = Result<T, PlannerError>;
