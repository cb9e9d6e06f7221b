//! Time-travel checkpoint/restore planning for interactive computing
//! sessions.
//!
//! Given a stateful kernel that runs successive code blocks against a
//! named-variable namespace, this crate fingerprints each live variable's
//! object graph after every block ([`idgraph`]), maintains an Application
//! History Graph linking cell executions to the variable snapshots they
//! touched ([`ahg`]), and, on a commit, solves a minimum-cost
//! serialize-vs-replay partition over that graph ([`optimizer`]) so a
//! caller can reconstruct any previously observed state. [`Planner`] is the
//! orchestrator that ties these three pieces together around a kernel's
//! per-cell hooks.
//!
//! This crate does not execute user code, manage branches, or define the
//! on-disk format of serialized values — see [`namespace`] for the traits
//! an embedder implements to supply those.

pub mod ahg;
pub mod config;
pub mod error;
pub mod idgraph;
pub mod namespace;
pub mod optimizer;
pub mod plan;
pub mod planner;
pub mod size_profiler;
pub mod value;

pub use ahg::{Ahg, CeId, CellExecution, VariableName, VariableSnapshot, VersionedName, VsId};
pub use config::{OptimizerConfig, PlannerConfig};
pub use error::{PlannerError, PlannerResult};
pub use namespace::{InMemoryNamespace, Namespace, NullValueStore, ValueStore};
pub use plan::{CheckpointGroup, CheckpointPlan, RestoreAction, RestorePlan};
pub use planner::{ChangedVariables, Planner};
pub use value::Value;
