//! Typed configuration surface read at `Planner` construction.
//!
//! The values here come from `[PLANNER]` / `[OPTIMIZER]` sections of a config
//! file in the full system; loading that file is an external collaborator's
//! job (out of scope for this crate — see the crate-level docs). This module
//! only defines the destination struct and its documented defaults.

/// Planner-related config options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerConfig {
    /// When `true`, `generate_checkpoint_restore_plans` subtracts variable
    /// snapshots already persisted under an ancestor commit before invoking
    /// the optimizer.
    pub incremental_store: bool,

    /// Reserved for incremental loading of restore plans. Not read anywhere
    /// in this crate yet — the field exists so the config surface is stable
    /// for embedders, per the open question in the design notes.
    pub incremental_load: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            incremental_store: false,
            incremental_load: false,
        }
    }
}

/// Migration-speed knob consumed by the optimizer's cost model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizerConfig {
    /// Bytes/second used to convert a variable snapshot's estimated size into
    /// a replay-equivalent cost. Set large and finite: the policy is "recompute
    /// only when forced" (unserializable values), never because replay happens
    /// to be cheaper in wall-clock time.
    pub migration_speed_bps: f64,
}

/// 1 GiB/s: comfortably above any plausible disk or network write speed this
/// planner would be compared against, while staying finite so the cost model
/// never divides by zero.
pub const DEFAULT_MIGRATION_SPEED_BPS: f64 = 1024.0 * 1024.0 * 1024.0;

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            migration_speed_bps: DEFAULT_MIGRATION_SPEED_BPS,
        }
    }
}
