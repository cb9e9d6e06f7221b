//! Cell executions: one entry per executed code block.

use serde::{Deserialize, Serialize};

use super::arena::VsId;

/// A record of one executed code block, its runtime, and the variable
/// snapshots it read and produced. Immutable once recorded — `update_graph`
/// builds a `CellExecution` in full before it is ever appended to history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellExecution {
    pub cell_num: usize,
    pub code: String,
    pub runtime_seconds: f64,
    pub src_vss: Vec<VsId>,
    pub dst_vss: Vec<VsId>,
}

impl CellExecution {
    pub fn new(cell_num: usize, code: String, runtime_seconds: f64) -> Self {
        Self {
            cell_num,
            code,
            runtime_seconds,
            src_vss: Vec::new(),
            dst_vss: Vec::new(),
        }
    }
}
