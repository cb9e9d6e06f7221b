//! Dense integer-handle arenas backing the AHG's cell-execution and
//! variable-snapshot history.
//!
//! History is append-only: nothing is ever removed, so unlike a general
//! slab allocator this needs no free list or generation counter — a handle
//! is just the index it was assigned at push time, and it stays valid for
//! the lifetime of the [`Ahg`](super::Ahg) that issued it.

use serde::{Deserialize, Serialize};

/// Handle to a [`super::ce::CellExecution`] in its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CeId(pub usize);

/// Handle to a [`super::vs::VariableSnapshot`] in its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VsId(pub usize);

/// An append-only, densely indexed store of `T`. Handles are assigned in
/// push order and are never invalidated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Arena<T> {
    entries: Vec<T>,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Appends `value` and returns the index it was stored at.
    pub fn push(&mut self, value: T) -> usize {
        let index = self.entries.len();
        self.entries.push(value);
        index
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.entries.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.entries
    }
}
