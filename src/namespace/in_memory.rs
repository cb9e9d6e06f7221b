//! A plain in-process namespace standing in for a real kernel's
//! monkey-patched globals dict. Exists purely as test/harness scaffolding —
//! it is not part of the Planner's public contract.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet};

use super::Namespace;
use crate::ahg::VariableName;
use crate::value::Value;

#[derive(Default)]
pub struct InMemoryNamespace {
    bindings: RefCell<HashMap<VariableName, Value>>,
    accessed: RefCell<HashSet<VariableName>>,
}

impl InMemoryNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` to `value`, as a direct assignment in the kernel would.
    /// Does not mark the name accessed — a rebind is a write, not a read.
    pub fn bind(&self, name: impl Into<VariableName>, value: Value) {
        self.bindings.borrow_mut().insert(name.into(), value);
    }

    /// Removes `name` from the namespace, as `del name` would in the kernel.
    pub fn delete(&self, name: &VariableName) {
        self.bindings.borrow_mut().remove(name);
    }

    /// Simulates the external notebook instrumentation reporting that user
    /// code read `name` this cell. A real kernel wires this from a
    /// monkey-patched `__getitem__` on its globals dict; since that
    /// instrumentation is out of this crate's scope, tests call this
    /// directly instead. Does *not* go through [`Namespace::get`] — the
    /// Planner's own fingerprinting reads must not be mistaken for a
    /// user-code access.
    pub fn mark_accessed(&self, name: impl Into<VariableName>) {
        self.accessed.borrow_mut().insert(name.into());
    }
}

impl Namespace for InMemoryNamespace {
    fn keyset(&self) -> BTreeSet<VariableName> {
        self.bindings.borrow().keys().cloned().collect()
    }

    fn contains(&self, name: &VariableName) -> bool {
        self.bindings.borrow().contains_key(name)
    }

    /// Returns the current binding without affecting [`accessed_vars`] —
    /// that set only reflects instrumented user-code reads, reported via
    /// [`Self::mark_accessed`], not the Planner's own introspection.
    fn get(&self, name: &VariableName) -> Option<Value> {
        self.bindings.borrow().get(name).cloned()
    }

    fn accessed_vars(&self) -> HashSet<VariableName> {
        self.accessed.borrow().clone()
    }

    fn reset_accessed_vars(&self) {
        self.accessed.borrow_mut().clear();
    }
}
