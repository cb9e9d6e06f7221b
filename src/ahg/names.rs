//! Interned variable names and the versioned co-variable-group key built from them.

use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::interner;

/// An interned string identifying a namespace binding. Two `VariableName`s
/// built from the same source string via [`VariableName::new`] share one
/// allocation, so cloning and hashing are cheap regardless of how long the
/// underlying string is.
#[derive(Clone, Serialize, Deserialize)]
pub struct VariableName(Rc<str>);

impl VariableName {
    pub fn new(s: impl AsRef<str>) -> Self {
        Self(interner::intern(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for VariableName {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for VariableName {}

impl PartialOrd for VariableName {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VariableName {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl std::hash::Hash for VariableName {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl fmt::Display for VariableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for VariableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VariableName({:?})", self.0)
    }
}

impl From<&str> for VariableName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for VariableName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// `(frozen set of variable names, version)`. The set is a co-variable
/// group: names that currently alias one another and must be restored
/// together. `version` is the monotonic nanosecond stamp assigned when the
/// snapshot carrying this key was created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionedName {
    pub names: BTreeSet<VariableName>,
    pub version: u64,
}

impl VersionedName {
    pub fn new(names: BTreeSet<VariableName>, version: u64) -> Self {
        Self { names, version }
    }
}
