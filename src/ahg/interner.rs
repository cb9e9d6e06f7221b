//! Process-local string interner backing [`super::VariableName`].
//!
//! Equal names need to compare cheaply and hash cheaply — co-variable group
//! sets get rebuilt every cell — so binding names are interned once and
//! compared by `Rc` pointer identity first, falling back to content only to
//! break ties against a stale pointer from a different interner instance
//! (tests construct more than one).

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Default)]
pub struct Interner {
    table: RefCell<HashMap<Rc<str>, Rc<str>>>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&self, s: &str) -> Rc<str> {
        if let Some(existing) = self.table.borrow().get(s) {
            return Rc::clone(existing);
        }
        let rc: Rc<str> = Rc::from(s);
        self.table.borrow_mut().insert(Rc::clone(&rc), Rc::clone(&rc));
        rc
    }
}

thread_local! {
    static GLOBAL: Interner = Interner::new();
}

/// Interns `s` against the process-local table. All [`super::VariableName`]
/// construction goes through this so two bindings of the same source name
/// always share one allocation.
pub fn intern(s: &str) -> Rc<str> {
    GLOBAL.with(|i| i.intern(s))
}
