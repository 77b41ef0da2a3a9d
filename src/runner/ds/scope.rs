use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::runner::ds::value::Value;

/// A variable table shared by handle. Cloning a `Scope` yields another handle
/// to the same bindings, which is how globals flow into nested calls.
#[derive(Clone, Default)]
pub struct Scope {
    vars: Rc<RefCell<HashMap<String, Value>>>,
}

impl Scope {
    pub fn new() -> Self {
        Scope::default()
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.vars.borrow().get(name).cloned()
    }

    pub fn set<S: Into<String>>(&self, name: S, value: Value) {
        self.vars.borrow_mut().insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.borrow().contains_key(name)
    }

    pub fn remove(&self, name: &str) -> Option<Value> {
        self.vars.borrow_mut().remove(name)
    }

    /// Sorted variable names, for listings.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.vars.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.vars.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.borrow().is_empty()
    }

    /// Whether both handles point at the same table.
    pub fn same_as(&self, other: &Scope) -> bool {
        Rc::ptr_eq(&self.vars, &other.vars)
    }
}
