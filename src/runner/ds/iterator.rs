use std::cell::RefCell;

use crate::runner::ds::value::{Kind, Value};

/// Items captured when the iterator was created; later mutation of the
/// source collection does not affect it.
pub struct IteratorState {
    items: Vec<Value>,
    position: usize,
}

impl IteratorState {
    pub fn new(items: Vec<Value>) -> Self {
        IteratorState { items, position: 0 }
    }

    /// Next item, or `undefined` for every call after the last one.
    pub fn next_value(&mut self) -> Value {
        match self.items.get(self.position) {
            Some(v) => {
                self.position += 1;
                v.clone()
            }
            None => Value::Undefined,
        }
    }

    fn drain_rest(&mut self) -> Vec<Value> {
        let rest = self.items[self.position.min(self.items.len())..].to_vec();
        self.position = self.items.len();
        rest
    }
}

/// Items of an iterable: list elements, map keys, string characters, or what
/// is left in an iterator (which is consumed). `None` for non-iterables.
pub fn collect_items(value: &Value) -> Option<Vec<Value>> {
    match value.kind()? {
        Kind::List(items) => Some(items.borrow().clone()),
        Kind::FrozenList(items) => Some(items.clone()),
        Kind::Map(entries) => Some(entries.borrow().keys().map(|k| k.value().clone()).collect()),
        Kind::FrozenMap(entries) => Some(entries.keys().map(|k| k.value().clone()).collect()),
        Kind::Str(s) => Some(s.chars().map(|c| Value::string(c.to_string())).collect()),
        Kind::Iterator(state) => Some(state.borrow_mut().drain_rest()),
        _ => None,
    }
}

/// `iter(value)`. An iterator is its own iterator.
pub fn make_iterator(value: &Value) -> Value {
    if let Some(Kind::Iterator(_)) = value.kind() {
        return value.clone();
    }
    match collect_items(value) {
        Some(items) => Value::from_kind(Kind::Iterator(RefCell::new(IteratorState::new(items)))),
        None => Value::Undefined,
    }
}

/// `next(value)`. Anything that is not an iterator is already exhausted.
pub fn iterator_next(value: &Value) -> Value {
    match value.kind() {
        Some(Kind::Iterator(state)) => state.borrow_mut().next_value(),
        _ => Value::Undefined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhaustion_is_idempotent() {
        let it = make_iterator(&Value::list(vec![Value::int(1)]));
        assert_eq!(iterator_next(&it), Value::int(1));
        for _ in 0..3 {
            assert!(iterator_next(&it).is_undefined());
        }
    }

    #[test]
    fn test_snapshot_ignores_later_mutation() {
        let list = Value::list(vec![Value::int(1)]);
        let it = make_iterator(&list);
        if let Some(Kind::List(items)) = list.kind() {
            items.borrow_mut().push(Value::int(2));
        }
        assert_eq!(iterator_next(&it), Value::int(1));
        assert!(iterator_next(&it).is_undefined());
    }

    #[test]
    fn test_non_iterables() {
        assert!(make_iterator(&Value::int(3)).is_undefined());
        assert!(iterator_next(&Value::Undefined).is_undefined());
    }
}
