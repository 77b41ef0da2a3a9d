use crate::runner::ds::function_object::bound_method;
use crate::runner::ds::operations::test_and_comparison::{sort_ordering, strict_equals};
use crate::runner::ds::value::{Kind, Value};

/// Resolves a negative index from the end; `None` when out of range.
pub fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let idx = if index < 0 { index + len } else { index };
    if idx >= 0 && idx < len {
        Some(idx as usize)
    } else {
        None
    }
}

pub fn get_elem(list: &Value, key: &Value) -> Value {
    match (list.list_items(), key.as_int()) {
        (Some(items), Some(i)) => match normalize_index(i, items.len()) {
            Some(idx) => items[idx].clone(),
            None => Value::Undefined,
        },
        _ => Value::Undefined,
    }
}

fn with_items<R>(list: &Value, f: impl FnOnce(&mut Vec<Value>) -> R) -> Option<R> {
    match list.kind() {
        Some(Kind::List(items)) => Some(f(&mut items.borrow_mut())),
        _ => None,
    }
}

fn position(items: &[Value], needle: &Value) -> Option<usize> {
    items.iter().position(|v| strict_equals(v, needle))
}

/// Builtin methods of lists; frozen lists only get the non-mutating ones.
pub fn get_method(list: &Value, name: &str) -> Option<Value> {
    let frozen = matches!(list.kind(), Some(Kind::FrozenList(_)));
    let method = match (name, frozen) {
        ("index", _) => bound_method(name, list, |l, args| match args {
            [x] => position(&l.list_items().unwrap_or_default(), x)
                .map(|i| Value::int(i as i64))
                .unwrap_or(Value::Undefined),
            _ => Value::Undefined,
        }),
        ("count", _) => bound_method(name, list, |l, args| match args {
            [x] => Value::int(
                l.list_items()
                    .unwrap_or_default()
                    .iter()
                    .filter(|v| strict_equals(v, x))
                    .count() as i64,
            ),
            _ => Value::Undefined,
        }),
        ("append", false) => bound_method(name, list, |l, args| {
            if let [x] = args {
                with_items(l, |items| items.push(x.clone()));
            }
            Value::Undefined
        }),
        ("insert", false) => bound_method(name, list, |l, args| {
            if let [i, x] = args {
                if let Some(i) = i.as_int() {
                    with_items(l, |items| {
                        let len = items.len() as i64;
                        let at = if i < 0 { (i + len).max(0) } else { i.min(len) };
                        items.insert(at as usize, x.clone());
                    });
                }
            }
            Value::Undefined
        }),
        ("remove", false) => bound_method(name, list, |l, args| {
            // comparing may read `l` again, so search a snapshot
            let found = match args {
                [x] => position(&l.list_items().unwrap_or_default(), x),
                _ => None,
            };
            if let Some(idx) = found {
                with_items(l, |items| {
                    if idx < items.len() {
                        items.remove(idx);
                    }
                });
            }
            Value::Undefined
        }),
        ("pop", false) => bound_method(name, list, |l, args| {
            with_items(l, |items| {
                let idx = match args {
                    [] if !items.is_empty() => Some(items.len() - 1),
                    [i] => i.as_int().and_then(|i| normalize_index(i, items.len())),
                    _ => None,
                };
                match idx {
                    Some(idx) => items.remove(idx),
                    None => Value::Undefined,
                }
            })
            .unwrap_or(Value::Undefined)
        }),
        ("sort", false) => bound_method(name, list, |l, _args| {
            with_items(l, |items| items.sort_by(sort_ordering));
            Value::Undefined
        }),
        ("reverse", false) => bound_method(name, list, |l, _args| {
            with_items(l, |items| items.reverse());
            Value::Undefined
        }),
        ("copy", false) => bound_method(name, list, |l, _args| {
            Value::list(l.list_items().unwrap_or_default())
        }),
        _ => return None,
    };
    Some(method)
}
