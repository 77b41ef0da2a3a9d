use crate::runner::ds::function_object::bound_method;
use crate::runner::ds::value::{Kind, MapKey, Value};

pub fn get_elem(map: &Value, key: &Value) -> Value {
    let key = match MapKey::new(key.clone()) {
        Some(k) => k,
        None => return Value::Undefined,
    };
    let found = match map.kind() {
        Some(Kind::Map(entries)) => entries.borrow().get(&key).cloned(),
        Some(Kind::FrozenMap(entries)) => entries.get(&key).cloned(),
        _ => None,
    };
    found.unwrap_or(Value::Undefined)
}

fn entries_of(map: &Value) -> Vec<(Value, Value)> {
    map.map_entries().unwrap_or_default()
}

/// Builtin methods of maps; frozen maps only get the non-mutating ones.
pub fn get_method(map: &Value, name: &str) -> Option<Value> {
    let frozen = matches!(map.kind(), Some(Kind::FrozenMap(_)));
    let method = match (name, frozen) {
        ("get", _) => bound_method(name, map, |m, args| match args {
            [k] => get_elem(m, k),
            [k, default] => match get_elem(m, k) {
                Value::Undefined => default.clone(),
                found => found,
            },
            _ => Value::Undefined,
        }),
        ("keys", _) => bound_method(name, map, |m, _args| {
            Value::list(entries_of(m).into_iter().map(|(k, _)| k).collect())
        }),
        ("values", _) => bound_method(name, map, |m, _args| {
            Value::list(entries_of(m).into_iter().map(|(_, v)| v).collect())
        }),
        ("items", _) => bound_method(name, map, |m, _args| {
            Value::list(
                entries_of(m)
                    .into_iter()
                    .map(|(k, v)| Value::frozen_list(vec![k, v]))
                    .collect(),
            )
        }),
        ("set", false) => bound_method(name, map, |m, args| {
            if let ([k, v], Some(Kind::Map(entries))) = (args, m.kind()) {
                if let Some(key) = MapKey::new(k.clone()) {
                    entries.borrow_mut().insert(key, v.clone());
                }
            }
            Value::Undefined
        }),
        ("remove", false) => bound_method(name, map, |m, args| {
            match (args, m.kind()) {
                ([k], Some(Kind::Map(entries))) => MapKey::new(k.clone())
                    .and_then(|key| entries.borrow_mut().shift_remove(&key))
                    .unwrap_or(Value::Undefined),
                _ => Value::Undefined,
            }
        }),
        ("copy", false) => bound_method(name, map, |m, _args| match m.kind() {
            Some(Kind::Map(entries)) => Value::map(entries.borrow().clone()),
            _ => Value::Undefined,
        }),
        _ => return None,
    };
    Some(method)
}
