use std::cmp::Ordering;

use crate::runner::ds::value::{float_as_exact_int, Kind, MapKey, Value};

/// Containers nested deeper than this compare unequal.
pub const MAX_COMPARE_DEPTH: usize = 128;

/// Value equality without operator dispatch. Numbers compare across int and
/// float, containers element-wise, host objects by identity.
pub fn strict_equals(a: &Value, b: &Value) -> bool {
    equals_at(a, b, 0)
}

fn equals_at(a: &Value, b: &Value, depth: usize) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Object(x), Value::Object(y)) => {
            if std::rc::Rc::ptr_eq(x, y) {
                return true;
            }
            match (&x.kind, &y.kind) {
                (Kind::Int(m), Kind::Int(n)) => m == n,
                (Kind::Int(_), Kind::Float(_))
                | (Kind::Float(_), Kind::Int(_))
                | (Kind::Float(_), Kind::Float(_)) => numbers_equal(&x.kind, &y.kind),
                (Kind::Str(s), Kind::Str(t)) => s == t,
                (Kind::Date(d), Kind::Date(e)) => d == e,
                _ if depth >= MAX_COMPARE_DEPTH => false,
                (Kind::List(_), _) | (Kind::FrozenList(_), _) => {
                    match (a.list_items(), b.list_items()) {
                        (Some(l), Some(r)) => {
                            l.len() == r.len()
                                && l.iter()
                                    .zip(r.iter())
                                    .all(|(p, q)| equals_at(p, q, depth + 1))
                        }
                        _ => false,
                    }
                }
                (Kind::Map(_), _) | (Kind::FrozenMap(_), _) => maps_equal(a, b, depth),
                (Kind::SearchName(m), Kind::SearchName(n)) => m.field == n.field,
                (Kind::Class(c), Kind::Class(d)) => c == d,
                _ => false,
            }
        }
        _ => false,
    }
}

/// Exact int/float equality: a float equals an int only when it converts
/// back to that same integer.
fn numbers_equal(a: &Kind, b: &Kind) -> bool {
    match (a, b) {
        (Kind::Int(n), Kind::Float(f)) | (Kind::Float(f), Kind::Int(n)) => {
            float_as_exact_int(*f) == Some(*n)
        }
        (Kind::Float(f), Kind::Float(g)) => f == g,
        (Kind::Int(m), Kind::Int(n)) => m == n,
        _ => false,
    }
}

fn maps_equal(a: &Value, b: &Value, depth: usize) -> bool {
    let (left, right) = match (a.map_entries(), b.map_entries()) {
        (Some(l), Some(r)) => (l, r),
        _ => return false,
    };
    if left.len() != right.len() {
        return false;
    }
    let lookup: indexmap::IndexMap<MapKey, Value> = right
        .into_iter()
        .filter_map(|(k, v)| MapKey::new(k).map(|k| (k, v)))
        .collect();
    left.iter().all(|(k, v)| match MapKey::new(k.clone()) {
        Some(key) => lookup.get(&key).map_or(false, |w| equals_at(v, w, depth + 1)),
        None => false,
    })
}

/// Whether `b` builds queries or promotes numbers when it sits on the right of
/// a comparison, so the left side must leave the result to its reflection.
fn defers_to_right(a: &Value, b: &Value) -> bool {
    match (a.kind(), b.kind()) {
        (_, Some(Kind::SearchName(_))) | (_, Some(Kind::SearchQuery(_))) => true,
        (Some(Kind::Int(_)), Some(Kind::Float(_))) => true,
        _ => false,
    }
}

pub fn eq(a: &Value, b: &Value) -> Value {
    if defers_to_right(a, b) {
        Value::Undefined
    } else {
        Value::boolean(strict_equals(a, b))
    }
}

/// Ordering for `<` and `>`; `None` where the kinds have no order. Ints only
/// order against ints here; int against float is the float's reflection.
pub fn ordering(a: &Value, b: &Value) -> Option<Ordering> {
    match (a.kind()?, b.kind()?) {
        (Kind::Int(x), Kind::Int(y)) => Some(x.cmp(y)),
        (Kind::Float(x), Kind::Int(y)) => int_float_ordering(*y, *x).map(Ordering::reverse),
        (Kind::Float(x), Kind::Float(y)) => x.partial_cmp(y),
        (Kind::Str(s), Kind::Str(t)) => Some(s.cmp(t)),
        (Kind::Date(d), Kind::Date(e)) => Some(d.cmp(e)),
        _ => None,
    }
}

pub fn gt(a: &Value, b: &Value) -> Value {
    match ordering(a, b) {
        Some(o) => Value::boolean(o == Ordering::Greater),
        None => Value::Undefined,
    }
}

pub fn lt(a: &Value, b: &Value) -> Value {
    match ordering(a, b) {
        Some(o) => Value::boolean(o == Ordering::Less),
        None => Value::Undefined,
    }
}

/// Float-side reflection: `left <op> right` where `right` is a float and
/// `left` an int.
pub fn float_reflected_ordering(right: &Value, left: &Value) -> Option<Ordering> {
    match (right.kind()?, left.kind()?) {
        (Kind::Float(y), Kind::Int(x)) => int_float_ordering(*x, *y),
        _ => None,
    }
}

/// `x` against `y` without rounding `x` to the nearest float.
fn int_float_ordering(x: i64, y: f64) -> Option<Ordering> {
    // 2^63
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    match float_as_exact_int(y) {
        Some(n) => Some(x.cmp(&n)),
        None if y.is_nan() => None,
        None if y >= LIMIT => Some(Ordering::Less),
        None if y < -LIMIT => Some(Ordering::Greater),
        // non-integral and below 2^53 in size, where the cast is exact
        None => (x as f64).partial_cmp(&y),
    }
}

/// Total order used by `list.sort()`: numbers, then strings, then dates;
/// anything else keeps its relative position.
pub fn sort_ordering(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v.kind() {
            Some(Kind::Int(_)) | Some(Kind::Float(_)) => 0,
            Some(Kind::Str(_)) => 1,
            Some(Kind::Date(_)) => 2,
            _ => 3,
        }
    }
    match (a.as_number(), b.as_number()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => match rank(a).cmp(&rank(b)) {
            Ordering::Equal => ordering(a, b).unwrap_or(Ordering::Equal),
            other => other,
        },
    }
}

/// `container.contains(item)`; `undefined` for non-containers.
pub fn contains(container: &Value, item: &Value) -> Value {
    match container.kind() {
        Some(Kind::List(_)) | Some(Kind::FrozenList(_)) => {
            let items = container.list_items().unwrap_or_default();
            Value::boolean(items.iter().any(|v| strict_equals(v, item)))
        }
        Some(Kind::Map(entries)) => Value::boolean(match MapKey::new(item.clone()) {
            Some(key) => entries.borrow().contains_key(&key),
            None => false,
        }),
        Some(Kind::FrozenMap(entries)) => Value::boolean(match MapKey::new(item.clone()) {
            Some(key) => entries.contains_key(&key),
            None => false,
        }),
        Some(Kind::Str(s)) => match item.as_str() {
            Some(sub) => Value::boolean(s.contains(sub)),
            None => Value::Undefined,
        },
        _ => Value::Undefined,
    }
}
