use crate::runner::ds::date_object::{date_add_days, date_diff_days};
use crate::runner::ds::value::{Kind, Value};

/// Upper bound on the element count produced by `*` on strings and lists.
const MAX_REPEAT_LEN: usize = 1 << 24;

pub fn add(a: &Value, b: &Value) -> Value {
    let (ka, kb) = match (a.kind(), b.kind()) {
        (Some(ka), Some(kb)) => (ka, kb),
        _ => return Value::Undefined,
    };
    match (ka, kb) {
        (Kind::Int(x), Kind::Int(y)) => x.checked_add(*y).map(Value::int).unwrap_or(Value::Undefined),
        (Kind::Float(x), _) => match b.as_number() {
            Some(y) => Value::float(x + y),
            None => Value::Undefined,
        },
        (Kind::Str(x), Kind::Str(y)) => Value::string(format!("{}{}", x, y)),
        (Kind::List(_), _) | (Kind::FrozenList(_), _) => {
            let (mut left, right) = match (a.list_items(), b.list_items()) {
                (Some(l), Some(r)) => (l, r),
                _ => return Value::Undefined,
            };
            left.extend(right);
            if let Kind::List(_) = ka {
                Value::list(left)
            } else {
                Value::frozen_list(left)
            }
        }
        (Kind::Date(d), Kind::Int(days)) => date_add_days(*d, *days),
        _ => Value::Undefined,
    }
}

pub fn sub(a: &Value, b: &Value) -> Value {
    match (a.kind(), b.kind()) {
        (Some(Kind::Int(x)), Some(Kind::Int(y))) => {
            x.checked_sub(*y).map(Value::int).unwrap_or(Value::Undefined)
        }
        (Some(Kind::Float(x)), _) => match b.as_number() {
            Some(y) => Value::float(x - y),
            None => Value::Undefined,
        },
        (Some(Kind::Date(d)), Some(Kind::Int(days))) => match days.checked_neg() {
            Some(n) => date_add_days(*d, n),
            None => Value::Undefined,
        },
        (Some(Kind::Date(x)), Some(Kind::Date(y))) => Value::int(date_diff_days(*x, *y)),
        _ => Value::Undefined,
    }
}

pub fn mul(a: &Value, b: &Value) -> Value {
    match (a.kind(), b.kind()) {
        (Some(Kind::Int(x)), Some(Kind::Int(y))) => {
            x.checked_mul(*y).map(Value::int).unwrap_or(Value::Undefined)
        }
        (Some(Kind::Float(x)), _) => match b.as_number() {
            Some(y) => Value::float(x * y),
            None => Value::Undefined,
        },
        (Some(Kind::Str(_)), Some(Kind::Int(n))) => repeat(a, *n),
        (Some(Kind::List(_)), Some(Kind::Int(n))) | (Some(Kind::FrozenList(_)), Some(Kind::Int(n))) => {
            repeat(a, *n)
        }
        _ => Value::Undefined,
    }
}

/// Integer division is exact or promotes to float; a zero divisor or an
/// overflowing quotient gives `undefined`.
pub fn div(a: &Value, b: &Value) -> Value {
    match (a.kind(), b.kind()) {
        (Some(Kind::Int(x)), Some(Kind::Int(y))) => {
            if *y == 0 {
                return Value::Undefined;
            }
            match x.checked_rem(*y) {
                Some(0) => x.checked_div(*y).map(Value::int).unwrap_or(Value::Undefined),
                Some(_) => Value::float(*x as f64 / *y as f64),
                None => Value::Undefined,
            }
        }
        (Some(Kind::Float(x)), _) => match b.as_number() {
            Some(y) if y != 0.0 => Value::float(x / y),
            _ => Value::Undefined,
        },
        _ => Value::Undefined,
    }
}

/// `left + right` computed by `right`.
pub fn radd(right: &Value, left: &Value) -> Value {
    match (right.kind(), left.kind()) {
        (Some(Kind::Float(y)), Some(Kind::Int(x))) => Value::float(*x as f64 + y),
        (Some(Kind::Date(d)), Some(Kind::Int(days))) => date_add_days(*d, *days),
        _ => Value::Undefined,
    }
}

pub fn rsub(right: &Value, left: &Value) -> Value {
    match (right.kind(), left.kind()) {
        (Some(Kind::Float(y)), Some(Kind::Int(x))) => Value::float(*x as f64 - y),
        _ => Value::Undefined,
    }
}

pub fn rmul(right: &Value, left: &Value) -> Value {
    match (right.kind(), left.kind()) {
        (Some(Kind::Float(y)), Some(Kind::Int(x))) => Value::float(*x as f64 * y),
        (Some(Kind::Str(_)), Some(Kind::Int(n)))
        | (Some(Kind::List(_)), Some(Kind::Int(n)))
        | (Some(Kind::FrozenList(_)), Some(Kind::Int(n))) => repeat(right, *n),
        _ => Value::Undefined,
    }
}

pub fn rdiv(right: &Value, left: &Value) -> Value {
    match (right.kind(), left.kind()) {
        (Some(Kind::Float(y)), Some(Kind::Int(x))) if *y != 0.0 => Value::float(*x as f64 / y),
        _ => Value::Undefined,
    }
}

pub fn negate(v: &Value) -> Value {
    match v.kind() {
        Some(Kind::Int(n)) => n.checked_neg().map(Value::int).unwrap_or(Value::Undefined),
        Some(Kind::Float(f)) => Value::float(-f),
        _ => Value::Undefined,
    }
}

pub fn positive(v: &Value) -> Value {
    match v.kind() {
        Some(Kind::Int(_)) | Some(Kind::Float(_)) => v.clone(),
        _ => Value::Undefined,
    }
}

fn repeat(v: &Value, times: i64) -> Value {
    let times = times.max(0) as usize;
    match v.kind() {
        Some(Kind::Str(s)) => match s.len().checked_mul(times) {
            Some(len) if len <= MAX_REPEAT_LEN => Value::string(s.repeat(times)),
            _ => Value::Undefined,
        },
        Some(Kind::List(_)) | Some(Kind::FrozenList(_)) => {
            let items = v.list_items().unwrap_or_default();
            match items.len().checked_mul(times) {
                Some(len) if len <= MAX_REPEAT_LEN => {
                    let mut out = Vec::with_capacity(len);
                    for _ in 0..times {
                        out.extend(items.iter().cloned());
                    }
                    if let Some(Kind::List(_)) = v.kind() {
                        Value::list(out)
                    } else {
                        Value::frozen_list(out)
                    }
                }
                _ => Value::Undefined,
            }
        }
        _ => Value::Undefined,
    }
}
