use std::rc::Rc;

use crate::runner::ds::value::{Kind, MapKey, Object, Value, TYPE_STR_UNDEFINED};
use indexmap::IndexMap;

/// Truthiness: `undefined`, `false`, zero, and empty strings or containers are
/// false; everything else is true.
pub fn to_boolean(v: &Value) -> bool {
    match v {
        Value::Undefined => false,
        Value::Bool(b) => *b,
        Value::Object(o) => match &o.kind {
            Kind::Int(n) => *n != 0,
            Kind::Float(f) => *f != 0.0,
            Kind::Str(s) => !s.is_empty(),
            Kind::List(items) => !items.borrow().is_empty(),
            Kind::FrozenList(items) => !items.is_empty(),
            Kind::Map(entries) => !entries.borrow().is_empty(),
            Kind::FrozenMap(entries) => !entries.is_empty(),
            _ => true,
        },
    }
}

pub fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

/// String coercion, as used by `str()` and `print`.
pub fn to_display_string(v: &Value) -> String {
    match v {
        Value::Object(o) => match &o.kind {
            Kind::Str(s) => s.clone(),
            _ => to_repr(v),
        },
        _ => to_repr(v),
    }
}

/// Containers nested deeper than this render as `[...]`.
pub const MAX_REPR_DEPTH: usize = 64;

/// Like [`to_display_string`] but strings are quoted, for nesting inside
/// container renderings.
pub fn to_repr(v: &Value) -> String {
    repr_at(v, &mut vec![])
}

/// `open` holds the containers being rendered, so a list that contains
/// itself renders the inner occurrence as `[...]`.
fn repr_at(v: &Value, open: &mut Vec<*const Object>) -> String {
    let o = match v {
        Value::Undefined => return TYPE_STR_UNDEFINED.to_string(),
        Value::Bool(b) => return b.to_string(),
        Value::Object(o) => o,
    };
    let is_container = matches!(
        o.kind,
        Kind::List(_) | Kind::FrozenList(_) | Kind::Map(_) | Kind::FrozenMap(_)
    );
    if is_container {
        let ptr = Rc::as_ptr(o);
        if open.len() >= MAX_REPR_DEPTH || open.contains(&ptr) {
            return "[...]".to_string();
        }
        open.push(ptr);
    }
    let repr = match &o.kind {
        Kind::Int(n) => n.to_string(),
        Kind::Float(f) => format_float(*f),
        Kind::Str(s) => format!("{:?}", s),
        Kind::Date(d) => d.format("%Y-%m-%d").to_string(),
        Kind::List(items) => {
            let items = items.borrow().clone();
            list_repr(&items, open)
        }
        Kind::FrozenList(items) => format!("frozen {}", list_repr(items, open)),
        Kind::Map(entries) => {
            let entries = entries.borrow().clone();
            map_repr(&entries, open)
        }
        Kind::FrozenMap(entries) => format!("frozen {}", map_repr(entries, open)),
        Kind::Function(func) => format!("<function({})>", func.param_names().join(", ")),
        Kind::Native(native) => format!("<native {}>", native.name),
        Kind::Class(class) => format!("<class {}>", class.name()),
        Kind::Iterator(_) => "<iterator>".to_string(),
        Kind::Record(record) => record.describe(),
        Kind::ActionNamespace(ns) => format!("<{}>", ns.entity()),
        Kind::SearchName(path) => path.field.clone(),
        Kind::SearchQuery(condition) => format!("<query {}>", condition),
        Kind::Ui(_) => "<ui>".to_string(),
    };
    if is_container {
        open.pop();
    }
    repr
}

fn list_repr(items: &[Value], open: &mut Vec<*const Object>) -> String {
    let parts: Vec<String> = items.iter().map(|v| repr_at(v, open)).collect();
    format!("[{}]", parts.join(", "))
}

fn map_repr(entries: &IndexMap<MapKey, Value>, open: &mut Vec<*const Object>) -> String {
    if entries.is_empty() {
        return "[:]".to_string();
    }
    let parts: Vec<String> = entries
        .iter()
        .map(|(k, v)| format!("{}: {}", repr_at(k.value(), open), repr_at(v, open)))
        .collect();
    format!("[{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_rendering() {
        assert_eq!(to_display_string(&Value::float(2.0)), "2.0");
        assert_eq!(to_display_string(&Value::float(0.5)), "0.5");
    }

    #[test]
    fn test_container_rendering() {
        let list = Value::frozen_list(vec![Value::int(1), Value::string("a")]);
        assert_eq!(to_display_string(&list), "frozen [1, \"a\"]");
        assert_eq!(to_display_string(&Value::map(IndexMap::new())), "[:]");
    }

    #[test]
    fn test_self_containing_list_rendering() {
        let list = Value::list(vec![Value::int(1)]);
        if let Some(Kind::List(items)) = list.kind() {
            items.borrow_mut().push(list.clone());
        }
        assert_eq!(to_repr(&list), "[1, [...]]");

        let mut nested = Value::list(vec![]);
        for _ in 0..MAX_REPR_DEPTH + 10 {
            nested = Value::list(vec![nested]);
        }
        assert!(to_repr(&nested).contains("[...]"));
    }

    #[test]
    fn test_truthiness() {
        assert!(!to_boolean(&Value::int(0)));
        assert!(!to_boolean(&Value::string("")));
        assert!(!to_boolean(&Value::list(vec![])));
        assert!(to_boolean(&Value::string("x")));
        assert!(!to_boolean(&Value::Undefined));
    }
}
