//! Attribute, element and membership protocol over all value kinds.

use crate::runner::ds::date_object::date_field;
use crate::runner::ds::error::RuntimeError;
use crate::runner::ds::operations::test_and_comparison;
use crate::runner::ds::value::{Kind, Value};
use crate::runner::ds::{array_object, map_object, string_object};
use crate::runner::plugin::search;

/// `obj.name`. Builtin methods and fields come first, then the attribute
/// table. Host wrappers only expose their allow-lists. Missing → `undefined`.
pub fn get_attr(obj: &Value, name: &str) -> Value {
    let o = match obj {
        Value::Object(o) => o,
        _ => return Value::Undefined,
    };
    let builtin = match &o.kind {
        Kind::List(_) | Kind::FrozenList(_) => array_object::get_method(obj, name),
        Kind::Map(_) | Kind::FrozenMap(_) => map_object::get_method(obj, name),
        Kind::Str(_) => string_object::get_method(obj, name),
        Kind::Date(d) => date_field(*d, name),
        Kind::Record(record) => return record.get_attr(name),
        Kind::ActionNamespace(ns) => return ns.get_attr(name),
        Kind::Ui(ui) => return ui.get_attr(name),
        Kind::SearchName(path) => {
            return path
                .extend(name)
                .map(Value::search_name)
                .unwrap_or(Value::Undefined)
        }
        _ => None,
    };
    builtin
        .or_else(|| o.get_own_attr(name))
        .unwrap_or(Value::Undefined)
}

/// `obj.name = value`. Singletons have no attribute table and host wrappers
/// only accept allowed writes; everything else is silently dropped.
pub fn set_attr(obj: &Value, name: &str, value: Value) -> Result<(), RuntimeError> {
    let o = match obj {
        Value::Object(o) => o,
        _ => return Ok(()),
    };
    match &o.kind {
        Kind::Record(record) => record.set_attr(name, &value)?,
        Kind::ActionNamespace(_) | Kind::Ui(_) => {}
        _ => o.set_own_attr(name, value),
    }
    Ok(())
}

/// `obj[key]`.
pub fn get_elem(obj: &Value, key: &Value) -> Result<Value, RuntimeError> {
    Ok(match obj.kind() {
        Some(Kind::List(_)) | Some(Kind::FrozenList(_)) => array_object::get_elem(obj, key),
        Some(Kind::Map(_)) | Some(Kind::FrozenMap(_)) => map_object::get_elem(obj, key),
        Some(Kind::Str(s)) => string_object::get_elem(s, key),
        Some(Kind::ActionNamespace(ns)) => return ns.get_elem(key),
        _ => Value::Undefined,
    })
}

/// Contextual resolution of a bare name inside `obj[...]`.
pub fn elem_var(obj: &Value, name: &str) -> Value {
    match obj.kind() {
        Some(Kind::ActionNamespace(ns)) => ns.elem_var(name),
        _ => Value::Undefined,
    }
}

/// `item in container`, answered by the container alone.
pub fn contains(container: &Value, item: &Value) -> Value {
    match container.kind() {
        Some(Kind::SearchName(path)) => search::contains(&path.field, item),
        _ => test_and_comparison::contains(container, item),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_table_fallback() {
        let v = Value::int(3);
        assert!(get_attr(&v, "missing").is_undefined());
        set_attr(&v, "note", Value::string("x")).unwrap();
        assert_eq!(get_attr(&v, "note").as_str(), Some("x"));
        assert!(get_attr(&Value::Undefined, "note").is_undefined());
        set_attr(&Value::TRUE, "note", Value::int(1)).unwrap();
        assert!(get_attr(&Value::TRUE, "note").is_undefined());
    }

    #[test]
    fn test_builtin_methods_shadow_attributes() {
        let list = Value::list(vec![]);
        set_attr(&list, "append", Value::int(1)).unwrap();
        assert_eq!(get_attr(&list, "append").type_name(), "native");
    }

    #[test]
    fn test_element_access() {
        let list = Value::list(vec![Value::int(1), Value::int(2)]);
        assert_eq!(get_elem(&list, &Value::int(-1)).unwrap(), Value::int(2));
        assert!(get_elem(&list, &Value::int(5)).unwrap().is_undefined());
        assert_eq!(
            get_elem(&Value::string("abc"), &Value::int(1)).unwrap().as_str(),
            Some("b")
        );
    }
}
