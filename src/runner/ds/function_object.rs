use std::rc::Rc;

use chrono::{Local, NaiveDate};
use indexmap::IndexMap;

use crate::runner::ds::error::RuntimeError;
use crate::runner::ds::iterator::collect_items;
use crate::runner::ds::operations::type_conversion::{to_boolean, to_display_string};
use crate::runner::ds::scope::Scope;
use crate::runner::ds::value::{Kind, MapKey, Value};
use crate::runner::vm::bytecode::ByteCode;
use crate::runner::vm::interpreter::Runtime;

/// A script function: its own bytecode plus the name-pool indices of its
/// positional parameters.
#[derive(Clone)]
pub struct Function {
    pub bytecode: Rc<ByteCode>,
    pub params: Vec<u32>,
}

impl Function {
    pub fn new(bytecode: ByteCode, params: Vec<u32>) -> Self {
        Function {
            bytecode: Rc::new(bytecode),
            params,
        }
    }

    pub fn param_names(&self) -> Vec<&str> {
        self.params
            .iter()
            .map(|p| self.bytecode.get_name(*p))
            .collect()
    }
}

pub type NativeFn = Rc<dyn Fn(&mut Runtime, &Scope, Vec<Value>) -> Result<Value, RuntimeError>>;

/// A host-implemented callable: builtins, bound methods, host actions.
#[derive(Clone)]
pub struct NativeFunction {
    pub name: String,
    pub func: NativeFn,
}

impl NativeFunction {
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(&mut Runtime, &Scope, Vec<Value>) -> Result<Value, RuntimeError> + 'static,
    {
        NativeFunction {
            name: name.to_string(),
            func: Rc::new(func),
        }
    }

    pub fn into_value(self) -> Value {
        Value::from_kind(Kind::Native(self))
    }
}

/// Wraps a closure that never touches the runtime or globals.
pub fn native_value<F>(name: &str, func: F) -> Value
where
    F: Fn(Vec<Value>) -> Result<Value, RuntimeError> + 'static,
{
    NativeFunction::new(name, move |_rt, _globals, args| func(args)).into_value()
}

/// A builtin method bound to its receiver, e.g. `lst.append`.
pub fn bound_method<F>(name: &str, receiver: &Value, method: F) -> Value
where
    F: Fn(&Value, &[Value]) -> Value + 'static,
{
    let receiver = receiver.clone();
    native_value(name, move |args| Ok(method(&receiver, &args)))
}

/// Builtin classes. Calling one converts its arguments into that kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClassKind {
    Int,
    Float,
    Str,
    Bool,
    List,
    FrozenList,
    Map,
    FrozenMap,
    Date,
}

impl ClassKind {
    pub fn name(&self) -> &'static str {
        match self {
            ClassKind::Int => "int",
            ClassKind::Float => "float",
            ClassKind::Str => "str",
            ClassKind::Bool => "bool",
            ClassKind::List => "list",
            ClassKind::FrozenList => "frozenlist",
            ClassKind::Map => "map",
            ClassKind::FrozenMap => "frozenmap",
            ClassKind::Date => "date",
        }
    }

    /// Whether `value` is an instance of this class.
    pub fn is_instance(&self, value: &Value) -> bool {
        match (self, value) {
            (ClassKind::Bool, Value::Bool(_)) => true,
            (_, Value::Object(o)) => matches!(
                (self, &o.kind),
                (ClassKind::Int, Kind::Int(_))
                    | (ClassKind::Float, Kind::Float(_))
                    | (ClassKind::Str, Kind::Str(_))
                    | (ClassKind::List, Kind::List(_))
                    | (ClassKind::FrozenList, Kind::FrozenList(_))
                    | (ClassKind::Map, Kind::Map(_))
                    | (ClassKind::FrozenMap, Kind::FrozenMap(_))
                    | (ClassKind::Date, Kind::Date(_))
            ),
            _ => false,
        }
    }

    pub fn construct(&self, args: &[Value]) -> Value {
        match self {
            ClassKind::Int => match args {
                [] => Value::int(0),
                [v] => construct_int(v),
                _ => Value::Undefined,
            },
            ClassKind::Float => match args {
                [] => Value::float(0.0),
                [v] => construct_float(v),
                _ => Value::Undefined,
            },
            ClassKind::Str => match args {
                [] => Value::string(""),
                [v] if v.as_str().is_some() => v.clone(),
                [v] => Value::string(to_display_string(v)),
                _ => Value::Undefined,
            },
            ClassKind::Bool => match args {
                [] => Value::FALSE,
                [v] => Value::boolean(to_boolean(v)),
                _ => Value::Undefined,
            },
            ClassKind::List | ClassKind::FrozenList => {
                let items = match args {
                    [] => Some(vec![]),
                    [v] => collect_items(v),
                    _ => None,
                };
                match items {
                    Some(items) if *self == ClassKind::List => Value::list(items),
                    Some(items) => Value::frozen_list(items),
                    None => Value::Undefined,
                }
            }
            ClassKind::Map | ClassKind::FrozenMap => {
                let entries = match args {
                    [] => Some(IndexMap::new()),
                    [v] => map_entries_from(v),
                    _ => None,
                };
                match entries {
                    Some(entries) if *self == ClassKind::Map => Value::map(entries),
                    Some(entries) => Value::frozen_map(entries),
                    None => Value::Undefined,
                }
            }
            ClassKind::Date => construct_date(args),
        }
    }

    pub fn into_value(self) -> Value {
        Value::from_kind(Kind::Class(self))
    }
}

fn construct_int(v: &Value) -> Value {
    match v {
        Value::Bool(b) => Value::int(*b as i64),
        Value::Undefined => Value::Undefined,
        Value::Object(o) => match &o.kind {
            Kind::Int(_) => v.clone(),
            Kind::Float(f) if f.is_finite() && f.abs() < i64::MAX as f64 => {
                Value::int(f.trunc() as i64)
            }
            Kind::Str(s) => match s.trim().parse::<i64>() {
                Ok(n) => Value::int(n),
                Err(_) => Value::Undefined,
            },
            _ => Value::Undefined,
        },
    }
}

fn construct_float(v: &Value) -> Value {
    match v {
        Value::Bool(b) => Value::float(if *b { 1.0 } else { 0.0 }),
        Value::Undefined => Value::Undefined,
        Value::Object(o) => match &o.kind {
            Kind::Int(n) => Value::float(*n as f64),
            Kind::Float(_) => v.clone(),
            Kind::Str(s) => match s.trim().parse::<f64>() {
                Ok(f) => Value::float(f),
                Err(_) => Value::Undefined,
            },
            _ => Value::Undefined,
        },
    }
}

/// Accepts a map, or a sequence of two-element lists.
fn map_entries_from(v: &Value) -> Option<IndexMap<MapKey, Value>> {
    if let Some(entries) = v.map_entries() {
        return entries
            .into_iter()
            .map(|(k, v)| MapKey::new(k).map(|k| (k, v)))
            .collect();
    }
    let mut entries = IndexMap::new();
    for pair in collect_items(v)? {
        match pair.list_items()?.as_slice() {
            [k, val] => {
                entries.insert(MapKey::new(k.clone())?, val.clone());
            }
            _ => return None,
        }
    }
    Some(entries)
}

fn construct_date(args: &[Value]) -> Value {
    match args {
        [] => Value::date(Local::now().date_naive()),
        [v] => match v.kind() {
            Some(Kind::Date(_)) => v.clone(),
            Some(Kind::Str(s)) => match NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d") {
                Ok(d) => Value::date(d),
                Err(_) => Value::Undefined,
            },
            _ => Value::Undefined,
        },
        [y, m, d] => match (y.as_int(), m.as_int(), d.as_int()) {
            (Some(y), Some(m), Some(d)) if m >= 0 && d >= 0 && y.abs() < i32::MAX as i64 => {
                NaiveDate::from_ymd_opt(y as i32, m as u32, d as u32)
                    .map(Value::date)
                    .unwrap_or(Value::Undefined)
            }
            _ => Value::Undefined,
        },
        _ => Value::Undefined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_construction() {
        assert_eq!(ClassKind::Int.construct(&[Value::string(" 42 ")]), Value::int(42));
        assert_eq!(ClassKind::Int.construct(&[Value::float(2.9)]), Value::int(2));
        assert!(ClassKind::Int.construct(&[Value::string("x")]).is_undefined());
    }

    #[test]
    fn test_date_construction() {
        let d = ClassKind::Date.construct(&[Value::int(2020), Value::int(2), Value::int(29)]);
        assert_eq!(d.as_date(), NaiveDate::from_ymd_opt(2020, 2, 29));
        assert!(ClassKind::Date
            .construct(&[Value::int(2021), Value::int(2), Value::int(29)])
            .is_undefined());
        let parsed = ClassKind::Date.construct(&[Value::string("2021-03-01")]);
        assert_eq!(parsed.as_date(), NaiveDate::from_ymd_opt(2021, 3, 1));
    }

    #[test]
    fn test_map_from_pairs() {
        let pairs = Value::list(vec![Value::list(vec![Value::string("a"), Value::int(1)])]);
        let map = ClassKind::Map.construct(&[pairs]);
        assert_eq!(map.type_name(), "map");
        assert_eq!(map.map_entries().unwrap().len(), 1);
        let bad = Value::list(vec![Value::list(vec![Value::list(vec![]), Value::int(1)])]);
        assert!(ClassKind::FrozenMap.construct(&[bad]).is_undefined());
    }
}
