use std::cell::RefCell;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use chrono::NaiveDate;
use indexmap::IndexMap;

use crate::runner::ds::function_object::{ClassKind, Function, NativeFunction};
use crate::runner::ds::iterator::IteratorState;
use crate::runner::ds::operations::test_and_comparison::strict_equals;
use crate::runner::ds::operations::type_conversion::{to_display_string, to_repr};
use crate::runner::plugin::record::{NamespaceWrapper, RecordWrapper, UiWrapper};
use crate::runner::plugin::search::{SearchCondition, SearchPath};

pub const TYPE_STR_UNDEFINED: &str = "undefined";
pub const TYPE_STR_BOOL: &str = "bool";
pub const TYPE_STR_INT: &str = "int";
pub const TYPE_STR_FLOAT: &str = "float";
pub const TYPE_STR_STR: &str = "str";
pub const TYPE_STR_DATE: &str = "date";
pub const TYPE_STR_LIST: &str = "list";
pub const TYPE_STR_FROZEN_LIST: &str = "frozenlist";
pub const TYPE_STR_MAP: &str = "map";
pub const TYPE_STR_FROZEN_MAP: &str = "frozenmap";
pub const TYPE_STR_FUNCTION: &str = "function";
pub const TYPE_STR_NATIVE: &str = "native";
pub const TYPE_STR_CLASS: &str = "class";
pub const TYPE_STR_ITERATOR: &str = "iterator";
pub const TYPE_STR_RECORD: &str = "record";
pub const TYPE_STR_NAMESPACE: &str = "namespace";
pub const TYPE_STR_SEARCH_NAME: &str = "searchname";
pub const TYPE_STR_SEARCH_QUERY: &str = "searchquery";
pub const TYPE_STR_UI: &str = "ui";

/// A runtime datum.
///
/// `true`, `false` and `undefined` carry no heap object and exist exactly once
/// each; every other kind lives behind an `Rc<Object>` so identity is pointer
/// identity.
#[derive(Clone)]
pub enum Value {
    Undefined,
    Bool(bool),
    Object(Rc<Object>),
}

/// Heap part of a non-singleton value: its kind payload plus the ad-hoc
/// attribute table written by `obj.attr = v`.
pub struct Object {
    pub kind: Kind,
    attrs: RefCell<IndexMap<String, Value>>,
}

pub enum Kind {
    Int(i64),
    Float(f64),
    Str(String),
    Date(NaiveDate),
    List(RefCell<Vec<Value>>),
    FrozenList(Vec<Value>),
    Map(RefCell<IndexMap<MapKey, Value>>),
    FrozenMap(IndexMap<MapKey, Value>),
    Function(Function),
    Native(NativeFunction),
    Class(ClassKind),
    Iterator(RefCell<IteratorState>),
    Record(RecordWrapper),
    ActionNamespace(NamespaceWrapper),
    SearchName(SearchPath),
    SearchQuery(SearchCondition),
    Ui(UiWrapper),
}

impl Object {
    pub fn new(kind: Kind) -> Self {
        Object {
            kind,
            attrs: RefCell::new(IndexMap::new()),
        }
    }

    pub fn get_own_attr(&self, name: &str) -> Option<Value> {
        self.attrs.borrow().get(name).cloned()
    }

    pub fn set_own_attr(&self, name: &str, value: Value) {
        self.attrs.borrow_mut().insert(name.to_string(), value);
    }
}

impl Value {
    pub const TRUE: Value = Value::Bool(true);
    pub const FALSE: Value = Value::Bool(false);
    pub const UNDEFINED: Value = Value::Undefined;

    pub fn from_kind(kind: Kind) -> Self {
        Value::Object(Rc::new(Object::new(kind)))
    }

    pub fn boolean(b: bool) -> Self {
        Value::Bool(b)
    }

    pub fn int(n: i64) -> Self {
        Value::from_kind(Kind::Int(n))
    }

    pub fn float(f: f64) -> Self {
        Value::from_kind(Kind::Float(f))
    }

    pub fn string<S: Into<String>>(s: S) -> Self {
        Value::from_kind(Kind::Str(s.into()))
    }

    pub fn date(d: NaiveDate) -> Self {
        Value::from_kind(Kind::Date(d))
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::from_kind(Kind::List(RefCell::new(items)))
    }

    pub fn frozen_list(items: Vec<Value>) -> Self {
        Value::from_kind(Kind::FrozenList(items))
    }

    pub fn map(entries: IndexMap<MapKey, Value>) -> Self {
        Value::from_kind(Kind::Map(RefCell::new(entries)))
    }

    pub fn frozen_map(entries: IndexMap<MapKey, Value>) -> Self {
        Value::from_kind(Kind::FrozenMap(entries))
    }

    pub fn search_name(path: SearchPath) -> Self {
        Value::from_kind(Kind::SearchName(path))
    }

    pub fn search_query(condition: SearchCondition) -> Self {
        Value::from_kind(Kind::SearchQuery(condition))
    }

    /// Identity comparison: singletons by variant, everything else by pointer.
    pub fn is(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn kind(&self) -> Option<&Kind> {
        match self {
            Value::Object(o) => Some(&o.kind),
            _ => None,
        }
    }

    pub fn object(&self) -> Option<&Rc<Object>> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.kind() {
            Some(Kind::Int(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self.kind() {
            Some(Kind::Float(f)) => Some(*f),
            _ => None,
        }
    }

    /// Integer or float payload as `f64`.
    pub fn as_number(&self) -> Option<f64> {
        match self.kind() {
            Some(Kind::Int(n)) => Some(*n as f64),
            Some(Kind::Float(f)) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.kind() {
            Some(Kind::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self.kind() {
            Some(Kind::Date(d)) => Some(*d),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => TYPE_STR_UNDEFINED,
            Value::Bool(_) => TYPE_STR_BOOL,
            Value::Object(o) => match &o.kind {
                Kind::Int(_) => TYPE_STR_INT,
                Kind::Float(_) => TYPE_STR_FLOAT,
                Kind::Str(_) => TYPE_STR_STR,
                Kind::Date(_) => TYPE_STR_DATE,
                Kind::List(_) => TYPE_STR_LIST,
                Kind::FrozenList(_) => TYPE_STR_FROZEN_LIST,
                Kind::Map(_) => TYPE_STR_MAP,
                Kind::FrozenMap(_) => TYPE_STR_FROZEN_MAP,
                Kind::Function(_) => TYPE_STR_FUNCTION,
                Kind::Native(_) => TYPE_STR_NATIVE,
                Kind::Class(_) => TYPE_STR_CLASS,
                Kind::Iterator(_) => TYPE_STR_ITERATOR,
                Kind::Record(_) => TYPE_STR_RECORD,
                Kind::ActionNamespace(_) => TYPE_STR_NAMESPACE,
                Kind::SearchName(_) => TYPE_STR_SEARCH_NAME,
                Kind::SearchQuery(_) => TYPE_STR_SEARCH_QUERY,
                Kind::Ui(_) => TYPE_STR_UI,
            },
        }
    }

    /// Snapshot of the elements of a list or frozen list.
    pub fn list_items(&self) -> Option<Vec<Value>> {
        match self.kind() {
            Some(Kind::List(items)) => Some(items.borrow().clone()),
            Some(Kind::FrozenList(items)) => Some(items.clone()),
            _ => None,
        }
    }

    /// Snapshot of the entries of a map or frozen map.
    pub fn map_entries(&self) -> Option<Vec<(Value, Value)>> {
        let collect = |m: &IndexMap<MapKey, Value>| {
            m.iter()
                .map(|(k, v)| (k.value().clone(), v.clone()))
                .collect::<Vec<_>>()
        };
        match self.kind() {
            Some(Kind::Map(entries)) => Some(collect(&entries.borrow())),
            Some(Kind::FrozenMap(entries)) => Some(collect(entries)),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", to_display_string(self))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "Value::Undefined"),
            Value::Bool(b) => write!(f, "Value::Bool({})", b),
            Value::Object(_) => write!(f, "Value::{}({})", self.type_name(), to_repr(self)),
        }
    }
}

/// Structural equality, so tests can compare results with `assert_eq!`.
/// Scripts use the `==` operator instead, which also understands search names.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        strict_equals(self, other)
    }
}

/// A hashable value usable as a map key. Only immutable kinds qualify:
/// singletons, numbers, strings, dates, and frozen containers of those.
#[derive(Clone, Debug)]
pub struct MapKey(Value);

impl MapKey {
    pub fn new(value: Value) -> Option<MapKey> {
        if is_hashable(&value) {
            Some(MapKey(value))
        } else {
            None
        }
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

/// The integer a float is exactly equal to, if any.
pub fn float_as_exact_int(f: f64) -> Option<i64> {
    // 2^63; `i64::MAX as f64` rounds up to it
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if f.fract() == 0.0 && f >= -LIMIT && f < LIMIT {
        Some(f as i64)
    } else {
        None
    }
}

pub fn is_hashable(value: &Value) -> bool {
    match value {
        Value::Undefined | Value::Bool(_) => true,
        Value::Object(o) => match &o.kind {
            Kind::Int(_) | Kind::Float(_) | Kind::Str(_) | Kind::Date(_) => true,
            Kind::FrozenList(items) => items.iter().all(is_hashable),
            Kind::FrozenMap(entries) => entries.values().all(is_hashable),
            _ => false,
        },
    }
}

impl PartialEq for MapKey {
    fn eq(&self, other: &MapKey) -> bool {
        strict_equals(&self.0, &other.0)
    }
}

impl Eq for MapKey {}

impl Hash for MapKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_value(&self.0, state)
    }
}

fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    match value {
        Value::Undefined => 0u8.hash(state),
        Value::Bool(b) => {
            1u8.hash(state);
            b.hash(state);
        }
        Value::Object(o) => match &o.kind {
            Kind::Int(n) => {
                2u8.hash(state);
                n.hash(state);
            }
            // integral floats must hash like the equal integer
            Kind::Float(f) => match float_as_exact_int(*f) {
                Some(n) => {
                    2u8.hash(state);
                    n.hash(state);
                }
                None => {
                    3u8.hash(state);
                    f.to_bits().hash(state);
                }
            },
            Kind::Str(s) => {
                4u8.hash(state);
                s.hash(state);
            }
            Kind::Date(d) => {
                5u8.hash(state);
                d.hash(state);
            }
            Kind::FrozenList(items) => {
                6u8.hash(state);
                items.len().hash(state);
                for item in items {
                    hash_value(item, state);
                }
            }
            // entry order does not take part in equality
            Kind::FrozenMap(entries) => {
                7u8.hash(state);
                entries.len().hash(state);
            }
            _ => 8u8.hash(state),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singletons_are_identical() {
        assert!(Value::TRUE.is(&Value::boolean(true)));
        assert!(Value::UNDEFINED.is(&Value::Undefined));
        assert!(!Value::TRUE.is(&Value::FALSE));
    }

    #[test]
    fn test_objects_compare_by_pointer() {
        let a = Value::int(1);
        let b = Value::int(1);
        assert!(a.is(&a.clone()));
        assert!(!a.is(&b));
        assert_eq!(a, b);
    }

    #[test]
    fn test_map_key_hashing() {
        let mut map = IndexMap::new();
        map.insert(MapKey::new(Value::int(1)).unwrap(), Value::string("one"));
        let float_key = MapKey::new(Value::float(1.0)).unwrap();
        assert_eq!(map.get(&float_key), Some(&Value::string("one")));
        assert!(MapKey::new(Value::list(vec![])).is_none());
        assert!(MapKey::new(Value::frozen_list(vec![Value::int(1)])).is_some());
        assert!(MapKey::new(Value::frozen_list(vec![Value::list(vec![])])).is_none());

        let mut holds_map = IndexMap::new();
        holds_map.insert(MapKey::new(Value::string("a")).unwrap(), Value::map(IndexMap::new()));
        assert!(MapKey::new(Value::frozen_map(holds_map)).is_none());
    }

    #[test]
    fn test_large_numbers_keep_equality_and_hash_in_step() {
        let two_53 = 9_007_199_254_740_992i64;
        assert_eq!(Value::int(two_53), Value::float(two_53 as f64));
        assert_ne!(Value::int(two_53 + 1), Value::float(two_53 as f64));
        assert_ne!(Value::int(i64::MAX), Value::float(9_223_372_036_854_775_808.0));
        assert_eq!(Value::int(i64::MIN), Value::float(i64::MIN as f64));

        let mut map = IndexMap::new();
        map.insert(MapKey::new(Value::int(two_53 + 1)).unwrap(), Value::string("int"));
        map.insert(MapKey::new(Value::float(two_53 as f64)).unwrap(), Value::string("float"));
        assert_eq!(map.len(), 2);
        let key = MapKey::new(Value::int(two_53)).unwrap();
        assert_eq!(map.get(&key), Some(&Value::string("float")));

        assert_eq!(float_as_exact_int(2.0), Some(2));
        assert_eq!(float_as_exact_int(2.5), None);
        assert_eq!(float_as_exact_int(f64::NAN), None);
        assert_eq!(float_as_exact_int(9_223_372_036_854_775_808.0), None);
    }
}
