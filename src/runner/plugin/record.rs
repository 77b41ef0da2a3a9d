//! Script-side wrappers around host objects.
//!
//! Every attribute read goes through an allow-list: record fields through the
//! entity's [`RecordSchema`], namespaces and the `ui` object through fixed
//! method sets. Anything else reads as `undefined` and writes are dropped.

use std::collections::HashSet;
use std::rc::Rc;

use indexmap::IndexMap;

use super::registry::{RecordSchema, SchemaRegistry};
use super::search::{CompareOp, SearchCondition, SearchPath};
use super::types::{ActionNamespace, FieldKind, FieldSpec, HostData, HostRecord, UiCallbacks};
use crate::runner::ds::error::{HostError, RuntimeError};
use crate::runner::ds::function_object::NativeFunction;
use crate::runner::ds::operations::type_conversion::to_display_string;
use crate::runner::ds::value::{Kind, MapKey, Value};

lazy_static! {
    static ref NAMESPACE_ALLOWED: HashSet<&'static str> =
        ["new", "view", "edit", "search"].iter().cloned().collect();
    static ref UI_ALLOWED: HashSet<&'static str> =
        ["ask", "alert", "display", "get_data"].iter().cloned().collect();
}

/// Containers nested deeper than this reach the host as `Null`.
pub const MAX_HOST_DEPTH: usize = 64;

pub fn value_to_host(v: &Value) -> HostData {
    to_host_at(v, 0)
}

fn to_host_at(v: &Value, depth: usize) -> HostData {
    match v {
        Value::Undefined => HostData::Null,
        Value::Bool(b) => HostData::Bool(*b),
        Value::Object(o) => match &o.kind {
            Kind::Int(n) => HostData::Int(*n),
            Kind::Float(f) => HostData::Float(*f),
            Kind::Str(s) => HostData::Str(s.clone()),
            Kind::Date(d) => HostData::Date(*d),
            _ if depth >= MAX_HOST_DEPTH => HostData::Null,
            Kind::List(_) | Kind::FrozenList(_) => HostData::List(
                v.list_items()
                    .unwrap_or_default()
                    .iter()
                    .map(|item| to_host_at(item, depth + 1))
                    .collect(),
            ),
            Kind::Map(_) | Kind::FrozenMap(_) => {
                HostData::Map(host_fields_at(v, depth).unwrap_or_default())
            }
            Kind::Record(wrapper) => HostData::Record(wrapper.record.clone()),
            _ => HostData::Null,
        },
    }
}

/// A script map as host fields; keys are stringified.
fn host_fields(v: &Value) -> Option<IndexMap<String, HostData>> {
    host_fields_at(v, 0)
}

fn host_fields_at(v: &Value, depth: usize) -> Option<IndexMap<String, HostData>> {
    Some(
        v.map_entries()?
            .iter()
            .map(|(k, v)| (to_display_string(k), to_host_at(v, depth + 1)))
            .collect(),
    )
}

pub fn host_to_value(data: HostData, registry: &Rc<SchemaRegistry>) -> Value {
    match data {
        HostData::Null => Value::Undefined,
        HostData::Bool(b) => Value::boolean(b),
        HostData::Int(n) => Value::int(n),
        HostData::Float(f) => Value::float(f),
        HostData::Str(s) => Value::string(s),
        HostData::Date(d) => Value::date(d),
        HostData::List(items) => Value::list(
            items
                .into_iter()
                .map(|i| host_to_value(i, registry))
                .collect(),
        ),
        HostData::Map(entries) => {
            let mut map = IndexMap::new();
            for (k, v) in entries {
                if let Some(key) = MapKey::new(Value::string(k)) {
                    map.insert(key, host_to_value(v, registry));
                }
            }
            Value::map(map)
        }
        HostData::Record(record) => wrap_record(record, registry),
        HostData::Records(records) => Value::frozen_list(
            records
                .into_iter()
                .map(|r| wrap_record(r, registry))
                .collect(),
        ),
    }
}

pub fn wrap_record(record: Rc<dyn HostRecord>, registry: &Rc<SchemaRegistry>) -> Value {
    Value::from_kind(Kind::Record(RecordWrapper::new(record, registry.clone())))
}

pub struct RecordWrapper {
    record: Rc<dyn HostRecord>,
    schema: Rc<RecordSchema>,
    registry: Rc<SchemaRegistry>,
}

impl RecordWrapper {
    pub fn new(record: Rc<dyn HostRecord>, registry: Rc<SchemaRegistry>) -> Self {
        let schema = registry.get(record.entity());
        RecordWrapper {
            record,
            schema,
            registry,
        }
    }

    pub fn record(&self) -> &Rc<dyn HostRecord> {
        &self.record
    }

    pub fn describe(&self) -> String {
        self.record.describe()
    }

    pub fn get_attr(&self, name: &str) -> Value {
        if !self.schema.can_read(name) {
            return Value::Undefined;
        }
        match self.record.field(name) {
            Some(data) => host_to_value(data, &self.registry),
            None => Value::Undefined,
        }
    }

    /// Writes outside the writable list are ignored; host failures propagate.
    pub fn set_attr(&self, name: &str, value: &Value) -> Result<(), HostError> {
        if !self.schema.can_write(name) {
            return Ok(());
        }
        self.record.set_field(name, value_to_host(value))
    }
}

pub struct NamespaceWrapper {
    namespace: Rc<dyn ActionNamespace>,
    registry: Rc<SchemaRegistry>,
}

impl NamespaceWrapper {
    pub fn new(namespace: Rc<dyn ActionNamespace>, registry: Rc<SchemaRegistry>) -> Self {
        NamespaceWrapper {
            namespace,
            registry,
        }
    }

    pub fn entity(&self) -> &str {
        self.namespace.entity()
    }

    pub fn get_attr(&self, name: &str) -> Value {
        if !NAMESPACE_ALLOWED.contains(name) {
            return Value::Undefined;
        }
        let ns = self.namespace.clone();
        let registry = self.registry.clone();
        let qualified = format!("{}.{}", ns.entity(), name);
        let native = match name {
            "new" => NativeFunction::new(&qualified, move |_rt, _g, args| {
                match args.as_slice() {
                    [fields] => match host_fields(fields) {
                        Some(fields) => Ok(host_to_value(ns.new_record(fields)?, &registry)),
                        None => Ok(Value::Undefined),
                    },
                    _ => Ok(Value::Undefined),
                }
            }),
            "view" => NativeFunction::new(&qualified, move |_rt, _g, args| match args.as_slice() {
                [id] => Ok(host_to_value(ns.view(&value_to_host(id))?, &registry)),
                _ => Ok(Value::Undefined),
            }),
            "edit" => NativeFunction::new(&qualified, move |_rt, _g, args| {
                match args.as_slice() {
                    [id, fields] => match host_fields(fields) {
                        Some(fields) => {
                            Ok(host_to_value(ns.edit(&value_to_host(id), fields)?, &registry))
                        }
                        None => Ok(Value::Undefined),
                    },
                    _ => Ok(Value::Undefined),
                }
            }),
            _ => NativeFunction::new(&qualified, move |_rt, _g, args| match args.as_slice() {
                [query] => search(&*ns, &registry, query),
                _ => Ok(Value::Undefined),
            }),
        };
        native.into_value()
    }

    /// `Namespace[key]`: a primary key views one record, a query searches.
    pub fn get_elem(&self, key: &Value) -> Result<Value, RuntimeError> {
        match key.kind() {
            Some(Kind::Int(_)) | Some(Kind::Str(_)) => Ok(host_to_value(
                self.namespace.view(&value_to_host(key))?,
                &self.registry,
            )),
            Some(Kind::SearchQuery(_)) | Some(Kind::SearchName(_)) => {
                search(&*self.namespace, &self.registry, key)
            }
            _ => Ok(Value::Undefined),
        }
    }

    /// Bare names inside `Namespace[...]` that are readable fields become
    /// search names.
    pub fn elem_var(&self, name: &str) -> Value {
        SearchPath::root(&self.registry, self.entity(), name)
            .map(Value::search_name)
            .unwrap_or(Value::Undefined)
    }
}

fn search(
    ns: &dyn ActionNamespace,
    registry: &Rc<SchemaRegistry>,
    query: &Value,
) -> Result<Value, RuntimeError> {
    let condition = match query.kind() {
        Some(Kind::SearchQuery(c)) => c.clone(),
        Some(Kind::SearchName(path)) => {
            SearchCondition::compare(path.field.as_str(), CompareOp::Eq, HostData::Bool(true))
        }
        _ => return Ok(Value::Undefined),
    };
    let results = ns.search(&condition)?;
    Ok(host_to_value(HostData::Records(results), registry))
}

pub struct UiWrapper {
    ui: Rc<dyn UiCallbacks>,
}

impl UiWrapper {
    pub fn new(ui: Rc<dyn UiCallbacks>) -> Self {
        UiWrapper { ui }
    }

    pub fn get_attr(&self, name: &str) -> Value {
        if !UI_ALLOWED.contains(name) {
            return Value::Undefined;
        }
        let ui = self.ui.clone();
        let qualified = format!("ui.{}", name);
        let native = match name {
            "ask" => NativeFunction::new(&qualified, move |_rt, _g, args| match args.as_slice() {
                [question] => Ok(Value::boolean(ui.ask(&to_display_string(question))?)),
                _ => Ok(Value::Undefined),
            }),
            "alert" => NativeFunction::new(&qualified, move |_rt, _g, args| match args.as_slice() {
                [message] => {
                    ui.alert(&to_display_string(message))?;
                    Ok(Value::Undefined)
                }
                _ => Ok(Value::Undefined),
            }),
            "display" => {
                NativeFunction::new(&qualified, move |_rt, _g, args| match args.as_slice() {
                    [value] => {
                        ui.display(&to_display_string(value))?;
                        Ok(Value::Undefined)
                    }
                    _ => Ok(Value::Undefined),
                })
            }
            _ => NativeFunction::new(&qualified, move |_rt, _g, args| match args.as_slice() {
                [form] => match field_specs(form) {
                    Some(fields) => {
                        let answers = ui.get_data(&fields)?;
                        let registry = Rc::new(SchemaRegistry::new());
                        Ok(host_to_value(HostData::Map(answers), &registry))
                    }
                    None => Ok(Value::Undefined),
                },
                _ => Ok(Value::Undefined),
            }),
        };
        native.into_value()
    }
}

/// `[name: kind]` where kind is a class (`int`) or its name (`"int"`).
fn field_specs(form: &Value) -> Option<Vec<FieldSpec>> {
    let mut fields = vec![];
    for (name, kind) in form.map_entries()? {
        let kind_name = match kind.kind()? {
            Kind::Class(class) => class.name().to_string(),
            Kind::Str(s) => s.clone(),
            _ => return None,
        };
        fields.push(FieldSpec {
            name: to_display_string(&name),
            kind: FieldKind::from_name(&kind_name)?,
        });
    }
    Some(fields)
}
