//! Boundary types and traits implemented by the host application.

use std::fmt;
use std::rc::Rc;

use chrono::NaiveDate;
use indexmap::IndexMap;

use crate::runner::ds::error::HostError;
use crate::runner::plugin::search::SearchCondition;

/// Data crossing the script/host boundary in either direction.
#[derive(Clone)]
pub enum HostData {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Date(NaiveDate),
    List(Vec<HostData>),
    Map(IndexMap<String, HostData>),
    Record(Rc<dyn HostRecord>),
    Records(Vec<Rc<dyn HostRecord>>),
}

impl HostData {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HostData::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl PartialEq for HostData {
    fn eq(&self, other: &HostData) -> bool {
        match (self, other) {
            (HostData::Null, HostData::Null) => true,
            (HostData::Bool(a), HostData::Bool(b)) => a == b,
            (HostData::Int(a), HostData::Int(b)) => a == b,
            (HostData::Float(a), HostData::Float(b)) => a == b,
            (HostData::Str(a), HostData::Str(b)) => a == b,
            (HostData::Date(a), HostData::Date(b)) => a == b,
            (HostData::List(a), HostData::List(b)) => a == b,
            (HostData::Map(a), HostData::Map(b)) => a == b,
            (HostData::Record(a), HostData::Record(b)) => Rc::ptr_eq(a, b),
            (HostData::Records(a), HostData::Records(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| Rc::ptr_eq(x, y))
            }
            _ => false,
        }
    }
}

impl fmt::Display for HostData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostData::Null => write!(f, "null"),
            HostData::Bool(b) => write!(f, "{}", b),
            HostData::Int(n) => write!(f, "{}", n),
            HostData::Float(x) => write!(f, "{}", x),
            HostData::Str(s) => write!(f, "{:?}", s),
            HostData::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            HostData::List(items) => {
                let parts: Vec<String> = items.iter().map(|i| i.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            HostData::Map(entries) => {
                let parts: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{:?}: {}", k, v))
                    .collect();
                write!(f, "[{}]", parts.join(", "))
            }
            HostData::Record(r) => write!(f, "{}", r.describe()),
            HostData::Records(rs) => {
                let parts: Vec<String> = rs.iter().map(|r| r.describe()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

impl fmt::Debug for HostData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostData({})", self)
    }
}

/// One record of the host data model, e.g. a single book.
pub trait HostRecord {
    fn entity(&self) -> &str;

    /// The field's current value, `None` if the record has no such field.
    fn field(&self, name: &str) -> Option<HostData>;

    fn set_field(&self, name: &str, _value: HostData) -> Result<(), HostError> {
        Err(HostError::ReadOnly {
            entity: self.entity().to_string(),
            field: name.to_string(),
        })
    }

    fn describe(&self) -> String {
        format!("<{}>", self.entity())
    }
}

/// The operations scripts may run on one record type.
pub trait ActionNamespace {
    fn entity(&self) -> &str;
    fn new_record(&self, fields: IndexMap<String, HostData>) -> Result<HostData, HostError>;
    fn view(&self, id: &HostData) -> Result<HostData, HostError>;
    fn edit(&self, id: &HostData, fields: IndexMap<String, HostData>) -> Result<HostData, HostError>;
    fn search(&self, condition: &SearchCondition) -> Result<Vec<Rc<dyn HostRecord>>, HostError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Str,
    Int,
    Float,
    Bool,
    Date,
}

impl FieldKind {
    pub fn from_name(name: &str) -> Option<FieldKind> {
        match name {
            "str" => Some(FieldKind::Str),
            "int" => Some(FieldKind::Int),
            "float" => Some(FieldKind::Float),
            "bool" => Some(FieldKind::Bool),
            "date" => Some(FieldKind::Date),
            _ => None,
        }
    }
}

/// One field of a `get_data` form.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
}

/// User interaction offered to scripts as the `ui` object.
pub trait UiCallbacks {
    fn display(&self, message: &str) -> Result<(), HostError>;

    /// Ask the user to fill in `fields`; the result is keyed by field name.
    fn get_data(&self, fields: &[FieldSpec]) -> Result<IndexMap<String, HostData>, HostError>;

    fn ask(&self, question: &str) -> Result<bool, HostError> {
        let answers = self.get_data(&[FieldSpec {
            name: question.to_string(),
            kind: FieldKind::Bool,
        }])?;
        Ok(answers
            .get(question)
            .and_then(HostData::as_bool)
            .unwrap_or(false))
    }

    fn alert(&self, message: &str) -> Result<(), HostError> {
        self.display(message)
    }
}
