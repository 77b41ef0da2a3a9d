//! Search conditions built by scripts inside `Namespace[...]`.
//!
//! Bare names inside the brackets resolve to search names; comparing one with
//! a value yields a search query, and `&&` / `||` combine queries.

use std::fmt;
use std::rc::Rc;

use crate::runner::ds::operations::{land, lor};
use crate::runner::ds::value::{Kind, Value};
use crate::runner::plugin::record::value_to_host;
use crate::runner::plugin::registry::SchemaRegistry;
use crate::runner::plugin::types::HostData;
use crate::runner::vm::bytecode::BinaryOp;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Contains,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Contains => "contains",
        }
    }

    /// The operator seen from the other side: `a < b` is `b > a`.
    pub fn mirrored(&self) -> CompareOp {
        match self {
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::Ge => CompareOp::Le,
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::Le => CompareOp::Ge,
            other => *other,
        }
    }

    fn from_binary(op: BinaryOp) -> Option<CompareOp> {
        match op {
            BinaryOp::Equal => Some(CompareOp::Eq),
            BinaryOp::NotEqual => Some(CompareOp::Ne),
            BinaryOp::GreaterThan => Some(CompareOp::Gt),
            BinaryOp::GreaterEqual => Some(CompareOp::Ge),
            BinaryOp::LessThan => Some(CompareOp::Lt),
            BinaryOp::LessEqual => Some(CompareOp::Le),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchCondition {
    /// `field op value`; `field` may be dotted to follow relations.
    Compare {
        field: String,
        op: CompareOp,
        value: HostData,
    },
    And(Box<SearchCondition>, Box<SearchCondition>),
    Or(Box<SearchCondition>, Box<SearchCondition>),
}

impl SearchCondition {
    pub fn compare<S: Into<String>>(field: S, op: CompareOp, value: HostData) -> Self {
        SearchCondition::Compare {
            field: field.into(),
            op,
            value,
        }
    }
}

impl fmt::Display for SearchCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchCondition::Compare { field, op, value } => {
                write!(f, "{} {} {}", field, op.symbol(), value)
            }
            SearchCondition::And(a, b) => write!(f, "({} && {})", a, b),
            SearchCondition::Or(a, b) => write!(f, "({} || {})", a, b),
        }
    }
}

/// A field path usable in search conditions, like `library.name`. Every
/// segment is readable in the schema of the entity it is looked up on.
#[derive(Debug, Clone)]
pub struct SearchPath {
    pub field: String,
    /// Entity the last segment refers to, when it is a relation.
    target: Option<String>,
    registry: Rc<SchemaRegistry>,
}

impl SearchPath {
    /// `name` on records of `entity`; `None` when the schema hides it.
    pub fn root(registry: &Rc<SchemaRegistry>, entity: &str, name: &str) -> Option<SearchPath> {
        let schema = registry.get(entity);
        if !schema.can_read(name) {
            return None;
        }
        Some(SearchPath {
            field: name.to_string(),
            target: schema.relation(name).map(|e| e.to_string()),
            registry: registry.clone(),
        })
    }

    /// `self.name`; only relations can be followed.
    pub fn extend(&self, name: &str) -> Option<SearchPath> {
        let next = SearchPath::root(&self.registry, self.target.as_ref()?, name)?;
        Some(SearchPath {
            field: format!("{}.{}", self.field, next.field),
            ..next
        })
    }
}

/// A query, or a bare search name read as `name == true`.
fn as_condition(v: &Value) -> Option<SearchCondition> {
    match v.kind()? {
        Kind::SearchQuery(c) => Some(c.clone()),
        Kind::SearchName(path) => Some(SearchCondition::compare(
            path.field.as_str(),
            CompareOp::Eq,
            HostData::Bool(true),
        )),
        _ => None,
    }
}

fn is_search_kind(v: &Value) -> bool {
    matches!(
        v.kind(),
        Some(Kind::SearchName(_)) | Some(Kind::SearchQuery(_))
    )
}

fn combine(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match (as_condition(left), as_condition(right)) {
        (Some(a), Some(b)) => Value::search_query(match op {
            BinaryOp::LogicalAnd => SearchCondition::And(Box::new(a), Box::new(b)),
            _ => SearchCondition::Or(Box::new(a), Box::new(b)),
        }),
        _ => Value::Undefined,
    }
}

/// `a OP b` where `a` is a search name or query.
pub fn forward(op: BinaryOp, a: &Value, b: &Value) -> Value {
    match op {
        BinaryOp::LogicalAnd | BinaryOp::LogicalOr if is_search_kind(b) => combine(op, a, b),
        BinaryOp::LogicalAnd => land(a, b),
        BinaryOp::LogicalOr => lor(a, b),
        _ => match (a.kind(), CompareOp::from_binary(op)) {
            (Some(Kind::SearchName(path)), Some(cmp)) if !is_search_kind(b) => {
                Value::search_query(SearchCondition::compare(
                    path.field.as_str(),
                    cmp,
                    value_to_host(b),
                ))
            }
            _ => Value::Undefined,
        },
    }
}

/// `left OP right` where `right` is a search name or query.
pub fn reflected(op: BinaryOp, right: &Value, left: &Value) -> Value {
    match op {
        BinaryOp::LogicalAnd | BinaryOp::LogicalOr if is_search_kind(left) => {
            combine(op, left, right)
        }
        _ => match (right.kind(), CompareOp::from_binary(op)) {
            (Some(Kind::SearchName(path)), Some(cmp)) if !is_search_kind(left) => {
                Value::search_query(SearchCondition::compare(
                    path.field.as_str(),
                    cmp.mirrored(),
                    value_to_host(left),
                ))
            }
            _ => Value::Undefined,
        },
    }
}

/// `item in name`: the field holds `item`.
pub fn contains(name: &str, item: &Value) -> Value {
    Value::search_query(SearchCondition::compare(
        name,
        CompareOp::Contains,
        value_to_host(item),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::object::get_attr;
    use crate::runner::ds::operations::binary_op;

    fn book_field(name: &str) -> Value {
        let registry = Rc::new(SchemaRegistry::with_defaults());
        match SearchPath::root(&registry, "Book", name) {
            Some(path) => Value::search_name(path),
            None => Value::Undefined,
        }
    }

    #[test]
    fn test_comparison_builds_query() {
        let year = book_field("year");
        let q = binary_op(BinaryOp::GreaterThan, &year, &Value::int(2000));
        match q.kind() {
            Some(Kind::SearchQuery(c)) => assert_eq!(
                c,
                &SearchCondition::compare("year", CompareOp::Gt, HostData::Int(2000))
            ),
            _ => panic!("expected a query"),
        }
    }

    #[test]
    fn test_reflected_comparison_mirrors() {
        let year = book_field("year");
        let q = binary_op(BinaryOp::LessThan, &Value::int(2000), &year);
        match q.kind() {
            Some(Kind::SearchQuery(c)) => assert_eq!(
                c,
                &SearchCondition::compare("year", CompareOp::Gt, HostData::Int(2000))
            ),
            _ => panic!("expected a query"),
        }
        let q = binary_op(BinaryOp::GreaterEqual, &Value::int(5), &year);
        assert_eq!(q.to_string(), "<query year <= 5>");
    }

    #[test]
    fn test_logical_combination() {
        let a = binary_op(BinaryOp::Equal, &book_field("author"), &Value::string("Ende"));
        let b = book_field("is_active");
        let q = binary_op(BinaryOp::LogicalAnd, &a, &b);
        assert_eq!(
            q.to_string(),
            "<query (author == \"Ende\" && is_active == true)>"
        );
    }

    #[test]
    fn test_paths_follow_readable_relations() {
        let library = book_field("library");
        assert_eq!(get_attr(&library, "name").to_string(), "library.name");
        let borrower = get_attr(&get_attr(&book_field("borrow"), "person"), "last_name");
        assert_eq!(borrower.to_string(), "borrow.person.last_name");
    }

    #[test]
    fn test_paths_stop_at_hidden_fields() {
        assert!(book_field("notes").is_undefined());
        assert!(get_attr(&book_field("library"), "notes").is_undefined());
        assert!(get_attr(&book_field("year"), "name").is_undefined());
        assert!(get_attr(&get_attr(&book_field("borrow"), "person"), "secret").is_undefined());
    }
}
