//! Record schemas (per-entity attribute allow-lists) and the environment
//! that installs host objects into a script's globals.

use std::rc::Rc;

use indexmap::IndexMap;

use super::record::{NamespaceWrapper, UiWrapper};
use super::types::{ActionNamespace, UiCallbacks};
use crate::runner::ds::scope::Scope;
use crate::runner::ds::value::{Kind, Value};

/// What scripts may read from and write to records of one entity.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordSchema {
    pub entity: String,
    pub readable: Vec<String>,
    pub writable: Vec<String>,
    /// Fields holding records of another entity, keyed by field name.
    pub relations: IndexMap<String, String>,
}

impl RecordSchema {
    pub fn new(entity: &str, readable: &[&str], writable: &[&str]) -> Self {
        RecordSchema {
            entity: entity.to_string(),
            readable: readable.iter().map(|s| s.to_string()).collect(),
            writable: writable.iter().map(|s| s.to_string()).collect(),
            relations: IndexMap::new(),
        }
    }

    pub fn with_relation(mut self, field: &str, entity: &str) -> Self {
        self.relations.insert(field.to_string(), entity.to_string());
        self
    }

    /// A schema exposing nothing, used for entities without one.
    pub fn empty(entity: &str) -> Self {
        RecordSchema {
            entity: entity.to_string(),
            ..RecordSchema::default()
        }
    }

    pub fn can_read(&self, field: &str) -> bool {
        self.readable.iter().any(|f| f == field)
    }

    pub fn can_write(&self, field: &str) -> bool {
        self.writable.iter().any(|f| f == field)
    }

    /// Entity of the records behind a readable relation field.
    pub fn relation(&self, field: &str) -> Option<&str> {
        if !self.can_read(field) {
            return None;
        }
        self.relations.get(field).map(|e| e.as_str())
    }
}

lazy_static! {
    static ref DEFAULT_SCHEMAS: Vec<(&'static str, Vec<&'static str>)> = vec![
        (
            "Book",
            vec![
                "id", "isbn", "author", "title", "series", "series_number", "language",
                "publisher", "concerned_people", "year", "medium", "genres", "shelf",
                "is_active", "groups", "library", "borrow",
            ],
        ),
        (
            "Person",
            vec![
                "id", "first_name", "last_name", "class_", "max_borrow", "pay_date",
                "libraries", "borrows",
            ],
        ),
        ("Library", vec!["name", "pay_required", "books", "people"]),
        ("Group", vec!["name", "books"]),
        ("Borrow", vec!["id", "return_date", "is_back", "book", "person"]),
        ("Member", vec!["name", "level"]),
    ];
    static ref DEFAULT_RELATIONS: Vec<(&'static str, &'static str, &'static str)> = vec![
        ("Book", "groups", "Group"),
        ("Book", "library", "Library"),
        ("Book", "borrow", "Borrow"),
        ("Person", "libraries", "Library"),
        ("Person", "borrows", "Borrow"),
        ("Library", "books", "Book"),
        ("Library", "people", "Person"),
        ("Group", "books", "Book"),
        ("Borrow", "book", "Book"),
        ("Borrow", "person", "Person"),
    ];
}

#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: IndexMap<String, Rc<RecordSchema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        SchemaRegistry::default()
    }

    /// Read-only schemas for the library entities.
    pub fn with_defaults() -> Self {
        let mut registry = SchemaRegistry::new();
        for (entity, readable) in DEFAULT_SCHEMAS.iter() {
            let schema = DEFAULT_RELATIONS
                .iter()
                .filter(|(owner, _, _)| owner == entity)
                .fold(RecordSchema::new(entity, readable, &[]), |schema, (_, field, target)| {
                    schema.with_relation(field, target)
                });
            registry.insert(schema);
        }
        registry
    }

    /// Add or replace the schema of `schema.entity`.
    pub fn insert(&mut self, schema: RecordSchema) {
        self.schemas.insert(schema.entity.clone(), Rc::new(schema));
    }

    pub fn get(&self, entity: &str) -> Rc<RecordSchema> {
        match self.schemas.get(entity) {
            Some(schema) => schema.clone(),
            None => Rc::new(RecordSchema::empty(entity)),
        }
    }

    pub fn entities(&self) -> Vec<&str> {
        self.schemas.keys().map(|k| k.as_str()).collect()
    }
}

/// Collects the host objects a script may see and installs them as globals:
/// each action namespace under its entity name, the UI callbacks as `ui`.
pub struct HostEnvironment {
    registry: Rc<SchemaRegistry>,
    namespaces: Vec<Rc<dyn ActionNamespace>>,
    ui: Option<Rc<dyn UiCallbacks>>,
}

impl HostEnvironment {
    pub fn new(registry: SchemaRegistry) -> Self {
        HostEnvironment {
            registry: Rc::new(registry),
            namespaces: vec![],
            ui: None,
        }
    }

    pub fn with_namespace(mut self, namespace: Rc<dyn ActionNamespace>) -> Self {
        self.namespaces.push(namespace);
        self
    }

    pub fn with_ui(mut self, ui: Rc<dyn UiCallbacks>) -> Self {
        self.ui = Some(ui);
        self
    }

    pub fn registry(&self) -> &Rc<SchemaRegistry> {
        &self.registry
    }

    pub fn install(&self, globals: &Scope) {
        for ns in &self.namespaces {
            let wrapper = NamespaceWrapper::new(ns.clone(), self.registry.clone());
            globals.set(ns.entity(), Value::from_kind(Kind::ActionNamespace(wrapper)));
        }
        if let Some(ui) = &self.ui {
            globals.set("ui", Value::from_kind(Kind::Ui(UiWrapper::new(ui.clone()))));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schemas() {
        let registry = SchemaRegistry::with_defaults();
        assert!(registry.get("Book").can_read("title"));
        assert!(!registry.get("Book").can_write("title"));
        assert!(registry.get("Borrow").can_read("person"));
        assert!(!registry.get("Unknown").can_read("id"));
        assert_eq!(registry.entities().len(), 6);
    }

    #[test]
    fn test_default_relations() {
        let registry = SchemaRegistry::with_defaults();
        assert_eq!(registry.get("Book").relation("library"), Some("Library"));
        assert_eq!(registry.get("Borrow").relation("person"), Some("Person"));
        assert_eq!(registry.get("Book").relation("title"), None);

        let hidden = RecordSchema::new("Book", &["id"], &[]).with_relation("library", "Library");
        assert_eq!(hidden.relation("library"), None);
    }
}
