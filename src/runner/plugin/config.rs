//! Engine configuration file parsing.

use std::fs;
use std::path::Path;

use super::registry::{RecordSchema, SchemaRegistry};
use crate::runner::ds::error::ConfigError;
use crate::runner::vm::interpreter::{Limits, Runtime};

/// Execution limits plus schema overrides layered over the default record
/// schemas.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineConfig {
    pub limits: Limits,
    /// Replace the default schema of the same entity.
    pub schemas: Vec<RecordSchema>,
}

impl EngineConfig {
    pub fn new() -> Self {
        EngineConfig::default()
    }

    /// Load configuration from a file.
    ///
    /// Expected format:
    /// ```text
    /// [limits]
    /// max_instructions = 1000000
    /// max_call_depth = 64
    ///
    /// [schema.Book]
    /// readable = ["id", "title", "author", "library"]
    /// writable = ["title"]
    /// relations = ["library:Library"]
    /// ```
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a string, line by line.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut config = EngineConfig::new();
        let mut current_section = String::new();

        for (i, line) in content.lines().enumerate() {
            let line_no = i + 1;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                current_section = line[1..line.len() - 1].trim().to_string();
                if let Some(entity) = current_section.strip_prefix("schema.") {
                    if entity.is_empty() {
                        return Err(parse_error(line_no, "missing entity name"));
                    }
                    config.schemas.push(RecordSchema::empty(entity));
                } else if current_section != "limits" {
                    return Err(parse_error(
                        line_no,
                        format!("unknown section [{}]", current_section),
                    ));
                }
                continue;
            }

            let (key, value) = match line.find('=') {
                Some(at) => (line[..at].trim(), line[at + 1..].trim()),
                None => return Err(parse_error(line_no, "expected `key = value`")),
            };

            if current_section == "limits" {
                Self::parse_limit(&mut config.limits, key, value)
                    .map_err(|message| parse_error(line_no, message))?;
            } else if let Some(schema) = config.schemas.last_mut() {
                let fields =
                    Self::parse_list(value).map_err(|message| parse_error(line_no, message))?;
                match key {
                    "readable" => schema.readable = fields,
                    "writable" => schema.writable = fields,
                    "relations" => {
                        for field in fields {
                            let (name, entity) = Self::parse_relation(&field)
                                .map_err(|message| parse_error(line_no, message))?;
                            schema.relations.insert(name, entity);
                        }
                    }
                    _ => return Err(parse_error(line_no, format!("unknown key `{}`", key))),
                }
            } else {
                return Err(parse_error(line_no, "key outside of a section"));
            }
        }

        Ok(config)
    }

    fn parse_limit(limits: &mut Limits, key: &str, value: &str) -> Result<(), String> {
        let n: u64 = value
            .parse()
            .map_err(|_| format!("`{}` is not a non-negative integer", value))?;
        match key {
            "max_instructions" => limits.max_instructions = Some(n),
            "max_call_depth" => limits.max_call_depth = n as usize,
            _ => return Err(format!("unknown key `{}`", key)),
        }
        Ok(())
    }

    /// Parse a list like: ["id", "title"]
    fn parse_list(value: &str) -> Result<Vec<String>, String> {
        let inner = value
            .strip_prefix('[')
            .and_then(|v| v.strip_suffix(']'))
            .ok_or_else(|| format!("expected a list, found `{}`", value))?;
        inner
            .split(',')
            .map(|item| item.trim())
            .filter(|item| !item.is_empty())
            .map(|item| {
                item.strip_prefix('"')
                    .and_then(|i| i.strip_suffix('"'))
                    .map(|i| i.to_string())
                    .ok_or_else(|| format!("expected a quoted name, found `{}`", item))
            })
            .collect()
    }

    /// Parse a relation like `library:Library`.
    fn parse_relation(item: &str) -> Result<(String, String), String> {
        match item.find(':') {
            Some(at) if at > 0 && at + 1 < item.len() => Ok((
                item[..at].trim().to_string(),
                item[at + 1..].trim().to_string(),
            )),
            _ => Err(format!("expected `field:Entity`, found `{}`", item)),
        }
    }

    /// Default schemas with this configuration's overrides applied.
    pub fn schema_registry(&self) -> SchemaRegistry {
        let mut registry = SchemaRegistry::with_defaults();
        for schema in &self.schemas {
            registry.insert(schema.clone());
        }
        registry
    }

    /// A runtime carrying these limits, printing to stdout.
    pub fn runtime(&self) -> Runtime {
        Runtime::new().with_limits(self.limits)
    }
}

fn parse_error<S: Into<String>>(line: usize, message: S) -> ConfigError {
    ConfigError::Parse {
        line,
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_limits_and_schemas() {
        let config = EngineConfig::parse(
            r#"
            # engine settings
            [limits]
            max_instructions = 5000
            max_call_depth = 16

            [schema.Book]
            readable = ["id", "title"]
            writable = ["title"]
            "#,
        )
        .unwrap();
        assert_eq!(config.limits.max_instructions, Some(5000));
        assert_eq!(config.limits.max_call_depth, 16);
        let registry = config.schema_registry();
        let book = registry.get("Book");
        assert!(book.can_read("title"));
        assert!(book.can_write("title"));
        assert!(!book.can_read("author"));
        assert!(registry.get("Person").can_read("first_name"));
    }

    #[test]
    fn test_parse_errors_carry_line_numbers() {
        let err = EngineConfig::parse("[limits]\nmax_instructions = lots").unwrap_err();
        match err {
            ConfigError::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error {:?}", other),
        }
        assert!(EngineConfig::parse("[colors]").is_err());
        assert!(EngineConfig::parse("[schema.Book]\nreadable = id").is_err());
        assert!(EngineConfig::parse("[schema.Book]\nrelations = [\"library\"]").is_err());
    }

    #[test]
    fn test_parse_relations() {
        let config = EngineConfig::parse(
            r#"
            [schema.Book]
            readable = ["title", "library"]
            relations = ["library:Library"]
            "#,
        )
        .unwrap();
        let registry = config.schema_registry();
        assert_eq!(registry.get("Book").relation("library"), Some("Library"));
        assert_eq!(registry.get("Book").relation("borrow"), None);
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::parse("").unwrap();
        assert_eq!(config.limits, Limits::default());
        assert!(config.schemas.is_empty());
    }
}
