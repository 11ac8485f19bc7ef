//! JSON schema files describing structured types and aliases.
//!
//! ```json
//! {
//!   "module": "app.models",
//!   "types": {
//!     "Node": { "fields": { "value": "int", "next": "optional[Node]" } },
//!     "IntList": { "alias": "list[int]" }
//!   }
//! }
//! ```

use crate::error::{Result, TypeGraphError};
use crate::models::TypeId;
use crate::registry::TypeRegistry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// One schema file: a module and the types it declares, in file order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaFile {
    pub module: String,
    #[serde(default)]
    pub types: IndexMap<String, TypeDef>,
}

/// A declared type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged, deny_unknown_fields)]
pub enum TypeDef {
    /// Structured type with named fields, each a type expression
    Struct { fields: IndexMap<String, String> },
    /// Another name for a type expression
    Alias { alias: String },
}

impl SchemaFile {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Register every type of this file.
    ///
    /// Structs are declared up front so fields may refer to any struct of
    /// the file, including the one being defined. Aliases and fields are then
    /// processed in file order, so an alias must come after what it names.
    /// On error `registry` is left as it was.
    pub fn load_into(&self, registry: &mut TypeRegistry) -> Result<Vec<TypeId>> {
        let mut staged = registry.clone();
        let loaded = self.define_all(&mut staged)?;
        *registry = staged;
        Ok(loaded)
    }

    fn define_all(&self, registry: &mut TypeRegistry) -> Result<Vec<TypeId>> {
        let module = self.module.as_str();

        for (name, def) in &self.types {
            if let TypeDef::Struct { .. } = def {
                registry.declare_struct(module, name)?;
            }
        }

        let mut loaded = Vec::with_capacity(self.types.len());
        for (name, def) in &self.types {
            match def {
                TypeDef::Struct { fields } => {
                    let id = registry
                        .lookup(name, Some(module))
                        .ok_or_else(|| TypeGraphError::unresolvable(name, Some(module)))?;
                    let fields = fields
                        .iter()
                        .map(|(field, expr)| {
                            Ok((field.clone(), registry.parse_type_expr(expr, Some(module))?))
                        })
                        .collect::<Result<Vec<_>>>()?;
                    registry.define_fields(id, fields)?;
                    loaded.push(id);
                }
                TypeDef::Alias { alias } => {
                    let target = registry.parse_type_expr(alias, Some(module))?;
                    registry.alias(module, name, target)?;
                    loaded.push(target);
                }
            }
        }

        debug!(module, types = loaded.len(), "loaded schema");
        Ok(loaded)
    }
}

/// Build a registry from schema files, loaded in order.
///
/// Failures are wrapped in [`TypeGraphError::Schema`] naming the file.
pub fn load_registry<P: AsRef<Path>>(paths: &[P]) -> Result<TypeRegistry> {
    let mut registry = TypeRegistry::new();
    for path in paths {
        let path = path.as_ref();
        SchemaFile::from_path(path)
            .and_then(|schema| schema.load_into(&mut registry))
            .map_err(|e| TypeGraphError::schema(path, e))?;
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Primitive;
    use crate::registry::{Introspect, Resolve};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MODELS: &str = r#"{
        "module": "app.models",
        "types": {
            "Node": { "fields": { "value": "int", "next": "optional[Node]" } },
            "IntList": { "alias": "list[int]" },
            "Bag": { "fields": { "zeta": "IntList", "alpha": "dict[str, Node]" } }
        }
    }"#;

    #[test]
    fn test_load_models() {
        let mut registry = TypeRegistry::new();
        let schema = SchemaFile::from_json(MODELS).unwrap();
        let loaded = schema.load_into(&mut registry).unwrap();
        assert_eq!(loaded.len(), 3);

        let node = registry.resolve("Node", Some("app.models")).unwrap();
        let members = registry.structured_members(node).unwrap();
        assert_eq!(members[0], ("value".to_owned(), registry.primitive(Primitive::Int)));
        assert_eq!(registry.qualified_name(members[1].1), "optional[app.models.Node]");

        let ints = registry.resolve("app.models.IntList", None).unwrap();
        assert_eq!(registry.qualified_name(ints), "list[int]");
    }

    #[test]
    fn test_field_order_follows_file() {
        let mut registry = TypeRegistry::new();
        SchemaFile::from_json(MODELS)
            .unwrap()
            .load_into(&mut registry)
            .unwrap();

        let bag = registry.resolve("app.models.Bag", None).unwrap();
        let names: Vec<String> = registry
            .structured_members(bag)
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_unknown_field_type() {
        let mut registry = TypeRegistry::new();
        let schema = SchemaFile::from_json(
            r#"{ "module": "app", "types": { "A": { "fields": { "b": "Missing" } } } }"#,
        )
        .unwrap();

        assert!(matches!(
            schema.load_into(&mut registry),
            Err(TypeGraphError::UnresolvableReference { name, .. }) if name == "Missing"
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            SchemaFile::from_json("{ \"module\": 3 }"),
            Err(TypeGraphError::Json(_))
        ));
    }

    #[test]
    fn test_load_registry_across_files() {
        let mut first = NamedTempFile::new().unwrap();
        write!(
            first,
            r#"{{ "module": "base", "types": {{ "Id": {{ "alias": "uuid" }} }} }}"#
        )
        .unwrap();
        let mut second = NamedTempFile::new().unwrap();
        write!(
            second,
            r#"{{ "module": "app", "types": {{ "User": {{ "fields": {{ "id": "base.Id" }} }} }} }}"#
        )
        .unwrap();

        let registry = load_registry(&[first.path(), second.path()]).unwrap();
        let user = registry.resolve("app.User", None).unwrap();
        assert_eq!(
            registry.structured_members(user).unwrap(),
            vec![("id".to_owned(), registry.primitive(Primitive::Uuid))]
        );
    }

    #[test]
    fn test_missing_file() {
        let err = load_registry(&["/nonexistent/schema.json"]).unwrap_err();
        assert_eq!(err.to_string(), "failed to load schema /nonexistent/schema.json");
        assert!(matches!(
            err,
            TypeGraphError::Schema { source, .. } if matches!(*source, TypeGraphError::Io(_))
        ));
    }

    #[test]
    fn test_mixed_definition_rejected() {
        let mixed = r#"{
            "module": "app",
            "types": { "A": { "fields": { "b": "int" }, "alias": "int" } }
        }"#;
        assert!(matches!(SchemaFile::from_json(mixed), Err(TypeGraphError::Json(_))));

        let misspelled = r#"{ "module": "app", "types": { "A": { "feilds": {} } } }"#;
        assert!(matches!(SchemaFile::from_json(misspelled), Err(TypeGraphError::Json(_))));

        let alias_extra = r#"{ "module": "app", "types": { "A": { "alias": "int", "x": 1 } } }"#;
        assert!(matches!(SchemaFile::from_json(alias_extra), Err(TypeGraphError::Json(_))));
    }

    #[test]
    fn test_failed_load_leaves_registry_untouched() {
        let mut registry = TypeRegistry::new();
        let before = registry.len();
        let schema = SchemaFile::from_json(
            r#"{
                "module": "app",
                "types": {
                    "Good": { "fields": { "value": "int" } },
                    "Bad": { "fields": { "other": "Missing" } }
                }
            }"#,
        )
        .unwrap();

        assert!(schema.load_into(&mut registry).is_err());
        assert_eq!(registry.len(), before);
        assert_eq!(registry.lookup("Good", Some("app")), None);
        assert_eq!(registry.lookup("Bad", Some("app")), None);

        SchemaFile::from_json(MODELS)
            .unwrap()
            .load_into(&mut registry)
            .unwrap();
        assert!(registry.resolve("app.models.Node", None).is_ok());
    }
}
