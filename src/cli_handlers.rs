use crate::core::TypeGraphService;
use crate::models::{TypeDescriptor, TypeId, TypeNode};
use crate::registry::{BUILTINS, TypeRegistry};
use crate::schema::load_registry;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;

/// A node as printed by the CLI
#[derive(Debug, Clone, Serialize)]
pub struct NodeView {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub cyclic: bool,
}

impl NodeView {
    fn new(registry: &TypeRegistry, node: &TypeNode) -> Self {
        NodeView {
            name: describe(registry, &node.ty),
            field: node.field.clone(),
            cyclic: node.cyclic,
        }
    }

    fn label(&self) -> String {
        let marker = if self.cyclic { "[c] " } else { "" };
        match &self.field {
            Some(field) => format!("{marker}{} ({field})", self.name),
            None => format!("{marker}{}", self.name),
        }
    }
}

fn describe(registry: &TypeRegistry, ty: &TypeDescriptor) -> String {
    match ty {
        TypeDescriptor::Concrete { id } => registry.display_name(*id),
        TypeDescriptor::Forward { reference } => match reference.module.as_deref() {
            Some(module) if module != BUILTINS => format!("{module}.{}", reference.name),
            _ => reference.name.clone(),
        },
    }
}

/// Load the schemas and intern the root expression
fn load(schemas: &[PathBuf], root: &str) -> Result<(TypeRegistry, TypeId)> {
    let mut registry = load_registry(schemas)?;
    let root = registry
        .parse_type_expr(root, None)
        .with_context(|| format!("unknown root type `{root}`"))?;
    Ok((registry, root))
}

/// Handle the order command
pub fn handle_order(root: &str, schemas: &[PathBuf], json: bool) -> Result<()> {
    let (registry, root) = load(schemas, root)?;
    let service = TypeGraphService::new(registry);
    let order = service.ordered_dependencies(root)?;

    let views: Vec<NodeView> = order
        .iter()
        .map(|node| NodeView::new(service.collaborator(), node))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    for (position, view) in views.iter().enumerate() {
        println!("{:>3}. {}", position + 1, view.label());
    }

    Ok(())
}

/// Handle the graph command
pub fn handle_graph(root: &str, schemas: &[PathBuf]) -> Result<()> {
    let (registry, root) = load(schemas, root)?;
    let service = TypeGraphService::new(registry);
    let graph = service.type_graph(root)?;

    for (index, node) in graph.nodes().enumerate() {
        let view = NodeView::new(service.collaborator(), node);
        let deps = graph.predecessors(index);
        if deps.is_empty() {
            println!("[{index}] {}", view.label());
        } else {
            let deps_str = deps
                .iter()
                .map(|dep| format!("[{dep}]"))
                .collect::<Vec<_>>()
                .join(", ");
            println!("[{index}] {} <- {deps_str}", view.label());
        }
    }

    Ok(())
}

/// Handle the types command
pub fn handle_types(schemas: &[PathBuf]) -> Result<()> {
    let registry = load_registry(schemas)?;

    let named = registry.named_types();
    if named.is_empty() {
        println!("No types found.");
        return Ok(());
    }

    for (name, id) in named {
        let target = registry.display_name(id);
        if target == name {
            println!("  {name}");
        } else {
            println!("  {name} = {target}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ForwardRef, Primitive};

    #[test]
    fn test_label() {
        let registry = TypeRegistry::new();
        let int = registry.primitive(Primitive::Int);

        let view = NodeView::new(&registry, &TypeNode::new(int, Some("count".into())));
        assert_eq!(view.label(), "int (count)");

        let reference = ForwardRef::new("Node").in_module("app");
        let view = NodeView::new(&registry, &TypeNode::placeholder(reference, None));
        assert_eq!(view.label(), "[c] app.Node");
    }
}
