use crate::error::{Result, TypeGraphError};
use crate::models::{ForwardRef, GenericOrigin, Primitive, TypeId, TypeInfo, TypeKind};
use std::collections::HashMap;

/// Namespace holding primitives, generic origins and their parameterizations
pub const BUILTINS: &str = "builtins";

/// Read-only view of a type's structure, used by the graph builder
pub trait Introspect {
    /// Generic type arguments in order. Empty for anything that isn't parameterized.
    fn type_arguments(&self, ty: TypeId) -> Result<Vec<TypeId>>;

    /// Named members in declaration order. Empty for non-structured types.
    fn structured_members(&self, ty: TypeId) -> Result<Vec<(String, TypeId)>>;

    /// True for "no type information" and "anything goes" markers
    fn is_unconstrained(&self, ty: TypeId) -> bool;

    fn is_builtin_primitive(&self, ty: TypeId) -> bool;

    fn is_parameterized_generic(&self, ty: TypeId) -> bool;

    fn qualified_name(&self, ty: TypeId) -> String;

    fn module(&self, ty: TypeId) -> Option<String>;

    fn is_class(&self, ty: TypeId) -> bool;
}

/// Name lookup for forward references
pub trait Resolve {
    fn resolve(&self, name: &str, namespace: Option<&str>) -> Result<TypeId>;

    fn resolve_ref(&self, reference: &ForwardRef) -> Result<TypeId> {
        self.resolve(&reference.name, reference.module.as_deref())
    }
}

/// A parsed `name` or `name[arg, ...]` type expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeExpr {
    pub name: String,
    pub args: Vec<TypeExpr>,
}

/// Explicit namespace registry of every type known to the process.
///
/// Populated at startup, then shared read-only.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: Vec<TypeInfo>,
    names: HashMap<(String, String), TypeId>,
    generics: HashMap<(GenericOrigin, Vec<TypeId>), TypeId>,
    primitives: HashMap<Primitive, TypeId>,
    origins: HashMap<GenericOrigin, TypeId>,
    any: TypeId,
    empty: TypeId,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Create a registry with every builtin registered
    pub fn new() -> Self {
        let mut registry = TypeRegistry {
            types: Vec::new(),
            names: HashMap::new(),
            generics: HashMap::new(),
            primitives: HashMap::new(),
            origins: HashMap::new(),
            any: TypeId(0),
            empty: TypeId(0),
        };

        registry.empty = registry.push_builtin("empty", TypeKind::Empty);
        registry.any = registry.push_builtin("any", TypeKind::Any);
        for primitive in Primitive::ALL {
            let id = registry.push_builtin(primitive.as_str(), TypeKind::Primitive(primitive));
            registry.primitives.insert(primitive, id);
        }
        for origin in GenericOrigin::ALL {
            let id = registry.push_builtin(
                origin.as_str(),
                TypeKind::Generic {
                    origin,
                    args: Vec::new(),
                },
            );
            registry.origins.insert(origin, id);
        }

        registry
    }

    fn push(&mut self, info: TypeInfo) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(info);
        id
    }

    fn push_builtin(&mut self, name: &str, kind: TypeKind) -> TypeId {
        let id = self.push(TypeInfo {
            name: name.to_owned(),
            module: Some(BUILTINS.to_owned()),
            kind,
        });
        self.names.insert((BUILTINS.to_owned(), name.to_owned()), id);
        id
    }

    pub fn get(&self, ty: TypeId) -> Option<&TypeInfo> {
        self.types.get(ty.0 as usize)
    }

    fn info(&self, ty: TypeId) -> Result<&TypeInfo> {
        self.get(ty).ok_or_else(|| TypeGraphError::UninspectableType {
            ty: ty.to_string(),
            reason: "not registered".to_owned(),
        })
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn primitive(&self, primitive: Primitive) -> TypeId {
        self.primitives[&primitive]
    }

    pub fn any(&self) -> TypeId {
        self.any
    }

    pub fn empty(&self) -> TypeId {
        self.empty
    }

    /// The bare, unparameterized origin
    pub fn origin(&self, origin: GenericOrigin) -> TypeId {
        self.origins[&origin]
    }

    /// Intern a parameterization. Equal arguments always give the same id.
    pub fn generic(&mut self, origin: GenericOrigin, args: Vec<TypeId>) -> Result<TypeId> {
        if args.is_empty() {
            return Ok(self.origin(origin));
        }
        if let Some(&id) = self.generics.get(&(origin, args.clone())) {
            return Ok(id);
        }

        let rendered = args
            .iter()
            .map(|&arg| self.info(arg).map(full_name))
            .collect::<Result<Vec<_>>>()?
            .join(", ");
        let name = format!("{origin}[{rendered}]");

        let id = self.push(TypeInfo {
            name: name.clone(),
            module: Some(BUILTINS.to_owned()),
            kind: TypeKind::Generic {
                origin,
                args: args.clone(),
            },
        });
        self.generics.insert((origin, args), id);
        self.names.insert((BUILTINS.to_owned(), name), id);
        Ok(id)
    }

    /// Reserve a name for a structured type whose fields come later
    pub fn declare_struct(&mut self, module: &str, name: &str) -> Result<TypeId> {
        let key = (module.to_owned(), name.to_owned());
        if self.names.contains_key(&key) {
            return Err(TypeGraphError::AlreadyDefined(format!("{module}.{name}")));
        }

        let id = self.push(TypeInfo {
            name: name.to_owned(),
            module: Some(module.to_owned()),
            kind: TypeKind::Structured { fields: None },
        });
        self.names.insert(key, id);
        Ok(id)
    }

    pub fn define_fields(&mut self, ty: TypeId, fields: Vec<(String, TypeId)>) -> Result<()> {
        let len = self.types.len();
        for (_, field_ty) in &fields {
            if field_ty.0 as usize >= len {
                return Err(TypeGraphError::UnknownType(field_ty.0));
            }
        }

        let info = self
            .types
            .get_mut(ty.0 as usize)
            .ok_or(TypeGraphError::UnknownType(ty.0))?;
        let name = full_name(info);
        match &mut info.kind {
            TypeKind::Structured { fields: slot } if slot.is_none() => {
                *slot = Some(fields);
                Ok(())
            }
            TypeKind::Structured { .. } => Err(TypeGraphError::AlreadyDefined(name)),
            _ => Err(TypeGraphError::UninspectableType {
                ty: name,
                reason: "not a structured type".to_owned(),
            }),
        }
    }

    /// Declare and define a structured type in one step
    pub fn define_struct(
        &mut self,
        module: &str,
        name: &str,
        fields: Vec<(String, TypeId)>,
    ) -> Result<TypeId> {
        let id = self.declare_struct(module, name)?;
        self.define_fields(id, fields)?;
        Ok(id)
    }

    /// Register another name for an existing type
    pub fn alias(&mut self, module: &str, name: &str, target: TypeId) -> Result<()> {
        if target.0 as usize >= self.types.len() {
            return Err(TypeGraphError::UnknownType(target.0));
        }
        let key = (module.to_owned(), name.to_owned());
        if self.names.contains_key(&key) {
            return Err(TypeGraphError::AlreadyDefined(format!("{module}.{name}")));
        }
        self.names.insert(key, target);
        Ok(())
    }

    /// Look up a single identifier, optionally dotted
    pub fn lookup(&self, name: &str, namespace: Option<&str>) -> Option<TypeId> {
        if let Some(ns) = namespace {
            if let Some(&id) = self.names.get(&(ns.to_owned(), name.to_owned())) {
                return Some(id);
            }
        }
        if let Some(&id) = self.names.get(&(BUILTINS.to_owned(), name.to_owned())) {
            return Some(id);
        }
        let (module, short) = name.rsplit_once('.')?;
        self.names
            .get(&(module.to_owned(), short.to_owned()))
            .copied()
    }

    /// Parse and intern a type expression such as `dict[str, list[Node]]`
    pub fn parse_type_expr(&mut self, expr: &str, namespace: Option<&str>) -> Result<TypeId> {
        let parsed = parse_type_expr(expr)?;
        self.intern_expr(&parsed, namespace)
    }

    fn intern_expr(&mut self, expr: &TypeExpr, namespace: Option<&str>) -> Result<TypeId> {
        let base = self
            .lookup(&expr.name, namespace)
            .ok_or_else(|| TypeGraphError::unresolvable(&expr.name, namespace))?;
        if expr.args.is_empty() {
            return Ok(base);
        }

        let origin = self.bare_origin(base, &expr.name)?;
        let args = expr
            .args
            .iter()
            .map(|arg| self.intern_expr(arg, namespace))
            .collect::<Result<Vec<_>>>()?;
        self.generic(origin, args)
    }

    /// Like `intern_expr`, but only finds parameterizations that already exist
    fn lookup_expr(&self, expr: &TypeExpr, namespace: Option<&str>) -> Result<TypeId> {
        let base = self
            .lookup(&expr.name, namespace)
            .ok_or_else(|| TypeGraphError::unresolvable(&expr.name, namespace))?;
        if expr.args.is_empty() {
            return Ok(base);
        }

        let origin = self.bare_origin(base, &expr.name)?;
        let args = expr
            .args
            .iter()
            .map(|arg| self.lookup_expr(arg, namespace))
            .collect::<Result<Vec<_>>>()?;
        self.generics
            .get(&(origin, args))
            .copied()
            .ok_or_else(|| TypeGraphError::unresolvable(render_expr(expr), namespace))
    }

    fn bare_origin(&self, base: TypeId, name: &str) -> Result<GenericOrigin> {
        match self.get(base).map(|info| &info.kind) {
            Some(TypeKind::Generic { origin, args }) if args.is_empty() => Ok(*origin),
            _ => Err(TypeGraphError::invalid_expr(
                name,
                "type arguments given to a non-generic type",
            )),
        }
    }

    /// Every named type outside the builtins namespace, sorted by qualified name
    pub fn named_types(&self) -> Vec<(String, TypeId)> {
        let mut named: Vec<(String, TypeId)> = self
            .names
            .iter()
            .filter(|((module, _), _)| module != BUILTINS)
            .map(|((module, name), &id)| (format!("{module}.{name}"), id))
            .collect();
        named.sort();
        named
    }

    /// `module.Name` for user types, the bare name for builtins
    pub fn display_name(&self, ty: TypeId) -> String {
        self.get(ty).map(full_name).unwrap_or_else(|| ty.to_string())
    }
}

fn full_name(info: &TypeInfo) -> String {
    match info.module.as_deref() {
        Some(module) if module != BUILTINS => format!("{module}.{}", info.name),
        _ => info.name.clone(),
    }
}

fn render_expr(expr: &TypeExpr) -> String {
    if expr.args.is_empty() {
        return expr.name.clone();
    }
    let args = expr
        .args
        .iter()
        .map(render_expr)
        .collect::<Vec<_>>()
        .join(", ");
    format!("{}[{args}]", expr.name)
}

impl Introspect for TypeRegistry {
    fn type_arguments(&self, ty: TypeId) -> Result<Vec<TypeId>> {
        match &self.info(ty)?.kind {
            TypeKind::Generic { args, .. } => Ok(args.clone()),
            _ => Ok(Vec::new()),
        }
    }

    fn structured_members(&self, ty: TypeId) -> Result<Vec<(String, TypeId)>> {
        let info = self.info(ty)?;
        match &info.kind {
            TypeKind::Structured { fields: Some(fields) } => Ok(fields.clone()),
            TypeKind::Structured { fields: None } => Err(TypeGraphError::UninspectableType {
                ty: full_name(info),
                reason: "declared but its fields were never defined".to_owned(),
            }),
            _ => Ok(Vec::new()),
        }
    }

    fn is_unconstrained(&self, ty: TypeId) -> bool {
        matches!(
            self.get(ty).map(|info| &info.kind),
            Some(TypeKind::Empty | TypeKind::Any)
        )
    }

    fn is_builtin_primitive(&self, ty: TypeId) -> bool {
        !matches!(
            self.get(ty).map(|info| &info.kind),
            None | Some(TypeKind::Structured { .. })
        )
    }

    fn is_parameterized_generic(&self, ty: TypeId) -> bool {
        matches!(
            self.get(ty).map(|info| &info.kind),
            Some(TypeKind::Generic { args, .. }) if !args.is_empty()
        )
    }

    fn qualified_name(&self, ty: TypeId) -> String {
        self.get(ty)
            .map(|info| info.name.clone())
            .unwrap_or_else(|| ty.to_string())
    }

    fn module(&self, ty: TypeId) -> Option<String> {
        self.get(ty).and_then(|info| info.module.clone())
    }

    fn is_class(&self, ty: TypeId) -> bool {
        match self.get(ty).map(|info| &info.kind) {
            Some(TypeKind::Primitive(_) | TypeKind::Structured { .. }) => true,
            Some(TypeKind::Generic { args, .. }) => args.is_empty(),
            _ => false,
        }
    }
}

impl Resolve for TypeRegistry {
    fn resolve(&self, name: &str, namespace: Option<&str>) -> Result<TypeId> {
        if let Some(id) = self.lookup(name, namespace) {
            return Ok(id);
        }
        // Parameterized names such as `list[app.Node]` are matched structurally
        if name.contains('[') {
            let parsed = parse_type_expr(name)?;
            return self.lookup_expr(&parsed, namespace);
        }
        Err(TypeGraphError::unresolvable(name, namespace))
    }
}

/// Parse `name` / `name[arg, ...]` without resolving any names
pub fn parse_type_expr(input: &str) -> Result<TypeExpr> {
    let mut parser = ExprParser {
        input,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expr()?;
    parser.skip_ws();
    if parser.pos != input.len() {
        return Err(TypeGraphError::invalid_expr(
            input,
            format!("unexpected input at offset {}", parser.pos),
        ));
    }
    Ok(expr)
}

/// Deepest bracket nesting accepted in a type expression
const MAX_EXPR_DEPTH: usize = 128;

struct ExprParser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
}

impl ExprParser<'_> {
    fn skip_ws(&mut self) {
        let rest = &self.input[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn ident(&mut self) -> Result<String> {
        self.skip_ws();
        let rest = &self.input[self.pos..];
        let len = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'))
            .unwrap_or(rest.len());
        if len == 0 {
            return Err(TypeGraphError::invalid_expr(
                self.input,
                format!("expected a type name at offset {}", self.pos),
            ));
        }
        self.pos += len;
        Ok(rest[..len].to_owned())
    }

    fn expr(&mut self) -> Result<TypeExpr> {
        let name = self.ident()?;
        let mut args = Vec::new();

        self.skip_ws();
        if self.peek() == Some('[') {
            if self.depth == MAX_EXPR_DEPTH {
                return Err(TypeGraphError::invalid_expr(
                    self.input,
                    "type expression nested too deeply",
                ));
            }
            self.pos += 1;
            self.depth += 1;
            loop {
                args.push(self.expr()?);
                self.skip_ws();
                match self.peek() {
                    Some(',') => self.pos += 1,
                    Some(']') => {
                        self.pos += 1;
                        self.depth -= 1;
                        break;
                    }
                    _ => {
                        return Err(TypeGraphError::invalid_expr(
                            self.input,
                            format!("expected `,` or `]` at offset {}", self.pos),
                        ));
                    }
                }
            }
        }

        Ok(TypeExpr { name, args })
    }
}
