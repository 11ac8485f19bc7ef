use serde::{Deserialize, Serialize};
use std::fmt;

/// Interned handle for a concrete type in a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Built-in scalar types. These never participate in cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Primitive {
    None,
    Bool,
    Int,
    Float,
    Str,
    Bytes,
    ByteArray,
    MemoryView,
    Decimal,
    Fraction,
    Date,
    DateTime,
    Time,
    TimeDelta,
    Uuid,
    Path,
    Pattern,
}

impl Primitive {
    pub const ALL: [Primitive; 17] = [
        Primitive::None,
        Primitive::Bool,
        Primitive::Int,
        Primitive::Float,
        Primitive::Str,
        Primitive::Bytes,
        Primitive::ByteArray,
        Primitive::MemoryView,
        Primitive::Decimal,
        Primitive::Fraction,
        Primitive::Date,
        Primitive::DateTime,
        Primitive::Time,
        Primitive::TimeDelta,
        Primitive::Uuid,
        Primitive::Path,
        Primitive::Pattern,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Primitive::None => "none",
            Primitive::Bool => "bool",
            Primitive::Int => "int",
            Primitive::Float => "float",
            Primitive::Str => "str",
            Primitive::Bytes => "bytes",
            Primitive::ByteArray => "bytearray",
            Primitive::MemoryView => "memoryview",
            Primitive::Decimal => "decimal",
            Primitive::Fraction => "fraction",
            Primitive::Date => "date",
            Primitive::DateTime => "datetime",
            Primitive::Time => "time",
            Primitive::TimeDelta => "timedelta",
            Primitive::Uuid => "uuid",
            Primitive::Path => "path",
            Primitive::Pattern => "pattern",
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Container origins that accept type arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenericOrigin {
    List,
    Set,
    FrozenSet,
    Tuple,
    Dict,
    Optional,
    Union,
}

impl GenericOrigin {
    pub const ALL: [GenericOrigin; 7] = [
        GenericOrigin::List,
        GenericOrigin::Set,
        GenericOrigin::FrozenSet,
        GenericOrigin::Tuple,
        GenericOrigin::Dict,
        GenericOrigin::Optional,
        GenericOrigin::Union,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GenericOrigin::List => "list",
            GenericOrigin::Set => "set",
            GenericOrigin::FrozenSet => "frozenset",
            GenericOrigin::Tuple => "tuple",
            GenericOrigin::Dict => "dict",
            GenericOrigin::Optional => "optional",
            GenericOrigin::Union => "union",
        }
    }
}

impl fmt::Display for GenericOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for GenericOrigin {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        GenericOrigin::ALL
            .into_iter()
            .find(|origin| origin.as_str() == s)
            .ok_or_else(|| format!("Unknown generic origin: {s}"))
    }
}

/// Shape of a concrete type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// No type information at all
    Empty,
    /// Explicit "anything goes" marker
    Any,
    Primitive(Primitive),
    /// A container origin, bare when `args` is empty
    Generic {
        origin: GenericOrigin,
        args: Vec<TypeId>,
    },
    /// Named members in declaration order. `None` until fields are defined.
    Structured {
        fields: Option<Vec<(String, TypeId)>>,
    },
}

/// Everything the registry knows about one concrete type
#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub name: String,
    pub module: Option<String>,
    pub kind: TypeKind,
}

/// A lazy reference to a type, resolved by name within a namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForwardRef {
    pub name: String,
    pub module: Option<String>,
    pub is_argument: bool,
    pub is_class: bool,
}

impl ForwardRef {
    /// A plain reference by name, with no namespace hint
    pub fn new(name: impl Into<String>) -> Self {
        ForwardRef {
            name: name.into(),
            module: None,
            is_argument: false,
            is_class: false,
        }
    }

    pub fn in_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }
}

impl fmt::Display for ForwardRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.module {
            Some(module) => write!(f, "ForwardRef({module}.{})", self.name),
            None => write!(f, "ForwardRef({})", self.name),
        }
    }
}

/// What a graph vertex points at: a concrete type or a lazy reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeDescriptor {
    Concrete { id: TypeId },
    Forward { reference: ForwardRef },
}

impl TypeDescriptor {
    pub fn concrete_id(&self) -> Option<TypeId> {
        match self {
            TypeDescriptor::Concrete { id } => Some(*id),
            TypeDescriptor::Forward { .. } => None,
        }
    }
}

impl From<TypeId> for TypeDescriptor {
    fn from(id: TypeId) -> Self {
        TypeDescriptor::Concrete { id }
    }
}

impl From<ForwardRef> for TypeDescriptor {
    fn from(reference: ForwardRef) -> Self {
        TypeDescriptor::Forward { reference }
    }
}

/// A vertex in a type graph.
///
/// The derived `PartialEq`/`Hash` compare all three fields. Visitation uses
/// [`TypeNode::vertex_key`] instead, which only looks at the descriptor, so a
/// type seen under a different field label is still recognized as seen.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeNode {
    #[serde(rename = "type")]
    pub ty: TypeDescriptor,
    pub field: Option<String>,
    pub cyclic: bool,
}

impl TypeNode {
    pub fn new(ty: impl Into<TypeDescriptor>, field: Option<String>) -> Self {
        TypeNode {
            ty: ty.into(),
            field,
            cyclic: false,
        }
    }

    pub fn placeholder(reference: ForwardRef, field: Option<String>) -> Self {
        TypeNode {
            ty: reference.into(),
            field,
            cyclic: true,
        }
    }

    pub fn root(id: TypeId) -> Self {
        TypeNode::new(id, None)
    }

    pub fn vertex_key(&self) -> &TypeDescriptor {
        &self.ty
    }

    pub fn same_vertex(&self, other: &TypeNode) -> bool {
        self.ty == other.ty
    }
}

/// Root accepted by the public entry points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Root {
    Type(TypeId),
    Name(String),
    Forward(ForwardRef),
}

impl From<TypeId> for Root {
    fn from(id: TypeId) -> Self {
        Root::Type(id)
    }
}

impl From<&str> for Root {
    fn from(name: &str) -> Self {
        Root::Name(name.to_owned())
    }
}

impl From<String> for Root {
    fn from(name: String) -> Self {
        Root::Name(name)
    }
}

impl From<ForwardRef> for Root {
    fn from(reference: ForwardRef) -> Self {
        Root::Forward(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_identity_ignores_label_and_flag() {
        let a = TypeNode::new(TypeId(3), Some("left".into()));
        let b = TypeNode::new(TypeId(3), Some("right".into()));
        let c = TypeNode::new(TypeId(4), Some("left".into()));

        assert!(a.same_vertex(&b));
        assert_ne!(a, b);
        assert!(!a.same_vertex(&c));
        assert_eq!(a.vertex_key(), b.vertex_key());
    }

    #[test]
    fn test_placeholder_is_cyclic() {
        let node = TypeNode::placeholder(ForwardRef::new("Node"), Some("next".into()));
        assert!(node.cyclic);
        assert!(node.ty.concrete_id().is_none());
        assert!(!node.same_vertex(&TypeNode::root(TypeId(1))));
    }

    #[test]
    fn test_generic_origin_from_str() {
        assert_eq!(GenericOrigin::try_from("dict"), Ok(GenericOrigin::Dict));
        assert!(GenericOrigin::try_from("vector").is_err());
    }

    #[test]
    fn test_forward_ref_display() {
        let plain = ForwardRef::new("Node");
        assert_eq!(plain.to_string(), "ForwardRef(Node)");
        assert_eq!(
            plain.in_module("app.models").to_string(),
            "ForwardRef(app.models.Node)"
        );
    }
}
