use std::fmt::Display;

use crate::ast::{AttrId, Modifier};
use crate::symtab::ScopeId;

/// A user-declared class or struct.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ObjectType {
    pub name: String,
    /// Name used in emitted code. Structs are nested under their enclosing type (`Outer/Inner`).
    pub wire_name: String,
    /// Members of the type, kept alive past the scope's closing for `a.b.c` resolution.
    pub scope: ScopeId,
    pub modifiers: Vec<Modifier>,
    /// Only ever set on classes.
    pub constructor: Option<AttrId>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TypeDescriptor {
    Integer,
    Boolean,
    Void,
    String,
    /// Marks a node whose failure was already reported.
    Error,
    Struct(ObjectType),
    Class(ObjectType),
    Array(Box<TypeDescriptor>),
    RuntimeLibrary,
}

/// Descriptor kind, the granularity at which types are compared.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TypeKind {
    Integer,
    Boolean,
    Void,
    String,
    Error,
    Struct,
    Class,
    Array,
    RuntimeLibrary,
}

impl Display for TypeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Integer => "INT",
                Self::Boolean => "BOOLEAN",
                Self::Void => "VOID",
                Self::String => "String",
                Self::Error => "<error>",
                Self::Struct => "struct",
                Self::Class => "class",
                Self::Array => "array",
                Self::RuntimeLibrary => "runtime library",
            }
        )
    }
}

impl TypeDescriptor {
    pub fn kind(&self) -> TypeKind {
        match self {
            Self::Integer => TypeKind::Integer,
            Self::Boolean => TypeKind::Boolean,
            Self::Void => TypeKind::Void,
            Self::String => TypeKind::String,
            Self::Error => TypeKind::Error,
            Self::Struct(_) => TypeKind::Struct,
            Self::Class(_) => TypeKind::Class,
            Self::Array(_) => TypeKind::Array,
            Self::RuntimeLibrary => TypeKind::RuntimeLibrary,
        }
    }

    pub fn same_kind(&self, other: &Self) -> bool {
        self.kind() == other.kind()
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    /// Integers and strings are the primitive value types that support comparison.
    pub fn is_primitive_value(&self) -> bool {
        matches!(self, Self::Integer | Self::String)
    }

    pub fn object(&self) -> Option<&ObjectType> {
        match self {
            Self::Struct(obj) | Self::Class(obj) => Some(obj),
            _ => None,
        }
    }

    /// Type name as written in emitted code.
    pub fn wire_name(&self) -> String {
        match self {
            Self::Integer => "int32".to_owned(),
            Self::Boolean => "bool".to_owned(),
            Self::Void => "void".to_owned(),
            Self::String => "string".to_owned(),
            Self::Error => "<error>".to_owned(),
            Self::Struct(obj) => format!("valuetype {}", obj.wire_name),
            Self::Class(obj) => format!("class {}", obj.wire_name),
            Self::Array(elem) => format!("{}[]", elem.wire_name()),
            Self::RuntimeLibrary => "[mscorlib]System.Console".to_owned(),
        }
    }
}

impl Display for TypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Struct(obj) => write!(f, "struct {}", obj.name),
            Self::Class(obj) => write!(f, "class {}", obj.name),
            Self::Array(elem) => write!(f, "{elem}[]"),
            other => write!(f, "{}", other.kind()),
        }
    }
}
