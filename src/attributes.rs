//! Semantic payloads attached to declared and resolved names.

use crate::ast::{AttrId, Modifier};
use crate::types::{TypeDescriptor, TypeKind};

/// A built-in type name such as `INT` or `String`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TypeAttributes {
    pub ty: TypeDescriptor,
}

/// A user-declared class or struct.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ObjectTypeAttributes {
    pub ty: TypeDescriptor,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct VariableAttributes {
    pub id: String,
    pub ty: TypeDescriptor,
    /// Set once the variable has definitely been written.
    pub initialized: bool,
    /// Assigned by the code generator, never by the analyzer.
    pub storage_slot: Option<u32>,
    pub is_param: bool,
    /// Wire name of the enclosing type, for fields.
    pub declared_in: Option<String>,
}

impl VariableAttributes {
    pub fn new(id: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            id: id.into(),
            ty,
            initialized: false,
            storage_slot: None,
            is_param: false,
            declared_in: None,
        }
    }

    pub fn param(id: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            initialized: true,
            is_param: true,
            ..Self::new(id, ty)
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct FieldAttributes {
    pub var: VariableAttributes,
    pub modifiers: Vec<Modifier>,
}

impl FieldAttributes {
    pub fn is_static(&self) -> bool {
        self.modifiers.contains(&Modifier::Static)
    }
}

/// One overload of a method or constructor.
///
/// Two signatures are equal when their names match and their parameter kinds match
/// pairwise. Parameter names play no part.
#[derive(Clone, Debug)]
pub struct MethodSignatureAttributes {
    pub name: String,
    pub parameters: Vec<AttrId>,
    pub parameter_types: Vec<TypeDescriptor>,
}

impl MethodSignatureAttributes {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            parameter_types: Vec::new(),
        }
    }

    pub fn push_param(&mut self, attrs: AttrId, ty: TypeDescriptor) {
        self.parameters.push(attrs);
        self.parameter_types.push(ty);
    }

    fn kinds(&self) -> impl Iterator<Item = TypeKind> + '_ {
        self.parameter_types.iter().map(TypeDescriptor::kind)
    }

    /// Whether a call with these argument types may bind to this signature.
    pub fn accepts(&self, args: &[TypeDescriptor]) -> bool {
        self.parameter_types.len() == args.len()
            && self.kinds().zip(args).all(|(p, a)| p == a.kind())
    }
}

impl PartialEq for MethodSignatureAttributes {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.parameter_types.len() == other.parameter_types.len()
            && self.kinds().eq(other.kinds())
    }
}

impl Eq for MethodSignatureAttributes {}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct ConstructorAttributes {
    pub signatures: Vec<MethodSignatureAttributes>,
    pub modifiers: Vec<Modifier>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MethodAttributes {
    pub name: String,
    pub signatures: Vec<MethodSignatureAttributes>,
    pub modifiers: Vec<Modifier>,
    pub return_type: TypeDescriptor,
    pub is_static: bool,
    pub declared_in: Option<String>,
    /// Set for entry points of the runtime library; holds its descriptor.
    pub library: Option<TypeDescriptor>,
}

/// The outcome of overload resolution at one call site.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MethodCallAttributes {
    pub method: AttrId,
    /// Index into the method's signature list.
    pub signature: usize,
    pub argument_types: Vec<TypeDescriptor>,
    /// The callee as written, e.g. `Other.f`.
    pub call_name: String,
    /// The innermost component of the callee, e.g. `f`.
    pub unqualified_name: String,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Attributes {
    Type(TypeAttributes),
    ObjectType(ObjectTypeAttributes),
    Variable(VariableAttributes),
    Field(FieldAttributes),
    Constructor(ConstructorAttributes),
    Method(MethodAttributes),
    MethodSignature(MethodSignatureAttributes),
    MethodCall(MethodCallAttributes),
    Error,
}

impl Attributes {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Type(_) => "type",
            Self::ObjectType(_) => "object type",
            Self::Variable(_) => "variable",
            Self::Field(_) => "field",
            Self::Constructor(_) => "constructor",
            Self::Method(_) => "method",
            Self::MethodSignature(_) => "method signature",
            Self::MethodCall(_) => "method call",
            Self::Error => "error",
        }
    }

    /// Variables and fields both carry variable data.
    pub fn as_variable(&self) -> Option<&VariableAttributes> {
        match self {
            Self::Variable(var) | Self::Field(FieldAttributes { var, .. }) => Some(var),
            _ => None,
        }
    }

    pub fn as_variable_mut(&mut self) -> Option<&mut VariableAttributes> {
        match self {
            Self::Variable(var) | Self::Field(FieldAttributes { var, .. }) => Some(var),
            _ => None,
        }
    }

    pub fn as_method(&self) -> Option<&MethodAttributes> {
        match self {
            Self::Method(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_method_mut(&mut self) -> Option<&mut MethodAttributes> {
        match self {
            Self::Method(m) => Some(m),
            _ => None,
        }
    }

    /// The type a name denotes when used as a type specifier.
    pub fn as_type(&self) -> Option<&TypeDescriptor> {
        match self {
            Self::Type(TypeAttributes { ty }) | Self::ObjectType(ObjectTypeAttributes { ty }) => {
                Some(ty)
            }
            _ => None,
        }
    }
}
