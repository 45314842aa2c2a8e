//! Arena-backed syntax tree shared by the analyzer and the code generator.
//!
//! Nodes live in a single `Vec` and are addressed by [`NodeId`]. Each node keeps
//! a first-child / next-sibling link pair, so the children of a node are an
//! ordered chain that is cheap to walk and never shared between parents.

use std::fmt::Display;

use crate::attributes::Attributes;
use crate::types::TypeDescriptor;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle into the attribute arena owned by [`Ast`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct AttrId(u32);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Modifier {
    Public,
    Private,
    Static,
}

impl Display for Modifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Public => "public",
                Self::Private => "private",
                Self::Static => "static",
            }
        )
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PrimitiveKind {
    Int,
    Boolean,
    Void,
}

impl PrimitiveKind {
    /// Name of the built-in type entry this keyword resolves to.
    pub fn builtin_name(self) -> &'static str {
        match self {
            Self::Int => "INT",
            Self::Boolean => "BOOLEAN",
            Self::Void => "VOID",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ExprKind {
    Assign,
    LogicalOr,
    LogicalAnd,
    BitOr,
    BitXor,
    BitAnd,
    Equal,
    NotEqual,
    Greater,
    Less,
    LessEqual,
    GreaterEqual,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

/// Operator families share one typing rule each.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OpFamily {
    Assign,
    Arithmetic,
    Logical,
    Relational,
}

impl ExprKind {
    pub fn family(self) -> OpFamily {
        match self {
            Self::Assign => OpFamily::Assign,
            Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Rem => OpFamily::Arithmetic,
            Self::LogicalOr | Self::LogicalAnd | Self::BitOr | Self::BitXor | Self::BitAnd => {
                OpFamily::Logical
            }
            Self::Equal
            | Self::NotEqual
            | Self::Greater
            | Self::Less
            | Self::LessEqual
            | Self::GreaterEqual => OpFamily::Relational,
        }
    }
}

impl Display for ExprKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Assign => "=",
                Self::LogicalOr => "||",
                Self::LogicalAnd => "&&",
                Self::BitOr => "|",
                Self::BitXor => "^",
                Self::BitAnd => "&",
                Self::Equal => "==",
                Self::NotEqual => "!=",
                Self::Greater => ">",
                Self::Less => "<",
                Self::LessEqual => "<=",
                Self::GreaterEqual => ">=",
                Self::Add => "+",
                Self::Sub => "-",
                Self::Mul => "*",
                Self::Div => "/",
                Self::Rem => "%",
            }
        )
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum NodeKind {
    CompilationUnit,
    ClassDeclaration,
    StructDeclaration,
    ClassBody,
    Modifiers(Vec<Modifier>),
    Identifier(String),
    IntConst(i32),
    StrConst(String),
    BoolConst(bool),
    PrimitiveType(PrimitiveKind),
    ArraySpecifier,
    FieldDeclaration,
    MethodDeclaration,
    ConstructorDeclaration,
    MethodSignature,
    ParameterList,
    Parameter,
    LocalVariableDeclaration,
    NameList,
    Block,
    EmptyStatement,
    SelectionStatement,
    IterationStatement,
    ReturnStatement,
    Expression(ExprKind),
    QualifiedName,
    MethodCall,
    ArgumentList,
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Modifiers(mods) => {
                write!(f, "Modifiers")?;
                for m in mods {
                    write!(f, " {m}")?;
                }
                Ok(())
            }
            Self::Identifier(name) => write!(f, "Identifier {name}"),
            Self::IntConst(n) => write!(f, "IntConst {n}"),
            Self::StrConst(s) => write!(f, "StrConst {s:?}"),
            Self::BoolConst(b) => write!(f, "BoolConst {b}"),
            Self::PrimitiveType(p) => write!(f, "PrimitiveType {}", p.builtin_name()),
            Self::Expression(op) => write!(f, "Expression {op}"),
            other => write!(f, "{other:?}"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    next_sibling: Option<NodeId>,
    /// Filled in by the analyzer.
    pub ty: Option<TypeDescriptor>,
    /// Filled in by the analyzer for identifier- and declaration-bearing kinds.
    pub attrs: Option<AttrId>,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn first_child(&self) -> Option<NodeId> {
        self.first_child
    }

    pub fn next_sibling(&self) -> Option<NodeId> {
        self.next_sibling
    }
}

#[derive(Clone, Debug, Default)]
pub struct Ast {
    nodes: Vec<Node>,
    attrs: Vec<Attributes>,
    root: Option<NodeId>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node that adopts `children` in order.
    ///
    /// # Panics
    /// If one of the children already has a parent. A node belongs to exactly one tree position.
    pub fn add(&mut self, kind: NodeKind, children: &[NodeId]) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).expect("node arena overflow"));
        self.nodes.push(Node {
            kind,
            parent: None,
            first_child: children.first().copied(),
            next_sibling: None,
            ty: None,
            attrs: None,
        });
        for (i, &child) in children.iter().enumerate() {
            let node = &mut self.nodes[child.index()];
            assert!(node.parent.is_none(), "node {child} adopted twice");
            node.parent = Some(id);
            node.next_sibling = children.get(i + 1).copied();
        }
        id
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            ast: self,
            next: self.node(id).first_child,
        }
    }

    /// Children collected up front, for passes that mutate the tree while walking it.
    pub fn child_ids(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).collect()
    }

    pub fn child(&self, id: NodeId, n: usize) -> Option<NodeId> {
        self.children(id).nth(n)
    }

    /// The name carried by an `Identifier` node.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Identifier(name) => Some(name),
            _ => None,
        }
    }

    /// Dotted spelling of a `QualifiedName`, or the name of an `Identifier`.
    pub fn dotted_name(&self, id: NodeId) -> String {
        match self.kind(id) {
            NodeKind::Identifier(name) => name.clone(),
            _ => self
                .children(id)
                .filter_map(|c| self.name(c))
                .collect::<Vec<_>>()
                .join("."),
        }
    }

    pub fn ty(&self, id: NodeId) -> Option<&TypeDescriptor> {
        self.node(id).ty.as_ref()
    }

    pub fn set_ty(&mut self, id: NodeId, ty: TypeDescriptor) {
        self.node_mut(id).ty = Some(ty);
    }

    pub fn attrs_of(&self, id: NodeId) -> Option<AttrId> {
        self.node(id).attrs
    }

    pub fn set_attrs(&mut self, id: NodeId, attrs: AttrId) {
        self.node_mut(id).attrs = Some(attrs);
    }

    pub fn alloc_attrs(&mut self, attrs: Attributes) -> AttrId {
        let id = AttrId(u32::try_from(self.attrs.len()).expect("attribute arena overflow"));
        self.attrs.push(attrs);
        id
    }

    pub fn attrs(&self, id: AttrId) -> &Attributes {
        &self.attrs[id.0 as usize]
    }

    pub fn attrs_mut(&mut self, id: AttrId) -> &mut Attributes {
        &mut self.attrs[id.0 as usize]
    }
}

pub struct Children<'a> {
    ast: &'a Ast,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let cur = self.next?;
        self.next = self.ast.node(cur).next_sibling;
        Some(cur)
    }
}

/// Shorthand constructors for hand-built trees in unit tests.
#[cfg(test)]
pub(crate) mod build {
    use super::*;

    pub fn ident(ast: &mut Ast, name: &str) -> NodeId {
        ast.add(NodeKind::Identifier(name.to_owned()), &[])
    }

    pub fn qn(ast: &mut Ast, path: &[&str]) -> NodeId {
        let parts: Vec<_> = path.iter().map(|p| ident(ast, p)).collect();
        ast.add(NodeKind::QualifiedName, &parts)
    }

    pub fn int(ast: &mut Ast, n: i32) -> NodeId {
        ast.add(NodeKind::IntConst(n), &[])
    }

    pub fn string(ast: &mut Ast, s: &str) -> NodeId {
        ast.add(NodeKind::StrConst(s.to_owned()), &[])
    }

    pub fn boolean(ast: &mut Ast, b: bool) -> NodeId {
        ast.add(NodeKind::BoolConst(b), &[])
    }

    pub fn prim(ast: &mut Ast, kind: PrimitiveKind) -> NodeId {
        ast.add(NodeKind::PrimitiveType(kind), &[])
    }

    pub fn mods(ast: &mut Ast, mods: &[Modifier]) -> NodeId {
        ast.add(NodeKind::Modifiers(mods.to_vec()), &[])
    }

    pub fn names(ast: &mut Ast, names: &[&str]) -> NodeId {
        let ids: Vec<_> = names.iter().map(|n| ident(ast, n)).collect();
        ast.add(NodeKind::NameList, &ids)
    }

    pub fn local(ast: &mut Ast, ty: NodeId, vars: &[&str]) -> NodeId {
        let list = names(ast, vars);
        ast.add(NodeKind::LocalVariableDeclaration, &[ty, list])
    }

    pub fn field(ast: &mut Ast, modifiers: &[Modifier], ty: NodeId, vars: &[&str]) -> NodeId {
        let m = mods(ast, modifiers);
        let list = names(ast, vars);
        ast.add(NodeKind::FieldDeclaration, &[m, ty, list])
    }

    pub fn bin(ast: &mut Ast, op: ExprKind, lhs: NodeId, rhs: NodeId) -> NodeId {
        ast.add(NodeKind::Expression(op), &[lhs, rhs])
    }

    pub fn assign(ast: &mut Ast, target: &str, value: NodeId) -> NodeId {
        let lhs = qn(ast, &[target]);
        bin(ast, ExprKind::Assign, lhs, value)
    }

    pub fn call(ast: &mut Ast, callee: &[&str], args: &[NodeId]) -> NodeId {
        let name = qn(ast, callee);
        if args.is_empty() {
            ast.add(NodeKind::MethodCall, &[name])
        } else {
            let list = ast.add(NodeKind::ArgumentList, args);
            ast.add(NodeKind::MethodCall, &[name, list])
        }
    }

    pub fn ret(ast: &mut Ast, value: Option<NodeId>) -> NodeId {
        let children: Vec<_> = value.into_iter().collect();
        ast.add(NodeKind::ReturnStatement, &children)
    }

    pub fn block(ast: &mut Ast, stmts: &[NodeId]) -> NodeId {
        ast.add(NodeKind::Block, stmts)
    }

    fn signature(ast: &mut Ast, name: &str, params: &[(NodeId, &str)]) -> NodeId {
        let name = ident(ast, name);
        if params.is_empty() {
            return ast.add(NodeKind::MethodSignature, &[name]);
        }
        let params: Vec<_> = params
            .iter()
            .map(|&(ty, p)| {
                let p = ident(ast, p);
                ast.add(NodeKind::Parameter, &[ty, p])
            })
            .collect();
        let list = ast.add(NodeKind::ParameterList, &params);
        ast.add(NodeKind::MethodSignature, &[name, list])
    }

    pub fn method(
        ast: &mut Ast,
        modifiers: &[Modifier],
        ret_ty: NodeId,
        name: &str,
        params: &[(NodeId, &str)],
        body: &[NodeId],
    ) -> NodeId {
        let m = mods(ast, modifiers);
        let sig = signature(ast, name, params);
        let body = block(ast, body);
        ast.add(NodeKind::MethodDeclaration, &[m, ret_ty, sig, body])
    }

    pub fn constructor(
        ast: &mut Ast,
        name: &str,
        params: &[(NodeId, &str)],
        body: &[NodeId],
    ) -> NodeId {
        let m = mods(ast, &[Modifier::Public]);
        let sig = signature(ast, name, params);
        let body = block(ast, body);
        ast.add(NodeKind::ConstructorDeclaration, &[m, sig, body])
    }

    fn object(ast: &mut Ast, kind: NodeKind, name: &str, members: &[NodeId]) -> NodeId {
        let m = mods(ast, &[Modifier::Public]);
        let name = ident(ast, name);
        let body = ast.add(NodeKind::ClassBody, members);
        ast.add(kind, &[m, name, body])
    }

    pub fn class(ast: &mut Ast, name: &str, members: &[NodeId]) -> NodeId {
        object(ast, NodeKind::ClassDeclaration, name, members)
    }

    pub fn structure(ast: &mut Ast, name: &str, members: &[NodeId]) -> NodeId {
        object(ast, NodeKind::StructDeclaration, name, members)
    }

    pub fn unit(ast: &mut Ast, classes: &[NodeId]) -> NodeId {
        let root = ast.add(NodeKind::CompilationUnit, classes);
        ast.set_root(root);
        root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_keep_declaration_order() {
        let mut ast = Ast::new();
        let a = ast.add(NodeKind::IntConst(1), &[]);
        let b = ast.add(NodeKind::IntConst(2), &[]);
        let sum = ast.add(NodeKind::Expression(ExprKind::Add), &[a, b]);

        assert_eq!(ast.child_ids(sum), vec![a, b]);
        assert_eq!(ast.node(a).next_sibling(), Some(b));
        assert_eq!(ast.node(b).parent(), Some(sum));
        assert_eq!(ast.child(sum, 1), Some(b));
        assert_eq!(ast.child(sum, 2), None);
    }

    #[test]
    fn dotted_name_joins_components() {
        let mut ast = Ast::new();
        let a = ast.add(NodeKind::Identifier("a".into()), &[]);
        let b = ast.add(NodeKind::Identifier("b".into()), &[]);
        let qn = ast.add(NodeKind::QualifiedName, &[a, b]);
        assert_eq!(ast.dotted_name(qn), "a.b");
    }

    #[test]
    #[should_panic(expected = "adopted twice")]
    fn nodes_have_one_parent() {
        let mut ast = Ast::new();
        let a = ast.add(NodeKind::EmptyStatement, &[]);
        ast.add(NodeKind::Block, &[a]);
        ast.add(NodeKind::Block, &[a]);
    }
}
