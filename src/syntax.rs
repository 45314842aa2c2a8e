//! Surface grammar and its lowering into the arena [`Ast`].

use anyhow::Context;
use log::debug;
use parsel::{
    ast::{
        Any, Brace, Ident, LeftAssoc, LitBool, LitInt, LitStr, Many, Maybe, Paren, Punctuated,
        Token,
    },
    FromStr, Parse, ToTokens,
};

use crate::ast::{Ast, ExprKind, Modifier, NodeId, NodeKind, PrimitiveKind};

mod kw {
    parsel::custom_keyword!(class);
    parsel::custom_keyword!(public);
    parsel::custom_keyword!(private);
    parsel::custom_keyword!(int);
    parsel::custom_keyword!(boolean);
    parsel::custom_keyword!(void);
}

/// <prgm> ::= <class> <class>*
#[derive(PartialEq, Eq, Debug, Parse, ToTokens, FromStr, Clone)]
pub struct Prgm {
    pub classes: Many<Class>,
}

/// <class> ::= <mod>* class <name> { <member>* }
#[derive(PartialEq, Eq, Debug, Parse, ToTokens, FromStr, Clone)]
pub struct Class {
    pub modifiers: Any<Mod>,
    pub class: kw::class,
    pub name: Ident,
    pub body: Brace<Members>,
}

#[derive(PartialEq, Eq, Debug, Parse, ToTokens, FromStr, Clone)]
pub struct Members {
    pub members: Any<Member>,
}

// Variants are tried in order: a constructor is a method without a return type,
// and a field only commits once no parameter list follows the name.
#[derive(PartialEq, Eq, Debug, Parse, ToTokens, FromStr, Clone)]
pub enum Member {
    Struct {
        modifiers: Any<Mod>,
        struct_: Token!(struct),
        name: Ident,
        #[parsel(recursive)]
        body: Brace<Box<Members>>,
    },
    Constructor {
        modifiers: Any<Mod>,
        name: Ident,
        params: Paren<Punctuated<Param, Token!(,)>>,
        body: Block,
    },
    Method {
        modifiers: Any<Mod>,
        ty: Type,
        name: Ident,
        params: Paren<Punctuated<Param, Token!(,)>>,
        body: Block,
    },
    Field {
        modifiers: Any<Mod>,
        ty: Type,
        names: Names,
        end: Token!(;),
    },
}

#[derive(PartialEq, Eq, Debug, Parse, ToTokens, FromStr, Clone)]
pub enum Mod {
    Public(kw::public),
    Private(kw::private),
    Static(Token!(static)),
}

#[derive(PartialEq, Eq, Debug, Parse, ToTokens, FromStr, Clone)]
pub struct Param {
    pub ty: Type,
    pub name: Ident,
}

#[derive(PartialEq, Eq, Debug, Parse, ToTokens, FromStr, Clone)]
pub enum Type {
    Int(kw::int),
    Boolean(kw::boolean),
    Void(kw::void),
    Named(QualName),
}

/// <name> ::= <ident> (. <ident>)*
#[derive(PartialEq, Eq, Debug, Parse, ToTokens, FromStr, Clone)]
pub struct QualName {
    pub first: Ident,
    pub rest: Any<Dotted>,
}

#[derive(PartialEq, Eq, Debug, Parse, ToTokens, FromStr, Clone)]
pub struct Dotted {
    dot: Token!(.),
    pub name: Ident,
}

/// <names> ::= <ident> (, <ident>)*
#[derive(PartialEq, Eq, Debug, Parse, ToTokens, FromStr, Clone)]
pub struct Names {
    pub first: Ident,
    pub rest: Any<NextName>,
}

#[derive(PartialEq, Eq, Debug, Parse, ToTokens, FromStr, Clone)]
pub struct NextName {
    comma: Token!(,),
    pub name: Ident,
}

#[derive(PartialEq, Eq, Debug, Parse, ToTokens, FromStr, Clone)]
pub struct Block {
    pub stmts: Brace<Stmts>,
}

#[derive(PartialEq, Eq, Debug, Parse, ToTokens, FromStr, Clone)]
pub struct Stmts {
    pub stmts: Any<Stmt>,
}

// <stmt> ::= ; | <block>
//          | if ( <expn> ) <stmt> (else <stmt>)?
//          | while ( <expn> ) <stmt>
//          | return <expn>? ;
//          | <type> <names> ;
//          | <name> = <expn> ;
//          | <expn> ;
#[derive(PartialEq, Eq, Debug, Parse, ToTokens, FromStr, Clone)]
pub enum Stmt {
    Empty(Token!(;)),
    Block(#[parsel(recursive)] Box<Block>),
    If {
        if_: Token!(if),
        cond: Paren<Expn>,
        #[parsel(recursive)]
        then: Box<Stmt>,
        #[parsel(recursive)]
        otherwise: Maybe<Box<Else>>,
    },
    While {
        while_: Token!(while),
        cond: Paren<Expn>,
        #[parsel(recursive)]
        body: Box<Stmt>,
    },
    Return {
        return_: Token!(return),
        value: Maybe<Expn>,
        end: Token!(;),
    },
    Local {
        ty: Type,
        names: Names,
        end: Token!(;),
    },
    Assign {
        target: QualName,
        equals: Token!(=),
        value: Expn,
        end: Token!(;),
    },
    Expn(Expn, Token!(;)),
}

#[derive(PartialEq, Eq, Debug, Parse, ToTokens, FromStr, Clone)]
pub struct Else {
    else_: Token!(else),
    #[parsel(recursive)]
    pub body: Box<Stmt>,
}

// <expn> ::= <disj>
#[derive(PartialEq, Eq, Debug, Parse, ToTokens, FromStr, Clone)]
pub struct Expn(
    #[allow(clippy::type_complexity)]
    pub  LeftAssoc<Disj, LeftAssoc<Conj, LeftAssoc<Comp, LeftAssoc<Add, LeftAssoc<Mult, Leaf>>>>>,
);

// Longer tokens come first, or `|` would match the front of `||`.
#[derive(PartialEq, Eq, Debug, Parse, ToTokens, FromStr, Clone)]
pub enum Disj {
    OrOr(Token!(||)),
    Or(Token!(|)),
}

#[derive(PartialEq, Eq, Debug, Parse, ToTokens, FromStr, Clone)]
pub enum Conj {
    AndAnd(Token!(&&)),
    And(Token!(&)),
    Caret(Token!(^)),
}

#[derive(PartialEq, Eq, Debug, Parse, ToTokens, FromStr, Clone)]
pub enum Comp {
    Eq(Token!(==)),
    Ne(Token!(!=)),
    Le(Token!(<=)),
    Ge(Token!(>=)),
    Lt(Token!(<)),
    Gt(Token!(>)),
}

#[derive(PartialEq, Eq, Debug, Parse, ToTokens, FromStr, Clone)]
pub enum Add {
    Plus(Token!(+)),
    Minus(Token!(-)),
}

#[derive(PartialEq, Eq, Debug, Parse, ToTokens, FromStr, Clone)]
pub enum Mult {
    Times(Token!(*)),
    Div(Token!(/)),
    Mod(Token!(%)),
}

// <leaf> ::= <name> ( <expn>,* ) | <nmbr> | <strg> | true | false | <name> | ( <expn> )
#[derive(PartialEq, Eq, Debug, Parse, ToTokens, FromStr, Clone)]
pub enum Leaf {
    Call {
        name: QualName,
        #[parsel(recursive)]
        args: Paren<Punctuated<Box<Expn>, Token!(,)>>,
    },
    Nmbr(LitInt),
    Strg(LitStr),
    Bool(LitBool),
    Name(QualName),
    Expn(#[parsel(recursive)] Paren<Box<Expn>>),
}

/// Parse `source` and lower it into a fresh tree whose root is the compilation unit.
///
/// # Errors
/// If `source` is not a well-formed program, or an integer literal does not fit in 32 bits.
pub fn parse(source: &str) -> anyhow::Result<Ast> {
    let prgm: Prgm = source.parse()?;
    let mut ast = Ast::new();
    let root = prgm.lower(&mut ast)?;
    ast.set_root(root);
    debug!("parsed {} node(s)", ast.len());
    Ok(ast)
}

/// Conversion of a parsed construct into arena nodes.
trait Lower {
    fn lower(self, ast: &mut Ast) -> anyhow::Result<NodeId>;
}

/// Binary operator tokens of one precedence level.
trait Operator {
    fn kind(&self) -> ExprKind;
}

fn ident(name: &Ident, ast: &mut Ast) -> NodeId {
    ast.add(NodeKind::Identifier(name.to_string()), &[])
}

fn modifiers(mods: Any<Mod>, ast: &mut Ast) -> NodeId {
    let mods = mods
        .into_iter()
        .map(|m| match m {
            Mod::Public(_) => Modifier::Public,
            Mod::Private(_) => Modifier::Private,
            Mod::Static(_) => Modifier::Static,
        })
        .collect();
    ast.add(NodeKind::Modifiers(mods), &[])
}

fn lower_all<T: Lower>(items: impl IntoIterator<Item = T>, ast: &mut Ast) -> anyhow::Result<Vec<NodeId>> {
    items.into_iter().map(|item| item.lower(ast)).collect()
}

fn signature(
    name: &Ident,
    params: Paren<Punctuated<Param, Token!(,)>>,
    ast: &mut Ast,
) -> anyhow::Result<NodeId> {
    let name = ident(name, ast);
    let params = lower_all(params.into_inner(), ast)?;
    if params.is_empty() {
        return Ok(ast.add(NodeKind::MethodSignature, &[name]));
    }
    let list = ast.add(NodeKind::ParameterList, &params);
    Ok(ast.add(NodeKind::MethodSignature, &[name, list]))
}

fn object(
    kind: NodeKind,
    mods: Any<Mod>,
    name: &Ident,
    body: Members,
    ast: &mut Ast,
) -> anyhow::Result<NodeId> {
    let mods = modifiers(mods, ast);
    let name = ident(name, ast);
    let body = body.lower(ast)?;
    Ok(ast.add(kind, &[mods, name, body]))
}

impl<T: Lower> Lower for Box<T> {
    fn lower(self, ast: &mut Ast) -> anyhow::Result<NodeId> {
        (*self).lower(ast)
    }
}

impl Lower for Prgm {
    fn lower(self, ast: &mut Ast) -> anyhow::Result<NodeId> {
        let classes = lower_all(self.classes, ast)?;
        Ok(ast.add(NodeKind::CompilationUnit, &classes))
    }
}

impl Lower for Class {
    fn lower(self, ast: &mut Ast) -> anyhow::Result<NodeId> {
        object(
            NodeKind::ClassDeclaration,
            self.modifiers,
            &self.name,
            self.body.into_inner(),
            ast,
        )
    }
}

impl Lower for Members {
    fn lower(self, ast: &mut Ast) -> anyhow::Result<NodeId> {
        let members = lower_all(self.members, ast)?;
        Ok(ast.add(NodeKind::ClassBody, &members))
    }
}

impl Lower for Member {
    fn lower(self, ast: &mut Ast) -> anyhow::Result<NodeId> {
        Ok(match self {
            Self::Struct {
                modifiers,
                name,
                body,
                ..
            } => object(
                NodeKind::StructDeclaration,
                modifiers,
                &name,
                *body.into_inner(),
                ast,
            )?,
            Self::Constructor {
                modifiers: mods,
                name,
                params,
                body,
            } => {
                let mods = modifiers(mods, ast);
                let sig = signature(&name, params, ast)?;
                let body = body.lower(ast)?;
                ast.add(NodeKind::ConstructorDeclaration, &[mods, sig, body])
            }
            Self::Method {
                modifiers: mods,
                ty,
                name,
                params,
                body,
            } => {
                let mods = modifiers(mods, ast);
                let ty = ty.lower(ast)?;
                let sig = signature(&name, params, ast)?;
                let body = body.lower(ast)?;
                ast.add(NodeKind::MethodDeclaration, &[mods, ty, sig, body])
            }
            Self::Field {
                modifiers: mods,
                ty,
                names,
                ..
            } => {
                let mods = modifiers(mods, ast);
                let ty = ty.lower(ast)?;
                let names = names.lower(ast)?;
                ast.add(NodeKind::FieldDeclaration, &[mods, ty, names])
            }
        })
    }
}

impl Lower for Param {
    fn lower(self, ast: &mut Ast) -> anyhow::Result<NodeId> {
        let ty = self.ty.lower(ast)?;
        let name = ident(&self.name, ast);
        Ok(ast.add(NodeKind::Parameter, &[ty, name]))
    }
}

impl Lower for Type {
    fn lower(self, ast: &mut Ast) -> anyhow::Result<NodeId> {
        let kind = match self {
            Self::Int(_) => PrimitiveKind::Int,
            Self::Boolean(_) => PrimitiveKind::Boolean,
            Self::Void(_) => PrimitiveKind::Void,
            Self::Named(name) => return name.lower(ast),
        };
        Ok(ast.add(NodeKind::PrimitiveType(kind), &[]))
    }
}

impl Lower for QualName {
    fn lower(self, ast: &mut Ast) -> anyhow::Result<NodeId> {
        let mut parts = vec![ident(&self.first, ast)];
        for dotted in self.rest {
            parts.push(ident(&dotted.name, ast));
        }
        Ok(ast.add(NodeKind::QualifiedName, &parts))
    }
}

impl Lower for Names {
    fn lower(self, ast: &mut Ast) -> anyhow::Result<NodeId> {
        let mut names = vec![ident(&self.first, ast)];
        for next in self.rest {
            names.push(ident(&next.name, ast));
        }
        Ok(ast.add(NodeKind::NameList, &names))
    }
}

impl Lower for Block {
    fn lower(self, ast: &mut Ast) -> anyhow::Result<NodeId> {
        let stmts = lower_all(self.stmts.into_inner().stmts, ast)?;
        Ok(ast.add(NodeKind::Block, &stmts))
    }
}

impl Lower for Stmt {
    fn lower(self, ast: &mut Ast) -> anyhow::Result<NodeId> {
        Ok(match self {
            Self::Empty(_) => ast.add(NodeKind::EmptyStatement, &[]),
            Self::Block(block) => block.lower(ast)?,
            Self::If {
                cond,
                then,
                otherwise,
                ..
            } => {
                let mut children = vec![cond.into_inner().lower(ast)?, then.lower(ast)?];
                if let Some((otherwise, _)) = &*otherwise {
                    children.push(otherwise.body.clone().lower(ast)?);
                }
                ast.add(NodeKind::SelectionStatement, &children)
            }
            Self::While { cond, body, .. } => {
                let cond = cond.into_inner().lower(ast)?;
                let body = body.lower(ast)?;
                ast.add(NodeKind::IterationStatement, &[cond, body])
            }
            Self::Return { value, .. } => {
                let children = match &*value {
                    Some((value, _)) => vec![value.clone().lower(ast)?],
                    None => Vec::new(),
                };
                ast.add(NodeKind::ReturnStatement, &children)
            }
            Self::Local { ty, names, .. } => {
                let ty = ty.lower(ast)?;
                let names = names.lower(ast)?;
                ast.add(NodeKind::LocalVariableDeclaration, &[ty, names])
            }
            Self::Assign { target, value, .. } => {
                let target = target.lower(ast)?;
                let value = value.lower(ast)?;
                ast.add(NodeKind::Expression(ExprKind::Assign), &[target, value])
            }
            Self::Expn(expn, _) => expn.lower(ast)?,
        })
    }
}

impl Lower for Expn {
    fn lower(self, ast: &mut Ast) -> anyhow::Result<NodeId> {
        self.0.lower(ast)
    }
}

impl<O: Operator, C: Lower> Lower for LeftAssoc<O, C> {
    fn lower(self, ast: &mut Ast) -> anyhow::Result<NodeId> {
        match self {
            Self::Binary { lhs, op, rhs } => {
                let lhs = lhs.lower(ast)?;
                let rhs = rhs.lower(ast)?;
                Ok(ast.add(NodeKind::Expression(op.kind()), &[lhs, rhs]))
            }
            Self::Rhs(expn) => expn.lower(ast),
        }
    }
}

impl Operator for Disj {
    fn kind(&self) -> ExprKind {
        match self {
            Self::OrOr(_) => ExprKind::LogicalOr,
            Self::Or(_) => ExprKind::BitOr,
        }
    }
}

impl Operator for Conj {
    fn kind(&self) -> ExprKind {
        match self {
            Self::AndAnd(_) => ExprKind::LogicalAnd,
            Self::And(_) => ExprKind::BitAnd,
            Self::Caret(_) => ExprKind::BitXor,
        }
    }
}

impl Operator for Comp {
    fn kind(&self) -> ExprKind {
        match self {
            Self::Eq(_) => ExprKind::Equal,
            Self::Ne(_) => ExprKind::NotEqual,
            Self::Le(_) => ExprKind::LessEqual,
            Self::Ge(_) => ExprKind::GreaterEqual,
            Self::Lt(_) => ExprKind::Less,
            Self::Gt(_) => ExprKind::Greater,
        }
    }
}

impl Operator for Add {
    fn kind(&self) -> ExprKind {
        match self {
            Self::Plus(_) => ExprKind::Add,
            Self::Minus(_) => ExprKind::Sub,
        }
    }
}

impl Operator for Mult {
    fn kind(&self) -> ExprKind {
        match self {
            Self::Times(_) => ExprKind::Mul,
            Self::Div(_) => ExprKind::Div,
            Self::Mod(_) => ExprKind::Rem,
        }
    }
}

impl Lower for Leaf {
    fn lower(self, ast: &mut Ast) -> anyhow::Result<NodeId> {
        Ok(match self {
            Self::Call { name, args } => {
                let name = name.lower(ast)?;
                let args = lower_all(args.into_inner(), ast)?;
                if args.is_empty() {
                    ast.add(NodeKind::MethodCall, &[name])
                } else {
                    let list = ast.add(NodeKind::ArgumentList, &args);
                    ast.add(NodeKind::MethodCall, &[name, list])
                }
            }
            Self::Nmbr(n) => {
                let n = n.into_inner();
                let value = i32::try_from(n)
                    .with_context(|| format!("integer literal {n} does not fit in 32 bits"))?;
                ast.add(NodeKind::IntConst(value), &[])
            }
            Self::Strg(s) => ast.add(NodeKind::StrConst(s.into_inner()), &[]),
            Self::Bool(b) => ast.add(NodeKind::BoolConst(b.into_inner()), &[]),
            Self::Name(name) => name.lower(ast)?,
            Self::Expn(e) => e.into_inner().lower(ast)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Kinds of the children of `id`, for shape assertions.
    fn kinds(ast: &Ast, id: NodeId) -> Vec<NodeKind> {
        ast.children(id).map(|c| ast.kind(c).clone()).collect()
    }

    fn only_method_body(ast: &Ast) -> NodeId {
        let root = ast.root().unwrap();
        let class = ast.child(root, 0).unwrap();
        let body = ast.child(class, 2).unwrap();
        let method = ast.child(body, 0).unwrap();
        ast.child(method, 3).unwrap()
    }

    #[test]
    fn class_members_lower_to_declarations() {
        let ast = parse(
            "public class Main {
                 private static int count, total;
                 public Main() {}
                 public static void main(int a, String b) {}
                 struct Point { public int x; }
             }",
        )
        .unwrap();
        let root = ast.root().unwrap();
        assert_eq!(*ast.kind(root), NodeKind::CompilationUnit);
        let class = ast.child(root, 0).unwrap();
        assert_eq!(
            kinds(&ast, class),
            vec![
                NodeKind::Modifiers(vec![Modifier::Public]),
                NodeKind::Identifier("Main".into()),
                NodeKind::ClassBody,
            ]
        );
        let body = ast.child(class, 2).unwrap();
        assert_eq!(
            kinds(&ast, body),
            vec![
                NodeKind::FieldDeclaration,
                NodeKind::ConstructorDeclaration,
                NodeKind::MethodDeclaration,
                NodeKind::StructDeclaration,
            ]
        );

        let field = ast.child(body, 0).unwrap();
        let names = ast.child(field, 2).unwrap();
        assert_eq!(ast.dotted_name(names), "count.total");
        assert_eq!(
            *ast.kind(ast.child(field, 0).unwrap()),
            NodeKind::Modifiers(vec![Modifier::Private, Modifier::Static])
        );

        let method = ast.child(body, 2).unwrap();
        let sig = ast.child(method, 2).unwrap();
        let params = ast.child(sig, 1).unwrap();
        let second = ast.child(params, 1).unwrap();
        let ty = ast.child(second, 0).unwrap();
        assert_eq!(*ast.kind(ty), NodeKind::QualifiedName);
        assert_eq!(ast.dotted_name(ty), "String");

        let ctor = ast.child(body, 1).unwrap();
        let ctor_sig = ast.child(ctor, 1).unwrap();
        assert_eq!(ast.child_ids(ctor_sig).len(), 1);
    }

    #[test]
    fn operators_bind_by_precedence() {
        let ast = parse("class A { void f() { x = 1 + 2 * 3 <= 4 || y; } }").unwrap();
        let stmt = ast.child(only_method_body(&ast), 0).unwrap();
        assert_eq!(*ast.kind(stmt), NodeKind::Expression(ExprKind::Assign));

        let or = ast.child(stmt, 1).unwrap();
        assert_eq!(*ast.kind(or), NodeKind::Expression(ExprKind::LogicalOr));
        let le = ast.child(or, 0).unwrap();
        assert_eq!(*ast.kind(le), NodeKind::Expression(ExprKind::LessEqual));
        let sum = ast.child(le, 0).unwrap();
        assert_eq!(
            kinds(&ast, sum),
            vec![NodeKind::IntConst(1), NodeKind::Expression(ExprKind::Mul)]
        );
    }

    #[test]
    fn same_level_operators_associate_left() {
        let ast = parse("class A { void f() { x = 10 - 4 - 3; } }").unwrap();
        let stmt = ast.child(only_method_body(&ast), 0).unwrap();
        let outer = ast.child(stmt, 1).unwrap();
        assert_eq!(
            kinds(&ast, outer),
            vec![NodeKind::Expression(ExprKind::Sub), NodeKind::IntConst(3)]
        );
    }

    #[test]
    fn statements_lower_to_their_node_kinds() {
        let ast = parse(
            r#"class A {
                 int f(boolean c) {
                     String s;
                     s = "hi";
                     ;
                     { WriteLine(s); }
                     if (c) return 1; else { return 2; }
                     while (c) c = false;
                     g();
                     return;
                 }
             }"#,
        )
        .unwrap();
        let body = only_method_body(&ast);
        assert_eq!(
            kinds(&ast, body),
            vec![
                NodeKind::LocalVariableDeclaration,
                NodeKind::Expression(ExprKind::Assign),
                NodeKind::EmptyStatement,
                NodeKind::Block,
                NodeKind::SelectionStatement,
                NodeKind::IterationStatement,
                NodeKind::MethodCall,
                NodeKind::ReturnStatement,
            ]
        );
        let assign = ast.child(body, 1).unwrap();
        assert_eq!(*ast.kind(ast.child(assign, 1).unwrap()), NodeKind::StrConst("hi".into()));
        let selection = ast.child(body, 4).unwrap();
        assert_eq!(ast.child_ids(selection).len(), 3);
        let call = ast.child(body, 6).unwrap();
        assert_eq!(ast.child_ids(call).len(), 1);
        let ret = ast.child(body, 7).unwrap();
        assert!(ast.child_ids(ret).is_empty());
    }

    #[test]
    fn dangling_else_binds_to_nearest_if() {
        let ast = parse("class A { void f() { if (a) if (b) g(); else h(); } }").unwrap();
        let outer = ast.child(only_method_body(&ast), 0).unwrap();
        assert_eq!(ast.child_ids(outer).len(), 2);
        let inner = ast.child(outer, 1).unwrap();
        assert_eq!(ast.child_ids(inner).len(), 3);
    }

    #[test]
    fn qualified_calls_keep_every_component() {
        let ast = parse("class A { void f() { Other.g(1, true); } }").unwrap();
        let call = ast.child(only_method_body(&ast), 0).unwrap();
        let callee = ast.child(call, 0).unwrap();
        assert_eq!(ast.dotted_name(callee), "Other.g");
        let args = ast.child(call, 1).unwrap();
        assert_eq!(
            kinds(&ast, args),
            vec![NodeKind::IntConst(1), NodeKind::BoolConst(true)]
        );
    }

    #[test]
    fn malformed_input_is_an_error() {
        assert!(parse("class A { void f() { x = ; } }").is_err());
        assert!(parse("class { }").is_err());
        assert!(parse("class A { void f() { x = 99999999999; } }").is_err());
    }
}
