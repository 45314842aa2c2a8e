//! Semantic analysis: name resolution, type checking and overload resolution.
//!
//! A single depth-first pass over the tree. Expressions are typed after their
//! operands; declarations enter themselves into the symbol table before their
//! bodies are visited. Failures are collected as [`Diagnostic`]s and the
//! affected node is typed [`TypeDescriptor::Error`], which later checks absorb
//! without reporting again.

use log::{debug, trace};

use crate::ast::{Ast, AttrId, ExprKind, Modifier, NodeId, NodeKind, OpFamily, PrimitiveKind};
use crate::attributes::{
    Attributes, ConstructorAttributes, FieldAttributes, MethodAttributes, MethodCallAttributes,
    MethodSignatureAttributes, ObjectTypeAttributes, TypeAttributes, VariableAttributes,
};
use crate::symtab::{ScopeId, SymbolTable};
use crate::types::{ObjectType, TypeDescriptor, TypeKind};
use crate::Diagnostic;

/// Annotate `ast` in place and return every diagnostic found, in traversal order.
pub fn analyze(ast: &mut Ast) -> Vec<Diagnostic> {
    let Some(root) = ast.root() else {
        return Vec::new();
    };
    let mut analyzer = Analyzer::new(ast);
    analyzer.visit(root);
    debug!(
        "analysis finished with {} diagnostic(s)",
        analyzer.diagnostics.len()
    );
    analyzer.diagnostics
}

/// Where the next component of a qualified name is looked up.
#[derive(Clone, Copy, Debug)]
enum Lookup {
    Table,
    Members(ScopeId),
    Nothing,
}

struct Analyzer<'a> {
    ast: &'a mut Ast,
    table: SymbolTable,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Analyzer<'a> {
    fn new(ast: &'a mut Ast) -> Self {
        let mut analyzer = Self {
            ast,
            table: SymbolTable::new(),
            diagnostics: Vec::new(),
        };
        analyzer.enter_predefined_names();
        analyzer
    }

    fn enter_predefined_names(&mut self) {
        let builtins = [
            ("INT", TypeDescriptor::Integer),
            ("BOOLEAN", TypeDescriptor::Boolean),
            ("VOID", TypeDescriptor::Void),
            ("String", TypeDescriptor::String),
        ];
        for (name, ty) in builtins {
            let attrs = self.ast.alloc_attrs(Attributes::Type(TypeAttributes { ty }));
            self.table.enter(name, attrs);
        }

        for name in ["Write", "WriteLine"] {
            let mut signatures = Vec::new();
            for (param, ty) in [("s", TypeDescriptor::String), ("num", TypeDescriptor::Integer)] {
                let attrs = self.ast.alloc_attrs(Attributes::Variable(VariableAttributes::param(
                    param,
                    ty.clone(),
                )));
                let mut sig = MethodSignatureAttributes::new(name);
                sig.push_param(attrs, ty);
                signatures.push(sig);
            }
            let method = MethodAttributes {
                name: name.to_owned(),
                signatures,
                modifiers: vec![Modifier::Public, Modifier::Static],
                return_type: TypeDescriptor::Void,
                is_static: true,
                declared_in: None,
                library: Some(TypeDescriptor::RuntimeLibrary),
            };
            let attrs = self.ast.alloc_attrs(Attributes::Method(method));
            self.table.enter(name, attrs);
        }
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        debug!("{diagnostic}");
        self.diagnostics.push(diagnostic);
    }

    fn ty(&self, id: NodeId) -> TypeDescriptor {
        self.ast.ty(id).cloned().unwrap_or(TypeDescriptor::Error)
    }

    fn set_ty(&mut self, id: NodeId, ty: TypeDescriptor) {
        self.ast.set_ty(id, ty);
    }

    fn set_error(&mut self, id: NodeId) {
        self.ast.set_ty(id, TypeDescriptor::Error);
    }

    fn internal(&mut self, id: NodeId, what: &str) {
        let kind = self.ast.kind(id).to_string();
        self.report(Diagnostic::Internal(format!("{what} at {kind} {id}")));
        self.set_error(id);
    }

    fn name_of(&self, id: NodeId) -> String {
        self.ast.name(id).unwrap_or_default().to_owned()
    }

    fn visit(&mut self, id: NodeId) {
        let kind = self.ast.kind(id).clone();
        trace!("visit {id} {kind}");
        match kind {
            NodeKind::ClassDeclaration => self.object_declaration(id, false),
            NodeKind::StructDeclaration => self.object_declaration(id, true),
            NodeKind::FieldDeclaration => self.field_declaration(id),
            NodeKind::LocalVariableDeclaration => self.local_variable_declaration(id),
            NodeKind::MethodDeclaration => self.method_declaration(id),
            NodeKind::ConstructorDeclaration => self.constructor_declaration(id),
            NodeKind::PrimitiveType(_) | NodeKind::ArraySpecifier => {
                self.type_specifier(id);
            }
            NodeKind::QualifiedName => self.qualified_name(id),
            NodeKind::Identifier(_) => {
                self.resolve_component(id, Lookup::Table);
            }
            NodeKind::IntConst(_) => self.set_ty(id, TypeDescriptor::Integer),
            NodeKind::StrConst(_) => self.set_ty(id, TypeDescriptor::String),
            NodeKind::BoolConst(_) => self.set_ty(id, TypeDescriptor::Boolean),
            NodeKind::Expression(op) => self.expression(id, op),
            NodeKind::MethodCall => self.method_call(id),
            NodeKind::ReturnStatement => self.return_statement(id),
            NodeKind::SelectionStatement => self.selection(id),
            NodeKind::IterationStatement => self.iteration(id),
            NodeKind::Block => {
                self.table.open_scope();
                self.visit_children(id);
                self.table.close_scope();
            }
            NodeKind::CompilationUnit
            | NodeKind::ClassBody
            | NodeKind::Modifiers(_)
            | NodeKind::MethodSignature
            | NodeKind::ParameterList
            | NodeKind::Parameter
            | NodeKind::NameList
            | NodeKind::ArgumentList
            | NodeKind::EmptyStatement => self.visit_children(id),
        }
    }

    fn visit_children(&mut self, id: NodeId) {
        for child in self.ast.child_ids(id) {
            self.visit(child);
        }
    }

    /// Visit a construct body whose scope the caller already opened.
    fn visit_body(&mut self, id: NodeId) {
        if *self.ast.kind(id) == NodeKind::Block {
            self.visit_children(id);
        } else {
            self.visit(id);
        }
    }

    fn modifiers(&self, id: NodeId) -> Vec<Modifier> {
        match self.ast.kind(id) {
            NodeKind::Modifiers(mods) => mods.clone(),
            _ => Vec::new(),
        }
    }

    /// The class or struct whose body is the innermost scope.
    fn enclosing_object(&self) -> Option<ObjectType> {
        let context = self.table.current_context()?;
        match self.ast.attrs(context) {
            Attributes::ObjectType(ObjectTypeAttributes { ty }) => ty.object().cloned(),
            _ => None,
        }
    }

    /// Resolve a type specifier node to the type it denotes.
    fn type_specifier(&mut self, id: NodeId) -> TypeDescriptor {
        let ty = match self.ast.kind(id).clone() {
            NodeKind::PrimitiveType(kind) => self.primitive_type(kind),
            NodeKind::QualifiedName | NodeKind::Identifier(_) => {
                self.visit(id);
                let resolved = self.ast.attrs_of(id).map(|a| self.ast.attrs(a).as_type().cloned());
                match resolved {
                    Some(Some(ty)) => ty,
                    Some(None) => {
                        let name = self.ast.dotted_name(id);
                        self.report(Diagnostic::NotAType(name));
                        TypeDescriptor::Error
                    }
                    // not found, already reported
                    None => TypeDescriptor::Error,
                }
            }
            NodeKind::ArraySpecifier => match self.ast.child(id, 0) {
                Some(elem) => match self.type_specifier(elem) {
                    TypeDescriptor::Error => TypeDescriptor::Error,
                    elem => TypeDescriptor::Array(Box::new(elem)),
                },
                None => {
                    self.internal(id, "array specifier without element type");
                    TypeDescriptor::Error
                }
            },
            _ => {
                self.internal(id, "expected a type specifier");
                TypeDescriptor::Error
            }
        };
        self.set_ty(id, ty.clone());
        ty
    }

    fn primitive_type(&mut self, kind: PrimitiveKind) -> TypeDescriptor {
        let name = kind.builtin_name();
        match self.table.lookup(name).and_then(|a| self.ast.attrs(a).as_type().cloned()) {
            Some(ty) => ty,
            None => {
                self.report(Diagnostic::NotAType(name.to_owned()));
                TypeDescriptor::Error
            }
        }
    }

    fn object_declaration(&mut self, id: NodeId, is_struct: bool) {
        let [mods, name_node, body] = self.ast.child_ids(id)[..] else {
            self.internal(id, "malformed type declaration");
            return;
        };
        let name = self.name_of(name_node);
        debug!("declare {} {name}", if is_struct { "struct" } else { "class" });

        let wire_name = match self.enclosing_object() {
            Some(outer) if is_struct => format!("{}/{name}", outer.wire_name),
            _ => name.clone(),
        };
        // The member scope is opened first so the descriptor can own it; the type name
        // itself goes into the scope that was current before.
        let scope = self.table.open_scope();
        let object = ObjectType {
            name: name.clone(),
            wire_name,
            scope,
            modifiers: self.modifiers(mods),
            constructor: None,
        };
        let ty = if is_struct {
            TypeDescriptor::Struct(object)
        } else {
            TypeDescriptor::Class(object)
        };
        let attrs = self
            .ast
            .alloc_attrs(Attributes::ObjectType(ObjectTypeAttributes { ty: ty.clone() }));
        if !self.table.enter_into_outer_scope(&name, attrs) {
            self.report(Diagnostic::Redeclaration(name));
        }
        self.table.set_context(attrs);
        self.ast.set_attrs(name_node, attrs);
        self.set_ty(name_node, ty);

        self.visit(mods);
        self.visit(body);
        self.table.close_scope();

        // picks up the constructor if the body declared one
        let ty = self.ast.attrs(attrs).as_type().cloned().unwrap_or(TypeDescriptor::Error);
        self.ast.set_attrs(id, attrs);
        self.set_ty(id, ty);
    }

    /// Shared by field and local declarations: resolve the type and reject `VOID`.
    fn declared_type(&mut self, ty_node: NodeId, names: NodeId) -> TypeDescriptor {
        let ty = self.type_specifier(ty_node);
        if ty == TypeDescriptor::Void {
            let names = self.ast.dotted_name(names).replace('.', ", ");
            self.report(Diagnostic::VoidDeclaration(names));
            return TypeDescriptor::Error;
        }
        ty
    }

    fn field_declaration(&mut self, id: NodeId) {
        let [mods, ty_node, names] = self.ast.child_ids(id)[..] else {
            self.internal(id, "malformed field declaration");
            return;
        };
        let modifiers = self.modifiers(mods);
        let ty = self.declared_type(ty_node, names);
        self.set_ty(id, ty.clone());
        let declared_in = self.enclosing_object().map(|o| o.wire_name);

        for ident in self.ast.child_ids(names) {
            let name = self.name_of(ident);
            let var = VariableAttributes {
                declared_in: declared_in.clone(),
                // storage for fields is zeroed by the runtime
                initialized: true,
                ..VariableAttributes::new(name.clone(), ty.clone())
            };
            let attrs = self.ast.alloc_attrs(Attributes::Field(FieldAttributes {
                var,
                modifiers: modifiers.clone(),
            }));
            self.ast.set_attrs(ident, attrs);
            self.set_ty(ident, ty.clone());
            if !self.table.enter(&name, attrs) {
                self.report(Diagnostic::Redeclaration(name));
                self.set_error(id);
            }
        }
    }

    fn local_variable_declaration(&mut self, id: NodeId) {
        let [ty_node, names] = self.ast.child_ids(id)[..] else {
            self.internal(id, "malformed local variable declaration");
            return;
        };
        let ty = self.declared_type(ty_node, names);
        self.set_ty(id, ty.clone());

        for ident in self.ast.child_ids(names) {
            let name = self.name_of(ident);
            let attrs = self.ast.alloc_attrs(Attributes::Variable(VariableAttributes::new(
                name.clone(),
                ty.clone(),
            )));
            self.ast.set_attrs(ident, attrs);
            self.set_ty(ident, ty.clone());
            if !self.table.enter(&name, attrs) {
                self.report(Diagnostic::Redeclaration(name));
                self.set_error(id);
            }
        }
    }

    /// Build a signature, entering its parameters into the freshly opened parameter scope.
    fn signature(&mut self, id: NodeId) -> MethodSignatureAttributes {
        let children = self.ast.child_ids(id);
        let name = children.first().map(|&n| self.name_of(n)).unwrap_or_default();
        let mut sig = MethodSignatureAttributes::new(name);

        if let Some(&list) = children.get(1) {
            for param in self.ast.child_ids(list) {
                let [ty_node, ident] = self.ast.child_ids(param)[..] else {
                    self.internal(param, "malformed parameter");
                    continue;
                };
                let pname = self.name_of(ident);
                let mut ty = self.type_specifier(ty_node);
                if ty == TypeDescriptor::Void {
                    self.report(Diagnostic::VoidDeclaration(pname.clone()));
                    ty = TypeDescriptor::Error;
                }
                let attrs = self
                    .ast
                    .alloc_attrs(Attributes::Variable(VariableAttributes::param(
                        pname.clone(),
                        ty.clone(),
                    )));
                self.ast.set_attrs(ident, attrs);
                self.set_ty(ident, ty.clone());
                if !self.table.enter(&pname, attrs) {
                    self.report(Diagnostic::Redeclaration(pname));
                    self.set_error(ident);
                }
                sig.push_param(attrs, ty);
            }
        }

        let attrs = self.ast.alloc_attrs(Attributes::MethodSignature(sig.clone()));
        self.ast.set_attrs(id, attrs);
        sig
    }

    fn method_declaration(&mut self, id: NodeId) {
        let [mods, ty_node, sig_node, body] = self.ast.child_ids(id)[..] else {
            self.internal(id, "malformed method declaration");
            return;
        };
        let modifiers = self.modifiers(mods);
        let is_static = modifiers.contains(&Modifier::Static);
        let return_type = self.type_specifier(ty_node);
        let declared_in = self.enclosing_object().map(|o| o.wire_name);

        self.table.open_scope();
        let sig = self.signature(sig_node);
        let name = sig.name.clone();
        debug!("declare method {name}");
        self.set_ty(id, return_type.clone());
        if let Some(ident) = self.ast.child(sig_node, 0) {
            self.set_ty(ident, return_type.clone());
        }

        // Overloads extend the method already declared in the enclosing scope.
        let existing = self
            .table
            .outer_scope()
            .and_then(|scope| self.table.lookup_in(scope, &name));
        let method = match existing.map(|a| (a, self.ast.attrs(a).as_method().cloned())) {
            Some((attrs, Some(method))) => {
                if method.signatures.contains(&sig) {
                    self.report(Diagnostic::DuplicateSignature(name));
                    self.set_error(id);
                } else if !method.return_type.same_kind(&return_type) {
                    self.report(Diagnostic::ReturnTypeConflict {
                        name,
                        expected: method.return_type.kind(),
                        got: return_type.kind(),
                    });
                    self.set_error(id);
                } else if method.is_static != is_static {
                    // one calling convention per method name
                    self.report(Diagnostic::StaticConflict(name));
                    self.set_error(id);
                } else if let Some(method) = self.ast.attrs_mut(attrs).as_method_mut() {
                    method.signatures.push(sig);
                }
                attrs
            }
            other => {
                let attrs = self.ast.alloc_attrs(Attributes::Method(MethodAttributes {
                    name: name.clone(),
                    signatures: vec![sig],
                    modifiers,
                    return_type,
                    is_static,
                    declared_in,
                    library: None,
                }));
                // a field or type already owns the name
                if other.is_some() || !self.table.enter_into_outer_scope(&name, attrs) {
                    self.report(Diagnostic::Redeclaration(name));
                    self.set_error(id);
                }
                attrs
            }
        };

        self.ast.set_attrs(id, method);
        self.table.set_context(method);
        self.visit_body(body);
        self.table.close_scope();
    }

    fn constructor_declaration(&mut self, id: NodeId) {
        let [mods, sig_node, body] = self.ast.child_ids(id)[..] else {
            self.internal(id, "malformed constructor declaration");
            return;
        };
        let modifiers = self.modifiers(mods);

        self.table.open_scope();
        let sig = self.signature(sig_node);
        let name = sig.name.clone();
        let ctor = self.ast.alloc_attrs(Attributes::Constructor(ConstructorAttributes {
            signatures: vec![sig],
            modifiers,
        }));
        self.ast.set_attrs(id, ctor);

        let owner = match self.table.outer_context() {
            Some(class) => match self.class_mut(class) {
                Some(object) if object.constructor.is_some() => {
                    Err(Diagnostic::DuplicateConstructor(object.name.clone()))
                }
                Some(object) => {
                    object.constructor = Some(ctor);
                    Ok(TypeDescriptor::Class(object.clone()))
                }
                None => Err(Diagnostic::ConstructorOutsideClass(name)),
            },
            None => Err(Diagnostic::ConstructorOutsideClass(name)),
        };
        let ident = self.ast.child(sig_node, 0);
        match owner {
            Ok(ty) => {
                if let Some(ident) = ident {
                    self.set_ty(ident, ty.clone());
                }
                self.set_ty(id, ty);
            }
            Err(diagnostic) => {
                self.report(diagnostic);
                self.set_error(id);
                if let Some(ident) = ident {
                    self.set_error(ident);
                }
            }
        }

        self.table.set_context(ctor);
        self.visit_body(body);
        self.table.close_scope();
    }

    fn class_mut(&mut self, attrs: AttrId) -> Option<&mut ObjectType> {
        match self.ast.attrs_mut(attrs) {
            Attributes::ObjectType(ObjectTypeAttributes {
                ty: TypeDescriptor::Class(object),
            }) => Some(object),
            _ => None,
        }
    }

    /// Resolve one name component in `lookup`, annotate it, and return where the next
    /// component should be looked up.
    fn resolve_component(&mut self, id: NodeId, lookup: Lookup) -> Lookup {
        let name = self.name_of(id);
        let found = match lookup {
            Lookup::Table => self.table.lookup(&name),
            Lookup::Members(scope) => self.table.lookup_in(scope, &name),
            Lookup::Nothing => None,
        };
        let Some(attrs) = found else {
            self.report(Diagnostic::NotFound(name));
            self.set_error(id);
            return Lookup::Nothing;
        };
        self.ast.set_attrs(id, attrs);

        let (ty, next) = match self.ast.attrs(attrs) {
            Attributes::ObjectType(ObjectTypeAttributes { ty }) => {
                let next = ty.object().map_or(Lookup::Nothing, |o| Lookup::Members(o.scope));
                (ty.clone(), next)
            }
            Attributes::Method(method) => (method.return_type.clone(), Lookup::Nothing),
            Attributes::Variable(var) | Attributes::Field(FieldAttributes { var, .. }) => {
                let next = var.ty.object().map_or(Lookup::Nothing, |o| Lookup::Members(o.scope));
                (var.ty.clone(), next)
            }
            Attributes::Type(TypeAttributes { ty }) => (ty.clone(), Lookup::Nothing),
            _ => (TypeDescriptor::Error, Lookup::Nothing),
        };
        self.set_ty(id, ty);
        next
    }

    fn qualified_name(&mut self, id: NodeId) {
        let mut lookup = Lookup::Table;
        let mut last = None;
        for component in self.ast.child_ids(id) {
            lookup = self.resolve_component(component, lookup);
            last = Some(component);
        }
        let Some(last) = last else {
            self.internal(id, "empty qualified name");
            return;
        };
        let ty = self.ty(last);
        self.set_ty(id, ty);
        if let Some(attrs) = self.ast.attrs_of(last) {
            self.ast.set_attrs(id, attrs);
        }
    }

    /// Name of `operand` if it is a variable read before any write.
    fn uninitialized(&self, operand: NodeId) -> Option<String> {
        if !matches!(
            self.ast.kind(operand),
            NodeKind::QualifiedName | NodeKind::Identifier(_)
        ) {
            return None;
        }
        let var = self.ast.attrs(self.ast.attrs_of(operand)?).as_variable()?;
        (!var.initialized).then(|| var.id.clone())
    }

    fn expression(&mut self, id: NodeId, op: ExprKind) {
        let [lhs, rhs] = self.ast.child_ids(id)[..] else {
            self.internal(id, "binary expression without two operands");
            return;
        };
        if op == ExprKind::Assign {
            self.visit(rhs);
            self.visit(lhs);
            self.assignment(id, lhs, rhs);
            return;
        }

        self.visit(lhs);
        self.visit(rhs);
        let (l, r) = (self.ty(lhs), self.ty(rhs));
        if l.is_error() || r.is_error() {
            self.set_error(id);
            return;
        }

        let mismatch = |expected| Diagnostic::OperandMismatch {
            op,
            expected,
            lhs: l.kind(),
            rhs: r.kind(),
        };
        let result = match op.family() {
            OpFamily::Arithmetic => {
                if let Some(name) = self.uninitialized(lhs).or_else(|| self.uninitialized(rhs)) {
                    Err(Diagnostic::Uninitialized(name))
                } else if l == TypeDescriptor::Integer && r == TypeDescriptor::Integer {
                    Ok(TypeDescriptor::Integer)
                } else {
                    Err(mismatch("INT"))
                }
            }
            OpFamily::Logical => {
                if l == TypeDescriptor::Boolean && r == TypeDescriptor::Boolean {
                    Ok(TypeDescriptor::Boolean)
                } else {
                    Err(mismatch("BOOLEAN"))
                }
            }
            OpFamily::Relational => {
                if l.is_primitive_value() && l.same_kind(&r) {
                    Ok(TypeDescriptor::Boolean)
                } else {
                    Err(mismatch("INT or String on both sides"))
                }
            }
            OpFamily::Assign => unreachable!("assignment handled above"),
        };
        match result {
            Ok(ty) => self.set_ty(id, ty),
            Err(diagnostic) => {
                self.report(diagnostic);
                self.set_error(id);
            }
        }
    }

    fn assignment(&mut self, id: NodeId, lhs: NodeId, rhs: NodeId) {
        let (l, r) = (self.ty(lhs), self.ty(rhs));
        let assignable = matches!(
            self.ast.kind(lhs),
            NodeKind::QualifiedName | NodeKind::Identifier(_)
        );
        let target = self
            .ast
            .attrs_of(lhs)
            .filter(|&a| assignable && self.ast.attrs(a).as_variable().is_some());

        let Some(target) = target else {
            // an unresolved target was reported by its own lookup
            if !(l.is_error() || r.is_error()) {
                let what = if assignable {
                    self.ast.dotted_name(lhs)
                } else {
                    self.ast.kind(lhs).to_string()
                };
                self.report(Diagnostic::Unassignable(what));
            }
            self.set_error(id);
            return;
        };
        if l.is_error() || r.is_error() {
            self.set_error(id);
            return;
        }
        if !l.same_kind(&r) {
            self.report(Diagnostic::AssignMismatch {
                expected: l.kind(),
                got: r.kind(),
            });
            self.set_error(id);
            return;
        }

        if let Some(var) = self.ast.attrs_mut(target).as_variable_mut() {
            var.initialized = true;
        }
        self.set_ty(id, l);
    }

    fn method_call(&mut self, id: NodeId) {
        self.visit_children(id);
        let children = self.ast.child_ids(id);
        let Some(&callee) = children.first() else {
            self.internal(id, "method call without callee");
            return;
        };
        let args: Vec<TypeDescriptor> = children
            .get(1)
            .map(|&list| self.ast.child_ids(list))
            .unwrap_or_default()
            .into_iter()
            .map(|arg| self.ty(arg))
            .collect();
        let call_name = self.ast.dotted_name(callee);

        let Some(attrs) = self.ast.attrs_of(callee) else {
            // lookup failure already reported
            self.set_error(id);
            return;
        };
        let Some(method) = self.ast.attrs(attrs).as_method().cloned() else {
            self.report(Diagnostic::NotAMethod(call_name));
            self.set_error(id);
            return;
        };
        if args.iter().any(TypeDescriptor::is_error) {
            self.set_error(id);
            return;
        }

        // first structural match in declaration order wins
        let Some(signature) = method.signatures.iter().position(|s| s.accepts(&args)) else {
            let shape = args
                .iter()
                .map(|a| a.kind().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            self.report(Diagnostic::NoMatchingOverload {
                name: call_name,
                args: shape,
            });
            self.set_error(id);
            return;
        };
        let unqualified_name = self
            .ast
            .children(callee)
            .last()
            .map_or_else(|| self.name_of(callee), |last| self.name_of(last));
        trace!("{call_name} resolved to signature {signature}");

        let call = self.ast.alloc_attrs(Attributes::MethodCall(MethodCallAttributes {
            method: attrs,
            signature,
            argument_types: args,
            call_name,
            unqualified_name,
        }));
        self.ast.set_attrs(id, call);
        self.set_ty(id, method.return_type);
    }

    /// The method whose body we are directly in, looking at most one scope out.
    fn enclosing_method(&self) -> Option<AttrId> {
        [self.table.current_context(), self.table.outer_context()]
            .into_iter()
            .flatten()
            .find(|&attrs| self.ast.attrs(attrs).as_method().is_some())
    }

    fn return_statement(&mut self, id: NodeId) {
        self.visit_children(id);
        let value = self
            .ast
            .child(id, 0)
            .map_or(TypeDescriptor::Void, |v| self.ty(v));

        let Some(method) = self.enclosing_method() else {
            self.report(Diagnostic::ReturnOutsideMethod);
            self.set_error(id);
            return;
        };
        let expected = self
            .ast
            .attrs(method)
            .as_method()
            .map_or(TypeDescriptor::Error, |m| m.return_type.clone());
        if value.is_error() || expected.is_error() {
            self.set_error(id);
        } else if !value.same_kind(&expected) {
            self.report(Diagnostic::ReturnMismatch {
                expected: expected.kind(),
                got: value.kind(),
            });
            self.set_error(id);
        } else {
            self.set_ty(id, value);
        }
    }

    fn condition(&mut self, id: NodeId, cond: NodeId, what: &'static str) {
        let ty = self.ty(cond);
        if matches!(ty.kind(), TypeKind::Boolean | TypeKind::Error) {
            self.set_ty(id, ty);
        } else {
            self.report(Diagnostic::NonBooleanCondition(what));
            self.set_error(id);
        }
    }

    fn selection(&mut self, id: NodeId) {
        let children = self.ast.child_ids(id);
        let Some((&cond, branches)) = children.split_first() else {
            self.internal(id, "if statement without condition");
            return;
        };
        // each branch gets its own scope so both may declare the same names
        self.table.open_scope();
        self.visit(cond);
        if let Some(&then) = branches.first() {
            self.visit_body(then);
        }
        self.table.close_scope();
        if let Some(&otherwise) = branches.get(1) {
            self.table.open_scope();
            self.visit_body(otherwise);
            self.table.close_scope();
        }
        self.condition(id, cond, "if");
    }

    fn iteration(&mut self, id: NodeId) {
        let [cond, body] = self.ast.child_ids(id)[..] else {
            self.internal(id, "malformed while statement");
            return;
        };
        self.table.open_scope();
        self.visit(cond);
        self.visit_body(body);
        self.table.close_scope();
        self.condition(id, cond, "while");
    }
}
