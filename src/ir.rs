//! Stack-machine code generation.
//!
//! Walks a tree annotated by [`crate::analyze`] and writes IL assembly text. Method
//! bodies are collected into an [`InstBuf`] first, since the `.locals` directive in
//! the method header is only known once the whole body has been lowered.

use std::fmt::Display;
use std::io::Write;

use log::{debug, trace};

use crate::ast::{Ast, AttrId, ExprKind, Modifier, NodeId, NodeKind};
use crate::attributes::{
    Attributes, MethodAttributes, MethodSignatureAttributes, VariableAttributes,
};
use crate::types::TypeDescriptor;
use crate::CodegenError;

const OBJECT_CTOR: &str = "instance void [mscorlib]System.Object::.ctor()";
const VALUE_TYPE: &str = "[mscorlib]System.ValueType";

/// Knobs for the emitted module.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Options {
    pub assembly: String,
    /// Methods with this name are emitted static and marked `.entrypoint`.
    pub entry_point: String,
    pub max_stack: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            assembly: "program".to_owned(),
            entry_point: "main".to_owned(),
            max_stack: 32,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LabelKind {
    True,
    End,
    False,
    Loop,
}

/// A branch target. The index comes from one counter shared by the whole module,
/// so a label name is never emitted twice.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Label {
    pub kind: LabelKind,
    pub index: u32,
}

impl Label {
    pub fn new(kind: LabelKind, index: u32) -> Self {
        Self { kind, index }
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            LabelKind::True => write!(f, "T{}", self.index),
            LabelKind::End => write!(f, "E{}", self.index),
            LabelKind::False => write!(f, "F{}", self.index),
            LabelKind::Loop => write!(f, "LOOP_{}", self.index),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cond {
    Eq,
    Ne,
    Gt,
    Lt,
    Le,
    Ge,
}

impl Cond {
    fn of(op: ExprKind) -> Option<Self> {
        Some(match op {
            ExprKind::Equal => Self::Eq,
            ExprKind::NotEqual => Self::Ne,
            ExprKind::Greater => Self::Gt,
            ExprKind::Less => Self::Lt,
            ExprKind::LessEqual => Self::Le,
            ExprKind::GreaterEqual => Self::Ge,
            _ => return None,
        })
    }
}

impl Display for Cond {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Eq => "beq",
                Self::Ne => "bne.un",
                Self::Gt => "bgt",
                Self::Lt => "blt",
                Self::Le => "ble",
                Self::Ge => "bge",
            }
        )
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Il {
    Ldarg(u32),
    Ldloc(u32),
    Starg(u32),
    Stloc(u32),
    Ldfld(String),
    Stfld(String),
    Ldsfld(String),
    Stsfld(String),
    LdcI4(i32),
    Ldstr(String),
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Branch(Cond, Label),
    Br(Label),
    Brfalse(Label),
    Ret,
    Call(String),
    Pop,
    Dup,
    /// Places a label on the next instruction.
    Mark(Label),
}

impl Display for Il {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ldarg(n) => write!(f, "ldarg {n}"),
            Self::Ldloc(n) => write!(f, "ldloc {n}"),
            Self::Starg(n) => write!(f, "starg {n}"),
            Self::Stloc(n) => write!(f, "stloc {n}"),
            Self::Ldfld(field) => write!(f, "ldfld {field}"),
            Self::Stfld(field) => write!(f, "stfld {field}"),
            Self::Ldsfld(field) => write!(f, "ldsfld {field}"),
            Self::Stsfld(field) => write!(f, "stsfld {field}"),
            Self::LdcI4(n) => write!(f, "ldc.i4 {n}"),
            Self::Ldstr(s) => write!(f, "ldstr \"{}\"", il_string(s)),
            Self::Add => write!(f, "add"),
            Self::Sub => write!(f, "sub"),
            Self::Mul => write!(f, "mul"),
            Self::Div => write!(f, "div"),
            Self::Rem => write!(f, "rem"),
            Self::And => write!(f, "and"),
            Self::Or => write!(f, "or"),
            Self::Xor => write!(f, "xor"),
            Self::Branch(cond, l) => write!(f, "{cond} {l}"),
            Self::Br(l) => write!(f, "br {l}"),
            Self::Brfalse(l) => write!(f, "brfalse {l}"),
            Self::Ret => write!(f, "ret"),
            Self::Call(target) => write!(f, "call {target}"),
            Self::Pop => write!(f, "pop"),
            Self::Dup => write!(f, "dup"),
            Self::Mark(l) => write!(f, "{l}:"),
        }
    }
}

pub type InstBuf = Vec<Il>;

/// How a variable is addressed. Chosen from the variable's own attributes.
#[derive(Clone, Debug)]
enum Place {
    Arg(u32),
    Local(u32),
    Static(String),
    /// Needs the receiver under the value on the stack.
    Instance(String),
}

fn modifier_list(mods: &[Modifier]) -> String {
    mods.iter().map(|m| format!("{m} ")).collect()
}

/// Escape `s` for an ilasm string literal: C-style escapes, octal for other control characters.
fn il_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_ascii_control() => out.push_str(&format!("\\{:03o}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

fn wire_list(types: &[TypeDescriptor]) -> String {
    types
        .iter()
        .map(TypeDescriptor::wire_name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Write the module for `ast` to `out`.
///
/// # Errors
/// If writing fails, or if the tree still carries the error type (or no type at all)
/// somewhere code has to be emitted for. Run [`crate::analyze`] first and only generate
/// when it reported nothing.
pub fn generate<W: Write>(
    ast: &mut Ast,
    options: &Options,
    out: &mut W,
) -> Result<(), CodegenError> {
    let mut cg = Generator {
        ast,
        options,
        out,
        indent: 0,
        class: String::new(),
        method_static: false,
        arg_offset: 0,
        slots: 0,
        labels: 0,
        buf: InstBuf::new(),
        locals: Vec::new(),
    };
    cg.line(".assembly extern mscorlib {}")?;
    cg.line(format!(".assembly {} {{}}", options.assembly))?;
    if let Some(root) = cg.ast.root() {
        for class in cg.ast.child_ids(root) {
            cg.object_declaration(class)?;
        }
    }
    debug!("code generation used {} label index(es)", cg.labels);
    Ok(())
}

struct Generator<'a, W> {
    ast: &'a mut Ast,
    options: &'a Options,
    out: &'a mut W,
    indent: usize,
    /// Wire name of the type being emitted.
    class: String,
    method_static: bool,
    /// 1 inside instance methods, where argument 0 is the receiver.
    arg_offset: u32,
    /// Next local slot; reset per method.
    slots: u32,
    /// Next label index; never reset.
    labels: u32,
    buf: InstBuf,
    locals: Vec<String>,
}

impl<W: Write> Generator<'_, W> {
    fn line(&mut self, text: impl Display) -> Result<(), CodegenError> {
        writeln!(self.out, "{:width$}{text}", "", width = self.indent * 4)?;
        Ok(())
    }

    fn checked_ty(&self, id: NodeId) -> Result<TypeDescriptor, CodegenError> {
        match self.ast.ty(id) {
            None => Err(CodegenError::Unannotated(id)),
            Some(TypeDescriptor::Error) => Err(CodegenError::ErrorNode(id)),
            Some(ty) => Ok(ty.clone()),
        }
    }

    fn attrs(&self, id: NodeId) -> Result<&Attributes, CodegenError> {
        let attrs = self.ast.attrs_of(id).ok_or(CodegenError::Unannotated(id))?;
        Ok(self.ast.attrs(attrs))
    }

    fn unexpected(id: NodeId, expected: &'static str, found: &Attributes) -> CodegenError {
        CodegenError::UnexpectedAttributes {
            node: id,
            expected,
            found: found.kind_name(),
        }
    }

    fn children<const N: usize>(&self, id: NodeId) -> Result<[NodeId; N], CodegenError> {
        self.ast
            .child_ids(id)
            .try_into()
            .map_err(|_| CodegenError::Malformed(id))
    }

    fn name(&self, id: NodeId) -> Result<String, CodegenError> {
        self.ast
            .name(id)
            .map(str::to_owned)
            .ok_or(CodegenError::Malformed(id))
    }

    fn modifiers(&self, id: NodeId) -> Vec<Modifier> {
        match self.ast.kind(id) {
            NodeKind::Modifiers(mods) => mods.clone(),
            _ => Vec::new(),
        }
    }

    fn next_label(&mut self) -> u32 {
        let index = self.labels;
        self.labels += 1;
        trace!("label index {index}");
        index
    }

    fn object_declaration(&mut self, id: NodeId) -> Result<(), CodegenError> {
        let ty = self.checked_ty(id)?;
        let [_, _, body] = self.children::<3>(id)?;
        let (object, is_struct) = match &ty {
            TypeDescriptor::Class(object) => (object, false),
            TypeDescriptor::Struct(object) => (object, true),
            other => {
                return Err(CodegenError::UnsupportedConstruct(format!(
                    "{other} as a type declaration"
                )))
            }
        };
        debug!("emit type {}", object.wire_name);

        let mods = modifier_list(&object.modifiers);
        if is_struct {
            self.line(format!(
                ".class nested {mods}sequential sealed value {} extends {VALUE_TYPE}",
                object.name
            ))?;
        } else {
            self.line(format!(".class {mods}{}", object.name))?;
        }
        self.line("{")?;
        self.indent += 1;
        let outer = std::mem::replace(&mut self.class, object.wire_name.clone());

        for member in self.ast.child_ids(body) {
            let kind = self.ast.kind(member).clone();
            match kind {
                NodeKind::FieldDeclaration => self.field_declaration(member)?,
                NodeKind::MethodDeclaration => self.method_declaration(member)?,
                NodeKind::ConstructorDeclaration => self.constructor_declaration(member)?,
                NodeKind::StructDeclaration => self.object_declaration(member)?,
                other => return Err(CodegenError::UnsupportedConstruct(other.to_string())),
            }
        }

        self.class = outer;
        self.indent -= 1;
        self.line("}")
    }

    fn field_declaration(&mut self, id: NodeId) -> Result<(), CodegenError> {
        let ty = self.checked_ty(id)?;
        let [mods, _, names] = self.children::<3>(id)?;
        let mods = modifier_list(&self.modifiers(mods));
        for ident in self.ast.child_ids(names) {
            let name = self.name(ident)?;
            self.line(format!(".field {mods}{} {name}", ty.wire_name()))?;
        }
        Ok(())
    }

    fn signature(&self, id: NodeId) -> Result<MethodSignatureAttributes, CodegenError> {
        match self.attrs(id)? {
            Attributes::MethodSignature(sig) => Ok(sig.clone()),
            other => Err(Self::unexpected(id, "method signature", other)),
        }
    }

    /// Reset per-method state and give each parameter its argument index.
    fn begin_method(&mut self, is_static: bool, parameters: &[AttrId]) {
        self.method_static = is_static;
        self.arg_offset = u32::from(!is_static);
        self.slots = 0;
        self.buf.clear();
        self.locals.clear();
        for (i, &param) in parameters.iter().enumerate() {
            let slot = i as u32 + self.arg_offset;
            if let Some(var) = self.ast.attrs_mut(param).as_variable_mut() {
                var.storage_slot = Some(slot);
            }
        }
    }

    /// The entry point is emitted static whatever its declaration says.
    fn emitted_static(&self, method: &MethodAttributes) -> bool {
        method.is_static || method.name == self.options.entry_point
    }

    fn close_void_body(&mut self) {
        if self.buf.last() != Some(&Il::Ret) {
            self.buf.push(Il::Ret);
        }
    }

    fn emit_method(&mut self, header: &str, is_entry: bool) -> Result<(), CodegenError> {
        self.line(header)?;
        self.line("{")?;
        self.indent += 1;
        if is_entry {
            self.line(".entrypoint")?;
        }
        let max_stack = self.options.max_stack;
        self.line(format!(".maxstack {max_stack}"))?;
        if !self.locals.is_empty() {
            let locals = self
                .locals
                .iter()
                .enumerate()
                .map(|(i, ty)| format!("{ty} V_{i}"))
                .collect::<Vec<_>>()
                .join(", ");
            self.line(format!(".locals init ({locals})"))?;
        }
        for il in std::mem::take(&mut self.buf) {
            self.line(il)?;
        }
        self.indent -= 1;
        self.line("}")
    }

    fn method_declaration(&mut self, id: NodeId) -> Result<(), CodegenError> {
        let return_type = self.checked_ty(id)?;
        let [mods, _, sig, body] = self.children::<4>(id)?;
        let is_static = match self.attrs(id)? {
            Attributes::Method(method) => self.emitted_static(method),
            other => return Err(Self::unexpected(id, "method", other)),
        };
        let signature = self.signature(sig)?;
        let is_entry = signature.name == self.options.entry_point;
        debug!("emit method {}::{}", self.class, signature.name);

        self.begin_method(is_static, &signature.parameters);
        self.statement(body)?;
        if return_type == TypeDescriptor::Void {
            self.close_void_body();
        }

        let mut modifiers = self.modifiers(mods);
        modifiers.retain(|m| *m != Modifier::Static);
        let header = format!(
            ".method {}{}{} {}({})",
            modifier_list(&modifiers),
            if is_static { "static " } else { "" },
            return_type.wire_name(),
            signature.name,
            wire_list(&signature.parameter_types),
        );
        self.emit_method(&header, is_entry)
    }

    fn constructor_declaration(&mut self, id: NodeId) -> Result<(), CodegenError> {
        self.checked_ty(id)?;
        let [mods, sig, body] = self.children::<3>(id)?;
        let signature = self.signature(sig)?;
        debug!("emit constructor {}::.ctor", self.class);

        self.begin_method(false, &signature.parameters);
        self.buf.push(Il::Ldarg(0));
        self.buf.push(Il::Call(OBJECT_CTOR.to_owned()));
        self.statement(body)?;
        self.close_void_body();

        let header = format!(
            ".method {}specialname rtspecialname instance void .ctor({})",
            modifier_list(&self.modifiers(mods)),
            wire_list(&signature.parameter_types),
        );
        self.emit_method(&header, false)
    }

    fn statement(&mut self, id: NodeId) -> Result<(), CodegenError> {
        let kind = self.ast.kind(id).clone();
        trace!("emit {id} {kind}");
        match kind {
            NodeKind::Block => {
                for stmt in self.ast.child_ids(id) {
                    self.statement(stmt)?;
                }
            }
            NodeKind::EmptyStatement => {}
            NodeKind::LocalVariableDeclaration => self.local_variable_declaration(id)?,
            NodeKind::SelectionStatement => self.selection(id)?,
            NodeKind::IterationStatement => self.iteration(id)?,
            NodeKind::ReturnStatement => {
                self.checked_ty(id)?;
                if let Some(value) = self.ast.child(id, 0) {
                    self.expression(value, true)?;
                }
                self.buf.push(Il::Ret);
            }
            NodeKind::Expression(_)
            | NodeKind::MethodCall
            | NodeKind::QualifiedName
            | NodeKind::Identifier(_)
            | NodeKind::IntConst(_)
            | NodeKind::StrConst(_)
            | NodeKind::BoolConst(_) => self.expression(id, false)?,
            other => return Err(CodegenError::UnsupportedConstruct(other.to_string())),
        }
        Ok(())
    }

    fn variable_mut(&mut self, id: NodeId) -> Result<&mut VariableAttributes, CodegenError> {
        let attrs = self.ast.attrs_of(id).ok_or(CodegenError::Unannotated(id))?;
        match self.ast.attrs_mut(attrs) {
            Attributes::Variable(var) => Ok(var),
            other => Err(Self::unexpected(id, "variable", other)),
        }
    }

    fn local_variable_declaration(&mut self, id: NodeId) -> Result<(), CodegenError> {
        let ty = self.checked_ty(id)?;
        let [_, names] = self.children::<2>(id)?;
        for ident in self.ast.child_ids(names) {
            let slot = self.slots;
            self.slots += 1;
            self.locals.push(ty.wire_name());
            let var = self.variable_mut(ident)?;
            var.storage_slot = Some(slot);
            trace!("local {} in slot {slot}", var.id);
        }
        Ok(())
    }

    fn selection(&mut self, id: NodeId) -> Result<(), CodegenError> {
        self.checked_ty(id)?;
        let children = self.ast.child_ids(id);
        let Some((&cond, branches)) = children.split_first() else {
            return Err(CodegenError::Malformed(id));
        };
        let k = self.next_label();
        let (otherwise, end) = (Label::new(LabelKind::False, k), Label::new(LabelKind::End, k));

        self.expression(cond, true)?;
        self.buf.push(Il::Brfalse(otherwise));
        if let Some(&then) = branches.first() {
            self.statement(then)?;
        }
        let returned = self.buf.last() == Some(&Il::Ret);
        let else_branch = branches.get(1).copied();
        if else_branch.is_some() && !returned {
            self.buf.push(Il::Br(end));
        }
        self.buf.push(Il::Mark(otherwise));
        if let Some(stmt) = else_branch {
            self.statement(stmt)?;
        }
        if !returned {
            self.buf.push(Il::Mark(end));
        }
        Ok(())
    }

    fn iteration(&mut self, id: NodeId) -> Result<(), CodegenError> {
        self.checked_ty(id)?;
        let [cond, body] = self.children::<2>(id)?;
        let k = self.next_label();
        let (top, exit) = (Label::new(LabelKind::Loop, k), Label::new(LabelKind::End, k));

        self.buf.push(Il::Mark(top));
        self.expression(cond, true)?;
        self.buf.push(Il::Brfalse(exit));
        self.statement(body)?;
        self.buf.push(Il::Br(top));
        self.buf.push(Il::Mark(exit));
        Ok(())
    }

    /// Push the value of `id`, or leave the stack as it was if the value is unused.
    fn expression(&mut self, id: NodeId, used: bool) -> Result<(), CodegenError> {
        let ty = self.checked_ty(id)?;
        let kind = self.ast.kind(id).clone();
        trace!("emit {id} {kind}");
        match kind {
            NodeKind::Expression(ExprKind::Assign) => return self.assignment(id, used),
            NodeKind::MethodCall => {
                self.call(id)?;
                if !used && ty != TypeDescriptor::Void {
                    self.buf.push(Il::Pop);
                }
                return Ok(());
            }
            NodeKind::IntConst(n) => self.buf.push(Il::LdcI4(n)),
            NodeKind::StrConst(s) => self.buf.push(Il::Ldstr(s)),
            NodeKind::BoolConst(b) => self.buf.push(Il::LdcI4(i32::from(b))),
            NodeKind::QualifiedName | NodeKind::Identifier(_) => {
                let place = self.place(id)?;
                self.load(&place);
            }
            NodeKind::Expression(op) => self.binary(id, op)?,
            other => return Err(CodegenError::UnsupportedConstruct(other.to_string())),
        }
        if !used {
            self.buf.push(Il::Pop);
        }
        Ok(())
    }

    fn binary(&mut self, id: NodeId, op: ExprKind) -> Result<(), CodegenError> {
        let [lhs, rhs] = self.children::<2>(id)?;
        self.expression(lhs, true)?;
        self.expression(rhs, true)?;

        if let Some(cond) = Cond::of(op) {
            let k = self.next_label();
            let (t, e) = (Label::new(LabelKind::True, k), Label::new(LabelKind::End, k));
            self.buf.extend([
                Il::Branch(cond, t),
                Il::LdcI4(0),
                Il::Br(e),
                Il::Mark(t),
                Il::LdcI4(1),
                Il::Mark(e),
            ]);
            return Ok(());
        }
        let il = match op {
            ExprKind::Add => Il::Add,
            ExprKind::Sub => Il::Sub,
            ExprKind::Mul => Il::Mul,
            ExprKind::Div => Il::Div,
            ExprKind::Rem => Il::Rem,
            ExprKind::LogicalAnd | ExprKind::BitAnd => Il::And,
            ExprKind::LogicalOr | ExprKind::BitOr => Il::Or,
            ExprKind::BitXor => Il::Xor,
            _ => return Err(CodegenError::UnsupportedConstruct(format!("operator {op}"))),
        };
        self.buf.push(il);
        Ok(())
    }

    fn assignment(&mut self, id: NodeId, used: bool) -> Result<(), CodegenError> {
        let [lhs, rhs] = self.children::<2>(id)?;
        let place = self.place(lhs)?;
        if let Place::Instance(_) = place {
            // stfld wants the receiver below the value
            self.buf.push(Il::Ldarg(0));
            self.expression(rhs, true)?;
            self.store(&place);
            if used {
                self.load(&place);
            }
        } else {
            self.expression(rhs, true)?;
            if used {
                self.buf.push(Il::Dup);
            }
            self.store(&place);
        }
        Ok(())
    }

    fn place(&self, id: NodeId) -> Result<Place, CodegenError> {
        let (var, field) = match self.attrs(id)? {
            Attributes::Variable(var) => (var, None),
            Attributes::Field(field) => (&field.var, Some(field)),
            other => return Err(Self::unexpected(id, "variable", other)),
        };
        let Some(field) = field else {
            let slot = var.storage_slot.ok_or_else(|| {
                CodegenError::UnsupportedConstruct(format!("{} has no storage slot", var.id))
            })?;
            return Ok(if var.is_param {
                Place::Arg(slot)
            } else {
                Place::Local(slot)
            });
        };

        let owner = var.declared_in.as_deref().unwrap_or(self.class.as_str());
        let spec = format!("{} {owner}::{}", var.ty.wire_name(), var.id);
        if field.is_static() {
            return Ok(Place::Static(spec));
        }
        if self.ast.children(id).count() > 1 {
            return Err(CodegenError::UnsupportedConstruct(format!(
                "instance member access {}",
                self.ast.dotted_name(id)
            )));
        }
        if self.method_static {
            return Err(CodegenError::MissingReceiver(var.id.clone()));
        }
        Ok(Place::Instance(spec))
    }

    fn load(&mut self, place: &Place) {
        match place {
            Place::Arg(n) => self.buf.push(Il::Ldarg(*n)),
            Place::Local(n) => self.buf.push(Il::Ldloc(*n)),
            Place::Static(field) => self.buf.push(Il::Ldsfld(field.clone())),
            Place::Instance(field) => {
                self.buf.push(Il::Ldarg(0));
                self.buf.push(Il::Ldfld(field.clone()));
            }
        }
    }

    /// The value, and for instance fields the receiver under it, must already be pushed.
    fn store(&mut self, place: &Place) {
        self.buf.push(match place {
            Place::Arg(n) => Il::Starg(*n),
            Place::Local(n) => Il::Stloc(*n),
            Place::Static(field) => Il::Stsfld(field.clone()),
            Place::Instance(field) => Il::Stfld(field.clone()),
        });
    }

    fn call(&mut self, id: NodeId) -> Result<(), CodegenError> {
        let call = match self.attrs(id)? {
            Attributes::MethodCall(call) => call.clone(),
            other => return Err(Self::unexpected(id, "method call", other)),
        };
        let method = match self.ast.attrs(call.method) {
            Attributes::Method(method) => method.clone(),
            other => return Err(Self::unexpected(id, "method", other)),
        };
        let children = self.ast.child_ids(id);
        let Some((&callee, rest)) = children.split_first() else {
            return Err(CodegenError::Malformed(id));
        };
        let args = rest
            .first()
            .map(|&list| self.ast.child_ids(list))
            .unwrap_or_default();

        let ret = method.return_type.wire_name();
        let params = wire_list(&call.argument_types);
        let name = &call.unqualified_name;
        let target = if let Some(library) = &method.library {
            format!("{ret} {}::{name}({params})", library.wire_name())
        } else {
            let owner = method.declared_in.as_deref().unwrap_or(self.class.as_str());
            if self.emitted_static(&method) {
                format!("{ret} {owner}::{name}({params})")
            } else if self.ast.children(callee).count() > 1 {
                return Err(CodegenError::UnsupportedConstruct(format!(
                    "instance call through {}",
                    call.call_name
                )));
            } else if self.method_static {
                return Err(CodegenError::MissingReceiver(call.call_name));
            } else {
                let target = format!("instance {ret} {owner}::{name}({params})");
                self.buf.push(Il::Ldarg(0));
                target
            }
        };
        for arg in args {
            self.expression(arg, true)?;
        }
        self.buf.push(Il::Call(target));
        Ok(())
    }
}
