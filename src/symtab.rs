//! Nested scopes for name resolution during analysis.
//!
//! Scopes are allocated in an arena and addressed by [`ScopeId`], so a type
//! descriptor can keep pointing at its member scope after the scope has been
//! popped off the active stack.

use std::collections::HashMap;

use log::trace;

use crate::ast::AttrId;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ScopeId(usize);

#[derive(Debug, Default)]
struct Scope {
    symbols: HashMap<String, AttrId>,
    context: Option<AttrId>,
}

#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    /// Active scopes, innermost last. Never empty.
    stack: Vec<ScopeId>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// A table holding only the outermost scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
            stack: vec![ScopeId(0)],
        }
    }

    /// Nesting depth; the outermost scope is level 0.
    pub fn level(&self) -> usize {
        self.stack.len() - 1
    }

    pub fn current_scope(&self) -> ScopeId {
        self.stack[self.level()]
    }

    pub fn outer_scope(&self) -> Option<ScopeId> {
        self.level().checked_sub(1).map(|i| self.stack[i])
    }

    pub fn open_scope(&mut self) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope::default());
        self.stack.push(id);
        trace!("open scope {} at level {}", id.0, self.level());
        id
    }

    /// # Panics
    /// If only the outermost scope is left. That means the analyzer itself is miscoded.
    pub fn close_scope(&mut self) {
        assert!(self.level() > 0, "no inner scope to close");
        let id = self.stack.pop();
        trace!("close scope {:?}", id);
    }

    /// Bind `name` in the innermost scope. Returns `false`, leaving the scope untouched,
    /// if the name is already bound at that level.
    pub fn enter(&mut self, name: &str, attrs: AttrId) -> bool {
        let scope = self.current_scope();
        self.enter_into(scope, name, attrs)
    }

    /// Bind `name` one level out, so a method is visible in its class rather than only
    /// inside its own parameter scope.
    pub fn enter_into_outer_scope(&mut self, name: &str, attrs: AttrId) -> bool {
        match self.outer_scope() {
            Some(scope) => self.enter_into(scope, name, attrs),
            None => false,
        }
    }

    fn enter_into(&mut self, scope: ScopeId, name: &str, attrs: AttrId) -> bool {
        let symbols = &mut self.scopes[scope.0].symbols;
        if symbols.contains_key(name) {
            return false;
        }
        symbols.insert(name.to_owned(), attrs);
        true
    }

    /// Innermost visible binding of `name`.
    pub fn lookup(&self, name: &str) -> Option<AttrId> {
        self.stack
            .iter()
            .rev()
            .find_map(|scope| self.scopes[scope.0].symbols.get(name).copied())
    }

    /// Binding of `name` in exactly `scope`, whether or not it is still active.
    pub fn lookup_in(&self, scope: ScopeId, name: &str) -> Option<AttrId> {
        self.scopes[scope.0].symbols.get(name).copied()
    }

    pub fn set_context(&mut self, attrs: AttrId) {
        let scope = self.current_scope();
        self.scopes[scope.0].context = Some(attrs);
    }

    /// What the innermost scope is the body of, if anything.
    pub fn current_context(&self) -> Option<AttrId> {
        self.scopes[self.current_scope().0].context
    }

    pub fn outer_context(&self) -> Option<AttrId> {
        self.outer_scope().and_then(|scope| self.scopes[scope.0].context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Ast;
    use crate::attributes::{Attributes, VariableAttributes};
    use crate::types::TypeDescriptor;

    fn var(ast: &mut Ast, name: &str, ty: TypeDescriptor) -> AttrId {
        ast.alloc_attrs(Attributes::Variable(VariableAttributes::new(name, ty)))
    }

    #[test]
    fn closed_scope_names_disappear() {
        let mut ast = Ast::new();
        let mut table = SymbolTable::new();
        let y = var(&mut ast, "y", TypeDescriptor::Integer);

        table.open_scope();
        assert!(table.enter("y", y));
        assert_eq!(table.lookup("y"), Some(y));
        table.close_scope();

        assert_eq!(table.lookup("y"), None);
        assert_eq!(table.level(), 0);
    }

    #[test]
    fn inner_declaration_shadows_outer() {
        let mut ast = Ast::new();
        let mut table = SymbolTable::new();
        let outer = var(&mut ast, "x", TypeDescriptor::Integer);
        let inner = var(&mut ast, "x", TypeDescriptor::Boolean);

        table.open_scope();
        assert!(table.enter("x", outer));
        table.open_scope();
        assert!(table.enter("x", inner));
        assert_eq!(table.lookup("x"), Some(inner));
        table.close_scope();
        assert_eq!(table.lookup("x"), Some(outer));
    }

    #[test]
    fn redeclaration_keeps_first_entry() {
        let mut ast = Ast::new();
        let mut table = SymbolTable::new();
        let first = var(&mut ast, "x", TypeDescriptor::Integer);
        let second = var(&mut ast, "x", TypeDescriptor::String);

        assert!(table.enter("x", first));
        assert!(!table.enter("x", second));
        assert_eq!(table.lookup("x"), Some(first));
    }

    #[test]
    fn outer_scope_entry_survives_inner_close() {
        let mut ast = Ast::new();
        let mut table = SymbolTable::new();
        let method = var(&mut ast, "f", TypeDescriptor::Void);

        let class_scope = table.open_scope();
        table.open_scope();
        assert!(table.enter_into_outer_scope("f", method));
        table.close_scope();

        assert_eq!(table.lookup("f"), Some(method));
        assert_eq!(table.lookup_in(class_scope, "f"), Some(method));
    }

    #[test]
    fn no_outer_scope_at_top_level() {
        let mut ast = Ast::new();
        let mut table = SymbolTable::new();
        let f = var(&mut ast, "f", TypeDescriptor::Void);
        assert!(!table.enter_into_outer_scope("f", f));
        assert_eq!(table.outer_context(), None);
    }

    #[test]
    fn contexts_follow_the_stack() {
        let mut ast = Ast::new();
        let mut table = SymbolTable::new();
        let class = ast.alloc_attrs(Attributes::Error);
        let method = ast.alloc_attrs(Attributes::Error);

        table.open_scope();
        table.set_context(class);
        table.open_scope();
        table.set_context(method);
        assert_eq!(table.current_context(), Some(method));
        assert_eq!(table.outer_context(), Some(class));

        table.open_scope();
        assert_eq!(table.current_context(), None);
        assert_eq!(table.outer_context(), Some(method));
    }

    #[test]
    fn scope_members_stay_reachable_after_close() {
        let mut ast = Ast::new();
        let mut table = SymbolTable::new();
        let field = var(&mut ast, "a", TypeDescriptor::Integer);

        let members = table.open_scope();
        table.enter("a", field);
        table.close_scope();

        assert_eq!(table.lookup("a"), None);
        assert_eq!(table.lookup_in(members, "a"), Some(field));
    }

    #[test]
    #[should_panic(expected = "no inner scope to close")]
    fn closing_the_outermost_scope_is_fatal() {
        let mut table = SymbolTable::new();
        table.close_scope();
    }
}
