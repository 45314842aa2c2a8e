//! Indented text dump of an (optionally annotated) tree.

use crate::ast::{Ast, NodeId};

/// Render the tree under the root, one node per line, with the type of each
/// annotated node after a colon.
pub fn dump(ast: &Ast) -> String {
    let mut out = String::new();
    if let Some(root) = ast.root() {
        write_node(ast, root, "", "", &mut out);
    }
    out
}

fn write_node(ast: &Ast, id: NodeId, lead: &str, prefix: &str, out: &mut String) {
    out.push_str(lead);
    out.push_str(&ast.kind(id).to_string());
    if let Some(ty) = ast.ty(id) {
        out.push_str(&format!(" : {ty}"));
    }
    out.push('\n');

    let children = ast.child_ids(id);
    for (i, &child) in children.iter().enumerate() {
        let (branch, extend) = if i + 1 == children.len() {
            ("└─ ", "   ")
        } else {
            ("├─ ", "│  ")
        };
        write_node(
            ast,
            child,
            &format!("{prefix}{branch}"),
            &format!("{prefix}{extend}"),
            out,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;
    use crate::ast::{Modifier, PrimitiveKind};
    use crate::types::TypeDescriptor;

    #[test]
    fn nested_children_get_branch_prefixes() {
        let mut ast = Ast::new();
        let ty = prim(&mut ast, PrimitiveKind::Int);
        let f = field(&mut ast, &[Modifier::Public], ty, &["x", "y"]);
        let class = class(&mut ast, "Main", &[f]);
        unit(&mut ast, &[class]);
        ast.set_ty(ty, TypeDescriptor::Integer);

        let expected = "\
CompilationUnit
└─ ClassDeclaration
   ├─ Modifiers public
   ├─ Identifier Main
   └─ ClassBody
      └─ FieldDeclaration
         ├─ Modifiers public
         ├─ PrimitiveType INT : INT
         └─ NameList
            ├─ Identifier x
            └─ Identifier y
";
        assert_eq!(dump(&ast), expected);
    }

    #[test]
    fn empty_tree_dumps_nothing() {
        assert_eq!(dump(&Ast::new()), "");
    }
}
