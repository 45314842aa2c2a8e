use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use log::info;

pub mod ast;
pub mod attributes;
pub mod check;
pub mod ir;
pub mod print;
pub mod symtab;
pub mod syntax;
pub mod types;

pub use check::analyze;
pub use ir::{generate, Options};
pub use syntax::parse;

use ast::{ExprKind, NodeId};
use types::TypeKind;

/// A user-facing semantic error. Analysis collects these and keeps going.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Diagnostic {
    #[error("redeclaration of symbol {0}")]
    Redeclaration(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} does not name a type")]
    NotAType(String),

    #[error("reference {0} is not a method")]
    NotAMethod(String),

    #[error("undeclarable type VOID for {0}")]
    VoidDeclaration(String),

    #[error("use of uninitialized variable {0}")]
    Uninitialized(String),

    #[error("cannot assign to {0}")]
    Unassignable(String),

    #[error("unsupported assignment of {got} to {expected}")]
    AssignMismatch { expected: TypeKind, got: TypeKind },

    #[error("unsupported operation {op}: expected {expected}, got {lhs} and {rhs}")]
    OperandMismatch {
        op: ExprKind,
        expected: &'static str,
        lhs: TypeKind,
        rhs: TypeKind,
    },

    #[error("cannot find {name}({args})")]
    NoMatchingOverload { name: String, args: String },

    #[error("method of same signature already exists: {0}")]
    DuplicateSignature(String),

    #[error("overload of {name} must return {expected}, not {got}")]
    ReturnTypeConflict {
        name: String,
        expected: TypeKind,
        got: TypeKind,
    },

    #[error("overloads of {0} must all be static or all be instance methods")]
    StaticConflict(String),

    #[error("constructor already exists for class {0}")]
    DuplicateConstructor(String),

    #[error("constructor {0} declared outside of class context")]
    ConstructorOutsideClass(String),

    #[error("return statement outside of method context")]
    ReturnOutsideMethod,

    #[error("incorrect return type: expected {expected}, got {got}")]
    ReturnMismatch { expected: TypeKind, got: TypeKind },

    #[error("{0} condition is not of type BOOLEAN")]
    NonBooleanCondition(&'static str),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    #[error("failed to write output")]
    Io(#[from] std::io::Error),

    #[error("node {0} carries the error type; generation needs an error-free tree")]
    ErrorNode(NodeId),

    #[error("node {0} was not annotated by analysis")]
    Unannotated(NodeId),

    #[error("node {node}: expected {expected} attributes, found {found}")]
    UnexpectedAttributes {
        node: NodeId,
        expected: &'static str,
        found: &'static str,
    },

    #[error("node {0} does not have the expected children")]
    Malformed(NodeId),

    #[error("{0} needs a receiver but is used from a static method")]
    MissingReceiver(String),

    #[error("unsupported construct for code generation: {0}")]
    UnsupportedConstruct(String),
}

/// Driver settings, filled in from the command line.
#[derive(Debug, Clone)]
pub struct Config {
    pub file: PathBuf,
    /// Defaults to `file` with an `.il` extension.
    pub output: Option<PathBuf>,
    pub options: Options,
    pub print_ast: bool,
    pub check_only: bool,
}

/// Compile the source file named in `config`.
///
/// # Errors
/// If reading, parsing, analysis or writing the output fails.
///
pub fn run(config: &Config) -> anyhow::Result<()> {
    let contents = std::fs::read_to_string(&config.file)
        .with_context(|| format!("could not read {}", config.file.display()))?;
    let mut ast = parse(&contents)?;

    let diagnostics = analyze(&mut ast);
    if config.print_ast {
        print!("{}", print::dump(&ast));
    }
    if !diagnostics.is_empty() {
        for diagnostic in &diagnostics {
            eprintln!("error: {diagnostic}");
        }
        anyhow::bail!("semantic analysis failed with {} error(s)", diagnostics.len());
    }
    if config.check_only {
        return Ok(());
    }

    let output = config
        .output
        .clone()
        .unwrap_or_else(|| config.file.with_extension("il"));
    let file = File::create(&output)
        .with_context(|| format!("could not create {}", output.display()))?;
    let mut out = BufWriter::new(file);
    generate(&mut ast, &config.options, &mut out)?;
    out.flush()?;
    info!("wrote {}", output.display());
    Ok(())
}
