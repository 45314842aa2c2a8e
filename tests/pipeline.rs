use assert2::{check, let_assert};

use tcclc::{analyze, generate, parse, print, Diagnostic, Options};

fn compile(source: &str) -> Vec<String> {
    let_assert!(Ok(mut ast) = parse(source));
    let diagnostics = analyze(&mut ast);
    check!(diagnostics.is_empty(), "{diagnostics:?}");
    let options = Options {
        assembly: "demo".to_owned(),
        ..Options::default()
    };
    let mut out = Vec::new();
    let_assert!(Ok(()) = generate(&mut ast, &options, &mut out));
    let_assert!(Ok(text) = String::from_utf8(out));
    text.lines().map(|l| l.trim().to_owned()).collect()
}

fn contains_run(lines: &[String], run: &[&str]) -> bool {
    lines
        .windows(run.len())
        .any(|w| w.iter().zip(run).all(|(a, b)| a == b))
}

#[test]
fn hello_world() {
    let lines = compile(
        r#"
        public class Hello {
            public static void main() {
                WriteLine("Hello, world");
            }
        }
        "#,
    );
    check!(lines[0] == ".assembly extern mscorlib {}");
    check!(lines[1] == ".assembly demo {}");
    check!(lines.contains(&".class public Hello".to_owned()));
    check!(contains_run(
        &lines,
        &[
            ".method public static void main()",
            "{",
            ".entrypoint",
            ".maxstack 32",
            "ldstr \"Hello, world\"",
            "call void [mscorlib]System.Console::WriteLine(string)",
            "ret",
            "}",
        ]
    ));
}

#[test]
fn loop_with_static_helper() {
    let lines = compile(
        r#"
        public class Main {
            static int sum(int n) {
                int total, i;
                total = 0;
                i = 0;
                while (i < n) {
                    i = i + 1;
                    total = total + i;
                }
                return total;
            }

            public static void main() {
                WriteLine(sum(4));
            }
        }
        "#,
    );
    check!(contains_run(
        &lines,
        &[
            ".locals init (int32 V_0, int32 V_1)",
            "ldc.i4 0",
            "stloc 0",
            "ldc.i4 0",
            "stloc 1",
            "LOOP_0:",
            "ldloc 1",
            "ldarg 0",
            "blt T1",
            "ldc.i4 0",
            "br E1",
            "T1:",
            "ldc.i4 1",
            "E1:",
            "brfalse E0",
            "ldloc 1",
            "ldc.i4 1",
            "add",
            "stloc 1",
            "ldloc 0",
            "ldloc 1",
            "add",
            "stloc 0",
            "br LOOP_0",
            "E0:",
            "ldloc 0",
            "ret",
        ]
    ));
    check!(contains_run(
        &lines,
        &[
            "ldc.i4 4",
            "call int32 Main::sum(int32)",
            "call void [mscorlib]System.Console::WriteLine(int32)",
            "ret",
        ]
    ));
}

#[test]
fn semantic_errors_are_collected() {
    let_assert!(
        Ok(mut ast) = parse(
            r#"
            class A {
                int f() {
                    boolean b;
                    b = 1;
                    return true;
                }
                void g() {
                    missing = 2;
                    if (3) { }
                }
            }
            "#,
        )
    );
    let diagnostics = analyze(&mut ast);
    check!(diagnostics
        .iter()
        .any(|d| matches!(d, Diagnostic::AssignMismatch { .. })));
    check!(diagnostics
        .iter()
        .any(|d| matches!(d, Diagnostic::ReturnMismatch { .. })));
    check!(diagnostics.contains(&Diagnostic::NotFound("missing".to_owned())));
    check!(diagnostics.contains(&Diagnostic::NonBooleanCondition("if")));
}

#[test]
fn generation_refuses_trees_with_errors() {
    let_assert!(Ok(mut ast) = parse("class A { void f() { x = 1; } }"));
    check!(!analyze(&mut ast).is_empty());
    let mut out = Vec::new();
    check!(generate(&mut ast, &Options::default(), &mut out).is_err());
}

#[test]
fn dump_shows_annotated_types() {
    let_assert!(Ok(mut ast) = parse("class A { static int f() { return 1; } }"));
    check!(analyze(&mut ast).is_empty());
    let text = print::dump(&ast);
    check!(text.starts_with("CompilationUnit\n└─ ClassDeclaration : class A\n"));
    check!(text.contains("IntConst 1 : INT"));
}
