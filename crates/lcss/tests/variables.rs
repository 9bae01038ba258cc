#[path = "support/render.rs"]
#[allow(dead_code)]
mod render;

use lcss::ast::{Dimension, Value};
use lcss::{
    CompileOptions, Compiler, ErrorKind, FileId, FunctionLibrary, MemoryLoader, ResolveError, Span,
};
use render::{compile, compile_err, compile_err_with, compile_with};

// ============================================================================
// Lookup
// ============================================================================

#[test]
fn test_variable_used_before_definition() {
    let css = "
        .a { width: @w; }
        @w: 10px;
    ";
    assert_eq!(compile(css), ".a { width: 10px; }");
}

#[test]
fn test_last_definition_in_block_wins() {
    let css = "
        @c: red;
        .a { color: @c; }
        @c: blue;
    ";
    assert_eq!(compile(css), ".a { color: blue; }");
}

#[test]
fn test_inner_block_shadows_outer() {
    let css = "
        @c: red;
        .a { @c: green; color: @c; }
        .b { color: @c; }
    ";
    assert_eq!(compile(css), ".a { color: green; }\n.b { color: red; }");
}

#[test]
fn test_definition_evaluated_where_it_is_used() {
    let css = "
        @size: @base * 2;
        @base: 5px;
        .a { @base: 10px; width: @size; }
        .b { width: @size; }
    ";
    assert_eq!(compile(css), ".a { width: 20px; }\n.b { width: 10px; }");
}

#[test]
fn test_variable_variable() {
    let css = r#"
        @primary: blue;
        @name: "primary";
        .a { color: @@name; }
    "#;
    assert_eq!(compile(css), ".a { color: blue; }");
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_undefined_variable_reports_position_and_trail() {
    let err = compile_err(".x {\n  color: @missing;\n}");
    assert_eq!(err.error, ResolveError::UndefinedVariable("missing".into()));
    assert_eq!(err.span, Some(Span::new(FileId::MAIN, 2, 3)));
    assert_eq!(err.trail, vec![".x".to_string()]);
}

#[test]
fn test_mutual_recursion_is_circular() {
    let err = compile_err(
        "
        @a: @b;
        @b: @a;
        .x { width: @a; }
    ",
    );
    assert_eq!(err.kind(), ErrorKind::CircularReference);
    assert_eq!(err.error, ResolveError::CircularReference("a".into()));
}

#[test]
fn test_self_reference_is_circular() {
    let err = compile_err("@a: @a + 1;");
    assert_eq!(err.error, ResolveError::CircularReference("a".into()));
}

#[test]
fn test_unused_broken_definition_still_fails() {
    let err = compile_err("@unused: @nowhere;");
    assert_eq!(err.kind(), ErrorKind::UndefinedVariable);
}

#[test]
fn test_same_variable_twice_in_one_value_is_not_circular() {
    let css = "
        @w: 2px;
        .a { margin: @w @w; }
    ";
    assert_eq!(compile(css), ".a { margin: 2px 2px; }");
}

// ============================================================================
// Strings
// ============================================================================

#[test]
fn test_interpolation_in_url() {
    let css = r#"
        @dir: "img";
        .a { background: url("@{dir}/x.png"); }
    "#;
    assert_eq!(compile(css), r#".a { background: url("img/x.png"); }"#);
}

#[test]
fn test_escaped_string_interpolation() {
    let css = r#"
        @w: 10px;
        .a { width: ~"calc(100% - @{w})"; }
    "#;
    assert_eq!(compile(css), ".a { width: calc(100% - 10px); }");
}

// ============================================================================
// Arithmetic
// ============================================================================

#[test]
fn test_operations_evaluate() {
    let css = ".a { width: 2px + 3px; height: (2px + 3px) * 2; }";
    assert_eq!(compile(css), ".a { width: 5px; height: 10px; }");
}

#[test]
fn test_unitless_operand_takes_other_unit() {
    assert_eq!(compile(".a { width: 2 * 3em; }"), ".a { width: 6em; }");
}

#[test]
fn test_strict_math_only_evaluates_parentheses() {
    let options = CompileOptions::default().with_strict_math(true);
    let css = ".a { width: 2px + 3px; height: (2px + 3px); depth: (2px + 3px) * 2; }";
    assert_eq!(
        compile_with(options, MemoryLoader::new(), css),
        ".a { width: 2px + 3px; height: 5px; depth: 5px * 2; }"
    );
}

#[test]
fn test_negated_variable_under_strict_math() {
    let options = CompileOptions::default().with_strict_math(true);
    let css = "
        @x: 4px;
        .a { margin: -@x; }
    ";
    assert_eq!(
        compile_with(options, MemoryLoader::new(), css),
        ".a { margin: -4px; }"
    );
}

#[test]
fn test_color_arithmetic() {
    let css = ".a { color: #111 + #222; background: #102030 * 2; }";
    assert_eq!(compile(css), ".a { color: #333333; background: #204060; }");
}

#[test]
fn test_incompatible_units_warn_and_keep_left_unit() {
    let compilation = Compiler::default()
        .compile_source(".a { width: 2px + 3em; }")
        .unwrap();
    assert_eq!(render::render(&compilation.stylesheet), ".a { width: 5px; }");
    assert_eq!(compilation.warnings.len(), 1);
    assert!(
        compilation.warnings[0]
            .message
            .contains("incompatible units px and em")
    );
    assert_eq!(compilation.warnings[0].span.line, 1);
}

#[test]
fn test_division_by_zero_is_kept() {
    let compilation = Compiler::default()
        .compile_source(".a { width: 4px / 0; }")
        .unwrap();
    assert_eq!(
        render::render(&compilation.stylesheet),
        ".a { width: 4px / 0; }"
    );
    assert_eq!(compilation.warnings.len(), 1);
}

#[test]
fn test_warnings_as_errors() {
    let options = CompileOptions::default().with_warnings_as_errors(true);
    let err = compile_err_with(options, MemoryLoader::new(), ".a { width: 2px + 3em; }");
    assert_eq!(err.kind(), ErrorKind::WarningAsError);
    assert_eq!(err.trail, vec![".a".to_string()]);
}

// ============================================================================
// Functions
// ============================================================================

struct Percentage;

impl FunctionLibrary for Percentage {
    fn call(&self, name: &str, args: &[Value]) -> Option<Value> {
        match (name, args) {
            ("percentage", [Value::Dimension(d)]) if d.is_unitless() => {
                Some(Value::Dimension(Dimension::new(d.value * 100.0, "%")))
            }
            _ => None,
        }
    }
}

#[test]
fn test_unknown_functions_pass_through_evaluated() {
    let css = "
        @c: red;
        .a { color: darken(@c, 10%); }
    ";
    assert_eq!(compile(css), ".a { color: darken(red, 10%); }");
}

#[test]
fn test_function_library_is_consulted() {
    let compilation = Compiler::default()
        .with_functions(Percentage)
        .compile_source("@half: 0.5;\n.a { width: percentage(@half); }")
        .unwrap();
    assert_eq!(
        render::render(&compilation.stylesheet),
        ".a { width: 50%; }"
    );
}
