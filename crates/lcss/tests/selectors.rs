#[path = "support/render.rs"]
#[allow(dead_code)]
mod render;

use lcss::{CompileOptions, ErrorKind, MemoryLoader};
use render::{compile, compile_err_with};

#[test]
fn test_nested_descendant() {
    assert_eq!(
        compile(".a { .b { .c { x: 1; } } }"),
        ".a .b .c { x: 1; }"
    );
}

#[test]
fn test_selector_lists_multiply() {
    assert_eq!(
        compile(".a, .b { .c, .d { x: 1; } }"),
        ".a .c, .b .c, .a .d, .b .d { x: 1; }"
    );
}

#[test]
fn test_explicit_combinators() {
    let css = "
        .a {
            > .child { x: 1; }
            + .next { x: 2; }
            ~ .later { x: 3; }
        }
    ";
    assert_eq!(
        compile(css),
        ".a > .child { x: 1; }\n.a + .next { x: 2; }\n.a ~ .later { x: 3; }"
    );
}

// ============================================================================
// Parent references
// ============================================================================

#[test]
fn test_attached_parent_reference() {
    let css = "
        .btn {
            &:hover { x: 1; }
            &-primary { x: 2; }
            &.active { x: 3; }
            &[disabled] { x: 4; }
        }
    ";
    assert_eq!(
        compile(css),
        ".btn:hover { x: 1; }\n.btn-primary { x: 2; }\n.btn.active { x: 3; }\n.btn[disabled] { x: 4; }"
    );
}

#[test]
fn test_parent_reference_after_context() {
    assert_eq!(compile(".a { .x & { y: 1; } }"), ".x .a { y: 1; }");
}

#[test]
fn test_every_parent_reference_expands_independently() {
    assert_eq!(
        compile(".a, .b { & + & { x: 1; } }"),
        ".a + .a, .a + .b, .b + .a, .b + .b { x: 1; }"
    );
}

#[test]
fn test_pseudo_arguments_kept() {
    assert_eq!(
        compile("li { &:nth-child(2n+1) { x: 1; } }"),
        "li:nth-child(2n+1) { x: 1; }"
    );
}

#[test]
fn test_top_level_parent_reference_left_alone() {
    assert_eq!(compile("& .x { a: 1; }"), "& .x { a: 1; }");
}

#[test]
fn test_parent_rule_without_declarations_is_omitted() {
    assert_eq!(
        compile(".a { .b { x: 1; } }\n.c { }"),
        ".a .b { x: 1; }"
    );
}

#[test]
fn test_expansion_limit() {
    let options = CompileOptions::default().with_max_selector_expansions(10);
    let err = compile_err_with(
        options,
        MemoryLoader::new(),
        ".a, .b, .c { & & & { x: 1; } }",
    );
    assert_eq!(err.kind(), ErrorKind::SelectorCombination);
    assert_eq!(err.trail, vec![".a, .b, .c".to_string()]);
}
