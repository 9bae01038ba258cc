#[path = "support/render.rs"]
#[allow(dead_code)]
mod render;

use std::fs;
use std::path::PathBuf;

use lcss::{CompileOptions, Compiler, ErrorKind, MemoryLoader, ResolveError};
use render::{compile_err_with, compile_with};

fn loader(files: &[(&str, &str)]) -> MemoryLoader {
    files
        .iter()
        .fold(MemoryLoader::new(), |loader, (path, source)| {
            loader.with_file(path, *source)
        })
}

fn compile_files(files: &[(&str, &str)], source: &str) -> String {
    compile_with(CompileOptions::default(), loader(files), source)
}

// ============================================================================
// Splicing
// ============================================================================

#[test]
fn test_imported_rules_are_spliced_in_place() {
    let files = [("/a.less", ".a { x: 1; }")];
    let css = "
        .before { y: 1; }
        @import \"a\";
        .after { y: 2; }
    ";
    assert_eq!(
        compile_files(&files, css),
        ".before { y: 1; }\n.a { x: 1; }\n.after { y: 2; }"
    );
}

#[test]
fn test_imported_variables_and_mixins_are_visible() {
    let files = [(
        "/theme.less",
        "@accent: blue;\n.rounded(@r: 2px) { border-radius: @r; }",
    )];
    let css = "
        @import \"theme.less\";
        .card { color: @accent; .rounded(); }
    ";
    assert_eq!(
        compile_files(&files, css),
        ".card { color: blue; border-radius: 2px; }"
    );
}

#[test]
fn test_import_inside_ruleset() {
    let files = [("/inner.less", "color: red;\n.x { y: 1; }")];
    assert_eq!(
        compile_files(&files, ".wrap { @import \"inner\"; }"),
        ".wrap { color: red; }\n.wrap .x { y: 1; }"
    );
}

#[test]
fn test_relative_to_importing_file() {
    let files = [
        ("/lib/main.less", "@import \"parts/colors\";\n@import \"../shared/base\";"),
        ("/lib/parts/colors.less", "@c: red;"),
        ("/shared/base.less", ".base { color: @c; }"),
    ];
    assert_eq!(
        compile_files(&files, "@import \"lib/main\";"),
        ".base { color: red; }"
    );
}

#[test]
fn test_include_paths() {
    let options = CompileOptions::default().with_include_path("/vendor");
    let files = loader(&[("/vendor/grid.less", ".row { display: flex; }")]);
    assert_eq!(
        compile_with(options, files, "@import \"grid\";"),
        ".row { display: flex; }"
    );
}

#[test]
fn test_import_with_media_is_wrapped() {
    let files = [("/print.less", ".x { color: black; }")];
    assert_eq!(
        compile_files(&files, "@import \"print\" print;"),
        "@media print { .x { color: black; } }"
    );
}

// ============================================================================
// Once semantics and options
// ============================================================================

#[test]
fn test_second_import_is_skipped_by_default() {
    let files = [("/a.less", ".a { x: 1; }")];
    assert_eq!(
        compile_files(&files, "@import \"a\";\n@import \"a.less\";"),
        ".a { x: 1; }"
    );
}

#[test]
fn test_multiple_option_imports_again() {
    let files = [("/a.less", ".a { x: 1; }")];
    assert_eq!(
        compile_files(&files, "@import \"a\";\n@import (multiple) \"a\";"),
        ".a { x: 1; }\n.a { x: 1; }"
    );
}

#[test]
fn test_once_option_overrides_import_multiple_default() {
    let options = CompileOptions::default().with_import_once(false);
    let files = loader(&[("/a.less", ".a { x: 1; }")]);
    assert_eq!(
        compile_with(
            options,
            files,
            "@import \"a\";\n@import \"a\";\n@import (once) \"a\";"
        ),
        ".a { x: 1; }\n.a { x: 1; }"
    );
}

#[test]
fn test_mutual_imports_stop_under_once() {
    let files = [
        ("/a.less", "@import \"b\";\n.a { x: 1; }"),
        ("/b.less", "@import \"a\";\n.b { x: 2; }"),
    ];
    assert_eq!(
        compile_files(&files, "@import \"a\";"),
        ".b { x: 2; }\n.a { x: 1; }"
    );
}

#[test]
fn test_optional_missing_import_is_skipped() {
    assert_eq!(
        compile_files(&[], "@import (optional) \"nope\";\n.a { x: 1; }"),
        ".a { x: 1; }"
    );
}

#[test]
fn test_css_imports_pass_through_and_hoist() {
    let css = "
        .a { x: 1; }
        @import \"reset.css\";
        @import url(\"https://fonts.example/inter\");
        @import (css) \"theme.less\" screen;
    ";
    assert_eq!(
        compile_files(&[], css),
        "@import \"reset.css\";\n@import url(\"https://fonts.example/inter\");\n@import \"theme.less\" screen;\n.a { x: 1; }"
    );
}

#[test]
fn test_less_option_forces_import_of_css_file() {
    let files = [("/legacy.css", ".legacy { x: 1; }")];
    assert_eq!(
        compile_files(&files, "@import (less) \"legacy.css\";"),
        ".legacy { x: 1; }"
    );
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_missing_import_lists_searched_paths() {
    let options = CompileOptions::default().with_include_path("/lib");
    let err = compile_err_with(options, MemoryLoader::new(), "\n@import \"missing\";");
    assert_eq!(
        err.error,
        ResolveError::ImportFileNotFound {
            path: "missing".into(),
            searched: vec![PathBuf::from("missing.less"), PathBuf::from("/lib/missing.less")],
        }
    );
    assert_eq!(err.span.map(|s| s.line), Some(2));
}

#[test]
fn test_import_depth_limit() {
    let options = CompileOptions::default().with_max_import_depth(2);
    let files = loader(&[
        ("/a.less", "@import \"b\";"),
        ("/b.less", "@import \"c\";"),
        ("/c.less", ".c { x: 1; }"),
    ]);
    let err = compile_err_with(options, files, "@import \"a\";");
    assert_eq!(
        err.error,
        ResolveError::ImportRecursionLimitExceeded {
            path: "c".into(),
            limit: 2
        }
    );
    assert_eq!(err.file, Some(PathBuf::from("/b.less")));
}

#[test]
fn test_import_chain_at_depth_limit_compiles() {
    let options = CompileOptions::default().with_max_import_depth(3);
    let files = loader(&[
        ("/a.less", "@import \"b\";"),
        ("/b.less", "@import \"c\";"),
        ("/c.less", ".c { x: 1; }"),
    ]);
    assert_eq!(compile_with(options, files, "@import \"a\";"), ".c { x: 1; }");
}

#[test]
fn test_nested_import_chain_at_depth_limit_compiles() {
    let options = CompileOptions::default().with_max_import_depth(3);
    let files = loader(&[
        ("/a.less", ".a { @import \"b\"; }"),
        ("/b.less", "@media print { @import \"c\"; }"),
        ("/c.less", "x: 1;"),
    ]);
    assert_eq!(
        compile_with(options, files, "@import \"a\";"),
        "@media print { .a { x: 1; } }"
    );
}

#[test]
fn test_self_import_in_ruleset_hits_depth_limit() {
    let options = CompileOptions::default().with_max_import_depth(4);
    let files = loader(&[("/a.less", ".x { @import (multiple) \"a\"; y: 1; }")]);
    let err = compile_err_with(options, files, "@import \"a\";");
    assert_eq!(
        err.error,
        ResolveError::ImportRecursionLimitExceeded {
            path: "a".into(),
            limit: 4
        }
    );
    assert_eq!(err.file, Some(PathBuf::from("/a.less")));
}

#[test]
fn test_self_import_in_mixin_body_hits_depth_limit() {
    let options = CompileOptions::default().with_max_import_depth(3);
    let files = loader(&[(
        "/a.less",
        ".load() { @import (multiple) \"a\"; }\n.y { .load(); }",
    )]);
    let err = compile_err_with(options, files, "@import \"a\";");
    assert_eq!(err.kind(), ErrorKind::ImportRecursionLimitExceeded);
}

#[test]
fn test_self_import_without_once_hits_depth_limit() {
    let options = CompileOptions::default()
        .with_import_once(false)
        .with_max_import_depth(4);
    let files = loader(&[("/loop.less", "@import \"loop\";")]);
    let err = compile_err_with(options, files, "@import \"loop\";");
    assert_eq!(err.kind(), ErrorKind::ImportRecursionLimitExceeded);
}

#[test]
fn test_error_in_imported_file_names_that_file() {
    let files = loader(&[("/parts/broken.less", ".x {\n  color: @nope;\n}")]);
    let err = compile_err_with(
        CompileOptions::default(),
        files,
        "@import \"parts/broken\";",
    );
    assert_eq!(err.kind(), ErrorKind::UndefinedVariable);
    assert_eq!(err.file, Some(PathBuf::from("/parts/broken.less")));
    assert_eq!(err.span.map(|s| (s.line, s.column)), Some((2, 3)));
}

#[test]
fn test_syntax_error_in_imported_file() {
    let files = loader(&[("/bad.less", ".x { color: red;")]);
    let err = compile_err_with(CompileOptions::default(), files, "@import \"bad\";");
    assert_eq!(err.kind(), ErrorKind::InvalidSyntax);
}

// ============================================================================
// Interpolated paths
// ============================================================================

#[test]
fn test_interpolated_path_with_later_variable() {
    let files = [("/themes/dark.less", ".theme { color: black; }")];
    let css = "
        @import \"themes/@{theme}\";
        @theme: dark;
    ";
    assert_eq!(compile_files(&files, css), ".theme { color: black; }");
}

#[test]
fn test_interpolated_path_with_variable_from_later_import() {
    let files = [
        ("/settings.less", "@dir: \"skins\";"),
        ("/skins/x.less", ".skin { x: 1; }"),
    ];
    let css = "
        @import \"@{dir}/x.less\";
        @import \"settings\";
    ";
    assert_eq!(compile_files(&files, css), ".skin { x: 1; }");
}

#[test]
fn test_interpolated_import_chain_resolves_to_fixed_point() {
    let files = [
        ("/one.less", "@second: \"two\";\n.one { x: 1; }"),
        ("/two.less", ".two { x: 2; }"),
    ];
    let css = "
        @import \"@{second}\";
        @import \"@{first}\";
        @first: \"one\";
        .tail { x: 3; }
    ";
    assert_eq!(
        compile_files(&files, css),
        ".two { x: 2; }\n.one { x: 1; }\n.tail { x: 3; }"
    );
}

#[test]
fn test_unresolvable_interpolated_import_fails() {
    let err = compile_err_with(
        CompileOptions::default(),
        MemoryLoader::new(),
        "@import \"@{nowhere}.less\";",
    );
    assert_eq!(err.error, ResolveError::UndefinedVariable("nowhere".into()));
}

// ============================================================================
// Filesystem
// ============================================================================

#[test]
fn test_compile_file_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("parts")).unwrap();
    fs::write(dir.path().join("parts/colors.less"), "@c: red;").unwrap();
    fs::write(
        dir.path().join("main.less"),
        "@import \"parts/colors\";\n.a { color: @c; }",
    )
    .unwrap();

    let compilation = Compiler::default()
        .compile_file(dir.path().join("main.less"))
        .unwrap();
    assert_eq!(render::render(&compilation.stylesheet), ".a { color: red; }");
}

#[test]
fn test_compile_file_errors_carry_the_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("vars.less"), "@w: @missing;").unwrap();
    fs::write(dir.path().join("main.less"), "@import \"vars\";").unwrap();
    fs::write(dir.path().join("bad.less"), ".a {").unwrap();

    let compiler = Compiler::default();
    let err = compiler
        .compile_file(dir.path().join("main.less"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UndefinedVariable);
    assert_eq!(
        err.file,
        Some(fs::canonicalize(dir.path().join("vars.less")).unwrap())
    );

    let err = compiler.compile_file(dir.path().join("bad.less")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidSyntax);
    assert_eq!(
        err.file,
        Some(fs::canonicalize(dir.path().join("bad.less")).unwrap())
    );
}

#[test]
fn test_compile_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Compiler::default()
        .compile_file(dir.path().join("absent.less"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}
