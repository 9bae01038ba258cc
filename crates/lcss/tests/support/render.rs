//! Compact rendering of resolved stylesheets for assertions.
//!
//! One line per output rule; nested blocks are rendered inline:
//!
//! ```text
//! .a, .b { color: red; width: 2px !important; }
//! @media screen { .a { color: blue; } }
//! ```

use lcss::ast::{Block, Node};
use lcss::{CompileError, CompileOptions, Compiler, MemoryLoader, Stylesheet};

pub fn render(stylesheet: &Stylesheet) -> String {
    render_block(&stylesheet.root).join("\n")
}

fn render_block(block: &Block) -> Vec<String> {
    block.rules.iter().map(render_node).collect()
}

fn render_inline(block: &Block) -> String {
    render_block(block).join(" ")
}

fn render_node(node: &Node) -> String {
    match node {
        Node::Declaration(decl) => {
            let important = if decl.important { " !important" } else { "" };
            format!("{}: {}{important};", decl.property, decl.value)
        }
        Node::Ruleset(ruleset) => {
            let selectors: Vec<String> = ruleset.selectors.iter().map(ToString::to_string).collect();
            format!("{} {{ {} }}", selectors.join(", "), render_inline(&ruleset.block))
        }
        Node::Media(media) => {
            format!("@media {} {{ {} }}", media.features, render_inline(&media.block))
        }
        Node::Directive(directive) => {
            let mut out = format!("@{}", directive.name);
            if let Some(prelude) = &directive.prelude {
                out.push_str(&format!(" {prelude}"));
            }
            match &directive.block {
                Some(block) => out.push_str(&format!(" {{ {} }}", render_inline(block))),
                None => out.push(';'),
            }
            out
        }
        Node::Import(import) => match &import.media {
            Some(media) => format!("@import {} {media};", import.path),
            None => format!("@import {};", import.path),
        },
        Node::Variable(def) => format!("@{}: {};", def.name, def.value),
        Node::MixinDefinition(mixin) => format!("{} {{ .. }}", mixin.name),
        Node::MixinCall(call) => format!("{call};"),
    }
}

/// Compiles `source` with default options and no imports.
pub fn compile(source: &str) -> String {
    compile_with(CompileOptions::default(), MemoryLoader::new(), source)
}

pub fn compile_with(options: CompileOptions, loader: MemoryLoader, source: &str) -> String {
    let compilation = Compiler::new(options)
        .with_loader(loader)
        .compile_source(source)
        .unwrap_or_else(|e| panic!("compile failed: {e} at {:?} in {:?}", e.span, e.trail));
    render(&compilation.stylesheet)
}

pub fn compile_err(source: &str) -> CompileError {
    compile_err_with(CompileOptions::default(), MemoryLoader::new(), source)
}

pub fn compile_err_with(
    options: CompileOptions,
    loader: MemoryLoader,
    source: &str,
) -> CompileError {
    match Compiler::new(options).with_loader(loader).compile_source(source) {
        Ok(compilation) => panic!(
            "expected an error, got:\n{}",
            render(&compilation.stylesheet)
        ),
        Err(e) => e,
    }
}
