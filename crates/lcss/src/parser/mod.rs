//! Stylesheet parsing.
//!
//! Turns source text into the syntax tree in [`crate::ast`]. The grammar
//! covers what the resolver consumes:
//!
//! - [`parse_stylesheet`]: main entry point
//! - [`selectors`]: selector lists with `&` and combinators
//! - [`values`]: expressions, lists, strings, urls, colors, dimensions
//! - [`mixins`]: mixin parameters, call arguments and `when` guards
//!
//! Comments are blanked out before parsing so reported line and column
//! numbers match the original text.
//!
//! ## Example
//!
//! ```rust
//! use lcss::ast::Node;
//! use lcss::parser::parse_stylesheet;
//!
//! let stylesheet = parse_stylesheet("@w: 10px;\n.a { width: @w; }").unwrap();
//! assert_eq!(stylesheet.rules().len(), 2);
//! let Node::Ruleset(ruleset) = &stylesheet.rules()[1] else { panic!() };
//! assert_eq!(ruleset.span.line, 2);
//! ```

pub mod mixins;
pub mod selectors;
pub mod values;

use std::path::PathBuf;
use std::rc::Rc;

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char, multispace0, multispace1, one_of},
    combinator::{map, opt, recognize},
    error::{Error, ErrorKind},
    multi::separated_list1,
    sequence::{delimited, pair, preceded, tuple},
};

use crate::ast::{
    Block, Declaration, Definition, Directive, FileId, Import, ImportOptions, Media, MixinCall,
    MixinDefinition, Node, Ruleset, Span, Stylesheet, Value,
};
use crate::error::{CompileError, ResolveError, Result};
use crate::parser::mixins::{parse_call_path, parse_guard, parse_mixin_args, parse_mixin_params};
use crate::parser::selectors::parse_selector_list;
use crate::parser::values::{
    collapse, parse_declaration_value, parse_ident, parse_important, parse_name, parse_quoted,
    parse_url, parse_variable,
};

/// Parses the main stylesheet.
pub fn parse_stylesheet(source: &str) -> Result<Stylesheet> {
    parse_stylesheet_in(source, FileId::MAIN, None)
}

/// Parses a stylesheet loaded from `path`, tagging spans with `file`.
pub fn parse_stylesheet_in(source: &str, file: FileId, path: Option<PathBuf>) -> Result<Stylesheet> {
    let text = blank_comments(source);
    let parser = Parser::new(&text, file);

    let (remaining, rules) = match parser.rules(&text) {
        Ok(parsed) => parsed,
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => return Err(parser.syntax_error(e.input)),
        Err(nom::Err::Incomplete(_)) => return Err(parser.syntax_error("")),
    };
    if !remaining.trim().is_empty() {
        return Err(parser.syntax_error(remaining));
    }

    Ok(Stylesheet {
        path,
        root: Block::new(rules),
    })
}

/// Replaces comments with spaces, keeping newlines. Strings and `url(...)`
/// bodies are copied untouched.
fn blank_comments(source: &str) -> String {
    fn blank(text: &str, out: &mut String) {
        out.extend(text.chars().map(|c| if c == '\n' { '\n' } else { ' ' }));
    }

    let mut out = String::with_capacity(source.len());
    let mut quote: Option<char> = None;
    let mut i = 0;
    while let Some(c) = source[i..].chars().next() {
        let rest = &source[i..];
        if let Some(q) = quote {
            out.push(c);
            i += c.len_utf8();
            if c == '\\' {
                if let Some(next) = source[i..].chars().next() {
                    out.push(next);
                    i += next.len_utf8();
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }

        let end = if rest.starts_with("/*") {
            let end = rest[2..].find("*/").map_or(rest.len(), |e| e + 4);
            blank(&rest[..end], &mut out);
            end
        } else if rest.starts_with("//") {
            let end = rest.find('\n').unwrap_or(rest.len());
            blank(&rest[..end], &mut out);
            end
        } else if rest.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("url(")) {
            let end = rest.find(')').map_or(rest.len(), |e| e + 1);
            out.push_str(&rest[..end]);
            end
        } else {
            if c == '"' || c == '\'' {
                quote = Some(c);
            }
            out.push(c);
            c.len_utf8()
        };
        i += end;
    }
    out
}

fn statement_end(input: &str) -> IResult<&str, ()> {
    let (input, _) = multispace0(input)?;
    if let Some(rest) = input.strip_prefix(';') {
        return Ok((rest, ()));
    }
    if input.is_empty() || input.starts_with('}') {
        return Ok((input, ()));
    }
    Err(nom::Err::Error(Error::new(input, ErrorKind::Char)))
}

/// Parses `(once, optional)` import options.
fn parse_import_options(input: &str) -> IResult<&str, ImportOptions> {
    let (rest, names) = delimited(
        pair(char('('), multispace0),
        separated_list1(tuple((multispace0, char(','), multispace0)), parse_ident),
        pair(multispace0, char(')')),
    )(input)?;

    let mut options = ImportOptions::empty();
    for name in names {
        options |= match name {
            "once" => ImportOptions::ONCE,
            "multiple" => ImportOptions::MULTIPLE,
            "optional" => ImportOptions::OPTIONAL,
            "css" => ImportOptions::CSS,
            "less" => ImportOptions::LESS,
            _ => return Err(nom::Err::Failure(Error::new(input, ErrorKind::Tag))),
        };
    }
    Ok((rest, options))
}

/// `(max-width: 768px)`, `(color)`
fn parse_media_feature(input: &str) -> IResult<&str, Value> {
    let (input, _) = pair(char('('), multispace0)(input)?;
    let (input, name) = parse_ident(input)?;
    let (input, value) = opt(preceded(
        tuple((multispace0, char(':'), multispace0)),
        values::parse_space_list,
    ))(input)?;
    let (input, _) = pair(multispace0, char(')'))(input)?;
    let inner = match value {
        Some(value) => Value::space_list(vec![Value::Keyword(format!("{name}:")), value]),
        None => Value::Keyword(name.to_string()),
    };
    Ok((input, Value::Paren(Box::new(inner))))
}

fn parse_media_token(input: &str) -> IResult<&str, Value> {
    alt((
        parse_media_feature,
        parse_variable,
        map(parse_ident, |k: &str| Value::Keyword(k.to_string())),
    ))(input)
}

fn parse_media_query(input: &str) -> IResult<&str, Value> {
    let (input, items) = separated_list1(multispace1, parse_media_token)(input)?;
    Ok((input, collapse(items, Value::space_list)))
}

/// `screen and (min-width: 768px), print`
pub fn parse_media_query_list(input: &str) -> IResult<&str, Value> {
    let (input, queries) = separated_list1(
        tuple((multispace0, char(','), multispace0)),
        parse_media_query,
    )(input)?;
    Ok((input, collapse(queries, Value::comma_list)))
}

/// Rule-level parser. Knows the source it was created for so it can attach
/// spans to the nodes it builds.
struct Parser<'s> {
    source: &'s str,
    file: FileId,
    line_starts: Vec<usize>,
}

impl<'s> Parser<'s> {
    fn new(source: &'s str, file: FileId) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            source,
            file,
            line_starts,
        }
    }

    /// Position of `input`, which must be a suffix of the source.
    fn span(&self, input: &str) -> Span {
        let offset = self.source.len().saturating_sub(input.len());
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let start = self.line_starts.get(line.saturating_sub(1)).copied().unwrap_or(0);
        let column = self.source.get(start..offset).map_or(0, |s| s.chars().count());
        Span::new(self.file, line as u32, column as u32 + 1)
    }

    fn syntax_error(&self, at: &str) -> CompileError {
        let snippet: String = at
            .trim_start()
            .chars()
            .take_while(|c| *c != '\n')
            .take(40)
            .collect();
        let message = if snippet.is_empty() {
            "unexpected end of input".to_string()
        } else {
            format!("unrecognised input near `{snippet}`")
        };
        CompileError::new(ResolveError::InvalidSyntax(message))
            .at(self.span(at.trim_start()))
    }

    /// Rules up to a closing brace or the end of input. A rule that fails to
    /// parse fails the whole block at its position.
    fn rules<'a>(&self, mut input: &'a str) -> IResult<&'a str, Vec<Node>> {
        let mut rules = Vec::new();
        loop {
            let (rest, _) = multispace0(input)?;
            if rest.is_empty() || rest.starts_with('}') {
                return Ok((rest, rules));
            }
            if let Some(rest) = rest.strip_prefix(';') {
                input = rest;
                continue;
            }
            match self.rule(rest) {
                Ok((next, node)) => {
                    rules.push(node);
                    input = next;
                }
                Err(nom::Err::Error(_)) => {
                    return Err(nom::Err::Failure(Error::new(rest, ErrorKind::Alt)));
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn block<'a>(&self, input: &'a str) -> IResult<&'a str, Vec<Node>> {
        let (input, _) = char('{')(input)?;
        let (input, rules) = self.rules(input)?;
        let (input, _) = char('}')(input)
            .map_err(|_: nom::Err<Error<&str>>| nom::Err::Failure(Error::new(input, ErrorKind::Char)))?;
        Ok((input, rules))
    }

    fn rule<'a>(&self, input: &'a str) -> IResult<&'a str, Node> {
        let span = self.span(input);
        if input.starts_with('@') {
            return alt((
                |i| self.variable(i, span),
                |i| self.import(i, span),
                |i| self.media(i, span),
                |i| self.directive(i, span),
            ))(input);
        }
        alt((
            |i| self.mixin_definition(i, span),
            |i| self.ruleset(i, span),
            |i| self.mixin_call(i, span),
            |i| self.declaration(i, span),
        ))(input)
    }

    /// `@name: value;`
    fn variable<'a>(&self, input: &'a str, span: Span) -> IResult<&'a str, Node> {
        let (input, name) = preceded(char('@'), parse_name)(input)?;
        let (input, _) = tuple((multispace0, char(':'), multispace0))(input)?;
        let (input, value) = parse_declaration_value(input)?;
        let (input, _) = parse_important(input)?;
        let (input, _) = statement_end(input)?;
        Ok((
            input,
            Node::Variable(Rc::new(Definition::new(name, value, span))),
        ))
    }

    /// `@import (options) "path" media;`
    fn import<'a>(&self, input: &'a str, span: Span) -> IResult<&'a str, Node> {
        let (input, _) = tag("@import")(input)?;
        let (input, _) = multispace0(input)?;
        let (input, options) = opt(parse_import_options)(input)?;
        let (input, _) = multispace0(input)?;
        let (input, path) = alt((parse_quoted, parse_url, parse_variable))(input)?;
        let (input, media) = opt(preceded(multispace1, parse_media_query_list))(input)?;
        let (input, _) = statement_end(input)?;
        Ok((
            input,
            Node::Import(Import {
                path,
                options: options.unwrap_or_default(),
                media,
                span,
            }),
        ))
    }

    fn media<'a>(&self, input: &'a str, span: Span) -> IResult<&'a str, Node> {
        let (input, _) = pair(tag("@media"), multispace1)(input)?;
        let (input, features) = parse_media_query_list(input)?;
        let (input, _) = multispace0(input)?;
        let (input, rules) = self.block(input)?;
        Ok((
            input,
            Node::Media(Media {
                features,
                block: Block::new(rules),
                span,
            }),
        ))
    }

    /// Any other at-rule, with its prelude kept verbatim.
    fn directive<'a>(&self, input: &'a str, span: Span) -> IResult<&'a str, Node> {
        let (input, name) = preceded(char('@'), parse_ident)(input)?;
        let (input, prelude) = take_while(|c| !matches!(c, '{' | ';' | '}'))(input)?;
        let prelude = prelude.trim();
        let (input, block) = if input.starts_with('{') {
            let (input, rules) = self.block(input)?;
            (input, Some(Block::new(rules)))
        } else {
            let (input, _) = statement_end(input)?;
            (input, None)
        };
        Ok((
            input,
            Node::Directive(Directive {
                name: name.to_string(),
                prelude: (!prelude.is_empty()).then(|| Value::Keyword(prelude.to_string())),
                block,
                span,
            }),
        ))
    }

    /// `.name(params) [when guard] { ... }`
    fn mixin_definition<'a>(&self, input: &'a str, span: Span) -> IResult<&'a str, Node> {
        let (input, name) = recognize(pair(one_of(".#"), parse_name))(input)?;
        let (input, params) = preceded(multispace0, parse_mixin_params)(input)?;
        let (input, guard) = opt(preceded(multispace0, parse_guard))(input)?;
        let (input, _) = multispace0(input)?;
        if !input.starts_with('{') {
            return Err(nom::Err::Error(Error::new(input, ErrorKind::Char)));
        }
        let (input, rules) = self.block(input)?;

        let mut mixin = MixinDefinition::new(name, params, rules, span);
        mixin.guard = guard;
        Ok((input, Node::MixinDefinition(Rc::new(mixin))))
    }

    fn ruleset<'a>(&self, input: &'a str, span: Span) -> IResult<&'a str, Node> {
        let (input, selectors) = parse_selector_list(input)?;
        let (input, _) = multispace0(input)?;
        if !input.starts_with('{') {
            return Err(nom::Err::Error(Error::new(input, ErrorKind::Char)));
        }
        let (input, rules) = self.block(input)?;
        Ok((
            input,
            Node::Ruleset(Rc::new(Ruleset::new(selectors, rules, span))),
        ))
    }

    /// `.m;`, `.m(1, 2) !important;`, `#ns > .m();`
    fn mixin_call<'a>(&self, input: &'a str, span: Span) -> IResult<&'a str, Node> {
        let (input, path) = parse_call_path(input)?;
        let (input, args) = opt(preceded(multispace0, parse_mixin_args))(input)?;
        let (input, important) = parse_important(input)?;
        let (input, _) = statement_end(input)?;
        Ok((
            input,
            Node::MixinCall(MixinCall {
                path,
                args: args.unwrap_or_default(),
                important,
                span,
            }),
        ))
    }

    /// `property: value [!important];`
    fn declaration<'a>(&self, input: &'a str, span: Span) -> IResult<&'a str, Node> {
        let (input, property) = parse_ident(input)?;
        let (input, _) = tuple((multispace0, char(':'), multispace0))(input)?;
        let (input, value) = parse_declaration_value(input)?;
        let (input, important) = parse_important(input)?;
        let (input, _) = statement_end(input)?;
        Ok((
            input,
            Node::Declaration(Declaration {
                property: property.to_string(),
                value,
                important,
                span,
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_comments_keeps_lines() {
        let text = blank_comments("a /* x\ny */ b // c\nd");
        assert_eq!(text.lines().count(), 3);
        assert!(!text.contains('x'));
        assert!(!text.contains("c\n"));
        assert!(text.ends_with('d'));
    }

    #[test]
    fn test_blank_comments_skips_urls_and_strings() {
        let source = "a: url(http://x.y/z); b: \"//not\";";
        assert_eq!(blank_comments(source), source);
    }

    #[test]
    fn test_span_line_and_column() {
        let source = "a\n  bc";
        let parser = Parser::new(source, FileId(3));
        let span = parser.span(&source[4..]);
        assert_eq!(span, Span::new(FileId(3), 2, 3));
    }
}
