use nom::{
    IResult,
    branch::alt,
    bytes::complete::{take_until, take_while},
    character::complete::{char, multispace0, one_of},
    combinator::{map, opt, recognize},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, tuple},
};

use crate::ast::{Combinator, Element, ElementKind, Selector};
use crate::parser::values::{parse_ident, parse_name, parse_number_text};

/// Parses balanced `( ... )` after a pseudo-class, returning it verbatim.
fn parse_pseudo_args(input: &str) -> IResult<&str, &str> {
    let mut depth = 0usize;
    for (i, c) in input.char_indices() {
        match c {
            '(' => depth += 1,
            ')' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&input[i + 1..], &input[..i + 1]));
                }
            }
            _ if depth == 0 => break,
            _ => {}
        }
    }
    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Char,
    )))
}

fn literal(text: &str) -> ElementKind {
    ElementKind::Literal(text.to_string())
}

/// Parses one simple selector: `&`, `.class`, `#id`, `:pseudo`, `*`,
/// `[attr]`, a keyframe percentage or a type.
pub fn parse_simple_selector(input: &str) -> IResult<&str, ElementKind> {
    alt((
        map(char('&'), |_| ElementKind::Wildcard),
        map(recognize(pair(one_of(".#"), parse_name)), literal),
        map(
            recognize(tuple((
                char(':'),
                opt(char(':')),
                parse_ident,
                opt(parse_pseudo_args),
            ))),
            literal,
        ),
        map(char('*'), |_| literal("*")),
        parse_attribute_selector,
        map(recognize(pair(parse_number_text, char('%'))), literal),
        map(parse_ident, literal),
    ))(input)
}

/// Parses a compound selector (`a.b:hover`) into elements; the first takes
/// `combinator`, the rest attach to it.
fn parse_compound_selector(input: &str, combinator: Combinator) -> IResult<&str, Vec<Element>> {
    let (input, first) = parse_simple_selector(input)?;
    let (input, rest) = many0(parse_simple_selector)(input)?;

    let mut elements = vec![Element::new(combinator, first)];
    elements.extend(
        rest.into_iter()
            .map(|kind| Element::new(Combinator::None, kind)),
    );
    Ok((input, elements))
}

fn parse_combinator(input: &str) -> IResult<&str, Combinator> {
    alt((
        map(char('>'), |_| Combinator::Child),
        map(char('+'), |_| Combinator::AdjacentSibling),
        map(char('~'), |_| Combinator::GeneralSibling),
    ))(input)
}

/// Parses a complex selector (`.a > .b c`). A leading combinator is kept on
/// the first element for nesting (`> .child`).
pub fn parse_selector(input: &str) -> IResult<&str, Selector> {
    let (input, leading) = opt(pair(parse_combinator, multispace0))(input)?;
    let first_combinator = leading.map_or(Combinator::None, |(c, _)| c);
    let (mut input, mut elements) = parse_compound_selector(input, first_combinator)?;

    loop {
        let (rem, ws) = multispace0(input)?;

        if let Ok((after_op, combinator)) = parse_combinator(rem) {
            let (after_ws, _) = multispace0(after_op)?;
            match parse_compound_selector(after_ws, combinator) {
                Ok((next, compound)) => {
                    elements.extend(compound);
                    input = next;
                    continue;
                }
                Err(_) => break,
            }
        }

        if !ws.is_empty() {
            match parse_compound_selector(rem, Combinator::Descendant) {
                Ok((next, compound)) => {
                    elements.extend(compound);
                    input = next;
                    continue;
                }
                Err(_) => break,
            }
        }

        break;
    }

    Ok((input, Selector::new(elements)))
}

/// Parses a comma-separated list of selectors (`.a, .b > &`).
pub fn parse_selector_list(input: &str) -> IResult<&str, Vec<Selector>> {
    separated_list1(tuple((multispace0, char(','), multispace0)), parse_selector)(input)
}

fn parse_attribute_selector(input: &str) -> IResult<&str, ElementKind> {
    let (input, content) = delimited(char('['), take_until("]"), char(']'))(input)?;

    let (value, name_and_op) =
        take_while::<_, &str, nom::error::Error<&str>>(|c| !"~|^$*=".contains(c))(content)
            .unwrap_or(("", content));
    let name = name_and_op.trim().to_string();
    let (op, value) = match value.find('=') {
        Some(idx) => (
            Some(value[..=idx].to_string()),
            Some(value[idx + 1..].trim().to_string()),
        ),
        None => (None, None),
    };
    Ok((input, ElementKind::Attribute { name, op, value }))
}
