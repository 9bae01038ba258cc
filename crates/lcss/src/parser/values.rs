//! Value and expression parsing.
//!
//! Grammar, loosest binding first:
//!
//! - value: comma-separated list of space lists
//! - space list: expressions separated by whitespace
//! - expression: terms joined by `+` / `-`
//! - term: factors joined by `*` / `/`
//! - factor: `( ... )`, string, `url()`, `@var`, `@@var`, color, dimension,
//!   function call, keyword
//!
//! A sign directly attached to its operand after whitespace (`1px -2px`)
//! starts a new list item rather than a subtraction.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while, take_while1},
    character::complete::{alpha1, char, digit1, multispace0, one_of, satisfy},
    combinator::{map, map_res, opt, recognize},
    error::{Error, ErrorKind},
    multi::separated_list0,
    sequence::{delimited, pair, preceded, tuple},
};

use crate::ast::{Dimension, Operator, Value};

pub(crate) fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

/// Parses a CSS identifier: optional leading dashes, then a letter or
/// underscore, then name characters.
pub fn parse_ident(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        take_while(|c| c == '-'),
        satisfy(|c| c.is_alphabetic() || c == '_' || !c.is_ascii()),
        take_while(is_name_char),
    )))(input)
}

/// Name after `@` or `.` / `#`: any run of name characters.
pub fn parse_name(input: &str) -> IResult<&str, &str> {
    take_while1(is_name_char)(input)
}

fn fail<T>(input: &str, kind: ErrorKind) -> IResult<&str, T> {
    Err(nom::Err::Error(Error::new(input, kind)))
}

pub fn parse_number_text(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        opt(char('-')),
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit1)))),
            recognize(pair(char('.'), digit1)),
        )),
    ))(input)
}

/// `10`, `-1.5em`, `50%`.
pub fn parse_dimension(input: &str) -> IResult<&str, Value> {
    let (input, value) = map_res(parse_number_text, str::parse::<f64>)(input)?;
    let (input, unit) = opt(alt((tag("%"), alpha1)))(input)?;
    Ok((
        input,
        Value::Dimension(Dimension::new(value, unit.unwrap_or_default())),
    ))
}

/// `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`.
pub fn parse_color(input: &str) -> IResult<&str, Value> {
    let (rest, hex) = recognize(preceded(char('#'), take_while1(is_name_char)))(input)?;
    let digits = &hex[1..];
    if matches!(digits.len(), 3 | 4 | 6 | 8) && digits.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok((rest, Value::Color(hex.to_string())))
    } else {
        fail(input, ErrorKind::HexDigit)
    }
}

fn string_body(quote: char) -> impl Fn(&str) -> IResult<&str, &str> {
    move |input: &str| {
        let mut escaped = false;
        for (i, c) in input.char_indices() {
            if escaped {
                escaped = false;
                continue;
            }
            match c {
                '\\' => escaped = true,
                c if c == quote => return Ok((&input[i..], &input[..i])),
                _ => {}
            }
        }
        fail(input, ErrorKind::Char)
    }
}

/// `"text"`, `'text'`, and escaped `~"text"`.
pub fn parse_quoted(input: &str) -> IResult<&str, Value> {
    let (input, escaped) = opt(char('~'))(input)?;
    let (input, quote) = one_of("\"'")(input)?;
    let (input, text) = string_body(quote)(input)?;
    let (input, _) = char(quote)(input)?;
    Ok((
        input,
        Value::Quoted {
            text: text.to_string(),
            quote: if escaped.is_some() { None } else { Some(quote) },
        },
    ))
}

/// `url("a.png")`, `url(a.png)`.
pub fn parse_url(input: &str) -> IResult<&str, Value> {
    let (input, _) = tag_no_case("url(")(input)?;
    let (input, _) = multispace0(input)?;
    let (input, inner) = alt((
        parse_quoted,
        parse_variable,
        map(
            take_while1(|c: char| c != ')' && !c.is_whitespace()),
            |raw: &str| Value::Keyword(raw.to_string()),
        ),
    ))(input)?;
    let (input, _) = preceded(multispace0, char(')'))(input)?;
    Ok((input, Value::Url(Box::new(inner))))
}

/// `@name` or `@@name`.
pub fn parse_variable(input: &str) -> IResult<&str, Value> {
    alt((
        map(preceded(tag("@@"), parse_name), |n: &str| {
            Value::Indirect(n.to_string())
        }),
        map(preceded(char('@'), parse_name), |n: &str| {
            Value::Variable(n.to_string())
        }),
    ))(input)
}

/// `name(arg, arg)`; each argument is a space list.
fn parse_call(input: &str) -> IResult<&str, Value> {
    let (input, name) = parse_ident(input)?;
    let (input, args) = delimited(
        char('('),
        delimited(
            multispace0,
            separated_list0(tuple((multispace0, char(','), multispace0)), parse_space_list),
            multispace0,
        ),
        char(')'),
    )(input)?;
    Ok((
        input,
        Value::Call {
            name: name.to_string(),
            args,
        },
    ))
}

fn parse_paren(input: &str) -> IResult<&str, Value> {
    map(
        delimited(
            pair(char('('), multispace0),
            parse_space_list,
            pair(multispace0, char(')')),
        ),
        |inner| Value::Paren(Box::new(inner)),
    )(input)
}

/// `-@x`, `-(...)`.
fn parse_negation(input: &str) -> IResult<&str, Value> {
    map(
        preceded(char('-'), alt((parse_variable, parse_paren))),
        |operand| Value::Operation {
            op: Operator::Multiply,
            lhs: Box::new(Value::number(-1.0)),
            rhs: Box::new(operand),
        },
    )(input)
}

pub fn parse_factor(input: &str) -> IResult<&str, Value> {
    alt((
        parse_paren,
        parse_quoted,
        parse_url,
        parse_variable,
        parse_color,
        parse_dimension,
        parse_negation,
        parse_call,
        map(parse_ident, |k: &str| Value::Keyword(k.to_string())),
    ))(input)
}

/// Matches an infix operator from `ops`, applying the attached-sign rule.
fn infix_operator<'a>(input: &'a str, ops: &str) -> IResult<&'a str, Operator> {
    let (rest, space) = multispace0(input)?;
    let (after, symbol) = one_of(ops)(rest)?;
    let attached = after.chars().next().is_some_and(|c| !c.is_whitespace());
    if !space.is_empty() && attached && matches!(symbol, '-' | '+') {
        return fail(input, ErrorKind::OneOf);
    }
    let op = match symbol {
        '+' => Operator::Add,
        '-' => Operator::Subtract,
        '*' => Operator::Multiply,
        _ => Operator::Divide,
    };
    let (after, _) = multispace0(after)?;
    Ok((after, op))
}

fn fold_operations<'a>(
    input: &'a str,
    ops: &str,
    operand: fn(&'a str) -> IResult<&'a str, Value>,
) -> IResult<&'a str, Value> {
    let (mut input, mut lhs) = operand(input)?;
    while let Ok((rest, op)) = infix_operator(input, ops) {
        let Ok((rest, rhs)) = operand(rest) else {
            break;
        };
        lhs = Value::Operation {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        };
        input = rest;
    }
    Ok((input, lhs))
}

fn parse_term(input: &str) -> IResult<&str, Value> {
    fold_operations(input, "*/", parse_factor)
}

/// A single expression, `@a + 2 * @b`.
pub fn parse_expression(input: &str) -> IResult<&str, Value> {
    fold_operations(input, "+-", parse_term)
}

/// Whitespace-separated expressions. A single expression is returned as is.
pub fn parse_space_list(input: &str) -> IResult<&str, Value> {
    let (mut input, first) = parse_expression(input)?;
    let mut items = vec![first];
    loop {
        let (rest, _) = multispace0(input)?;
        match parse_expression(rest) {
            Ok((rest, item)) => {
                items.push(item);
                input = rest;
            }
            Err(_) => break,
        }
    }
    Ok((input, collapse(items, Value::space_list)))
}

/// Comma-separated space lists. A single item is returned as is.
pub fn parse_value(input: &str) -> IResult<&str, Value> {
    let (input, first) = parse_space_list(input)?;
    let mut items = vec![first];
    let mut input = input;
    while let Ok((rest, item)) = preceded(
        tuple((multispace0, char(','), multispace0)),
        parse_space_list,
    )(input)
    {
        items.push(item);
        input = rest;
    }
    Ok((input, collapse(items, Value::comma_list)))
}

pub(crate) fn collapse(mut items: Vec<Value>, list: fn(Vec<Value>) -> Value) -> Value {
    if items.len() == 1 {
        items.remove(0)
    } else {
        list(items)
    }
}

fn at_value_end(input: &str) -> bool {
    let rest = input.trim_start();
    rest.is_empty() || rest.starts_with([';', '}', '!'])
}

/// A declaration value. Anything the expression grammar cannot read
/// (`progid:...`, `alpha(opacity=50)`) is kept verbatim as a keyword.
pub fn parse_declaration_value(input: &str) -> IResult<&str, Value> {
    if let Ok((rest, value)) = parse_value(input) {
        if at_value_end(rest) {
            return Ok((rest, value));
        }
    }
    let end = input.find([';', '}']).unwrap_or(input.len());
    let raw = input[..end].trim_end();
    let (raw, rest) = match raw.strip_suffix("!important") {
        Some(stripped) => (stripped.trim_end(), &input[stripped.len()..]),
        None => (raw, &input[raw.len()..]),
    };
    if raw.is_empty() || raw.contains('{') {
        return fail(input, ErrorKind::TakeWhile1);
    }
    Ok((rest, Value::Keyword(raw.to_string())))
}

/// `!important`, with optional leading whitespace.
pub fn parse_important(input: &str) -> IResult<&str, bool> {
    map(opt(preceded(multispace0, tag("!important"))), |i| {
        i.is_some()
    })(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Separator;

    #[test]
    fn test_ident_rejects_signed_numbers() {
        assert_eq!(parse_ident("-webkit-box").unwrap().1, "-webkit-box");
        assert!(parse_ident("-2px").is_err());
    }

    #[test]
    fn test_attached_sign_starts_new_item() {
        let (_, value) = parse_space_list("1px -2px").unwrap();
        assert_eq!(
            value,
            Value::space_list(vec![Value::dimension(1.0, "px"), Value::dimension(-2.0, "px")])
        );
    }

    #[test]
    fn test_spaced_minus_is_subtraction() {
        let (_, value) = parse_expression("@a - 2").unwrap();
        assert!(matches!(
            value,
            Value::Operation {
                op: Operator::Subtract,
                ..
            }
        ));
    }

    #[test]
    fn test_precedence() {
        let (_, value) = parse_expression("1 + 2 * 3").unwrap();
        assert_eq!(value.to_string(), "1 + 2 * 3");
        let Value::Operation { op, rhs, .. } = value else {
            panic!("expected operation");
        };
        assert_eq!(op, Operator::Add);
        assert!(matches!(
            *rhs,
            Value::Operation {
                op: Operator::Multiply,
                ..
            }
        ));
    }

    #[test]
    fn test_comma_list_of_space_lists() {
        let (_, value) = parse_value("a b, c").unwrap();
        let Value::List { items, separator } = value else {
            panic!("expected list");
        };
        assert_eq!(separator, Separator::Comma);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_escaped_string_has_no_quote() {
        let (_, value) = parse_quoted("~\"calc(100% - @{w})\"").unwrap();
        assert_eq!(
            value,
            Value::Quoted {
                text: "calc(100% - @{w})".to_string(),
                quote: None
            }
        );
    }

    #[test]
    fn test_unparseable_value_kept_verbatim() {
        let (rest, value) = parse_declaration_value("alpha(opacity=50) !important;").unwrap();
        assert_eq!(value, Value::keyword("alpha(opacity=50)"));
        assert_eq!(rest, "!important;");
    }

    #[test]
    fn test_color_requires_hex_length() {
        assert_eq!(parse_color("#fff").unwrap().1, Value::Color("#fff".into()));
        assert!(parse_color("#ns").is_err());
    }
}
