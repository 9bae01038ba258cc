//! Mixin parameter, argument and guard grammar.
//!
//! Parameter and argument lists are separated by commas unless a semicolon
//! appears at the top level of the list, in which case semicolons separate
//! and commas build comma lists inside one argument:
//!
//! ```less
//! .m(1, 2, 3);    // three arguments
//! .m(1, 2; 3);    // two arguments: `1, 2` and `3`
//! .m(1, 2;);      // one argument: `1, 2`
//! ```

use nom::{
    IResult,
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, multispace0, multispace1, one_of},
    combinator::{map, opt, recognize},
    multi::{many0, separated_list1},
    sequence::{pair, preceded, terminated, tuple},
};

use crate::ast::{Comparison, Condition, Guard, MixinArg, MixinParam, Value};
use crate::parser::values::{parse_expression, parse_name, parse_space_list, parse_value};

/// Whether the parenthesised list starting at `input` (just after `(`)
/// uses semicolons as separators.
pub fn uses_semicolons(input: &str) -> bool {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in input.chars() {
        if let Some(q) = quote {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                c if c == q => quote = None,
                _ => {}
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' if depth == 0 => return false,
            ')' | ']' | '}' => depth -= 1,
            ';' if depth == 0 => return true,
            _ => {}
        }
    }
    false
}

fn list_item(input: &str, semicolons: bool) -> IResult<&str, Value> {
    if semicolons {
        parse_value(input)
    } else {
        parse_space_list(input)
    }
}

/// Parses `( item sep item ... )` with the separator chosen by
/// [`uses_semicolons`]. A trailing separator is allowed.
fn parenthesized_list<'a, T>(
    input: &'a str,
    item: impl Fn(&'a str, bool) -> IResult<&'a str, T>,
) -> IResult<&'a str, Vec<T>> {
    let (input, _) = char('(')(input)?;
    let separator = if uses_semicolons(input) { ';' } else { ',' };
    let semicolons = separator == ';';
    let (input, _) = multispace0(input)?;
    if let Some(rest) = input.strip_prefix(')') {
        return Ok((rest, Vec::new()));
    }
    let (input, items) = separated_list1(
        tuple((multispace0, char(separator), multispace0)),
        |i| item(i, semicolons),
    )(input)?;
    let (input, _) = tuple((
        multispace0,
        opt(char(separator)),
        multispace0,
        char(')'),
    ))(input)?;
    Ok((input, items))
}

fn parse_param(input: &str, semicolons: bool) -> IResult<&str, MixinParam> {
    alt((
        map(tag("..."), |_| MixinParam::Variadic(None)),
        map(terminated(preceded(char('@'), parse_name), tag("...")), |n| {
            MixinParam::Variadic(Some(n.to_string()))
        }),
        map(
            pair(
                terminated(
                    preceded(char('@'), parse_name),
                    tuple((multispace0, char(':'), multispace0)),
                ),
                |i| list_item(i, semicolons),
            ),
            |(name, default)| MixinParam::Named {
                name: name.to_string(),
                default,
            },
        ),
        map(preceded(char('@'), parse_name), |n| {
            MixinParam::Positional(n.to_string())
        }),
        map(|i| list_item(i, semicolons), MixinParam::Pattern),
    ))(input)
}

/// `(@a; @b: 2; @rest...)`
pub fn parse_mixin_params(input: &str) -> IResult<&str, Vec<MixinParam>> {
    parenthesized_list(input, parse_param)
}

fn parse_arg(input: &str, semicolons: bool) -> IResult<&str, MixinArg> {
    let (input, name) = opt(terminated(
        preceded(char('@'), parse_name),
        tuple((multispace0, char(':'), multispace0)),
    ))(input)?;
    let (input, value) = list_item(input, semicolons)?;
    Ok((
        input,
        MixinArg {
            name: name.map(str::to_string),
            value,
        },
    ))
}

/// `(1px, @size: 2)`
pub fn parse_mixin_args(input: &str) -> IResult<&str, Vec<MixinArg>> {
    parenthesized_list(input, parse_arg)
}

fn parse_segment(input: &str) -> IResult<&str, &str> {
    recognize(pair(one_of(".#"), parse_name))(input)
}

/// `.m`, `#ns > .m`, `#ns.m`, `#ns .m`
pub fn parse_call_path(input: &str) -> IResult<&str, Vec<String>> {
    let (input, first) = parse_segment(input)?;
    let (input, rest) = many0(preceded(
        tuple((multispace0, opt(char('>')), multispace0)),
        parse_segment,
    ))(input)?;
    let mut path = vec![first.to_string()];
    path.extend(rest.into_iter().map(str::to_string));
    Ok((input, path))
}

fn parse_comparison(input: &str) -> IResult<&str, Comparison> {
    alt((
        map(tag(">="), |_| Comparison::Ge),
        map(tag("=>"), |_| Comparison::Ge),
        map(tag("<="), |_| Comparison::Le),
        map(tag("=<"), |_| Comparison::Le),
        map(char('='), |_| Comparison::Eq),
        map(char('<'), |_| Comparison::Lt),
        map(char('>'), |_| Comparison::Gt),
    ))(input)
}

/// `[not] (lhs [op rhs])`
fn parse_condition(input: &str) -> IResult<&str, Condition> {
    let (input, negated) = opt(terminated(tag("not"), multispace0))(input)?;
    let (input, _) = pair(char('('), multispace0)(input)?;
    let (input, lhs) = parse_expression(input)?;
    let (input, comparison) = opt(pair(
        preceded(multispace0, parse_comparison),
        preceded(multispace0, parse_expression),
    ))(input)?;
    let (input, _) = pair(multispace0, char(')'))(input)?;
    Ok((
        input,
        Condition {
            negated: negated.is_some(),
            lhs,
            comparison,
        },
    ))
}

fn parse_condition_group(input: &str) -> IResult<&str, Vec<Condition>> {
    separated_list1(
        tuple((multispace1, tag("and"), multispace1)),
        parse_condition,
    )(input)
}

/// `when (a) and (b), (c)`: groups separated by `,` or `or`.
pub fn parse_guard(input: &str) -> IResult<&str, Guard> {
    let (input, _) = pair(tag("when"), multispace1)(input)?;
    let (input, groups) = separated_list1(
        alt((
            recognize(tuple((multispace0, char(','), multispace0))),
            recognize(tuple((multispace1, tag("or"), multispace1))),
        )),
        parse_condition_group,
    )(input)?;
    Ok((input, Guard { groups }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semicolon_detection_ignores_nested() {
        assert!(uses_semicolons("1, 2; 3)"));
        assert!(!uses_semicolons("1, 2) { a; }"));
        assert!(!uses_semicolons("fn(a; b), 2)"));
        assert!(!uses_semicolons("\";\", 2)"));
    }

    #[test]
    fn test_semicolon_args_form_comma_lists() {
        let (_, args) = parse_mixin_args("(1, 2; 3)").unwrap();
        assert_eq!(args.len(), 2);
        assert_eq!(args[0].value.to_string(), "1, 2");
        let (_, args) = parse_mixin_args("(1, 2;)").unwrap();
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn test_params_kinds() {
        let (_, params) = parse_mixin_params("(@a, @b: 2px, dark, @rest...)").unwrap();
        assert_eq!(
            params,
            vec![
                MixinParam::Positional("a".into()),
                MixinParam::Named {
                    name: "b".into(),
                    default: Value::dimension(2.0, "px")
                },
                MixinParam::Pattern(Value::keyword("dark")),
                MixinParam::Variadic(Some("rest".into())),
            ]
        );
    }

    #[test]
    fn test_guard_groups() {
        let (_, guard) = parse_guard("when (@a > 0) and not (@b), (@c = 1)").unwrap();
        assert_eq!(guard.groups.len(), 2);
        assert_eq!(guard.groups[0].len(), 2);
        assert!(guard.groups[0][1].negated);
        assert_eq!(
            guard.groups[1][0].comparison.as_ref().map(|(c, _)| *c),
            Some(Comparison::Eq)
        );
    }

    #[test]
    fn test_namespaced_path() {
        let (_, path) = parse_call_path("#ns > .m()").unwrap();
        assert_eq!(path, vec!["#ns", ".m"]);
        let (_, path) = parse_call_path("#ns.m;").unwrap();
        assert_eq!(path, vec!["#ns", ".m"]);
    }
}
