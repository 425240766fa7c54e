//! Recursive-descent parser for the path-query language, built on nom.
//!
//! Grammar (precedence, loosest first): or, and, equality, relational,
//! additive, `div`/`mod`, unary minus, union `|`, then primaries
//! (parenthesized expression, literal, number, function call, location path).

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while_m_n},
    character::complete::{char, digit1, multispace0, one_of},
    combinator::{map, map_opt, map_res, opt, peek, recognize, value},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated},
    Finish, IResult,
};

use super::ast::{ArithOp, Axis, CmpOp, Expr, Func, NameTest, Path, Step};

pub type ParseResult<'a, T> = IResult<&'a str, T>;

/// Parses a complete expression; trailing input is an error.
pub fn parse(input: &str) -> Result<Expr, String> {
    match delimited(multispace0, expr, multispace0)(input).finish() {
        Ok(("", parsed)) => Ok(parsed),
        Ok((rest, _)) => Err(format!("unexpected trailing input: '{}'", rest)),
        Err(e) => Err(format!("syntax error near '{}'", truncate(e.input))),
    }
}

fn truncate(s: &str) -> &str {
    let end = s
        .char_indices()
        .nth(24)
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    &s[..end]
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
}

fn name(input: &str) -> ParseResult<&str> {
    recognize(pair(
        take_while_m_n(1, 1, is_name_start),
        take_while(is_name_char),
    ))(input)
}

/// Keyword operator (`or`, `and`, `div`, `mod`): must not be the prefix of a
/// longer name.
fn word_op<'a>(word: &'static str) -> impl FnMut(&'a str) -> ParseResult<'a, &'a str> {
    move |input| {
        let (after_ws, _) = multispace0(input)?;
        let (rest, matched) = tag(word)(after_ws)?;
        if rest.chars().next().is_some_and(is_name_char) {
            Err(nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Tag,
            )))
        } else {
            Ok((rest, matched))
        }
    }
}

fn expr(input: &str) -> ParseResult<Expr> {
    or_expr(input)
}

fn or_expr(input: &str) -> ParseResult<Expr> {
    let (input, first) = and_expr(input)?;
    let (input, rest) = many0(preceded(word_op("or"), and_expr))(input)?;
    Ok((input, fold_binary(first, rest, |l, r| Expr::Or(l, r))))
}

fn and_expr(input: &str) -> ParseResult<Expr> {
    let (input, first) = equality_expr(input)?;
    let (input, rest) = many0(preceded(word_op("and"), equality_expr))(input)?;
    Ok((input, fold_binary(first, rest, |l, r| Expr::And(l, r))))
}

fn equality_expr(input: &str) -> ParseResult<Expr> {
    let (input, first) = relational_expr(input)?;
    let (input, rest) = many0(pair(
        preceded(
            multispace0,
            alt((value(CmpOp::Ne, tag("!=")), value(CmpOp::Eq, char('=')))),
        ),
        relational_expr,
    ))(input)?;
    Ok((input, fold_compare(first, rest)))
}

fn relational_expr(input: &str) -> ParseResult<Expr> {
    let (input, first) = additive_expr(input)?;
    let (input, rest) = many0(pair(
        preceded(
            multispace0,
            alt((
                value(CmpOp::Le, tag("<=")),
                value(CmpOp::Ge, tag(">=")),
                value(CmpOp::Lt, char('<')),
                value(CmpOp::Gt, char('>')),
            )),
        ),
        additive_expr,
    ))(input)?;
    Ok((input, fold_compare(first, rest)))
}

fn additive_expr(input: &str) -> ParseResult<Expr> {
    let (input, first) = multiplicative_expr(input)?;
    let (input, rest) = many0(pair(
        preceded(multispace0, one_of("+-")),
        multiplicative_expr,
    ))(input)?;
    let folded = rest.into_iter().fold(first, |acc, (op, operand)| {
        let op = if op == '+' { ArithOp::Add } else { ArithOp::Sub };
        Expr::Arith(op, Box::new(acc), Box::new(operand))
    });
    Ok((input, folded))
}

fn multiplicative_expr(input: &str) -> ParseResult<Expr> {
    let (input, first) = unary_expr(input)?;
    let (input, rest) = many0(pair(
        alt((
            value(ArithOp::Div, word_op("div")),
            value(ArithOp::Mod, word_op("mod")),
        )),
        unary_expr,
    ))(input)?;
    let folded = rest.into_iter().fold(first, |acc, (op, operand)| {
        Expr::Arith(op, Box::new(acc), Box::new(operand))
    });
    Ok((input, folded))
}

fn unary_expr(input: &str) -> ParseResult<Expr> {
    let (input, minuses) = many0(preceded(multispace0, char('-')))(input)?;
    let (input, operand) = union_expr(input)?;
    let negated = minuses
        .into_iter()
        .fold(operand, |acc, _| Expr::Neg(Box::new(acc)));
    Ok((input, negated))
}

fn union_expr(input: &str) -> ParseResult<Expr> {
    let (input, first) = primary_expr(input)?;
    let (input, rest) = many0(preceded(
        preceded(multispace0, char('|')),
        primary_expr,
    ))(input)?;
    Ok((input, fold_binary(first, rest, |l, r| Expr::Union(l, r))))
}

fn fold_binary(
    first: Expr,
    rest: Vec<Expr>,
    build: impl Fn(Box<Expr>, Box<Expr>) -> Expr,
) -> Expr {
    rest.into_iter()
        .fold(first, |acc, e| build(Box::new(acc), Box::new(e)))
}

fn fold_compare(first: Expr, rest: Vec<(CmpOp, Expr)>) -> Expr {
    rest.into_iter().fold(first, |acc, (op, operand)| {
        Expr::Compare(op, Box::new(acc), Box::new(operand))
    })
}

fn primary_expr(input: &str) -> ParseResult<Expr> {
    preceded(
        multispace0,
        alt((
            parenthesized,
            literal,
            number,
            function_call,
            map(location_path, Expr::Path),
        )),
    )(input)
}

fn parenthesized(input: &str) -> ParseResult<Expr> {
    delimited(
        char('('),
        delimited(multispace0, expr, multispace0),
        char(')'),
    )(input)
}

fn literal(input: &str) -> ParseResult<Expr> {
    map(
        alt((
            delimited(char('\''), take_while(|c| c != '\''), char('\'')),
            delimited(char('"'), take_while(|c| c != '"'), char('"')),
        )),
        |s: &str| Expr::Literal(s.to_string()),
    )(input)
}

fn number(input: &str) -> ParseResult<Expr> {
    map_res(
        recognize(pair(digit1, opt(pair(char('.'), digit1)))),
        |s: &str| s.parse::<f64>().map(Expr::Number),
    )(input)
}

fn function_call(input: &str) -> ParseResult<Expr> {
    let (input, func) = map_opt(
        terminated(name, preceded(multispace0, peek(char('(')))),
        Func::from_name,
    )(input)?;
    let (input, args) = delimited(
        preceded(multispace0, char('(')),
        separated_list0(preceded(multispace0, char(',')), expr),
        preceded(multispace0, char(')')),
    )(input)?;
    Ok((input, Expr::Call(func, args)))
}

fn location_path(input: &str) -> ParseResult<Path> {
    alt((
        map(preceded(tag("//"), relative_steps), |mut steps| {
            steps.insert(0, Step::descendant_or_self());
            Path {
                absolute: true,
                steps,
            }
        }),
        map(preceded(char('/'), relative_steps), |steps| Path {
            absolute: true,
            steps,
        }),
        map(relative_steps, |steps| Path {
            absolute: false,
            steps,
        }),
    ))(input)
}

fn relative_steps(input: &str) -> ParseResult<Vec<Step>> {
    let (input, first) = step(input)?;
    let (input, rest) = many0(pair(alt((tag("//"), tag("/"))), step))(input)?;
    let mut steps = vec![first];
    for (separator, s) in rest {
        if separator == "//" {
            steps.push(Step::descendant_or_self());
        }
        steps.push(s);
    }
    Ok((input, steps))
}

fn step(input: &str) -> ParseResult<Step> {
    preceded(
        multispace0,
        alt((
            map(tag(".."), |_| Step::parent()),
            map(char('.'), |_| Step::self_node()),
            step_with_test,
        )),
    )(input)
}

fn step_with_test(input: &str) -> ParseResult<Step> {
    let (input, at) = opt(char('@'))(input)?;
    let (input, test) = alt((
        map(char('*'), |_| NameTest::Any),
        map(
            terminated(
                tag("node"),
                pair(
                    preceded(multispace0, char('(')),
                    preceded(multispace0, char(')')),
                ),
            ),
            |_| NameTest::Node,
        ),
        map(name, |n: &str| NameTest::Name(n.to_string())),
    ))(input)?;
    let (input, predicates) = many0(delimited(
        preceded(multispace0, char('[')),
        expr,
        preceded(multispace0, char(']')),
    ))(input)?;
    let axis = if at.is_some() {
        Axis::Attribute
    } else {
        Axis::Child
    };
    Ok((
        input,
        Step {
            axis,
            test,
            predicates,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ast::ReturnType;

    #[test]
    fn parses_absolute_path_with_predicate() {
        let expr = parse("//topic[@id='N:Alpha']").unwrap();
        assert_eq!(expr.return_type(), ReturnType::NodeSet);
    }

    #[test]
    fn parses_condition_with_nested_function() {
        let expr = parse("@name[starts-with(., 'Overload')]").unwrap();
        assert_eq!(expr.return_type(), ReturnType::NodeSet);
    }

    #[test]
    fn parses_boolean_combinators() {
        let expr = parse(".//tocexclude or .//excludetoc").unwrap();
        assert_eq!(expr.return_type(), ReturnType::Boolean);
    }

    #[test]
    fn count_is_a_number() {
        let expr = parse("count(apis/api) > 2").unwrap();
        assert_eq!(expr.return_type(), ReturnType::Boolean);
        let expr = parse("count(apis/api)").unwrap();
        assert_eq!(expr.return_type(), ReturnType::Number);
    }

    #[test]
    fn keyword_operator_does_not_eat_names() {
        // "organization" starts with "or"
        let expr = parse("organization/or").unwrap();
        assert_eq!(expr.return_type(), ReturnType::NodeSet);
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(parse("topic]").is_err());
        assert!(parse("").is_err());
        assert!(parse("foo(1)").is_err()); // unknown function
    }
}
