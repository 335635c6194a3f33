use std::cell::Cell;

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, take_while},
    character::complete::{char, digit0, digit1, multispace0, one_of, satisfy},
    combinator::{all_consuming, map, not, opt, recognize, value, verify},
    error::{context, VerboseError, VerboseErrorKind},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, separated_pair, terminated, tuple},
    IResult,
};

use super::ast::{BinaryOp, CompareOp, Expr, LogicalOp, UnaryOp};
use super::EvalError;
use crate::core::Value;

type ParseResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// Deepest bracket, unary or conditional nesting the parser accepts
pub const MAX_NESTING: usize = 100;

const TOO_DEEP: &str = "too many nested parentheses";

thread_local! {
    static NESTING: Cell<usize> = const { Cell::new(0) };
}

const RESERVED: &[&str] = &[
    "and", "or", "not", "if", "else", "in", "True", "False", "None",
];

/// Parse a complete expression. Trailing input is a syntax error.
pub fn parse_expression(source: &str) -> Result<Expr, EvalError> {
    tracing::trace!(expr = %source, "parsing expression");
    NESTING.with(|depth| depth.set(0));

    match all_consuming(terminated(expression, multispace0))(source) {
        Ok((_, expr)) => Ok(expr),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(syntax_error(source, &e)),
        Err(nom::Err::Incomplete(_)) => Err(EvalError::Syntax {
            offset: source.len(),
            message: "unexpected end of expression".to_string(),
        }),
    }
}

fn syntax_error(source: &str, error: &VerboseError<&str>) -> EvalError {
    let Some((rest, kind)) = error.errors.first() else {
        return EvalError::Syntax {
            offset: 0,
            message: "invalid expression".to_string(),
        };
    };

    let rest = rest.trim_start();
    let offset = source.len() - rest.len();
    let near = if rest.is_empty() {
        "end of input".to_string()
    } else {
        format!("'{}'", rest.chars().take(12).collect::<String>())
    };

    let message = match kind {
        VerboseErrorKind::Context(ctx) if *ctx == TOO_DEEP => ctx.to_string(),
        VerboseErrorKind::Context(ctx) => format!("{} near {}", ctx, near),
        VerboseErrorKind::Char(c) => format!("expected '{}' near {}", c, near),
        VerboseErrorKind::Nom(_) => format!("unexpected {}", near),
    };

    EvalError::Syntax { offset, message }
}

/// Run `parser` one nesting level deeper. Past [`MAX_NESTING`] the parse
/// fails outright instead of recursing further.
fn nested<'a, O, F>(mut parser: F) -> impl FnMut(&'a str) -> ParseResult<'a, O>
where
    F: FnMut(&'a str) -> ParseResult<'a, O>,
{
    move |input: &'a str| {
        let depth = NESTING.with(|depth| {
            depth.set(depth.get() + 1);
            depth.get()
        });
        let result = if depth > MAX_NESTING {
            Err(nom::Err::Failure(VerboseError {
                errors: vec![(input, VerboseErrorKind::Context(TOO_DEEP))],
            }))
        } else {
            parser(input)
        };
        NESTING.with(|depth| depth.set(depth.get() - 1));
        result
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn symbol<'a>(sym: &'static str) -> impl FnMut(&'a str) -> ParseResult<'a, &'a str> {
    preceded(multispace0, tag(sym))
}

fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> ParseResult<'a, &'a str> {
    preceded(multispace0, terminated(tag(word), not(satisfy(is_ident_char))))
}

fn identifier(input: &str) -> ParseResult<&str> {
    context(
        "identifier",
        preceded(
            multispace0,
            verify(
                recognize(pair(satisfy(is_ident_start), take_while(is_ident_char))),
                |s: &str| !RESERVED.contains(&s),
            ),
        ),
    )(input)
}

fn number_text(input: &str) -> ParseResult<&str> {
    preceded(
        multispace0,
        recognize(tuple((
            alt((
                recognize(pair(digit1, opt(pair(char('.'), digit0)))),
                recognize(pair(char('.'), digit1)),
            )),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
    )(input)
}

fn number(input: &str) -> ParseResult<Expr> {
    let (rest, text) = number_text(input)?;

    let literal = if text.contains(|c: char| matches!(c, '.' | 'e' | 'E')) {
        text.parse::<f64>().ok().map(Value::Float)
    } else {
        text.parse::<i64>().ok().map(Value::Int)
    };

    match literal {
        Some(v) => Ok((rest, Expr::Literal(v))),
        None => Err(nom::Err::Failure(VerboseError {
            errors: vec![(input, VerboseErrorKind::Context("numeric literal out of range"))],
        })),
    }
}

fn quoted<'a>(
    quote: char,
    stop: &'static str,
) -> impl FnMut(&'a str) -> ParseResult<'a, String> {
    delimited(
        char(quote),
        map(
            opt(escaped_transform(
                is_not(stop),
                '\\',
                alt((
                    value("\\", char('\\')),
                    value("\"", char('"')),
                    value("'", char('\'')),
                    value("\n", char('n')),
                    value("\t", char('t')),
                    value("\r", char('r')),
                )),
            )),
            Option::unwrap_or_default,
        ),
        char(quote),
    )
}

fn string(input: &str) -> ParseResult<Expr> {
    context(
        "string literal",
        map(
            preceded(multispace0, alt((quoted('"', "\"\\"), quoted('\'', "'\\")))),
            |s| Expr::Literal(Value::Str(s)),
        ),
    )(input)
}

fn constant(input: &str) -> ParseResult<Expr> {
    alt((
        value(Expr::Literal(Value::Bool(true)), keyword("True")),
        value(Expr::Literal(Value::Bool(false)), keyword("False")),
        value(Expr::Literal(Value::None), keyword("None")),
    ))(input)
}

fn arguments(input: &str) -> ParseResult<Vec<Expr>> {
    terminated(separated_list0(symbol(","), expression), opt(symbol(",")))(input)
}

fn list(input: &str) -> ParseResult<Expr> {
    context(
        "list literal",
        map(delimited(symbol("["), nested(arguments), symbol("]")), Expr::List),
    )(input)
}

fn dict(input: &str) -> ParseResult<Expr> {
    context(
        "dict literal",
        map(
            delimited(
                symbol("{"),
                nested(terminated(
                    separated_list0(
                        symbol(","),
                        separated_pair(expression, symbol(":"), expression),
                    ),
                    opt(symbol(",")),
                )),
                symbol("}"),
            ),
            Expr::Dict,
        ),
    )(input)
}

fn parenthesized(input: &str) -> ParseResult<Expr> {
    delimited(symbol("("), nested(expression), symbol(")"))(input)
}

fn atom(input: &str) -> ParseResult<Expr> {
    alt((
        number,
        string,
        list,
        dict,
        parenthesized,
        constant,
        map(identifier, Expr::name),
    ))(input)
}

enum Suffix {
    Call(Vec<Expr>),
    Attribute(String),
    Index(Expr),
}

fn suffix(input: &str) -> ParseResult<Suffix> {
    alt((
        map(delimited(symbol("("), nested(arguments), symbol(")")), Suffix::Call),
        map(preceded(symbol("."), identifier), |name| {
            Suffix::Attribute(name.to_string())
        }),
        map(delimited(symbol("["), nested(expression), symbol("]")), Suffix::Index),
    ))(input)
}

fn postfix(input: &str) -> ParseResult<Expr> {
    let (input, base) = atom(input)?;
    let (input, suffixes) = many0(suffix)(input)?;

    let expr = suffixes.into_iter().fold(base, |object, suffix| match suffix {
        Suffix::Call(args) => Expr::Call {
            function: Box::new(object),
            args,
        },
        Suffix::Attribute(name) => Expr::Attribute {
            object: Box::new(object),
            name,
        },
        Suffix::Index(index) => Expr::Index {
            object: Box::new(object),
            index: Box::new(index),
        },
    });

    Ok((input, expr))
}

/// `**` is right associative and binds tighter than a unary minus on its left
fn power(input: &str) -> ParseResult<Expr> {
    let (input, base) = postfix(input)?;
    let (input, exponent) = opt(preceded(symbol("**"), nested(unary)))(input)?;

    Ok(match exponent {
        Some(exponent) => (input, Expr::binary(BinaryOp::Pow, base, exponent)),
        None => (input, base),
    })
}

fn unary(input: &str) -> ParseResult<Expr> {
    alt((
        map(preceded(symbol("-"), nested(unary)), |operand| Expr::Unary {
            op: UnaryOp::Neg,
            operand: Box::new(operand),
        }),
        map(preceded(symbol("+"), nested(unary)), |operand| Expr::Unary {
            op: UnaryOp::Pos,
            operand: Box::new(operand),
        }),
        power,
    ))(input)
}

fn fold_binary(first: Expr, rest: Vec<(BinaryOp, Expr)>) -> Expr {
    rest.into_iter()
        .fold(first, |left, (op, right)| Expr::binary(op, left, right))
}

fn term_op(input: &str) -> ParseResult<BinaryOp> {
    preceded(
        multispace0,
        alt((
            value(BinaryOp::FloorDiv, tag("//")),
            value(BinaryOp::Div, tag("/")),
            value(BinaryOp::Mod, tag("%")),
            value(BinaryOp::Mul, terminated(tag("*"), not(char('*')))),
        )),
    )(input)
}

fn term(input: &str) -> ParseResult<Expr> {
    let (input, first) = unary(input)?;
    let (input, rest) = many0(pair(term_op, unary))(input)?;
    Ok((input, fold_binary(first, rest)))
}

fn sum_op(input: &str) -> ParseResult<BinaryOp> {
    alt((
        value(BinaryOp::Add, symbol("+")),
        value(BinaryOp::Sub, symbol("-")),
    ))(input)
}

fn sum(input: &str) -> ParseResult<Expr> {
    let (input, first) = term(input)?;
    let (input, rest) = many0(pair(sum_op, term))(input)?;
    Ok((input, fold_binary(first, rest)))
}

fn compare_op(input: &str) -> ParseResult<CompareOp> {
    alt((
        value(CompareOp::Eq, symbol("==")),
        value(CompareOp::Ne, symbol("!=")),
        value(CompareOp::Le, symbol("<=")),
        value(CompareOp::Ge, symbol(">=")),
        value(CompareOp::Lt, symbol("<")),
        value(CompareOp::Gt, symbol(">")),
        value(CompareOp::NotIn, pair(keyword("not"), keyword("in"))),
        value(CompareOp::In, keyword("in")),
    ))(input)
}

fn comparison(input: &str) -> ParseResult<Expr> {
    let (input, left) = sum(input)?;
    let (input, tail) = opt(pair(compare_op, sum))(input)?;

    Ok(match tail {
        Some((op, right)) => (
            input,
            Expr::Compare {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        ),
        None => (input, left),
    })
}

fn not_expr(input: &str) -> ParseResult<Expr> {
    alt((
        map(preceded(keyword("not"), nested(not_expr)), |e| Expr::Not(Box::new(e))),
        comparison,
    ))(input)
}

fn fold_logical(op: LogicalOp, first: Expr, rest: Vec<Expr>) -> Expr {
    rest.into_iter().fold(first, |left, right| Expr::Logical {
        op,
        left: Box::new(left),
        right: Box::new(right),
    })
}

fn and_expr(input: &str) -> ParseResult<Expr> {
    let (input, first) = not_expr(input)?;
    let (input, rest) = many0(preceded(keyword("and"), not_expr))(input)?;
    Ok((input, fold_logical(LogicalOp::And, first, rest)))
}

fn or_expr(input: &str) -> ParseResult<Expr> {
    let (input, first) = and_expr(input)?;
    let (input, rest) = many0(preceded(keyword("or"), and_expr))(input)?;
    Ok((input, fold_logical(LogicalOp::Or, first, rest)))
}

/// Full expression: `body if condition else otherwise` or a plain `or` chain
fn expression(input: &str) -> ParseResult<Expr> {
    let (input, body) = or_expr(input)?;
    let (input, branch) = opt(pair(
        preceded(keyword("if"), or_expr),
        preceded(keyword("else"), nested(expression)),
    ))(input)?;

    Ok(match branch {
        Some((condition, otherwise)) => (
            input,
            Expr::Conditional {
                condition: Box::new(condition),
                then: Box::new(body),
                otherwise: Box::new(otherwise),
            },
        ),
        None => (input, body),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(i: i64) -> Expr {
        Expr::Literal(Value::Int(i))
    }

    #[test]
    fn test_precedence_mul_over_add() {
        let expr = parse_expression("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            Expr::binary(
                BinaryOp::Add,
                int(1),
                Expr::binary(BinaryOp::Mul, int(2), int(3))
            )
        );
    }

    #[test]
    fn test_subtraction_is_left_associative() {
        let expr = parse_expression("8 - 4 - 2").unwrap();
        assert_eq!(
            expr,
            Expr::binary(
                BinaryOp::Sub,
                Expr::binary(BinaryOp::Sub, int(8), int(4)),
                int(2)
            )
        );
    }

    #[test]
    fn test_power_is_right_associative_and_binds_over_negation() {
        let expr = parse_expression("-2 ** 3 ** 2").unwrap();
        assert_eq!(
            expr,
            Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(Expr::binary(
                    BinaryOp::Pow,
                    int(2),
                    Expr::binary(BinaryOp::Pow, int(3), int(2))
                )),
            }
        );
    }

    #[test]
    fn test_floor_div_and_pow_tokens() {
        assert_eq!(
            parse_expression("7//2").unwrap(),
            Expr::binary(BinaryOp::FloorDiv, int(7), int(2))
        );
        assert_eq!(
            parse_expression("2**-1").unwrap(),
            Expr::binary(
                BinaryOp::Pow,
                int(2),
                Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(int(1)),
                }
            )
        );
    }

    #[test]
    fn test_module_call_with_index() {
        let expr = parse_expression("json.loads(s)['outer'][0]").unwrap();
        let loads = Expr::Call {
            function: Box::new(Expr::Attribute {
                object: Box::new(Expr::name("json")),
                name: "loads".to_string(),
            }),
            args: vec![Expr::name("s")],
        };
        let outer = Expr::Index {
            object: Box::new(loads),
            index: Box::new(Expr::Literal(Value::from("outer"))),
        };
        assert_eq!(
            expr,
            Expr::Index {
                object: Box::new(outer),
                index: Box::new(int(0)),
            }
        );
    }

    #[test]
    fn test_number_forms() {
        assert_eq!(parse_expression("1.5").unwrap(), Expr::Literal(Value::Float(1.5)));
        assert_eq!(parse_expression(".5").unwrap(), Expr::Literal(Value::Float(0.5)));
        assert_eq!(parse_expression("1e3").unwrap(), Expr::Literal(Value::Float(1000.0)));
        assert_eq!(parse_expression("42").unwrap(), int(42));
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            parse_expression(r#""a\"b\n""#).unwrap(),
            Expr::Literal(Value::from("a\"b\n"))
        );
        assert_eq!(parse_expression("''").unwrap(), Expr::Literal(Value::from("")));
    }

    #[test]
    fn test_keywords_are_not_identifiers() {
        let expr = parse_expression("a if b else c").unwrap();
        assert_eq!(
            expr,
            Expr::Conditional {
                condition: Box::new(Expr::name("b")),
                then: Box::new(Expr::name("a")),
                otherwise: Box::new(Expr::name("c")),
            }
        );
        // `android` starts with `and` but is a plain name
        assert_eq!(parse_expression("android").unwrap(), Expr::name("android"));
    }

    #[test]
    fn test_not_in() {
        let expr = parse_expression("x not in [1, 2,]").unwrap();
        assert_eq!(
            expr,
            Expr::Compare {
                op: CompareOp::NotIn,
                left: Box::new(Expr::name("x")),
                right: Box::new(Expr::List(vec![int(1), int(2)])),
            }
        );
    }

    #[test]
    fn test_trailing_input_is_syntax_error() {
        let err = parse_expression("1 +").unwrap_err();
        assert!(matches!(err, EvalError::Syntax { offset: 2, .. }), "{:?}", err);
    }

    #[test]
    fn test_empty_is_syntax_error() {
        assert!(matches!(
            parse_expression("   ").unwrap_err(),
            EvalError::Syntax { .. }
        ));
    }

    fn too_deep(source: &str) -> bool {
        matches!(
            parse_expression(source),
            Err(EvalError::Syntax { ref message, .. }) if message == TOO_DEEP
        )
    }

    #[test]
    fn test_nesting_limit() {
        let parens = |depth: usize| format!("{}x{}", "(".repeat(depth), ")".repeat(depth));
        assert!(parse_expression(&parens(50)).is_ok());
        assert!(too_deep(&parens(200)));
        assert!(too_deep(&parens(3000)));

        let lists = |depth: usize| format!("{}1{}", "[".repeat(depth), "]".repeat(depth));
        assert!(parse_expression(&lists(50)).is_ok());
        assert!(too_deep(&lists(500)));

        assert!(parse_expression(&format!("{}1", "-".repeat(50))).is_ok());
        assert!(too_deep(&format!("{}1", "-".repeat(1000))));
        assert!(too_deep(&format!("{}True", "not ".repeat(1000))));
        assert!(too_deep(&format!("{}1", "2 ** ".repeat(1000))));
    }

    #[test]
    fn test_nesting_resets_between_parses() {
        let parens = format!("{}x{}", "(".repeat(60), ")".repeat(60));
        for _ in 0..3 {
            assert!(parse_expression(&parens).is_ok());
        }
        assert!(too_deep(&format!("{}x", "(".repeat(500))));
        assert!(parse_expression(&parens).is_ok());
    }

    #[test]
    fn test_integer_overflow_literal() {
        assert!(matches!(
            parse_expression("99999999999999999999").unwrap_err(),
            EvalError::Syntax { .. }
        ));
    }
}
