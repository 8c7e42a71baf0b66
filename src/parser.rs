use std::rc::Rc;

use tracing::debug;

use crate::{
    ast::{Expression, Program, Reference, Statement, MAIN},
    config::Config,
    error::{ParseError, QuillError},
    lexer::{lex, Token},
    operator::{BinaryOperator, UnaryOperator},
};


type ParseResult<'t, 'a, O> = Result<(&'t [Token<'a>], O), QuillError>;

struct ParseState {
    program: Program,
    depth: usize,
    max_depth: usize,
}

fn unexpected(tokens: &[Token<'_>], expected: &'static str) -> QuillError {
    match tokens.first() {
        Some(token) => ParseError::UnexpectedToken { expected, found: token.to_string() }.into(),
        None => ParseError::UnexpectedEnd { expected }.into(),
    }
}

fn parse_token<'t, 'a>(
    tokens: &'t [Token<'a>],
    token_recognizer: impl Fn(&Token<'a>) -> bool,
    expected: &'static str,
) -> ParseResult<'t, 'a, Token<'a>> {
    match tokens.split_first() {
        Some((token, rest)) if token_recognizer(token) => Ok((rest, *token)),
        _ => Err(unexpected(tokens, expected)),
    }
}

fn descend(state: &mut ParseState) -> Result<(), QuillError> {
    if state.depth >= state.max_depth {
        return Err(ParseError::NestingTooDeep(state.max_depth).into());
    }

    state.depth += 1;
    Ok(())
}

fn parse_nested<'t, 'a, O>(
    state: &mut ParseState,
    parser: impl FnOnce(&mut ParseState) -> ParseResult<'t, 'a, O>,
) -> ParseResult<'t, 'a, O> {
    descend(state)?;
    let result = parser(state);
    state.depth -= 1;
    result
}

fn parse_block<'t, 'a>(mut tokens: &'t [Token<'a>], state: &mut ParseState) -> ParseResult<'t, 'a, Statement> {
    // The opening brace, if any, belongs to the caller. A block also ends
    // quietly at the end of input.
    let mut children = vec![];

    loop {
        match tokens {
            [] => break,
            [Token::RightBrace, rest @ ..] => {
                tokens = rest;
                break;
            }
            _ => {
                let (rest, child) = parse_statement(tokens, state)?;
                children.push(child);
                tokens = rest;
            }
        }
    }

    Ok((tokens, Statement::Block(children)))
}

fn parse_statement<'t, 'a>(tokens: &'t [Token<'a>], state: &mut ParseState) -> ParseResult<'t, 'a, Rc<Statement>> {
    parse_nested(state, |state| match tokens {
        [Token::Procedure(name), rest @ ..] => {
            let (rest, _) = parse_token(rest, |token| matches!(token, Token::Semicolon), "`;` after a procedure call")?;
            let body = state.program.procedure(name)
                .cloned()
                .ok_or_else(|| ParseError::UndefinedProcedure(name.to_string()))?;
            Ok((rest, body))
        }
        [Token::LeftBrace, rest @ ..] => {
            let (rest, block) = parse_block(rest, state)?;
            Ok((rest, Rc::new(block)))
        }
        [Token::Identifier("if"), rest @ ..] => parse_if(rest, state),
        [Token::Identifier("while"), rest @ ..] => parse_while(rest, state),
        [Token::Identifier(_), ..] => parse_assignment(tokens, state),
        _ => Err(unexpected(tokens, "a statement")),
    })
}

fn parse_condition<'t, 'a>(tokens: &'t [Token<'a>], state: &mut ParseState) -> ParseResult<'t, 'a, Expression> {
    let (tokens, _) = parse_token(tokens, |token| matches!(token, Token::LeftParen), "`(`")?;
    let (tokens, condition) = parse_expression(tokens, state)?;
    let (tokens, _) = parse_token(tokens, |token| matches!(token, Token::RightParen), "`)`")?;
    Ok((tokens, condition))
}

fn parse_if<'t, 'a>(tokens: &'t [Token<'a>], state: &mut ParseState) -> ParseResult<'t, 'a, Rc<Statement>> {
    let (tokens, condition) = parse_condition(tokens, state)?;
    let (tokens, then) = parse_statement(tokens, state)?;

    let (tokens, otherwise) = match tokens {
        [Token::Identifier("else"), rest @ ..] => parse_statement(rest, state)?,
        _ => (tokens, Rc::new(Statement::empty())),
    };

    Ok((tokens, Rc::new(Statement::If { condition, then, otherwise })))
}

fn parse_while<'t, 'a>(tokens: &'t [Token<'a>], state: &mut ParseState) -> ParseResult<'t, 'a, Rc<Statement>> {
    let (tokens, condition) = parse_condition(tokens, state)?;
    let (tokens, body) = parse_statement(tokens, state)?;
    Ok((tokens, Rc::new(Statement::While { condition, body })))
}

fn compound_operator(token: &Token<'_>) -> Option<BinaryOperator> {
    match token {
        Token::PlusAssign => Some(BinaryOperator::Add),
        Token::MinusAssign => Some(BinaryOperator::Subtract),
        Token::StarAssign => Some(BinaryOperator::Multiply),
        Token::SlashAssign => Some(BinaryOperator::Divide),
        Token::PercentAssign => Some(BinaryOperator::Modulo),
        _ => None,
    }
}

fn parse_assignment<'t, 'a>(tokens: &'t [Token<'a>], state: &mut ParseState) -> ParseResult<'t, 'a, Rc<Statement>> {
    // `x OP= e` and `x++` become plain assignments reading the target again,
    // so an indexed target evaluates its index twice.
    let (tokens, target) = parse_reference(tokens, state)?;
    let current = || Expression::Reference(target.clone());

    let (tokens, value) = match tokens {
        [Token::Assign, rest @ ..] => parse_expression(rest, state)?,
        [Token::Increment, rest @ ..] => (rest, Expression::binary(BinaryOperator::Add, current(), Expression::Literal(1))),
        [Token::Decrement, rest @ ..] => (rest, Expression::binary(BinaryOperator::Subtract, current(), Expression::Literal(1))),
        [token, rest @ ..] => match compound_operator(token) {
            Some(operator) => {
                let (rest, operand) = parse_expression(rest, state)?;
                (rest, Expression::binary(operator, current(), operand))
            }
            None => return Err(ParseError::InvalidStatement(token.to_string()).into()),
        },
        [] => return Err(unexpected(tokens, "an assignment operator")),
    };

    let (tokens, _) = parse_token(tokens, |token| matches!(token, Token::Semicolon), "`;`")?;
    Ok((tokens, Rc::new(Statement::Assignment { target, value })))
}

fn parse_expression<'t, 'a>(tokens: &'t [Token<'a>], state: &mut ParseState) -> ParseResult<'t, 'a, Expression> {
    parse_nested(state, |state| parse_select(tokens, state))
}

fn parse_select<'t, 'a>(tokens: &'t [Token<'a>], state: &mut ParseState) -> ParseResult<'t, 'a, Expression> {
    let (tokens, condition) = parse_or(tokens, state)?;

    match tokens {
        [Token::Question, rest @ ..] => {
            let (rest, then) = parse_expression(rest, state)?;
            let (rest, _) = parse_token(rest, |token| matches!(token, Token::Colon), "`:`")?;
            let (rest, otherwise) = parse_expression(rest, state)?;
            Ok((rest, Expression::select(condition, then, otherwise)))
        }
        _ => Ok((tokens, condition)),
    }
}

fn parse_or<'t, 'a>(tokens: &'t [Token<'a>], state: &mut ParseState) -> ParseResult<'t, 'a, Expression> {
    let (tokens, left) = parse_and(tokens, state)?;

    match tokens {
        [Token::Or, rest @ ..] => {
            let (rest, right) = parse_nested(state, |state| parse_or(rest, state))?;
            Ok((rest, Expression::binary(BinaryOperator::Or, left, right)))
        }
        _ => Ok((tokens, left)),
    }
}

fn parse_and<'t, 'a>(tokens: &'t [Token<'a>], state: &mut ParseState) -> ParseResult<'t, 'a, Expression> {
    let (tokens, left) = parse_not(tokens, state)?;

    match tokens {
        [Token::And, rest @ ..] => {
            let (rest, right) = parse_nested(state, |state| parse_and(rest, state))?;
            Ok((rest, Expression::binary(BinaryOperator::And, left, right)))
        }
        _ => Ok((tokens, left)),
    }
}

fn parse_not<'t, 'a>(tokens: &'t [Token<'a>], state: &mut ParseState) -> ParseResult<'t, 'a, Expression> {
    match tokens {
        [Token::Bang, rest @ ..] => {
            let (rest, operand) = parse_nested(state, |state| parse_not(rest, state))?;
            Ok((rest, Expression::unary(UnaryOperator::Not, operand)))
        }
        _ => parse_comparison(tokens, state),
    }
}

fn comparison_operator(token: &Token<'_>) -> Option<BinaryOperator> {
    match token {
        Token::Less => Some(BinaryOperator::Less),
        Token::Greater => Some(BinaryOperator::Greater),
        Token::LessEqual => Some(BinaryOperator::LessEqual),
        Token::GreaterEqual => Some(BinaryOperator::GreaterEqual),
        Token::Equal => Some(BinaryOperator::Equal),
        Token::NotEqual => Some(BinaryOperator::NotEqual),
        _ => None,
    }
}

fn parse_comparison<'t, 'a>(tokens: &'t [Token<'a>], state: &mut ParseState) -> ParseResult<'t, 'a, Expression> {
    // At most one comparison; `a < b < c` leaves the second `<` for the
    // caller to reject.
    let (tokens, left) = parse_additive(tokens, state)?;

    match tokens.split_first() {
        Some((token, rest)) => match comparison_operator(token) {
            Some(operator) => {
                let (rest, right) = parse_additive(rest, state)?;
                Ok((rest, Expression::binary(operator, left, right)))
            }
            None => Ok((tokens, left)),
        },
        None => Ok((tokens, left)),
    }
}

fn parse_left_associative<'t, 'a>(
    tokens: &'t [Token<'a>],
    state: &mut ParseState,
    operator_recognizer: impl Fn(&Token<'a>) -> Option<BinaryOperator>,
    operand_parser: impl Fn(&'t [Token<'a>], &mut ParseState) -> ParseResult<'t, 'a, Expression>,
) -> ParseResult<'t, 'a, Expression> {
    // Each link deepens the tree by one level.
    let (mut tokens, mut result) = operand_parser(tokens, state)?;
    let mut links = 0;

    while let Some((operator, rest)) = tokens.split_first()
        .and_then(|(token, rest)| operator_recognizer(token).map(|operator| (operator, rest)))
    {
        descend(state)?;
        links += 1;

        let (rest, right) = operand_parser(rest, state)?;
        result = Expression::binary(operator, result, right);
        tokens = rest;
    }

    state.depth -= links;
    Ok((tokens, result))
}

fn parse_additive<'t, 'a>(tokens: &'t [Token<'a>], state: &mut ParseState) -> ParseResult<'t, 'a, Expression> {
    parse_left_associative(tokens, state, |token| match token {
        Token::Plus => Some(BinaryOperator::Add),
        Token::Minus => Some(BinaryOperator::Subtract),
        _ => None,
    }, parse_multiplicative)
}

fn parse_multiplicative<'t, 'a>(tokens: &'t [Token<'a>], state: &mut ParseState) -> ParseResult<'t, 'a, Expression> {
    parse_left_associative(tokens, state, |token| match token {
        Token::Star => Some(BinaryOperator::Multiply),
        Token::Slash => Some(BinaryOperator::Divide),
        Token::Percent => Some(BinaryOperator::Modulo),
        _ => None,
    }, parse_primary)
}

fn parse_parenthesized<'t, 'a>(tokens: &'t [Token<'a>], state: &mut ParseState) -> ParseResult<'t, 'a, Expression> {
    let (tokens, expression) = parse_expression(tokens, state)?;
    let (tokens, _) = parse_token(tokens, |token| matches!(token, Token::RightParen), "`)`")?;
    Ok((tokens, expression))
}

fn parse_primary<'t, 'a>(tokens: &'t [Token<'a>], state: &mut ParseState) -> ParseResult<'t, 'a, Expression> {
    match tokens {
        [Token::Number(value), rest @ ..] => Ok((rest, Expression::Literal(*value))),
        [Token::LeftParen, rest @ ..] => parse_parenthesized(rest, state),
        _ => {
            let (tokens, reference) = parse_reference(tokens, state)?;
            Ok((tokens, Expression::Reference(reference)))
        }
    }
}

fn parse_index<'t, 'a>(tokens: &'t [Token<'a>], state: &mut ParseState) -> ParseResult<'t, 'a, Expression> {
    // An index is a single atom; `a@b@c` chains on `a@b` rather than
    // indexing `b`.
    match tokens {
        [Token::Number(value), rest @ ..] => Ok((rest, Expression::Literal(*value))),
        [Token::LeftParen, rest @ ..] => parse_parenthesized(rest, state),
        _ => {
            let (tokens, variable) = parse_variable(tokens)?;
            Ok((tokens, Expression::Reference(variable)))
        }
    }
}

fn parse_variable<'t, 'a>(tokens: &'t [Token<'a>]) -> ParseResult<'t, 'a, Reference> {
    match tokens {
        [Token::Identifier(name), rest @ ..] => Ok((rest, Reference::variable(*name))),
        _ => Err(unexpected(tokens, "a variable name")),
    }
}

fn parse_reference<'t, 'a>(tokens: &'t [Token<'a>], state: &mut ParseState) -> ParseResult<'t, 'a, Reference> {
    let (mut tokens, mut reference) = parse_variable(tokens)?;
    let mut links = 0;

    while let [Token::At, rest @ ..] = tokens {
        descend(state)?;
        links += 1;

        let (rest, index) = parse_index(rest, state)?;
        reference = Reference::index(reference, index);
        tokens = rest;
    }

    state.depth -= links;
    Ok((tokens, reference))
}

/// Builds the procedure table from a token stream.
///
/// `NAME :` introduces a procedure whose body is the following statement.
/// Anything else starts the top-level program, which runs to the end of input
/// or to an unmatched `}`; parsing then resumes with the remaining tokens, so
/// a later top-level block replaces an earlier one.
pub fn parse_tokens(tokens: &[Token<'_>], config: &Config) -> Result<Program, QuillError> {
    let mut state = ParseState {
        program: Program::default(),
        depth: 0,
        max_depth: config.max_depth,
    };
    let mut tokens = tokens;

    while !tokens.is_empty() {
        tokens = match tokens {
            [Token::Procedure(name), Token::Colon, rest @ ..] => {
                let (rest, body) = parse_statement(rest, &mut state)?;
                debug!(procedure = name, "defined procedure");
                state.program.define(name, body);
                rest
            }
            _ => {
                let (rest, main) = parse_block(tokens, &mut state)?;
                state.program.define(MAIN, Rc::new(main));
                rest
            }
        };
    }

    Ok(state.program)
}

pub fn parse_with(source: &str, config: &Config) -> Result<Program, QuillError> {
    let tokens = lex(source)?;
    parse_tokens(&tokens, config)
}

pub fn parse(source: &str) -> Result<Program, QuillError> {
    parse_with(source, &Config::default())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn var(name: &str) -> Expression {
        Expression::Reference(Reference::variable(name))
    }

    fn main_of(source: &str) -> Rc<Statement> {
        let program = match parse(source) {
            Ok(program) => program,
            Err(error) => panic!("failed to parse {:?}: {}", source, error),
        };
        match program.main() {
            Some(main) => main.clone(),
            None => panic!("{:?} has no top-level program", source),
        }
    }

    fn only_assignment(source: &str) -> (Reference, Expression) {
        match &*main_of(source) {
            Statement::Block(children) if children.len() == 1 => match &*children[0] {
                Statement::Assignment { target, value } => (target.clone(), value.clone()),
                other => panic!("expected an assignment, got {:?}", other),
            },
            other => panic!("expected a single statement, got {:?}", other),
        }
    }

    fn parse_error(source: &str) -> ParseError {
        match parse(source) {
            Err(QuillError::Parse(error)) => error,
            other => panic!("expected a parse failure for {:?}, got {:?}", source, other),
        }
    }

    #[test]
    fn precedence_from_loosest_to_tightest() {
        let (_, value) = only_assignment("x = a || b && !c < d + e * f ? 1 : 2;");

        let expected = Expression::select(
            Expression::binary(
                BinaryOperator::Or,
                var("a"),
                Expression::binary(
                    BinaryOperator::And,
                    var("b"),
                    Expression::unary(
                        UnaryOperator::Not,
                        Expression::binary(
                            BinaryOperator::Less,
                            var("c"),
                            Expression::binary(
                                BinaryOperator::Add,
                                var("d"),
                                Expression::binary(BinaryOperator::Multiply, var("e"), var("f")),
                            ),
                        ),
                    ),
                ),
            ),
            Expression::Literal(1),
            Expression::Literal(2),
        );
        assert_eq!(value, expected);
    }

    #[test]
    fn arithmetic_is_left_associative_and_logic_right_associative() {
        let (_, value) = only_assignment("x = 8 - 4 - 2;");
        assert_eq!(value, Expression::binary(
            BinaryOperator::Subtract,
            Expression::binary(BinaryOperator::Subtract, Expression::Literal(8), Expression::Literal(4)),
            Expression::Literal(2),
        ));

        let (_, value) = only_assignment("x = a || b || c;");
        assert_eq!(value, Expression::binary(
            BinaryOperator::Or,
            var("a"),
            Expression::binary(BinaryOperator::Or, var("b"), var("c")),
        ));

        let (_, value) = only_assignment("x = a ? b : c ? d : e;");
        assert_eq!(value, Expression::select(var("a"), var("b"), Expression::select(var("c"), var("d"), var("e"))));
    }

    #[test]
    fn indexing_chains_on_the_left() {
        let (target, value) = only_assignment("a@1@(i + 1) = b@c;");
        assert_eq!(target, Reference::index(
            Reference::index(Reference::variable("a"), Expression::Literal(1)),
            Expression::binary(BinaryOperator::Add, var("i"), Expression::Literal(1)),
        ));
        assert_eq!(value, Expression::Reference(Reference::index(Reference::variable("b"), var("c"))));
    }

    #[test]
    fn compound_assignments_desugar_to_reads_of_the_target() {
        let (target, value) = only_assignment("a@i += 2 * 3;");
        assert_eq!(value, Expression::binary(
            BinaryOperator::Add,
            Expression::Reference(target.clone()),
            Expression::binary(BinaryOperator::Multiply, Expression::Literal(2), Expression::Literal(3)),
        ));

        let (_, value) = only_assignment("n--;");
        assert_eq!(value, Expression::binary(BinaryOperator::Subtract, var("n"), Expression::Literal(1)));
    }

    #[test]
    fn missing_else_is_an_empty_block() {
        match &*main_of("if (x) y = 1;") {
            Statement::Block(children) => match &*children[0] {
                Statement::If { otherwise, .. } => assert_eq!(**otherwise, Statement::empty()),
                other => panic!("expected an if, got {:?}", other),
            },
            other => panic!("expected a block, got {:?}", other),
        }
    }

    #[test]
    fn calls_reuse_the_procedure_root() {
        let program = parse("PROC: { write = 9; } PROC; PROC;").unwrap();
        let body = program.procedure("PROC").unwrap();

        match &**program.main().unwrap() {
            Statement::Block(children) => {
                assert_eq!(children.len(), 2);
                assert!(children.iter().all(|child| Rc::ptr_eq(child, body)));
            }
            other => panic!("expected a block, got {:?}", other),
        }
    }

    #[test]
    fn procedures_resolve_at_parse_time() {
        assert_eq!(parse_error("PROC: { PROC; }"), ParseError::UndefinedProcedure("PROC".into()));
        assert_eq!(parse_error("A: { B; } B: x = 1;"), ParseError::UndefinedProcedure("B".into()));

        // A redefinition binds calls parsed after it only.
        let program = parse("A: x = 1; B: A; A: x = 2; A;").unwrap();
        let first = program.procedure("B").unwrap();
        assert_eq!(**first, Statement::Assignment { target: Reference::variable("x"), value: Expression::Literal(1) });
    }

    #[test]
    fn unmatched_brace_restarts_the_top_level_program() {
        let program = parse("write = 1; } write = 2;").unwrap();
        let main = program.main().unwrap();
        assert_eq!(**main, Statement::Block(vec![Rc::new(Statement::Assignment {
            target: Reference::variable("write"),
            value: Expression::Literal(2),
        })]));
    }

    #[test]
    fn procedure_only_source_has_no_main() {
        let program = parse("A: x = 1;").unwrap();
        assert!(program.main().is_none());
        assert!(parse("").unwrap().main().is_none());
    }

    #[test]
    fn malformed_statements_fail() {
        assert!(matches!(parse_error("x = 1"), ParseError::UnexpectedEnd { .. }));
        assert!(matches!(parse_error("x = 1 < 2 < 3;"), ParseError::UnexpectedToken { .. }));
        assert!(matches!(parse_error("x <= 3;"), ParseError::InvalidStatement(_)));
        assert!(matches!(parse_error("x ;"), ParseError::InvalidStatement(_)));
        assert!(matches!(parse_error("5 = x;"), ParseError::UnexpectedToken { .. }));
        assert!(matches!(parse_error("x = -1;"), ParseError::UnexpectedToken { .. }));
        assert!(matches!(parse_error("if x) y = 1;"), ParseError::UnexpectedToken { .. }));
        assert!(matches!(parse_error("PROC: { x = 1; } PROC"), ParseError::UnexpectedEnd { .. }));
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let source = format!("x = {}1{};", "(".repeat(40), ")".repeat(40));
        let config = Config::default().with_max_depth(16);

        assert_eq!(
            parse_with(&source, &config).unwrap_err(),
            QuillError::Parse(ParseError::NestingTooDeep(16))
        );
        assert!(parse(&source).is_ok());
    }

    #[test]
    fn long_chains_count_towards_nesting() {
        let limit = Config::DEFAULT_MAX_DEPTH;

        let sum = format!("x = 0{};", " + 1".repeat(200_000));
        assert_eq!(parse(&sum).unwrap_err(), QuillError::Parse(ParseError::NestingTooDeep(limit)));

        let product = format!("x = 1{};", " * 2 / 1".repeat(100_000));
        assert_eq!(parse(&product).unwrap_err(), QuillError::Parse(ParseError::NestingTooDeep(limit)));

        let index = format!("a{} = 1;", "@1".repeat(200_000));
        assert_eq!(parse(&index).unwrap_err(), QuillError::Parse(ParseError::NestingTooDeep(limit)));

        // A few hundred terms stay within the default budget.
        assert!(parse(&format!("x = 0{};", " + 1".repeat(300))).is_ok());
        assert!(parse(&format!("write = a{};", "@1".repeat(300))).is_ok());
    }

    #[test]
    fn chain_links_and_parentheses_share_one_budget() {
        let config = Config::default().with_max_depth(8);

        // statement + expression + 5 links fits, a parenthesised chain on top does not
        assert!(parse_with("x = 1 + 1 + 1 + 1 + 1 + 1;", &config).is_ok());
        assert_eq!(
            parse_with("x = 1 + 1 + 1 + 1 + 1 + (1 + 1 + 1);", &config).unwrap_err(),
            QuillError::Parse(ParseError::NestingTooDeep(8))
        );
        assert!(parse_with("a@1@1@1@1@1@1@1 = 1;", &config).is_ok());
        assert_eq!(
            parse_with("a@1@1@1@1@1@1@1@1 = 1;", &config).unwrap_err(),
            QuillError::Parse(ParseError::NestingTooDeep(8))
        );
    }
}
