/// Recursive descent SIEVE parser.
///
/// Builds the generic command tree from tokens. Blocks nest to any depth
/// since every `{` is matched by the grammar rather than by scanning.
use crate::sieve::ast::*;
use crate::sieve::error::ParseError;
use crate::sieve::lexer::{tokenize, Span, Token};

/// Deepest nesting of blocks and tests accepted.
pub const MAX_DEPTH: usize = 64;

pub fn parse(input: &str) -> Result<Script, ParseError> {
    let spans = tokenize(input)?;
    let tokens: Vec<&Span> = spans
        .iter()
        .filter(|s| !matches!(s.token, Token::Comment | Token::BlockComment))
        .collect();
    let mut pos = 0;
    let commands = parse_commands(&tokens, &mut pos, 0)?;
    Ok(Script { commands })
}

fn expected(tokens: &[&Span], pos: usize, what: &'static str) -> ParseError {
    match tokens.get(pos) {
        Some(span) => ParseError::Expected {
            expected: what,
            found: span.token.to_string(),
            offset: span.offset,
        },
        None => ParseError::UnexpectedEnd(what),
    }
}

fn peek<'a>(tokens: &[&'a Span], pos: usize) -> Option<&'a Token> {
    tokens.get(pos).copied().map(|s| &s.token)
}

fn check_depth(tokens: &[&Span], pos: usize, depth: usize) -> Result<(), ParseError> {
    if depth > MAX_DEPTH {
        let offset = tokens.get(pos).map_or(0, |s| s.offset);
        return Err(ParseError::TooDeep { limit: MAX_DEPTH, offset });
    }
    Ok(())
}

/// Commands up to end of input, or up to the closing `}` inside a block
/// (`depth > 0`).
fn parse_commands(
    tokens: &[&Span],
    pos: &mut usize,
    depth: usize,
) -> Result<Vec<Command>, ParseError> {
    check_depth(tokens, *pos, depth)?;
    let nested = depth > 0;
    let mut commands = Vec::new();
    loop {
        match peek(tokens, *pos) {
            None if nested => return Err(ParseError::UnexpectedEnd("'}'")),
            None => break,
            Some(Token::RBrace) if nested => {
                *pos += 1;
                break;
            }
            Some(Token::Identifier(_)) => commands.push(parse_command(tokens, pos, depth)?),
            Some(_) => return Err(expected(tokens, *pos, "command")),
        }
    }
    Ok(commands)
}

fn parse_command(tokens: &[&Span], pos: &mut usize, depth: usize) -> Result<Command, ParseError> {
    let name = match peek(tokens, *pos) {
        Some(Token::Identifier(s)) => s.to_lowercase(),
        _ => return Err(expected(tokens, *pos, "command")),
    };
    *pos += 1;

    let arguments = parse_arguments(tokens, pos)?;
    let tests = parse_trailing_tests(tokens, pos, depth + 1)?;

    let block = match peek(tokens, *pos) {
        Some(Token::Semicolon) => {
            *pos += 1;
            None
        }
        Some(Token::LBrace) => {
            *pos += 1;
            Some(parse_commands(tokens, pos, depth + 1)?)
        }
        _ => return Err(expected(tokens, *pos, "';' or '{'")),
    };

    Ok(Command {
        name,
        arguments,
        tests,
        block,
    })
}

fn parse_arguments(tokens: &[&Span], pos: &mut usize) -> Result<Vec<Argument>, ParseError> {
    let mut arguments = Vec::new();
    loop {
        let argument = match peek(tokens, *pos) {
            Some(Token::QuotedString(s)) | Some(Token::MultiLineString(s)) => {
                Argument::String(s.clone())
            }
            Some(Token::Number(n)) => Argument::Number(n.clone()),
            Some(Token::Tag(t)) => Argument::Tag(t.clone()),
            Some(Token::LBracket) => {
                arguments.push(Argument::StringList(parse_string_list(tokens, pos)?));
                continue;
            }
            _ => break,
        };
        arguments.push(argument);
        *pos += 1;
    }
    Ok(arguments)
}

/// `[ "a", "b" ]`. An empty list is tolerated.
fn parse_string_list(tokens: &[&Span], pos: &mut usize) -> Result<Vec<String>, ParseError> {
    if !matches!(peek(tokens, *pos), Some(Token::LBracket)) {
        return Err(expected(tokens, *pos, "'['"));
    }
    *pos += 1;

    let mut items = Vec::new();
    if matches!(peek(tokens, *pos), Some(Token::RBracket)) {
        *pos += 1;
        return Ok(items);
    }
    loop {
        match peek(tokens, *pos) {
            Some(Token::QuotedString(s)) | Some(Token::MultiLineString(s)) => {
                items.push(s.clone());
                *pos += 1;
            }
            _ => return Err(expected(tokens, *pos, "string")),
        }
        match peek(tokens, *pos) {
            Some(Token::Comma) => *pos += 1,
            Some(Token::RBracket) => {
                *pos += 1;
                break;
            }
            _ => return Err(expected(tokens, *pos, "',' or ']'")),
        }
    }
    Ok(items)
}

/// The optional `test / test-list` that may follow arguments.
fn parse_trailing_tests(
    tokens: &[&Span],
    pos: &mut usize,
    depth: usize,
) -> Result<Vec<Test>, ParseError> {
    match peek(tokens, *pos) {
        Some(Token::Identifier(_)) => Ok(vec![parse_test(tokens, pos, depth)?]),
        Some(Token::LParen) => parse_test_list(tokens, pos, depth),
        _ => Ok(Vec::new()),
    }
}

fn parse_test(tokens: &[&Span], pos: &mut usize, depth: usize) -> Result<Test, ParseError> {
    check_depth(tokens, *pos, depth)?;
    let name = match peek(tokens, *pos) {
        Some(Token::Identifier(s)) => s.to_lowercase(),
        _ => return Err(expected(tokens, *pos, "test")),
    };
    *pos += 1;

    let arguments = parse_arguments(tokens, pos)?;
    let tests = parse_trailing_tests(tokens, pos, depth + 1)?;

    Ok(Test {
        name,
        arguments,
        tests,
    })
}

fn parse_test_list(
    tokens: &[&Span],
    pos: &mut usize,
    depth: usize,
) -> Result<Vec<Test>, ParseError> {
    if !matches!(peek(tokens, *pos), Some(Token::LParen)) {
        return Err(expected(tokens, *pos, "'('"));
    }
    *pos += 1;

    let mut tests = Vec::new();
    loop {
        tests.push(parse_test(tokens, pos, depth)?);
        match peek(tokens, *pos) {
            Some(Token::Comma) => *pos += 1,
            Some(Token::RParen) => {
                *pos += 1;
                break;
            }
            _ => return Err(expected(tokens, *pos, "',' or ')'")),
        }
    }
    Ok(tests)
}
