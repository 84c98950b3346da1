/// SIEVE script tokenizer (RFC 5228).
use std::fmt;

use crate::sieve::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A `:tag` like `:is`, `:contains`, `:over`, `:domain`, etc.
    Tag(String),
    /// An unquoted identifier like `if`, `header`, `allof`, `fileinto`, etc.
    Identifier(String),
    /// A double-quoted string, escapes resolved.
    QuotedString(String),
    /// A multi-line string `text:\r\n...\r\n.\r\n`, dot-stuffing removed.
    MultiLineString(String),
    /// A numeric value, possibly with K/M/G suffix.
    Number(String),
    /// A `# ...` single-line comment.
    Comment,
    /// A `/* ... */` block comment.
    BlockComment,
    /// `;`
    Semicolon,
    /// `,`
    Comma,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(t) => write!(f, "tag '{t}'"),
            Self::Identifier(s) => write!(f, "identifier '{s}'"),
            Self::QuotedString(_) | Self::MultiLineString(_) => f.write_str("string"),
            Self::Number(n) => write!(f, "number {n}"),
            Self::Comment | Self::BlockComment => f.write_str("comment"),
            Self::Semicolon => f.write_str("';'"),
            Self::Comma => f.write_str("','"),
            Self::LParen => f.write_str("'('"),
            Self::RParen => f.write_str("')'"),
            Self::LBrace => f.write_str("'{'"),
            Self::RBrace => f.write_str("'}'"),
            Self::LBracket => f.write_str("'['"),
            Self::RBracket => f.write_str("']'"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Span {
    pub token: Token,
    pub offset: usize,
}

pub fn tokenize(input: &str) -> Result<Vec<Span>, ParseError> {
    let mut tokens = Vec::new();
    let bytes = input.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i].is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let start = i;

        let punct = match bytes[i] {
            b';' => Some(Token::Semicolon),
            b',' => Some(Token::Comma),
            b'(' => Some(Token::LParen),
            b')' => Some(Token::RParen),
            b'{' => Some(Token::LBrace),
            b'}' => Some(Token::RBrace),
            b'[' => Some(Token::LBracket),
            b']' => Some(Token::RBracket),
            _ => None,
        };
        if let Some(token) = punct {
            tokens.push(Span { token, offset: start });
            i += 1;
            continue;
        }

        match bytes[i] {
            // Single-line comment: # ...
            b'#' => {
                i += 1;
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                tokens.push(Span {
                    token: Token::Comment,
                    offset: start,
                });
            }

            // Block comment: /* ... */
            b'/' if i + 1 < bytes.len() && bytes[i + 1] == b'*' => {
                i += 2;
                loop {
                    if i + 1 >= bytes.len() {
                        return Err(ParseError::Unterminated {
                            what: "block comment",
                            offset: start,
                        });
                    }
                    if bytes[i] == b'*' && bytes[i + 1] == b'/' {
                        break;
                    }
                    i += 1;
                }
                i += 2;
                tokens.push(Span {
                    token: Token::BlockComment,
                    offset: start,
                });
            }

            // Quoted string. Walk chars, not bytes, so UTF-8 survives.
            b'"' => {
                let mut s = String::new();
                let mut chars = input[start + 1..].char_indices();
                loop {
                    match chars.next() {
                        Some((_, '\\')) => match chars.next() {
                            Some((_, escaped)) => s.push(escaped),
                            None => break,
                        },
                        Some((off, '"')) => {
                            i = start + 1 + off + 1;
                            tokens.push(Span {
                                token: Token::QuotedString(s),
                                offset: start,
                            });
                            break;
                        }
                        Some((_, c)) => s.push(c),
                        None => break,
                    }
                }
                if i == start {
                    return Err(ParseError::Unterminated {
                        what: "string",
                        offset: start,
                    });
                }
            }

            // Multi-line string: text:
            b't' | b'T'
                if i + 4 < bytes.len() && bytes[i..i + 5].eq_ignore_ascii_case(b"text:") =>
            {
                i += 5;
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                if i < bytes.len() {
                    i += 1;
                }
                let body_start = i;
                loop {
                    if i >= bytes.len() {
                        return Err(ParseError::Unterminated {
                            what: "multi-line string",
                            offset: start,
                        });
                    }
                    // A line holding only "." ends the string.
                    if bytes[i] == b'.' {
                        let next = i + 1;
                        if next >= bytes.len()
                            || bytes[next] == b'\n'
                            || (bytes[next] == b'\r'
                                && next + 1 < bytes.len()
                                && bytes[next + 1] == b'\n')
                        {
                            let body = unstuff_dots(&input[body_start..i]);
                            i += 1;
                            if i < bytes.len() && bytes[i] == b'\r' {
                                i += 1;
                            }
                            if i < bytes.len() && bytes[i] == b'\n' {
                                i += 1;
                            }
                            tokens.push(Span {
                                token: Token::MultiLineString(body),
                                offset: start,
                            });
                            break;
                        }
                    }
                    while i < bytes.len() && bytes[i] != b'\n' {
                        i += 1;
                    }
                    if i < bytes.len() {
                        i += 1;
                    }
                }
            }

            // Tag: :identifier
            b':' => {
                i += 1;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                let tag = input[start..i].to_lowercase();
                tokens.push(Span {
                    token: Token::Tag(tag),
                    offset: start,
                });
            }

            // Number
            b'0'..=b'9' => {
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                if i < bytes.len() && matches!(bytes[i], b'K' | b'k' | b'M' | b'm' | b'G' | b'g')
                {
                    i += 1;
                }
                tokens.push(Span {
                    token: Token::Number(input[start..i].to_string()),
                    offset: start,
                });
            }

            // Identifier
            _ if bytes[i].is_ascii_alphabetic() || bytes[i] == b'_' => {
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                tokens.push(Span {
                    token: Token::Identifier(input[start..i].to_string()),
                    offset: start,
                });
            }

            _ => {
                let ch = input[start..].chars().next().unwrap_or('\u{fffd}');
                return Err(ParseError::UnexpectedChar { ch, offset: start });
            }
        }
    }

    Ok(tokens)
}

/// Undo RFC 5228 dot-stuffing: a line starting with ".." loses one dot.
fn unstuff_dots(body: &str) -> String {
    body.split_inclusive('\n')
        .map(|line| line.strip_prefix("..").map_or(line, |_| &line[1..]))
        .collect()
}
