use core::fmt;

use logos::Logos;
use serde::Serialize;

use crate::error::{LexError, QuillError};


// Anything that cannot start a token is dropped one character at a time, and a
// backslash opens a comment that runs to the next backslash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Logos, Serialize)]
#[logos(skip r"[^-+*/%<=>!(){}@?:;&|\\'0-9a-zA-Z_]|\\[^\\]*\\")]
pub enum Token<'a> {
    #[token("++")]
    Increment,
    #[token("--")]
    Decrement,

    #[regex("[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    #[regex(r"'([^\\]|\\[n\\'])'", char_literal)]
    Number(i64),

    #[regex("[a-z_]+", |lex| lex.slice())]
    Identifier(&'a str),

    #[regex("[A-Z][A-Z_]*", |lex| lex.slice())]
    Procedure(&'a str),

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("=")]
    Assign,
    #[token("!")]
    Bang,

    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    StarAssign,
    #[token("/=")]
    SlashAssign,
    #[token("%=")]
    PercentAssign,
    #[token("<=")]
    LessEqual,
    #[token(">=")]
    GreaterEqual,
    #[token("==")]
    Equal,
    #[token("!=")]
    NotEqual,

    #[token("&&")]
    And,
    #[token("||")]
    Or,

    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token("@")]
    At,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
}

fn char_literal<'a>(lex: &mut logos::Lexer<'a, Token<'a>>) -> Option<i64> {
    let slice = lex.slice();
    let inner = &slice[1..slice.len() - 1];

    let character = match inner {
        "\\n" => '\n',
        "\\\\" => '\\',
        "\\'" => '\'',
        other => other.chars().next()?,
    };

    Some(i64::from(u32::from(character)))
}

impl<'a> fmt::Display for Token<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{}", value),
            Self::Identifier(name) | Self::Procedure(name) => f.write_str(name),
            Self::Increment => f.write_str("++"),
            Self::Decrement => f.write_str("--"),
            Self::Plus => f.write_str("+"),
            Self::Minus => f.write_str("-"),
            Self::Star => f.write_str("*"),
            Self::Slash => f.write_str("/"),
            Self::Percent => f.write_str("%"),
            Self::Less => f.write_str("<"),
            Self::Greater => f.write_str(">"),
            Self::Assign => f.write_str("="),
            Self::Bang => f.write_str("!"),
            Self::PlusAssign => f.write_str("+="),
            Self::MinusAssign => f.write_str("-="),
            Self::StarAssign => f.write_str("*="),
            Self::SlashAssign => f.write_str("/="),
            Self::PercentAssign => f.write_str("%="),
            Self::LessEqual => f.write_str("<="),
            Self::GreaterEqual => f.write_str(">="),
            Self::Equal => f.write_str("=="),
            Self::NotEqual => f.write_str("!="),
            Self::And => f.write_str("&&"),
            Self::Or => f.write_str("||"),
            Self::LeftParen => f.write_str("("),
            Self::RightParen => f.write_str(")"),
            Self::LeftBrace => f.write_str("{"),
            Self::RightBrace => f.write_str("}"),
            Self::At => f.write_str("@"),
            Self::Question => f.write_str("?"),
            Self::Colon => f.write_str(":"),
            Self::Semicolon => f.write_str(";"),
        }
    }
}

/// Splits source text into tokens. The first character sequence that cannot
/// form a token aborts lexing.
pub fn lex(source: &str) -> Result<Vec<Token<'_>>, QuillError> {
    let mut tokens = vec![];
    let mut tokenizer = Token::lexer(source);

    while let Some(result) = tokenizer.next() {
        match result {
            Ok(token) => tokens.push(token),
            Err(()) => {
                let position = tokenizer.span().start;
                let text = tokenizer.slice().to_owned();

                if !text.is_empty() && text.bytes().all(|byte| byte.is_ascii_digit()) {
                    return Err(LexError::NumberOutOfRange { position, text }.into());
                }
                return Err(LexError::UnexpectedInput { position, text }.into());
            }
        }
    }

    Ok(tokens)
}
