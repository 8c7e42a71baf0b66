mod ast;
mod config;
mod context;
mod error;
mod interpreter;
mod lexer;
mod operator;
mod parser;

#[cfg(test)]
mod test_utils;

pub use ast::{Expression, Program, Reference, Statement, MAIN};
pub use config::Config;
pub use context::{Environment, PendingInput};
pub use error::{LexError, ParseError, QuillError, RuntimeError};
pub use interpreter::{run, Interpreter};
pub use lexer::{lex, Token};
pub use operator::{floor_div, floor_mod, BinaryOperator, UnaryOperator};
pub use parser::{parse, parse_tokens, parse_with};
