use thiserror::Error;


#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unexpected input {text:?} at byte {position}")]
    UnexpectedInput { position: usize, text: String },
    #[error("number literal {text} at byte {position} does not fit in 64 bits")]
    NumberOutOfRange { position: usize, text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("expected {expected}, found `{found}`")]
    UnexpectedToken { expected: &'static str, found: String },
    #[error("expected {expected}, found end of input")]
    UnexpectedEnd { expected: &'static str },
    #[error("procedure {0} is not defined at this point")]
    UndefinedProcedure(String),
    #[error("`{0}` cannot follow an assignment target")]
    InvalidStatement(String),
    #[error("nesting exceeds the limit of {0}")]
    NestingTooDeep(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("cannot read an integer from {0:?}")]
    MalformedInput(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("{0} is not a valid character code")]
    InvalidCharacter(i64),
    #[error("execution nesting exceeds the limit of {0}")]
    NestingTooDeep(usize),
    #[error("i/o error: {0}")]
    Io(String),
}

/// Any failure that aborts a run. The three classes mirror the stage that
/// raised them; none of them is recoverable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuillError {
    #[error("LexFailure: {0}")]
    Lex(#[from] LexError),
    #[error("ParseFailure: {0}")]
    Parse(#[from] ParseError),
    #[error("RuntimeFailure: {0}")]
    Runtime(#[from] RuntimeError),
}

impl QuillError {
    pub fn class(&self) -> &'static str {
        match self {
            Self::Lex(_) => "LexFailure",
            Self::Parse(_) => "ParseFailure",
            Self::Runtime(_) => "RuntimeFailure",
        }
    }
}

impl From<std::io::Error> for QuillError {
    fn from(error: std::io::Error) -> Self {
        Self::Runtime(RuntimeError::Io(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_names_follow_the_failing_stage() {
        let lex: QuillError = LexError::UnexpectedInput { position: 3, text: "&".into() }.into();
        let parse: QuillError = ParseError::UndefinedProcedure("PROC".into()).into();
        let runtime: QuillError = RuntimeError::DivisionByZero.into();

        assert_eq!(lex.class(), "LexFailure");
        assert_eq!(parse.class(), "ParseFailure");
        assert_eq!(runtime.class(), "RuntimeFailure");
        assert_eq!(parse.to_string(), "ParseFailure: procedure PROC is not defined at this point");
    }
}
