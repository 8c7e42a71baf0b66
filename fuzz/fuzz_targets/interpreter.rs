#![no_main]

use core::fmt;

use itertools::Itertools;
use libfuzzer_sys::{arbitrary::Arbitrary, fuzz_target};

// Names are drawn from a small pool so that programs actually share state
#[derive(Arbitrary, Debug)]
enum QuillName {
    X, Y, Count, Read, Get,
}

impl fmt::Display for QuillName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            QuillName::X => "x",
            QuillName::Y => "y",
            QuillName::Count => "count",
            QuillName::Read => "read",
            QuillName::Get => "get",
        })
    }
}

#[derive(Arbitrary, Debug)]
enum QuillExpression {
    Number(u16),
    Name(QuillName),
    Index(QuillName, Box<QuillExpression>),
    Binary(u8, Box<QuillExpression>, Box<QuillExpression>),
    Not(Box<QuillExpression>),
    Select(Box<QuillExpression>, Box<QuillExpression>, Box<QuillExpression>),
}

const BINARY_OPERATORS: [&str; 13] = ["+", "-", "*", "/", "%", "<", ">", "==", "!=", "<=", ">=", "&&", "||"];

impl fmt::Display for QuillExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{}", value),
            Self::Name(name) => write!(f, "{}", name),
            Self::Index(name, index) => write!(f, "{}@({})", name, index),
            Self::Binary(operator, left, right) => {
                let operator = BINARY_OPERATORS[*operator as usize % BINARY_OPERATORS.len()];
                write!(f, "({} {} {})", left, operator, right)
            }
            Self::Not(operand) => write!(f, "!({})", operand),
            Self::Select(condition, then, otherwise) => write!(f, "({} ? {} : {})", condition, then, otherwise),
        }
    }
}

// Loops are left out so that every generated program terminates
#[derive(Arbitrary, Debug)]
enum QuillStatement {
    Assign(QuillName, QuillExpression),
    AssignIndex(QuillName, QuillExpression, QuillExpression),
    Increment(QuillName),
    Write(QuillExpression),
    Put(QuillExpression),
    If(QuillExpression, Vec<QuillStatement>, Vec<QuillStatement>),
    Block(Vec<QuillStatement>),
    Call(u8),
}

fn stringify_statements(statements: &[QuillStatement]) -> String {
    statements.iter()
        .map(QuillStatement::to_string)
        .join(" ")
}

impl fmt::Display for QuillStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Assign(name, value) => write!(f, "{} = {};", name, value),
            Self::AssignIndex(name, index, value) => write!(f, "{}@({}) = {};", name, index, value),
            Self::Increment(name) => write!(f, "{}++;", name),
            Self::Write(value) => write!(f, "write = {};", value),
            Self::Put(value) => write!(f, "put = {};", value),
            Self::If(condition, then, otherwise) => write!(
                f,
                "if ({}) {{ {} }} else {{ {} }}",
                condition,
                stringify_statements(then),
                stringify_statements(otherwise)
            ),
            Self::Block(statements) => write!(f, "{{ {} }}", stringify_statements(statements)),
            Self::Call(procedure) => write!(f, "P{};", char::from(b'A' + procedure % 4)),
        }
    }
}

#[derive(Arbitrary, Debug)]
struct QuillProgram {
    procedures: Vec<Vec<QuillStatement>>,
    main: Vec<QuillStatement>,
    input: String,
}

impl fmt::Display for QuillProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (index, body) in self.procedures.iter().take(4).enumerate() {
            writeln!(f, "P{}: {{ {} }}", char::from(b'A' + index as u8), stringify_statements(body))?;
        }
        f.write_str(&stringify_statements(&self.main))
    }
}

fuzz_target!(|program: QuillProgram| {
    let source = program.to_string();
    let mut output = vec![];
    let _ = quill::run(&source, program.input.as_bytes(), &mut output);
});
