use core::fmt;
use std::{collections::HashMap, rc::Rc};

use itertools::Itertools;

use crate::operator::{BinaryOperator, UnaryOperator};


/// Name of the procedure table entry holding the top-level program.
pub const MAIN: &str = "MAIN";

// Statements are shared: a procedure call is the callee's own root node
// placed at the call site, so every statement child is reference counted.
#[derive(Debug, PartialEq)]
pub enum Statement {
    Block(Vec<Rc<Statement>>),
    Assignment { target: Reference, value: Expression },
    If { condition: Expression, then: Rc<Statement>, otherwise: Rc<Statement> },
    While { condition: Expression, body: Rc<Statement> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(i64),
    Unary(UnaryOperator, Box<Expression>),
    Binary(BinaryOperator, Box<Expression>, Box<Expression>),
    Select(Box<Expression>, Box<Expression>, Box<Expression>),
    Reference(Reference),
}

/// Something that names a slot in the environment. An indexed reference
/// names `base.index`, so `a@1@2` and `a.1.2` are the same slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Reference {
    Variable(String),
    Index { base: Box<Reference>, index: Box<Expression> },
}

impl Statement {
    pub fn empty() -> Self {
        Self::Block(vec![])
    }
}

impl Expression {
    pub fn unary(operator: UnaryOperator, operand: Expression) -> Self {
        Self::Unary(operator, Box::new(operand))
    }

    pub fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Self {
        Self::Binary(operator, Box::new(left), Box::new(right))
    }

    pub fn select(condition: Expression, then: Expression, otherwise: Expression) -> Self {
        Self::Select(Box::new(condition), Box::new(then), Box::new(otherwise))
    }
}

impl Reference {
    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    pub fn index(base: Reference, index: Expression) -> Self {
        Self::Index { base: Box::new(base), index: Box::new(index) }
    }
}

/// The procedure table produced by the parser. Names are bound once the
/// body of a procedure is complete; a later definition with the same name
/// replaces the entry for call sites parsed after it.
#[derive(Debug, Default)]
pub struct Program {
    procedures: HashMap<String, Rc<Statement>>,
}

impl Program {
    pub fn main(&self) -> Option<&Rc<Statement>> {
        self.procedure(MAIN)
    }

    pub fn procedure(&self, name: &str) -> Option<&Rc<Statement>> {
        self.procedures.get(name)
    }

    pub(crate) fn define(&mut self, name: &str, body: Rc<Statement>) {
        self.procedures.insert(name.to_owned(), body);
    }

    pub fn procedure_names(&self) -> impl Iterator<Item = &str> {
        self.procedures.keys().map(String::as_str).sorted()
    }
}

fn indent(node: &impl fmt::Display) -> String {
    node.to_string()
        .split('\n')
        .map(|line| format!("| {}", line))
        .join("\n")
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Block(children) => {
                write!(f, "Block(\n{}\n)", children.iter().map(|child| indent(child)).join(",\n"))
            }
            Self::Assignment { target, value } => {
                write!(f, "Assignment(\n{},\n{}\n)", indent(target), indent(value))
            }
            Self::If { condition, then, otherwise } => {
                write!(f, "If(\n{},\n{},\n{})", indent(condition), indent(then), indent(otherwise))
            }
            Self::While { condition, body } => {
                write!(f, "While(\n{},\n{})", indent(condition), indent(body))
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => write!(f, "Expr({})", value),
            Self::Unary(operator, operand) => {
                write!(f, "Expr(\n{},\n{}\n)", indent(operator), indent(operand))
            }
            Self::Binary(operator, left, right) => {
                write!(f, "Expr(\n{},\n{},\n{}\n)", indent(operator), indent(left), indent(right))
            }
            Self::Select(condition, then, otherwise) => {
                write!(f, "Expr(\n| ?,\n{},\n{},\n{}\n)", indent(condition), indent(then), indent(otherwise))
            }
            Self::Reference(reference) => fmt::Display::fmt(reference, f),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Variable(name) => write!(f, "Var({})", name),
            Self::Index { base, index } => write!(f, "Ref(\n{},\n{}\n)", indent(base), indent(index)),
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dump = self.procedure_names()
            .filter_map(|name| self.procedure(name).map(|body| format!("{}:\n{}", name, indent(body))))
            .join("\n");
        f.write_str(&dump)
    }
}
