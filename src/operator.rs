use core::fmt;

use crate::error::RuntimeError;


/// Operators taking a single operand. Truth is "nonzero", results of logical
/// operators are 0 or 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Less,
    Greater,
    Equal,
    NotEqual,
    LessEqual,
    GreaterEqual,
    And,
    Or,
}

fn truth(value: bool) -> i64 {
    i64::from(value)
}

impl UnaryOperator {
    pub fn apply(self, operand: i64) -> i64 {
        match self {
            Self::Negate => operand.wrapping_neg(),
            Self::Not => truth(operand == 0),
        }
    }
}

impl BinaryOperator {
    /// Combines two already evaluated operands. Logical operators see both
    /// values, there is no short-circuiting at this level.
    pub fn apply(self, left: i64, right: i64) -> Result<i64, RuntimeError> {
        Ok(match self {
            Self::Add => left.wrapping_add(right),
            Self::Subtract => left.wrapping_sub(right),
            Self::Multiply => left.wrapping_mul(right),
            Self::Divide => floor_div(left, right)?,
            Self::Modulo => floor_mod(left, right)?,
            Self::Less => truth(left < right),
            Self::Greater => truth(left > right),
            Self::Equal => truth(left == right),
            Self::NotEqual => truth(left != right),
            Self::LessEqual => truth(left <= right),
            Self::GreaterEqual => truth(left >= right),
            Self::And => truth(left != 0 && right != 0),
            Self::Or => truth(left != 0 || right != 0),
        })
    }
}

/// Conditional select over pre-evaluated branches.
pub fn select(condition: i64, then: i64, otherwise: i64) -> i64 {
    if condition != 0 { then } else { otherwise }
}

/// Division rounding towards negative infinity.
pub fn floor_div(left: i64, right: i64) -> Result<i64, RuntimeError> {
    if right == 0 { return Err(RuntimeError::DivisionByZero); }

    let quotient = left.wrapping_div(right);
    if left.wrapping_rem(right) != 0 && (left < 0) != (right < 0) {
        return Ok(quotient.wrapping_sub(1));
    }
    Ok(quotient)
}

/// Remainder of [floor_div], carrying the sign of the divisor.
pub fn floor_mod(left: i64, right: i64) -> Result<i64, RuntimeError> {
    if right == 0 { return Err(RuntimeError::DivisionByZero); }

    let remainder = left.wrapping_rem(right);
    if remainder != 0 && (remainder < 0) != (right < 0) {
        return Ok(remainder.wrapping_add(right));
    }
    Ok(remainder)
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Negate => "neg",
            Self::Not => "!",
        })
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::Less => "<",
            Self::Greater => ">",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::LessEqual => "<=",
            Self::GreaterEqual => ">=",
            Self::And => "&&",
            Self::Or => "||",
        })
    }
}
