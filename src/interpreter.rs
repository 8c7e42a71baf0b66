use std::io::{BufRead, Write};

use tracing::{debug, trace};

use crate::{
    ast::{Expression, Program, Reference, Statement},
    config::Config,
    context::{Environment, PendingInput},
    error::{QuillError, RuntimeError},
    operator::select,
    parser::parse_with,
};

pub(crate) type EvaluationResult<T> = Result<T, QuillError>;

// Assigning to these prints instead of storing.
const WRITE: &str = "write";
const PUT: &str = "put";
// Reading these consumes input instead of loading.
const READ: &str = "read";
const GET: &str = "get";


/// Runs programs against one environment, one pending input buffer and one
/// output sink. Running several programs in turn shares all three.
pub struct Interpreter<R, W> {
    environment: Environment,
    input: PendingInput<R>,
    output: W,
    config: Config,
    depth: usize,
}

impl<R: BufRead, W: Write> Interpreter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            environment: Environment::new(),
            input: PendingInput::new(input),
            output,
            config: Config::default(),
            depth: 0,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn into_output(self) -> W {
        self.output
    }

    pub fn run_str(&mut self, source: &str) -> EvaluationResult<()> {
        let program = parse_with(source, &self.config)?;
        self.run_program(&program)
    }

    /// Executes the top-level program, if there is one. The output is flushed
    /// whether or not execution fails, so anything written before a failure
    /// stays visible.
    pub fn run_program(&mut self, program: &Program) -> EvaluationResult<()> {
        let Some(main) = program.main() else {
            debug!("program has no top-level statements");
            return Ok(());
        };

        debug!("running program");
        let result = self.execute(main);
        self.output.flush()?;
        debug!(ok = result.is_ok(), variables = self.environment.len(), "program finished");
        result
    }

    pub fn execute(&mut self, statement: &Statement) -> EvaluationResult<()> {
        if self.depth >= self.config.max_depth {
            return Err(RuntimeError::NestingTooDeep(self.config.max_depth).into());
        }

        self.depth += 1;
        let result = self.execute_statement(statement);
        self.depth -= 1;
        result
    }

    fn execute_statement(&mut self, statement: &Statement) -> EvaluationResult<()> {
        match statement {
            Statement::Block(children) => {
                for child in children {
                    self.execute(child)?;
                }
                Ok(())
            }
            Statement::Assignment { target, value } => self.execute_assignment(target, value),
            Statement::If { condition, then, otherwise } => {
                if self.evaluate(condition)? != 0 {
                    self.execute(then)
                } else {
                    self.execute(otherwise)
                }
            }
            Statement::While { condition, body } => {
                while self.evaluate(condition)? != 0 {
                    self.execute(body)?;
                }
                Ok(())
            }
        }
    }

    fn execute_assignment(&mut self, target: &Reference, value: &Expression) -> EvaluationResult<()> {
        // The target name is computed before the value, which matters when
        // an index reads input.
        let name = self.name(target)?;
        let value = self.evaluate(value)?;

        match name.as_str() {
            WRITE => {
                trace!(value, "write");
                write!(self.output, "{}", value)?;
            }
            PUT => {
                let character = u32::try_from(value).ok()
                    .and_then(char::from_u32)
                    .ok_or(RuntimeError::InvalidCharacter(value))?;
                trace!(value, "put");
                write!(self.output, "{}", character)?;
            }
            _ => self.environment.set(name, value),
        }

        Ok(())
    }

    /// Evaluates every operand, including both branches of `? :` and both
    /// sides of `&&` and `||`, before combining them.
    pub fn evaluate(&mut self, expression: &Expression) -> EvaluationResult<i64> {
        match expression {
            Expression::Literal(value) => Ok(*value),
            Expression::Unary(operator, operand) => {
                let operand = self.evaluate(operand)?;
                Ok(operator.apply(operand))
            }
            Expression::Binary(operator, left, right) => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                Ok(operator.apply(left, right)?)
            }
            Expression::Select(condition, then, otherwise) => {
                let condition = self.evaluate(condition)?;
                let then = self.evaluate(then)?;
                let otherwise = self.evaluate(otherwise)?;
                Ok(select(condition, then, otherwise))
            }
            Expression::Reference(Reference::Variable(name)) => match name.as_str() {
                READ => self.input.read_integer(),
                GET => self.input.read_char(),
                _ => Ok(self.environment.get(name)),
            },
            Expression::Reference(reference) => {
                let name = self.name(reference)?;
                Ok(self.environment.get(&name))
            }
        }
    }

    /// The environment key a reference stands for: the variable name itself,
    /// or the base name, a dot and the decimal index.
    pub fn name(&mut self, reference: &Reference) -> EvaluationResult<String> {
        match reference {
            Reference::Variable(name) => Ok(name.clone()),
            Reference::Index { base, index } => {
                let mut name = self.name(base)?;
                let index = self.evaluate(index)?;
                name.push('.');
                name.push_str(&index.to_string());
                Ok(name)
            }
        }
    }
}

/// Parses and runs `source` with a fresh environment.
pub fn run<R: BufRead, W: Write>(source: &str, input: R, output: W) -> EvaluationResult<()> {
    Interpreter::new(input, output).run_str(source)
}
