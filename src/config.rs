/// Limits applied while parsing and running a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Deepest nesting of statements and parenthesised expressions the parser
    /// accepts, and deepest nesting of statement execution the interpreter
    /// allows. Procedure bodies count towards the depth of their call site.
    pub max_depth: usize,
}

impl Config {
    pub const DEFAULT_MAX_DEPTH: usize = 512;

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self { max_depth: Self::DEFAULT_MAX_DEPTH }
    }
}
