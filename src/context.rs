use std::{collections::HashMap, io::BufRead};

use tracing::trace;

use crate::error::{QuillError, RuntimeError};


/// The single flat variable store shared by the top-level program and every
/// procedure. Unset names read as 0.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Environment {
    bindings: HashMap<String, i64>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> i64 {
        self.bindings.get(name).copied().unwrap_or(0)
    }

    pub fn set(&mut self, name: String, value: i64) {
        self.bindings.insert(name, value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Unconsumed input text behind the `read` and `get` sentinels. Lines are
/// pulled from the source only when the buffer runs dry.
pub struct PendingInput<R> {
    source: R,
    buffer: String,
}

impl<R: BufRead> PendingInput<R> {
    pub fn new(source: R) -> Self {
        Self { source, buffer: String::new() }
    }

    #[cfg(test)]
    fn pending(&self) -> &str {
        &self.buffer
    }

    // Returns false once the source is exhausted and nothing is buffered.
    // Line terminators are dropped and empty lines skipped.
    fn fill(&mut self) -> Result<bool, QuillError> {
        while self.buffer.is_empty() {
            let mut line = String::new();
            if self.source.read_line(&mut line)? == 0 {
                trace!("input exhausted");
                return Ok(false);
            }

            if line.ends_with('\n') {
                line.pop();
                if line.ends_with('\r') { line.pop(); }
            }
            trace!(line = %line, "pulled input line");
            self.buffer = line;
        }

        Ok(true)
    }

    /// Consumes a signed decimal integer and at most one space after it.
    pub fn read_integer(&mut self) -> Result<i64, QuillError> {
        if !self.fill()? { return Ok(0); }

        if !self.buffer.starts_with(|c: char| c == '-' || c.is_ascii_digit()) {
            return Err(RuntimeError::MalformedInput(self.buffer.clone()).into());
        }

        let length = 1 + self.buffer[1..].bytes().take_while(u8::is_ascii_digit).count();
        let value = self.buffer[..length].parse::<i64>()
            .map_err(|_| RuntimeError::MalformedInput(self.buffer.clone()))?;

        self.buffer.drain(..length);
        if self.buffer.starts_with(' ') {
            self.buffer.remove(0);
        }

        Ok(value)
    }

    /// Consumes one character and returns its code point.
    pub fn read_char(&mut self) -> Result<i64, QuillError> {
        if !self.fill()? { return Ok(0); }

        match self.buffer.chars().next() {
            Some(character) => {
                self.buffer.drain(..character.len_utf8());
                Ok(i64::from(u32::from(character)))
            }
            None => Ok(0),
        }
    }
}
