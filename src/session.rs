//! One interpreter kept alive across inputs, as used by the CLI and REPL.

use tracing::debug;

use crate::config::Config;
use crate::error::Error;
use crate::interpreter::Interpreter;
use crate::lexer;
use crate::parser;
use crate::runtime::value::Value;

/// Result of running one input.
#[derive(Debug)]
pub struct Execution {
    /// Lines printed while running, including those before a failure.
    pub output: Vec<String>,
    /// Value of each top-level statement, or the error that stopped the run.
    pub outcome: Result<Vec<Value>, Error>,
}

pub struct Session {
    interpreter: Interpreter,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self {
            interpreter: Interpreter::new(config),
        }
    }

    /// Tokenizes, parses and evaluates `source`. Definitions made by earlier
    /// inputs stay visible; a failing input leaves the session usable.
    pub fn run(&mut self, source: &str) -> Execution {
        let outcome = self.evaluate(source);
        if let Err(error) = &outcome {
            debug!(error = %error, kind = error.name(), "input failed");
        }
        Execution {
            output: self.interpreter.take_output(),
            outcome,
        }
    }

    fn evaluate(&mut self, source: &str) -> Result<Vec<Value>, Error> {
        let tokens = lexer::tokenize(source)?;
        debug!(tokens = tokens.len(), "tokenized input");
        let program = parser::parse_tokens(tokens)?;
        debug!(statements = program.statements.len(), "parsed input");
        Ok(self.interpreter.run(&program)?)
    }

    pub fn render_error(&self, error: &Error, source: &str) -> String {
        error.render(&self.interpreter.config().file_name, source)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
