//! Top-level error type and diagnostic rendering.

use thiserror::Error;

use crate::lexer::LexError;
use crate::parser::SyntaxError;
use crate::runtime::error::RuntimeError;
use crate::token::Span;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl Error {
    pub fn name(&self) -> &'static str {
        match self {
            Error::Lex(error) => error.name(),
            Error::Syntax(error) => error.name(),
            Error::Runtime(error) => error.name(),
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Error::Lex(error) => error.span(),
            Error::Syntax(error) => error.span,
            Error::Runtime(error) => error.span,
        }
    }

    /// Renders the error the way it is shown to users: a traceback for
    /// runtime errors, a file/line header otherwise, then the caret diagram.
    pub fn render(&self, file_name: &str, source: &str) -> String {
        let span = self.span();
        let mut lines = Vec::new();
        match self {
            Error::Runtime(error) => {
                lines.push("Traceback (most recent call last):".to_string());
                for frame in &error.traceback {
                    lines.push(format!(
                        "  File {file_name}, line {}, in {}",
                        frame.position.line + 1,
                        frame.display_name
                    ));
                }
                lines.push(format!("{}: {}", self.name(), self));
            }
            Error::Lex(_) | Error::Syntax(_) => {
                lines.push(format!("{}: {}", self.name(), self));
                lines.push(format!("File {file_name}, line {}", span.start.line + 1));
            }
        }
        lines.push(String::new());
        lines.extend(carets(source, span));
        lines.join("\n")
    }
}

/// Each source line touched by `span`, followed by a caret run under the
/// covered columns. Every line gets at least one caret.
fn carets(source: &str, span: Span) -> Vec<String> {
    let mut out = Vec::new();
    let last = span.end.line.max(span.start.line);
    for (number, line) in source.lines().enumerate().skip(span.start.line) {
        if number > last {
            break;
        }
        let width = line.chars().count();
        let from = if number == span.start.line {
            span.start.column.min(width)
        } else {
            0
        };
        let to = if number == span.end.line {
            span.end.column.min(width)
        } else {
            width
        };
        let count = to.saturating_sub(from).max(1);
        out.push(line.to_string());
        out.push(format!("{}{}", " ".repeat(from), "^".repeat(count)));
    }
    out
}
