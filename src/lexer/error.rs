use thiserror::Error;

use crate::token::Span;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LexError {
    #[error("'{character}'")]
    IllegalCharacter { character: char, span: Span },
    #[error("Unterminated string literal, expected {expected}")]
    UnterminatedString { expected: char, span: Span },
    #[error("Unterminated interpolation, expected '}}'")]
    UnterminatedInterpolation { span: Span },
    #[error("Invalid number literal '{literal}'")]
    InvalidNumber { literal: String, span: Span },
}

impl LexError {
    pub fn span(&self) -> Span {
        match self {
            LexError::IllegalCharacter { span, .. }
            | LexError::UnterminatedString { span, .. }
            | LexError::UnterminatedInterpolation { span }
            | LexError::InvalidNumber { span, .. } => *span,
        }
    }

    /// Heading used when the error is rendered.
    pub fn name(&self) -> &'static str {
        match self {
            LexError::IllegalCharacter { .. } | LexError::InvalidNumber { .. } => {
                "Illegal Character"
            }
            LexError::UnterminatedString { .. } | LexError::UnterminatedInterpolation { .. } => {
                "Expected Character"
            }
        }
    }
}

pub type LexResult<T> = Result<T, LexError>;
