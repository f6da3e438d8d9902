//! Parser error types

use jscover_ast::Span;
use jscover_lexer::TokenKind;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("unexpected token: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("unexpected end of file")]
    UnexpectedEof { span: Span },

    #[error("unrecognized input")]
    UnrecognizedToken { span: Span },

    #[error("invalid expression")]
    InvalidExpression { span: Span },

    #[error("invalid assignment target")]
    InvalidAssignmentTarget { span: Span },

    #[error("invalid binding pattern")]
    InvalidPattern { span: Span },

    #[error("invalid numeric literal")]
    InvalidNumber { span: Span },

    #[error("invalid escape sequence in string")]
    InvalidString { span: Span },

    #[error("'return' outside of function")]
    ReturnOutsideFunction { span: Span },

    #[error("'import' and 'export' may only appear at the top level of a module")]
    ModuleItemNotAllowed { span: Span },

    #[error("'super' is only allowed in object methods and classes")]
    SuperOutsideMethod { span: Span },

    #[error("this syntax requires the '{plugin}' plugin")]
    PluginRequired { plugin: String, span: Span },

    #[error("unknown parser plugin '{name}'")]
    UnknownPlugin { name: String },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::UnexpectedToken { span, .. } => *span,
            ParseError::UnexpectedEof { span } => *span,
            ParseError::UnrecognizedToken { span } => *span,
            ParseError::InvalidExpression { span } => *span,
            ParseError::InvalidAssignmentTarget { span } => *span,
            ParseError::InvalidPattern { span } => *span,
            ParseError::InvalidNumber { span } => *span,
            ParseError::InvalidString { span } => *span,
            ParseError::ReturnOutsideFunction { span } => *span,
            ParseError::ModuleItemNotAllowed { span } => *span,
            ParseError::SuperOutsideMethod { span } => *span,
            ParseError::PluginRequired { span, .. } => *span,
            ParseError::UnknownPlugin { .. } => Span::dummy(),
        }
    }

    pub fn unexpected(expected: impl Into<String>, found: TokenKind, span: Span) -> Self {
        match found {
            TokenKind::Eof => ParseError::UnexpectedEof { span },
            TokenKind::Error => ParseError::UnrecognizedToken { span },
            _ => ParseError::UnexpectedToken {
                expected: expected.into(),
                found: found.describe().to_string(),
                span,
            },
        }
    }
}
