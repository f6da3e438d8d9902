//! Instrumentation errors

use jscover_parser::ParseError;

/// Error type for instrumentation
#[derive(Debug, thiserror::Error)]
pub enum InstrumentError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl InstrumentError {
    /// The parse error behind this failure, for callers that render spans
    pub fn parse_error(&self) -> Option<&ParseError> {
        match self {
            InstrumentError::Parse(err) => Some(err),
            _ => None,
        }
    }
}
