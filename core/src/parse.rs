//! Structural parser contract.

use thiserror::Error;

use crate::DocumentableUnit;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The grammar could not be loaded into the parser.
    #[error("failed to load grammar: {0}")]
    Language(String),

    #[error("failed to parse source: {0}")]
    Parse(String),
}

/// Turns source text into the units eligible for documentation.
///
/// Units must be returned in source order with their spans and any
/// documentation block found immediately before them.
pub trait SourceParser: Send + Sync {
    fn parse(&self, source: &str) -> Result<Vec<DocumentableUnit>, ParseError>;
}
