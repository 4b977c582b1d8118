// Parse failures for block text. Every variant that points at input carries
// the 1-based line number where the problem starts.

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("source contains no blocks")]
    Empty,
    #[error("line {line}: unexpected input {snippet:?}")]
    Unexpected { line: usize, snippet: String },
    #[error("line {line}: property {name} outside of any block")]
    PropertyOutsideBlock { line: usize, name: String },
    #[error("line {line}: '}}' without a matching block")]
    UnbalancedClose { line: usize },
    #[error("line {line}: block {tag} is never closed")]
    Unterminated { tag: String, line: usize },
    #[error("line {line}: property {name} has a list or record value, which is not supported")]
    ComplexValue { line: usize, name: String },
    #[error("line {line}: block {tag} cannot be nested in a Damaged block")]
    NestedInDamaged { line: usize, tag: String },
    #[error("line {line}: Index {index} is already used by another block")]
    DuplicateIndex { line: usize, index: u32 },
    #[error("line {line}: {source}")]
    Construction {
        line: usize,
        source: sortie_mission::Error,
    },
}

impl ParseError {
    /// The line the error points at, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::Empty => None,
            ParseError::Unexpected { line, .. }
            | ParseError::PropertyOutsideBlock { line, .. }
            | ParseError::UnbalancedClose { line }
            | ParseError::Unterminated { line, .. }
            | ParseError::ComplexValue { line, .. }
            | ParseError::NestedInDamaged { line, .. }
            | ParseError::DuplicateIndex { line, .. }
            | ParseError::Construction { line, .. } => Some(*line),
        }
    }
}
