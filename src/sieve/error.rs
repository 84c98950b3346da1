/// Why a script could not be turned into a rule set.
///
/// Any of these means "not parseable by the supported subset", never
/// "the script is empty".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Unterminated {what} at offset {offset}")]
    Unterminated { what: &'static str, offset: usize },
    #[error("Unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },
    #[error("Expected {expected} at offset {offset}, found {found}")]
    Expected {
        expected: &'static str,
        found: String,
        offset: usize,
    },
    #[error("Nesting deeper than {limit} levels at offset {offset}")]
    TooDeep { limit: usize, offset: usize },
    #[error("Unexpected end of input, expected {0}")]
    UnexpectedEnd(&'static str),
    #[error("No if/elsif blocks found")]
    NoBlocks,
}
