use std::path::PathBuf;

/// Errors from the proto source parser.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// A character matched no tokenizer rule.
    #[error("lex error at line {line}: unexpected character {ch:?}")]
    Lex { line: usize, ch: char },

    #[error("malformed source: {message}")]
    MalformedSource { message: String },

    /// Input ended while a block was still open.
    #[error("unexpected end of input: {open} was never closed")]
    UnexpectedEndOfInput { open: String },

    #[error("file path invalid: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ParseError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        ParseError::MalformedSource {
            message: message.into(),
        }
    }
}

/// Result type alias for parser operations.
pub type Result<T> = std::result::Result<T, ParseError>;
