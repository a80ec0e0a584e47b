use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("{pair} CSV error: {source}")]
    Csv {
        pair: String,
        #[source]
        source: csv::Error,
    },

    #[error("{pair} line {line} field '{field}' is malformed: {message}")]
    MalformedRow {
        pair: String,
        line: u64,
        field: String,
        message: String,
    },

    #[error("{pair} line {line} has {found} fields, expected {expected}")]
    FieldCount {
        pair: String,
        line: u64,
        found: usize,
        expected: usize,
    },
}

impl ParserError {
    /// Label of the file the error was raised for.
    pub fn pair(&self) -> &str {
        match self {
            ParserError::Csv { pair, .. }
            | ParserError::MalformedRow { pair, .. }
            | ParserError::FieldCount { pair, .. } => pair,
        }
    }
}
