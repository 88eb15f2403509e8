use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error: {0}")]
    Read(#[from] std::io::Error),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("invalid UTF-8 input: {0}")]
    InvalidEncoding(#[from] std::str::Utf8Error),
    #[error("missing required setting `{key}`")]
    MissingSetting { key: String },
    #[error("cannot export `{key}` to the process environment: key or value contains a NUL byte")]
    NulByte { key: String },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// A failure to resolve an assignment.
///
/// Messages carry the key and line number only. Values are never included
/// since `.env` files routinely hold credentials.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error{} at line {line}: {kind}", path_suffix(.path))]
pub struct ParseError {
    pub line: u32,
    pub kind: ParseErrorKind,
    pub path: Option<PathBuf>,
}

impl ParseError {
    pub(crate) fn new(line: u32, kind: ParseErrorKind) -> Self {
        Self {
            line,
            kind,
            path: None,
        }
    }

    pub(crate) fn with_path(mut self, path: Option<PathBuf>) -> Self {
        self.path = path;
        self
    }
}

fn path_suffix(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" in {}", path.display()),
        None => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("unterminated quoted value for key {key}")]
    UnterminatedQuote { key: String },
    #[error("invalid key `{key}`")]
    InvalidKey { key: String },
}
