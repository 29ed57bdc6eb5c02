use std::fmt;
use std::io;

use thiserror::Error;

/// Where in the input a translation error was raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub unit: String,
    /// 1-based.
    pub line: usize,
    pub text: String,
}

impl Location {
    pub fn new(unit: &str, line: usize, text: &str) -> Self {
        Location {
            unit: unit.to_string(),
            line,
            text: text.to_string(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.vm:{}: `{}`", self.unit, self.line, self.text)
    }
}

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("{at}: {reason}")]
    Parse { at: Location, reason: String },
    #[error("{at}: {reason}")]
    Segment { at: Location, reason: String },
    #[error("{at}: {reason}")]
    Arity { at: Location, reason: String },
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
    #[error("{0}")]
    Usage(String),
}

impl TranslateError {
    pub fn io(context: impl fmt::Display, source: io::Error) -> Self {
        TranslateError::Io {
            context: context.to_string(),
            source,
        }
    }

    /// Short category name used in diagnostics.
    pub fn category(&self) -> &'static str {
        match self {
            TranslateError::Parse { .. } => "syntax",
            TranslateError::Segment { .. } => "segment",
            TranslateError::Arity { .. } => "arity",
            TranslateError::Io { .. } => "io",
            TranslateError::Usage(_) => "usage",
        }
    }

    pub fn location(&self) -> Option<&Location> {
        match self {
            TranslateError::Parse { at, .. }
            | TranslateError::Segment { at, .. }
            | TranslateError::Arity { at, .. } => Some(at),
            TranslateError::Io { .. } | TranslateError::Usage(_) => None,
        }
    }
}

/// An instruction-level problem that does not yet know its source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Fault {
    Syntax(String),
    Segment(String),
    Arity(String),
}

impl Fault {
    pub(crate) fn reason(&self) -> &str {
        match self {
            Fault::Syntax(reason) | Fault::Segment(reason) | Fault::Arity(reason) => reason,
        }
    }

    pub(crate) fn locate(self, at: Location) -> TranslateError {
        match self {
            Fault::Syntax(reason) => TranslateError::Parse { at, reason },
            Fault::Segment(reason) => TranslateError::Segment { at, reason },
            Fault::Arity(reason) => TranslateError::Arity { at, reason },
        }
    }
}
