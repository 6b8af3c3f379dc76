//! Crate-wide error type.

use std::fmt;

/// What went wrong, at the level a caller can branch on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A sketch construction parameter is invalid.
    InvalidConfig,
    /// Two sketches with differing configurations were asked to merge.
    IncompatibleSketch,
    /// Serialized sketch data is malformed.
    MalformedData,
    /// A file-system operation failed during save or load.
    Io,
    /// A worker callback failed during a parallel ingest session.
    WorkerFailed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::InvalidConfig => "invalid configuration",
            ErrorKind::IncompatibleSketch => "incompatible sketch",
            ErrorKind::MalformedData => "malformed data",
            ErrorKind::Io => "io failure",
            ErrorKind::WorkerFailed => "worker failed",
        })
    }
}

/// The error carried by every fallible operation in this crate.
///
/// An [`ErrorKind`] classifies the failure, a message says what happened,
/// and optional `key=value` context pairs pin down where (a file path, the
/// two configs of a rejected merge). Context renders after the message:
///
/// ```
/// # use streamsketch::error::{Error, ErrorKind};
/// let err = Error::new(ErrorKind::Io, "disk full").with_context("path", "/tmp/x");
/// assert_eq!(err.kind(), ErrorKind::Io);
/// assert_eq!(err.to_string(), "io failure: disk full; path=/tmp/x");
/// ```
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    context: Vec<(&'static str, String)>,
}

impl Error {
    /// Builds an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: Vec::new(),
        }
    }

    /// Attaches a `key=value` pair to the error's rendered output.
    pub fn with_context(mut self, key: &'static str, value: impl ToString) -> Self {
        self.context.push((key, value.to_string()));
        self
    }

    /// The failure category.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The human-readable description, without kind or context.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

// Shorthand constructors used across the sketch modules
impl Error {
    pub(crate) fn invalid_config(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidConfig, msg)
    }

    pub(crate) fn incompatible(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::IncompatibleSketch, msg)
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedData, msg)
    }

    pub(crate) fn insufficient_data(field: &'static str) -> Self {
        Self::malformed(format!("insufficient data: {field}"))
    }

    pub(crate) fn io(op: &'static str, err: std::io::Error) -> Self {
        Self::new(ErrorKind::Io, format!("{op} failed: {err}"))
    }

    pub(crate) fn worker(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::WorkerFailed, msg)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.kind, f)?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        for (key, value) in &self.context {
            write!(f, "; {key}={value}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_without_context() {
        let err = Error::invalid_config("width must be greater than 0");
        assert_eq!(
            err.to_string(),
            "invalid configuration: width must be greater than 0"
        );
    }

    #[test]
    fn test_display_renders_context_in_order() {
        let err = Error::incompatible("p differs")
            .with_context("self", 14)
            .with_context("other", 12);
        assert_eq!(
            err.to_string(),
            "incompatible sketch: p differs; self=14; other=12"
        );
    }
}
