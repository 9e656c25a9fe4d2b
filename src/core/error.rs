//! Purpose: Shared error type for roster storage, sync, and CLI surfaces.
//! Exports: `Error`, `ErrorKind`, `to_exit_code`.
//! Role: Single taxonomy; every fallible operation returns this type.
//! Invariants: Errors carry user-visible text and never panic the process.
//! Invariants: Exit-code mapping is stable across releases.

use std::error::Error as StdError;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Session bootstrap failed; fatal to the ready signal only.
    AuthInit,
    /// A read exhausted its retries, or a mutation call failed.
    Network,
    /// Required fields missing on save; blocks submission before any backend call.
    Validation,
    Usage,
    Busy,
    NotFound,
    Corrupt,
    Io,
    Internal,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    hint: Option<String>,
    operation: Option<String>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            hint: None,
            operation: None,
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn operation(&self) -> Option<&str> {
        self.operation.as_deref()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Name the backend operation that failed (`read`, `add`, `update`, `delete`).
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(operation) = &self.operation {
            write!(f, " (operation: {operation})")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Usage => 2,
        ErrorKind::NotFound => 3,
        ErrorKind::Validation => 4,
        ErrorKind::Busy => 5,
        ErrorKind::AuthInit => 6,
        ErrorKind::Network => 7,
        ErrorKind::Corrupt => 8,
        ErrorKind::Io => 9,
    }
}
