//! Error type shared by all crates in the workspace.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use std::fmt;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

/// Broad category of an error.
///
/// Operators never retry or recover locally. The kind only exists so that
/// callers (and tests) can tell why a query stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Operator setup failed, the operator can never run.
    Initialization,
    /// Memory for a batch could not be reserved.
    AllocationFailure,
    /// Query was canceled while executing.
    Cancelled,
    /// Everything else.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initialization => write!(f, "Initialization"),
            Self::AllocationFailure => write!(f, "Allocation failure"),
            Self::Cancelled => write!(f, "Cancelled"),
            Self::Internal => write!(f, "Internal"),
        }
    }
}

/// A key/value pair attached to an error for additional context.
#[derive(Debug)]
struct ErrorField {
    key: String,
    value: String,
}

#[derive(Debug)]
struct DbErrorInner {
    kind: ErrorKind,
    msg: String,
    source: Option<Box<dyn Error + Send + Sync>>,
    fields: Vec<ErrorField>,
    backtrace: Backtrace,
}

/// The error type used everywhere.
///
/// Boxed to keep `Result<T>` small on the happy path.
pub struct DbError {
    inner: Box<DbErrorInner>,
}

impl DbError {
    /// Create a new internal error with the given message.
    pub fn new(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Internal, msg)
    }

    pub fn with_kind(kind: ErrorKind, msg: impl Into<String>) -> Self {
        DbError {
            inner: Box::new(DbErrorInner {
                kind,
                msg: msg.into(),
                source: None,
                fields: Vec::new(),
                backtrace: Backtrace::capture(),
            }),
        }
    }

    /// Create an error indicating an operator could not be set up.
    pub fn initialization(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Initialization, msg)
    }

    /// Create an error indicating a failed memory reservation.
    pub fn allocation(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::AllocationFailure, msg)
    }

    /// Create an error indicating the query was canceled.
    pub fn cancelled() -> Self {
        Self::with_kind(ErrorKind::Cancelled, "Query canceled")
    }

    pub fn with_source(
        kind: ErrorKind,
        msg: impl Into<String>,
        source: Box<dyn Error + Send + Sync>,
    ) -> Self {
        let mut err = Self::with_kind(kind, msg);
        err.inner.source = Some(source);
        err
    }

    /// Attach an additional field to the error.
    pub fn with_field(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.inner.fields.push(ErrorField {
            key: key.into(),
            value: value.to_string(),
        });
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.inner.kind
    }

    pub fn get_msg(&self) -> &str {
        self.inner.msg.as_str()
    }

    pub fn get_backtrace(&self) -> Option<&Backtrace> {
        match self.inner.backtrace.status() {
            BacktraceStatus::Captured => Some(&self.inner.backtrace),
            _ => None,
        }
    }

    /// Get the value for a field with the given key, if it exists.
    pub fn get_field(&self, key: &str) -> Option<&str> {
        self.inner
            .fields
            .iter()
            .find(|f| f.key == key)
            .map(|f| f.value.as_str())
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.msg)?;

        if !self.inner.fields.is_empty() {
            write!(f, " (")?;
            for (idx, field) in self.inner.fields.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: {}", field.key, field.value)?;
            }
            write!(f, ")")?;
        }

        if let Some(source) = &self.inner.source {
            write!(f, "\nError source: {source}")?;
        }

        if let Some(bt) = self.get_backtrace() {
            write!(f, "\nBacktrace: {bt}")?;
        }

        Ok(())
    }
}

impl fmt::Debug for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Display is more useful in test failures.
        write!(f, "{} error: {self}", self.inner.kind)
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.inner.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl From<fmt::Error> for DbError {
    fn from(value: fmt::Error) -> Self {
        DbError::with_source(ErrorKind::Internal, "Format error", Box::new(value))
    }
}

impl From<std::collections::TryReserveError> for DbError {
    fn from(value: std::collections::TryReserveError) -> Self {
        DbError::with_source(
            ErrorKind::AllocationFailure,
            "Failed to reserve memory",
            Box::new(value),
        )
    }
}

/// Extension for converting an Option into a Result.
pub trait OptionExt<T> {
    /// Return an error if the option is None, naming what was required.
    fn required(self, what: &'static str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn required(self, what: &'static str) -> Result<T> {
        match self {
            Some(v) => Ok(v),
            None => Err(DbError::new(format!("Missing required value: {what}"))),
        }
    }
}

/// Extension for attaching context to arbitrary errors.
pub trait ResultExt<T, E> {
    /// Wrap an error with a static message.
    fn context(self, msg: &'static str) -> Result<T>;
}

impl<T, E: Error + Send + Sync + 'static> ResultExt<T, E> for std::result::Result<T, E> {
    fn context(self, msg: &'static str) -> Result<T> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(DbError::with_source(
                ErrorKind::Internal,
                msg,
                Box::new(e),
            )),
        }
    }
}
