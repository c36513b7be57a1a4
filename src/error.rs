//! Application error type.
//!
//! Every fallible operation returns `Result<_, AppError>`. The error carries the
//! process exit code used by `main` plus a human-readable message; `kind()`
//! classifies it for callers that need to react differently to configuration
//! mistakes, integrity violations and unimplemented features.

/// Error classes surfaced by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid request: bad period/level switch, bad date range, empty filter result.
    Config,
    /// File read/write failure.
    Io,
    /// A join or grouping that must be one-to-one was not.
    Integrity,
    /// Declared extension point that has no implementation.
    NotImplemented,
    /// Persistence backend failure.
    Store,
    /// Remote API failure.
    Remote,
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    kind: ErrorKind,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        let kind = match exit_code {
            4 => ErrorKind::Integrity,
            5 => ErrorKind::NotImplemented,
            6 => ErrorKind::Store,
            7 => ErrorKind::Remote,
            _ => ErrorKind::Config,
        };
        Self {
            exit_code,
            kind,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(2, message)
    }

    /// A filter removed every row.
    pub fn empty(message: impl Into<String>) -> Self {
        Self::new(3, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self {
            exit_code: 2,
            kind: ErrorKind::Io,
            message: message.into(),
        }
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        Self::new(4, message)
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::new(5, message)
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::new(6, message)
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self::new(7, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("kind", &self.kind)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::store(format!("SQLite error: {e}"))
    }
}
