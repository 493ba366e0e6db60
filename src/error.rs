use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SieveError {
    // Pattern compilation
    #[error("empty pattern")]
    EmptyPattern,

    #[error("invalid pattern")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    // Traversal
    #[error("cannot list start directory")]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("permission denied")]
    PermissionDenied(PathBuf),

    #[error("IO error")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Middleware
    #[error("middleware failure")]
    Middleware {
        name: String,
        #[source]
        source: MiddlewareError,
    },

    #[error("invalid ignore rules")]
    IgnoreRules {
        path: PathBuf,
        #[source]
        source: ignore::Error,
    },

    // Runtime
    #[error("worker thread failure")]
    Worker(String),
}

impl SieveError {
    /// The path this error occurred at, if applicable.
    /// Callers use this to present "Skipped: <path>" without pattern matching on variants.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::PermissionDenied(p)
            | Self::Root { path: p, .. }
            | Self::Io { path: p, .. }
            | Self::IgnoreRules { path: p, .. } => Some(p),
            _ => None,
        }
    }

    /// Whether a traversal can continue after this error.
    ///
    /// Recoverable errors (permission denied, unreadable subdirectories) are
    /// reported through the skip observer and the walk keeps going.
    ///
    /// Fatal errors (unlistable start directory, bad pattern, middleware
    /// failure) halt the traversal immediately.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::PermissionDenied(_) | Self::Io { .. })
    }
}

/// Raised by a [`Middleware`](crate::Middleware) that cannot judge a record.
///
/// Aborts the traversal that dispatched it and surfaces as
/// [`SieveError::Middleware`] with the middleware's name attached.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct MiddlewareError(String);

impl MiddlewareError {
    /// Create a middleware error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
