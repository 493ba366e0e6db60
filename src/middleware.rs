use std::sync::Arc;

use crate::error::{MiddlewareError, SieveError};
use crate::pattern::Matcher;
use crate::record::FileRecord;
use crate::traits::Middleware;

// ---------------------------------------------------------------------------
// Built-in middleware
// ---------------------------------------------------------------------------

/// Marks records whose path matches a pattern as included.
///
/// Registered via [`Finder::include`](crate::Finder::include). The finder
/// also appends one of these per read call, compiled from the read pattern,
/// after all user middleware.
pub struct Include {
    matcher: Matcher,
}

impl Include {
    /// Include records matching `matcher`.
    pub fn new(matcher: Matcher) -> Self {
        Self { matcher }
    }
}

impl Middleware for Include {
    fn apply(&self, record: &mut FileRecord) -> Result<(), MiddlewareError> {
        if self.matcher.is_match(&record.path) {
            record.mark_included();
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "include"
    }
}

/// Marks records whose path matches a pattern as excluded.
///
/// Registered via [`Finder::exclude`](crate::Finder::exclude) or its alias
/// [`Finder::ignore`](crate::Finder::ignore). Exclusion is final: a record
/// excluded here is rejected no matter how many middleware include it.
pub struct Exclude {
    matcher: Matcher,
}

impl Exclude {
    /// Exclude records matching `matcher`.
    pub fn new(matcher: Matcher) -> Self {
        Self { matcher }
    }
}

impl Middleware for Exclude {
    fn apply(&self, record: &mut FileRecord) -> Result<(), MiddlewareError> {
        if self.matcher.is_match(&record.path) {
            record.mark_excluded();
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "exclude"
    }
}

// ---------------------------------------------------------------------------
// dispatch()
// ---------------------------------------------------------------------------

/// Run `record` through `chain` in registration order.
///
/// Every middleware runs; a record already judged still flows through the
/// rest of the chain. With `track` set, the record's state is snapshotted
/// before the first middleware and after each one, leaving `chain.len() + 1`
/// history entries. With `track` unset, no history is kept at all.
///
/// # Errors
///
/// The first middleware to return `Err` ends the dispatch; the error is
/// wrapped in [`SieveError::Middleware`] together with the middleware's name.
pub fn dispatch(
    record: &mut FileRecord,
    chain: &[Arc<dyn Middleware>],
    track: bool,
) -> Result<(), SieveError> {
    for middleware in chain {
        if track {
            record.push_snapshot();
        }
        middleware
            .apply(record)
            .map_err(|source| SieveError::Middleware {
                name: middleware.name().to_string(),
                source,
            })?;
    }
    if track {
        record.push_snapshot();
    }
    Ok(())
}
