use crate::error::{MiddlewareError, SieveError};
use crate::modes::{ReadPromise, RecordStream};
use crate::record::FileRecord;

/// A decision step in the finder's chain.
///
/// Every record produced by a traversal is handed to each registered
/// middleware in registration order. A middleware judges the record by
/// calling [`FileRecord::mark_included`] or [`FileRecord::mark_excluded`],
/// or passes it through untouched. The whole chain always runs; there is no
/// short-circuiting, so later middleware see every record too.
///
/// Plain closures work as middleware: any
/// `Fn(&mut FileRecord) -> Result<(), MiddlewareError>` that is `Send + Sync`
/// gets a blanket implementation.
///
/// # Thread Safety
///
/// `Send + Sync` are required. The chain is shared with worker threads by the
/// callback, stream, and promise read operations.
///
/// # Errors
///
/// Returning `Err` aborts the traversal that dispatched the record; the
/// error surfaces to the caller as [`SieveError::Middleware`] with this
/// middleware's [`name`](Self::name) attached.
///
/// # Example
///
/// ```rust
/// use globsieve::{FileRecord, Middleware, MiddlewareError};
///
/// /// Excludes entries larger than a byte threshold.
/// struct LargeFiles(u64);
///
/// impl Middleware for LargeFiles {
///     fn apply(&self, record: &mut FileRecord) -> Result<(), MiddlewareError> {
///         if record.stat.as_ref().map(|m| m.len() > self.0).unwrap_or(false) {
///             record.mark_excluded();
///         }
///         Ok(())
///     }
///
///     fn name(&self) -> &str {
///         "large-files"
///     }
/// }
/// ```
pub trait Middleware: Send + Sync {
    /// Judge one record, mutating it in place.
    fn apply(&self, record: &mut FileRecord) -> Result<(), MiddlewareError>;

    /// Name used in diagnostics and error messages.
    fn name(&self) -> &str {
        "anonymous"
    }
}

impl<F> Middleware for F
where
    F: Fn(&mut FileRecord) -> Result<(), MiddlewareError> + Send + Sync,
{
    fn apply(&self, record: &mut FileRecord) -> Result<(), MiddlewareError> {
        (self)(record)
    }
}

/// Boxed completion callback for [`EntryReader::read_entries_async`].
///
/// Invoked exactly once, with either the full record sequence or the error
/// that ended the traversal.
pub type ReadCallback = Box<dyn FnOnce(Result<Vec<FileRecord>, SieveError>) + Send + 'static>;

/// The read capabilities of a finder, as a trait.
///
/// All four execution modes share one traversal algorithm and accept the same
/// records; they differ only in how results are delivered. The set is fixed:
/// extending a reader means wrapping one in your own type and delegating,
/// not adding methods at runtime.
///
/// # Object Safety
///
/// `EntryReader` is object-safe. Code that does not care which delivery mode
/// it is handed can take `&dyn EntryReader`; the callback mode takes a boxed
/// [`ReadCallback`] for that reason, where [`Finder`](crate::Finder)'s
/// inherent method accepts any `FnOnce`.
///
/// # Example
///
/// ```rust
/// use globsieve::{finder, EntryReader};
///
/// fn count_sources(reader: &dyn EntryReader) -> usize {
///     reader.read_entries("*.rs").map(|r| r.len()).unwrap_or(0)
/// }
///
/// let host = finder();
/// let _ = count_sources(&host);
/// ```
pub trait EntryReader: Send + Sync {
    /// Walk `pattern` and return the accepted records, blocking until done.
    fn read_entries(&self, pattern: &str) -> Result<Vec<FileRecord>, SieveError>;

    /// Walk `pattern` on a worker thread and deliver the outcome to
    /// `callback`, which runs exactly once.
    fn read_entries_async(&self, pattern: &str, callback: ReadCallback);

    /// Walk `pattern` on a worker thread, yielding records as they are
    /// accepted. Dropping the stream cancels the traversal.
    fn read_entries_stream(&self, pattern: &str) -> RecordStream;

    /// Walk `pattern` on a worker thread and return a handle that resolves
    /// once, with all accepted records or the error.
    fn read_entries_promise(&self, pattern: &str) -> ReadPromise;
}
