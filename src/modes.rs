use std::sync::mpsc::Receiver;

use crate::error::SieveError;
use crate::record::FileRecord;

/// Incremental delivery of accepted records, fed by a worker thread.
///
/// Returned by [`Finder::read_entries_stream`](crate::Finder::read_entries_stream).
/// Records arrive in traversal order as they are accepted, without waiting
/// for the walk to finish. At most one `Err` is ever yielded; after it the
/// stream is fused and only returns `None`.
///
/// Dropping the stream cancels the traversal: the worker notices its next
/// send failing and stops listing directories.
pub struct RecordStream {
    rx: Receiver<Result<FileRecord, SieveError>>,
    done: bool,
}

impl RecordStream {
    pub(crate) fn new(rx: Receiver<Result<FileRecord, SieveError>>) -> Self {
        Self { rx, done: false }
    }
}

impl Iterator for RecordStream {
    type Item = Result<FileRecord, SieveError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.rx.recv() {
            Ok(Ok(record)) => Some(Ok(record)),
            Ok(Err(e)) => {
                self.done = true;
                Some(Err(e))
            }
            // Worker finished and dropped its sender.
            Err(_) => {
                self.done = true;
                None
            }
        }
    }
}

/// Deferred result of a traversal running on a worker thread.
///
/// Returned by [`Finder::read_entries_promise`](crate::Finder::read_entries_promise).
/// The traversal starts immediately; [`wait`](Self::wait) joins it and
/// resolves exactly once, with either every accepted record or the error
/// that ended the walk.
pub struct ReadPromise {
    rx: Receiver<Result<Vec<FileRecord>, SieveError>>,
}

impl ReadPromise {
    pub(crate) fn new(rx: Receiver<Result<Vec<FileRecord>, SieveError>>) -> Self {
        Self { rx }
    }

    /// Block until the traversal resolves and return its outcome.
    pub fn wait(self) -> Result<Vec<FileRecord>, SieveError> {
        self.rx
            .recv()
            .unwrap_or_else(|_| Err(SieveError::Worker("traversal worker disconnected".into())))
    }
}
