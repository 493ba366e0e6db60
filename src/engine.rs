use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};

use crate::error::SieveError;
use crate::middleware::dispatch;
use crate::pattern::Pattern;
use crate::record::FileRecord;
use crate::traits::Middleware;

// ---------------------------------------------------------------------------
// WalkContext
// ---------------------------------------------------------------------------

/// Per-traversal observer for directories skipped mid-walk.
pub(crate) type SkipHandler = dyn Fn(&Path, &SieveError) + Send + Sync;

/// Everything one traversal needs, assembled fresh per read call.
///
/// The finder itself holds only configuration and the middleware chain.
/// Each read call builds its own context, with the implicit include appended
/// to a copy of the chain, so one finder can serve any number of concurrent
/// traversals without shared mutable state.
pub(crate) struct WalkContext {
    /// Compiled read pattern.
    pub pattern: Pattern,

    /// Filesystem directory where listing starts.
    pub start: PathBuf,

    /// Prefix candidate paths are built under. Empty when the pattern's
    /// base defaulted to `.`, so top-level candidates come out bare.
    pub prefix: PathBuf,

    /// Recursion decision, computed once per traversal.
    pub recurse: bool,

    /// Whether dispatch records history snapshots.
    pub track: bool,

    /// User middleware plus the implicit include, in dispatch order.
    pub chain: Vec<Arc<dyn Middleware>>,

    /// Observer invoked once per skipped directory.
    pub on_skip: Option<Arc<SkipHandler>>,
}

// ---------------------------------------------------------------------------
// walk()
// ---------------------------------------------------------------------------

/// Execute one traversal, pushing accepted records into `sink`.
///
/// Depth-first: each entry is judged before its children are visited, and
/// entries appear in directory listing order. The sink returning `false`
/// cancels the walk; the stream mode uses this to stop listing when its
/// consumer goes away.
///
/// # Errors
///
/// An unlistable start directory is fatal. Subdirectories that fail to list
/// mid-walk are skipped instead: reported to the skip observer, logged, and
/// the walk continues with their siblings.
pub(crate) fn walk(
    ctx: &WalkContext,
    sink: &mut dyn FnMut(FileRecord) -> bool,
) -> Result<(), SieveError> {
    debug!(
        "walking {} (pattern: {}, recurse: {})",
        ctx.start.display(),
        ctx.pattern.raw(),
        ctx.recurse
    );

    let entries = list_dir(&ctx.start).map_err(|source| SieveError::Root {
        path: ctx.start.clone(),
        source,
    })?;

    descend(ctx, entries, &ctx.prefix, sink)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Depth-first descent
// ---------------------------------------------------------------------------

/// Visit one directory's entries in listing order, recursing into each
/// subdirectory immediately after judging it.
///
/// Returns `Ok(false)` when the sink cancelled the walk.
fn descend(
    ctx: &WalkContext,
    entries: Vec<fs::DirEntry>,
    dir: &Path,
    sink: &mut dyn FnMut(FileRecord) -> bool,
) -> Result<bool, SieveError> {
    for entry in entries {
        let name = entry.file_name();
        let path = if dir.as_os_str().is_empty() {
            PathBuf::from(&name)
        } else {
            dir.join(&name)
        };

        // DirEntry::metadata does not traverse symlinks, so a symlink to a
        // directory becomes a record but never a descent target.
        let stat = entry.metadata().ok();
        let is_dir = stat.as_ref().map(|m| m.is_dir()).unwrap_or(false);

        let mut record = FileRecord::new(path.clone(), stat);
        dispatch(&mut record, &ctx.chain, ctx.track)?;
        if record.accepted() && !sink(record) {
            return Ok(false);
        }

        if is_dir && ctx.recurse {
            match list_dir(&entry.path()) {
                Ok(children) => {
                    if !descend(ctx, children, &path, sink)? {
                        return Ok(false);
                    }
                }
                Err(e) => skip(ctx, entry.path(), e),
            }
        }
    }
    Ok(true)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// List a directory eagerly, preserving the order the OS returns.
fn list_dir(dir: &Path) -> io::Result<Vec<fs::DirEntry>> {
    fs::read_dir(dir)?.collect()
}

/// Report a subdirectory that could not be listed and keep walking.
fn skip(ctx: &WalkContext, path: PathBuf, source: io::Error) {
    warn!("skipping {}: {}", path.display(), source);

    let err = if source.kind() == io::ErrorKind::PermissionDenied {
        SieveError::PermissionDenied(path.clone())
    } else {
        SieveError::Io {
            path: path.clone(),
            source,
        }
    };
    if let Some(handler) = ctx.on_skip.as_deref() {
        handler(&path, &err);
    }
}
