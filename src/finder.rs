use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::thread;

use crate::engine::{SkipHandler, WalkContext, walk};
use crate::error::SieveError;
use crate::middleware::{Exclude, Include};
use crate::modes::{ReadPromise, RecordStream};
use crate::pattern::{IntoMatcher, Pattern};
use crate::record::FileRecord;
use crate::traits::{EntryReader, Middleware, ReadCallback};

// ---------------------------------------------------------------------------
// GlobOptions
// ---------------------------------------------------------------------------

/// Construction options for a [`Finder`].
///
/// Usually configured through the finder's chained methods; kept public so
/// options can be built up front and reused across finders.
#[derive(Debug, Clone)]
pub struct GlobOptions {
    /// Match case-sensitively. Defaults to `true`.
    pub case_sensitive: bool,

    /// Let wildcards match a leading `.` in a path segment. Defaults to
    /// `false`: dotfiles are only found by patterns that spell out the dot.
    pub dotfiles: bool,

    /// Record history snapshots on every record during dispatch.
    /// Defaults to `false`.
    pub track: bool,

    /// Explicit recursion override. `None` (the default) derives recursion
    /// from each read pattern: globstar patterns descend, others stay in
    /// the pattern's base directory.
    pub recurse: Option<bool>,

    /// Directory that anchors relative patterns. Defaults to the process
    /// working directory. Record paths stay relative to this anchor.
    pub cwd: Option<PathBuf>,
}

impl Default for GlobOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            dotfiles: false,
            track: false,
            recurse: None,
            cwd: None,
        }
    }
}

impl GlobOptions {
    /// Matching options handed to the glob engine. The separator is always
    /// literal so `*` stays within one path segment and only `**` crosses
    /// directories.
    pub(crate) fn match_options(&self) -> glob::MatchOptions {
        glob::MatchOptions {
            case_sensitive: self.case_sensitive,
            require_literal_separator: true,
            require_literal_leading_dot: !self.dotfiles,
        }
    }
}

// ---------------------------------------------------------------------------
// Finder
// ---------------------------------------------------------------------------

/// Entry point for configuring and executing glob traversals.
///
/// Created via [`globsieve::finder()`](crate::finder()) or
/// [`Finder::with_options`]. Configure with chained methods, register
/// middleware, then call one of the four read operations.
///
/// A finder holds only its options and middleware chain. The read operations
/// take `&self` and build all per-traversal state internally, so one finder
/// (or clones of it) can run any number of traversals, sequentially or from
/// several threads at once.
///
/// # Example
///
/// ```rust,ignore
/// let records = globsieve::finder()
///     .cwd(project_root)
///     .exclude("target/**")?
///     .read_entries("**/*.rs")?;
/// ```
#[derive(Clone, Default)]
pub struct Finder {
    options: GlobOptions,
    chain: Vec<Arc<dyn Middleware>>,
    on_skip: Option<Arc<SkipHandler>>,
}

impl Finder {
    /// Create a finder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a finder from prebuilt options.
    pub fn with_options(options: GlobOptions) -> Self {
        Self {
            options,
            chain: Vec::new(),
            on_skip: None,
        }
    }

    // ── Options ───────────────────────────────────────────────────────────

    /// Match case-sensitively. On by default.
    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.options.case_sensitive = yes;
        self
    }

    /// Let wildcards match a leading `.` in a path segment. Off by default:
    /// dotfiles are only found by patterns that spell out the dot.
    pub fn dotfiles(mut self, yes: bool) -> Self {
        self.options.dotfiles = yes;
        self
    }

    /// Keep a history snapshot on every record before the first middleware
    /// runs and after each one. Off by default.
    pub fn track(mut self, yes: bool) -> Self {
        self.options.track = yes;
        self
    }

    /// Force recursion on or off for every traversal.
    ///
    /// Without an explicit setting, each read call derives recursion from
    /// its pattern: globstar patterns descend into subdirectories, plain
    /// patterns stay in the base directory.
    pub fn recurse(mut self, yes: bool) -> Self {
        self.options.recurse = Some(yes);
        self
    }

    /// Anchor relative patterns at `dir` instead of the process working
    /// directory. Record paths stay relative to the anchor.
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.cwd = Some(dir.into());
        self
    }

    // ── Middleware ────────────────────────────────────────────────────────

    /// Append a middleware to the chain.
    ///
    /// Middleware run in registration order, each seeing any mutation made
    /// by those before it. Plain closures are accepted; see [`Middleware`].
    pub fn use_middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.chain.push(Arc::new(middleware));
        self
    }

    /// Append an [`Include`] middleware for `pattern`.
    ///
    /// # Errors
    ///
    /// Pattern compilation happens at registration, not at read time; a bad
    /// pattern fails here.
    pub fn include(self, pattern: impl IntoMatcher) -> Result<Self, SieveError> {
        let matcher = pattern.into_matcher(&self.options)?;
        Ok(self.use_middleware(Include::new(matcher)))
    }

    /// Append an [`Exclude`] middleware for `pattern`. Exclusion is final:
    /// no later include can rescue an excluded record.
    ///
    /// # Errors
    ///
    /// Same as [`include`](Self::include).
    pub fn exclude(self, pattern: impl IntoMatcher) -> Result<Self, SieveError> {
        let matcher = pattern.into_matcher(&self.options)?;
        Ok(self.use_middleware(Exclude::new(matcher)))
    }

    /// Alias for [`exclude`](Self::exclude).
    pub fn ignore(self, pattern: impl IntoMatcher) -> Result<Self, SieveError> {
        self.exclude(pattern)
    }

    /// Observe directories skipped mid-walk.
    ///
    /// The observer belongs to this finder, not to the process. It is
    /// invoked from whichever thread runs the traversal, once per skipped
    /// directory, with the directory's path and the error behind the skip.
    pub fn on_skip(
        mut self,
        observer: impl Fn(&Path, &SieveError) + Send + Sync + 'static,
    ) -> Self {
        self.on_skip = Some(Arc::new(observer));
        self
    }

    // ── Read operations ───────────────────────────────────────────────────

    /// Walk `pattern` and return every accepted record, blocking until the
    /// traversal completes.
    ///
    /// # Errors
    ///
    /// Bad patterns, an unlistable start directory, and middleware failures
    /// end the traversal with `Err`. Unreadable subdirectories below the
    /// start do not: they are skipped and reported to the skip observer.
    pub fn read_entries(&self, pattern: &str) -> Result<Vec<FileRecord>, SieveError> {
        let ctx = self.context(pattern)?;
        let mut records = Vec::new();
        walk(&ctx, &mut |record| {
            records.push(record);
            true
        })?;
        Ok(records)
    }

    /// Walk `pattern` on a worker thread and hand the outcome to `callback`.
    ///
    /// The callback runs exactly once, on the worker thread, with either the
    /// full record sequence or the error that ended the traversal.
    pub fn read_entries_async<F>(&self, pattern: &str, callback: F)
    where
        F: FnOnce(Result<Vec<FileRecord>, SieveError>) + Send + 'static,
    {
        let finder = self.clone();
        let pattern = pattern.to_string();
        thread::spawn(move || callback(finder.read_entries(&pattern)));
    }

    /// Walk `pattern` on a worker thread, yielding records as they are
    /// accepted.
    ///
    /// Errors arrive in-band: the stream yields at most one `Err` and then
    /// fuses. Dropping the stream cancels the traversal.
    pub fn read_entries_stream(&self, pattern: &str) -> RecordStream {
        let (tx, rx) = mpsc::channel();
        let finder = self.clone();
        let pattern = pattern.to_string();
        thread::spawn(move || {
            let ctx = match finder.context(&pattern) {
                Ok(ctx) => ctx,
                Err(e) => {
                    let _ = tx.send(Err(e));
                    return;
                }
            };
            // A failed send means the stream was dropped; the sink refuses
            // the record and walk() winds down.
            let result = walk(&ctx, &mut |record| tx.send(Ok(record)).is_ok());
            if let Err(e) = result {
                let _ = tx.send(Err(e));
            }
        });
        RecordStream::new(rx)
    }

    /// Walk `pattern` on a worker thread and return a promise that resolves
    /// exactly once with the outcome.
    pub fn read_entries_promise(&self, pattern: &str) -> ReadPromise {
        let (tx, rx) = mpsc::channel();
        let finder = self.clone();
        let pattern = pattern.to_string();
        thread::spawn(move || {
            let _ = tx.send(finder.read_entries(&pattern));
        });
        ReadPromise::new(rx)
    }

    // ── Per-call context ──────────────────────────────────────────────────

    /// Compile `pattern` and assemble the state for one traversal: a chain
    /// copy with the implicit include appended last, the recursion decision,
    /// and the resolved start directory.
    fn context(&self, pattern: &str) -> Result<WalkContext, SieveError> {
        let pattern = Pattern::compile(pattern, &self.options)?;

        let mut chain = self.chain.clone();
        chain.push(Arc::new(Include::new(pattern.matcher().clone())));

        let recurse = self.options.recurse.unwrap_or(pattern.is_globstar());

        let base = pattern.base();
        let prefix = if base == Path::new(".") {
            PathBuf::new()
        } else {
            base.to_path_buf()
        };
        let start = match &self.options.cwd {
            Some(cwd) if !base.is_absolute() => {
                if base == Path::new(".") {
                    cwd.clone()
                } else {
                    cwd.join(base)
                }
            }
            _ => base.to_path_buf(),
        };

        Ok(WalkContext {
            pattern,
            start,
            prefix,
            recurse,
            track: self.options.track,
            chain,
            on_skip: self.on_skip.clone(),
        })
    }
}

impl fmt::Debug for Finder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Finder")
            .field("options", &self.options)
            .field("middleware", &self.chain.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// EntryReader for Finder
// ---------------------------------------------------------------------------

impl EntryReader for Finder {
    fn read_entries(&self, pattern: &str) -> Result<Vec<FileRecord>, SieveError> {
        Finder::read_entries(self, pattern)
    }

    fn read_entries_async(&self, pattern: &str, callback: ReadCallback) {
        Finder::read_entries_async(self, pattern, callback)
    }

    fn read_entries_stream(&self, pattern: &str) -> RecordStream {
        Finder::read_entries_stream(self, pattern)
    }

    fn read_entries_promise(&self, pattern: &str) -> ReadPromise {
        Finder::read_entries_promise(self, pattern)
    }
}
