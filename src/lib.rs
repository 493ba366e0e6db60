//! # globsieve
//!
//! Glob-driven file finding where every decision is middleware.
//!
//! globsieve walks the filesystem for a glob pattern and runs each entry it
//! meets through an ordered chain of [`Middleware`]. A middleware judges the
//! entry's [`FileRecord`] by marking it included or excluded; marks are never
//! undone, and an entry joins the result set when it ends the chain included
//! and not excluded. The library owns the pattern compiler, the chain, the
//! traversal, and four ways of delivering results. What gets included is the
//! caller's business, expressed as middleware.
//!
//! # Quick Start
//!
//! ```rust
//! use globsieve::finder;
//!
//! # let dir = tempfile::tempdir().unwrap();
//! # std::fs::write(dir.path().join("a.txt"), "").unwrap();
//! # std::fs::write(dir.path().join("b.md"), "").unwrap();
//! # std::fs::create_dir(dir.path().join("sub")).unwrap();
//! # std::fs::write(dir.path().join("sub").join("c.txt"), "").unwrap();
//! // `**` recurses; a plain `*` would stay in the top directory.
//! let records = finder()
//!     .cwd(dir.path())
//!     .exclude("sub/**")?
//!     .read_entries("**/*.txt")?;
//!
//! let paths: Vec<_> = records.iter().map(|r| r.path.display().to_string()).collect();
//! assert_eq!(paths, ["a.txt"]);
//! # Ok::<(), globsieve::SieveError>(())
//! ```
//!
//! # Custom Middleware
//!
//! Any `Fn(&mut FileRecord) -> Result<(), MiddlewareError>` that is
//! `Send + Sync` is a middleware, as is any type implementing [`Middleware`]:
//!
//! ```rust
//! use globsieve::{finder, FileRecord};
//!
//! # let dir = tempfile::tempdir().unwrap();
//! # std::fs::write(dir.path().join("empty.txt"), "").unwrap();
//! # std::fs::write(dir.path().join("full.txt"), "data").unwrap();
//! let records = finder()
//!     .cwd(dir.path())
//!     .use_middleware(|record: &mut FileRecord| {
//!         if record.stat.as_ref().map(|m| m.len() == 0).unwrap_or(false) {
//!             record.mark_excluded();
//!         }
//!         Ok(())
//!     })
//!     .read_entries("*.txt")?;
//!
//! assert_eq!(records.len(), 1);
//! assert_eq!(records[0].segment, "full.txt");
//! # Ok::<(), globsieve::SieveError>(())
//! ```
//!
//! # Execution Modes
//!
//! One traversal algorithm, four deliveries: blocking
//! ([`Finder::read_entries`]), completion callback
//! ([`Finder::read_entries_async`]), incremental stream
//! ([`Finder::read_entries_stream`]), and promise handle
//! ([`Finder::read_entries_promise`]). All four accept the same records in
//! the same order; [`EntryReader`] abstracts over them for code that does
//! not care which it is handed.

#![forbid(unsafe_code)]

mod engine;
mod error;
mod finder;
mod gitignore;
mod middleware;
mod modes;
mod pattern;
mod record;
mod traits;

// ── Public re-exports ─────────────────────────────────────────────────────────

pub use error::{MiddlewareError, SieveError};
pub use finder::{Finder, GlobOptions};
pub use gitignore::Gitignore;
pub use middleware::{dispatch, Exclude, Include};
pub use modes::{ReadPromise, RecordStream};
pub use pattern::{IntoMatcher, Matcher, Pattern};
pub use record::{FileRecord, RecordSnapshot};
pub use traits::{EntryReader, Middleware, ReadCallback};

// ── Entry point ───────────────────────────────────────────────────────────────

/// Create a new [`Finder`] to configure and run traversals.
///
/// # Example
///
/// ```rust
/// # let dir = tempfile::tempdir().unwrap();
/// # std::fs::write(dir.path().join("a.txt"), "").unwrap();
/// # std::fs::write(dir.path().join("b.md"), "").unwrap();
/// let records = globsieve::finder()
///     .cwd(dir.path())
///     .read_entries("*.txt")
///     .unwrap();
///
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0].segment, "a.txt");
/// ```
pub fn finder() -> Finder {
    Finder::default()
}
