use std::path::PathBuf;

/// A single filesystem entry flowing through the middleware chain.
///
/// Records are created by the traversal engine, one per directory entry, and
/// handed to every registered middleware in order. Middleware judge a record
/// by setting its inclusion flags; they may also rewrite `path`, `dirname`,
/// or `segment` before later middleware see it.
///
/// The flags are write-once by construction: [`mark_included`](Self::mark_included)
/// and [`mark_excluded`](Self::mark_excluded) are the only setters and neither
/// can be undone. A record is part of the result set when it ends the chain
/// included and not excluded, which [`accepted`](Self::accepted) reports.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// Path of the entry, relative to the traversal's anchor directory.
    /// Absolute when the pattern itself was absolute.
    pub path: PathBuf,

    /// Directory portion of `path`. `"."` for top-level entries.
    pub dirname: PathBuf,

    /// Final path segment, the entry's own name.
    pub segment: String,

    /// Filesystem metadata for the entry itself; symlinks are not followed.
    /// `None` when the stat call failed; the record still runs the chain.
    pub stat: Option<std::fs::Metadata>,

    include: bool,
    exclude: bool,
    history: Vec<RecordSnapshot>,
}

impl FileRecord {
    /// Build a record for `path`, deriving `dirname` and `segment` from it.
    pub fn new(path: impl Into<PathBuf>, stat: Option<std::fs::Metadata>) -> Self {
        let path = path.into();
        let dirname = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let segment = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            dirname,
            segment,
            stat,
            include: false,
            exclude: false,
            history: Vec::new(),
        }
    }

    /// Mark this record as included. Cannot be undone.
    pub fn mark_included(&mut self) {
        self.include = true;
    }

    /// Mark this record as excluded. Cannot be undone, and a record that is
    /// both included and excluded is rejected: exclusion always wins.
    pub fn mark_excluded(&mut self) {
        self.exclude = true;
    }

    /// Whether some middleware has marked this record included.
    pub fn is_included(&self) -> bool {
        self.include
    }

    /// Whether some middleware has marked this record excluded.
    pub fn is_excluded(&self) -> bool {
        self.exclude
    }

    /// Whether this record belongs in the result set: included and not excluded.
    pub fn accepted(&self) -> bool {
        self.include && !self.exclude
    }

    /// Snapshots taken during dispatch, oldest first.
    ///
    /// Empty unless tracking was enabled on the finder. With tracking on, a
    /// chain of `n` middleware leaves `n + 1` snapshots: the state before the
    /// first middleware ran and the state after each one.
    pub fn history(&self) -> &[RecordSnapshot] {
        &self.history
    }

    /// Append the record's current state to its history.
    /// The history itself is not part of the snapshot.
    pub(crate) fn push_snapshot(&mut self) {
        self.history.push(RecordSnapshot {
            path: self.path.clone(),
            dirname: self.dirname.clone(),
            segment: self.segment.clone(),
            stat: self.stat.clone(),
            include: self.include,
            exclude: self.exclude,
        });
    }
}

/// A point-in-time copy of a [`FileRecord`], minus its history.
#[derive(Debug, Clone)]
pub struct RecordSnapshot {
    /// `path` at snapshot time.
    pub path: PathBuf,

    /// `dirname` at snapshot time.
    pub dirname: PathBuf,

    /// `segment` at snapshot time.
    pub segment: String,

    /// `stat` at snapshot time.
    pub stat: Option<std::fs::Metadata>,

    /// Include flag at snapshot time.
    pub include: bool,

    /// Exclude flag at snapshot time.
    pub exclude: bool,
}
