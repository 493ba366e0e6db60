use std::path::Path;

use ignore::gitignore::GitignoreBuilder;

use crate::error::{MiddlewareError, SieveError};
use crate::record::FileRecord;
use crate::traits::Middleware;

/// Middleware that excludes records matched by a directory's `.gitignore`.
///
/// Rules are compiled once at construction. A record is excluded when its
/// path, or any of its parent directories, matches an ignore rule, so a rule
/// like `target/` takes out everything beneath `target` even though each
/// child is judged individually.
///
/// A missing `.gitignore` is not an error; the middleware then excludes
/// nothing.
///
/// # Example
///
/// ```rust
/// use globsieve::{finder, Gitignore};
///
/// # let dir = tempfile::tempdir().unwrap();
/// # std::fs::write(dir.path().join(".gitignore"), "*.log\n").unwrap();
/// # std::fs::write(dir.path().join("build.log"), "").unwrap();
/// # std::fs::write(dir.path().join("main.rs"), "").unwrap();
/// let records = finder()
///     .cwd(dir.path())
///     .use_middleware(Gitignore::from_dir(dir.path())?)
///     .read_entries("*")?;
///
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0].segment, "main.rs");
/// # Ok::<(), globsieve::SieveError>(())
/// ```
pub struct Gitignore {
    rules: ignore::gitignore::Gitignore,
}

impl Gitignore {
    /// Load `<root>/.gitignore` and build the exclusion rules.
    ///
    /// # Errors
    ///
    /// [`SieveError::IgnoreRules`] when the file exists but cannot be read
    /// or contains rules that do not compile.
    pub fn from_dir(root: impl AsRef<Path>) -> Result<Self, SieveError> {
        let root = root.as_ref();
        let file = root.join(".gitignore");

        let mut builder = GitignoreBuilder::new(root);
        if file.exists() {
            if let Some(source) = builder.add(&file) {
                return Err(SieveError::IgnoreRules {
                    path: file.clone(),
                    source,
                });
            }
        }
        let rules = builder
            .build()
            .map_err(|source| SieveError::IgnoreRules { path: file, source })?;

        Ok(Self { rules })
    }
}

impl Middleware for Gitignore {
    fn apply(&self, record: &mut FileRecord) -> Result<(), MiddlewareError> {
        // Rule matching accepts relative paths and absolute paths under the
        // rule root; anything else is out of this ignore file's scope.
        if record.path.has_root() && !record.path.starts_with(self.rules.path()) {
            return Ok(());
        }

        let is_dir = record.stat.as_ref().map(|m| m.is_dir()).unwrap_or(false);
        if self
            .rules
            .matched_path_or_any_parents(&record.path, is_dir)
            .is_ignore()
        {
            record.mark_excluded();
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "gitignore"
    }
}
