use std::path::{Path, PathBuf};

use crate::error::SieveError;
use crate::finder::GlobOptions;

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

/// A compiled predicate over candidate paths.
///
/// Built from a glob expression or a precompiled [`regex::Regex`] via
/// [`IntoMatcher`]. Glob matching treats `/` as a literal separator, so `*`
/// stays within one path segment and only `**` crosses directories.
///
/// A glob expression containing no separator also matches against the final
/// segment of the candidate, so `*.txt` still finds `sub/c.txt` when the
/// traversal descends into `sub`.
#[derive(Debug, Clone)]
pub struct Matcher {
    kind: MatcherKind,
}

#[derive(Debug, Clone)]
enum MatcherKind {
    Glob {
        pattern: glob::Pattern,
        options: glob::MatchOptions,
        match_base: bool,
    },
    Regex(regex::Regex),
}

impl Matcher {
    fn glob(expr: &str, options: glob::MatchOptions) -> Result<Self, SieveError> {
        let pattern = glob::Pattern::new(expr).map_err(|source| SieveError::Pattern {
            pattern: expr.to_string(),
            source,
        })?;
        Ok(Self::from_glob(pattern, options))
    }

    fn from_glob(pattern: glob::Pattern, options: glob::MatchOptions) -> Self {
        let match_base = !pattern.as_str().contains('/');
        Self {
            kind: MatcherKind::Glob {
                pattern,
                options,
                match_base,
            },
        }
    }

    fn regex(pattern: regex::Regex) -> Self {
        Self {
            kind: MatcherKind::Regex(pattern),
        }
    }

    /// Returns `true` if `path` satisfies this predicate.
    ///
    /// Paths that are not valid UTF-8 never match, mirroring the behavior
    /// of [`glob::Pattern::matches_path`].
    pub fn is_match(&self, path: &Path) -> bool {
        match &self.kind {
            MatcherKind::Glob {
                pattern,
                options,
                match_base,
            } => {
                if pattern.matches_path_with(path, *options) {
                    return true;
                }
                *match_base
                    && path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .map(|n| pattern.matches_with(n, *options))
                        .unwrap_or(false)
            }
            MatcherKind::Regex(re) => path.to_str().map(|p| re.is_match(p)).unwrap_or(false),
        }
    }
}

// ---------------------------------------------------------------------------
// IntoMatcher
// ---------------------------------------------------------------------------

/// Conversion into a [`Matcher`], accepted wherever a pattern is expected.
///
/// Implemented for glob expressions (`&str`, `String`, [`glob::Pattern`]) and
/// for [`regex::Regex`]. Glob conversions compile against the finder's
/// matching options and can fail; regex conversions never fail because the
/// expression was already compiled.
pub trait IntoMatcher {
    /// Convert `self` into a matcher using the finder's options.
    fn into_matcher(self, options: &GlobOptions) -> Result<Matcher, SieveError>;
}

impl IntoMatcher for &str {
    fn into_matcher(self, options: &GlobOptions) -> Result<Matcher, SieveError> {
        if self.is_empty() {
            return Err(SieveError::EmptyPattern);
        }
        Matcher::glob(normalize(self), options.match_options())
    }
}

impl IntoMatcher for String {
    fn into_matcher(self, options: &GlobOptions) -> Result<Matcher, SieveError> {
        self.as_str().into_matcher(options)
    }
}

impl IntoMatcher for glob::Pattern {
    fn into_matcher(self, options: &GlobOptions) -> Result<Matcher, SieveError> {
        Ok(Matcher::from_glob(self, options.match_options()))
    }
}

impl IntoMatcher for regex::Regex {
    fn into_matcher(self, _options: &GlobOptions) -> Result<Matcher, SieveError> {
        Ok(Matcher::regex(self))
    }
}

impl IntoMatcher for Matcher {
    fn into_matcher(self, _options: &GlobOptions) -> Result<Matcher, SieveError> {
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// Pattern
// ---------------------------------------------------------------------------

/// A compiled glob pattern: where to start walking and what to accept.
///
/// Compilation splits the expression into a literal base directory (the
/// longest wildcard-free prefix, where traversal starts) and a [`Matcher`]
/// applied to every candidate path. Whether the expression contains a
/// globstar decides the default recursion behavior.
///
/// # Example
///
/// ```rust
/// use std::path::Path;
/// use globsieve::{GlobOptions, Pattern};
///
/// let p = Pattern::compile("src/**/*.rs", &GlobOptions::default()).unwrap();
/// assert_eq!(p.base(), Path::new("src"));
/// assert!(p.is_globstar());
///
/// let p = Pattern::compile("*.rs", &GlobOptions::default()).unwrap();
/// assert_eq!(p.base(), Path::new("."));
/// assert!(!p.is_globstar());
/// ```
#[derive(Debug, Clone)]
pub struct Pattern {
    raw: String,
    base: PathBuf,
    matcher: Matcher,
    is_globstar: bool,
}

impl Pattern {
    /// Compile `raw` into a pattern.
    ///
    /// # Errors
    ///
    /// [`SieveError::EmptyPattern`] for an empty expression,
    /// [`SieveError::Pattern`] when the glob syntax is invalid.
    pub fn compile(raw: &str, options: &GlobOptions) -> Result<Self, SieveError> {
        if raw.is_empty() {
            return Err(SieveError::EmptyPattern);
        }
        let expr = normalize(raw);
        let matcher = Matcher::glob(expr, options.match_options())?;
        Ok(Self {
            raw: raw.to_string(),
            base: base_dir(expr),
            matcher,
            is_globstar: raw.contains("**"),
        })
    }

    /// The expression as given, before normalization.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The wildcard-free prefix of the pattern. Traversal starts here.
    /// `"."` when the pattern has no literal prefix.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// The predicate candidates are judged against.
    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Whether the expression contains `**`. Decides recursion when the
    /// finder has no explicit `recurse` setting.
    pub fn is_globstar(&self) -> bool {
        self.is_globstar
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Strip a redundant leading `./`, which matchers treat as significant but
/// candidate paths never carry.
fn normalize(raw: &str) -> &str {
    raw.strip_prefix("./").unwrap_or(raw)
}

/// Extract the literal base directory from a pattern.
///
/// Accumulates `/`-separated segments until the first one carrying a
/// wildcard. The final segment names entries rather than directories, so it
/// never joins the base even when literal: `a/b/c.txt` has base `a/b`.
fn base_dir(pattern: &str) -> PathBuf {
    let segments: Vec<&str> = pattern.split('/').collect();
    let mut base = PathBuf::new();

    for (i, seg) in segments.iter().enumerate() {
        if i + 1 == segments.len() || seg.chars().any(is_wildcard) {
            break;
        }
        if seg.is_empty() {
            // Only a leading empty segment is meaningful: the pattern is
            // absolute. Doubled separators elsewhere are dropped.
            if i == 0 {
                base.push("/");
            }
            continue;
        }
        base.push(seg);
    }

    if base.as_os_str().is_empty() {
        base.push(".");
    }
    base
}

fn is_wildcard(c: char) -> bool {
    matches!(c, '*' | '?' | '[' | '{')
}
