use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use globsieve::{
    dispatch, finder, EntryReader, Exclude, FileRecord, Gitignore, GlobOptions, Include,
    IntoMatcher, Middleware, MiddlewareError, Pattern, ReadCallback, ReadPromise, RecordStream,
    SieveError,
};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Create a temporary directory tree for testing.
///
/// Structure:
/// ```
/// tmp/
///   a.txt
///   b.md
///   sub/
///     c.txt
/// ```
fn setup_test_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    fs::write(root.join("a.txt"), "alpha").unwrap();
    fs::write(root.join("b.md"), "bravo").unwrap();

    let sub = root.join("sub");
    fs::create_dir(&sub).unwrap();
    fs::write(sub.join("c.txt"), "charlie").unwrap();

    dir
}

/// Sorted record paths, for order-independent comparison.
fn paths(records: &[FileRecord]) -> Vec<String> {
    let mut v: Vec<String> = records
        .iter()
        .map(|r| r.path.to_string_lossy().into_owned())
        .collect();
    v.sort();
    v
}

// ---------------------------------------------------------------------------
// Pattern compilation
// ---------------------------------------------------------------------------

#[test]
fn pattern_compilation_surface() {
    let opts = GlobOptions::default();

    let p = Pattern::compile("sub/**/*.txt", &opts).unwrap();
    assert_eq!(p.base(), Path::new("sub"));
    assert!(p.is_globstar());

    let p = Pattern::compile("*.txt", &opts).unwrap();
    assert_eq!(p.base(), Path::new("."));
    assert!(!p.is_globstar());

    let p = Pattern::compile("a/b/c.txt", &opts).unwrap();
    assert_eq!(
        p.base(),
        Path::new("a/b"),
        "the final segment never joins the base"
    );

    let p = Pattern::compile("/var/log/*.log", &opts).unwrap();
    assert_eq!(p.base(), Path::new("/var/log"));

    assert!(matches!(
        Pattern::compile("", &opts),
        Err(SieveError::EmptyPattern)
    ));
}

#[test]
fn compiling_twice_agrees() {
    let opts = GlobOptions::default();
    let probe = Path::new("src/x/y.rs");

    let a = Pattern::compile("src/**", &opts).unwrap();
    let b = Pattern::compile("src/**", &opts).unwrap();

    assert_eq!(a.base(), b.base());
    assert_eq!(a.is_globstar(), b.is_globstar());
    assert_eq!(a.matcher().is_match(probe), b.matcher().is_match(probe));
}

#[test]
fn matcher_base_name_semantics() {
    let opts = GlobOptions::default();

    let m = "*.txt".into_matcher(&opts).unwrap();
    assert!(m.is_match(Path::new("a.txt")));
    assert!(
        m.is_match(Path::new("sub/c.txt")),
        "separator-free patterns also match the final segment"
    );

    let m = "sub/*.txt".into_matcher(&opts).unwrap();
    assert!(m.is_match(Path::new("sub/c.txt")));
    assert!(
        !m.is_match(Path::new("deep/sub/c.txt")),
        "patterns with separators match against the whole path"
    );
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

#[test]
fn finds_top_level_matches() {
    let dir = setup_test_dir();
    let records = finder().cwd(dir.path()).read_entries("*.txt").unwrap();

    assert_eq!(
        paths(&records),
        ["a.txt"],
        "plain patterns stay in the base directory"
    );
}

#[test]
fn globstar_recurses_by_default() {
    let dir = setup_test_dir();
    let records = finder().cwd(dir.path()).read_entries("**/*.txt").unwrap();

    assert_eq!(paths(&records), ["a.txt", "sub/c.txt"]);
}

#[test]
fn explicit_recurse_overrides_plain_pattern() {
    let dir = setup_test_dir();
    let records = finder()
        .cwd(dir.path())
        .recurse(true)
        .read_entries("*.txt")
        .unwrap();

    assert_eq!(
        paths(&records),
        ["a.txt", "sub/c.txt"],
        "base-name matching picks up nested entries once recursion is forced on"
    );
}

#[test]
fn explicit_recurse_off_overrides_globstar() {
    let dir = setup_test_dir();
    let records = finder()
        .cwd(dir.path())
        .recurse(false)
        .read_entries("**/*.txt")
        .unwrap();

    assert_eq!(paths(&records), ["a.txt"]);
}

#[test]
fn pattern_base_narrows_traversal() {
    let dir = setup_test_dir();
    let records = finder().cwd(dir.path()).read_entries("sub/*.txt").unwrap();

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.path, Path::new("sub/c.txt"));
    assert_eq!(record.dirname, Path::new("sub"));
    assert_eq!(record.segment, "c.txt");
    assert!(record.stat.is_some(), "stat should be populated");
    assert!(record.accepted());
}

#[test]
fn directories_are_ordinary_candidates() {
    let dir = setup_test_dir();
    let records = finder().cwd(dir.path()).read_entries("*").unwrap();

    assert_eq!(paths(&records), ["a.txt", "b.md", "sub"]);
}

#[test]
fn absolute_patterns_yield_absolute_paths() {
    let dir = setup_test_dir();
    let pattern = format!("{}/*.txt", dir.path().display());
    let records = finder().read_entries(&pattern).unwrap();

    assert_eq!(records.len(), 1);
    assert!(records[0].path.is_absolute());
    assert_eq!(records[0].path, dir.path().join("a.txt"));
}

#[test]
fn dotfiles_are_opt_in() {
    let dir = setup_test_dir();
    fs::write(dir.path().join(".hidden.txt"), "").unwrap();

    let records = finder().cwd(dir.path()).read_entries("*.txt").unwrap();
    assert_eq!(
        paths(&records),
        ["a.txt"],
        "wildcards do not cross a leading dot by default"
    );

    let records = finder()
        .cwd(dir.path())
        .dotfiles(true)
        .read_entries("*.txt")
        .unwrap();
    assert_eq!(paths(&records), [".hidden.txt", "a.txt"]);
}

#[test]
fn case_sensitivity_is_configurable() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("README.TXT"), "").unwrap();

    let records = finder().cwd(dir.path()).read_entries("*.txt").unwrap();
    assert!(records.is_empty());

    let records = finder()
        .cwd(dir.path())
        .case_sensitive(false)
        .read_entries("*.txt")
        .unwrap();
    assert_eq!(paths(&records), ["README.TXT"]);
}

#[test]
fn globstar_visits_what_walkdir_visits() {
    let dir = setup_test_dir();

    let mut expected: Vec<String> = walkdir::WalkDir::new(dir.path())
        .min_depth(1)
        .into_iter()
        .map(|e| {
            e.unwrap()
                .path()
                .strip_prefix(dir.path())
                .unwrap()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    expected.sort();

    let records = finder().cwd(dir.path()).read_entries("**").unwrap();
    assert_eq!(
        paths(&records),
        expected,
        "`**` accepts every entry walkdir sees"
    );
}

#[test]
fn missing_start_directory_is_fatal() {
    let dir = setup_test_dir();
    let err = finder()
        .cwd(dir.path().join("missing"))
        .read_entries("*.txt")
        .unwrap_err();

    assert!(matches!(err, SieveError::Root { .. }));
    assert!(!err.is_recoverable());
    assert_eq!(err.path().map(|p| p.ends_with("missing")), Some(true));
}

#[cfg(unix)]
#[test]
fn unreadable_subdirectory_skips_and_continues() {
    use std::os::unix::fs::PermissionsExt;

    let dir = setup_test_dir();
    let locked = dir.path().join("locked");
    fs::create_dir(&locked).unwrap();
    fs::write(locked.join("d.txt"), "delta").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users can list anything; the scenario needs a listing
    // failure to exercise.
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let skips: Arc<Mutex<Vec<PathBuf>>> = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&skips);
    let records = finder()
        .cwd(dir.path())
        .on_skip(move |path, err| {
            assert!(err.is_recoverable());
            seen.lock().unwrap().push(path.to_path_buf());
        })
        .read_entries("**/*.txt")
        .unwrap();

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert_eq!(
        paths(&records),
        ["a.txt", "sub/c.txt"],
        "the walk continues past the unreadable directory"
    );
    let skips = skips.lock().unwrap();
    assert_eq!(skips.len(), 1, "exactly one skip should be reported");
    assert!(skips[0].ends_with("locked"));
}

// ---------------------------------------------------------------------------
// Middleware
// ---------------------------------------------------------------------------

#[test]
fn exclusion_always_wins() {
    let dir = setup_test_dir();
    let records = finder()
        .cwd(dir.path())
        .exclude("sub/**")
        .unwrap()
        .read_entries("**/*.txt")
        .unwrap();

    assert_eq!(paths(&records), ["a.txt"]);
}

#[test]
fn includes_broaden_the_result_set() {
    let dir = setup_test_dir();
    let records = finder()
        .cwd(dir.path())
        .include(regex::Regex::new(r"\.md$").unwrap())
        .unwrap()
        .read_entries("*.txt")
        .unwrap();

    assert_eq!(paths(&records), ["a.txt", "b.md"]);
}

#[test]
fn ignore_is_an_exclude_alias() {
    let dir = setup_test_dir();
    let records = finder()
        .cwd(dir.path())
        .ignore("b.md")
        .unwrap()
        .read_entries("*")
        .unwrap();

    assert_eq!(paths(&records), ["a.txt", "sub"]);
}

#[test]
fn bad_patterns_fail_at_registration() {
    let err = finder().include("[").unwrap_err();
    assert!(matches!(err, SieveError::Pattern { .. }));

    let err = finder().exclude("").unwrap_err();
    assert!(matches!(err, SieveError::EmptyPattern));
}

#[test]
fn closure_middleware() {
    let dir = setup_test_dir();
    let records = finder()
        .cwd(dir.path())
        .use_middleware(|record: &mut FileRecord| {
            if record.segment.ends_with(".md") {
                record.mark_excluded();
            }
            Ok(())
        })
        .read_entries("*")
        .unwrap();

    assert_eq!(paths(&records), ["a.txt", "sub"]);
}

#[test]
fn middleware_failure_aborts_traversal() {
    struct Failing;

    impl Middleware for Failing {
        fn apply(&self, _record: &mut FileRecord) -> Result<(), MiddlewareError> {
            Err(MiddlewareError::new("boom"))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    let dir = setup_test_dir();
    let err = finder()
        .cwd(dir.path())
        .use_middleware(Failing)
        .read_entries("*.txt")
        .unwrap_err();

    match err {
        SieveError::Middleware { name, .. } => assert_eq!(name, "failing"),
        other => panic!("expected a middleware failure, got {other:?}"),
    }
}

#[test]
fn dispatch_runs_the_whole_chain() {
    let opts = GlobOptions::default();
    let chain: Vec<Arc<dyn Middleware>> = vec![
        Arc::new(Include::new("*.txt".into_matcher(&opts).unwrap())),
        Arc::new(Exclude::new("*".into_matcher(&opts).unwrap())),
        Arc::new(Include::new("a.*".into_matcher(&opts).unwrap())),
    ];

    let mut record = FileRecord::new("a.txt", None);
    dispatch(&mut record, &chain, true).unwrap();

    assert!(record.is_included());
    assert!(record.is_excluded());
    assert!(
        !record.accepted(),
        "exclusion wins over any number of includes"
    );
    assert_eq!(
        record.history().len(),
        4,
        "three middleware leave four snapshots"
    );
}

#[test]
fn history_is_off_by_default() {
    let dir = setup_test_dir();
    let records = finder().cwd(dir.path()).read_entries("*.txt").unwrap();

    assert!(records[0].history().is_empty());
}

#[test]
fn tracking_snapshots_chain_states() {
    let dir = setup_test_dir();
    let records = finder()
        .cwd(dir.path())
        .track(true)
        .exclude("*.md")
        .unwrap()
        .read_entries("*.txt")
        .unwrap();

    let record = &records[0];
    // One registered exclude plus the implicit include: three snapshots.
    assert_eq!(record.history().len(), 3);

    let first = &record.history()[0];
    assert!(
        !first.include && !first.exclude,
        "the first snapshot precedes all middleware"
    );
    let last = &record.history()[2];
    assert!(last.include, "the last snapshot follows the implicit include");
    assert!(!last.exclude);
}

#[test]
fn gitignore_rules_exclude_records() {
    let dir = setup_test_dir();
    fs::write(dir.path().join(".gitignore"), "b.md\nsub/\n").unwrap();

    let records = finder()
        .cwd(dir.path())
        .use_middleware(Gitignore::from_dir(dir.path()).unwrap())
        .read_entries("**")
        .unwrap();

    assert_eq!(
        paths(&records),
        ["a.txt"],
        "directory rules take out the directory and everything beneath it"
    );
}

#[test]
fn missing_gitignore_excludes_nothing() {
    let dir = setup_test_dir();
    let records = finder()
        .cwd(dir.path())
        .use_middleware(Gitignore::from_dir(dir.path()).unwrap())
        .read_entries("*.txt")
        .unwrap();

    assert_eq!(paths(&records), ["a.txt"]);
}

// ---------------------------------------------------------------------------
// Execution modes
// ---------------------------------------------------------------------------

#[test]
fn all_modes_agree() {
    let dir = setup_test_dir();
    let host = finder().cwd(dir.path());

    let blocking = host.read_entries("**/*.txt").unwrap();
    let order: Vec<PathBuf> = blocking.iter().map(|r| r.path.clone()).collect();

    let (tx, rx) = mpsc::channel();
    host.read_entries_async("**/*.txt", move |result| {
        tx.send(result).unwrap();
    });
    let via_callback = rx.recv().unwrap().unwrap();

    let via_stream: Vec<FileRecord> = host
        .read_entries_stream("**/*.txt")
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    let via_promise = host.read_entries_promise("**/*.txt").wait().unwrap();

    assert_eq!(paths(&blocking), ["a.txt", "sub/c.txt"]);
    assert_eq!(paths(&via_callback), paths(&blocking));
    assert_eq!(paths(&via_promise), paths(&blocking));

    let stream_order: Vec<PathBuf> = via_stream.iter().map(|r| r.path.clone()).collect();
    assert_eq!(
        stream_order, order,
        "modes should deliver records in the same traversal order"
    );
}

#[test]
fn callback_runs_exactly_once_on_error() {
    let (tx, rx) = mpsc::channel();
    finder().read_entries_async("", move |result| {
        tx.send(result.is_err()).unwrap();
    });

    assert!(rx.recv().unwrap(), "the callback should receive the error");
    assert!(rx.recv().is_err(), "the callback must not run a second time");
}

#[test]
fn stream_yields_error_then_fuses() {
    let mut stream = finder().read_entries_stream("[");

    match stream.next() {
        Some(Err(SieveError::Pattern { .. })) => {}
        other => panic!("expected a pattern error, got {other:?}"),
    }
    assert!(stream.next().is_none(), "the stream fuses after an error");
}

#[test]
fn dropping_the_stream_cancels() {
    let dir = setup_test_dir();
    let mut stream = finder().cwd(dir.path()).read_entries_stream("**/*.txt");

    let first = stream
        .next()
        .expect("the stream should yield at least one record")
        .unwrap();
    assert_eq!(first.path.extension().and_then(|e| e.to_str()), Some("txt"));

    // The worker notices its next send failing and winds down.
    drop(stream);
}

#[test]
fn promise_resolves_with_all_records() {
    let dir = setup_test_dir();
    let records = finder()
        .cwd(dir.path())
        .read_entries_promise("*.txt")
        .wait()
        .unwrap();

    assert_eq!(paths(&records), ["a.txt"]);
}

// ---------------------------------------------------------------------------
// Host reuse and extension points
// ---------------------------------------------------------------------------

#[test]
fn reads_are_independent() {
    let dir = setup_test_dir();
    let host = finder().cwd(dir.path());

    assert_eq!(paths(&host.read_entries("*.txt").unwrap()), ["a.txt"]);
    // A second read must not inherit the first read's pattern.
    assert_eq!(paths(&host.read_entries("*.md").unwrap()), ["b.md"]);
    assert_eq!(paths(&host.read_entries("*.txt").unwrap()), ["a.txt"]);
}

#[test]
fn concurrent_reads_share_one_finder() {
    let dir = setup_test_dir();
    let host = Arc::new(finder().cwd(dir.path()));

    let mut handles = Vec::new();
    for pattern in ["*.txt", "*.md", "**/*.txt"] {
        let host = Arc::clone(&host);
        handles.push(std::thread::spawn(move || {
            paths(&host.read_entries(pattern).unwrap())
        }));
    }

    let got: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(got[0], ["a.txt"]);
    assert_eq!(got[1], ["b.md"]);
    assert_eq!(got[2], ["a.txt", "sub/c.txt"]);
}

#[test]
fn entry_reader_works_as_trait_object() {
    let dir = setup_test_dir();
    let host = finder().cwd(dir.path());
    let reader: &dyn EntryReader = &host;

    let records = reader.read_entries("*.txt").unwrap();
    assert_eq!(paths(&records), ["a.txt"]);

    let (tx, rx) = mpsc::channel();
    reader.read_entries_async(
        "*.md",
        Box::new(move |result| {
            tx.send(result).unwrap();
        }),
    );
    assert_eq!(paths(&rx.recv().unwrap().unwrap()), ["b.md"]);

    let streamed: Vec<FileRecord> = reader
        .read_entries_stream("**/*.txt")
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(paths(&streamed), ["a.txt", "sub/c.txt"]);

    let records = reader.read_entries_promise("*").wait().unwrap();
    assert_eq!(paths(&records), ["a.txt", "b.md", "sub"]);
}

#[test]
fn readers_compose_by_wrapping() {
    /// Counts reads before delegating. The capability set is fixed, so
    /// extension happens by decoration rather than registration.
    struct Counted<R> {
        inner: R,
        reads: Arc<Mutex<usize>>,
    }

    impl<R: EntryReader> EntryReader for Counted<R> {
        fn read_entries(&self, pattern: &str) -> Result<Vec<FileRecord>, SieveError> {
            *self.reads.lock().unwrap() += 1;
            self.inner.read_entries(pattern)
        }

        fn read_entries_async(&self, pattern: &str, callback: ReadCallback) {
            *self.reads.lock().unwrap() += 1;
            self.inner.read_entries_async(pattern, callback)
        }

        fn read_entries_stream(&self, pattern: &str) -> RecordStream {
            *self.reads.lock().unwrap() += 1;
            self.inner.read_entries_stream(pattern)
        }

        fn read_entries_promise(&self, pattern: &str) -> ReadPromise {
            *self.reads.lock().unwrap() += 1;
            self.inner.read_entries_promise(pattern)
        }
    }

    let dir = setup_test_dir();
    let reads = Arc::new(Mutex::new(0));
    let reader = Counted {
        inner: finder().cwd(dir.path()),
        reads: Arc::clone(&reads),
    };

    assert_eq!(paths(&reader.read_entries("*.txt").unwrap()), ["a.txt"]);
    assert_eq!(paths(&reader.read_entries("*.md").unwrap()), ["b.md"]);
    assert_eq!(*reads.lock().unwrap(), 2);
}
