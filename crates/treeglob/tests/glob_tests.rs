//! Single-pattern walk tests over an in-memory tree with symlinks.

mod common;

use std::sync::{Arc, Mutex};

use common::{fixture_tree, fixture_tree_at, MemoryFs, Recorder};
use treeglob::{Pattern, WalkControl, WalkError, WalkOptions};

fn with_fs(fs: MemoryFs) -> WalkOptions {
    WalkOptions::default().with_filesystem(Arc::new(fs))
}

#[tokio::test]
async fn walks_the_fixture_pattern() {
    let p = Pattern::parse("fixtures/a/b/c*d/e?f/[ghi]/{j,k,l}/**/m").unwrap();
    let rec = Recorder::new();

    p.glob(rec.callback(), with_fs(fixture_tree())).await.unwrap();

    assert_eq!(
        rec.paths(),
        vec![
            "fixtures/a/b/cd/elf/g/j/absurdity/m",
            "fixtures/a/b/cid/erf/h/k/m",
            "fixtures/a/b/cid/erf/h/k/n/m",
            "fixtures/a/b/cod/erf/h/k/m",
            "fixtures/a/b/cod/erf/h/k/n/m",
        ],
    );
}

#[tokio::test]
async fn symlinks_can_be_left_alone() {
    let p = Pattern::parse("fixtures/a/b/c*d/e?f/[ghi]/{j,k,l}/**/m").unwrap();
    let rec = Recorder::new();

    let opts = WalkOptions {
        traverse_symlinks: false,
        ..with_fs(fixture_tree())
    };
    p.glob(rec.callback(), opts).await.unwrap();

    assert_eq!(
        rec.paths(),
        vec![
            "fixtures/a/b/cd/elf/g/j/absurdity/m",
            "fixtures/a/b/cod/erf/h/k/m",
            "fixtures/a/b/cod/erf/h/k/n/m",
        ],
    );
}

#[tokio::test]
async fn double_star_sweeps_subtrees() {
    let p = Pattern::parse("fixtures/**/*_spec.rb").unwrap();
    let rec = Recorder::new();

    p.glob(rec.callback(), with_fs(fixture_tree())).await.unwrap();

    assert_eq!(
        rec.paths(),
        vec![
            "fixtures/spec/bar_spec.rb",
            "fixtures/spec/foo_spec.rb",
            "fixtures/spec/model/qux_spec.rb",
        ],
    );
}

#[tokio::test]
async fn intermediate_dirs_reach_the_callback() {
    let p = Pattern::parse("fixtures/a/b/c*d/e?f/[ghi]/{j,k,l}/**/m").unwrap();
    let rec = Recorder::new();

    let opts = WalkOptions {
        walk_intermediate_dirs: true,
        ..with_fs(fixture_tree())
    };
    p.glob(rec.callback(), opts).await.unwrap();

    assert_eq!(
        rec.paths(),
        vec![
            "fixtures/a/b",
            "fixtures/a/b/cad",
            "fixtures/a/b/cd",
            "fixtures/a/b/cd/elf",
            "fixtures/a/b/cd/elf/g",
            "fixtures/a/b/cd/elf/g/j",
            "fixtures/a/b/cd/elf/g/j/absurdity",
            "fixtures/a/b/cd/elf/g/j/absurdity/m",
            "fixtures/a/b/cid",
            "fixtures/a/b/cid/erf",
            "fixtures/a/b/cid/erf/h",
            "fixtures/a/b/cid/erf/h/k",
            "fixtures/a/b/cid/erf/h/k/m",
            "fixtures/a/b/cid/erf/h/k/n",
            "fixtures/a/b/cid/erf/h/k/n/m",
            "fixtures/a/b/cid/erf/i",
            "fixtures/a/b/cod",
            "fixtures/a/b/cod/erf",
            "fixtures/a/b/cod/erf/h",
            "fixtures/a/b/cod/erf/h/k",
            "fixtures/a/b/cod/erf/h/k/m",
            "fixtures/a/b/cod/erf/h/k/n",
            "fixtures/a/b/cod/erf/h/k/n/m",
            "fixtures/a/b/cod/erf/i",
        ],
    );
}

#[tokio::test]
async fn symlinks_inside_symlinked_subtrees_resolve() {
    let p = Pattern::parse("fixtures/a/b/c{i}d/**/m").unwrap();
    let rec = Recorder::new();

    p.glob(rec.callback(), with_fs(fixture_tree())).await.unwrap();

    assert_eq!(
        rec.paths(),
        vec![
            "fixtures/a/b/cid/erf/h/k/m",
            "fixtures/a/b/cid/erf/h/k/n/m",
            "fixtures/a/b/cid/erf/i/m",
            "fixtures/a/b/cid/erf/i/n/m",
        ],
    );
}

#[tokio::test]
async fn empty_root_walks_the_filesystem_root() {
    let p = Pattern::parse("**/m").unwrap();
    let rec = Recorder::new();

    p.glob(rec.callback(), with_fs(fixture_tree_at(""))).await.unwrap();

    assert_eq!(
        rec.sorted_paths(),
        vec![
            "a/b/cad/m",
            "a/b/cd/elf/g/j/absurdity/m",
            "a/b/cid/erf/h/k/m",
            "a/b/cid/erf/h/k/n/m",
            "a/b/cid/erf/i/m",
            "a/b/cid/erf/i/n/m",
            "a/b/cod/erf/h/k/m",
            "a/b/cod/erf/h/k/n/m",
            "a/b/cod/erf/i/m",
            "a/b/cod/erf/i/n/m",
            "m",
        ],
    );
}

#[tokio::test]
async fn literal_patterns_stat_instead_of_walking() {
    let p = Pattern::parse("a/b/cod/erf/h/k/n/m").unwrap();
    assert!(p.is_literal());
    let rec = Recorder::new();

    p.glob(rec.callback(), with_fs(fixture_tree_at(""))).await.unwrap();
    assert_eq!(rec.paths(), vec!["a/b/cod/erf/h/k/n/m"]);
}

#[tokio::test]
async fn literal_miss_surfaces_the_stat_error() {
    let p = Pattern::parse("no/such/file").unwrap();
    let rec = Recorder::new();

    p.glob(rec.callback(), with_fs(fixture_tree_at(""))).await.unwrap();
    assert!(rec.paths().is_empty());
    assert_eq!(rec.errored_paths(), vec!["no/such/file"]);
}

#[tokio::test]
async fn missing_root_matches_nothing() {
    let p = Pattern::parse("nowhere/*").unwrap();
    let rec = Recorder::new();

    // The fixture filesystem has no "nowhere": with a caller-supplied
    // filesystem that is an input error.
    let err = p
        .glob(rec.callback(), with_fs(fixture_tree()))
        .await
        .unwrap_err();
    assert!(matches!(err, WalkError::RootInvalid { .. }));
}

#[tokio::test]
async fn callback_errors_abort_the_walk() {
    let p = Pattern::parse("fixtures/**/m").unwrap();
    let callback: treeglob::WalkFn = Arc::new(|_path, _entry, _err| {
        WalkControl::Abort("had enough".into())
    });

    let err = p
        .glob(callback, with_fs(fixture_tree()))
        .await
        .unwrap_err();
    assert!(matches!(err, WalkError::Callback(_)));
}

#[tokio::test]
async fn skip_all_ends_the_walk_early() {
    let p = Pattern::parse("fixtures/**/m").unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_cb = seen.clone();
    let callback: treeglob::WalkFn = Arc::new(move |path, _entry, _err| {
        seen_cb.lock().unwrap().push(path.to_string());
        WalkControl::SkipAll
    });

    p.glob(callback, with_fs(fixture_tree())).await.unwrap();
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn skip_dir_prunes_intermediate_directories() {
    let p = Pattern::parse("fixtures/a/b/**/m").unwrap();
    let rec_paths = Arc::new(Mutex::new(Vec::new()));
    let cb_paths = rec_paths.clone();
    let callback: treeglob::WalkFn = Arc::new(move |path, entry, _err| {
        if entry.map(|e| e.is_dir()).unwrap_or(false) && path.ends_with("/cod") {
            return WalkControl::SkipDir;
        }
        if path.ends_with("/m") {
            cb_paths.lock().unwrap().push(path.to_string());
        }
        WalkControl::Continue
    });

    let opts = WalkOptions {
        walk_intermediate_dirs: true,
        ..with_fs(fixture_tree())
    };
    p.glob(callback, opts).await.unwrap();

    let paths = rec_paths.lock().unwrap().clone();
    assert!(paths.iter().any(|p| p.contains("/cad/")));
    assert!(paths.iter().any(|p| p.contains("/cid/")));
    assert!(!paths.iter().any(|p| p.contains("/cod/")));
}

#[tokio::test]
async fn symlink_cycles_hit_the_recursion_limit() {
    let mut fs = MemoryFs::new();
    fs.add_dir("loop");
    fs.add_symlink("loop/self", "loop");

    let p = Pattern::parse("loop/**/m").unwrap();
    let rec = Recorder::new();

    let err = p.glob(rec.callback(), with_fs(fs)).await.unwrap_err();
    assert!(matches!(err, WalkError::SymlinkRecursion(_)));
}

#[tokio::test]
async fn trace_sink_receives_walk_decisions() {
    let p = Pattern::parse("fixtures/spec/*_spec.rb").unwrap();
    let rec = Recorder::new();
    let sink = Arc::new(Mutex::new(Vec::<u8>::new()));

    let opts = with_fs(fixture_tree()).with_trace(sink.clone());
    p.glob(rec.callback(), opts).await.unwrap();

    let trace = String::from_utf8(sink.lock().unwrap().clone()).unwrap();
    assert!(trace.contains("starting walk"));
    assert!(trace.contains("foo_spec.rb"));
}

#[tokio::test]
async fn unreadable_directories_are_reported_once_reachable() {
    use async_trait::async_trait;
    use treeglob::{DirEntry, FsError, GlobFs};

    /// Delegates to the fixture tree but refuses to list one directory.
    struct Faulty {
        inner: MemoryFs,
        broken: String,
    }

    #[async_trait]
    impl GlobFs for Faulty {
        async fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>, FsError> {
            if path == self.broken {
                return Err(FsError::PermissionDenied(path.to_string()));
            }
            self.inner.list_dir(path).await
        }

        async fn stat(&self, path: &str) -> Result<DirEntry, FsError> {
            self.inner.stat(path).await
        }
    }

    let fs = Faulty {
        inner: fixture_tree(),
        broken: "fixtures/spec/model".to_string(),
    };
    let p = Pattern::parse("fixtures/**/*_spec.rb").unwrap();
    let rec = Recorder::new();

    p.glob(rec.callback(), WalkOptions::default().with_filesystem(Arc::new(fs)))
        .await
        .unwrap();

    // The readable matches still arrive, and the failure is surfaced for
    // the directory that was being entered.
    assert_eq!(
        rec.paths(),
        vec!["fixtures/spec/bar_spec.rb", "fixtures/spec/foo_spec.rb"],
    );
    assert_eq!(rec.errored_paths(), vec!["fixtures/spec/model"]);
}
