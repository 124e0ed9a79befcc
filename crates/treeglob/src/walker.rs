//! Driving a filesystem walk with a compiled pattern.
//!
//! A walk holds one state set — the pattern's initial states, or the seed
//! set of a symlink sub-walk — and rates every visited entry by running the
//! machine over the entry's path relative to the walk root. Directories
//! additionally have to satisfy a separator edge. An empty surviving set
//! prunes the subtree; an accepting set reaches the callback.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::WalkOptions;
use crate::fs::{DirEntry, FsError, GlobFs, OsFs};
use crate::nfa::{Nfa, StateSet};
use crate::paths;
use crate::pattern::Pattern;

/// Nesting limit for symlink sub-walks. Link cycles would otherwise
/// recurse without bound; real trees stay far below this.
pub const SYMLINK_RECURSION_LIMIT: usize = 1000;

/// What the callback tells the walk to do next.
pub enum WalkControl {
    /// Keep walking.
    Continue,
    /// For a directory entry: skip its subtree. For anything else: skip
    /// the remainder of the containing directory.
    SkipDir,
    /// End the walk successfully.
    SkipAll,
    /// Abort the walk with an error.
    Abort(Box<dyn std::error::Error + Send + Sync>),
}

/// Walk callback: the matched path, entry metadata when known, and any
/// filesystem error reported for the entry.
pub type WalkFn =
    Arc<dyn Fn(&str, Option<&DirEntry>, Option<&FsError>) -> WalkControl + Send + Sync>;

/// Errors that terminate a walk. Per-entry filesystem errors are not here:
/// they go to the callback, which chooses whether to abort.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("pattern root {root:?} not valid within provided filesystem: {source}")]
    RootInvalid { root: String, source: FsError },
    #[error("symlink recursion limit reached at {0:?}")]
    SymlinkRecursion(String),
    #[error("callback error: {0}")]
    Callback(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("walk cancelled")]
    Cancelled,
}

impl Pattern {
    /// Walk the filesystem from the pattern's root, invoking `callback`
    /// for every path the pattern fully matches.
    ///
    /// Subtrees that cannot extend to a match are pruned without being
    /// read. Directory symlinks are traversed (unless disabled) by seeding
    /// a nested walk with the surviving state set. Entry-level filesystem
    /// errors go to the callback when the path could still have mattered;
    /// the callback's return value steers the walk.
    pub async fn glob(&self, callback: WalkFn, options: WalkOptions) -> Result<(), WalkError> {
        let fs: Arc<dyn GlobFs> = match &options.filesystem {
            Some(fs) => fs.clone(),
            None => Arc::new(OsFs::new(".")),
        };

        let Some(initial) = self.initial else {
            // A fully literal pattern is a stat, not a walk.
            let display = display_path(&self.root, &options);
            let control = match fs.stat(&self.root).await {
                Ok(entry) => callback(&display, Some(&entry), None),
                Err(err) => callback(&display, None, Some(&err)),
            };
            return match control {
                WalkControl::Abort(e) => Err(WalkError::Callback(e)),
                _ => Ok(()),
            };
        };

        let base = match self.root.as_str() {
            "" => String::new(),
            root => paths::clean(root),
        };

        // With a caller-supplied filesystem, a root that is not visible in
        // it is an input error rather than an empty result.
        if options.filesystem.is_some() && !base.is_empty() {
            if let Err(err) = fs.stat(&base).await {
                return Err(WalkError::RootInvalid {
                    root: base,
                    source: err,
                });
            }
        }

        let mut states = StateSet::new();
        states.insert(initial);

        let walk = WalkState {
            nfa: &self.nfa,
            opts: &options,
            callback: &callback,
            fs: fs.as_ref(),
            base,
            root: self.root.clone(),
            states,
            depth: 0,
            cancel: None,
        };
        match walk.run().await {
            Flow::Abort(err) => Err(err),
            _ => Ok(()),
        }
    }
}

pub(crate) fn display_path(path: &str, opts: &WalkOptions) -> String {
    if opts.translate_slashes {
        paths::from_slash(path)
    } else {
        path.to_string()
    }
}

/// Walk outcome threaded through the recursion.
pub(crate) enum Flow {
    Continue,
    /// Skip the remaining entries of the current directory.
    SkipDir,
    /// End the whole walk successfully.
    SkipAll,
    Abort(WalkError),
}

/// One walk over one root. Symlink traversal builds a nested `WalkState`
/// with the surviving states as its initial set.
pub(crate) struct WalkState<'a> {
    pub(crate) nfa: &'a Nfa,
    pub(crate) opts: &'a WalkOptions,
    pub(crate) callback: &'a WalkFn,
    pub(crate) fs: &'a dyn GlobFs,
    /// Path prefix of this walk's root within `fs`.
    pub(crate) base: String,
    /// Display prefix for callback paths, `/`-separated.
    pub(crate) root: String,
    pub(crate) states: StateSet,
    pub(crate) depth: usize,
    pub(crate) cancel: Option<&'a CancellationToken>,
}

impl<'a> WalkState<'a> {
    fn trace(&self, line: fmt::Arguments<'_>) {
        if let Some(sink) = &self.opts.trace {
            if let Ok(mut w) = sink.lock() {
                let _ = writeln!(w, "{line}");
            }
        }
    }

    /// Path of `rel` within the filesystem.
    fn fs_path(&self, rel: &str) -> String {
        if rel.is_empty() {
            self.base.clone()
        } else {
            paths::join(&self.base, rel)
        }
    }

    /// Callback-facing path of `rel`.
    fn full_path(&self, rel: &str) -> String {
        let full = paths::join(&self.root, rel);
        display_path(&full, self.opts)
    }

    fn invoke(&self, path: &str, entry: Option<&DirEntry>, err: Option<&FsError>) -> WalkControl {
        (self.callback)(path, entry, err)
    }

    pub(crate) async fn run(&self) -> Flow {
        self.trace(format_args!(
            "starting walk at {:?} with {} states",
            self.root,
            self.states.len()
        ));

        // The walk root itself is an intermediate directory of every match.
        if self.opts.walk_intermediate_dirs {
            let (entry, err) = match self.fs.stat(&self.fs_path("")).await {
                Ok(e) => (Some(e), None),
                Err(e) => (None, Some(e)),
            };
            let unreadable = err.is_some();
            match self.invoke(&self.full_path("."), entry.as_ref(), err.as_ref()) {
                WalkControl::Continue => {}
                // Skipping the root skips everything.
                WalkControl::SkipDir | WalkControl::SkipAll => return Flow::SkipAll,
                WalkControl::Abort(e) => return Flow::Abort(WalkError::Callback(e)),
            }
            if unreadable {
                return Flow::Continue;
            }
        }

        self.walk_dir("").await
    }

    /// Visit every entry of one directory, in name order, recursing into
    /// subdirectories depth-first.
    fn walk_dir<'s>(&'s self, dir_rel: &'s str) -> Pin<Box<dyn Future<Output = Flow> + Send + 's>> {
        Box::pin(async move {
            let entries = match self.fs.list_dir(&self.fs_path(dir_rel)).await {
                Ok(mut entries) => {
                    entries.sort_by(|a, b| a.name.cmp(&b.name));
                    entries
                }
                Err(err) => {
                    if dir_rel.is_empty() && !self.opts.walk_intermediate_dirs {
                        // A missing or unreadable walk root matches nothing.
                        self.trace(format_args!("cannot read walk root: {err}"));
                        return Flow::Continue;
                    }
                    return self.dir_error(dir_rel, err);
                }
            };

            for entry in &entries {
                if let Some(token) = self.cancel {
                    if token.is_cancelled() {
                        return Flow::Abort(WalkError::Cancelled);
                    }
                }
                let rel = if dir_rel.is_empty() {
                    entry.name.clone()
                } else {
                    format!("{dir_rel}/{}", entry.name)
                };
                match self.visit(&rel, entry).await {
                    Flow::Continue => {}
                    Flow::SkipDir => break,
                    Flow::SkipAll => return Flow::SkipAll,
                    abort @ Flow::Abort(_) => return abort,
                }
            }
            Flow::Continue
        })
    }

    /// Rate one entry against the machine and act on the outcome.
    async fn visit(&self, rel: &str, entry: &DirEntry) -> Flow {
        let is_dir = entry.is_dir();

        let mut states = self.nfa.match_segment(&self.states, rel);
        if is_dir && !rel.ends_with('/') {
            // A directory only stays live if the pattern can consume a
            // separator next.
            states = self.nfa.match_segment(&states, "/");
        }

        if states.is_empty() {
            // Nothing under this entry can match: prune directories by not
            // descending, pass over files.
            self.trace(format_args!("{rel:?}: no live states, pruning"));
            return Flow::Continue;
        }

        let accepted = self.nfa.any_accept(&states);
        self.trace(format_args!(
            "{rel:?}: {} live states, accepted={accepted}",
            states.len()
        ));

        if accepted || (self.opts.walk_intermediate_dirs && is_dir) {
            match self.invoke(&self.full_path(rel), Some(entry), None) {
                WalkControl::Continue => {}
                WalkControl::SkipDir => {
                    // For a directory this prunes the subtree we have not
                    // entered yet; otherwise it skips the siblings.
                    return if is_dir { Flow::Continue } else { Flow::SkipDir };
                }
                WalkControl::SkipAll => return Flow::SkipAll,
                WalkControl::Abort(e) => return Flow::Abort(WalkError::Callback(e)),
            }
        } else if entry.is_symlink() && self.opts.traverse_symlinks {
            // A partially-matching symlink may stand in for a directory.
            match self.follow_symlink(rel, &states).await {
                Flow::Continue => {}
                other => return other,
            }
        }

        if is_dir {
            return self.walk_dir(rel).await;
        }
        Flow::Continue
    }

    /// Traverse a directory symlink by walking a subtree rooted at the
    /// link, seeded with the states that survive a separator.
    async fn follow_symlink(&self, rel: &str, states: &StateSet) -> Flow {
        let target = match self.fs.stat(&self.fs_path(rel)).await {
            Ok(entry) => entry,
            Err(err) => {
                self.trace(format_args!("{rel:?}: dangling symlink: {err}"));
                return Flow::Continue;
            }
        };
        if !target.is_dir() {
            return Flow::Continue;
        }
        let seed = self.nfa.match_segment(states, "/");
        if seed.is_empty() {
            return Flow::Continue;
        }
        if self.depth + 1 > SYMLINK_RECURSION_LIMIT {
            return Flow::Abort(WalkError::SymlinkRecursion(self.full_path(rel)));
        }

        let sub = WalkState {
            nfa: self.nfa,
            opts: self.opts,
            callback: self.callback,
            fs: self.fs,
            base: self.fs_path(rel),
            root: paths::join(&self.root, rel),
            states: seed,
            depth: self.depth + 1,
            cancel: self.cancel,
        };
        sub.run().await
    }

    /// A directory the walk already descended into failed to read: the
    /// path is reachable, so the failure goes to the callback.
    fn dir_error(&self, dir_rel: &str, err: FsError) -> Flow {
        let rel = if dir_rel.is_empty() { "." } else { dir_rel };
        match self.invoke(&self.full_path(rel), None, Some(&err)) {
            WalkControl::Continue | WalkControl::SkipDir => Flow::Continue,
            WalkControl::SkipAll => Flow::SkipAll,
            WalkControl::Abort(e) => Flow::Abort(WalkError::Callback(e)),
        }
    }
}
