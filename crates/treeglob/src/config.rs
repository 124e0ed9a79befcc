//! Parse-time and walk-time options.

use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::fs::GlobFs;

/// How a pattern string is interpreted.
///
/// The default enables the full wildcard repertoire and picks separator and
/// escape handling for the host platform: where `/` separates paths, `\`
/// escapes; on Windows the two swap roles. Extglob stays opt-in, as in
/// interactive shells.
#[derive(Debug, Clone)]
pub struct ParseConfig {
    /// `\` (or `/` under `swap_slashes`) escapes the next rune.
    pub allow_escaping: bool,
    /// `?` matches a single non-separator rune.
    pub allow_question: bool,
    /// `*` matches a run of non-separator runes.
    pub allow_star: bool,
    /// `**` matches across separators. Only effective with `allow_star`;
    /// when disabled, `**` reads as two consecutive `*`.
    pub allow_double_star: bool,
    /// `{a,b}` alternations.
    pub allow_alternation: bool,
    /// `[…]` and `[^…]` character classes.
    pub allow_char_class: bool,
    /// Interpret `\` as the separator and `/` as the escape rune.
    pub swap_slashes: bool,
    /// Expand a leading `~/` to the home directory.
    pub expand_tilde: bool,
    /// Recognise the extglob forms `?(…)`, `*(…)`, `+(…)`, `@(…)`, `!(…)`.
    pub enable_extglob: bool,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            allow_escaping: !cfg!(windows),
            allow_question: true,
            allow_star: true,
            allow_double_star: true,
            allow_alternation: true,
            allow_char_class: true,
            swap_slashes: cfg!(windows),
            expand_tilde: true,
            enable_extglob: false,
        }
    }
}

/// Shared sink for walk trace lines.
pub type TraceSink = Arc<Mutex<dyn Write + Send>>;

/// Options for [`crate::Pattern::glob`] and [`crate::multi_glob`].
#[derive(Clone)]
pub struct WalkOptions {
    /// Recurse into directory symlinks. Cycles are caught by a nesting
    /// limit rather than by tracking visited inodes. On by default.
    pub traverse_symlinks: bool,
    /// Translate `/` to the native separator in paths handed to the
    /// callback. Matching always uses `/` internally. On by default.
    pub translate_slashes: bool,
    /// Also invoke the callback for partially-matching directories on the
    /// way to matches, so it can prune with [`crate::WalkControl::SkipDir`].
    /// Off by default.
    pub walk_intermediate_dirs: bool,
    /// Sink for per-entry trace lines describing walk decisions. Off by
    /// default.
    pub trace: Option<TraceSink>,
    /// Filesystem to walk instead of the host filesystem.
    pub filesystem: Option<Arc<dyn GlobFs>>,
    /// Cap on concurrent multi-glob workers. `0` means one per root group.
    pub worker_limit: usize,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            traverse_symlinks: true,
            translate_slashes: true,
            walk_intermediate_dirs: false,
            trace: None,
            filesystem: None,
            worker_limit: 0,
        }
    }
}

impl WalkOptions {
    /// Walk `fs` instead of the host filesystem.
    pub fn with_filesystem(mut self, fs: Arc<dyn GlobFs>) -> Self {
        self.filesystem = Some(fs);
        self
    }

    /// Emit walk-internal trace lines to `sink`.
    pub fn with_trace(mut self, sink: TraceSink) -> Self {
        self.trace = Some(sink);
        self
    }

    /// Cap multi-glob worker concurrency.
    pub fn with_worker_limit(mut self, n: usize) -> Self {
        self.worker_limit = n;
        self
    }
}

impl fmt::Debug for WalkOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalkOptions")
            .field("traverse_symlinks", &self.traverse_symlinks)
            .field("translate_slashes", &self.translate_slashes)
            .field("walk_intermediate_dirs", &self.walk_intermediate_dirs)
            .field("trace", &self.trace.as_ref().map(|_| "..."))
            .field("filesystem", &self.filesystem.as_ref().map(|_| "..."))
            .field("worker_limit", &self.worker_limit)
            .finish()
    }
}
