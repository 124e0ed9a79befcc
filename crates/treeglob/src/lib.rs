//! treeglob: glob patterns compiled to nondeterministic state machines,
//! with filesystem walking driven by the machine.
//!
//! Provides:
//! - **[`Pattern::parse`]**: compile a glob (`*`, `**`, `?`, `[…]`, `[^…]`,
//!   `{a,b}`, escaping, `~/`, optional extglob) into a rune-level ε-NFA
//! - **[`Pattern::matches`]**: test a path string against the machine
//! - **[`Pattern::glob`]**: walk a filesystem from the pattern's literal
//!   root, pruning subtrees the machine rules out and traversing directory
//!   symlinks with recursion protection
//! - **[`multi_glob`]**: walk many patterns at once, grouped by root, on a
//!   pool of worker tasks under a cancellation token
//! - **[`Pattern::write_dot`]**: render the automaton in GraphViz syntax
//!
//! The walker runs against [`GlobFs`], a minimal read-only filesystem
//! trait; [`OsFs`] adapts the host filesystem, and anything tree-shaped
//! can implement the trait to be globbed.
//!
//! ```no_run
//! use std::sync::Arc;
//! use treeglob::{Pattern, WalkControl, WalkOptions};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let pattern = Pattern::parse("src/**/*.rs")?;
//! assert!(pattern.matches("src/lexer/mod.rs"));
//!
//! pattern
//!     .glob(
//!         Arc::new(|path, _entry, _err| {
//!             println!("{path}");
//!             WalkControl::Continue
//!         }),
//!         WalkOptions::default(),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod dot;
mod expr;
mod fs;
mod lexer;
mod multiglob;
mod nfa;
mod parser;
mod paths;
mod pattern;
mod preprocess;
mod token;
mod walker;

pub use config::{ParseConfig, TraceSink, WalkOptions};
pub use fs::{DirEntry, EntryKind, FsError, GlobFs, OsFs};
pub use multiglob::multi_glob;
pub use nfa::{StateId, StateSet};
pub use parser::ParseError;
pub use pattern::Pattern;
pub use walker::{WalkControl, WalkError, WalkFn, SYMLINK_RECURSION_LIMIT};
