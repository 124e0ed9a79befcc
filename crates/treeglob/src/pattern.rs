//! Compiled patterns: parse entry points and string matching.

use crate::config::ParseConfig;
use crate::lexer::lex;
use crate::nfa::{Nfa, StateId, StateSet};
use crate::parser::{parse_tokens, ParseError};
use crate::preprocess::{find_root, preprocess};
use crate::token::all_literal;

/// A compiled glob pattern.
///
/// Immutable after parsing; walks and matches only read it, so it can be
/// shared freely. Cloning duplicates the state arena.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub(crate) root: String,
    /// `None` for fully literal patterns, which carry the whole path in
    /// `root` and need no machine at all.
    pub(crate) initial: Option<StateId>,
    pub(crate) nfa: Nfa,
}

impl Pattern {
    /// Compile `pattern` under the platform-default [`ParseConfig`].
    pub fn parse(pattern: &str) -> Result<Self, ParseError> {
        Self::parse_with(pattern, &ParseConfig::default())
    }

    /// Compile `pattern` under an explicit configuration.
    pub fn parse_with(pattern: &str, cfg: &ParseConfig) -> Result<Self, ParseError> {
        let tokens = preprocess(lex(pattern, cfg));

        // No live metacharacters: the pattern names one specific path.
        if let Some(root) = all_literal(&tokens) {
            return Ok(Self {
                root,
                initial: None,
                nfa: Nfa::new(),
            });
        }

        let (root, rest) = find_root(&tokens);
        let mut nfa = Nfa::new();
        let initial = parse_tokens(rest, &mut nfa)?;
        nfa.reduce(initial);
        Ok(Self {
            root,
            initial: Some(initial),
            nfa,
        })
    }

    /// Like [`Pattern::parse`], but panics on invalid patterns. For
    /// patterns known at compile time.
    pub fn must_parse(pattern: &str) -> Self {
        match Self::parse(pattern) {
            Ok(p) => p,
            Err(err) => panic!("must_parse({pattern:?}): {err}"),
        }
    }

    /// The literal prefix of the pattern up to and including the last `/`
    /// before the first metacharacter. Walks start here. Fully literal
    /// patterns put their entire path in the root.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// True if the pattern contains no metacharacters.
    pub fn is_literal(&self) -> bool {
        self.initial.is_none()
    }

    /// Report whether the pattern matches `path` in full.
    ///
    /// Matching is rune-by-rune over the whole string; a trailing `/`
    /// is significant, so `a/b` does not match `a/b/`.
    pub fn matches(&self, path: &str) -> bool {
        let Some(initial) = self.initial else {
            return path == self.root;
        };
        let Some(rest) = path.strip_prefix(&self.root) else {
            return false;
        };
        let mut start = StateSet::new();
        start.insert(initial);
        let end = self.nfa.match_segment(&start, rest);
        self.nfa.any_accept(&end)
    }

    /// The ε-closed initial state set, for incremental matching with
    /// [`Pattern::advance`]. Empty for fully literal patterns.
    pub fn initial_states(&self) -> StateSet {
        let mut set = StateSet::new();
        if let Some(initial) = self.initial {
            set.insert(initial);
            self.nfa.epsilon_closure(&mut set);
        }
        set
    }

    /// Advance a state set over a fragment of a root-relative path.
    /// Useful for stepping a match alongside some other traversal, and
    /// for highlighting live states in [`Pattern::write_dot`].
    pub fn advance(&self, states: &StateSet, fragment: &str) -> StateSet {
        self.nfa.match_segment(states, fragment)
    }

    /// True if any state in `states` accepts.
    pub fn accepts(&self, states: &StateSet) -> bool {
        self.nfa.any_accept(states)
    }
}
