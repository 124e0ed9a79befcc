//! Thompson-style construction of the pattern automaton.
//!
//! Every production keeps the one-in, one-out shape: a sub-parse returns an
//! entry and an exit state, and composite forms (alternation, classes,
//! extglob) wire branches between a branch state and a merge state with
//! ε-edges. The ε-edges are cheap to build here and mostly eliminated by
//! the reducer afterwards.

use thiserror::Error;

use crate::expr::Expr;
use crate::nfa::{Nfa, StateId};
use crate::token::{Token, TokenStream};

/// Errors from pattern compilation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unterminated alternation - missing closing brace")]
    UnterminatedAlternation,
    #[error("unterminated char class - missing closing square bracket")]
    UnterminatedCharClass,
    #[error("invalid {0:?} within char class")]
    InvalidInsideClass(String),
    #[error("unterminated extglob - missing closing parenthesis")]
    UnterminatedExtglob,
    #[error("negative extglob !(...) is not supported")]
    NegatedExtglob,
}

/// What ended a sub-parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeqEnd {
    /// End of the token stream.
    Input,
    /// `,` inside an alternation.
    Comma,
    /// `}` closing an alternation.
    CloseBrace,
    /// `|` inside an extglob.
    Pipe,
    /// `)` closing an extglob.
    CloseParen,
}

/// Which enclosing form the current sequence belongs to. Terminator tokens
/// only terminate in the matching context; elsewhere they are literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Top,
    Alternation,
    Extglob,
}

/// Extglob repetition behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Repeat {
    /// `@( … )`
    One,
    /// `?( … )`
    ZeroOrOne,
    /// `*( … )`
    ZeroOrMore,
    /// `+( … )`
    OneOrMore,
}

/// Build the automaton for a whole token sequence into `nfa`.
///
/// Returns the initial state; the final state of the sequence is flagged
/// accepting. The caller decides whether to run the reducer.
pub(crate) fn parse_tokens(tokens: &[Token], nfa: &mut Nfa) -> Result<StateId, ParseError> {
    let mut ts = TokenStream::new(tokens);
    let (start, end, _) = parse_sequence(&mut ts, nfa, Context::Top)?;
    nfa.state_mut(end).accept = true;
    Ok(start)
}

/// Allocate a new tail state reached from `end` over `e`.
fn append_exp(nfa: &mut Nfa, end: StateId, e: Expr) -> StateId {
    let next = nfa.add_state();
    nfa.add_edge(end, Some(e), next);
    next
}

fn parse_sequence(
    ts: &mut TokenStream<'_>,
    nfa: &mut Nfa,
    ctx: Context,
) -> Result<(StateId, StateId, SeqEnd), ParseError> {
    let start = nfa.add_state();
    let mut end = start;

    loop {
        let Some(t) = ts.next() else {
            return Ok((start, end, SeqEnd::Input));
        };
        match t {
            Token::Literal(c) => end = append_exp(nfa, end, Expr::Literal(c)),
            Token::Question => end = append_exp(nfa, end, Expr::Any),
            // `*` stays in place: zero or more non-separator runes.
            Token::Star => nfa.add_edge(end, Some(Expr::Star), end),
            Token::DoubleStar => nfa.add_edge(end, Some(Expr::DoubleStar), end),
            Token::OpenBrace => end = parse_alternation(ts, nfa, end)?,
            Token::OpenBracket => end = parse_char_class(ts, nfa, end)?,
            Token::BracketCaret => end = parse_negated_class(ts, nfa, end)?,
            Token::CloseBrace if ctx == Context::Alternation => {
                return Ok((start, end, SeqEnd::CloseBrace));
            }
            Token::Comma if ctx == Context::Alternation => {
                return Ok((start, end, SeqEnd::Comma));
            }
            Token::Pipe if ctx == Context::Extglob => {
                return Ok((start, end, SeqEnd::Pipe));
            }
            Token::CloseParen if ctx == Context::Extglob => {
                return Ok((start, end, SeqEnd::CloseParen));
            }
            // Terminators outside their context revert to literals.
            Token::CloseBrace => end = append_exp(nfa, end, Expr::Literal('}')),
            Token::Comma => end = append_exp(nfa, end, Expr::Literal(',')),
            Token::Pipe => end = append_exp(nfa, end, Expr::Literal('|')),
            Token::CloseParen => end = append_exp(nfa, end, Expr::Literal(')')),
            Token::QuestionParen => end = parse_extglob(ts, nfa, end, Repeat::ZeroOrOne)?,
            Token::StarParen => end = parse_extglob(ts, nfa, end, Repeat::ZeroOrMore)?,
            Token::PlusParen => end = parse_extglob(ts, nfa, end, Repeat::OneOrMore)?,
            Token::AtParen => end = parse_extglob(ts, nfa, end, Repeat::One)?,
            Token::BangParen => return Err(ParseError::NegatedExtglob),
            // The lexer only emits these in positions handled above; treat
            // strays as the runes they came from.
            Token::CloseBracket => end = append_exp(nfa, end, Expr::Literal(']')),
            Token::Tilde => end = append_exp(nfa, end, Expr::Literal('~')),
        }
    }
}

/// `{a,b,…}`: branch from `from` into each comma-separated sequence, then
/// merge.
fn parse_alternation(
    ts: &mut TokenStream<'_>,
    nfa: &mut Nfa,
    from: StateId,
) -> Result<StateId, ParseError> {
    let merge = nfa.add_state();
    loop {
        let (branch, branch_end, done) = parse_sequence(ts, nfa, Context::Alternation)?;
        nfa.add_edge(from, None, branch);
        nfa.add_edge(branch_end, None, merge);
        match done {
            SeqEnd::Comma => continue,
            SeqEnd::CloseBrace => return Ok(merge),
            _ => return Err(ParseError::UnterminatedAlternation),
        }
    }
}

/// `[abc]`: one single-rune branch per member, sharing a merge state.
fn parse_char_class(
    ts: &mut TokenStream<'_>,
    nfa: &mut Nfa,
    from: StateId,
) -> Result<StateId, ParseError> {
    let merge = nfa.add_state();
    loop {
        match ts.next() {
            None => return Err(ParseError::UnterminatedCharClass),
            Some(Token::Literal(c)) => nfa.add_edge(from, Some(Expr::Literal(c)), merge),
            Some(Token::CloseBracket) => return Ok(merge),
            Some(other) => return Err(ParseError::InvalidInsideClass(other.text())),
        }
    }
}

/// `[^…]`: a single edge refusing the collected runes.
fn parse_negated_class(
    ts: &mut TokenStream<'_>,
    nfa: &mut Nfa,
    from: StateId,
) -> Result<StateId, ParseError> {
    let mut runes = std::collections::BTreeSet::new();
    loop {
        match ts.next() {
            None => return Err(ParseError::UnterminatedCharClass),
            Some(Token::Literal(c)) => {
                runes.insert(c);
            }
            Some(Token::CloseBracket) => {
                let merge = nfa.add_state();
                let runes: Vec<char> = runes.into_iter().collect();
                let expr = if runes.len() == 1 {
                    Expr::NegatedLiteral(runes[0])
                } else {
                    Expr::NegatedSet(runes)
                };
                nfa.add_edge(from, Some(expr), merge);
                return Ok(merge);
            }
            Some(other) => return Err(ParseError::InvalidInsideClass(other.text())),
        }
    }
}

/// The affirmative extglob forms: an alternation over `|`-separated
/// branches, plus an ε bypass for the zero-allowed forms and an ε loop
/// back for the repeating forms.
fn parse_extglob(
    ts: &mut TokenStream<'_>,
    nfa: &mut Nfa,
    from: StateId,
    rep: Repeat,
) -> Result<StateId, ParseError> {
    let merge = nfa.add_state();
    loop {
        let (branch, branch_end, done) = parse_sequence(ts, nfa, Context::Extglob)?;
        nfa.add_edge(from, None, branch);
        nfa.add_edge(branch_end, None, merge);
        match done {
            SeqEnd::Pipe => continue,
            SeqEnd::CloseParen => break,
            _ => return Err(ParseError::UnterminatedExtglob),
        }
    }
    if matches!(rep, Repeat::ZeroOrOne | Repeat::ZeroOrMore) {
        nfa.add_edge(from, None, merge);
    }
    if matches!(rep, Repeat::OneOrMore | Repeat::ZeroOrMore) {
        nfa.add_edge(merge, None, from);
    }
    Ok(merge)
}
