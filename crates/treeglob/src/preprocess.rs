//! Token-sequence rewrites applied between lexing and parsing.
//!
//! `**` is compiled as a self-loop, which on its own always consumes at
//! least the separator next to it. Wrapping `**/` in an empty-branch
//! alternation lets it also match zero path segments, which is what users
//! expect of `a/**/b` matching `a/b`.

use directories::BaseDirs;

use crate::token::Token;

/// Rewrites, in order:
/// - prefix `**/` becomes `{,**/}`
/// - prefix `~/` becomes the home directory, when it can be determined
/// - every `/**/` becomes `/{,**/}`
/// - any remaining `~` reverts to a plain literal
pub(crate) fn preprocess(tokens: Vec<Token>) -> Vec<Token> {
    preprocess_with_home(tokens, home_tokens())
}

/// The home directory injected for a `~/` prefix is a parameter so tests
/// are not hostage to the environment.
pub(crate) fn preprocess_with_home(mut tokens: Vec<Token>, home: Option<Vec<Token>>) -> Vec<Token> {
    const DOUBLE_STAR_PREFIX: [Token; 2] = [Token::DoubleStar, Token::Literal('/')];
    const ZERO_SEGMENT: [Token; 5] = [
        Token::OpenBrace,
        Token::Comma,
        Token::DoubleStar,
        Token::Literal('/'),
        Token::CloseBrace,
    ];
    tokens = replace_prefix(tokens, &DOUBLE_STAR_PREFIX, &ZERO_SEGMENT);

    if tokens.starts_with(&[Token::Tilde, Token::Literal('/')]) {
        if let Some(home) = home {
            // The home sequence ends with its own separator.
            tokens.splice(..2, home);
        }
    }

    const INTERIOR: [Token; 3] = [
        Token::Literal('/'),
        Token::DoubleStar,
        Token::Literal('/'),
    ];
    const INTERIOR_SUB: [Token; 6] = [
        Token::Literal('/'),
        Token::OpenBrace,
        Token::Comma,
        Token::DoubleStar,
        Token::Literal('/'),
        Token::CloseBrace,
    ];
    tokens = replace_all(tokens, &INTERIOR, &INTERIOR_SUB);

    // A tilde anywhere else means nothing special.
    for t in &mut tokens {
        if *t == Token::Tilde {
            *t = Token::Literal('~');
        }
    }

    tokens
}

fn replace_prefix(tokens: Vec<Token>, find: &[Token], sub: &[Token]) -> Vec<Token> {
    if !tokens.starts_with(find) {
        return tokens;
    }
    let mut out = Vec::with_capacity(tokens.len() + sub.len() - find.len());
    out.extend_from_slice(sub);
    out.extend_from_slice(&tokens[find.len()..]);
    out
}

/// Replace every non-overlapping occurrence of `find`, left to right.
fn replace_all(tokens: Vec<Token>, find: &[Token], sub: &[Token]) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i..].starts_with(find) {
            out.extend_from_slice(sub);
            i += find.len();
        } else {
            out.push(tokens[i]);
            i += 1;
        }
    }
    out
}

/// The current user's home directory as a literal token sequence ending in
/// a separator, or `None` if it cannot be determined.
fn home_tokens() -> Option<Vec<Token>> {
    let dirs = BaseDirs::new()?;
    let home = dirs.home_dir().to_str()?;
    let mut toks: Vec<Token> = home
        .chars()
        .map(|c| {
            Token::Literal(if c == std::path::MAIN_SEPARATOR { '/' } else { c })
        })
        .collect();
    if toks.last() != Some(&Token::Literal('/')) {
        toks.push(Token::Literal('/'));
    }
    Some(toks)
}

/// Split the longest literal prefix, up to and including its last `/`, off
/// the token sequence. That prefix is where the directory walk starts.
pub(crate) fn find_root(tokens: &[Token]) -> (String, &[Token]) {
    let mut root = String::new();
    let mut last_slash = None;
    for (i, t) in tokens.iter().enumerate() {
        let Some(c) = t.literal() else { break };
        if c == '/' {
            last_slash = Some((i, root.len() + 1));
        }
        root.push(c);
    }
    match last_slash {
        Some((i, len)) => {
            root.truncate(len);
            (root, &tokens[i + 1..])
        }
        None => (String::new(), tokens),
    }
}
