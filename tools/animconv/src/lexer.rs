//! Tokenizer for .anim sources
//!
//! Splits the source on whitespace and strips comments. Three line comment
//! markers are recognised (`#`, `;`, `//`) plus C-style `/* ... */` blocks.
//! A comment marker ends the token it touches, so `abc#def` yields `abc`.

use crate::error::LexError;

/// A whitespace-free slice of the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    /// 1-based line the token starts on
    pub line: usize,
}

impl<'a> Token<'a> {
    pub fn new(text: &'a str, line: usize) -> Self {
        Self { text, line }
    }
}

enum Comment {
    Line,
    Block,
}

/// Split `source` into tokens, discarding whitespace and comments
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>, LexError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    let mut line = 1;
    // (byte offset, line) of the token being accumulated
    let mut pending: Option<(usize, usize)> = None;

    while let Some((i, c)) = chars.next() {
        let next = chars.peek().map(|&(_, n)| n);
        let comment = match (c, next) {
            ('#' | ';', _) | ('/', Some('/')) => Some(Comment::Line),
            ('/', Some('*')) => Some(Comment::Block),
            _ => None,
        };

        if comment.is_none() && !c.is_whitespace() {
            if pending.is_none() {
                pending = Some((i, line));
            }
            continue;
        }

        if let Some((start, token_line)) = pending.take() {
            tokens.push(Token::new(&source[start..i], token_line));
        }

        match comment {
            Some(Comment::Line) => {
                for (_, c) in chars.by_ref() {
                    if c == '\n' {
                        line += 1;
                        break;
                    }
                }
            }
            Some(Comment::Block) => {
                let opened_at = line;
                // Skip the '*' of the opener so "/*/" does not close itself
                chars.next();

                let mut prev = None;
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '\n' {
                        line += 1;
                    }
                    if prev == Some('*') && c == '/' {
                        closed = true;
                        break;
                    }
                    prev = Some(c);
                }

                if !closed {
                    return Err(LexError::UnterminatedComment { line: opened_at });
                }
            }
            None => {
                if c == '\n' {
                    line += 1;
                }
            }
        }
    }

    if let Some((start, token_line)) = pending {
        tokens.push(Token::new(&source[start..], token_line));
    }

    Ok(tokens)
}
