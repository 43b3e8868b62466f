use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use crate::token::{Token, TokenKind};

/// Words promoted to `TokenKind::Keyword` at a whitespace boundary.
const KEYWORDS: &[&str] = &["select"];

/// Classifies a lexer error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    /// String literal never closed by a `'`.
    UnterminatedString,
    /// A one-character lookahead ran past the end of the query.
    UnexpectedEndOfInput,
    /// A `-` not followed by a second `-`.
    DanglingDash,
    /// A word that is not a literal, keyword, function name, or key.
    UnknownToken(String),
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnterminatedString => {
                write!(f, "unterminated string literal")
            }
            Self::UnexpectedEndOfInput => {
                write!(f, "unexpected end of input")
            }
            Self::DanglingDash => {
                write!(
                    f,
                    "found '-' in an unexpected location, \
                     '-' can only be used for comments or in strings"
                )
            }
            Self::UnknownToken(value) => {
                write!(f, "unknown token '{value}'")
            }
        }
    }
}

/// Error produced during lexing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at byte {pos}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub pos: usize,
}

/// Tokenize a query string into a sequence of tokens.
///
/// Empty input yields an empty sequence.
///
/// # Errors
///
/// Returns `LexError` on unterminated strings, a lone `-`,
/// or any word that could not be classified.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(input).tokenize()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Default,
    String,
    Comment,
}

/// Token under construction.
struct Scratch {
    value: String,
    kind: TokenKind,
    start: Option<usize>,
}

impl Scratch {
    const fn new() -> Self {
        Self {
            value: String::new(),
            kind: TokenKind::Unknown,
            start: None,
        }
    }

    fn reset(&mut self) {
        self.value.clear();
        self.kind = TokenKind::Unknown;
        self.start = None;
    }

    fn push(&mut self, pos: usize, ch: char) {
        if self.start.is_none() {
            self.start = Some(pos);
        }
        self.value.push(ch);
    }

    /// Classify a bare word as a literal. No-op if already typed.
    fn infer_literal(&mut self) {
        if self.kind != TokenKind::Unknown || self.value.is_empty() {
            return;
        }

        let value = self.value.trim();
        self.kind = if value == "true" || value == "false" {
            TokenKind::Bool
        } else if value.parse::<i64>().is_ok() {
            TokenKind::Int
        } else if value.parse::<f64>().is_ok() {
            TokenKind::Float
        } else {
            TokenKind::Unknown
        };
    }

    fn promote_keyword(&mut self) {
        if self.kind == TokenKind::Unknown && KEYWORDS.contains(&self.value.as_str()) {
            self.kind = TokenKind::Keyword;
        }
    }
}

struct Lexer<'a> {
    chars: Peekable<CharIndices<'a>>,
    tokens: Vec<Token>,
    scratch: Scratch,
    mode: Mode,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.char_indices().peekable(),
            tokens: Vec::new(),
            scratch: Scratch::new(),
            mode: Mode::Default,
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        while let Some((pos, ch)) = self.chars.next() {
            match self.mode {
                Mode::String => self.lex_string(pos, ch)?,
                Mode::Comment => self.lex_comment(ch),
                Mode::Default => self.lex_default(pos, ch)?,
            }
        }

        self.finish()
    }

    fn lex_string(&mut self, pos: usize, ch: char) -> Result<(), LexError> {
        match ch {
            '\'' => {
                self.flush();
                self.mode = Mode::Default;
            }
            '\\' => {
                if self.peek_char(pos)? == '\'' {
                    self.chars.next();
                    self.scratch.value.push('\'');
                } else {
                    self.scratch.value.push('\\');
                }
            }
            _ => self.scratch.value.push(ch),
        }
        Ok(())
    }

    fn lex_comment(&mut self, ch: char) {
        if ch == '\n' {
            self.flush();
            self.mode = Mode::Default;
        } else {
            self.scratch.value.push(ch);
        }
    }

    fn lex_default(&mut self, pos: usize, ch: char) -> Result<(), LexError> {
        match ch {
            ' ' | '\t' | '\n' | '\r' => self.end_word(),
            '\'' => {
                self.flush();
                self.scratch.kind = TokenKind::String;
                self.scratch.start = Some(pos);
                self.mode = Mode::String;
            }
            '-' => {
                if self.peek_char(pos)? != '-' {
                    return Err(LexError {
                        kind: LexErrorKind::DanglingDash,
                        pos,
                    });
                }
                self.chars.next(); // skip second dash
                self.flush();
                self.scratch.kind = TokenKind::Comment;
                self.scratch.start = Some(pos);
                self.mode = Mode::Comment;
            }
            ':' => {
                self.name_word(TokenKind::ObjectParamKey);
                self.emit(TokenKind::Colon, ch, pos);
            }
            '(' => {
                self.name_word(TokenKind::FunctionName);
                self.emit(TokenKind::OpenParen, ch, pos);
            }
            '{' => {
                self.flush();
                self.emit(TokenKind::OpenBrace, ch, pos);
            }
            '+' => {
                self.flush();
                self.emit(TokenKind::Plus, ch, pos);
            }
            ',' => {
                self.scratch.infer_literal();
                self.flush();
                self.emit(TokenKind::Comma, ch, pos);
            }
            ')' => {
                self.scratch.infer_literal();
                self.flush();
                self.emit(TokenKind::CloseParen, ch, pos);
            }
            '}' => {
                self.scratch.infer_literal();
                self.flush();
                self.emit(TokenKind::CloseBrace, ch, pos);
            }
            _ => self.scratch.push(pos, ch),
        }
        Ok(())
    }

    fn peek_char(&mut self, pos: usize) -> Result<char, LexError> {
        self.chars
            .peek()
            .map(|&(_, ch)| ch)
            .ok_or(LexError {
                kind: LexErrorKind::UnexpectedEndOfInput,
                pos,
            })
    }

    fn emit(&mut self, kind: TokenKind, ch: char, pos: usize) {
        self.tokens.push(Token::new(kind, ch.to_string(), pos));
    }

    /// Finalize the scratch token at a whitespace boundary.
    fn end_word(&mut self) {
        self.scratch.infer_literal();
        self.scratch.promote_keyword();
        self.flush();
    }

    /// Finalize the scratch token as a name (function or object key).
    fn name_word(&mut self, kind: TokenKind) {
        if self.scratch.value.is_empty() {
            // `name (` or `key :`: the word was already finalized
            // at the whitespace boundary.
            if let Some(last) = self.tokens.last_mut() {
                if last.kind == TokenKind::Unknown {
                    last.kind = kind;
                }
            }
        } else {
            self.scratch.kind = kind;
        }
        self.flush();
    }

    fn flush(&mut self) {
        let kind = self.scratch.kind;
        let start = self.scratch.start;
        let mut value = std::mem::take(&mut self.scratch.value);
        if kind != TokenKind::String {
            value = value.trim().to_string();
        }
        self.scratch.reset();

        // Empty strings are kept, empty words are not.
        if let Some(pos) = start {
            if kind == TokenKind::String || !value.is_empty() {
                self.tokens.push(Token { kind, value, pos });
            }
        }
    }

    fn finish(mut self) -> Result<Vec<Token>, LexError> {
        match self.mode {
            Mode::String => {
                return Err(LexError {
                    kind: LexErrorKind::UnterminatedString,
                    pos: self.scratch.start.unwrap_or(0),
                });
            }
            Mode::Comment => self.flush(),
            Mode::Default => self.end_word(),
        }

        if let Some(token) = self.tokens.iter().find(|t| t.kind == TokenKind::Unknown) {
            return Err(LexError {
                kind: LexErrorKind::UnknownToken(token.value.clone()),
                pos: token.pos,
            });
        }

        Ok(self.tokens)
    }
}
