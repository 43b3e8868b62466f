use serde::Serialize;

/// Token kinds produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    /// Not yet classified. Never survives lexing.
    Unknown,
    /// Single-quoted string (`'...'`).
    String,
    /// Signed integer literal.
    Int,
    /// Floating-point literal.
    Float,
    /// `true` or `false`.
    Bool,
    /// Opening paren `(`.
    OpenParen,
    /// Closing paren `)`.
    CloseParen,
    /// Opening brace `{`.
    OpenBrace,
    /// Closing brace `}`.
    CloseBrace,
    /// `:` between an object key and its value.
    Colon,
    /// `,` between arguments or object entries.
    Comma,
    /// Concatenation operator `+`.
    Plus,
    /// Line comment (`-- ...`).
    Comment,
    /// Word directly before a `:`.
    ObjectParamKey,
    /// Word directly before a `(`.
    FunctionName,
    /// Reserved word, currently only `select`.
    Keyword,
}

impl TokenKind {
    /// Literal kinds that can be wrapped directly into a literal node.
    #[must_use]
    pub const fn is_literal(self) -> bool {
        matches!(self, Self::String | Self::Int | Self::Float | Self::Bool)
    }
}

/// A single token with its kind, text, and byte offset into the query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub pos: usize,
}

impl Token {
    #[must_use]
    pub fn new(kind: TokenKind, value: impl Into<String>, pos: usize) -> Self {
        Self {
            kind,
            value: value.into(),
            pos,
        }
    }
}

/// Render a token sequence as pretty-printed JSON.
pub fn to_json(tokens: &[Token]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(tokens)
}
