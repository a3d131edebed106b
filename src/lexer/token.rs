use crate::span::Span;

/// The kind of a [`Token`].
///
/// Kinds partition into structural tokens, operators, literals, and
/// keywords. `Error` and `String` are the only kinds that always carry a
/// lexeme; `Newline`/`Semicolon` never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum TokenKind {
    // Structural
    None,
    Eof,
    Error,
    Newline,
    Semicolon,
    Comma,
    LParen,
    RParen,

    // Operators
    Equal,
    Bang,
    EqualEqual,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Plus,
    Minus,
    Star,
    Slash,

    // Literals
    Integer,
    Float,
    String,
    Identifier,

    // Keywords
    False,
    True,
    Nil,
    SelfKw,
    If,
    Else,
    End,
    While,
    Return,
}

/// A single lexical token: a kind, the span of source it was scanned from,
/// and an optional lexeme.
///
/// Two tokens are equal iff all three fields match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub lexeme: Option<String>,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Token { kind, span, lexeme: None }
    }

    pub fn with_lexeme(kind: TokenKind, span: Span, lexeme: impl Into<String>) -> Self {
        Token { kind, span, lexeme: Some(lexeme.into()) }
    }

    /// The token's lexeme, or the empty string if it has none.
    pub fn text(&self) -> &str {
        self.lexeme.as_deref().unwrap_or("")
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}
