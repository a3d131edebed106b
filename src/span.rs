//! Span types for tying together tokens, source code, and ast nodes.

/// A byte offset into the source text.
pub type Position = usize;

/// An inclusive `[start, end]` byte range in the original source.
///
/// `end` is the offset of the last byte the span covers, not one-past-the-end;
/// this matches how the lexer reports single-character spans (`start == end`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub const ZERO: Span = Span { start: 0, end: 0 };

    pub fn new(start: Position, end: Position) -> Self {
        Span { start, end }
    }

    /// A span covering a single byte position.
    pub fn at(pos: Position) -> Self {
        Span { start: pos, end: pos }
    }

    /// The smallest span containing both `a` and `b`.
    pub fn join(a: Span, b: Span) -> Self {
        Span {
            start: a.start.min(b.start),
            end: a.end.max(b.end),
        }
    }
}
