//! Reserved-word table for the lexer.

use phf::phf_map;

use super::token::TokenKind;

/// Maps a reserved identifier spelling to its keyword [`TokenKind`].
///
/// Anything not in this table that matches `[A-Za-z_][A-Za-z0-9_]*` lexes as
/// a plain `Identifier`.
pub static KEYWORDS: phf::Map<&'static str, TokenKind> = phf_map! {
    "false" => TokenKind::False,
    "true" => TokenKind::True,
    "nil" => TokenKind::Nil,
    "self" => TokenKind::SelfKw,
    "if" => TokenKind::If,
    "else" => TokenKind::Else,
    "end" => TokenKind::End,
    "while" => TokenKind::While,
    "return" => TokenKind::Return,
};
