//! Byte stream to token sequence. Failures are reported in-band as `Error` tokens.

pub mod keywords;
pub mod token;

use crate::span::Span;
use token::{Token, TokenKind};

/// A streaming, byte-offset-tracking scanner over a single source string.
pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer { source, bytes: source.as_bytes(), pos: 0 }
    }

    /// Drains the whole source into a token sequence, terminated by exactly
    /// one `Eof` token.
    pub fn tokens(source: &'a str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next();
            let is_eof = tok.is_eof();
            out.push(tok);
            if is_eof {
                break;
            }
        }
        out
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn slice(&self, start: usize, end_exclusive: usize) -> &'a str {
        &self.source[start..end_exclusive]
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            match b {
                b' ' | b'\t' | b'\r' => {
                    self.pos += 1;
                }
                _ => break,
            }
        }
    }

    /// Produces the next token, advancing the cursor past it.
    pub fn next(&mut self) -> Token {
        self.skip_whitespace();

        let start = self.pos;
        let Some(c) = self.peek() else {
            let tok = Token::new(TokenKind::Eof, Span::at(start));
            log::trace!("lex: {:?}", tok.kind);
            return tok;
        };

        let tok = match c {
            b'\n' => {
                self.pos += 1;
                Token::new(TokenKind::Newline, Span::at(start))
            }
            b';' => self.single(TokenKind::Semicolon, start),
            b',' => self.single(TokenKind::Comma, start),
            b'(' => self.single(TokenKind::LParen, start),
            b')' => self.single(TokenKind::RParen, start),
            b'+' => self.single(TokenKind::Plus, start),
            b'-' => self.single(TokenKind::Minus, start),
            b'*' => self.single(TokenKind::Star, start),
            b'/' => self.single(TokenKind::Slash, start),
            b'=' => self.one_or_two(b'=', TokenKind::Equal, TokenKind::EqualEqual, start),
            b'!' => self.one_or_two(b'=', TokenKind::Bang, TokenKind::NotEqual, start),
            b'>' => self.one_or_two(b'=', TokenKind::Greater, TokenKind::GreaterEqual, start),
            b'<' => self.one_or_two(b'=', TokenKind::Less, TokenKind::LessEqual, start),
            b'"' => self.string(start),
            b'0'..=b'9' => self.number(start),
            b'A'..=b'Z' | b'a'..=b'z' | b'_' => self.identifier_or_keyword(start),
            other => {
                self.pos += 1;
                let ch = other as char;
                Token::with_lexeme(
                    TokenKind::Error,
                    Span::new(start, start),
                    format!("unexpected char `{ch}`"),
                )
            }
        };

        log::trace!("lex: {:?} {:?}", tok.kind, tok.lexeme);
        tok
    }

    fn single(&mut self, kind: TokenKind, start: usize) -> Token {
        self.pos += 1;
        Token::new(kind, Span::at(start))
    }

    fn one_or_two(&mut self, second: u8, one: TokenKind, two: TokenKind, start: usize) -> Token {
        self.pos += 1;
        if self.peek() == Some(second) {
            self.pos += 1;
            Token::new(two, Span::new(start, start + 1))
        } else {
            Token::new(one, Span::at(start))
        }
    }

    fn identifier_or_keyword(&mut self, start: usize) -> Token {
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || b == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = self.slice(start, self.pos);
        let span = Span::new(start, self.pos - 1);
        match keywords::KEYWORDS.get(text) {
            Some(kind) => Token::new(*kind, span),
            None => Token::with_lexeme(TokenKind::Identifier, span, text),
        }
    }

    fn number(&mut self, start: usize) -> Token {
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        let digit_run_end = self.pos;
        let digits = self.slice(start, digit_run_end);

        let mut is_float = false;

        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b'0'..=b'9')) {
            is_float = true;
            self.pos += 1; // '.'
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }

        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            let mut lookahead = 1;
            if matches!(self.peek_at(lookahead), Some(b'+') | Some(b'-')) {
                lookahead += 1;
            }
            if matches!(self.peek_at(lookahead), Some(b'0'..=b'9')) {
                is_float = true;
                self.pos += lookahead;
                while matches!(self.peek(), Some(b'0'..=b'9')) {
                    self.pos += 1;
                }
            }
        }

        let span = Span::new(start, self.pos - 1);
        let text = self.slice(start, self.pos);

        if !is_float && digits.len() > 1 && digits.starts_with('0') {
            return Token::with_lexeme(
                TokenKind::Error,
                span,
                "illegal trailing zero in number literal",
            );
        }

        if is_float {
            Token::with_lexeme(TokenKind::Float, span, text)
        } else {
            Token::with_lexeme(TokenKind::Integer, span, text)
        }
    }

    fn string(&mut self, start: usize) -> Token {
        self.pos += 1; // opening quote
        let mut decoded = String::new();

        loop {
            let Some(b) = self.peek() else {
                let end = self.source.len().saturating_sub(1);
                self.pos = self.source.len();
                return Token::with_lexeme(TokenKind::Error, Span::new(start, end), "unterminated string literal");
            };

            if b == b'"' {
                let end = self.pos;
                self.pos += 1;
                return Token::with_lexeme(TokenKind::String, Span::new(start, end), decoded);
            }

            if b == b'\\' {
                let escape_pos = self.pos + 1;
                let Some(escape) = self.peek_at(1) else {
                    let end = self.source.len().saturating_sub(1);
                    self.pos = self.source.len();
                    return Token::with_lexeme(
                        TokenKind::Error,
                        Span::new(start, end),
                        "unterminated string literal",
                    );
                };

                match escape {
                    b'n' => {
                        decoded.push('\n');
                        self.pos += 2;
                    }
                    b't' => {
                        decoded.push('\t');
                        self.pos += 2;
                    }
                    b'r' => {
                        decoded.push('\r');
                        self.pos += 2;
                    }
                    b'"' => {
                        decoded.push('"');
                        self.pos += 2;
                    }
                    b'\\' => {
                        decoded.push('\\');
                        self.pos += 2;
                    }
                    b'u' => {
                        let digits_start = escape_pos + 1;
                        let digits_end = (digits_start + 4).min(self.bytes.len());
                        let hex = self.source.get(digits_start..digits_end).unwrap_or("");
                        let decoded_char = (hex.len() == 4)
                            .then(|| u32::from_str_radix(hex, 16).ok())
                            .flatten()
                            .and_then(char::from_u32);

                        match decoded_char {
                            Some(c) => {
                                decoded.push(c);
                                self.pos = digits_end;
                            }
                            None => {
                                let end = (digits_end.saturating_sub(1)).max(escape_pos);
                                self.pos = digits_end;
                                return Token::with_lexeme(
                                    TokenKind::Error,
                                    Span::new(start, end),
                                    "invalid unicode escape",
                                );
                            }
                        }
                    }
                    other => {
                        let ch = other as char;
                        self.pos = escape_pos + 1;
                        return Token::with_lexeme(
                            TokenKind::Error,
                            Span::new(start, escape_pos),
                            format!("invalid escape `\\{ch}`"),
                        );
                    }
                }
                continue;
            }

            // Advance by one full UTF-8 scalar so multi-byte source text
            // inside a string literal is copied through intact.
            let ch_len = self.source[self.pos..]
                .chars()
                .next()
                .map(|c| c.len_utf8())
                .unwrap_or(1);
            decoded.push_str(&self.source[self.pos..self.pos + ch_len]);
            self.pos += ch_len;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::tokens(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn ends_with_single_eof() {
        let toks = Lexer::tokens("a + b");
        assert_eq!(toks.last().unwrap().kind, TokenKind::Eof);
        assert_eq!(toks.iter().filter(|t| t.kind == TokenKind::Eof).count(), 1);
    }

    #[test]
    fn every_span_is_in_bounds() {
        let source = "a = 1\nwhile a < 5\n  a = a + 2\nend\na";
        for tok in Lexer::tokens(source) {
            assert!(tok.span.start <= source.len());
            assert!(tok.span.end <= source.len());
        }
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("if else end while return true false nil self other"),
            vec![
                TokenKind::If,
                TokenKind::Else,
                TokenKind::End,
                TokenKind::While,
                TokenKind::Return,
                TokenKind::True,
                TokenKind::False,
                TokenKind::Nil,
                TokenKind::SelfKw,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn greedy_two_char_operators() {
        assert_eq!(
            kinds("== != >= <= = ! > <"),
            vec![
                TokenKind::EqualEqual,
                TokenKind::NotEqual,
                TokenKind::GreaterEqual,
                TokenKind::LessEqual,
                TokenKind::Equal,
                TokenKind::Bang,
                TokenKind::Greater,
                TokenKind::Less,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn leading_zero_integer_is_an_error() {
        let toks = Lexer::tokens("0124");
        assert_eq!(toks[0].kind, TokenKind::Error);
        assert_eq!(toks[0].text(), "illegal trailing zero in number literal");
    }

    #[test]
    fn leading_zero_allowed_once_fractional() {
        let toks = Lexer::tokens("0.12");
        assert_eq!(toks[0].kind, TokenKind::Float);
        assert_eq!(toks[0].text(), "0.12");
    }

    #[test]
    fn float_with_exponent() {
        let toks = Lexer::tokens("12e4");
        assert_eq!(toks[0].kind, TokenKind::Float);
        assert_eq!(toks[0].text(), "12e4");
    }

    #[test]
    fn string_escapes() {
        let toks = Lexer::tokens(r#""a\nb\tc\"d\\e""#);
        assert_eq!(toks[0].kind, TokenKind::String);
        assert_eq!(toks[0].text(), "a\nb\tc\"d\\e");
    }

    #[test]
    fn string_unicode_escape() {
        let toks = Lexer::tokens("\"\\u00e9\"");
        assert_eq!(toks[0].kind, TokenKind::String);
        assert_eq!(toks[0].text(), "\u{e9}");
    }

    #[test]
    fn string_passes_through_literal_multibyte_chars() {
        let toks = Lexer::tokens(r#""é""#);
        assert_eq!(toks[0].kind, TokenKind::String);
        assert_eq!(toks[0].text(), "é");
    }

    #[test]
    fn invalid_unicode_escape_is_an_error() {
        let toks = Lexer::tokens(r#""\uzzzz""#);
        assert_eq!(toks[0].kind, TokenKind::Error);
        assert_eq!(toks[0].text(), "invalid unicode escape");
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let toks = Lexer::tokens("\"abc");
        assert_eq!(toks[0].kind, TokenKind::Error);
        assert_eq!(toks[0].text(), "unterminated string literal");
    }

    #[test]
    fn unknown_escape_is_an_error() {
        let toks = Lexer::tokens(r#""\q""#);
        assert_eq!(toks[0].kind, TokenKind::Error);
        assert_eq!(toks[0].text(), "invalid escape `\\q`");
    }

    #[test]
    fn unexpected_byte_restarts_after_error() {
        let toks = Lexer::tokens("1 @ 2");
        assert_eq!(toks[0].kind, TokenKind::Integer);
        assert_eq!(toks[1].kind, TokenKind::Error);
        assert_eq!(toks[1].text(), "unexpected char `@`");
        assert_eq!(toks[2].kind, TokenKind::Integer);
        assert_eq!(toks[2].text(), "2");
    }
}
