//! Token stream to `Program` tree, with structured error recovery.

use crate::ast::Ast;
use crate::lexer::{
    token::{Token, TokenKind},
    Lexer,
};
use crate::span::Span;

/// The result of parsing a whole source string: an always-present tree
/// plus whatever diagnostics were collected along the way.
pub struct ParseResult {
    pub ast: Ast,
    pub errors: Vec<String>,
}

pub fn parse(source: &str) -> ParseResult {
    let tokens = Lexer::tokens(source);
    let mut parser = Parser { tokens, pos: 0, errors: Vec::new() };
    let ast = parser.parse_program();
    log::debug!(
        "parse: {} top-level statement(s), {} error(s)",
        match &ast {
            Ast::Program { statements, .. } => statements.len(),
            _ => 0,
        },
        parser.errors.len()
    );
    ParseResult { ast, errors: parser.errors }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<String>,
}

const BLOCK_SEPARATORS: &[TokenKind] = &[TokenKind::Newline, TokenKind::Semicolon];

impl Parser {
    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let tok = self.current().clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn skip_separators(&mut self) {
        while BLOCK_SEPARATORS.contains(&self.current().kind) {
            self.advance();
        }
    }

    /// Newlines are insignificant inside parens and right after a binary
    /// operator token. Swallow them without treating them as statement
    /// separators.
    fn skip_insignificant_newlines(&mut self) {
        while self.current().kind == TokenKind::Newline {
            self.advance();
        }
    }

    fn kind_name(kind: TokenKind) -> &'static str {
        use TokenKind::*;
        match kind {
            None => "NONE",
            Eof => "END_OF_FILE",
            Error => "ERROR",
            Newline => "NEWLINE",
            Semicolon => "SEMICOLON",
            Comma => "COMMA",
            LParen => "LPAREN",
            RParen => "RPAREN",
            Equal => "EQUAL",
            Bang => "BANG",
            EqualEqual => "EQUAL_EQUAL",
            NotEqual => "NOT_EQUAL",
            Greater => "GREATER",
            GreaterEqual => "GREATER_EQUAL",
            Less => "LESS",
            LessEqual => "LESS_EQUAL",
            Plus => "PLUS",
            Minus => "MINUS",
            Star => "STAR",
            Slash => "SLASH",
            Integer => "INTEGER",
            Float => "FLOAT",
            String => "STRING",
            Identifier => "IDENTIFIER",
            False => "FALSE",
            True => "TRUE",
            Nil => "NIL",
            SelfKw => "SELF",
            If => "IF",
            Else => "ELSE",
            End => "END",
            While => "WHILE",
            Return => "RETURN",
        }
    }

    fn ast_kind_name(ast: &Ast) -> &'static str {
        match ast {
            Ast::IntegerLiteral { .. } => "INTEGER",
            Ast::FloatLiteral { .. } => "FLOAT",
            Ast::StringLiteral { .. } => "STRING",
            Ast::TrueLiteral { .. } => "TRUE",
            Ast::FalseLiteral { .. } => "FALSE",
            Ast::NilLiteral { .. } => "NIL",
            Ast::SelfLiteral { .. } => "SELF",
            Ast::Identifier { .. } => "IDENTIFIER",
            Ast::Unary { .. } => "UNARY_EXPRESSION",
            Ast::Binary { .. } => "BINARY_EXPRESSION",
            Ast::Assignment { .. } => "ASSIGNMENT",
            Ast::Return { .. } => "RETURN",
            Ast::If { .. } => "IF",
            Ast::While { .. } => "WHILE",
            Ast::FunctionCall { .. } => "FUNCTION_CALL",
            Ast::Invalid { .. } => "INVALID",
            Ast::ExpressionStatement { .. } | Ast::Program { .. } => "STATEMENT",
        }
    }

    /// Require `kind` at the cursor. Unlike the statement-separator check,
    /// this never force-consumes a mismatched token. It just flags the
    /// error and lets recovery elsewhere make progress, the way a
    /// panic-mode recursive descent parser's `consume()` usually does.
    fn expect_token(&mut self, kind: TokenKind, expected: &str) -> Token {
        if self.current().kind == kind {
            return self.advance();
        }
        let found = self.current().clone();
        if found.kind != TokenKind::Error {
            self.errors
                .push(format!("unexpected {}, expected {}", Self::kind_name(found.kind), expected));
        }
        found
    }

    fn expect_separator(&mut self) {
        if BLOCK_SEPARATORS.contains(&self.current().kind) {
            self.skip_separators();
            return;
        }
        let found = self.current().clone();
        if found.kind != TokenKind::Error && found.kind != TokenKind::Eof {
            self.errors.push(format!(
                "unexpected {}, expected a statement separator",
                Self::kind_name(found.kind)
            ));
        }
    }

    fn parse_program(&mut self) -> Ast {
        let start = self.current().span;
        self.skip_separators();
        let mut statements = Vec::new();
        while !self.current().is_eof() {
            statements.push(self.parse_statement());
            self.skip_separators();
        }
        let end = self.tokens.last().map(|t| t.span).unwrap_or(start);
        let span = statements
            .first()
            .map(|first| Span::join(first.span(), end))
            .unwrap_or_else(|| Span::join(start, end));
        Ast::Program { statements, span }
    }

    fn parse_statement(&mut self) -> Ast {
        let expr = self.parse_expression();
        let start = expr.span();

        match self.current().kind {
            TokenKind::Newline | TokenKind::Semicolon => {
                let sep = self.advance();
                let span = Span::join(start, sep.span);
                Ast::ExpressionStatement { expression: Box::new(expr), span }
            }
            TokenKind::Eof => Ast::ExpressionStatement { expression: Box::new(expr), span: start },
            TokenKind::Error => {
                // Already (or about to be) flagged by the lexer itself when
                // the next statement's primary() consumes it. No duplicate
                // "expected a separator" diagnostic here.
                Ast::ExpressionStatement { expression: Box::new(expr), span: start }
            }
            other => {
                self.errors.push(format!(
                    "unexpected {}, expected a statement separator",
                    Self::kind_name(other)
                ));
                Ast::ExpressionStatement { expression: Box::new(expr), span: start }
            }
        }
    }

    fn parse_block_until(&mut self, stop: &[TokenKind]) -> Vec<Ast> {
        let mut statements = Vec::new();
        self.skip_separators();
        while !stop.contains(&self.current().kind) && !self.current().is_eof() {
            statements.push(self.parse_statement());
            self.skip_separators();
        }
        statements
    }

    fn parse_expression(&mut self) -> Ast {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Ast {
        let left = self.parse_equality();

        if self.current().kind != TokenKind::Equal {
            return left;
        }

        self.advance();
        self.skip_insignificant_newlines();
        let value = self.parse_assignment();

        if !matches!(left, Ast::Identifier { .. }) {
            self.errors
                .push(format!("unexpected `{}`, expected an identifier", Self::ast_kind_name(&left)));
        }

        let span = Span::join(left.span(), value.span());
        Ast::Assignment { target: Box::new(left), value: Box::new(value), span }
    }

    fn parse_equality(&mut self) -> Ast {
        let mut left = self.parse_comparison();
        while matches!(self.current().kind, TokenKind::EqualEqual | TokenKind::NotEqual) {
            let operator_token = self.advance();
            self.skip_insignificant_newlines();
            let right = self.parse_comparison();
            let span = Span::join(left.span(), right.span());
            left = Ast::Binary { operator_token, left: Box::new(left), right: Box::new(right), span };
        }
        left
    }

    fn parse_comparison(&mut self) -> Ast {
        let mut left = self.parse_additive();
        while matches!(
            self.current().kind,
            TokenKind::Greater | TokenKind::GreaterEqual | TokenKind::Less | TokenKind::LessEqual
        ) {
            let operator_token = self.advance();
            self.skip_insignificant_newlines();
            let right = self.parse_additive();
            let span = Span::join(left.span(), right.span());
            left = Ast::Binary { operator_token, left: Box::new(left), right: Box::new(right), span };
        }
        left
    }

    fn parse_additive(&mut self) -> Ast {
        let mut left = self.parse_multiplicative();
        while matches!(self.current().kind, TokenKind::Plus | TokenKind::Minus) {
            let operator_token = self.advance();
            self.skip_insignificant_newlines();
            let right = self.parse_multiplicative();
            let span = Span::join(left.span(), right.span());
            left = Ast::Binary { operator_token, left: Box::new(left), right: Box::new(right), span };
        }
        left
    }

    fn parse_multiplicative(&mut self) -> Ast {
        let mut left = self.parse_unary();
        while matches!(self.current().kind, TokenKind::Star | TokenKind::Slash) {
            let operator_token = self.advance();
            self.skip_insignificant_newlines();
            let right = self.parse_unary();
            let span = Span::join(left.span(), right.span());
            left = Ast::Binary { operator_token, left: Box::new(left), right: Box::new(right), span };
        }
        left
    }

    fn parse_unary(&mut self) -> Ast {
        if matches!(self.current().kind, TokenKind::Bang | TokenKind::Minus | TokenKind::Plus) {
            let operator_token = self.advance();
            let operand = self.parse_unary();
            let span = Span::join(operator_token.span, operand.span());
            return Ast::Unary { operator_token, operand: Box::new(operand), span };
        }
        self.parse_call()
    }

    fn parse_call(&mut self) -> Ast {
        let primary = self.parse_primary();

        let name = match &primary {
            Ast::Identifier { name, .. } => name.clone(),
            _ => return primary,
        };

        if self.current().kind != TokenKind::LParen {
            return primary;
        }

        let start_span = primary.span();
        self.advance(); // '('
        self.skip_insignificant_newlines();

        let mut arguments = Vec::new();
        if self.current().kind != TokenKind::RParen {
            loop {
                self.skip_insignificant_newlines();
                arguments.push(self.parse_expression());
                self.skip_insignificant_newlines();
                if self.current().kind == TokenKind::Comma {
                    self.advance();
                    self.skip_insignificant_newlines();
                    if self.current().kind == TokenKind::RParen {
                        break;
                    }
                    continue;
                }
                break;
            }
        }
        self.skip_insignificant_newlines();
        let rparen = self.expect_token(TokenKind::RParen, "RPAREN");
        let span = Span::join(start_span, rparen.span);
        Ast::FunctionCall { name, arguments, span }
    }

    fn parse_primary(&mut self) -> Ast {
        let tok = self.current().clone();
        match tok.kind {
            TokenKind::Integer => {
                self.advance();
                Ast::IntegerLiteral { digits: tok.text().to_string(), span: tok.span }
            }
            TokenKind::Float => {
                self.advance();
                Ast::FloatLiteral { digits: tok.text().to_string(), span: tok.span }
            }
            TokenKind::String => {
                self.advance();
                Ast::StringLiteral { decoded: tok.text().to_string(), span: tok.span }
            }
            TokenKind::True => {
                self.advance();
                Ast::TrueLiteral { span: tok.span }
            }
            TokenKind::False => {
                self.advance();
                Ast::FalseLiteral { span: tok.span }
            }
            TokenKind::Nil => {
                self.advance();
                Ast::NilLiteral { span: tok.span }
            }
            TokenKind::SelfKw => {
                self.advance();
                Ast::SelfLiteral { span: tok.span }
            }
            TokenKind::Identifier => {
                self.advance();
                Ast::Identifier { name: tok.text().to_string(), span: tok.span }
            }
            TokenKind::Return => self.parse_return(tok),
            TokenKind::If => self.parse_if(tok),
            TokenKind::While => self.parse_while(tok),
            TokenKind::LParen => self.parse_group(tok),
            TokenKind::Error => {
                self.advance();
                self.errors.push(tok.text().to_string());
                Ast::Invalid { token: tok.clone(), span: tok.span }
            }
            other => {
                self.errors
                    .push(format!("unexpected {}, expected an expression", Self::kind_name(other)));
                self.advance();
                Ast::Invalid { token: tok.clone(), span: tok.span }
            }
        }
    }

    fn parse_return(&mut self, return_tok: Token) -> Ast {
        self.advance();
        let starts_expression = !matches!(
            self.current().kind,
            TokenKind::Newline
                | TokenKind::Semicolon
                | TokenKind::Eof
                | TokenKind::RParen
                | TokenKind::Comma
                | TokenKind::End
                | TokenKind::Else
        );
        let value = if starts_expression { Some(Box::new(self.parse_expression())) } else { None };
        let span = match &value {
            Some(v) => Span::join(return_tok.span, v.span()),
            None => return_tok.span,
        };
        Ast::Return { value, span }
    }

    fn parse_if(&mut self, if_tok: Token) -> Ast {
        self.advance();
        let condition = Box::new(self.parse_expression());
        self.expect_separator();
        let then_body = self.parse_block_until(&[TokenKind::Else, TokenKind::End]);

        let else_body = if self.current().kind == TokenKind::Else {
            self.advance();
            if BLOCK_SEPARATORS.contains(&self.current().kind) {
                self.skip_separators();
                Some(self.parse_block_until(&[TokenKind::End]))
            } else {
                let expr = self.parse_expression();
                Some(vec![Ast::ExpressionStatement { span: expr.span(), expression: Box::new(expr) }])
            }
        } else {
            None
        };

        let end_tok = self.expect_token(TokenKind::End, "END");
        let span = Span::join(if_tok.span, end_tok.span);
        Ast::If { condition, then_body, else_body, span }
    }

    fn parse_while(&mut self, while_tok: Token) -> Ast {
        self.advance();
        let condition = Box::new(self.parse_expression());
        self.expect_separator();
        let body = self.parse_block_until(&[TokenKind::End]);
        let end_tok = self.expect_token(TokenKind::End, "END");
        let span = Span::join(while_tok.span, end_tok.span);
        Ast::While { condition, body, span }
    }

    fn parse_group(&mut self, lparen: Token) -> Ast {
        self.advance();
        self.skip_insignificant_newlines();
        let expr = self.parse_expression();
        self.skip_insignificant_newlines();
        let _rparen = self.expect_token(TokenKind::RParen, "RPAREN");
        let _ = lparen;
        expr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program_statements(source: &str) -> Vec<Ast> {
        match parse(source).ast {
            Ast::Program { statements, .. } => statements,
            other => vec![other],
        }
    }

    fn single_expr(source: &str) -> Ast {
        match program_statements(source).into_iter().next().unwrap() {
            Ast::ExpressionStatement { expression, .. } => *expression,
            other => other,
        }
    }

    fn ident(name: &str) -> Ast {
        Ast::Identifier { name: name.to_string(), span: Span::ZERO }
    }

    fn binary(op: TokenKind, left: Ast, right: Ast) -> Ast {
        Ast::Binary {
            operator_token: Token::new(op, Span::ZERO),
            left: Box::new(left),
            right: Box::new(right),
            span: Span::ZERO,
        }
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert_eq!(
            single_expr("a+b*c"),
            binary(TokenKind::Plus, ident("a"), binary(TokenKind::Star, ident("b"), ident("c")))
        );
        assert_eq!(
            single_expr("a*b+c"),
            binary(TokenKind::Plus, binary(TokenKind::Star, ident("a"), ident("b")), ident("c"))
        );
    }

    #[test]
    fn comparison_binds_between_additive_and_equality() {
        assert_eq!(
            single_expr("a+b>c"),
            binary(TokenKind::Greater, binary(TokenKind::Plus, ident("a"), ident("b")), ident("c"))
        );
        assert_eq!(
            single_expr("a>b==c"),
            binary(TokenKind::EqualEqual, binary(TokenKind::Greater, ident("a"), ident("b")), ident("c"))
        );
    }

    #[test]
    fn assignment_is_right_associative() {
        let expected = Ast::Assignment {
            target: Box::new(ident("a")),
            value: Box::new(Ast::Assignment {
                target: Box::new(ident("b")),
                value: Box::new(Ast::IntegerLiteral { digits: "5".into(), span: Span::ZERO }),
                span: Span::ZERO,
            }),
            span: Span::ZERO,
        };
        assert_eq!(single_expr("a=b=5"), expected);
    }

    #[test]
    fn newlines_are_insignificant_inside_parens_and_after_operators() {
        let result = parse("a = (1 +\n2)\n");
        assert!(result.errors.is_empty());
        let statements = match result.ast {
            Ast::Program { statements, .. } => statements,
            _ => panic!("expected a program"),
        };
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn scenario_dotted_number_recovery() {
        let result = parse("12.4.5");
        let statements = match &result.ast {
            Ast::Program { statements, .. } => statements,
            _ => panic!("expected a program"),
        };
        assert_eq!(statements.len(), 3);
        assert!(matches!(
            statements[0],
            Ast::ExpressionStatement { ref expression, .. } if matches!(**expression, Ast::FloatLiteral { .. })
        ));
        assert!(matches!(
            statements[1],
            Ast::ExpressionStatement { ref expression, .. } if matches!(**expression, Ast::Invalid { .. })
        ));
        assert!(matches!(
            statements[2],
            Ast::ExpressionStatement { ref expression, .. } if matches!(**expression, Ast::IntegerLiteral { .. })
        ));
        assert_eq!(
            result.errors,
            vec![
                "unexpected char `.`".to_string(),
                "unexpected INTEGER, expected a statement separator".to_string(),
            ]
        );
    }

    #[test]
    fn non_identifier_assignment_target_still_builds_a_node() {
        let result = parse("1 = 2");
        assert!(matches!(single_expr_from(&result.ast), Ast::Assignment { .. }));
        assert_eq!(result.errors, vec!["unexpected `INTEGER`, expected an identifier".to_string()]);
    }

    fn single_expr_from(ast: &Ast) -> &Ast {
        match ast {
            Ast::Program { statements, .. } => match &statements[0] {
                Ast::ExpressionStatement { expression, .. } => expression,
                other => other,
            },
            other => other,
        }
    }

    #[test]
    fn if_without_else_defaults_to_nil() {
        let result = parse("if a\n1\nend");
        assert!(result.errors.is_empty());
        assert!(matches!(single_expr_from(&result.ast), Ast::If { else_body: None, .. }));
    }
}
