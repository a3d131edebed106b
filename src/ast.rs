//! The syntax tree produced by the parser. Equality ignores spans.

use serde::Serialize;

use crate::lexer::token::Token;
use crate::span::Span;

#[derive(Debug, Clone, Serialize)]
pub enum Ast {
    Program {
        statements: Vec<Ast>,
        span: Span,
    },
    ExpressionStatement {
        expression: Box<Ast>,
        span: Span,
    },
    /// A recovery node substituted wherever the parser expected something it
    /// didn't find. Carries the offending token for diagnostics.
    Invalid {
        token: Token,
        span: Span,
    },
    IntegerLiteral {
        digits: String,
        span: Span,
    },
    FloatLiteral {
        digits: String,
        span: Span,
    },
    StringLiteral {
        decoded: String,
        span: Span,
    },
    TrueLiteral {
        span: Span,
    },
    FalseLiteral {
        span: Span,
    },
    NilLiteral {
        span: Span,
    },
    SelfLiteral {
        span: Span,
    },
    Identifier {
        name: String,
        span: Span,
    },
    Unary {
        operator_token: Token,
        operand: Box<Ast>,
        span: Span,
    },
    Binary {
        operator_token: Token,
        left: Box<Ast>,
        right: Box<Ast>,
        span: Span,
    },
    /// `target` is always an `Identifier`; if the source's left-hand side
    /// wasn't one, the parser records an error but still builds this node.
    Assignment {
        target: Box<Ast>,
        value: Box<Ast>,
        span: Span,
    },
    Return {
        value: Option<Box<Ast>>,
        span: Span,
    },
    If {
        condition: Box<Ast>,
        then_body: Vec<Ast>,
        else_body: Option<Vec<Ast>>,
        span: Span,
    },
    While {
        condition: Box<Ast>,
        body: Vec<Ast>,
        span: Span,
    },
    FunctionCall {
        name: String,
        arguments: Vec<Ast>,
        span: Span,
    },
}

impl Ast {
    pub fn span(&self) -> Span {
        match self {
            Ast::Program { span, .. }
            | Ast::ExpressionStatement { span, .. }
            | Ast::Invalid { span, .. }
            | Ast::IntegerLiteral { span, .. }
            | Ast::FloatLiteral { span, .. }
            | Ast::StringLiteral { span, .. }
            | Ast::TrueLiteral { span }
            | Ast::FalseLiteral { span }
            | Ast::NilLiteral { span }
            | Ast::SelfLiteral { span }
            | Ast::Identifier { span, .. }
            | Ast::Unary { span, .. }
            | Ast::Binary { span, .. }
            | Ast::Assignment { span, .. }
            | Ast::Return { span, .. }
            | Ast::If { span, .. }
            | Ast::While { span, .. }
            | Ast::FunctionCall { span, .. } => *span,
        }
    }
}

impl PartialEq for Ast {
    fn eq(&self, other: &Self) -> bool {
        use Ast::*;
        match (self, other) {
            (Program { statements: a, .. }, Program { statements: b, .. }) => a == b,
            (ExpressionStatement { expression: a, .. }, ExpressionStatement { expression: b, .. }) => a == b,
            (Invalid { token: a, .. }, Invalid { token: b, .. }) => a == b,
            (IntegerLiteral { digits: a, .. }, IntegerLiteral { digits: b, .. }) => a == b,
            (FloatLiteral { digits: a, .. }, FloatLiteral { digits: b, .. }) => a == b,
            (StringLiteral { decoded: a, .. }, StringLiteral { decoded: b, .. }) => a == b,
            (TrueLiteral { .. }, TrueLiteral { .. }) => true,
            (FalseLiteral { .. }, FalseLiteral { .. }) => true,
            (NilLiteral { .. }, NilLiteral { .. }) => true,
            (SelfLiteral { .. }, SelfLiteral { .. }) => true,
            (Identifier { name: a, .. }, Identifier { name: b, .. }) => a == b,
            (Unary { operator_token: ta, operand: a, .. }, Unary { operator_token: tb, operand: b, .. }) => {
                ta.kind == tb.kind && a == b
            }
            (
                Binary { operator_token: ta, left: la, right: ra, .. },
                Binary { operator_token: tb, left: lb, right: rb, .. },
            ) => ta.kind == tb.kind && la == lb && ra == rb,
            (Assignment { target: ta, value: va, .. }, Assignment { target: tb, value: vb, .. }) => {
                ta == tb && va == vb
            }
            (Return { value: a, .. }, Return { value: b, .. }) => a == b,
            (
                If { condition: ca, then_body: ta, else_body: ea, .. },
                If { condition: cb, then_body: tb, else_body: eb, .. },
            ) => ca == cb && ta == tb && ea == eb,
            (While { condition: ca, body: ba, .. }, While { condition: cb, body: bb, .. }) => {
                ca == cb && ba == bb
            }
            (
                FunctionCall { name: na, arguments: aa, .. },
                FunctionCall { name: nb, arguments: ab, .. },
            ) => na == nb && aa == ab,
            _ => false,
        }
    }
}
