//! AST to bytecode, in one pass.

use std::collections::HashMap;

use crate::ast::Ast;
use crate::chunk::{Chunk, OpCode};
use crate::errors::CompileError;
use crate::lexer::token::TokenKind;
use crate::span::Span;
use crate::value::Value;

/// Total local slots available, including the reserved `self` at slot 0.
const MAX_LOCALS: usize = 256;

struct Compiler {
    chunk: Chunk,
    locals: HashMap<String, u8>,
    last_slot: usize,
    predefined_locals: usize,
    errors: Vec<CompileError>,
}

impl Compiler {
    fn new(filename: &str, span: Span) -> Self {
        Compiler {
            chunk: Chunk::new("script", filename, span),
            locals: HashMap::new(),
            last_slot: 0,
            predefined_locals: 1,
            errors: Vec::new(),
        }
    }

    fn emit_byte(&mut self, op: OpCode) -> usize {
        self.chunk.push_bytes(&[op as u8])
    }

    fn emit_operand(&mut self, op: OpCode, operand: u8) -> usize {
        self.chunk.push_bytes(&[op as u8, operand])
    }

    /// Emits a forward jump with a placeholder operand, returning the
    /// offset of the operand byte (for later patching).
    fn emit_forward_jump(&mut self, op: OpCode) -> usize {
        self.chunk.push_bytes(&[op as u8, 0xFF]) + 1
    }

    fn patch_jump(&mut self, operand_offset: usize) {
        let distance = self.chunk.length() - operand_offset - 1;
        match u8::try_from(distance) {
            Ok(byte) => self.chunk.patch_byte(operand_offset, byte),
            Err(_) => {
                self.errors.push(CompileError::JumpTooFar(distance));
                self.chunk.patch_byte(operand_offset, 0xFF);
            }
        }
    }

    fn emit_loop(&mut self, start: usize) {
        let pre_length = self.chunk.length();
        let distance = pre_length + 2 - start;
        match u8::try_from(distance) {
            Ok(byte) => {
                self.chunk.push_bytes(&[OpCode::Loop as u8, byte]);
            }
            Err(_) => {
                self.errors.push(CompileError::JumpBackTooFar(distance));
                self.chunk.push_bytes(&[OpCode::Loop as u8, 0xFF]);
            }
        }
    }

    fn add_value(&mut self, value: Value) -> u8 {
        match self.chunk.add_value(value) {
            Ok(idx) => idx,
            Err(err) => {
                self.errors.push(err);
                0xFF
            }
        }
    }

    fn declare_local(&mut self, name: &str) -> u8 {
        if let Some(&slot) = self.locals.get(name) {
            return slot;
        }
        let next = self.last_slot + 1;
        if next >= MAX_LOCALS {
            self.errors.push(CompileError::TooManyLocals(name.to_string()));
            return 0xFF;
        }
        self.last_slot = next;
        let slot = next as u8;
        self.locals.insert(name.to_string(), slot);
        slot
    }

    fn resolve_local(&mut self, name: &str) -> Option<u8> {
        match self.locals.get(name) {
            Some(&slot) => Some(slot),
            None => {
                self.errors.push(CompileError::UndefinedLocal(name.to_string()));
                None
            }
        }
    }

    /// Compiles a list of statements, emitting a `POP` between each one so
    /// only the final statement's value remains on the stack. An empty list
    /// pushes `NIL` so the expression-oriented invariant still holds.
    fn compile_block(&mut self, statements: &[Ast]) {
        if statements.is_empty() {
            self.emit_byte(OpCode::Nil);
            return;
        }
        for (i, stmt) in statements.iter().enumerate() {
            self.compile_statement(stmt);
            if i + 1 < statements.len() {
                self.emit_byte(OpCode::Pop);
            }
        }
    }

    fn compile_statement(&mut self, stmt: &Ast) {
        match stmt {
            Ast::ExpressionStatement { expression, .. } => self.compile_expression(expression),
            other => self.compile_expression(other),
        }
    }

    fn compile_expression(&mut self, ast: &Ast) {
        match ast {
            Ast::IntegerLiteral { digits, .. } => {
                let n: i64 = digits.parse().unwrap_or_default();
                let idx = self.add_value(Value::Integer(n));
                self.emit_operand(OpCode::LoadValue, idx);
            }
            Ast::FloatLiteral { digits, .. } => {
                let n: f64 = digits.parse().unwrap_or_default();
                let idx = self.add_value(Value::Float(n));
                self.emit_operand(OpCode::LoadValue, idx);
            }
            Ast::StringLiteral { decoded, .. } => {
                let idx = self.add_value(Value::string(decoded.as_str()));
                self.emit_operand(OpCode::LoadValue, idx);
            }
            Ast::TrueLiteral { .. } => {
                self.emit_byte(OpCode::True);
            }
            Ast::FalseLiteral { .. } => {
                self.emit_byte(OpCode::False);
            }
            Ast::NilLiteral { .. } => {
                self.emit_byte(OpCode::Nil);
            }
            Ast::SelfLiteral { .. } => {
                self.emit_byte(OpCode::SelfOp);
            }
            Ast::Identifier { name, .. } => {
                if let Some(slot) = self.resolve_local(name) {
                    self.emit_operand(OpCode::GetLocal, slot);
                }
            }
            Ast::Unary { operator_token, operand, .. } => {
                self.compile_expression(operand);
                match operator_token.kind {
                    TokenKind::Minus => {
                        self.emit_byte(OpCode::Negate);
                    }
                    TokenKind::Bang => {
                        self.emit_byte(OpCode::Not);
                    }
                    TokenKind::Plus => {}
                    _ => {}
                }
            }
            Ast::Binary { operator_token, left, right, .. } => {
                self.compile_expression(left);
                self.compile_expression(right);
                match operator_token.kind {
                    TokenKind::Plus => {
                        self.emit_byte(OpCode::Add);
                    }
                    TokenKind::Minus => {
                        self.emit_byte(OpCode::Subtract);
                    }
                    TokenKind::Star => {
                        self.emit_byte(OpCode::Multiply);
                    }
                    TokenKind::Slash => {
                        self.emit_byte(OpCode::Divide);
                    }
                    TokenKind::EqualEqual => {
                        self.emit_byte(OpCode::Equal);
                    }
                    TokenKind::NotEqual => {
                        self.emit_byte(OpCode::Equal);
                        self.emit_byte(OpCode::Not);
                    }
                    TokenKind::Greater => {
                        self.emit_byte(OpCode::Greater);
                    }
                    TokenKind::GreaterEqual => {
                        self.emit_byte(OpCode::GreaterEqual);
                    }
                    TokenKind::Less => {
                        self.emit_byte(OpCode::Less);
                    }
                    TokenKind::LessEqual => {
                        self.emit_byte(OpCode::LessEqual);
                    }
                    _ => {}
                }
            }
            Ast::Assignment { target, value, .. } => {
                self.compile_expression(value);
                if let Ast::Identifier { name, .. } = target.as_ref() {
                    let slot = self.declare_local(name);
                    self.emit_operand(OpCode::SetLocal, slot);
                }
            }
            Ast::Return { value, .. } => {
                match value {
                    Some(v) => self.compile_expression(v),
                    None => {
                        self.emit_byte(OpCode::Nil);
                    }
                }
                self.emit_byte(OpCode::Return);
            }
            Ast::If { condition, then_body, else_body, .. } => {
                self.compile_expression(condition);
                let else_jump = self.emit_forward_jump(OpCode::JumpUnless);
                self.compile_block(then_body);
                let end_jump = self.emit_forward_jump(OpCode::Jump);
                self.patch_jump(else_jump);
                match else_body {
                    Some(body) => self.compile_block(body),
                    None => {
                        self.emit_byte(OpCode::Nil);
                    }
                }
                self.patch_jump(end_jump);
            }
            Ast::While { condition, body, .. } => {
                self.emit_byte(OpCode::Nil);
                let start = self.chunk.length();
                self.compile_expression(condition);
                let exit_jump = self.emit_forward_jump(OpCode::JumpUnless);
                self.emit_byte(OpCode::Pop);
                self.compile_block(body);
                self.emit_loop(start);
                self.patch_jump(exit_jump);
            }
            Ast::FunctionCall { name, arguments, .. } => {
                self.emit_byte(OpCode::SelfOp);
                for arg in arguments {
                    self.compile_expression(arg);
                }
                let idx = self.add_value(Value::CallInfo {
                    name: name.as_str().into(),
                    arg_count: arguments.len() as u8,
                });
                self.emit_operand(OpCode::Call, idx);
            }
            Ast::Invalid { .. } => {
                self.emit_byte(OpCode::Nil);
            }
            Ast::ExpressionStatement { expression, .. } => self.compile_expression(expression),
            Ast::Program { statements, .. } => self.compile_block(statements),
        }
    }

    /// Prepends `PREP_LOCALS n` if any local slots beyond `self` were used.
    /// Safe to do after the fact: every jump operand is a *relative* delta,
    /// so shifting the whole buffer right doesn't disturb any patched jump.
    fn finish(mut self, program: &Ast) -> Result<Chunk, Vec<CompileError>> {
        self.compile_block(match program {
            Ast::Program { statements, .. } => statements,
            other => std::slice::from_ref(other),
        });
        self.emit_byte(OpCode::Return);

        let n = self.last_slot.saturating_sub(self.predefined_locals) + 1;
        if self.last_slot > 0 {
            let prolog = vec![OpCode::PrepLocals as u8, n.min(255) as u8];
            self.chunk.instructions.splice(0..0, prolog);
        }

        if self.errors.is_empty() {
            Ok(self.chunk)
        } else {
            Err(self.errors)
        }
    }
}

/// Compiles a parsed program into a bytecode chunk. Returns the accumulated
/// compile errors instead of a chunk if any local/jump/pool limit was hit.
pub fn compile(program: &Ast, filename: &str) -> Result<Chunk, Vec<CompileError>> {
    let compiler = Compiler::new(filename, program.span());
    let chunk = compiler.finish(program);
    match &chunk {
        Ok(c) => log::debug!("compile: {} bytes, {} pool entries", c.length(), c.value_pool.len()),
        Err(errs) => log::debug!("compile failed: {} error(s)", errs.len()),
    }
    chunk
}
