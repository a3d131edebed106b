//! A small, Ruby-flavored expression language: lexer, parser, bytecode compiler, and stack VM.

pub mod ast;
pub mod chunk;
pub mod compiler;
pub mod disasm;
pub mod errors;
pub mod io;
pub mod lexer;
pub mod parser;
pub mod span;
pub mod value;
pub mod vm;

use chunk::Chunk;
use errors::MiniRubyError;
use io::{InputSource, OutputSink};
use lexer::token::Token;
use lexer::Lexer;
use value::Value;

/// Lexes `source` to completion, returning every token including the
/// trailing `EOF`. Never fails; lex errors show up in-band as
/// [`TokenKind::Error`] tokens.
pub fn lex(source: &str) -> Vec<Token> {
    Lexer::tokens(source)
}

/// Parses `source`, always producing a tree. Errors (lexer and parser
/// alike) are accumulated on the result rather than thrown.
pub fn parse(source: &str) -> parser::ParseResult {
    parser::parse(source)
}

/// Compiles `source` straight through to a bytecode [`Chunk`], aggregating
/// whatever parse or compile errors occur.
pub fn compile(source: &str, filename: &str) -> Result<Chunk, MiniRubyError> {
    let parsed = parser::parse(source);
    if !parsed.errors.is_empty() {
        return Err(MiniRubyError::Parse(parsed.errors));
    }
    compiler::compile(&parsed.ast, filename).map_err(|errs| {
        MiniRubyError::Compile(errs.into_iter().map(|e| e.to_string()).collect())
    })
}

/// Compiles and runs `source`, returning the program's final value.
pub fn interpret(
    source: &str,
    filename: &str,
    stdout: &mut dyn OutputSink,
    stdin: &mut dyn InputSource,
) -> Result<Value, MiniRubyError> {
    let chunk = compile(source, filename)?;
    let mut machine = vm::Vm::new(&chunk, stdout, stdin);
    machine.run().map_err(|err| {
        log::error!("vm: {err}");
        MiniRubyError::from(err)
    })
}

