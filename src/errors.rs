//! Typed error payloads for the compiler and VM.

use thiserror::Error;

/// Structural failures the compiler can hit while lowering a [`crate::ast::Ast`]
/// to a [`crate::chunk::Chunk`]. `Display` renders the literal message text
/// used throughout the rest of this crate and in tests.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("undefined local: {0}")]
    UndefinedLocal(String),

    #[error("exceeded the maximum number of local variables (256): {0}")]
    TooManyLocals(String),

    #[error("value pool limit reached: 256")]
    PoolOverflow,

    #[error("too many bytes to jump over: {0}")]
    JumpTooFar(usize),

    #[error("too many bytes to jump backward: {0}")]
    JumpBackTooFar(usize),
}

/// Fatal errors raised while executing a [`crate::chunk::Chunk`]. Unlike
/// lex/parse/compile diagnostics, these halt the VM. There is no recovery.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("{name}: got {got} arguments, expected {expected}")]
    ArityMismatch { name: String, got: usize, expected: usize },

    #[error("call to undefined function: {0}")]
    UndefinedFunction(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("cannot {op} a {kind} value")]
    TypeMismatch { op: &'static str, kind: &'static str },

    #[error("unknown opcode: {0}")]
    UnknownOpcode(u8),

    #[error("stack underflow")]
    StackUnderflow,

    #[error("io error: {0}")]
    Io(String),
}

/// The single error type returned at the library's public boundary
/// (`compile`/`interpret`), aggregating whichever pipeline stage failed.
#[derive(Debug, Error, Clone)]
pub enum MiniRubyError {
    #[error("{} parse error(s): {}", .0.len(), .0.join("; "))]
    Parse(Vec<String>),

    #[error("{} compile error(s): {}", .0.len(), .0.join("; "))]
    Compile(Vec<String>),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}
