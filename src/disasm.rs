//! A debug disassembler: renders a `Chunk`'s instructions as one line per opcode.

use std::fmt::Write as _;

use itertools::Itertools;

use crate::chunk::{Chunk, OpCode};

pub fn disassemble(chunk: &Chunk) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ({}) ==", chunk.name, chunk.filename);
    let _ = writeln!(out, "pool: [{}]", pool_summary(chunk));

    let mut offset = 0;
    while offset < chunk.instructions.len() {
        offset = disassemble_instruction(chunk, offset, &mut out);
    }
    out
}

/// Renders the value pool as `idx: value` pairs on one line.
fn pool_summary(chunk: &Chunk) -> String {
    chunk.value_pool.iter().enumerate().map(|(i, v)| format!("{i}: {v}")).join(", ")
}

/// Disassembles one instruction at `offset`, returning the offset of the
/// next one.
pub fn disassemble_instruction(chunk: &Chunk, offset: usize, out: &mut String) -> usize {
    let byte = chunk.instructions[offset];
    let Some(op) = OpCode::decode(byte) else {
        let _ = writeln!(out, "{offset:04} UNKNOWN({byte})");
        return offset + 1;
    };

    if op.has_operand() {
        match chunk.instructions.get(offset + 1) {
            Some(&operand) => {
                let _ = writeln!(out, "{offset:04} {op:?} {operand}{}", operand_hint(chunk, op, operand));
                offset + 2
            }
            None => {
                let _ = writeln!(out, "{offset:04} {op:?} <truncated>");
                offset + 1
            }
        }
    } else {
        let _ = writeln!(out, "{offset:04} {op:?}");
        offset + 1
    }
}

/// For opcodes whose operand indexes the value pool, appends the pooled
/// value so a human reading the disassembly doesn't have to cross-reference
/// the pool by hand.
fn operand_hint(chunk: &Chunk, op: OpCode, operand: u8) -> String {
    match op {
        OpCode::LoadValue | OpCode::Call => chunk
            .value_pool
            .get(operand as usize)
            .map(|v| format!("  ; {v}"))
            .unwrap_or_default(),
        _ => String::new(),
    }
}
