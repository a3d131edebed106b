//! The stack virtual machine: fetch-decode-execute over a [`Chunk`]'s
//! instruction buffer.

pub mod natives;

use crate::chunk::{Chunk, OpCode};
use crate::errors::RuntimeError;
use crate::io::{InputSource, OutputSink};
use crate::value::Value;

/// Execution state. Every opcode stays in `Running` except `RETURN`, which
/// moves to `Halted`; an unknown opcode also halts, via an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Running,
    Halted,
}

pub struct Vm<'a> {
    chunk: &'a Chunk,
    ip: usize,
    stack: Vec<Value>,
    pub(crate) stdout: &'a mut dyn OutputSink,
    pub(crate) stdin: &'a mut dyn InputSource,
}

impl<'a> Vm<'a> {
    pub fn new(chunk: &'a Chunk, stdout: &'a mut dyn OutputSink, stdin: &'a mut dyn InputSource) -> Self {
        Vm { chunk, ip: 0, stack: vec![Value::SelfValue], stdout, stdin }
    }

    fn read_byte(&mut self) -> u8 {
        let byte = self.chunk.instructions[self.ip];
        self.ip += 1;
        byte
    }

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.stack.pop().ok_or(RuntimeError::StackUnderflow)
    }

    fn peek(&self) -> Result<&Value, RuntimeError> {
        self.stack.last().ok_or(RuntimeError::StackUnderflow)
    }

    /// Runs the chunk to completion and returns the value left on top of
    /// the stack by `RETURN`.
    pub fn run(&mut self) -> Result<Value, RuntimeError> {
        let mut state = State::Running;
        let mut result = Value::Nil;

        while state == State::Running {
            let byte = self.read_byte();
            let op = OpCode::decode(byte).ok_or(RuntimeError::UnknownOpcode(byte))?;
            log::trace!("vm: ip={} op={:?} stack_len={}", self.ip - 1, op, self.stack.len());

            match op {
                OpCode::Noop => {}
                OpCode::Pop => {
                    self.pop()?;
                }
                OpCode::Dup => {
                    let top = self.peek()?.clone();
                    self.push(top);
                }
                OpCode::InspectStack => {
                    log::debug!("vm: stack = {:?}", self.stack);
                }
                OpCode::Add => self.binary_numeric_or_concat(|a, b| a + b, |a, b| a + b)?,
                OpCode::Subtract => self.binary_numeric(|a, b| a - b, |a, b| a - b)?,
                OpCode::Multiply => self.binary_numeric(|a, b| a * b, |a, b| a * b)?,
                OpCode::Divide => self.divide()?,
                OpCode::Negate => self.negate()?,
                OpCode::Equal => {
                    let right = self.pop()?;
                    let left = self.pop()?;
                    self.push(Value::Bool(values_equal(&left, &right)));
                }
                OpCode::Greater => self.compare(|o| o == std::cmp::Ordering::Greater)?,
                OpCode::GreaterEqual => self.compare(|o| o != std::cmp::Ordering::Less)?,
                OpCode::Less => self.compare(|o| o == std::cmp::Ordering::Less)?,
                OpCode::LessEqual => self.compare(|o| o != std::cmp::Ordering::Greater)?,
                OpCode::Not => {
                    let top = self.pop()?;
                    self.push(Value::Bool(!top.is_truthy()));
                }
                OpCode::LoadValue => {
                    let idx = self.read_byte();
                    let value = self.chunk.value_pool[idx as usize].clone();
                    self.push(value);
                }
                OpCode::True => self.push(Value::Bool(true)),
                OpCode::False => self.push(Value::Bool(false)),
                OpCode::Nil => self.push(Value::Nil),
                OpCode::SelfOp => {
                    let value = self.stack[0].clone();
                    self.push(value);
                }
                OpCode::Return => {
                    result = self.pop()?;
                    state = State::Halted;
                }
                OpCode::Jump => {
                    let off = self.read_byte();
                    self.ip += off as usize;
                }
                OpCode::Loop => {
                    let off = self.read_byte();
                    self.ip -= off as usize;
                }
                OpCode::JumpUnless => {
                    let off = self.read_byte();
                    let cond = self.pop()?;
                    if !cond.is_truthy() {
                        self.ip += off as usize;
                    }
                }
                OpCode::Call => {
                    let idx = self.read_byte();
                    self.dispatch_call(idx)?;
                }
                OpCode::PrepLocals => {
                    let n = self.read_byte();
                    for _ in 0..n {
                        self.push(Value::Nil);
                    }
                }
                OpCode::GetLocal => {
                    let idx = self.read_byte();
                    let value = self.stack[idx as usize].clone();
                    self.push(value);
                }
                OpCode::SetLocal => {
                    let idx = self.read_byte();
                    let value = self.peek()?.clone();
                    self.stack[idx as usize] = value;
                }
            }
        }

        Ok(result)
    }

    fn dispatch_call(&mut self, idx: u8) -> Result<(), RuntimeError> {
        let (name, arg_count) = match &self.chunk.value_pool[idx as usize] {
            Value::CallInfo { name, arg_count } => (name.clone(), *arg_count as usize),
            other => return Err(RuntimeError::TypeMismatch { op: "call", kind: other.type_name() }),
        };
        log::trace!("vm: call {name} ({arg_count} args)");

        let total = arg_count + 1;
        let base = self.stack.len().checked_sub(total).ok_or(RuntimeError::StackUnderflow)?;
        let call_args: Vec<Value> = self.stack.split_off(base + 1);
        self.stack.truncate(base);

        let native = natives::NATIVES
            .get(name.as_ref())
            .ok_or_else(|| RuntimeError::UndefinedFunction(name.to_string()))?;
        if native.arity != arg_count {
            return Err(RuntimeError::ArityMismatch {
                name: name.to_string(),
                got: arg_count,
                expected: native.arity,
            });
        }

        let result = (native.call)(self, &call_args)?;
        self.push(result);
        Ok(())
    }

    fn binary_numeric(&mut self, int_op: fn(i64, i64) -> i64, float_op: fn(f64, f64) -> f64) -> Result<(), RuntimeError> {
        let right = self.pop()?;
        let left = self.pop()?;
        self.push(numeric_op(&left, &right, int_op, float_op)?);
        Ok(())
    }

    fn binary_numeric_or_concat(
        &mut self,
        int_op: fn(i64, i64) -> i64,
        float_op: fn(f64, f64) -> f64,
    ) -> Result<(), RuntimeError> {
        let right = self.pop()?;
        let left = self.pop()?;
        if let (Value::String(a), Value::String(b)) = (&left, &right) {
            return Ok(self.push(Value::string(format!("{a}{b}"))));
        }
        self.push(numeric_op(&left, &right, int_op, float_op)?);
        Ok(())
    }

    fn divide(&mut self) -> Result<(), RuntimeError> {
        let right = self.pop()?;
        let left = self.pop()?;
        match (&left, &right) {
            (Value::Integer(_), Value::Integer(0)) => return Err(RuntimeError::DivisionByZero),
            _ => {}
        }
        self.push(numeric_op(&left, &right, |a, b| a / b, |a, b| a / b)?);
        Ok(())
    }

    fn negate(&mut self) -> Result<(), RuntimeError> {
        let top = self.pop()?;
        let negated = match top {
            Value::Integer(n) => Value::Integer(-n),
            Value::Float(n) => Value::Float(-n),
            other => return Err(RuntimeError::TypeMismatch { op: "negate", kind: other.type_name() }),
        };
        self.push(negated);
        Ok(())
    }

    fn compare(&mut self, accept: fn(std::cmp::Ordering) -> bool) -> Result<(), RuntimeError> {
        let right = self.pop()?;
        let left = self.pop()?;
        let ordering = match (&left, &right) {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Integer(a), Value::Float(b)) => (*a as f64).partial_cmp(b).ok_or(RuntimeError::TypeMismatch {
                op: "compare",
                kind: "float",
            })?,
            (Value::Float(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)).ok_or(RuntimeError::TypeMismatch {
                op: "compare",
                kind: "float",
            })?,
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b).ok_or(RuntimeError::TypeMismatch {
                op: "compare",
                kind: "float",
            })?,
            _ => {
                return Err(RuntimeError::TypeMismatch { op: "compare", kind: left.type_name() });
            }
        };
        self.push(Value::Bool(accept(ordering)));
        Ok(())
    }
}

fn numeric_op(
    left: &Value,
    right: &Value,
    int_op: fn(i64, i64) -> i64,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(int_op(*a, *b))),
        (Value::Integer(a), Value::Float(b)) => Ok(Value::Float(float_op(*a as f64, *b))),
        (Value::Float(a), Value::Integer(b)) => Ok(Value::Float(float_op(*a, *b as f64))),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(float_op(*a, *b))),
        _ => Err(RuntimeError::TypeMismatch { op: "operate on", kind: left.type_name() }),
    }
}

/// `EQUAL` is total: numeric cross-type comparisons are allowed (`1 ==
/// 1.0`), but anything else mismatched in kind is simply unequal rather
/// than a type error, preserving expression totality.
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b,
        (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => *a as f64 == *b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Nil, Value::Nil) => true,
        (Value::SelfValue, Value::SelfValue) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::Chunk;
    use crate::span::Span;
    use std::io::Cursor;

    fn run(chunk: &Chunk) -> Value {
        let mut stdout = Vec::new();
        let mut stdin = Cursor::new(Vec::<u8>::new());
        Vm::new(chunk, &mut stdout, &mut stdin).run().expect("vm should not error")
    }

    fn build(bytes: &[u8], pool: Vec<Value>) -> Chunk {
        let mut chunk = Chunk::new("script", "<test>", Span::ZERO);
        chunk.push_bytes(bytes);
        chunk.value_pool = pool;
        chunk
    }

    #[test]
    fn arithmetic_promotes_to_float_when_either_operand_is() {
        let chunk = build(
            &[
                OpCode::LoadValue as u8,
                0,
                OpCode::LoadValue as u8,
                1,
                OpCode::Add as u8,
                OpCode::Return as u8,
            ],
            vec![Value::Integer(1), Value::Float(2.5)],
        );
        assert_eq!(run(&chunk), Value::Float(3.5));
    }

    #[test]
    fn integer_division_truncates_toward_zero() {
        let chunk = build(
            &[
                OpCode::LoadValue as u8,
                0,
                OpCode::LoadValue as u8,
                1,
                OpCode::Divide as u8,
                OpCode::Return as u8,
            ],
            vec![Value::Integer(-7), Value::Integer(2)],
        );
        assert_eq!(run(&chunk), Value::Integer(-3));
    }

    #[test]
    fn integer_division_by_zero_is_a_runtime_error() {
        let chunk = build(
            &[
                OpCode::LoadValue as u8,
                0,
                OpCode::LoadValue as u8,
                1,
                OpCode::Divide as u8,
                OpCode::Return as u8,
            ],
            vec![Value::Integer(1), Value::Integer(0)],
        );
        let mut stdout = Vec::new();
        let mut stdin = Cursor::new(Vec::<u8>::new());
        let err = Vm::new(&chunk, &mut stdout, &mut stdin).run().unwrap_err();
        assert_eq!(err, RuntimeError::DivisionByZero);
    }

    #[test]
    fn nil_and_false_are_falsy_everything_else_truthy() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Integer(0).is_truthy());
        assert!(Value::string("").is_truthy());
    }

    #[test]
    fn string_add_concatenates() {
        let chunk = build(
            &[
                OpCode::LoadValue as u8,
                0,
                OpCode::LoadValue as u8,
                1,
                OpCode::Add as u8,
                OpCode::Return as u8,
            ],
            vec![Value::string("foo"), Value::string("bar")],
        );
        assert_eq!(run(&chunk), Value::string("foobar"));
    }

    #[test]
    fn equal_allows_numeric_cross_type_comparison() {
        let chunk = build(
            &[
                OpCode::LoadValue as u8,
                0,
                OpCode::LoadValue as u8,
                1,
                OpCode::Equal as u8,
                OpCode::Return as u8,
            ],
            vec![Value::Integer(1), Value::Float(1.0)],
        );
        assert_eq!(run(&chunk), Value::Bool(true));
    }

    #[test]
    fn unknown_opcode_halts_with_an_error() {
        let chunk = build(&[0xFF], vec![]);
        let mut stdout = Vec::new();
        let mut stdin = Cursor::new(Vec::<u8>::new());
        let err = Vm::new(&chunk, &mut stdout, &mut stdin).run().unwrap_err();
        assert_eq!(err, RuntimeError::UnknownOpcode(0xFF));
    }

    #[test]
    fn native_call_dispatches_puts_and_writes_stdout() {
        let mut chunk = Chunk::new("script", "<test>", Span::ZERO);
        let str_idx = chunk.add_value(Value::string("hi")).unwrap();
        let call_idx = chunk.add_value(Value::CallInfo { name: "puts".into(), arg_count: 1 }).unwrap();
        chunk.push_bytes(&[OpCode::SelfOp as u8]);
        chunk.push_bytes(&[OpCode::LoadValue as u8, str_idx]);
        chunk.push_bytes(&[OpCode::Call as u8, call_idx]);
        chunk.push_bytes(&[OpCode::Return as u8]);

        let mut stdout = Vec::new();
        let mut stdin = Cursor::new(Vec::<u8>::new());
        let result = Vm::new(&chunk, &mut stdout, &mut stdin).run().unwrap();
        assert_eq!(result, Value::Nil);
        assert_eq!(stdout, b"hi\n".to_vec());
    }

    #[test]
    fn native_call_arity_mismatch_is_a_runtime_error() {
        let mut chunk = Chunk::new("script", "<test>", Span::ZERO);
        let call_idx = chunk.add_value(Value::CallInfo { name: "puts".into(), arg_count: 0 }).unwrap();
        chunk.push_bytes(&[OpCode::SelfOp as u8]);
        chunk.push_bytes(&[OpCode::Call as u8, call_idx]);
        chunk.push_bytes(&[OpCode::Return as u8]);

        let mut stdout = Vec::new();
        let mut stdin = Cursor::new(Vec::<u8>::new());
        let err = Vm::new(&chunk, &mut stdout, &mut stdin).run().unwrap_err();
        assert_eq!(err, RuntimeError::ArityMismatch { name: "puts".to_string(), got: 0, expected: 1 });
    }
}
