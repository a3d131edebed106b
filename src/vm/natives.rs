//! The native function registry: a read-only table built once, shared
//! across every VM instance, consulted by `CALL`.

use crate::errors::RuntimeError;
use crate::io::{InputSource, OutputSink};
use crate::value::Value;
use crate::vm::Vm;

/// A native function's expected arity and implementation. `args` excludes
/// the implicit `self` the call site pushed before its arguments.
pub struct Native {
    pub arity: usize,
    pub call: fn(&mut Vm<'_>, &[Value]) -> Result<Value, RuntimeError>,
}

fn puts(vm: &mut Vm<'_>, args: &[Value]) -> Result<Value, RuntimeError> {
    vm.stdout
        .print_line(args[0].to_string().as_bytes())
        .map_err(|e| RuntimeError::Io(e.to_string()))?;
    Ok(Value::Nil)
}

fn print(vm: &mut Vm<'_>, args: &[Value]) -> Result<Value, RuntimeError> {
    vm.stdout
        .print(args[0].to_string().as_bytes())
        .map_err(|e| RuntimeError::Io(e.to_string()))?;
    Ok(Value::Nil)
}

fn gets(vm: &mut Vm<'_>, _args: &[Value]) -> Result<Value, RuntimeError> {
    let bytes = vm.stdin.read_line().map_err(|e| RuntimeError::Io(e.to_string()))?;
    let text = String::from_utf8_lossy(&bytes).into_owned();
    Ok(Value::string(text))
}

fn len(_vm: &mut Vm<'_>, args: &[Value]) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::String(s) => Ok(Value::Integer(s.len() as i64)),
        other => Err(RuntimeError::TypeMismatch { op: "take the length of", kind: other.type_name() }),
    }
}

pub static NATIVES: phf::Map<&'static str, Native> = phf::phf_map! {
    "puts" => Native { arity: 1, call: puts },
    "print" => Native { arity: 1, call: print },
    "gets" => Native { arity: 0, call: gets },
    "len" => Native { arity: 1, call: len },
};
