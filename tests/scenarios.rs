//! End-to-end pipeline scenarios, source straight through to a VM result.

use std::io::Cursor;

use miniruby::errors::MiniRubyError;
use miniruby::value::Value;

fn run(source: &str) -> Result<Value, MiniRubyError> {
    let mut stdout = Vec::new();
    let mut stdin = Cursor::new(Vec::<u8>::new());
    miniruby::interpret(source, "<test>", &mut stdout, &mut stdin)
}

fn run_capturing_stdout(source: &str) -> (Result<Value, MiniRubyError>, Vec<u8>) {
    let mut stdout = Vec::new();
    let mut stdin = Cursor::new(Vec::<u8>::new());
    let result = miniruby::interpret(source, "<test>", &mut stdout, &mut stdin);
    (result, stdout)
}

#[test]
fn integer_literal() {
    assert_eq!(run("124").unwrap(), Value::Integer(124));
}

#[test]
fn exponent_float_literal() {
    assert_eq!(run("12e4").unwrap(), Value::Float(120000.0));
}

#[test]
fn leading_zero_integer_fails_to_compile() {
    let err = run("0124").unwrap_err();
    match err {
        MiniRubyError::Parse(msgs) => {
            assert_eq!(msgs, vec!["illegal trailing zero in number literal".to_string()]);
        }
        other => panic!("expected a parse error, got {other:?}"),
    }
}

#[test]
fn while_loop_accumulates() {
    let (result, stdout) = run_capturing_stdout("a = 0\nwhile a < 5\n  a = a + 2\nend\na");
    assert_eq!(result.unwrap(), Value::Integer(6));
    assert!(stdout.is_empty());
}

#[test]
fn if_else_takes_the_else_branch() {
    let result = run("a = 1\nif a == 5\n  10\nelse\n  20\nend");
    assert_eq!(result.unwrap(), Value::Integer(20));
}

#[test]
fn if_without_matching_condition_and_no_else_is_nil() {
    let result = run("a = 1\nif a == 5\n  10\nend");
    assert_eq!(result.unwrap(), Value::Nil);
}

#[test]
fn puts_writes_to_stdout_and_returns_nil() {
    let (result, stdout) = run_capturing_stdout(r#"puts("foo")"#);
    assert_eq!(result.unwrap(), Value::Nil);
    assert_eq!(stdout, b"foo\n".to_vec());
}

#[test]
fn len_counts_bytes_not_graphemes() {
    assert_eq!(run(r#"len("foo")"#).unwrap(), Value::Integer(3));
}

#[test]
fn compile_is_deterministic() {
    let source = "a = 1\nb = a + 2\nwhile b < 10\n  b = b + 1\nend\nb";
    let first = miniruby::compile(source, "<test>").unwrap();
    let second = miniruby::compile(source, "<test>").unwrap();
    assert_eq!(first, second);
}

#[test]
fn the_whole_program_is_a_single_expression() {
    let result = run("a = 1\nb = 2\na + b");
    assert_eq!(result.unwrap(), Value::Integer(3));
}

#[test]
fn unary_minus_and_not() {
    assert_eq!(run("-5").unwrap(), Value::Integer(-5));
    assert_eq!(run("!false").unwrap(), Value::Bool(true));
    assert_eq!(run("!nil").unwrap(), Value::Bool(true));
}

#[test]
fn self_literal_is_the_sentinel() {
    assert_eq!(run("self").unwrap(), Value::SelfValue);
}

#[test]
fn division_by_zero_is_a_fatal_runtime_error() {
    let err = run("1 / 0").unwrap_err();
    assert!(matches!(err, MiniRubyError::Runtime(_)));
}

#[test]
fn undefined_function_call_is_a_runtime_error() {
    let err = run("nope(1)").unwrap_err();
    assert!(matches!(err, MiniRubyError::Runtime(_)));
}
