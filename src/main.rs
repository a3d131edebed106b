use std::io::{stdin, stdout};
use std::process::ExitCode;

use ariadne::{Color, Label, Report, ReportKind, Source};
use miniruby::errors::MiniRubyError;

fn main() -> ExitCode {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let mut disassemble = false;
    let mut ast_json = false;
    let mut path = None;
    for arg in args.by_ref() {
        match arg.as_str() {
            "--disassemble" | "-d" => disassemble = true,
            "--ast-json" => ast_json = true,
            other => path = Some(other.to_string()),
        }
    }

    let Some(path) = path else {
        eprintln!("usage: miniruby [--disassemble | --ast-json] <file>");
        return ExitCode::FAILURE;
    };

    let source = match std::fs::read_to_string(&path) {
        Ok(s) => s,
        Err(err) => {
            eprintln!("{path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    if ast_json {
        let parsed = miniruby::parse(&source);
        match serde_json::to_string_pretty(&parsed.ast) {
            Ok(json) => println!("{json}"),
            Err(err) => log::error!("failed to serialize ast: {err}"),
        }
        if !parsed.errors.is_empty() {
            for message in &parsed.errors {
                eprintln!("{message}");
            }
            return ExitCode::FAILURE;
        }
        return ExitCode::SUCCESS;
    }

    if disassemble {
        return match miniruby::compile(&source, &path) {
            Ok(chunk) => {
                print!("{}", miniruby::disasm::disassemble(&chunk));
                ExitCode::SUCCESS
            }
            Err(err) => {
                report(&path, &source, &err);
                ExitCode::FAILURE
            }
        };
    }

    let mut out = stdout();
    let mut input = std::io::BufReader::new(stdin());
    match miniruby::interpret(&source, &path, &mut out, &mut input) {
        Ok(value) => {
            log::info!("program result: {value}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            report(&path, &source, &err);
            ExitCode::FAILURE
        }
    }
}

/// Renders a pipeline failure as a source-annotated diagnostic. Parse and
/// compile errors carry no span (they're accumulated as plain messages), so
/// this points at the start of the file rather than fabricating a location.
fn report(path: &str, source: &str, err: &MiniRubyError) {
    let messages: Vec<String> = match err {
        MiniRubyError::Parse(msgs) | MiniRubyError::Compile(msgs) => msgs.clone(),
        MiniRubyError::Runtime(e) => vec![e.to_string()],
    };

    let at_start = 0..source.len().min(1);
    for message in messages {
        let report = Report::<(&str, std::ops::Range<usize>)>::build(ReportKind::Error, (path, at_start.clone()))
            .with_message(&message)
            .with_label(Label::new((path, at_start.clone())).with_message(&message).with_color(Color::Red))
            .finish();
        let _ = report.print((path, Source::from(source)));
    }
}
