use std::fs;
use std::process::ExitCode;

use num_traits::ToPrimitive;
use owo_colors::OwoColorize;

use plc_environment::Value;
use plc_interpreter::Interpreter;
use plc_lexer::Lexer;
use plc_parser::Parser;
use plc_syntax::error::Error;

/// Maps a byte offset to 1-based line and column numbers.
fn line_col(source: &str, index: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;
    for (i, c) in source.char_indices() {
        if i >= index {
            break;
        }
        if c == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

fn render_error(kind: &str, source: &str, err: &Error) {
    eprintln!("{}: {}", kind.red().bold(), err.msg.red());
    if let Some(index) = err.index {
        let (line, col) = line_col(source, index);
        eprintln!("  --> line {}, column {}", line, col);
        if let Some(src_line) = source.lines().nth(line - 1) {
            let line_num_str = format!("{:3} | ", line);
            eprintln!("     |");
            eprintln!("{}{}", line_num_str.bright_black(), src_line);

            let mut marker = String::new();
            marker.push_str(&" ".repeat(line_num_str.len()));
            if col > 1 {
                marker.push_str(&" ".repeat(col - 1));
            }
            marker.push('^');
            eprintln!("{}{}", marker.red(), " error here".red());
            eprintln!("     |");
        }
    }
}

/// The Integer returned by main/0, clamped into the exit-status range.
fn exit_status(value: &Value) -> u8 {
    match value {
        Value::Integer(n) => n.to_i64().map_or(255, |v| v.clamp(0, 255)) as u8,
        _ => 0,
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let path = match args.get(1) {
        Some(p) => p,
        None => {
            eprintln!("{}: usage: plc <file.plc>", "error".red().bold());
            return ExitCode::from(2);
        }
    };

    let src = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!(
                "{}: {}",
                "error".red().bold(),
                format!("Failed to read {}: {}", path, e).red()
            );
            return ExitCode::from(2);
        }
    };

    let tokens = match Lexer::new(&src).tokenize() {
        Ok(t) => t,
        Err(e) => {
            render_error("Lex error", &src, &e);
            return ExitCode::FAILURE;
        }
    };

    let source = match Parser::new(tokens).parse_source() {
        Ok(s) => s,
        Err(e) => {
            render_error("Parse error", &src, &e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = plc_analyzer::analyze(&source) {
        render_error("Analysis error", &src, &e);
        return ExitCode::FAILURE;
    }

    match Interpreter::new().run(&source) {
        Ok(value) => ExitCode::from(exit_status(&value)),
        Err(e) => {
            render_error("Runtime error", &src, &e);
            ExitCode::FAILURE
        }
    }
}
