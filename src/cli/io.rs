//! JSON I/O handling for CLI
//!
//! - Input: one JSON request per line
//! - Output: one JSON response per line on stdout
//! - UTF-8 only

use std::io::{self, BufRead, Write};

use serde_json::{json, Value};

use super::errors::{CliError, CliResult};
use crate::ledger::Invocation;

/// Parse one request line.
pub fn parse_request(line: &str) -> CliResult<Invocation> {
    Ok(serde_json::from_str(line.trim())?)
}

/// Read a single request from stdin
pub fn read_request() -> CliResult<Invocation> {
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;

    if line.trim().is_empty() {
        return Err(CliError::bad_request("Empty input"));
    }
    parse_request(&line)
}

/// Non-blank lines of a request stream
pub fn request_lines<R: BufRead>(input: R) -> impl Iterator<Item = CliResult<String>> {
    input
        .lines()
        .map(|line| line.map_err(CliError::from))
        .filter(|line| !matches!(line, Ok(l) if l.trim().is_empty()))
}

/// Write a success response
pub fn write_response<W: Write>(out: &mut W, data: Value) -> CliResult<()> {
    write_line(out, &json!({"status": "ok", "data": data}))
}

/// Write an error response
pub fn write_error<W: Write>(out: &mut W, code: &str, message: &str) -> CliResult<()> {
    write_line(out, &json!({"status": "error", "code": code, "message": message}))
}

fn write_line<W: Write>(out: &mut W, response: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *out, response)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_request_lines_skip_blanks() {
        let input = Cursor::new("a\n\n   \nb\n");
        let lines: Vec<_> = request_lines(input).map(Result::unwrap).collect();
        assert_eq!(lines, vec!["a", "b"]);
    }

    #[test]
    fn test_response_shapes() {
        let mut out = Vec::new();
        write_response(&mut out, json!(true)).unwrap();
        write_error(&mut out, "LEDGER_NOT_FOUND", "the car V9 does not exist").unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<Value> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines[0], json!({"status": "ok", "data": true}));
        assert_eq!(lines[1]["status"], "error");
        assert_eq!(lines[1]["code"], "LEDGER_NOT_FOUND");
    }

    #[test]
    fn test_parse_request_errors_are_bad_request() {
        let err = parse_request("{not json").unwrap_err();
        assert_eq!(err.code_str(), "LEDGER_CLI_BAD_REQUEST");
    }
}
