//! stdin/stdout handling for CLI
//!
//! - Input: one password per line on stdin
//! - Output: single JSON object on stdout

use std::io::{BufRead, Write};

use serde_json::Value;
use zeroize::Zeroizing;

use super::errors::{CliError, CliResult};

/// Read one password line. Only the line terminator is stripped, so
/// leading/trailing spaces stay part of the password.
pub fn read_password<R: BufRead>(input: &mut R) -> CliResult<Zeroizing<String>> {
    let mut line = Zeroizing::new(String::new());
    let read = input.read_line(&mut line)?;
    if read == 0 {
        return Err(CliError::io_error("No password on stdin"));
    }

    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    Ok(line)
}

/// Write a JSON response followed by a newline
pub fn write_json<W: Write>(out: &mut W, value: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    #[test]
    fn test_read_password_strips_terminator_only() {
        let mut input = Cursor::new(" pass word \r\n");
        assert_eq!(read_password(&mut input).unwrap().as_str(), " pass word ");
    }

    #[test]
    fn test_read_password_without_newline() {
        let mut input = Cursor::new("secret");
        assert_eq!(read_password(&mut input).unwrap().as_str(), "secret");
    }

    #[test]
    fn test_read_password_empty_line_is_valid() {
        let mut input = Cursor::new("\n");
        assert_eq!(read_password(&mut input).unwrap().as_str(), "");
    }

    #[test]
    fn test_read_password_eof() {
        let mut input = Cursor::new("");
        assert!(read_password(&mut input).is_err());
    }

    #[test]
    fn test_write_json_one_line() {
        let mut out = Vec::new();
        write_json(&mut out, &json!({"ok": true})).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "{\"ok\":true}\n");
    }
}
