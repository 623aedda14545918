//! CSV trace parsing.
//!
//! A trace is a sequence of lines `<op>,<addr>[,<data>]`, one request each:
//!
//! - `W,<addr>,<data>` or `w,<addr>,<data>` — a 4-byte store.
//! - `R,<addr>` or `r,<addr>` — a 4-byte load; a trailing data field is rejected.
//!
//! Blank lines and lines consisting only of whitespace are skipped; everything
//! else must parse as a complete record or the whole trace is rejected with
//! the 1-based line number of the first offending record.

use crate::error::TraceFormatError;
use crate::request::Request;

/// Parses a full trace into a sequence of [`Request`]s.
///
/// # Errors
///
/// Returns the first [`TraceFormatError`] encountered, identified by its
/// 1-based line number.
pub fn parse(contents: &str) -> Result<Vec<Request>, TraceFormatError> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| parse_line(i + 1, line))
        .collect()
}

fn parse_line(line: usize, text: &str) -> Result<Request, TraceFormatError> {
    let mut fields = text.split(',').map(str::trim);

    let op = fields
        .next()
        .filter(|s| !s.is_empty())
        .ok_or(TraceFormatError::MissingField { line })?;
    let op_char = op.chars().next().ok_or(TraceFormatError::MissingField { line })?;

    let addr_field = fields.next().ok_or(TraceFormatError::MissingField { line })?;
    let addr = parse_u32(addr_field, line)?;

    let data_field = fields.next();

    match op_char {
        'W' | 'w' => {
            let data_field = data_field.ok_or(TraceFormatError::MissingField { line })?;
            let data = parse_u32(data_field, line)?;
            Ok(Request { addr, data, we: true })
        }
        'R' | 'r' => {
            if data_field.is_some_and(|s| !s.is_empty()) {
                return Err(TraceFormatError::UnexpectedData { line });
            }
            Ok(Request { addr, data: 0, we: false })
        }
        other => Err(TraceFormatError::UnknownOperation { line, op: other }),
    }
}

/// Accepts `0x`/`0X`-prefixed hex, or a signed decimal integer (reinterpreted
/// as its 32-bit two's-complement bit pattern, so `-1` becomes `0xFFFF_FFFF`).
fn parse_u32(field: &str, line: usize) -> Result<u32, TraceFormatError> {
    if let Some(hex) = field.strip_prefix("0x").or_else(|| field.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|_| TraceFormatError::MalformedInteger { line })
    } else {
        field
            .parse::<i64>()
            .ok()
            .and_then(|n| i32::try_from(n).ok())
            .map(|n| n as u32)
            .ok_or(TraceFormatError::MalformedInteger { line })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reads_and_writes() {
        let trace = "W,10,100\nr,10\nR,20\nw,30,0xFF\n";
        let requests = parse(trace).unwrap();
        assert_eq!(
            requests,
            vec![
                Request { addr: 10, data: 100, we: true },
                Request { addr: 10, data: 0, we: false },
                Request { addr: 20, data: 0, we: false },
                Request { addr: 30, data: 0xFF, we: true },
            ]
        );
    }

    #[test]
    fn skips_blank_lines() {
        let trace = "W,0,1\n\n   \nR,0\n";
        assert_eq!(parse(trace).unwrap().len(), 2);
    }

    #[test]
    fn rejects_write_missing_data_field() {
        let err = parse("W,10\n").unwrap_err();
        assert!(matches!(err, TraceFormatError::MissingField { line: 1 }));
    }

    #[test]
    fn rejects_read_with_data_field() {
        let err = parse("R,10,5\n").unwrap_err();
        assert!(matches!(err, TraceFormatError::UnexpectedData { line: 1 }));
    }

    #[test]
    fn rejects_unknown_operation() {
        let err = parse("X,10\n").unwrap_err();
        assert!(matches!(err, TraceFormatError::UnknownOperation { line: 1, op: 'X' }));
    }

    #[test]
    fn parses_negative_decimal_as_twos_complement() {
        let requests = parse("R,-1\n").unwrap();
        assert_eq!(requests, vec![Request { addr: 0xFFFF_FFFF, data: 0, we: false }]);
    }

    #[test]
    fn rejects_malformed_integer() {
        let err = parse("W,abc,1\n").unwrap_err();
        assert!(matches!(err, TraceFormatError::MalformedInteger { line: 1 }));
    }

    #[test]
    fn reports_correct_line_number_past_the_first() {
        let err = parse("R,0\nR,0\nW,bad,1\n").unwrap_err();
        assert!(matches!(err, TraceFormatError::MalformedInteger { line: 3 }));
    }
}
