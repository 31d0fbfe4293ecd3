/// Re-wrap a decoded program line one statement per output line
///
/// The line number is zero filled to four digits. Each following statement
/// goes on its own line behind `   : `, and anything wider than `width` is
/// split with continuation lines indented by five spaces. Statement
/// boundaries are colons outside quotes and outside `REM` text.

use crate::format::Dialect;

/// Split `line` at `width`, pushing every piece
fn push_wrapped(listing: &mut Vec<String>, mut text: String, width: usize) {
    let width = width.max(1);
    while !text.is_empty() {
        if text.chars().count() <= width {
            listing.push(text);
            return;
        }
        let split = text
            .char_indices()
            .nth(width)
            .map_or(text.len(), |(i, _)| i);
        listing.push(text[..split].to_string());
        let rest = &text[split..];
        text = if width > 6 {
            format!("     {}", rest)
        } else {
            rest.to_string()
        };
    }
}

/// Split a line into its leading line number and the remainder
fn split_line_number(line: &str) -> Option<(u32, &str)> {
    let body = line.trim_start_matches(' ');
    let digits = body.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    // more than four digits: the line number is the first four
    let digits = digits.min(4);
    let number = body[..digits].parse().ok()?;
    Some((number, &body[digits..]))
}

/// Byte offset one past the end of the statement at the start of `line`
fn statement_end(line: &str, dialect: Dialect) -> usize {
    let bytes = line.as_bytes();
    let colon_or_end = |from: usize| {
        bytes[from..]
            .iter()
            .position(|&b| b == b':')
            .map_or(bytes.len(), |p| from + p)
    };

    if line.starts_with("REM ") {
        return colon_or_end(0);
    }
    if line.starts_with('%') {
        return match dialect {
            Dialect::Basic2 => bytes.len(),
            Dialect::WangBasic => colon_or_end(0),
        };
    }

    let is_quote = |b: u8| b == b'"' || (dialect == Dialect::WangBasic && b == b'\'');
    let mut end = 0;
    while end < bytes.len() {
        let Some(p) = bytes[end..].iter().position(|&b| b == b':' || is_quote(b)) else {
            return bytes.len();
        };
        let found = end + p;
        if bytes[found] == b':' {
            return found;
        }
        let quote = bytes[found];
        match bytes[found + 1..].iter().position(|&b| b == quote) {
            Some(close) => end = found + 1 + close + 1,
            None => return bytes.len(),
        }
    }
    end
}

/// Pretty print one program line
///
/// Lines that don't start with a line number come back unchanged.
pub fn pretty_print(line: &str, width: usize, dialect: Dialect) -> Vec<String> {
    let Some((number, rest)) = split_line_number(line) else {
        return vec![line.to_string()];
    };

    let mut listing = Vec::new();
    let mut out = format!("{:04} ", number);
    let mut rest = rest.strip_prefix(' ').unwrap_or(rest);

    while !rest.is_empty() {
        let spaces = rest.len() - rest.trim_start_matches(' ').len();
        out.push_str(&rest[..spaces]);
        rest = &rest[spaces..];
        if rest.is_empty() {
            break;
        }

        let mut end = statement_end(rest, dialect);
        if end < rest.len() && rest.as_bytes()[end] != b':' {
            end = rest.len();
        }

        out.push_str(&rest[..end]);
        push_wrapped(&mut listing, std::mem::take(&mut out), width);

        rest = &rest[end..];
        if let Some(after) = rest.strip_prefix(':') {
            out = "   : ".to_string();
            rest = after.strip_prefix(' ').unwrap_or(after);
        }
    }
    // a trailing colon leaves only the continuation prefix behind
    if !out.is_empty() && out != "   : " {
        push_wrapped(&mut listing, out, width);
    }
    listing
}
