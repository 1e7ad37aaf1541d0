//! Comment stripping

/// Remove `--` line comments and `/* ... */` block comments from SQL text.
///
/// Line comments are removed up to (not including) the newline. Block
/// comments do not nest and are replaced by a single space so that
/// neighbouring tokens stay separated. An unterminated `/*` is left in place.
///
/// String literals are not tracked: a `--` or `/*` inside a quoted string is
/// treated as a comment start. Scripts must avoid such literals.
pub fn strip_comments(sql: &str) -> String {
    let bytes = sql.as_bytes();
    let len = bytes.len();
    let mut out = String::with_capacity(len);
    let mut start = 0;
    let mut i = 0;

    while i < len {
        match bytes[i] {
            b'-' if i + 1 < len && bytes[i + 1] == b'-' => {
                out.push_str(&sql[start..i]);
                while i < len && bytes[i] != b'\n' {
                    i += 1;
                }
                start = i;
            }
            b'/' if i + 1 < len && bytes[i + 1] == b'*' => {
                match sql[i + 2..].find("*/") {
                    Some(close) => {
                        out.push_str(&sql[start..i]);
                        out.push(' ');
                        i += 2 + close + 2;
                        start = i;
                    }
                    // Unterminated: keep the opener and keep scanning after it
                    None => i += 2,
                }
            }
            _ => i += 1,
        }
    }
    out.push_str(&sql[start..]);
    out
}
