//! Byte/text helpers for patch content that is not guaranteed to be UTF-8.

/// Render bytes as text, replacing every invalid UTF-8 sequence with the
/// hexadecimal codes of its bytes (`<CD><CE>`).
///
/// ```
/// use git_crecord::text::escape_bytes;
///
/// assert_eq!(escape_bytes(b"plain"), "plain");
/// assert_eq!(escape_bytes(b"\xCD\xCE-8"), "<CD><CE>-8");
/// ```
pub fn escape_bytes(bytes: &[u8]) -> String {
    let mut result = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        result.push_str(chunk.valid());
        for byte in chunk.invalid() {
            result.push_str(&format!("<{:X}>", byte));
        }
    }
    result
}

/// Unquote a path as git writes it in `diff --git` lines.
///
/// Paths wrapped in double quotes have C-style escapes: `\\`, `\"`, the
/// usual single-letter control escapes and three-digit octal byte codes.
/// Anything not wrapped in quotes is returned unchanged.
pub fn unquote_path(path: &[u8]) -> Vec<u8> {
    let Some(inner) = path
        .strip_prefix(b"\"")
        .and_then(|rest| rest.strip_suffix(b"\""))
    else {
        return path.to_vec();
    };

    let mut result = Vec::with_capacity(inner.len());
    let mut bytes = inner.iter().copied().peekable();
    while let Some(byte) = bytes.next() {
        if byte != b'\\' {
            result.push(byte);
            continue;
        }
        let Some(escaped) = bytes.next() else {
            result.push(b'\\');
            break;
        };
        match escaped {
            b'a' => result.push(0x07),
            b'b' => result.push(0x08),
            b't' => result.push(b'\t'),
            b'n' => result.push(b'\n'),
            b'v' => result.push(0x0b),
            b'f' => result.push(0x0c),
            b'r' => result.push(b'\r'),
            b'0'..=b'7' => {
                let mut value = u32::from(escaped - b'0');
                for _ in 0..2 {
                    match bytes.peek() {
                        Some(&digit @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(digit - b'0');
                            bytes.next();
                        }
                        _ => break,
                    }
                }
                result.push((value & 0xff) as u8);
            }
            other => result.push(other),
        }
    }
    result
}

/// Find the end of a double-quoted token starting at `input[0]`.
///
/// Returns the index of the closing quote.
pub(crate) fn closing_quote(input: &[u8]) -> Option<usize> {
    let mut escaped = false;
    for (i, &byte) in input.iter().enumerate().skip(1) {
        match byte {
            _ if escaped => escaped = false,
            b'\\' => escaped = true,
            b'"' => return Some(i),
            _ => {}
        }
    }
    None
}
