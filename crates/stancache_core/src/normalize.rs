//! Source normalization for stable model hashing.
//!
//! Strips comments and insignificant whitespace from Stan source so that
//! purely cosmetic edits (reformatting, commenting) map to the same
//! program key and therefore the same cached artifact.

/// Canonicalizes model source text.
///
/// Removes `//` line comments and `/* ... */` block comments, collapses
/// whitespace runs to a single space, drops empty lines, and filters
/// non-ASCII bytes. Deterministic and total: if the comment stripper
/// cannot confidently parse the text (an unterminated block comment), the
/// raw text is passed through unchanged. That widens the invalidation
/// surface for such inputs but never blocks progress on a stripping bug.
pub fn normalize(code: &str) -> String {
    let stripped = strip_comments(code).unwrap_or_else(|| code.to_string());

    let lines: Vec<String> = stripped
        .lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect();

    lines
        .join("\n")
        .chars()
        .filter(char::is_ascii)
        .collect::<String>()
        .trim()
        .to_string()
}

/// Removes line and block comments.
///
/// Returns `None` when a block comment is left unterminated, signalling
/// the caller to fall back to the raw text. String literals are not
/// tracked; Stan only allows them in print/reject statements and a `//`
/// inside one is rare enough that the wider invalidation is acceptable.
fn strip_comments(code: &str) -> Option<String> {
    let bytes = code.as_bytes();
    let mut out = String::with_capacity(code.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'/' && i + 1 < bytes.len() && bytes[i + 1] == b'/' {
            // Line comment: skip to end of line, keep the newline.
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
        } else if bytes[i] == b'/' && i + 1 < bytes.len() && bytes[i + 1] == b'*' {
            // Block comment: skip to the closing marker, preserving the
            // newlines it spans so line structure survives.
            let mut j = i + 2;
            loop {
                if j + 1 >= bytes.len() {
                    return None;
                }
                if bytes[j] == b'*' && bytes[j + 1] == b'/' {
                    break;
                }
                if bytes[j] == b'\n' {
                    out.push('\n');
                }
                j += 1;
            }
            i = j + 2;
        } else {
            out.push(bytes[i] as char);
            i += 1;
        }
    }

    Some(out)
}

fn collapse_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}
