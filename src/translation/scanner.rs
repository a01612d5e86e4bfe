#[derive(Clone)]
pub(super) enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment(u32),
    DollarQuoted(String),
}

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn pair_at(bytes: &[u8], idx: usize, pair: [u8; 2]) -> bool {
    bytes.get(idx..idx + 2) == Some(&pair[..])
}

pub(super) fn is_line_comment_start(bytes: &[u8], idx: usize) -> bool {
    pair_at(bytes, idx, *b"--")
}

pub(super) fn is_block_comment_start(bytes: &[u8], idx: usize) -> bool {
    pair_at(bytes, idx, *b"/*")
}

pub(super) fn is_block_comment_end(bytes: &[u8], idx: usize) -> bool {
    pair_at(bytes, idx, *b"*/")
}

/// `::` is a cast, never a parameter marker.
pub(super) fn is_cast(bytes: &[u8], idx: usize) -> bool {
    pair_at(bytes, idx, *b"::")
}

/// Opening `$tag$` at `start`: the tag and the index of its closing `$`.
pub(super) fn dollar_quote_open(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    let rest = bytes.get(start + 1..)?;
    let len = rest.iter().position(|&b| b == b'$')?;
    let tag = &rest[..len];
    if !tag.iter().copied().all(is_name_char) {
        return None;
    }
    let tag = std::str::from_utf8(tag).ok()?;
    Some((tag.to_string(), start + 1 + len))
}

/// Whether the `$` at `idx` starts the closing `$tag$`.
pub(super) fn closes_dollar_quote(bytes: &[u8], idx: usize, tag: &str) -> bool {
    bytes.get(idx + 1..).is_some_and(|rest| {
        rest.starts_with(tag.as_bytes()) && rest.get(tag.len()) == Some(&b'$')
    })
}

/// Scan a parameter name starting at `start`; returns the end index and the name.
pub(super) fn scan_name(bytes: &[u8], start: usize) -> Option<(usize, &str)> {
    if !bytes.get(start).copied().is_some_and(is_name_start) {
        return None;
    }
    let len = bytes[start..]
        .iter()
        .position(|&b| !is_name_char(b))
        .unwrap_or(bytes.len() - start);
    std::str::from_utf8(&bytes[start..start + len])
        .ok()
        .map(|name| (start + len, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dollar_quote_tags() {
        assert_eq!(
            dollar_quote_open(b"$fn$ body $fn$", 0),
            Some(("fn".to_string(), 3))
        );
        assert_eq!(dollar_quote_open(b"$$x$$", 0), Some((String::new(), 1)));
        assert_eq!(dollar_quote_open(b"$1 + 2", 0), None);
        assert!(closes_dollar_quote(b"x $fn$", 2, "fn"));
        assert!(!closes_dollar_quote(b"x $fn", 2, "fn"));
    }

    #[test]
    fn names_stop_at_first_non_word_byte() {
        assert_eq!(scan_name(b":abc_1, x", 1), Some((6, "abc_1")));
        assert_eq!(scan_name(b":tail", 1), Some((5, "tail")));
        assert_eq!(scan_name(b":1x", 1), None);
    }
}
