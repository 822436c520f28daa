//! Detection of the `ESC [ 8 ; rows ; cols t` window-size sequence in
//! peer input.
//!
//! Scanning never alters the chunk; the caller forwards it unchanged.
//! Malformed sequences are reported as [`ResizeParseError`] internally and
//! dropped by [`scan_resize`].

use ptyrelay_common::TermSize;

const RESIZE_PREFIX: &[u8] = b"\x1b[8;";
const RESIZE_FINAL: u8 = b't';

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResizeParseError {
    #[error("resize sequence is truncated")]
    Truncated,

    #[error("resize sequence is missing its `t` terminator")]
    Unterminated,

    #[error("resize sequence has {0} fields, expected 2")]
    FieldCount(usize),

    #[error("invalid resize field {0:?}")]
    InvalidField(String),
}

/// Return the size requested by the last well-formed resize sequence in
/// `chunk`, if any.
pub fn scan_resize(chunk: &[u8]) -> Option<TermSize> {
    let mut found = None;
    let mut from = 0;

    while let Some(start) = find(chunk, RESIZE_PREFIX, from) {
        let params = &chunk[start + RESIZE_PREFIX.len()..];
        match parse_resize(params) {
            Ok(size) => found = Some(size),
            Err(e) => tracing::trace!(error = %e, "ignoring malformed resize sequence"),
        }
        from = start + RESIZE_PREFIX.len();
    }

    found
}

/// Parse `rows;cols t` (the part after `ESC [ 8 ;`).
pub fn parse_resize(params: &[u8]) -> Result<TermSize, ResizeParseError> {
    let end = params
        .iter()
        .position(|b| !(b.is_ascii_digit() || *b == b';'))
        .ok_or(ResizeParseError::Truncated)?;

    if params[end] != RESIZE_FINAL {
        return Err(ResizeParseError::Unterminated);
    }

    let fields: Vec<&[u8]> = params[..end].split(|b| *b == b';').collect();
    if fields.len() != 2 {
        return Err(ResizeParseError::FieldCount(fields.len()));
    }

    let rows = parse_field(fields[0])?;
    let cols = parse_field(fields[1])?;
    Ok(TermSize::new(rows, cols))
}

fn parse_field(field: &[u8]) -> Result<u16, ResizeParseError> {
    let text = std::str::from_utf8(field).unwrap_or_default();
    if text.is_empty() {
        return Err(ResizeParseError::InvalidField(String::new()));
    }
    text.parse::<u16>()
        .map_err(|_| ResizeParseError::InvalidField(text.to_string()))
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_bare_sequence() {
        assert_eq!(scan_resize(b"\x1b[8;24;100t"), Some(TermSize::new(24, 100)));
    }

    #[test]
    fn detects_sequence_inside_larger_chunk() {
        let chunk = b"hello\x1b[8;50;132tworld\n";
        let before = chunk.to_vec();

        assert_eq!(scan_resize(chunk), Some(TermSize::new(50, 132)));
        assert_eq!(chunk.to_vec(), before);
    }

    #[test]
    fn detects_various_sizes() {
        for (rows, cols) in [(1u16, 1u16), (24, 80), (43, 80), (200, 400), (u16::MAX, 9)] {
            let chunk = format!("abc\x1b[8;{rows};{cols}txyz");
            assert_eq!(
                scan_resize(chunk.as_bytes()),
                Some(TermSize::new(rows, cols)),
                "chunk {chunk:?}"
            );
        }
    }

    #[test]
    fn last_sequence_wins() {
        let chunk = b"\x1b[8;24;80t\x1b[8;30;120t";
        assert_eq!(scan_resize(chunk), Some(TermSize::new(30, 120)));
    }

    #[test]
    fn malformed_sequence_does_not_hide_a_later_one() {
        let chunk = b"\x1b[8;x;80t\x1b[8;30;120t";
        assert_eq!(scan_resize(chunk), Some(TermSize::new(30, 120)));
    }

    #[test]
    fn zero_fields_are_reported() {
        assert_eq!(scan_resize(b"\x1b[8;0;0t"), Some(TermSize::new(0, 0)));
    }

    #[test]
    fn no_sequence_means_no_resize() {
        assert_eq!(scan_resize(b""), None);
        assert_eq!(scan_resize(b"plain input\r"), None);
        assert_eq!(scan_resize(b"\x1b[A\x1b[2J"), None);
        assert_eq!(scan_resize(b"\x1b[18;24;80t"), None);
    }

    #[test]
    fn malformed_variants_are_ignored() {
        let cases: [&[u8]; 8] = [
            b"\x1b[8;24;100",
            b"\x1b[8;24;100x",
            b"\x1b[8;24t",
            b"\x1b[8;24;100;7t",
            b"\x1b[8;ab;100t",
            b"\x1b[8;;100t",
            b"\x1b[8;24;99999t",
            b"\x1b[8;",
        ];
        for chunk in cases {
            assert_eq!(scan_resize(chunk), None, "chunk {chunk:?}");
        }
    }

    #[test]
    fn parse_errors_are_specific() {
        assert_eq!(parse_resize(b"24;100"), Err(ResizeParseError::Truncated));
        assert_eq!(parse_resize(b"24;100x"), Err(ResizeParseError::Unterminated));
        assert_eq!(parse_resize(b"24t"), Err(ResizeParseError::FieldCount(1)));
        assert_eq!(parse_resize(b"1;2;3t"), Err(ResizeParseError::FieldCount(3)));
        assert_eq!(
            parse_resize(b"70000;1t"),
            Err(ResizeParseError::InvalidField("70000".into()))
        );
        assert_eq!(parse_resize(b"24;100t"), Ok(TermSize::new(24, 100)));
    }
}
