//! Text position utilities.
//!
//! - Lines and columns are **1-indexed** (matching editor and compiler output)
//! - Byte offsets are **0-indexed**
//! - Columns count bytes, not characters

use crate::patch::Span;

// ============================================================================
// Offset/Position Conversions
// ============================================================================

/// Convert a byte offset to 1-indexed line and column.
///
/// If `offset` exceeds content length, returns the position at end of content.
pub fn byte_offset_to_position(content: &[u8], offset: usize) -> (u32, u32) {
    let offset = offset.min(content.len());
    let mut line = 1u32;
    let mut col = 1u32;

    for &byte in &content[..offset] {
        if byte == b'\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    (line, col)
}

/// Byte offset of the start of the line containing `offset`.
pub fn line_start(content: &[u8], offset: usize) -> usize {
    let offset = offset.min(content.len());
    content[..offset]
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |i| i + 1)
}

/// Byte offset just past the end of the line containing `offset`,
/// including its newline if there is one.
pub fn line_end_inclusive(content: &[u8], offset: usize) -> usize {
    let offset = offset.min(content.len());
    content[offset..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(content.len(), |i| offset + i + 1)
}

fn is_horizontal_space(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

// ============================================================================
// Blank-aware Removal
// ============================================================================

/// Expand the span of a statement to be removed so that no blank residue
/// is left behind.
///
/// `statement` runs from the first character of the statement to just past
/// its terminator. The two ends are expanded independently: the start moves
/// back to the line start if only horizontal whitespace precedes it, and the
/// end swallows trailing horizontal whitespace and the line terminator if
/// nothing else follows it. Neither end ever reaches past other code, so
/// removals of neighbouring statements on one line never overlap.
pub fn expand_removal(content: &str, statement: Span) -> Span {
    let bytes = content.as_bytes();
    let begin = (statement.start as usize).min(bytes.len());
    let end = (statement.end as usize).clamp(begin, bytes.len());

    let mut lead = begin;
    while lead > 0 && is_horizontal_space(bytes[lead - 1]) {
        lead -= 1;
    }
    let at_line_start = lead == 0 || bytes[lead - 1] == b'\n';

    let mut trail = end;
    while trail < bytes.len() && is_horizontal_space(bytes[trail]) {
        trail += 1;
    }
    let newline_len = if trail == bytes.len() {
        Some(0)
    } else if bytes[trail] == b'\n' {
        Some(1)
    } else if bytes[trail..].starts_with(b"\r\n") {
        Some(2)
    } else {
        None
    };

    let start = if at_line_start { lead } else { begin };
    let stop = match newline_len {
        Some(nl) => trail + nl,
        None => end,
    };
    Span::new(start as u64, stop as u64)
}
