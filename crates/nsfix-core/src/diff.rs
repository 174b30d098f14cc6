//! Unified diff generation.
//!
//! Hunks are built from the patches themselves: every patch touches a block
//! of whole lines, blocks that share a line are merged, and each block is
//! printed as removed old lines followed by added new lines. No context
//! lines are emitted.

use crate::patch::Patch;
use crate::text::{line_end_inclusive, line_start};

struct Block<'a> {
    start: usize,
    end: usize,
    patches: Vec<&'a Patch>,
}

fn line_count(text: &str) -> usize {
    let newlines = text.matches('\n').count();
    if text.is_empty() || text.ends_with('\n') {
        newlines
    } else {
        newlines + 1
    }
}

fn push_lines(diff: &mut String, prefix: char, text: &str) {
    for line in text.split_inclusive('\n') {
        diff.push(prefix);
        diff.push_str(line);
    }
    if !text.is_empty() && !text.ends_with('\n') {
        diff.push_str("\n\\ No newline at end of file\n");
    }
}

/// Unified diff of applying `patches` to `original`.
///
/// Returns an empty string when there are no patches.
pub fn unified_diff(path: &str, original: &str, patches: &[Patch]) -> String {
    if patches.is_empty() {
        return String::new();
    }
    let bytes = original.as_bytes();
    let mut ordered: Vec<&Patch> = patches.iter().collect();
    ordered.sort_by_key(|p| p.offset);

    let mut blocks: Vec<Block<'_>> = Vec::new();
    for patch in ordered {
        let offset = (patch.offset as usize).min(bytes.len());
        let patch_end = offset + patch.length as usize;
        let start = line_start(bytes, offset);
        let last = if patch.length > 0 { patch_end - 1 } else { offset };
        let end = if patch.length > 0 || offset < bytes.len() {
            line_end_inclusive(bytes, last)
        } else {
            bytes.len()
        };
        match blocks.last_mut() {
            Some(block) if start < block.end => {
                block.end = block.end.max(end);
                block.patches.push(patch);
            }
            _ => blocks.push(Block {
                start,
                end,
                patches: vec![patch],
            }),
        }
    }

    let mut diff = format!("--- a/{path}\n+++ b/{path}\n");
    let mut delta: isize = 0;
    for block in blocks {
        let old = &original[block.start..block.end];
        let mut new = old.to_string();
        for patch in block.patches.iter().rev() {
            let rel = patch.offset as usize - block.start;
            new.replace_range(rel..rel + patch.length as usize, &patch.text);
        }
        let old_lines = line_count(old);
        let new_lines = line_count(&new);
        let first_line = original[..block.start].matches('\n').count() + 1;
        let old_start = if old_lines == 0 { first_line - 1 } else { first_line };
        let new_first = (first_line as isize + delta) as usize;
        let new_start = if new_lines == 0 { new_first - 1 } else { new_first };
        diff.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            old_start, old_lines, new_start, new_lines
        ));
        push_lines(&mut diff, '-', old);
        push_lines(&mut diff, '+', &new);
        delta += new_lines as isize - old_lines as isize;
    }
    diff
}
