//! Sentence-level segmentation of an article into bounded-length search fragments.
//!
//! Lengths are counted in Unicode scalar values, never bytes: the typical input is CJK text
//! where one character is three UTF-8 bytes.

use std::collections::BTreeSet;

/// Split `text` into trimmed, non-empty fragments of at most `max_length` characters.
///
/// 1. every character of every `unwanted_symbols` entry is deleted (character class, not
///    substring deletion)
/// 2. the cleaned text is split on the literal `delimiters` (non-overlapping, left to right,
///    first configured delimiter wins at a given position; delimiters are discarded)
/// 3. each piece is trimmed, then greedily re-split while longer than `max_length`: at the last
///    space at or before index `max_length`, or hard at `max_length` when there is no space.
///
/// `max_length == 0` disables re-splitting.
pub fn segment(
    text: &str,
    delimiters: &[String],
    unwanted_symbols: &[String],
    max_length: usize,
) -> Vec<String> {
    let cleaned = strip_symbols(text, unwanted_symbols);
    let mut out = Vec::new();
    for piece in split_on_delimiters(&cleaned, delimiters) {
        resplit_into(piece, max_length, &mut out);
    }
    out
}

/// Delete every character that occurs in any of `symbols`.
pub fn strip_symbols(text: &str, symbols: &[String]) -> String {
    let class: BTreeSet<char> = symbols.iter().flat_map(|s| s.chars()).collect();
    if class.is_empty() {
        return text.to_string();
    }
    text.chars().filter(|c| !class.contains(c)).collect()
}

/// Split on literal delimiters. Empty delimiters are ignored; pieces may be empty.
pub fn split_on_delimiters<'a>(text: &'a str, delimiters: &[String]) -> Vec<&'a str> {
    let delims: Vec<&str> = delimiters
        .iter()
        .map(|d| d.as_str())
        .filter(|d| !d.is_empty())
        .collect();
    if delims.is_empty() {
        return vec![text];
    }

    let mut out = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;
    while i < text.len() {
        let rest = &text[i..];
        if let Some(d) = delims.iter().find(|d| rest.starts_with(**d)) {
            out.push(&text[start..i]);
            i += d.len();
            start = i;
            continue;
        }
        // Advance one character; `i` always sits on a char boundary.
        i += rest.chars().next().map(char::len_utf8).unwrap_or(1);
    }
    out.push(&text[start..]);
    out
}

fn resplit_into(piece: &str, max_length: usize, out: &mut Vec<String>) {
    let mut rest = piece.trim();
    if max_length > 0 {
        while rest.chars().count() > max_length {
            let cut = cut_point(rest, max_length);
            let (head, tail) = rest.split_at(cut);
            let head = head.trim();
            if !head.is_empty() {
                out.push(head.to_string());
            }
            rest = tail.trim();
        }
    }
    if !rest.is_empty() {
        out.push(rest.to_string());
    }
}

/// Byte offset to cut `s` at. Requires `s` to be longer than `max_length` characters.
fn cut_point(s: &str, max_length: usize) -> usize {
    let mut hard = s.len();
    let mut last_space = None;
    for (n, (i, ch)) in s.char_indices().enumerate() {
        if n == max_length {
            hard = i;
        }
        if n > max_length {
            break;
        }
        // A space at offset 0 would emit an empty head and never make progress.
        if ch == ' ' && n > 0 {
            last_space = Some(i);
        }
    }
    last_space.unwrap_or(hard)
}
