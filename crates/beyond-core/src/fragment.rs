//! Splits a message into prose and fenced code fragments.
//!
//! A fence is three backticks, an optional language tag made of ASCII
//! alphanumerics, `_` or `+`, a newline, the code, and the next three
//! backticks. Anything that does not match that shape stays prose.

use once_cell::sync::Lazy;
use regex::Regex;

/// Language reported for fences without a tag.
pub const PLAINTEXT: &str = "plaintext";

static FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```([A-Za-z0-9_+]*)\n(.*?)```").expect("fence pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    Text,
    Code,
}

/// A contiguous renderable piece of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub kind: FragmentKind,
    pub content: String,
    /// Only set for code fragments.
    pub language: Option<String>,
}

impl Fragment {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            kind: FragmentKind::Text,
            content: content.into(),
            language: None,
        }
    }

    pub fn code(content: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            kind: FragmentKind::Code,
            content: content.into(),
            language: Some(language.into()),
        }
    }

    pub fn is_code(&self) -> bool {
        self.kind == FragmentKind::Code
    }
}

/// A single fence located by [`next_fence`], borrowing from the scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FenceMatch<'a> {
    /// Byte offset of the opening backticks.
    pub start: usize,
    /// Byte offset just past the closing backticks.
    pub end: usize,
    pub tag: &'a str,
    pub content: &'a str,
}

impl<'a> FenceMatch<'a> {
    pub fn language(&self) -> &'a str {
        if self.tag.is_empty() {
            PLAINTEXT
        } else {
            self.tag
        }
    }
}

/// Finds the first fence starting at or after `offset`.
///
/// Returns the match and the offset to resume scanning from. The function holds
/// no state between calls, so callers drive the scan by threading the returned
/// offset back in.
pub fn next_fence(text: &str, offset: usize) -> Option<(FenceMatch<'_>, usize)> {
    if offset > text.len() {
        return None;
    }
    let caps = FENCE.captures_at(text, offset)?;
    let whole = caps.get(0)?;
    let fence = FenceMatch {
        start: whole.start(),
        end: whole.end(),
        tag: caps.get(1).map_or("", |m| m.as_str()),
        content: caps.get(2).map_or("", |m| m.as_str()),
    };
    Some((fence, whole.end()))
}

/// Parses message text into ordered fragments. Never fails.
///
/// A message without any fence comes back as one text fragment holding the
/// whole input, even when that input is empty.
pub fn parse(text: &str) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut cursor = 0;

    while let Some((fence, next)) = next_fence(text, cursor) {
        push_text(&mut fragments, &text[cursor..fence.start]);
        fragments.push(Fragment::code(fence.content, fence.language()));
        cursor = next;
    }

    if fragments.is_empty() {
        return vec![Fragment::text(text)];
    }

    push_text(&mut fragments, &text[cursor..]);
    fragments
}

fn push_text(fragments: &mut Vec<Fragment>, segment: &str) {
    if !segment.is_empty() {
        fragments.push(Fragment::text(segment));
    }
}

/// Indices of the code fragments within `fragments`, in order.
pub fn code_indices(fragments: &[Fragment]) -> Vec<usize> {
    fragments
        .iter()
        .enumerate()
        .filter(|(_, f)| f.is_code())
        .map(|(i, _)| i)
        .collect()
}
