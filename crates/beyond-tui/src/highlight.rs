//! Syntax highlighting for code fragments.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, Style as SyntectStyle, Theme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);
static THEME: Lazy<Theme> = Lazy::new(|| {
    let mut themes = ThemeSet::load_defaults();
    themes
        .themes
        .remove("base16-ocean.dark")
        .or_else(|| themes.themes.into_values().next())
        .unwrap_or_default()
});

/// Highlights `code` as `language`, one output line per source line.
///
/// Unknown languages (including "plaintext") render as plain text. A trailing
/// newline does not produce an extra empty line; empty code yields one empty
/// line so the block still has a body.
pub fn highlight(code: &str, language: &str) -> Vec<Line<'static>> {
    let syntax = find_syntax(language).unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text());
    let mut highlighter = HighlightLines::new(syntax, &THEME);

    let mut lines: Vec<Line<'static>> = LinesWithEndings::from(code)
        .map(|line| {
            let spans: Vec<Span<'static>> = match highlighter.highlight_line(line, &SYNTAX_SET) {
                Ok(ranges) => ranges
                    .into_iter()
                    .map(|(style, text)| (style, text.trim_end_matches(&['\n', '\r'][..])))
                    .filter(|(_, text)| !text.is_empty())
                    .map(|(style, text)| Span::styled(text.to_string(), syntect_style_to_ratatui(style)))
                    .collect(),
                Err(e) => {
                    tracing::debug!(language, "highlighting failed: {}", e);
                    vec![Span::raw(line.trim_end_matches(&['\n', '\r'][..]).to_string())]
                }
            };
            Line::from(spans)
        })
        .collect();

    if lines.is_empty() {
        lines.push(Line::default());
    }
    lines
}

/// Highlighted code blocks keyed by (message, fragment).
///
/// Messages never change once appended, so entries stay valid for the session.
#[derive(Debug, Default)]
pub struct HighlightCache {
    entries: HashMap<(usize, usize), Vec<Line<'static>>>,
}

impl HighlightCache {
    pub fn get_or_highlight(
        &mut self,
        message: usize,
        fragment: usize,
        code: &str,
        language: &str,
    ) -> &[Line<'static>] {
        self.entries
            .entry((message, fragment))
            .or_insert_with(|| highlight(code, language))
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}

fn find_syntax(lang: &str) -> Option<&'static SyntaxReference> {
    let lang = lang.trim();
    if lang.is_empty() || lang == beyond_core::fragment::PLAINTEXT {
        return None;
    }
    if let Some(syntax) = SYNTAX_SET.find_syntax_by_token(lang) {
        return Some(syntax);
    }
    if let Some(syntax) = SYNTAX_SET.find_syntax_by_name(lang) {
        return Some(syntax);
    }
    SYNTAX_SET.find_syntax_by_extension(lang)
}

fn syntect_style_to_ratatui(style: SyntectStyle) -> Style {
    let mut tui_style = Style::new().fg(Color::Rgb(
        style.foreground.r,
        style.foreground.g,
        style.foreground.b,
    ));
    if style.font_style.contains(FontStyle::BOLD) {
        tui_style = tui_style.add_modifier(Modifier::BOLD);
    }
    if style.font_style.contains(FontStyle::ITALIC) {
        tui_style = tui_style.add_modifier(Modifier::ITALIC);
    }
    if style.font_style.contains(FontStyle::UNDERLINE) {
        tui_style = tui_style.add_modifier(Modifier::UNDERLINED);
    }
    tui_style
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_preserves_text_line_by_line() {
        let lines = highlight("fn main() {\n    println!(\"hi\");\n}\n", "rust");
        let text: Vec<String> = lines.iter().map(plain).collect();
        assert_eq!(text, vec!["fn main() {", "    println!(\"hi\");", "}"]);
    }

    #[test]
    fn test_known_language_is_colored() {
        let lines = highlight("let x = 1;", "rs");
        assert!(lines[0].spans.iter().any(|s| s.style.fg.is_some()));
        assert!(lines[0].spans.len() > 1);
    }

    #[test]
    fn test_unknown_language_falls_back() {
        let lines = highlight("some stuff\nmore", "not-a-language");
        let text: Vec<String> = lines.iter().map(plain).collect();
        assert_eq!(text, vec!["some stuff", "more"]);
    }

    #[test]
    fn test_empty_code_has_one_line() {
        let lines = highlight("", "plaintext");
        assert_eq!(lines.len(), 1);
        assert_eq!(plain(&lines[0]), "");
    }

    #[test]
    fn test_cache_highlights_each_block_once() {
        let mut cache = HighlightCache::default();
        let first: Vec<String> = cache
            .get_or_highlight(1, 0, "let a = 1;", "rust")
            .iter()
            .map(plain)
            .collect();
        // Same key: the stored lines come back, the new code is not looked at.
        let again: Vec<String> = cache
            .get_or_highlight(1, 0, "ignored", "rust")
            .iter()
            .map(plain)
            .collect();
        assert_eq!(first, again);
        assert_eq!(cache.len(), 1);

        cache.get_or_highlight(1, 2, "ls", "sh");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_blank_lines_kept() {
        let lines = highlight("a\n\nb", "plaintext");
        assert_eq!(lines.len(), 3);
        assert_eq!(plain(&lines[1]), "");
    }
}
