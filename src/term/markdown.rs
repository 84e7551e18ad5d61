//! Markdown → wrapped plain-text lines.
//!
//! Thin wrapper around `pulldown_cmark` that flattens markdown events into
//! terminal lines. Headings, emphasis, inline code, fenced code blocks, lists,
//! blockquotes, and links. Prose is wrapped with `textwrap`; code is not.

use pulldown_cmark::{CodeBlockKind, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

/// Render markdown into lines no wider than `width` (code blocks excepted).
pub fn render(content: &str, width: usize) -> Vec<String> {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_STRIKETHROUGH);
    opts.insert(Options::ENABLE_TASKLISTS);

    let mut w = Writer::default();
    for event in Parser::new_ext(content, opts) {
        w.handle(event);
    }
    w.finish(width)
}

// ── Writer ──────────────────────────────────────────────────────────────────

/// One logical line before wrapping.
#[derive(Default)]
struct Line {
    prefix: String,
    text: String,
    /// False inside code blocks.
    wrap: bool,
}

#[derive(Default)]
struct Writer {
    lines: Vec<Line>,
    /// Per-line prefixes (blockquote `│`, code border).
    line_prefixes: Vec<&'static str>,
    /// List nesting: None = unordered, Some(n) = ordered at index n.
    list_indices: Vec<Option<u64>>,
    in_code: bool,
    /// Set by a list marker until the item's first paragraph opens.
    item_open: bool,
    link_url: Option<String>,
    needs_newline: bool,
}

impl Writer {
    fn push_line(&mut self, text: impl Into<String>) {
        self.lines.push(Line {
            prefix: self.line_prefixes.concat(),
            text: text.into(),
            wrap: !self.in_code,
        });
    }

    /// Pushes a line that is never wrapped (borders, rules).
    fn push_raw_line(&mut self, text: impl Into<String>) {
        self.push_line(text);
        if let Some(line) = self.lines.last_mut() {
            line.wrap = false;
        }
    }

    fn push_str(&mut self, s: &str) {
        match self.lines.last_mut() {
            Some(line) => line.text.push_str(s),
            None => self.push_line(s),
        }
    }

    fn blank_line_if_needed(&mut self) {
        if self.needs_newline {
            self.lines.push(Line::default());
            self.needs_newline = false;
        }
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.open(tag),
            Event::End(tag) => self.close(tag),
            Event::Text(t) => self.text(t),
            Event::Code(c) => self.push_str(&format!("`{c}`")),
            Event::SoftBreak => self.push_str(" "),
            Event::HardBreak => self.push_line(""),
            Event::Rule => {
                self.blank_line_if_needed();
                self.push_raw_line("─".repeat(40));
                self.needs_newline = true;
            }
            Event::TaskListMarker(checked) => {
                self.push_str(if checked { "[x] " } else { "[ ] " });
            }
            _ => {} // HTML, footnotes, math
        }
    }

    fn open(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                if std::mem::take(&mut self.item_open) {
                    return;
                }
                self.blank_line_if_needed();
                self.push_line("");
            }
            Tag::Heading { level, .. } => {
                self.blank_line_if_needed();
                self.push_line(format!("{} ", "#".repeat(heading_depth(level))));
            }
            Tag::BlockQuote(_) => {
                self.blank_line_if_needed();
                self.line_prefixes.push("│ ");
            }
            Tag::CodeBlock(kind) => {
                self.blank_line_if_needed();
                let lang = match &kind {
                    CodeBlockKind::Fenced(l) => l.as_ref(),
                    CodeBlockKind::Indented => "",
                };
                if lang.is_empty() {
                    self.push_raw_line("╭──");
                } else {
                    self.push_raw_line(format!("╭── {lang} ──"));
                }
                self.in_code = true;
                self.line_prefixes.push("│ ");
            }
            Tag::List(start) => {
                if self.list_indices.is_empty() {
                    self.blank_line_if_needed();
                }
                self.list_indices.push(start);
            }
            Tag::Item => {
                let depth = self.list_indices.len().saturating_sub(1);
                let indent = "  ".repeat(depth);
                let marker = match self.list_indices.last_mut() {
                    Some(Some(n)) => {
                        let s = format!("{indent}{n}. ");
                        *n += 1;
                        s
                    }
                    _ => format!("{indent}- "),
                };
                self.push_line(marker);
                self.item_open = true;
            }
            Tag::Link { dest_url, .. } => self.link_url = Some(dest_url.to_string()),
            _ => {} // Emphasis and tables render as plain text
        }
    }

    fn close(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph | TagEnd::Heading(_) => self.needs_newline = true,
            TagEnd::BlockQuote(_) => {
                self.line_prefixes.pop();
                self.needs_newline = true;
            }
            TagEnd::CodeBlock => {
                self.line_prefixes.pop();
                self.in_code = false;
                self.push_raw_line("╰──");
                self.needs_newline = true;
            }
            TagEnd::Item => self.item_open = false,
            TagEnd::List(_) => {
                self.list_indices.pop();
                self.needs_newline = true;
            }
            TagEnd::Link => {
                if let Some(url) = self.link_url.take() {
                    self.push_str(&format!(" ({url})"));
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, cow: CowStr<'_>) {
        let text = cow.replace('\t', "    ");
        if self.in_code {
            for line in text.lines() {
                self.push_line(line);
            }
            return;
        }
        self.push_str(&text);
    }

    fn finish(self, width: usize) -> Vec<String> {
        let mut out = Vec::with_capacity(self.lines.len());
        for line in self.lines {
            if !line.wrap || line.text.is_empty() {
                out.push(format!("{}{}", line.prefix, line.text).trim_end().to_string());
                continue;
            }
            let indent = format!("{}{}", line.prefix, hanging_indent(&line.text));
            let options = textwrap::Options::new(width.max(indent.len() + 1))
                .wrap_algorithm(textwrap::WrapAlgorithm::FirstFit)
                .initial_indent(&line.prefix)
                .subsequent_indent(&indent);
            out.extend(textwrap::wrap(&line.text, options).into_iter().map(|l| l.into_owned()));
        }
        out
    }
}

/// Continuation indent for list items, so wrapped text lines up after the marker.
fn hanging_indent(text: &str) -> String {
    let lead = text.len() - text.trim_start().len();
    let rest = &text[lead..];
    let marker = if rest.starts_with("- ") {
        2
    } else {
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits > 0 && rest[digits..].starts_with(". ") {
            digits + 2
        } else {
            0
        }
    };
    " ".repeat(lead + marker)
}

fn heading_depth(level: HeadingLevel) -> usize {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraphs_are_separated_by_blank_line() {
        let lines = render("First.\n\nSecond.", 80);
        assert_eq!(lines, vec!["First.", "", "Second."]);
    }

    #[test]
    fn test_lines_are_filled_greedily() {
        let lines = render("aaaa bbbb cc dddddddd", 12);
        assert_eq!(lines, vec!["aaaa bbbb cc", "dddddddd"]);
    }

    #[test]
    fn test_long_paragraph_wraps() {
        let lines = render("alpha beta gamma delta epsilon", 12);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.chars().count() <= 12));
        assert_eq!(lines.join(" "), "alpha beta gamma delta epsilon");
    }

    #[test]
    fn test_heading_and_emphasis_flatten() {
        let lines = render("## Title\n\nSome **bold** and *italic*.", 80);
        assert_eq!(lines[0], "## Title");
        assert_eq!(lines[2], "Some bold and italic.");
    }

    #[test]
    fn test_lists() {
        let lines = render("- one\n- two\n\n1. first\n2. second", 80);
        assert_eq!(lines, vec!["- one", "- two", "", "1. first", "2. second"]);
    }

    #[test]
    fn test_loose_list_keeps_marker_on_text_line() {
        let lines = render("- one\n\n- two", 80);
        assert_eq!(lines, vec!["- one", "- two"]);
    }

    #[test]
    fn test_wrapped_list_item_hangs_under_text() {
        let lines = render("- alpha beta gamma delta", 12);
        assert_eq!(lines, vec!["- alpha beta", "  gamma", "  delta"]);
        assert!(lines.iter().all(|l| l.chars().count() <= 12));
    }

    #[test]
    fn test_code_block_is_not_wrapped() {
        let long = "x".repeat(30);
        let lines = render(&format!("```rust\n{long}\n```"), 10);
        assert_eq!(lines[0], "╭── rust ──");
        assert_eq!(lines[1], format!("│ {long}"));
        assert_eq!(lines[2], "╰──");
    }

    #[test]
    fn test_link_url_is_appended() {
        let lines = render("See [the docs](https://example.org).", 80);
        assert_eq!(lines, vec!["See the docs (https://example.org)."]);
    }

    #[test]
    fn test_blockquote_prefix() {
        let lines = render("> quoted", 80);
        assert_eq!(lines, vec!["│ quoted"]);
    }

    #[test]
    fn test_footnote_markers_survive() {
        let lines = render("Flu is common  ^1^ .", 80);
        assert_eq!(lines, vec!["Flu is common  ^1^ ."]);
    }
}
