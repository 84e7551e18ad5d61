//! # Terminal Output
//!
//! Prints rendered conversations to any `io::Write`.
//!
//! ```text
//! You
//!   What is influenza?
//!
//! Assistant
//!   Influenza is a respiratory illness  ^1^ .
//!
//!   Sources:
//!   [1] Flu facts (https://example.org/flu)
//! ```
//!
//! Assistant answers go through `parse_answer` so `[docN]` markers become
//! footnotes and only cited sources are listed.

pub mod markdown;

use std::io::{self, Write};

use crate::api::{Citation, UserInfo};
use crate::chat::{MessageRenderer, RenderKind, RenderedMessage, parse_answer};

pub const DEFAULT_WIDTH: usize = 80;
const INDENT: &str = "  ";

/// Terminal width from `$COLUMNS`, or [`DEFAULT_WIDTH`].
pub fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|c| c.parse().ok())
        .filter(|&w: &usize| w >= 20)
        .unwrap_or(DEFAULT_WIDTH)
}

pub fn write_conversation(
    out: &mut impl Write,
    renderer: MessageRenderer<'_>,
    width: usize,
) -> io::Result<()> {
    for (i, item) in renderer.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        write_message(out, &item, width)?;
    }
    Ok(())
}

pub fn write_message(out: &mut impl Write, item: &RenderedMessage<'_>, width: usize) -> io::Result<()> {
    let body_width = width.saturating_sub(INDENT.len());
    match &item.kind {
        RenderKind::User { content } => {
            writeln!(out, "You")?;
            for line in textwrap::wrap(content, body_width) {
                writeln!(out, "{INDENT}{line}")?;
            }
        }
        RenderKind::Assistant { content, citations } => {
            writeln!(out, "Assistant")?;
            let parsed = parse_answer(content, citations);
            write_indented(out, &markdown::render(&parsed.markdown, body_width))?;
            if !parsed.citations.is_empty() {
                writeln!(out)?;
                writeln!(out, "{INDENT}Sources:")?;
                for citation in &parsed.citations {
                    writeln!(out, "{INDENT}{}", source_line(citation))?;
                }
            }
        }
        RenderKind::Error { content } => {
            writeln!(out, "Error")?;
            // Shown verbatim, no markdown.
            for line in content.lines() {
                writeln!(out, "{INDENT}{line}")?;
            }
        }
    }
    Ok(())
}

/// `[K] label (url)` for a footnoted citation.
fn source_line(citation: &Citation) -> String {
    let number = citation.reindex_id.as_deref().unwrap_or("?");
    match &citation.url {
        Some(url) if !url.is_empty() => format!("[{number}] {} ({url})", citation.label()),
        _ => format!("[{number}] {}", citation.label()),
    }
}

/// Maps footnote `k` (1-based, as printed) to the index in `item.citations()`.
pub fn footnote_target(item: &RenderedMessage<'_>, k: usize) -> Option<usize> {
    let parsed = parse_answer(item.content(), item.citations());
    let doc: usize = parsed.citations.get(k.checked_sub(1)?)?.id.as_deref()?.parse().ok()?;
    doc.checked_sub(1)
}

/// Prints a citation's details panel.
pub fn write_citation(out: &mut impl Write, citation: &Citation, width: usize) -> io::Result<()> {
    let rule = "─".repeat(width.min(60));
    writeln!(out, "{rule}")?;
    writeln!(out, "{}", citation.label())?;
    if let Some(url) = citation.url.as_deref().filter(|u| !u.is_empty()) {
        writeln!(out, "{url}")?;
    }
    if let Some(path) = citation.filepath.as_deref().filter(|p| !p.is_empty()) {
        writeln!(out, "File: {path}")?;
    }
    writeln!(out, "{rule}")?;
    match citation.content.as_deref() {
        Some(content) if !content.trim().is_empty() => {
            for line in markdown::render(content, width) {
                writeln!(out, "{line}")?;
            }
        }
        _ => writeln!(out, "(no content)")?,
    }
    Ok(())
}

pub fn write_user_info(out: &mut impl Write, users: &[UserInfo]) -> io::Result<()> {
    let Some(user) = users.first() else {
        return writeln!(out, "No identity provider is configured; running anonymously.");
    };
    writeln!(out, "User id: {}", user.user_id)?;
    if let Some(name) = user.display_name() {
        writeln!(out, "Name:    {name}")?;
    }
    if !user.provider_name.is_empty() {
        writeln!(out, "Provider: {}", user.provider_name)?;
    }
    Ok(())
}

pub fn write_settings(out: &mut impl Write, settings: Option<&serde_json::Value>) -> io::Result<()> {
    match settings {
        Some(value) => {
            let pretty = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
            writeln!(out, "{pretty}")
        }
        None => writeln!(out, "Frontend settings are unavailable."),
    }
}

fn write_indented(out: &mut impl Write, lines: &[String]) -> io::Result<()> {
    for line in lines {
        if line.is_empty() {
            writeln!(out)?;
        } else {
            writeln!(out, "{INDENT}{line}")?;
        }
    }
    Ok(())
}
