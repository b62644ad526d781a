//! Markdown outline of a [`DocumentAnalysis`].
//!
//! ```text
//! # Title                (optional)
//! ## Summary
//! ## Keywords
//! ## Heading           ← level 2, +1 per nesting depth, capped at 6
//! *p. 3–5*
//! content
//! ```

use crate::output::{DocumentAnalysis, Heading};
use std::fmt::Write;

const MAX_LEVEL: usize = 6;
const TOP_LEVEL: usize = 2;

/// Knobs for [`render_outline`].
#[derive(Debug, Clone)]
pub struct OutlineOptions {
    /// Rendered as a level-1 heading when set.
    pub title: Option<String>,
    pub include_content: bool,
    pub include_pages: bool,
}

impl Default for OutlineOptions {
    fn default() -> Self {
        Self {
            title: None,
            include_content: true,
            include_pages: true,
        }
    }
}

/// Render `analysis` as a Markdown document.
pub fn render_outline(analysis: &DocumentAnalysis, options: &OutlineOptions) -> String {
    let mut blocks: Vec<String> = Vec::new();

    if let Some(title) = options.title.as_deref().filter(|t| !t.trim().is_empty()) {
        blocks.push(format!("# {}", title.trim()));
    }
    if !analysis.summary.trim().is_empty() {
        blocks.push(format!("## Summary\n\n{}", analysis.summary.trim()));
    }
    if !analysis.keywords.is_empty() {
        blocks.push(format!("## Keywords\n\n{}", analysis.keywords.join(", ")));
    }
    for heading in &analysis.headings {
        push_heading(&mut blocks, heading, TOP_LEVEL, options);
    }

    let mut out = blocks.join("\n\n");
    out.push('\n');
    out
}

fn push_heading(blocks: &mut Vec<String>, h: &Heading, level: usize, options: &OutlineOptions) {
    let mut block = String::new();
    let title = if h.title.trim().is_empty() {
        "Untitled"
    } else {
        h.title.trim()
    };
    let _ = write!(block, "{} {}", "#".repeat(level.min(MAX_LEVEL)), title);

    if options.include_pages {
        if let Some(pages) = page_range(h) {
            let _ = write!(block, "\n\n*{pages}*");
        }
    }
    if options.include_content && !h.content.trim().is_empty() {
        let _ = write!(block, "\n\n{}", h.content.trim());
    }
    blocks.push(block);

    for sub in &h.subheadings {
        push_heading(blocks, sub, level + 1, options);
    }
}

/// `p. 3` for a single page, `p. 3–5` for a span, `None` when both are 0.
pub fn page_range(h: &Heading) -> Option<String> {
    match (h.start_page, h.end_page) {
        (0, 0) => None,
        (s, e) if s == e || e == 0 => Some(format!("p. {s}")),
        (0, e) => Some(format!("p. {e}")),
        (s, e) => Some(format!("p. {s}–{e}")),
    }
}
