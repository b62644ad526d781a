//! JSON extraction and truncation recovery for model-generated text.
//!
//! Generative backends answer with prose that *contains* JSON: usually inside
//! a ` ```json ` fence, sometimes bare, and, when the model hits its output
//! limit, cut off mid-object. This module gets a JSON value out of such text
//! through escalating strategies:
//!
//! 1. Parse the body of a ` ```json ` fence, or the whole text.
//! 2. Trim trailing placeholder markers (`...`, `(output is coming ...`).
//! 3. **Balanced prefix**: scan tracking brace/bracket depth and accept the
//!    prefix that returns to depth zero and parses.
//! 4. **Force-close**: append the missing closers in nesting order, backing
//!    off to earlier value boundaries a bounded number of times.
//! 5. **Title scrape**: regex out every `"title": "..."` and synthesise a
//!    minimal document.
//!
//! The depth scan is string-aware: brackets inside JSON strings and escaped
//! quotes do not count.

use crate::error::RecoveryError;
use crate::output::{DocumentAnalysis, Heading};
use crate::pipeline::shape::has_document_content;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Placeholder content for headings synthesised by title scraping.
pub const TRUNCATED_CONTENT: &str = "Content extracted from truncated response";

/// Summary for documents synthesised by title scraping.
pub const TRUNCATED_SUMMARY: &str =
    "Document analysis was partially successful but response was truncated";

/// Keywords for documents synthesised by title scraping.
pub const TRUNCATED_KEYWORDS: &[&str] = &["extracted", "partial", "data"];

/// Title scraping keeps at most this many headings.
pub const MAX_SCRAPED_TITLES: usize = 5;

/// Force-close tries the full text plus at most this many earlier cut points.
const MAX_BACKTRACK: usize = 16;

/// Recovery restarts from at most this many `{`/`[` positions.
const MAX_OPENERS: usize = 8;

/// Markers models print where they gave up.
const PLACEHOLDER_MARKERS: &[&str] = &[
    "(output is comming",
    "(output is coming",
    "output is comming",
    "output is coming",
    "...",
    "\u{2026}",
];

// The closing fence may sit on the last line of the body.
static RE_JSON_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?si)```(?:json)?[ \t]*\r?\n(.*?)\r?\n?[ \t]*```").unwrap());

// Same as above but the closing fence is optional (truncated output).
static RE_JSON_FENCE_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?si)```(?:json)?[ \t]*\r?\n(.*?)(?:\r?\n?[ \t]*```|$)").unwrap());

static RE_TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r#""title":\s*"([^"]+)""#).unwrap());

/// Which recovery strategy produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStrategy {
    BalancedPrefix,
    ForceClosed,
}

/// Outcome of [`extract_json`].
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// The text (or its fence) parsed as-is.
    Parsed(Value),
    /// A truncated payload was repaired.
    Recovered {
        value: Value,
        strategy: RecoveryStrategy,
    },
    /// Nothing parsed; a minimal document was built from the visible titles.
    Scraped(DocumentAnalysis),
}

/// Get JSON out of model-generated `text`.
///
/// With `recover = false` only step 1 runs. With `recover = true` the
/// truncation strategies run too; a repaired value is only accepted when it
/// carries document content, otherwise title scraping gets its chance.
pub fn extract_json(text: &str, recover: bool) -> Option<Extraction> {
    match parse_embedded_json(text) {
        Ok(v) => return Some(Extraction::Parsed(v)),
        Err(e) => debug!("Embedded JSON did not parse: {}", e),
    }
    if !recover {
        return None;
    }

    let candidate = open_fence_body(text).unwrap_or(text);
    match recover_truncated(candidate) {
        Ok((value, strategy)) if has_document_content(&value) => {
            info!("Recovered truncated JSON via {:?}", strategy);
            return Some(Extraction::Recovered { value, strategy });
        }
        Ok((_, strategy)) => {
            debug!("{:?} produced JSON without document content", strategy)
        }
        Err(e) => warn!("Could not repair truncated JSON: {}", e),
    }

    let scraped = scrape_titles(text);
    if let Some(ref doc) = scraped {
        info!(
            "Built fallback document from {} scraped titles",
            doc.headings.len()
        );
    }
    scraped.map(Extraction::Scraped)
}

/// Parse the body of the first ` ```json ` fence, or the whole text when there is none.
pub fn parse_embedded_json(text: &str) -> Result<Value, serde_json::Error> {
    match RE_JSON_FENCE.captures(text) {
        Some(caps) => serde_json::from_str(&caps[1]),
        None => serde_json::from_str(text.trim()),
    }
}

/// Body of a fence whose closing ``` may be missing.
fn open_fence_body(text: &str) -> Option<&str> {
    RE_JSON_FENCE_OPEN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Run the placeholder-trim, balanced-prefix, and force-close strategies.
///
/// Prose may carry brackets of its own (`Analysis [draft]:`), so the repair
/// is retried from each later `{` or `[` until one yields document content.
/// Without such a candidate the first repair that parsed at all is returned.
pub fn recover_truncated(text: &str) -> Result<(Value, RecoveryStrategy), RecoveryError> {
    let trimmed = trim_placeholders(text);
    if trimmed.trim().is_empty() {
        return Err(RecoveryError::Empty);
    }

    let mut fallback = None;
    let mut first_error = None;
    for (start, _) in trimmed.match_indices(['{', '[']).take(MAX_OPENERS) {
        match repair(trimmed[start..].trim_end()) {
            Ok((v, strategy)) if has_document_content(&v) => {
                if start > 0 {
                    debug!("Recovered JSON starts at byte {}", start);
                }
                return Ok((v, strategy));
            }
            Ok(found) => {
                fallback.get_or_insert(found);
            }
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }

    match (fallback, first_error) {
        (Some(found), _) => Ok(found),
        (None, Some(e)) => Err(e),
        (None, None) => Err(RecoveryError::NotStructured),
    }
}

/// Balanced prefix, then force-close, on a body starting at an opener.
fn repair(body: &str) -> Result<(Value, RecoveryStrategy), RecoveryError> {
    if let Some(v) = balanced_prefix(body) {
        return Ok((v, RecoveryStrategy::BalancedPrefix));
    }

    // Scan once for cut points; stop at the first mismatched closer.
    let mut scan = Scanner::default();
    let mut end = body.len();
    for (i, c) in body.char_indices() {
        if let Err(e) = scan.feed(i, c) {
            debug!("Force-close stops at {}", e);
            end = i;
            break;
        }
    }

    let cuts = std::iter::once(end).chain(
        scan.boundaries
            .iter()
            .rev()
            .copied()
            .filter(|&b| b < end)
            .take(MAX_BACKTRACK),
    );

    let mut attempts = 0;
    let mut last_error = String::from("nothing to parse");
    for cut in cuts {
        attempts += 1;
        let candidate = close_prefix(&body[..cut])?;
        match serde_json::from_str::<Value>(&candidate) {
            Ok(v) => {
                debug!("Force-closed at byte {} of {}", cut, body.len());
                return Ok((v, RecoveryStrategy::ForceClosed));
            }
            Err(e) => last_error = e.to_string(),
        }
    }

    Err(RecoveryError::Unrepairable {
        attempts,
        last_error,
    })
}

/// Cut `text` at the first placeholder marker that sits outside a JSON
/// string, or strip a marker the text ends with.
pub fn trim_placeholders(text: &str) -> &str {
    let mut scan = Scanner::default();
    for (i, c) in text.char_indices() {
        if !scan.in_string {
            let rest = &text[i..];
            if PLACEHOLDER_MARKERS.iter().any(|m| rest.starts_with(m)) {
                return text[..i].trim_end();
            }
        }
        if scan.feed(i, c).is_err() {
            break;
        }
    }

    let t = text.trim_end();
    for m in PLACEHOLDER_MARKERS {
        if let Some(stripped) = t.strip_suffix(m) {
            return stripped.trim_end();
        }
    }
    t
}

/// The prefix of `body` that closes the top-level value and parses.
pub fn balanced_prefix(body: &str) -> Option<Value> {
    let mut scan = Scanner::default();
    for (i, c) in body.char_indices() {
        scan.feed(i, c).ok()?;
        if scan.depth() == 0 && !scan.in_string && (c == '}' || c == ']') {
            let prefix = &body[..i + c.len_utf8()];
            return serde_json::from_str(prefix).ok();
        }
    }
    None
}

/// Append the closers `text` is missing, in nesting order.
///
/// Returns the completed text; the caller decides whether it parses.
pub fn force_close(text: &str) -> Result<String, RecoveryError> {
    let start = text
        .find(['{', '['])
        .ok_or(RecoveryError::NotStructured)?;
    close_prefix(text[start..].trim_end())
}

fn close_prefix(prefix: &str) -> Result<String, RecoveryError> {
    let mut scan = Scanner::default();
    for (i, c) in prefix.char_indices() {
        scan.feed(i, c)?;
    }

    let mut out = String::with_capacity(prefix.len() + scan.depth() + 6);
    out.push_str(prefix);
    if scan.in_string {
        if scan.escaped {
            out.pop();
        }
        out.push('"');
    }
    loop {
        let len = out.trim_end().len();
        out.truncate(len);
        if out.ends_with(',') {
            out.pop();
        } else {
            break;
        }
    }
    if out.ends_with(':') {
        out.push_str("null");
    }
    out.extend(scan.stack.iter().rev());
    Ok(out)
}

/// Build a minimal document from the `"title": "..."` pairs visible in `text`.
pub fn scrape_titles(text: &str) -> Option<DocumentAnalysis> {
    let headings: Vec<Heading> = RE_TITLE
        .captures_iter(text)
        .take(MAX_SCRAPED_TITLES)
        .enumerate()
        .map(|(i, caps)| Heading {
            title: caps[1].to_string(),
            content: TRUNCATED_CONTENT.to_string(),
            start_page: 1,
            start_line: i as u32 + 1,
            end_page: 1,
            end_line: i as u32 + 2,
            subheadings: Vec::new(),
        })
        .collect();

    if headings.is_empty() {
        return None;
    }

    Some(DocumentAnalysis {
        summary: TRUNCATED_SUMMARY.to_string(),
        keywords: TRUNCATED_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        headings,
    })
}

// ── Depth scanner ────────────────────────────────────────────────────────────

/// Tracks open brackets, string state, and places where a value could be cut.
#[derive(Debug, Default)]
struct Scanner {
    /// Expected closers, innermost last.
    stack: Vec<char>,
    in_string: bool,
    escaped: bool,
    /// Byte offsets of commas and of the position just after each opener.
    boundaries: Vec<usize>,
}

impl Scanner {
    fn feed(&mut self, offset: usize, c: char) -> Result<(), RecoveryError> {
        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if c == '\\' {
                self.escaped = true;
            } else if c == '"' {
                self.in_string = false;
            }
            return Ok(());
        }
        match c {
            '"' => self.in_string = true,
            '{' => {
                self.stack.push('}');
                self.boundaries.push(offset + 1);
            }
            '[' => {
                self.stack.push(']');
                self.boundaries.push(offset + 1);
            }
            '}' | ']' => match self.stack.pop() {
                Some(expected) if expected == c => {}
                _ => return Err(RecoveryError::Mismatched { found: c, offset }),
            },
            ',' => self.boundaries.push(offset),
            _ => {}
        }
        Ok(())
    }

    fn depth(&self) -> usize {
        self.stack.len()
    }
}
