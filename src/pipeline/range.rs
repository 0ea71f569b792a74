//! Range expression parsing: `"1-3,5,7-7"` → `[1, 2, 3, 5, 7]`.
//!
//! Tokens are comma-separated and either a bare page number or a
//! `start-end` pair. Output order follows the order tokens were written, and
//! a page that appears twice is kept at its first position only.
//!
//! Every value is clamped into `[1, max_pages]`. A pair whose start ends up
//! greater than its end contributes nothing, and so does a token that does
//! not parse to a page number. Those tokens are not errors; they are reported
//! in [`ParsedRange::ignored`] so callers can see what was dropped.

use std::collections::HashSet;

/// Result of parsing one range expression.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRange {
    /// Selected global pages, in written order, without duplicates.
    pub pages: Vec<u32>,
    /// Tokens that selected no page at all.
    pub ignored: Vec<String>,
}

impl ParsedRange {
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Parse `input` against a document set of `max_pages` pages.
pub fn parse(input: &str, max_pages: u32) -> Vec<u32> {
    parse_detailed(input, max_pages).pages
}

/// Like [`parse`] but also reports tokens that contributed no pages.
pub fn parse_detailed(input: &str, max_pages: u32) -> ParsedRange {
    let mut seen = HashSet::new();
    let mut out = ParsedRange::default();

    for token in input.split(',') {
        let before = out.pages.len();
        let mut matched = false;

        if let Some((start, end)) = token.split_once('-') {
            let start = leading_int(start).max(1);
            let end = leading_int(end).min(i64::from(max_pages));
            if start <= end {
                matched = true;
                for page in start..=end {
                    push_unique(&mut out.pages, &mut seen, page as u32);
                }
            }
        } else {
            let page = leading_int(token);
            if page >= 1 && page <= i64::from(max_pages) {
                matched = true;
                push_unique(&mut out.pages, &mut seen, page as u32);
            }
        }

        // A token made entirely of duplicates still matched; only tokens that
        // could never select anything are reported.
        if !matched && out.pages.len() == before && !token.trim().is_empty() {
            out.ignored.push(token.trim().to_string());
        }
    }

    out
}

fn push_unique(pages: &mut Vec<u32>, seen: &mut HashSet<u32>, page: u32) {
    if seen.insert(page) {
        pages.push(page);
    }
}

/// Integer prefix of `s` after leading whitespace; `0` when there is none.
///
/// `" 12"` → 12, `"7abc"` → 7, `"abc"` → 0, `""` → 0.
fn leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        value = value.saturating_mul(10).saturating_add(i64::from(b - b'0'));
    }
    if negative {
        -value
    } else {
        value
    }
}
