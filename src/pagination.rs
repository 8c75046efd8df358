//! Page-number clamping for post feeds.

use crate::models::{PostEntry, PostPage};

/// Posts per feed page.
pub const POSTS_PER_PAGE: i64 = 10;

/// PageWindow
///
/// A resolved page of a collection of `count` items: always a valid page, so
/// callers can fetch `limit()` rows at `offset()` without further checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: i64,
    pub num_pages: i64,
    pub count: i64,
    pub per_page: i64,
}

impl PageWindow {
    /// Resolves the raw `?page=` value against `count` items.
    ///
    /// Missing or non-numeric input gives page 1. Numbers below 1 clamp to the
    /// first page and numbers past the end clamp to the last, including those
    /// too large for `i64`. An empty
    /// collection still has one (empty) page.
    pub fn resolve(requested: Option<&str>, count: i64, per_page: i64) -> Self {
        let per_page = per_page.max(1);
        let count = count.max(0);
        let num_pages = ((count + per_page - 1) / per_page).max(1);

        let number = requested
            .and_then(|raw| parse_page_number(raw, num_pages))
            .unwrap_or(1)
            .clamp(1, num_pages);

        Self {
            number,
            num_pages,
            count,
            per_page,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.number - 1) * self.per_page
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    /// Wraps the rows fetched for this window.
    pub fn into_page(self, posts: Vec<PostEntry>) -> PostPage {
        PostPage {
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            has_previous: self.has_previous(),
            has_next: self.has_next(),
            posts,
        }
    }
}

/// Parses an integer page number. An integer that overflows `i64` saturates to
/// `last` when positive and to 1 when negative; anything else is `None`.
fn parse_page_number(raw: &str, last: i64) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(number) = raw.parse::<i64>() {
        return Some(number);
    }
    let (negative, digits) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(if negative { 1 } else { last })
}
