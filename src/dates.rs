//! Month-and-year tokens such as `"June' 2025"`, `"Dec'2025"` or
//! `"December 2025"`.
//!
//! Sheets only ever record a month, so every parsed date falls on day 1.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::trace;

static MONTHS: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    [
        ("jan", 0),
        ("january", 0),
        ("feb", 1),
        ("february", 1),
        ("mar", 2),
        ("march", 2),
        ("apr", 3),
        ("april", 3),
        ("may", 4),
        ("jun", 5),
        ("june", 5),
        ("jul", 6),
        ("july", 6),
        ("aug", 7),
        ("august", 7),
        ("sep", 8),
        ("sept", 8),
        ("september", 8),
        ("oct", 9),
        ("october", 9),
        ("nov", 10),
        ("november", 10),
        ("dec", 11),
        ("december", 11),
    ]
    .into_iter()
    .collect()
});

/// Parse a month/year token without caching.
///
/// Apostrophes become separators, the first alphabetic run of the first
/// word is the month, and the leading digits of the last word are the year.
/// Two-digit years are read as 20xx. Returns `None` on any failure.
pub fn parse_token(token: &str) -> Option<NaiveDate> {
    let cleaned = token.replace(['\'', '\u{2019}'], " ");
    let parts: Vec<&str> = cleaned.split_whitespace().collect();
    if parts.len() < 2 {
        return None;
    }

    let month_name: String = parts[0]
        .chars()
        .skip_while(|c| !c.is_ascii_alphabetic())
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_lowercase();
    let month0 = *MONTHS.get(month_name.as_str())?;

    let digits: String = parts[parts.len() - 1]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let mut year: i32 = digits.parse().ok()?;
    if digits.len() <= 2 {
        year += 2000;
    }
    NaiveDate::from_ymd_opt(year, month0 + 1, 1)
}

/// Memoizing front for [`parse_token`].
///
/// The same handful of tokens repeats across thousands of rows, so results
/// are cached by the exact input string. The cache is owned by one dataset
/// load and is emptied whenever it reaches `capacity`.
#[derive(Debug)]
pub struct TokenParser {
    cache: HashMap<String, Option<NaiveDate>>,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl TokenParser {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cache: HashMap::with_capacity(capacity.min(1024)),
            capacity,
            hits: 0,
            misses: 0,
        }
    }

    pub fn parse(&mut self, token: &str) -> Option<NaiveDate> {
        if token.trim().is_empty() {
            return None;
        }
        if let Some(cached) = self.cache.get(token) {
            self.hits += 1;
            return *cached;
        }
        self.misses += 1;
        let parsed = parse_token(token);
        if self.capacity == 0 {
            return parsed;
        }
        if self.cache.len() >= self.capacity {
            trace!(entries = self.cache.len(), "token cache full, clearing");
            self.cache.clear();
        }
        self.cache.insert(token.to_string(), parsed);
        parsed
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// `(hits, misses)` since construction.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

impl Default for TokenParser {
    fn default() -> Self {
        Self::with_capacity(4096)
    }
}
