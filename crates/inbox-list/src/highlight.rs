use std::collections::HashMap;
use std::ops::Range;

use tracing::trace;

/// Byte range into the highlighted text. Always on char boundaries.
pub type Span = Range<usize>;

/// Default number of cached texts before the cache is reset.
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Find every case-insensitive occurrence of `keyword` in `text`.
///
/// Matches never overlap: after a hit the scan resumes at its end, so
/// `"aaaa"` searched for `"aa"` yields two spans, not three. A blank keyword
/// yields nothing.
pub fn highlight(text: &str, keyword: &str) -> Vec<Span> {
    if keyword.trim().is_empty() {
        return Vec::new();
    }

    // Same string-level folding as the filter, so Greek final sigma and
    // friends agree between what is kept and what is highlighted
    let needle: Vec<char> = keyword.to_lowercase().chars().collect();
    let folded = fold_with_offsets(text);

    let mut spans = Vec::new();
    let mut i = 0;
    while i + needle.len() <= folded.len() {
        let window = &folded[i..i + needle.len()];
        if window.iter().zip(&needle).all(|(f, n)| f.0 == *n) {
            spans.push(window[0].1..window[needle.len() - 1].2);
            i += needle.len();
        } else {
            i += 1;
        }
    }
    spans
}

/// Lowercase `text` as `str::to_lowercase` does, tagging every folded char
/// with the byte range of the source char it came from.
///
/// The string-level fold maps each source char to exactly as many chars as
/// `char::to_lowercase` would; only the choice of sigma depends on context.
fn fold_with_offsets(text: &str) -> Vec<(char, usize, usize)> {
    let lowered = text.to_lowercase();
    let mut lowered = lowered.chars();
    let mut folded = Vec::with_capacity(text.len());
    for (start, ch) in text.char_indices() {
        let end = start + ch.len_utf8();
        for _ in 0..ch.to_lowercase().count() {
            if let Some(lower) = lowered.next() {
                folded.push((lower, start, end));
            }
        }
    }
    folded
}

/// Highlight spans for the active keyword, keyed by text.
///
/// Switching keyword drops everything. Once `capacity` texts are cached the
/// next miss clears the map before inserting; there is no LRU ordering.
pub struct HighlightCache {
    keyword: String,
    capacity: usize,
    entries: HashMap<String, Vec<Span>>,
}

impl HighlightCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            keyword: String::new(),
            capacity: capacity.max(1),
            entries: HashMap::new(),
        }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Returns true if the keyword changed (and the cache was cleared).
    pub fn set_keyword(&mut self, keyword: &str) -> bool {
        if self.keyword == keyword {
            return false;
        }
        self.keyword = keyword.to_string();
        self.entries.clear();
        true
    }

    pub fn spans(&mut self, text: &str) -> Vec<Span> {
        if self.keyword.trim().is_empty() {
            return Vec::new();
        }
        if let Some(hit) = self.entries.get(text) {
            return hit.clone();
        }

        if self.entries.len() >= self.capacity {
            trace!(entries = self.entries.len(), "Highlight cache full, resetting");
            self.entries.clear();
        }
        let spans = highlight(text, &self.keyword);
        self.entries.insert(text.to_string(), spans.clone());
        spans
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for HighlightCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
