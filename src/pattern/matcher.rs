//! Pattern generation and testing
//!
//! Generation scans the haystack right-to-left: in API payloads the
//! occurrence closest to the end is typically the most recently appended
//! (and most specific) location, so its delimiters are tried first.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Maximum delimiter length on each side of a pattern
pub const MAX_DELIMITER_LEN: usize = 20;

/// A pair of literal text fragments bracketing a target value.
///
/// Invariant: each side is 1..=20 characters, so `before` + `after`
/// together never exceed 40 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pattern {
    /// Literal text immediately preceding the value
    pub before: String,
    /// Literal text immediately following the value
    pub after: String,
}

impl Pattern {
    /// Create a pattern from its two delimiters
    pub fn new(before: impl Into<String>, after: impl Into<String>) -> Self {
        Self {
            before: before.into(),
            after: after.into(),
        }
    }

    /// Generate candidate patterns for `needle` inside `haystack`.
    ///
    /// Occurrences are visited right-to-left. For each occurrence,
    /// delimiter length runs from `min(20, before, after)` down to 1.
    /// Duplicates are removed by value, and the final list is ordered
    /// longest-delimiter-first across all occurrences so the most
    /// specific candidates are tried first at extraction time.
    pub fn generate(haystack: &str, needle: &str) -> Vec<Pattern> {
        if needle.is_empty() {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let mut candidates: Vec<(usize, Pattern)> = Vec::new();

        let occurrences: Vec<usize> = haystack.match_indices(needle).map(|(i, _)| i).collect();

        for &start in occurrences.iter().rev() {
            let before_ctx = &haystack[..start];
            let after_ctx = &haystack[start + needle.len()..];

            let max_len = MAX_DELIMITER_LEN
                .min(before_ctx.chars().count())
                .min(after_ctx.chars().count());

            for len in (1..=max_len).rev() {
                let pattern = Pattern::new(suffix_chars(before_ctx, len), prefix_chars(after_ctx, len));
                if seen.insert(pattern.clone()) {
                    candidates.push((len, pattern));
                }
            }
        }

        // Longest first across occurrences; the per-occurrence right-to-left
        // visit order is preserved within equal lengths.
        candidates.sort_by(|a, b| b.0.cmp(&a.0));
        candidates.into_iter().map(|(_, p)| p).collect()
    }

    /// Test this pattern against `text`.
    ///
    /// Matches `escape(before) (.*?) escape(after)` non-greedily and
    /// returns the **last** matched group: in list payloads the token for
    /// the next page commonly appears after earlier-page tokens.
    pub fn test(&self, text: &str) -> Option<String> {
        let re = self.to_regex()?;
        re.captures_iter(text)
            .last()
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Compile the pattern into its matching regex
    fn to_regex(&self) -> Option<Regex> {
        let source = format!(
            "{}(.*?){}",
            regex::escape(&self.before),
            regex::escape(&self.after)
        );
        Regex::new(&source).ok()
    }

    /// Combined delimiter length in characters
    pub fn specificity(&self) -> usize {
        self.before.chars().count() + self.after.chars().count()
    }
}

/// Last `n` characters of `s` as a sub-slice
fn suffix_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth_back(n.saturating_sub(1)) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}

/// First `n` characters of `s` as a sub-slice
fn prefix_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
