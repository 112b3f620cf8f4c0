//! Cursor reverse-engineering
//!
//! An opaque cursor is rarely one indivisible token: APIs embed ids,
//! timestamps, or signed fragments inside a JSON-ish wrapper. The
//! resolver splits the observed value into "sub-cursors", finds the
//! response that contains them, and brackets each one with delimiter
//! patterns so the next page's value can be re-assembled from any later
//! response.

use super::types::CursorParameter;
use crate::pattern::Pattern;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Minimum length for a value to qualify as a potential cursor
const MIN_CURSOR_LEN: usize = 8;

static CURSOR_CHARSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_\-+:.=/]+$").unwrap());

static ISO_DATETIME_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}").unwrap());

static ESCAPED_DOUBLE_QUOTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\\"([^"\\]+)\\""#).unwrap());

static DOUBLE_QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]+)""#).unwrap());

static SINGLE_QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r"'([^']+)'").unwrap());

/// Whether a value looks like an opaque cursor: long enough and drawn
/// from the usual token charset, or starting with an ISO datetime.
pub fn is_potential_cursor(value: &str) -> bool {
    (value.len() >= MIN_CURSOR_LEN && CURSOR_CHARSET.is_match(value))
        || ISO_DATETIME_PREFIX.is_match(value)
}

/// Quoted substrings of a composite value, in match order:
/// escaped-double, double, then single quoted.
pub(crate) fn quoted_candidates(value: &str) -> Vec<String> {
    let mut out = Vec::new();
    for re in [&*ESCAPED_DOUBLE_QUOTED, &*DOUBLE_QUOTED, &*SINGLE_QUOTED] {
        for caps in re.captures_iter(value) {
            if let Some(m) = caps.get(1) {
                let candidate = m.as_str().to_string();
                if !out.contains(&candidate) {
                    out.push(candidate);
                }
            }
        }
    }
    out
}

/// Split a cursor value into the sub-cursors worth tracking.
///
/// A value that is itself cursor-shaped is its own single sub-cursor;
/// composite values contribute each cursor-shaped quoted substring.
fn potential_sub_cursors(value: &str) -> Vec<String> {
    if is_potential_cursor(value) {
        return vec![value.to_string()];
    }
    quoted_candidates(value)
        .into_iter()
        .filter(|c| is_potential_cursor(c))
        .collect()
}

impl CursorParameter {
    /// Build the pattern map for a cursor candidate.
    ///
    /// Scores every known response by how many sub-cursors it contains
    /// verbatim and generates patterns against the best-scoring one. A
    /// sub-cursor with no generated patterns is kept as a constant.
    /// Returns `None` when no sub-cursors exist or no response contains
    /// any of them (the pattern map would be empty).
    pub fn build(
        key: impl Into<String>,
        candidate_value: &str,
        known_responses: &[String],
    ) -> Option<Self> {
        let subs = potential_sub_cursors(candidate_value);
        if subs.is_empty() {
            return None;
        }

        let source = known_responses
            .iter()
            .map(|body| {
                let score = subs.iter().filter(|sub| body.contains(sub.as_str())).count();
                (score, body)
            })
            .filter(|(score, _)| *score > 0)
            .max_by_key(|(score, _)| *score)
            .map(|(_, body)| body)?;

        let pattern_map: Vec<(String, Vec<Pattern>)> = subs
            .into_iter()
            .map(|sub| {
                let patterns = Pattern::generate(source, &sub);
                if patterns.is_empty() {
                    debug!("sub-cursor `{sub}` has no patterns, recording as constant");
                }
                (sub, patterns)
            })
            .collect();

        Some(Self {
            key: key.into(),
            default_value: candidate_value.to_string(),
            pattern_map,
        })
    }

    /// Extract the next cursor value from a response.
    ///
    /// Each sub-cursor's patterns are tried most specific first; a
    /// patterned sub-cursor that matches nothing fails the whole
    /// extraction. The new cursor substitutes resolved values into the
    /// default, longer sub-cursors first to avoid partial-substring
    /// corruption.
    pub fn extract_cursor(&self, response_text: &str) -> Option<String> {
        let mut resolved: Vec<(&String, String)> = Vec::with_capacity(self.pattern_map.len());

        for (sub, patterns) in &self.pattern_map {
            if patterns.is_empty() {
                resolved.push((sub, sub.clone()));
                continue;
            }
            let value = patterns.iter().find_map(|p| p.test(response_text))?;
            resolved.push((sub, value));
        }

        resolved.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        let mut cursor = self.default_value.clone();
        for (sub, value) in resolved {
            cursor = cursor.replace(sub.as_str(), &value);
        }
        Some(cursor)
    }

    /// The default value with every sub-cursor replaced by the literal
    /// token `null`, consuming the surrounding quotes at their escape
    /// depth. Used to probe for an implicit first page.
    pub fn nulled_default(&self) -> String {
        let mut subs: Vec<&String> = self.pattern_map.iter().map(|(sub, _)| sub).collect();
        subs.sort_by(|a, b| b.len().cmp(&a.len()));

        let mut value = self.default_value.clone();
        for sub in subs {
            let escaped = format!("\\\"{sub}\\\"");
            if value.contains(&escaped) {
                value = value.replace(&escaped, "null");
                continue;
            }
            let double = format!("\"{sub}\"");
            if value.contains(&double) {
                value = value.replace(&double, "null");
                continue;
            }
            let single = format!("'{sub}'");
            if value.contains(&single) {
                value = value.replace(&single, "null");
                continue;
            }
            value = value.replace(sub.as_str(), "null");
        }
        value
    }
}

// ============================================================================
// Start Cursor Detection
// ============================================================================

/// A candidate starting point for a cursor chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartCursor {
    /// Send the first request with the cursor parameter removed
    Omitted,
    /// Send the first request with this cursor value
    Value(String),
}

/// Candidate starting points, in trial order.
///
/// All but the last are speculative: the translator replays each one and
/// the first that does not raise a request error wins. The final
/// candidate is the captured default and is not speculative: its errors
/// propagate.
pub fn start_cursor_candidates(param: &CursorParameter) -> Vec<StartCursor> {
    let mut candidates = vec![StartCursor::Omitted];
    let nulled = param.nulled_default();
    if nulled != param.default_value {
        candidates.push(StartCursor::Value(nulled));
    }
    candidates.push(StartCursor::Value(param.default_value.clone()));
    candidates
}
