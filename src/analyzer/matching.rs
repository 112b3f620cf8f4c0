//! Response scoring against on-screen text sections
//!
//! The vision model reports the text it can see in the data region; a
//! captured response "matches" when enough of those sections appear in
//! its body, exactly or approximately.

use crate::capture::CapturedResponse;
use std::collections::HashSet;

/// A response is accepted at this fraction of matched sections
pub const MATCH_THRESHOLD: f64 = 0.5;

/// A single section counts as matched at this bigram containment
const SECTION_THRESHOLD: f64 = 0.8;

/// Fraction of sections a body matches, exactly or fuzzily
pub fn score_response(body: &str, sections: &[String]) -> f64 {
    if sections.is_empty() {
        return 0.0;
    }
    let matched = sections
        .iter()
        .filter(|section| section_matches(body, section))
        .count();
    matched as f64 / sections.len() as f64
}

/// First captured response scoring at or above the threshold, in
/// arrival order
pub fn find_matching_response(
    responses: &[CapturedResponse],
    sections: &[String],
) -> Option<usize> {
    responses
        .iter()
        .position(|response| score_response(&response.body, sections) >= MATCH_THRESHOLD)
}

fn section_matches(body: &str, section: &str) -> bool {
    let section = section.trim();
    if section.is_empty() {
        return false;
    }
    if body.contains(section) {
        return true;
    }
    bigram_containment(section, body) >= SECTION_THRESHOLD
}

/// Fraction of the needle's character bigrams present anywhere in the
/// haystack. Cheap, deterministic, and tolerant of markup interleaving
/// (HTML tags between the words the screenshot shows).
fn bigram_containment(needle: &str, haystack: &str) -> f64 {
    let needle_bigrams = bigrams(needle);
    if needle_bigrams.is_empty() {
        return 0.0;
    }
    let haystack_bigrams: HashSet<(char, char)> = bigrams(haystack).into_iter().collect();
    let contained = needle_bigrams
        .iter()
        .filter(|b| haystack_bigrams.contains(b))
        .count();
    contained as f64 / needle_bigrams.len() as f64
}

fn bigrams(text: &str) -> Vec<(char, char)> {
    let chars: Vec<char> = text
        .chars()
        .flat_map(|c| c.to_lowercase())
        .filter(|c| !c.is_whitespace())
        .collect();
    chars.windows(2).map(|w| (w[0], w[1])).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CapturedRequest;
    use crate::types::{Method, RequestType};

    fn response(body: &str) -> CapturedResponse {
        CapturedResponse::new(
            CapturedRequest::new(Method::GET, "https://x.test/a", RequestType::Ajax),
            body,
        )
    }

    #[test]
    fn test_exact_sections_match() {
        let body = r#"[{"name":"Acme Corp","city":"Berlin"},{"name":"Globex","city":"Paris"}]"#;
        let sections = vec!["Acme Corp".to_string(), "Globex".to_string()];
        assert_eq!(score_response(body, &sections), 1.0);
    }

    #[test]
    fn test_half_matched_sections_hit_threshold() {
        let body = r#"[{"name":"Acme Corp"}]"#;
        let sections = vec!["Acme Corp".to_string(), "Missing Entirely XYZ".to_string()];
        let score = score_response(body, &sections);
        assert!((score - 0.5).abs() < f64::EPSILON);
        assert!(score >= MATCH_THRESHOLD);
    }

    #[test]
    fn test_fuzzy_match_through_markup() {
        // The on-screen text is split by tags in the SSR body.
        let body = "<li><b>Acme</b> <i>Corp</i></li>";
        let sections = vec!["Acme Corp".to_string()];
        assert!(score_response(body, &sections) >= MATCH_THRESHOLD);
    }

    #[test]
    fn test_empty_sections_score_zero() {
        assert_eq!(score_response("anything", &[]), 0.0);
    }

    #[test]
    fn test_find_first_matching_response() {
        let responses = vec![
            response("{\"status\":\"ok\"}"),
            response(r#"[{"title":"First Item"},{"title":"Second Item"}]"#),
            response(r#"[{"title":"First Item"}]"#),
        ];
        let sections = vec!["First Item".to_string(), "Second Item".to_string()];
        assert_eq!(find_matching_response(&responses, &sections), Some(1));
    }

    #[test]
    fn test_no_response_matches() {
        let responses = vec![response("{}")];
        let sections = vec!["Nothing Here".to_string()];
        assert_eq!(find_matching_response(&responses, &sections), None);
    }
}
