//! Word-level text utilities for anchor placement and classification.
//!
//! All offsets are word indices over whitespace-tokenized content. Rendered
//! HTML positions are a concern of the site that applies the plan, not of
//! the planner.

use crate::model::AnchorClass;

/// Minimum normalized token length that counts toward a partial match.
const SIGNIFICANT_TOKEN_LEN: usize = 3;

/// Maximum number of title words used for a default anchor.
const ANCHOR_TOKEN_LIMIT: usize = 4;

/// Words kept on each side of an insertion point for review context.
const CONTEXT_WINDOW: usize = 10;

/// A page body tokenized once, reused for every candidate on that page.
#[derive(Debug)]
pub struct PageText {
    raw: Vec<String>,
    normalized: Vec<String>,
}

impl PageText {
    pub fn new(content: &str) -> Self {
        let raw: Vec<String> = content.split_whitespace().map(str::to_string).collect();
        let normalized = raw.iter().map(|w| normalize_token(w)).collect();
        Self { raw, normalized }
    }

    pub fn word_count(&self) -> usize {
        self.raw.len()
    }

    /// First occurrence of `anchor` whose start offset is not already taken.
    ///
    /// Matching is case-insensitive and punctuation-tolerant at word edges.
    pub fn find_unused(&self, anchor: &str, used_offsets: &[usize]) -> Option<usize> {
        let needle: Vec<String> = anchor
            .split_whitespace()
            .map(normalize_token)
            .filter(|t| !t.is_empty())
            .collect();
        if needle.is_empty() || needle.len() > self.normalized.len() {
            return None;
        }
        for start in 0..=(self.normalized.len() - needle.len()) {
            if used_offsets.contains(&start) {
                continue;
            }
            if self.normalized[start..start + needle.len()] == needle[..] {
                return Some(start);
            }
        }
        None
    }

    /// Review-context snippets around an insertion point.
    pub fn context(&self, offset: usize, anchor_words: usize) -> (String, String) {
        let before_start = offset.saturating_sub(CONTEXT_WINDOW);
        let before = self.raw[before_start..offset].join(" ");
        let after_start = (offset + anchor_words).min(self.raw.len());
        let after_end = (after_start + CONTEXT_WINDOW).min(self.raw.len());
        let after = self.raw[after_start..after_end].join(" ");
        (before, after)
    }
}

pub fn normalize_token(token: &str) -> String {
    token
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

/// Default anchor text for a target page: the leading words of its title,
/// bounded, falling back to the URL for untitled pages.
pub fn default_anchor(title: &str, url: &str) -> String {
    let words: Vec<&str> = title.split_whitespace().take(ANCHOR_TOKEN_LIMIT).collect();
    if words.is_empty() {
        url.to_string()
    } else {
        words.join(" ")
    }
}

/// Classify an anchor against the target page's identity.
///
/// `exact`: equals the title or the designated keyword, case-insensitively.
/// `partial`: shares at least one significant token with the title.
pub fn classify_anchor(anchor: &str, target_title: &str, keyword: Option<&str>) -> AnchorClass {
    let anchor_lower = anchor.trim().to_lowercase();
    if anchor_lower == target_title.trim().to_lowercase() {
        return AnchorClass::Exact;
    }
    if let Some(kw) = keyword
        && !kw.trim().is_empty()
        && anchor_lower == kw.trim().to_lowercase()
    {
        return AnchorClass::Exact;
    }
    let title_tokens: Vec<String> = target_title
        .split_whitespace()
        .map(normalize_token)
        .filter(|t| t.len() >= SIGNIFICANT_TOKEN_LEN)
        .collect();
    let shares_token = anchor
        .split_whitespace()
        .map(normalize_token)
        .filter(|t| t.len() >= SIGNIFICANT_TOKEN_LEN)
        .any(|t| title_tokens.contains(&t));
    if shares_token {
        AnchorClass::Partial
    } else {
        AnchorClass::Generic
    }
}

/// Token-set Jaccard similarity over title + content, the default for the
/// similar-in-section generator.
pub fn jaccard_similarity(a_title: &str, a_content: &str, b_title: &str, b_content: &str) -> f64 {
    let set_a = token_set(a_title, a_content);
    let set_b = token_set(b_title, b_content);
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    intersection as f64 / union as f64
}

fn token_set(title: &str, content: &str) -> std::collections::HashSet<String> {
    title
        .split_whitespace()
        .chain(content.split_whitespace())
        .map(normalize_token)
        .filter(|t| t.len() >= SIGNIFICANT_TOKEN_LEN)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_first_occurrence() {
        let text = PageText::new("the quick brown fox jumps over the lazy dog");
        assert_eq!(text.find_unused("brown fox", &[]), Some(2));
        assert_eq!(text.find_unused("missing phrase", &[]), None);
    }

    #[test]
    fn skips_used_offsets() {
        let text = PageText::new("spark one two spark three spark");
        assert_eq!(text.find_unused("spark", &[]), Some(0));
        assert_eq!(text.find_unused("spark", &[0]), Some(3));
        assert_eq!(text.find_unused("spark", &[0, 3]), Some(5));
        assert_eq!(text.find_unused("spark", &[0, 3, 5]), None);
    }

    #[test]
    fn matching_ignores_case_and_edge_punctuation() {
        let text = PageText::new("Visit our Product Catalog, today");
        assert_eq!(text.find_unused("product catalog", &[]), Some(2));
    }

    #[test]
    fn default_anchor_truncates_title() {
        assert_eq!(
            default_anchor("A very long page title indeed", "/x"),
            "A very long page"
        );
        assert_eq!(default_anchor("", "/fallback"), "/fallback");
    }

    #[test]
    fn classification_tiers() {
        assert_eq!(
            classify_anchor("Smartphones", "Smartphones", None),
            AnchorClass::Exact
        );
        assert_eq!(
            classify_anchor("cheap smartphones online", "Smartphones", None),
            AnchorClass::Partial
        );
        assert_eq!(
            classify_anchor("our offer", "Smartphones", None),
            AnchorClass::Generic
        );
        assert_eq!(
            classify_anchor("buy phones", "Smartphones", Some("buy phones")),
            AnchorClass::Exact
        );
    }

    #[test]
    fn context_windows_clamp_at_edges() {
        let text = PageText::new("alpha beta gamma delta");
        let (before, after) = text.context(1, 1);
        assert_eq!(before, "alpha");
        assert_eq!(after, "gamma delta");
    }

    #[test]
    fn jaccard_is_symmetric_and_bounded() {
        let s = jaccard_similarity("phones", "great phones here", "phones", "phones for sale");
        let t = jaccard_similarity("phones", "phones for sale", "phones", "great phones here");
        assert!((s - t).abs() < f64::EPSILON);
        assert!(s > 0.0 && s <= 1.0);
    }
}
