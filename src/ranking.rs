//! Deterministic tier ranking shared by every data source.
//!
//! Candidates are bucketed into ordered tiers by how their display name
//! relates to the query; ties within a tier are broken alphabetically,
//! case-insensitively. The ranking is intentionally exact-match based: no
//! fuzzy or typo-tolerant scoring, so the same inputs always produce the
//! same ordering.

use std::cmp::Ordering;

/// How well a display name matches the query. Lower ordinal sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PriorityTier {
    /// Lower-cased name equals the normalized query.
    Exact,
    /// Lower-cased name starts with the normalized query.
    Prefix,
    /// Every query token is a prefix of some word in the name ("jo sm"
    /// matches "John Smith" and "Smith John" alike).
    AllTokensPrefix,
    /// Query appears somewhere inside the name.
    Substring,
    /// No match; the candidate is dropped, never ranked.
    Excluded,
}

impl PriorityTier {
    /// True only for [`PriorityTier::Excluded`]. Callers drop such
    /// candidates instead of ranking them.
    pub fn is_excluded(self) -> bool {
        matches!(self, PriorityTier::Excluded)
    }
}

/// A query normalized once per search and reused across every candidate.
#[derive(Debug, Clone)]
pub struct Query {
    normalized: String,
    tokens: Vec<String>,
}

impl Query {
    /// Trim, lower-case, and collapse whitespace; split into tokens.
    pub fn new(raw: &str) -> Self {
        let tokens: Vec<String> = raw
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect();
        let normalized = tokens.join(" ");
        Self { normalized, tokens }
    }

    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

/// Rank a display name against a pre-normalized query.
///
/// Pure and side-effect-free; makes no assumption about call frequency.
pub fn rank(display_name: &str, query: &Query) -> PriorityTier {
    let name = display_name.to_lowercase();

    if name == query.normalized {
        return PriorityTier::Exact;
    }
    if name.starts_with(&query.normalized) {
        return PriorityTier::Prefix;
    }
    if !query.tokens.is_empty() && all_tokens_prefix(&name, &query.tokens) {
        return PriorityTier::AllTokensPrefix;
    }
    if name.contains(&query.normalized) {
        return PriorityTier::Substring;
    }
    PriorityTier::Excluded
}

/// Every token must be a prefix of some whitespace-delimited word of the
/// (already lower-cased) name. Order-independent.
fn all_tokens_prefix(name: &str, tokens: &[String]) -> bool {
    tokens
        .iter()
        .all(|token| name.split_whitespace().any(|word| word.starts_with(token.as_str())))
}

/// Case-insensitive alphabetical comparison used as the tie-break within a
/// tier, and for plain alphabetical listings.
pub fn name_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(raw: &str) -> Query {
        Query::new(raw)
    }

    #[test]
    fn test_exact_match() {
        assert_eq!(rank("Signal", &q("signal")), PriorityTier::Exact);
        assert_eq!(rank("SIGNAL", &q("Signal")), PriorityTier::Exact);
    }

    #[test]
    fn test_prefix_before_substring() {
        let query = q("jo");
        assert_eq!(rank("John", &query), PriorityTier::Prefix);
        assert_eq!(rank("Bjorn", &query), PriorityTier::Substring);
        assert!(rank("John", &query) < rank("Bjorn", &query));
    }

    #[test]
    fn test_token_prefix_is_order_independent() {
        let query = q("jo sm");
        assert_eq!(rank("John Smith", &query), PriorityTier::AllTokensPrefix);
        assert_eq!(rank("Smith John", &query), PriorityTier::AllTokensPrefix);
    }

    #[test]
    fn test_token_must_match_word_boundary() {
        // "hn" and "mi" are inside "John Smith" but no word starts with
        // either, and "hn mi" is not a contiguous substring
        assert_eq!(rank("John Smith", &q("hn mi")), PriorityTier::Excluded);
        // "hn sm" fails the per-word check yet is literally contained
        assert_eq!(rank("John Smith", &q("hn sm")), PriorityTier::Substring);
    }

    #[test]
    fn test_excluded() {
        let tier = rank("Alice", &q("zz"));
        assert_eq!(tier, PriorityTier::Excluded);
        assert!(tier.is_excluded());
        assert!(!PriorityTier::Substring.is_excluded());
    }

    #[test]
    fn test_query_normalization() {
        let query = q("  JoHn   SmItH ");
        assert_eq!(query.normalized(), "john smith");
        assert_eq!(query.tokens(), ["john", "smith"]);
    }

    #[test]
    fn test_tier_ordering() {
        assert!(PriorityTier::Exact < PriorityTier::Prefix);
        assert!(PriorityTier::Prefix < PriorityTier::AllTokensPrefix);
        assert!(PriorityTier::AllTokensPrefix < PriorityTier::Substring);
        assert!(PriorityTier::Substring < PriorityTier::Excluded);
    }

    #[test]
    fn test_name_cmp_ignores_case() {
        assert_eq!(name_cmp("alice", "Alice"), Ordering::Equal);
        assert_eq!(name_cmp("Bob", "alice"), Ordering::Greater);
    }
}
