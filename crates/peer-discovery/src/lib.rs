//! Peer discovery and similarity ranking
//!
//! [`PeerResolver`] collects candidate peers for a subject company through a
//! tiered list of strategies, and [`PeerRanker`] scores and orders them.

pub mod keywords;
pub mod resolver;
pub mod scorer;

pub use keywords::KeywordCache;
pub use resolver::{PeerResolution, PeerResolver, ResolverConfig, ResolverStrategy};
pub use scorer::{PeerRanker, ScoringConfig, SimilarityScorer};

/// Case-insensitive equality of two present, non-empty labels
pub(crate) fn same_label(a: &Option<String>, b: &Option<String>) -> bool {
    match (a.as_deref().map(str::trim), b.as_deref().map(str::trim)) {
        (Some(a), Some(b)) if !a.is_empty() && !b.is_empty() => a.eq_ignore_ascii_case(b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_label() {
        let software = Some("Software".to_string());
        assert!(same_label(&software, &Some(" software ".to_string())));
        assert!(!same_label(&software, &None));
        assert!(!same_label(&Some(String::new()), &Some(String::new())));
    }
}
