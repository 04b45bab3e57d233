//! Tag-set similarity used to derive similarity edges.
//!
//! Linking a new node scans every existing tagged node once; cost per new node
//! is linear in the number of tagged nodes.

#![allow(dead_code)]

use std::cmp::Ordering;
use std::collections::BTreeSet;

use super::config::SimilarityConfig;

/// Jaccard coefficient `|A ∩ B| / |A ∪ B|`. Returns 0 when both sets are empty.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f32 {
    let (smaller, larger) = if a.len() < b.len() { (a, b) } else { (b, a) };

    let intersection = smaller.iter().filter(|t| larger.contains(*t)).count();
    let union = a.len() + b.len() - intersection;

    if union == 0 {
        0.0
    } else {
        intersection as f32 / union as f32
    }
}

/// A proposed similarity edge for a new node.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatch {
    /// Id of the existing node
    pub id: String,
    /// Jaccard score
    pub score: f32,
}

/// Picks the top-K most similar existing nodes for a new node.
///
/// `candidates` must be yielded in creation order: ties keep that order, so
/// the first-seen node wins. The new node itself and untagged nodes are
/// skipped, as are scores at or below `config.min_score`.
pub fn top_k_similar<'a, I>(
    new_id: &str,
    new_tags: &BTreeSet<String>,
    candidates: I,
    config: &SimilarityConfig,
) -> Vec<SimilarityMatch>
where
    I: IntoIterator<Item = (&'a str, &'a BTreeSet<String>)>,
{
    if new_tags.is_empty() || config.neighbors == 0 {
        return Vec::new();
    }

    let mut scored: Vec<SimilarityMatch> = candidates
        .into_iter()
        .filter(|(id, tags)| *id != new_id && !tags.is_empty())
        .map(|(id, tags)| SimilarityMatch {
            id: id.to_string(),
            score: jaccard(new_tags, tags),
        })
        .filter(|m| m.score > config.min_score)
        .collect();

    // sort_by is stable, which keeps encounter order among equal scores
    scored.sort_by(|x, y| y.score.partial_cmp(&x.score).unwrap_or(Ordering::Equal));
    scored.truncate(config.neighbors);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_jaccard_identical() {
        let a = tags(&["x", "y"]);
        assert!((jaccard(&a, &a) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_jaccard_partial_overlap() {
        let a = tags(&["x", "y"]);
        let b = tags(&["y", "z"]);
        assert!((jaccard(&a, &b) - 1.0 / 3.0).abs() < 0.001);
    }

    #[test]
    fn test_jaccard_disjoint_and_empty() {
        assert!(jaccard(&tags(&["x"]), &tags(&["y"])).abs() < 0.001);
        assert!(jaccard(&tags(&[]), &tags(&[])).abs() < 0.001);
        assert!(jaccard(&tags(&["x"]), &tags(&[])).abs() < 0.001);
    }

    #[test]
    fn test_top_k_limits_and_orders() {
        let new = tags(&["a", "b", "c", "d"]);
        let n1 = tags(&["a"]); // 0.25
        let n2 = tags(&["a", "b", "c"]); // 0.75
        let n3 = tags(&["a", "b"]); // 0.5
        let n4 = tags(&["z"]); // 0.0, dropped
        let n5 = tags(&["a", "b", "c", "d"]); // 1.0

        let candidates = vec![
            ("n1", &n1),
            ("n2", &n2),
            ("n3", &n3),
            ("n4", &n4),
            ("n5", &n5),
        ];

        let result = top_k_similar("new", &new, candidates, &SimilarityConfig::default());
        let ids: Vec<&str> = result.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["n5", "n2", "n3"]);
    }

    #[test]
    fn test_top_k_ties_keep_encounter_order() {
        let new = tags(&["a", "b"]);
        let first = tags(&["a"]);
        let second = tags(&["b"]);
        let third = tags(&["a"]);
        let fourth = tags(&["b"]);

        let candidates = vec![
            ("first", &first),
            ("second", &second),
            ("third", &third),
            ("fourth", &fourth),
        ];

        let result = top_k_similar("new", &new, candidates, &SimilarityConfig::default());
        let ids: Vec<&str> = result.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_top_k_skips_self_and_untagged() {
        let new = tags(&["a"]);
        let empty = tags(&[]);
        let candidates = vec![("new", &new), ("blank", &empty)];

        let result = top_k_similar("new", &new, candidates, &SimilarityConfig::default());
        assert!(result.is_empty());
    }

    #[test]
    fn test_top_k_untagged_new_node() {
        let new = tags(&[]);
        let other = tags(&["a"]);
        let result = top_k_similar("new", &new, vec![("o", &other)], &SimilarityConfig::default());
        assert!(result.is_empty());
    }
}
