//! Seed-relative distances over the adjacency index.
//!
//! Every refresh is a full unweighted BFS over walk and similarity edges.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use super::store::Adjacency;

/// Result of a breadth-first search from one source.
#[derive(Debug, Clone)]
pub struct BfsResult {
    /// Source node id.
    pub source: String,
    /// Hop count from the source for each reached node.
    pub distances: HashMap<String, u32>,
    /// BFS-tree parent of each reached node except the source.
    pub predecessors: HashMap<String, String>,
    /// Largest hop count reached (0 when only the source is reachable).
    pub max_distance: u32,
    /// Time taken in microseconds.
    pub time_us: u64,
}

impl BfsResult {
    /// Hop count to `target`, if reached.
    pub fn distance_to(&self, target: &str) -> Option<u32> {
        self.distances.get(target).copied()
    }

    /// Path from `target` back to the source, inclusive on both ends.
    pub fn path_to_source(&self, target: &str) -> Option<Vec<String>> {
        if !self.distances.contains_key(target) {
            return None;
        }

        let mut path = vec![target.to_string()];
        let mut current = target;

        while current != self.source {
            let pred = self.predecessors.get(current)?;
            path.push(pred.clone());
            current = pred.as_str();
        }

        Some(path)
    }

    /// Path from the source to `target`, inclusive on both ends.
    pub fn path_from_source(&self, target: &str) -> Option<Vec<String>> {
        self.path_to_source(target).map(|mut p| {
            p.reverse();
            p
        })
    }
}

/// Unweighted shortest-path computations over an [`Adjacency`] index.
pub struct DistanceOracle;

impl DistanceOracle {
    /// Full BFS from `source`. An unknown source yields a result containing
    /// only the source itself at distance 0.
    pub fn compute(adjacency: &Adjacency, source: &str) -> BfsResult {
        let start = Instant::now();

        let mut distances: HashMap<String, u32> = HashMap::new();
        let mut predecessors: HashMap<String, String> = HashMap::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        let mut max_distance = 0;

        distances.insert(source.to_string(), 0);
        queue.push_back(source);

        while let Some(current) = queue.pop_front() {
            let current_distance = distances[current];

            let Some(neighbors) = adjacency.get(current) else {
                continue;
            };

            for neighbor in neighbors {
                if distances.contains_key(neighbor.as_str()) {
                    continue;
                }
                let d = current_distance + 1;
                max_distance = max_distance.max(d);
                distances.insert(neighbor.clone(), d);
                predecessors.insert(neighbor.clone(), current.to_string());
                queue.push_back(neighbor.as_str());
            }
        }

        BfsResult {
            source: source.to_string(),
            distances,
            predecessors,
            max_distance,
            time_us: start.elapsed().as_micros() as u64,
        }
    }

    /// Shortest path from `from` to `to`, or `None` when they are not connected.
    ///
    /// `path_between(x, x)` is `[x]` even when `x` has no neighbors.
    pub fn path_between(adjacency: &Adjacency, from: &str, to: &str) -> Option<Vec<String>> {
        if from == to {
            return Some(vec![from.to_string()]);
        }

        // Searching from `to` lets the predecessor chain walk straight back to it
        Self::compute(adjacency, to).path_to_source(from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_adjacency(edges: &[(&str, &str)], isolated: &[&str]) -> Adjacency {
        let mut adjacency: Adjacency = HashMap::new();
        for id in isolated {
            adjacency.entry(id.to_string()).or_default();
        }
        for (a, b) in edges {
            adjacency.entry(a.to_string()).or_default().insert(b.to_string());
            adjacency.entry(b.to_string()).or_default().insert(a.to_string());
        }
        adjacency
    }

    #[test]
    fn test_bfs_distances() {
        let adjacency = build_adjacency(&[("A", "B"), ("B", "C"), ("A", "D"), ("D", "C")], &[]);

        let result = DistanceOracle::compute(&adjacency, "A");

        assert_eq!(result.distance_to("A"), Some(0));
        assert_eq!(result.distance_to("B"), Some(1));
        assert_eq!(result.distance_to("D"), Some(1));
        assert_eq!(result.distance_to("C"), Some(2));
        assert_eq!(result.max_distance, 2);
    }

    #[test]
    fn test_bfs_unreached_component() {
        let adjacency = build_adjacency(&[("A", "B"), ("X", "Y")], &["Z"]);

        let result = DistanceOracle::compute(&adjacency, "A");

        assert_eq!(result.distance_to("X"), None);
        assert_eq!(result.distance_to("Z"), None);
        assert_eq!(result.distances.len(), 2);
    }

    #[test]
    fn test_bfs_unknown_source() {
        let adjacency = build_adjacency(&[("A", "B")], &[]);
        let result = DistanceOracle::compute(&adjacency, "missing");

        assert_eq!(result.distance_to("missing"), Some(0));
        assert_eq!(result.max_distance, 0);
    }

    #[test]
    fn test_path_reconstruction() {
        let adjacency = build_adjacency(&[("A", "B"), ("B", "C"), ("C", "D")], &[]);
        let result = DistanceOracle::compute(&adjacency, "A");

        assert_eq!(
            result.path_from_source("D"),
            Some(vec!["A".to_string(), "B".to_string(), "C".to_string(), "D".to_string()])
        );
        assert_eq!(
            result.path_to_source("C"),
            Some(vec!["C".to_string(), "B".to_string(), "A".to_string()])
        );
    }

    #[test]
    fn test_path_between() {
        let adjacency = build_adjacency(&[("S", "A"), ("A", "B"), ("S", "C"), ("C", "B")], &["I"]);

        let path = DistanceOracle::path_between(&adjacency, "B", "S").unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path.first().map(String::as_str), Some("B"));
        assert_eq!(path.last().map(String::as_str), Some("S"));

        assert_eq!(DistanceOracle::path_between(&adjacency, "I", "S"), None);
        assert_eq!(
            DistanceOracle::path_between(&adjacency, "I", "I"),
            Some(vec!["I".to_string()])
        );
    }

    #[test]
    fn test_path_is_deterministic() {
        // Two equal-length routes; BTreeSet ordering makes the choice stable
        let adjacency = build_adjacency(&[("S", "A"), ("S", "C"), ("A", "B"), ("C", "B")], &[]);
        let first = DistanceOracle::path_between(&adjacency, "B", "S");
        let second = DistanceOracle::path_between(&adjacency, "B", "S");
        assert_eq!(first, second);
    }
}
