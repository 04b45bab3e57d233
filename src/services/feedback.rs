//! User-facing feedback messages and the recent-visit log.

#![allow(dead_code)]

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::WalkNode;

/// Severity of a feedback message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Warning,
    Error,
}

/// One message on the feedback channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: Uuid,
    pub message: String,
    pub severity: Severity,
    pub at: DateTime<Utc>,
}

impl Feedback {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            id: Uuid::new_v4(),
            message: message.into(),
            severity,
            at: Utc::now(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Success)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Warning)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Error)
    }
}

/// A visited page as shown in the recent-visit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitEntry {
    pub id: String,
    pub title: String,
    pub url: String,
    pub summary: String,
    /// Visit count at the time of this visit
    pub visits: u64,
    /// Step number, 0 for the seed
    pub step: u64,
}

impl VisitEntry {
    pub fn from_node(node: &WalkNode, step: u64) -> Self {
        Self {
            id: node.id.clone(),
            title: node.title.clone(),
            url: node.url.clone(),
            summary: node.summary.clone(),
            visits: node.visit_count,
            step,
        }
    }
}

/// Bounded log of visits, newest first.
#[derive(Debug, Clone)]
pub struct VisitLog {
    entries: VecDeque<VisitEntry>,
    capacity: usize,
}

impl VisitLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Adds an entry at the front, dropping the oldest past capacity.
    pub fn record(&mut self, entry: VisitEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    pub fn entries(&self) -> Vec<VisitEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&VisitEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::prettify;

    fn entry(id: &str, step: u64) -> VisitEntry {
        VisitEntry {
            id: id.to_string(),
            title: prettify(id),
            url: format!("https://example.invalid/{}", id),
            summary: String::new(),
            visits: 1,
            step,
        }
    }

    #[test]
    fn test_visit_log_newest_first() {
        let mut log = VisitLog::new(10);
        log.record(entry("A", 0));
        log.record(entry("B", 1));

        let ids: Vec<String> = log.entries().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["B", "A"]);
        assert_eq!(log.latest().map(|e| e.step), Some(1));
    }

    #[test]
    fn test_visit_log_capacity() {
        let mut log = VisitLog::new(3);
        for i in 0..5 {
            log.record(entry(&format!("P{}", i), i));
        }

        assert_eq!(log.len(), 3);
        let steps: Vec<u64> = log.entries().into_iter().map(|e| e.step).collect();
        assert_eq!(steps, vec![4, 3, 2]);
    }

    #[test]
    fn test_entry_from_node() {
        let node = WalkNode::new(
            "Grace_Hopper".to_string(),
            Default::default(),
            None,
            "https://example.invalid/Grace_Hopper".to_string(),
            0,
        );
        let entry = VisitEntry::from_node(&node, 3);
        assert_eq!(entry.title, "Grace Hopper");
        assert_eq!(entry.step, 3);
        assert_eq!(entry.summary, crate::models::PLACEHOLDER_SUMMARY);
    }

    #[test]
    fn test_feedback_constructors() {
        assert_eq!(Feedback::success("ok").severity, Severity::Success);
        assert_eq!(Feedback::warning("hm").severity, Severity::Warning);
        let err = Feedback::error("bad");
        assert_eq!(err.severity, Severity::Error);
        assert_eq!(err.message, "bad");

        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["severity"], "error");
    }
}
