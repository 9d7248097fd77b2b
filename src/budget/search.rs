//! Priority shaping for search results.

use super::profiles::SEARCH;
use super::{fit_prefix, truncate_prefix, word_count, TokenBudgeted};
use crate::engine::{SearchResult, SearchResultEntry};

/// Estimated cost of one search entry.
pub fn search_entry_cost(entry: &SearchResultEntry) -> usize {
    word_count(&entry.index_entry.name)
        + word_count(&entry.index_entry.signature)
        + SEARCH.entry_overhead
        + entry.chunk_tokens()
}

pub fn search_entries_cost(entries: &[SearchResultEntry]) -> usize {
    entries.iter().map(search_entry_cost).sum()
}

impl TokenBudgeted for SearchResult {
    fn base_cost(&self) -> usize {
        SEARCH.base
    }

    fn estimate_tokens(&self) -> usize {
        let edges = self
            .call_graph
            .as_ref()
            .map_or(0, |g| g.callers.len() + g.callees.len());
        SEARCH.base + search_entries_cost(&self.entries) + edges * SEARCH.secondary_overhead
    }

    fn strip_to_metadata(&mut self) {
        self.entries.clear();
        self.call_graph = None;
    }

    fn shrink_to(&mut self, available: usize) -> bool {
        let (keep, used) = fit_prefix(&self.entries, available, search_entry_cost);
        let mut changed = truncate_prefix(&mut self.entries, keep);

        if let Some(graph) = self.call_graph.as_mut() {
            let per_side = SEARCH.second_share(available.saturating_sub(used));
            let max_edges = per_side / SEARCH.secondary_overhead;
            changed |= truncate_prefix(&mut graph.callers, max_edges);
            changed |= truncate_prefix(&mut graph.callees, max_edges);
        }
        changed
    }

    /// Keeps a truncation flag already set by the engine or by pagination.
    fn record_budget(&mut self, token_count: usize, truncated: bool) {
        self.token_count = token_count;
        self.truncated |= truncated;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::optimize;
    use crate::engine::{CallGraphEntry, CallGraphInfo, EntityKind, IndexEntry, QueryOptions};

    fn entry(name: &str) -> SearchResultEntry {
        SearchResultEntry {
            index_entry: IndexEntry {
                name: name.to_string(),
                entity_type: EntityKind::Function,
                file: "a.go".to_string(),
                start_line: 1,
                end_line: 5,
                chunk_id: String::new(),
                // 3 words
                signature: format!("func {}() error", name),
            },
            chunk_data: None,
        }
    }

    fn edge(i: usize) -> CallGraphEntry {
        CallGraphEntry {
            function: format!("f{i}"),
            file: "a.go".into(),
            line: 1,
            chunk_data: None,
        }
    }

    #[test]
    fn test_entry_cost() {
        assert_eq!(search_entry_cost(&entry("Run")), 1 + 3 + 10);
    }

    #[test]
    fn test_entries_then_edges() {
        let mut result = SearchResult::new("q", "name", &QueryOptions::default());
        result.entries = (0..10).map(|i| entry(&format!("f{i}"))).collect();
        result.call_graph = Some(CallGraphInfo {
            callers: (0..10).map(edge).collect(),
            callees: (0..10).map(edge).collect(),
            ..CallGraphInfo::empty("f0", 1)
        });

        // available 150: 10 entries at 14 = 140, 10 left → 5 per side → 0 edges
        optimize(&mut result, 200);
        assert_eq!(result.entries.len(), 10);
        let graph = result.call_graph.as_ref().unwrap();
        assert!(graph.callers.is_empty());
        assert!(graph.callees.is_empty());
        assert_eq!(result.token_count, 190);
        assert!(result.truncated);
    }

    #[test]
    fn test_engine_truncation_flag_survives() {
        let mut result = SearchResult::new("q", "type", &QueryOptions::default());
        result.entries = vec![entry("a")];
        result.truncated = true;
        assert!(!optimize(&mut result, 1000));
        assert!(result.truncated);
        assert_eq!(result.token_count, 64);
    }
}
