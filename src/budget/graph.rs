//! Priority shaping for call graphs and dependency analyses.

use super::profiles::{CALL_GRAPH, DEPENDENCIES};
use super::{fit_prefix, truncate_prefix, word_count, TokenBudgeted};
use crate::engine::{CallGraphEntry, CallGraphInfo, SearchResultEntry};
use crate::tools::results::DependencyAnalysisResult;

/// Estimated cost of one call-graph entry.
pub fn call_entry_cost(entry: &CallGraphEntry) -> usize {
    word_count(&entry.function) + CALL_GRAPH.entry_overhead + entry.chunk_tokens()
}

fn related_entry_cost(entry: &SearchResultEntry) -> usize {
    word_count(&entry.index_entry.name)
        + word_count(&entry.index_entry.signature)
        + DEPENDENCIES.secondary_overhead
        + entry.chunk_tokens()
}

fn total<T>(items: &[T], cost: impl Fn(&T) -> usize) -> usize {
    items.iter().map(cost).sum()
}

/// Fit a prefix of `items` into `limit`, truncating in place.
/// Returns `(changed, tokens used)`.
fn fit_in<T>(items: &mut Vec<T>, limit: usize, cost: impl Fn(&T) -> usize) -> (bool, usize) {
    let (keep, used) = fit_prefix(items, limit, cost);
    (truncate_prefix(items, keep), used)
}

impl TokenBudgeted for CallGraphInfo {
    fn base_cost(&self) -> usize {
        CALL_GRAPH.base
    }

    fn estimate_tokens(&self) -> usize {
        CALL_GRAPH.base + total(&self.callers, call_entry_cost) + total(&self.callees, call_entry_cost)
    }

    fn strip_to_metadata(&mut self) {
        self.callers.clear();
        self.callees.clear();
    }

    fn shrink_to(&mut self, available: usize) -> bool {
        let (callees_cut, used) =
            fit_in(&mut self.callees, CALL_GRAPH.first_share(available), call_entry_cost);
        let (callers_cut, _) = fit_in(
            &mut self.callers,
            CALL_GRAPH.second_share(available.saturating_sub(used)),
            call_entry_cost,
        );
        callees_cut || callers_cut
    }

    fn record_budget(&mut self, token_count: usize, truncated: bool) {
        self.token_count = token_count;
        self.truncated = truncated;
    }
}

impl TokenBudgeted for DependencyAnalysisResult {
    fn base_cost(&self) -> usize {
        DEPENDENCIES.base
    }

    fn estimate_tokens(&self) -> usize {
        DEPENDENCIES.base
            + total(&self.callers, call_entry_cost)
            + total(&self.callees, call_entry_cost)
            + total(&self.related_types, related_entry_cost)
    }

    fn strip_to_metadata(&mut self) {
        self.callers.clear();
        self.callees.clear();
        self.related_types.clear();
    }

    fn shrink_to(&mut self, available: usize) -> bool {
        let (callees_cut, callees_used) =
            fit_in(&mut self.callees, DEPENDENCIES.first_share(available), call_entry_cost);
        let remaining = available.saturating_sub(callees_used);

        let (callers_cut, callers_used) =
            fit_in(&mut self.callers, DEPENDENCIES.second_share(remaining), call_entry_cost);
        let remaining = remaining.saturating_sub(callers_used);

        let (types_cut, _) = fit_in(&mut self.related_types, remaining, related_entry_cost);
        callees_cut || callers_cut || types_cut
    }

    fn record_budget(&mut self, token_count: usize, truncated: bool) {
        self.token_count = token_count;
        self.truncated = truncated;
    }
}
