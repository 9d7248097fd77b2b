//! Token-budget optimizer.
//!
//! Every tool result carries a fixed metadata cost plus named collections and
//! free-text fields. When the estimate exceeds the caller's ceiling the
//! result is shaped in place:
//!
//! ```text
//!   estimate <= max   → record estimate, untouched
//!   max <= base       → strip to metadata, estimate = base
//!   otherwise         → available = max - base
//!                       split across collections by the profile table,
//!                       drop a suffix from each collection that overruns
//! ```
//!
//! Shaping never reorders and never pads; it only removes trailing entries
//! or cuts text. The per-kind constants live in [`profiles`].

mod context;
mod graph;
pub mod profiles;
mod search;

pub use graph::call_entry_cost;
pub use search::{search_entries_cost, search_entry_cost};

/// Characters per estimated token.
pub const CHARS_PER_TOKEN: usize = 4;

/// Appended to free text that was cut.
pub const TRUNCATION_MARKER: &str = "...";

/// A result the optimizer can shape.
pub trait TokenBudgeted {
    /// Cost of the metadata-only form.
    fn base_cost(&self) -> usize;

    /// Current estimated cost, always >= `base_cost()`.
    fn estimate_tokens(&self) -> usize;

    /// Drop every optional collection and body.
    fn strip_to_metadata(&mut self);

    /// Fit the optional content into `available` tokens (beyond the base).
    /// Returns whether anything was removed.
    fn shrink_to(&mut self, available: usize) -> bool;

    /// Store the final estimate and whether shaping cut anything.
    fn record_budget(&mut self, token_count: usize, truncated: bool);
}

/// Shape `result` to fit `max_tokens`. Returns whether anything was cut.
pub fn optimize<R: TokenBudgeted + ?Sized>(result: &mut R, max_tokens: usize) -> bool {
    let estimate = result.estimate_tokens();
    if estimate <= max_tokens {
        result.record_budget(estimate, false);
        return false;
    }

    let base = result.base_cost();
    if max_tokens <= base {
        result.strip_to_metadata();
        result.record_budget(base, true);
        return true;
    }

    let changed = result.shrink_to(max_tokens - base);
    let shaped = result.estimate_tokens();
    tracing::trace!(
        "budget_shaped: estimate={}, max_tokens={}, shaped={}",
        estimate,
        max_tokens,
        shaped
    );
    result.record_budget(shaped, changed);
    changed
}

/// Whitespace-separated word count, the unit for names and signatures.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Estimated tokens of free text.
pub fn text_tokens(text: &str) -> usize {
    text.len() / CHARS_PER_TOKEN
}

/// Keep the first `keep` items. Returns whether anything was dropped.
pub fn truncate_prefix<T>(items: &mut Vec<T>, keep: usize) -> bool {
    if items.len() > keep {
        items.truncate(keep);
        true
    } else {
        false
    }
}

/// Longest prefix whose cumulative cost fits `limit`.
/// Returns `(count, tokens used)`.
pub fn fit_prefix<T>(items: &[T], limit: usize, cost: impl Fn(&T) -> usize) -> (usize, usize) {
    let mut used = 0usize;
    for (i, item) in items.iter().enumerate() {
        let c = cost(item);
        if used + c > limit {
            return (i, used);
        }
        used += c;
    }
    (items.len(), used)
}

/// Cut `text` so its estimate fits `max_tokens`, ending with the marker.
/// The cut lands on a char boundary. Returns whether the text changed.
pub fn truncate_text(text: &mut String, max_tokens: usize) -> bool {
    let max_bytes = max_tokens * CHARS_PER_TOKEN;
    if text.len() <= max_bytes {
        return false;
    }
    if max_bytes < TRUNCATION_MARKER.len() {
        text.clear();
        return true;
    }
    let mut cut = max_bytes - TRUNCATION_MARKER.len();
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
    text.push_str(TRUNCATION_MARKER);
    true
}
