//! Ratio shaping for function and type context results.

use super::profiles::{FUNCTION_CONTEXT, TYPE_CONTEXT};
use super::{text_tokens, truncate_prefix, truncate_text, TokenBudgeted};
use crate::tools::results::{FunctionContextResult, FunctionImplementation, TypeContextResult};

fn implementation_cost(imp: &FunctionImplementation) -> usize {
    FUNCTION_CONTEXT.implementation.item_cost
        + text_tokens(&imp.body)
        + imp.context_lines.len() * FUNCTION_CONTEXT.context_line_cost
}

/// Fit an implementation block into `share` tokens. Returns `None` when the
/// block must be dropped whole, otherwise whether it was cut.
fn shrink_implementation(imp: &mut FunctionImplementation, share: usize) -> Option<bool> {
    let p = FUNCTION_CONTEXT;
    if implementation_cost(imp) <= share {
        return Some(false);
    }
    if share <= p.implementation.item_cost {
        return None;
    }

    let inner = share - p.implementation.item_cost;
    let body_limit = (inner as f64 * p.body_ratio).floor() as usize;
    if text_tokens(&imp.body) > body_limit {
        truncate_text(&mut imp.body, body_limit);
    }
    let remaining = inner.saturating_sub(text_tokens(&imp.body));
    truncate_prefix(&mut imp.context_lines, remaining / p.context_line_cost);
    Some(true)
}

impl TokenBudgeted for FunctionContextResult {
    fn base_cost(&self) -> usize {
        FUNCTION_CONTEXT.base
    }

    fn estimate_tokens(&self) -> usize {
        let p = FUNCTION_CONTEXT;
        p.base
            + self.implementation.as_ref().map_or(0, implementation_cost)
            + p.callers.cost_of(self.callers.len())
            + p.callees.cost_of(self.callees.len())
            + p.related_types.cost_of(self.related_types.len())
    }

    fn strip_to_metadata(&mut self) {
        self.implementation = None;
        self.callers.clear();
        self.callees.clear();
        self.related_types.clear();
    }

    fn shrink_to(&mut self, available: usize) -> bool {
        let p = FUNCTION_CONTEXT;
        let mut changed = false;

        if let Some(imp) = self.implementation.as_mut() {
            match shrink_implementation(imp, p.implementation.share(available)) {
                Some(cut) => changed |= cut,
                None => {
                    self.implementation = None;
                    changed = true;
                }
            }
        }

        changed |= truncate_prefix(&mut self.callers, p.callers.max_items(available));
        changed |= truncate_prefix(&mut self.callees, p.callees.max_items(available));
        changed |= truncate_prefix(&mut self.related_types, p.related_types.max_items(available));
        changed
    }

    fn record_budget(&mut self, token_count: usize, truncated: bool) {
        self.token_count = token_count;
        self.truncated = truncated;
    }
}

impl TokenBudgeted for TypeContextResult {
    fn base_cost(&self) -> usize {
        TYPE_CONTEXT.base
    }

    fn estimate_tokens(&self) -> usize {
        let p = TYPE_CONTEXT;
        p.base
            + p.fields.cost_of(self.fields.len())
            + p.methods.cost_of(self.methods.len())
            + p.usage_examples.cost_of(self.usage_examples.len())
            + p.related_types.cost_of(self.related_types.len())
    }

    fn strip_to_metadata(&mut self) {
        self.fields.clear();
        self.methods.clear();
        self.usage_examples.clear();
        self.related_types.clear();
    }

    fn shrink_to(&mut self, available: usize) -> bool {
        let p = TYPE_CONTEXT;
        let mut changed = truncate_prefix(&mut self.fields, p.fields.max_items(available));
        changed |= truncate_prefix(&mut self.methods, p.methods.max_items(available));
        changed |= truncate_prefix(
            &mut self.usage_examples,
            p.usage_examples.max_items(available),
        );
        changed |= truncate_prefix(&mut self.related_types, p.related_types.max_items(available));
        changed
    }

    fn record_budget(&mut self, token_count: usize, truncated: bool) {
        self.token_count = token_count;
        self.truncated = truncated;
    }
}
