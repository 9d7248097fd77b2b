//! Per-result budget tables.
//!
//! The constants are fixed estimates, not measurements: shaping is meant to
//! be predictable, so the tables stay data and the algorithms in the sibling
//! modules read them.

/// One collection's slice of the available budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Allocation {
    /// Fraction of the available tokens.
    pub ratio: f64,
    /// Estimated tokens per retained item.
    pub item_cost: usize,
}

impl Allocation {
    pub const fn new(ratio: f64, item_cost: usize) -> Self {
        Self { ratio, item_cost }
    }

    /// Tokens granted out of `available`.
    pub fn share(&self, available: usize) -> usize {
        (available as f64 * self.ratio).floor().max(0.0) as usize
    }

    /// Items that fit in the share; zero when one item costs more.
    pub fn max_items(&self, available: usize) -> usize {
        if self.item_cost == 0 {
            return usize::MAX;
        }
        self.share(available) / self.item_cost
    }

    pub fn cost_of(&self, items: usize) -> usize {
        items * self.item_cost
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FunctionContextProfile {
    pub base: usize,
    /// Share of the implementation block; `item_cost` is its fixed overhead.
    pub implementation: Allocation,
    pub context_line_cost: usize,
    /// Fraction of the implementation share (after overhead) the body may use.
    pub body_ratio: f64,
    pub callers: Allocation,
    pub callees: Allocation,
    pub related_types: Allocation,
}

pub const FUNCTION_CONTEXT: FunctionContextProfile = FunctionContextProfile {
    base: 150,
    implementation: Allocation::new(0.4, 50),
    context_line_cost: 10,
    body_ratio: 0.5,
    callers: Allocation::new(0.25, 15),
    callees: Allocation::new(0.25, 15),
    related_types: Allocation::new(0.1, 12),
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypeContextProfile {
    pub base: usize,
    pub fields: Allocation,
    pub methods: Allocation,
    pub usage_examples: Allocation,
    pub related_types: Allocation,
}

pub const TYPE_CONTEXT: TypeContextProfile = TypeContextProfile {
    base: 120,
    fields: Allocation::new(0.3, 18),
    methods: Allocation::new(0.4, 20),
    usage_examples: Allocation::new(0.2, 25),
    related_types: Allocation::new(0.1, 12),
};

/// Priority shaping: the first collection is fitted within `first_ratio`
/// of the budget, the second within `second_ratio` of what is left, and
/// any third collection takes the remainder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorityProfile {
    pub base: usize,
    pub first_ratio: f64,
    pub second_ratio: f64,
    /// Fixed per-entry overhead added to word and chunk costs.
    pub entry_overhead: usize,
    /// Overhead for entries of the secondary kind (related types, edges).
    pub secondary_overhead: usize,
}

impl PriorityProfile {
    pub fn first_share(&self, available: usize) -> usize {
        (available as f64 * self.first_ratio).floor() as usize
    }

    pub fn second_share(&self, remaining: usize) -> usize {
        (remaining as f64 * self.second_ratio).floor() as usize
    }
}

/// Call graphs: callees first, callers take the rest.
pub const CALL_GRAPH: PriorityProfile = PriorityProfile {
    base: 100,
    first_ratio: 0.5,
    second_ratio: 1.0,
    entry_overhead: 20,
    secondary_overhead: 20,
};

/// Dependency analysis: callees, then callers, then related types.
pub const DEPENDENCIES: PriorityProfile = PriorityProfile {
    base: 100,
    first_ratio: 0.33,
    second_ratio: 0.5,
    entry_overhead: 20,
    secondary_overhead: 30,
};

/// Search results: entries first, the remainder split evenly between
/// call-graph callers and callees at a flat cost per edge.
pub const SEARCH: PriorityProfile = PriorityProfile {
    base: 50,
    first_ratio: 1.0,
    second_ratio: 0.5,
    entry_overhead: 10,
    secondary_overhead: 20,
};
