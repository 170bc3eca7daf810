use std::ops::RangeInclusive;

/// Tunable limits for perception and canonicalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum rounds of invariant refinement per refinement call.
    pub refinement_rounds: usize,
    /// Ring sizes considered as aromatic candidates.
    pub aromatic_ring_sizes: RangeInclusive<usize>,
    /// Maximum DFS edge expansions while enumerating cycles.
    pub cycle_search_budget: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            refinement_rounds: 8,
            aromatic_ring_sizes: 5..=7,
            cycle_search_budget: 200_000,
        }
    }
}

impl Config {
    pub fn with_refinement_rounds(mut self, rounds: usize) -> Self {
        self.refinement_rounds = rounds;
        self
    }

    pub fn with_aromatic_ring_sizes(mut self, sizes: RangeInclusive<usize>) -> Self {
        self.aromatic_ring_sizes = sizes;
        self
    }

    pub fn with_cycle_search_budget(mut self, budget: usize) -> Self {
        self.cycle_search_budget = budget;
        self
    }
}
