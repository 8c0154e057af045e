use std::time::Duration;

/// Limits that keep degenerate grammars or inputs from running away.
#[derive(Debug, Clone)]
pub struct EarleyConfig {
    /// Maximum number of states in the chart of a single parse
    pub max_states: Option<usize>,

    /// Wall-clock limit for building the chart
    pub max_duration: Option<Duration>,

    /// Maximum number of alternatives materialized for any forest node
    pub max_trees: Option<usize>,
}

impl Default for EarleyConfig {
    fn default() -> Self {
        Self {
            max_states: Some(1_000_000),
            max_duration: None,
            max_trees: Some(10_000),
        }
    }
}

impl EarleyConfig {
    /// No limits at all. Only use with trusted grammars.
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            max_states: None,
            max_duration: None,
            max_trees: None,
        }
    }

    #[must_use]
    pub fn with_max_states(mut self, limit: Option<usize>) -> Self {
        self.max_states = limit;
        self
    }

    #[must_use]
    pub fn with_max_duration(mut self, limit: Option<Duration>) -> Self {
        self.max_duration = limit;
        self
    }

    #[must_use]
    pub fn with_max_trees(mut self, limit: Option<usize>) -> Self {
        self.max_trees = limit;
        self
    }
}
