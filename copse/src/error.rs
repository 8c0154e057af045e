use std::time::Duration;

/// Problems found while building or loading a grammar.
#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    #[error("Grammar format error at line {line}: {reason}")]
    Format { line: usize, reason: &'static str },

    #[error("Duplicate Symbol: {0}")]
    DuplicateSymbol(String),

    #[error("Duplicate Rule: {0}")]
    DuplicateRule(String),

    #[error("Missing Symbol: {0}")]
    MissingSymbol(String),

    #[error("Rule head must be NonTerm: {0}")]
    TerminalHead(String),

    #[error("Failed to read grammar: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons a parse or forest walk gave up. Ungrammatical input is not an
/// error, it produces an empty forest.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Parse budget exceeded: more than {0} states")]
    StateBudget(usize),

    #[error("Parse budget exceeded: took longer than {0:?}")]
    TimeBudget(Duration),

    #[error("Parse budget exceeded: more than {0} trees")]
    TreeBudget(usize),

    #[error("Missing Action: {0}")]
    MissingAction(String),
}

impl ParseError {
    /// The parser stopped on a configured limit rather than on the input.
    pub fn is_budget_exceeded(&self) -> bool {
        matches!(
            self,
            ParseError::StateBudget(_) | ParseError::TimeBudget(_) | ParseError::TreeBudget(_)
        )
    }
}
