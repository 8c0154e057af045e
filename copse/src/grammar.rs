use crate::error::GrammarError;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::{fmt, hash};

/// Decides which words a terminal accepts.
pub type Matcher = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Index of a rule within its `Grammar`.
pub type RuleId = usize;

pub enum Symbol {
    NonTerm(String),
    // A terminal has a predicate to validate that input is accepted
    Term(String, Matcher),
}

impl Symbol {
    pub fn name(&self) -> &str {
        match self {
            Symbol::NonTerm(name) => name,
            Symbol::Term(name, _) => name,
        }
    }

    pub fn matches(&self, input: &str) -> bool {
        match self {
            Symbol::Term(_, matcher) => matcher(input),
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Symbol::Term(_, _))
    }
}

// Symbols are unique by name within a grammar, the matcher is ignored
impl hash::Hash for Symbol {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.is_terminal().hash(state);
        self.name().hash(state);
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Symbol) -> bool {
        match (self, other) {
            (Symbol::Term(s, _), Symbol::Term(o, _)) => s == o,
            (Symbol::NonTerm(s), Symbol::NonTerm(o)) => s == o,
            _ => false,
        }
    }
}

impl Eq for Symbol {}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Symbol::Term(name, _) => write!(f, "Term({})", name),
            Symbol::NonTerm(name) => write!(f, "NonTerm({})", name),
        }
    }
}

/// A production `head -> spec...`. An empty spec derives the empty string.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Rule {
    pub head: String,
    pub spec: Vec<Arc<Symbol>>,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} -> {}",
            self.head,
            self.spec
                .iter()
                .map(|s| s.name())
                .collect::<Vec<_>>()
                .join(" ")
        )
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// Read-only grammar table. Alternatives keep their declaration order.
#[derive(Clone)]
pub struct Grammar {
    start: String,
    rules: Vec<Rule>,
    symbols: HashMap<String, Arc<Symbol>>,
    by_head: HashMap<String, Vec<RuleId>>,
}

impl Grammar {
    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id]
    }

    pub fn symbol(&self, name: &str) -> Option<&Arc<Symbol>> {
        self.symbols.get(name)
    }

    /// Rule ids for `symbol` in declaration order. Terminals and unknown
    /// symbols have none.
    pub fn productions_for(&self, symbol: &str) -> &[RuleId] {
        self.by_head.get(symbol).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn alternatives<'g>(&'g self, symbol: &str) -> impl Iterator<Item = &'g Rule> + 'g {
        self.productions_for(symbol).iter().map(move |&id| &self.rules[id])
    }

    pub fn is_terminal(&self, symbol: &str) -> bool {
        self.symbols.get(symbol).is_some_and(|s| s.is_terminal())
    }
}

impl fmt::Debug for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Start: {}", self.start)?;
        let mut seen = HashSet::new();
        for rule in &self.rules {
            if !seen.insert(rule.head.as_str()) {
                continue;
            }
            writeln!(f)?;
            for alt in self.alternatives(&rule.head) {
                writeln!(f, "{}", alt)?;
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct GrammarBuilder {
    symbols: HashMap<String, Arc<Symbol>>,
    rules: Vec<Rule>,
    error: Option<GrammarError>,
}

/// Builds a Grammar while validating existence of Symbols and checking rules.
/// The first problem found is reported by `into_grammar`.
impl GrammarBuilder {
    fn fail(&mut self, error: GrammarError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn add_symbol(&mut self, symbol: Symbol, ignore_dups: bool) {
        // Check for duplicate symbols to avoid overwriting by mistake
        if !self.symbols.contains_key(symbol.name()) {
            self.symbols
                .insert(symbol.name().to_string(), Arc::new(symbol));
        } else if !ignore_dups {
            self.fail(GrammarError::DuplicateSymbol(symbol.name().to_string()));
        }
    }

    pub fn nonterm(mut self, name: &str) -> Self {
        self.add_symbol(Symbol::NonTerm(name.into()), false);
        self
    }

    pub fn terminal(
        mut self,
        name: &str,
        pred: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.add_symbol(Symbol::Term(name.into(), Box::new(pred)), false);
        self
    }

    /// A terminal licensing exactly the listed words.
    pub fn lexeme<W: Into<String>>(
        mut self,
        name: &str,
        words: impl IntoIterator<Item = W>,
    ) -> Self {
        self.lexeme_try(name, words);
        self
    }

    pub fn nonterm_try(&mut self, name: &str) {
        self.add_symbol(Symbol::NonTerm(name.into()), true);
    }

    pub fn terminal_try(
        &mut self,
        name: &str,
        pred: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) {
        self.add_symbol(Symbol::Term(name.into(), Box::new(pred)), true);
    }

    pub fn lexeme_try<W: Into<String>>(&mut self, name: &str, words: impl IntoIterator<Item = W>) {
        let words: HashSet<String> = words.into_iter().map(Into::into).collect();
        self.terminal_try(name, move |w| words.contains(w));
    }

    pub fn is_terminal(&self, name: &str) -> bool {
        self.symbols.get(name).is_some_and(|s| s.is_terminal())
    }

    // Register new rules for the grammar
    fn add_rule(&mut self, head: &str, spec: &[&str], ignore_dups: bool) {
        // First check that all symbols have been registered (need references)
        if let Some(s) = spec.iter().find(|&n| !self.symbols.contains_key(*n)) {
            self.fail(GrammarError::MissingSymbol(s.to_string()));
            return;
        }
        match self.symbols.get(head) {
            Some(s) if s.is_terminal() => {
                self.fail(GrammarError::TerminalHead(head.to_string()));
                return;
            }
            Some(_) => (),
            None => {
                self.fail(GrammarError::MissingSymbol(head.to_string()));
                return;
            }
        }
        let rule = Rule {
            head: head.to_string(),
            spec: spec.iter().map(|&s| self.symbols[s].clone()).collect(),
        };
        // Check this rule is only added once
        if !self.rules.contains(&rule) {
            self.rules.push(rule);
        } else if !ignore_dups {
            self.fail(GrammarError::DuplicateRule(rule.to_string()));
        }
    }

    pub fn rule(mut self, head: &str, spec: &[&str]) -> Self {
        self.add_rule(head, spec, false);
        self
    }

    pub fn rule_try(&mut self, head: &str, spec: &[&str]) {
        self.add_rule(head, spec, true);
    }

    pub fn into_grammar(mut self, start: &str) -> Result<Grammar, GrammarError> {
        if !self.symbols.contains_key(start) {
            self.fail(GrammarError::MissingSymbol(start.to_string()));
        }
        if let Some(error) = self.error {
            return Err(error);
        }
        let mut by_head: HashMap<String, Vec<RuleId>> = HashMap::new();
        for (id, rule) in self.rules.iter().enumerate() {
            by_head.entry(rule.head.clone()).or_default().push(id);
        }
        Ok(Grammar {
            start: start.to_string(),
            rules: self.rules,
            symbols: self.symbols,
            by_head,
        })
    }
}

///////////////////////////////////////////////////////////////////////////////
