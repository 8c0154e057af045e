use crate::chart::{Chart, Production, Source, State, StateId};
use crate::config::EarleyConfig;
use crate::error::ParseError;
use crate::forest::EarleyForest;
use crate::grammar::{Grammar, Symbol};
use crate::tree::Tree;
use std::sync::Arc;
use std::time::Instant;

pub struct EarleyParser {
    pub grammar: Grammar,
    pub config: EarleyConfig,
}

/// The finished chart of a parse plus the states accepting the whole input.
/// No roots means the input is not in the language.
pub struct ParseTrees<'g> {
    grammar: &'g Grammar,
    chart: Chart,
    roots: Vec<StateId>,
}

impl<'g> ParseTrees<'g> {
    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    pub fn roots(&self) -> &[StateId] {
        &self.roots
    }

    pub fn accepted(&self) -> bool {
        !self.roots.is_empty()
    }
}

///////////////////////////////////////////////////////////////////////////////

impl EarleyParser {
    pub fn new(grammar: Grammar) -> EarleyParser {
        EarleyParser::with_config(grammar, EarleyConfig::default())
    }

    pub fn with_config(grammar: Grammar, config: EarleyConfig) -> EarleyParser {
        EarleyParser { grammar, config }
    }

    /// Exposes the next symbol in the progress of a state's production
    fn next_symbol(&self, state: &State) -> Option<&Arc<Symbol>> {
        if state.complete() {
            return None;
        }
        match &state.production {
            Production::Start => self.grammar.symbol(self.grammar.start()),
            Production::Rule(rule) => self.grammar.rule(*rule).spec.get(state.dot),
            Production::Lexeme(_) => None,
        }
    }

    /// Name matched by a state. The seed has none so it never completes others.
    fn lhs<'a>(&'a self, state: &'a State) -> Option<&'a str> {
        match &state.production {
            Production::Start => None,
            Production::Rule(rule) => Some(self.grammar.rule(*rule).head.as_str()),
            Production::Lexeme(symbol) => Some(symbol.name()),
        }
    }

    // check if a completed state matches the symbol another state is waiting on
    fn completes(&self, done: &State, waiting_on: &Symbol) -> bool {
        match &done.production {
            Production::Start => false,
            Production::Rule(rule) => matches!(
                waiting_on, Symbol::NonTerm(name) if *name == self.grammar.rule(*rule).head),
            Production::Lexeme(symbol) => **symbol == *waiting_on,
        }
    }

    /// Add a fresh state at `k` for every alternative of `name`.
    /// Unknown nonterminals predict nothing.
    fn predictor(&self, chart: &mut Chart, name: &str, k: usize) -> bool {
        let mut changed = false;
        for &rule in self.grammar.productions_for(name) {
            let len = self.grammar.rule(rule).spec.len();
            changed |= chart.push(State::predict(Production::Rule(rule), len, k)).changed();
        }
        changed
    }

    /// Match the token at `k` against a terminal, adding a lexeme state to
    /// the next column. Unlicensed tokens silently prune the branch.
    fn scanner(&self, chart: &mut Chart, symbol: &Arc<Symbol>, k: usize) {
        if symbol.matches(chart.token(k)) {
            chart.push(State::lexeme(symbol.clone(), k));
        }
    }

    /// Advance every state in the completed state's origin column that was
    /// waiting on its lhs. Equivalent results merge their back-pointers.
    fn completer(&self, chart: &mut Chart, done: StateId, k: usize) -> bool {
        let origin = chart.state(done).origin;
        let parents: Vec<StateId> = chart
            .column(origin)
            .iter()
            .copied()
            .filter(|&parent| {
                self.next_symbol(chart.state(parent))
                    .is_some_and(|symbol| self.completes(chart.state(done), symbol))
            })
            .collect();
        let mut changed = false;
        for parent in parents {
            let advanced = chart
                .state(parent)
                .advance(k, Source::Complete { prev: parent, child: done });
            changed |= chart.push(advanced).changed();
        }
        changed
    }

    fn check_budget(&self, chart: &Chart, started: Instant) -> Result<(), ParseError> {
        if let Some(limit) = self.config.max_states {
            if chart.len() > limit {
                log::debug!("giving up after {} states", chart.len());
                return Err(ParseError::StateBudget(limit));
            }
        }
        if let Some(limit) = self.config.max_duration {
            if started.elapsed() > limit {
                log::debug!("giving up after {:?}", started.elapsed());
                return Err(ParseError::TimeBudget(limit));
            }
        }
        Ok(())
    }

    pub fn parse<T>(&self, tokens: T) -> Result<ParseTrees<'_>, ParseError>
    where
        T: IntoIterator,
        T::Item: AsRef<str>,
    {
        let started = Instant::now();
        let tokens: Vec<String> = tokens.into_iter().map(|t| t.as_ref().to_string()).collect();
        let mut chart = Chart::new(tokens);

        // Seed S0 with START -> . S
        chart.push(State::predict(Production::Start, 1, 0));
        let last = chart.columns() - 1;

        for k in 0..=last {
            // Predict/Complete until no new states are added to the column.
            // States appended mid-pass are visited by the same pass. Another
            // pass is only needed when empty-span completions ran before some
            // state waiting on them showed up.
            loop {
                let mut changed = false;
                let mut empty_completions = false;
                let mut idx = 0;
                while idx < chart.column(k).len() {
                    let id = chart.column(k)[idx];
                    idx += 1;
                    let state = chart.state(id);
                    if state.complete() {
                        empty_completions |= state.origin == k;
                        changed |= self.completer(&mut chart, id, k);
                    } else if let Some(symbol) = self.next_symbol(state) {
                        match &**symbol {
                            Symbol::NonTerm(name) => changed |= self.predictor(&mut chart, name, k),
                            Symbol::Term(..) if k < last => self.scanner(&mut chart, symbol, k),
                            Symbol::Term(..) => (),
                        }
                    }
                    self.check_budget(&chart, started)?;
                }
                if !(changed && empty_completions) {
                    break;
                }
            }
        }

        if cfg!(feature = "debug") {
            for k in 0..=last {
                log::debug!("=== Column {} ===", k);
                for &id in chart.column(k) {
                    log::debug!("{}", chart.describe(&self.grammar, id));
                }
            }
        }

        // Accepting states: a. complete, b. start at 0, c. match the start
        // symbol. They span the whole input because they sit in the last column
        let start = self.grammar.start();
        let roots: Vec<StateId> = chart
            .column(last)
            .iter()
            .copied()
            .filter(|&id| {
                let state = chart.state(id);
                state.origin == 0 && state.complete() && self.lhs(state) == Some(start)
            })
            .collect();
        log::debug!(
            "parsed {} tokens into {} states, {} accepting",
            last,
            chart.len(),
            roots.len()
        );
        Ok(ParseTrees { grammar: &self.grammar, chart, roots })
    }

    /// Parse and build every tree of the forest. Ungrammatical input gives an
    /// empty list.
    pub fn trees<T>(&self, tokens: T) -> Result<Vec<Tree>, ParseError>
    where
        T: IntoIterator,
        T::Item: AsRef<str>,
    {
        let parse = self.parse(tokens)?;
        let mut forest: EarleyForest<'_, Tree> = Tree::forest();
        forest.max_trees(self.config.max_trees);
        forest.eval_all(&parse)
    }
}
