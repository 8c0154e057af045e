use crate::grammar::{Grammar, RuleId, Symbol};
use std::collections::HashMap;
use std::sync::Arc;

/// Stable index of a state within its `Chart`.
pub type StateId = usize;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Production {
    /// Synthetic `START -> S` seeding the chart
    Start,
    Rule(RuleId),
    /// A terminal matched over a single token: `B -> word`
    Lexeme(Arc<Symbol>),
}

/// One way a state was derived.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Source {
    /// `prev` was advanced over the completed `child`
    Complete { prev: StateId, child: StateId },
    /// Literal match of the token at this input position
    Scan(usize),
}

/// A partially matched production. `dot` shows the match progress.
#[derive(Debug)]
pub struct State {
    pub id: StateId,
    pub production: Production,
    pub origin: usize, // input position where the match started
    pub dot: usize,    // how many rhs symbols are matched
    pub end: usize,    // column holding this state
    len: usize,        // rhs length
    // Each state owns its list. Equivalent derivations found later are
    // appended here instead of creating a new state.
    sources: Vec<Source>,
}

impl State {
    /// Build a `Prediction` state starting (and ending) at `at`.
    pub fn predict(production: Production, len: usize, at: usize) -> State {
        State {
            id: 0,
            production,
            origin: at,
            dot: 0,
            end: at,
            len,
            sources: Vec::new(),
        }
    }

    /// Build a complete lexeme state for the token at `at`.
    pub fn lexeme(symbol: Arc<Symbol>, at: usize) -> State {
        State {
            id: 0,
            production: Production::Lexeme(symbol),
            origin: at,
            dot: 1,
            end: at + 1,
            len: 1,
            sources: vec![Source::Scan(at)],
        }
    }

    /// This state with its dot moved over one more symbol, now ending at `end`.
    pub fn advance(&self, end: usize, source: Source) -> State {
        State {
            id: 0,
            production: self.production.clone(),
            origin: self.origin,
            dot: self.dot + 1,
            end,
            len: self.len,
            sources: vec![source],
        }
    }

    /// State is complete if its production has been fully matched
    pub fn complete(&self) -> bool {
        self.dot >= self.len
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    // states are deduped only by production, origin and dot (ie: not sources)
    fn key(&self) -> (Production, usize, usize) {
        (self.production.clone(), self.origin, self.dot)
    }
}

/// Result of pushing a state into the chart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Insert {
    New(StateId),
    /// An equivalent state existed and gained a new source
    Merged(StateId),
    /// Nothing changed
    Known(StateId),
}

impl Insert {
    pub fn id(self) -> StateId {
        match self {
            Insert::New(id) | Insert::Merged(id) | Insert::Known(id) => id,
        }
    }

    pub fn changed(self) -> bool {
        !matches!(self, Insert::Known(_))
    }
}

#[derive(Default)]
struct Column {
    items: Vec<StateId>,
    dedup: HashMap<(Production, usize, usize), StateId>,
}

/// State arena plus one column per input position `0..=N`.
pub struct Chart {
    tokens: Vec<String>,
    states: Vec<State>,
    columns: Vec<Column>,
}

impl Chart {
    pub fn new(tokens: Vec<String>) -> Chart {
        let columns = (0..=tokens.len()).map(|_| Column::default()).collect();
        Chart { tokens, states: Vec::new(), columns }
    }

    /// Insert `state` into the column where it ends, merging its sources into
    /// an equivalent state if there is one.
    pub fn push(&mut self, mut state: State) -> Insert {
        let column = &mut self.columns[state.end];
        let key = state.key();
        if let Some(&id) = column.dedup.get(&key) {
            let existent = &mut self.states[id];
            let before = existent.sources.len();
            for source in state.sources {
                if !existent.sources.contains(&source) {
                    existent.sources.push(source);
                }
            }
            return if existent.sources.len() > before {
                Insert::Merged(id)
            } else {
                Insert::Known(id)
            };
        }
        // ids come from the arena length, so they only ever grow
        let id = self.states.len();
        state.id = id;
        column.items.push(id);
        column.dedup.insert(key, id);
        self.states.push(state);
        Insert::New(id)
    }

    pub fn state(&self, id: StateId) -> &State {
        &self.states[id]
    }

    /// State ids ending at position `k`, in insertion order.
    pub fn column(&self, k: usize) -> &[StateId] {
        &self.columns[k].items
    }

    pub fn columns(&self) -> usize {
        self.columns.len()
    }

    /// Total number of states across all columns.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn token(&self, position: usize) -> &str {
        &self.tokens[position]
    }

    /// Every alternative list of child states that matched the rhs of `id`,
    /// one child per matched symbol in left to right order. Predicted and
    /// lexeme states have a single empty list. Lists are built on demand.
    pub fn backpointers(&self, id: StateId) -> Backpointers<'_> {
        let mut lists = Backpointers { chart: self, levels: Vec::new(), started: false };
        lists.descend(id);
        lists
    }

    // The `idx`-th completion that advanced `id` as (prev, child)
    fn link(&self, id: StateId, idx: usize) -> Option<(StateId, StateId)> {
        match self.states[id].sources.get(idx) {
            Some(&Source::Complete { prev, child }) => Some((prev, child)),
            _ => None,
        }
    }

    /// Human readable dump of a state: `(0 - 2) NP -> Det Noun · #bp: 1`
    pub fn describe(&self, grammar: &Grammar, id: StateId) -> String {
        let state = &self.states[id];
        let (head, rhs): (&str, Vec<&str>) = match &state.production {
            Production::Start => ("START", vec![grammar.start()]),
            Production::Rule(rule) => {
                let rule = grammar.rule(*rule);
                (rule.head.as_str(), rule.spec.iter().map(|s| s.name()).collect())
            }
            Production::Lexeme(symbol) => (symbol.name(), vec![self.token(state.origin)]),
        };
        format!(
            "({} - {}) {} -> {} \u{00b7} {} #bp: {}",
            state.origin,
            state.end,
            head,
            rhs[..state.dot].join(" "),
            rhs[state.dot..].join(" "),
            state.sources.len()
        )
    }
}

/// Iterator over the child lists of a state, see `Chart::backpointers`.
/// Walks the `prev` chain like an odometer: the last matched symbol varies
/// slowest, the first one fastest.
pub struct Backpointers<'c> {
    chart: &'c Chart,
    // (state, source index) from the state itself down to dot 1
    levels: Vec<(StateId, usize)>,
    started: bool,
}

impl Backpointers<'_> {
    // Take the first source of `id` and of every state on its prev chain
    fn descend(&mut self, mut id: StateId) {
        while let Some((prev, _)) = self.chart.link(id, 0) {
            self.levels.push((id, 0));
            id = prev;
        }
    }

    // Move to the next combination of sources, false once all were seen
    fn advance(&mut self) -> bool {
        while let Some((id, idx)) = self.levels.pop() {
            if let Some((prev, _)) = self.chart.link(id, idx + 1) {
                self.levels.push((id, idx + 1));
                self.descend(prev);
                return true;
            }
        }
        false
    }
}

impl Iterator for Backpointers<'_> {
    type Item = Vec<StateId>;

    fn next(&mut self) -> Option<Vec<StateId>> {
        if self.started && !self.advance() {
            return None;
        }
        self.started = true;
        let chart = self.chart;
        Some(
            self.levels
                .iter()
                .rev()
                .filter_map(|&(id, idx)| chart.link(id, idx).map(|(_, child)| child))
                .collect(),
        )
    }
}

///////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarBuilder;

    fn chart(words: &str) -> Chart {
        Chart::new(words.split_whitespace().map(String::from).collect())
    }

    fn noun() -> Arc<Symbol> {
        Arc::new(Symbol::Term("N".to_string(), Box::new(|w| w == "stars")))
    }

    fn verb() -> Arc<Symbol> {
        Arc::new(Symbol::Term("V".to_string(), Box::new(|w| w == "saw")))
    }

    fn lists(c: &Chart, id: StateId) -> Vec<Vec<StateId>> {
        c.backpointers(id).collect()
    }

    #[test]
    fn chart_columns() {
        let c = chart("astronomers saw stars");
        assert_eq!(c.columns(), 4);
        assert!(c.is_empty());
        assert_eq!(c.token(2), "stars");
        assert_eq!(Chart::new(Vec::new()).columns(), 1);
    }

    #[test]
    fn state_dedupness() {
        let mut c = chart("stars stars");
        let a = c.push(State::predict(Production::Rule(0), 2, 0));
        assert_eq!(a, Insert::New(0));
        // same production, origin, dot in the same column
        assert_eq!(c.push(State::predict(Production::Rule(0), 2, 0)), Insert::Known(0));
        // a different origin is a different state
        assert_eq!(c.push(State::predict(Production::Rule(0), 2, 1)), Insert::New(1));
        assert_eq!(c.push(State::predict(Production::Rule(1), 2, 0)), Insert::New(2));
        assert_eq!(c.len(), 3);
        assert_eq!(c.column(0), &[0, 2]);
        assert_eq!(c.column(1), &[1]);
    }

    #[test]
    fn state_merge_sources() {
        let mut c = chart("stars stars");
        let parent = c.push(State::predict(Production::Rule(0), 1, 0)).id();
        let lex1 = c.push(State::lexeme(noun(), 0)).id();
        let adv = c.state(parent).advance(1, Source::Complete { prev: parent, child: lex1 });
        let first = c.push(adv);
        assert!(matches!(first, Insert::New(_)));
        // same derivation again changes nothing
        let again = c.state(parent).advance(1, Source::Complete { prev: parent, child: lex1 });
        assert_eq!(c.push(again), Insert::Known(first.id()));
        // a different child merges into the existing state
        let other = c.state(parent).advance(1, Source::Complete { prev: parent, child: 99 });
        assert_eq!(c.push(other), Insert::Merged(first.id()));
        assert_eq!(c.state(first.id()).sources().len(), 2);
        assert!(c.state(first.id()).complete());
    }

    #[test]
    fn lexeme_state() {
        let mut c = chart("stars");
        let id = c.push(State::lexeme(noun(), 0)).id();
        let lex = c.state(id);
        assert!(lex.complete());
        assert_eq!((lex.origin, lex.end), (0, 1));
        assert_eq!(lex.sources(), &[Source::Scan(0)]);
        assert_eq!(lists(&c, id), vec![Vec::<StateId>::new()]);
        assert_eq!(c.column(1), &[id]);
    }

    #[test]
    fn backpointers_flatten_left_to_right() {
        // X -> N N over "stars stars", built by hand
        let mut c = chart("stars stars");
        let p0 = c.push(State::predict(Production::Rule(0), 2, 0)).id();
        let n0 = c.push(State::lexeme(noun(), 0)).id();
        let p1 = c.state(p0).advance(1, Source::Complete { prev: p0, child: n0 });
        let p1 = c.push(p1).id();
        let n1 = c.push(State::lexeme(noun(), 1)).id();
        let p2 = c.state(p1).advance(2, Source::Complete { prev: p1, child: n1 });
        let p2 = c.push(p2).id();
        assert_eq!(lists(&c, p0), vec![Vec::<StateId>::new()]);
        assert_eq!(lists(&c, p1), vec![vec![n0]]);
        assert_eq!(lists(&c, p2), vec![vec![n0, n1]]);
    }

    #[test]
    fn backpointers_every_combination() {
        // X -> A A where each A was matched by a noun or a verb
        let mut c = chart("stars saw");
        let p0 = c.push(State::predict(Production::Rule(0), 2, 0)).id();
        let n0 = c.push(State::lexeme(noun(), 0)).id();
        let v0 = c.push(State::lexeme(verb(), 0)).id();
        let p1 = c.state(p0).advance(1, Source::Complete { prev: p0, child: n0 });
        let p1 = c.push(p1).id();
        let again = c.state(p0).advance(1, Source::Complete { prev: p0, child: v0 });
        assert_eq!(c.push(again), Insert::Merged(p1));
        let n1 = c.push(State::lexeme(noun(), 1)).id();
        let v1 = c.push(State::lexeme(verb(), 1)).id();
        let p2 = c.state(p1).advance(2, Source::Complete { prev: p1, child: n1 });
        let p2 = c.push(p2).id();
        let again = c.state(p1).advance(2, Source::Complete { prev: p1, child: v1 });
        assert_eq!(c.push(again), Insert::Merged(p2));
        assert_eq!(
            lists(&c, p2),
            vec![vec![n0, n1], vec![v0, n1], vec![n0, v1], vec![v0, v1]]
        );
        // lazily produced, nothing past what is asked for
        let mut bp = c.backpointers(p2);
        assert_eq!(bp.next(), Some(vec![n0, n1]));
        assert_eq!(bp.by_ref().count(), 3);
        assert_eq!(bp.next(), None);
    }

    #[test]
    fn describe_state() {
        let g = GrammarBuilder::default()
            .nonterm("NP")
            .lexeme("Det", ["the"])
            .lexeme("Noun", ["flight"])
            .rule("NP", &["Det", "Noun"])
            .into_grammar("NP")
            .unwrap();
        let mut c = chart("the flight");
        let id = c.push(State::predict(Production::Rule(0), 2, 0)).id();
        assert_eq!(c.describe(&g, id), "(0 - 0) NP ->  \u{00b7} Det Noun #bp: 0");
        let start = c.push(State::predict(Production::Start, 1, 0)).id();
        assert_eq!(c.describe(&g, start), "(0 - 0) START ->  \u{00b7} NP #bp: 0");
        let det = g.symbol("Det").unwrap().clone();
        let lex = c.push(State::lexeme(det, 0)).id();
        assert_eq!(c.describe(&g, lex), "(0 - 1) Det -> the \u{00b7}  #bp: 1");
    }
}
