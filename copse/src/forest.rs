use crate::chart::{Backpointers, Production, StateId};
use crate::config::EarleyConfig;
use crate::error::ParseError;
use crate::grammar::Rule;
use crate::parser::ParseTrees;
use std::collections::{HashMap, HashSet};

// Semantic actions to apply when a production is completed
type SemAction<'a, ASTNode> = Box<dyn Fn(Vec<ASTNode>) -> ASTNode + 'a>;
// Catch-all action for rules without their own
type Fallback<'a, ASTNode> = Box<dyn Fn(&Rule, Vec<ASTNode>) -> ASTNode + 'a>;
// How to lift a 'scanned' terminal into an AST node: (symbol, word)
type TerminalParser<'a, ASTNode> = Box<dyn Fn(&str, &str) -> ASTNode + 'a>;

pub struct EarleyForest<'a, ASTNode: Clone> {
    actions: HashMap<String, SemAction<'a, ASTNode>>,
    fallback: Option<Fallback<'a, ASTNode>>,
    terminal_parser: TerminalParser<'a, ASTNode>,
    max_trees: Option<usize>,
}

impl<'a, ASTNode: Clone> EarleyForest<'a, ASTNode> {
    pub fn new(terminal_parser: impl Fn(&str, &str) -> ASTNode + 'a) -> Self {
        EarleyForest {
            actions: HashMap::new(),
            fallback: None,
            terminal_parser: Box::new(terminal_parser),
            max_trees: EarleyConfig::default().max_trees,
        }
    }

    // Register semantic actions to act when rules are matched
    pub fn action(&mut self, rule: &str, action: impl Fn(Vec<ASTNode>) -> ASTNode + 'a) {
        self.actions.insert(rule.to_string(), Box::new(action));
    }

    /// Used for every rule that has no action of its own.
    pub fn fallback(&mut self, action: impl Fn(&Rule, Vec<ASTNode>) -> ASTNode + 'a) {
        self.fallback = Some(Box::new(action));
    }

    /// Cap on alternatives materialized for any node, `None` to enumerate
    /// everything.
    pub fn max_trees(&mut self, limit: Option<usize>) {
        self.max_trees = limit;
    }
}

// Bookkeeping for one walk over the chart
struct Walk<ASTNode> {
    // complete states currently being expanded
    on_path: HashSet<StateId>,
    // rule states entered at least once
    visited: HashSet<StateId>,
    // expansions that didn't depend on the path, kept once a state repeats
    memo: HashMap<StateId, Vec<ASTNode>>,
    // how many times a cycle was cut
    cuts: usize,
    first_only: bool,
}

impl<ASTNode> Walk<ASTNode> {
    fn new(first_only: bool) -> Self {
        Walk {
            on_path: HashSet::new(),
            visited: HashSet::new(),
            memo: HashMap::new(),
            cuts: 0,
            first_only,
        }
    }
}

// A rule state being expanded, one list of back-pointers at a time
struct Frame<'p, ASTNode> {
    id: StateId,
    rule: &'p Rule,
    lists: Backpointers<'p>,
    // current list of back-pointers and the next one to expand
    children: Vec<StateId>,
    next_child: usize,
    // argument lists built so far for `children`, None between lists
    combos: Option<Vec<Vec<ASTNode>>>,
    nodes: Vec<ASTNode>,
    // cycle cuts seen before entering this state
    cuts: usize,
    // entered before, memoize when done
    repeat: bool,
}

impl<ASTNode> Frame<'_, ASTNode> {
    fn pending_child(&self) -> Option<StateId> {
        match &self.combos {
            Some(combos) if !combos.is_empty() => self.children.get(self.next_child).copied(),
            _ => None,
        }
    }
}

impl<'a, ASTNode: Clone> EarleyForest<'a, ASTNode> {
    fn reduce(&self, rule: &Rule, args: Vec<ASTNode>) -> Result<ASTNode, ParseError> {
        // Lookup semantic action to apply based on rule name
        let rulename = rule.to_string();
        log::trace!("Reduction: {}", rulename);
        if let Some(action) = self.actions.get(&rulename) {
            return Ok(action(args));
        }
        match &self.fallback {
            Some(action) => Ok(action(rule, args)),
            None => Err(ParseError::MissingAction(rulename)),
        }
    }

    fn check(&self, alternatives: usize) -> Result<(), ParseError> {
        match self.max_trees {
            Some(limit) if alternatives > limit => Err(ParseError::TreeBudget(limit)),
            _ => Ok(()),
        }
    }

    // Start expanding `id`. Returns its alternatives right away unless it
    // is a rule state, which gets a frame on the stack instead.
    // - Lexeme states lift the scanned word through the terminal parser.
    // - A state already on the path is a cycle through unit or empty rules,
    //   it contributes nothing there so the walk always ends.
    fn enter<'p>(
        &self,
        ptrees: &'p ParseTrees<'_>,
        walk: &mut Walk<ASTNode>,
        stack: &mut Vec<Frame<'p, ASTNode>>,
        id: StateId,
    ) -> Option<Vec<ASTNode>> {
        if let Some(nodes) = walk.memo.get(&id) {
            return Some(nodes.clone());
        }
        if walk.on_path.contains(&id) {
            walk.cuts += 1;
            return Some(Vec::new());
        }
        let chart = ptrees.chart();
        let state = chart.state(id);
        match &state.production {
            Production::Lexeme(symbol) => {
                Some(vec![(self.terminal_parser)(symbol.name(), chart.token(state.origin))])
            }
            Production::Start => Some(Vec::new()),
            Production::Rule(rule) => {
                walk.on_path.insert(id);
                stack.push(Frame {
                    id,
                    rule: ptrees.grammar().rule(*rule),
                    lists: chart.backpointers(id),
                    children: Vec::new(),
                    next_child: 0,
                    combos: None,
                    nodes: Vec::new(),
                    cuts: walk.cuts,
                    repeat: !walk.visited.insert(id),
                });
                None
            }
        }
    }

    // Every way to build a node out of the state `id`. Rule states try each
    // list of back-pointers and combine the alternatives of each child
    // (cross product) before reducing. Frames live on an explicit stack so
    // deep derivations don't exhaust the call stack.
    fn expand(
        &self,
        ptrees: &ParseTrees<'_>,
        walk: &mut Walk<ASTNode>,
        id: StateId,
    ) -> Result<Vec<ASTNode>, ParseError> {
        let mut stack = Vec::new();
        let mut pending = self.enter(ptrees, walk, &mut stack, id);
        while let Some(frame) = stack.last_mut() {
            // alternatives of the child just expanded
            if let Some(alternatives) = pending.take() {
                let combos = frame.combos.take().unwrap_or_default();
                let mut combos = cross_product(combos, alternatives);
                if walk.first_only {
                    combos.truncate(1);
                }
                self.check(combos.len())?;
                frame.combos = Some(combos);
                frame.next_child += 1;
            }
            if let Some(child) = frame.pending_child() {
                pending = self.enter(ptrees, walk, &mut stack, child);
                continue;
            }
            for args in frame.combos.take().unwrap_or_default() {
                frame.nodes.push(self.reduce(frame.rule, args)?);
                self.check(frame.nodes.len())?;
            }
            if !walk.first_only || frame.nodes.is_empty() {
                if let Some(children) = frame.lists.next() {
                    frame.children = children;
                    frame.next_child = 0;
                    frame.combos = Some(vec![Vec::new()]);
                    continue;
                }
            }
            if let Some(done) = stack.pop() {
                walk.on_path.remove(&done.id);
                if done.repeat && walk.cuts == done.cuts {
                    walk.memo.insert(done.id, done.nodes.clone());
                }
                pending = Some(done.nodes);
            }
        }
        Ok(pending.unwrap_or_default())
    }

    /// Retrieves all parse trees, in the order of the accepting states and
    /// their back-pointers. Empty when the input was not accepted.
    pub fn eval_all(&self, ptrees: &ParseTrees<'_>) -> Result<Vec<ASTNode>, ParseError> {
        let mut walk = Walk::new(false);
        let mut trees = Vec::new();
        for &root in ptrees.roots() {
            trees.extend(self.expand(ptrees, &mut walk, root)?);
            self.check(trees.len())?;
        }
        Ok(trees)
    }

    /// Retrieves the first parse tree only. Cheap even when the forest is huge.
    pub fn eval(&self, ptrees: &ParseTrees<'_>) -> Result<Option<ASTNode>, ParseError> {
        let mut walk = Walk::new(true);
        for &root in ptrees.roots() {
            if let Some(tree) = self.expand(ptrees, &mut walk, root)?.into_iter().next() {
                return Ok(Some(tree));
            }
        }
        Ok(None)
    }
}

// Extend every argument list with every alternative. The last use of each
// value is moved rather than cloned.
fn cross_product<N: Clone>(combos: Vec<Vec<N>>, mut alternatives: Vec<N>) -> Vec<Vec<N>> {
    let mut extended = Vec::with_capacity(combos.len() * alternatives.len());
    let count = combos.len();
    for (i, args) in combos.into_iter().enumerate() {
        let alternatives = if i + 1 == count {
            std::mem::take(&mut alternatives)
        } else {
            alternatives.clone()
        };
        extended.extend(with_each(args, alternatives));
    }
    extended
}

fn with_each<N: Clone>(args: Vec<N>, alternatives: Vec<N>) -> impl Iterator<Item = Vec<N>> {
    let count = alternatives.len();
    let mut args = Some(args);
    alternatives.into_iter().enumerate().map(move |(i, alt)| {
        let combo = if i + 1 == count { args.take() } else { args.clone() };
        let mut combo = combo.unwrap_or_default();
        combo.push(alt);
        combo
    })
}
