#![deny(warnings)]

mod chart;
pub use crate::chart::{Backpointers, Chart, Insert, Production, Source, State, StateId};

mod config;
pub use crate::config::EarleyConfig;

mod error;
pub use crate::error::{GrammarError, ParseError};

mod grammar;
pub use crate::grammar::{Grammar, GrammarBuilder, Matcher, Rule, RuleId, Symbol};

mod load;
pub use crate::load::{grammar_from_files, grammar_from_str};

mod parser;
pub use crate::parser::{EarleyParser, ParseTrees};

mod forest;
pub use crate::forest::EarleyForest;

mod tree;
pub use crate::tree::Tree;
