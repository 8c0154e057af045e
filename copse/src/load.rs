use crate::error::GrammarError;
use crate::grammar::{Grammar, GrammarBuilder};
use std::collections::HashMap;
use std::path::Path;

// Split `lhs -> rhs`, both sides trimmed. Blank lines give None.
fn split_line(line: &str, lineno: usize) -> Result<Option<(&str, &str)>, GrammarError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let format = |reason: &'static str| GrammarError::Format { line: lineno, reason };
    let (lhs, rhs) = line.split_once("->").ok_or_else(|| format("missing '->'"))?;
    let (lhs, rhs) = (lhs.trim(), rhs.trim());
    if lhs.is_empty() {
        return Err(format("empty left-hand side"));
    }
    if rhs.is_empty() {
        return Err(format("empty right-hand side"));
    }
    Ok(Some((lhs, rhs)))
}

// Lexicon entries in first-seen order, repeated heads extend their words
fn read_lexicon(lexicon: &str) -> Result<Vec<(&str, Vec<&str>)>, GrammarError> {
    let mut entries: Vec<(&str, Vec<&str>)> = Vec::new();
    let mut index = HashMap::new();
    for (n, line) in lexicon.lines().enumerate() {
        let Some((lhs, rhs)) = split_line(line, n + 1)? else {
            continue;
        };
        let pos = *index.entry(lhs).or_insert_with(|| {
            entries.push((lhs, Vec::new()));
            entries.len() - 1
        });
        for word in rhs.split('|').map(str::trim) {
            if word.is_empty() {
                return Err(GrammarError::Format {
                    line: n + 1,
                    reason: "empty lexicon alternative",
                });
            }
            entries[pos].1.push(word);
        }
    }
    Ok(entries)
}

/// Build a grammar out of a rule block (`S -> NP VP`, one production per
/// line) and a lexicon block (`Det -> the | a`). Every lexicon head becomes a
/// terminal matching exactly its words.
pub fn grammar_from_str(rules: &str, lexicon: &str, start: &str) -> Result<Grammar, GrammarError> {
    let mut gb = GrammarBuilder::default();
    for (name, words) in read_lexicon(lexicon)? {
        gb.lexeme_try(name, words);
    }
    for (n, line) in rules.lines().enumerate() {
        let Some((lhs, rhs)) = split_line(line, n + 1)? else {
            continue;
        };
        if gb.is_terminal(lhs) {
            log::warn!("line {}: skipping rule for lexicon symbol '{}'", n + 1, lhs);
            continue;
        }
        let spec: Vec<&str> = rhs.split_whitespace().collect();
        gb.nonterm_try(lhs);
        for symbol in &spec {
            if !gb.is_terminal(symbol) {
                gb.nonterm_try(symbol);
            }
        }
        gb.rule_try(lhs, &spec);
    }
    gb.into_grammar(start)
}

/// Same as `grammar_from_str` reading both blocks from files.
pub fn grammar_from_files(
    rules: impl AsRef<Path>,
    lexicon: impl AsRef<Path>,
    start: &str,
) -> Result<Grammar, GrammarError> {
    let rules = std::fs::read_to_string(rules)?;
    let lexicon = std::fs::read_to_string(lexicon)?;
    grammar_from_str(&rules, &lexicon, start)
}

///////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{grammar_from_files, grammar_from_str};
    use crate::error::GrammarError;

    const RULES: &str = "
        S -> NP VP
        NP -> Det Noun

        VP -> Verb NP
        VP -> Verb NP
    ";

    const LEXICON: &str = "
        Det -> the | a
        Noun -> flight | trip
        Verb -> book
        Noun -> meal
    ";

    #[test]
    fn load_blocks() {
        let g = grammar_from_str(RULES, LEXICON, "S").unwrap();
        assert_eq!(g.start(), "S");
        // duplicated VP line merges
        assert_eq!(g.rules().len(), 3);
        assert!(g.is_terminal("Det"));
        assert!(!g.is_terminal("NP"));
        let det = g.symbol("Det").unwrap();
        assert!(det.matches("the") && det.matches("a"));
        // repeated lexicon head extends its words
        let noun = g.symbol("Noun").unwrap();
        assert!(noun.matches("flight") && noun.matches("meal"));
        assert!(!noun.matches("book"));
    }

    #[test]
    fn rhs_split_on_whitespace() {
        let g = grammar_from_str("S ->  NP\tVP  ", "NP -> I\nVP -> fly", "S").unwrap();
        assert_eq!(g.rules()[0].to_string(), "S -> NP VP");
    }

    #[test]
    fn lexicon_word_with_spaces() {
        let g = grammar_from_str("S -> City", "City -> Los Angeles | Houston", "S").unwrap();
        let city = g.symbol("City").unwrap();
        assert!(city.matches("Los Angeles"));
        assert!(!city.matches("Los"));
    }

    #[test]
    fn skip_rules_for_lexicon_symbols() {
        let g = grammar_from_str("S -> Noun\nNoun -> S", "Noun -> flight", "S").unwrap();
        assert_eq!(g.rules().len(), 1);
        assert_eq!(g.rules()[0].to_string(), "S -> Noun");
    }

    #[test]
    fn unknown_rhs_become_nonterminals() {
        let g = grammar_from_str("S -> Aux Noun", "Noun -> flight", "S").unwrap();
        assert!(g.symbol("Aux").is_some());
        assert!(!g.is_terminal("Aux"));
        assert!(g.productions_for("Aux").is_empty());
    }

    #[test]
    fn format_errors() {
        let err = grammar_from_str("S -> NP\nNP VP", "", "S").unwrap_err();
        assert!(matches!(err, GrammarError::Format { line: 2, reason: "missing '->'" }));
        assert_eq!(err.to_string(), "Grammar format error at line 2: missing '->'");

        let err = grammar_from_str(" -> NP", "", "S").unwrap_err();
        assert!(matches!(err, GrammarError::Format { line: 1, reason: "empty left-hand side" }));

        let err = grammar_from_str("S -> ", "", "S").unwrap_err();
        assert!(matches!(err, GrammarError::Format { line: 1, reason: "empty right-hand side" }));

        let err = grammar_from_str("S -> Det", "\n\nDet -> the || a", "S").unwrap_err();
        assert!(matches!(
            err,
            GrammarError::Format { line: 3, reason: "empty lexicon alternative" }
        ));
    }

    #[test]
    fn missing_start() {
        let err = grammar_from_str(RULES, LEXICON, "Sentence").unwrap_err();
        assert_eq!(err.to_string(), "Missing Symbol: Sentence");
    }

    #[test]
    fn missing_files() {
        let err = grammar_from_files("/nonexistent/rules", "/nonexistent/lexicon", "S");
        assert!(matches!(err, Err(GrammarError::Io(_))));
    }

    #[test]
    fn load_files() {
        let dir = std::env::temp_dir().join(format!("copse-load-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("g.rules"), RULES).unwrap();
        std::fs::write(dir.join("g.lexicon"), LEXICON).unwrap();
        let g = grammar_from_files(dir.join("g.rules"), dir.join("g.lexicon"), "S").unwrap();
        assert_eq!(g.rules().len(), 3);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
