use crate::forest::EarleyForest;
use serde_json::{Map, Value};
use std::fmt;

/// A concrete parse tree. Nodes are labeled by the head of the rule that
/// built them, leaves keep the terminal and the word it matched.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Tree {
    Leaf(String, String),
    Node(String, Vec<Tree>),
}

impl Tree {
    /// Forest walker producing `Tree`s for any grammar.
    pub fn forest<'a>() -> EarleyForest<'a, Tree> {
        let mut forest = EarleyForest::new(|symbol, word| {
            Tree::Leaf(symbol.to_string(), word.to_string())
        });
        forest.fallback(|rule, children| Tree::Node(rule.head.clone(), children));
        forest
    }

    pub fn label(&self) -> &str {
        match self {
            Tree::Leaf(symbol, _) => symbol,
            Tree::Node(label, _) => label,
        }
    }

    /// Matched words, left to right.
    pub fn leaves(&self) -> Vec<&str> {
        let mut words = Vec::new();
        let mut stack = vec![self];
        while let Some(tree) = stack.pop() {
            match tree {
                Tree::Leaf(_, word) => words.push(word.as_str()),
                Tree::Node(_, children) => stack.extend(children.iter().rev()),
            }
        }
        words
    }

    pub fn to_bracketed(&self) -> String {
        self.to_string()
    }

    /// `{"S": [{"VP": [{"Verb": "book"}, ...]}]}`
    pub fn to_nested(&self) -> Value {
        let (label, value) = match self {
            Tree::Leaf(symbol, word) => (symbol, Value::String(word.clone())),
            Tree::Node(label, children) => (
                label,
                Value::Array(children.iter().map(Tree::to_nested).collect()),
            ),
        };
        let mut map = Map::new();
        map.insert(label.clone(), value);
        Value::Object(map)
    }
}

// Deep trees torn down without recursion
impl Drop for Tree {
    fn drop(&mut self) {
        let Tree::Node(_, children) = self else { return };
        let mut stack = std::mem::take(children);
        while let Some(mut tree) = stack.pop() {
            if let Tree::Node(_, children) = &mut tree {
                stack.append(children);
            }
        }
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Tree::Leaf(symbol, word) => write!(f, "({} {})", symbol, word),
            Tree::Node(label, children) => {
                write!(f, "({}", label)?;
                for child in children {
                    write!(f, " {}", child)?;
                }
                write!(f, ")")
            }
        }
    }
}

///////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::Tree;
    use serde_json::json;

    fn leaf(symbol: &str, word: &str) -> Tree {
        Tree::Leaf(symbol.to_string(), word.to_string())
    }

    fn node(label: &str, children: Vec<Tree>) -> Tree {
        Tree::Node(label.to_string(), children)
    }

    fn book_the_flight() -> Tree {
        node(
            "S",
            vec![node(
                "VP",
                vec![
                    leaf("Verb", "book"),
                    node("NP", vec![leaf("Det", "the"), leaf("Noun", "flight")]),
                ],
            )],
        )
    }

    #[test]
    fn bracketed() {
        assert_eq!(
            book_the_flight().to_bracketed(),
            "(S (VP (Verb book) (NP (Det the) (Noun flight))))"
        );
        assert_eq!(node("A", vec![]).to_string(), "(A)");
    }

    #[test]
    fn nested() {
        assert_eq!(
            book_the_flight().to_nested(),
            json!({"S": [{"VP": [{"Verb": "book"},
                                 {"NP": [{"Det": "the"}, {"Noun": "flight"}]}]}]})
        );
        assert_eq!(node("A", vec![]).to_nested(), json!({"A": []}));
    }

    #[test]
    fn leaves_and_label() {
        let t = book_the_flight();
        assert_eq!(t.leaves(), vec!["book", "the", "flight"]);
        assert_eq!(t.label(), "S");
        assert_eq!(leaf("Det", "the").label(), "Det");
    }

    #[test]
    fn deep_tree() {
        let mut t = leaf("Num", "1");
        for _ in 0..200_000 {
            t = node("Sum", vec![t, leaf("+", "+")]);
        }
        let leaves = t.leaves();
        assert_eq!(leaves.len(), 200_001);
        assert_eq!(leaves[..3], ["1", "+", "+"]);
        drop(t);
    }
}
