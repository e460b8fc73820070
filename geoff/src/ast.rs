//! Parsed Geoff constructs: descriptors, rules, and subgraphs.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::lexer::{Lexer, Token};

/// Property map attached to a rule, exactly as the literal parser produced
/// it. Values are normalized lazily, when a rule is interpreted.
pub type PropertyMap = Map<String, Value>;

/// An ordered token sequence for one graph construct, plus the derived
/// pattern string (one type symbol per token) the interpreter dispatches on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    tokens: Vec<Token>,
    pattern: String,
}

impl Descriptor {
    pub fn new(tokens: Vec<Token>) -> Self {
        let pattern = tokens.iter().map(Token::symbol).collect();
        Self { tokens, pattern }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Append another descriptor's tokens; continuation lines concatenate
    /// into one logical descriptor this way.
    pub fn concat(&mut self, other: Descriptor) {
        self.tokens.extend(other.tokens);
        self.pattern.push_str(&other.pattern);
    }

    pub fn ends_with_connector(&self) -> bool {
        self.tokens.last().is_some_and(Token::is_connector)
    }
}

impl FromStr for Descriptor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(Descriptor::new(Lexer::new(s).tokenize()?))
    }
}

/// A descriptor paired with its optional property map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub descriptor: Descriptor,
    pub data: Option<PropertyMap>,
}

impl Rule {
    pub fn new(descriptor: Descriptor, data: Option<PropertyMap>) -> Self {
        Self { descriptor, data }
    }
}

/// An ordered, appendable sequence of rules, built incrementally from raw
/// text. Later rules may reference names bound while applying earlier ones,
/// so order is load-bearing; delete iterates the reverse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subgraph {
    rules: Vec<Rule>,
}

impl Subgraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub(crate) fn last_mut(&mut self) -> Option<&mut Rule> {
        self.rules.last_mut()
    }

    /// Merge a property map into the most recently added rule.
    pub fn merge_data(&mut self, data: PropertyMap, position: usize) -> Result<()> {
        let Some(rule) = self.rules.last_mut() else {
            return Err(Error::syntax(
                position,
                "property data with no rule to attach it to",
            ));
        };
        match &mut rule.data {
            Some(existing) => existing.extend(data),
            None => rule.data = Some(data),
        }
        Ok(())
    }

    /// Parse more source text and append the resulting rules.
    pub fn load(&mut self, source: &str) -> Result<()> {
        crate::parser::parse_into(self, source)
    }

    /// Read a whole stream of source text and append the resulting rules.
    pub fn read_from(&mut self, mut reader: impl std::io::Read) -> Result<()> {
        let mut source = String::new();
        reader
            .read_to_string(&mut source)
            .map_err(|e| Error::Value(format!("unreadable source: {e}")))?;
        self.load(&source)
    }

    /// A copy with rule order inverted. Delete iterates this, so rules that
    /// touch relationships are undone before the node rules that introduced
    /// their endpoints.
    pub fn reverse(&self) -> Subgraph {
        let mut rules = self.rules.clone();
        rules.reverse();
        Subgraph { rules }
    }
}

impl FromStr for Subgraph {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut subgraph = Subgraph::new();
        subgraph.load(s)?;
        Ok(subgraph)
    }
}

impl From<Rule> for Subgraph {
    fn from(rule: Rule) -> Self {
        Subgraph { rules: vec![rule] }
    }
}

impl Extend<Rule> for Subgraph {
    fn extend<T: IntoIterator<Item = Rule>>(&mut self, iter: T) {
        self.rules.extend(iter);
    }
}

impl FromIterator<Rule> for Subgraph {
    fn from_iter<T: IntoIterator<Item = Rule>>(iter: T) -> Self {
        Subgraph {
            rules: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Subgraph {
    type Item = Rule;
    type IntoIter = std::vec::IntoIter<Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.into_iter()
    }
}
