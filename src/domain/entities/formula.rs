//! Formula - text expressions with named aliases
//!
//! Rules content is authored as plain text with `@name` placeholders, e.g.
//! `"1 + @strength * 5 - @targetHealth"`. Each alias maps to a navigation
//! path walked from the casting entity (and optionally a target), e.g.
//! `strength -> ["caster", "stats", "strength"]`. Keeping formulas as text
//! rather than a compiled AST keeps them readable for content authors; the
//! formula engine guarantees referential safety when they are expanded.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A text expression with alias declarations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formula {
    /// The expression text with `@name` placeholders
    pub text: String,
    /// Alias name -> navigation path from the evaluation context.
    /// Paths start at `caster` or `target`.
    #[serde(default)]
    pub aliases: BTreeMap<String, Vec<String>>,
}

impl Formula {
    pub fn new(text: impl Into<String>, aliases: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            text: text.into(),
            aliases,
        }
    }

    /// A formula with no aliases, e.g. a flat modifier like `"2"`.
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            aliases: BTreeMap::new(),
        }
    }

    /// Declare an alias, builder style.
    pub fn with_alias(mut self, name: impl Into<String>, path: &[&str]) -> Self {
        self.aliases
            .insert(name.into(), path.iter().map(|s| s.to_string()).collect());
        self
    }
}
