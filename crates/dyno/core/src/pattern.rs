// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Pattern matching over descriptor trees
//!
//! Patterns are descriptor-shaped templates extended with a wildcard and
//! the `and`/`or`/`not` combinators. Matching is a pure predicate over the
//! static shape of a descriptor.

use std::fmt;

use crate::descriptor::{Descriptor, Tag};

/// A descriptor template used to select handler overloads
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Pattern {
    /// Matches any whole subtree
    Any,
    /// Matches an identical leaf
    Leaf(Tag),
    /// Matches a node with the same constructor, arity, and matching children
    Node { constructor: Tag, children: Vec<Pattern> },
    /// Matches if every pattern matches
    And(Vec<Pattern>),
    /// Matches if at least one pattern matches
    Or(Vec<Pattern>),
    /// Matches if the inner pattern does not
    Not(Box<Pattern>),
}

impl Pattern {
    pub fn any() -> Self {
        Pattern::Any
    }

    pub fn leaf(name: &'static str) -> Self {
        Pattern::Leaf(Tag(name))
    }

    pub fn node(constructor: &'static str, children: impl IntoIterator<Item = Pattern>) -> Self {
        Pattern::Node {
            constructor: Tag(constructor),
            children: children.into_iter().collect(),
        }
    }

    pub fn and(patterns: impl IntoIterator<Item = Pattern>) -> Self {
        Pattern::And(patterns.into_iter().collect())
    }

    pub fn or(patterns: impl IntoIterator<Item = Pattern>) -> Self {
        Pattern::Or(patterns.into_iter().collect())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(pattern: Pattern) -> Self {
        Pattern::Not(Box::new(pattern))
    }

    /// `constructor(and(p1..pk))`: a node of any arity whose every child
    /// matches at least one of the patterns
    pub fn each_child_one_of(constructor: &'static str, patterns: impl IntoIterator<Item = Pattern>) -> Self {
        Pattern::node(constructor, [Pattern::and(patterns)])
    }

    /// Check whether a descriptor matches this pattern
    pub fn matches(&self, value: &Descriptor) -> bool {
        matches(value, self)
    }
}

impl From<&Descriptor> for Pattern {
    /// The exact pattern matching only this descriptor
    fn from(descriptor: &Descriptor) -> Self {
        match descriptor {
            Descriptor::Leaf(tag) => Pattern::Leaf(*tag),
            Descriptor::Node { constructor, children } => Pattern::Node {
                constructor: *constructor,
                children: children.iter().map(Pattern::from).collect(),
            },
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, name: &str, items: &[Pattern]) -> fmt::Result {
            write!(f, "{name}(")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{item}")?;
            }
            f.write_str(")")
        }

        match self {
            Pattern::Any => f.write_str("_"),
            Pattern::Leaf(tag) => write!(f, "{tag}"),
            Pattern::Node { constructor, children } => list(f, constructor.name(), children),
            Pattern::And(items) => list(f, "and", items),
            Pattern::Or(items) => list(f, "or", items),
            Pattern::Not(inner) => write!(f, "not({inner})"),
        }
    }
}

/// Structural matching of a descriptor against a pattern.
///
/// The rules are applied in this order:
/// 1. `_` matches everything.
/// 2. `or`, `and`, and `not` combine the results of their operands.
/// 3. A node pattern whose only child is `and(p1..pk)` matches a node with
///    the same constructor and any arity when every child of the value
///    matches some `pi`.
/// 4. Any other node pattern matches positionally: same constructor, same
///    arity, and every child matching the pattern at the same position.
/// 5. A leaf pattern matches the identical leaf.
pub fn matches(value: &Descriptor, pattern: &Pattern) -> bool {
    match pattern {
        Pattern::Any => true,
        Pattern::Or(patterns) => patterns.iter().any(|p| matches(value, p)),
        Pattern::And(patterns) => patterns.iter().all(|p| matches(value, p)),
        Pattern::Not(inner) => !matches(value, inner),
        Pattern::Node { constructor, children } => match value {
            Descriptor::Node {
                constructor: value_constructor,
                children: value_children,
            } if value_constructor == constructor => match children.as_slice() {
                [Pattern::And(alternatives)] => value_children.iter().all(|child| alternatives.iter().any(|p| matches(child, p))),
                _ => value_children.len() == children.len() && value_children.iter().zip(children).all(|(child, p)| matches(child, p)),
            },
            _ => false,
        },
        Pattern::Leaf(tag) => matches!(value, Descriptor::Leaf(value_tag) if value_tag == tag),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &'static str) -> Descriptor {
        Descriptor::leaf(name)
    }

    fn node(name: &'static str, children: impl IntoIterator<Item = Descriptor>) -> Descriptor {
        Descriptor::node(name, children)
    }

    #[test]
    fn test_leaf_matching() {
        assert!(matches(&leaf("Leaf"), &Pattern::leaf("Leaf")));
        assert!(!matches(&leaf("Leaf"), &Pattern::leaf("some_other_type")));
        assert!(matches(&leaf("Leaf"), &Pattern::any()));
        assert!(!matches(&leaf("Node"), &Pattern::node("Node", [])));
    }

    #[test]
    fn test_node_matching() {
        assert!(matches(&node("Node", [leaf("Leaf")]), &Pattern::node("Node", [Pattern::leaf("Leaf")])));
        assert!(matches(&node("Node", [leaf("Leaf")]), &Pattern::node("Node", [Pattern::any()])));
        assert!(!matches(&node("Other", [leaf("Leaf")]), &Pattern::node("Node", [Pattern::any()])));

        let value = node("Node", [node("Node", [leaf("Leaf")]), node("Node", []), node("Node", [leaf("Leaf")])]);
        let pattern = Pattern::node(
            "Node",
            [
                Pattern::node("Node", [Pattern::any()]),
                Pattern::node("Node", []),
                Pattern::node("Node", [Pattern::leaf("Leaf")]),
            ],
        );
        assert!(matches(&value, &pattern));

        let value = node("Node", [node("Node", []), node("Node", [])]);
        let pattern = Pattern::node("Node", [Pattern::node("Node", [Pattern::leaf("Leaf")]), Pattern::node("Node", [])]);
        assert!(!matches(&value, &pattern));
    }

    #[test]
    fn test_arity_mismatch_is_not_absorbed_by_wildcard() {
        assert!(!matches(&node("Node", []), &Pattern::node("Node", [Pattern::any()])));
        assert!(!matches(&node("Node", [leaf("a"), leaf("b")]), &Pattern::node("Node", [Pattern::any()])));
        assert!(!matches(&node("Node", [leaf("a")]), &Pattern::node("Node", [])));
    }

    #[test]
    fn test_combinators() {
        let value = leaf("some_type");
        assert!(!matches(&value, &Pattern::and([Pattern::leaf("another_type"), Pattern::leaf("some_type")])));
        assert!(matches(&value, &Pattern::and([Pattern::any(), Pattern::leaf("some_type")])));
        assert!(matches(&value, &Pattern::or([Pattern::leaf("another_type"), Pattern::leaf("some_type")])));
        assert!(!matches(&value, &Pattern::or([])));
        assert!(matches(&value, &Pattern::and([])));
        assert!(matches(&value, &Pattern::not(Pattern::leaf("another_type"))));
        assert!(!matches(&value, &Pattern::not(Pattern::any())));
    }

    #[test]
    fn test_each_child_one_of() {
        let value = node("Node", [leaf("leaf2"), leaf("leaf0"), leaf("leaf1")]);
        let pattern = Pattern::each_child_one_of("Node", [Pattern::leaf("leaf0"), Pattern::leaf("leaf1"), Pattern::leaf("leaf2")]);
        assert!(matches(&value, &pattern));

        let value = node("Node", [leaf("leaf2"), leaf("leaf3")]);
        assert!(!matches(&value, &pattern));

        // Vacuously true for a childless node of the same constructor
        assert!(matches(&node("Node", []), &pattern));
        assert!(!matches(&node("Other", []), &pattern));
    }

    #[test]
    fn test_exact_pattern_from_descriptor() {
        let value = node("start", [node("parallelism_level", [leaf("thread")])]);
        let pattern = Pattern::from(&value);
        assert!(pattern.matches(&value));
        assert!(!pattern.matches(&node("start", [node("parallelism_level", [leaf("task")])])));
    }

    #[test]
    fn test_display() {
        let pattern = Pattern::node("op", [Pattern::any(), Pattern::or([Pattern::leaf("a"), Pattern::not(Pattern::leaf("b"))])]);
        assert_eq!(pattern.to_string(), "op(_, or(a, not(b)))");
    }
}
