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

//! Structural event descriptors
//!
//! A descriptor is a small immutable tree describing what kind of thing
//! happened, e.g. `mutex_operation(previous_ownership(none), new_ownership(exclusive), ...)`.
//! Descriptors are compared structurally and never mutated once built.

use std::fmt;

/// An opaque tag naming a leaf or a node constructor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(pub &'static str);

impl Tag {
    pub const fn new(name: &'static str) -> Self {
        Tag(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A structural value tagging what kind of event occurred
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Descriptor {
    /// A tag with no children
    Leaf(Tag),
    /// A constructor applied to an ordered list of children
    Node { constructor: Tag, children: Vec<Descriptor> },
}

impl Descriptor {
    /// Create a leaf descriptor
    pub fn leaf(name: &'static str) -> Self {
        Descriptor::Leaf(Tag(name))
    }

    /// Create a node descriptor from a constructor and its children
    pub fn node(constructor: &'static str, children: impl IntoIterator<Item = Descriptor>) -> Self {
        Descriptor::Node {
            constructor: Tag(constructor),
            children: children.into_iter().collect(),
        }
    }

    /// The leaf tag or the node constructor
    pub fn constructor(&self) -> Tag {
        match self {
            Descriptor::Leaf(tag) => *tag,
            Descriptor::Node { constructor, .. } => *constructor,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Descriptor::Leaf(_))
    }

    /// Number of direct children (zero for leaves)
    pub fn arity(&self) -> usize {
        self.children().len()
    }

    pub fn children(&self) -> &[Descriptor] {
        match self {
            Descriptor::Leaf(_) => &[],
            Descriptor::Node { children, .. } => children,
        }
    }

    /// The n-th direct child, if any
    pub fn child(&self, n: usize) -> Option<&Descriptor> {
        self.children().get(n)
    }

    /// Find the first direct child built with the given constructor
    pub fn child_by_constructor(&self, constructor: &str) -> Option<&Descriptor> {
        self.children().iter().find(|child| child.constructor().name() == constructor)
    }

    /// Total number of nodes and leaves in the tree
    pub fn size(&self) -> usize {
        1 + self.children().iter().map(Descriptor::size).sum::<usize>()
    }

    /// Rebuild the tree depth-first, replacing every leaf with `f(leaf)`
    pub fn map_leaves<F>(&self, f: &F) -> Descriptor
    where
        F: Fn(Tag) -> Descriptor,
    {
        match self {
            Descriptor::Leaf(tag) => f(*tag),
            Descriptor::Node { constructor, children } => Descriptor::Node {
                constructor: *constructor,
                children: children.iter().map(|child| child.map_leaves(f)).collect(),
            },
        }
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Descriptor::Leaf(tag) => write!(f, "{tag}"),
            Descriptor::Node { constructor, children } => {
                write!(f, "{constructor}(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{child}")?;
                }
                f.write_str(")")
            }
        }
    }
}
