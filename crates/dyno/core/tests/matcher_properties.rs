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

//! Algebraic properties of descriptor pattern matching

use dyno_core::{Descriptor, Pattern, matches};
use proptest::prelude::*;

const TAGS: [&str; 4] = ["a", "b", "c", "d"];

fn tag() -> impl Strategy<Value = &'static str> {
    prop::sample::select(TAGS.to_vec())
}

fn descriptor() -> impl Strategy<Value = Descriptor> {
    let leaf = tag().prop_map(Descriptor::leaf);
    leaf.prop_recursive(4, 32, 3, |inner| {
        (tag(), prop::collection::vec(inner, 0..3)).prop_map(|(constructor, children)| Descriptor::node(constructor, children))
    })
}

fn pattern() -> impl Strategy<Value = Pattern> {
    let leaf = prop_oneof![Just(Pattern::Any), tag().prop_map(Pattern::leaf)];
    leaf.prop_recursive(4, 32, 3, |inner| {
        prop_oneof![
            (tag(), prop::collection::vec(inner.clone(), 0..3)).prop_map(|(constructor, children)| Pattern::node(constructor, children)),
            prop::collection::vec(inner.clone(), 0..3).prop_map(Pattern::And),
            prop::collection::vec(inner.clone(), 0..3).prop_map(Pattern::Or),
            inner.prop_map(Pattern::not),
        ]
    })
}

proptest! {
    #[test]
    fn wildcard_matches_everything(value in descriptor()) {
        prop_assert!(matches(&value, &Pattern::Any));
    }

    #[test]
    fn negation_inverts(value in descriptor(), candidate in pattern()) {
        prop_assert_eq!(matches(&value, &Pattern::not(candidate.clone())), !matches(&value, &candidate));
    }

    #[test]
    fn binary_nodes_match_positionally(
        constructor in tag(),
        first in descriptor(),
        second in descriptor(),
        first_pattern in pattern(),
        second_pattern in pattern()
    ) {
        let value = Descriptor::node(constructor, [first.clone(), second.clone()]);
        let node_pattern = Pattern::node(constructor, [first_pattern.clone(), second_pattern.clone()]);
        prop_assert_eq!(matches(&value, &node_pattern), matches(&first, &first_pattern) && matches(&second, &second_pattern));
    }

    #[test]
    fn arity_mismatch_never_matches(
        constructor in tag(),
        children in prop::collection::vec(descriptor(), 0..4),
        wildcards in 0usize..4
    ) {
        prop_assume!(children.len() != wildcards);
        let value = Descriptor::node(constructor, children);
        let wildcard_pattern = Pattern::node(constructor, vec![Pattern::Any; wildcards]);
        prop_assert!(!matches(&value, &wildcard_pattern));
    }

    #[test]
    fn exact_pattern_matches_its_descriptor(value in descriptor()) {
        prop_assert!(Pattern::from(&value).matches(&value));
    }

    #[test]
    fn combinators_follow_boolean_algebra(value in descriptor(), left in pattern(), right in pattern()) {
        let l = matches(&value, &left);
        let r = matches(&value, &right);
        prop_assert_eq!(matches(&value, &Pattern::and([left.clone(), right.clone()])), l && r);
        prop_assert_eq!(matches(&value, &Pattern::or([left.clone(), right.clone()])), l || r);
    }
}
