//! Property-based tests for lookahead restrictions and name spelling.

use gramgen::{
    codegen::CaseConverter,
    grammar::{lookahead_contains, lookahead_intersect, LookaheadRule},
};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn set_strategy() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set("[a-e]", 0..4)
}

fn rule(set: &BTreeSet<String>, positive: bool) -> LookaheadRule {
    LookaheadRule {
        set: set.clone(),
        positive,
    }
}

fn rule_strategy() -> impl Strategy<Value = Option<LookaheadRule>> {
    prop::option::of(
        (set_strategy(), any::<bool>())
            .prop_map(|(set, positive)| LookaheadRule { set, positive }),
    )
}

proptest! {
    #[test]
    fn intersection_allows_what_both_allow(
        a in rule_strategy(),
        b in rule_strategy(),
        t in "[a-f]",
    ) {
        let both = lookahead_intersect(a.as_ref(), b.as_ref());
        prop_assert_eq!(
            lookahead_contains(both.as_ref(), &t),
            lookahead_contains(a.as_ref(), &t) && lookahead_contains(b.as_ref(), &t)
        );
    }

    #[test]
    fn intersection_commutes(a in rule_strategy(), b in rule_strategy(), t in "[a-f]") {
        let ab = lookahead_intersect(a.as_ref(), b.as_ref());
        let ba = lookahead_intersect(b.as_ref(), a.as_ref());
        prop_assert_eq!(
            lookahead_contains(ab.as_ref(), &t),
            lookahead_contains(ba.as_ref(), &t)
        );
    }

    #[test]
    fn positive_and_positive(a in set_strategy(), b in set_strategy()) {
        prop_assert_eq!(
            lookahead_intersect(Some(&rule(&a, true)), Some(&rule(&b, true))),
            Some(rule(&a.intersection(&b).cloned().collect(), true))
        );
    }

    #[test]
    fn positive_and_negative(a in set_strategy(), b in set_strategy()) {
        let expected = Some(rule(&a.difference(&b).cloned().collect(), true));
        prop_assert_eq!(
            lookahead_intersect(Some(&rule(&a, true)), Some(&rule(&b, false))),
            expected.clone()
        );
        prop_assert_eq!(
            lookahead_intersect(Some(&rule(&b, false)), Some(&rule(&a, true))),
            expected
        );
    }

    #[test]
    fn negative_and_negative(a in set_strategy(), b in set_strategy()) {
        prop_assert_eq!(
            lookahead_intersect(Some(&rule(&a, false)), Some(&rule(&b, false))),
            Some(rule(&a.union(&b).cloned().collect(), false))
        );
    }

    #[test]
    fn no_restriction_is_the_identity(r in rule_strategy()) {
        prop_assert_eq!(lookahead_intersect(r.as_ref(), None), r.clone());
        prop_assert_eq!(lookahead_intersect(None, r.as_ref()), r);
    }

    #[test]
    fn snake_case_survives_camel_case(name in "[a-z]{2,6}(_[a-z]{2,6}){0,3}") {
        let cc = CaseConverter::new();
        prop_assert_eq!(cc.to_snake(&cc.to_camel(&name)), name);
    }
}
