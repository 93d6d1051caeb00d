//! Property-based tests for URI template expansion and extraction.

use paginar::{Expansion, ParamValue, UriTemplate, UrlMatcher};
use proptest::prelude::*;

// ===== Strategy definitions =====

/// Values that exercise percent-encoding without degenerate shapes:
/// non-empty, no leading/trailing whitespace ambiguity.
fn value_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9][a-z0-9 _.-]{0,18}"
}

fn binding(name: &str, value: &str) -> (String, ParamValue) {
    (name.to_string(), ParamValue::from(value))
}

// ===== Round-trip properties =====

proptest! {
    /// Expanding a template and matching the result back recovers the
    /// original bindings.
    #[test]
    fn prop_expand_then_extract_round_trips(id in value_strategy(), page in value_strategy()) {
        let template = UriTemplate::parse("/items{/id}{?page}").unwrap();
        let bindings: Expansion = [binding("id", &id), binding("page", &page)]
            .into_iter()
            .collect();
        let url = template.expand(&bindings);
        let mappings = template.extract(&url).unwrap();
        prop_assert_eq!(mappings.get("id").map(String::as_str), Some(id.as_str()));
        prop_assert_eq!(mappings.get("page").map(String::as_str), Some(page.as_str()));
    }

    /// A matcher declared from the same template accepts the expansion,
    /// and expected bindings filter it.
    #[test]
    fn prop_matcher_accepts_own_expansion(id in value_strategy()) {
        let template = UriTemplate::parse("/items{/id}").unwrap();
        let bindings: Expansion = [binding("id", &id)].into_iter().collect();
        let url = template.expand(&bindings);
        let matcher = UrlMatcher::template("/items{/id}").unwrap();
        prop_assert!(matcher.matches(&url));
        prop_assert!(matcher.matches_with(&url, &bindings));

        let wrong: Expansion = [binding("id", &format!("{id}x"))].into_iter().collect();
        prop_assert!(!matcher.matches_with(&url, &wrong));
    }

    /// Any explicit binding disables all defaults; no bindings means all
    /// defaults. There is no per-key merge in between.
    #[test]
    fn prop_default_expansion_is_all_or_nothing(
        username in value_strategy(),
        sort in value_strategy(),
    ) {
        let template = UriTemplate::parse("/users{/username}{?sort}").unwrap();
        let defaults: Expansion = [binding("username", &username), binding("sort", "asc")]
            .into_iter()
            .collect();
        let explicit: Expansion = [binding("sort", &sort)].into_iter().collect();

        prop_assert_eq!(
            template.expand_or_defaults(&Expansion::new(), &defaults),
            template.expand(&defaults)
        );
        prop_assert_eq!(
            template.expand_or_defaults(&explicit, &defaults),
            template.expand(&explicit)
        );
    }

    /// Unbound variables always expand to nothing.
    #[test]
    fn prop_unbound_variables_vanish(id in value_strategy()) {
        let template = UriTemplate::parse("/items{/id}{?page}").unwrap();
        let bindings: Expansion = [binding("id", &id)].into_iter().collect();
        let url = template.expand(&bindings);
        prop_assert!(!url.contains('?'));
        prop_assert!(url.starts_with("/items/"));
    }
}
