//! Property-based tests for the text parsers and the build id.

#[cfg(test)]
mod proptest_tests {
    use crate::bblayers::{parse_layer_list, ListTermination};
    use crate::resolver::{resolve, AnchorRef, RefPolicy};
    use crate::snapshot::BuildId;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn path_strategy() -> impl Strategy<Value = String> {
        "/[a-z0-9_.-]{1,12}(/[a-z0-9_.-]{1,12}){0,3}"
    }

    fn render_list(paths: &[String]) -> String {
        let mut content = String::from("# layers\nBBLAYERS ?= \" \\\n");
        for path in paths {
            content.push_str(&format!("  {} \\\n", path));
        }
        content.push_str("  \"\n");
        content
    }

    // ============================================================================
    // Layer list parser
    // ============================================================================

    proptest! {
        /// Property: every listed path comes back, in order, duplicates kept
        #[test]
        fn layer_list_preserves_order_and_duplicates(
            paths in prop::collection::vec(path_strategy(), 0..8)
        ) {
            let list = parse_layer_list(&render_list(&paths), "BBLAYERS");
            prop_assert_eq!(list.paths, paths);
            prop_assert_eq!(list.termination, ListTermination::Closed);
        }

        /// Property: dropping the closing quote keeps every path read so far
        #[test]
        fn unterminated_layer_list_is_best_effort(
            paths in prop::collection::vec(path_strategy(), 1..8)
        ) {
            let content = render_list(&paths);
            let truncated = content.trim_end().trim_end_matches('"');
            let list = parse_layer_list(truncated, "BBLAYERS");
            prop_assert_eq!(list.paths, paths);
            prop_assert_eq!(list.termination, ListTermination::Unterminated);
        }

        /// Property: the parser never panics on arbitrary input
        #[test]
        fn layer_list_never_panics(content in ".*") {
            let _ = parse_layer_list(&content, "BBLAYERS");
        }
    }

    // ============================================================================
    // Build id
    // ============================================================================

    proptest! {
        /// Property: the composed id does not depend on category order
        #[test]
        fn build_id_ignores_category_order(
            bsp in "[0-9A-Z]{4}",
            mut categories in prop::collection::vec("[a-z]{2,8}", 0..5)
        ) {
            let first = BuildId { bsp: bsp.clone(), variant: None, categories: categories.clone() }.compose();
            categories.reverse();
            let second = BuildId { bsp, variant: None, categories }.compose();
            prop_assert_eq!(first, second);
        }

        /// Property: parsing a composed id with known categories recovers it
        #[test]
        fn build_id_parse_recovers_parts(
            bsp in "[0-9A-Z]{4}",
            variant in prop::option::of("[0-9]{2}"),
            categories in prop::collection::btree_set("[a-z]{2,8}", 0..5)
        ) {
            let categories: Vec<String> = categories.into_iter().collect();
            let id = BuildId { bsp: bsp.clone(), variant: variant.clone(), categories: categories.clone() };
            let known: Vec<&str> = categories.iter().map(String::as_str).collect();

            let parsed = BuildId::parse(&id.compose(), &known);
            prop_assert_eq!(parsed.bsp, bsp);
            prop_assert_eq!(parsed.variant, variant);
            prop_assert_eq!(parsed.categories, categories);
        }
    }

    // ============================================================================
    // Reference resolution
    // ============================================================================

    proptest! {
        /// Property: on a development branch without force, the requested
        /// reference never wins
        #[test]
        fn development_anchor_discards_request(
            requested in "v[0-9]\\.[0-9]",
            target in prop::collection::btree_set("[a-z]{3,8}", 0..6)
        ) {
            let policy = RefPolicy::default();
            let anchor = AnchorRef::on_branch("develop");
            let resolved = resolve(&policy, &anchor, &target, &requested, false).unwrap();
            prop_assert_ne!(resolved.reference, requested);
        }

        /// Property: an anchor on a branch always yields a reference
        #[test]
        fn branch_anchor_always_resolves(
            branch in "[a-z/]{1,12}",
            target in prop::collection::btree_set("[a-z-]{1,12}", 0..6)
        ) {
            let target: BTreeSet<String> = target;
            let policy = RefPolicy { base_branch: "morty".to_string(), ..RefPolicy::default() };
            let anchor = AnchorRef::on_branch(branch);
            prop_assert!(resolve(&policy, &anchor, &target, "", false).is_some());
        }
    }
}
