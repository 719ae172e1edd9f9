//! Property-based tests for human path recovery

use cafs::tree::path::{collapse_separators, relative_path};
use proptest::prelude::*;

proptest! {
    #[test]
    fn collapse_leaves_no_double_separators(path in "[a/]{0,24}") {
        let collapsed = collapse_separators(&path);
        prop_assert!(!collapsed.contains("//"));
        prop_assert_eq!(collapse_separators(&collapsed), collapsed.clone());
    }

    #[test]
    fn relative_path_is_rooted_and_normalized(
        rest in prop::collection::vec("[a-z]{1,6}", 0..4),
        doubled in any::<bool>(),
    ) {
        let prefix = "/cas/0123abcd";
        let separator = if doubled { "//" } else { "/" };
        let logical = format!("{}{}{}", prefix, separator, rest.join(separator));

        let relative = relative_path(&logical, prefix);
        prop_assert!(relative.starts_with('/'));
        prop_assert!(!relative.contains("//"));
        prop_assert_eq!(relative.trim_start_matches('/'), rest.join("/"));
    }
}
