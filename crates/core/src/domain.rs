//! Dotted domain paths.

/// Join two path fragments with a single `.`.
///
/// Leading and trailing dots are stripped from both sides first; an empty
/// parent yields the child unchanged.
pub fn join(parent: &str, child: &str) -> String {
    let parent = parent.trim_matches('.');
    let child = child.trim_matches('.');
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{parent}.{child}")
    }
}

/// Segments of `path`. The empty path has none and addresses the root.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').filter(move |_| !path.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_cases() {
        assert_eq!(join("", "x"), "x");
        assert_eq!(join("a", "b"), "a.b");
        assert_eq!(join(".a.", ".b."), "a.b");
        assert_eq!(join("a.b", "c.d"), "a.b.c.d");
        assert_eq!(join("...", "x"), "x");
    }

    #[test]
    fn join_with_empty_child_keeps_trailing_dot() {
        assert_eq!(join("a", ""), "a.");
    }

    #[test]
    fn segments_split_on_dots() {
        assert_eq!(segments("a.b.c").collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(segments("a").collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(segments("").count(), 0);
    }
}
