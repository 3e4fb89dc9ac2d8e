//! Interactive navigation over a built tree.
//!
//! A [`TreeBrowser`] borrows the tree, so the tree cannot change underneath
//! it:
//!
//! ```rust,compile_fail
//! use histree::HistoryTree;
//!
//! let mut tree = HistoryTree::new();
//! tree.add("a.x", 1, (0, 10)).unwrap();
//! let browser = tree.browse();
//! tree.add("b.y", 2, (0, 10)).unwrap();
//! assert!(browser.children().contains("a"));
//! ```

use crate::{domain, HistreeError, Result, TreeNode, ValueRecord};
use std::collections::BTreeSet;

/// Read-only view of one node and the names of its children, captured when
/// the browser was created.
#[derive(Debug, Clone)]
pub struct TreeBrowser<'a> {
    node: &'a TreeNode,
    path: String,
    children: BTreeSet<String>,
}

impl<'a> TreeBrowser<'a> {
    pub(crate) fn new(node: &'a TreeNode, path: String) -> Self {
        let children = node.child_names().map(str::to_string).collect();
        Self {
            node,
            path,
            children,
        }
    }

    pub fn children(&self) -> &BTreeSet<String> {
        &self.children
    }

    /// Dotted path of the browsed node; empty at the root.
    pub fn current_path(&self) -> &str {
        &self.path
    }

    /// Records stored on the browsed node, in insertion order.
    pub fn history(&self) -> &'a [ValueRecord] {
        self.node.history()
    }

    /// Browse into child `segment`.
    pub fn descend(&self, segment: &str) -> Result<TreeBrowser<'a>> {
        let child = self
            .node
            .child(segment)
            .ok_or_else(|| HistreeError::UnknownSegment {
                path: self.path.clone(),
                segment: segment.to_string(),
            })?;
        Ok(TreeBrowser::new(child, domain::join(&self.path, segment)))
    }
}

impl std::fmt::Display for TreeBrowser<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\"", self.path)
    }
}
