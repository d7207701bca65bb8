//! Directory-tree serialization
//!
//! An install layout is authored as a nested tree where the parent owns its
//! child subtrees. The relational form is flat: one Directory row per node
//! with the parent's identifier as a foreign key. [`serialize_directories`]
//! performs that flattening as a lazy pre-order traversal.

use std::collections::HashSet;

use msikit_core::error::{Error, Result};
use msikit_core::tables::Directory;

/// Defensive bound on traversal depth. The owned tree cannot alias into a
/// loop, but the serializer must never spin forever on a misused structure.
const MAX_DEPTH: usize = 256;

/// A node in the authored directory tree.
///
/// Identifiers are caller-supplied and must be unique across the whole tree;
/// the serializer checks but never generates them.
#[derive(Debug, Clone)]
pub struct DirectoryTree {
    pub id: String,
    pub default_dir: String,
    pub children: Vec<DirectoryTree>,
}

impl DirectoryTree {
    /// A leaf node with no children
    pub fn new(id: impl Into<String>, default_dir: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            default_dir: default_dir.into(),
            children: Vec::new(),
        }
    }

    /// Attach a child subtree
    #[must_use]
    pub fn with_child(mut self, child: DirectoryTree) -> Self {
        self.children.push(child);
        self
    }

    /// Total number of nodes in this subtree
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Self::node_count).sum::<usize>()
    }
}

/// Flatten a directory tree into Directory rows, pre-order.
///
/// The returned iterator is lazy, finite, and single-pass: each node yields
/// one row carrying its parent's identifier (`None` for the root). Traversal
/// stops at the first error; restarting requires calling this again.
pub fn serialize_directories(root: &DirectoryTree) -> DirectoryRows<'_> {
    DirectoryRows {
        stack: vec![Pending {
            node: root,
            parent: None,
            depth: 0,
        }],
        seen: HashSet::new(),
        done: false,
    }
}

struct Pending<'a> {
    node: &'a DirectoryTree,
    parent: Option<&'a str>,
    depth: usize,
}

/// Lazy pre-order row sequence produced by [`serialize_directories`]
pub struct DirectoryRows<'a> {
    stack: Vec<Pending<'a>>,
    seen: HashSet<&'a str>,
    done: bool,
}

impl<'a> Iterator for DirectoryRows<'a> {
    type Item = Result<Directory>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let Pending { node, parent, depth } = self.stack.pop()?;

        if depth > MAX_DEPTH {
            self.done = true;
            return Some(Err(Error::cycle(node.id.clone())));
        }
        if !self.seen.insert(node.id.as_str()) {
            self.done = true;
            return Some(Err(Error::duplicate_identifier(node.id.clone())));
        }

        // Reverse so the first child is popped first.
        for child in node.children.iter().rev() {
            self.stack.push(Pending {
                node: child,
                parent: Some(node.id.as_str()),
                depth: depth + 1,
            });
        }

        Some(Ok(Directory {
            directory: node.id.clone(),
            directory_parent: parent.map(str::to_string),
            default_dir: node.default_dir.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> DirectoryTree {
        DirectoryTree::new("TARGETDIR", "SourceDir").with_child(
            DirectoryTree::new("ProgramFilesFolder", ".")
                .with_child(DirectoryTree::new("INSTALLDIR", "Example")),
        )
    }

    #[test]
    fn test_one_row_per_node_with_parent_ids() {
        let tree = sample_tree();
        let rows: Vec<Directory> = serialize_directories(&tree)
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(rows.len(), tree.node_count());
        assert_eq!(rows[0].directory, "TARGETDIR");
        assert_eq!(rows[0].directory_parent, None);
        assert_eq!(rows[1].directory, "ProgramFilesFolder");
        assert_eq!(rows[1].directory_parent.as_deref(), Some("TARGETDIR"));
        assert_eq!(rows[2].directory, "INSTALLDIR");
        assert_eq!(rows[2].directory_parent.as_deref(), Some("ProgramFilesFolder"));
    }

    #[test]
    fn test_preorder_visits_parent_before_children() {
        let tree = DirectoryTree::new("root", ".")
            .with_child(
                DirectoryTree::new("a", ".")
                    .with_child(DirectoryTree::new("a1", "."))
                    .with_child(DirectoryTree::new("a2", ".")),
            )
            .with_child(DirectoryTree::new("b", "."));
        let ids: Vec<String> = serialize_directories(&tree)
            .map(|r| r.unwrap().directory)
            .collect();
        assert_eq!(ids, vec!["root", "a", "a1", "a2", "b"]);
    }

    #[test]
    fn test_duplicate_identifier_stops_traversal() {
        let tree = DirectoryTree::new("root", ".")
            .with_child(DirectoryTree::new("dup", "."))
            .with_child(DirectoryTree::new("dup", "."));
        let mut rows = serialize_directories(&tree);

        assert!(rows.next().unwrap().is_ok());
        assert!(rows.next().unwrap().is_ok());
        let err = rows.next().unwrap().unwrap_err();
        assert!(matches!(err, Error::DuplicateIdentifier { ref id } if id == "dup"));
        assert!(rows.next().is_none(), "iterator fuses after an error");
    }

    #[test]
    fn test_depth_guard_reports_cycle() {
        let mut tree = DirectoryTree::new("d0", ".");
        for i in (1..=MAX_DEPTH + 1).rev() {
            tree = DirectoryTree::new(format!("d{i}"), ".").with_child(tree);
        }
        // The resulting chain is deeper than any sane layout; the serializer
        // must bail instead of walking forever on a structure this shape.
        let last = serialize_directories(&tree).last().unwrap();
        assert!(matches!(last.unwrap_err(), Error::Cycle { .. }));
    }

    #[test]
    fn test_single_node_tree() {
        let tree = DirectoryTree::new("TARGETDIR", "SourceDir");
        let rows: Vec<Directory> = serialize_directories(&tree)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].directory_parent.is_none());
    }
}
