use std::fmt;

use crate::{Color, NodePtr, NodePtrExt, RBTree, Tree};

/// The first broken invariant found by [`Tree::validate`] or
/// [`RBTree::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// The root is red.
    RedRoot,
    /// A red node has a red child.
    RedRedEdge,
    /// The two subtrees of a node hold different numbers of black nodes on
    /// their paths down to an absent child.
    BlackHeightMismatch { left: usize, right: usize },
    /// In-order traversal is not sorted.
    OutOfOrder,
    /// A child does not point back at its parent, or the root has a parent.
    BrokenParentLink,
    /// The node count differs from the recorded length.
    LengthMismatch { expected: usize, found: usize },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::RedRoot => f.write_str("root is red"),
            Violation::RedRedEdge => f.write_str("red node with a red child"),
            Violation::BlackHeightMismatch { left, right } => {
                write!(f, "black-height mismatch: {left} on the left, {right} on the right")
            }
            Violation::OutOfOrder => f.write_str("keys out of order"),
            Violation::BrokenParentLink => f.write_str("parent link does not match child link"),
            Violation::LengthMismatch { expected, found } => {
                write!(f, "length is {expected} but the tree holds {found} nodes")
            }
        }
    }
}

impl std::error::Error for Violation {}

impl<K: Ord, V> Tree<K, V> {
    /// Checks the links, the key order and the length.
    pub fn validate(&self) -> Result<(), Violation> {
        if self.root.parent().is_some() {
            return Err(Violation::BrokenParentLink);
        }

        // In-order with an explicit stack: this must not trust the parent
        // links it is checking.
        let mut stack = Vec::new();
        let mut current = self.root;
        let mut previous: Option<&K> = None;
        let mut found = 0;
        loop {
            while let Some(node) = current {
                stack.push(node);
                // SAFETY: child links always point to live nodes.
                current = unsafe { node.as_ref() }.left;
            }
            let Some(node) = stack.pop() else {
                break;
            };
            // SAFETY: as above.
            let node_ref = unsafe { node.as_ref() };
            for child in [node_ref.left, node_ref.right] {
                if child.is_some() && child.parent() != Some(node) {
                    return Err(Violation::BrokenParentLink);
                }
            }
            if previous.is_some_and(|previous| previous > node_ref.key()) {
                return Err(Violation::OutOfOrder);
            }
            previous = Some(node_ref.key());
            found += 1;
            current = node_ref.right;
        }

        if found != self.len {
            return Err(Violation::LengthMismatch {
                expected: self.len,
                found,
            });
        }
        Ok(())
    }
}

impl<K: Ord, V> RBTree<K, V> {
    /// Checks everything [`Tree::validate`] does plus the coloring rules,
    /// and returns the black-height.
    pub fn validate(&self) -> Result<usize, Violation> {
        self.tree.validate()?;
        if self.tree.root.is_red() {
            return Err(Violation::RedRoot);
        }
        black_height(self.tree.root)
    }
}

/// Black nodes from `root` down to any absent child, `root` included.
///
/// Post-order with an explicit stack, so a degenerate tree cannot overflow
/// the call stack.
fn black_height<K, V>(root: NodePtr<K, V>) -> Result<usize, Violation> {
    let mut stack = vec![(root, false)];
    // Heights of finished subtrees, left before right.
    let mut heights = Vec::new();
    while let Some((node, expanded)) = stack.pop() {
        let Some(current) = node else {
            heights.push(0);
            continue;
        };
        // SAFETY: child links always point to live nodes.
        let current = unsafe { current.as_ref() };
        if !expanded {
            if current.is_red() && (current.left.is_red() || current.right.is_red()) {
                return Err(Violation::RedRedEdge);
            }
            stack.push((node, true));
            stack.push((current.right, false));
            stack.push((current.left, false));
            continue;
        }
        let right = heights.pop().unwrap_or_default();
        let left = heights.pop().unwrap_or_default();
        if left != right {
            return Err(Violation::BlackHeightMismatch { left, right });
        }
        heights.push(left + usize::from(current.color == Color::Black));
    }
    Ok(heights.pop().unwrap_or_default())
}
