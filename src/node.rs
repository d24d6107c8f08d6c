use std::{fmt::Debug, ptr::NonNull};

use crate::{Color, Node, NodePtr, NodePtrExt};

// Public API.
impl<K, V> Node<K, V> {
    pub(crate) fn new(key: K, value: V) -> Self {
        Node {
            parent: None,
            left: None,
            right: None,
            color: Color::Black,
            key,
            value,
        }
    }

    #[inline(always)]
    pub fn key(&self) -> &K {
        &self.key
    }

    #[inline(always)]
    pub fn value(&self) -> &V {
        &self.value
    }

    #[inline(always)]
    pub fn color(&self) -> Color {
        self.color
    }

    #[inline(always)]
    pub fn is_black(&self) -> bool {
        self.color == Color::Black
    }

    #[inline(always)]
    pub fn is_red(&self) -> bool {
        self.color == Color::Red
    }

    #[inline(always)]
    pub fn parent(&self) -> Option<&Node<K, V>> {
        // SAFETY: a linked node never outlives the tree borrowed through self.
        self.parent.map(|p| unsafe { p.as_ref() })
    }

    #[inline(always)]
    pub fn left(&self) -> Option<&Node<K, V>> {
        // SAFETY: child links always point to live nodes.
        self.left.map(|p| unsafe { p.as_ref() })
    }

    #[inline(always)]
    pub fn right(&self) -> Option<&Node<K, V>> {
        // SAFETY: child links always point to live nodes.
        self.right.map(|p| unsafe { p.as_ref() })
    }

    /// Number of edges between this node and the root; the root is at depth 0.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut parent = self.parent;
        while parent.is_some() {
            depth += 1;
            parent = parent.parent();
        }
        depth
    }

    /// The in-order successor.
    #[inline(always)]
    pub fn next(&self) -> Option<&Node<K, V>> {
        // SAFETY: the successor lives in the same tree as self.
        self.next_ptr().map(|p| unsafe { p.as_ref() })
    }

    /// The in-order predecessor.
    #[inline(always)]
    pub fn prev(&self) -> Option<&Node<K, V>> {
        // SAFETY: the predecessor lives in the same tree as self.
        self.prev_ptr().map(|p| unsafe { p.as_ref() })
    }
}

impl<K, V> Node<K, V> {
    pub(crate) fn next_ptr(&self) -> NodePtr<K, V> {
        // If we have a right-hand child, go down and then left as far as we
        // can.
        if let Some(mut current) = self.right {
            // SAFETY: child links always point to live nodes.
            while let Some(left) = unsafe { current.as_ref() }.left {
                current = left;
            }
            return Some(current);
        }

        // No right-hand children. Everything down and left is smaller than us,
        // so any 'next' node must be in the general direction of our parent:
        // keep going up while we are a right-hand child; the first ancestor
        // we reach from its left is our 'next' node.
        let mut node: NodePtr<K, V> = Some(NonNull::from(self));
        let mut parent = self.parent;
        while parent.is_some() && parent.right() == node {
            node = parent;
            parent = parent.parent();
        }
        parent
    }

    pub(crate) fn prev_ptr(&self) -> NodePtr<K, V> {
        // Mirror of next_ptr: down-left then right as far as we can, or up
        // until we come from a right-hand child.
        if let Some(mut current) = self.left {
            // SAFETY: child links always point to live nodes.
            while let Some(right) = unsafe { current.as_ref() }.right {
                current = right;
            }
            return Some(current);
        }

        let mut node: NodePtr<K, V> = Some(NonNull::from(self));
        let mut parent = self.parent;
        while parent.is_some() && parent.left() == node {
            node = parent;
            parent = parent.parent();
        }
        parent
    }

    pub(crate) fn into_entry(self) -> (K, V) {
        (self.key, self.value)
    }
}

impl<K, V> Debug for Node<K, V>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "{:?}::({:?},{:?})",
            self.color, self.key, self.value
        ))
    }
}
