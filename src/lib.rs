//! An ordered multimap backed by a red-black tree.
//!
//! [`Tree`] is a plain binary search tree: it owns the nodes and provides the
//! structural operations (insert, search, transplant, delete). [`RBTree`]
//! wraps a [`Tree`] and keeps it balanced by coloring its nodes and repairing
//! the coloring after every insert and delete.
//!
//! Duplicate keys are accepted; equal keys keep their insertion order.
mod alloc;
mod iter;
mod node;
mod rbtree;
mod tree;
mod validate;

use std::{marker::PhantomData, ptr::NonNull};

pub use iter::{Iter, Nodes};
pub use validate::Violation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Black,
}

pub(crate) type NodePtr<K, V> = Option<NonNull<Node<K, V>>>;

/// Link helpers over possibly absent nodes. Reads on an absent node see a
/// black node without children; writes to an absent node are dropped.
pub(crate) trait NodePtrExt {
    type Key;
    type Value;

    fn color(&self) -> Color;
    fn is_black(&self) -> bool;
    fn is_red(&self) -> bool;
    fn left(&self) -> NodePtr<Self::Key, Self::Value>;
    fn parent(&self) -> NodePtr<Self::Key, Self::Value>;
    fn right(&self) -> NodePtr<Self::Key, Self::Value>;
    fn link_left(&mut self, left: NodePtr<Self::Key, Self::Value>);
    fn link_right(&mut self, right: NodePtr<Self::Key, Self::Value>);
    fn set_color(&mut self, color: Color);
    fn set_parent(&mut self, parent: NodePtr<Self::Key, Self::Value>);
}

impl<K, V> NodePtrExt for NodePtr<K, V> {
    type Key = K;
    type Value = V;

    #[inline(always)]
    fn color(&self) -> Color {
        self.map_or(Color::Black, |v| unsafe { v.as_ref() }.color)
    }

    #[inline(always)]
    fn is_black(&self) -> bool {
        self.color() == Color::Black
    }

    #[inline(always)]
    fn is_red(&self) -> bool {
        self.color() == Color::Red
    }

    #[inline(always)]
    fn left(&self) -> NodePtr<Self::Key, Self::Value> {
        self.and_then(|v| unsafe { v.as_ref() }.left)
    }

    #[inline(always)]
    fn parent(&self) -> NodePtr<Self::Key, Self::Value> {
        self.and_then(|v| unsafe { v.as_ref() }.parent)
    }

    #[inline(always)]
    fn right(&self) -> NodePtr<Self::Key, Self::Value> {
        self.and_then(|v| unsafe { v.as_ref() }.right)
    }

    /// Sets the left child and points its parent link back at us.
    #[inline(always)]
    fn link_left(&mut self, mut left: NodePtr<Self::Key, Self::Value>) {
        let parent = *self;
        if let Some(mut node) = parent {
            unsafe { node.as_mut() }.left = left;
            left.set_parent(parent);
        }
    }

    /// Sets the right child and points its parent link back at us.
    #[inline(always)]
    fn link_right(&mut self, mut right: NodePtr<Self::Key, Self::Value>) {
        let parent = *self;
        if let Some(mut node) = parent {
            unsafe { node.as_mut() }.right = right;
            right.set_parent(parent);
        }
    }

    #[inline(always)]
    fn set_color(&mut self, color: Color) {
        if let Some(node) = self {
            unsafe { node.as_mut() }.color = color;
        }
    }

    #[inline(always)]
    fn set_parent(&mut self, parent: NodePtr<Self::Key, Self::Value>) {
        if let Some(node) = self {
            unsafe { node.as_mut() }.parent = parent;
        }
    }
}

pub struct Node<K, V> {
    // Back-link for upward traversal only; it never owns the parent.
    pub(crate) parent: NodePtr<K, V>,
    // Owning child links.
    pub(crate) left: NodePtr<K, V>,
    pub(crate) right: NodePtr<K, V>,
    pub(crate) color: Color,
    key: K,
    value: V,
}

/// An unbalanced binary search tree.
///
/// Every operation is O(h), where h is the height of the tree; inserting
/// sorted keys degrades it into a list. See [`RBTree`] for the balanced
/// variant.
pub struct Tree<K, V> {
    root: NodePtr<K, V>,
    len: usize,
    _marker: PhantomData<Box<Node<K, V>>>,
}

/// A red-black tree: a [`Tree`] whose height stays within `2 * log2(n + 1)`.
pub struct RBTree<K, V> {
    tree: Tree<K, V>,
}

// SAFETY: the tree owns its nodes exclusively; the raw links never escape
// without a borrow of the tree.
unsafe impl<K: Send, V: Send> Send for Tree<K, V> {}
unsafe impl<K: Sync, V: Sync> Sync for Tree<K, V> {}
