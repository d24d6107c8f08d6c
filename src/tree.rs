use std::{borrow::Borrow, cmp::Ordering::*, fmt::Debug, marker::PhantomData, ptr::NonNull};

use crate::{
    Node, NodePtr, NodePtrExt, Tree,
    alloc::{leak_alloc_node, own_back},
    iter::{Iter, Nodes},
};

impl<K, V> Drop for Tree<K, V> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K, V> Default for Tree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Debug, V: Debug> Debug for Tree<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

// Public
impl<K, V> Tree<K, V> {
    pub const fn new() -> Self {
        Tree {
            root: None,
            len: 0,
            _marker: PhantomData,
        }
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn root(&self) -> Option<&Node<K, V>> {
        // SAFETY: the root lives as long as the tree.
        self.root.map(|r| unsafe { r.as_ref() })
    }

    pub fn clear(&mut self) {
        let mut current = self.root.take();
        self.len = 0;
        // Post-order: walk down to a leaf, unhook it from its parent, free
        // it, then resume from the parent. No recursion, so degenerate trees
        // of any height are fine.
        while let Some(node) = current {
            // SAFETY: every node reachable from the old root is still live.
            let node_ref = unsafe { node.as_ref() };
            if node_ref.left.is_some() {
                current = node_ref.left;
                continue;
            }
            if node_ref.right.is_some() {
                current = node_ref.right;
                continue;
            }
            let parent = node_ref.parent;
            if let Some(mut parent) = parent {
                // SAFETY: parent is live and only reachable through us here.
                let parent = unsafe { parent.as_mut() };
                if parent.left == current {
                    parent.left = None;
                } else {
                    parent.right = None;
                }
            }
            current = parent;
            // drop; don't go through erase => needless relinking.
            // SAFETY: node is a leaf nothing points to anymore.
            drop(unsafe { own_back(node) });
        }
    }

    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        Self::find_min(self.root).map(|e| {
            // SAFETY: e is a live node of this tree.
            let e = unsafe { e.as_ref() };
            (e.key(), e.value())
        })
    }

    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        Self::find_max(self.root).map(|e| {
            // SAFETY: e is a live node of this tree.
            let e = unsafe { e.as_ref() };
            (e.key(), e.value())
        })
    }

    pub fn pop_first(&mut self) -> Option<(K, V)> {
        let first = Self::find_min(self.root);
        self.erase(first)
    }

    pub fn pop_last(&mut self) -> Option<(K, V)> {
        let last = Self::find_max(self.root);
        self.erase(last)
    }

    /// In-order iterator over keys and values.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self.nodes())
    }

    /// In-order iterator over the nodes themselves, for callers that need
    /// colors and links.
    pub fn nodes(&self) -> Nodes<'_, K, V> {
        Nodes::new(Self::find_min(self.root), Self::find_max(self.root), self.len)
    }

    /// Every `(parent, child)` pair, in the in-order of the child.
    pub fn edges(&self) -> impl Iterator<Item = (&Node<K, V>, &Node<K, V>)> {
        self.nodes()
            .filter_map(|child| child.parent().map(|parent| (parent, child)))
    }

    /// Number of nodes on the longest root-to-leaf path.
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut stack: Vec<(NonNull<Node<K, V>>, usize)> =
            self.root.into_iter().map(|root| (root, 1)).collect();
        while let Some((node, depth)) = stack.pop() {
            height = height.max(depth);
            // SAFETY: node is a live node of this tree.
            let node = unsafe { node.as_ref() };
            stack.extend(node.left.map(|left| (left, depth + 1)));
            stack.extend(node.right.map(|right| (right, depth + 1)));
        }
        height
    }
}

impl<K, V> Tree<K, V> {
    /// Inserts without rebalancing. Keys equal to an existing one go to its
    /// right, so equal keys iterate in insertion order.
    pub fn insert(&mut self, key: K, value: V) -> &Node<K, V>
    where
        K: Ord,
    {
        let node = self.attach(key, value);
        // SAFETY: node was just linked into this tree, borrowed for the
        // returned lifetime.
        unsafe { node.as_ref() }
    }

    /// Finds a node whose key compares equal to `key`.
    pub fn search<Q>(&self, key: &Q) -> Option<&Node<K, V>>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        // SAFETY: the node lives as long as the borrow of the tree.
        self.search_ptr(key).map(|e| unsafe { e.as_ref() })
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.search_ptr(key).is_some()
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.search(key).map(Node::value)
    }

    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.search(key).map(|e| (e.key(), e.value()))
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        // SAFETY: &mut self grants exclusive access to every node.
        self.search_ptr(key)
            .map(|mut e| &mut unsafe { e.as_mut() }.value)
    }

    /// Deletes one entry with this key; `false` if there is none.
    pub fn delete<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.remove_entry(key).is_some()
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.remove_entry(key).map(|(_, v)| v)
    }

    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let node = self.search_ptr(key);
        self.erase(node)
    }
}

// Structural operations, shared with the red-black policy.
impl<K, V> Tree<K, V> {
    /// Links a new black leaf at the first absent position on the search
    /// path and returns it.
    pub(crate) fn attach(&mut self, key: K, value: V) -> NonNull<Node<K, V>>
    where
        K: Ord,
    {
        let mut parent: NodePtr<K, V> = None;
        let mut current = self.root;
        let mut goes_left = false;
        while let Some(candidate) = current {
            parent = current;
            // SAFETY: child links always point to live nodes.
            let candidate = unsafe { candidate.as_ref() };
            goes_left = key < candidate.key;
            current = if goes_left {
                candidate.left
            } else {
                candidate.right
            };
        }

        let node = leak_alloc_node(key, value);
        if parent.is_none() {
            self.root = Some(node);
        } else if goes_left {
            parent.link_left(Some(node));
        } else {
            parent.link_right(Some(node));
        }
        self.len += 1;
        node
    }

    pub(crate) fn search_ptr<Q>(&self, key: &Q) -> NodePtr<K, V>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let mut current = self.root;
        while let Some(candidate) = current {
            // SAFETY: child links always point to live nodes.
            let candidate = unsafe { candidate.as_ref() };
            match key.cmp(candidate.key.borrow()) {
                Equal => break,
                Greater => current = candidate.right,
                Less => current = candidate.left,
            }
        }
        current
    }

    /// Puts `to` where `from` hangs: as the matching child of `from`'s
    /// parent, or as the root. `from` keeps its own links.
    pub(crate) fn transplant(&mut self, from: NodePtr<K, V>, mut to: NodePtr<K, V>) {
        debug_assert!(from.is_some(), "cannot transplant an absent subtree");
        let mut parent = from.parent();
        if parent.is_none() {
            to.set_parent(None);
            self.root = to;
        } else if parent.left() == from {
            parent.link_left(to);
        } else {
            parent.link_right(to);
        }
    }

    pub(crate) fn find_min(node: NodePtr<K, V>) -> NodePtr<K, V> {
        let mut current = node?;
        // SAFETY: child links always point to live nodes.
        while let Some(left) = unsafe { current.as_ref() }.left {
            current = left;
        }
        Some(current)
    }

    pub(crate) fn find_max(node: NodePtr<K, V>) -> NodePtr<K, V> {
        let mut current = node?;
        // SAFETY: child links always point to live nodes.
        while let Some(right) = unsafe { current.as_ref() }.right {
            current = right;
        }
        Some(current)
    }

    /// Unlinks `node` without any rebalancing and frees it.
    pub(crate) fn erase(&mut self, node: NodePtr<K, V>) -> Option<(K, V)> {
        let target = node?;

        if node.left().is_none() {
            self.transplant(node, node.right());
        } else if node.right().is_none() {
            self.transplant(node, node.left());
        } else {
            let mut successor = Self::find_min(node.right());
            if successor.parent() != node {
                self.transplant(successor, successor.right());
                successor.link_right(node.right());
            }
            self.transplant(node, successor);
            successor.link_left(node.left());
        }

        self.len -= 1;
        // SAFETY: target is no longer reachable from the root.
        Some(unsafe { own_back(target) }.into_entry())
    }
}
