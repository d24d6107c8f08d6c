use crate::{Node, NodePtr};
use std::{iter::FusedIterator, marker::PhantomData};

/// An iterator over shared references to `Node`s in in-order traversal.
pub struct Nodes<'a, K, V> {
    front: NodePtr<K, V>,
    back: NodePtr<K, V>,
    remaining: usize,
    phantom: PhantomData<&'a Node<K, V>>,
}

/// An iterator over the keys and values of a tree, in key order.
pub struct Iter<'a, K, V> {
    nodes: Nodes<'a, K, V>,
}

impl<'a, K, V> Nodes<'a, K, V> {
    /// `front` and `back` are the first and last nodes of a tree holding
    /// `len` nodes.
    pub(crate) fn new(front: NodePtr<K, V>, back: NodePtr<K, V>, len: usize) -> Self {
        Nodes {
            front,
            back,
            remaining: len,
            phantom: PhantomData,
        }
    }
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(nodes: Nodes<'a, K, V>) -> Self {
        Iter { nodes }
    }
}

impl<K, V> Clone for Nodes<'_, K, V> {
    fn clone(&self) -> Self {
        Nodes {
            front: self.front,
            back: self.back,
            remaining: self.remaining,
            phantom: PhantomData,
        }
    }
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Iter {
            nodes: self.nodes.clone(),
        }
    }
}

impl<'a, K, V> Iterator for Nodes<'a, K, V> {
    type Item = &'a Node<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        // SAFETY: remaining > 0, so front is a live node of the borrowed tree.
        let current = unsafe { self.front?.as_ref() };
        self.front = current.next_ptr();
        self.remaining -= 1;
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K: 'a, V: 'a> DoubleEndedIterator for Nodes<'a, K, V> {
    fn next_back(&mut self) -> Option<&'a Node<K, V>> {
        if self.remaining == 0 {
            return None;
        }
        // SAFETY: remaining > 0, so back is a live node of the borrowed tree.
        let current = unsafe { self.back?.as_ref() };
        self.back = current.prev_ptr();
        self.remaining -= 1;
        Some(current)
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.nodes.next().map(|node| (node.key(), node.value()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.nodes.size_hint()
    }
}

impl<'a, K: 'a, V: 'a> DoubleEndedIterator for Iter<'a, K, V> {
    fn next_back(&mut self) -> Option<(&'a K, &'a V)> {
        self.nodes.next_back().map(|node| (node.key(), node.value()))
    }
}

impl<K, V> ExactSizeIterator for Nodes<'_, K, V> {}
impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Nodes<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

// SAFETY: both iterators only hand out shared references into a borrowed
// tree, like `&Tree` does.
unsafe impl<K: Sync, V: Sync> Send for Nodes<'_, K, V> {}
unsafe impl<K: Sync, V: Sync> Sync for Nodes<'_, K, V> {}
unsafe impl<K: Sync, V: Sync> Send for Iter<'_, K, V> {}
unsafe impl<K: Sync, V: Sync> Sync for Iter<'_, K, V> {}
