use std::{borrow::Borrow, fmt::Debug, ptr::NonNull};

use log::{trace, warn};

use crate::{
    Color, Node, NodePtr, NodePtrExt, RBTree, Tree,
    alloc::own_back,
    iter::{Iter, Nodes},
};

#[cfg(test)]
thread_local! {
    /// How often delete_fixup found no sibling on this thread.
    pub(crate) static SIBLING_FALLBACKS: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

impl<K, V> Default for RBTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Debug, V: Debug> Debug for RBTree<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

// Read-only surface, served by the underlying tree.
impl<K, V> RBTree<K, V> {
    pub const fn new() -> Self {
        RBTree { tree: Tree::new() }
    }

    pub const fn len(&self) -> usize {
        self.tree.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn clear(&mut self) {
        self.tree.clear();
    }

    pub fn root(&self) -> Option<&Node<K, V>> {
        self.tree.root()
    }

    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.tree.first_key_value()
    }

    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.tree.last_key_value()
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        self.tree.iter()
    }

    pub fn nodes(&self) -> Nodes<'_, K, V> {
        self.tree.nodes()
    }

    pub fn edges(&self) -> impl Iterator<Item = (&Node<K, V>, &Node<K, V>)> {
        self.tree.edges()
    }

    pub fn height(&self) -> usize {
        self.tree.height()
    }

    /// Black nodes on the path from the root down its left spine. Every
    /// other root-to-leaf path has the same count.
    pub fn black_height(&self) -> usize {
        let mut height = 0;
        let mut current = self.tree.root;
        while current.is_some() {
            if current.is_black() {
                height += 1;
            }
            current = current.left();
        }
        height
    }

    pub fn search<Q>(&self, key: &Q) -> Option<&Node<K, V>>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.tree.search(key)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.tree.contains_key(key)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.tree.get(key)
    }

    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.tree.get_key_value(key)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.tree.get_mut(key)
    }
}

// Mutations, each followed by a fixup.
impl<K, V> RBTree<K, V> {
    /// Inserts a new entry, even if the key is already present; equal keys
    /// iterate in insertion order.
    pub fn insert(&mut self, key: K, value: V) -> &Node<K, V>
    where
        K: Ord,
    {
        let node = self.tree.attach(key, value);
        let mut ptr: NodePtr<K, V> = Some(node);
        ptr.set_color(Color::Red);
        self.insert_fixup(ptr);
        // SAFETY: fixups relink nodes but never free them; the tree is
        // borrowed for the returned lifetime.
        unsafe { node.as_ref() }
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
        let node = self.tree.search_ptr(key);
        self.erase(node)
    }

    pub fn pop_first(&mut self) -> Option<(K, V)> {
        let first = Tree::find_min(self.tree.root);
        self.erase(first)
    }

    pub fn pop_last(&mut self) -> Option<(K, V)> {
        let last = Tree::find_max(self.tree.root);
        self.erase(last)
    }
}

// Private

impl<K, V> RBTree<K, V> {
    /// Left rotation at `node`; nothing happens without a right child.
    ///
    /// ```text
    ///     |                   |
    ///    (n)                 (t)
    ///    / \                 / \
    ///   a  (t)     -->     (n)  c
    ///      / \             / \
    ///     b   c           a   b
    /// ```
    pub(crate) fn rotate_left(&mut self, mut node: NodePtr<K, V>) {
        let mut top = node.right();
        if top.is_none() {
            return;
        }
        self.tree.transplant(node, top);
        node.link_right(top.left());
        top.link_left(node);
    }

    /// Mirror of [`Self::rotate_left`].
    pub(crate) fn rotate_right(&mut self, mut node: NodePtr<K, V>) {
        let mut top = node.left();
        if top.is_none() {
            return;
        }
        self.tree.transplant(node, top);
        node.link_left(top.right());
        top.link_right(node);
    }

    fn insert_fixup(&mut self, mut node: NodePtr<K, V>) {
        /*
         * Loop invariant: node is red. Only node and its parent may both be
         * red; a missing parent reads as black and ends the loop.
         */
        while node.parent().is_red() {
            let mut parent = node.parent();
            // A red parent is never the root, so gparent exists.
            let mut gparent = parent.parent();

            if parent == gparent.left() {
                let mut uncle = gparent.right();
                if uncle.is_red() {
                    /*
                     * Case 1 - uncle is red (color flips).
                     *
                     *       G            g
                     *      / \          / \
                     *     p   u  -->   P   U
                     *    /            /
                     *   n            n
                     *
                     * g's parent may be red: recurse at g.
                     */
                    trace!("insert fixup: red uncle, recoloring");
                    uncle.set_color(Color::Black);
                    parent.set_color(Color::Black);
                    gparent.set_color(Color::Red);
                    node = gparent;
                    continue;
                }

                if node == parent.right() {
                    /*
                     * Case 2 - uncle is black and node is the inner
                     * grandchild (left rotate at parent).
                     *
                     *      G             G
                     *     / \           / \
                     *    p   U  -->    n   U
                     *     \           /
                     *      n         p
                     */
                    trace!("insert fixup: inner grandchild, rotating at parent");
                    node = parent;
                    self.rotate_left(node);
                    parent = node.parent();
                }

                /*
                 * Case 3 - uncle is black and node is the outer grandchild
                 * (right rotate at gparent).
                 *
                 *        G           P
                 *       / \         / \
                 *      p   U  -->  n   g
                 *     /                 \
                 *    n                   U
                 */
                trace!("insert fixup: outer grandchild, rotating at grandparent");
                parent.set_color(Color::Black);
                gparent.set_color(Color::Red);
                self.rotate_right(gparent);
                break;
            } else {
                let mut uncle = gparent.left();
                if uncle.is_red() {
                    /* Case 1 - color flips */
                    trace!("insert fixup: red uncle, recoloring");
                    uncle.set_color(Color::Black);
                    parent.set_color(Color::Black);
                    gparent.set_color(Color::Red);
                    node = gparent;
                    continue;
                }

                if node == parent.left() {
                    /* Case 2 - right rotate at parent */
                    trace!("insert fixup: inner grandchild, rotating at parent");
                    node = parent;
                    self.rotate_right(node);
                    parent = node.parent();
                }

                /* Case 3 - left rotate at gparent */
                trace!("insert fixup: outer grandchild, rotating at grandparent");
                parent.set_color(Color::Black);
                gparent.set_color(Color::Red);
                self.rotate_left(gparent);
                break;
            }
        }
        self.tree.root.set_color(Color::Black);
    }

    /// Unlinks `node`, restores the coloring and frees it.
    pub(crate) fn erase(&mut self, node: NodePtr<K, V>) -> Option<(K, V)> {
        let target: NonNull<Node<K, V>> = node?;

        // The color that disappears from the tree, and the position (child
        // under parent) that now lacks it.
        let mut lost = node.color();
        let child;
        let parent;

        if node.left().is_none() {
            child = node.right();
            parent = node.parent();
            self.tree.transplant(node, child);
        } else if node.right().is_none() {
            child = node.left();
            parent = node.parent();
            self.tree.transplant(node, child);
        } else {
            /*
             * Two children: the successor leaves its own slot and takes over
             * node's, along with node's color. What goes missing is the
             * successor's original color, at the successor's old slot.
             *
             *    (n)          (s)
             *    / \          / \
             *  (x) (y)  ->  (x) (y)
             *      /            /
             *    (p)          (p)
             *    /            /
             *  (s)          (c)
             *    \
             *    (c)
             */
            let mut successor = Tree::find_min(node.right());
            lost = successor.color();
            child = successor.right();
            if successor.parent() != node {
                parent = successor.parent();
                self.tree.transplant(successor, child);
                successor.link_right(node.right());
            } else {
                parent = successor;
            }
            self.tree.transplant(node, successor);
            successor.link_left(node.left());
            successor.set_color(node.color());
        }

        // Removing a red node leaves every black-height unchanged.
        if lost == Color::Black {
            self.delete_fixup(child, parent);
        }

        self.tree.len -= 1;
        // SAFETY: target is no longer reachable from the root.
        Some(unsafe { own_back(target) }.into_entry())
    }

    /// Repairs a missing black at `node`'s position. `node` may be absent,
    /// which is why its parent is passed along.
    fn delete_fixup(&mut self, mut node: NodePtr<K, V>, mut parent: NodePtr<K, V>) {
        /*
         * Loop invariants:
         * - node is black (or absent);
         * - node is not the root;
         * - all leaf paths through node have one black fewer than the
         *   other leaf paths through parent.
         */
        while node != self.tree.root && node.is_black() {
            if node.is_some() {
                parent = node.parent();
            }
            if parent.is_none() {
                break;
            }

            if parent.left() == node {
                let mut sibling = parent.right();
                if sibling.is_none() {
                    self.sibling_fallback();
                    node = parent;
                    continue;
                }

                if sibling.is_red() {
                    /*
                     * Case 1 - red sibling (left rotate at parent).
                     *
                     *     P               S
                     *    / \             / \
                     *   N   s    -->    p   Sr
                     *      / \         / \
                     *     Sl  Sr      N   Sl
                     */
                    trace!("delete fixup: red sibling, rotating at parent");
                    parent.set_color(Color::Red);
                    sibling.set_color(Color::Black);
                    self.rotate_left(parent);
                    sibling = parent.right();
                }

                if sibling.left().is_black() && sibling.right().is_black() {
                    /*
                     * Case 2 - sibling color flip
                     * (p could be either color here)
                     *
                     *    (p)           (p)
                     *    / \           / \
                     *   N   S    -->  N   s
                     *      / \           / \
                     *     Sl  Sr        Sl  Sr
                     *
                     * Both sides of p now lack a black: recurse at p, or
                     * stop right there if p is red.
                     */
                    trace!("delete fixup: black nephews, climbing");
                    sibling.set_color(Color::Red);
                    node = parent;
                } else {
                    if sibling.right().is_black() {
                        /*
                         * Case 3 - far nephew is black (right rotate at
                         * sibling).
                         *
                         *   (p)           (p)
                         *   / \           / \
                         *  N   S    -->  N   sl
                         *     / \             \
                         *    sl  Sr            S
                         *                       \
                         *                        Sr
                         */
                        trace!("delete fixup: near nephew red, rotating at sibling");
                        self.rotate_right(sibling);
                        sibling = parent.right();
                    }

                    /*
                     * Case 4 - far nephew is red (left rotate at parent +
                     * color flips).
                     *
                     *      (p)             (s)
                     *      / \             / \
                     *     N   S     -->   P   Sr
                     *        / \         / \
                     *      (sl) sr      N  (sl)
                     */
                    trace!("delete fixup: far nephew red, rotating at parent");
                    sibling.set_color(parent.color());
                    parent.set_color(Color::Black);
                    sibling.right().set_color(Color::Black);
                    self.rotate_left(parent);
                    break;
                }
            } else {
                let mut sibling = parent.left();
                if sibling.is_none() {
                    self.sibling_fallback();
                    node = parent;
                    continue;
                }

                if sibling.is_red() {
                    /* Case 1 - right rotate at parent */
                    trace!("delete fixup: red sibling, rotating at parent");
                    parent.set_color(Color::Red);
                    sibling.set_color(Color::Black);
                    self.rotate_right(parent);
                    sibling = parent.left();
                }

                if sibling.left().is_black() && sibling.right().is_black() {
                    /* Case 2 - sibling color flip */
                    trace!("delete fixup: black nephews, climbing");
                    sibling.set_color(Color::Red);
                    node = parent;
                } else {
                    if sibling.left().is_black() {
                        /* Case 3 - left rotate at sibling */
                        trace!("delete fixup: near nephew red, rotating at sibling");
                        self.rotate_left(sibling);
                        sibling = parent.left();
                    }

                    /* Case 4 - right rotate at parent + color flips */
                    trace!("delete fixup: far nephew red, rotating at parent");
                    sibling.set_color(parent.color());
                    parent.set_color(Color::Black);
                    sibling.left().set_color(Color::Black);
                    self.rotate_right(parent);
                    break;
                }
            }
        }
        node.set_color(Color::Black);
    }

    /// A black-height deficit always has a sibling subtree with at least one
    /// black node, so this only triggers on a tree that was already broken.
    /// We climb instead of failing.
    fn sibling_fallback(&self) {
        warn!("delete fixup: no sibling below a black-height deficit, climbing");
        #[cfg(test)]
        SIBLING_FALLBACKS.with(|count| count.set(count.get() + 1));
    }
}

#[cfg(test)]
mod test {
    use super::SIBLING_FALLBACKS;
    use crate::{Color, RBTree, Tree, Violation};

    use pretty_assertions::assert_eq;
    use quickcheck_macros::quickcheck;
    use rand::{Rng, SeedableRng, seq::SliceRandom};
    use rand_chacha::ChaCha8Rng;
    use std::cell::Cell;

    fn keys<V>(tree: &RBTree<i32, V>) -> Vec<i32> {
        tree.iter().map(|(k, _)| *k).collect()
    }

    fn children(tree: &RBTree<i32, ()>, key: i32) -> (Option<i32>, Option<i32>) {
        let node = tree.search(&key).unwrap();
        (node.left().map(|n| *n.key()), node.right().map(|n| *n.key()))
    }

    fn assert_valid<K: Ord, V>(tree: &RBTree<K, V>) {
        assert_eq!(Ok(tree.black_height()), tree.validate());
    }

    fn fallbacks() -> usize {
        SIBLING_FALLBACKS.with(Cell::get)
    }

    #[test]
    fn rbtree_ctor_works() {
        let tree = RBTree::<usize, String>::new();
        assert_eq!(None, tree.first_key_value());
        assert_eq!(false, tree.contains_key(&42));
        assert!(tree.root().is_none());
        assert_eq!(Ok(0), tree.validate());
    }

    #[test]
    fn insert_ascending_three() {
        let mut tree = RBTree::new();

        tree.insert(10, ());
        let root = tree.root().unwrap();
        assert_eq!((&10, Color::Black), (root.key(), root.color()));
        assert!(root.left().is_none() && root.right().is_none());

        // Black parent: no fixup.
        tree.insert(20, ());
        let root = tree.root().unwrap();
        assert_eq!((&10, Color::Black), (root.key(), root.color()));
        let right = root.right().unwrap();
        assert_eq!((&20, Color::Red), (right.key(), right.color()));
        assert!(root.left().is_none());

        // Red parent, black (absent) uncle, outer grandchild: one rotation.
        tree.insert(30, ());
        let root = tree.root().unwrap();
        assert_eq!((&20, Color::Black), (root.key(), root.color()));
        let (left, right) = (root.left().unwrap(), root.right().unwrap());
        assert_eq!((&10, Color::Red), (left.key(), left.color()));
        assert_eq!((&30, Color::Red), (right.key(), right.color()));
        assert_valid(&tree);
    }

    #[test]
    fn insert_inner_grandchild_rotates_twice() {
        let mut tree = RBTree::new();
        for k in [30, 10, 20] {
            tree.insert(k, ());
        }
        let root = tree.root().unwrap();
        assert_eq!((&20, Color::Black), (root.key(), root.color()));
        assert_eq!((Some(10), Some(30)), children(&tree, 20));
        assert_valid(&tree);
    }

    #[test]
    fn insert_red_uncle_recolors() {
        let mut tree = RBTree::new();
        for k in [20, 10, 30, 5] {
            tree.insert(k, ());
        }
        let colors: Vec<(i32, Color)> = tree.nodes().map(|n| (*n.key(), n.color())).collect();
        assert_eq!(
            vec![
                (5, Color::Red),
                (10, Color::Black),
                (20, Color::Black),
                (30, Color::Black)
            ],
            colors
        );
        assert_valid(&tree);
    }

    #[test]
    fn insert_returns_the_new_node() {
        let mut tree = RBTree::new();
        tree.insert(1, "one");
        let node = tree.insert(2, "two");
        assert_eq!((&2, &"two"), (node.key(), node.value()));
        assert_eq!(Some(&1), node.parent().map(|p| p.key()));
    }

    #[test]
    fn duplicates_keep_insertion_order() {
        let mut tree = RBTree::new();
        for (i, k) in [5, 3, 5, 8, 5, 1, 5].into_iter().enumerate() {
            tree.insert(k, i);
            assert_valid(&tree);
        }
        let entries: Vec<(i32, usize)> = tree.iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(
            vec![(1, 5), (3, 1), (5, 0), (5, 2), (5, 4), (5, 6), (8, 3)],
            entries
        );

        assert!(tree.delete(&5));
        assert_eq!(6, tree.len());
        assert_eq!(3, tree.iter().filter(|(k, _)| **k == 5).count());
        assert_valid(&tree);
    }

    fn snapshot(tree: &RBTree<i32, ()>) -> Vec<(i32, Color, usize)> {
        tree.nodes()
            .map(|n| (*n.key(), n.color(), n.depth()))
            .collect()
    }

    #[test]
    fn delete_missing_leaves_tree_unchanged() {
        let mut tree: RBTree<i32, ()> = (0..20).map(|k| (k * 2, ())).collect();
        let before = snapshot(&tree);
        assert_eq!(false, tree.delete(&7));
        assert_eq!(false, tree.delete(&100));
        assert_eq!(before, snapshot(&tree));

        assert!(tree.delete(&8));
        let after = snapshot(&tree);
        assert_eq!(false, tree.delete(&8));
        assert_eq!(None, tree.remove(&8));
        assert_eq!(after, snapshot(&tree));
        assert_eq!(19, tree.len());
        assert_valid(&tree);
    }

    #[test]
    fn delete_root_of_single_node() {
        let mut tree = RBTree::new();
        tree.insert(1, "one");
        assert_eq!(Some((1, "one")), tree.remove_entry(&1));
        assert!(tree.root().is_none());
        assert!(tree.is_empty());
        assert_eq!(Ok(0), tree.validate());
    }

    #[test]
    fn delete_successor_is_direct_right_child() {
        let mut tree = RBTree::new();
        for k in [20, 10, 30, 40] {
            tree.insert(k, ());
        }
        assert!(tree.delete(&20));
        let root = tree.root().unwrap();
        assert_eq!((&30, Color::Black), (root.key(), root.color()));
        assert_eq!((Some(10), Some(40)), children(&tree, 30));
        assert_valid(&tree);
    }

    #[test]
    fn delete_with_deep_successor() {
        // Find a two-child node whose successor sits several levels down
        // and whose removal needs no fixup rotation, so the splice itself
        // stays visible.
        for seed in 0..64 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut tree = RBTree::new();
            for _ in 0..64 {
                tree.insert(rng.random_range(0..1000), ());
            }

            let found = tree.nodes().find_map(|node| {
                let (left, right) = (node.left()?, node.right()?);
                let mut successor = right;
                while let Some(next) = successor.left() {
                    successor = next;
                }
                let absorbs = successor.is_red() || successor.right().is_some_and(|c| c.is_red());
                (successor.key() != right.key() && absorbs).then(|| {
                    (
                        *node.key(),
                        node.color(),
                        *left.key(),
                        *right.key(),
                        *successor.key(),
                        *successor.parent().unwrap().key(),
                        successor.right().map(|c| *c.key()),
                    )
                })
            });
            let Some((key, color, left, right, successor, successor_parent, successor_right)) =
                found
            else {
                continue;
            };
            // Keep the lookups unambiguous.
            let picked = [key, successor, successor_parent];
            let distinct = key != successor && key != successor_parent && successor != successor_parent;
            if !distinct || tree.iter().filter(|(k, _)| picked.contains(*k)).count() != 3 {
                continue;
            }

            assert!(tree.delete(&key));
            assert_valid(&tree);

            let moved = tree.search(&successor).unwrap();
            assert_eq!(color, moved.color());
            assert_eq!(Some(&left), moved.left().map(|n| n.key()));
            assert_eq!(Some(&right), moved.right().map(|n| n.key()));
            assert_eq!(successor_right, children(&tree, successor_parent).0);
            return;
        }
        panic!("no tree with a deep successor");
    }

    #[test]
    fn delete_with_black_leaf_successor() {
        //            8
        //        /       \
        //       4         12
        //      / \       /  \
        //     2   6    10    14
        //    / \ / \   / \   / \
        //   1  3 5  7 9  11 13 15
        //
        // All black. Deleting 8 moves 9 up and leaves 10 one black short.
        let mut tree = Tree::new();
        for k in [8, 4, 12, 2, 6, 10, 14, 1, 3, 5, 7, 9, 11, 13, 15] {
            tree.insert(k, ());
        }
        let mut tree = RBTree { tree };
        assert_eq!(Ok(4), tree.validate());
        let before = fallbacks();

        assert!(tree.delete(&8));

        let root = tree.root().unwrap();
        assert_eq!((&9, Color::Black), (root.key(), root.color()));
        assert_eq!((Some(4), Some(12)), children(&tree, 9));
        assert_eq!((None, Some(11)), children(&tree, 10));
        let reds: Vec<i32> = tree
            .nodes()
            .filter(|n| n.is_red())
            .map(|n| *n.key())
            .collect();
        assert_eq!(vec![4, 11, 14], reds);
        assert_eq!(Ok(3), tree.validate());
        assert_eq!(before, fallbacks());
        assert_eq!(
            vec![1, 2, 3, 4, 5, 6, 7, 9, 10, 11, 12, 13, 14, 15],
            keys(&tree)
        );
    }

    #[test]
    fn rotations_preserve_order() {
        //     2                4
        //    / \              / \
        //   1   4     -->    2   5
        //      / \          / \
        //     3   5        1   3
        let mut tree = Tree::new();
        for k in [2, 1, 4, 3, 5] {
            tree.insert(k, ());
        }
        let mut tree = RBTree { tree };

        tree.rotate_left(tree.tree.root);
        assert_eq!(Some(&4), tree.root().map(|n| n.key()));
        assert!(tree.root().unwrap().parent().is_none());
        assert_eq!((Some(2), Some(5)), children(&tree, 4));
        assert_eq!((Some(1), Some(3)), children(&tree, 2));
        assert_eq!(Some(&2), tree.search(&3).unwrap().parent().map(|n| n.key()));
        assert_eq!(Ok(()), tree.tree.validate());

        tree.rotate_right(tree.tree.root);
        assert_eq!(Some(&2), tree.root().map(|n| n.key()));
        assert_eq!((Some(1), Some(4)), children(&tree, 2));
        assert_eq!((Some(3), Some(5)), children(&tree, 4));
        assert_eq!(vec![1, 2, 3, 4, 5], keys(&tree));
        assert_eq!(Ok(()), tree.tree.validate());

        // No pivot: no-op.
        let leaf = tree.tree.search_ptr(&5);
        tree.rotate_left(leaf);
        tree.rotate_right(leaf);
        assert_eq!((Some(3), Some(5)), children(&tree, 4));
    }

    #[test]
    fn delete_fixup_climbs_past_missing_sibling() {
        // Both nodes black: the right spine carries one black more than the
        // left. Not a red-black tree, but delete must still cope with it.
        let mut tree = Tree::new();
        tree.insert(1, ());
        tree.insert(2, ());
        let mut tree = RBTree { tree };
        assert_eq!(
            Err(Violation::BlackHeightMismatch { left: 0, right: 1 }),
            tree.validate()
        );

        let before = fallbacks();
        assert!(tree.delete(&2));
        assert_eq!(before + 1, fallbacks());
        assert_eq!(vec![1], keys(&tree));
        assert_valid(&tree);
    }

    #[test]
    fn pop_first_and_last() {
        let mut tree: RBTree<i32, ()> = (0..50).map(|k| (k, ())).collect();
        for k in 0..25 {
            assert_eq!(Some((k, ())), tree.pop_first());
            assert_eq!(Some((49 - k, ())), tree.pop_last());
            assert_valid(&tree);
        }
        assert_eq!(None, tree.pop_first());
        assert_eq!(None, tree.pop_last());
    }

    #[test]
    fn get_mut_and_clear() {
        let mut tree: RBTree<&str, usize> = [("a", 1), ("b", 2)].into_iter().collect();
        *tree.get_mut("b").unwrap() *= 10;
        assert_eq!(Some((&"b", &20)), tree.get_key_value("b"));
        tree.clear();
        assert!(tree.is_empty());
        assert!(tree.root().is_none());
        assert_eq!("{}", format!("{tree:?}"));
    }

    #[test]
    fn ascending_inserts_stay_shallow() {
        let mut tree = RBTree::new();
        for k in 0..1023 {
            tree.insert(k, ());
        }
        // 2 * log2(n + 1)
        assert!(tree.height() <= 20);
        assert_valid(&tree);
        for k in 0..1023 {
            assert!(tree.delete(&k));
            assert_valid(&tree);
        }
        assert!(tree.is_empty());
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn stress_random_then_reverse() {
        let _ = simplelog::TestLogger::init(simplelog::LevelFilter::Warn, simplelog::Config::default());

        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let keys: Vec<u32> = (0..1000).map(|_| rng.random_range(0..=1000)).collect();
        let before = fallbacks();

        let mut tree = RBTree::new();
        for (i, k) in keys.iter().enumerate() {
            tree.insert(*k, i);
            assert_valid(&tree);
        }
        assert_eq!(keys.len(), tree.len());

        for k in keys.iter().rev() {
            assert!(tree.delete(k));
            assert_valid(&tree);
        }
        assert!(tree.is_empty());
        assert!(tree.root().is_none());
        assert_eq!(before, fallbacks());
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn stress_shuffled_deletes() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut keys: Vec<i32> = (0..2000).collect();
        keys.shuffle(&mut rng);
        let mut tree: RBTree<i32, ()> = keys.iter().map(|k| (*k, ())).collect();
        assert_valid(&tree);
        keys.shuffle(&mut rng);
        for (i, k) in keys.iter().enumerate() {
            assert!(tree.delete(k));
            if i % 7 == 0 {
                assert_valid(&tree);
            }
        }
        assert!(tree.is_empty());
    }

    #[quickcheck]
    fn insert_then_delete_all(keys: Vec<i16>) -> bool {
        let before = fallbacks();
        let mut tree = RBTree::new();
        for k in &keys {
            tree.insert(*k, ());
            if tree.validate().is_err() {
                return false;
            }
        }
        for k in keys.iter().rev() {
            if !tree.delete(k) || tree.validate().is_err() {
                return false;
            }
        }
        tree.is_empty() && tree.root().is_none() && before == fallbacks()
    }

    #[quickcheck]
    fn mixed_operations_match_a_sorted_multiset(ops: Vec<(bool, u8)>) -> bool {
        let before = fallbacks();
        let mut tree = RBTree::new();
        let mut expected: Vec<u8> = Vec::new();
        for (is_insert, key) in ops {
            if is_insert {
                tree.insert(key, ());
                let at = expected.partition_point(|k| *k <= key);
                expected.insert(at, key);
            } else {
                let deleted = tree.delete(&key);
                match expected.binary_search(&key) {
                    Ok(at) => {
                        expected.remove(at);
                        if !deleted {
                            return false;
                        }
                    }
                    Err(_) if deleted => return false,
                    Err(_) => {}
                }
            }
            if tree.validate().is_err() || tree.len() != expected.len() {
                return false;
            }
        }
        let found: Vec<u8> = tree.iter().map(|(k, _)| *k).collect();
        found == expected && before == fallbacks()
    }
}
