//! Arena-based binary tree with parent back-links.
//!
//! Both the static and the adaptive Huffman coders need the same shape of
//! tree: owned nodes reachable by index, a non-owning parent pointer per
//! node, and (for the adaptive coder) the ability to swap two subtrees in
//! place. Rust's ownership rules make the classic `unique_ptr`/`observer_ptr`
//! graph awkward, so nodes live in a flat `Vec` and are addressed by index
//! instead - the index plays the role the C++ source gives to
//! `observer_ptr<Node>`.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Side {
    Left,
    Right,
}

struct Link {
    parent: Option<usize>,
    left: Option<usize>,
    right: Option<usize>,
}

/// An arena of nodes forming a single binary tree, addressed by index.
pub struct Tree<T> {
    values: Vec<T>,
    links: Vec<Link>,
    root: usize,
}

impl<T> Tree<T> {
    /// Build a tree consisting of a single root leaf.
    pub fn from_leaf(value: T) -> Self {
        Self {
            values: vec![value],
            links: vec![Link { parent: None, left: None, right: None }],
            root: 0,
        }
    }

    pub fn root(&self) -> usize {
        self.root
    }

    pub fn value(&self, idx: usize) -> &T {
        &self.values[idx]
    }

    pub fn value_mut(&mut self, idx: usize) -> &mut T {
        &mut self.values[idx]
    }

    pub fn parent(&self, idx: usize) -> Option<usize> {
        self.links[idx].parent
    }

    pub fn left(&self, idx: usize) -> Option<usize> {
        self.links[idx].left
    }

    pub fn right(&self, idx: usize) -> Option<usize> {
        self.links[idx].right
    }

    pub fn is_leaf(&self, idx: usize) -> bool {
        self.links[idx].left.is_none() && self.links[idx].right.is_none()
    }

    pub fn is_root(&self, idx: usize) -> bool {
        idx == self.root
    }

    /// Attach a fresh child to `parent` on the given side, returning its index.
    pub fn push_child(&mut self, parent: usize, value: T, side: Side) -> usize {
        let idx = self.values.len();
        self.values.push(value);
        self.links.push(Link { parent: Some(parent), left: None, right: None });
        match side {
            Side::Left => self.links[parent].left = Some(idx),
            Side::Right => self.links[parent].right = Some(idx),
        }
        idx
    }

    /// Pre-order walk over every node in the tree.
    pub fn depth_first(&self, mut visit: impl FnMut(usize, &T)) {
        self.depth_first_from(self.root, &mut visit);
    }

    fn depth_first_from(&self, idx: usize, visit: &mut impl FnMut(usize, &T)) {
        visit(idx, &self.values[idx]);
        if let Some(l) = self.links[idx].left {
            self.depth_first_from(l, visit);
        }
        if let Some(r) = self.links[idx].right {
            self.depth_first_from(r, visit);
        }
    }

    /// Index of the first node (pre-order) satisfying `pred`, if any.
    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Option<usize> {
        let mut found = None;
        self.depth_first(|idx, v| {
            if found.is_none() && pred(v) {
                found = Some(idx);
            }
        });
        found
    }

    /// Absorb another, separately-built tree as a new subtree under
    /// `parent`, returning the index its root now has in this tree. Used to
    /// merge single-leaf trees popped off a build-time weight queue into
    /// one growing tree without re-allocating already-placed nodes.
    pub fn graft(&mut self, parent: usize, mut other: Tree<T>, side: Side) -> usize {
        let offset = self.values.len();
        let other_root = other.root + offset;
        self.values.append(&mut other.values);
        for link in other.links.iter_mut() {
            link.parent = link.parent.map(|p| p + offset);
            link.left = link.left.map(|l| l + offset);
            link.right = link.right.map(|r| r + offset);
        }
        self.links.append(&mut other.links);
        self.links[other_root].parent = Some(parent);
        match side {
            Side::Left => self.links[parent].left = Some(other_root),
            Side::Right => self.links[parent].right = Some(other_root),
        }
        other_root
    }

    /// Exchange the positions of two subtrees, leaving their own children
    /// attached and rewiring only their parents' child slots.
    ///
    /// Refuses when either node is the root, or one is the other's parent -
    /// both cases would require rewiring a node's relationship with itself.
    pub fn swap_subtrees(&mut self, a: usize, b: usize) -> Result<(), crate::Error> {
        if a == b {
            return Ok(());
        }
        if a == self.root || b == self.root {
            return Err(crate::Error::CorruptCode("cannot swap the tree root".into()));
        }
        let pa = self.links[a].parent.expect("non-root node has a parent");
        let pb = self.links[b].parent.expect("non-root node has a parent");
        if pa == b || pb == a {
            return Err(crate::Error::CorruptCode("cannot swap a node with its parent".into()));
        }
        let a_is_left = self.links[pa].left == Some(a);
        let b_is_left = self.links[pb].left == Some(b);
        if a_is_left {
            self.links[pa].left = Some(b);
        } else {
            self.links[pa].right = Some(b);
        }
        if b_is_left {
            self.links[pb].left = Some(a);
        } else {
            self.links[pb].right = Some(a);
        }
        self.links[a].parent = Some(pb);
        self.links[b].parent = Some(pa);
        Ok(())
    }

    /// Path from the root to `target`: `false` for a left branch, `true` for
    /// a right branch, in root-to-leaf order.
    pub fn path_from_root(&self, target: usize) -> Vec<bool> {
        let mut path = Vec::new();
        let mut cur = target;
        while let Some(p) = self.links[cur].parent {
            path.push(self.links[p].right == Some(cur));
            cur = p;
        }
        path.reverse();
        path
    }
}
