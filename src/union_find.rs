//! Disjoint-set forest over working-set node handles.
//!
//! Path halving plus union by rank. Both are iterative; no traversal here
//! recurses, whatever the shape of the input.

use crate::model::Handle;

/// Disjoint-set forest over `0..n`.
///
/// # Examples
///
/// ```
/// use netmerge::UnionFind;
///
/// let mut uf = UnionFind::new(4);
/// uf.union(0, 1);
/// uf.union(2, 1);
/// assert!(uf.same(0, 2));
/// assert!(!uf.same(0, 3));
/// assert_eq!(uf.groups(), vec![vec![0, 1, 2], vec![3]]);
/// ```
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    /// Creates `n` singleton sets.
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Representative of `x`'s set.
    ///
    /// Callers pass arena handles sized to the forest; an index out of range
    /// is a caller bug and trips a debug assertion. Release builds treat it
    /// as its own representative.
    pub fn find(&mut self, mut x: usize) -> usize {
        debug_assert!(x < self.parent.len(), "index {x} outside forest of {}", self.parent.len());
        if x >= self.parent.len() {
            return x;
        }
        while self.parent[x] != x {
            let grandparent = self.parent[self.parent[x]];
            self.parent[x] = grandparent;
            x = grandparent;
        }
        x
    }

    /// Merges the sets of `a` and `b`. Returns false if they were already
    /// joined. Equal ranks attach the higher root under the lower one.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        debug_assert!(
            a < self.parent.len() && b < self.parent.len(),
            "union of ({a}, {b}) outside forest of {}",
            self.parent.len()
        );
        if a >= self.parent.len() || b >= self.parent.len() {
            return false;
        }
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return false;
        }

        let (root, child) = match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Greater => (ra, rb),
            std::cmp::Ordering::Less => (rb, ra),
            std::cmp::Ordering::Equal => {
                let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
                self.rank[lo] = self.rank[lo].saturating_add(1);
                (lo, hi)
            }
        };
        self.parent[child] = root;
        true
    }

    /// Convenience wrapper over [`UnionFind::union`] for arena handles.
    pub fn union_handles(&mut self, a: Handle, b: Handle) -> bool {
        self.union(a.index(), b.index())
    }

    pub fn same(&mut self, a: usize, b: usize) -> bool {
        self.find(a) == self.find(b)
    }

    /// All sets, each sorted ascending, ordered by smallest member.
    pub fn groups(&mut self) -> Vec<Vec<usize>> {
        let n = self.parent.len();
        let mut slot_of_root: Vec<Option<usize>> = vec![None; n];
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for x in 0..n {
            let root = self.find(x);
            let slot = *slot_of_root[root].get_or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(x);
        }
        groups
    }
}
