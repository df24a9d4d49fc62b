//! Disjoint-set (union-find) over dense integer indices.
//!
//! Used by the conflict detector to cluster transitively overlapping
//! occurrences. `find` compresses paths iteratively so pathological unions
//! cannot blow the stack.

/// Union-find structure over the indices `0..n`.
#[derive(Debug, Clone)]
pub struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    /// Create `n` singleton sets.
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    /// Return the canonical representative of the set containing `x`.
    ///
    /// Representatives are stable within one call sequence; no other
    /// iteration-order guarantees are made.
    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // Second pass: point every node on the walked path at the root.
        let mut cursor = x;
        while self.parent[cursor] != root {
            let next = self.parent[cursor];
            self.parent[cursor] = root;
            cursor = next;
        }
        root
    }

    /// Merge the sets containing `a` and `b`.
    pub fn union(&mut self, a: usize, b: usize) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a != root_b {
            self.parent[root_b] = root_a;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singletons_are_their_own_representatives() {
        let mut dsu = DisjointSet::new(4);
        for i in 0..4 {
            assert_eq!(dsu.find(i), i);
        }
    }

    #[test]
    fn union_merges_transitively() {
        let mut dsu = DisjointSet::new(5);
        dsu.union(0, 1);
        dsu.union(1, 2);
        assert_eq!(dsu.find(0), dsu.find(2));
        assert_ne!(dsu.find(0), dsu.find(3));
    }

    #[test]
    fn long_chain_does_not_overflow() {
        let n = 100_000;
        let mut dsu = DisjointSet::new(n);
        for i in 1..n {
            dsu.union(i - 1, i);
        }
        assert_eq!(dsu.find(n - 1), dsu.find(0));
    }
}
