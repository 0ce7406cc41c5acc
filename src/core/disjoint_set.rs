//! Disjoint-set forest
//!
//! Slot-indexed union-find with iterative path compression and union by
//! rank, after the pseudocode in Cormen et al. Used by the LCA matrix
//! builder.

/// Disjoint-set forest over `0..size`
#[derive(Debug, Clone)]
pub struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u32>,
}

impl DisjointSet {
    /// Create a forest of `size` slots; every slot starts as its own set
    pub fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Reset slot `x` to a singleton set
    pub fn makeset(&mut self, x: usize) {
        self.parent[x] = x;
        self.rank[x] = 0;
    }

    /// Root of the set containing `x`, compressing the path walked
    pub fn find(&mut self, x: usize) -> usize {
        // first walk to the root, then point every node on the path at it
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    /// Unite the sets containing `x` and `y`; rank ties promote `y`'s root
    pub fn union(&mut self, x: usize, y: usize) {
        let rx = self.find(x);
        let ry = self.find(y);
        if rx == ry {
            return;
        }
        if self.rank[rx] > self.rank[ry] {
            self.parent[ry] = rx;
        } else {
            self.parent[rx] = ry;
            if self.rank[rx] == self.rank[ry] {
                self.rank[ry] += 1;
            }
        }
    }

    /// Whether `x` and `y` are in the same set
    pub fn same_set(&mut self, x: usize, y: usize) -> bool {
        self.find(x) == self.find(y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singletons() {
        let mut ds = DisjointSet::new(5);
        for i in 0..5 {
            assert_eq!(ds.find(i), i);
        }
        assert!(!ds.same_set(0, 1));
    }

    #[test]
    fn test_union_find() {
        let mut ds = DisjointSet::new(6);
        ds.union(0, 1);
        ds.union(2, 3);
        assert!(ds.same_set(0, 1));
        assert!(ds.same_set(2, 3));
        assert!(!ds.same_set(1, 2));
        ds.union(1, 3);
        assert!(ds.same_set(0, 2));
        assert!(!ds.same_set(0, 5));
    }

    #[test]
    fn test_rank_tie_promotes_y() {
        let mut ds = DisjointSet::new(2);
        ds.union(0, 1);
        assert_eq!(ds.find(0), 1);
    }

    #[test]
    fn test_path_compression() {
        let mut ds = DisjointSet::new(8);
        for i in 0..7 {
            ds.union(i, i + 1);
        }
        let root = ds.find(0);
        for i in 0..8 {
            assert_eq!(ds.find(i), root);
        }
    }

    #[test]
    fn test_makeset_resets() {
        let mut ds = DisjointSet::new(3);
        ds.union(0, 1);
        ds.makeset(0);
        assert_eq!(ds.find(0), 0);
    }
}
