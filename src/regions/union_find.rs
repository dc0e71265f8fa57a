//! A disjoint-set forest over dense component ids.

/// Disjoint sets of component ids with path compression and union by size.
///
/// The forest is an arena of parent and size indices, one entry per component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionFind {
    /// The parent of each element. Roots are their own parent.
    parent: Vec<u32>,
    /// The number of elements in each set, only meaningful for roots.
    size: Vec<u32>,
}

impl UnionFind {
    /// Creates `len` singleton sets.
    #[must_use]
    pub fn new(len: usize) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let parent = (0..len).map(|i| i as u32).collect();
        Self { parent, size: vec![1; len] }
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    /// Whether there are no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Returns the root of the set containing `x`, compressing the path along the way.
    pub fn find(&mut self, x: u32) -> u32 {
        let mut root = x;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }

        let mut x = x;
        while self.parent[x as usize] != root {
            let next = self.parent[x as usize];
            self.parent[x as usize] = root;
            x = next;
        }

        root
    }

    /// Merges the sets containing `a` and `b`.
    ///
    /// The smaller set is attached below the root of the larger one.
    /// On equal sizes, the root of `a` is kept.
    /// Returns `false` if `a` and `b` were already in the same set.
    pub fn union(&mut self, a: u32, b: u32) -> bool {
        let a = self.find(a);
        let b = self.find(b);
        if a == b {
            return false;
        }

        let (root, child) = if self.size[a as usize] >= self.size[b as usize] {
            (a, b)
        } else {
            (b, a)
        };

        self.parent[child as usize] = root;
        self.size[root as usize] += self.size[child as usize];
        true
    }

    /// Returns the number of elements in the set containing `x`.
    pub fn set_size(&mut self, x: u32) -> u32 {
        let root = self.find(x);
        self.size[root as usize]
    }

    /// Returns the root of every element.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn roots(&mut self) -> Vec<u32> {
        (0..self.len()).map(|i| self.find(i as u32)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singletons() {
        let mut sets = UnionFind::new(4);
        assert_eq!(sets.roots(), vec![0, 1, 2, 3]);
        assert_eq!(sets.set_size(2), 1);
    }

    #[test]
    fn union_reports_merges() {
        let mut sets = UnionFind::new(5);
        assert!(sets.union(0, 1));
        assert!(sets.union(3, 4));
        assert!(!sets.union(1, 0));
        assert!(sets.union(4, 1));
        assert!(!sets.union(0, 3));

        assert_eq!(sets.set_size(3), 4);
        assert_eq!(sets.set_size(2), 1);
        assert_eq!(sets.find(0), sets.find(4));
        assert_ne!(sets.find(0), sets.find(2));
    }

    #[test]
    fn union_by_size() {
        let mut sets = UnionFind::new(4);
        sets.union(1, 2);
        sets.union(1, 3);
        // {1, 2, 3} is larger, so its root survives
        sets.union(0, 1);
        assert_eq!(sets.find(0), 1);

        let mut sets = UnionFind::new(2);
        sets.union(1, 0);
        assert_eq!(sets.roots(), vec![1, 1]);
    }

    #[test]
    fn path_compression() {
        let mut sets = UnionFind::new(4);
        sets.union(0, 1);
        sets.union(2, 3);
        sets.union(0, 2);
        let root = sets.find(3);
        assert_eq!(root, 0);
        assert_eq!(sets.parent, vec![0, 0, 0, 0]);
    }
}
