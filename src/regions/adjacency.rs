//! The border-weighted adjacency graph between components.

use crate::regions::Components;

/// For each component, its neighboring components and the number of shared border edges.
///
/// Two components are neighbors if any of their pixels are horizontally or vertically adjacent.
/// Each adjacent pixel pair counts once towards the shared border of both components,
/// so the graph is symmetric by construction.
/// Neighbors are stored sorted by component id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjacencyGraph {
    /// The start of each component's neighbor list in `neighbors` (one extra trailing entry).
    offsets: Vec<usize>,
    /// The `(neighbor id, shared border count)` pairs of all components, concatenated.
    neighbors: Vec<(u32, u32)>,
}

impl AdjacencyGraph {
    /// Builds the adjacency graph of the given components.
    #[must_use]
    pub fn new(components: &Components) -> Self {
        let ids = components.ids();
        let w = components.width() as usize;

        let mut edges = Vec::new();
        for (row_start, row) in (0..ids.len()).step_by(w).zip(ids.chunks_exact(w)) {
            for (x, &c) in row.iter().enumerate() {
                let p = row_start + x;
                if x + 1 < w {
                    let r = ids[p + 1];
                    if r != c {
                        edges.push((c, r));
                        edges.push((r, c));
                    }
                }
                if let Some(&d) = ids.get(p + w) {
                    if d != c {
                        edges.push((c, d));
                        edges.push((d, c));
                    }
                }
            }
        }

        edges.sort_unstable();

        let mut offsets = vec![0; components.len() + 1];
        let mut neighbors: Vec<(u32, u32)> = Vec::new();
        let mut last = None;
        for edge @ (a, b) in edges {
            if last == Some(edge) {
                if let Some((_, count)) = neighbors.last_mut() {
                    *count += 1;
                }
            } else {
                neighbors.push((b, 1));
                offsets[a as usize + 1] += 1;
                last = Some(edge);
            }
        }

        for i in 1..offsets.len() {
            offsets[i] += offsets[i - 1];
        }

        Self { offsets, neighbors }
    }

    /// Returns the number of components in the graph.
    #[must_use]
    pub fn num_components(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Returns the `(neighbor id, shared border count)` pairs of a component,
    /// sorted by neighbor id.
    #[must_use]
    pub fn neighbors(&self, id: u32) -> &[(u32, u32)] {
        let id = id as usize;
        &self.neighbors[self.offsets[id]..self.offsets[id + 1]]
    }

    /// Returns the number of border edges shared by two components (zero if not adjacent).
    #[must_use]
    pub fn shared_border(&self, a: u32, b: u32) -> u32 {
        let neighbors = self.neighbors(a);
        neighbors
            .binary_search_by_key(&b, |&(n, _)| n)
            .map_or(0, |i| neighbors[i].1)
    }

    /// Returns the neighbor sharing the longest border with the given component.
    ///
    /// Ties are broken by the lowest component id.
    /// Returns `None` if the component has no neighbors.
    #[must_use]
    pub fn strongest_neighbor(&self, id: u32) -> Option<u32> {
        let mut best: Option<(u32, u32)> = None;
        for &(neighbor, count) in self.neighbors(id) {
            if best.map_or(true, |(_, best_count)| count > best_count) {
                best = Some((neighbor, count));
            }
        }
        best.map(|(neighbor, _)| neighbor)
    }
}
