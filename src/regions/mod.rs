//! Hole-aware region consolidation of a quantized label map.
//!
//! A pegboard mosaic is cut into pieces along the borders between differently labeled regions.
//! Every piece must be large enough to be stable and must contain at least one mounting hole,
//! which sit on a fixed-pitch grid. This module provides the building blocks to enforce that:
//! - [`Components`]: 4-connected component labeling
//! - [`AdjacencyGraph`]: shared border counts between neighboring components
//! - [`AnchorGrid`]: the mounting hole positions and which components contain one
//! - [`UnionFind`]: disjoint sets of components merged within a pass
//! - [`recolor`]: maps merged groups back onto the existing palette
//!
//! [`Consolidator`] and [`consolidate`] tie them together into the bounded merge loop.

mod adjacency;
mod anchors;
mod components;
mod consolidate;
mod recolor;
mod union_find;

pub use adjacency::AdjacencyGraph;
pub use anchors::AnchorGrid;
pub use components::Components;
pub use consolidate::{consolidate, ConsolidateOptions, ConsolidateOutput, Consolidator};
pub use recolor::{nearest_palette_index, recolor};
pub use union_find::UnionFind;
