//! The bounded merge loop that makes every region large enough and anchored.

use crate::{
    regions::{recolor, AdjacencyGraph, AnchorGrid, Components, UnionFind},
    types::checked_len,
    CancelToken, MosaicError, DEFAULT_MAX_PASSES,
};
use palette::Srgb;

/// Options for [`Consolidator`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConsolidateOptions {
    /// The minimum number of pixels a region must have.
    ///
    /// Values of one or less turn consolidation into a no-op.
    pub min_pixel_area: u32,
    /// The spacing between anchor points in pixels of the label map.
    pub hole_pitch: f64,
    /// The maximum number of merge passes.
    pub max_passes: u32,
}

impl ConsolidateOptions {
    /// Creates new [`ConsolidateOptions`] with the default number of passes.
    #[must_use]
    pub const fn new(min_pixel_area: u32, hole_pitch: f64) -> Self {
        Self { min_pixel_area, hole_pitch, max_passes: DEFAULT_MAX_PASSES }
    }

    /// Sets the maximum number of merge passes.
    ///
    /// The default is [`DEFAULT_MAX_PASSES`].
    #[must_use]
    pub const fn max_passes(mut self, max_passes: u32) -> Self {
        self.max_passes = max_passes;
        self
    }
}

/// The result of a consolidation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsolidateOutput {
    /// The consolidated label map, indexing the same palette as the input.
    pub labels: Vec<u32>,
    /// The number of passes that merged at least one pair of components.
    pub passes: u32,
    /// The total number of merges over all passes.
    pub merges: u32,
    /// Whether the final label map has no mergeable non-compliant component left.
    ///
    /// This is `false` if the pass limit was reached first.
    pub converged: bool,
    /// The first pixel of each final non-compliant component that has no neighbor to merge into.
    ///
    /// Such a component spans the whole image, so it is usually a sign of a board too small
    /// to hold a single anchor point.
    pub unanchored: Vec<usize>,
}

/// Components of one pass that violate the size or anchor constraint.
struct Violations {
    /// Non-compliant components with at least one neighbor.
    mergeable: Vec<u32>,
    /// The first pixel of each non-compliant component without neighbors.
    isolated: Vec<usize>,
}

/// Merges small or anchor-less regions of a label map into their neighbors.
///
/// A component (4-connected run of one label) is compliant if it has at least
/// [`ConsolidateOptions::min_pixel_area`] pixels and contains an anchor point.
/// Each pass finds the components of the current label map and unions every non-compliant one
/// with the neighbor sharing the longest border (ties go to the lowest component id).
/// Each merged group is then recolored to the palette color closest to the group's mean color.
/// Compliance is only evaluated at the start of a pass, so merges within a pass always flow
/// from a non-compliant component toward its strongest neighbor.
///
/// The loop stops after a pass without merges or after [`ConsolidateOptions::max_passes`].
///
/// # Examples
/// ```
/// # use pegmosaic::{regions::{ConsolidateOptions, Consolidator}, MosaicError};
/// # use palette::Srgb;
/// # fn main() -> Result<(), MosaicError> {
/// let palette = [Srgb::new(0, 0, 255), Srgb::new(255, 0, 0)];
/// let mut labels = vec![0; 8 * 8];
/// labels[0] = 1;
///
/// let options = ConsolidateOptions::new(8, 4.0);
/// let output = Consolidator::new(&labels, 8, 8, &palette, options)?.run();
/// assert_eq!(output.labels, vec![0; 8 * 8]);
/// assert_eq!(output.merges, 1);
/// assert!(output.converged);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Consolidator<'a> {
    /// The input label map.
    labels: &'a [u32],
    /// The width of the label map.
    width: u32,
    /// The height of the label map.
    height: u32,
    /// The palette the labels index into.
    palette: &'a [Srgb<u8>],
    /// The anchor grid over the label map.
    anchors: AnchorGrid,
    /// The minimum region size in pixels.
    min_pixel_area: u32,
    /// The maximum number of merge passes.
    max_passes: u32,
}

impl<'a> Consolidator<'a> {
    /// Creates a new [`Consolidator`] after validating the inputs.
    ///
    /// # Errors
    /// Returns an error if:
    /// - either dimension is zero ([`MosaicError::ZeroDimensions`])
    /// - `labels.len() != width * height` ([`MosaicError::DimensionMismatch`])
    /// - the palette is empty ([`MosaicError::EmptyPalette`])
    /// - a label is not a valid palette index ([`MosaicError::LabelOutOfRange`])
    /// - the hole pitch is invalid ([`MosaicError::InvalidPitch`])
    pub fn new(
        labels: &'a [u32],
        width: u32,
        height: u32,
        palette: &'a [Srgb<u8>],
        options: ConsolidateOptions,
    ) -> Result<Self, MosaicError> {
        let expected = checked_len(width, height)?;
        if labels.len() != expected {
            return Err(MosaicError::DimensionMismatch { expected, actual: labels.len() });
        }
        if palette.is_empty() {
            return Err(MosaicError::EmptyPalette);
        }
        if let Some(&label) = labels.iter().find(|&&l| l as usize >= palette.len()) {
            return Err(MosaicError::LabelOutOfRange { label, palette_len: palette.len() });
        }
        let anchors = AnchorGrid::new(options.hole_pitch, width, height)?;

        Ok(Self {
            labels,
            width,
            height,
            palette,
            anchors,
            min_pixel_area: options.min_pixel_area,
            max_passes: options.max_passes,
        })
    }

    /// Runs the merge loop to completion.
    #[must_use]
    pub fn run(&self) -> ConsolidateOutput {
        let mut state = MergeState::new(self.labels);
        loop {
            if let Some(done) = state.pass(self) {
                return state.finish(done);
            }
        }
    }

    /// Runs the merge loop, checking `cancel` before the first pass and after every pass.
    ///
    /// # Errors
    /// Returns [`MosaicError::Cancelled`] if `cancel` was triggered at one of the checkpoints.
    pub fn run_cancellable(&self, cancel: &CancelToken) -> Result<ConsolidateOutput, MosaicError> {
        cancel.checkpoint()?;
        let mut state = MergeState::new(self.labels);
        loop {
            if let Some(done) = state.pass(self) {
                return Ok(state.finish(done));
            }
            cancel.checkpoint()?;
        }
    }

    /// Finds the non-compliant components of one pass.
    fn violations(&self, components: &Components, graph: &AdjacencyGraph) -> Violations {
        let anchored = self.anchors.anchored_unchecked(components);
        let mut mergeable = Vec::new();
        let mut isolated = Vec::new();
        #[allow(clippy::cast_possible_truncation)]
        for id in 0..components.len() as u32 {
            if components.size(id) >= self.min_pixel_area && anchored[id as usize] {
                continue;
            }
            if graph.neighbors(id).is_empty() {
                let first = components.ids().iter().position(|&c| c == id).unwrap_or(0);
                isolated.push(first);
            } else {
                mergeable.push(id);
            }
        }
        Violations { mergeable, isolated }
    }
}

/// How the merge loop ended.
struct Finished {
    /// Whether no mergeable non-compliant component was left.
    converged: bool,
    /// The first pixel of each non-compliant component without neighbors.
    isolated: Vec<usize>,
}

/// The mutable state of a running merge loop.
struct MergeState {
    /// The current label map.
    labels: Vec<u32>,
    /// The number of passes with at least one merge.
    passes: u32,
    /// The total number of merges.
    merges: u32,
}

impl MergeState {
    /// Starts a merge loop on a copy of `labels`.
    fn new(labels: &[u32]) -> Self {
        Self { labels: labels.to_vec(), passes: 0, merges: 0 }
    }

    /// Runs a single pass, returning `Some` once the loop is over.
    fn pass(&mut self, consolidator: &Consolidator) -> Option<Finished> {
        if consolidator.min_pixel_area <= 1 {
            return Some(Finished { converged: true, isolated: Vec::new() });
        }

        let (width, height) = (consolidator.width, consolidator.height);
        let components = Components::new_unchecked(&self.labels, width, height);
        let graph = AdjacencyGraph::new(&components);
        let Violations { mergeable, isolated } = consolidator.violations(&components, &graph);

        if mergeable.is_empty() {
            return Some(Finished { converged: true, isolated });
        }
        if self.passes >= consolidator.max_passes {
            tracing::warn!(
                passes = self.passes,
                remaining = mergeable.len(),
                "consolidation stopped at the pass limit"
            );
            return Some(Finished { converged: false, isolated });
        }

        let mut sets = UnionFind::new(components.len());
        let mut merges = 0;
        for &id in &mergeable {
            if let Some(neighbor) = graph.strongest_neighbor(id) {
                if sets.union(id, neighbor) {
                    merges += 1;
                }
            }
        }

        self.labels = recolor(&components, &sets.roots(), consolidator.palette);
        self.passes += 1;
        self.merges += merges;

        tracing::debug!(
            pass = self.passes,
            components = components.len(),
            violations = mergeable.len(),
            merges,
            "consolidation pass finished"
        );

        None
    }

    /// Assembles the output and reports regions that could not be fixed.
    fn finish(self, done: Finished) -> ConsolidateOutput {
        for &pixel in &done.isolated {
            tracing::warn!(
                pixel,
                "region without neighbors does not satisfy the size or anchor constraint"
            );
        }

        ConsolidateOutput {
            labels: self.labels,
            passes: self.passes,
            merges: self.merges,
            converged: done.converged,
            unanchored: done.isolated,
        }
    }
}

/// Consolidates a label map so every region has at least `min_pixel_area` pixels
/// and contains a mounting hole anchor, using the default pass limit.
///
/// The output uses the same palette indices as the input.
/// A `min_pixel_area` of one or less returns the labels unchanged.
/// See [`Consolidator`] for more details.
///
/// # Errors
/// See [`Consolidator::new`].
pub fn consolidate(
    labels: &[u32],
    width: u32,
    height: u32,
    min_pixel_area: u32,
    palette: &[Srgb<u8>],
    hole_pitch: f64,
) -> Result<Vec<u32>, MosaicError> {
    let options = ConsolidateOptions::new(min_pixel_area, hole_pitch);
    Ok(Consolidator::new(labels, width, height, palette, options)?.run().labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{tests::*, uniform, ChannelLevels};

    /// Returns whether every component is compliant or has no neighbors.
    fn all_compliant(labels: &[u32], width: u32, height: u32, min: u32, pitch: f64) -> bool {
        let comps = Components::new(labels, width, height).unwrap();
        let graph = AdjacencyGraph::new(&comps);
        let anchored = AnchorGrid::new(pitch, width, height).unwrap().anchored(&comps).unwrap();
        (0..comps.len() as u32).all(|id| {
            (comps.size(id) >= min && anchored[id as usize]) || graph.neighbors(id).is_empty()
        })
    }

    #[test]
    fn small_square_merges_into_field() {
        let red = Srgb::new(255, 0, 0);
        let blue = Srgb::new(0, 0, 255);
        let mut colors = vec![blue; 64];
        for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            colors[y * 8 + x] = red;
        }
        let rgba = rgba_from_colors(&colors);
        let quantized = uniform::quantize(&rgba, 8, 8, 8).unwrap();
        assert_eq!(quantized.levels, ChannelLevels::from_clamped(2));
        assert_eq!(quantized.labels[0], 4);
        assert_eq!(quantized.labels[63], 1);

        // the only anchor point is (4, 4), inside the blue field
        let anchors = AnchorGrid::new(4.0, 8, 8).unwrap();
        assert_eq!(anchors.points().collect::<Vec<_>>(), vec![(4, 4)]);

        let options = ConsolidateOptions::new(8, 4.0);
        let output = Consolidator::new(&quantized.labels, 8, 8, &quantized.palette, options)
            .unwrap()
            .run();

        assert_eq!(output.labels, vec![1; 64]);
        assert_eq!(output.passes, 1);
        assert_eq!(output.merges, 1);
        assert!(output.converged);
        assert!(output.unanchored.is_empty());
    }

    #[test]
    fn min_area_of_one_is_noop() {
        let (w, h) = (16, 12);
        let rgba = random_rgba(w, h, 5);
        let quantized = uniform::quantize(&rgba, w, h, 27).unwrap();
        for min in [0, 1] {
            let labels = consolidate(&quantized.labels, w, h, min, &quantized.palette, 4.0).unwrap();
            assert_eq!(labels, quantized.labels);
        }
    }

    #[test]
    fn random_image_becomes_compliant() {
        let (w, h) = (48, 40);
        let rgba = random_rgba(w, h, 9);
        let quantized = uniform::quantize(&rgba, w, h, 64).unwrap();
        let options = ConsolidateOptions::new(20, 6.0).max_passes(100);
        let output = Consolidator::new(&quantized.labels, w, h, &quantized.palette, options)
            .unwrap()
            .run();

        assert!(output.converged);
        assert!(output.merges > 0);
        assert!(output.labels.iter().all(|&l| (l as usize) < quantized.palette.len()));
        assert!(all_compliant(&output.labels, w, h, 20, 6.0));
    }

    #[test]
    fn second_run_performs_no_merges() {
        let (w, h) = (32, 32);
        let rgba = random_rgba(w, h, 21);
        let quantized = uniform::quantize(&rgba, w, h, 27).unwrap();
        let options = ConsolidateOptions::new(12, 5.0).max_passes(100);
        let first = Consolidator::new(&quantized.labels, w, h, &quantized.palette, options)
            .unwrap()
            .run();
        assert!(first.converged);

        let second = Consolidator::new(&first.labels, w, h, &quantized.palette, options)
            .unwrap()
            .run();
        assert_eq!(second.merges, 0);
        assert_eq!(second.passes, 0);
        assert_eq!(second.labels, first.labels);
    }

    #[test]
    fn pass_limit() {
        let (w, h) = (48, 40);
        let rgba = random_rgba(w, h, 2);
        let quantized = uniform::quantize(&rgba, w, h, 64).unwrap();
        let options = ConsolidateOptions::new(20, 6.0).max_passes(1);
        let output = Consolidator::new(&quantized.labels, w, h, &quantized.palette, options)
            .unwrap()
            .run();
        assert_eq!(output.passes, 1);
        assert!(!output.converged);

        let options = options.max_passes(0);
        let output = Consolidator::new(&quantized.labels, w, h, &quantized.palette, options)
            .unwrap()
            .run();
        assert_eq!(output.passes, 0);
        assert_eq!(output.labels, quantized.labels);
    }

    #[test]
    fn board_without_anchors_collapses_to_one_region() {
        let palette = [Srgb::new(0, 0, 0), Srgb::new(250, 250, 250)];
        #[rustfmt::skip]
        let labels = [
            0, 0, 1,
            0, 1, 1,
        ];
        // a pitch larger than the image leaves no anchor point
        let output = Consolidator::new(&labels, 3, 2, &palette, ConsolidateOptions::new(2, 10.0))
            .unwrap()
            .run();

        let first = output.labels[0];
        assert!(output.labels.iter().all(|&l| l == first));
        assert!(output.converged);
        assert_eq!(output.unanchored, vec![0]);
    }

    #[test]
    fn single_isolated_region_is_reported() {
        let palette = [Srgb::new(9, 9, 9)];
        let labels = [0; 6];
        let output = Consolidator::new(&labels, 3, 2, &palette, ConsolidateOptions::new(8, 1.0))
            .unwrap()
            .run();
        assert_eq!(output.labels, labels);
        assert_eq!(output.merges, 0);
        assert_eq!(output.unanchored, vec![0]);
    }

    #[test]
    fn invalid_inputs() {
        let palette = [Srgb::new(0, 0, 0), Srgb::new(1, 1, 1)];
        assert_eq!(
            consolidate(&[0; 5], 2, 3, 4, &palette, 4.0),
            Err(MosaicError::DimensionMismatch { expected: 6, actual: 5 })
        );
        assert_eq!(consolidate(&[0; 6], 2, 3, 4, &[], 4.0), Err(MosaicError::EmptyPalette));
        assert_eq!(
            consolidate(&[0, 1, 2, 0], 2, 2, 4, &palette, 4.0),
            Err(MosaicError::LabelOutOfRange { label: 2, palette_len: 2 })
        );
        assert!(matches!(
            consolidate(&[0; 4], 2, 2, 4, &palette, f64::NAN),
            Err(MosaicError::InvalidPitch(_))
        ));
    }

    #[test]
    fn cancelled() {
        let palette = [Srgb::new(0, 0, 0), Srgb::new(1, 1, 1)];
        let labels = [0, 1, 0, 1];
        let consolidator =
            Consolidator::new(&labels, 2, 2, &palette, ConsolidateOptions::new(4, 1.0)).unwrap();

        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(consolidator.run_cancellable(&cancel), Err(MosaicError::Cancelled));

        let cancel = CancelToken::new();
        assert_eq!(consolidator.run_cancellable(&cancel), Ok(consolidator.run()));
    }
}
