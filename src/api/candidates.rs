//! Contains [`CandidateLevels`], a search over color counts that keeps only visibly different results.

use crate::{
    uniform::indexed_palette, CancelToken, ChannelLevels, MosaicError, PixelGrid, QuantizeOutput,
    MAX_LEVELS,
};
use palette::Srgb;
use std::ops::RangeInclusive;

/// Returns the fraction of pixels whose colors differ between two renderings of the same image.
///
/// Returns `0.0` for two empty renderings.
///
/// # Errors
/// Returns [`MosaicError::DimensionMismatch`] if `a` and `b` have different lengths.
///
/// # Examples
/// ```
/// # use pegmosaic::difference_ratio;
/// # use palette::Srgb;
/// let black = Srgb::new(0, 0, 0);
/// let white = Srgb::new(255, 255, 255);
/// let ratio = difference_ratio(&[black, black, white, white], &[black, white, white, white]);
/// assert_eq!(ratio, Ok(0.25));
/// ```
pub fn difference_ratio(a: &[Srgb<u8>], b: &[Srgb<u8>]) -> Result<f64, MosaicError> {
    if a.len() != b.len() {
        return Err(MosaicError::DimensionMismatch { expected: a.len(), actual: b.len() });
    }
    if a.is_empty() {
        return Ok(0.0);
    }

    let different = a.iter().zip(b).filter(|(x, y)| x != y).count();
    #[allow(clippy::cast_precision_loss)]
    let ratio = different as f64 / a.len() as f64;
    Ok(ratio)
}

/// Renders a quantization into one color per pixel.
fn render(output: &QuantizeOutput) -> Vec<Srgb<u8>> {
    output.labels.iter().map(|&l| output.palette[l as usize]).collect()
}

/// A quantization kept by [`CandidateLevels`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// The color count that first produced this result.
    pub color_count: u16,
    /// The quantized image.
    pub output: QuantizeOutput,
}

/// A search over a range of color counts that keeps only results
/// which look different enough from the previously kept one.
///
/// Color counts that map to a level count which was already tried are skipped,
/// since they produce identical results. The first tried color count is always kept.
/// Afterwards, a result is kept if the fraction of pixels whose color changed compared to the
/// previously kept result is at least [`CandidateLevels::threshold`].
///
/// The search is lazy: each color count is one unit of work, computed when the iterator
/// is advanced. [`CandidateLevels`] itself holds no search state, so calling
/// [`CandidateLevels::iter`] again restarts the search from the beginning.
///
/// # Examples
/// ```
/// # use pegmosaic::{CandidateLevels, MosaicError, PixelGrid};
/// # fn main() -> Result<(), MosaicError> {
/// # let rgba = (0..32 * 32 * 4).map(|i| (i * 7 % 256) as u8).collect::<Vec<_>>();
/// let grid = PixelGrid::new(&rgba, 32, 32)?;
/// let candidates = CandidateLevels::new(grid, 8..=64).threshold(0.1);
/// for candidate in candidates.iter() {
///     println!("{} colors: {} used", candidate.color_count, candidate.output.used_bins());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CandidateLevels<'a> {
    /// The image to quantize.
    grid: PixelGrid<'a>,
    /// The color counts to try, in order.
    color_counts: RangeInclusive<u16>,
    /// The maximum number of levels per channel.
    max_levels: u8,
    /// The minimum difference ratio for a result to be kept.
    threshold: f64,
}

impl<'a> CandidateLevels<'a> {
    /// The default minimum difference ratio is `0.05`, that is, 5% of the pixels.
    pub const DEFAULT_THRESHOLD: f64 = 0.05;

    /// Creates a new [`CandidateLevels`] over the given range of color counts.
    #[must_use]
    pub fn new(grid: PixelGrid<'a>, color_counts: RangeInclusive<u16>) -> Self {
        Self {
            grid,
            color_counts,
            max_levels: MAX_LEVELS,
            threshold: Self::DEFAULT_THRESHOLD,
        }
    }

    /// Sets the minimum difference ratio for a result to be kept.
    ///
    /// The default is [`CandidateLevels::DEFAULT_THRESHOLD`].
    #[must_use]
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets the maximum number of levels per channel.
    ///
    /// The default is [`MAX_LEVELS`].
    #[must_use]
    pub fn max_levels(mut self, max_levels: u8) -> Self {
        self.max_levels = max_levels;
        self
    }

    /// Returns a lazy iterator over the kept candidates.
    #[must_use]
    pub fn iter(&self) -> Candidates<'a> {
        Candidates {
            grid: self.grid,
            color_counts: self.color_counts.clone(),
            max_levels: self.max_levels,
            threshold: self.threshold,
            last_levels: None,
            previous: None,
        }
    }

    /// Runs the whole search, checking `cancel` before each unit of work.
    ///
    /// # Errors
    /// Returns [`MosaicError::Cancelled`] if `cancel` was triggered at one of the checkpoints.
    pub fn collect_cancellable(&self, cancel: &CancelToken) -> Result<Vec<Candidate>, MosaicError> {
        let mut iter = self.iter();
        let mut kept = Vec::new();
        loop {
            cancel.checkpoint()?;
            match iter.step() {
                Step::Kept(candidate) => kept.push(candidate),
                Step::Rejected => (),
                Step::Done => break,
            }
        }
        tracing::debug!(kept = kept.len(), "candidate search finished");
        Ok(kept)
    }
}

impl<'a> IntoIterator for &CandidateLevels<'a> {
    type Item = Candidate;
    type IntoIter = Candidates<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// The outcome of one unit of work of the candidate search.
enum Step {
    /// The color count produced a visibly different result.
    Kept(Candidate),
    /// The color count was skipped or its result was too similar.
    Rejected,
    /// There are no color counts left.
    Done,
}

/// The iterator returned by [`CandidateLevels::iter`].
#[derive(Debug, Clone)]
pub struct Candidates<'a> {
    /// The image to quantize.
    grid: PixelGrid<'a>,
    /// The remaining color counts.
    color_counts: RangeInclusive<u16>,
    /// The maximum number of levels per channel.
    max_levels: u8,
    /// The minimum difference ratio for a result to be kept.
    threshold: f64,
    /// The level count of the last tried color count.
    last_levels: Option<ChannelLevels>,
    /// The rendering of the last kept result.
    previous: Option<Vec<Srgb<u8>>>,
}

impl Candidates<'_> {
    /// Tries the next color count.
    fn step(&mut self) -> Step {
        let Some(color_count) = self.color_counts.next() else {
            return Step::Done;
        };

        let levels = ChannelLevels::from_color_count(color_count, self.max_levels);
        if self.last_levels == Some(levels) {
            return Step::Rejected;
        }
        self.last_levels = Some(levels);

        let output = indexed_palette(self.grid, levels);
        let rendered = render(&output);
        let keep = match &self.previous {
            None => true,
            Some(previous) => {
                difference_ratio(previous, &rendered).map_or(true, |r| r >= self.threshold)
            }
        };

        tracing::debug!(color_count, levels = levels.get(), keep, "candidate evaluated");

        if keep {
            self.previous = Some(rendered);
            Step::Kept(Candidate { color_count, output })
        } else {
            Step::Rejected
        }
    }
}

impl Iterator for Candidates<'_> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.step() {
                Step::Kept(candidate) => return Some(candidate),
                Step::Rejected => (),
                Step::Done => return None,
            }
        }
    }
}
