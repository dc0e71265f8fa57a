//! Uniform color quantization with CIELAB bin averaging.
//!
//! The RGB cube is partitioned into `L × L × L` equal cells (bins), where `L` is the number of
//! [`ChannelLevels`]. Each pixel is assigned to the bin containing its color, and each bin's
//! palette color is the mean of its pixels computed in CIELAB and converted back to sRGB.
//! Averaging in CIELAB avoids the muddy blends that averaging gamma encoded sRGB produces.
//!
//! Bins are addressed by `br·L² + bg·L + bb` and the palette is always in bin-index order,
//! so the output is fully deterministic for a fixed input and level count.
//! Empty bins get [`EMPTY_BIN_COLOR`].

use crate::{
    colorspace::{lab_to_srgb, srgb_to_lab, Lab64},
    CancelToken, ChannelLevels, MosaicError, PixelGrid, QuantizeOutput, EMPTY_BIN_COLOR, MAX_LEVELS,
};
use palette::{Srgb, Srgba};
use std::ops::AddAssign;
#[cfg(feature = "threads")]
use rayon::prelude::*;

/// Maps colors to uniform bin indices for a fixed number of levels per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformBinner {
    /// The number of levels per channel as a `u32` for index arithmetic.
    levels: u32,
}

impl UniformBinner {
    /// Creates a new [`UniformBinner`] for the given levels per channel.
    #[must_use]
    pub const fn new(levels: ChannelLevels) -> Self {
        Self { levels: levels.get() as u32 }
    }

    /// Returns the channel level (`0..L`) of a single `0..=255` component.
    #[must_use]
    #[inline]
    pub const fn channel_bin(&self, component: u8) -> u32 {
        (component as u32 * self.levels) >> 8
    }

    /// Returns the bin index of the given color.
    #[must_use]
    #[inline]
    pub fn bin(&self, color: Srgb<u8>) -> u32 {
        let l = self.levels;
        let r = self.channel_bin(color.red);
        let g = self.channel_bin(color.green);
        let b = self.channel_bin(color.blue);
        r * l * l + g * l + b
    }

    /// Returns the per-channel levels `[br, bg, bb]` of the given bin index.
    #[must_use]
    pub const fn channel_levels(&self, bin: u32) -> [u32; 3] {
        let l = self.levels;
        [bin / (l * l), (bin / l) % l, bin % l]
    }
}

/// Lab statistics for a single bin.
#[derive(Clone, Copy, Default)]
struct Stats {
    /// The number of pixels assigned to the bin.
    count: u32,
    /// The component-wise sum of the CIELAB colors assigned to the bin.
    components: [f64; 3],
}

impl AddAssign for Stats {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.count += rhs.count;
        for i in 0..3 {
            self.components[i] += rhs.components[i];
        }
    }
}

impl Stats {
    /// Returns the mean color of the bin, or [`EMPTY_BIN_COLOR`] if it is empty.
    fn mean_color(self) -> Srgb<u8> {
        if self.count == 0 {
            EMPTY_BIN_COLOR
        } else {
            let n = f64::from(self.count);
            let [l, a, b] = self.components.map(|c| c / n);
            lab_to_srgb(Lab64::new(l, a, b))
        }
    }
}

/// The per-bin accumulators for a single quantization run.
struct Histogram {
    /// Maps pixels to bins.
    binner: UniformBinner,
    /// The statistics for each bin in bin-index order.
    bins: Vec<Stats>,
}

impl Histogram {
    /// Creates a new [`Histogram`] with all bins empty.
    fn new_zero(levels: ChannelLevels) -> Self {
        Self {
            binner: UniformBinner::new(levels),
            bins: vec![Stats::default(); levels.bins()],
        }
    }

    /// Adds a single pixel to its bin and returns the bin index.
    #[allow(clippy::inline_always)]
    #[inline(always)]
    fn add_color(&mut self, color: Srgb<u8>) -> u32 {
        let bin = self.binner.bin(color);
        let lab = srgb_to_lab(color);
        let stats = &mut self.bins[bin as usize];
        stats.count += 1;
        stats.components[0] += lab.l;
        stats.components[1] += lab.a;
        stats.components[2] += lab.b;
        bin
    }

    /// Adds the given pixels to the histogram, writing each pixel's bin index into `labels`.
    fn add_colors(&mut self, pixels: &[Srgba<u8>], labels: &mut [u32]) {
        for (label, pixel) in labels.iter_mut().zip(pixels) {
            *label = self.add_color(pixel.color);
        }
    }

    /// Merges the bins of another partial histogram into this one.
    #[cfg(feature = "threads")]
    #[allow(clippy::needless_pass_by_value)]
    fn merge_partial(mut self, other: Self) -> Self {
        for (a, b) in self.bins.iter_mut().zip(other.bins) {
            *a += b;
        }
        self
    }

    /// Converts each bin's mean color back to sRGB and assembles the output.
    fn finish(self, levels: ChannelLevels, labels: Vec<u32>) -> QuantizeOutput {
        let (palette, counts) = self
            .bins
            .into_iter()
            .map(|stats| (stats.mean_color(), stats.count))
            .unzip();

        QuantizeOutput { levels, palette, counts, labels }
    }
}

/// Quantizes the pixels of `grid` into `levels³` uniform bins.
///
/// The returned [`QuantizeOutput`] has exactly [`ChannelLevels::bins`] palette entries
/// and one label per pixel.
#[must_use]
pub fn indexed_palette(grid: PixelGrid, levels: ChannelLevels) -> QuantizeOutput {
    let mut hist = Histogram::new_zero(levels);
    let mut labels = vec![0; grid.num_pixels()];
    hist.add_colors(grid.pixels(), &mut labels);
    let output = hist.finish(levels, labels);
    log_output(&output);
    output
}

/// Like [`indexed_palette`], but checks `cancel` before and after the pixel scan.
///
/// # Errors
/// Returns [`MosaicError::Cancelled`] if `cancel` was triggered at one of the checkpoints.
pub fn indexed_palette_cancellable(
    grid: PixelGrid,
    levels: ChannelLevels,
    cancel: &CancelToken,
) -> Result<QuantizeOutput, MosaicError> {
    cancel.checkpoint()?;
    let mut hist = Histogram::new_zero(levels);
    let mut labels = vec![0; grid.num_pixels()];
    hist.add_colors(grid.pixels(), &mut labels);
    cancel.checkpoint()?;
    let output = hist.finish(levels, labels);
    log_output(&output);
    Ok(output)
}

/// The number of pixels per parallel work unit.
#[cfg(feature = "threads")]
const PAR_CHUNK_SIZE: usize = 1 << 14;

/// Quantizes the pixels of `grid` into `levels³` uniform bins in parallel.
///
/// The labels are identical to those of [`indexed_palette`]. The image is split into chunks of a
/// fixed size whose partial sums are added in chunk order, so the output does not depend on the
/// number of threads. Since the per-bin sums are still grouped differently than in the single
/// threaded scan, a palette entry may differ from [`indexed_palette`] by one per channel.
#[cfg(feature = "threads")]
#[must_use]
pub fn indexed_palette_par(grid: PixelGrid, levels: ChannelLevels) -> QuantizeOutput {
    let pixels = grid.pixels();
    let mut labels = vec![0; pixels.len()];

    let partials = pixels
        .par_chunks(PAR_CHUNK_SIZE)
        .zip(labels.par_chunks_mut(PAR_CHUNK_SIZE))
        .map(|(pixels, labels)| {
            let mut hist = Histogram::new_zero(levels);
            hist.add_colors(pixels, labels);
            hist
        })
        .collect::<Vec<_>>();

    let hist = partials
        .into_iter()
        .reduce(Histogram::merge_partial)
        .unwrap_or_else(|| Histogram::new_zero(levels));

    let output = hist.finish(levels, labels);
    log_output(&output);
    output
}

/// Quantizes a raw RGBA8 buffer for a requested color count `k`.
///
/// The levels per channel are `round(cbrt(k))` clamped to `2..=MAX_LEVELS`.
///
/// # Errors
/// Returns [`MosaicError::InvalidBufferSize`] if `rgba` is shorter than `4 * width * height`
/// and [`MosaicError::ZeroDimensions`] if either dimension is zero.
///
/// # Examples
/// ```
/// # use pegmosaic::{uniform, MosaicError};
/// # fn main() -> Result<(), MosaicError> {
/// let rgba = [255, 0, 0, 255, 0, 0, 255, 255];
/// let output = uniform::quantize(&rgba, 2, 1, 8)?;
/// assert_eq!(output.palette.len(), 8);
/// assert_eq!(output.labels, vec![4, 1]);
/// # Ok(())
/// # }
/// ```
pub fn quantize(rgba: &[u8], width: u32, height: u32, k: u16) -> Result<QuantizeOutput, MosaicError> {
    let grid = PixelGrid::new(rgba, width, height)?;
    Ok(indexed_palette(grid, ChannelLevels::from_color_count(k, MAX_LEVELS)))
}

/// Quantizes a raw RGBA8 buffer for a requested color count `k` in parallel.
///
/// See [`quantize`] and [`indexed_palette_par`] for more details.
///
/// # Errors
/// Returns the same errors as [`quantize`].
#[cfg(feature = "threads")]
pub fn quantize_par(
    rgba: &[u8],
    width: u32,
    height: u32,
    k: u16,
) -> Result<QuantizeOutput, MosaicError> {
    let grid = PixelGrid::new(rgba, width, height)?;
    Ok(indexed_palette_par(grid, ChannelLevels::from_color_count(k, MAX_LEVELS)))
}

/// Emits a debug event describing a finished quantization.
fn log_output(output: &QuantizeOutput) {
    tracing::debug!(
        levels = output.levels.get(),
        bins = output.palette.len(),
        used_bins = output.used_bins(),
        pixels = output.labels.len(),
        "uniform quantization finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::*;

    fn assert_within_one(actual: Srgb<u8>, expected: Srgb<u8>) {
        assert!(
            actual.red.abs_diff(expected.red) <= 1
                && actual.green.abs_diff(expected.green) <= 1
                && actual.blue.abs_diff(expected.blue) <= 1,
            "{actual:?} != {expected:?}"
        );
    }

    #[test]
    fn channel_bins() {
        let binner = UniformBinner::new(ChannelLevels::from_clamped(2));
        assert_eq!(binner.channel_bin(0), 0);
        assert_eq!(binner.channel_bin(127), 0);
        assert_eq!(binner.channel_bin(128), 1);
        assert_eq!(binner.channel_bin(255), 1);

        let binner = UniformBinner::new(ChannelLevels::from_clamped(3));
        assert_eq!(binner.channel_bin(85), 0);
        assert_eq!(binner.channel_bin(86), 1);
        assert_eq!(binner.channel_bin(170), 1);
        assert_eq!(binner.channel_bin(171), 2);

        let binner = UniformBinner::new(ChannelLevels::MAX);
        assert_eq!(binner.channel_bin(255), 31);
    }

    #[test]
    fn bin_index_layout() {
        let binner = UniformBinner::new(ChannelLevels::from_clamped(4));
        let bin = binner.bin(Srgb::new(255, 64, 0));
        assert_eq!(bin, 3 * 16 + 4);
        assert_eq!(binner.channel_levels(bin), [3, 1, 0]);
    }

    #[test]
    fn labels_in_range_and_palette_length() {
        let (w, h) = (31, 17);
        let rgba = random_rgba(w, h, 7);
        for k in [0, 8, 27, 64, 100, 256, u16::MAX] {
            let output = quantize(&rgba, w, h, k).unwrap();
            let bins = output.levels.bins();
            assert_eq!(output.palette.len(), bins);
            assert_eq!(output.counts.len(), bins);
            assert_eq!(output.labels.len(), (w * h) as usize);
            assert!(output.labels.iter().all(|&l| (l as usize) < bins));
            assert_eq!(output.counts.iter().sum::<u32>(), w * h);
        }
    }

    #[test]
    fn deterministic() {
        let (w, h) = (40, 25);
        let rgba = random_rgba(w, h, 3);
        let a = quantize(&rgba, w, h, 64).unwrap();
        let b = quantize(&rgba, w, h, 64).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn two_color_image_keeps_exact_colors() {
        let red = Srgb::new(200, 30, 40);
        let blue = Srgb::new(20, 60, 220);
        let rgba = rgba_from_colors(&[red, blue, blue, red]);

        let output = quantize(&rgba, 2, 2, 8).unwrap();
        assert_eq!(output.levels.get(), 2);

        let binner = UniformBinner::new(output.levels);
        let red_bin = binner.bin(red);
        let blue_bin = binner.bin(blue);
        assert_eq!(output.labels, vec![red_bin, blue_bin, blue_bin, red_bin]);
        assert_within_one(output.palette[red_bin as usize], red);
        assert_within_one(output.palette[blue_bin as usize], blue);
        assert_eq!(output.counts[red_bin as usize], 2);
        assert_eq!(output.counts[blue_bin as usize], 2);

        for (i, &color) in output.palette.iter().enumerate() {
            if i != red_bin as usize && i != blue_bin as usize {
                assert_eq!(color, EMPTY_BIN_COLOR);
            }
        }
    }

    #[test]
    fn bin_mean_is_computed_in_lab() {
        let a = Srgb::new(10, 20, 30);
        let b = Srgb::new(100, 110, 120);
        let rgba = rgba_from_colors(&[a, b, b]);
        let output = quantize(&rgba, 3, 1, 8).unwrap();

        let (la, lb) = (srgb_to_lab(a), srgb_to_lab(b));
        let expected = lab_to_srgb(Lab64::new(
            (la.l + 2.0 * lb.l) / 3.0,
            (la.a + 2.0 * lb.a) / 3.0,
            (la.b + 2.0 * lb.b) / 3.0,
        ));

        assert_eq!(output.used_bins(), 1);
        assert_eq!(output.palette[output.labels[0] as usize], expected);
    }

    #[test]
    fn solid_image_has_single_label() {
        let color = Srgb::new(93, 181, 47);
        let (w, h) = (9, 5);
        let rgba = solid_rgba(color, w, h);
        for k in [8, 64, 216, 256] {
            let output = quantize(&rgba, w, h, k).unwrap();
            let first = output.labels[0];
            assert!(output.labels.iter().all(|&l| l == first));
            assert_within_one(output.palette[first as usize], color);
        }
    }

    #[test]
    fn alpha_is_ignored() {
        let rgba = [10, 200, 30, 0, 10, 200, 30, 255];
        let output = quantize(&rgba, 2, 1, 27).unwrap();
        assert_eq!(output.labels[0], output.labels[1]);
    }

    #[test]
    fn bad_buffer_size() {
        let rgba = vec![0; 4 * 4 - 1];
        assert_eq!(
            quantize(&rgba, 2, 2, 8),
            Err(MosaicError::InvalidBufferSize { expected: 16, actual: 15 })
        );
    }

    #[test]
    fn cancelled_before_scan() {
        let rgba = random_rgba(4, 4, 1);
        let grid = PixelGrid::new(&rgba, 4, 4).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(
            indexed_palette_cancellable(grid, ChannelLevels::MIN, &cancel),
            Err(MosaicError::Cancelled)
        );

        let cancel = CancelToken::new();
        let output = indexed_palette_cancellable(grid, ChannelLevels::MIN, &cancel).unwrap();
        assert_eq!(output, indexed_palette(grid, ChannelLevels::MIN));
    }

    #[test]
    #[cfg(feature = "threads")]
    fn single_and_multi_threaded_match() {
        let (w, h) = (123, 77);
        let rgba = random_rgba(w, h, 11);
        let grid = PixelGrid::new(&rgba, w, h).unwrap();
        let levels = ChannelLevels::from_clamped(5);

        let single = indexed_palette(grid, levels);
        let par = indexed_palette_par(grid, levels);
        assert_eq!(single.labels, par.labels);
        assert_eq!(single.counts, par.counts);
        for (&a, &b) in single.palette.iter().zip(&par.palette) {
            assert_within_one(a, b);
        }

        let par = quantize_par(&rgba, w, h, 125).unwrap();
        assert_eq!(par.levels, levels);
        assert_eq!(single.labels, par.labels);
    }

    #[test]
    #[cfg(feature = "threads")]
    fn parallel_output_is_independent_of_thread_count() {
        let (w, h) = (300, 200);
        let rgba = random_rgba(w, h, 23);
        let grid = PixelGrid::new(&rgba, w, h).unwrap();
        let levels = ChannelLevels::from_clamped(6);

        let outputs = [1, 2, 3, 8]
            .map(|threads| {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .unwrap()
                    .install(|| indexed_palette_par(grid, levels))
            });

        for output in &outputs[1..] {
            assert_eq!(output, &outputs[0]);
        }
    }
}
