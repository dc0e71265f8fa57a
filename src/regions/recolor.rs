//! Reassigns merged groups of components to existing palette colors.

use crate::regions::Components;
use ordered_float::OrderedFloat;
use palette::Srgb;

/// Returns the index of the palette color closest to `color` by squared RGB distance.
///
/// Ties go to the lowest index. Returns `None` if the palette is empty.
#[must_use]
pub fn nearest_palette_index(palette: &[Srgb<u8>], color: [f64; 3]) -> Option<u32> {
    palette
        .iter()
        .map(|p| {
            let [r, g, b] = color;
            let dr = f64::from(p.red) - r;
            let dg = f64::from(p.green) - g;
            let db = f64::from(p.blue) - b;
            OrderedFloat(dr * dr + dg * dg + db * db)
        })
        .enumerate()
        .min_by_key(|&(_, dist)| dist)
        .and_then(|(i, _)| u32::try_from(i).ok())
}

/// Creates a new label map where each group of merged components takes the palette color
/// nearest to the mean of its pixels' original palette colors.
///
/// `roots` maps each component id to the id representing its group.
/// Every pixel contributes its original bin's palette color once,
/// so larger components weigh more in the group's mean.
/// Unmerged components snap to the lowest palette index holding their own color.
/// The palette is never extended, so the output only uses indices into `palette`.
///
/// # Panics
/// Panics if a component's bin is not a valid index into `palette`
/// or if `roots` does not have one entry per component.
#[must_use]
pub fn recolor(components: &Components, roots: &[u32], palette: &[Srgb<u8>]) -> Vec<u32> {
    assert_eq!(roots.len(), components.len());

    let mut sums = vec![[0u64; 3]; components.len()];
    let mut counts = vec![0u64; components.len()];
    for ((&bin, &size), &root) in components.bins().iter().zip(components.sizes()).zip(roots) {
        let color = palette[bin as usize];
        let size = u64::from(size);
        let sum = &mut sums[root as usize];
        sum[0] += u64::from(color.red) * size;
        sum[1] += u64::from(color.green) * size;
        sum[2] += u64::from(color.blue) * size;
        counts[root as usize] += size;
    }

    let group_labels = sums
        .iter()
        .zip(&counts)
        .zip(components.bins())
        .map(|((&sum, &count), &bin)| {
            if count == 0 {
                // not a root
                bin
            } else {
                #[allow(clippy::cast_precision_loss)]
                let n = count as f64;
                #[allow(clippy::cast_precision_loss)]
                let mean = sum.map(|s| s as f64 / n);
                nearest_palette_index(palette, mean).unwrap_or(bin)
            }
        })
        .collect::<Vec<_>>();

    components
        .ids()
        .iter()
        .map(|&id| group_labels[roots[id as usize] as usize])
        .collect()
}
