use palette::Srgb;
use pegmosaic::{
    indexed_to_rgb,
    regions::{consolidate, AdjacencyGraph, AnchorGrid, Components, ConsolidateOptions, Consolidator},
    uniform, BoardGeometry, CancelToken, MosaicError, MosaicPipeline, PixelGrid,
};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoroshiro128PlusPlus;

fn noise(width: u32, height: u32, seed: u64) -> Vec<u8> {
    let mut rng = Xoroshiro128PlusPlus::seed_from_u64(seed);
    (0..width * height)
        .flat_map(|_| {
            let [r, g, b]: [u8; 3] = rng.gen();
            [r, g, b, u8::MAX]
        })
        .collect()
}

/// Vertical stripes of four colors with a few stray pixels.
fn stripes(width: u32, height: u32) -> Vec<u8> {
    let colors = [[230, 40, 40], [40, 200, 60], [30, 60, 220], [240, 240, 240]];
    (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .flat_map(|(x, y)| {
            let stray = x % 7 == 3 && y % 5 == 2;
            let i = if stray { (x / 8 + 1) % 4 } else { (x / 8) % 4 };
            let [r, g, b] = colors[i as usize];
            [r, g, b, u8::MAX]
        })
        .collect()
}

fn compliant(labels: &[u32], width: u32, height: u32, min_area: u32, pitch: f64) -> bool {
    let comps = Components::new(labels, width, height).unwrap();
    let graph = AdjacencyGraph::new(&comps);
    let anchored = AnchorGrid::new(pitch, width, height).unwrap().anchored(&comps).unwrap();
    (0..comps.len() as u32).all(|id| {
        (comps.size(id) >= min_area && anchored[id as usize]) || graph.neighbors(id).is_empty()
    })
}

#[test]
fn quantize_then_consolidate() {
    let (w, h) = (64, 48);
    let rgba = stripes(w, h);
    let quantized = uniform::quantize(&rgba, w, h, 27).unwrap();
    assert_eq!(quantized.palette.len(), 27);

    let labels = consolidate(&quantized.labels, w, h, 16, &quantized.palette, 4.0).unwrap();
    assert_eq!(labels.len(), (w * h) as usize);
    assert!(labels.iter().all(|&l| (l as usize) < quantized.palette.len()));
    assert!(compliant(&labels, w, h, 16, 4.0));

    // stray pixels are absorbed by their stripe
    assert_eq!(labels[2 * w as usize + 3], labels[2 * w as usize]);
}

#[test]
fn red_corner_is_absorbed() {
    let mut rgba = [0, 0, 255, 255].repeat(64);
    for p in [0, 1, 8, 9] {
        rgba[p * 4..p * 4 + 4].copy_from_slice(&[255, 0, 0, 255]);
    }

    let quantized = uniform::quantize(&rgba, 8, 8, 8).unwrap();
    let blue = quantized.labels[63];
    assert_ne!(quantized.labels[0], blue);

    let labels = consolidate(&quantized.labels, 8, 8, 8, &quantized.palette, 4.0).unwrap();
    assert_eq!(labels, vec![blue; 64]);

    let colors = indexed_to_rgb(&quantized.palette, &labels).unwrap();
    assert!(colors.iter().all(|c| c.blue > 250 && c.red < 5));
}

#[test]
fn noise_converges_with_enough_passes() {
    let (w, h) = (40, 40);
    let rgba = noise(w, h, 99);
    let quantized = uniform::quantize(&rgba, w, h, 64).unwrap();

    let options = ConsolidateOptions::new(25, 8.0).max_passes(200);
    let consolidator =
        Consolidator::new(&quantized.labels, w, h, &quantized.palette, options).unwrap();
    let output = consolidator.run();
    assert!(output.converged);
    assert!(compliant(&output.labels, w, h, 25, 8.0));

    let again = Consolidator::new(&output.labels, w, h, &quantized.palette, options)
        .unwrap()
        .run();
    assert_eq!(again.labels, output.labels);
    assert_eq!(again.merges, 0);

    assert_eq!(consolidator.run_cancellable(&CancelToken::new()), Ok(output));
}

#[test]
fn invalid_input() {
    assert_eq!(
        uniform::quantize(&[0; 12], 2, 2, 8),
        Err(MosaicError::InvalidBufferSize { expected: 16, actual: 12 })
    );
    assert_eq!(
        uniform::quantize(&[], 0, 0, 8),
        Err(MosaicError::ZeroDimensions { width: 0, height: 0 })
    );

    let palette = [Srgb::new(0, 0, 0)];
    let err = consolidate(&[0; 3], 2, 2, 4, &palette, 4.0).unwrap_err();
    assert_eq!(err, MosaicError::DimensionMismatch { expected: 4, actual: 3 });
    assert!(err.is_invalid_input());

    assert_eq!(
        consolidate(&[0; 4], 2, 2, 4, &palette, 0.0),
        Err(MosaicError::InvalidPitch(0.0))
    );
}

#[test]
fn pipeline_on_board_geometry() {
    let board = BoardGeometry::new().px_per_mm(0.5);
    let size = board.working_size(board.snap_to_rows(300.0), board.snap_to_rows(200.0));
    assert_eq!((size.width, size.height), (144, 96));

    let rgba = stripes(size.width, size.height);
    let grid = PixelGrid::new(&rgba, size.width, size.height).unwrap();
    let mosaic = MosaicPipeline::new(grid)
        .color_count(64)
        .min_area_multiplier(0.5)
        .max_passes(50)
        .geometry(board.scaled(size.px_per_mm))
        .run()
        .unwrap();

    // pitch 4 px, min area 8 px
    assert!(mosaic.consolidated.converged);
    assert!(compliant(mosaic.labels(), size.width, size.height, 8, 4.0));
    assert!(mosaic.consolidated.unanchored.is_empty());
}

#[test]
fn cancelled_pipeline() {
    let rgba = noise(16, 16, 5);
    let grid = PixelGrid::new(&rgba, 16, 16).unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();
    assert_eq!(
        MosaicPipeline::new(grid).run_cancellable(&cancel),
        Err(MosaicError::Cancelled)
    );
}
