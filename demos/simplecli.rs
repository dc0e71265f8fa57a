#![deny(unsafe_code, unsafe_op_in_unsafe_fn)]
#![warn(
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::todo,
    clippy::unimplemented,
    clippy::unneeded_field_pattern,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::unnecessary_self_imports,
    clippy::str_to_string,
    clippy::string_to_string,
    clippy::string_slice
)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use image::imageops::FilterType;
use pegmosaic::{
    BoardGeometry, CandidateLevels, MosaicPipeline, PixelGrid, DEFAULT_COLOR_COUNT,
    MAX_COLOR_COUNT, MIN_COLOR_COUNT,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Subcommand)]
enum Command {
    /// Quantize and consolidate the image, then write the preview.
    Mosaic {
        #[arg(short, long, default_value_t = DEFAULT_COLOR_COUNT)]
        k: u16,

        /// Minimum piece area as a multiple of one hole grid cell.
        #[arg(long, default_value_t = 1.0)]
        min_area: f64,

        #[arg(long, default_value_t = pegmosaic::DEFAULT_MAX_PASSES)]
        passes: u32,

        #[arg(short, long, default_value_t = 0)]
        threads: u8,

        output: PathBuf,
    },
    /// List the color counts that give visibly different results.
    Candidates {
        #[arg(long, default_value_t = 0.05)]
        threshold: f64,
    },
}

#[derive(Parser)]
pub struct Options {
    /// Board width in millimeters, snapped down to whole rows.
    #[arg(long)]
    width_mm: f64,

    /// Board height in millimeters, snapped down to whole rows.
    #[arg(long)]
    height_mm: f64,

    #[arg(long)]
    verbose: bool,

    input: PathBuf,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let Options { width_mm, height_mm, verbose, input, command } = Options::parse();

    let default_filter = if verbose { "pegmosaic=debug" } else { "pegmosaic=warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    macro_rules! log {
        ($name: literal, $val: expr) => {
            if verbose {
                let time = std::time::Instant::now();
                let value = $val;
                println!("{} took {}ms", $name, time.elapsed().as_millis());
                value
            } else {
                $val
            }
        };
    }

    let board = BoardGeometry::new();
    let size = board.working_size(board.snap_to_rows(width_mm), board.snap_to_rows(height_mm));
    let board = board.scaled(size.px_per_mm);
    println!("working grid: {size}");

    let image = log!("read image", image::open(input).unwrap());
    let image = log!(
        "resize image",
        image.resize_exact(size.width, size.height, FilterType::Triangle).into_rgba8()
    );
    let grid = PixelGrid::try_from(&image).unwrap();

    match command {
        Command::Mosaic { k, min_area, passes, threads, output } => {
            let pipeline = MosaicPipeline::new(grid)
                .color_count(k.clamp(MIN_COLOR_COUNT, MAX_COLOR_COUNT))
                .min_area_multiplier(min_area)
                .max_passes(passes)
                .geometry(board)
                .clone();

            let mosaic = log!(
                "quantization and consolidation",
                match threads {
                    0 => pipeline.run_par(),
                    1 => pipeline.run(),
                    t => {
                        let pool = rayon::ThreadPoolBuilder::new()
                            .num_threads(t.into())
                            .build()
                            .unwrap();

                        pool.install(|| pipeline.run_par())
                    }
                }
            )
            .unwrap();

            let report = &mosaic.consolidated;
            println!(
                "{} of {} bins used, {} merges in {} passes, converged: {}",
                mosaic.quantized.used_bins(),
                mosaic.palette().len(),
                report.merges,
                report.passes,
                report.converged,
            );
            if !report.unanchored.is_empty() {
                println!("board too small: no piece can hold a mounting hole");
            }

            let preview = mosaic.to_rgbimage().unwrap();
            log!("write image", preview.save(output).unwrap());
        }
        Command::Candidates { threshold } => {
            let candidates =
                CandidateLevels::new(grid, MIN_COLOR_COUNT..=MAX_COLOR_COUNT).threshold(threshold);

            for candidate in &candidates {
                println!(
                    "k = {:>3}: {} levels, {} bins used",
                    candidate.color_count,
                    candidate.output.levels,
                    candidate.output.used_bins(),
                );
            }
        }
    }
}
