//! A library for turning images into buildable pegboard mosaics.
//!
//! `pegmosaic` works in two stages:
//! 1. [Uniform quantization](uniform): the RGB cube is split into `L × L × L` equal bins
//!    and each bin's color is the CIELAB mean of its pixels.
//!    The result is a fixed palette and one palette index (label) per pixel.
//! 2. [Region consolidation](regions): every 4-connected region of one label must be large
//!    enough to be a stable piece and must contain at least one mounting hole of the board.
//!    Regions that are not are merged into their strongest neighbor and recolored
//!    to the closest existing palette color.
//!
//! # Features
//! To reduce dependencies and compile times, `pegmosaic` has several `cargo` features
//! that can be turned off or on:
//! - `pipelines`: exposes builder structs that serve as the high-level API (more details below).
//! - `threads`: exposes a parallel quantizer and a background [`SessionScheduler`] via [`rayon`].
//! - `image`: enables integration with the [`image`] crate.
//! - `serde`: derives `Serialize` and `Deserialize` for the configuration structs.
//!
//! # High-Level API
//! To get started with the high-level API, see [`MosaicPipeline`].
//! The physical board layout is described by [`BoardGeometry`].
//! ```no_run
//! # use pegmosaic::{BoardGeometry, MosaicPipeline};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let board = BoardGeometry::new();
//! let size = board.working_size(board.snap_to_rows(600.0), board.snap_to_rows(400.0));
//! let img = image::open("some image")?
//!     .resize_exact(size.width, size.height, image::imageops::FilterType::Nearest)
//!     .into_rgba8();
//!
//! let mosaic = MosaicPipeline::try_from(&img)?
//!     .color_count(64) // request up to 64 colors
//!     .min_area_multiplier(0.5) // every piece covers at least half a grid cell
//!     .geometry(board.scaled(size.px_per_mm))
//!     .run_par()?;
//!
//! let preview = mosaic.to_rgbimage()?;
//! # Ok(())
//! # }
//! ```
//!
//! Note that some of the options and functions above require certain features to be enabled.
//!
//! # Low-Level API
//! [`uniform::quantize`] and [`regions::consolidate`] work directly on raw buffers:
//! ```
//! # use pegmosaic::{regions, uniform, MosaicError};
//! # fn main() -> Result<(), MosaicError> {
//! let (width, height) = (32, 32);
//! let rgba = vec![200; 4 * 32 * 32];
//!
//! let quantized = uniform::quantize(&rgba, width, height, 64)?;
//! let labels = regions::consolidate(&quantized.labels, width, height, 64, &quantized.palette, 8.0)?;
//! assert_eq!(labels.len(), 32 * 32);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code, unsafe_op_in_unsafe_fn)]
#![warn(
    clippy::pedantic,
    clippy::cargo,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used,
    clippy::unwrap_in_result,
    clippy::expect_used,
    clippy::unneeded_field_pattern,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::unnecessary_self_imports,
    clippy::str_to_string,
    clippy::string_to_string,
    clippy::string_slice,
    missing_docs,
    clippy::missing_docs_in_private_items,
    rustdoc::all,
    clippy::float_cmp_const,
    clippy::lossy_float_literal
)]
#![allow(
    clippy::doc_markdown,
    clippy::module_name_repetitions,
    clippy::many_single_char_names,
    clippy::missing_panics_doc,
    clippy::unreadable_literal,
    clippy::wildcard_imports
)]

mod cancel;
mod error;
mod types;

#[cfg(feature = "pipelines")]
mod api;

pub mod colorspace;
pub mod regions;
pub mod uniform;

pub use cancel::CancelToken;
pub use error::MosaicError;
pub use types::*;

#[cfg(feature = "pipelines")]
pub use api::*;

use palette::Srgb;

/// The maximum supported image size in number of pixels is `u32::MAX`.
pub const MAX_PIXELS: u32 = u32::MAX;

/// The minimum number of levels per channel is `2`.
pub const MIN_LEVELS: u8 = 2;

/// The maximum number of levels per channel for interactive previews is `16`.
pub const INTERACTIVE_MAX_LEVELS: u8 = 16;

/// The maximum number of levels per channel is `32`.
pub const MAX_LEVELS: u8 = 32;

/// The smallest color count offered to operators is `8`.
pub const MIN_COLOR_COUNT: u16 = 8;

/// The default color count is `64`.
pub const DEFAULT_COLOR_COUNT: u16 = 64;

/// The largest color count offered to operators is `256`.
pub const MAX_COLOR_COUNT: u16 = 256;

/// The default maximum number of consolidation passes is `5`.
pub const DEFAULT_MAX_PASSES: u32 = 5;

/// The palette color of bins without any pixels.
pub const EMPTY_BIN_COLOR: Srgb<u8> = Srgb::new(128, 128, 128);
