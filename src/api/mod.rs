//! Contains the types and functions for the high level pipeline builder API.

mod board;
mod candidates;
mod mosaic_pipeline;
#[cfg(feature = "threads")]
mod task;

pub use board::{BoardGeometry, WorkingSize};
pub use candidates::{difference_ratio, Candidate, CandidateLevels, Candidates};
pub use mosaic_pipeline::{Mosaic, MosaicOptions, MosaicPipeline};
#[cfg(feature = "threads")]
pub use task::{JobHandle, SessionScheduler};
