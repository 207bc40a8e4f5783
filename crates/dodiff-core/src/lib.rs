//! # dodiff-core
//!
//! DEM-of-Difference (DoD) pipeline: compare two raster elevation surfaces
//! captured at different times or by different sensors and quantify the
//! surface change between them.
//!
//! The pipeline stages are:
//!
//! - [`GridMatcher`]: decide whether two rasters already share a common grid;
//!   when they do not, regrid both onto a single target resolution/extent
//!   through a [`WarpProvider`].
//! - [`apply_shift`]: apply a rigid (dx, dy, dz) co-registration offset to a
//!   raster without resampling.
//! - [`difference`]: compute the elementwise `source − reference` raster,
//!   propagating nodata from either input.
//! - [`DiffStatistics`] / [`StatisticsReport`]: summarize the difference with
//!   a fixed, ordered battery of robust statistics and persist it to a
//!   plain-text log.
//! - [`Pipeline`]: compose the stages into the match-then-diff and
//!   shift-then-diff workflows with conventional output naming.
//!
//! ## Example
//!
//! ```no_run
//! use dodiff_core::{Pipeline, PipelineConfig};
//! use std::path::Path;
//!
//! let pipeline = Pipeline::new(PipelineConfig::default());
//! let output = pipeline.run(
//!     Path::new("survey_2023_dem.tif"),
//!     Path::new("survey_2021_dem.tif"),
//! )?;
//! println!("DoD: {}", output.diff_path.display());
//! println!("Mean change: {:.4}", output.report.statistics.mean);
//! # Ok::<(), dodiff_core::DodError>(())
//! ```

mod coreg;
mod diff;
mod error;
mod matcher;
pub mod naming;
mod persist;
mod pipeline;
mod policy;
mod report;
mod shift;
mod stats;
mod warp;

pub use coreg::{CoregMode, CoregParams, ShiftEstimator};
pub use diff::{difference, EXTENT_DECIMALS, RES_DECIMALS};
pub use error::DodError;
pub use matcher::{Alignment, GridMatcher, MatchOutcome};
pub use pipeline::{Pipeline, PipelineConfig, PipelineOutput};
pub use policy::{ExtentPolicy, ResolutionPolicy};
pub use report::{Manifest, StatisticsReport, StatsLog};
pub use shift::{apply_shift, shift_file, AlignmentShift};
pub use stats::DiffStatistics;
pub use warp::{Interpolation, ResampleWarp, WarpProvider, WarpTarget};

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, DodError>;
