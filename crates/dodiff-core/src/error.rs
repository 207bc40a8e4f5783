//! Error types for the differencing pipeline.

use dodiff_raster::RasterError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while running the differencing pipeline.
#[derive(Debug, Error)]
pub enum DodError {
    /// An input raster could not be opened or read. Fatal for the pair.
    #[error("Cannot open input raster {path}: {source}")]
    Input {
        /// Path of the raster that failed to open.
        path: PathBuf,
        /// Underlying raster error.
        source: RasterError,
    },

    /// The difference engine received inputs that are not grid-aligned.
    ///
    /// This is unreachable when the grid matcher ran first; hitting it means
    /// an upstream stage violated its contract.
    #[error("Inputs are not grid-aligned ({reason}): source {source_grid}, reference {reference_grid}")]
    GridMismatch {
        /// Which part of the alignment contract was violated.
        reason: String,
        /// Summary of the source grid (dimensions, pixel size, origin).
        source_grid: String,
        /// Summary of the reference grid.
        reference_grid: String,
    },

    /// The warp provider cannot satisfy a regrid request.
    #[error("Warp request unsupported: {0}")]
    Warp(String),

    /// Raster I/O or construction error.
    #[error(transparent)]
    Raster(#[from] RasterError),

    /// Output write failure. Artifacts already written remain valid.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
