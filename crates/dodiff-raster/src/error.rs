//! Error types for raster I/O and grid construction.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when reading, writing, or constructing rasters.
#[derive(Debug, Error)]
pub enum RasterError {
    /// I/O error reading or writing a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF decoding or encoding error.
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// The file has no usable georeferencing tags.
    #[error("No georeferencing found in {0}")]
    MissingGeoreference(PathBuf),

    /// The raster uses a rotated geotransform, which this pipeline does not handle.
    #[error("Rotated geotransform in {path} (rotation terms {rot_x}, {rot_y})")]
    RotatedTransform {
        /// File the transform was read from.
        path: PathBuf,
        /// Row rotation term.
        rot_x: f64,
        /// Column rotation term.
        rot_y: f64,
    },

    /// Sample buffer length does not match the declared dimensions.
    #[error("Data length {len} does not match {width}x{height} grid")]
    DataShape {
        /// Length of the provided sample buffer.
        len: usize,
        /// Declared grid width.
        width: usize,
        /// Declared grid height.
        height: usize,
    },

    /// Raster dimensions that cannot be represented (zero-sized axis).
    #[error("Degenerate raster dimensions {width}x{height}")]
    DegenerateDimensions {
        /// Declared grid width.
        width: usize,
        /// Declared grid height.
        height: usize,
    },
}
