//! # dodiff-raster
//!
//! In-memory raster model and GeoTIFF I/O for the DEM differencing pipeline.
//!
//! This crate provides:
//! - [`RasterGrid`]: a nodata-masked single-band elevation raster with a full
//!   affine geotransform and spatial reference.
//! - [`GeoTransform`] / [`Extent`]: the affine pixel-to-ground mapping and the
//!   bounding geometry derived from it.
//! - [`read_geotiff`] / [`write_geotiff`]: GeoTIFF decoding and encoding that
//!   preserves georeferencing tags (ModelPixelScale, ModelTiepoint, GeoKey
//!   directory) and the GDAL nodata tag, so rasters written by one pipeline
//!   stage can be reopened by the next.
//!
//! ## Example
//!
//! ```no_run
//! use dodiff_raster::read_geotiff;
//!
//! let dem = read_geotiff("survey_2023_dem.tif")?;
//! println!(
//!     "{}x{} pixels at {:.2} ground units/pixel, {} valid",
//!     dem.width(),
//!     dem.height(),
//!     dem.pixel_size(),
//!     dem.valid_count()
//! );
//! # Ok::<(), dodiff_raster::RasterError>(())
//! ```

mod error;
mod geotiff;
mod geotransform;
mod grid;

pub use error::RasterError;
pub use geotiff::{read_geotiff, write_geotiff};
pub use geotransform::{round_to, Extent, GeoTransform};
pub use grid::{RasterGrid, SpatialRef, DEFAULT_NODATA};

/// Result type for raster operations.
pub type Result<T> = std::result::Result<T, RasterError>;
