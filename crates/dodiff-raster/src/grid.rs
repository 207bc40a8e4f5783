//! Nodata-masked raster grid.

use crate::{Extent, GeoTransform, RasterError, Result};

/// Conventional fill value stamped on outputs whose template has no nodata.
pub const DEFAULT_NODATA: f32 = -9999.0;

/// Spatial reference of a raster.
///
/// The pipeline never transforms between references; it only needs to compare
/// them for equality and to round-trip them through the GeoKey directory, so
/// the EPSG code plus the model type it was declared under is enough.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpatialRef {
    /// A projected coordinate reference system identified by its EPSG code.
    Projected(u16),
    /// A geographic coordinate reference system identified by its EPSG code.
    Geographic(u16),
    /// No reference recorded in the file.
    Unspecified,
}

impl SpatialRef {
    /// The EPSG code, if one is recorded.
    pub fn epsg(&self) -> Option<u16> {
        match self {
            SpatialRef::Projected(code) | SpatialRef::Geographic(code) => Some(*code),
            SpatialRef::Unspecified => None,
        }
    }
}

impl std::fmt::Display for SpatialRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpatialRef::Projected(code) | SpatialRef::Geographic(code) => {
                write!(f, "EPSG:{code}")
            }
            SpatialRef::Unspecified => write!(f, "unspecified"),
        }
    }
}

/// A single-band elevation raster held fully in memory.
///
/// Samples are stored row-major, north to south. A sample equal to the nodata
/// value (when one is set) or a NaN sample is masked: it is skipped by
/// [`RasterGrid::get`], [`RasterGrid::valid_values`] and every statistic
/// downstream.
///
/// Grids are never mutated in place by the pipeline; each stage that changes
/// one produces a fresh copy.
#[derive(Debug, Clone)]
pub struct RasterGrid {
    width: usize,
    height: usize,
    transform: GeoTransform,
    srs: SpatialRef,
    nodata: Option<f32>,
    data: Vec<f32>,
}

impl RasterGrid {
    /// Create a grid, validating that the buffer matches the dimensions.
    pub fn new(
        width: usize,
        height: usize,
        transform: GeoTransform,
        srs: SpatialRef,
        nodata: Option<f32>,
        data: Vec<f32>,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RasterError::DegenerateDimensions { width, height });
        }
        if data.len() != width * height {
            return Err(RasterError::DataShape {
                len: data.len(),
                width,
                height,
            });
        }
        Ok(Self {
            width,
            height,
            transform,
            srs,
            nodata,
            data,
        })
    }

    /// Create a grid filled entirely with the nodata value.
    pub fn filled_nodata(
        width: usize,
        height: usize,
        transform: GeoTransform,
        srs: SpatialRef,
        nodata: f32,
    ) -> Result<Self> {
        Self::new(
            width,
            height,
            transform,
            srs,
            Some(nodata),
            vec![nodata; width * height],
        )
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// (width, height) in pixels.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// The affine geotransform.
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// The spatial reference.
    pub fn srs(&self) -> SpatialRef {
        self.srs
    }

    /// The nodata value, if one is set.
    pub fn nodata(&self) -> Option<f32> {
        self.nodata
    }

    /// Raw sample buffer, row-major.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Square pixel size in ground units.
    pub fn pixel_size(&self) -> f64 {
        self.transform.pixel_size()
    }

    /// Bounding extent in ground coordinates.
    pub fn extent(&self) -> Extent {
        self.transform.extent(self.width, self.height)
    }

    /// Whether a raw sample counts as masked.
    pub fn is_masked_value(&self, value: f32) -> bool {
        if value.is_nan() {
            return true;
        }
        match self.nodata {
            Some(nd) => value == nd,
            None => false,
        }
    }

    /// The sample at (col, row), or `None` if masked.
    pub fn get(&self, col: usize, row: usize) -> Option<f32> {
        let value = self.data[row * self.width + col];
        if self.is_masked_value(value) {
            None
        } else {
            Some(value)
        }
    }

    /// The raw sample at (col, row), nodata included.
    pub fn raw(&self, col: usize, row: usize) -> f32 {
        self.data[row * self.width + col]
    }

    /// Number of unmasked samples.
    pub fn valid_count(&self) -> usize {
        self.data
            .iter()
            .filter(|v| !self.is_masked_value(**v))
            .count()
    }

    /// Iterator over unmasked sample values.
    pub fn valid_values(&self) -> impl Iterator<Item = f32> + '_ {
        self.data
            .iter()
            .copied()
            .filter(|v| !self.is_masked_value(*v))
    }

    /// A fresh copy with the georeferencing origin translated by (dx, dy).
    ///
    /// Pixel values, shape, and pixel size are untouched.
    pub fn with_translated_origin(&self, dx: f64, dy: f64) -> RasterGrid {
        let mut out = self.clone();
        out.transform = self.transform.translated(dx, dy);
        out
    }

    /// A fresh copy with `offset` added to every unmasked sample.
    pub fn with_value_offset(&self, offset: f32) -> RasterGrid {
        let mut out = self.clone();
        for v in &mut out.data {
            if !self.is_masked_value(*v) {
                *v += offset;
            }
        }
        out
    }

    /// A fresh copy reusing this grid's georeferencing with new samples.
    pub fn with_data(&self, data: Vec<f32>, nodata: Option<f32>) -> Result<RasterGrid> {
        RasterGrid::new(
            self.width,
            self.height,
            self.transform,
            self.srs,
            nodata,
            data,
        )
    }
}
