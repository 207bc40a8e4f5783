//! Warp collaborator interface and the built-in same-reference resampler.

use crate::{DodError, Result};
use dodiff_raster::{Extent, GeoTransform, RasterGrid, SpatialRef, DEFAULT_NODATA};

/// Interpolation kernel used when regridding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    /// Catmull-Rom bicubic over a 4x4 neighborhood. The pipeline default.
    Cubic,
    /// Bilinear over a 2x2 neighborhood.
    Bilinear,
    /// Nearest neighbor.
    Nearest,
}

/// A regrid request: the single grid every input is resampled onto.
#[derive(Debug, Clone, Copy)]
pub struct WarpTarget {
    /// Bounding extent of the target grid.
    pub extent: Extent,
    /// Square pixel size of the target grid.
    pub resolution: f64,
    /// Spatial reference of the target grid.
    pub srs: SpatialRef,
    /// Interpolation kernel.
    pub interpolation: Interpolation,
}

/// Regrids rasters onto a common target grid.
///
/// The grid matcher is the only consumer. Implementations must return one
/// output per input, in order, each sharing the target's shape, geotransform
/// and reference.
pub trait WarpProvider {
    /// Regrid every input onto the target grid.
    fn regrid_many(&self, grids: &[&RasterGrid], target: &WarpTarget) -> Result<Vec<RasterGrid>>;
}

/// Built-in resampler for inputs already in the target's spatial reference.
///
/// Reprojection between references is out of scope; requests that need it are
/// rejected so mismatched rasters fail loudly instead of being compared in
/// incompatible coordinates.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResampleWarp;

impl ResampleWarp {
    /// Create a resampler.
    pub fn new() -> Self {
        Self
    }
}

impl WarpProvider for ResampleWarp {
    fn regrid_many(&self, grids: &[&RasterGrid], target: &WarpTarget) -> Result<Vec<RasterGrid>> {
        grids.iter().map(|g| regrid(g, target)).collect()
    }
}

/// Dimensions of the target grid, GDAL-style (rounded, at least one pixel).
fn target_shape(target: &WarpTarget) -> (usize, usize) {
    let width = (target.extent.width() / target.resolution).round().max(1.0) as usize;
    let height = (target.extent.height() / target.resolution).round().max(1.0) as usize;
    (width, height)
}

fn regrid(grid: &RasterGrid, target: &WarpTarget) -> Result<RasterGrid> {
    if grid.srs() != target.srs {
        return Err(DodError::Warp(format!(
            "cannot regrid {} raster onto {} target: reprojection is not supported",
            grid.srs(),
            target.srs
        )));
    }

    let (width, height) = target_shape(target);
    let transform = GeoTransform::north_up(
        target.extent.xmin,
        target.extent.ymax,
        target.resolution,
        target.resolution,
    );
    let nodata = grid.nodata().unwrap_or(DEFAULT_NODATA);

    let mut data = vec![nodata; width * height];
    for row in 0..height {
        for col in 0..width {
            let (x, y) = transform.pixel_center(col, row);
            let (src_col, src_row) = grid.transform().ground_to_pixel(x, y);
            if let Some(value) = sample(grid, src_col, src_row, target.interpolation) {
                data[row * width + col] = value;
            }
        }
    }

    Ok(RasterGrid::new(
        width,
        height,
        transform,
        grid.srs(),
        Some(nodata),
        data,
    )?)
}

/// Sample the grid at fractional pixel coordinates.
///
/// Falls back from cubic to bilinear to nearest when the wider neighborhood
/// touches masked samples, so nodata never bleeds into interpolated values.
fn sample(grid: &RasterGrid, col: f64, row: f64, interpolation: Interpolation) -> Option<f32> {
    if col < -0.5
        || row < -0.5
        || col > grid.width() as f64 - 0.5
        || row > grid.height() as f64 - 0.5
    {
        return None;
    }
    match interpolation {
        Interpolation::Cubic => sample_cubic(grid, col, row),
        Interpolation::Bilinear => sample_bilinear(grid, col, row),
        Interpolation::Nearest => sample_nearest(grid, col, row),
    }
}

fn sample_nearest(grid: &RasterGrid, col: f64, row: f64) -> Option<f32> {
    let c = clamp_index(col.round() as i64, grid.width());
    let r = clamp_index(row.round() as i64, grid.height());
    grid.get(c, r)
}

fn sample_bilinear(grid: &RasterGrid, col: f64, row: f64) -> Option<f32> {
    let c0 = col.floor() as i64;
    let r0 = row.floor() as i64;
    let fc = (col - c0 as f64) as f32;
    let fr = (row - r0 as f64) as f32;

    let mut values = [[0.0f32; 2]; 2];
    for (j, r) in (r0..r0 + 2).enumerate() {
        for (i, c) in (c0..c0 + 2).enumerate() {
            let c = clamp_index(c, grid.width());
            let r = clamp_index(r, grid.height());
            match grid.get(c, r) {
                Some(v) => values[j][i] = v,
                // Masked neighbor: drop to nearest so nodata stays nodata
                None => return sample_nearest(grid, col, row),
            }
        }
    }

    let top = values[0][0] * (1.0 - fc) + values[0][1] * fc;
    let bottom = values[1][0] * (1.0 - fc) + values[1][1] * fc;
    Some(top * (1.0 - fr) + bottom * fr)
}

fn sample_cubic(grid: &RasterGrid, col: f64, row: f64) -> Option<f32> {
    let c0 = col.floor() as i64;
    let r0 = row.floor() as i64;
    let fc = (col - c0 as f64) as f32;
    let fr = (row - r0 as f64) as f32;

    let mut values = [[0.0f32; 4]; 4];
    for j in 0..4i64 {
        for i in 0..4i64 {
            let c = clamp_index(c0 + i - 1, grid.width());
            let r = clamp_index(r0 + j - 1, grid.height());
            match grid.get(c, r) {
                Some(v) => values[j as usize][i as usize] = v,
                // Masked neighbor anywhere in the 4x4 window: fall back
                None => return sample_bilinear(grid, col, row),
            }
        }
    }

    let mut rows = [0.0f32; 4];
    for j in 0..4 {
        rows[j] = cubic_1d(values[j][0], values[j][1], values[j][2], values[j][3], fc);
    }
    Some(cubic_1d(rows[0], rows[1], rows[2], rows[3], fr))
}

/// 1D Catmull-Rom spline.
fn cubic_1d(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;

    let a = -0.5 * p0 + 1.5 * p1 - 1.5 * p2 + 0.5 * p3;
    let b = p0 - 2.5 * p1 + 2.0 * p2 - 0.5 * p3;
    let c = -0.5 * p0 + 0.5 * p2;
    let d = p1;

    a * t3 + b * t2 + c * t + d
}

fn clamp_index(i: i64, len: usize) -> usize {
    i.clamp(0, len as i64 - 1) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn flat_grid(width: usize, height: usize, value: f32) -> RasterGrid {
        RasterGrid::new(
            width,
            height,
            GeoTransform::north_up(0.0, height as f64, 1.0, 1.0),
            SpatialRef::Projected(32613),
            Some(-9999.0),
            vec![value; width * height],
        )
        .unwrap()
    }

    #[test]
    fn identity_target_preserves_flat_surface() {
        let grid = flat_grid(8, 8, 42.0);
        let target = WarpTarget {
            extent: grid.extent(),
            resolution: 1.0,
            srs: SpatialRef::Projected(32613),
            interpolation: Interpolation::Cubic,
        };
        let out = ResampleWarp::new()
            .regrid_many(&[&grid], &target)
            .unwrap()
            .remove(0);
        assert_eq!(out.dimensions(), (8, 8));
        for v in out.valid_values() {
            assert_relative_eq!(v, 42.0);
        }
        assert_eq!(out.valid_count(), 64);
    }

    #[test]
    fn downsampling_halves_dimensions() {
        let grid = flat_grid(8, 8, 5.0);
        let target = WarpTarget {
            extent: grid.extent(),
            resolution: 2.0,
            srs: SpatialRef::Projected(32613),
            interpolation: Interpolation::Cubic,
        };
        let out = ResampleWarp::new()
            .regrid_many(&[&grid], &target)
            .unwrap()
            .remove(0);
        assert_eq!(out.dimensions(), (4, 4));
        assert_relative_eq!(out.pixel_size(), 2.0);
    }

    #[test]
    fn samples_outside_source_are_nodata() {
        let grid = flat_grid(4, 4, 7.0);
        // Target extends one pixel past the source on every side
        let src_ext = grid.extent();
        let target = WarpTarget {
            extent: Extent {
                xmin: src_ext.xmin - 1.0,
                ymin: src_ext.ymin - 1.0,
                xmax: src_ext.xmax + 1.0,
                ymax: src_ext.ymax + 1.0,
            },
            resolution: 1.0,
            srs: SpatialRef::Projected(32613),
            interpolation: Interpolation::Bilinear,
        };
        let out = ResampleWarp::new()
            .regrid_many(&[&grid], &target)
            .unwrap()
            .remove(0);
        assert_eq!(out.dimensions(), (6, 6));
        // Border ring is outside the source
        assert_eq!(out.get(0, 0), None);
        assert_eq!(out.get(5, 5), None);
        assert_eq!(out.get(2, 2), Some(7.0));
    }

    #[test]
    fn differing_reference_is_rejected() {
        let grid = flat_grid(4, 4, 7.0);
        let target = WarpTarget {
            extent: grid.extent(),
            resolution: 1.0,
            srs: SpatialRef::Geographic(4326),
            interpolation: Interpolation::Cubic,
        };
        let err = ResampleWarp::new().regrid_many(&[&grid], &target);
        assert!(matches!(err, Err(DodError::Warp(_))));
    }

    #[test]
    fn cubic_falls_back_near_nodata() {
        let mut data = vec![3.0f32; 25];
        data[12] = -9999.0;
        let grid = RasterGrid::new(
            5,
            5,
            GeoTransform::north_up(0.0, 5.0, 1.0, 1.0),
            SpatialRef::Unspecified,
            Some(-9999.0),
            data,
        )
        .unwrap();
        let target = WarpTarget {
            extent: grid.extent(),
            resolution: 1.0,
            srs: SpatialRef::Unspecified,
            interpolation: Interpolation::Cubic,
        };
        let out = ResampleWarp::new()
            .regrid_many(&[&grid], &target)
            .unwrap()
            .remove(0);
        // The masked pixel stays masked, neighbors stay finite
        assert_eq!(out.get(2, 2), None);
        assert_eq!(out.get(1, 1), Some(3.0));
        assert_eq!(out.valid_count(), 24);
    }
}
