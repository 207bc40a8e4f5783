//! Elementwise differencing of grid-aligned rasters.

use crate::{DodError, Result};
use dodiff_raster::{round_to, RasterGrid, DEFAULT_NODATA};
use tracing::debug;

/// Decimal places to which pixel sizes must agree.
pub const RES_DECIMALS: u32 = 4;

/// Decimal places to which extent coordinates must agree.
pub const EXTENT_DECIMALS: u32 = 3;

/// Compute the difference raster `source − reference`.
///
/// Both inputs must share shape, geotransform (pixel size to 4 decimal
/// places, extent to 3) and spatial reference; the grid matcher is the sole
/// producer of that guarantee, so a violation here is an upstream contract
/// bug and fails with [`DodError::GridMismatch`].
///
/// A pixel is nodata in the output when it is nodata in either input. The
/// output reuses the reference raster's georeferencing and nodata value.
pub fn difference(source: &RasterGrid, reference: &RasterGrid) -> Result<RasterGrid> {
    check_aligned(source, reference)?;

    let nodata = reference
        .nodata()
        .or(source.nodata())
        .unwrap_or(DEFAULT_NODATA);

    let (width, height) = reference.dimensions();
    let mut data = vec![nodata; width * height];
    let mut valid = 0usize;
    for row in 0..height {
        for col in 0..width {
            if let (Some(s), Some(r)) = (source.get(col, row), reference.get(col, row)) {
                data[row * width + col] = s - r;
                valid += 1;
            }
        }
    }
    debug!(valid, total = width * height, "computed difference map");

    Ok(RasterGrid::new(
        width,
        height,
        *reference.transform(),
        reference.srs(),
        Some(nodata),
        data,
    )?)
}

fn grid_summary(grid: &RasterGrid) -> String {
    let t = grid.transform();
    format!(
        "{}x{} @ {:.4} origin ({:.3}, {:.3}) {}",
        grid.width(),
        grid.height(),
        grid.pixel_size(),
        t.origin_x,
        t.origin_y,
        grid.srs()
    )
}

fn mismatch(reason: &str, source: &RasterGrid, reference: &RasterGrid) -> DodError {
    DodError::GridMismatch {
        reason: reason.to_string(),
        source_grid: grid_summary(source),
        reference_grid: grid_summary(reference),
    }
}

/// Enforce the alignment precondition.
fn check_aligned(source: &RasterGrid, reference: &RasterGrid) -> Result<()> {
    if source.dimensions() != reference.dimensions() {
        return Err(mismatch("shape differs", source, reference));
    }
    if source.srs() != reference.srs() {
        return Err(mismatch("spatial reference differs", source, reference));
    }
    let src_res = round_to(source.pixel_size(), RES_DECIMALS);
    let ref_res = round_to(reference.pixel_size(), RES_DECIMALS);
    if src_res != ref_res {
        return Err(mismatch("pixel size differs", source, reference));
    }
    if source.extent().rounded(EXTENT_DECIMALS) != reference.extent().rounded(EXTENT_DECIMALS) {
        return Err(mismatch("extent differs", source, reference));
    }
    Ok(())
}
