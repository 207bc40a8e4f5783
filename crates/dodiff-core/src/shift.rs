//! Rigid co-registration shift application.

use crate::naming::stage_path;
use crate::persist::persist_grid;
use crate::{DodError, Result};
use dodiff_raster::{read_geotiff, RasterGrid};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A rigid (dx, dy, dz) offset in ground units.
///
/// Either all three components are present or the shift is a no-op; partial
/// triples cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlignmentShift {
    /// No shift is applied.
    None,
    /// Translate the origin by (dx, dy) and add dz to every valid sample.
    Full {
        /// Easting offset in ground units.
        dx: f64,
        /// Northing offset in ground units.
        dy: f64,
        /// Vertical offset in elevation units.
        dz: f64,
    },
}

impl AlignmentShift {
    /// Build from optional components. Any absent component yields `None`.
    pub fn from_parts(dx: Option<f64>, dy: Option<f64>, dz: Option<f64>) -> Self {
        match (dx, dy, dz) {
            (Some(dx), Some(dy), Some(dz)) => AlignmentShift::Full { dx, dy, dz },
            _ => AlignmentShift::None,
        }
    }

    /// Whether this shift is a no-op.
    pub fn is_none(&self) -> bool {
        matches!(self, AlignmentShift::None)
    }

    /// Component-wise mean of the full shifts in `shifts`.
    ///
    /// Used when one averaged offset is applied to a set of DEMs that were
    /// co-registered independently. Returns `None` when no full shift exists.
    pub fn mean_of(shifts: &[AlignmentShift]) -> AlignmentShift {
        let mut sum = (0.0, 0.0, 0.0);
        let mut count = 0usize;
        for shift in shifts {
            if let AlignmentShift::Full { dx, dy, dz } = shift {
                sum.0 += dx;
                sum.1 += dy;
                sum.2 += dz;
                count += 1;
            }
        }
        if count == 0 {
            AlignmentShift::None
        } else {
            let n = count as f64;
            AlignmentShift::Full {
                dx: sum.0 / n,
                dy: sum.1 / n,
                dz: sum.2 / n,
            }
        }
    }

    /// The inverse shift.
    pub fn inverted(&self) -> AlignmentShift {
        match *self {
            AlignmentShift::None => AlignmentShift::None,
            AlignmentShift::Full { dx, dy, dz } => AlignmentShift::Full {
                dx: -dx,
                dy: -dy,
                dz: -dz,
            },
        }
    }
}

impl std::fmt::Display for AlignmentShift {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlignmentShift::None => write!(f, "none"),
            AlignmentShift::Full { dx, dy, dz } => {
                write!(f, "({dx:.4}, {dy:.4}, {dz:.4})")
            }
        }
    }
}

/// Apply a shift to a raster, producing a fresh copy.
///
/// The horizontal part only rewrites the geotransform origin; pixel values
/// are never resampled. The vertical part adds dz to every valid sample.
/// Shape and pixel size are unchanged. An absent shift returns an unmodified
/// copy.
pub fn apply_shift(grid: &RasterGrid, shift: &AlignmentShift) -> RasterGrid {
    match *shift {
        AlignmentShift::None => grid.clone(),
        AlignmentShift::Full { dx, dy, dz } => {
            debug!(dx, dy, dz, "applying rigid shift");
            grid.with_translated_origin(dx, dy)
                .with_value_offset(dz as f32)
        }
    }
}

/// Apply a shift to a raster file, writing `<basename>_shifted.tif`.
///
/// An absent shift still writes an unmodified copy so downstream naming stays
/// uniform across workflows.
pub fn shift_file(src: &Path, outdir: &Path, shift: &AlignmentShift) -> Result<PathBuf> {
    let grid = read_geotiff(src).map_err(|source| DodError::Input {
        path: src.to_path_buf(),
        source,
    })?;

    info!(source = %src.display(), %shift, "shifting DEM");
    let shifted = apply_shift(&grid, shift);
    let out = stage_path(src, Some(outdir), "shifted");
    persist_grid(&shifted, &out)?;
    info!(output = %out.display(), "wrote shifted DEM");
    Ok(out)
}
