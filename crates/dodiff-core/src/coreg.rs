//! Co-registration shift estimation interface.
//!
//! The iterative offset search (Nuth-Kaab, NCC, SAD) lives outside this
//! crate; the pipeline only consumes the resulting (dx, dy, dz) triple.

use crate::shift::AlignmentShift;
use crate::Result;
use std::path::{Path, PathBuf};

/// Offset search algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoregMode {
    /// Nuth and Kaab (2011) slope/aspect regression.
    Nuth,
    /// Normalized cross-correlation.
    Ncc,
    /// Sum of absolute differences.
    Sad,
}

/// Parameters forwarded to the shift estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoregParams {
    /// Offset search algorithm.
    pub mode: CoregMode,
    /// Maximum horizontal offset to search, in ground units.
    pub max_offset: f64,
    /// Maximum vertical offset, in elevation units.
    pub max_dz: f64,
    /// Slope limits (degrees) for pixels contributing to the fit.
    pub slope_lim: (f64, f64),
    /// Maximum number of iterations.
    pub max_iter: u32,
    /// Convergence tolerance in pixels.
    pub tol: f64,
}

impl Default for CoregParams {
    fn default() -> Self {
        Self {
            mode: CoregMode::Nuth,
            max_offset: 100.0,
            max_dz: 100.0,
            slope_lim: (0.1, 40.0),
            max_iter: 30,
            tol: 0.02,
        }
    }
}

/// Estimates the rigid shift aligning a source DEM to a reference DEM.
pub trait ShiftEstimator {
    /// Run the offset search and return the aligned-DEM path it produced
    /// together with the estimated shift.
    fn estimate_shift(
        &self,
        reference: &Path,
        source: &Path,
        params: &CoregParams,
    ) -> Result<(PathBuf, AlignmentShift)>;
}
