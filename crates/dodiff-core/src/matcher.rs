//! Grid matching: reconciling two rasters onto a common grid.

use crate::diff::{EXTENT_DECIMALS, RES_DECIMALS};
use crate::naming::stage_path;
use crate::persist::persist_grid;
use crate::policy::{ExtentPolicy, ResolutionPolicy};
use crate::warp::{Interpolation, ResampleWarp, WarpProvider, WarpTarget};
use crate::{DodError, Result};
use dodiff_raster::{read_geotiff, round_to, RasterGrid};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Result of an in-memory alignment check.
#[derive(Debug)]
pub enum Alignment {
    /// The rasters already share pixel size (to 4 decimals) and extent
    /// (to 3 decimals). Nothing was regridded.
    AlreadyAligned,
    /// Both rasters were regridded onto a single target grid.
    Regridded {
        /// The regridded reference raster.
        reference: RasterGrid,
        /// The regridded source raster.
        source: RasterGrid,
        /// Post-warp resolution tolerance warning, if the outputs still
        /// disagree. Soft: the pipeline continues.
        warning: Option<String>,
    },
}

/// Result of matching two raster files.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    /// Path of the aligned reference raster.
    pub reference: PathBuf,
    /// Path of the aligned source raster.
    pub source: PathBuf,
    /// Whether a regrid was performed (false for the pass-through fast path).
    pub regridded: bool,
    /// Soft conditions recorded during matching.
    pub warnings: Vec<String>,
}

/// Decides whether two rasters share a common grid and regrids them when not.
///
/// The pass-through fast path is the default: when rounded pixel sizes and
/// extents already agree, the original raster identities are returned and no
/// warp call is made.
#[derive(Debug)]
pub struct GridMatcher<W = ResampleWarp> {
    warp: W,
    write_reference: bool,
}

impl GridMatcher<ResampleWarp> {
    /// Matcher using the built-in resampler.
    pub fn new() -> Self {
        Self::with_warp(ResampleWarp::new())
    }
}

impl Default for GridMatcher<ResampleWarp> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: WarpProvider> GridMatcher<W> {
    /// Matcher delegating regrids to the given warp provider.
    pub fn with_warp(warp: W) -> Self {
        Self {
            warp,
            write_reference: true,
        }
    }

    /// Whether `match_files` persists the regridded reference (default true).
    ///
    /// Disable only when the caller already has the reference on the target
    /// grid and needs just the source regridded.
    pub fn write_reference(mut self, write: bool) -> Self {
        self.write_reference = write;
        self
    }

    /// Align two in-memory rasters onto a common grid.
    ///
    /// Comparisons happen in the source raster's native reference by
    /// convention; since reprojection is out of scope, rasters in differing
    /// references are rejected outright.
    pub fn align(
        &self,
        reference: &RasterGrid,
        source: &RasterGrid,
        resolution: ResolutionPolicy,
        extent: ExtentPolicy,
    ) -> Result<Alignment> {
        if reference.srs() != source.srs() {
            return Err(DodError::Warp(format!(
                "reference is {} but source is {}; reprojection is not supported",
                reference.srs(),
                source.srs()
            )));
        }

        let ref_res = round_to(reference.pixel_size(), RES_DECIMALS);
        let src_res = round_to(source.pixel_size(), RES_DECIMALS);
        let ref_extent = reference.extent().rounded(EXTENT_DECIMALS);
        let src_extent = source.extent().rounded(EXTENT_DECIMALS);

        if ref_res == src_res && ref_extent == src_extent {
            info!("reference and source DEMs are already aligned");
            return Ok(Alignment::AlreadyAligned);
        }

        info!(ref_res, src_res, %resolution, %extent, "warping rasters to common grid");

        let target_res = resolution.resolve(reference.pixel_size(), source.pixel_size());
        let target_extent = extent
            .resolve(reference.extent(), source.extent())
            .ok_or_else(|| {
                DodError::Warp("extents do not overlap; no intersection grid exists".to_string())
            })?;
        let target = WarpTarget {
            extent: target_extent,
            resolution: target_res,
            srs: source.srs(),
            interpolation: Interpolation::Cubic,
        };

        let mut regridded = self.warp.regrid_many(&[reference, source], &target)?;
        let source_out = regridded.remove(1);
        let reference_out = regridded.remove(0);

        let warning = resolution_warning(&source_out, &reference_out);
        if let Some(msg) = &warning {
            warn!("{msg}");
        }
        info!(resolution = source_out.pixel_size(), "matched resolution");

        Ok(Alignment::Regridded {
            reference: reference_out,
            source: source_out,
            warning,
        })
    }

    /// Match two raster files, persisting `<basename>_matched.tif` outputs.
    ///
    /// On the pass-through fast path the original file identities are
    /// returned untouched and nothing is written.
    pub fn match_files(
        &self,
        reference: &Path,
        source: &Path,
        outdir: &Path,
        resolution: ResolutionPolicy,
        extent: ExtentPolicy,
    ) -> Result<MatchOutcome> {
        let ref_grid = open_input(reference)?;
        let src_grid = open_input(source)?;

        match self.align(&ref_grid, &src_grid, resolution, extent)? {
            Alignment::AlreadyAligned => Ok(MatchOutcome {
                reference: reference.to_path_buf(),
                source: source.to_path_buf(),
                regridded: false,
                warnings: Vec::new(),
            }),
            Alignment::Regridded {
                reference: ref_out,
                source: src_out,
                warning,
            } => {
                let src_path = stage_path(source, Some(outdir), "matched");
                persist_grid(&src_out, &src_path)?;
                info!(output = %src_path.display(), "wrote matched source DEM");

                let ref_path = if self.write_reference {
                    let p = stage_path(reference, Some(outdir), "matched");
                    persist_grid(&ref_out, &p)?;
                    info!(output = %p.display(), "wrote matched reference DEM");
                    p
                } else {
                    reference.to_path_buf()
                };

                Ok(MatchOutcome {
                    reference: ref_path,
                    source: src_path,
                    regridded: true,
                    warnings: warning.into_iter().collect(),
                })
            }
        }
    }
}

/// Open an input raster, mapping failures to the fatal input error.
pub fn open_input(path: &Path) -> Result<RasterGrid> {
    read_geotiff(path).map_err(|source| DodError::Input {
        path: path.to_path_buf(),
        source,
    })
}

/// Check the matched outputs against the resolution tolerance.
fn resolution_warning(source: &RasterGrid, reference: &RasterGrid) -> Option<String> {
    let src_res = round_to(source.pixel_size(), RES_DECIMALS);
    let ref_res = round_to(reference.pixel_size(), RES_DECIMALS);
    if src_res != ref_res {
        Some(format!(
            "Resolution of source, reference DEMs: {:.4}, {:.4}",
            source.pixel_size(),
            reference.pixel_size()
        ))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dodiff_raster::{GeoTransform, SpatialRef};
    use std::cell::Cell;

    /// Delegates to the built-in resampler while counting regrid calls.
    struct RecordingWarp {
        calls: Cell<usize>,
    }

    impl RecordingWarp {
        fn new() -> Self {
            Self { calls: Cell::new(0) }
        }
    }

    impl WarpProvider for RecordingWarp {
        fn regrid_many(
            &self,
            grids: &[&RasterGrid],
            target: &WarpTarget,
        ) -> Result<Vec<RasterGrid>> {
            self.calls.set(self.calls.get() + 1);
            ResampleWarp::new().regrid_many(grids, target)
        }
    }

    fn grid(origin_x: f64, origin_y: f64, size: usize, res: f64, value: f32) -> RasterGrid {
        RasterGrid::new(
            size,
            size,
            GeoTransform::north_up(origin_x, origin_y, res, res),
            SpatialRef::Projected(32613),
            Some(-9999.0),
            vec![value; size * size],
        )
        .unwrap()
    }

    #[test]
    fn aligned_inputs_pass_through_without_warp() {
        let matcher = GridMatcher::with_warp(RecordingWarp::new());
        let a = grid(0.0, 8.0, 8, 1.0, 1.0);
        let b = grid(0.0, 8.0, 8, 1.0, 2.0);

        let alignment = matcher
            .align(&a, &b, ResolutionPolicy::Max, ExtentPolicy::Intersection)
            .unwrap();
        assert!(matches!(alignment, Alignment::AlreadyAligned));
        assert_eq!(matcher.warp.calls.get(), 0);
    }

    #[test]
    fn sub_tolerance_jitter_still_passes_through() {
        let matcher = GridMatcher::with_warp(RecordingWarp::new());
        let a = grid(0.0, 8.0, 8, 1.0, 1.0);
        // 0.0001 rounds away at 3 decimals
        let b = grid(0.0001, 8.0001, 8, 1.0, 2.0);

        let alignment = matcher
            .align(&a, &b, ResolutionPolicy::Max, ExtentPolicy::Intersection)
            .unwrap();
        assert!(matches!(alignment, Alignment::AlreadyAligned));
        assert_eq!(matcher.warp.calls.get(), 0);
    }

    #[test]
    fn mismatched_grids_are_regridded_onto_one_target() {
        let matcher = GridMatcher::new();
        let reference = grid(0.0, 16.0, 16, 1.0, 10.0);
        let source = grid(4.0, 12.0, 16, 0.5, 12.0);

        let alignment = matcher
            .align(
                &reference,
                &source,
                ResolutionPolicy::Max,
                ExtentPolicy::Intersection,
            )
            .unwrap();
        let Alignment::Regridded {
            reference: r,
            source: s,
            warning,
        } = alignment
        else {
            panic!("expected a regrid");
        };
        assert_eq!(r.dimensions(), s.dimensions());
        assert_eq!(r.transform(), s.transform());
        assert_eq!(r.pixel_size(), 1.0);
        assert!(warning.is_none());
        // Intersection of [0,16]x[0,16] and [4,12]x[4,12]
        let ext = s.extent();
        assert_eq!(ext.xmin, 4.0);
        assert_eq!(ext.ymax, 12.0);
    }

    #[test]
    fn disjoint_extents_cannot_intersect() {
        let matcher = GridMatcher::new();
        let a = grid(0.0, 8.0, 8, 1.0, 1.0);
        let b = grid(100.0, 108.0, 8, 1.0, 2.0);

        let err = matcher.align(&a, &b, ResolutionPolicy::Max, ExtentPolicy::Intersection);
        assert!(matches!(err, Err(DodError::Warp(_))));
    }

    #[test]
    fn differing_references_are_rejected() {
        let matcher = GridMatcher::new();
        let a = grid(0.0, 8.0, 8, 1.0, 1.0);
        let b = RasterGrid::new(
            8,
            8,
            GeoTransform::north_up(0.0, 8.0, 1.0, 1.0),
            SpatialRef::Geographic(4326),
            None,
            vec![1.0; 64],
        )
        .unwrap();

        let err = matcher.align(&a, &b, ResolutionPolicy::Max, ExtentPolicy::Intersection);
        assert!(matches!(err, Err(DodError::Warp(_))));
    }

    #[test]
    fn match_files_pass_through_keeps_identities() {
        let dir = tempfile::tempdir().unwrap();
        let ref_path = dir.path().join("ref.tif");
        let src_path = dir.path().join("src.tif");
        dodiff_raster::write_geotiff(&grid(0.0, 8.0, 8, 1.0, 1.0), &ref_path).unwrap();
        dodiff_raster::write_geotiff(&grid(0.0, 8.0, 8, 1.0, 2.0), &src_path).unwrap();

        let outcome = GridMatcher::new()
            .match_files(
                &ref_path,
                &src_path,
                dir.path(),
                ResolutionPolicy::Max,
                ExtentPolicy::Intersection,
            )
            .unwrap();
        assert!(!outcome.regridded);
        assert_eq!(outcome.reference, ref_path);
        assert_eq!(outcome.source, src_path);
        assert!(!dir.path().join("ref_matched.tif").exists());
        assert!(!dir.path().join("src_matched.tif").exists());
    }

    #[test]
    fn match_files_writes_matched_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let ref_path = dir.path().join("ref.tif");
        let src_path = dir.path().join("src.tif");
        dodiff_raster::write_geotiff(&grid(0.0, 16.0, 16, 1.0, 10.0), &ref_path).unwrap();
        dodiff_raster::write_geotiff(&grid(4.0, 12.0, 16, 0.5, 12.0), &src_path).unwrap();

        let outcome = GridMatcher::new()
            .match_files(
                &ref_path,
                &src_path,
                dir.path(),
                ResolutionPolicy::Max,
                ExtentPolicy::Intersection,
            )
            .unwrap();
        assert!(outcome.regridded);
        assert_eq!(outcome.reference, dir.path().join("ref_matched.tif"));
        assert_eq!(outcome.source, dir.path().join("src_matched.tif"));

        let r = read_geotiff(&outcome.reference).unwrap();
        let s = read_geotiff(&outcome.source).unwrap();
        assert_eq!(r.dimensions(), s.dimensions());
        assert_eq!(r.transform(), s.transform());
    }

    #[test]
    fn write_reference_off_leaves_reference_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let ref_path = dir.path().join("ref.tif");
        let src_path = dir.path().join("src.tif");
        dodiff_raster::write_geotiff(&grid(0.0, 16.0, 16, 1.0, 10.0), &ref_path).unwrap();
        dodiff_raster::write_geotiff(&grid(4.0, 12.0, 16, 0.5, 12.0), &src_path).unwrap();

        let outcome = GridMatcher::new()
            .write_reference(false)
            .match_files(
                &ref_path,
                &src_path,
                dir.path(),
                ResolutionPolicy::Max,
                ExtentPolicy::Intersection,
            )
            .unwrap();
        assert!(outcome.regridded);
        // Only the source is regridded to disk; the caller keeps its reference
        assert_eq!(outcome.reference, ref_path);
        assert_eq!(outcome.source, dir.path().join("src_matched.tif"));
        assert!(!dir.path().join("ref_matched.tif").exists());
    }

    #[test]
    fn missing_input_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = GridMatcher::new().match_files(
            Path::new("/nonexistent/ref.tif"),
            Path::new("/nonexistent/src.tif"),
            dir.path(),
            ResolutionPolicy::Max,
            ExtentPolicy::Intersection,
        );
        assert!(matches!(err, Err(DodError::Input { .. })));
    }
}
