//! Pipeline orchestration: shift, match, difference, report.

use crate::diff::{difference, RES_DECIMALS};
use crate::matcher::{open_input, GridMatcher};
use crate::naming::{default_stats_log, resolve_diff_target};
use crate::persist::persist_grid;
use crate::policy::{ExtentPolicy, ResolutionPolicy};
use crate::report::{Manifest, StatisticsReport, StatsLog};
use crate::shift::{shift_file, AlignmentShift};
use crate::stats::DiffStatistics;
use crate::warp::{ResampleWarp, WarpProvider};
use crate::Result;
use dodiff_raster::round_to;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration for one differencing run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Target pixel-size policy when grids disagree.
    pub resolution: ResolutionPolicy,
    /// Target extent policy when grids disagree.
    pub extent: ExtentPolicy,
    /// Output directory. Defaults to the source raster's directory.
    pub outdir: Option<PathBuf>,
    /// Output target for the difference raster: a `.tif` path used verbatim,
    /// a directory, or absent for the conventional name.
    pub diff_target: Option<PathBuf>,
    /// Statistics log path. Defaults to `Matched_DoD_Stats.txt` in the
    /// output directory.
    pub stats_log: Option<PathBuf>,
    /// Co-registration shift applied to the source before matching.
    pub shift: AlignmentShift,
    /// Whether to run the grid matcher. Disable only when the caller
    /// guarantees the inputs are already co-registered on a common grid.
    pub match_grids: bool,
    /// Free-text lines written at the top of a freshly started statistics
    /// log, before the manifest.
    pub log_preamble: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            resolution: ResolutionPolicy::Max,
            extent: ExtentPolicy::Intersection,
            outdir: None,
            diff_target: None,
            stats_log: None,
            shift: AlignmentShift::None,
            match_grids: true,
            log_preamble: Vec::new(),
        }
    }
}

/// Artifacts produced by one differencing run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Path of the difference raster.
    pub diff_path: PathBuf,
    /// Path of the statistics log.
    pub stats_path: PathBuf,
    /// The completed statistics report.
    pub report: StatisticsReport,
}

/// The end-to-end differencing pipeline.
///
/// Runs the supported workflows over a source/reference pair of DEM files:
/// match-then-diff, and shift-then-diff where a caller-supplied
/// co-registration shift is applied to the source first (shifting moves the
/// source grid, so it happens before matching re-establishes a common grid).
/// Every run finishes by persisting the difference raster and appending a
/// statistics report to the log, even when the statistics are degenerate.
#[derive(Debug)]
pub struct Pipeline<W = ResampleWarp> {
    matcher: GridMatcher<W>,
    config: PipelineConfig,
}

impl Pipeline<ResampleWarp> {
    /// Pipeline using the built-in resampler.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            matcher: GridMatcher::new(),
            config,
        }
    }
}

impl<W: WarpProvider> Pipeline<W> {
    /// Pipeline delegating regrids to the given warp provider.
    pub fn with_warp(config: PipelineConfig, warp: W) -> Self {
        Self {
            matcher: GridMatcher::with_warp(warp),
            config,
        }
    }

    /// Run the pipeline for one source/reference pair.
    pub fn run(&self, source: &Path, reference: &Path) -> Result<PipelineOutput> {
        let outdir = match &self.config.outdir {
            Some(dir) => dir.clone(),
            None => source
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        };
        std::fs::create_dir_all(&outdir)?;

        let diff_path = match (&self.config.diff_target, &self.config.outdir) {
            (Some(target), _) => resolve_diff_target(source, Some(target)),
            (None, Some(dir)) => resolve_diff_target(source, Some(dir)),
            (None, None) => resolve_diff_target(source, None),
        };

        info!(
            source = %source.display(),
            reference = %reference.display(),
            output = %diff_path.display(),
            "starting differencing run"
        );

        // Shift first: translating the source origin changes its grid, so
        // the matcher must see the shifted raster.
        let src_current = if self.config.shift.is_none() {
            source.to_path_buf()
        } else {
            shift_file(source, &outdir, &self.config.shift)?
        };

        let mut warnings = Vec::new();
        let (ref_aligned, src_aligned) = if self.config.match_grids {
            let outcome = self.matcher.match_files(
                reference,
                &src_current,
                &outdir,
                self.config.resolution,
                self.config.extent,
            )?;
            warnings.extend(outcome.warnings);
            (outcome.reference, outcome.source)
        } else {
            (reference.to_path_buf(), src_current.clone())
        };

        let ref_grid = open_input(&ref_aligned)?;
        let src_grid = open_input(&src_aligned)?;

        let src_res = src_grid.pixel_size();
        let ref_res = ref_grid.pixel_size();
        if round_to(src_res, RES_DECIMALS) != round_to(ref_res, RES_DECIMALS) {
            let msg = format!(
                "Resolution of source, reference DEMs: {src_res:.4}, {ref_res:.4}"
            );
            warn!("{msg}");
            warnings.push(msg);
        }

        info!("computing difference map");
        let diff = difference(&src_grid, &ref_grid)?;
        persist_grid(&diff, &diff_path)?;
        info!(output = %diff_path.display(), "wrote difference raster");

        let statistics = DiffStatistics::compute(&diff);
        if statistics.is_undefined() {
            warnings.push("difference raster has no valid pixels".to_string());
        }

        let stats_path = self
            .config
            .stats_log
            .clone()
            .unwrap_or_else(|| default_stats_log(&outdir));
        let log = if stats_path.exists() && self.config.log_preamble.is_empty() {
            StatsLog::append(&stats_path)?
        } else {
            let log = StatsLog::create(&stats_path)?;
            for line in &self.config.log_preamble {
                log.log(line)?;
            }
            log
        };

        let manifest = Manifest {
            source: source.to_path_buf(),
            reference: reference.to_path_buf(),
            diff: diff_path.clone(),
            outdir,
            source_resolution: src_res,
            reference_resolution: ref_res,
            warnings,
        };
        let report = StatisticsReport::new(statistics, manifest);
        report.write_to(&log)?;
        info!(log = %stats_path.display(), "wrote statistics report");

        Ok(PipelineOutput {
            diff_path,
            stats_path,
            report,
        })
    }
}
