//! DEM-of-Difference command line runner.
//!
//! Wraps the `dodiff-core` pipeline in three commands: `diff` for a single
//! match-then-diff run, `shift-diff` for a run with a pre-computed rigid
//! shift, and `batch` for a YAML-driven list of pairs.

mod config;

use clap::{Args, Parser, Subcommand};
use config::BatchConfig;
use dodiff_core::{AlignmentShift, ExtentPolicy, Pipeline, PipelineConfig, ResolutionPolicy};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dodiff")]
#[command(version, about = "DEM of Difference: grid-match, shift, and difference elevation rasters")]
struct Cli {
    /// Verbose diagnostic output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match two DEMs onto a common grid and difference them
    Diff {
        /// Source DEM (minuend)
        source: PathBuf,
        /// Reference DEM (subtrahend)
        reference: PathBuf,

        #[command(flatten)]
        opts: RunOptions,
    },
    /// Apply a rigid (dx, dy, dz) shift to the source DEM, then match and difference
    ShiftDiff {
        /// Source DEM (minuend)
        source: PathBuf,
        /// Reference DEM (subtrahend)
        reference: PathBuf,

        /// Easting offset in ground units
        #[arg(long, allow_hyphen_values = true)]
        dx: f64,
        /// Northing offset in ground units
        #[arg(long, allow_hyphen_values = true)]
        dy: f64,
        /// Vertical offset in elevation units
        #[arg(long, allow_hyphen_values = true)]
        dz: f64,

        #[command(flatten)]
        opts: RunOptions,
    },
    /// Run every pair listed in a YAML batch file
    Batch {
        /// Batch configuration file
        config: PathBuf,
    },
}

#[derive(Args)]
struct RunOptions {
    /// Output directory (default: alongside the source DEM)
    #[arg(long)]
    outdir: Option<PathBuf>,

    /// Difference raster target: a .tif path used verbatim, or a directory
    #[arg(long)]
    out: Option<PathBuf>,

    /// Statistics log file (default: Matched_DoD_Stats.txt in the output directory)
    #[arg(long)]
    stats_log: Option<PathBuf>,

    /// Target pixel size when grids disagree: min, max, mean, common_scale_factor
    #[arg(long, default_value = "max")]
    resolution: ResolutionPolicy,

    /// Target extent when grids disagree: intersection, union, first, second
    #[arg(long, default_value = "intersection")]
    extent: ExtentPolicy,

    /// Skip grid matching (inputs must already share a grid)
    #[arg(long)]
    no_match: bool,

    /// Line written at the top of a freshly started statistics log (repeatable)
    #[arg(long)]
    preamble: Vec<String>,
}

impl RunOptions {
    fn into_config(self, shift: AlignmentShift) -> PipelineConfig {
        PipelineConfig {
            resolution: self.resolution,
            extent: self.extent,
            outdir: self.outdir,
            diff_target: self.out,
            stats_log: self.stats_log,
            shift,
            match_grids: !self.no_match,
            log_preamble: self.preamble,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    match cli.command {
        Commands::Diff {
            source,
            reference,
            opts,
        } => run_pair(&source, &reference, opts.into_config(AlignmentShift::None)),
        Commands::ShiftDiff {
            source,
            reference,
            dx,
            dy,
            dz,
            opts,
        } => run_pair(
            &source,
            &reference,
            opts.into_config(AlignmentShift::Full { dx, dy, dz }),
        ),
        Commands::Batch { config } => run_batch(&config),
    }
}

fn run_pair(source: &PathBuf, reference: &PathBuf, config: PipelineConfig) -> ExitCode {
    match Pipeline::new(config).run(source, reference) {
        Ok(output) => {
            info!(
                diff = %output.diff_path.display(),
                stats = %output.stats_path.display(),
                "differencing complete"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run_batch(path: &PathBuf) -> ExitCode {
    let batch = match BatchConfig::load(path) {
        Ok(batch) => batch,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let total = batch.pairs.len();
    let mut failures = 0usize;
    for (i, pair) in batch.pairs.iter().enumerate() {
        info!(
            pair = i + 1,
            total,
            source = %pair.source.display(),
            reference = %pair.reference.display(),
            "starting pair"
        );
        let config = batch.pipeline_config(pair, i == 0);
        // One bad pair must not sink the rest of the batch
        if let Err(err) = Pipeline::new(config).run(&pair.source, &pair.reference) {
            error!(
                source = %pair.source.display(),
                "pair failed: {err}"
            );
            failures += 1;
        }
    }

    if failures > 0 {
        error!(failures, total, "batch finished with failures");
        ExitCode::FAILURE
    } else {
        info!(total, "batch finished");
        ExitCode::SUCCESS
    }
}
