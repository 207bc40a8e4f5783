//! YAML batch configuration.
//!
//! A batch file lists source/reference pairs sharing one set of policy
//! defaults, each pair optionally carrying its own pre-computed shift:
//!
//! ```yaml
//! resolution: max
//! extent: intersection
//! outdir: /data/dod_runs
//! preamble:
//!   - "2021 vs 2023 survey comparison"
//! pairs:
//!   - source: /data/2023/reach1_dem.tif
//!     reference: /data/2021/reach1_dem.tif
//!     shift: { dx: 0.31, dy: -0.12, dz: 0.05 }
//!   - source: /data/2023/reach2_dem.tif
//!     reference: /data/2021/reach2_dem.tif
//! ```

use dodiff_core::{AlignmentShift, ExtentPolicy, PipelineConfig, ResolutionPolicy};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Errors raised while loading a batch file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("config file {path} lists no pairs")]
    Empty { path: PathBuf },
}

/// A rigid shift as written in the batch file.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ShiftSpec {
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

impl From<ShiftSpec> for AlignmentShift {
    fn from(s: ShiftSpec) -> Self {
        AlignmentShift::Full {
            dx: s.dx,
            dy: s.dy,
            dz: s.dz,
        }
    }
}

/// One source/reference pair.
#[derive(Debug, Clone, Deserialize)]
pub struct PairSpec {
    pub source: PathBuf,
    pub reference: PathBuf,
    /// Pre-computed co-registration shift for this pair.
    #[serde(default)]
    pub shift: Option<ShiftSpec>,
    /// Per-pair output directory, overriding the batch default.
    #[serde(default)]
    pub outdir: Option<PathBuf>,
}

/// A batch of differencing runs sharing policy defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_resolution")]
    pub resolution: ResolutionPolicy,
    #[serde(default = "default_extent")]
    pub extent: ExtentPolicy,
    /// Default output directory for every pair.
    #[serde(default)]
    pub outdir: Option<PathBuf>,
    /// Shared statistics log. Absent means the per-pair default location.
    #[serde(default)]
    pub stats_log: Option<PathBuf>,
    /// Lines written at the top of a freshly started statistics log.
    #[serde(default)]
    pub preamble: Vec<String>,
    /// Skip grid matching for pairs already on a common grid.
    #[serde(default)]
    pub no_match: bool,
    pub pairs: Vec<PairSpec>,
}

fn default_resolution() -> ResolutionPolicy {
    ResolutionPolicy::Max
}

fn default_extent() -> ExtentPolicy {
    ExtentPolicy::Intersection
}

impl BatchConfig {
    /// Load and validate a batch file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: BatchConfig =
            serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        if config.pairs.is_empty() {
            return Err(ConfigError::Empty {
                path: path.to_path_buf(),
            });
        }
        Ok(config)
    }

    /// Pipeline configuration for one pair of this batch.
    ///
    /// The shared preamble is only attached to the first pair; later pairs
    /// append to the log the first pair started.
    pub fn pipeline_config(&self, pair: &PairSpec, first: bool) -> PipelineConfig {
        PipelineConfig {
            resolution: self.resolution,
            extent: self.extent,
            outdir: pair.outdir.clone().or_else(|| self.outdir.clone()),
            diff_target: None,
            stats_log: self.stats_log.clone(),
            shift: pair
                .shift
                .map(AlignmentShift::from)
                .unwrap_or(AlignmentShift::None),
            match_grids: !self.no_match,
            log_preamble: if first {
                self.preamble.clone()
            } else {
                Vec::new()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(text: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(text.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let (_dir, path) = write_config(
            "pairs:\n  - source: a.tif\n    reference: b.tif\n",
        );
        let config = BatchConfig::load(&path).unwrap();
        assert_eq!(config.resolution, ResolutionPolicy::Max);
        assert_eq!(config.extent, ExtentPolicy::Intersection);
        assert_eq!(config.pairs.len(), 1);
        assert!(config.pairs[0].shift.is_none());
    }

    #[test]
    fn full_config_round_trips() {
        let (_dir, path) = write_config(
            "resolution: common_scale_factor\n\
             extent: union\n\
             outdir: /tmp/out\n\
             preamble:\n  - \"header line\"\n\
             pairs:\n\
             \x20 - source: a.tif\n\
             \x20   reference: b.tif\n\
             \x20   shift: { dx: 0.5, dy: -0.25, dz: 0.1 }\n\
             \x20 - source: c.tif\n\
             \x20   reference: d.tif\n\
             \x20   outdir: /tmp/other\n",
        );
        let config = BatchConfig::load(&path).unwrap();
        assert_eq!(config.resolution, ResolutionPolicy::CommonScaleFactor);
        assert_eq!(config.extent, ExtentPolicy::Union);
        assert_eq!(config.pairs.len(), 2);

        let first = config.pipeline_config(&config.pairs[0], true);
        assert_eq!(
            first.shift,
            AlignmentShift::Full {
                dx: 0.5,
                dy: -0.25,
                dz: 0.1
            }
        );
        assert_eq!(first.outdir.as_deref(), Some(Path::new("/tmp/out")));
        assert_eq!(first.log_preamble, vec!["header line".to_string()]);

        let second = config.pipeline_config(&config.pairs[1], false);
        assert!(second.shift.is_none());
        assert_eq!(second.outdir.as_deref(), Some(Path::new("/tmp/other")));
        assert!(second.log_preamble.is_empty());
    }

    #[test]
    fn empty_pair_list_is_rejected() {
        let (_dir, path) = write_config("pairs: []\n");
        assert!(matches!(
            BatchConfig::load(&path),
            Err(ConfigError::Empty { .. })
        ));
    }

    #[test]
    fn unknown_policy_fails_to_parse() {
        let (_dir, path) = write_config(
            "resolution: median\npairs:\n  - source: a.tif\n    reference: b.tif\n",
        );
        assert!(matches!(
            BatchConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
