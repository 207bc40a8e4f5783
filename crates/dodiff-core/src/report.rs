//! Persistent statistics log and report writing.

use crate::stats::DiffStatistics;
use crate::Result;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

const HEADER_SEPARATOR: &str = "----------------------------------------------";

/// Append-mode plain-text statistics log.
///
/// The file handle is wrapped in a mutex so multiple pairs sharing one log
/// file serialize their writes; a report is always written as one contiguous
/// block.
#[derive(Debug)]
pub struct StatsLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl StatsLog {
    /// Start a fresh log: truncate the file and write the separator line.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::create(&path)?;
        writeln!(file, "{HEADER_SEPARATOR}")?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Open a log for appending, creating it if absent.
    pub fn append<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Path of the underlying log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one line, mirrored to the diagnostic log.
    pub fn log(&self, msg: &str) -> Result<()> {
        info!("{msg}");
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(file, "{msg}")?;
        Ok(())
    }
}

/// File-path manifest and matching context for one differencing run.
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Source DEM path (as supplied by the caller).
    pub source: PathBuf,
    /// Reference DEM path.
    pub reference: PathBuf,
    /// Difference raster path.
    pub diff: PathBuf,
    /// Output directory.
    pub outdir: PathBuf,
    /// Matched resolution of the source DEM.
    pub source_resolution: f64,
    /// Matched resolution of the reference DEM.
    pub reference_resolution: f64,
    /// Soft conditions recorded during matching and differencing.
    pub warnings: Vec<String>,
}

/// A completed report: the metric battery plus its manifest.
///
/// Created once per differencing run, appended to the log, never mutated.
#[derive(Debug, Clone)]
pub struct StatisticsReport {
    /// The computed metrics.
    pub statistics: DiffStatistics,
    /// File-path manifest and matching context.
    pub manifest: Manifest,
}

impl StatisticsReport {
    /// Assemble a report.
    pub fn new(statistics: DiffStatistics, manifest: Manifest) -> Self {
        Self {
            statistics,
            manifest,
        }
    }

    /// Write the header block and the 12 metric lines to the log.
    pub fn write_to(&self, log: &StatsLog) -> Result<()> {
        let m = &self.manifest;
        log.log(&format!("Source DEM: {}", file_name(&m.source)))?;
        log.log(&format!("Reference DEM: {}", file_name(&m.reference)))?;
        log.log(&format!("DoD File (src-ref): {}", file_name(&m.diff)))?;
        log.log(&format!("Output directory: {}", m.outdir.display()))?;
        log.log(&format!(
            "Resolution of source, reference DEMs: {:.4}, {:.4}",
            m.source_resolution, m.reference_resolution
        ))?;
        for warning in &m.warnings {
            log.log(&format!("WARNING: {warning}"))?;
        }
        for (label, value) in self.statistics.metrics() {
            log.log(&format!("{label}: {value:.4}"))?;
        }
        Ok(())
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(dir: &Path) -> Manifest {
        Manifest {
            source: PathBuf::from("/data/src_dem.tif"),
            reference: PathBuf::from("/data/ref_dem.tif"),
            diff: dir.join("Matched_DoD.tif"),
            outdir: dir.to_path_buf(),
            source_resolution: 0.25,
            reference_resolution: 0.25,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn report_has_header_and_twelve_metric_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("stats.txt");
        let log = StatsLog::create(&log_path).unwrap();

        let stats = DiffStatistics::from_values(&[0.5, -0.5, 1.0]);
        let report = StatisticsReport::new(stats, manifest(dir.path()));
        report.write_to(&log).unwrap();
        drop(log);

        let text = std::fs::read_to_string(&log_path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        // separator + 5 header lines + 12 metrics
        assert_eq!(lines.len(), 18);
        assert_eq!(lines[0], HEADER_SEPARATOR);
        assert_eq!(lines[1], "Source DEM: src_dem.tif");
        assert!(lines[5].starts_with("Resolution of source, reference DEMs: 0.2500, 0.2500"));
        assert!(lines[6].starts_with("Average difference: 0.3333"));
        assert!(lines[17].starts_with("Absolute 99th percentile difference:"));
    }

    #[test]
    fn append_preserves_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("stats.txt");

        {
            let log = StatsLog::create(&log_path).unwrap();
            log.log("first run").unwrap();
        }
        {
            let log = StatsLog::append(&log_path).unwrap();
            log.log("second run").unwrap();
        }

        let text = std::fs::read_to_string(&log_path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec![HEADER_SEPARATOR, "first run", "second run"]);
    }

    #[test]
    fn undefined_statistics_write_nan_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("stats.txt");
        let log = StatsLog::create(&log_path).unwrap();

        let report = StatisticsReport::new(DiffStatistics::undefined(), manifest(dir.path()));
        report.write_to(&log).unwrap();
        drop(log);

        let text = std::fs::read_to_string(&log_path).unwrap();
        assert!(text.contains("Average difference: NaN"));
        assert!(text.contains("Absolute maximum difference: NaN"));
    }
}
