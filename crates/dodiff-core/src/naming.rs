//! Output path policy.
//!
//! Every stage derives its output name here, so the `_matched` / `_shifted` /
//! `_diff` convention lives in one place instead of being rebuilt by string
//! concatenation at each call site.

use std::path::{Path, PathBuf};

/// File extension for raster outputs.
pub const RASTER_EXT: &str = "tif";

/// Conventional difference file name used when only a directory is given.
pub const DEFAULT_DIFF_NAME: &str = "Matched_DoD.tif";

/// Conventional statistics log name used when none is given.
pub const DEFAULT_STATS_NAME: &str = "Matched_DoD_Stats.txt";

/// `<basename>_<suffix>.tif`, placed in `outdir` or alongside the input.
pub fn stage_path(input: &Path, outdir: Option<&Path>, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "raster".to_string());
    let name = format!("{stem}_{suffix}.{RASTER_EXT}");
    match outdir {
        Some(dir) => dir.join(name),
        None => input.with_file_name(name),
    }
}

/// Resolve the difference-raster path from the caller's output target.
///
/// - a target ending in the raster extension is used verbatim;
/// - a directory target gets the conventional file name inside it;
/// - no target places `<source stem>_diff.tif` alongside the source.
pub fn resolve_diff_target(source: &Path, target: Option<&Path>) -> PathBuf {
    match target {
        Some(t) if t.extension().is_some_and(|e| e == RASTER_EXT) => t.to_path_buf(),
        Some(dir) => dir.join(DEFAULT_DIFF_NAME),
        None => stage_path(source, None, "diff"),
    }
}

/// Default statistics log path inside the output directory.
pub fn default_stats_log(outdir: &Path) -> PathBuf {
    outdir.join(DEFAULT_STATS_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_path_alongside_input() {
        let p = stage_path(Path::new("/data/survey_dem.tif"), None, "matched");
        assert_eq!(p, Path::new("/data/survey_dem_matched.tif"));
    }

    #[test]
    fn stage_path_in_outdir() {
        let p = stage_path(
            Path::new("/data/survey_dem.tif"),
            Some(Path::new("/out")),
            "shifted",
        );
        assert_eq!(p, Path::new("/out/survey_dem_shifted.tif"));
    }

    #[test]
    fn diff_target_rules() {
        let src = Path::new("/data/a.tif");
        assert_eq!(
            resolve_diff_target(src, Some(Path::new("/out/custom.tif"))),
            Path::new("/out/custom.tif")
        );
        assert_eq!(
            resolve_diff_target(src, Some(Path::new("/out"))),
            Path::new("/out/Matched_DoD.tif")
        );
        assert_eq!(
            resolve_diff_target(src, None),
            Path::new("/data/a_diff.tif")
        );
    }
}
