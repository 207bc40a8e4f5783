//! Robust statistics over the difference raster.

use dodiff_raster::RasterGrid;
use statrs::statistics::{Data, OrderStatistics, Statistics};
use tracing::warn;

/// The fixed, ordered metric battery computed over valid difference values.
///
/// `positive_mean` and `negative_mean` are computed over the raw signed
/// differences while every dispersion metric is over |v|. The asymmetry is
/// deliberate: the signed means report bias direction, the absolute metrics
/// report error magnitude. They are not a symmetric pair.
///
/// When the valid-value set is empty, every metric is NaN.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiffStatistics {
    /// Mean of the signed differences.
    pub mean: f64,
    /// Mean of the positive signed differences.
    pub positive_mean: f64,
    /// Mean of the negative signed differences.
    pub negative_mean: f64,
    /// Mean of |v|.
    pub abs_mean: f64,
    /// Median of |v|.
    pub abs_median: f64,
    /// Population standard deviation of |v|.
    pub abs_std_dev: f64,
    /// Minimum of |v|.
    pub abs_min: f64,
    /// Maximum of |v|.
    pub abs_max: f64,
    /// 1st percentile of |v|.
    pub abs_p1: f64,
    /// 5th percentile of |v|.
    pub abs_p5: f64,
    /// 95th percentile of |v|.
    pub abs_p95: f64,
    /// 99th percentile of |v|.
    pub abs_p99: f64,
}

impl DiffStatistics {
    /// Compute the metric battery over a difference raster's valid values.
    pub fn compute(diff: &RasterGrid) -> Self {
        let values: Vec<f64> = diff.valid_values().map(f64::from).collect();
        Self::from_values(&values)
    }

    /// Compute the metric battery from raw signed difference values.
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            warn!("difference raster has no valid pixels, statistics are undefined");
            return Self::undefined();
        }

        let positive: Vec<f64> = values.iter().copied().filter(|v| *v > 0.0).collect();
        let negative: Vec<f64> = values.iter().copied().filter(|v| *v < 0.0).collect();
        let abs: Vec<f64> = values.iter().map(|v| v.abs()).collect();

        let mut ordered = Data::new(abs.clone());

        Self {
            mean: Statistics::mean(values),
            positive_mean: mean_or_nan(&positive),
            negative_mean: mean_or_nan(&negative),
            abs_mean: Statistics::mean(&abs),
            abs_median: ordered.median(),
            abs_std_dev: Statistics::population_std_dev(&abs),
            abs_min: Statistics::min(&abs),
            abs_max: Statistics::max(&abs),
            abs_p1: ordered.percentile(1),
            abs_p5: ordered.percentile(5),
            abs_p95: ordered.percentile(95),
            abs_p99: ordered.percentile(99),
        }
    }

    /// All-NaN statistics for a fully masked difference.
    pub fn undefined() -> Self {
        Self {
            mean: f64::NAN,
            positive_mean: f64::NAN,
            negative_mean: f64::NAN,
            abs_mean: f64::NAN,
            abs_median: f64::NAN,
            abs_std_dev: f64::NAN,
            abs_min: f64::NAN,
            abs_max: f64::NAN,
            abs_p1: f64::NAN,
            abs_p5: f64::NAN,
            abs_p95: f64::NAN,
            abs_p99: f64::NAN,
        }
    }

    /// Whether the metrics are undefined (no valid pixels contributed).
    pub fn is_undefined(&self) -> bool {
        self.mean.is_nan() && self.abs_max.is_nan()
    }

    /// The metrics in their fixed report order, with their log labels.
    pub fn metrics(&self) -> [(&'static str, f64); 12] {
        [
            ("Average difference", self.mean),
            ("Average of positive difference values", self.positive_mean),
            ("Average of negative difference values", self.negative_mean),
            ("Absolute average difference", self.abs_mean),
            ("Absolute median difference", self.abs_median),
            ("Absolute standard deviation", self.abs_std_dev),
            ("Absolute minimum difference", self.abs_min),
            ("Absolute maximum difference", self.abs_max),
            ("Absolute 1st percentile difference", self.abs_p1),
            ("Absolute 5th percentile difference", self.abs_p5),
            ("Absolute 95th percentile difference", self.abs_p95),
            ("Absolute 99th percentile difference", self.abs_p99),
        ]
    }
}

fn mean_or_nan(values: &[f64]) -> f64 {
    if values.is_empty() {
        f64::NAN
    } else {
        Statistics::mean(values)
    }
}
