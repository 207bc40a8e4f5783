//! Target resolution and extent selection policies.

use dodiff_raster::Extent;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How to choose the target pixel size when two grids disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPolicy {
    /// The smaller (finer) of the two pixel sizes.
    Min,
    /// The larger (coarser) of the two pixel sizes.
    Max,
    /// The arithmetic mean of the two pixel sizes.
    Mean,
    /// The finer size snapped so the coarser is an integer multiple of it.
    CommonScaleFactor,
}

impl ResolutionPolicy {
    /// Resolve the target pixel size from the two input pixel sizes.
    pub fn resolve(&self, a: f64, b: f64) -> f64 {
        let lo = a.min(b);
        let hi = a.max(b);
        match self {
            ResolutionPolicy::Min => lo,
            ResolutionPolicy::Max => hi,
            ResolutionPolicy::Mean => (lo + hi) / 2.0,
            ResolutionPolicy::CommonScaleFactor => {
                let factor = (hi / lo).round().max(1.0);
                hi / factor
            }
        }
    }
}

impl FromStr for ResolutionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "min" => Ok(ResolutionPolicy::Min),
            "max" => Ok(ResolutionPolicy::Max),
            "mean" => Ok(ResolutionPolicy::Mean),
            "common_scale_factor" => Ok(ResolutionPolicy::CommonScaleFactor),
            other => Err(format!(
                "unknown resolution policy '{other}' (expected min, max, mean, or common_scale_factor)"
            )),
        }
    }
}

impl std::fmt::Display for ResolutionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResolutionPolicy::Min => "min",
            ResolutionPolicy::Max => "max",
            ResolutionPolicy::Mean => "mean",
            ResolutionPolicy::CommonScaleFactor => "common_scale_factor",
        };
        f.write_str(s)
    }
}

/// How to choose the target bounding geometry when two grids disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtentPolicy {
    /// The overlap of the two extents.
    Intersection,
    /// The bounding box of the two extents.
    Union,
    /// The extent of the first (reference) raster.
    First,
    /// The extent of the second (source) raster.
    Second,
}

impl ExtentPolicy {
    /// Resolve the target extent from the two input extents.
    ///
    /// Returns `None` only for `Intersection` over disjoint extents, where no
    /// target grid exists.
    pub fn resolve(&self, first: Extent, second: Extent) -> Option<Extent> {
        match self {
            ExtentPolicy::Intersection => first.intersection(&second),
            ExtentPolicy::Union => Some(first.union(&second)),
            ExtentPolicy::First => Some(first),
            ExtentPolicy::Second => Some(second),
        }
    }
}

impl FromStr for ExtentPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "intersection" => Ok(ExtentPolicy::Intersection),
            "union" => Ok(ExtentPolicy::Union),
            "first" => Ok(ExtentPolicy::First),
            "second" => Ok(ExtentPolicy::Second),
            other => Err(format!(
                "unknown extent policy '{other}' (expected intersection, union, first, or second)"
            )),
        }
    }
}

impl std::fmt::Display for ExtentPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExtentPolicy::Intersection => "intersection",
            ExtentPolicy::Union => "union",
            ExtentPolicy::First => "first",
            ExtentPolicy::Second => "second",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn resolution_policies() {
        assert_relative_eq!(ResolutionPolicy::Min.resolve(0.25, 1.0), 0.25);
        assert_relative_eq!(ResolutionPolicy::Max.resolve(0.25, 1.0), 1.0);
        assert_relative_eq!(ResolutionPolicy::Mean.resolve(0.25, 1.0), 0.625);
    }

    #[test]
    fn common_scale_factor_snaps_to_integer_divisor() {
        // 1.0 / 0.3 ~ 3.33 -> factor 3 -> 1/3
        let target = ResolutionPolicy::CommonScaleFactor.resolve(0.3, 1.0);
        assert_relative_eq!(target, 1.0 / 3.0);
        // Equal sizes pass through
        assert_relative_eq!(ResolutionPolicy::CommonScaleFactor.resolve(0.5, 0.5), 0.5);
    }

    #[test]
    fn extent_policies() {
        let a = Extent {
            xmin: 0.0,
            ymin: 0.0,
            xmax: 10.0,
            ymax: 10.0,
        };
        let b = Extent {
            xmin: 5.0,
            ymin: 5.0,
            xmax: 20.0,
            ymax: 20.0,
        };
        assert_eq!(
            ExtentPolicy::Intersection.resolve(a, b),
            a.intersection(&b)
        );
        assert_eq!(ExtentPolicy::Union.resolve(a, b), Some(a.union(&b)));
        assert_eq!(ExtentPolicy::First.resolve(a, b), Some(a));
        assert_eq!(ExtentPolicy::Second.resolve(a, b), Some(b));
    }

    #[test]
    fn parse_round_trip() {
        for s in ["min", "max", "mean", "common_scale_factor"] {
            assert_eq!(s.parse::<ResolutionPolicy>().unwrap().to_string(), s);
        }
        for s in ["intersection", "union", "first", "second"] {
            assert_eq!(s.parse::<ExtentPolicy>().unwrap().to_string(), s);
        }
        assert!("median".parse::<ResolutionPolicy>().is_err());
    }
}
