//! Affine geotransform and extent math.

/// Affine mapping from pixel coordinates to ground coordinates.
///
/// Terms follow the GDAL convention: ground coordinates of the top-left
/// corner of pixel (col, row) are
///
/// ```text
/// x = origin_x + col * pixel_width + row * rot_x
/// y = origin_y + col * rot_y + row * pixel_height
/// ```
///
/// For a north-up raster the rotation terms are zero and `pixel_height` is
/// negative (rows advance southward).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    /// Ground x of the top-left corner of the top-left pixel.
    pub origin_x: f64,
    /// Ground y of the top-left corner of the top-left pixel.
    pub origin_y: f64,
    /// Pixel width in ground units.
    pub pixel_width: f64,
    /// Pixel height in ground units (negative for north-up rasters).
    pub pixel_height: f64,
    /// Row rotation term.
    pub rot_x: f64,
    /// Column rotation term.
    pub rot_y: f64,
}

impl GeoTransform {
    /// Create a north-up geotransform.
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height: -pixel_height.abs(),
            rot_x: 0.0,
            rot_y: 0.0,
        }
    }

    /// Build from a GDAL-ordered 6-element array
    /// `[origin_x, pixel_width, rot_x, origin_y, rot_y, pixel_height]`.
    pub fn from_gdal(gt: [f64; 6]) -> Self {
        Self {
            origin_x: gt[0],
            pixel_width: gt[1],
            rot_x: gt[2],
            origin_y: gt[3],
            rot_y: gt[4],
            pixel_height: gt[5],
        }
    }

    /// Convert to a GDAL-ordered 6-element array.
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.rot_x,
            self.origin_y,
            self.rot_y,
            self.pixel_height,
        ]
    }

    /// Whether the transform is axis-aligned (no rotation terms).
    pub fn is_north_up(&self) -> bool {
        self.rot_x == 0.0 && self.rot_y == 0.0
    }

    /// Square pixel size: the mean of the absolute x and y pixel sizes.
    pub fn pixel_size(&self) -> f64 {
        (self.pixel_width.abs() + self.pixel_height.abs()) / 2.0
    }

    /// Bounding extent of a raster of the given dimensions under this transform.
    pub fn extent(&self, width: usize, height: usize) -> Extent {
        let x_end = self.origin_x + width as f64 * self.pixel_width;
        let y_end = self.origin_y + height as f64 * self.pixel_height;
        Extent {
            xmin: self.origin_x.min(x_end),
            ymin: self.origin_y.min(y_end),
            xmax: self.origin_x.max(x_end),
            ymax: self.origin_y.max(y_end),
        }
    }

    /// A copy with the origin translated by (dx, dy) ground units.
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            origin_x: self.origin_x + dx,
            origin_y: self.origin_y + dy,
            ..*self
        }
    }

    /// Ground coordinates of the center of pixel (col, row).
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        let c = col as f64 + 0.5;
        let r = row as f64 + 0.5;
        (
            self.origin_x + c * self.pixel_width + r * self.rot_x,
            self.origin_y + c * self.rot_y + r * self.pixel_height,
        )
    }

    /// Fractional pixel coordinates of a ground point, valid for north-up
    /// transforms. (0, 0) is the center of the top-left pixel.
    pub fn ground_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.pixel_width - 0.5,
            (y - self.origin_y) / self.pixel_height - 0.5,
        )
    }
}

/// Axis-aligned bounding extent in ground coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    /// Minimum x (west edge).
    pub xmin: f64,
    /// Minimum y (south edge).
    pub ymin: f64,
    /// Maximum x (east edge).
    pub xmax: f64,
    /// Maximum y (north edge).
    pub ymax: f64,
}

impl Extent {
    /// Intersection with another extent, or `None` if they do not overlap.
    pub fn intersection(&self, other: &Extent) -> Option<Extent> {
        let xmin = self.xmin.max(other.xmin);
        let ymin = self.ymin.max(other.ymin);
        let xmax = self.xmax.min(other.xmax);
        let ymax = self.ymax.min(other.ymax);
        if xmin < xmax && ymin < ymax {
            Some(Extent {
                xmin,
                ymin,
                xmax,
                ymax,
            })
        } else {
            None
        }
    }

    /// Union (bounding box of both extents).
    pub fn union(&self, other: &Extent) -> Extent {
        Extent {
            xmin: self.xmin.min(other.xmin),
            ymin: self.ymin.min(other.ymin),
            xmax: self.xmax.max(other.xmax),
            ymax: self.ymax.max(other.ymax),
        }
    }

    /// Width in ground units.
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    /// Height in ground units.
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// A copy with every coordinate rounded to `decimals` decimal places.
    pub fn rounded(&self, decimals: u32) -> Extent {
        Extent {
            xmin: round_to(self.xmin, decimals),
            ymin: round_to(self.ymin, decimals),
            xmax: round_to(self.xmax, decimals),
            ymax: round_to(self.ymax, decimals),
        }
    }
}

/// Round a value to the given number of decimal places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn north_up_extent() {
        let gt = GeoTransform::north_up(100.0, 200.0, 1.0, 1.0);
        let ext = gt.extent(10, 20);
        assert_relative_eq!(ext.xmin, 100.0);
        assert_relative_eq!(ext.xmax, 110.0);
        assert_relative_eq!(ext.ymax, 200.0);
        assert_relative_eq!(ext.ymin, 180.0);
    }

    #[test]
    fn gdal_round_trip() {
        let gt = GeoTransform::north_up(5.0, -3.0, 0.25, 0.25);
        let back = GeoTransform::from_gdal(gt.to_gdal());
        assert_eq!(gt, back);
    }

    #[test]
    fn pixel_ground_round_trip() {
        let gt = GeoTransform::north_up(1000.0, 5000.0, 2.0, 2.0);
        let (x, y) = gt.pixel_center(3, 7);
        let (col, row) = gt.ground_to_pixel(x, y);
        assert_relative_eq!(col, 3.0);
        assert_relative_eq!(row, 7.0);
    }

    #[test]
    fn translate_moves_origin_only() {
        let gt = GeoTransform::north_up(0.0, 0.0, 1.0, 1.0);
        let moved = gt.translated(1.5, -0.5);
        assert_relative_eq!(moved.origin_x, 1.5);
        assert_relative_eq!(moved.origin_y, -0.5);
        assert_relative_eq!(moved.pixel_width, 1.0);
        assert_relative_eq!(moved.pixel_height, -1.0);
    }

    #[test]
    fn extent_intersection_and_union() {
        let a = Extent {
            xmin: 0.0,
            ymin: 0.0,
            xmax: 10.0,
            ymax: 10.0,
        };
        let b = Extent {
            xmin: 5.0,
            ymin: 5.0,
            xmax: 15.0,
            ymax: 15.0,
        };
        let inter = a.intersection(&b).unwrap();
        assert_relative_eq!(inter.xmin, 5.0);
        assert_relative_eq!(inter.xmax, 10.0);

        let uni = a.union(&b);
        assert_relative_eq!(uni.xmin, 0.0);
        assert_relative_eq!(uni.xmax, 15.0);

        let c = Extent {
            xmin: 20.0,
            ymin: 20.0,
            xmax: 30.0,
            ymax: 30.0,
        };
        assert!(a.intersection(&c).is_none());
    }

    #[test]
    fn rounding() {
        assert_relative_eq!(round_to(1.23456, 3), 1.235);
        assert_relative_eq!(round_to(-1.00005, 4), -1.0001, epsilon = 1e-9);
    }
}
