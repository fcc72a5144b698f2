//! Georeferencing helpers.
//!
//! A thin affine-transform layer used to map pixel coordinates into the
//! dataset's georeferenced space. The verifier uses it to compute the mosaic
//! extent; the vector-mask filter uses it to build block footprints.

/// Georeferenced bounding box (min/max in the dataset's spatial units).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

/// GDAL-style affine geotransform.
///
/// Coefficient order matches `GetGeoTransform()`:
/// `(origin_x, pixel_w, row_rot, origin_y, col_rot, pixel_h)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform(pub [f64; 6]);

impl GeoTransform {
    /// Maps a source-pixel coordinate to georeferenced space.
    pub fn apply(&self, px: f64, py: f64) -> (f64, f64) {
        let gt = &self.0;
        let x = gt[0] + px * gt[1] + py * gt[2];
        let y = gt[3] + px * gt[4] + py * gt[5];
        (x, y)
    }

    /// Georeferenced bounds of a pixel rectangle.
    ///
    /// Evaluates all four corners so rotated or north-down transforms still
    /// produce a valid min/max box.
    pub fn pixel_bounds(&self, x0: f64, y0: f64, x1: f64, y1: f64) -> Bounds {
        let corners = [
            self.apply(x0, y0),
            self.apply(x1, y0),
            self.apply(x0, y1),
            self.apply(x1, y1),
        ];
        let mut bounds = Bounds {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        };
        for (x, y) in corners {
            bounds.min_x = bounds.min_x.min(x);
            bounds.min_y = bounds.min_y.min(y);
            bounds.max_x = bounds.max_x.max(x);
            bounds.max_y = bounds.max_y.max(y);
        }
        bounds
    }

    /// Georeferenced bounds of a whole dataset of `width` × `height` pixels.
    pub fn dataset_bounds(&self, width: u64, height: u64) -> Bounds {
        self.pixel_bounds(0.0, 0.0, width as f64, height as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_transform_bounds() {
        let gt = GeoTransform([0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
        let b = gt.dataset_bounds(100, 50);
        assert_eq!(b.min_x, 0.0);
        assert_eq!(b.max_x, 100.0);
        assert_eq!(b.max_y, 50.0);
    }

    #[test]
    fn test_north_up_transform_flips_y() {
        // Typical north-up raster: origin at top-left, negative pixel height.
        let gt = GeoTransform([10.0, 0.5, 0.0, 60.0, 0.0, -0.5]);
        let b = gt.dataset_bounds(200, 100);
        assert_eq!(b.min_x, 10.0);
        assert_eq!(b.max_x, 110.0);
        assert_eq!(b.min_y, 10.0);
        assert_eq!(b.max_y, 60.0);
    }

    #[test]
    fn test_pixel_bounds_of_interior_window() {
        let gt = GeoTransform([0.0, 2.0, 0.0, 0.0, 0.0, -2.0]);
        let b = gt.pixel_bounds(10.0, 10.0, 20.0, 30.0);
        assert_eq!(b.min_x, 20.0);
        assert_eq!(b.max_x, 40.0);
        assert_eq!(b.min_y, -60.0);
        assert_eq!(b.max_y, -20.0);
    }
}
