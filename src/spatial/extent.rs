// This file is part of Nitrogen.
//
// Nitrogen is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// Nitrogen is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with Nitrogen.  If not, see <http://www.gnu.org/licenses/>.

/// An axis-aligned rectangle in some SRS's native units. Carries no SRS
/// reference itself -- callers that need to reproject an extent go through
/// `SRS::transform` on the corners, since `GeoExtent` is the plain geometric
/// primitive the profile/layer machinery builds on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoExtent {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl GeoExtent {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    pub fn invalid() -> Self {
        Self::new(f64::NAN, f64::NAN, f64::NAN, f64::NAN)
    }

    pub fn valid(&self) -> bool {
        !self.xmin.is_nan()
            && !self.ymin.is_nan()
            && !self.xmax.is_nan()
            && !self.ymax.is_nan()
            && self.xmax >= self.xmin
            && self.ymax >= self.ymin
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    pub fn centroid(&self) -> (f64, f64) {
        (
            self.xmin + self.width() / 2.0,
            self.ymin + self.height() / 2.0,
        )
    }

    pub fn intersects(&self, other: &GeoExtent) -> bool {
        self.xmin < other.xmax
            && self.xmax > other.xmin
            && self.ymin < other.ymax
            && self.ymax > other.ymin
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.xmin && x <= self.xmax && y >= self.ymin && y <= self.ymax
    }

    pub fn intersection(&self, other: &GeoExtent) -> Option<GeoExtent> {
        if !self.intersects(other) {
            return None;
        }
        Some(GeoExtent::new(
            self.xmin.max(other.xmin),
            self.ymin.max(other.ymin),
            self.xmax.min(other.xmax),
            self.ymax.min(other.ymax),
        ))
    }

    /// True when this extent, interpreted as geographic degrees, straddles
    /// the +/-180 meridian (i.e. xmax exceeds the normal [-180, 180] range).
    pub fn crosses_antimeridian(&self) -> bool {
        self.xmax > 180.0
    }

    /// Splits an antimeridian-crossing geographic extent into its two
    /// non-crossing halves, so each half can be inserted into the R-tree as
    /// a normal axis-aligned rectangle.
    pub fn split_across_antimeridian(&self) -> Option<(GeoExtent, GeoExtent)> {
        if !self.crosses_antimeridian() {
            return None;
        }
        let west = GeoExtent::new(self.xmin, self.ymin, 180.0, self.ymax);
        let east = GeoExtent::new(-180.0, self.ymin, self.xmax - 360.0, self.ymax);
        Some((west, east))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn overlapping_extents_intersect() {
        let a = GeoExtent::new(0.0, 0.0, 10.0, 10.0);
        let b = GeoExtent::new(5.0, 5.0, 15.0, 15.0);
        assert!(a.intersects(&b));
        let i = a.intersection(&b).unwrap();
        assert_abs_diff_eq!(i.xmin, 5.0);
        assert_abs_diff_eq!(i.xmax, 10.0);
    }

    #[test]
    fn disjoint_extents_do_not_intersect() {
        let a = GeoExtent::new(0.0, 0.0, 1.0, 1.0);
        let b = GeoExtent::new(2.0, 2.0, 3.0, 3.0);
        assert!(!a.intersects(&b));
        assert!(a.intersection(&b).is_none());
    }

    #[test]
    fn centroid_is_midpoint() {
        let e = GeoExtent::new(-10.0, -20.0, 10.0, 20.0);
        let (cx, cy) = e.centroid();
        assert_abs_diff_eq!(cx, 0.0);
        assert_abs_diff_eq!(cy, 0.0);
    }

    #[test]
    fn antimeridian_split() {
        let e = GeoExtent::new(170.0, -10.0, 190.0, 10.0);
        assert!(e.crosses_antimeridian());
        let (west, east) = e.split_across_antimeridian().unwrap();
        assert_abs_diff_eq!(west.xmin, 170.0);
        assert_abs_diff_eq!(west.xmax, 180.0);
        assert_abs_diff_eq!(east.xmin, -180.0);
        assert_abs_diff_eq!(east.xmax, -170.0);
    }

    #[test]
    fn invalid_extent_reports_invalid() {
        assert!(!GeoExtent::invalid().valid());
        assert!(GeoExtent::new(0.0, 0.0, 1.0, 1.0).valid());
    }
}
