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
use nalgebra::{Matrix4, Vector3};

const WGS84_RADIUS_EQUATOR: f64 = 6_378_137.0;
const WGS84_RADIUS_POLAR: f64 = 6_356_752.314_245;

/// A reference ellipsoid: geodetic (lon, lat, height) <-> geocentric (x, y, z)
/// conversions plus a handful of geodesic utilities used by the terrain math.
///
/// Geodetic coordinates are carried as `Vector3::new(lon_deg, lat_deg, height_m)`,
/// matching the original's `glm::dvec3(x=lon, y=lat, z=height)` convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    re: f64,
    rp: f64,
    ecc2: f64,
    to_unit_sphere: Vector3<f64>,
    to_ellipsoid: Vector3<f64>,
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::new(WGS84_RADIUS_EQUATOR, WGS84_RADIUS_POLAR)
    }
}

impl Ellipsoid {
    pub fn new(semi_major_axis: f64, semi_minor_axis: f64) -> Self {
        assert!(semi_major_axis > 0.0 && semi_minor_axis > 0.0);
        let f = (semi_major_axis - semi_minor_axis) / semi_major_axis;
        let ecc2 = (2.0 * f) - (f * f);
        Self {
            re: semi_major_axis,
            rp: semi_minor_axis,
            ecc2,
            to_unit_sphere: Vector3::new(
                1.0 / semi_major_axis,
                1.0 / semi_major_axis,
                1.0 / semi_minor_axis,
            ),
            to_ellipsoid: Vector3::new(semi_major_axis, semi_major_axis, semi_minor_axis),
        }
    }

    pub fn semi_major_axis(&self) -> f64 {
        self.re
    }

    pub fn semi_minor_axis(&self) -> f64 {
        self.rp
    }

    pub fn geodetic_to_geocentric(&self, lla_deg: Vector3<f64>) -> Vector3<f64> {
        let latitude = lla_deg.y.to_radians();
        let longitude = lla_deg.x.to_radians();

        let sin_lat = latitude.sin();
        let cos_lat = latitude.cos();

        let n = self.re / (1.0 - self.ecc2 * sin_lat * sin_lat).sqrt();

        Vector3::new(
            (n + lla_deg.z) * cos_lat * longitude.cos(),
            (n + lla_deg.z) * cos_lat * longitude.sin(),
            (n * (1.0 - self.ecc2) + lla_deg.z) * sin_lat,
        )
    }

    pub fn geocentric_to_geodetic(&self, geoc: Vector3<f64>) -> Vector3<f64> {
        const PI_OVER_2: f64 = std::f64::consts::FRAC_PI_2;

        let mut longitude;
        let mut latitude = 0.0;
        let mut height;

        if geoc.x != 0.0 {
            longitude = geoc.y.atan2(geoc.x);
        } else if geoc.y > 0.0 {
            longitude = PI_OVER_2;
        } else if geoc.y < 0.0 {
            longitude = -PI_OVER_2;
        } else {
            // pole or center-of-earth degeneracy.
            longitude = 0.0;
            if geoc.z > 0.0 {
                latitude = PI_OVER_2;
                height = geoc.z - self.rp;
            } else if geoc.z < 0.0 {
                latitude = -PI_OVER_2;
                height = -geoc.z - self.rp;
            } else {
                latitude = PI_OVER_2;
                height = -self.rp;
            }
            return Vector3::new(longitude.to_degrees(), latitude.to_degrees(), height);
        }

        let p = (geoc.x * geoc.x + geoc.y * geoc.y).sqrt();
        let theta = (geoc.z * self.re).atan2(p * self.rp);
        let e_dash_sq = (self.re * self.re - self.rp * self.rp) / (self.rp * self.rp);

        let sin_theta = theta.sin();
        let cos_theta = theta.cos();

        latitude = ((geoc.z + e_dash_sq * self.rp * sin_theta.powi(3))
            / (p - self.ecc2 * self.re * cos_theta.powi(3)))
        .atan();

        let sin_lat = latitude.sin();
        let n = self.re / (1.0 - self.ecc2 * sin_lat * sin_lat).sqrt();

        height = p / latitude.cos() - n;

        let mut out = Vector3::new(longitude.to_degrees(), latitude.to_degrees(), height);
        for v in out.iter_mut() {
            if v.is_nan() {
                *v = 0.0;
            }
        }
        out
    }

    /// Local East/North/Up frame at `geoc`, as a local-to-world transform.
    pub fn topocentric_to_world_matrix(&self, geoc: Vector3<f64>) -> Matrix4<f64> {
        let lla = self.geocentric_to_geodetic(geoc);
        let latitude = lla.y.to_radians();
        let longitude = lla.x.to_radians();

        let up = Vector3::new(
            longitude.cos() * latitude.cos(),
            longitude.sin() * latitude.cos(),
            latitude.sin(),
        );
        let east = Vector3::new(-longitude.sin(), longitude.cos(), 0.0);
        let north = up.cross(&east);

        #[rustfmt::skip]
        let m = Matrix4::new(
            east.x, north.x, up.x, geoc.x,
            east.y, north.y, up.y, geoc.y,
            east.z, north.z, up.z, geoc.z,
            0.0,    0.0,     0.0,  1.0,
        );
        m
    }

    /// Nearest intersection of the geocentric segment `p0..p1` with the
    /// ellipsoid surface, or `None` if the segment misses it.
    pub fn intersect_geocentric_line(
        &self,
        p0_world: Vector3<f64>,
        p1_world: Vector3<f64>,
    ) -> Option<Vector3<f64>> {
        let p0 = p0_world.component_mul(&self.to_unit_sphere);
        let p1 = p1_world.component_mul(&self.to_unit_sphere);

        const R: f64 = 1.0;
        let d = p1 - p0;

        let a = d.dot(&d);
        let b = 2.0 * d.dot(&p0);
        let c = p0.dot(&p0) - R * R;

        let disc = b * b - 4.0 * a * c;
        let v = if disc > 0.0 {
            let sqrt_d = disc.sqrt();
            let t0 = (-b + sqrt_d) / (2.0 * a);
            let t1 = (-b - sqrt_d) / (2.0 * a);
            if t0.abs() < t1.abs() {
                d * t0
            } else {
                d * t1
            }
        } else if disc == 0.0 {
            let t = -b / (2.0 * a);
            d * t
        } else {
            return None;
        };

        let dist2 = v.dot(&v);
        if dist2 > 0.0 {
            Some((p0 + v).component_mul(&self.to_ellipsoid))
        } else {
            None
        }
    }

    /// Great-circle-on-the-ellipsoid ground distance between two geodetic
    /// points (Bowring's approximation), in meters.
    pub fn geodesic_ground_distance(&self, p1: Vector3<f64>, p2: Vector3<f64>) -> f64 {
        let lat1 = p1.y.to_radians();
        let lon1 = p1.x.to_radians();
        let lat2 = p2.y.to_radians();
        let lon2 = p2.x.to_radians();

        let re = self.semi_major_axis();
        let rp = self.semi_minor_axis();
        let f = (re - rp) / re;

        let b1 = ((1.0 - f) * lat1.tan()).atan();
        let b2 = ((1.0 - f) * lat2.tan()).atan();

        let p = (b1 + b2) / 2.0;
        let q = (b2 - b1) / 2.0;

        let g = (b1.sin() * b2.sin() + b1.cos() * b2.cos() * (lon2 - lon1).abs().cos()).acos();

        let (sin_g, sin_p, sin_q, cos_p, cos_q) = (g.sin(), p.sin(), q.sin(), p.cos(), q.cos());
        let (sin_g2, cos_g2) = ((g / 2.0).sin(), (g / 2.0).cos());

        let x = (g - sin_g) * ((sin_p * sin_p * cos_q * cos_q) / (cos_g2 * cos_g2));
        let y = (g + sin_g) * ((cos_p * cos_p * sin_q * sin_q) / (sin_g2 * sin_g2));

        let dist = re * (g - (f / 2.0) * (x + y));
        if dist.is_nan() {
            0.0
        } else {
            dist
        }
    }

    /// Geometric slerp between two geodetic points in unit-sphere space,
    /// with height linearly interpolated.
    pub fn geodesic_interpolate(&self, lla1_deg: Vector3<f64>, lla2_deg: Vector3<f64>, t: f64) -> Vector3<f64> {
        let delta_z = lla2_deg.z - lla1_deg.z;

        let w1 = self
            .geodetic_to_geocentric(lla1_deg)
            .component_mul(&self.to_unit_sphere)
            .normalize();
        let w2 = self
            .geodetic_to_geocentric(lla2_deg)
            .component_mul(&self.to_unit_sphere)
            .normalize();

        let dp = w1.dot(&w2);
        if dp == 1.0 {
            return lla1_deg;
        }

        let angle = dp.acos();
        let s = angle.sin();
        if s == 0.0 {
            return lla1_deg;
        }

        let c1 = ((1.0 - t) * angle).sin() / s;
        let c2 = (t * angle).sin() / s;

        let n = (w1 * c1 + w2 * c2).component_mul(&self.to_ellipsoid);

        let mut out = self.geocentric_to_geodetic(n);
        out.z = lla1_deg.z + t * delta_z;
        out
    }

    /// The point, along the direction of the centroid of `points`, at which
    /// all of them are just below the horizon as seen from the ellipsoid
    /// surface -- used to cull tiles that are fully behind the planet.
    pub fn calculate_horizon_point(&self, points: &[Vector3<f64>]) -> Vector3<f64> {
        let mut max_magnitude = 0.0_f64;
        let mut culling_dir = Vector3::zeros();

        let unit_points: Vec<Vector3<f64>> = points
            .iter()
            .map(|p| {
                let up = p.component_mul(&self.to_unit_sphere);
                culling_dir += up;
                up
            })
            .collect();
        culling_dir = culling_dir.normalize();

        for unit_point in &unit_points {
            let mut mag2 = unit_point.dot(unit_point);
            let mut mag = mag2.sqrt();
            let point_dir = unit_point / mag;

            // clamp to ellipsoid
            mag2 = mag2.max(1.0);
            mag = mag.max(1.0);

            let cos_alpha = point_dir.dot(&culling_dir);
            let sin_alpha = point_dir.cross(&culling_dir).norm();
            let cos_beta = 1.0 / mag;
            let sin_beta = (mag2 - 1.0).sqrt() * cos_beta;

            let culling_point_mag = 1.0 / (cos_alpha * cos_beta - sin_alpha * sin_beta);
            max_magnitude = max_magnitude.max(culling_point_mag);
        }

        (culling_dir * max_magnitude).component_mul(&self.to_ellipsoid)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn equator_prime_meridian_round_trips() {
        let e = Ellipsoid::default();
        let lla = Vector3::new(0.0, 0.0, 0.0);
        let geoc = e.geodetic_to_geocentric(lla);
        assert_abs_diff_eq!(geoc.x, e.semi_major_axis(), epsilon = 1e-6);
        assert_abs_diff_eq!(geoc.y, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(geoc.z, 0.0, epsilon = 1e-6);

        let back = e.geocentric_to_geodetic(geoc);
        assert_abs_diff_eq!(back.x, lla.x, epsilon = 1e-6);
        assert_abs_diff_eq!(back.y, lla.y, epsilon = 1e-6);
        assert_abs_diff_eq!(back.z, lla.z, epsilon = 1e-6);
    }

    #[test]
    fn north_pole_is_degenerate_but_stable() {
        let e = Ellipsoid::default();
        let geoc = Vector3::new(0.0, 0.0, e.semi_minor_axis());
        let lla = e.geocentric_to_geodetic(geoc);
        assert_abs_diff_eq!(lla.y, 90.0, epsilon = 1e-6);
        assert_abs_diff_eq!(lla.z, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn geodesic_distance_between_equal_points_is_zero() {
        let e = Ellipsoid::default();
        let p = Vector3::new(10.0, 20.0, 0.0);
        assert_abs_diff_eq!(e.geodesic_ground_distance(p, p), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn geodesic_interpolate_midpoint_stays_between() {
        let e = Ellipsoid::default();
        let p1 = Vector3::new(0.0, 0.0, 0.0);
        let p2 = Vector3::new(10.0, 0.0, 0.0);
        let mid = e.geodesic_interpolate(p1, p2, 0.5);
        assert_abs_diff_eq!(mid.x, 5.0, epsilon = 1e-6);
        assert_abs_diff_eq!(mid.y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn intersect_geocentric_line_hits_surface_from_above() {
        let e = Ellipsoid::default();
        let above = Vector3::new(e.semi_major_axis() * 2.0, 0.0, 0.0);
        let center = Vector3::new(0.0, 0.0, 0.0);
        let hit = e.intersect_geocentric_line(above, center).expect("should hit");
        assert_abs_diff_eq!(hit.x, e.semi_major_axis(), epsilon = 1e-3);
    }
}
