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
use crate::profile::profile::Profile;
use crate::spatial::GeoExtent;
use nalgebra::Matrix4;
use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};

#[rustfmt::skip]
fn scale_bias_for_quadrant(q: u32) -> Matrix4<f64> {
    match q {
        0 => Matrix4::new(
            0.5, 0.0, 0.0, 0.0,
            0.0, 0.5, 0.0, 0.5,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ),
        1 => Matrix4::new(
            0.5, 0.0, 0.0, 0.5,
            0.0, 0.5, 0.0, 0.5,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ),
        2 => Matrix4::new(
            0.5, 0.0, 0.0, 0.0,
            0.0, 0.5, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ),
        _ => Matrix4::new(
            0.5, 0.0, 0.0, 0.5,
            0.0, 0.5, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ),
    }
}

/// Addresses a single tile within a `Profile`'s quadtree: level plus column
/// (x) and row (y) at that level, row 0 at the top (north).
#[derive(Debug, Clone)]
pub struct TileKey {
    pub level: u32,
    pub x: u32,
    pub y: u32,
    pub profile: Profile,
}

impl PartialEq for TileKey {
    fn eq(&self, other: &Self) -> bool {
        self.level == other.level
            && self.x == other.x
            && self.y == other.y
            && self.profile.equivalent_to(&other.profile)
    }
}
impl Eq for TileKey {}

impl Hash for TileKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.level.hash(state);
        self.x.hash(state);
        self.y.hash(state);
        self.profile.hash().hash(state);
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}/{}", self.level, self.x, self.y)
    }
}

impl TileKey {
    pub fn new(level: u32, x: u32, y: u32, profile: Profile) -> TileKey {
        TileKey {
            level,
            x,
            y,
            profile,
        }
    }

    pub fn valid(&self) -> bool {
        self.profile.valid()
    }

    pub fn extent(&self) -> GeoExtent {
        let (width, height) = self.profile.tile_dimensions(self.level);
        let xmin = self.profile.extent().xmin + width * self.x as f64;
        let ymax = self.profile.extent().ymax - height * self.y as f64;
        GeoExtent::new(xmin, ymax - height, xmin + width, ymax)
    }

    pub fn get_quadrant(&self) -> u32 {
        if self.level == 0 {
            return 0;
        }
        let xeven = self.x & 1 == 0;
        let yeven = self.y & 1 == 0;
        match (xeven, yeven) {
            (true, true) => 0,
            (true, false) => 2,
            (false, true) => 1,
            (false, false) => 3,
        }
    }

    pub fn scale_bias_matrix(&self) -> Matrix4<f64> {
        if self.level > 0 {
            scale_bias_for_quadrant(self.get_quadrant())
        } else {
            Matrix4::identity()
        }
    }

    pub fn resolution_for_tile_size(&self, tile_size: u32) -> (f64, f64) {
        let (width, height) = self.profile.tile_dimensions(self.level);
        let denom = (tile_size - 1) as f64;
        (width / denom, height / denom)
    }

    pub fn create_child_key(&self, quadrant: u32) -> TileKey {
        let mut xx = self.x * 2;
        let mut yy = self.y * 2;
        match quadrant {
            1 => xx += 1,
            2 => yy += 1,
            3 => {
                xx += 1;
                yy += 1;
            }
            _ => {}
        }
        TileKey::new(self.level + 1, xx, yy, self.profile.clone())
    }

    pub fn create_parent_key(&self) -> Option<TileKey> {
        if self.level == 0 {
            None
        } else {
            Some(TileKey::new(
                self.level - 1,
                self.x / 2,
                self.y / 2,
                self.profile.clone(),
            ))
        }
    }

    pub fn create_ancestor_key(&self, ancestor_lod: u32) -> Option<TileKey> {
        if ancestor_lod > self.level {
            return None;
        }
        let mut xx = self.x;
        let mut yy = self.y;
        for _ in 0..(self.level - ancestor_lod) {
            xx /= 2;
            yy /= 2;
        }
        Some(TileKey::new(ancestor_lod, xx, yy, self.profile.clone()))
    }

    pub fn create_neighbor_key(&self, xoffset: i32, yoffset: i32) -> TileKey {
        let (tx, ty) = self.profile.num_tiles(self.level);

        let sx = self.x as i64 + xoffset as i64;
        let x = if sx < 0 {
            (tx as i64 + sx) as u32
        } else if sx >= tx as i64 {
            (sx - tx as i64) as u32
        } else {
            sx as u32
        };

        let sy = self.y as i64 + yoffset as i64;
        let y = if sy < 0 {
            (ty as i64 + sy) as u32
        } else if sy >= ty as i64 {
            (sy - ty as i64) as u32
        } else {
            sy as u32
        };

        TileKey::new(self.level, x % tx, y % ty, self.profile.clone())
    }

    pub fn quad_key(&self) -> String {
        let mut buf = String::with_capacity(self.level as usize + 1);
        for i in (0..=self.level).rev() {
            let mask = 1u32 << i;
            let mut digit = 0u8;
            if self.x & mask != 0 {
                digit += 1;
            }
            if self.y & mask != 0 {
                digit += 2;
            }
            buf.push((b'0' + digit) as char);
        }
        buf
    }

    pub fn create_tile_key_containing_point(
        x: f64,
        y: f64,
        level: u32,
        profile: &Profile,
    ) -> Option<TileKey> {
        let extent = profile.extent();
        if !extent.contains_point(x, y) {
            return None;
        }
        let (tiles_x, tiles_y) = profile.num_tiles(level);
        let rx = (x - extent.xmin) / extent.width();
        let tile_x = ((rx * tiles_x as f64) as u32).min(tiles_x - 1);
        let ry = (y - extent.ymin) / extent.height();
        let tile_y = (((1.0 - ry) * tiles_y as f64) as u32).min(tiles_y - 1);
        Some(TileKey::new(level, tile_x, tile_y, profile.clone()))
    }

    /// All tile keys in `target_profile` that spatially overlap this key's
    /// extent, at whatever LOD in the target profile best matches this
    /// key's resolution. Memoizes the single most recent query per thread,
    /// since terrain creation tends to re-ask the same question repeatedly.
    pub fn intersecting_keys(&self, target_profile: &Profile) -> Vec<TileKey> {
        thread_local! {
            static PREVIOUS: RefCell<Option<(u32, u32, u32, u64, Vec<TileKey>)>> = RefCell::new(None);
        }

        if target_profile.is_composite() {
            return target_profile
                .subprofiles()
                .iter()
                .flat_map(|sub| self.intersecting_keys(sub))
                .collect();
        }

        if self.profile.equivalent_to(target_profile) {
            return vec![self.clone()];
        }

        let cache_key = (self.level, self.x, self.y, target_profile.hash());
        let cached = PREVIOUS.with(|cell| {
            cell.borrow().as_ref().and_then(|(l, x, y, h, v)| {
                if (*l, *x, *y, *h) == cache_key {
                    Some(v.clone())
                } else {
                    None
                }
            })
        });
        if let Some(v) = cached {
            return v;
        }

        let output = self.compute_intersecting_keys(target_profile);

        PREVIOUS.with(|cell| {
            *cell.borrow_mut() = Some((self.level, self.x, self.y, target_profile.hash(), output.clone()));
        });

        output
    }

    fn compute_intersecting_keys(&self, target_profile: &Profile) -> Vec<TileKey> {
        let geo_srs = self.profile.srs().geographic_srs();
        let source_ex = self.extent();
        let source_corner_min = geo_srs_transform(self.profile.srs(), &geo_srs, source_ex.xmin, source_ex.ymin);
        let source_corner_max = geo_srs_transform(self.profile.srs(), &geo_srs, source_ex.xmax, source_ex.ymax);
        let source_geo_ex = GeoExtent::new(
            source_corner_min.0,
            source_corner_min.1,
            source_corner_max.0,
            source_corner_max.1,
        );

        let target_geo_ex = target_profile.geodetic_extent();

        if !source_geo_ex.intersects(&target_geo_ex) {
            return Vec::new();
        }

        let (source_geo_cx, source_geo_cy) = source_geo_ex.centroid();
        let dlon = source_geo_ex.width() - 1e-10;
        let dlat = source_geo_ex.height() - 1e-10;

        let mut target_lod = 0u32;

        if target_geo_ex.width() > dlon || target_geo_ex.height() > dlat {
            let east = geo_srs_transform(&geo_srs, target_profile.srs(), source_geo_cx + dlon / 2.0, source_geo_cy);
            let west = geo_srs_transform(&geo_srs, target_profile.srs(), source_geo_cx - dlon / 2.0, source_geo_cy);
            let dxb = ((east.0 - west.0).powi(2) + (east.1 - west.1).powi(2)).sqrt();

            let north = geo_srs_transform(
                &geo_srs,
                target_profile.srs(),
                source_geo_cx,
                (source_geo_cy + dlat / 2.0).clamp(-90.0, 90.0),
            );
            let south = geo_srs_transform(
                &geo_srs,
                target_profile.srs(),
                source_geo_cx,
                (source_geo_cy - dlat / 2.0).clamp(-90.0, 90.0),
            );
            let dyb = ((north.0 - south.0).powi(2) + (north.1 - south.1).powi(2)).sqrt();

            let dims0 = target_profile.tile_dimensions(0);
            let xe = (dims0.0 / dxb.max(1e-12)).log2().abs();
            let ye = (dims0.1 / dyb.max(1e-12)).log2().abs();

            let estimate = if target_profile.srs().is_geographic() {
                ye
            } else {
                (xe + ye) * 0.5
            };

            target_lod = round_half_away_from_zero(estimate).min(30.0) as u32;
        }

        let target_profile_ex = target_profile.extent();
        let target_min = geo_srs_transform(&geo_srs, target_profile.srs(), source_geo_ex.xmin, source_geo_ex.ymin);
        let target_max = geo_srs_transform(&geo_srs, target_profile.srs(), source_geo_ex.xmax, source_geo_ex.ymax);
        let target_ex = GeoExtent::new(target_min.0, target_min.1, target_max.0, target_max.1);

        let dims = target_profile.tile_dimensions(target_lod);
        let (tiles_x, tiles_y) = target_profile.num_tiles(target_lod);

        let colmin = (((target_ex.xmin - target_profile_ex.xmin) / dims.0).floor() as i64)
            .clamp(0, tiles_x as i64 - 1);
        let colmax = (((target_ex.xmax - target_profile_ex.xmin) / dims.0).floor() as i64)
            .clamp(0, tiles_x as i64 - 1);
        let rowmin = (((target_profile_ex.ymax - target_ex.ymax) / dims.1).floor() as i64)
            .clamp(0, tiles_y as i64 - 1);
        let rowmax = (((target_profile_ex.ymax - target_ex.ymin) / dims.1).floor() as i64)
            .clamp(0, tiles_y as i64 - 1);

        let mut output = Vec::new();
        for col in colmin..=colmax {
            for row in rowmin..=rowmax {
                let ikey = TileKey::new(target_lod, col as u32, row as u32, target_profile.clone());
                if ikey.valid() && target_ex.intersects(&ikey.extent()) {
                    output.push(ikey);
                }
            }
        }
        output
    }
}

fn geo_srs_transform(
    from: &crate::spatial::SRS,
    to: &crate::spatial::SRS,
    x: f64,
    y: f64,
) -> (f64, f64) {
    match from.transform(nalgebra::Vector3::new(x, y, 0.0), to) {
        Ok(p) => (p.x, p.y),
        Err(_) => (x, y),
    }
}

fn round_half_away_from_zero(v: f64) -> f64 {
    if v >= 0.0 {
        (v + 0.5).floor()
    } else {
        (v - 0.5).ceil()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::profile::profile::Profile;

    #[test]
    fn quadrant_follows_even_odd_parity() {
        let p = Profile::well_known("global-geodetic").unwrap();
        let root = TileKey::new(0, 0, 0, p);
        assert_eq!(root.get_quadrant(), 0);
        let c1 = root.create_child_key(1);
        assert_eq!(c1.get_quadrant(), 1);
    }

    #[test]
    fn child_then_parent_round_trips() {
        let p = Profile::well_known("global-geodetic").unwrap();
        let root = TileKey::new(1, 1, 0, p);
        let child = root.create_child_key(3);
        let parent = child.create_parent_key().unwrap();
        assert_eq!(parent, root);
    }

    #[test]
    fn ancestor_key_skips_multiple_levels() {
        let p = Profile::well_known("global-geodetic").unwrap();
        let key = TileKey::new(3, 7, 5, p.clone());
        let ancestor = key.create_ancestor_key(1).unwrap();
        assert_eq!(ancestor.level, 1);
        assert_eq!(ancestor, TileKey::new(1, 1, 1, p));
    }

    #[test]
    fn quad_key_has_one_digit_per_level() {
        let p = Profile::well_known("global-geodetic").unwrap();
        let key = TileKey::new(2, 2, 1, p);
        assert_eq!(key.quad_key().len(), 3);
    }

    #[test]
    fn same_profile_intersecting_keys_is_identity() {
        let p = Profile::well_known("global-geodetic").unwrap();
        let key = TileKey::new(0, 0, 0, p.clone());
        let result = key.intersecting_keys(&p);
        assert_eq!(result, vec![key]);
    }

    #[test]
    fn neighbor_key_wraps_around_the_profile() {
        let p = Profile::well_known("global-geodetic").unwrap();
        let key = TileKey::new(0, 0, 0, p);
        let neighbor = key.create_neighbor_key(-1, 0);
        assert_eq!(neighbor.x, 1);
    }

    #[test]
    fn intersecting_keys_against_a_composite_profile_fans_out() {
        let geodetic = Profile::well_known("global-geodetic").unwrap();
        let mercator = Profile::well_known("spherical-mercator").unwrap();
        let composite = Profile::new(
            geodetic.srs().clone(),
            geodetic.extent(),
            1,
            1,
            vec![geodetic.clone(), mercator.clone()],
        );

        let key = TileKey::new(0, 0, 0, geodetic.clone());
        let result = key.intersecting_keys(&composite);
        assert_eq!(
            result.len(),
            key.intersecting_keys(&geodetic).len() + key.intersecting_keys(&mercator).len()
        );
    }
}
