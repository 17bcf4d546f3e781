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
use crate::profile::tile_key::TileKey;
use crate::spatial::{GeoExtent, SRS};
use fxhash::FxHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[derive(Debug)]
struct Data {
    well_known_name: String,
    srs: SRS,
    extent: GeoExtent,
    geodetic_extent: GeoExtent,
    num_tiles_base_x: u32,
    num_tiles_base_y: u32,
    hash: u64,
    subprofiles: Vec<Profile>,
}

/// A quadtree tiling scheme: an SRS, a root extent, and the tile count at
/// level zero. Cheaply cloned -- the shared data lives behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Profile {
    shared: Arc<Data>,
}

impl PartialEq for Profile {
    fn eq(&self, other: &Self) -> bool {
        self.equivalent_to(other)
    }
}

impl Profile {
    pub fn well_known(name: &str) -> Result<Profile> {
        let lower = name.to_ascii_lowercase();
        match lower.as_str() {
            "global-geodetic" => Ok(Self::build(
                name,
                SRS::wgs84(),
                GeoExtent::new(-180.0, -90.0, 180.0, 90.0),
                2,
                1,
                Vec::new(),
            )),
            "spherical-mercator" => {
                let srs = SRS::spherical_mercator();
                let bounds = srs.bounds();
                Ok(Self::build(name, srs, bounds, 1, 1, Vec::new()))
            }
            "plate-carree" | "plate-carre" => Ok(Self::build(
                name,
                SRS::get("plate-carree")?,
                GeoExtent::new(-180.0, -90.0, 180.0, 90.0),
                2,
                1,
                Vec::new(),
            )),
            "moon" => Ok(Self::build(
                name,
                SRS::get("moon")?,
                GeoExtent::new(-180.0, -90.0, 180.0, 90.0),
                2,
                1,
                Vec::new(),
            )),
            _ => Err(Failure::ConfigurationError(format!(
                "unrecognized well-known profile name: {name}"
            ))),
        }
    }

    pub fn new(
        srs: SRS,
        bounds: GeoExtent,
        x_tiles_at_root: u32,
        y_tiles_at_root: u32,
        subprofiles: Vec<Profile>,
    ) -> Profile {
        Self::build(
            "",
            srs,
            bounds,
            x_tiles_at_root.max(1),
            y_tiles_at_root.max(1),
            subprofiles,
        )
    }

    fn build(
        well_known_name: &str,
        srs: SRS,
        extent: GeoExtent,
        num_tiles_base_x: u32,
        num_tiles_base_y: u32,
        subprofiles: Vec<Profile>,
    ) -> Profile {
        let geodetic_extent = if srs.is_geographic() {
            extent
        } else {
            // best-effort corner reprojection; falls back to the native
            // extent when the SRS has no geographic transform defined.
            let geo = srs.geographic_srs();
            let a = srs
                .transform(nalgebra::Vector3::new(extent.xmin, extent.ymin, 0.0), &geo)
                .unwrap_or(nalgebra::Vector3::new(extent.xmin, extent.ymin, 0.0));
            let b = srs
                .transform(nalgebra::Vector3::new(extent.xmax, extent.ymax, 0.0), &geo)
                .unwrap_or(nalgebra::Vector3::new(extent.xmax, extent.ymax, 0.0));
            GeoExtent::new(a.x, a.y, b.x, b.y)
        };

        let mut hasher = FxHasher::default();
        well_known_name.hash(&mut hasher);
        srs.definition().hash(&mut hasher);
        num_tiles_base_x.hash(&mut hasher);
        num_tiles_base_y.hash(&mut hasher);
        let hash = hasher.finish();

        Profile {
            shared: Arc::new(Data {
                well_known_name: well_known_name.to_string(),
                srs,
                extent,
                geodetic_extent,
                num_tiles_base_x,
                num_tiles_base_y,
                hash,
                subprofiles,
            }),
        }
    }

    pub fn valid(&self) -> bool {
        self.shared.extent.valid()
    }

    pub fn extent(&self) -> GeoExtent {
        self.shared.extent
    }

    pub fn geodetic_extent(&self) -> GeoExtent {
        self.shared.geodetic_extent
    }

    pub fn srs(&self) -> &SRS {
        &self.shared.srs
    }

    pub fn well_known_name(&self) -> &str {
        &self.shared.well_known_name
    }

    pub fn hash(&self) -> u64 {
        self.shared.hash
    }

    pub fn is_composite(&self) -> bool {
        !self.shared.subprofiles.is_empty()
    }

    pub fn subprofiles(&self) -> &[Profile] {
        &self.shared.subprofiles
    }

    pub fn equivalent_to(&self, other: &Profile) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared) || self.shared.hash == other.shared.hash
    }

    /// (x, y) tile counts at `lod`: the root counts doubled once per level.
    pub fn num_tiles(&self, lod: u32) -> (u32, u32) {
        let factor = 1u32 << lod;
        (
            self.shared.num_tiles_base_x * factor,
            self.shared.num_tiles_base_y * factor,
        )
    }

    /// (width, height) of one tile at `lod`, in the profile's SRS units.
    pub fn tile_dimensions(&self, lod: u32) -> (f64, f64) {
        let (tx, ty) = self.num_tiles(lod);
        (
            self.shared.extent.width() / tx as f64,
            self.shared.extent.height() / ty as f64,
        )
    }

    pub fn tile_extent(&self, lod: u32, tile_x: u32, tile_y: u32) -> GeoExtent {
        let (width, height) = self.tile_dimensions(lod);
        let xmin = self.shared.extent.xmin + width * tile_x as f64;
        let ymax = self.shared.extent.ymax - height * tile_y as f64;
        GeoExtent::new(xmin, ymax - height, xmin + width, ymax)
    }

    pub fn root_keys(&self) -> Vec<TileKey> {
        self.all_keys_at_lod(0)
    }

    pub fn all_keys_at_lod(&self, lod: u32) -> Vec<TileKey> {
        if self.is_composite() {
            return self
                .shared
                .subprofiles
                .iter()
                .flat_map(|sub| sub.all_keys_at_lod(lod))
                .collect();
        }

        let (tx, ty) = self.num_tiles(lod);
        let mut keys = Vec::with_capacity((tx * ty) as usize);
        for y in 0..ty {
            for x in 0..tx {
                keys.push(TileKey::new(lod, x, y, self.clone()));
            }
        }
        keys
    }

    /// Given a target horizontal resolution (in the profile's SRS units),
    /// the LOD whose tile width most closely matches it.
    pub fn level_of_detail_for_horiz_resolution(&self, resolution: f64, tile_size: u32) -> u32 {
        if resolution <= 0.0 || tile_size < 2 {
            return 0;
        }
        let base_width = self.shared.extent.width() / self.shared.num_tiles_base_x as f64;
        let target_width = resolution * (tile_size - 1) as f64;
        if target_width <= 0.0 {
            return 0;
        }
        let ratio = base_width / target_width;
        if ratio <= 1.0 {
            0
        } else {
            ratio.log2().round().max(0.0) as u32
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn global_geodetic_root_has_two_by_one_tiles() {
        let p = Profile::well_known("global-geodetic").unwrap();
        assert_eq!(p.num_tiles(0), (2, 1));
        assert_eq!(p.num_tiles(1), (4, 2));
    }

    #[test]
    fn tile_extent_matches_dimensions() {
        let p = Profile::well_known("global-geodetic").unwrap();
        let ex = p.tile_extent(0, 0, 0);
        assert_eq!(ex.xmin, -180.0);
        assert_eq!(ex.xmax, 0.0);
        assert_eq!(ex.ymax, 90.0);
        assert_eq!(ex.ymin, -90.0);
    }

    #[test]
    fn equivalent_profiles_compare_equal() {
        let a = Profile::well_known("global-geodetic").unwrap();
        let b = Profile::well_known("global-geodetic").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn root_keys_cover_the_whole_profile() {
        let p = Profile::well_known("spherical-mercator").unwrap();
        let keys = p.root_keys();
        assert_eq!(keys.len(), 1);
    }

    #[test]
    fn composite_profile_concatenates_subprofile_keys() {
        let a = Profile::well_known("global-geodetic").unwrap();
        let b = Profile::well_known("spherical-mercator").unwrap();
        let composite = Profile::new(a.srs().clone(), a.extent(), 1, 1, vec![a.clone(), b.clone()]);

        assert!(composite.is_composite());
        let keys = composite.all_keys_at_lod(0);
        assert_eq!(keys.len(), a.all_keys_at_lod(0).len() + b.all_keys_at_lod(0).len());
    }
}
