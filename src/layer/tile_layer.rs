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
use crate::layer::layer::{Kind, Layer, OpenClose};
use crate::profile::{Profile, TileKey};
use crate::spatial::GeoExtent;
use parking_lot::RwLock;
use rstar::{RTree, RTreeObject, AABB};

/// A geographic rectangle tagged with the level range it's valid for, the
/// unit stored in a `TileLayer`'s R-tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataExtent {
    pub extent: GeoExtent,
    pub min_level: Option<u32>,
    pub max_level: Option<u32>,
}

impl DataExtent {
    pub fn new(extent: GeoExtent, min_level: Option<u32>, max_level: Option<u32>) -> DataExtent {
        DataExtent {
            extent,
            min_level,
            max_level,
        }
    }
}

impl RTreeObject for DataExtent {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.extent.xmin, self.extent.ymin],
            [self.extent.xmax, self.extent.ymax],
        )
    }
}

struct Index {
    tree: RTree<DataExtent>,
    union: Option<GeoExtent>,
    union_min_level: Option<u32>,
    union_max_level: Option<u32>,
}

impl Default for Index {
    fn default() -> Self {
        Index {
            tree: RTree::new(),
            union: None,
            union_min_level: None,
            union_max_level: None,
        }
    }
}

/// A `Layer` specialized to serve tiled data over a `Profile`: min/max level
/// bounds, an optional crop, and a spatial index of the regions it actually
/// has data for.
pub struct TileLayer {
    layer: Layer,
    profile: RwLock<Option<Profile>>,
    tile_size: u32,
    min_level: u32,
    max_level: Option<u32>,
    min_resolution: Option<f64>,
    max_resolution: Option<f64>,
    crop: Option<GeoExtent>,
    index: RwLock<Index>,
}

impl OpenClose for TileLayer {
    fn layer(&self) -> &Layer {
        &self.layer
    }
}

impl TileLayer {
    pub fn new(kind: Kind, name: impl Into<String>, tile_size: u32) -> TileLayer {
        TileLayer {
            layer: Layer::new(kind, name),
            profile: RwLock::new(None),
            tile_size,
            min_level: 0,
            max_level: None,
            min_resolution: None,
            max_resolution: None,
            crop: None,
            index: RwLock::new(Index::default()),
        }
    }

    pub fn layer(&self) -> &Layer {
        &self.layer
    }

    pub fn profile(&self) -> Option<Profile> {
        self.profile.read().clone()
    }

    pub fn set_profile(&self, profile: Profile) {
        *self.profile.write() = Some(profile);
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn min_level(&self) -> u32 {
        self.min_level
    }

    pub fn set_min_level(&mut self, level: u32) {
        self.min_level = level;
    }

    pub fn max_level(&self) -> Option<u32> {
        self.max_level
    }

    pub fn set_max_level(&mut self, level: Option<u32>) {
        self.max_level = level;
    }

    pub fn set_crop(&mut self, crop: Option<GeoExtent>) {
        self.crop = crop;
    }

    pub fn is_key_in_legal_range(&self, key: &TileKey) -> bool {
        if key.level < self.min_level {
            return false;
        }
        if let Some(max) = self.max_level {
            if key.level > max {
                return false;
            }
        }
        if let (Some(min_res), Some((w, _h))) = (
            self.min_resolution,
            self.profile.read().as_ref().map(|p| p.tile_dimensions(key.level)),
        ) {
            if w > min_res {
                return false;
            }
        }
        if let (Some(max_res), Some((w, _h))) = (
            self.max_resolution,
            self.profile.read().as_ref().map(|p| p.tile_dimensions(key.level)),
        ) {
            if w < max_res {
                return false;
            }
        }
        true
    }

    /// Registers the layer's known data extents, building the R-tree and the
    /// coverage union. Extents crossing the antimeridian are split into west
    /// and east halves and inserted as two entries.
    pub fn set_data_extents(&self, extents: Vec<DataExtent>) {
        let mut index = Index::default();
        let mut items = Vec::with_capacity(extents.len());

        for de in extents {
            index.union = Some(match index.union {
                Some(u) => union_extent(u, de.extent),
                None => de.extent,
            });
            index.union_min_level = min_option(index.union_min_level, de.min_level);
            index.union_max_level = max_option(index.union_max_level, de.max_level);

            if let Some((west, east)) = de.extent.split_across_antimeridian() {
                items.push(DataExtent::new(west, de.min_level, de.max_level));
                items.push(DataExtent::new(east, de.min_level, de.max_level));
            } else {
                items.push(de);
            }
        }

        index.tree = RTree::bulk_load(items);
        *self.index.write() = index;
    }

    pub fn data_extents_union(&self) -> Option<GeoExtent> {
        self.index.read().union
    }

    /// Whether `key`'s extent, reprojected into this layer's profile, falls
    /// within the registered data extents and level range.
    pub fn intersects(&self, key: &TileKey) -> bool {
        let profile = match self.profile.read().clone() {
            Some(p) => p,
            None => return false,
        };
        let local_keys = key.intersecting_keys(&profile);
        if local_keys.is_empty() {
            return false;
        }

        let index = self.index.read();
        if index.tree.size() == 0 {
            // no data extents registered: assume the whole profile has data,
            // matching the original's "no metadata means unconstrained".
            return local_keys.iter().any(|k| self.is_key_in_legal_range(k));
        }

        local_keys.iter().any(|local| {
            if !self.is_key_in_legal_range(local) {
                return false;
            }
            let ex = local.extent();
            let envelope = AABB::from_corners([ex.xmin, ex.ymin], [ex.xmax, ex.ymax]);
            index.tree.locate_in_envelope_intersecting(&envelope).any(|de| {
                let min_ok = de.min_level.map_or(true, |m| local.level >= m);
                let max_ok = de.max_level.map_or(true, |m| local.level <= m);
                min_ok && max_ok && de.extent.intersects(&ex)
            })
        })
    }

    /// The "where is data?" oracle: maps `key` into this layer's profile,
    /// checks level/crop bounds, then walks the R-tree to find the best
    /// locally-available ancestor level.
    pub fn best_available_tile_key(&self, key: &TileKey) -> Option<TileKey> {
        let profile = self.profile.read().clone()?;
        let local_keys = key.intersecting_keys(&profile);
        let local = local_keys.first()?;

        if !self.is_key_in_legal_range(local) {
            return None;
        }
        if let Some(crop) = self.crop {
            if !crop.intersects(&local.extent()) {
                return None;
            }
        }

        let index = self.index.read();
        if index.tree.size() == 0 {
            // no metadata: assume full coverage at the mapped local key.
            return local.create_ancestor_key(local.level.min(
                self.max_level.unwrap_or(local.level),
            ));
        }

        let ex = local.extent();
        let envelope = AABB::from_corners([ex.xmin, ex.ymin], [ex.xmax, ex.ymax]);
        let best_local_level = index
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .filter(|de| de.extent.intersects(&ex))
            .filter_map(|de| de.max_level)
            .max();

        let best_local_level = match best_local_level {
            Some(l) => l.min(local.level),
            None => return None,
        };

        let delta = key.level.saturating_sub(local.level);
        let ancestor_level = best_local_level.saturating_sub(delta);
        local.create_ancestor_key(ancestor_level)
    }

    pub fn may_have_data(&self, key: &TileKey) -> bool {
        self.best_available_tile_key(key).as_ref() == Some(key)
    }
}

fn union_extent(a: GeoExtent, b: GeoExtent) -> GeoExtent {
    GeoExtent::new(
        a.xmin.min(b.xmin),
        a.ymin.min(b.ymin),
        a.xmax.max(b.xmax),
        a.ymax.max(b.ymax),
    )
}

fn min_option(a: Option<u32>, b: Option<u32>) -> Option<u32> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

fn max_option(a: Option<u32>, b: Option<u32>) -> Option<u32> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn geodetic_layer() -> TileLayer {
        let layer = TileLayer::new(Kind::Color, "test", 256);
        layer.set_profile(Profile::well_known("global-geodetic").unwrap());
        layer
    }

    #[test]
    fn no_data_extents_means_unconstrained_coverage() {
        let layer = geodetic_layer();
        let key = TileKey::new(2, 1, 1, layer.profile().unwrap());
        assert!(layer.intersects(&key));
    }

    #[test]
    fn data_extent_outside_query_key_does_not_intersect() {
        let layer = geodetic_layer();
        layer.set_data_extents(vec![DataExtent::new(
            GeoExtent::new(-10.0, -10.0, 10.0, 10.0),
            None,
            Some(10),
        )]);
        let far_key = TileKey::new(0, 1, 0, layer.profile().unwrap());
        assert!(!layer.intersects(&far_key));
    }

    #[test]
    fn best_available_tile_key_falls_back_to_ancestor() {
        let layer = geodetic_layer();
        layer.set_data_extents(vec![DataExtent::new(
            GeoExtent::new(-180.0, -90.0, 180.0, 90.0),
            None,
            Some(2),
        )]);
        let deep = TileKey::new(5, 10, 10, layer.profile().unwrap());
        let best = layer.best_available_tile_key(&deep).unwrap();
        assert!(best.level <= 2);
    }

    #[test]
    fn antimeridian_crossing_extent_is_split_before_insertion() {
        let layer = geodetic_layer();
        layer.set_data_extents(vec![DataExtent::new(
            GeoExtent::new(170.0, -10.0, 190.0, 10.0),
            None,
            Some(5),
        )]);
        assert_eq!(layer.index.read().tree.size(), 2);
    }
}
