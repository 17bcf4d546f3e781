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
use crate::profile::TileKey;
use crate::raster::{GeoHeightfield, GeoImage};
use nalgebra::Matrix3;

/// One color layer's contribution to a `TileModel`: the layer it came from
/// (by uid, so the model doesn't hold a layer reference), the fetched image,
/// and the scale-bias matrix mapping this tile's texture coordinates into
/// the fetched image (identity unless the data came from an ancestor).
#[derive(Debug, Clone)]
pub struct ColorLayerModel {
    pub layer_uid: u64,
    pub image: GeoImage,
    pub matrix: Matrix3<f64>,
}

#[derive(Debug, Clone)]
pub struct ElevationModel {
    pub heightfield: GeoHeightfield,
    pub matrix: Matrix3<f64>,
}

/// The per-tile raster payload produced by `createTileModel`: the rasters a
/// render model is built from, plus the map revision they were captured at.
#[derive(Debug, Clone)]
pub struct TileModel {
    pub key: TileKey,
    pub revision: u64,
    pub color_layers: Vec<ColorLayerModel>,
    pub elevation: Option<ElevationModel>,
    pub normals: Option<GeoHeightfield>,
}

impl TileModel {
    pub fn empty(key: TileKey, revision: u64) -> TileModel {
        TileModel {
            key,
            revision,
            color_layers: Vec::new(),
            elevation: None,
            normals: None,
        }
    }

    pub fn has_data(&self) -> bool {
        !self.color_layers.is_empty() || self.elevation.is_some()
    }
}
