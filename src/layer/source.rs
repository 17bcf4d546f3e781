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
use crate::error::Result;
use crate::profile::TileKey;
use crate::raster::GeoImage;
use async_trait::async_trait;

/// A concrete data source a `TileLayer` reads from: a tile service, a file
/// on disk, a database -- anything that can hand back a `GeoImage` for a
/// `TileKey`. Layers hold one of these behind `Arc<dyn LayerSource>`; this
/// crate never implements one itself, since concrete IO is out of scope.
#[async_trait]
pub trait LayerSource: Send + Sync {
    async fn open(&self) -> Result<()>;

    /// Fetch color data for exactly `key`; no ancestor fallback here, that's
    /// the layer's job.
    async fn read_image(&self, key: &TileKey) -> Result<GeoImage>;

    /// Fetch elevation data for exactly `key`, as a raw image (either a
    /// single-channel heightfield or an RGB-encoded one, per the layer's
    /// `Encoding`).
    async fn read_heightfield(&self, key: &TileKey) -> Result<GeoImage>;
}
