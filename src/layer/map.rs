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
use crate::layer::elevation_layer::ElevationLayer;
use crate::layer::image_layer::ImageLayer;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A layer as held by a `Map`: tagged by concrete type since the core
/// implements only these two.
#[derive(Clone)]
pub enum MapLayer {
    Image(Arc<ImageLayer>),
    Elevation(Arc<ElevationLayer>),
}

impl MapLayer {
    pub fn uid(&self) -> u64 {
        match self {
            MapLayer::Image(l) => l.tile_layer().layer().uid(),
            MapLayer::Elevation(l) => l.tile_layer().layer().uid(),
        }
    }
}

/// Ordered list of layers with a revision counter and change notification.
/// Reads take a snapshot (a cloned `Vec`) so iteration never blocks a writer
/// for long and never observes a half-mutated list.
pub struct Map {
    layers: RwLock<Vec<MapLayer>>,
    revision: AtomicU64,
    on_layers_changed: RwLock<Vec<Box<dyn Fn() + Send + Sync>>>,
}

impl Default for Map {
    fn default() -> Self {
        Map {
            layers: RwLock::new(Vec::new()),
            revision: AtomicU64::new(0),
            on_layers_changed: RwLock::new(Vec::new()),
        }
    }
}

impl Map {
    pub fn new() -> Map {
        Map::default()
    }

    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    /// A point-in-time snapshot of the layer list, safe to iterate without
    /// holding the lock.
    pub fn layers(&self) -> Vec<MapLayer> {
        self.layers.read().clone()
    }

    pub fn add_layer(&self, layer: MapLayer) {
        self.layers.write().push(layer);
        self.bump();
    }

    pub fn remove_layer(&self, uid: u64) {
        self.layers.write().retain(|l| l.uid() != uid);
        self.bump();
    }

    pub fn move_layer(&self, uid: u64, new_index: usize) {
        let mut layers = self.layers.write();
        if let Some(pos) = layers.iter().position(|l| l.uid() == uid) {
            let layer = layers.remove(pos);
            let idx = new_index.min(layers.len());
            layers.insert(idx, layer);
        }
        drop(layers);
        self.bump();
    }

    fn bump(&self) {
        self.revision.fetch_add(1, Ordering::AcqRel);
        for cb in self.on_layers_changed.read().iter() {
            cb();
        }
    }

    pub fn on_layers_changed(&self, f: impl Fn() + Send + Sync + 'static) {
        self.on_layers_changed.write().push(Box::new(f));
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::layer::elevation_layer::Encoding;
    use crate::error::Result;
    use crate::profile::TileKey;
    use crate::raster::GeoImage;
    use async_trait::async_trait;

    struct EmptySource;

    #[async_trait]
    impl crate::layer::source::LayerSource for EmptySource {
        async fn open(&self) -> Result<()> {
            Ok(())
        }
        async fn read_image(&self, _key: &TileKey) -> Result<GeoImage> {
            Err(crate::error::Failure::ResourceUnavailable)
        }
        async fn read_heightfield(&self, _key: &TileKey) -> Result<GeoImage> {
            Err(crate::error::Failure::ResourceUnavailable)
        }
    }

    #[test]
    fn adding_a_layer_bumps_revision() {
        let map = Map::new();
        let before = map.revision();
        let layer = Arc::new(ImageLayer::new("base", 256, Arc::new(EmptySource)));
        map.add_layer(MapLayer::Image(layer));
        assert!(map.revision() > before);
        assert_eq!(map.layers().len(), 1);
    }

    #[test]
    fn removing_a_layer_drops_it_from_the_snapshot() {
        let map = Map::new();
        let layer = Arc::new(ElevationLayer::new(
            "dem",
            256,
            Arc::new(EmptySource),
            Encoding::SingleChannel,
        ));
        let uid = layer.tile_layer().layer().uid();
        map.add_layer(MapLayer::Elevation(layer));
        map.remove_layer(uid);
        assert!(map.layers().is_empty());
    }
}
