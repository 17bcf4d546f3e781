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
use crate::layer::layer::Kind;
use crate::layer::source::LayerSource;
use crate::layer::tile_layer::TileLayer;
use crate::profile::TileKey;
use crate::raster::{GeoImage, Image, PixelFormat};
use smallvec::SmallVec;
use std::sync::Arc;

/// A `TileLayer` that produces color imagery, with ancestor fallback and
/// multi-source mosaicing when the requested key doesn't land on the
/// source's native profile.
pub struct ImageLayer {
    tile: TileLayer,
    source: Arc<dyn LayerSource>,
}

impl ImageLayer {
    pub fn new(name: impl Into<String>, tile_size: u32, source: Arc<dyn LayerSource>) -> ImageLayer {
        ImageLayer {
            tile: TileLayer::new(Kind::Color, name, tile_size),
            source,
        }
    }

    pub fn tile_layer(&self) -> &TileLayer {
        &self.tile
    }

    /// Fetch imagery for `key`. If `key`'s profile matches the layer's own,
    /// walk ancestors of `key` until the source has data; otherwise mosaic
    /// from intersecting keys, each with its own ancestor fallback.
    pub async fn create_image(&self, key: &TileKey) -> Result<GeoImage> {
        let profile = self.tile.profile().ok_or(Failure::ResourceUnavailable)?;
        if key.profile.equivalent_to(&profile) {
            return self.read_image_with_fallback(key).await;
        }
        self.assemble_image(key).await
    }

    async fn read_image_with_fallback(&self, key: &TileKey) -> Result<GeoImage> {
        let mut candidate = Some(key.clone());
        while let Some(ck) = candidate {
            match self.source.read_image(&ck).await {
                Ok(img) => return Ok(img),
                Err(Failure::ResourceUnavailable) => candidate = ck.create_parent_key(),
                Err(e) => return Err(e),
            }
        }
        Err(Failure::ResourceUnavailable)
    }

    async fn assemble_image(&self, key: &TileKey) -> Result<GeoImage> {
        let profile = self.tile.profile().ok_or(Failure::ResourceUnavailable)?;
        let local_keys = key.intersecting_keys(&profile);
        if local_keys.is_empty() {
            return Err(Failure::ResourceUnavailable);
        }

        let mut sources: SmallVec<[GeoImage; 4]> = SmallVec::new();
        let mut any_at_target_lod = false;

        for local_key in &local_keys {
            let mut candidate = Some(local_key.clone());
            while let Some(ck) = candidate {
                match self.source.read_image(&ck).await {
                    Ok(img) => {
                        if ck.level == local_key.level {
                            any_at_target_lod = true;
                        }
                        sources.push(img);
                        break;
                    }
                    Err(Failure::ResourceUnavailable) => {
                        candidate = ck.create_parent_key();
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        if sources.is_empty() || !any_at_target_lod {
            return Err(Failure::ResourceUnavailable);
        }

        // finest resolution (smallest units-per-pixel) wins where sources overlap.
        sources.sort_by(|a, b| {
            a.units_per_pixel()
                .partial_cmp(&b.units_per_pixel())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let width = sources.iter().map(|s| s.image().width()).max().unwrap_or(256);
        let height = sources.iter().map(|s| s.image().height()).max().unwrap_or(256);
        let dest_extent = key.extent();

        let mut out = Image::new(PixelFormat::R8G8B8A8Unorm, width, height);
        out.set_no_data_value(f32::MIN);

        for t in 0..height {
            for s in 0..width {
                let u = s as f64 / (width - 1).max(1) as f64;
                let v = 1.0 - t as f64 / (height - 1).max(1) as f64;
                let x = dest_extent.xmin + u * dest_extent.width();
                let y = dest_extent.ymin + v * dest_extent.height();

                let pixel = sources.iter().find_map(|src| match src.read(x, y) {
                    Some(p) if p.r() != src.image().no_data_value() => Some(p),
                    _ => None,
                });
                if let Some(pixel) = pixel {
                    out.write(pixel, s, t);
                }
            }
        }

        Ok(GeoImage::new(out, dest_extent))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::profile::Profile;
    use crate::raster::Pixel;
    use async_trait::async_trait;

    struct FixedSource {
        native_level: u32,
    }

    #[async_trait]
    impl LayerSource for FixedSource {
        async fn open(&self) -> Result<()> {
            Ok(())
        }

        async fn read_image(&self, key: &TileKey) -> Result<GeoImage> {
            if key.level != self.native_level {
                return Err(Failure::ResourceUnavailable);
            }
            let mut img = Image::new(PixelFormat::R8G8B8A8Unorm, 4, 4);
            img.set_no_data_value(f32::MIN);
            img.fill(Pixel::new(0.2, 0.4, 0.6, 1.0));
            Ok(GeoImage::new(img, key.extent()))
        }

        async fn read_heightfield(&self, _key: &TileKey) -> Result<GeoImage> {
            Err(Failure::ResourceUnavailable)
        }
    }

    #[tokio::test]
    async fn same_profile_key_delegates_directly() {
        let profile = Profile::well_known("global-geodetic").unwrap();
        let layer = ImageLayer::new("base", 4, Arc::new(FixedSource { native_level: 0 }));
        layer.tile_layer().set_profile(profile.clone());
        let key = TileKey::new(0, 0, 0, profile);
        let img = layer.create_image(&key).await.unwrap();
        assert!(img.valid());
    }

    #[tokio::test]
    async fn same_profile_key_missing_data_falls_back_to_ancestor() {
        let profile = Profile::well_known("global-geodetic").unwrap();
        let layer = ImageLayer::new("base", 4, Arc::new(FixedSource { native_level: 0 }));
        layer.tile_layer().set_profile(profile.clone());

        let root = TileKey::new(0, 0, 0, profile);
        let child = root.create_child_key(0);
        let img = layer.create_image(&child).await.unwrap();
        assert!(img.valid());
    }

    #[tokio::test]
    async fn mismatched_profile_falls_back_to_ancestor_mosaic() {
        let native = Profile::well_known("global-geodetic").unwrap();
        let layer = ImageLayer::new("base", 4, Arc::new(FixedSource { native_level: 0 }));
        layer.tile_layer().set_profile(native);

        let merc = Profile::well_known("spherical-mercator").unwrap();
        let key = TileKey::new(0, 0, 0, merc);
        let img = layer.create_image(&key).await.unwrap();
        assert!(img.valid());
    }
}
