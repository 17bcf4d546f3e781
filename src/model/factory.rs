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
use crate::cancel::Cancelable;
use crate::error::Failure;
use crate::layer::map::{Map, MapLayer};
use crate::model::tile_model::{ColorLayerModel, ElevationModel, TileModel};
use crate::profile::TileKey;
use crate::raster::{GeoImage, Image, Pixel, PixelFormat};
use log::warn;
use nalgebra::Matrix3;

/// Builds a `TileModel` for `(map, key)`: collects open, intersecting color
/// layers, fetches with or without compositing depending on candidate count,
/// and picks the first elevation layer with coverage.
pub async fn create_tile_model(map: &Map, key: &TileKey, cancel: &Cancelable) -> TileModel {
    let revision = map.revision();
    let mut model = TileModel::empty(key.clone(), revision);

    if cancel.is_canceled() {
        return model;
    }

    let layers = map.layers();

    let image_candidates: Vec<_> = layers
        .iter()
        .filter_map(|l| match l {
            MapLayer::Image(img) => Some(img.clone()),
            _ => None,
        })
        .filter(|img| img.tile_layer().layer().is_open() && img.tile_layer().intersects(key))
        .collect();

    if image_candidates.len() == 1 {
        let layer = &image_candidates[0];
        if layer.tile_layer().may_have_data(key) {
            match layer.create_image(key).await {
                Ok(image) => model.color_layers.push(ColorLayerModel {
                    layer_uid: layer.tile_layer().layer().uid(),
                    image,
                    matrix: Matrix3::identity(),
                }),
                Err(e) if e.is_silent() => {}
                Err(e) => warn!("image layer {} failed to load {}: {}", layer.tile_layer().layer().name(), key, e),
            }
        }
    } else if image_candidates
        .iter()
        .any(|l| l.tile_layer().may_have_data(key))
    {
        let mut fetched = Vec::new();
        for layer in &image_candidates {
            if cancel.is_canceled() {
                return model;
            }
            match layer.create_image(key).await {
                Ok(image) => fetched.push((layer.clone(), image)),
                Err(e) if e.is_silent() => {}
                Err(e) => warn!("image layer {} failed to load {}: {}", layer.tile_layer().layer().name(), key, e),
            }
        }

        if !fetched.is_empty() {
            let (base_layer, base_image) = &fetched[0];
            let width = base_image.image().width();
            let height = base_image.image().height();
            let extent = base_image.extent();

            let mut out = Image::new(PixelFormat::R8G8B8A8Unorm, width, height);
            out.set_no_data_value(f32::MIN);
            let mut composite = GeoImage::new(out, extent);

            let sources: Vec<GeoImage> = fetched.iter().map(|(_, img)| img.clone()).collect();
            let opacities: Vec<f32> = fetched
                .iter()
                .map(|(l, _)| l.tile_layer().layer().opacity())
                .collect();
            composite.composite(&sources, &opacities);

            model.color_layers.push(ColorLayerModel {
                layer_uid: base_layer.tile_layer().layer().uid(),
                image: composite,
                matrix: Matrix3::identity(),
            });
        }
    }

    if cancel.is_canceled() {
        return model;
    }

    let elevation_candidates: Vec<_> = layers
        .iter()
        .filter_map(|l| match l {
            MapLayer::Elevation(e) => Some(e.clone()),
            _ => None,
        })
        .filter(|e| e.tile_layer().layer().is_open() && e.tile_layer().intersects(key))
        .collect();

    if let Some(layer) = elevation_candidates.first() {
        match layer.create_tile(key).await {
            Ok(mut heightfield) => {
                zero_fill_no_data(&mut heightfield.geo_image);
                model.elevation = Some(ElevationModel {
                    heightfield,
                    matrix: Matrix3::identity(),
                });
            }
            Err(Failure::ResourceUnavailable) | Err(Failure::Canceled) => {}
            Err(e) => warn!("elevation layer {} failed to load {}: {}", layer.tile_layer().layer().name(), key, e),
        }
    }

    model
}

fn zero_fill_no_data(image: &mut GeoImage) {
    let nd = image.image().no_data_value();
    let (w, h) = (image.image().width(), image.image().height());
    for t in 0..h {
        for s in 0..w {
            if image.image().read(s, t).r() == nd {
                image.image_mut().write(Pixel::splat(0.0), s, t);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::layer::elevation_layer::{ElevationLayer, Encoding};
    use crate::layer::image_layer::ImageLayer;
    use crate::profile::Profile;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct SolidSource;

    #[async_trait]
    impl crate::layer::source::LayerSource for SolidSource {
        async fn open(&self) -> crate::error::Result<()> {
            Ok(())
        }
        async fn read_image(&self, key: &TileKey) -> crate::error::Result<GeoImage> {
            let mut img = Image::new(PixelFormat::R8G8B8A8Unorm, 4, 4);
            img.set_no_data_value(f32::MIN);
            img.fill(Pixel::new(1.0, 0.0, 0.0, 1.0));
            Ok(GeoImage::new(img, key.extent()))
        }
        async fn read_heightfield(&self, key: &TileKey) -> crate::error::Result<GeoImage> {
            let mut img = Image::new(PixelFormat::R32Sfloat, 4, 4);
            img.set_no_data_value(-9999.0);
            img.fill(Pixel::splat(100.0));
            Ok(GeoImage::new(img, key.extent()))
        }
    }

    #[tokio::test]
    async fn single_candidate_fetches_without_compositing() {
        let profile = Profile::well_known("global-geodetic").unwrap();
        let map = Map::new();
        let layer = Arc::new(ImageLayer::new("base", 4, Arc::new(SolidSource)));
        layer.tile_layer().set_profile(profile.clone());
        map.add_layer(MapLayer::Image(layer));

        let key = TileKey::new(0, 0, 0, profile);
        let model = create_tile_model(&map, &key, &Cancelable::new()).await;
        assert_eq!(model.color_layers.len(), 1);
    }

    #[tokio::test]
    async fn elevation_no_data_is_zero_filled() {
        let profile = Profile::well_known("global-geodetic").unwrap();
        let map = Map::new();
        let layer = Arc::new(ElevationLayer::new(
            "dem",
            4,
            Arc::new(SolidSource),
            Encoding::SingleChannel,
        ));
        layer.tile_layer().set_profile(profile.clone());
        map.add_layer(MapLayer::Elevation(layer));

        let key = TileKey::new(0, 0, 0, profile);
        let model = create_tile_model(&map, &key, &Cancelable::new()).await;
        assert!(model.elevation.is_some());
    }

    #[tokio::test]
    async fn cancellation_before_any_fetch_yields_empty_model() {
        let profile = Profile::well_known("global-geodetic").unwrap();
        let map = Map::new();
        let layer = Arc::new(ImageLayer::new("base", 4, Arc::new(SolidSource)));
        layer.tile_layer().set_profile(profile.clone());
        map.add_layer(MapLayer::Image(layer));

        let key = TileKey::new(0, 0, 0, profile);
        let cancel = Cancelable::new();
        cancel.cancel();
        let model = create_tile_model(&map, &key, &cancel).await;
        assert!(!model.has_data());
    }
}
