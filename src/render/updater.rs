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
use crate::model::TileModel;
use crate::render::context::GraphicsContext;
use crate::render::render_model::{BindCommand, RenderModel, TileUniform};

fn height_range(heightfield: &crate::raster::GeoHeightfield) -> (f32, f32) {
    let image = heightfield.geo_image.image();
    let no_data = image.no_data_value();
    let mut min = f32::MAX;
    let mut max = f32::MIN;
    image.each_pixel(|_, _, pixel| {
        let h = pixel.r();
        if h == no_data {
            return;
        }
        min = min.min(h);
        max = max.max(h);
    });
    if min > max {
        (0.0, 0.0)
    } else {
        (min, max)
    }
}

/// Builds the next render model for a tile from its current one (if any) and
/// a freshly loaded `TileModel`, disposing any GPU resources the new model
/// replaces and submitting the updated bind command for compilation.
pub fn update_render_model<C: GraphicsContext>(
    old: Option<&RenderModel<C::Handle>>,
    tile_model: &TileModel,
    context: &C,
) -> RenderModel<C::Handle> {
    let mut model = old.cloned().unwrap_or_default();

    if let Some(color) = tile_model.color_layers.first() {
        let handle = context.wrap_image(&color.image);
        if let Some(previous) = model.color.replace(handle) {
            context.dispose(previous);
        }
        model.color_matrix = color.matrix;
    }

    if let Some(elevation) = &tile_model.elevation {
        let handle = context.wrap_image(&elevation.heightfield.geo_image);
        if let Some(previous) = model.elevation.replace(handle) {
            context.dispose(previous);
        }
        model.elevation_matrix = elevation.matrix;

        let (min_height, max_height) = height_range(&elevation.heightfield);
        model.uniform.min_height = min_height;
        model.uniform.max_height = max_height;
    }

    model.uniform.color_matrix = model.color_matrix;
    model.uniform.elevation_matrix = model.elevation_matrix;

    let bind = BindCommand {
        color: model.color.clone(),
        elevation: model.elevation.clone(),
        uniform: model.uniform.clone(),
    };
    context.compile(bind);

    model
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::profile::{Profile, TileKey};
    use crate::raster::{GeoHeightfield, GeoImage, Image, Pixel, PixelFormat};
    use crate::spatial::GeoExtent;
    use nalgebra::Matrix3;
    use parking_lot::Mutex;

    struct MockContext {
        disposed: Mutex<Vec<u32>>,
        next_handle: Mutex<u32>,
    }

    impl MockContext {
        fn new() -> MockContext {
            MockContext {
                disposed: Mutex::new(Vec::new()),
                next_handle: Mutex::new(0),
            }
        }
    }

    impl GraphicsContext for MockContext {
        type Handle = u32;

        fn compile(&self, _bind: BindCommand<u32>) {}

        fn dispose(&self, handle: u32) {
            self.disposed.lock().push(handle);
        }

        fn on_next_update(&self, _priority: f64, task: Box<dyn FnOnce() + Send>) {
            task();
        }

        fn request_frame(&self) {}

        fn wrap_image(&self, _image: &GeoImage) -> u32 {
            let mut next = self.next_handle.lock();
            *next += 1;
            *next
        }
    }

    fn heightfield(value: f32) -> GeoHeightfield {
        let mut img = Image::new(PixelFormat::R32Sfloat, 2, 2);
        img.set_no_data_value(-9999.0);
        img.fill(Pixel::splat(value));
        GeoHeightfield::new(GeoImage::new(img, GeoExtent::new(0.0, 0.0, 1.0, 1.0)))
    }

    #[test]
    fn first_update_wraps_images_without_disposing() {
        let profile = Profile::well_known("global-geodetic").unwrap();
        let key = TileKey::new(0, 0, 0, profile);
        let mut tile_model = TileModel::empty(key, 1);
        tile_model.elevation = Some(crate::model::ElevationModel {
            heightfield: heightfield(100.0),
            matrix: Matrix3::identity(),
        });

        let context = MockContext::new();
        let model = update_render_model(None, &tile_model, &context);

        assert!(model.elevation.is_some());
        assert!(context.disposed.lock().is_empty());
        assert_eq!(model.uniform.min_height, 100.0);
        assert_eq!(model.uniform.max_height, 100.0);
    }

    #[test]
    fn subsequent_update_disposes_the_old_handle() {
        let profile = Profile::well_known("global-geodetic").unwrap();
        let key = TileKey::new(0, 0, 0, profile);
        let mut tile_model = TileModel::empty(key, 1);
        tile_model.elevation = Some(crate::model::ElevationModel {
            heightfield: heightfield(50.0),
            matrix: Matrix3::identity(),
        });

        let context = MockContext::new();
        let first = update_render_model(None, &tile_model, &context);
        let second = update_render_model(Some(&first), &tile_model, &context);

        assert_eq!(context.disposed.lock().len(), 1);
        assert_ne!(first.elevation, second.elevation);
    }
}
