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
use crate::raster::image::{Image, Pixel};
use crate::spatial::GeoExtent;

/// An `Image` coupled with the geospatial extent it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoImage {
    extent: GeoExtent,
    image: Image,
}

impl GeoImage {
    pub fn new(image: Image, extent: GeoExtent) -> GeoImage {
        GeoImage { extent, image }
    }

    pub fn valid(&self) -> bool {
        self.image.valid() && self.extent.valid()
    }

    pub fn image(&self) -> &Image {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut Image {
        &mut self.image
    }

    pub fn extent(&self) -> GeoExtent {
        self.extent
    }

    pub fn units_per_pixel(&self) -> f64 {
        self.extent.width() / self.image.width().max(1) as f64
    }

    pub fn get_coord(&self, s: u32, t: u32) -> (f64, f64) {
        let u = s as f64 / (self.image.width() - 1).max(1) as f64;
        let v = 1.0 - t as f64 / (self.image.height() - 1).max(1) as f64;
        (
            self.extent.xmin + u * self.extent.width(),
            self.extent.ymin + v * self.extent.height(),
        )
    }

    pub fn get_pixel(&self, x: f64, y: f64) -> Option<(i64, i64)> {
        if !self.extent.contains_point(x, y) {
            return None;
        }
        let u = (x - self.extent.xmin) / self.extent.width();
        let v = 1.0 - (y - self.extent.ymin) / self.extent.height();
        Some((
            (u * (self.image.width() - 1) as f64).round() as i64,
            (v * (self.image.height() - 1) as f64).round() as i64,
        ))
    }

    /// Sample at `(x, y)` (in this image's SRS units) with bilinear
    /// interpolation, or `None` if the point falls outside the extent.
    pub fn read(&self, x: f64, y: f64) -> Option<Pixel> {
        if !self.extent.contains_point(x, y) {
            return None;
        }
        let u = ((x - self.extent.xmin) / self.extent.width()) as f32;
        let v = (1.0 - (y - self.extent.ymin) / self.extent.height()) as f32;
        Some(self.image.read_bilinear(u, v))
    }

    /// Composites `sources` (bottom to top, each with a matching entry in
    /// `opacities`, defaulting to 1.0 when the lengths don't match) into
    /// this image's own extent and resolution, overwriting its pixels.
    pub fn composite(&mut self, sources: &[GeoImage], opacities: &[f32]) {
        let no_data = self.image.no_data_value();
        let width = self.image.width();
        let height = self.image.height();

        for t in 0..height {
            for s in 0..width {
                let (x, y) = self.get_coord(s, t);
                let mut accum = Pixel::splat(no_data);

                for (i, source) in sources.iter().enumerate() {
                    let opacity = opacities.get(i).copied().unwrap_or(1.0);
                    if let Some(sample) = source.read(x, y) {
                        if sample.r() == source.image.no_data_value() {
                            continue;
                        }
                        accum = if accum.r() == no_data {
                            sample
                        } else {
                            let blend = sample.a() * opacity;
                            accum * (1.0 - blend) + sample * blend
                        };
                    }
                }

                self.image.write(accum, s, t);
            }
        }
    }
}

/// A `GeoImage` interpreted as elevation samples: `read` returns a single
/// height value rather than a full `Pixel`.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoHeightfield {
    pub geo_image: GeoImage,
}

impl GeoHeightfield {
    pub fn new(geo_image: GeoImage) -> GeoHeightfield {
        GeoHeightfield { geo_image }
    }

    pub fn extent(&self) -> GeoExtent {
        self.geo_image.extent()
    }

    pub fn read(&self, x: f64, y: f64) -> Option<f32> {
        if !self.geo_image.valid() {
            return None;
        }
        let ex = self.geo_image.extent();
        let u = (x - ex.xmin) / ex.width();
        let v = (y - ex.ymin) / ex.height();
        if !(0.0..=1.0).contains(&u) || !(0.0..=1.0).contains(&v) {
            return None;
        }
        Some(self.geo_image.image().read_bilinear(u as f32, v as f32).r())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::raster::image::PixelFormat;
    use approx::assert_abs_diff_eq;

    fn solid(format: PixelFormat, extent: GeoExtent, value: f32) -> GeoImage {
        let mut img = Image::new(format, 2, 2);
        img.set_no_data_value(-9999.0);
        img.fill(Pixel::splat(value));
        GeoImage::new(img, extent)
    }

    #[test]
    fn read_within_extent_succeeds() {
        let g = solid(PixelFormat::R32Sfloat, GeoExtent::new(0.0, 0.0, 10.0, 10.0), 5.0);
        let p = g.read(5.0, 5.0).unwrap();
        assert_abs_diff_eq!(p.r(), 5.0, epsilon = 1e-4);
    }

    #[test]
    fn read_outside_extent_is_none() {
        let g = solid(PixelFormat::R32Sfloat, GeoExtent::new(0.0, 0.0, 10.0, 10.0), 5.0);
        assert!(g.read(100.0, 100.0).is_none());
    }

    #[test]
    fn composite_blends_by_opacity() {
        let bottom = solid(PixelFormat::R32Sfloat, GeoExtent::new(0.0, 0.0, 10.0, 10.0), 0.0);
        let top = solid(PixelFormat::R32Sfloat, GeoExtent::new(0.0, 0.0, 10.0, 10.0), 10.0);

        let mut dest = solid(PixelFormat::R32Sfloat, GeoExtent::new(0.0, 0.0, 10.0, 10.0), -9999.0);
        dest.composite(&[bottom, top], &[1.0, 0.5]);

        let p = dest.read(5.0, 5.0).unwrap();
        assert_abs_diff_eq!(p.r(), 5.0, epsilon = 1e-3);
    }

    #[test]
    fn composite_scales_blend_by_sample_alpha() {
        let mut bottom = solid(PixelFormat::R8G8B8A8Unorm, GeoExtent::new(0.0, 0.0, 10.0, 10.0), 0.0);
        bottom.image_mut().fill(Pixel::new(0.0, 0.0, 0.0, 1.0));
        let mut top = solid(PixelFormat::R8G8B8A8Unorm, GeoExtent::new(0.0, 0.0, 10.0, 10.0), 0.0);
        top.image_mut().fill(Pixel::new(1.0, 1.0, 1.0, 0.5));

        let mut dest = solid(PixelFormat::R8G8B8A8Unorm, GeoExtent::new(0.0, 0.0, 10.0, 10.0), -9999.0);
        dest.image_mut().set_no_data_value(-9999.0);
        dest.composite(&[bottom, top], &[1.0, 1.0]);

        // blend = sample.a * opacity = 0.5, so the top's white contributes
        // half-strength over the bottom's black, not the full value a
        // naive opacity-only blend would produce.
        let p = dest.read(5.0, 5.0).unwrap();
        assert_abs_diff_eq!(p.r(), 0.5, epsilon = 1.0 / 255.0);
    }

    #[test]
    fn geo_heightfield_reads_elevation() {
        let g = solid(PixelFormat::R32Sfloat, GeoExtent::new(0.0, 0.0, 10.0, 10.0), 123.0);
        let hf = GeoHeightfield::new(g);
        assert_abs_diff_eq!(hf.read(5.0, 5.0).unwrap(), 123.0, epsilon = 1e-3);
    }
}
