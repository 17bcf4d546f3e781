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
use crate::raster::{GeoHeightfield, GeoImage, Image, Pixel, PixelFormat};
use smallvec::SmallVec;
use std::sync::Arc;

const NO_DATA: f32 = -9999.0;
const VALID_RANGE: std::ops::RangeInclusive<f32> = -9999.0..=999999.0;

/// How raw image bytes from the source map to elevation in meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    SingleChannel,
    MapboxRGB,
    TerrariumRGB,
}

fn decode_pixel(encoding: Encoding, pixel: Pixel) -> f32 {
    let height = match encoding {
        Encoding::SingleChannel => pixel.r(),
        Encoding::MapboxRGB => {
            let (r, g, b) = (pixel.0[0] * 255.0, pixel.0[1] * 255.0, pixel.0[2] * 255.0);
            -10000.0 + (r * 65536.0 + g * 256.0 + b) * 0.1
        }
        Encoding::TerrariumRGB => {
            let (r, g, b) = (pixel.0[0] * 255.0, pixel.0[1] * 255.0, pixel.0[2] * 255.0);
            r * 256.0 + g + b / 256.0 - 32768.0
        }
    };
    if VALID_RANGE.contains(&height) {
        height
    } else {
        NO_DATA
    }
}

fn normalize_no_data(image: &mut Image) {
    let nd = image.no_data_value();
    if (nd - NO_DATA).abs() < f32::EPSILON {
        return;
    }
    let (w, h) = (image.width(), image.height());
    for t in 0..h {
        for s in 0..w {
            let p = image.read(s, t);
            if p.r() == nd {
                image.write(Pixel::splat(NO_DATA), s, t);
            }
        }
    }
    image.set_no_data_value(NO_DATA);
}

/// A `TileLayer` that produces heightfields, decoding RGB-packed elevation
/// when the source stores it that way. `max_level` is never set on this
/// layer: elevation always upsamples via ancestor fallback rather than
/// being capped, matching the original's `maxLevel.clear()`.
pub struct ElevationLayer {
    tile: TileLayer,
    source: Arc<dyn LayerSource>,
    encoding: Encoding,
}

impl ElevationLayer {
    pub fn new(
        name: impl Into<String>,
        tile_size: u32,
        source: Arc<dyn LayerSource>,
        encoding: Encoding,
    ) -> ElevationLayer {
        let mut tile = TileLayer::new(Kind::Elevation, name, tile_size);
        tile.set_max_level(None);
        ElevationLayer {
            tile,
            source,
            encoding,
        }
    }

    pub fn tile_layer(&self) -> &TileLayer {
        &self.tile
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub async fn create_tile(&self, key: &TileKey) -> Result<GeoHeightfield> {
        let profile = self.tile.profile().ok_or(Failure::ResourceUnavailable)?;
        if key.profile.equivalent_to(&profile) {
            return self.read_heightfield_with_fallback(key).await;
        }
        self.assemble_tile(key).await
    }

    async fn read_heightfield_with_fallback(&self, key: &TileKey) -> Result<GeoHeightfield> {
        let mut candidate = Some(key.clone());
        while let Some(ck) = candidate {
            match self.source.read_heightfield(&ck).await {
                Ok(raw) => {
                    let extent = raw.extent();
                    return Ok(self.finish(raw.image().clone(), extent));
                }
                Err(Failure::ResourceUnavailable) => candidate = ck.create_parent_key(),
                Err(e) => return Err(e),
            }
        }
        Err(Failure::ResourceUnavailable)
    }

    fn finish(&self, mut image: Image, extent: crate::spatial::GeoExtent) -> GeoHeightfield {
        image.set_no_data_value(NO_DATA);
        if self.encoding != Encoding::SingleChannel {
            let (w, h) = (image.width(), image.height());
            let mut decoded = Image::new(PixelFormat::R32Sfloat, w, h);
            decoded.set_no_data_value(NO_DATA);
            for t in 0..h {
                for s in 0..w {
                    let height = decode_pixel(self.encoding, image.read(s, t));
                    decoded.write(Pixel::splat(height), s, t);
                }
            }
            image = decoded;
        } else {
            normalize_no_data(&mut image);
        }
        GeoHeightfield::new(GeoImage::new(image, extent))
    }

    async fn assemble_tile(&self, key: &TileKey) -> Result<GeoHeightfield> {
        let profile = self.tile.profile().ok_or(Failure::ResourceUnavailable)?;
        let local_keys = key.intersecting_keys(&profile);
        if local_keys.is_empty() {
            return Err(Failure::ResourceUnavailable);
        }

        let mut sources: SmallVec<[GeoHeightfield; 4]> = SmallVec::new();
        for local_key in &local_keys {
            let mut candidate = Some(local_key.clone());
            while let Some(ck) = candidate {
                match self.source.read_heightfield(&ck).await {
                    Ok(raw) => {
                        let extent = raw.extent();
                        sources.push(self.finish(raw.image().clone(), extent));
                        break;
                    }
                    Err(Failure::ResourceUnavailable) => {
                        candidate = ck.create_parent_key();
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        if sources.is_empty() {
            return Err(Failure::ResourceUnavailable);
        }

        sources.sort_by(|a, b| {
            a.geo_image
                .units_per_pixel()
                .partial_cmp(&b.geo_image.units_per_pixel())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let width = sources.iter().map(|s| s.geo_image.image().width()).max().unwrap_or(64);
        let height = sources.iter().map(|s| s.geo_image.image().height()).max().unwrap_or(64);
        let dest_extent = key.extent();

        let mut out = Image::new(PixelFormat::R32Sfloat, width, height);
        out.set_no_data_value(NO_DATA);

        for t in 0..height {
            for s in 0..width {
                let u = s as f64 / (width - 1).max(1) as f64;
                let v = 1.0 - t as f64 / (height - 1).max(1) as f64;
                let x = dest_extent.xmin + u * dest_extent.width();
                let y = dest_extent.ymin + v * dest_extent.height();

                let sample = sources.iter().find_map(|src| match src.read(x, y) {
                    Some(v) if v != NO_DATA => Some(v),
                    _ => None,
                });
                out.write(Pixel::splat(sample.unwrap_or(NO_DATA)), s, t);
            }
        }

        Ok(GeoHeightfield::new(GeoImage::new(out, dest_extent)))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn mapbox_decode_matches_worked_example() {
        let pixel = Pixel::new(1.0 / 255.0, 134.0 / 255.0, 160.0 / 255.0, 1.0);
        let h = decode_pixel(Encoding::MapboxRGB, pixel);
        assert_abs_diff_eq!(h, -394.4, epsilon = 1e-6);
    }

    #[test]
    fn terrarium_decode_zero_point_is_32768() {
        let pixel = Pixel::new(128.0 / 255.0, 0.0, 0.0, 1.0);
        let h = decode_pixel(Encoding::TerrariumRGB, pixel);
        assert_abs_diff_eq!(h, 32768.0 - 32768.0, epsilon = 1e-3);
    }

    #[test]
    fn out_of_range_decode_becomes_no_data() {
        let pixel = Pixel::new(1.0, 1.0, 1.0, 1.0);
        let h = decode_pixel(Encoding::MapboxRGB, pixel);
        assert_eq!(h, NO_DATA);
    }
}
