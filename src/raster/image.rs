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
use std::ops::{Add, Mul};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    R8Unorm,
    R8Srgb,
    R8G8Unorm,
    R8G8Srgb,
    R8G8B8Unorm,
    R8G8B8Srgb,
    R8G8B8A8Unorm,
    R8G8B8A8Srgb,
    R16Unorm,
    R32Sfloat,
    R64Sfloat,
}

impl PixelFormat {
    pub fn num_components(&self) -> usize {
        match self {
            PixelFormat::R8Unorm | PixelFormat::R8Srgb => 1,
            PixelFormat::R8G8Unorm | PixelFormat::R8G8Srgb => 2,
            PixelFormat::R8G8B8Unorm | PixelFormat::R8G8B8Srgb => 3,
            PixelFormat::R8G8B8A8Unorm | PixelFormat::R8G8B8A8Srgb => 4,
            PixelFormat::R16Unorm => 1,
            PixelFormat::R32Sfloat => 1,
            PixelFormat::R64Sfloat => 1,
        }
    }

    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::R8Unorm | PixelFormat::R8Srgb => 1,
            PixelFormat::R8G8Unorm | PixelFormat::R8G8Srgb => 2,
            PixelFormat::R8G8B8Unorm | PixelFormat::R8G8B8Srgb => 3,
            PixelFormat::R8G8B8A8Unorm | PixelFormat::R8G8B8A8Srgb => 4,
            PixelFormat::R16Unorm => 2,
            PixelFormat::R32Sfloat => 4,
            PixelFormat::R64Sfloat => 8,
        }
    }

    pub fn has_alpha_channel(&self) -> bool {
        matches!(self, PixelFormat::R8G8B8A8Unorm | PixelFormat::R8G8B8A8Srgb)
    }

    fn is_srgb(&self) -> bool {
        matches!(
            self,
            PixelFormat::R8Srgb
                | PixelFormat::R8G8Srgb
                | PixelFormat::R8G8B8Srgb
                | PixelFormat::R8G8B8A8Srgb
        )
    }
}

/// A pixel value in linear color space (or a single raw channel, for
/// coverage/elevation data): `r` is the channel that carries no-data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pixel(pub [f32; 4]);

impl Pixel {
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Pixel {
        Pixel([r, g, b, a])
    }

    pub fn splat(v: f32) -> Pixel {
        Pixel([v, v, v, v])
    }

    pub fn r(&self) -> f32 {
        self.0[0]
    }

    pub fn a(&self) -> f32 {
        self.0[3]
    }
}

impl Add for Pixel {
    type Output = Pixel;
    fn add(self, rhs: Pixel) -> Pixel {
        Pixel([
            self.0[0] + rhs.0[0],
            self.0[1] + rhs.0[1],
            self.0[2] + rhs.0[2],
            self.0[3] + rhs.0[3],
        ])
    }
}

impl Mul<f32> for Pixel {
    type Output = Pixel;
    fn mul(self, rhs: f32) -> Pixel {
        Pixel([
            self.0[0] * rhs,
            self.0[1] * rhs,
            self.0[2] * rhs,
            self.0[3] * rhs,
        ])
    }
}

pub fn linear_to_srgb(c: f32) -> f32 {
    const CUTOFF: f32 = 0.04045 / 12.92;
    if c <= CUTOFF {
        c * 12.92
    } else {
        c.powf(1.0 / 2.4) * 1.055 - 0.055
    }
}

pub fn srgb_to_linear(c: f32) -> f32 {
    const CUTOFF: f32 = 0.04045;
    if c <= CUTOFF {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn read_raw(data: &[u8], format: PixelFormat) -> Pixel {
    let gamma = |c: f32| if format.is_srgb() { srgb_to_linear(c) } else { c };
    match format {
        PixelFormat::R8Unorm | PixelFormat::R8Srgb => {
            let r = gamma(data[0] as f32 / 255.0);
            Pixel::new(r, r, r, 1.0)
        }
        PixelFormat::R8G8Unorm | PixelFormat::R8G8Srgb => {
            let r = gamma(data[0] as f32 / 255.0);
            let g = gamma(data[1] as f32 / 255.0);
            Pixel::new(r, g, 0.0, 1.0)
        }
        PixelFormat::R8G8B8Unorm | PixelFormat::R8G8B8Srgb => Pixel::new(
            gamma(data[0] as f32 / 255.0),
            gamma(data[1] as f32 / 255.0),
            gamma(data[2] as f32 / 255.0),
            1.0,
        ),
        PixelFormat::R8G8B8A8Unorm | PixelFormat::R8G8B8A8Srgb => Pixel::new(
            gamma(data[0] as f32 / 255.0),
            gamma(data[1] as f32 / 255.0),
            gamma(data[2] as f32 / 255.0),
            data[3] as f32 / 255.0,
        ),
        PixelFormat::R16Unorm => {
            let v = u16::from_le_bytes([data[0], data[1]]) as f32 / 65535.0;
            Pixel::new(v, v, v, 1.0)
        }
        PixelFormat::R32Sfloat => {
            let v = f32::from_le_bytes([data[0], data[1], data[2], data[3]]);
            Pixel::new(v, v, v, 1.0)
        }
        PixelFormat::R64Sfloat => {
            let bytes: [u8; 8] = data[0..8].try_into().unwrap();
            let v = f64::from_le_bytes(bytes) as f32;
            Pixel::new(v, v, v, 1.0)
        }
    }
}

fn write_raw(pixel: Pixel, data: &mut [u8], format: PixelFormat) {
    let degamma = |c: f32| if format.is_srgb() { linear_to_srgb(c) } else { c };
    match format {
        PixelFormat::R8Unorm | PixelFormat::R8Srgb => {
            data[0] = (degamma(pixel.0[0]).clamp(0.0, 1.0) * 255.0).round() as u8;
        }
        PixelFormat::R8G8Unorm | PixelFormat::R8G8Srgb => {
            data[0] = (degamma(pixel.0[0]).clamp(0.0, 1.0) * 255.0).round() as u8;
            data[1] = (degamma(pixel.0[1]).clamp(0.0, 1.0) * 255.0).round() as u8;
        }
        PixelFormat::R8G8B8Unorm | PixelFormat::R8G8B8Srgb => {
            for i in 0..3 {
                data[i] = (degamma(pixel.0[i]).clamp(0.0, 1.0) * 255.0).round() as u8;
            }
        }
        PixelFormat::R8G8B8A8Unorm | PixelFormat::R8G8B8A8Srgb => {
            for i in 0..3 {
                data[i] = (degamma(pixel.0[i]).clamp(0.0, 1.0) * 255.0).round() as u8;
            }
            data[3] = (pixel.0[3].clamp(0.0, 1.0) * 255.0).round() as u8;
        }
        PixelFormat::R16Unorm => {
            let v = (pixel.0[0].clamp(0.0, 1.0) * 65535.0).round() as u16;
            data[0..2].copy_from_slice(&v.to_le_bytes());
        }
        PixelFormat::R32Sfloat => {
            data[0..4].copy_from_slice(&pixel.0[0].to_le_bytes());
        }
        PixelFormat::R64Sfloat => {
            data[0..8].copy_from_slice(&(pixel.0[0] as f64).to_le_bytes());
        }
    }
}

/// A raster grid: colors, height samples, or coverage values, depending on
/// pixel format. Stored as a packed byte buffer; `read`/`write` always deal
/// in linear-space `Pixel` values regardless of the underlying format.
/// `depth` is the number of layers stacked behind a single `(s, t)`
/// addressable plane; `read`/`write` always address layer 0, since nothing
/// in this pipeline currently produces multi-layer imagery, but the buffer
/// is sized and offset as `width * height * depth * bytes_per_pixel` so a
/// caller that does build a layered image gets correct allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    depth: u32,
    format: PixelFormat,
    data: Vec<u8>,
    no_data_value: f32,
}

impl Image {
    pub fn new(format: PixelFormat, width: u32, height: u32) -> Image {
        Image::new_layered(format, width, height, 1)
    }

    pub fn new_layered(format: PixelFormat, width: u32, height: u32, depth: u32) -> Image {
        let depth = depth.max(1);
        let len = width as usize * height as usize * depth as usize * format.bytes_per_pixel();
        Image {
            width,
            height,
            depth,
            format,
            data: vec![0u8; len],
            no_data_value: f32::MIN,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn no_data_value(&self) -> f32 {
        self.no_data_value
    }

    pub fn set_no_data_value(&mut self, v: f32) {
        self.no_data_value = v;
    }

    pub fn valid(&self) -> bool {
        self.width > 0 && self.height > 0 && !self.data.is_empty()
    }

    fn offset(&self, s: u32, t: u32) -> usize {
        (t as usize * self.width as usize + s as usize) * self.format.bytes_per_pixel()
    }

    pub fn read(&self, s: u32, t: u32) -> Pixel {
        let bpp = self.format.bytes_per_pixel();
        let off = self.offset(s, t);
        read_raw(&self.data[off..off + bpp], self.format)
    }

    pub fn write(&mut self, pixel: Pixel, s: u32, t: u32) {
        let bpp = self.format.bytes_per_pixel();
        let off = self.offset(s, t);
        write_raw(pixel, &mut self.data[off..off + bpp], self.format);
    }

    pub fn fill(&mut self, pixel: Pixel) {
        for t in 0..self.height {
            for s in 0..self.width {
                self.write(pixel, s, t);
            }
        }
    }

    /// Bilinear sample at normalized `(u, v)`, propagating no-data the way
    /// the original does: a no-data sample is excluded from the blend
    /// rather than averaged in, and an all-no-data neighborhood returns
    /// no-data.
    pub fn read_bilinear(&self, u: f32, v: f32) -> Pixel {
        let u = u.clamp(0.0, 1.0);
        let v = v.clamp(0.0, 1.0);

        let size_s = (self.width - 1) as f32;
        let s = u * size_s;
        let s0 = s.floor().max(0.0);
        let s1 = (s0 + 1.0).min(size_s);
        let smix = if s0 < s1 { (s - s0) / (s1 - s0) } else { 0.0 };

        let size_t = (self.height - 1) as f32;
        let t = v * size_t;
        let t0 = t.floor().max(0.0);
        let t1 = (t0 + 1.0).min(size_t);
        let tmix = if t0 < t1 { (t - t0) / (t1 - t0) } else { 0.0 };

        let ul = self.read(s0 as u32, t0 as u32);
        let ur = self.read(s1 as u32, t0 as u32);
        let ll = self.read(s0 as u32, t1 as u32);
        let lr = self.read(s1 as u32, t1 as u32);

        let nd = self.no_data_value;
        let top = if ul.r() == nd {
            ur
        } else if ur.r() == nd {
            ul
        } else {
            ul * (1.0 - smix) + ur * smix
        };
        let bot = if ll.r() == nd {
            lr
        } else if lr.r() == nd {
            ll
        } else {
            ll * (1.0 - smix) + lr * smix
        };

        if top.r() == nd && bot.r() == nd {
            Pixel::splat(nd)
        } else if top.r() == nd {
            bot
        } else if bot.r() == nd {
            top
        } else {
            top * (1.0 - tmix) + bot * tmix
        }
    }

    pub fn each_pixel<F: FnMut(u32, u32, Pixel)>(&self, mut f: F) {
        for t in 0..self.height {
            for s in 0..self.width {
                f(s, t, self.read(s, t));
            }
        }
    }

    /// A sharpened clone using a fixed 3x3 unsharp-mask kernel, clamped to
    /// the image edges.
    pub fn sharpen(&self, strength: f32) -> Image {
        let center = 1.0 + 4.0 * strength;
        let edge = -strength;
        #[rustfmt::skip]
        let kernel = [
            0.0,  edge, 0.0,
            edge, center, edge,
            0.0,  edge, 0.0,
        ];
        self.convolve(&kernel)
    }

    /// A convolved clone using a 3x3 `kernel` (row-major), clamping sample
    /// coordinates to the image edges.
    pub fn convolve(&self, kernel: &[f32; 9]) -> Image {
        let mut out = Image::new_layered(self.format, self.width, self.height, self.depth);
        out.no_data_value = self.no_data_value;

        for t in 0..self.height as i64 {
            for s in 0..self.width as i64 {
                let mut acc = Pixel::new(0.0, 0.0, 0.0, 0.0);
                let mut k = 0;
                for dt in -1..=1i64 {
                    for ds in -1..=1i64 {
                        let ss = (s + ds).clamp(0, self.width as i64 - 1) as u32;
                        let tt = (t + dt).clamp(0, self.height as i64 - 1) as u32;
                        acc = acc + self.read(ss, tt) * kernel[k];
                        k += 1;
                    }
                }
                out.write(acc, s as u32, t as u32);
            }
        }
        out
    }

    pub fn flip_vertical_in_place(&mut self) {
        let bpp = self.format.bytes_per_pixel();
        let row_bytes = self.width as usize * bpp;
        let mut top = 0usize;
        let mut bottom = (self.height as usize - 1) * row_bytes;
        while top < bottom {
            let (head, tail) = self.data.split_at_mut(bottom);
            head[top..top + row_bytes].swap_with_slice(&mut tail[..row_bytes]);
            top += row_bytes;
            bottom -= row_bytes;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn read_write_round_trips_rgba8() {
        let mut img = Image::new(PixelFormat::R8G8B8A8Unorm, 2, 2);
        img.write(Pixel::new(1.0, 0.5, 0.0, 1.0), 0, 0);
        let p = img.read(0, 0);
        assert_abs_diff_eq!(p.0[0], 1.0, epsilon = 1.0 / 255.0);
        assert_abs_diff_eq!(p.0[1], 0.5, epsilon = 1.0 / 255.0);
    }

    #[test]
    fn bilinear_interpolates_between_corners() {
        let mut img = Image::new(PixelFormat::R32Sfloat, 2, 1);
        img.write(Pixel::splat(0.0), 0, 0);
        img.write(Pixel::splat(10.0), 1, 0);
        let mid = img.read_bilinear(0.5, 0.0);
        assert_abs_diff_eq!(mid.r(), 5.0, epsilon = 1e-4);
    }

    #[test]
    fn bilinear_excludes_no_data_neighbors() {
        let mut img = Image::new(PixelFormat::R32Sfloat, 2, 1);
        img.set_no_data_value(-9999.0);
        img.write(Pixel::splat(-9999.0), 0, 0);
        img.write(Pixel::splat(10.0), 1, 0);
        let mid = img.read_bilinear(0.5, 0.0);
        assert_abs_diff_eq!(mid.r(), 10.0, epsilon = 1e-4);
    }

    #[test]
    fn all_no_data_neighborhood_stays_no_data() {
        let mut img = Image::new(PixelFormat::R32Sfloat, 2, 1);
        img.set_no_data_value(-9999.0);
        img.fill(Pixel::splat(-9999.0));
        let mid = img.read_bilinear(0.5, 0.0);
        assert_abs_diff_eq!(mid.r(), -9999.0);
    }

    #[test]
    fn srgb_round_trips_through_linear() {
        let c = 0.6_f32;
        let round = linear_to_srgb(srgb_to_linear(c));
        assert_abs_diff_eq!(round, c, epsilon = 1e-5);
    }

    #[test]
    fn new_defaults_to_a_single_layer() {
        let img = Image::new(PixelFormat::R8G8B8A8Unorm, 4, 4);
        assert_eq!(img.depth(), 1);
    }

    #[test]
    fn layered_image_size_scales_with_depth() {
        let flat = Image::new_layered(PixelFormat::R32Sfloat, 4, 4, 1);
        let layered = Image::new_layered(PixelFormat::R32Sfloat, 4, 4, 3);
        assert_eq!(layered.data.len(), flat.data.len() * 3);
    }
}
