// src/bake/encode.rs
//! Texel encoding of baked vertices, plus the RGBA8 raster they land in.

use bevy::asset::RenderAssetUsages;
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};

use super::bounds::VatBounds;

pub type Texel = [u8; 4];

/// `round(clamp01(v) * 255)`.
#[inline]
pub fn quantize(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[inline]
pub fn dequantize(v: u8) -> f32 {
    v as f32 / 255.0
}

/// Position remapped into the bounds, alpha 1.
pub fn encode_position(p: Vec3, bounds: &VatBounds) -> Texel {
    let t = bounds.normalize(p);
    [quantize(t.x), quantize(t.y), quantize(t.z), 255]
}

/// Normal remapped from [-1, 1] to [0, 1], alpha 1. Missing normals encode +Y.
pub fn encode_normal(n: Option<Vec3>) -> Texel {
    let n = n.unwrap_or(Vec3::Y) * 0.5 + Vec3::splat(0.5);
    [quantize(n.x), quantize(n.y), quantize(n.z), 255]
}

pub fn decode_position(texel: Texel, bounds: &VatBounds) -> Vec3 {
    bounds.denormalize(Vec3::new(dequantize(texel[0]), dequantize(texel[1]), dequantize(texel[2])))
}

pub fn decode_normal(texel: Texel) -> Vec3 {
    Vec3::new(dequantize(texel[0]), dequantize(texel[1]), dequantize(texel[2])) * 2.0 - Vec3::ONE
}

// ---------- Raster ----------

/// Row-major RGBA8 raster; pixel `i` is column `i % width` of row `i / width`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VatTexture {
    width: u32,
    height: u32,
    pixels: Vec<Texel>,
}

impl VatTexture {
    /// Transparent black, as an unwritten pixel stays.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, pixels: vec![[0; 4]; width as usize * height as usize] }
    }

    pub fn width(&self) -> u32 { self.width }
    pub fn height(&self) -> u32 { self.height }
    pub fn len(&self) -> usize { self.pixels.len() }
    pub fn is_empty(&self) -> bool { self.pixels.is_empty() }
    pub fn pixels(&self) -> &[Texel] { &self.pixels }

    pub fn get(&self, index: usize) -> Option<Texel> {
        self.pixels.get(index).copied()
    }

    /// Write one texel; returns false (and writes nothing) past the end.
    pub fn set(&mut self, index: usize, texel: Texel) -> bool {
        match self.pixels.get_mut(index) {
            Some(px) => {
                *px = texel;
                true
            }
            None => false,
        }
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        self.pixels.iter().flatten().copied().collect()
    }

    /// Linear (non-sRGB) GPU image; the data is not color.
    pub fn to_image(&self) -> Image {
        Image::new(
            Extent3d { width: self.width, height: self.height, depth_or_array_layers: 1 },
            TextureDimension::D2,
            self.as_bytes(),
            TextureFormat::Rgba8Unorm,
            RenderAssetUsages::default(),
        )
    }

    /// Raster for file export, same row order as `to_image` (row 0 first).
    pub fn to_rgba_image(&self) -> image::RgbaImage {
        let (w, h) = (self.width, self.height);
        image::RgbaImage::from_fn(w, h, |x, y| image::Rgba(self.pixels[(y * w + x) as usize]))
    }
}
