//! Diffuse texture storage and sampling.
//!
//! Textures are 8-bit RGB, sampled through mesh UV coordinates with either
//! nearest-neighbor or bilinear filtering. UV (0, 0) maps to the bottom-left
//! of the image, so the v axis is flipped relative to pixel rows.

use std::path::Path;

use thiserror::Error;

/// Errors that can occur during texture loading.
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("image decoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("pixel data length {len} does not match {width}x{height}")]
    SizeMismatch { width: u32, height: u32, len: usize },

    #[error("texture dimensions must be positive, got {width}x{height}")]
    EmptyTexture { width: u32, height: u32 },
}

/// An 8-bit RGB texture image.
#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    width: u32,
    height: u32,
    pixels: Vec<[u8; 3]>,
}

impl Texture {
    /// Create a texture from row-major RGB pixel data.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<[u8; 3]>) -> Result<Self, TextureError> {
        if width == 0 || height == 0 {
            return Err(TextureError::EmptyTexture { width, height });
        }
        if pixels.len() != (width * height) as usize {
            return Err(TextureError::SizeMismatch {
                width,
                height,
                len: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Load a texture from an image file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TextureError> {
        let rgb = image::open(path.as_ref())?.to_rgb8();
        let (width, height) = rgb.dimensions();
        let pixels = rgb.pixels().map(|p| p.0).collect();

        log::debug!(
            "Loaded texture {} ({}x{})",
            path.as_ref().display(),
            width,
            height
        );
        Self::from_pixels(width, height, pixels)
    }

    /// Create a 1x1 solid color texture.
    pub fn solid(color: [u8; 3]) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: vec![color],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Get the texel at integer coordinates. Panics if out of range.
    pub fn texel(&self, x: u32, y: u32) -> [u8; 3] {
        self.pixels[(y * self.width + x) as usize]
    }

    /// Sample with nearest-neighbor filtering.
    ///
    /// UV coordinates outside [0, 1] clamp to the border texels.
    pub fn sample_nearest(&self, u: f32, v: f32) -> [u8; 3] {
        let (fx, fy) = self.texel_coords(u, v);
        let x = fx.round().clamp(0.0, (self.width - 1) as f32) as u32;
        let y = fy.round().clamp(0.0, (self.height - 1) as f32) as u32;
        self.texel(x, y)
    }

    /// Sample with bilinear filtering.
    ///
    /// Returns the blended color as floats in 0..=255 so callers can keep
    /// interpolating before the final 8-bit conversion. UV coordinates
    /// outside [0, 1] clamp to the border texels.
    pub fn sample_bilinear(&self, u: f32, v: f32) -> [f32; 3] {
        let (fx, fy) = self.texel_coords(u, v);
        let x0 = fx.floor().clamp(0.0, (self.width - 1) as f32) as u32;
        let y0 = fy.floor().clamp(0.0, (self.height - 1) as f32) as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);

        let local_u = (fx - x0 as f32).clamp(0.0, 1.0);
        let local_v = (fy - y0 as f32).clamp(0.0, 1.0);

        let t00 = self.texel(x0, y0);
        let t10 = self.texel(x1, y0);
        let t01 = self.texel(x0, y1);
        let t11 = self.texel(x1, y1);

        let mut color = [0.0f32; 3];
        for k in 0..3 {
            color[k] = (1.0 - local_u) * (1.0 - local_v) * t00[k] as f32
                + local_u * (1.0 - local_v) * t10[k] as f32
                + (1.0 - local_u) * local_v * t01[k] as f32
                + local_u * local_v * t11[k] as f32;
        }
        color
    }

    /// Map UV in [0, 1] to continuous texel coordinates, flipping v.
    fn texel_coords(&self, u: f32, v: f32) -> (f32, f32) {
        let fx = u * (self.width - 1) as f32;
        let fy = (1.0 - v) * (self.height - 1) as f32;
        (fx, fy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2x2 texture:
    ///   row 0 (top):    red   green
    ///   row 1 (bottom): blue  white
    fn checker() -> Texture {
        Texture::from_pixels(
            2,
            2,
            vec![[255, 0, 0], [0, 255, 0], [0, 0, 255], [255, 255, 255]],
        )
        .unwrap()
    }

    #[test]
    fn test_from_pixels_validates() {
        assert!(matches!(
            Texture::from_pixels(2, 2, vec![[0, 0, 0]; 3]),
            Err(TextureError::SizeMismatch { len: 3, .. })
        ));
        assert!(matches!(
            Texture::from_pixels(0, 2, vec![]),
            Err(TextureError::EmptyTexture { .. })
        ));
    }

    #[test]
    fn test_nearest_corners() {
        let tex = checker();

        // v = 1 is the top row, v = 0 the bottom row
        assert_eq!(tex.sample_nearest(0.0, 1.0), [255, 0, 0]);
        assert_eq!(tex.sample_nearest(1.0, 1.0), [0, 255, 0]);
        assert_eq!(tex.sample_nearest(0.0, 0.0), [0, 0, 255]);
        assert_eq!(tex.sample_nearest(1.0, 0.0), [255, 255, 255]);
    }

    #[test]
    fn test_nearest_clamps_outside_range() {
        let tex = checker();

        assert_eq!(tex.sample_nearest(-0.5, 2.0), [255, 0, 0]);
        assert_eq!(tex.sample_nearest(1.5, -1.0), [255, 255, 255]);
    }

    #[test]
    fn test_bilinear_center_blend() {
        let tex = checker();

        // Center of the quad blends all four texels equally
        let c = tex.sample_bilinear(0.5, 0.5);
        assert!((c[0] - (255.0 + 0.0 + 0.0 + 255.0) / 4.0).abs() < 0.01);
        assert!((c[1] - (0.0 + 255.0 + 0.0 + 255.0) / 4.0).abs() < 0.01);
        assert!((c[2] - (0.0 + 0.0 + 255.0 + 255.0) / 4.0).abs() < 0.01);
    }

    #[test]
    fn test_bilinear_at_texel_is_exact() {
        let tex = checker();

        let c = tex.sample_bilinear(0.0, 1.0);
        assert_eq!(c, [255.0, 0.0, 0.0]);
    }

    #[test]
    fn test_solid() {
        let tex = Texture::solid([10, 20, 30]);
        assert_eq!(tex.sample_nearest(0.3, 0.8), [10, 20, 30]);
        assert_eq!(tex.sample_bilinear(0.9, 0.1), [10.0, 20.0, 30.0]);
    }
}
