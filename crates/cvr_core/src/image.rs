//! Render output buffers.
//!
//! A render call produces three aligned buffers: 8-bit RGB color, 16-bit
//! depth (metric depth times the configured depth scale) and an 8-bit
//! validity mask. All three share the generic [`Image`] storage and can be
//! exported as PNG.

use std::path::Path;

use thiserror::Error;

/// Errors that can occur while exporting an image.
#[derive(Error, Debug)]
pub enum ImageIoError {
    #[error("pixel data does not match the image dimensions")]
    BufferSize,

    #[error("image encoding error: {0}")]
    Encode(#[from] image::ImageError),
}

/// A simple row-major 2D pixel buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct Image<T> {
    width: u32,
    height: u32,
    data: Vec<T>,
}

/// 3-channel 8-bit color buffer.
pub type ColorImage = Image<[u8; 3]>;

/// Single-channel 16-bit depth buffer. Zero means "no surface".
pub type DepthImage = Image<u16>;

/// Single-channel mask buffer: 255 where a surface was hit, 0 elsewhere.
pub type MaskImage = Image<u8>;

impl<T: Copy> Image<T> {
    /// Create a new image filled with `fill`.
    pub fn new(width: u32, height: u32, fill: T) -> Self {
        Self {
            width,
            height,
            data: vec![fill; (width * height) as usize],
        }
    }

    /// Resize the image and reset every pixel to `fill`.
    ///
    /// Previous contents are discarded even when the size is unchanged.
    pub fn resize(&mut self, width: u32, height: u32, fill: T) {
        self.width = width;
        self.height = height;
        self.data.clear();
        self.data.resize((width * height) as usize, fill);
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Get the pixel at (x, y). Panics if out of range.
    pub fn get(&self, x: u32, y: u32) -> T {
        self.data[(y * self.width + x) as usize]
    }

    /// Set the pixel at (x, y). Panics if out of range.
    pub fn set(&mut self, x: u32, y: u32, value: T) {
        self.data[(y * self.width + x) as usize] = value;
    }

    /// The raw pixel data in row-major order.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Mutable access to the raw pixel data in row-major order.
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl ColorImage {
    /// Save as an 8-bit RGB PNG (format chosen by file extension).
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<(), ImageIoError> {
        let flat: Vec<u8> = self.data.iter().flatten().copied().collect();
        let buffer = image::RgbImage::from_raw(self.width, self.height, flat)
            .ok_or(ImageIoError::BufferSize)?;
        buffer.save(path.as_ref())?;
        Ok(())
    }
}

impl DepthImage {
    /// Save as a 16-bit grayscale PNG (format chosen by file extension).
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<(), ImageIoError> {
        let buffer = image::ImageBuffer::<image::Luma<u16>, Vec<u16>>::from_raw(
            self.width,
            self.height,
            self.data.clone(),
        )
        .ok_or(ImageIoError::BufferSize)?;
        buffer.save(path.as_ref())?;
        Ok(())
    }
}

impl MaskImage {
    /// Save as an 8-bit grayscale PNG (format chosen by file extension).
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<(), ImageIoError> {
        let buffer = image::GrayImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or(ImageIoError::BufferSize)?;
        buffer.save(path.as_ref())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_creation() {
        let img: MaskImage = Image::new(4, 3, 0);
        assert_eq!(img.width(), 4);
        assert_eq!(img.height(), 3);
        assert_eq!(img.data().len(), 12);
        assert!(img.data().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_get_set() {
        let mut img: DepthImage = Image::new(4, 3, 0);
        img.set(2, 1, 1234);

        assert_eq!(img.get(2, 1), 1234);
        assert_eq!(img.get(1, 2), 0);
        // Row-major layout
        assert_eq!(img.data()[6], 1234);
    }

    #[test]
    fn test_resize_resets_contents() {
        let mut img: ColorImage = Image::new(2, 2, [0, 0, 0]);
        img.set(0, 0, [9, 9, 9]);

        img.resize(2, 2, [1, 2, 3]);
        assert_eq!(img.get(0, 0), [1, 2, 3]);

        img.resize(5, 4, [0, 0, 0]);
        assert_eq!(img.data().len(), 20);
    }
}
