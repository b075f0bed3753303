//! Image decoding collaborator.

use std::path::Path;

use crate::AssetError;

/// Decoded pixel data, rows packed tightly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
}

pub trait ImageDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedImage, AssetError>;
}

/// Decodes image files with the `image` crate.
///
/// Grayscale stays single-channel and RGB stays three-channel; every other
/// layout is expanded to 8-bit RGBA.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageFileDecoder {
    /// Flip rows so the first row is the bottom of the image.
    pub flip_vertically: bool,
}

impl ImageFileDecoder {
    pub fn new(flip_vertically: bool) -> Self {
        Self { flip_vertically }
    }
}

impl ImageDecoder for ImageFileDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedImage, AssetError> {
        let mut img = image::open(path).map_err(|source| AssetError::Image {
            path: path.to_path_buf(),
            source,
        })?;
        if self.flip_vertically {
            img = img.flipv();
        }
        let (width, height) = (img.width(), img.height());
        let (pixels, channels) = match img {
            image::DynamicImage::ImageLuma8(buf) => (buf.into_raw(), 1),
            image::DynamicImage::ImageRgb8(buf) => (buf.into_raw(), 3),
            other => (other.into_rgba8().into_raw(), 4),
        };
        tracing::trace!(path = %path.display(), width, height, channels, "decoded image");
        Ok(DecodedImage {
            pixels,
            width,
            height,
            channels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_rgb(path: &Path) {
        let mut img = image::RgbImage::new(2, 2);
        img.put_pixel(0, 0, image::Rgb([255, 0, 0]));
        img.put_pixel(0, 1, image::Rgb([0, 0, 255]));
        img.save(path).unwrap();
    }

    #[test]
    fn rgb_png_keeps_three_channels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgb.png");
        write_rgb(&path);

        let decoded = ImageFileDecoder::default().decode(&path).unwrap();
        assert_eq!((decoded.width, decoded.height, decoded.channels), (2, 2, 3));
        assert_eq!(decoded.pixels.len(), 12);
        assert_eq!(&decoded.pixels[0..3], &[255, 0, 0]);
    }

    #[test]
    fn flip_moves_bottom_row_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgb.png");
        write_rgb(&path);

        let decoded = ImageFileDecoder::new(true).decode(&path).unwrap();
        assert_eq!(&decoded.pixels[0..3], &[0, 0, 255]);
    }

    #[test]
    fn grayscale_alpha_expands_to_rgba() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("la.png");
        image::GrayAlphaImage::new(3, 1).save(&path).unwrap();

        let decoded = ImageFileDecoder::default().decode(&path).unwrap();
        assert_eq!(decoded.channels, 4);
        assert_eq!(decoded.pixels.len(), 12);
    }

    #[test]
    fn missing_file_is_image_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ImageFileDecoder::default()
            .decode(&dir.path().join("nope.png"))
            .unwrap_err();
        assert!(matches!(err, AssetError::Image { .. }));
    }
}
