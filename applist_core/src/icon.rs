/*============================================================
  Synavera Project: AppList-Core
  Module: applist_core::icon
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Normalise bitmap and layered (adaptive) icon sources into
    a single lossless PNG representation.

  Security / Safety Notes:
    Pure in-memory processing; canvases are sized from the
    source's intrinsic dimensions and released after encode.

  Dependencies:
    image for pixel buffers, compositing and PNG encoding;
    sha2 for deterministic placeholder colours.

  Operational Scope:
    Called by the inventory builder once per package.

  Revision History:
    2026-10-19 COD  Authored icon normaliser.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Icon kind resolved once, converted by its own path
    - Explicit placeholder instead of silent icon loss
============================================================*/

use std::fmt;

use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder, Rgba, RgbaImage};
use sha2::{Digest, Sha256};

use crate::error::{AppListError, Result};

/// Edge length used for placeholders and for layered icons that
/// carry no bitmap to take dimensions from.
pub const DEFAULT_ICON_SIZE: u32 = 108;

/// A drawable that has to be painted onto a fresh canvas.
pub trait Rasterize: Send {
    /// Width and height the drawable wants to be rendered at.
    fn intrinsic_size(&self) -> (u32, u32);

    /// Paint onto a canvas already bound to `intrinsic_size`.
    fn draw(&self, canvas: &mut RgbaImage);
}

/// The two ways a platform hands us an icon.
pub enum IconSource {
    /// Pixel buffer usable as-is.
    DirectBitmap(RgbaImage),
    /// Adaptive or otherwise composed drawable.
    Rasterizable(Box<dyn Rasterize>),
}

impl fmt::Debug for IconSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IconSource::DirectBitmap(image) => f
                .debug_tuple("DirectBitmap")
                .field(&image.dimensions())
                .finish(),
            IconSource::Rasterizable(drawable) => f
                .debug_tuple("Rasterizable")
                .field(&drawable.intrinsic_size())
                .finish(),
        }
    }
}

impl IconSource {
    /// Resolve the source into a flat RGBA pixel buffer.
    pub fn into_pixels(self) -> Result<RgbaImage> {
        match self {
            IconSource::DirectBitmap(image) => {
                let (width, height) = image.dimensions();
                if width == 0 || height == 0 {
                    return Err(AppListError::Icon("bitmap has zero dimensions".into()));
                }
                Ok(image)
            }
            IconSource::Rasterizable(drawable) => {
                let (width, height) = drawable.intrinsic_size();
                if width == 0 || height == 0 {
                    return Err(AppListError::Icon(format!(
                        "drawable reports intrinsic size {width}x{height}"
                    )));
                }
                let mut canvas = RgbaImage::new(width, height);
                drawable.draw(&mut canvas);
                Ok(canvas)
            }
        }
    }
}

/// One plane of a layered icon.
#[derive(Debug, Clone)]
pub enum Layer {
    Bitmap(RgbaImage),
    Solid(Rgba<u8>),
}

impl Layer {
    fn dimensions(&self) -> Option<(u32, u32)> {
        match self {
            Layer::Bitmap(image) => Some(image.dimensions()),
            Layer::Solid(_) => None,
        }
    }

    fn paint(&self, canvas: &mut RgbaImage) {
        let (width, height) = canvas.dimensions();
        match self {
            Layer::Solid(color) => {
                let fill = RgbaImage::from_pixel(width, height, *color);
                imageops::overlay(canvas, &fill, 0, 0);
            }
            Layer::Bitmap(image) if image.dimensions() == (width, height) => {
                imageops::overlay(canvas, image, 0, 0);
            }
            Layer::Bitmap(image) => {
                let scaled = imageops::resize(image, width, height, FilterType::Triangle);
                imageops::overlay(canvas, &scaled, 0, 0);
            }
        }
    }
}

/// Adaptive icon: a background plane with a foreground composited on top.
#[derive(Debug, Clone)]
pub struct LayeredIcon {
    pub background: Layer,
    pub foreground: Layer,
}

impl Rasterize for LayeredIcon {
    fn intrinsic_size(&self) -> (u32, u32) {
        let sizes = [self.background.dimensions(), self.foreground.dimensions()];
        sizes
            .into_iter()
            .flatten()
            .max_by_key(|(w, h)| u64::from(*w) * u64::from(*h))
            .unwrap_or((DEFAULT_ICON_SIZE, DEFAULT_ICON_SIZE))
    }

    fn draw(&self, canvas: &mut RgbaImage) {
        self.background.paint(canvas);
        self.foreground.paint(canvas);
    }
}

/// Flat colour drawable with an explicit size.
#[derive(Debug, Clone, Copy)]
pub struct SolidColorIcon {
    pub color: Rgba<u8>,
    pub width: u32,
    pub height: u32,
}

impl Rasterize for SolidColorIcon {
    fn intrinsic_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn draw(&self, canvas: &mut RgbaImage) {
        for pixel in canvas.pixels_mut() {
            *pixel = self.color;
        }
    }
}

/// Encode a pixel buffer as PNG.
pub fn encode_rgba(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|err| AppListError::Icon(format!("PNG encode failed: {err}")))?;
    Ok(bytes)
}

/// Resolve any icon source and encode it as PNG.
pub fn encode_png(source: IconSource) -> Result<Vec<u8>> {
    let pixels = source.into_pixels()?;
    encode_rgba(&pixels)
}

/// Colour derived from the package id so a placeholder stays stable
/// across scans.
pub fn placeholder_color(package_id: &str) -> Rgba<u8> {
    let digest = Sha256::digest(package_id.as_bytes());
    Rgba([digest[0], digest[1], digest[2], 0xff])
}

/// Square single-colour PNG used when a package's icon cannot be resolved.
pub fn placeholder_icon(package_id: &str, size: u32) -> Result<Vec<u8>> {
    let size = size.max(1);
    let drawable = SolidColorIcon {
        color: placeholder_color(package_id),
        width: size,
        height: size,
    };
    encode_png(IconSource::Rasterizable(Box::new(drawable)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> RgbaImage {
        image::load_from_memory(bytes).unwrap().to_rgba8()
    }

    #[test]
    fn direct_bitmap_is_encoded_losslessly() {
        let mut bitmap = RgbaImage::new(3, 2);
        bitmap.put_pixel(0, 0, Rgba([1, 2, 3, 4]));
        bitmap.put_pixel(2, 1, Rgba([200, 100, 50, 255]));

        let decoded = decode(&encode_png(IconSource::DirectBitmap(bitmap.clone())).unwrap());
        assert_eq!(decoded, bitmap);
    }

    #[test]
    fn layered_icon_composites_foreground_over_background() {
        let mut foreground = RgbaImage::new(4, 4);
        foreground.put_pixel(1, 1, Rgba([255, 0, 0, 255]));
        let icon = LayeredIcon {
            background: Layer::Solid(Rgba([0, 0, 255, 255])),
            foreground: Layer::Bitmap(foreground),
        };
        assert_eq!(icon.intrinsic_size(), (4, 4));

        let decoded = decode(&encode_png(IconSource::Rasterizable(Box::new(icon))).unwrap());
        assert_eq!(decoded.dimensions(), (4, 4));
        assert_eq!(*decoded.get_pixel(1, 1), Rgba([255, 0, 0, 255]));
        assert_eq!(*decoded.get_pixel(0, 0), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn layered_icon_scales_smaller_layers_to_the_largest() {
        let icon = LayeredIcon {
            background: Layer::Bitmap(RgbaImage::from_pixel(2, 2, Rgba([9, 9, 9, 255]))),
            foreground: Layer::Bitmap(RgbaImage::new(8, 8)),
        };
        let pixels = IconSource::Rasterizable(Box::new(icon)).into_pixels().unwrap();
        assert_eq!(pixels.dimensions(), (8, 8));
        assert_eq!(*pixels.get_pixel(7, 7), Rgba([9, 9, 9, 255]));
    }

    #[test]
    fn solid_layers_only_use_default_size() {
        let icon = LayeredIcon {
            background: Layer::Solid(Rgba([0, 0, 0, 255])),
            foreground: Layer::Solid(Rgba([0, 0, 0, 0])),
        };
        assert_eq!(icon.intrinsic_size(), (DEFAULT_ICON_SIZE, DEFAULT_ICON_SIZE));
    }

    #[test]
    fn zero_sized_drawable_is_an_error() {
        let drawable = SolidColorIcon {
            color: Rgba([0, 0, 0, 255]),
            width: 0,
            height: 48,
        };
        let err = encode_png(IconSource::Rasterizable(Box::new(drawable))).unwrap_err();
        assert!(matches!(err, AppListError::Icon(_)));
    }

    #[test]
    fn placeholder_is_deterministic_and_decodable() {
        let first = placeholder_icon("com.example.notes", 48).unwrap();
        let second = placeholder_icon("com.example.notes", 48).unwrap();
        assert_eq!(first, second);

        let decoded = decode(&first);
        assert_eq!(decoded.dimensions(), (48, 48));
        assert_eq!(*decoded.get_pixel(10, 10), placeholder_color("com.example.notes"));
        assert_ne!(
            placeholder_color("com.example.notes"),
            placeholder_color("com.example.mail")
        );
    }
}
