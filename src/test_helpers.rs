//! Shared test utilities for the rasterpress test suite.
//!
//! Real-pixel fixtures for tests that exercise [`RustBackend`](crate::imaging::RustBackend).
//! Tests that only care about dimensions and call order use the recording
//! `MockBackend` in `imaging::backend::tests` instead.
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let file = png_source("photo.png", 64, 48);
//! let broken = broken_source("broken.jpg");
//! ```

use crate::types::SourceFile;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, Rgba, RgbaImage};

/// A deterministic RGBA gradient; different pixel values in every corner so
/// rotations are distinguishable.
pub fn gradient_image(width: u32, height: u32) -> DynamicImage {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        let r = (x * 255 / width.max(1)) as u8;
        let g = (y * 255 / height.max(1)) as u8;
        let b = ((x + y) % 256) as u8;
        Rgba([r, g, b, 255])
    });
    DynamicImage::ImageRgba8(img)
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    gradient_image(width, height)
        .write_with_encoder(PngEncoder::new(&mut buf))
        .unwrap();
    buf
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    let rgb = DynamicImage::ImageRgb8(gradient_image(width, height).to_rgb8());
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, 90))
        .unwrap();
    buf
}

pub fn png_source(name: &str, width: u32, height: u32) -> SourceFile {
    SourceFile::new(name, png_bytes(width, height))
}

/// A file with an image extension but bytes no decoder accepts.
pub fn broken_source(name: &str) -> SourceFile {
    SourceFile::new(name, b"this is not an image".to_vec())
}
