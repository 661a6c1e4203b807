//! Pure Rust raster backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP, GIF, BMP) | `image::ImageReader` with format sniffing |
//! | Decode (AVIF) | `avif-parse` (container) + `rav1d` (AV1) + BT.601 YUV→RGB |
//! | Rotate | `DynamicImage::rotate90` / `rotate180` / `rotate270` |
//! | Resize | `DynamicImage::resize_exact`, filter chosen from the [`ResampleHint`] |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (RGB8) |
//! | Encode → PNG | `image::codecs::png::PngEncoder` (lossless, quality ignored) |
//! | Encode → WebP | `webp` crate (lossy, or lossless at quality 1.0) |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) |
//!
//! The `image` crate's `"avif"` feature only ships the encoder, so AVIF bytes
//! are recognised by their `ftyp` brand and decoded with `rav1d` directly.

use super::backend::{BackendError, Dimensions, RasterBackend};
use super::params::{ExportFormat, ExportParams, ResampleHint, ResizeParams};
use crate::settings::Rotation;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use std::io::Cursor;
use std::ptr::NonNull;
use std::sync::LazyLock;
use tracing::debug;

/// AVIF encoder speed (0 = slowest/best, 10 = fastest).
const AVIF_SPEED: u8 = 6;

const INPUT_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
    ("gif", ImageFormat::Gif),
    ("bmp", ImageFormat::Bmp),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    let mut exts: Vec<&'static str> = INPUT_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect();
    // Not an `image` decoder; see `decode_avif`.
    exts.push("avif");
    exts
});

/// File extensions (lowercase) whose decoders are compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Raster backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

fn filter_for(hint: ResampleHint) -> FilterType {
    match hint {
        ResampleHint::Disabled => FilterType::Nearest,
        ResampleHint::Low => FilterType::Triangle,
        ResampleHint::Medium => FilterType::CatmullRom,
        ResampleHint::High => FilterType::Lanczos3,
    }
}

fn encode_failed(codec: &'static str) -> impl Fn(image::ImageError) -> BackendError {
    move |e| BackendError::Encode(format!("{codec} encode failed: {e}"))
}

fn encode_jpeg(img: &DynamicImage, params: &ExportParams) -> Result<Vec<u8>, BackendError> {
    if params.progressive || params.optimize {
        debug!(
            progressive = params.progressive,
            optimize = params.optimize,
            "JPEG encoder ignores scan/table hints"
        );
    }
    let mut buf = Vec::new();
    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let encoder = JpegEncoder::new_with_quality(&mut buf, params.quality_percent().max(1));
    rgb.write_with_encoder(encoder)
        .map_err(encode_failed("JPEG"))?;
    Ok(buf)
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    img.write_with_encoder(PngEncoder::new(&mut buf))
        .map_err(encode_failed("PNG"))?;
    Ok(buf)
}

fn encode_webp(img: &DynamicImage, params: &ExportParams) -> Result<Vec<u8>, BackendError> {
    let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
    let encoder = webp::Encoder::from_image(&rgba)
        .map_err(|e| BackendError::Encode(format!("WebP encode failed: {e}")))?;
    let memory = if params.quality >= 1.0 {
        encoder.encode_lossless()
    } else {
        encoder.encode(params.quality.clamp(0.0, 1.0) * 100.0)
    };
    Ok(memory.to_vec())
}

fn encode_avif(img: &DynamicImage, params: &ExportParams) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
    let encoder =
        AvifEncoder::new_with_speed_quality(&mut buf, AVIF_SPEED, params.quality_percent().max(1));
    rgba.write_with_encoder(encoder)
        .map_err(encode_failed("AVIF"))?;
    Ok(buf)
}

/// ISO-BMFF `ftyp` box with an AVIF still-image or sequence brand.
fn is_avif(bytes: &[u8]) -> bool {
    bytes.get(4..8) == Some(&b"ftyp"[..])
        && bytes
            .get(8..12)
            .is_some_and(|brand| brand == b"avif" || brand == b"avis")
}

fn avif_failed(stage: &str, code: i32) -> BackendError {
    BackendError::Decode(format!("AVIF {stage} failed ({code})"))
}

/// Decode AVIF bytes: `avif-parse` extracts the primary AV1 item, `rav1d`
/// decodes it, and the YUV planes are converted to RGB8. Alpha is dropped.
fn decode_avif(bytes: &[u8]) -> Result<DynamicImage, BackendError> {
    use rav1d::include::dav1d::data::Dav1dData;
    use rav1d::include::dav1d::dav1d::Dav1dSettings;
    use rav1d::include::dav1d::picture::Dav1dPicture;
    use rav1d::src::lib as dav1d;

    let avif = avif_parse::read_avif(&mut Cursor::new(bytes))
        .map_err(|e| BackendError::Decode(format!("Invalid AVIF container: {e:?}")))?;
    let av1: &[u8] = &avif.primary_item;

    let mut settings = std::mem::MaybeUninit::<Dav1dSettings>::uninit();
    let settings_ptr = NonNull::new(settings.as_mut_ptr())
        .ok_or_else(|| BackendError::Decode("AVIF settings pointer is null".into()))?;
    unsafe { dav1d::dav1d_default_settings(settings_ptr) };
    let mut settings = unsafe { settings.assume_init() };
    settings.n_threads = 1;
    settings.max_frame_delay = 1;

    let mut ctx = None;
    let rc = unsafe { dav1d::dav1d_open(NonNull::new(&mut ctx), NonNull::new(&mut settings)) };
    if rc.0 != 0 {
        return Err(avif_failed("decoder open", rc.0));
    }

    let mut data = Dav1dData::default();
    let buf = unsafe { dav1d::dav1d_data_create(NonNull::new(&mut data), av1.len()) };
    if buf.is_null() {
        unsafe { dav1d::dav1d_close(NonNull::new(&mut ctx)) };
        return Err(BackendError::Decode("AVIF data buffer allocation failed".into()));
    }
    unsafe { std::ptr::copy_nonoverlapping(av1.as_ptr(), buf, av1.len()) };

    let rc = unsafe { dav1d::dav1d_send_data(ctx, NonNull::new(&mut data)) };
    if rc.0 != 0 {
        unsafe {
            dav1d::dav1d_data_unref(NonNull::new(&mut data));
            dav1d::dav1d_close(NonNull::new(&mut ctx));
        }
        return Err(avif_failed("send_data", rc.0));
    }

    let mut pic: Dav1dPicture = unsafe { std::mem::zeroed() };
    let rc = unsafe { dav1d::dav1d_get_picture(ctx, NonNull::new(&mut pic)) };
    if rc.0 != 0 {
        unsafe { dav1d::dav1d_close(NonNull::new(&mut ctx)) };
        return Err(avif_failed("get_picture", rc.0));
    }

    let frame =
        YuvFrame::from_picture(&pic).map(|frame| (frame.width, frame.height, frame.to_rgb()));
    unsafe {
        dav1d::dav1d_picture_unref(NonNull::new(&mut pic));
        dav1d::dav1d_close(NonNull::new(&mut ctx));
    }
    let (width, height, rgb) = frame?;

    image::RgbImage::from_raw(width, height, rgb)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| BackendError::Decode("AVIF frame does not match its dimensions".into()))
}

/// Borrowed view of a decoded picture's planes. Only valid until the
/// picture is unreferenced.
struct YuvFrame {
    y: *const u8,
    u: *const u8,
    v: *const u8,
    y_stride: isize,
    uv_stride: isize,
    width: u32,
    height: u32,
    bpc: u32,
    /// Chroma subsampling (I420 = both, I422 = horizontal only)
    ss_x: bool,
    ss_y: bool,
    monochrome: bool,
}

impl YuvFrame {
    fn from_picture(pic: &rav1d::include::dav1d::picture::Dav1dPicture) -> Result<Self, BackendError> {
        use rav1d::include::dav1d::headers::{
            DAV1D_PIXEL_LAYOUT_I400, DAV1D_PIXEL_LAYOUT_I420, DAV1D_PIXEL_LAYOUT_I422,
            DAV1D_PIXEL_LAYOUT_I444,
        };

        let width = u32::try_from(pic.p.w)
            .map_err(|_| BackendError::Decode(format!("AVIF width {} is invalid", pic.p.w)))?;
        let height = u32::try_from(pic.p.h)
            .map_err(|_| BackendError::Decode(format!("AVIF height {} is invalid", pic.p.h)))?;
        let bpc = u32::try_from(pic.p.bpc)
            .ok()
            .filter(|bpc| (8..=16).contains(bpc))
            .ok_or_else(|| BackendError::Decode(format!("AVIF bit depth {} is invalid", pic.p.bpc)))?;
        let plane = |index: usize| {
            pic.data[index]
                .map(|ptr| ptr.as_ptr() as *const u8)
                .ok_or_else(|| BackendError::Decode(format!("AVIF plane {index} is missing")))
        };

        let y = plane(0)?;
        let layout = pic.p.layout;
        let (u, v, ss_x, ss_y, monochrome) = if layout == DAV1D_PIXEL_LAYOUT_I400 {
            (y, y, false, false, true)
        } else {
            let (ss_x, ss_y) = match layout {
                DAV1D_PIXEL_LAYOUT_I420 => (true, true),
                DAV1D_PIXEL_LAYOUT_I422 => (true, false),
                DAV1D_PIXEL_LAYOUT_I444 => (false, false),
                _ => {
                    return Err(BackendError::Decode(format!(
                        "Unsupported AVIF pixel layout: {layout}"
                    )));
                }
            };
            (plane(1)?, plane(2)?, ss_x, ss_y, false)
        };

        Ok(Self {
            y,
            u,
            v,
            y_stride: pic.stride[0],
            uv_stride: if monochrome { 0 } else { pic.stride[1] },
            width,
            height,
            bpc,
            ss_x,
            ss_y,
            monochrome,
        })
    }

    /// Interleaved RGB8 using BT.601 coefficients, scaled down from `bpc` bits.
    fn to_rgb(&self) -> Vec<u8> {
        let max_val = ((1u32 << self.bpc) - 1) as f32;
        let center = (1u32 << (self.bpc - 1)) as f32;
        let scale = 255.0 / max_val;

        let mut rgb = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for row in 0..self.height {
            for col in 0..self.width {
                let luma = sample(self.y, self.y_stride, col, row, self.bpc);
                let (r, g, b) = if self.monochrome {
                    (luma, luma, luma)
                } else {
                    let cx = if self.ss_x { col / 2 } else { col };
                    let cy = if self.ss_y { row / 2 } else { row };
                    let cb = sample(self.u, self.uv_stride, cx, cy, self.bpc) - center;
                    let cr = sample(self.v, self.uv_stride, cx, cy, self.bpc) - center;
                    (
                        luma + 1.402 * cr,
                        luma - 0.344136 * cb - 0.714136 * cr,
                        luma + 1.772 * cb,
                    )
                };
                for channel in [r, g, b] {
                    rgb.push((channel * scale).clamp(0.0, 255.0) as u8);
                }
            }
        }
        rgb
    }
}

/// One plane sample; depths above 8 bits are stored as `u16`.
#[inline]
fn sample(plane: *const u8, stride: isize, x: u32, y: u32, bpc: u32) -> f32 {
    let row = y as isize * stride;
    if bpc <= 8 {
        (unsafe { *plane.offset(row + x as isize) }) as f32
    } else {
        (unsafe { (plane.offset(row + x as isize * 2) as *const u16).read_unaligned() }) as f32
    }
}

impl RasterBackend for RustBackend {
    type Surface = DynamicImage;

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError> {
        if is_avif(bytes) {
            return decode_avif(bytes);
        }
        ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(BackendError::Io)?
            .decode()
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    fn dimensions(&self, surface: &DynamicImage) -> Dimensions {
        let (width, height) = surface.dimensions();
        Dimensions { width, height }
    }

    fn rotate(&self, surface: &DynamicImage, rotation: Rotation) -> Result<DynamicImage, BackendError> {
        Ok(match rotation {
            Rotation::None => surface.clone(),
            Rotation::Quarter => surface.rotate90(),
            Rotation::Half => surface.rotate180(),
            Rotation::ThreeQuarter => surface.rotate270(),
        })
    }

    fn resize(&self, surface: &DynamicImage, params: &ResizeParams) -> Result<DynamicImage, BackendError> {
        if params.width == 0 || params.height == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "Cannot resize to {}x{}",
                params.width, params.height
            )));
        }
        Ok(surface.resize_exact(params.width, params.height, filter_for(params.hint)))
    }

    fn export(&self, surface: &DynamicImage, params: &ExportParams) -> Result<Vec<u8>, BackendError> {
        match params.format {
            ExportFormat::Jpeg => encode_jpeg(surface, params),
            ExportFormat::Png => encode_png(surface),
            ExportFormat::Webp => encode_webp(surface, params),
            ExportFormat::Avif => encode_avif(surface, params),
        }
    }
}
