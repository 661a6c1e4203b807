//! Settings model: what to do to an image, captured as an immutable value.
//!
//! A [`Settings`] value is built once per pipeline call and never mutated by
//! the pipeline. Callers that expose interactive controls (the CLI, a config
//! file) construct a fresh snapshot for every invocation.
//!
//! ## Per-format option blocks
//!
//! [`EncoderSpec`] keeps an option block for **every** output format, not just
//! the active one. Switching `format` from `webp` to `jpeg` and back restores
//! the previous WebP tuning. Only at the encode boundary is the spec collapsed
//! into a single-format [`EncodePlan`](crate::imaging::EncodePlan).
//!
//! ## Quality
//!
//! Quality is always stored as an integer percentage (0–100) and converted to
//! a `0.0..=1.0` fraction only when encoding.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Clockwise rotation in quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    #[default]
    None,
    Quarter,
    Half,
    ThreeQuarter,
}

impl Rotation {
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::None => 0,
            Rotation::Quarter => 90,
            Rotation::Half => 180,
            Rotation::ThreeQuarter => 270,
        }
    }

    /// 90° and 270° turns exchange width and height.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Quarter | Rotation::ThreeQuarter)
    }
}

impl TryFrom<u16> for Rotation {
    type Error = String;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Rotation::None),
            90 => Ok(Rotation::Quarter),
            180 => Ok(Rotation::Half),
            270 => Ok(Rotation::ThreeQuarter),
            other => Err(format!("rotation must be 0, 90, 180 or 270 (got {other})")),
        }
    }
}

impl From<Rotation> for u16 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

/// Encoding quality as an integer percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quality(u32);

impl Quality {
    pub fn new(percent: u32) -> Self {
        Self(percent.min(100))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Quality as the `0.0..=1.0` fraction handed to encoders.
    pub fn fraction(self) -> f32 {
        self.0.min(100) as f32 / 100.0
    }

    /// False only for values read from config without going through [`Quality::new`].
    pub fn is_valid(self) -> bool {
        self.0 <= 100
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(75)
    }
}

/// Interpolation quality hint passed to the raster backend when resizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMethod {
    #[default]
    High,
    Medium,
    Low,
    /// Nearest-neighbour; disables smoothing entirely.
    Pixelated,
}

/// Optional resize step.
///
/// - Only applied when `enabled` and at least one of `width`/`height` is set.
/// - With `maintain_aspect` and exactly one side set, the other side is
///   derived from the (post-rotation) source aspect ratio.
/// - With both sides set the explicit values win.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeSpec {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub method: ResizeMethod,
    pub maintain_aspect: bool,
}

impl Default for ResizeSpec {
    fn default() -> Self {
        Self {
            enabled: false,
            width: None,
            height: None,
            method: ResizeMethod::High,
            maintain_aspect: true,
        }
    }
}

impl ResizeSpec {
    /// Zero is treated the same as unset.
    pub fn width(&self) -> Option<u32> {
        self.width.filter(|&w| w > 0)
    }

    pub fn height(&self) -> Option<u32> {
        self.height.filter(|&h| h > 0)
    }

    /// Whether the transform pipeline runs a resize step for these settings.
    pub fn applies(&self) -> bool {
        self.enabled && (self.width().is_some() || self.height().is_some())
    }
}

/// Target encoding format.
///
/// Names that do not match a known format are kept as
/// [`OutputFormat::Unrecognized`] so the encoder can apply its documented
/// fallback instead of failing at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
    Webp,
    Avif,
    Unrecognized(String),
}

impl OutputFormat {
    /// Exact, case-sensitive match on the canonical names. Aliases such as
    /// `jpg` are a concern of the command line, not of stored settings.
    pub fn parse(name: &str) -> Self {
        match name {
            "jpeg" => OutputFormat::Jpeg,
            "png" => OutputFormat::Png,
            "webp" => OutputFormat::Webp,
            "avif" => OutputFormat::Avif,
            _ => OutputFormat::Unrecognized(name.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
            OutputFormat::Avif => "avif",
            OutputFormat::Unrecognized(name) => name,
        }
    }
}

impl From<String> for OutputFormat {
    fn from(name: String) -> Self {
        OutputFormat::parse(&name)
    }
}

impl From<OutputFormat> for String {
    fn from(format: OutputFormat) -> Self {
        format.name().to_string()
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JpegOptions {
    pub quality: Quality,
    /// Best-effort hint; encoders that cannot do progressive scans ignore it.
    pub progressive: bool,
    /// Best-effort hint for Huffman table optimisation.
    pub optimize: bool,
}

impl Default for JpegOptions {
    fn default() -> Self {
        Self {
            quality: Quality::new(75),
            progressive: true,
            optimize: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PngOptions {
    pub quality: Quality,
}

impl Default for PngOptions {
    fn default() -> Self {
        Self {
            quality: Quality::new(100),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebpOptions {
    pub quality: Quality,
    /// Overrides `quality` with the maximum fraction.
    pub lossless: bool,
}

impl Default for WebpOptions {
    fn default() -> Self {
        Self {
            quality: Quality::new(75),
            lossless: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AvifOptions {
    pub quality: Quality,
}

impl Default for AvifOptions {
    fn default() -> Self {
        Self {
            quality: Quality::new(50),
        }
    }
}

/// Active format plus retained option blocks for every format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncoderSpec {
    pub format: OutputFormat,
    pub jpeg: JpegOptions,
    pub png: PngOptions,
    pub webp: WebpOptions,
    pub avif: AvifOptions,
}

impl EncoderSpec {
    /// Every format block with the same quality, as batch mode configures it.
    pub fn uniform(format: OutputFormat, quality: Quality) -> Self {
        Self {
            format,
            jpeg: JpegOptions {
                quality,
                ..JpegOptions::default()
            },
            png: PngOptions { quality },
            webp: WebpOptions {
                quality,
                lossless: false,
            },
            avif: AvifOptions { quality },
        }
    }
}

/// Everything one pipeline run needs to know.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub rotate: Rotation,
    pub resize: ResizeSpec,
    pub encoder: EncoderSpec,
}

impl Settings {
    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotate = rotation;
        self
    }

    pub fn with_resize(mut self, resize: ResizeSpec) -> Self {
        self.resize = resize;
        self
    }

    /// Switch the active format; the option blocks of all formats are kept.
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.encoder.format = format;
        self
    }
}

/// The reduced knob set exposed by batch mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchSettings {
    pub format: OutputFormat,
    pub quality: Quality,
    /// Maximum output width; enables resizing when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_width: Option<u32>,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jpeg,
            quality: Quality::new(75),
            max_width: None,
        }
    }
}

impl BatchSettings {
    /// Expand into the full per-file [`Settings`] snapshot.
    pub fn to_settings(&self) -> Settings {
        Settings {
            rotate: Rotation::None,
            resize: ResizeSpec {
                enabled: self.max_width.is_some(),
                width: self.max_width,
                height: None,
                method: ResizeMethod::High,
                maintain_aspect: true,
            },
            encoder: EncoderSpec::uniform(self.format.clone(), self.quality),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_accepts_quarter_turns_only() {
        assert_eq!(Rotation::try_from(0), Ok(Rotation::None));
        assert_eq!(Rotation::try_from(90), Ok(Rotation::Quarter));
        assert_eq!(Rotation::try_from(180), Ok(Rotation::Half));
        assert_eq!(Rotation::try_from(270), Ok(Rotation::ThreeQuarter));
        assert!(Rotation::try_from(45).is_err());
        assert!(Rotation::try_from(360).is_err());
    }

    #[test]
    fn rotation_swaps_axes_on_odd_quarters() {
        assert!(!Rotation::None.swaps_axes());
        assert!(Rotation::Quarter.swaps_axes());
        assert!(!Rotation::Half.swaps_axes());
        assert!(Rotation::ThreeQuarter.swaps_axes());
    }

    #[test]
    fn quality_clamps_and_converts_to_fraction() {
        assert_eq!(Quality::new(150).value(), 100);
        assert_eq!(Quality::new(0).fraction(), 0.0);
        assert_eq!(Quality::new(75).fraction(), 0.75);
        assert_eq!(Quality::new(100).fraction(), 1.0);
    }

    #[test]
    fn output_format_parse_keeps_unknown_names() {
        assert_eq!(OutputFormat::parse("jpeg"), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::parse("webp"), OutputFormat::Webp);
        assert_eq!(
            OutputFormat::parse("gif"),
            OutputFormat::Unrecognized("gif".into())
        );
        assert_eq!(OutputFormat::parse("gif").name(), "gif");
    }

    #[test]
    fn output_format_parse_is_exact() {
        for name in ["jpg", "JPEG", " png", "WebP"] {
            assert_eq!(
                OutputFormat::parse(name),
                OutputFormat::Unrecognized(name.to_string()),
                "{name:?}"
            );
        }
    }

    #[test]
    fn config_jpg_uses_fallback_not_jpeg_block() {
        let spec: EncoderSpec = toml::from_str(r#"format = "jpg""#).unwrap();
        assert_eq!(spec.format, OutputFormat::Unrecognized("jpg".into()));
    }

    #[test]
    fn defaults_match_single_image_controls() {
        let s = Settings::default();
        assert_eq!(s.rotate, Rotation::None);
        assert!(!s.resize.enabled);
        assert!(s.resize.maintain_aspect);
        assert_eq!(s.resize.method, ResizeMethod::High);
        assert_eq!(s.encoder.format, OutputFormat::Jpeg);
        assert_eq!(s.encoder.jpeg.quality.value(), 75);
        assert!(s.encoder.jpeg.progressive);
        assert_eq!(s.encoder.png.quality.value(), 100);
        assert_eq!(s.encoder.webp.quality.value(), 75);
        assert_eq!(s.encoder.avif.quality.value(), 50);
    }

    #[test]
    fn switching_format_retains_other_blocks() {
        let mut s = Settings::default();
        s.encoder.webp = WebpOptions {
            quality: Quality::new(40),
            lossless: true,
        };
        let s = s.with_format(OutputFormat::Avif).with_format(OutputFormat::Webp);
        assert_eq!(s.encoder.webp.quality.value(), 40);
        assert!(s.encoder.webp.lossless);
    }

    #[test]
    fn resize_applies_only_with_a_dimension() {
        let mut spec = ResizeSpec {
            enabled: true,
            ..ResizeSpec::default()
        };
        assert!(!spec.applies());
        spec.width = Some(0);
        assert!(!spec.applies());
        spec.width = Some(800);
        assert!(spec.applies());
        spec.enabled = false;
        assert!(!spec.applies());
    }

    #[test]
    fn batch_settings_expand_like_batch_mode() {
        let batch = BatchSettings {
            format: OutputFormat::Webp,
            quality: Quality::new(60),
            max_width: Some(1024),
        };
        let s = batch.to_settings();
        assert_eq!(s.rotate, Rotation::None);
        assert!(s.resize.enabled);
        assert_eq!(s.resize.width, Some(1024));
        assert_eq!(s.resize.height, None);
        assert!(s.resize.maintain_aspect);
        assert_eq!(s.encoder.format, OutputFormat::Webp);
        assert_eq!(s.encoder.webp.quality.value(), 60);
        assert_eq!(s.encoder.jpeg.quality.value(), 60);
        assert!(!s.encoder.webp.lossless);
    }

    #[test]
    fn batch_settings_without_width_leave_resize_off() {
        let s = BatchSettings::default().to_settings();
        assert!(!s.resize.enabled);
    }

    #[test]
    fn settings_roundtrip_through_toml() {
        let toml = r#"
rotate = 90

[resize]
enabled = true
width = 640
method = "pixelated"

[encoder]
format = "webp"

[encoder.webp]
lossless = true
"#;
        let s: Settings = toml::from_str(toml).unwrap();
        assert_eq!(s.rotate, Rotation::Quarter);
        assert_eq!(s.resize.width, Some(640));
        assert_eq!(s.resize.method, ResizeMethod::Pixelated);
        assert_eq!(s.encoder.format, OutputFormat::Webp);
        assert!(s.encoder.webp.lossless);
        assert_eq!(s.encoder.webp.quality.value(), 75);
    }

    #[test]
    fn invalid_rotation_rejected_by_deserializer() {
        let result: Result<Settings, _> = toml::from_str("rotate = 45");
        assert!(result.is_err());
    }
}
