use serde::{Deserialize, Serialize};

use super::preset::Preset;
use crate::domain::errors::{TransformSpecError, ValidationError};

/// Largest width or height a transform may request (16K)
pub const MAX_DIMENSION: u32 = 16384;

/// JPEG quality used when the caller did not ask for one
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// How the source aspect ratio is reconciled with the target box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    #[default]
    Contain,
    Cover,
    Fill,
}

impl FitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FitMode::Contain => "contain",
            FitMode::Cover => "cover",
            FitMode::Fill => "fill",
        }
    }
}

impl std::str::FromStr for FitMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "contain" => Ok(FitMode::Contain),
            "cover" => Ok(FitMode::Cover),
            "fill" => Ok(FitMode::Fill),
            _ => Err(ValidationError::InvalidFitMode(s.to_string())),
        }
    }
}

/// Which part of the raster survives a crop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropAnchor {
    Center,
    Top,
    Bottom,
    Left,
    Right,
}

impl CropAnchor {
    pub fn as_str(&self) -> &'static str {
        match self {
            CropAnchor::Center => "center",
            CropAnchor::Top => "top",
            CropAnchor::Bottom => "bottom",
            CropAnchor::Left => "left",
            CropAnchor::Right => "right",
        }
    }

    /// Top-left corner of a `width`x`height` window inside a
    /// `outer_width`x`outer_height` raster
    pub fn offset(&self, outer_width: u32, outer_height: u32, width: u32, height: u32) -> (u32, u32) {
        let spare_x = outer_width.saturating_sub(width);
        let spare_y = outer_height.saturating_sub(height);
        match self {
            CropAnchor::Center => (spare_x / 2, spare_y / 2),
            CropAnchor::Top => (spare_x / 2, 0),
            CropAnchor::Bottom => (spare_x / 2, spare_y),
            CropAnchor::Left => (0, spare_y / 2),
            CropAnchor::Right => (spare_x, spare_y / 2),
        }
    }
}

impl std::str::FromStr for CropAnchor {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "center" => Ok(CropAnchor::Center),
            "top" => Ok(CropAnchor::Top),
            "bottom" => Ok(CropAnchor::Bottom),
            "left" => Ok(CropAnchor::Left),
            "right" => Ok(CropAnchor::Right),
            _ => Err(ValidationError::InvalidCropAnchor(s.to_string())),
        }
    }
}

/// Encodings the engine can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    Webp,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Webp => "image/webp",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::Webp),
            _ => Err(ValidationError::InvalidFormat(s.to_string())),
        }
    }
}

/// Unvalidated transformation parameters as a caller supplies them
/// (typically straight from a query string).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, bon::Builder)]
pub struct TransformParams {
    pub width: Option<i64>,
    pub height: Option<i64>,
    #[builder(into)]
    pub fit: Option<String>,
    #[builder(into)]
    pub crop: Option<String>,
    pub quality: Option<i64>,
    #[builder(into)]
    pub format: Option<String>,
    #[builder(into)]
    pub preset: Option<String>,
    #[serde(default)]
    #[builder(default)]
    pub fresh: bool,
}

impl TransformParams {
    /// Validate every field and expand the preset.
    ///
    /// All violations are collected before returning. Explicit fields take
    /// precedence over the preset: the preset only fills what was left unset.
    pub fn validate(&self) -> Result<TransformSpec, TransformSpecError> {
        let mut violations = Vec::new();

        let width = check_dimension("width", self.width, &mut violations);
        let height = check_dimension("height", self.height, &mut violations);

        let quality = match self.quality {
            Some(q) if !(0..=100).contains(&q) => {
                violations.push(ValidationError::QualityOutOfRange(q));
                None
            }
            Some(0) | None => None,
            Some(q) => Some(q as u8),
        };

        let fit = parse_choice::<FitMode>(self.fit.as_deref(), &mut violations);
        let crop = parse_choice::<CropAnchor>(self.crop.as_deref(), &mut violations);
        let format = parse_choice::<OutputFormat>(self.format.as_deref(), &mut violations);

        let preset = match non_blank(self.preset.as_deref()) {
            Some(name) => match Preset::from_name(name) {
                Some(preset) => Some(preset),
                None => {
                    violations.push(ValidationError::UnknownPreset(name.to_string()));
                    None
                }
            },
            None => None,
        };

        if !violations.is_empty() {
            return Err(TransformSpecError::new(violations));
        }

        let spec = TransformSpec {
            width,
            height,
            fit,
            crop,
            quality,
            format,
            preset: None,
            fresh: self.fresh,
        };

        Ok(match preset {
            Some(preset) => spec.with_preset(preset),
            None => spec,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn check_dimension(
    field: &'static str,
    value: Option<i64>,
    violations: &mut Vec<ValidationError>,
) -> Option<u32> {
    match value {
        Some(v) if v < 0 => {
            violations.push(ValidationError::NegativeDimension { field, value: v });
            None
        }
        Some(v) if v > MAX_DIMENSION as i64 => {
            violations.push(ValidationError::DimensionTooLarge {
                field,
                value: v,
                max: MAX_DIMENSION,
            });
            None
        }
        Some(0) | None => None,
        Some(v) => Some(v as u32),
    }
}

fn parse_choice<T>(value: Option<&str>, violations: &mut Vec<ValidationError>) -> Option<T>
where
    T: std::str::FromStr<Err = ValidationError>,
{
    let value = non_blank(value)?;
    match value.parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            violations.push(err);
            None
        }
    }
}

/// Validated, preset-expanded transformation request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TransformSpec {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fit: Option<FitMode>,
    pub crop: Option<CropAnchor>,
    pub quality: Option<u8>,
    pub format: Option<OutputFormat>,
    /// Preset this spec was expanded from, informational only
    pub preset: Option<Preset>,
    /// Bypass the cache lookup
    pub fresh: bool,
}

impl TransformSpec {
    /// Fill the fields left unset with the preset's values
    pub fn with_preset(mut self, preset: Preset) -> Self {
        let values = preset.values();
        self.width = self.width.or(Some(values.width));
        self.height = self.height.or(Some(values.height));
        self.fit = self.fit.or(Some(values.fit));
        self.quality = self.quality.or(Some(values.quality));
        self.preset = Some(preset);
        self
    }

    /// No resize, crop or re-encode requested
    pub fn is_passthrough(&self) -> bool {
        self.width.is_none() && self.height.is_none() && self.crop.is_none() && self.format.is_none()
    }

    pub fn fit_mode(&self) -> FitMode {
        self.fit.unwrap_or_default()
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.quality.unwrap_or(DEFAULT_JPEG_QUALITY)
    }
}
