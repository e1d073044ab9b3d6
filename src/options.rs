//! Free-form option bag for building a QR image in one call.
//!
//! Mirrors the option object accepted by canvas QR widgets: every field is
//! optional in JSON and unknown error correction levels fall back to `L`.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::error::{EncodingError, QrResult};
use crate::qrcode::{encode_with, EcLevel, EncodeOptions, Symbol};
use crate::render::{render, Color, RenderOptions};

/// Everything needed to go from a value to pixels.
///
/// # Example
///
/// ```rust
/// use qrtile::options::QrOptions;
///
/// let options = QrOptions::from_json(r#"{"value": "HELLO", "size": 180, "level": "M"}"#).unwrap();
/// let img = options.build().unwrap();
/// assert_eq!(img.dimensions(), (180, 180));
/// ```
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QrOptions {
    pub value: String,
    /// `L`, `M`, `Q` or `H`; anything else means `L`.
    pub level: String,
    pub size: u32,
    pub foreground: Color,
    pub foreground_alpha: f32,
    pub background: Color,
    pub background_alpha: f32,
    pub padding: u32,
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            value: String::new(),
            level: "L".to_string(),
            size: 100,
            foreground: Color::BLACK,
            foreground_alpha: 1.0,
            background: Color::WHITE,
            background_alpha: 1.0,
            padding: 0,
        }
    }
}

impl QrOptions {
    /// Default options for `value`.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> QrResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn level(&self) -> EcLevel {
        EcLevel::parse_lenient(&self.level)
    }

    pub fn encode_options(&self) -> EncodeOptions {
        EncodeOptions {
            level: self.level(),
            ..EncodeOptions::default()
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            size: Some(self.size),
            foreground: self.foreground,
            foreground_alpha: self.foreground_alpha,
            background: self.background,
            background_alpha: self.background_alpha,
            padding: self.padding,
        }
    }

    pub fn encode(&self) -> Result<Symbol, EncodingError> {
        encode_with(self.value.as_bytes(), &self.encode_options())
    }

    /// Encodes and renders in one go.
    pub fn build(&self) -> QrResult<RgbaImage> {
        let symbol = self.encode()?;
        Ok(render(&symbol, &self.render_options())?)
    }
}
