//! Raster rendering of symbols.
//!
//! The symbol is scaled to an arbitrary pixel size. Module edges are rounded
//! up to whole pixels and shared between neighbours, so the module rectangles
//! tile the image exactly even when the size is not a multiple of the module
//! count.

use core::fmt;
use core::str::FromStr;

use image::{Rgba, RgbaImage};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::RenderError;
use crate::qrcode::Symbol;

/// An opaque RGB color. Opacity is carried separately in [`RenderOptions`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    fn channels(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl FromStr for Color {
    type Err = RenderError;

    /// Accepts `#rgb`, `#rrggbb` and a handful of CSS color names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RenderError::InvalidColor(s.to_string());
        let text = s.trim().to_ascii_lowercase();
        if let Some(hex) = text.strip_prefix('#') {
            if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
            return match hex.len() {
                3 => {
                    let mut rgb = [0u8; 3];
                    for (i, c) in hex.chars().enumerate() {
                        rgb[i] = channel(&c.to_string())? * 0x11;
                    }
                    Ok(Color::rgb(rgb[0], rgb[1], rgb[2]))
                }
                6 => Ok(Color::rgb(channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
                _ => Err(invalid()),
            };
        }
        match text.as_str() {
            "black" => Ok(Color::BLACK),
            "white" => Ok(Color::WHITE),
            "gray" | "grey" => Ok(Color::rgb(128, 128, 128)),
            "red" => Ok(Color::rgb(255, 0, 0)),
            "green" => Ok(Color::rgb(0, 128, 0)),
            "blue" => Ok(Color::rgb(0, 0, 255)),
            "orange" => Ok(Color::rgb(255, 165, 0)),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = RenderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Parameters for [`render`] and [`render_onto`].
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderOptions {
    /// Side length in pixels. `None` draws one pixel per module, plus padding.
    pub size: Option<u32>,
    pub foreground: Color,
    /// Opacity of dark modules in [0, 1].
    pub foreground_alpha: f32,
    pub background: Color,
    /// Opacity of light modules and padding in [0, 1].
    pub background_alpha: f32,
    /// Background border in pixels around the symbol, inside `size`.
    pub padding: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            size: None,
            foreground: Color::BLACK,
            foreground_alpha: 1.0,
            background: Color::WHITE,
            background_alpha: 1.0,
            padding: 0,
        }
    }
}

impl RenderOptions {
    /// Output side length for a symbol with `module_count` modules per side.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidSize`] for a zero size, [`RenderError::InvalidPadding`]
    /// when the padding leaves no room for the symbol.
    pub fn pixel_size(&self, module_count: usize) -> Result<u32, RenderError> {
        let size = match self.size {
            Some(size) => size,
            None => (module_count as u32).saturating_add(self.padding.saturating_mul(2)),
        };
        if size == 0 {
            return Err(RenderError::InvalidSize(size));
        }
        if u64::from(self.padding) * 2 >= u64::from(size) {
            return Err(RenderError::InvalidPadding {
                padding: self.padding,
                size,
            });
        }
        Ok(size)
    }
}

/// A pixel rectangle.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub const fn right(&self) -> u32 {
        self.x + self.width
    }

    pub const fn bottom(&self) -> u32 {
        self.y + self.height
    }
}

/// Anything that can fill rectangles with a translucent color.
pub trait DrawingSurface {
    /// Width and height in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// Composites `color` at `opacity` over the rectangle, clipped to the surface.
    fn fill_rect(&mut self, rect: Rect, color: Color, opacity: f32);
}

impl DrawingSurface for RgbaImage {
    fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    fn fill_rect(&mut self, rect: Rect, color: Color, opacity: f32) {
        let right = rect.right().min(self.width());
        let bottom = rect.bottom().min(self.height());
        for y in rect.y..bottom {
            for x in rect.x..right {
                blend(self.get_pixel_mut(x, y), color, opacity);
            }
        }
    }
}

/// Source-over compositing of an opaque color at `opacity`.
fn blend(dst: &mut Rgba<u8>, color: Color, opacity: f32) {
    if opacity <= 0.0 {
        return;
    }
    let da = f32::from(dst[3]) / 255.0;
    let outa = opacity + da * (1.0 - opacity);
    for (i, sc) in color.channels().into_iter().enumerate() {
        let c = (f32::from(sc) * opacity + f32::from(dst[i]) * da * (1.0 - opacity)) / outa;
        dst[i] = c.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (outa * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Pixel geometry of the module grid inside the padded image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileLayout {
    origin: u32,
    /// `count + 1` ascending edges, first 0 and last equal to the extent.
    edges: Vec<u32>,
}

impl TileLayout {
    /// Splits `extent` pixels into `count` tiles starting at `origin`. Edge `i`
    /// is `ceil(i * extent / count)`, so tile widths differ by at most one pixel
    /// and always add up to `extent`.
    pub fn new(extent: u32, count: usize, origin: u32) -> Self {
        assert!(count > 0, "Tile count must be positive");
        let n = count as u64;
        let edges = (0..=n)
            .map(|i| ((i * u64::from(extent) + n - 1) / n) as u32)
            .collect();
        Self { origin, edges }
    }

    pub fn count(&self) -> usize {
        self.edges.len() - 1
    }

    /// Offset and length of tile `index` along one axis.
    pub fn span(&self, index: usize) -> (u32, u32) {
        let start = self.edges[index];
        (self.origin + start, self.edges[index + 1] - start)
    }

    /// Pixel rectangle covered by the module at (row, col).
    pub fn module_rect(&self, row: usize, col: usize) -> Rect {
        let (x, width) = self.span(col);
        let (y, height) = self.span(row);
        Rect::new(x, y, width, height)
    }
}

fn clamp_opacity(alpha: f32, which: &str) -> f32 {
    if alpha.is_nan() {
        warn!("{} opacity is NaN, using 1", which);
        return 1.0;
    }
    let clamped = alpha.clamp(0.0, 1.0);
    if clamped != alpha {
        warn!("{} opacity {} clamped to {}", which, alpha, clamped);
    }
    clamped
}

/// Renders `symbol` into a fresh, fully transparent RGBA image of the
/// configured size.
///
/// # Example
///
/// ```rust
/// use qrtile::qrcode::{encode, EcLevel};
/// use qrtile::render::{render, RenderOptions};
///
/// let symbol = encode(b"HELLO", EcLevel::Low, None).unwrap();
/// let options = RenderOptions { size: Some(100), ..RenderOptions::default() };
/// let img = render(&symbol, &options).unwrap();
/// assert_eq!(img.dimensions(), (100, 100));
/// ```
pub fn render(symbol: &Symbol, options: &RenderOptions) -> Result<RgbaImage, RenderError> {
    let size = options.pixel_size(symbol.module_count())?;
    let mut img = RgbaImage::new(size, size);
    render_onto(symbol, options, &mut img)?;
    Ok(img)
}

/// Paints `symbol` onto a caller-supplied surface whose dimensions must match
/// the configured size.
pub fn render_onto<S>(symbol: &Symbol, options: &RenderOptions, surface: &mut S) -> Result<(), RenderError>
where
    S: DrawingSurface + ?Sized,
{
    let count = symbol.module_count();
    let size = options.pixel_size(count)?;
    let actual = surface.dimensions();
    if actual != (size, size) {
        return Err(RenderError::DimensionMismatch {
            expected: (size, size),
            actual,
        });
    }
    let fgalpha = clamp_opacity(options.foreground_alpha, "foreground");
    let bgalpha = clamp_opacity(options.background_alpha, "background");

    let padding = options.padding;
    let inner = size - 2 * padding;
    if padding > 0 {
        let border = [
            Rect::new(0, 0, size, padding),
            Rect::new(0, size - padding, size, padding),
            Rect::new(0, padding, padding, inner),
            Rect::new(size - padding, padding, padding, inner),
        ];
        for rect in border {
            surface.fill_rect(rect, options.background, bgalpha);
        }
    }

    let layout = TileLayout::new(inner, count, padding);
    debug!(
        "rendering {}x{} modules into {}px (padding {}px)",
        count, count, size, padding
    );
    for row in 0..count {
        for col in 0..count {
            let rect = layout.module_rect(row, col);
            if symbol.is_dark(row, col) {
                surface.fill_rect(rect, options.foreground, fgalpha);
            } else {
                surface.fill_rect(rect, options.background, bgalpha);
            }
        }
    }
    Ok(())
}

/// Composites `source` onto `target` with its top-left corner at (x, y).
/// Parts falling outside `target` are clipped.
pub fn draw_image_at(target: &mut RgbaImage, source: &RgbaImage, x: i64, y: i64) {
    image::imageops::overlay(target, source, x, y);
}
