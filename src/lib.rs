#![forbid(unsafe_code)]
//! # qrtile
//!
//! A Rust library for encoding QR codes and painting them onto raster surfaces.
//!
//! `qrtile` encodes bytes or text into QR Code Model 2 symbols (versions 1 to 40, all four
//! error correction levels, byte mode) and renders them at any pixel size. Module rectangles
//! share their rounded edges, so a symbol scaled to a size that is not a multiple of its
//! module count still covers the image exactly, without seams or overlaps.
//!
//! ## Features
//!
//! - Full Reed-Solomon error correction and penalty-based mask selection.
//! - Automatic or explicit version, automatic or fixed mask.
//! - Foreground/background colors with independent opacity and a padding border.
//! - Rendering into an `image::RgbaImage` or any [`render::DrawingSurface`].
//! - SVG, console and PNG helpers, plus a JSON-configurable option bag.
//!
//! ## Example
//!
//! Render a 180px QR code from free-form options:
//!
//! ```rust
//! use qrtile::options::QrOptions;
//!
//! let options = QrOptions::from_json(r#"{"value": "https://example.com", "size": 180}"#).unwrap();
//! let img = options.build().unwrap();
//! assert_eq!(img.dimensions(), (180, 180));
//! ```
//!
//! Encode and render step by step:
//!
//! ```rust
//! use qrtile::qrcode::{encode, EcLevel};
//! use qrtile::render::{render, Color, RenderOptions};
//!
//! let symbol = encode(b"HELLO", EcLevel::Quartile, None).unwrap();
//! let options = RenderOptions {
//!     size: Some(101),
//!     foreground: Color::rgb(255, 165, 0),
//!     padding: 4,
//!     ..RenderOptions::default()
//! };
//! let img = render(&symbol, &options).unwrap();
//! assert_eq!(img.dimensions(), (101, 101));
//! ```
//!
//! ## Modules
//!
//! - [`qrcode`]: Symbol encoding.
//! - [`render`]: Raster rendering onto drawing surfaces.
//! - [`options`]: JSON-friendly option bag.
//! - [`helper`]: SVG, console and PNG output, painting onto existing images.
//! - [`error`]: Error types.

pub mod error;
pub mod helper;
pub mod options;
pub mod qrcode;
pub mod render;

pub use error::{EncodingError, QrError, RenderError};
pub use qrcode::{encode, encode_text, EcLevel, Symbol, Version};
pub use render::{render, Color, RenderOptions};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::TileLayout;

    #[test]
    fn test_hello_end_to_end() {
        let symbol = encode(b"HELLO", EcLevel::Low, None).unwrap();
        assert_eq!(symbol.module_count(), 21);
        assert!(symbol.mask().value() <= 7);

        let options = RenderOptions {
            size: Some(100),
            ..RenderOptions::default()
        };
        let img = render(&symbol, &options).unwrap();
        let layout = TileLayout::new(100, symbol.module_count(), 0);
        assert_eq!(layout.module_rect(0, 0), render::Rect::new(0, 0, 5, 5));
        assert_eq!(layout.module_rect(20, 20).right(), 100);

        // Each module rectangle is painted in a single color
        for row in 0..21 {
            for col in 0..21 {
                let rect = layout.module_rect(row, col);
                let expected = if symbol.is_dark(row, col) { 0 } else { 255 };
                for y in rect.y..rect.bottom() {
                    for x in rect.x..rect.right() {
                        assert_eq!(img.get_pixel(x, y)[0], expected);
                    }
                }
            }
        }
    }

    #[test]
    fn test_symbols_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Symbol>();
        assert_send_sync::<RenderOptions>();
    }
}
