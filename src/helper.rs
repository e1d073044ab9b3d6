use crate::error::{QrError, QrResult};
use crate::options::QrOptions;
use crate::qrcode::Symbol;
use crate::render::{draw_image_at, render, Color, RenderOptions};

use image::RgbaImage;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/*---- Utilities ----*/

// Returns a string of SVG code for an image depicting
// the given symbol, with the given number of border modules.
// The string always uses Unix newlines (\n), regardless of the platform.
pub fn to_svg_string(symbol: &Symbol, border: u32, foreground: Color, background: Color) -> String {
    let border = border as usize;
    let dimension = symbol.module_count() + border * 2;
    let mut result = String::new();
    result += "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
    result += "<!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\" \"http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd\">\n";
    result += &format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\" viewBox=\"0 0 {0} {0}\" stroke=\"none\">\n",
        dimension
    );
    result += &format!("\t<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>\n", background);
    result += "\t<path d=\"";
    let mut first = true;
    for (row, modules) in symbol.rows().enumerate() {
        for (col, &isdark) in modules.iter().enumerate() {
            if isdark {
                if !first {
                    result += " ";
                }
                first = false;
                result += &format!("M{},{}h1v1h-1z", col + border, row + border);
            }
        }
    }
    result += &format!("\" fill=\"{}\"/>\n", foreground);
    result += "</svg>\n";
    result
}

/// Renders the symbol as text, two characters per module, surrounded by
/// `border` light modules.
pub fn to_console_string(symbol: &Symbol, border: u32) -> String {
    let border = border as i64;
    let size = symbol.module_count() as i64;
    let mut result = String::new();
    for row in -border..size + border {
        for col in -border..size + border {
            let isdark = row >= 0 && col >= 0 && symbol.is_dark(row as usize, col as usize);
            let c: char = if isdark { '█' } else { ' ' };
            result.push(c);
            result.push(c);
        }
        result.push('\n');
    }
    result
}

/// Prints the given symbol to the console.
pub fn print_qr(symbol: &Symbol) {
    println!("{}", to_console_string(symbol, 4));
}

/// Renders a symbol and saves it as a PNG file.
///
/// # Arguments
///
/// * `symbol` - The symbol to render.
/// * `options` - Render options; the output size comes from here.
/// * `directory_path` - Optional. The directory where the image will be saved. Defaults to "generated".
/// * `filename` - Optional. File name without extension. Defaults to a timestamp.
///
/// # Returns
///
/// The path of the written file.
///
/// # Example
///
/// ```rust,no_run
/// use qrtile::helper::save_png;
/// use qrtile::qrcode::{encode, EcLevel};
/// use qrtile::render::RenderOptions;
///
/// let symbol = encode(b"Hello, World!", EcLevel::Low, None).unwrap();
/// let options = RenderOptions { size: Some(200), ..RenderOptions::default() };
/// save_png(&symbol, &options, Some("images"), Some("qr_code")).unwrap();
/// ```
pub fn save_png(
    symbol: &Symbol,
    options: &RenderOptions,
    directory_path: Option<&str>,
    filename: Option<&str>,
) -> QrResult<PathBuf> {
    let img = render(symbol, options)?;

    let directory_path = Path::new(directory_path.unwrap_or("generated"));
    let filename = match filename {
        Some(name) => name.to_string(),
        None => SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis())
            .to_string(),
    };
    let file_path = directory_path.join(format!("{}.png", filename));

    // Check if the directory exists, create it if it doesn't
    if !directory_path.exists() {
        fs::create_dir_all(directory_path)?;
    }

    img.save(&file_path)?;
    debug!("saved QR image to {}", file_path.display());
    Ok(file_path)
}

/// Default side length used by [`paint_qr`].
pub const PAINT_SIZE: u32 = 200;

/// Replaces `target` with a QR image of `text`, `size` pixels square
/// (default [`PAINT_SIZE`]). On failure `target` is left untouched.
///
/// # Example
///
/// ```rust
/// use image::RgbaImage;
/// use qrtile::helper::paint_qr;
///
/// let mut canvas = RgbaImage::new(1, 1);
/// paint_qr(&mut canvas, "book:978-0131103627", None).unwrap();
/// assert_eq!(canvas.dimensions(), (200, 200));
/// ```
pub fn paint_qr(target: &mut RgbaImage, text: &str, size: Option<u32>) -> QrResult<()> {
    let options = QrOptions {
        size: size.unwrap_or(PAINT_SIZE),
        ..QrOptions::new(text)
    };
    let source = options.build().map_err(|err| {
        warn!("could not paint QR code: {}", err);
        err
    })?;
    *target = RgbaImage::new(source.width(), source.height());
    draw_image_at(target, &source, 0, 0);
    Ok(())
}

/// Payload of a membership QR code, as shown to a member.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipTicket {
    pub address: String,
    pub token_id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl MembershipTicket {
    pub fn new(address: impl Into<String>, token_id: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            token_id: token_id.into(),
            kind: "membership".to_string(),
        }
    }

    pub fn to_json(&self) -> QrResult<String> {
        serde_json::to_string(self).map_err(QrError::from)
    }
}

/// Side length of membership QR codes.
pub const MEMBERSHIP_QR_SIZE: u32 = 180;

/// Renders the membership ticket for `address` / `token_id` as a QR image.
pub fn membership_qr(address: &str, token_id: &str) -> QrResult<RgbaImage> {
    let ticket = MembershipTicket::new(address, token_id);
    let options = QrOptions {
        size: MEMBERSHIP_QR_SIZE,
        ..QrOptions::new(ticket.to_json()?)
    };
    options.build()
}
