//! Error types for encoding and rendering.
//!
//! Every error here is recoverable by the caller: the encoder and renderer keep
//! no state between calls, so retrying with adjusted input is always safe.

use thiserror::Error;

/// Errors raised while turning a payload into a [`Symbol`](crate::qrcode::Symbol).
///
/// Ways to handle [`EncodingError::CapacityExceeded`] include:
///
/// - Decrease the error correction level if it was greater than `EcLevel::Low`.
/// - Drop the explicit version so the encoder can pick a larger one.
/// - Make the payload shorter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// The payload does not fit the requested (or the largest) version.
    #[error("Data length = {length} bytes, Max capacity = {capacity} bytes")]
    CapacityExceeded { length: usize, capacity: usize },

    /// Only raised by strict level parsing.
    #[error("Unrecognized error correction level: {0:?}")]
    InvalidLevel(String),

    #[error("Version number out of range: {0}")]
    InvalidVersion(u8),

    #[error("Mask value out of range: {0}")]
    InvalidMask(u8),
}

/// Errors raised while painting a symbol onto a raster.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("Invalid size: {0} (must be positive)")]
    InvalidSize(u32),

    /// Padding on both sides would leave no room for the symbol.
    #[error("Padding of {padding}px leaves no room in a {size}px image")]
    InvalidPadding { padding: u32, size: u32 },

    #[error("Surface is {actual:?} pixels but {expected:?} was requested")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Invalid color: {0}")]
    InvalidColor(String),
}

/// Umbrella error for the helper and options layers.
#[derive(Error, Debug)]
pub enum QrError {
    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the helper and options layers.
pub type QrResult<T> = Result<T, QrError>;
