//! QR code symbol encoding.
//!
//! Turns a byte payload and an error correction level into an immutable
//! [`Symbol`] following the QR Code Model 2 layout: finder, separator, timing
//! and alignment patterns, format and version information, Reed-Solomon
//! protected codewords and a penalty-selected mask. Versions 1 to 40 and all
//! four error correction levels are supported. Payloads are encoded in byte mode.

mod ecc;
mod layout;
mod mask;

use core::str::FromStr;

use log::{debug, warn};

use crate::error::EncodingError;
use layout::{format_bits, Grid, Module};

/// A QR Code symbol, representing a square grid of dark and light modules.
///
/// Instances are created by [`encode`], [`encode_text`] or [`encode_with`] and
/// are immutable afterwards.
///
/// # Example
///
/// ```rust
/// use qrtile::qrcode::{encode, EcLevel};
///
/// let symbol = encode(b"HELLO", EcLevel::Low, None).unwrap();
/// assert_eq!(symbol.module_count(), 21);
/// assert!(symbol.is_dark(0, 0));
/// ```
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Symbol {
    version: Version,
    level: EcLevel,
    mask: Mask,
    /// Row-major, `true` is dark.
    modules: Vec<bool>,
    /// Row-major, `true` marks function pattern modules.
    reserved: Vec<bool>,
}

impl Symbol {
    /// Returns this symbol's version, in the range [1, 40].
    pub fn version(&self) -> Version {
        self.version
    }

    /// Width and height in modules, `17 + 4 * version`.
    pub fn module_count(&self) -> usize {
        self.version.module_count()
    }

    pub fn error_correction_level(&self) -> EcLevel {
        self.level
    }

    /// Returns the mask that was applied, in the range [0, 7].
    pub fn mask(&self) -> Mask {
        self.mask
    }

    /// Returns `true` for a dark module. Positions outside the symbol are light.
    pub fn is_dark(&self, row: usize, col: usize) -> bool {
        self.index(row, col).map_or(false, |i| self.modules[i])
    }

    /// Returns `true` if the module belongs to a finder, separator, timing,
    /// alignment, format or version region. Depends on the version only.
    pub fn is_reserved(&self, row: usize, col: usize) -> bool {
        self.index(row, col).map_or(false, |i| self.reserved[i])
    }

    /// Iterates over the rows, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[bool]> + '_ {
        self.modules.chunks(self.module_count())
    }

    fn index(&self, row: usize, col: usize) -> Option<usize> {
        let size = self.module_count();
        (row < size && col < size).then(|| row * size + col)
    }
}

/// Parameters for [`encode_with`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct EncodeOptions {
    pub level: EcLevel,
    /// `None` picks the smallest version that fits.
    pub version: Option<Version>,
    /// `None` picks the mask with the lowest penalty.
    pub mask: Option<Mask>,
    /// Raise the level as far as the data still fits the chosen version.
    pub boost_level: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            level: EcLevel::Low,
            version: None,
            mask: None,
            boost_level: false,
        }
    }
}

/// Encodes `value` at `level`, in the given version or the smallest one that fits.
///
/// # Errors
///
/// Returns [`EncodingError::CapacityExceeded`] when `value` does not fit the
/// explicit version, or the largest version when none was given.
pub fn encode(value: &[u8], level: EcLevel, version: Option<Version>) -> Result<Symbol, EncodingError> {
    encode_with(
        value,
        &EncodeOptions {
            level,
            version,
            ..EncodeOptions::default()
        },
    )
}

/// Encodes the UTF-8 bytes of `text`.
///
/// ```rust
/// use qrtile::qrcode::{encode_text, EcLevel};
///
/// let symbol = encode_text("https://example.com", EcLevel::Medium).unwrap();
/// assert_eq!(symbol.version().value(), 2);
/// ```
pub fn encode_text(text: &str, level: EcLevel) -> Result<Symbol, EncodingError> {
    encode(text.as_bytes(), level, None)
}

/// Encodes `value` with full control over version, mask and level boosting.
pub fn encode_with(value: &[u8], options: &EncodeOptions) -> Result<Symbol, EncodingError> {
    let version = match options.version {
        Some(ver) => {
            let capacity = ver.capacity(options.level);
            if value.len() > capacity {
                return Err(EncodingError::CapacityExceeded {
                    length: value.len(),
                    capacity,
                });
            }
            ver
        }
        None => Version::smallest_for(value.len(), options.level)?,
    };

    let mut level = options.level;
    if options.boost_level {
        for newlevel in [EcLevel::Medium, EcLevel::Quartile, EcLevel::High] {
            if newlevel > level && value.len() <= version.capacity(newlevel) {
                level = newlevel;
            }
        }
    }
    debug!(
        "encoding {} bytes as version {} level {:?}",
        value.len(),
        version.value(),
        level
    );

    let datacodewords = ecc::make_data_codewords(value, version, level);
    let allcodewords = ecc::add_ecc_and_interleave(&datacodewords, version, level);

    let mut grid = Grid::new(version);
    grid.draw_function_patterns(version);
    let reserved: Vec<bool> = grid
        .modules()
        .iter()
        .map(|&m| matches!(m, Module::Function(_)))
        .collect();
    grid.draw_codewords(&allcodewords);

    let mask = match options.mask {
        Some(mask) => mask,
        None => mask::choose_mask(&grid, level),
    };
    debug!("selected mask {}", mask.value());
    grid.apply_mask(mask);
    grid.draw_format_bits(format_bits(level, mask));

    Ok(Symbol {
        version,
        level,
        mask,
        modules: grid.modules().iter().map(|m| m.is_dark()).collect(),
        reserved,
    })
}

/// Error correction level for a QR code.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub enum EcLevel {
    /// Tolerates ~7% erroneous codewords.
    #[default]
    Low,
    /// Tolerates ~15% erroneous codewords.
    Medium,
    /// Tolerates ~25% erroneous codewords.
    Quartile,
    /// Tolerates ~30% erroneous codewords.
    High,
}

impl EcLevel {
    /// Parses `L`/`M`/`Q`/`H` (or the full names), falling back to
    /// [`EcLevel::Low`] for anything else.
    pub fn parse_lenient(text: &str) -> Self {
        text.parse().unwrap_or_else(|_| {
            warn!("unknown error correction level {:?}, using L", text);
            EcLevel::Low
        })
    }

    /// Index into the per-level tables, weakest first.
    fn ordinal(self) -> usize {
        use EcLevel::*;
        match self {
            Low => 0,
            Medium => 1,
            Quartile => 2,
            High => 3,
        }
    }

    /// Returns the 2-bit value stored in the format information.
    fn format_bits(self) -> u8 {
        use EcLevel::*;
        match self {
            Low => 1,
            Medium => 0,
            Quartile => 3,
            High => 2,
        }
    }
}

impl FromStr for EcLevel {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L" | "LOW" => Ok(EcLevel::Low),
            "M" | "MEDIUM" => Ok(EcLevel::Medium),
            "Q" | "QUARTILE" => Ok(EcLevel::Quartile),
            "H" | "HIGH" => Ok(EcLevel::High),
            _ => Err(EncodingError::InvalidLevel(s.to_string())),
        }
    }
}

/// A QR code version (1–40).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Version(u8);

impl Version {
    /// The minimum version number supported in the QR Code Model 2 standard.
    pub const MIN: Version = Version(1);

    /// The maximum version number supported in the QR Code Model 2 standard.
    pub const MAX: Version = Version(40);

    /// Creates a version object from the given number.
    ///
    /// # Panics
    ///
    /// Panics if the number is outside the range [1, 40]. Use
    /// `Version::try_from` for unchecked input.
    pub const fn new(ver: u8) -> Self {
        assert!(
            Version::MIN.value() <= ver && ver <= Version::MAX.value(),
            "Version number out of range"
        );
        Self(ver)
    }

    /// Returns the value, which is in the range [1, 40].
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Side length in modules.
    pub const fn module_count(self) -> usize {
        self.0 as usize * 4 + 17
    }

    /// Largest payload in bytes this version holds at `level`.
    pub fn capacity(self, level: EcLevel) -> usize {
        ecc::byte_capacity(self, level)
    }

    /// Smallest version whose capacity at `level` holds `len` bytes.
    pub fn smallest_for(len: usize, level: EcLevel) -> Result<Self, EncodingError> {
        (Version::MIN.value()..=Version::MAX.value())
            .map(Version)
            .find(|ver| len <= ver.capacity(level))
            .ok_or(EncodingError::CapacityExceeded {
                length: len,
                capacity: Version::MAX.capacity(level),
            })
    }
}

impl TryFrom<u8> for Version {
    type Error = EncodingError;

    fn try_from(ver: u8) -> Result<Self, Self::Error> {
        if (Version::MIN.value()..=Version::MAX.value()).contains(&ver) {
            Ok(Version(ver))
        } else {
            Err(EncodingError::InvalidVersion(ver))
        }
    }
}

/// A mask pattern (0–7).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Mask(u8);

impl Mask {
    /// Creates a mask object from the given number.
    ///
    /// # Panics
    ///
    /// Panics if the number is outside the range [0, 7].
    pub const fn new(mask: u8) -> Self {
        assert!(mask <= 7, "Mask value out of range");
        Self(mask)
    }

    /// Returns the value, which is in the range [0, 7].
    pub const fn value(self) -> u8 {
        self.0
    }

    fn all() -> impl Iterator<Item = Mask> {
        (0u8..8).map(Mask)
    }

    /// Whether this mask flips the data module at (row, col).
    fn inverts(self, row: usize, col: usize) -> bool {
        let (x, y) = (col, row);
        match self.0 {
            0 => (x + y) % 2 == 0,
            1 => y % 2 == 0,
            2 => x % 3 == 0,
            3 => (x + y) % 3 == 0,
            4 => (x / 3 + y / 2) % 2 == 0,
            5 => (x * y) % 2 + (x * y) % 3 == 0,
            6 => ((x * y) % 2 + (x * y) % 3) % 2 == 0,
            7 => ((x + y) % 2 + (x * y) % 3) % 2 == 0,
            _ => unreachable!(),
        }
    }
}

impl TryFrom<u8> for Mask {
    type Error = EncodingError;

    fn try_from(mask: u8) -> Result<Self, Self::Error> {
        if mask <= 7 {
            Ok(Mask(mask))
        } else {
            Err(EncodingError::InvalidMask(mask))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::layout::format_bits;
    use super::*;

    const LEVELS: [EcLevel; 4] = [EcLevel::Low, EcLevel::Medium, EcLevel::Quartile, EcLevel::High];

    fn finder_template(row: usize, col: usize) -> bool {
        row == 0 || row == 6 || col == 0 || col == 6 || ((2..=4).contains(&row) && (2..=4).contains(&col))
    }

    #[test]
    fn test_hello_level_low() {
        let symbol = encode(b"HELLO", EcLevel::Low, None).unwrap();
        assert_eq!(symbol.version(), Version::new(1));
        assert_eq!(symbol.module_count(), 21);
        assert_eq!(symbol.error_correction_level(), EcLevel::Low);
        assert!(symbol.mask().value() <= 7);
        for row in 0..7 {
            for col in 0..7 {
                assert_eq!(symbol.is_dark(row, col), finder_template(row, col), "({}, {})", row, col);
                assert_eq!(symbol.is_dark(row, col + 14), finder_template(row, col));
                assert_eq!(symbol.is_dark(row + 14, col), finder_template(row, col));
            }
        }
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let a = encode(b"{\"tokenId\":7,\"type\":\"membership\"}", EcLevel::Medium, None).unwrap();
        let b = encode(b"{\"tokenId\":7,\"type\":\"membership\"}", EcLevel::Medium, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_module_count_across_version_boundaries() {
        for level in LEVELS {
            for v in 1..=10u8 {
                let ver = Version::new(v);
                let cap = ver.capacity(level);
                let symbol = encode(&vec![b'a'; cap], level, None).unwrap();
                assert_eq!(symbol.version(), ver);
                assert_eq!(symbol.module_count(), 17 + 4 * usize::from(v));
                let bigger = encode(&vec![b'a'; cap + 1], level, None).unwrap();
                assert_eq!(bigger.version().value(), v + 1);
            }
        }
    }

    #[test]
    fn test_largest_capacity_and_overflow() {
        for level in LEVELS {
            let cap = Version::MAX.capacity(level);
            let symbol = encode(&vec![0xa5; cap], level, None).unwrap();
            assert_eq!(symbol.module_count(), 177);

            let err = encode(&vec![0xa5; cap + 1], level, None).unwrap_err();
            assert_eq!(
                err,
                EncodingError::CapacityExceeded {
                    length: cap + 1,
                    capacity: cap
                }
            );
            assert!(encode(&vec![0; cap + 500], level, None).is_err());
        }
    }

    #[test]
    fn test_one_byte_payload_every_level() {
        for level in LEVELS {
            let symbol = encode(b"x", level, None).unwrap();
            assert_eq!(symbol.module_count(), 21);
        }
    }

    #[test]
    fn test_capacity_is_monotonic() {
        for level in LEVELS {
            for v in 1..40u8 {
                assert!(Version::new(v).capacity(level) < Version::new(v + 1).capacity(level));
            }
        }
    }

    #[test]
    fn test_explicit_version_too_small() {
        let err = encode(&[0u8; 18], EcLevel::Low, Some(Version::new(1))).unwrap_err();
        assert_eq!(err, EncodingError::CapacityExceeded { length: 18, capacity: 17 });
        let symbol = encode(&[0u8; 18], EcLevel::Low, Some(Version::new(5))).unwrap();
        assert_eq!(symbol.module_count(), 37);
    }

    #[test]
    fn test_reserved_regions_depend_on_version_only() {
        for v in [1u8, 2, 7, 12] {
            let ver = Version::new(v);
            let a = encode(b"first", EcLevel::Quartile, Some(ver)).unwrap();
            let b = encode(b"SECOND!", EcLevel::Quartile, Some(ver)).unwrap();
            let size = a.module_count();
            for row in 0..size {
                for col in 0..size {
                    assert_eq!(a.is_reserved(row, col), b.is_reserved(row, col));
                    let in_format = (row == 8 && (col <= 8 || col >= size - 8))
                        || (col == 8 && (row <= 8 || row >= size - 8));
                    if a.is_reserved(row, col) && !in_format {
                        assert_eq!(a.is_dark(row, col), b.is_dark(row, col), "v{} ({}, {})", v, row, col);
                    }
                }
            }
        }
    }

    #[test]
    fn test_reserved_map_counts() {
        let symbol = encode(b"HELLO", EcLevel::Low, None).unwrap();
        let reserved = (0..21)
            .flat_map(|r| (0..21).map(move |c| (r, c)))
            .filter(|&(r, c)| symbol.is_reserved(r, c))
            .count();
        assert_eq!(reserved, 21 * 21 - 208);
        assert!(symbol.is_reserved(6, 10));
        assert!(!symbol.is_reserved(20, 20));
        assert!(!symbol.is_reserved(21, 0));
    }

    #[test]
    fn test_format_information_roundtrips_level_and_mask() {
        let symbol = encode(b"format", EcLevel::High, None).unwrap();
        let expected = format_bits(EcLevel::High, symbol.mask());
        let mut read: u32 = 0;
        for i in 0..6 {
            read |= u32::from(symbol.is_dark(i, 8)) << i;
        }
        read |= u32::from(symbol.is_dark(7, 8)) << 6;
        read |= u32::from(symbol.is_dark(8, 8)) << 7;
        read |= u32::from(symbol.is_dark(8, 7)) << 8;
        for i in 9..15 {
            read |= u32::from(symbol.is_dark(8, 14 - i)) << i;
        }
        assert_eq!(read, expected);
    }

    #[test]
    fn test_fixed_mask_is_honoured() {
        let options = EncodeOptions {
            mask: Some(Mask::new(6)),
            ..EncodeOptions::default()
        };
        let symbol = encode_with(b"HELLO", &options).unwrap();
        assert_eq!(symbol.mask(), Mask::new(6));
    }

    #[test]
    fn test_boost_level_stays_in_version() {
        let options = EncodeOptions {
            boost_level: true,
            ..EncodeOptions::default()
        };
        let symbol = encode_with(b"HELLO", &options).unwrap();
        assert_eq!(symbol.version(), Version::new(1));
        assert_eq!(symbol.error_correction_level(), EcLevel::High);

        let symbol = encode_with(&[b'x'; 15], &options).unwrap();
        assert_eq!(symbol.version(), Version::new(1));
        assert_eq!(symbol.error_correction_level(), EcLevel::Low);
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!("Q".parse::<EcLevel>(), Ok(EcLevel::Quartile));
        assert_eq!("high".parse::<EcLevel>(), Ok(EcLevel::High));
        assert_eq!(
            "X".parse::<EcLevel>(),
            Err(EncodingError::InvalidLevel("X".to_string()))
        );
        assert_eq!(EcLevel::parse_lenient("X"), EcLevel::Low);
        assert_eq!(EcLevel::parse_lenient("m"), EcLevel::Medium);
        assert_eq!(EcLevel::parse_lenient(""), EcLevel::Low);
    }

    #[test]
    fn test_version_and_mask_ranges() {
        assert_eq!(Version::try_from(0u8), Err(EncodingError::InvalidVersion(0)));
        assert_eq!(Version::try_from(41u8), Err(EncodingError::InvalidVersion(41)));
        assert_eq!(Version::try_from(40u8), Ok(Version::MAX));
        assert_eq!(Mask::try_from(8u8), Err(EncodingError::InvalidMask(8)));
        assert_eq!(Mask::try_from(3u8), Ok(Mask::new(3)));
    }

    #[test]
    fn test_empty_payload() {
        let symbol = encode(b"", EcLevel::High, None).unwrap();
        assert_eq!(symbol.module_count(), 21);
        assert_eq!(symbol.rows().count(), 21);
    }
}
