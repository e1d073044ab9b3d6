//! Codeword construction: byte-mode bit stream, Reed-Solomon parity and
//! block interleaving.

use super::{EcLevel, Version};

/// Appends bits MSB-first into a growable byte vector.
pub(crate) struct BitBuffer {
    data: Vec<u8>,
    length: usize,
}

impl BitBuffer {
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            data: Vec::with_capacity(bytes),
            length: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn append_bits(&mut self, val: u32, len: u8) {
        assert!(len <= 31 && (val >> len) == 0);
        for i in (0..len).rev() {
            let shift: u8 = 7 - ((self.length & 7) as u8);
            let bit: u8 = ((val >> i) as u8) & 1;
            if shift == 7 {
                self.data.push(bit << shift);
            } else if let Some(last) = self.data.last_mut() {
                *last |= bit << shift;
            }
            self.length += 1;
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Mode indicator for byte mode.
const BYTE_MODE_BITS: u32 = 0x4;

/// Width of the byte-mode character count field.
pub(crate) fn char_count_bits(ver: Version) -> u8 {
    [8, 16, 16][usize::from((ver.value() + 7) / 17)]
}

/// Number of modules left for codewords once every function pattern is placed,
/// including the remainder bits.
pub(crate) fn num_raw_data_modules(ver: Version) -> usize {
    let ver = usize::from(ver.value());
    let mut result: usize = (16 * ver + 128) * ver + 64;
    if ver >= 2 {
        let numalign: usize = ver / 7 + 2;
        result -= (25 * numalign - 10) * numalign - 55;
        if ver >= 7 {
            result -= 36;
        }
    }
    result
}

pub(crate) fn num_data_codewords(ver: Version, level: EcLevel) -> usize {
    num_raw_data_modules(ver) / 8
        - table_get(&ECC_CODEWORDS_PER_BLOCK, ver, level)
            * table_get(&NUM_ERROR_CORRECTION_BLOCKS, ver, level)
}

/// Largest byte payload that fits `ver` at `level` in byte mode.
pub(crate) fn byte_capacity(ver: Version, level: EcLevel) -> usize {
    let bits = num_data_codewords(ver, level) * 8;
    (bits - 4 - usize::from(char_count_bits(ver))) / 8
}

/// Builds the padded data codewords for `payload`, which must fit the version.
pub(crate) fn make_data_codewords(payload: &[u8], ver: Version, level: EcLevel) -> Vec<u8> {
    let capacitybits = num_data_codewords(ver, level) * 8;
    let mut bb = BitBuffer::with_capacity(capacitybits / 8);
    bb.append_bits(BYTE_MODE_BITS, 4);
    bb.append_bits(payload.len() as u32, char_count_bits(ver));
    for &b in payload {
        bb.append_bits(u32::from(b), 8);
    }
    assert!(bb.len() <= capacitybits, "Payload exceeds version capacity");

    // Terminator, then zero bits up to a byte boundary
    let numzerobits = (capacitybits - bb.len()).min(4);
    bb.append_bits(0, numzerobits as u8);
    let numzerobits = bb.len().wrapping_neg() & 7;
    bb.append_bits(0, numzerobits as u8);
    debug_assert_eq!(bb.len() % 8, 0);

    for &padbyte in [0xec, 0x11].iter().cycle() {
        if bb.len() >= capacitybits {
            break;
        }
        bb.append_bits(padbyte, 8);
    }
    bb.into_bytes()
}

/// Splits `data` into error correction blocks, appends parity to each block and
/// interleaves the result into the final codeword sequence.
pub(crate) fn add_ecc_and_interleave(data: &[u8], ver: Version, level: EcLevel) -> Vec<u8> {
    assert_eq!(data.len(), num_data_codewords(ver, level));
    let numblocks = table_get(&NUM_ERROR_CORRECTION_BLOCKS, ver, level);
    let blockecclen = table_get(&ECC_CODEWORDS_PER_BLOCK, ver, level);
    let rawcodewords = num_raw_data_modules(ver) / 8;
    let numshortblocks = numblocks - rawcodewords % numblocks;
    let shortblocklen = rawcodewords / numblocks;

    let rs = ReedSolomonGenerator::new(blockecclen);
    let mut blocks: Vec<Vec<u8>> = Vec::with_capacity(numblocks);
    let mut rest = data;
    for i in 0..numblocks {
        let datlen = shortblocklen - blockecclen + usize::from(i >= numshortblocks);
        let (dat, tail) = rest.split_at(datlen);
        rest = tail;
        let mut block = dat.to_vec();
        let ecc = rs.compute_remainder(dat);
        if i < numshortblocks {
            // Placeholder so every block has the same length while interleaving
            block.push(0);
        }
        block.extend_from_slice(&ecc);
        blocks.push(block);
    }
    debug_assert!(rest.is_empty());

    let mut result = Vec::with_capacity(rawcodewords);
    for i in 0..=shortblocklen {
        for (j, block) in blocks.iter().enumerate() {
            if i != shortblocklen - blockecclen || j >= numshortblocks {
                result.push(block[i]);
            }
        }
    }
    debug_assert_eq!(result.len(), rawcodewords);
    result
}

fn table_get(table: &'static [[i8; 41]; 4], ver: Version, level: EcLevel) -> usize {
    table[level.ordinal()][usize::from(ver.value())] as usize
}

/// Systematic Reed-Solomon encoder over GF(2^8/0x11D).
pub(crate) struct ReedSolomonGenerator {
    divisor: Vec<u8>,
}

impl ReedSolomonGenerator {
    /// Generator polynomial of the given degree, with roots α^0 .. α^(degree-1).
    /// Coefficients are stored highest power first, leading 1 omitted.
    pub fn new(degree: usize) -> Self {
        assert!((1..=255).contains(&degree), "Degree out of range");
        let mut divisor = vec![0u8; degree];
        divisor[degree - 1] = 1;
        let mut root: u8 = 1;
        for _ in 0..degree {
            for j in 0..degree {
                divisor[j] = Self::multiply(divisor[j], root);
                if j + 1 < degree {
                    divisor[j] ^= divisor[j + 1];
                }
            }
            root = Self::multiply(root, 0x02);
        }
        Self { divisor }
    }

    pub fn compute_remainder(&self, data: &[u8]) -> Vec<u8> {
        let mut result = vec![0u8; self.divisor.len()];
        for b in data {
            let factor: u8 = b ^ result[0];
            result.rotate_left(1);
            if let Some(last) = result.last_mut() {
                *last = 0;
            }
            for (x, &y) in result.iter_mut().zip(self.divisor.iter()) {
                *x ^= Self::multiply(y, factor);
            }
        }
        result
    }

    /// Russian-peasant multiplication modulo x^8 + x^4 + x^3 + x^2 + 1.
    fn multiply(x: u8, y: u8) -> u8 {
        let mut z: u8 = 0;
        for i in (0..8).rev() {
            z = (z << 1) ^ ((z >> 7) * 0x1d);
            z ^= ((y >> i) & 1) * x;
        }
        z
    }
}

static ECC_CODEWORDS_PER_BLOCK: [[i8; 41]; 4] = [
    [
        -1, 7, 10, 15, 20, 26, 18, 20, 24, 30, 18, 20, 24, 26, 30, 22, 24, 28, 30, 28, 28, 28, 28, 30,
        30, 26, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // Low
    [
        -1, 10, 16, 26, 18, 24, 16, 18, 22, 22, 26, 30, 22, 22, 24, 24, 28, 28, 26, 26, 26, 26, 28, 28,
        28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28,
    ], // Medium
    [
        -1, 13, 22, 18, 26, 18, 24, 18, 22, 20, 24, 28, 26, 24, 20, 30, 24, 28, 28, 26, 30, 28, 30, 30,
        30, 30, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // Quartile
    [
        -1, 17, 28, 22, 16, 22, 28, 26, 26, 24, 28, 24, 28, 22, 24, 24, 30, 28, 28, 26, 28, 30, 24, 30,
        30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // High
];

static NUM_ERROR_CORRECTION_BLOCKS: [[i8; 41]; 4] = [
    [
        -1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 4, 4, 4, 4, 4, 6, 6, 6, 6, 7, 8, 8, 9, 9, 10, 12, 12, 12,
        13, 14, 15, 16, 17, 18, 19, 19, 20, 21, 22, 24, 25,
    ], // Low
    [
        -1, 1, 1, 1, 2, 2, 4, 4, 4, 5, 5, 5, 8, 9, 9, 10, 10, 11, 13, 14, 16, 17, 17, 18, 20, 21,
        23, 25, 26, 28, 29, 31, 33, 35, 37, 38, 40, 43, 45, 47, 49,
    ], // Medium
    [
        -1, 1, 1, 2, 2, 4, 4, 6, 6, 8, 8, 8, 10, 12, 16, 12, 17, 16, 18, 21, 20, 23, 23, 25, 27, 29,
        34, 34, 35, 38, 40, 43, 45, 48, 51, 53, 56, 59, 62, 65, 68,
    ], // Quartile
    [
        -1, 1, 1, 2, 4, 4, 4, 5, 6, 8, 8, 11, 11, 16, 16, 18, 16, 19, 21, 25, 25, 25, 34, 30, 32, 35,
        37, 40, 42, 45, 48, 51, 54, 57, 60, 63, 66, 70, 74, 77, 81,
    ], // High
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_capacity_known_values() {
        assert_eq!(byte_capacity(Version::MIN, EcLevel::Low), 17);
        assert_eq!(byte_capacity(Version::MIN, EcLevel::Medium), 14);
        assert_eq!(byte_capacity(Version::MIN, EcLevel::Quartile), 11);
        assert_eq!(byte_capacity(Version::MIN, EcLevel::High), 7);
        assert_eq!(byte_capacity(Version::MAX, EcLevel::Low), 2953);
        assert_eq!(byte_capacity(Version::MAX, EcLevel::High), 1273);
    }

    #[test]
    fn test_raw_modules_fill_whole_codewords_or_remainder() {
        // Version 1 has 208 modules for 26 codewords, version 2 adds 7 remainder bits
        assert_eq!(num_raw_data_modules(Version::new(1)), 208);
        assert_eq!(num_raw_data_modules(Version::new(2)), 359);
        assert_eq!(num_raw_data_modules(Version::new(7)), 1568);
    }

    #[test]
    fn test_data_codewords_hello_world_header() {
        let words = make_data_codewords(b"Hi", Version::MIN, EcLevel::Low);
        assert_eq!(words.len(), 19);
        // 0100 | 00000010 | 'H' | 'i' | 0000 then pads
        assert_eq!(&words[..5], &[0x40, 0x24, 0x86, 0x90, 0xec]);
        assert_eq!(words[5], 0x11);
    }

    #[test]
    fn test_reed_solomon_known_vector() {
        // "01234567" numeric example from ISO/IEC 18004 Annex I, version 1-M
        let data = [
            0x10, 0x20, 0x0c, 0x56, 0x61, 0x80, 0xec, 0x11, 0xec, 0x11, 0xec, 0x11, 0xec, 0x11,
            0xec, 0x11,
        ];
        let ecc = ReedSolomonGenerator::new(10).compute_remainder(&data);
        assert_eq!(ecc, vec![0xa5, 0x24, 0xd4, 0xc1, 0xed, 0x36, 0xc7, 0x87, 0x2c, 0x55]);
    }

    #[test]
    fn test_interleave_keeps_every_codeword() {
        let ver = Version::new(5);
        let level = EcLevel::Quartile;
        let data = make_data_codewords(&[0xab; 40], ver, level);
        let all = add_ecc_and_interleave(&data, ver, level);
        assert_eq!(all.len(), num_raw_data_modules(ver) / 8);
        // 5-Q: 2 blocks of 15 then 2 of 16; first codewords are the block heads
        assert_eq!(all[0], data[0]);
        assert_eq!(all[1], data[15]);
        assert_eq!(all[2], data[30]);
        assert_eq!(all[3], data[46]);
    }
}
