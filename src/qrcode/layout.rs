//! Module grid and placement of function patterns and codewords.

use super::{EcLevel, Mask, Version};

/// State of one module while the symbol is being built.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Module {
    /// Not yet claimed by any stage.
    Unset,
    /// Part of a finder, separator, timing, alignment, format or version region.
    Function(bool),
    Data(bool),
}

impl Module {
    pub fn is_dark(self) -> bool {
        matches!(self, Module::Function(true) | Module::Data(true))
    }
}

/// Square working grid indexed by (row, col).
#[derive(Clone, Debug)]
pub(crate) struct Grid {
    size: usize,
    modules: Vec<Module>,
}

impl Grid {
    pub fn new(ver: Version) -> Self {
        let size = ver.module_count();
        Self {
            size,
            modules: vec![Module::Unset; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, row: usize, col: usize) -> Module {
        self.modules[row * self.size + col]
    }

    pub fn is_dark(&self, row: usize, col: usize) -> bool {
        self.get(row, col).is_dark()
    }

    fn set(&mut self, row: usize, col: usize, module: Module) {
        self.modules[row * self.size + col] = module;
    }

    fn set_function(&mut self, row: usize, col: usize, isdark: bool) {
        self.set(row, col, Module::Function(isdark));
    }

    /// Like `set_function`, but silently ignores coordinates off the grid.
    fn set_function_unbounded(&mut self, row: i32, col: i32, isdark: bool) {
        let range = 0..self.size as i32;
        if range.contains(&row) && range.contains(&col) {
            self.set_function(row as usize, col as usize, isdark);
        }
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Places every function pattern for the grid's version. Format strips are
    /// reserved with light placeholders until the mask is known.
    pub fn draw_function_patterns(&mut self, ver: Version) {
        let size = self.size;

        // Timing first, the finders overwrite its ends
        for i in 0..size {
            self.set_function(6, i, i % 2 == 0);
            self.set_function(i, 6, i % 2 == 0);
        }

        self.draw_finder_pattern(3, 3);
        self.draw_finder_pattern(3, size as i32 - 4);
        self.draw_finder_pattern(size as i32 - 4, 3);

        let alignpatpos = alignment_pattern_positions(ver);
        let numalign = alignpatpos.len();
        for (i, &row) in alignpatpos.iter().enumerate() {
            for (j, &col) in alignpatpos.iter().enumerate() {
                let on_finder = (i == 0 && j == 0)
                    || (i == 0 && j == numalign - 1)
                    || (i == numalign - 1 && j == 0);
                if !on_finder {
                    self.draw_alignment_pattern(row, col);
                }
            }
        }

        self.reserve_format_bits();
        self.draw_version(ver);
    }

    /// 7x7 finder ring plus its light separator, centred on (row, col).
    fn draw_finder_pattern(&mut self, row: i32, col: i32) {
        for dy in -4i32..=4 {
            for dx in -4i32..=4 {
                let dist = dx.abs().max(dy.abs());
                self.set_function_unbounded(row + dy, col + dx, dist != 2 && dist != 4);
            }
        }
    }

    /// 5x5 alignment ring centred on (row, col).
    fn draw_alignment_pattern(&mut self, row: usize, col: usize) {
        for dy in -2i32..=2 {
            for dx in -2i32..=2 {
                let dist = dx.abs().max(dy.abs());
                self.set_function_unbounded(row as i32 + dy, col as i32 + dx, dist != 1);
            }
        }
    }

    fn reserve_format_bits(&mut self) {
        self.draw_format_bits(0);
    }

    /// Writes both copies of the 15-bit format word plus the fixed dark module.
    pub fn draw_format_bits(&mut self, bits: u32) {
        let size = self.size;

        // First copy, around the top-left finder
        for i in 0..6 {
            self.set_function(i, 8, get_bit(bits, i as u8));
        }
        self.set_function(7, 8, get_bit(bits, 6));
        self.set_function(8, 8, get_bit(bits, 7));
        self.set_function(8, 7, get_bit(bits, 8));
        for i in 9..15 {
            self.set_function(8, 14 - i, get_bit(bits, i as u8));
        }

        // Second copy, split between the other two finders
        for i in 0..8 {
            self.set_function(8, size - 1 - i, get_bit(bits, i as u8));
        }
        for i in 8..15 {
            self.set_function(size - 15 + i, 8, get_bit(bits, i as u8));
        }
        self.set_function(size - 8, 8, true);
    }

    /// Two 6x3 version blocks, only present from version 7 on.
    fn draw_version(&mut self, ver: Version) {
        if ver.value() < 7 {
            return;
        }
        let bits = version_bits(ver);
        let size = self.size;
        for i in 0..18u8 {
            let bit = get_bit(bits, i);
            let a = size - 11 + usize::from(i % 3);
            let b = usize::from(i / 3);
            self.set_function(b, a, bit);
            self.set_function(a, b, bit);
        }
    }

    /// Writes `codewords` MSB-first along the zigzag column pairs, skipping
    /// function modules. Modules past the last codeword become light remainder bits.
    pub fn draw_codewords(&mut self, codewords: &[u8]) {
        let size = self.size as i32;
        let totalbits = codewords.len() * 8;
        let mut i: usize = 0;
        let mut right: i32 = size - 1;
        while right >= 1 {
            // Skip the vertical timing column
            if right == 6 {
                right = 5;
            }
            let upward = ((right + 1) & 2) == 0;
            for vert in 0..size {
                let row = (if upward { size - 1 - vert } else { vert }) as usize;
                for j in 0..2 {
                    let col = (right - j) as usize;
                    if self.get(row, col) != Module::Unset {
                        continue;
                    }
                    let bit = i < totalbits && get_bit(codewords[i >> 3].into(), 7 - (i & 7) as u8);
                    self.set(row, col, Module::Data(bit));
                    i += 1;
                }
            }
            right -= 2;
        }
        debug_assert!(i >= totalbits);
        debug_assert!(self.modules.iter().all(|&m| m != Module::Unset));
    }

    /// XORs every data module with the mask pattern. Applying twice undoes it.
    pub fn apply_mask(&mut self, mask: Mask) {
        let size = self.size;
        for row in 0..size {
            for col in 0..size {
                if let Module::Data(isdark) = self.get(row, col) {
                    let invert = mask.inverts(row, col);
                    self.set(row, col, Module::Data(isdark ^ invert));
                }
            }
        }
    }
}

/// Format word: 2 level bits and 3 mask bits, BCH(15,5) protected and masked with 0x5412.
pub(crate) fn format_bits(level: EcLevel, mask: Mask) -> u32 {
    let data = u32::from((level.format_bits() << 3) | mask.value());
    let mut rem: u32 = data;
    for _ in 0..10 {
        rem = (rem << 1) ^ ((rem >> 9) * 0x537);
    }
    ((data << 10) | rem) ^ 0x5412
}

/// Version word: 6 version bits, BCH(18,6) protected.
pub(crate) fn version_bits(ver: Version) -> u32 {
    let ver = u32::from(ver.value());
    let mut rem: u32 = ver;
    for _ in 0..12 {
        rem = (rem << 1) ^ ((rem >> 11) * 0x1f25);
    }
    (ver << 12) | rem
}

/// Ascending centre coordinates of the alignment patterns; empty for version 1.
pub(crate) fn alignment_pattern_positions(ver: Version) -> Vec<usize> {
    let v = usize::from(ver.value());
    if v == 1 {
        return Vec::new();
    }
    let numalign = v / 7 + 2;
    let step = if v == 32 {
        26
    } else {
        (v * 4 + numalign * 2 + 1) / (numalign * 2 - 2) * 2
    };
    let size = ver.module_count();
    let mut result: Vec<usize> = (0..numalign - 1).map(|i| size - 7 - i * step).collect();
    result.push(6);
    result.reverse();
    result
}

fn get_bit(x: u32, i: u8) -> bool {
    ((x >> i) & 1) != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment_positions_match_standard_table() {
        assert!(alignment_pattern_positions(Version::new(1)).is_empty());
        assert_eq!(alignment_pattern_positions(Version::new(2)), vec![6, 18]);
        assert_eq!(alignment_pattern_positions(Version::new(7)), vec![6, 22, 38]);
        assert_eq!(alignment_pattern_positions(Version::new(32)), vec![6, 34, 60, 86, 112, 138]);
        assert_eq!(
            alignment_pattern_positions(Version::new(40)),
            vec![6, 30, 58, 86, 114, 142, 170]
        );
    }

    #[test]
    fn test_format_bits_known_values() {
        // Level M, mask 0 and level L, mask 4 from the format information table
        assert_eq!(format_bits(EcLevel::Medium, Mask::new(0)), 0b101010000010010);
        assert_eq!(format_bits(EcLevel::Low, Mask::new(4)), 0b110011000101111);
        assert_eq!(format_bits(EcLevel::High, Mask::new(7)), 0b000100000111011);
    }

    #[test]
    fn test_version_bits_known_value() {
        assert_eq!(version_bits(Version::new(7)), 0b000111110010010100);
        assert_eq!(version_bits(Version::new(40)), 0b101000110001101001);
    }

    #[test]
    fn test_function_patterns_leave_expected_data_modules() {
        for v in [1u8, 2, 6, 7, 14, 40] {
            let ver = Version::new(v);
            let mut grid = Grid::new(ver);
            grid.draw_function_patterns(ver);
            let unset = grid.modules().iter().filter(|&&m| m == Module::Unset).count();
            assert_eq!(unset, super::super::ecc::num_raw_data_modules(ver), "version {}", v);
        }
    }

    #[test]
    fn test_finder_and_timing_layout() {
        let ver = Version::new(1);
        let mut grid = Grid::new(ver);
        grid.draw_function_patterns(ver);
        assert_eq!(grid.get(0, 0), Module::Function(true));
        assert_eq!(grid.get(1, 1), Module::Function(false));
        assert_eq!(grid.get(3, 3), Module::Function(true));
        assert_eq!(grid.get(7, 7), Module::Function(false));
        assert_eq!(grid.get(0, 20), Module::Function(true));
        assert_eq!(grid.get(20, 0), Module::Function(true));
        // Timing row between the top finders
        assert_eq!(grid.get(6, 8), Module::Function(true));
        assert_eq!(grid.get(6, 9), Module::Function(false));
        assert_eq!(grid.get(6, 12), Module::Function(true));
        // Dark module
        assert_eq!(grid.get(13, 8), Module::Function(true));
        // Bottom-right corner is data territory
        assert_eq!(grid.get(20, 20), Module::Unset);
    }

    #[test]
    fn test_codeword_placement_starts_bottom_right_going_up() {
        let ver = Version::new(1);
        let mut grid = Grid::new(ver);
        grid.draw_function_patterns(ver);
        let mut codewords = vec![0u8; 26];
        codewords[0] = 0b1010_0000;
        grid.draw_codewords(&codewords);
        assert_eq!(grid.get(20, 20), Module::Data(true));
        assert_eq!(grid.get(20, 19), Module::Data(false));
        assert_eq!(grid.get(19, 20), Module::Data(true));
        assert_eq!(grid.get(19, 19), Module::Data(false));
    }

    #[test]
    fn test_apply_mask_twice_is_identity() {
        let ver = Version::new(3);
        let mut grid = Grid::new(ver);
        grid.draw_function_patterns(ver);
        grid.draw_codewords(&vec![0x5a; 70]);
        let before = grid.modules().to_vec();
        grid.apply_mask(Mask::new(5));
        assert_ne!(grid.modules(), before.as_slice());
        grid.apply_mask(Mask::new(5));
        assert_eq!(grid.modules(), before.as_slice());
    }
}
