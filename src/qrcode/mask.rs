//! Mask selection by penalty scoring.

use log::debug;

use super::layout::{format_bits, Grid};
use super::{EcLevel, Mask};

const PENALTY_N1: i32 = 3;
const PENALTY_N2: i32 = 3;
const PENALTY_N3: i32 = 40;
const PENALTY_N4: i32 = 10;

/// Tries every mask on a copy of `grid` and returns the one with the lowest
/// penalty. Ties go to the lowest mask index.
pub(crate) fn choose_mask(grid: &Grid, level: EcLevel) -> Mask {
    let mut best: Option<(Mask, i32)> = None;
    for mask in Mask::all() {
        let mut candidate = grid.clone();
        candidate.apply_mask(mask);
        candidate.draw_format_bits(format_bits(level, mask));
        let penalty = penalty_score(&candidate);
        debug!("mask {} penalty {}", mask.value(), penalty);
        if best.map_or(true, |(_, min)| penalty < min) {
            best = Some((mask, penalty));
        }
    }
    best.map_or(Mask::new(0), |(mask, _)| mask)
}

/// Sum of the four penalty rules over the finished grid.
pub(crate) fn penalty_score(grid: &Grid) -> i32 {
    let size = grid.size();
    let mut result: i32 = 0;

    // Runs and finder-like patterns, rows then columns
    for y in 0..size {
        result += line_penalty(size, |x| grid.is_dark(y, x));
    }
    for x in 0..size {
        result += line_penalty(size, |y| grid.is_dark(y, x));
    }

    // 2x2 blocks of one color
    for y in 0..size - 1 {
        for x in 0..size - 1 {
            let color = grid.is_dark(y, x);
            if color == grid.is_dark(y, x + 1)
                && color == grid.is_dark(y + 1, x)
                && color == grid.is_dark(y + 1, x + 1)
            {
                result += PENALTY_N2;
            }
        }
    }

    // Dark/light balance, 10 points per full 5% step away from 50%
    let dark = grid.modules().iter().filter(|m| m.is_dark()).count() as i32;
    let total = (size * size) as i32;
    let k: i32 = ((dark * 20 - total * 10).abs() + total - 1) / total - 1;
    result += k * PENALTY_N4;
    result
}

fn line_penalty(size: usize, is_dark: impl Fn(usize) -> bool) -> i32 {
    let mut result = 0;
    let mut runcolor = false;
    let mut runlen: i32 = 0;
    let mut runhistory = FinderPenalty::new(size);
    for i in 0..size {
        let color = is_dark(i);
        if color == runcolor {
            runlen += 1;
            if runlen == 5 {
                result += PENALTY_N1;
            } else if runlen > 5 {
                result += 1;
            }
        } else {
            runhistory.add_history(runlen);
            if !runcolor {
                result += runhistory.count_patterns() * PENALTY_N3;
            }
            runcolor = color;
            runlen = 1;
        }
    }
    result + runhistory.terminate_and_count(runcolor, runlen) * PENALTY_N3
}

/// Tracks the last seven run lengths of a line to spot 1:1:3:1:1 finder-like
/// patterns with a light margin of four modules on either side. The area
/// outside the symbol counts as light.
struct FinderPenalty {
    qr_size: i32,
    run_history: [i32; 7],
}

impl FinderPenalty {
    fn new(size: usize) -> Self {
        Self {
            qr_size: size as i32,
            run_history: [0; 7],
        }
    }

    fn add_history(&mut self, mut currentrunlength: i32) {
        if self.run_history[0] == 0 {
            // Light border before the first run
            currentrunlength += self.qr_size;
        }
        self.run_history.copy_within(0..6, 1);
        self.run_history[0] = currentrunlength;
    }

    fn count_patterns(&self) -> i32 {
        let rh = &self.run_history;
        let n = rh[1];
        debug_assert!(n <= self.qr_size * 3);
        let core = n > 0 && rh[2] == n && rh[3] == n * 3 && rh[4] == n && rh[5] == n;
        i32::from(core && rh[0] >= n * 4 && rh[6] >= n)
            + i32::from(core && rh[6] >= n * 4 && rh[0] >= n)
    }

    fn terminate_and_count(mut self, currentruncolor: bool, mut currentrunlength: i32) -> i32 {
        if currentruncolor {
            self.add_history(currentrunlength);
            currentrunlength = 0;
        }
        currentrunlength += self.qr_size;
        self.add_history(currentrunlength);
        self.count_patterns()
    }
}
