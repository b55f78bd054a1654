//! D8 flow direction encoding
//!
//! ```text
//!   4  3  2
//!   5  0  1
//!   6  7  8
//! ```
//! 0 = pit, flat or nodata (no outflow); 1-8 = direction to the
//! steepest downslope neighbor.

/// Code for cells without an outflow direction
pub const NONE: u8 = 0;

/// Direction offsets: (row_offset, col_offset)
/// Indexed by direction code (1-8), 0 is unused
pub const OFFSETS: [(isize, isize); 9] = [
    (0, 0),   // 0: no flow / pit
    (0, 1),   // 1: E
    (-1, 1),  // 2: NE
    (-1, 0),  // 3: N
    (-1, -1), // 4: NW
    (0, -1),  // 5: W
    (1, -1),  // 6: SW
    (1, 0),   // 7: S
    (1, 1),   // 8: SE
];

/// Distance multipliers for each direction
/// Cardinal directions = 1.0, diagonal = sqrt(2)
pub const DISTANCES: [f64; 9] = [
    0.0,
    1.0,
    std::f64::consts::SQRT_2,
    1.0,
    std::f64::consts::SQRT_2,
    1.0,
    std::f64::consts::SQRT_2,
    1.0,
    std::f64::consts::SQRT_2,
];

/// Whether `dir` is one of the eight outflow codes
#[inline]
pub fn is_valid(dir: u8) -> bool {
    (1..=8).contains(&dir)
}

/// Get the opposite direction
pub fn opposite(dir: u8) -> u8 {
    if !is_valid(dir) {
        NONE
    } else {
        ((dir - 1 + 4) % 8) + 1
    }
}

/// Neighbor of (row, col) in direction `dir`, or `None` when the direction
/// is not an outflow code or the neighbor falls off the grid.
#[inline]
pub fn step(row: usize, col: usize, dir: u8, rows: usize, cols: usize) -> Option<(usize, usize)> {
    if !is_valid(dir) {
        return None;
    }
    let (dr, dc) = OFFSETS[dir as usize];
    let nr = row as isize + dr;
    let nc = col as isize + dc;
    if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
        return None;
    }
    Some((nr as usize, nc as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_d8_opposite() {
        assert_eq!(opposite(1), 5); // E -> W
        assert_eq!(opposite(3), 7); // N -> S
        assert_eq!(opposite(2), 6); // NE -> SW
        assert_eq!(opposite(0), 0);
        assert_eq!(opposite(9), 0);
    }

    #[test]
    fn test_d8_step() {
        assert_eq!(step(1, 1, 1, 3, 3), Some((1, 2)));
        assert_eq!(step(1, 1, 4, 3, 3), Some((0, 0)));
        assert_eq!(step(0, 0, 3, 3, 3), None);
        assert_eq!(step(2, 2, 8, 3, 3), None);
        assert_eq!(step(1, 1, 0, 3, 3), None);
    }
}
