use gridmerge_common::{GridCoord, Token};

use crate::world::CellState;

/// Deterministic draw in `[0, 1)` for a cell.
///
/// Pure function of `(i, j)`: no seed, no process state. Hashes the cell key
/// with FNV-1a, then finalises with splitmix64 so neighbouring keys that
/// differ in one byte land far apart.
pub fn luck(coord: GridCoord) -> f64 {
    let key = coord.to_string();
    let mut h: u64 = 0xcbf2_9ce4_8422_2325; // FNV offset basis
    for b in key.bytes() {
        h ^= u64::from(b);
        h = h.wrapping_mul(0x0100_0000_01b3);
    }
    let mixed = splitmix64(h);
    // Top 53 bits fill an f64 mantissa exactly.
    (mixed >> 11) as f64 / (1u64 << 53) as f64
}

/// Default content of a never-touched cell.
pub fn generate(coord: GridCoord, spawn_probability: f64) -> CellState {
    if luck(coord) < spawn_probability {
        CellState::with_token(Token::ONE)
    } else {
        CellState::EMPTY
    }
}

/// Splitmix64 finaliser.
fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
